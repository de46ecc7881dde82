//! Translation of user-facing spec values into upload options.

use reqwest::Url;
use tracing::debug;

use crate::config::{ConfigValidator, ImageSpec};
use crate::error::{ProviderError, Result};
use crate::hcloud::{
    Architecture, Compression, ImageApi, ImageFormat, ServerType, UploadOptions,
};

/// Parses an external identity into a remote image id.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidIdentity`] if `id` is not an integer.
pub fn parse_identity(id: &str) -> Result<i64> {
    id.parse().map_err(|source| ProviderError::InvalidIdentity {
        id: id.to_string(),
        source,
    })
}

/// Builds upload options from a spec, without the server type.
///
/// # Errors
///
/// Returns a validation error for a missing or malformed source URL and
/// [`ProviderError::UnsupportedValue`] for unrecognized enum strings.
pub fn upload_options(spec: &ImageSpec) -> Result<UploadOptions> {
    let raw_url = ConfigValidator::require_source(spec)?;
    let image_url = Url::parse(raw_url).map_err(|e| {
        ProviderError::validation(format!("invalid image URL: {e}"), "image_url")
    })?;

    let compression = match spec.compression.as_deref() {
        None => Compression::default(),
        Some(value) => Compression::parse(value)
            .ok_or_else(|| ProviderError::unsupported("compression", value))?,
    };

    let format = match spec.format.as_deref() {
        None => ImageFormat::default(),
        Some(value) => ImageFormat::parse(value)
            .ok_or_else(|| ProviderError::unsupported("format", value))?,
    };

    let architecture = Architecture::parse(&spec.architecture)
        .ok_or_else(|| ProviderError::unsupported("architecture", spec.architecture.as_str()))?;

    debug!(
        "Resolved upload options: compression={}, format={}, architecture={architecture}",
        compression.as_str(),
        format.as_str()
    );

    Ok(UploadOptions {
        image_url,
        compression,
        format,
        image_size: spec.image_size,
        architecture,
        server_type: None,
        description: spec.description.clone(),
        labels: spec.labels.clone(),
    })
}

/// Looks up a server type by name.
///
/// # Errors
///
/// Returns [`ProviderError::NotFound`] if no server type has that name and
/// [`ProviderError::Remote`] if the lookup fails.
pub async fn resolve_server_type(api: &dyn ImageApi, name: &str) -> Result<ServerType> {
    debug!("Looking up server type {name}");

    api.get_server_type_by_name(name)
        .await?
        .ok_or_else(|| ProviderError::NotFound {
            resource: String::from("server type"),
            name: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HcloudError;
    use crate::hcloud::MockImageApi;

    fn spec() -> ImageSpec {
        ImageSpec::new("token", "https://example.com/talos.raw.xz", "arm")
    }

    #[test]
    fn test_parse_identity() {
        assert_eq!(parse_identity("123456").expect("numeric id"), 123_456);

        let err = parse_identity("talos").expect_err("not numeric");
        assert!(matches!(err, ProviderError::InvalidIdentity { ref id, .. } if id == "talos"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_defaults() {
        let mut spec = spec();
        spec.compression = None;
        spec.format = Some(String::new());

        let options = upload_options(&spec).expect("valid spec");

        assert_eq!(options.compression, Compression::None);
        assert_eq!(options.format, ImageFormat::Raw);
        assert_eq!(options.architecture, Architecture::Arm);
        assert!(options.server_type.is_none());
    }

    #[test]
    fn test_unsupported_values_name_field() {
        let cases = [
            ("compression", "gzip"),
            ("format", "vmdk"),
            ("architecture", "mips"),
        ];

        for (field, value) in cases {
            let mut spec = spec();
            match field {
                "compression" => spec.compression = Some(value.to_string()),
                "format" => spec.format = Some(value.to_string()),
                _ => spec.architecture = value.to_string(),
            }

            let err = upload_options(&spec).expect_err("unsupported value");
            assert_eq!(err.to_string(), format!("Unsupported value for {field}: {value}"));
        }
    }

    #[test]
    fn test_invalid_url() {
        let mut spec = spec();
        spec.image_url = Some(String::from("::not a url"));

        let err = upload_options(&spec).expect_err("invalid url");
        assert!(matches!(
            err,
            ProviderError::Validation { field: Some(ref f), .. } if f == "image_url"
        ));
    }

    #[tokio::test]
    async fn test_server_type_not_found() {
        let mut api = MockImageApi::new();
        api.expect_get_server_type_by_name()
            .withf(|name| name == "cx99")
            .returning(|_| Ok(None));

        let err = resolve_server_type(&api, "cx99").await.expect_err("unknown type");
        assert!(matches!(err, ProviderError::NotFound { ref name, .. } if name == "cx99"));
    }

    #[tokio::test]
    async fn test_server_type_lookup_failure() {
        let mut api = MockImageApi::new();
        api.expect_get_server_type_by_name()
            .returning(|_| Err(HcloudError::network("connection reset")));

        let err = resolve_server_type(&api, "cax11").await.expect_err("lookup fails");
        assert!(matches!(err, ProviderError::Remote(HcloudError::Network { .. })));
    }
}
