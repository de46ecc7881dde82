//! Upload collaborator integration.
//!
//! The actual transfer of image bytes (temporary server, download,
//! decompression, snapshot) is performed by an external program. This module
//! wraps it behind the [`ImageUploader`] trait.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{Credential, TOKEN_ENV};
use crate::error::UploadError;

use super::api::ImageApi;
use super::types::{Compression, Image, ImageFormat, UploadOptions};

/// Label attached to every upload so the finished snapshot can be found again.
pub const UPLOAD_MARKER_LABEL: &str = "hcloud-image-provider/upload";

/// Message returned by a successful cleanup run.
pub const CLEANUP_SUCCESS_MESSAGE: &str = "Successfully cleaned up temporary resources";

/// Maximum amount of stderr kept in error messages.
const MAX_STDERR_CHARS: usize = 2048;

/// The external image upload subsystem.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ImageUploader: Send + Sync {
    /// Uploads an image and returns the finished snapshot.
    ///
    /// This is a single long-running call; retry policy, if any, is internal
    /// to the implementation.
    async fn upload(&self, options: &UploadOptions) -> Result<Image, UploadError>;

    /// Removes temporary servers and keys left behind by interrupted uploads.
    async fn cleanup_temp_resources(&self) -> Result<String, UploadError>;
}

/// Uploader driving the `hcloud-upload-image` program.
pub struct CommandUploader {
    /// Program to execute.
    program: String,
    /// API token handed to the program.
    token: Credential,
    /// API used to locate the finished snapshot.
    api: Arc<dyn ImageApi>,
}

impl CommandUploader {
    /// Creates a new uploader.
    #[must_use]
    pub fn new(program: impl Into<String>, token: Credential, api: Arc<dyn ImageApi>) -> Self {
        Self {
            program: program.into(),
            token,
            api,
        }
    }

    /// Runs the program and fails on a non-zero exit status.
    async fn run(&self, args: &[String]) -> Result<String, UploadError> {
        debug!("Running {} {}", self.program, args.first().map_or("", String::as_str));

        // Dropping the future (cancellation) kills the child.
        let output = Command::new(&self.program)
            .args(args)
            .env(TOKEN_ENV, self.token.expose())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| UploadError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            let start = stderr
                .char_indices()
                .rev()
                .nth(MAX_STDERR_CHARS)
                .map_or(0, |(i, _)| i);
            return Err(UploadError::CommandFailed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: stderr[start..].to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl std::fmt::Debug for CommandUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandUploader")
            .field("program", &self.program)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ImageUploader for CommandUploader {
    async fn upload(&self, options: &UploadOptions) -> Result<Image, UploadError> {
        let marker = Uuid::new_v4().to_string();
        info!("Uploading {} (marker {marker})", options.image_url);

        self.run(&upload_args(options, &marker)).await?;

        let selector = format!("{UPLOAD_MARKER_LABEL}={marker}");
        let image = self
            .api
            .list_images(&selector)
            .await?
            .into_iter()
            .max_by_key(|image| image.id)
            .ok_or(UploadError::ImageMissing { marker })?;

        info!("Upload finished: image {}", image.id);
        Ok(image)
    }

    async fn cleanup_temp_resources(&self) -> Result<String, UploadError> {
        let stdout = self.run(&[String::from("cleanup")]).await?;
        if !stdout.trim().is_empty() {
            debug!("cleanup output: {}", stdout.trim());
        }
        Ok(String::from(CLEANUP_SUCCESS_MESSAGE))
    }
}

/// Builds the command line of an upload run.
#[must_use]
pub fn upload_args(options: &UploadOptions, marker: &str) -> Vec<String> {
    let mut args = vec![
        String::from("upload"),
        String::from("--image-url"),
        options.image_url.to_string(),
        String::from("--architecture"),
        options.architecture.as_str().to_string(),
    ];

    if options.compression != Compression::None {
        args.push(String::from("--compression"));
        args.push(options.compression.as_str().to_string());
    }

    if options.format != ImageFormat::Raw {
        args.push(String::from("--format"));
        args.push(options.format.as_str().to_string());
    }

    if let Some(size) = options.image_size {
        args.push(String::from("--image-size"));
        args.push(size.to_string());
    }

    if let Some(server_type) = &options.server_type {
        args.push(String::from("--server-type"));
        args.push(server_type.name.clone());
    }

    if let Some(description) = &options.description {
        args.push(String::from("--description"));
        args.push(description.clone());
    }

    // Labels (sorted for determinism)
    let mut labels: Vec<_> = options
        .labels
        .iter()
        .filter(|(key, _)| key.as_str() != UPLOAD_MARKER_LABEL)
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    if labels.len() != options.labels.len() {
        warn!("Ignoring user label {UPLOAD_MARKER_LABEL}");
    }
    labels.sort_unstable();
    labels.push(format!("{UPLOAD_MARKER_LABEL}={marker}"));
    args.push(String::from("--labels"));
    args.push(labels.join(","));

    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hcloud::api::MockImageApi;
    use crate::hcloud::types::{Architecture, ServerType};
    use reqwest::Url;
    use std::collections::HashMap;

    fn options() -> UploadOptions {
        UploadOptions {
            image_url: Url::parse("https://example.com/talos.raw.xz").expect("valid url"),
            compression: Compression::Xz,
            format: ImageFormat::Raw,
            image_size: Some(1024),
            architecture: Architecture::Arm,
            server_type: Some(ServerType {
                id: 45,
                name: String::from("cax11"),
                architecture: Some(Architecture::Arm),
                cores: 2,
                disk: 40,
            }),
            description: Some(String::from("Talos")),
            labels: HashMap::from([
                (String::from("os"), String::from("talos")),
                (String::from("env"), String::from("prod")),
            ]),
        }
    }

    #[test]
    fn test_upload_args() {
        let args = upload_args(&options(), "m-1");

        assert_eq!(
            args,
            vec![
                "upload",
                "--image-url",
                "https://example.com/talos.raw.xz",
                "--architecture",
                "arm",
                "--compression",
                "xz",
                "--image-size",
                "1024",
                "--server-type",
                "cax11",
                "--description",
                "Talos",
                "--labels",
                "env=prod,os=talos,hcloud-image-provider/upload=m-1",
            ]
        );
    }

    #[test]
    fn test_upload_args_omit_defaults() {
        let mut opts = options();
        opts.compression = Compression::None;
        opts.image_size = None;
        opts.server_type = None;
        opts.description = None;
        opts.labels.clear();

        let args = upload_args(&opts, "m-2");

        assert!(!args.contains(&String::from("--compression")));
        assert!(!args.contains(&String::from("--format")));
        assert_eq!(
            args.last().map(String::as_str),
            Some("hcloud-image-provider/upload=m-2")
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let api = MockImageApi::new();
        let uploader = CommandUploader::new(
            "/nonexistent/hcloud-upload-image",
            Credential::new("t"),
            Arc::new(api),
        );

        let result = uploader.cleanup_temp_resources().await;

        assert!(matches!(result, Err(UploadError::Spawn { .. })));
    }

    #[cfg(unix)]
    fn write_script(dir: &std::path::Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-upload");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod script");
        path.display().to_string()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_upload_captures_stderr() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let program = write_script(dir.path(), "echo 'server creation failed' >&2\nexit 3");
        let mut api = MockImageApi::new();
        api.expect_list_images().times(0);

        let uploader = CommandUploader::new(program, Credential::new("t"), Arc::new(api));
        let result = uploader.upload(&options()).await;

        match result {
            Err(UploadError::CommandFailed { stderr, .. }) => {
                assert_eq!(stderr, "server creation failed");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_upload_locates_image_by_marker() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let program = write_script(dir.path(), "exit 0");
        let mut api = MockImageApi::new();
        api.expect_list_images()
            .withf(|selector| selector.starts_with("hcloud-image-provider/upload="))
            .times(1)
            .returning(|_| {
                Ok(vec![Image {
                    id: 99,
                    name: None,
                    description: String::from("Talos"),
                    created: chrono::Utc::now(),
                    disk_size: 20.0,
                    os_flavor: String::from("unknown"),
                    os_version: None,
                    status: crate::hcloud::types::ImageStatus::Available,
                    image_type: crate::hcloud::types::ImageType::Snapshot,
                    architecture: Some(Architecture::Arm),
                    labels: HashMap::new(),
                }])
            });

        let uploader = CommandUploader::new(program, Credential::new("t"), Arc::new(api));
        let image = uploader.upload(&options()).await.expect("upload succeeds");

        assert_eq!(image.id, 99);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_upload_without_resulting_image() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let program = write_script(dir.path(), "exit 0");
        let mut api = MockImageApi::new();
        api.expect_list_images().returning(|_| Ok(vec![]));

        let uploader = CommandUploader::new(program, Credential::new("t"), Arc::new(api));
        let result = uploader.upload(&options()).await;

        assert!(matches!(result, Err(UploadError::ImageMissing { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cleanup_message() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let program = write_script(dir.path(), "[ \"$1\" = cleanup ] || exit 1");

        let uploader =
            CommandUploader::new(program, Credential::new("t"), Arc::new(MockImageApi::new()));
        let message = uploader.cleanup_temp_resources().await.expect("cleanup succeeds");

        assert_eq!(message, CLEANUP_SUCCESS_MESSAGE);
    }
}
