//! Hetzner Cloud API client implementation.
//!
//! This module provides the HTTP client for interacting with the Hetzner
//! Cloud REST API.

use async_trait::async_trait;
use reqwest::{header, Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::Credential;
use crate::error::{HcloudError, ProviderError, Result};

use super::api::ImageApi;
use super::types::{Image, ImageUpdate, ServerType};
use super::ApiResult;

/// Hetzner Cloud API base URL.
pub const HCLOUD_API_URL: &str = "https://api.hetzner.cloud/v1";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum number of attempts for transient failures.
const MAX_RETRIES: u32 = 3;

/// Delay between retries in milliseconds.
const RETRY_DELAY_MS: u64 = 1000;

/// Hetzner Cloud API client.
#[derive(Debug, Clone)]
pub struct HcloudClient {
    /// HTTP client.
    client: Client,
    /// API base URL without trailing slash.
    base_url: String,
    /// API token.
    token: Credential,
}

/// Error body returned by the API.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

/// Error details.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl HcloudClient {
    /// Creates a new client for the public API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(token: &Credential) -> Result<Self> {
        Self::with_endpoint(token, HCLOUD_API_URL, DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a client for a custom endpoint and timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_endpoint(token: &Credential, endpoint: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("hcloud-image-provider/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ProviderError::Remote(HcloudError::network(format!(
                    "Failed to create HTTP client: {e}"
                )))
            })?;

        Ok(Self {
            client,
            base_url: endpoint.trim_end_matches('/').to_string(),
            token: token.clone(),
        })
    }

    /// Sends a request, retrying transient failures.
    async fn send<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> ApiResult<Response> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                debug!("Retry attempt {attempt} of {MAX_RETRIES} for {method} {path}");
                tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt)))
                    .await;
            }

            match self.send_once(method.clone(), path, query, body).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| HcloudError::network("Max retries exceeded")))
    }

    /// Sends a single request and maps error statuses.
    async fn send_once<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> ApiResult<Response> {
        trace!("{method} {path}");

        let mut request = self
            .client
            .request(method, format!("{}{path}", self.base_url))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token.expose()));

        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| HcloudError::network(format!("Request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(HcloudError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        let body = response.text().await.unwrap_or_default();
        let (code, message) = serde_json::from_str::<ErrorResponse>(&body).map_or_else(
            |_| (String::from("unknown"), body.clone()),
            |e| (e.error.code, e.error.message),
        );

        Err(match status {
            StatusCode::NOT_FOUND => HcloudError::NotFound {
                resource: path.to_string(),
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                HcloudError::Unauthorized { message }
            }
            _ => HcloudError::api(status.as_u16(), code, message),
        })
    }

    /// Sends a request and decodes the JSON response.
    async fn request_json<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> ApiResult<T> {
        let response = self.send(method, path, query, body).await?;
        response.json().await.map_err(|e| HcloudError::InvalidResponse {
            message: format!("Failed to parse response: {e}"),
        })
    }
}

#[async_trait]
impl ImageApi for HcloudClient {
    async fn get_server_type_by_name(&self, name: &str) -> ApiResult<Option<ServerType>> {
        #[derive(Deserialize)]
        struct Body {
            server_types: Vec<ServerType>,
        }

        let body: Body = self
            .request_json(Method::GET, "/server_types", &[("name", name)], None::<&()>)
            .await?;

        Ok(body.server_types.into_iter().find(|t| t.name == name))
    }

    async fn get_image_by_id(&self, id: i64) -> ApiResult<Option<Image>> {
        #[derive(Deserialize)]
        struct Body {
            image: Image,
        }

        let path = format!("/images/{id}");
        match self
            .request_json::<Body, ()>(Method::GET, &path, &[], None)
            .await
        {
            Ok(body) => Ok(Some(body.image)),
            Err(HcloudError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn update_image(&self, id: i64, update: &ImageUpdate) -> ApiResult<Image> {
        #[derive(Deserialize)]
        struct Body {
            image: Image,
        }

        let path = format!("/images/{id}");
        let body: Body = self
            .request_json(Method::PUT, &path, &[], Some(update))
            .await?;

        Ok(body.image)
    }

    async fn delete_image(&self, id: i64) -> ApiResult<()> {
        let path = format!("/images/{id}");
        self.send(Method::DELETE, &path, &[], None::<&()>).await?;
        Ok(())
    }

    async fn list_images(&self, label_selector: &str) -> ApiResult<Vec<Image>> {
        #[derive(Deserialize)]
        struct Body {
            images: Vec<Image>,
        }

        let body: Body = self
            .request_json(
                Method::GET,
                "/images",
                &[("type", "snapshot"), ("label_selector", label_selector)],
                None::<&()>,
            )
            .await?;

        Ok(body.images)
    }
}
