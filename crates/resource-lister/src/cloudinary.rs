// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! [`AssetProvider`] backed by the Cloudinary Admin API.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::provider::{AssetProvider, PageQuery, ProviderError, ProviderPage};

const DEFAULT_API_BASE_URL: &str = "https://api.cloudinary.com";
const DEFAULT_RESOURCE_TYPE: &str = "image";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised while building a [`CloudinaryClient`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing Cloudinary setting: {0}")]
    Missing(&'static str),
    #[error("invalid Cloudinary API base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Account credentials and endpoint settings for the Admin API.
#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Root of the Admin API, overridable for testing.
    pub api_base_url: String,
    /// Resource type segment of the listing URL (`image`, `video` or `raw`).
    pub resource_type: String,
    /// Timeout applied to every provider call.
    pub request_timeout: Duration,
}

impl fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("resource_type", &self.resource_type)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl CloudinaryConfig {
    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            resource_type: DEFAULT_RESOURCE_TYPE.to_string(),
            request_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Point the client at a different API root (for example a local mock).
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = resource_type.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Credential strings that must never appear in client-visible output.
    pub fn secrets(&self) -> Vec<String> {
        vec![self.api_key.clone(), self.api_secret.clone()]
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.cloud_name.trim().is_empty() {
            return Err(ConfigError::Missing("cloud_name"));
        }
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::Missing("api_key"));
        }
        if self.api_secret.trim().is_empty() {
            return Err(ConfigError::Missing("api_secret"));
        }
        if self.resource_type.trim().is_empty() {
            return Err(ConfigError::Missing("resource_type"));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Authenticated Admin API client. Cheap to clone.
#[derive(Clone)]
pub struct CloudinaryClient {
    http: reqwest::Client,
    resources_url: Url,
    api_key: String,
    api_secret: String,
}

impl fmt::Debug for CloudinaryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudinaryClient")
            .field("resources_url", &self.resources_url.as_str())
            .finish_non_exhaustive()
    }
}

impl CloudinaryClient {
    pub fn new(config: &CloudinaryConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Self::new_with_client(config, http)
    }

    /// Same as [`CloudinaryClient::new`], but with a caller-supplied HTTP client.
    pub fn new_with_client(
        config: &CloudinaryConfig,
        http: reqwest::Client,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            url: config.api_base_url.clone(),
            reason,
        };
        let mut resources_url =
            Url::parse(&config.api_base_url).map_err(|e| invalid(e.to_string()))?;
        resources_url
            .path_segments_mut()
            .map_err(|_| invalid("URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend([
                "v1_1",
                config.cloud_name.as_str(),
                "resources",
                config.resource_type.as_str(),
            ]);

        Ok(Self {
            http,
            resources_url,
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    fn listing_url(&self, delivery_type: &str) -> Url {
        let mut url = self.resources_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(delivery_type);
        }
        url
    }
}

fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        // The URL carries the prefix and cursor; keep messages short.
        ProviderError::Transport(err.without_url().to_string())
    }
}

impl AssetProvider for CloudinaryClient {
    #[instrument(skip_all, fields(prefix = %query.prefix, max_results = query.max_results))]
    async fn list_page(&self, query: PageQuery<'_>) -> Result<ProviderPage, ProviderError> {
        let mut params = vec![
            ("prefix", query.prefix.to_string()),
            ("max_results", query.max_results.to_string()),
        ];
        if let Some(cursor) = query.next_cursor {
            params.push(("next_cursor", cursor.to_string()));
        }

        let response = self
            .http
            .get(self.listing_url(query.delivery_type))
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .query(&params)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .unwrap_or("unexpected response")
                        .to_string()
                });
            warn!(status = status.as_u16(), %message, "Cloudinary rejected listing call");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let page: ProviderPage =
            serde_json::from_slice(&body).map_err(|e| ProviderError::Decode(e.to_string()))?;
        debug!(
            received = page.resources.len(),
            has_cursor = page.next_cursor.is_some(),
            "Cloudinary page decoded"
        );
        Ok(page)
    }
}
