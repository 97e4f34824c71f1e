//! HTTP client for the DAM (digital asset management) API.
//!
//! [`DamClient`] owns one reqwest client and the client-credentials identity.
//! It implements the three DAM-facing collaborator traits:
//! [`TokenProvider`](captionhub_core::TokenProvider) in [`token`],
//! [`AssetUploader`](captionhub_core::AssetUploader) in [`upload`] and
//! [`MetadataWriter`](captionhub_core::MetadataWriter) in [`metadata`].

pub mod metadata;
pub mod token;
pub mod upload;

use anyhow::{Context, Result};
use captionhub_core::{Credential, DamConfig};
use reqwest::{Client, RequestBuilder, Response};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

/// HTTP client for the DAM API.
#[derive(Clone)]
pub struct DamClient {
    client: Client,
    base_url: String,
    api_url: String,
    client_id: String,
    client_secret: String,
}

impl Debug for DamClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("DamClient")
            .field("base_url", &self.base_url)
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl DamClient {
    pub fn new(config: &DamConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client for DAM")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Absolute URL for a path under the API root.
    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// Transfer targets may come back host-relative; anchor them on the DAM host.
    pub fn resolve_location(&self, location: &str) -> String {
        if location.starts_with("http://") || location.starts_with("https://") {
            location.to_string()
        } else if location.starts_with('/') {
            format!("{}{}", self.base_url, location)
        } else {
            format!("{}/{}", self.base_url, location)
        }
    }

    fn apply_auth(&self, request: RequestBuilder, credential: &Credential) -> RequestBuilder {
        request.header(reqwest::header::AUTHORIZATION, credential.bearer())
    }

    fn client(&self) -> &Client {
        &self.client
    }
}

/// Turn a non-2xx response into an error carrying status and body.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(anyhow::anyhow!(
        "API request failed with status {}: {}",
        status,
        error_text
    ))
}
