//! Client-credentials token exchange.

use anyhow::{Context, Result};
use async_trait::async_trait;
use captionhub_core::{Credential, IngestError, IngestResult, TokenProvider};
use serde::Deserialize;

use crate::{check_status, DamClient};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl DamClient {
    /// POST `{base}/oauth/token` with a `client_credentials` grant.
    pub async fn request_token(&self) -> Result<Credential> {
        let url = format!("{}/oauth/token", self.base_url);

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let response = self
            .client()
            .post(&url)
            .form(&form)
            .send()
            .await
            .context("Failed to send token request")?;

        let response = check_status(response)
            .await
            .context("Token endpoint rejected the client credentials")?;

        let body: TokenResponse = response
            .json()
            .await
            .context("Failed to parse token response as JSON")?;

        if body.access_token.trim().is_empty() {
            anyhow::bail!("Token response contained an empty access_token");
        }

        Ok(Credential::new(body.access_token))
    }
}

#[async_trait]
impl TokenProvider for DamClient {
    async fn acquire(&self) -> IngestResult<Credential> {
        let credential = self.request_token().await.map_err(IngestError::auth)?;
        tracing::debug!("Acquired DAM access token");
        Ok(credential)
    }
}
