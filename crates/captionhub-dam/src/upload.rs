//! Three-step asset upload: request slot, transfer bytes, finalize.

use anyhow::{Context, Result};
use async_trait::async_trait;
use captionhub_core::models::string_or_number;
use captionhub_core::{
    AssetId, AssetUploader, Credential, IngestError, IngestResult, PendingFile, UploadSlot,
    UploadStep,
};
use reqwest::header::LOCATION;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use crate::{check_status, DamClient};

const NEW_ASSET_ACTION: &str = "NewAsset";
const ASSET_UPLOAD_CONFIGURATION: &str = "AssetUploadConfiguration";

#[derive(Debug, Serialize)]
struct NamedRef {
    name: &'static str,
}

#[derive(Debug, Serialize)]
struct SlotRequest<'a> {
    file_name: &'a str,
    file_size: u64,
    action: NamedRef,
    upload_configuration: NamedRef,
}

impl<'a> SlotRequest<'a> {
    fn new_asset(file: &'a PendingFile) -> Self {
        Self {
            file_name: file.file_name(),
            file_size: file.size(),
            action: NamedRef {
                name: NEW_ASSET_ACTION,
            },
            upload_configuration: NamedRef {
                name: ASSET_UPLOAD_CONFIGURATION,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct SlotResponse {
    #[serde(deserialize_with = "string_or_number")]
    upload_identifier: String,
    #[serde(deserialize_with = "string_or_number")]
    file_identifier: String,
}

#[derive(Debug, Serialize)]
struct FinalizeRequest<'a> {
    upload_identifier: &'a str,
    file_identifier: &'a str,
}

#[derive(Debug, Deserialize)]
struct FinalizeResponse {
    asset_id: AssetId,
}

impl DamClient {
    /// Step 1: reserve an upload slot. The transfer URL arrives in `Location`.
    pub async fn request_slot(
        &self,
        file: &PendingFile,
        credential: &Credential,
    ) -> Result<UploadSlot> {
        let url = self.build_url("/v2.0/upload");
        let request = self
            .client()
            .post(&url)
            .json(&SlotRequest::new_asset(file));
        let request = self.apply_auth(request, credential);

        let response = request
            .send()
            .await
            .context("Failed to send upload slot request")?;
        let response = check_status(response).await?;

        let location = response
            .headers()
            .get(LOCATION)
            .context("Upload slot response has no Location header")?
            .to_str()
            .context("Location header is not valid text")?
            .to_string();

        let body: SlotResponse = response
            .json()
            .await
            .context("Failed to parse upload slot response as JSON")?;

        if body.upload_identifier.trim().is_empty() || body.file_identifier.trim().is_empty() {
            anyhow::bail!("Upload slot response contained an empty identifier");
        }

        Ok(UploadSlot {
            upload_identifier: body.upload_identifier,
            file_identifier: body.file_identifier,
            location: self.resolve_location(&location),
        })
    }

    /// Step 2: send the raw bytes as the `file` part of a multipart body.
    pub async fn transfer(
        &self,
        slot: &UploadSlot,
        file: &PendingFile,
        credential: &Credential,
    ) -> Result<()> {
        let part = Part::bytes(file.data().to_vec())
            .file_name(file.file_name().to_string())
            .mime_str(file.content_type())
            .context("Invalid content type for multipart part")?;
        let form = Form::new().part("file", part);

        let request = self.client().post(&slot.location).multipart(form);
        let request = self.apply_auth(request, credential);

        let response = request
            .send()
            .await
            .context("Failed to send file bytes")?;
        check_status(response).await?;

        Ok(())
    }

    /// Step 3: turn the completed transfer into an asset.
    pub async fn finalize(&self, slot: &UploadSlot, credential: &Credential) -> Result<AssetId> {
        let url = self.build_url("/v2.0/upload/finalize");
        let body = FinalizeRequest {
            upload_identifier: &slot.upload_identifier,
            file_identifier: &slot.file_identifier,
        };
        let request = self.client().post(&url).json(&body);
        let request = self.apply_auth(request, credential);

        let response = request
            .send()
            .await
            .context("Failed to send finalize request")?;
        let response = check_status(response).await?;

        let body: FinalizeResponse = response
            .json()
            .await
            .context("Failed to parse finalize response as JSON")?;

        if body.asset_id.as_str().trim().is_empty() {
            anyhow::bail!("Finalize response contained an empty asset_id");
        }

        Ok(body.asset_id)
    }
}

#[async_trait]
impl AssetUploader for DamClient {
    async fn upload(&self, file: &PendingFile, credential: &Credential) -> IngestResult<AssetId> {
        let file_name = file.file_name();

        let slot = self
            .request_slot(file, credential)
            .await
            .map_err(|e| IngestError::upload(UploadStep::RequestSlot, file_name, e))?;
        tracing::debug!(
            file_name = %file_name,
            upload_identifier = %slot.upload_identifier,
            file_identifier = %slot.file_identifier,
            "Upload slot granted"
        );

        self.transfer(&slot, file, credential)
            .await
            .map_err(|e| IngestError::upload(UploadStep::Transfer, file_name, e))?;
        tracing::debug!(
            file_name = %file_name,
            bytes = file.size(),
            "File bytes transferred"
        );

        let asset_id = self
            .finalize(&slot, credential)
            .await
            .map_err(|e| IngestError::upload(UploadStep::Finalize, file_name, e))?;
        tracing::info!(
            file_name = %file_name,
            asset_id = %asset_id,
            "Upload finalized"
        );

        Ok(asset_id)
    }
}
