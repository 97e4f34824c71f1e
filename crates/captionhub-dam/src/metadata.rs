//! Caption write-back onto the asset entity.

use anyhow::{Context, Result};
use async_trait::async_trait;
use captionhub_core::{AssetId, Credential, IngestError, IngestResult, MetadataWriter};
use serde::Serialize;

use crate::{check_status, DamClient};

const ASSET_ENTITY_DEFINITION: &str = "M.Asset";
const ENTITY_DEFINITION_TITLE: &str = "The entity definition for this entity";

#[derive(Debug, Serialize)]
struct EntityUpdate<'a> {
    #[serde(rename = "Properties")]
    properties: AltTextProperties<'a>,
    entitydefinition: EntityDefinitionRef,
}

#[derive(Debug, Serialize)]
struct AltTextProperties<'a> {
    #[serde(rename = "HAltText")]
    alt_text: &'a str,
}

#[derive(Debug, Serialize)]
struct EntityDefinitionRef {
    href: String,
    title: &'static str,
}

impl DamClient {
    fn alt_text_update<'a>(&self, caption: &'a str) -> EntityUpdate<'a> {
        EntityUpdate {
            properties: AltTextProperties { alt_text: caption },
            entitydefinition: EntityDefinitionRef {
                href: self.build_url(&format!("/entitydefinitions/{}", ASSET_ENTITY_DEFINITION)),
                title: ENTITY_DEFINITION_TITLE,
            },
        }
    }

    /// PUT `{api}/entities/{asset_id}` setting the alt-text property.
    pub async fn update_alt_text(
        &self,
        asset_id: &AssetId,
        caption: &str,
        credential: &Credential,
    ) -> Result<()> {
        let url = self.build_url(&format!("/entities/{}", asset_id));
        let request = self.client().put(&url).json(&self.alt_text_update(caption));
        let request = self.apply_auth(request, credential);

        let response = request
            .send()
            .await
            .context("Failed to send entity update request")?;
        check_status(response).await?;

        Ok(())
    }
}

#[async_trait]
impl MetadataWriter for DamClient {
    async fn attach_caption(
        &self,
        asset_id: &AssetId,
        caption: &str,
        credential: &Credential,
    ) -> IngestResult<()> {
        self.update_alt_text(asset_id, caption, credential)
            .await
            .map_err(|e| IngestError::metadata(asset_id, e))?;

        tracing::info!(asset_id = %asset_id, "Alt text attached to asset");
        Ok(())
    }
}
