//! Identifiers issued by the DAM during an upload.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Accept an identifier the DAM may send either as a JSON string or a number.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Unsigned(n) => n.to_string(),
        RawId::Signed(n) => n.to_string(),
    })
}

/// Server-issued permission for exactly one binary transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSlot {
    pub upload_identifier: String,
    pub file_identifier: String,
    /// One-time target URL for the transfer step
    pub location: String,
}

/// Identifier of a finalized asset in the DAM.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for AssetId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        string_or_number(deserializer).map(AssetId)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client-side view of an asset created by a successful pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetRecord {
    pub asset_id: AssetId,
    pub file_name: String,
    /// Caption handed to the metadata writer (the fallback when captioning failed)
    pub caption: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Finalized {
        asset_id: AssetId,
    }

    #[test]
    fn test_asset_id_from_number() {
        let parsed: Finalized = serde_json::from_str(r#"{"asset_id": 38712}"#).unwrap();
        assert_eq!(parsed.asset_id.as_str(), "38712");
    }

    #[test]
    fn test_asset_id_from_string() {
        let parsed: Finalized = serde_json::from_str(r#"{"asset_id": "a-91"}"#).unwrap();
        assert_eq!(parsed.asset_id, AssetId::new("a-91"));
    }

    #[test]
    fn test_asset_id_rejects_objects() {
        let parsed: Result<Finalized, _> = serde_json::from_str(r#"{"asset_id": {"id": 1}}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_asset_id_serializes_as_plain_string() {
        let value = serde_json::to_value(AssetId::new("7")).unwrap();
        assert_eq!(value, serde_json::json!("7"));
    }
}
