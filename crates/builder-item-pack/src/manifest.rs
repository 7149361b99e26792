use builder_types::{BodyShapeType, Rarity, WearableCategory};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::bundle::UploadBundle;
use crate::error::ItemPackError;

/// Basename of the optional manifest entry inside an uploaded archive.
pub const ASSET_MANIFEST: &str = "asset.json";

/// Optional pre-fill data shipped alongside the model in an archive.
///
/// Enum fields are decoded strictly: an unknown `rarity`, `category` or
/// `bodyShape` fails the whole import instead of being silently dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<WearableCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<Rarity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_shape: Option<BodyShapeType>,
    /// Path of an entry inside the archive to use as the initial thumbnail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Path of an entry inside the archive to use as the main model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl AssetManifest {
    pub fn parse(raw: &[u8]) -> Result<Self, ItemPackError> {
        Ok(serde_json::from_slice(raw)?)
    }

    /// Every path the manifest names must be part of `bundle`.
    pub fn validate_paths(&self, bundle: &UploadBundle) -> Result<(), ItemPackError> {
        let fields = [("thumbnail", &self.thumbnail), ("model", &self.model)];
        for (field, path) in fields {
            if let Some(path) = path {
                if !bundle.contains(path) {
                    return Err(ItemPackError::InvalidManifestPath {
                        field,
                        path: path.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
