use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::item::ItemKind;

/// Geometry statistics reported for a wearable model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct WearableMetrics {
    pub triangles: u64,
    pub materials: u64,
    pub textures: u64,
    pub meshes: u64,
    pub bodies: u64,
    pub entities: u64,
}

impl WearableMetrics {
    /// Fixed metrics attached to image-only wearables, which carry no geometry of their own.
    pub const IMAGE_PLACEHOLDER: WearableMetrics = WearableMetrics {
        triangles: 100,
        materials: 1,
        textures: 1,
        meshes: 1,
        bodies: 1,
        entities: 1,
    };
}

/// Animation statistics reported for an emote.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct EmoteMetrics {
    pub sequences: u64,
    /// Seconds.
    pub duration: f64,
    pub frames: u64,
    pub fps: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ModelMetrics {
    Wearable(WearableMetrics),
    Emote(EmoteMetrics),
}

impl ModelMetrics {
    pub fn kind(&self) -> ItemKind {
        match self {
            ModelMetrics::Wearable(_) => ItemKind::Wearable,
            ModelMetrics::Emote(_) => ItemKind::Emote,
        }
    }
}
