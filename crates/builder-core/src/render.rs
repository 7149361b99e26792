//! Port to the 3D scene renderer that produces metrics and snapshots.

use async_trait::async_trait;
use builder_types::{ItemKind, ModelMetrics, WearableCategory};
use strum::Display;

use crate::object_url::ObjectUrl;

/// Camera preset used for a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ThumbnailType {
    #[default]
    Default,
    /// Looking down at the face; used for flat facial features.
    Top,
}

impl ThumbnailType {
    pub fn for_category(category: Option<WearableCategory>) -> Self {
        match category {
            Some(c) if c.is_image_category() => ThumbnailType::Top,
            _ => ThumbnailType::Default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    /// Extension of the main file, with the leading dot.
    pub extension: Option<String>,
    pub thumbnail_type: ThumbnailType,
}

/// What the renderer reports for one model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelData {
    pub metrics: ModelMetrics,
    /// PNG snapshot as a `data:` URL.
    pub image: String,
    pub kind: ItemKind,
}

#[async_trait]
pub trait ModelRenderer: Send + Sync {
    /// Load the model behind `url` and snapshot it.
    async fn get_model_data(&self, url: &ObjectUrl, options: &RenderOptions) -> anyhow::Result<ModelData>;

    /// Whether this backend counts every wearable texture twice.
    ///
    /// The processor halves the reported texture count when this is `true`.
    /// It is a workaround for a renderer bug and should be switched off for
    /// any backend that reports textures correctly.
    fn reports_doubled_textures(&self) -> bool {
        true
    }
}
