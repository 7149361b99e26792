use std::sync::Arc;

use builder_item_pack::UploadBundle;
use builder_item_pack::extensions::{extension_of, is_image_file};
use builder_types::{ItemKind, ModelMetrics, THUMBNAIL_PATH, WearableCategory, WearableMetrics};
use bytes::Bytes;
use tracing::{debug, info};

use crate::error::ProcessError;
use crate::object_url::ObjectUrlRegistry;
use crate::render::{ModelData, ModelRenderer, RenderOptions, ThumbnailType};
use crate::thumbnail::image_to_wearable_thumbnail;

/// Metrics and preview derived from an upload's main file.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedModel {
    pub model_path: String,
    /// PNG `data:` URL.
    pub thumbnail: String,
    pub metrics: ModelMetrics,
    pub kind: ItemKind,
}

/// Derives metrics and thumbnails, either from a flat image or through the
/// renderer.
pub struct ModelProcessor {
    renderer: Arc<dyn ModelRenderer>,
    urls: ObjectUrlRegistry,
    thumbnail_size: u32,
}

impl std::fmt::Debug for ModelProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelProcessor")
            .field("urls", &self.urls)
            .field("thumbnail_size", &self.thumbnail_size)
            .finish_non_exhaustive()
    }
}

impl ModelProcessor {
    pub fn new(renderer: Arc<dyn ModelRenderer>, thumbnail_size: u32) -> Self {
        Self {
            renderer,
            urls: ObjectUrlRegistry::new(),
            thumbnail_size,
        }
    }

    pub fn object_urls(&self) -> &ObjectUrlRegistry {
        &self.urls
    }

    /// Process the main file of `bundle`.
    ///
    /// Images get fixed placeholder metrics. Models go through the renderer;
    /// renderer errors are returned as they are and the temporary object URL
    /// is revoked either way.
    pub async fn process(
        &self,
        model_path: &str,
        bundle: &UploadBundle,
        category: Option<WearableCategory>,
    ) -> Result<ProcessedModel, ProcessError> {
        if is_image_file(model_path) {
            let thumbnail = self.image_thumbnail(model_path, bundle, category).await?;
            debug!(model = %model_path, "image wearable processed");
            return Ok(ProcessedModel {
                model_path: model_path.to_owned(),
                thumbnail,
                metrics: ModelMetrics::Wearable(WearableMetrics::IMAGE_PLACEHOLDER),
                kind: ItemKind::Wearable,
            });
        }

        let data = self.render(model_path, bundle, ThumbnailType::Default).await?;
        let metrics = if self.renderer.reports_doubled_textures() {
            halve_textures(data.metrics)
        } else {
            data.metrics
        };

        info!(model = %model_path, kind = %data.kind, "model processed");
        Ok(ProcessedModel {
            model_path: model_path.to_owned(),
            thumbnail: data.image,
            metrics,
            kind: data.kind,
        })
    }

    /// Re-derive only the thumbnail, framed for `category`.
    pub async fn render_thumbnail(
        &self,
        model_path: &str,
        bundle: &UploadBundle,
        category: Option<WearableCategory>,
    ) -> Result<String, ProcessError> {
        if is_image_file(model_path) {
            return self.image_thumbnail(model_path, bundle, category).await;
        }
        let data = self
            .render(model_path, bundle, ThumbnailType::for_category(category))
            .await?;
        Ok(data.image)
    }

    async fn render(
        &self,
        model_path: &str,
        bundle: &UploadBundle,
        thumbnail_type: ThumbnailType,
    ) -> Result<ModelData, ProcessError> {
        let blob = entry(bundle, model_path)?;
        let url = self.urls.create(blob);
        let options = RenderOptions {
            width: self.thumbnail_size,
            height: self.thumbnail_size,
            extension: extension_of(model_path),
            thumbnail_type,
        };
        self.renderer
            .get_model_data(&url, &options)
            .await
            .map_err(ProcessError::Render)
    }

    async fn image_thumbnail(
        &self,
        model_path: &str,
        bundle: &UploadBundle,
        category: Option<WearableCategory>,
    ) -> Result<String, ProcessError> {
        // A bundled thumbnail takes precedence over the image itself.
        let source = match bundle.get(THUMBNAIL_PATH) {
            Some(thumbnail) => thumbnail.clone(),
            None => entry(bundle, model_path)?,
        };
        let size = self.thumbnail_size;
        tokio::task::spawn_blocking(move || image_to_wearable_thumbnail(&source, category, size)).await?
    }
}

fn entry(bundle: &UploadBundle, path: &str) -> Result<Bytes, ProcessError> {
    bundle
        .get(path)
        .cloned()
        .ok_or_else(|| ProcessError::MissingEntry(path.to_owned()))
}

/// Undo the renderer's double count of wearable textures, rounding half up.
fn halve_textures(metrics: ModelMetrics) -> ModelMetrics {
    match metrics {
        ModelMetrics::Wearable(mut wearable) => {
            wearable.textures = wearable.textures.div_ceil(2);
            ModelMetrics::Wearable(wearable)
        }
        emote => emote,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_url::ObjectUrl;
    use crate::thumbnail::{PNG_MIME, to_data_url};
    use async_trait::async_trait;
    use builder_types::EmoteMetrics;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use std::sync::Mutex;

    /// Returns canned data and remembers what it was asked to render.
    struct StubRenderer {
        metrics: ModelMetrics,
        kind: ItemKind,
        fail: bool,
        seen: Mutex<Vec<(String, RenderOptions, bool)>>,
    }

    impl StubRenderer {
        fn wearable(textures: u64) -> Self {
            Self {
                metrics: ModelMetrics::Wearable(WearableMetrics {
                    triangles: 500,
                    materials: 2,
                    textures,
                    meshes: 1,
                    bodies: 1,
                    entities: 1,
                }),
                kind: ItemKind::Wearable,
                fail: false,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ModelRenderer for StubRenderer {
        async fn get_model_data(&self, url: &ObjectUrl, options: &RenderOptions) -> anyhow::Result<ModelData> {
            let live = url.resolve().is_ok();
            self.seen
                .lock()
                .unwrap()
                .push((url.as_str().to_owned(), options.clone(), live));
            if self.fail {
                anyhow::bail!("scene failed to load");
            }
            Ok(ModelData {
                metrics: self.metrics,
                image: to_data_url(PNG_MIME, b"snapshot"),
                kind: self.kind,
            })
        }
    }

    fn png() -> Bytes {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 255, 255])))
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        Bytes::from(out.into_inner())
    }

    #[tokio::test]
    async fn halves_reported_textures_and_revokes_url() {
        let renderer = Arc::new(StubRenderer::wearable(5));
        let processor = ModelProcessor::new(renderer.clone(), 64);
        let bundle = UploadBundle::single("hat.glb", Bytes::from_static(b"glb"));

        let processed = processor.process("hat.glb", &bundle, None).await.unwrap();
        let ModelMetrics::Wearable(metrics) = processed.metrics else {
            panic!("expected wearable metrics");
        };
        assert_eq!(metrics.textures, 3);
        assert_eq!(processed.kind, ItemKind::Wearable);

        let seen = renderer.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].2, "url must be live while rendering");
        assert_eq!(seen[0].1.extension.as_deref(), Some(".glb"));
        assert_eq!(processor.object_urls().live_count(), 0);
    }

    #[tokio::test]
    async fn renderer_error_propagates_and_url_is_released() {
        let mut stub = StubRenderer::wearable(2);
        stub.fail = true;
        let processor = ModelProcessor::new(Arc::new(stub), 64);
        let bundle = UploadBundle::single("hat.glb", Bytes::from_static(b"glb"));

        let err = processor.process("hat.glb", &bundle, None).await.unwrap_err();
        assert!(matches!(err, ProcessError::Render(_)));
        assert_eq!(err.to_string(), "scene failed to load");
        assert_eq!(processor.object_urls().live_count(), 0);
    }

    #[tokio::test]
    async fn emote_metrics_are_not_corrected() {
        let emote = EmoteMetrics {
            sequences: 1,
            duration: 2.0,
            frames: 60,
            fps: 30.0,
        };
        let stub = StubRenderer {
            metrics: ModelMetrics::Emote(emote),
            kind: ItemKind::Emote,
            fail: false,
            seen: Mutex::new(Vec::new()),
        };
        let processor = ModelProcessor::new(Arc::new(stub), 64);
        let bundle = UploadBundle::single("wave.glb", Bytes::from_static(b"glb"));

        let processed = processor.process("wave.glb", &bundle, None).await.unwrap();
        assert_eq!(processed.kind, ItemKind::Emote);
        assert_eq!(processed.metrics, ModelMetrics::Emote(emote));
    }

    #[tokio::test]
    async fn image_gets_placeholder_metrics_without_renderer() {
        let renderer = Arc::new(StubRenderer::wearable(2));
        let processor = ModelProcessor::new(renderer.clone(), 32);
        let bundle = UploadBundle::single("eyes.png", png());

        let processed = processor
            .process("eyes.png", &bundle, Some(WearableCategory::Eyes))
            .await
            .unwrap();
        assert_eq!(
            processed.metrics,
            ModelMetrics::Wearable(WearableMetrics::IMAGE_PLACEHOLDER)
        );
        assert!(processed.thumbnail.starts_with("data:image/png;base64,"));
        assert!(renderer.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn category_thumbnail_uses_preset() {
        let renderer = Arc::new(StubRenderer::wearable(2));
        let processor = ModelProcessor::new(renderer.clone(), 64);
        let bundle = UploadBundle::single("mask.glb", Bytes::from_static(b"glb"));

        processor
            .render_thumbnail("mask.glb", &bundle, Some(WearableCategory::Eyebrows))
            .await
            .unwrap();
        let seen = renderer.seen.lock().unwrap();
        assert_eq!(seen[0].1.thumbnail_type, ThumbnailType::Top);
        assert_eq!(processor.object_urls().live_count(), 0);
    }

    #[tokio::test]
    async fn missing_main_file_is_reported() {
        let processor = ModelProcessor::new(Arc::new(StubRenderer::wearable(2)), 64);
        let err = processor
            .process("hat.glb", &UploadBundle::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::MissingEntry(path) if path == "hat.glb"));
    }
}
