//! A renderer backend that inspects glTF/GLB/VRM structure without drawing.

use std::collections::HashMap;

use anyhow::{Context, bail, ensure};
use async_trait::async_trait;
use builder_types::{EmoteMetrics, ItemKind, ModelMetrics, WearableMetrics};
use serde::Deserialize;
use tracing::debug;

use crate::object_url::ObjectUrl;
use crate::render::{ModelData, ModelRenderer, RenderOptions};
use crate::thumbnail::{PNG_MIME, placeholder_png, to_data_url};

const GLB_MAGIC: &[u8; 4] = b"glTF";
const GLB_HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;
const CHUNK_TYPE_JSON: u32 = 0x4E4F_534A;

/// Reads the glTF JSON document and counts what it declares.
///
/// Snapshots are a flat placeholder image, so callers that need a real
/// preview should plug in a drawing backend instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct GltfInspector;

#[async_trait]
impl ModelRenderer for GltfInspector {
    async fn get_model_data(&self, url: &ObjectUrl, options: &RenderOptions) -> anyhow::Result<ModelData> {
        let raw = url.resolve()?;
        let size = options.width.max(options.height);

        tokio::task::spawn_blocking(move || -> anyhow::Result<ModelData> {
            let document = parse_document(&raw)?;
            let metrics = document.metrics();
            let png = placeholder_png(size)?;
            debug!(kind = %metrics.kind(), "gltf inspected");
            Ok(ModelData {
                kind: metrics.kind(),
                metrics,
                image: to_data_url(PNG_MIME, &png),
            })
        })
        .await
        .context("gltf inspection task failed")?
    }

    fn reports_doubled_textures(&self) -> bool {
        false
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GltfDocument {
    accessors: Vec<Accessor>,
    animations: Vec<Animation>,
    materials: Vec<serde_json::Value>,
    meshes: Vec<Mesh>,
    nodes: Vec<serde_json::Value>,
    textures: Vec<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Accessor {
    count: u64,
    max: Option<Vec<f64>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Mesh {
    primitives: Vec<Primitive>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Primitive {
    attributes: HashMap<String, usize>,
    indices: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Animation {
    samplers: Vec<AnimationSampler>,
}

#[derive(Debug, Default, Deserialize)]
struct AnimationSampler {
    input: usize,
}

impl GltfDocument {
    fn metrics(&self) -> ModelMetrics {
        if self.animations.is_empty() {
            ModelMetrics::Wearable(self.wearable_metrics())
        } else {
            ModelMetrics::Emote(self.emote_metrics())
        }
    }

    fn accessor_count(&self, index: usize) -> u64 {
        self.accessors.get(index).map_or(0, |a| a.count)
    }

    fn wearable_metrics(&self) -> WearableMetrics {
        let primitives = || self.meshes.iter().flat_map(|m| &m.primitives);
        let triangles = primitives()
            .map(|p| {
                let vertices = p
                    .indices
                    .or_else(|| p.attributes.get("POSITION").copied())
                    .map_or(0, |i| self.accessor_count(i));
                vertices / 3
            })
            .sum();

        WearableMetrics {
            triangles,
            materials: self.materials.len() as u64,
            textures: self.textures.len() as u64,
            meshes: self.meshes.len() as u64,
            bodies: primitives().count() as u64,
            entities: self.nodes.len() as u64,
        }
    }

    fn emote_metrics(&self) -> EmoteMetrics {
        let inputs = || {
            self.animations
                .iter()
                .flat_map(|a| &a.samplers)
                .filter_map(|s| self.accessors.get(s.input))
        };
        let duration = inputs()
            .filter_map(|a| a.max.as_ref().and_then(|m| m.first().copied()))
            .fold(0.0_f64, f64::max);
        let frames = inputs().map(|a| a.count).max().unwrap_or(0);
        let fps = if duration > 0.0 { frames as f64 / duration } else { 0.0 };

        EmoteMetrics {
            sequences: self.animations.len() as u64,
            duration,
            frames,
            fps,
        }
    }
}

fn parse_document(raw: &[u8]) -> anyhow::Result<GltfDocument> {
    let json = if raw.starts_with(GLB_MAGIC) { glb_json_chunk(raw)? } else { raw };
    serde_json::from_slice(json).context("invalid glTF JSON")
}

fn glb_json_chunk(raw: &[u8]) -> anyhow::Result<&[u8]> {
    let body = GLB_HEADER_LEN + CHUNK_HEADER_LEN;
    if raw.len() < body {
        bail!("truncated glb header ({} bytes)", raw.len());
    }
    let chunk_len = u32::from_le_bytes(raw[12..16].try_into()?) as usize;
    let chunk_type = u32::from_le_bytes(raw[16..20].try_into()?);
    ensure!(chunk_type == CHUNK_TYPE_JSON, "first glb chunk is not JSON");
    raw.get(body..body + chunk_len).context("truncated glb json chunk")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_url::ObjectUrlRegistry;
    use crate::render::ThumbnailType;
    use bytes::Bytes;

    const CUBE: &str = r#"{
        "asset": {"version": "2.0"},
        "meshes": [{"primitives": [{"attributes": {"POSITION": 0}, "indices": 1}]}],
        "accessors": [{"count": 8}, {"count": 36}],
        "materials": [{}],
        "textures": [{}, {}],
        "nodes": [{}, {}]
    }"#;

    const WAVE: &str = r#"{
        "nodes": [{}],
        "accessors": [{"count": 60, "max": [2.0]}],
        "animations": [{"samplers": [{"input": 0, "output": 0}], "channels": []}]
    }"#;

    fn glb(json: &str) -> Vec<u8> {
        let mut chunk = json.as_bytes().to_vec();
        while chunk.len() % 4 != 0 {
            chunk.push(b' ');
        }
        let total = (GLB_HEADER_LEN + CHUNK_HEADER_LEN + chunk.len()) as u32;
        let mut out = Vec::new();
        out.extend_from_slice(GLB_MAGIC);
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&total.to_le_bytes());
        out.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_TYPE_JSON.to_le_bytes());
        out.extend_from_slice(&chunk);
        out
    }

    fn options() -> RenderOptions {
        RenderOptions {
            width: 16,
            height: 16,
            extension: Some(".glb".into()),
            thumbnail_type: ThumbnailType::Default,
        }
    }

    #[test]
    fn counts_wearable_geometry() {
        let metrics = parse_document(CUBE.as_bytes()).unwrap().metrics();
        assert_eq!(
            metrics,
            ModelMetrics::Wearable(WearableMetrics {
                triangles: 12,
                materials: 1,
                textures: 2,
                meshes: 1,
                bodies: 1,
                entities: 2,
            })
        );
    }

    #[test]
    fn animations_make_an_emote() {
        let metrics = parse_document(WAVE.as_bytes()).unwrap().metrics();
        let ModelMetrics::Emote(emote) = metrics else {
            panic!("expected emote metrics, got {metrics:?}");
        };
        assert_eq!(emote.sequences, 1);
        assert_eq!(emote.frames, 60);
        assert!((emote.duration - 2.0).abs() < f64::EPSILON);
        assert!((emote.fps - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_truncated_glb() {
        assert!(parse_document(b"glTF\x02\x00").is_err());
    }

    #[tokio::test]
    async fn inspects_glb_through_object_url() {
        let registry = ObjectUrlRegistry::new();
        let url = registry.create(Bytes::from(glb(CUBE)));

        let data = GltfInspector.get_model_data(&url, &options()).await.unwrap();
        assert_eq!(data.kind, ItemKind::Wearable);
        assert!(data.image.starts_with("data:image/png;base64,"));
        assert!(!GltfInspector.reports_doubled_textures());
    }
}
