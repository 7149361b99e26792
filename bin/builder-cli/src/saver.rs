//! Local stand-ins for the save pipeline and the wallet.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, bail};
use async_trait::async_trait;
use builder_core::{ItemSaver, WalletProvider};
use builder_item_pack::ContentMap;
use builder_types::ItemRecord;
use tracing::{debug, info};

/// Writes `<root>/<item id>/item.json` plus every content blob under the
/// same directory, keyed by its content path.
#[derive(Debug, Clone)]
pub struct DirectorySaver {
    root: PathBuf,
}

impl DirectorySaver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn item_dir(&self, item: &ItemRecord) -> PathBuf {
        self.root.join(item.id.to_string())
    }
}

#[async_trait]
impl ItemSaver for DirectorySaver {
    async fn save(&self, item: &ItemRecord, contents: &ContentMap) -> anyhow::Result<()> {
        let dir = self.item_dir(item);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;

        for (path, blob) in contents {
            let target = dir.join(content_path(path)?);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, blob)
                .await
                .with_context(|| format!("failed to write {}", target.display()))?;
            debug!(path = %target.display(), size = blob.len(), "content written");
        }

        let json = serde_json::to_vec_pretty(item)?;
        tokio::fs::write(dir.join("item.json"), json).await?;
        info!(item_id = %item.id, dir = %dir.display(), files = contents.len(), "item written");
        Ok(())
    }
}

/// Content paths must stay inside the item directory.
fn content_path(path: &str) -> anyhow::Result<&Path> {
    let relative = Path::new(path);
    if path.is_empty() || !relative.components().all(|c| matches!(c, Component::Normal(_))) {
        bail!("refusing to write content path '{path}'");
    }
    Ok(relative)
}

/// A wallet that always reports the address it was given.
#[derive(Debug, Clone)]
pub struct StaticWallet(pub String);

#[async_trait]
impl WalletProvider for StaticWallet {
    async fn address(&self) -> anyhow::Result<String> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("builder-cli-{name}-{}", std::process::id()))
    }

    fn item() -> ItemRecord {
        serde_json::from_value(serde_json::json!({
            "id": "6f1c1b9e-8e4c-4c86-9a53-1c8a2d7f6a10",
            "name": "hat",
            "description": "",
            "thumbnail": "thumbnail.png",
            "type": "wearable",
            "totalSupply": 0,
            "isPublished": false,
            "isApproved": false,
            "inCatalyst": false,
            "data": {
                "category": "hat",
                "representations": [],
                "replaces": [],
                "hides": [],
                "tags": []
            },
            "owner": "0xowner",
            "metrics": {
                "triangles": 1, "materials": 1, "textures": 1,
                "meshes": 1, "bodies": 1, "entities": 1
            },
            "contents": {},
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn content_paths_stay_relative() {
        assert!(content_path("male/hat.glb").is_ok());
        assert!(content_path("thumbnail.png").is_ok());
        assert!(content_path("../escape.glb").is_err());
        assert!(content_path("/etc/passwd").is_err());
        assert!(content_path("male/../../x").is_err());
        assert!(content_path("").is_err());
    }

    #[tokio::test]
    async fn writes_record_and_contents() {
        let root = scratch_dir("save");
        let saver = DirectorySaver::new(&root);
        let item = item();
        let contents = ContentMap::from([
            ("male/hat.glb".to_owned(), Bytes::from_static(b"glb")),
            ("thumbnail.png".to_owned(), Bytes::from_static(b"png")),
        ]);

        saver.save(&item, &contents).await.unwrap();

        let dir = saver.item_dir(&item);
        assert_eq!(std::fs::read(dir.join("male/hat.glb")).unwrap(), b"glb");
        let saved: ItemRecord =
            serde_json::from_slice(&std::fs::read(dir.join("item.json")).unwrap()).unwrap();
        assert_eq!(saved, item);

        std::fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn static_wallet_reports_address() {
        let wallet = StaticWallet("0xabc".into());
        assert_eq!(wallet.address().await.unwrap(), "0xabc");
    }
}
