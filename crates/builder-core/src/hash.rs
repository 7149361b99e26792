use std::collections::BTreeMap;
use std::fmt::Write as _;

use anyhow::Context;
use async_trait::async_trait;
use builder_item_pack::ContentMap;
use sha2::{Digest, Sha256};

/// Content path to content hash.
pub type ContentHashes = BTreeMap<String, String>;

/// Content-addressing function applied to the final content mapping.
#[async_trait]
pub trait ContentHasher: Send + Sync {
    async fn compute_hashes(&self, contents: &ContentMap) -> anyhow::Result<ContentHashes>;
}

/// Lowercase hex SHA-256 of every blob.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

#[async_trait]
impl ContentHasher for Sha256Hasher {
    async fn compute_hashes(&self, contents: &ContentMap) -> anyhow::Result<ContentHashes> {
        let contents = contents.clone();
        tokio::task::spawn_blocking(move || {
            contents
                .iter()
                .map(|(path, blob)| (path.clone(), sha256_hex(blob)))
                .collect()
        })
        .await
        .context("content hashing task failed")
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
