use std::collections::BTreeMap;

use builder_types::THUMBNAIL_PATH;
use bytes::Bytes;

use crate::extensions::is_image_file;

/// Content path to blob. Ordered so every derived mapping is deterministic.
pub type ContentMap = BTreeMap<String, Bytes>;

/// The files of one upload, keyed by their path inside the upload.
///
/// Immutable once built: "changes" such as attaching a custom thumbnail
/// produce a new bundle and leave the original untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadBundle {
    entries: ContentMap,
}

impl UploadBundle {
    pub fn new(entries: ContentMap) -> Self {
        Self { entries }
    }

    /// A bundle made of one dropped file.
    pub fn single(path: impl Into<String>, blob: Bytes) -> Self {
        let mut entries = ContentMap::new();
        entries.insert(path.into(), blob);
        Self { entries }
    }

    /// A copy of this bundle with `path` set to `blob`.
    pub fn with_entry(&self, path: impl Into<String>, blob: Bytes) -> Self {
        let mut entries = self.entries.clone();
        entries.insert(path.into(), blob);
        Self { entries }
    }

    /// A copy of this bundle without `path`.
    pub fn without_entry(&self, path: &str) -> Self {
        let mut entries = self.entries.clone();
        entries.remove(path);
        Self { entries }
    }

    pub fn get(&self, path: &str) -> Option<&Bytes> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Bytes)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total size of all blobs in bytes.
    pub fn total_size(&self) -> u64 {
        self.entries.values().map(|b| b.len() as u64).sum()
    }

    /// The user supplied their own `thumbnail.png`.
    pub fn has_custom_thumbnail(&self) -> bool {
        self.contains(THUMBNAIL_PATH)
    }

    /// Every non-thumbnail entry is a flat image.
    pub fn is_image_only(&self) -> bool {
        let mut files = self.paths().filter(|p| *p != THUMBNAIL_PATH).peekable();
        files.peek().is_some() && files.all(is_image_file)
    }

    pub fn as_map(&self) -> &ContentMap {
        &self.entries
    }

    pub fn into_map(self) -> ContentMap {
        self.entries
    }
}

impl From<ContentMap> for UploadBundle {
    fn from(entries: ContentMap) -> Self {
        Self::new(entries)
    }
}

impl FromIterator<(String, Bytes)> for UploadBundle {
    fn from_iter<T: IntoIterator<Item = (String, Bytes)>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
