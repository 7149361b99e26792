//! Splits an upload into per-body-shape content buckets.

use builder_item_pack::{ContentMap, UploadBundle};
use builder_types::{BodyShapeType, THUMBNAIL_PATH};

/// Content of one upload, keyed by prefixed path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortedContent {
    pub male: ContentMap,
    pub female: ContentMap,
    /// The thumbnail plus every entry of `male` and `female`.
    pub all: ContentMap,
}

/// `male/model.glb` for `(Male, "model.glb")`. Keys already carrying the
/// prefix are returned as they are.
pub fn prefix_content_name(shape: BodyShapeType, key: &str) -> String {
    let prefix = format!("{shape}/");
    if key.starts_with(&prefix) {
        key.to_owned()
    } else {
        format!("{prefix}{key}")
    }
}

/// A copy of every non-thumbnail entry, keyed under `shape`.
pub fn prefix_contents(shape: BodyShapeType, bundle: &UploadBundle) -> ContentMap {
    bundle
        .iter()
        .filter(|(key, _)| key.as_str() != THUMBNAIL_PATH)
        .map(|(key, blob)| (prefix_content_name(shape, key), blob.clone()))
        .collect()
}

pub fn sort_content(shape: BodyShapeType, bundle: &UploadBundle) -> SortedContent {
    let male = if shape.includes_male() {
        prefix_contents(BodyShapeType::Male, bundle)
    } else {
        ContentMap::new()
    };
    let female = if shape.includes_female() {
        prefix_contents(BodyShapeType::Female, bundle)
    } else {
        ContentMap::new()
    };

    let mut all = ContentMap::new();
    if let Some(thumbnail) = bundle.get(THUMBNAIL_PATH) {
        all.insert(THUMBNAIL_PATH.to_owned(), thumbnail.clone());
    }
    all.extend(male.iter().map(|(k, v)| (k.clone(), v.clone())));
    all.extend(female.iter().map(|(k, v)| (k.clone(), v.clone())));

    SortedContent { male, female, all }
}
