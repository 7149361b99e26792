//! File extension classification for uploads.

use std::path::Path;

pub const ZIP_EXTENSION: &str = ".zip";

/// 3D model formats the renderer can load.
pub const MODEL_FILE_EXTENSIONS: &[&str] = &[".glb", ".gltf", ".vrm"];

/// Flat image formats accepted as image-category wearables.
pub const IMAGE_FILE_EXTENSIONS: &[&str] = &[".png"];

/// Accepted drops when replacing a model or adding a representation of a 3D item.
pub const MODEL_EXTENSIONS: &[&str] = &[".zip", ".glb", ".gltf", ".vrm"];

/// Accepted drops when replacing or adding a representation of an image item.
pub const IMAGE_EXTENSIONS: &[&str] = &[".zip", ".png"];

/// Accepted drops for a brand new item.
pub const ITEM_EXTENSIONS: &[&str] = &[".zip", ".glb", ".gltf", ".vrm", ".png"];

/// Lowercased extension including the leading dot, e.g. `".glb"`.
pub fn extension_of(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
}

fn has_extension(path: &str, set: &[&str]) -> bool {
    extension_of(path).is_some_and(|ext| set.contains(&ext.as_str()))
}

pub fn is_zip(path: &str) -> bool {
    has_extension(path, &[ZIP_EXTENSION])
}

/// True for 3D model files only.
pub fn is_3d_model_path(path: &str) -> bool {
    has_extension(path, MODEL_FILE_EXTENSIONS)
}

pub fn is_image_file(path: &str) -> bool {
    has_extension(path, IMAGE_FILE_EXTENSIONS)
}

/// A path that can act as the item's main file: a 3D model or a flat image.
pub fn is_model_path(path: &str) -> bool {
    is_3d_model_path(path) || is_image_file(path)
}
