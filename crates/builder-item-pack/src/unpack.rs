use std::io::{Cursor, Read};
use std::path::Path;

use builder_types::THUMBNAIL_PATH;
use bytes::Bytes;
use tracing::{debug, info};

use crate::bundle::{ContentMap, UploadBundle};
use crate::error::ItemPackError;
use crate::extensions::{is_3d_model_path, is_image_file};
use crate::manifest::{AssetManifest, ASSET_MANIFEST};

/// Upload ceiling applied to every archive entry and to single-file drops.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 20 * 1024 * 1024;

/// Result of ingesting one drop, before any model processing.
#[derive(Debug, Clone)]
pub struct UnpackedArchive {
    /// Path of the main file inside `bundle`.
    pub model_path: String,
    pub bundle: UploadBundle,
    pub manifest: Option<AssetManifest>,
}

/// Wrap a single dropped model or image file.
pub fn load_single_file(
    file_name: &str,
    blob: Bytes,
    max_file_size: u64,
) -> Result<UnpackedArchive, ItemPackError> {
    let size = blob.len() as u64;
    if size > max_file_size {
        return Err(ItemPackError::FileTooBig {
            path: file_name.to_owned(),
            size,
            max: max_file_size,
        });
    }

    Ok(UnpackedArchive {
        model_path: file_name.to_owned(),
        bundle: UploadBundle::single(file_name, blob),
        manifest: None,
    })
}

/// Unpack a zipped upload into a bundle.
///
/// Hidden entries (any path segment starting with `.`), directories and
/// entries that would escape the archive root are skipped. The manifest is
/// parsed first, then the main model is located, then every retained entry
/// is read; the first entry above `max_file_size` aborts the whole import.
pub fn unpack_archive(raw: &[u8], max_file_size: u64) -> Result<UnpackedArchive, ItemPackError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(raw))?;

    let mut file_names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let file = archive.by_index_raw(i)?;
        if file.is_dir() || file.enclosed_name().is_none() || is_hidden(file.name()) {
            debug!(entry = %file.name(), "skipping archive entry");
            continue;
        }
        file_names.push((i, file.name().to_owned()));
    }

    let manifest = match file_names.iter().find(|(_, name)| basename(name) == ASSET_MANIFEST) {
        Some((index, name)) => {
            let raw = read_entry(&mut archive, *index, name, max_file_size)?;
            Some(AssetManifest::parse(&raw)?)
        }
        None => None,
    };

    let model_path = pick_model_path(file_names.iter().map(|(_, name)| name.as_str()))
        .ok_or(ItemPackError::MissingModelFile)?
        .to_owned();

    let mut entries = ContentMap::new();
    for (index, name) in &file_names {
        let blob = read_entry(&mut archive, *index, name, max_file_size)?;
        entries.insert(name.clone(), blob);
    }

    let bundle = UploadBundle::new(entries);
    info!(
        model = %model_path,
        entries = bundle.len(),
        bytes = bundle.total_size(),
        has_manifest = manifest.is_some(),
        "archive unpacked"
    );

    Ok(UnpackedArchive {
        model_path,
        bundle,
        manifest,
    })
}

/// A 3D model wins over a flat image; the thumbnail is never the main file.
fn pick_model_path<'a>(names: impl Iterator<Item = &'a str> + Clone) -> Option<&'a str> {
    names.clone().find(|n| is_3d_model_path(n)).or_else(|| {
        names
            .clone()
            .find(|n| is_image_file(n) && basename(n) != THUMBNAIL_PATH)
    })
}

fn read_entry(
    archive: &mut zip::ZipArchive<Cursor<&[u8]>>,
    index: usize,
    name: &str,
    max_file_size: u64,
) -> Result<Bytes, ItemPackError> {
    let file = archive.by_index(index)?;
    let too_big = |size: u64| ItemPackError::FileTooBig {
        path: name.to_owned(),
        size,
        max: max_file_size,
    };

    if file.size() > max_file_size {
        return Err(too_big(file.size()));
    }

    // The declared size can lie; never read more than one byte past the ceiling.
    let mut buf = Vec::with_capacity(file.size() as usize);
    file.take(max_file_size + 1).read_to_end(&mut buf)?;
    if buf.len() as u64 > max_file_size {
        return Err(too_big(buf.len() as u64));
    }

    Ok(Bytes::from(buf))
}

fn is_hidden(name: &str) -> bool {
    name.split('/').any(|segment| segment.starts_with('.'))
}

fn basename(name: &str) -> &str {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use builder_types::{Rarity, WearableCategory};
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, data) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn unpacks_model_texture_and_manifest() {
        let raw = zip_of(&[
            ("model.glb", b"glTF-binary"),
            ("texture.png", b"\x89PNG-data"),
            ("asset.json", br#"{"rarity":"common","category":"hat"}"#),
        ]);

        let unpacked = unpack_archive(&raw, DEFAULT_MAX_FILE_SIZE).unwrap();
        assert_eq!(unpacked.model_path, "model.glb");
        assert_eq!(unpacked.bundle.len(), 3);
        assert!(unpacked.bundle.contains("texture.png"));
        assert!(unpacked.bundle.contains("asset.json"));

        let manifest = unpacked.manifest.unwrap();
        assert_eq!(manifest.rarity, Some(Rarity::Common));
        assert_eq!(manifest.category, Some(WearableCategory::Hat));
    }

    #[test]
    fn skips_hidden_entries_and_directories() {
        let raw = zip_of(&[
            ("hat/", b""),
            ("hat/model.gltf", b"{}"),
            (".DS_Store", b"junk"),
            ("__MACOSX/hat/._model.gltf", b"junk"),
            (".git/config", b"junk"),
        ]);

        let unpacked = unpack_archive(&raw, DEFAULT_MAX_FILE_SIZE).unwrap();
        assert_eq!(unpacked.model_path, "hat/model.gltf");
        assert_eq!(
            unpacked.bundle.paths().collect::<Vec<_>>(),
            vec!["hat/model.gltf"]
        );
    }

    #[test]
    fn prefers_3d_model_over_image() {
        let raw = zip_of(&[("texture.png", b"png"), ("model.vrm", b"vrm")]);
        let unpacked = unpack_archive(&raw, DEFAULT_MAX_FILE_SIZE).unwrap();
        assert_eq!(unpacked.model_path, "model.vrm");
    }

    #[test]
    fn image_is_main_file_when_no_model_present() {
        let raw = zip_of(&[("thumbnail.png", b"png"), ("eyes.png", b"png")]);
        let unpacked = unpack_archive(&raw, DEFAULT_MAX_FILE_SIZE).unwrap();
        assert_eq!(unpacked.model_path, "eyes.png");
    }

    #[test]
    fn missing_model_fails_without_bundle() {
        let raw = zip_of(&[("readme.txt", b"hello"), ("thumbnail.png", b"png")]);
        let err = unpack_archive(&raw, DEFAULT_MAX_FILE_SIZE).unwrap_err();
        assert!(matches!(err, ItemPackError::MissingModelFile));
    }

    #[test]
    fn first_oversized_entry_fails_the_import() {
        let raw = zip_of(&[
            ("a.glb", b"small"),
            ("b.png", b"this entry is far too large"),
            ("c.png", b"this one is also far too large"),
        ]);

        let err = unpack_archive(&raw, 8).unwrap_err();
        match err {
            ItemPackError::FileTooBig { path, size, max } => {
                assert_eq!(path, "b.png");
                assert_eq!(max, 8);
                assert!(size > 8);
            }
            other => panic!("expected FileTooBig, got {other:?}"),
        }
    }

    #[test]
    fn malformed_manifest_surfaces_decode_error() {
        let raw = zip_of(&[("model.glb", b"glb"), ("nested/asset.json", b"{oops")]);
        let err = unpack_archive(&raw, DEFAULT_MAX_FILE_SIZE).unwrap_err();
        assert!(matches!(err, ItemPackError::ManifestDecode(_)));
    }

    #[test]
    fn single_file_over_ceiling_is_rejected() {
        let max = 20 * 1024 * 1024;
        let blob = Bytes::from(vec![0u8; 21 * 1024 * 1024]);
        let err = load_single_file("huge.glb", blob, max).unwrap_err();
        assert!(matches!(err, ItemPackError::FileTooBig { .. }));

        let ok = load_single_file("hat.glb", Bytes::from_static(b"glb"), max).unwrap();
        assert_eq!(ok.model_path, "hat.glb");
        assert!(ok.manifest.is_none());
    }

    #[test]
    fn garbage_is_a_zip_error() {
        assert!(matches!(
            unpack_archive(b"definitely not a zip", DEFAULT_MAX_FILE_SIZE),
            Err(ItemPackError::Zip(_))
        ));
    }
}
