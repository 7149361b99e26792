//! Upload ingestion for item authoring.
//!
//! Turns a dropped file (a single model/image, or a `.zip` bundle with an
//! optional `asset.json` manifest) into an immutable [`UploadBundle`].
//! Nothing here renders or hashes; that happens in `builder-core`.

pub mod bundle;
pub mod error;
pub mod extensions;
pub mod manifest;
pub mod unpack;

pub use bundle::{ContentMap, UploadBundle};
pub use error::ItemPackError;
pub use manifest::{AssetManifest, ASSET_MANIFEST};
pub use unpack::{load_single_file, unpack_archive, UnpackedArchive, DEFAULT_MAX_FILE_SIZE};
