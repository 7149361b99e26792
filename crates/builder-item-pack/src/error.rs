use thiserror::Error;

/// Errors raised while ingesting a dropped upload.
///
/// The first four variants are the user-facing import taxonomy; their
/// messages are shown verbatim as the inline import error.
#[derive(Debug, Error)]
pub enum ItemPackError {
    /// An entry, or the dropped file itself, exceeds the upload ceiling.
    #[error("The file {path} is too big ({size} bytes). The maximum allowed size is {max} bytes")]
    FileTooBig { path: String, size: u64, max: u64 },

    /// The dropped file has no recognizable extension.
    #[error("The file {0} has an unsupported extension")]
    WrongExtension(String),

    /// The drop was refused by the accepted-extension filter.
    #[error("Invalid files: {0}")]
    InvalidFiles(String),

    /// The archive holds no model or image entry.
    #[error("The zip file does not contain a model file")]
    MissingModelFile,

    /// `asset.json` is not valid JSON or carries an unknown enum value.
    #[error("Invalid asset.json: {0}")]
    ManifestDecode(#[from] serde_json::Error),

    /// `asset.json` points at a path that is not part of the upload.
    #[error("Invalid asset.json: {field} path '{path}' was not found in the upload")]
    InvalidManifestPath { field: &'static str, path: String },

    /// Failed to read the ZIP archive.
    #[error("ZIP extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
