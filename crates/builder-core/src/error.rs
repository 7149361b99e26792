use builder_item_pack::ItemPackError;
use builder_types::UrnError;
use thiserror::Error;
use uuid::Uuid;

use crate::assemble::{RequiredField, ValidationBranch};
use crate::view::CreateItemView;

/// Failures while deriving metrics and a thumbnail from an upload.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The renderer could not load or snapshot the model.
    #[error(transparent)]
    Render(anyhow::Error),

    /// Decoding or encoding an image failed.
    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),

    /// The main file is not part of the bundle.
    #[error("model file '{0}' is not part of the upload")]
    MissingEntry(String),

    /// The object URL was revoked before the renderer resolved it.
    #[error("object url '{0}' is not registered")]
    ObjectUrl(String),

    /// A user-supplied thumbnail is not a PNG.
    #[error("wrong thumbnail format")]
    WrongThumbnailFormat,

    /// A thumbnail data URL could not be decoded.
    #[error("invalid thumbnail data url")]
    InvalidDataUrl,

    /// A `spawn_blocking` task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Failures while turning form state into an [`ItemRecord`](builder_types::ItemRecord).
#[derive(Debug, Error)]
pub enum AssembleError {
    /// The validation gate refused assembly.
    #[error("missing required field '{field}' for {branch} item")]
    MissingField {
        branch: ValidationBranch,
        field: RequiredField,
    },

    /// Nothing has been imported yet, so there is no id, model or content.
    #[error("no upload has been imported yet")]
    NotImported,

    /// The edit flow needs an existing item but none was supplied.
    #[error("no existing item to edit")]
    MissingExistingItem,

    /// The upload does not cover exactly the body shape the item lacks.
    #[error("item {item_id} is not missing the uploaded body shape")]
    IncompatibleRepresentation { item_id: Uuid },

    /// The content-addressing collaborator failed.
    #[error(transparent)]
    Hash(anyhow::Error),

    /// The owning collection URN could not be decoded.
    #[error("invalid collection urn: {0}")]
    ThirdPartyUrn(#[from] UrnError),
}

/// Invalid input to the view state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("cannot {event} from the {from} view")]
    InvalidTransition {
        from: CreateItemView,
        event: &'static str,
    },
}

/// Everything a [`CreateItemSession`](crate::session::CreateItemSession) call can fail with.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A drop arrived while the previous one was still loading.
    #[error("an import is already in progress")]
    Busy,

    #[error(transparent)]
    Pack(#[from] ItemPackError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error(transparent)]
    View(#[from] ViewError),

    /// The wallet could not report the current address.
    #[error("wallet unavailable: {0}")]
    Wallet(anyhow::Error),

    /// The save pipeline rejected the item.
    #[error(transparent)]
    Save(anyhow::Error),
}
