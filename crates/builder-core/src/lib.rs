//! Item creation workflow.
//!
//! A [`CreateItemSession`] takes one dropped upload through the steps of
//! authoring a wearable or emote:
//!
//! 1. unpack the upload (`builder-item-pack`),
//! 2. derive metrics and a thumbnail through a [`ModelRenderer`],
//! 3. collect the remaining details from the user,
//! 4. sort the contents per body shape, hash them and assemble an
//!    [`ItemRecord`](builder_types::ItemRecord),
//! 5. hand the record to an [`ItemSaver`], after an optional pricing step
//!    for emotes.
//!
//! Rendering, hashing, persistence and the wallet are collaborators behind
//! traits. [`GltfInspector`] and [`Sha256Hasher`] are the built-in
//! implementations used by the CLI.

pub mod assemble;
pub mod config;
pub mod error;
pub mod features;
pub mod gltf;
pub mod hash;
pub mod object_url;
pub mod process;
pub mod render;
pub mod session;
pub mod sort;
pub mod thumbnail;
pub mod view;

pub use assemble::{AssembledItem, AssemblyContext, FormState, ItemAssembler};
pub use config::Config;
pub use error::{AssembleError, ProcessError, ViewError, WorkflowError};
pub use features::{FeatureFlags, FeatureName};
pub use gltf::GltfInspector;
pub use hash::{ContentHasher, Sha256Hasher};
pub use object_url::{ObjectUrl, ObjectUrlRegistry};
pub use process::{ModelProcessor, ProcessedModel};
pub use render::{ModelData, ModelRenderer, RenderOptions, ThumbnailType};
pub use session::{
    clean_asset_name, Collaborators, CreateItemSession, DroppedFile, ItemSaver, SessionMetadata,
    SubmitOutcome, ThumbnailAction, WalletProvider,
};
pub use sort::{sort_content, SortedContent};
pub use view::{CreateItemView, ViewMachine};
