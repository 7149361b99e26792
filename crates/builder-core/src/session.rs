//! Event adapter that drives one item through import, details and pricing.
//!
//! [`CreateItemSession`] owns the form state and the [`ViewMachine`] and
//! wires user input (drops, field edits, submit) to the unpacker, the model
//! processor and the assembler. Failures are returned to the caller and also
//! kept as a single inline message in [`CreateItemSession::error`].

use std::sync::Arc;

use async_trait::async_trait;
use builder_item_pack::extensions::{
    extension_of, is_zip, IMAGE_EXTENSIONS, ITEM_EXTENSIONS, MODEL_EXTENSIONS,
};
use builder_item_pack::{
    load_single_file, unpack_archive, ContentMap, ItemPackError, UnpackedArchive, UploadBundle,
};
use builder_types::{
    body_shape_type, is_third_party, missing_body_shape_type, BodyShapeType, EmotePlayMode, ItemCategory, ItemKind,
    ItemRecord, Rarity, WearableCategory, ITEM_NAME_MAX_LENGTH, THUMBNAIL_PATH,
};
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::assemble::{AssembledItem, AssemblyContext, FormState, ItemAssembler};
use crate::config::Config;
use crate::error::{AssembleError, ProcessError, ViewError, WorkflowError};
use crate::features::FeatureName;
use crate::hash::ContentHasher;
use crate::object_url::ObjectUrlRegistry;
use crate::process::{ModelProcessor, ProcessedModel};
use crate::render::ModelRenderer;
use crate::thumbnail::{is_png, prepare_custom_thumbnail, to_data_url, PNG_MIME};
use crate::view::{CreateItemView, ImportSnapshot, ViewEvent, ViewMachine};

/// Hands an assembled item to the external save pipeline.
#[async_trait]
pub trait ItemSaver: Send + Sync {
    async fn save(&self, item: &ItemRecord, contents: &ContentMap) -> anyhow::Result<()>;
}

/// Reports the address of the connected wallet.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn address(&self) -> anyhow::Result<String>;
}

#[derive(Clone)]
pub struct Collaborators {
    pub renderer: Arc<dyn ModelRenderer>,
    pub hasher: Arc<dyn ContentHasher>,
    pub saver: Arc<dyn ItemSaver>,
    pub wallet: Arc<dyn WalletProvider>,
}

/// How the session was opened.
#[derive(Debug, Clone, Default)]
pub struct SessionMetadata {
    pub collection_id: Option<String>,
    /// URN of the owning collection, used to detect third-party collections.
    pub collection_urn: Option<String>,
    /// Existing item to edit or extend.
    pub item: Option<ItemRecord>,
    pub add_representation: bool,
    pub change_item_file: bool,
}

/// A file handed over by the drop zone.
#[derive(Debug, Clone)]
pub struct DroppedFile {
    pub name: String,
    pub bytes: Bytes,
}

impl DroppedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The item went to the save pipeline and the session is closed.
    Saved(ItemRecord),
    /// An emote was assembled and waits for the pricing step.
    AwaitingPrice,
}

/// What opening the thumbnail dialog should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailAction {
    /// The emote thumbnail editor is now showing.
    Editor,
    /// Ask the user for a PNG and pass it to
    /// [`CreateItemSession::set_custom_thumbnail`].
    UploadCustom,
}

pub struct CreateItemSession {
    config: Config,
    metadata: SessionMetadata,
    processor: ModelProcessor,
    assembler: ItemAssembler,
    saver: Arc<dyn ItemSaver>,
    wallet: Arc<dyn WalletProvider>,
    form: FormState,
    view: ViewMachine,
    has_file: bool,
    is_loading: bool,
    error: Option<String>,
    pending: Option<AssembledItem>,
}

impl std::fmt::Debug for CreateItemSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateItemSession")
            .field("view", &self.view.view())
            .field("id", &self.form.id)
            .field("is_loading", &self.is_loading)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl CreateItemSession {
    pub fn new(config: Config, metadata: SessionMetadata, collaborators: Collaborators) -> Self {
        let form = initial_form(&metadata);
        Self {
            processor: ModelProcessor::new(collaborators.renderer, config.thumbnail_size),
            assembler: ItemAssembler::new(collaborators.hasher, config.network.clone()),
            saver: collaborators.saver,
            wallet: collaborators.wallet,
            config,
            metadata,
            form,
            view: ViewMachine::new(),
            has_file: false,
            is_loading: false,
            error: None,
            pending: None,
        }
    }

    // ── queries ──────────────────────────────────────────────────────────────

    pub fn view(&self) -> CreateItemView {
        self.view.view()
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    /// The inline error message, if the last action failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// The emote waiting in the pricing step.
    pub fn pending_item(&self) -> Option<&ItemRecord> {
        self.pending.as_ref().map(|p| &p.item)
    }

    pub fn object_urls(&self) -> &ObjectUrlRegistry {
        self.processor.object_urls()
    }

    pub fn is_third_party(&self) -> bool {
        self.metadata.collection_urn.as_deref().is_some_and(is_third_party)
    }

    /// An id is allocated and the validation gate passes.
    pub fn is_valid(&self) -> bool {
        self.form.id.is_some() && self.form.validate(self.is_third_party()).is_ok()
    }

    /// Opened on an existing item to add its missing representation.
    pub fn is_adding_representation(&self) -> bool {
        self.metadata.item.is_some() && !self.metadata.change_item_file
    }

    /// Extensions the drop zone should accept.
    pub fn accepted_extensions(&self) -> &'static [&'static str] {
        if self.form.is_representation == Some(true) || self.metadata.change_item_file {
            let image = self
                .form
                .category
                .and_then(ItemCategory::as_wearable)
                .is_some_and(WearableCategory::is_image_category);
            if image { IMAGE_EXTENSIONS } else { MODEL_EXTENSIONS }
        } else {
            ITEM_EXTENSIONS
        }
    }

    /// Categories offered for the current upload.
    pub fn available_categories(&self) -> Vec<ItemCategory> {
        if self.form.kind == Some(ItemKind::Emote) {
            return ItemCategory::emotes();
        }
        let image_only = self
            .form
            .contents
            .as_ref()
            .is_some_and(UploadBundle::is_image_only);
        let hands = self.config.features.is_enabled(FeatureName::HandsCategory);
        WearableCategory::available_for(image_only)
            .into_iter()
            .filter(|c| hands || *c != WearableCategory::HandsWear)
            .map(ItemCategory::Wearable)
            .collect()
    }

    /// Whether `item` can receive the shape currently being uploaded.
    pub fn item_matches_missing_shape(&self, item: &ItemRecord) -> bool {
        missing_body_shape_type(item) == self.form.body_shape
            && item.collection_id == self.metadata.collection_id
    }

    // ── import ───────────────────────────────────────────────────────────────

    /// Ingest a dropped file and process its model.
    ///
    /// A drop is refused with [`WorkflowError::Busy`] while another is still
    /// loading. On failure the session stays in the import view with the
    /// error message set.
    pub async fn handle_drop(&mut self, file: DroppedFile) -> Result<(), WorkflowError> {
        if self.is_loading {
            return Err(WorkflowError::Busy);
        }
        if self.view() != CreateItemView::Import {
            return Err(ViewError::InvalidTransition {
                from: self.view(),
                event: "drop a file",
            }
            .into());
        }
        self.is_loading = true;
        self.has_file = true;
        self.sync_view()?;
        info!(file = %file.name, size = file.bytes.len(), "drop accepted");

        let result = self.import(&file).await;
        self.is_loading = false;

        match result {
            Ok((unpacked, processed)) => {
                self.apply_import(&file.name, unpacked, processed);
                self.error = None;
                self.sync_view()?;
                Ok(())
            }
            Err(err) => {
                warn!(file = %file.name, error = %err, "import failed");
                self.error = Some(err.to_string());
                self.sync_view()?;
                Err(err)
            }
        }
    }

    /// The drop zone refused the files outright.
    pub fn handle_drop_rejected(&mut self, names: &[String]) -> WorkflowError {
        warn!(files = ?names, "drop rejected");
        let err = WorkflowError::from(ItemPackError::InvalidFiles(names.join(", ")));
        self.error = Some(err.to_string());
        err
    }

    /// Forget a drop whose future was dropped before it finished.
    pub fn cancel_import(&mut self) {
        if self.is_loading {
            warn!("import cancelled");
            self.is_loading = false;
        }
    }

    async fn import(&self, file: &DroppedFile) -> Result<(UnpackedArchive, ProcessedModel), WorkflowError> {
        let extension =
            extension_of(&file.name).ok_or_else(|| ItemPackError::WrongExtension(file.name.clone()))?;
        if !self.accepted_extensions().contains(&extension.as_str()) {
            return Err(ItemPackError::InvalidFiles(file.name.clone()).into());
        }

        let max = self.config.max_file_size;
        let unpacked = if is_zip(&file.name) {
            let bytes = file.bytes.clone();
            tokio::task::spawn_blocking(move || unpack_archive(&bytes, max))
                .await
                .map_err(ProcessError::from)??
        } else {
            load_single_file(&file.name, file.bytes.clone(), max)?
        };

        if let Some(manifest) = &unpacked.manifest {
            manifest.validate_paths(&unpacked.bundle)?;
            let thumbnail = manifest.thumbnail.as_deref().and_then(|p| unpacked.bundle.get(p));
            if thumbnail.is_some_and(|blob| !is_png(blob)) {
                return Err(ProcessError::WrongThumbnailFormat.into());
            }
        }

        let model_path = unpacked
            .manifest
            .as_ref()
            .and_then(|m| m.model.clone())
            .unwrap_or_else(|| unpacked.model_path.clone());
        let category = unpacked
            .manifest
            .as_ref()
            .and_then(|m| m.category)
            .or_else(|| self.form.category.and_then(ItemCategory::as_wearable));

        let processed = self
            .processor
            .process(&model_path, &unpacked.bundle, category)
            .await?;
        Ok((unpacked, processed))
    }

    fn apply_import(&mut self, file_name: &str, unpacked: UnpackedArchive, processed: ProcessedModel) {
        let keep_representation = self.form.is_representation == Some(true);
        let edited = self.metadata.item.as_ref().filter(|_| self.metadata.change_item_file);

        let form = &mut self.form;
        form.id = Some(edited.map_or_else(Uuid::new_v4, |item| item.id));
        form.name = Some(edited.map_or_else(|| clean_asset_name(file_name), |item| item.name.clone()));
        form.model_path = Some(processed.model_path);
        form.metrics = Some(processed.metrics);
        form.kind = Some(processed.kind);
        form.thumbnail = Some(processed.thumbnail);
        form.body_shape = match processed.kind {
            ItemKind::Emote => Some(BodyShapeType::Both),
            ItemKind::Wearable if keep_representation => form.body_shape,
            ItemKind::Wearable => None,
        };
        if !keep_representation {
            form.category = None;
        }

        if let Some(manifest) = unpacked.manifest {
            if let Some(name) = manifest.name {
                form.name = Some(truncate_name(&name));
            }
            if manifest.description.is_some() {
                form.description = manifest.description;
            }
            if let Some(category) = manifest.category {
                form.category = Some(category.into());
            }
            if manifest.rarity.is_some() {
                form.rarity = manifest.rarity;
            }
            if manifest.body_shape.is_some() {
                form.body_shape = manifest.body_shape;
            }
            if let Some(blob) = manifest.thumbnail.as_deref().and_then(|p| unpacked.bundle.get(p)) {
                form.thumbnail = Some(to_data_url(PNG_MIME, blob));
            }
        }
        form.contents = Some(unpacked.bundle);

        info!(
            item_id = ?form.id,
            kind = ?form.kind,
            model = ?form.model_path,
            "import applied"
        );
    }

    // ── details ──────────────────────────────────────────────────────────────

    pub fn set_name(&mut self, name: &str) {
        self.form.name = Some(truncate_name(name));
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.form.description = Some(description.into());
    }

    /// Change the category; wearables without a custom thumbnail get a new
    /// thumbnail framed for it.
    pub async fn set_category(&mut self, category: ItemCategory) -> Result<(), WorkflowError> {
        if self.form.category == Some(category) {
            return Ok(());
        }
        self.form.category = Some(category);

        if self.form.kind != Some(ItemKind::Wearable) {
            return Ok(());
        }
        let (Some(model), Some(bundle)) = (self.form.model_path.as_deref(), self.form.contents.as_ref())
        else {
            return Ok(());
        };
        if bundle.has_custom_thumbnail() {
            return Ok(());
        }

        match self
            .processor
            .render_thumbnail(model, bundle, category.as_wearable())
            .await
        {
            Ok(thumbnail) => {
                self.form.thumbnail = Some(thumbnail);
                Ok(())
            }
            Err(err) => Err(self.fail(err.into())),
        }
    }

    pub fn set_rarity(&mut self, rarity: Rarity) {
        self.form.rarity = Some(rarity);
    }

    pub fn set_play_mode(&mut self, play_mode: EmotePlayMode) {
        self.form.play_mode = Some(play_mode);
    }

    /// Pick the representation. Outside the add-representation flow this
    /// clears any previously chosen item.
    pub fn set_body_shape(&mut self, body_shape: BodyShapeType) {
        self.form.body_shape = Some(body_shape);
        if self.metadata.add_representation {
            return;
        }
        self.form.is_representation = if self.metadata.change_item_file {
            Some(false)
        } else {
            None
        };
        self.form.item = None;
    }

    /// Answer "is this a representation of an existing item?".
    pub fn set_is_representation(&mut self, is_representation: bool) {
        self.form.is_representation = Some(is_representation);
    }

    /// Pick the existing item that receives this upload as a representation.
    pub fn choose_item(&mut self, item: ItemRecord) -> Result<(), WorkflowError> {
        if !self.item_matches_missing_shape(&item) {
            let err = AssembleError::IncompatibleRepresentation { item_id: item.id };
            return Err(self.fail(err.into()));
        }
        self.form.category = Some(item.data.category);
        self.form.rarity = item.rarity;
        self.form.item = Some(item);
        Ok(())
    }

    /// Use a user-supplied PNG as the thumbnail.
    pub async fn set_custom_thumbnail(&mut self, bytes: Bytes) -> Result<(), WorkflowError> {
        let prepared = tokio::task::spawn_blocking(move || prepare_custom_thumbnail(&bytes))
            .await
            .map_err(ProcessError::from)
            .and_then(|r| r);
        let resized = match prepared {
            Ok(resized) => resized,
            Err(err) => return Err(self.fail(err.into())),
        };

        self.error = None;
        self.form.thumbnail = Some(to_data_url(PNG_MIME, &resized));
        self.form.contents = Some(match &self.form.contents {
            Some(bundle) => bundle.with_entry(THUMBNAIL_PATH, resized),
            None => UploadBundle::single(THUMBNAIL_PATH, resized),
        });
        Ok(())
    }

    // ── thumbnail editor ─────────────────────────────────────────────────────

    pub fn open_thumbnail_dialog(&mut self) -> Result<ThumbnailAction, WorkflowError> {
        let editor = self.config.features.is_enabled(FeatureName::EmotesV2);
        match self.form.kind {
            Some(kind @ ItemKind::Emote) if editor => {
                self.view.handle(ViewEvent::OpenThumbnailEditor { kind })?;
                Ok(ThumbnailAction::Editor)
            }
            _ => Ok(ThumbnailAction::UploadCustom),
        }
    }

    pub fn thumbnail_back(&mut self) -> Result<(), WorkflowError> {
        self.view.handle(ViewEvent::CloseThumbnailEditor)?;
        Ok(())
    }

    /// Store a screenshot from the editor and return to the details.
    pub fn screenshot_taken(&mut self, screenshot: String) -> Result<(), WorkflowError> {
        if self.view() != CreateItemView::Thumbnail {
            return Err(ViewError::InvalidTransition {
                from: self.view(),
                event: "capture a screenshot",
            }
            .into());
        }
        self.form.thumbnail = Some(screenshot);
        self.view.handle(ViewEvent::ScreenshotCaptured)?;
        Ok(())
    }

    // ── submit ───────────────────────────────────────────────────────────────

    /// Assemble and persist the item.
    ///
    /// Wearables are saved right away. Emotes move to the pricing step and
    /// are saved by [`Self::skip_price`] or [`Self::confirm_price`].
    pub async fn submit(&mut self) -> Result<SubmitOutcome, WorkflowError> {
        match self.view() {
            CreateItemView::Details => match self.assemble().await {
                Ok(assembled) => self.finish_details(assembled).await,
                Err(err) => Err(self.fail(err)),
            },
            CreateItemView::SetPrice => self.save_pending(None).await,
            from => Err(ViewError::InvalidTransition {
                from,
                event: "submit",
            }
            .into()),
        }
    }

    /// Save the pending emote without a price.
    pub async fn skip_price(&mut self) -> Result<SubmitOutcome, WorkflowError> {
        self.save_pending(None).await
    }

    /// Save the pending emote with a price and beneficiary.
    pub async fn confirm_price(
        &mut self,
        price: impl Into<String>,
        beneficiary: impl Into<String>,
    ) -> Result<SubmitOutcome, WorkflowError> {
        self.save_pending(Some((price.into(), beneficiary.into()))).await
    }

    async fn assemble(&self) -> Result<AssembledItem, WorkflowError> {
        let owner = self.wallet.address().await.map_err(WorkflowError::Wallet)?;
        let ctx = self.assembly_context(owner);
        Ok(self.assembler.assemble(&self.form, &ctx).await?)
    }

    async fn finish_details(&mut self, assembled: AssembledItem) -> Result<SubmitOutcome, WorkflowError> {
        let kind = assembled.item.kind;
        if kind == ItemKind::Wearable {
            self.save(&assembled).await?;
            return Ok(SubmitOutcome::Saved(assembled.item));
        }
        self.view.handle(ViewEvent::RequestPricing { kind })?;
        info!(item_id = %assembled.item.id, "emote awaiting price");
        self.pending = Some(assembled);
        Ok(SubmitOutcome::AwaitingPrice)
    }

    async fn save_pending(
        &mut self,
        price: Option<(String, String)>,
    ) -> Result<SubmitOutcome, WorkflowError> {
        let Some(mut pending) = self.pending.clone().filter(|_| self.view() == CreateItemView::SetPrice)
        else {
            return Err(ViewError::InvalidTransition {
                from: self.view(),
                event: "save the priced item",
            }
            .into());
        };
        if let Some((price, beneficiary)) = price {
            pending.item.price = Some(price);
            pending.item.beneficiary = Some(beneficiary);
        }
        self.save(&pending).await?;
        self.pending = None;
        Ok(SubmitOutcome::Saved(pending.item))
    }

    async fn save(&mut self, assembled: &AssembledItem) -> Result<(), WorkflowError> {
        if let Err(err) = self.saver.save(&assembled.item, &assembled.contents).await {
            return Err(self.fail(WorkflowError::Save(err)));
        }
        self.view.handle(ViewEvent::Persisted)?;
        self.error = None;
        info!(item_id = %assembled.item.id, contents = assembled.contents.len(), "item saved");
        Ok(())
    }

    // ── private helpers ──────────────────────────────────────────────────────

    fn assembly_context(&self, owner: String) -> AssemblyContext {
        AssemblyContext {
            add_representation: self.metadata.add_representation,
            change_item_file: self.metadata.change_item_file,
            pristine_item: self.metadata.item.clone(),
            collection_urn: self.metadata.collection_urn.clone(),
            owner,
        }
    }

    fn snapshot(&self) -> ImportSnapshot {
        ImportSnapshot {
            has_thumbnail: self.form.thumbnail.is_some(),
            has_contents: self.has_file && self.form.contents.is_some(),
            has_kind: self.form.kind.is_some(),
            is_loading: self.is_loading,
        }
    }

    fn sync_view(&mut self) -> Result<CreateItemView, ViewError> {
        self.view.handle(ViewEvent::ImportProgress(self.snapshot()))
    }

    fn fail(&mut self, err: WorkflowError) -> WorkflowError {
        warn!(view = %self.view(), error = %err, "action failed");
        self.error = Some(err.to_string());
        err
    }
}

/// Pre-fill the form from the session metadata.
fn initial_form(metadata: &SessionMetadata) -> FormState {
    let mut form = FormState {
        play_mode: Some(EmotePlayMode::Simple),
        collection_id: metadata.collection_id.clone(),
        ..FormState::default()
    };

    let Some(item) = &metadata.item else {
        return form;
    };
    form.id = Some(item.id);
    form.name = Some(item.name.clone());
    form.description = Some(item.description.clone());
    form.kind = Some(item.kind);
    form.collection_id = item.collection_id.clone();
    form.body_shape = body_shape_type(item);
    form.category = Some(item.data.category);
    form.rarity = item.rarity;
    form.is_representation = Some(false);
    form.item = Some(item.clone());

    if metadata.add_representation {
        if let Some(missing) = missing_body_shape_type(item) {
            form.body_shape = Some(missing);
            form.is_representation = Some(true);
        }
    }
    form
}

/// Item name derived from a dropped file name: no extension, `_` and `-`
/// read as spaces, whitespace collapsed, at most [`ITEM_NAME_MAX_LENGTH`]
/// characters.
pub fn clean_asset_name(file_name: &str) -> String {
    let base = file_name.rsplit('/').next().unwrap_or(file_name);
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    };
    let spaced = stem.replace(['_', '-'], " ");
    truncate_name(&spaced.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn truncate_name(name: &str) -> String {
    name.chars().take(ITEM_NAME_MAX_LENGTH).collect()
}
