//! Turns form state and an imported upload into an [`ItemRecord`].
//!
//! Assembly is gated by a per-branch required-field set. Once the gate
//! passes, exactly one of three modes runs: adding a representation to an
//! existing item, replacing an existing item's model, or creating a new
//! item. Every mode hashes its final content mapping before returning.

use std::sync::Arc;

use builder_item_pack::{ContentMap, UploadBundle};
use builder_types::{
    body_shape_type, build_third_party_urn, decode_urn, is_third_party, missing_body_shape_type,
    BodyShape, BodyShapeType, DecodedUrn, EmotePlayMode, ItemCategory, ItemData, ItemKind, ItemRecord, ModelMetrics, Rarity,
    Representation, THUMBNAIL_PATH,
};
use chrono::Utc;
use strum::Display;
use tracing::info;
use uuid::Uuid;

use crate::error::AssembleError;
use crate::hash::{ContentHasher, ContentHashes};
use crate::sort::{prefix_content_name, sort_content, SortedContent};
use crate::thumbnail::data_url_to_bytes;

/// Everything the details form has collected so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub kind: Option<ItemKind>,
    pub category: Option<ItemCategory>,
    pub rarity: Option<Rarity>,
    pub body_shape: Option<BodyShapeType>,
    pub play_mode: Option<EmotePlayMode>,
    /// PNG `data:` URL.
    pub thumbnail: Option<String>,
    pub metrics: Option<ModelMetrics>,
    /// Main file inside `contents`.
    pub model_path: Option<String>,
    pub contents: Option<UploadBundle>,
    pub collection_id: Option<String>,
    /// `Some(true)` when the upload is a new representation of `item`.
    pub is_representation: Option<bool>,
    /// Existing item picked as the target of a new representation.
    pub item: Option<ItemRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RequiredField {
    Item,
    Name,
    Thumbnail,
    Metrics,
    BodyShape,
    Category,
    PlayMode,
    Rarity,
    Kind,
}

/// Which required-field set applies to the current form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ValidationBranch {
    Representation,
    ThirdParty,
    Emote,
    StandardWearable,
}

impl ValidationBranch {
    pub fn select(form: &FormState, third_party: bool) -> Self {
        if form.is_representation == Some(true) {
            ValidationBranch::Representation
        } else if third_party {
            ValidationBranch::ThirdParty
        } else if form.kind == Some(ItemKind::Emote) {
            ValidationBranch::Emote
        } else {
            ValidationBranch::StandardWearable
        }
    }

    pub fn required_fields(self) -> &'static [RequiredField] {
        use RequiredField::*;
        match self {
            ValidationBranch::Representation => &[Item],
            ValidationBranch::ThirdParty => &[Name, Thumbnail, Metrics, BodyShape, Category],
            ValidationBranch::Emote => &[Name, Thumbnail, Metrics, Category, PlayMode, Rarity, Kind],
            ValidationBranch::StandardWearable => {
                &[Name, Thumbnail, Metrics, BodyShape, Category, Rarity, Kind]
            }
        }
    }
}

impl FormState {
    pub fn has(&self, field: RequiredField) -> bool {
        match field {
            RequiredField::Item => self.item.is_some(),
            RequiredField::Name => self.name.is_some(),
            RequiredField::Thumbnail => self.thumbnail.is_some(),
            RequiredField::Metrics => self.metrics.is_some(),
            RequiredField::BodyShape => self.body_shape.is_some(),
            RequiredField::Category => self.category.is_some(),
            RequiredField::PlayMode => self.play_mode.is_some(),
            RequiredField::Rarity => self.rarity.is_some(),
            RequiredField::Kind => self.kind.is_some(),
        }
    }

    /// Run the validation gate and report the branch that applied.
    pub fn validate(&self, third_party: bool) -> Result<ValidationBranch, AssembleError> {
        let branch = ValidationBranch::select(self, third_party);
        match branch.required_fields().iter().find(|f| !self.has(**f)) {
            Some(field) => Err(AssembleError::MissingField {
                branch,
                field: *field,
            }),
            None => Ok(branch),
        }
    }
}

/// Context the form does not own: where the item lives and who creates it.
#[derive(Debug, Clone, Default)]
pub struct AssemblyContext {
    pub add_representation: bool,
    pub change_item_file: bool,
    /// The item being edited, as it was when the session opened.
    pub pristine_item: Option<ItemRecord>,
    pub collection_urn: Option<String>,
    pub owner: String,
}

impl AssemblyContext {
    pub fn is_third_party(&self) -> bool {
        self.collection_urn.as_deref().is_some_and(is_third_party)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AssemblyMode {
    AddRepresentation,
    ReplaceModelFile,
    Create,
}

impl AssemblyMode {
    pub fn select(form: &FormState, ctx: &AssemblyContext) -> Self {
        let representation = form.is_representation == Some(true) || ctx.add_representation;
        if representation && form.item.is_some() {
            AssemblyMode::AddRepresentation
        } else if ctx.change_item_file && ctx.pristine_item.is_some() {
            AssemblyMode::ReplaceModelFile
        } else {
            AssemblyMode::Create
        }
    }
}

/// An item ready for the save pipeline, with the blobs it references.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledItem {
    pub item: ItemRecord,
    pub contents: ContentMap,
}

pub struct ItemAssembler {
    hasher: Arc<dyn ContentHasher>,
    network: String,
}

impl std::fmt::Debug for ItemAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemAssembler")
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}

impl ItemAssembler {
    pub fn new(hasher: Arc<dyn ContentHasher>, network: impl Into<String>) -> Self {
        Self {
            hasher,
            network: network.into(),
        }
    }

    pub async fn assemble(
        &self,
        form: &FormState,
        ctx: &AssemblyContext,
    ) -> Result<AssembledItem, AssembleError> {
        let branch = form.validate(ctx.is_third_party())?;
        let (Some(id), Some(model), Some(bundle)) = (form.id, form.model_path.as_deref(), form.contents.as_ref())
        else {
            return Err(AssembleError::NotImported);
        };

        let body_shape = form
            .body_shape
            .or_else(|| form.item.as_ref().and_then(missing_body_shape_type))
            .unwrap_or(BodyShapeType::Both);

        let mut bundle = bundle.clone();
        if !bundle.has_custom_thumbnail() {
            if let Some(blob) = form.thumbnail.as_deref().and_then(|t| data_url_to_bytes(t).ok()) {
                bundle = bundle.with_entry(THUMBNAIL_PATH, blob);
            }
        }
        let mut sorted = sort_content(body_shape, &bundle);

        let mode = AssemblyMode::select(form, ctx);
        let item = match mode {
            AssemblyMode::AddRepresentation => {
                let edited = form.item.as_ref().ok_or(AssembleError::MissingExistingItem)?;
                let item = self.add_representation(edited, body_shape, model, &sorted).await?;
                // The existing thumbnail stays.
                sorted.all.remove(THUMBNAIL_PATH);
                item
            }
            AssemblyMode::ReplaceModelFile => {
                let pristine = ctx
                    .pristine_item
                    .as_ref()
                    .ok_or(AssembleError::MissingExistingItem)?;
                self.replace_model_file(pristine, form, body_shape, model, &sorted)
                    .await?
            }
            AssemblyMode::Create => {
                self.create(id, form, ctx, branch, body_shape, model, &sorted)
                    .await?
            }
        };

        info!(
            item_id = %item.id,
            %mode,
            %branch,
            representations = item.data.representations.len(),
            contents = sorted.all.len(),
            "item assembled"
        );

        Ok(AssembledItem {
            item,
            contents: sorted.all,
        })
    }

    async fn add_representation(
        &self,
        edited: &ItemRecord,
        body_shape: BodyShapeType,
        model: &str,
        sorted: &SortedContent,
    ) -> Result<ItemRecord, AssembleError> {
        if body_shape == BodyShapeType::Both || missing_body_shape_type(edited) != Some(body_shape) {
            return Err(AssembleError::IncompatibleRepresentation { item_id: edited.id });
        }
        let added = if body_shape == BodyShapeType::Male {
            &sorted.male
        } else {
            &sorted.female
        };
        let hashes = self.hash(added).await?;

        let mut item = edited.clone();
        item.data
            .representations
            .extend(build_representations(body_shape, model, sorted));
        item.contents.extend(hashes);
        item.updated_at = Utc::now();
        Ok(item)
    }

    async fn replace_model_file(
        &self,
        pristine: &ItemRecord,
        form: &FormState,
        body_shape: BodyShapeType,
        model: &str,
        sorted: &SortedContent,
    ) -> Result<ItemRecord, AssembleError> {
        let mut item = pristine.clone();
        item.data.replaces.clear();
        item.data.hides.clear();
        if let Some(category) = form.category {
            item.data.category = category;
        }
        if let Some(name) = &form.name {
            item.name = name.clone();
        }
        if let Some(metrics) = form.metrics {
            item.metrics = metrics;
        }
        item.updated_at = Utc::now();

        let hashes = self.hash(&sorted.all).await?;
        let target = BodyShape::from(body_shape);
        let index = pristine
            .data
            .representations
            .iter()
            .position(|r| r.body_shapes.first() == Some(&target));
        let mut representations = build_representations(body_shape, model, sorted);

        match index {
            Some(index)
                if representations.len() == 1 && body_shape_type(pristine) != Some(BodyShapeType::Both) =>
            {
                // Only the edited shape changes; other representations keep
                // their content entries.
                let kept: Vec<&Representation> = pristine
                    .data
                    .representations
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != index)
                    .map(|(_, r)| r)
                    .collect();
                item.contents
                    .retain(|path, _| kept.iter().any(|r| r.contents.contains(path)));
                item.contents.extend(hashes);
                item.data.representations[index] = representations.remove(0);
            }
            _ => {
                item.contents = hashes;
                item.data.representations = representations;
            }
        }
        Ok(item)
    }

    #[allow(clippy::too_many_arguments)]
    async fn create(
        &self,
        id: Uuid,
        form: &FormState,
        ctx: &AssemblyContext,
        branch: ValidationBranch,
        body_shape: BodyShapeType,
        model: &str,
        sorted: &SortedContent,
    ) -> Result<ItemRecord, AssembleError> {
        let required = |field: RequiredField| AssembleError::MissingField { branch, field };
        let category = form.category.ok_or_else(|| required(RequiredField::Category))?;
        let metrics = form.metrics.ok_or_else(|| required(RequiredField::Metrics))?;
        let kind = form.kind.unwrap_or_else(|| metrics.kind());

        let urn = match ctx.collection_urn.as_deref().map(decode_urn).transpose()? {
            Some(DecodedUrn::ThirdParty {
                third_party_name,
                third_party_collection_id: Some(collection_id),
                ..
            }) => {
                let token_id = Uuid::new_v4().to_string();
                Some(build_third_party_urn(
                    &self.network,
                    &third_party_name,
                    &collection_id,
                    Some(&token_id),
                ))
            }
            _ => None,
        };

        let representations = build_representations(body_shape, model, sorted);
        let data = match kind {
            ItemKind::Wearable => ItemData {
                category,
                representations,
                replaces: Vec::new(),
                hides: Vec::new(),
                tags: Vec::new(),
                loop_animation: None,
            },
            ItemKind::Emote => ItemData {
                category,
                representations,
                replaces: Vec::new(),
                hides: Vec::new(),
                tags: Vec::new(),
                loop_animation: Some(form.play_mode == Some(EmotePlayMode::Loop)),
            },
        };

        let now = Utc::now();
        Ok(ItemRecord {
            id,
            name: form.name.clone().unwrap_or_default(),
            urn,
            description: form.description.clone().unwrap_or_default(),
            thumbnail: THUMBNAIL_PATH.to_owned(),
            kind,
            collection_id: form.collection_id.clone(),
            total_supply: 0,
            is_published: false,
            is_approved: false,
            in_catalyst: false,
            blockchain_content_hash: None,
            current_content_hash: None,
            catalyst_content_hash: None,
            rarity: if ctx.is_third_party() {
                Some(Rarity::Unique)
            } else {
                form.rarity
            },
            price: None,
            beneficiary: None,
            data,
            owner: ctx.owner.clone(),
            metrics,
            contents: self.hash(&sorted.all).await?,
            created_at: now,
            updated_at: now,
        })
    }

    async fn hash(&self, contents: &ContentMap) -> Result<ContentHashes, AssembleError> {
        self.hasher
            .compute_hashes(contents)
            .await
            .map_err(AssembleError::Hash)
    }
}

/// One representation per base avatar covered by `body_shape`, male first.
pub fn build_representations(
    body_shape: BodyShapeType,
    model: &str,
    sorted: &SortedContent,
) -> Vec<Representation> {
    let mut representations = Vec::with_capacity(2);
    if body_shape.includes_male() {
        representations.push(representation(BodyShape::Male, model, &sorted.male));
    }
    if body_shape.includes_female() {
        representations.push(representation(BodyShape::Female, model, &sorted.female));
    }
    representations
}

fn representation(shape: BodyShape, model: &str, contents: &ContentMap) -> Representation {
    Representation {
        body_shapes: vec![shape],
        main_file: prefix_content_name(shape.selector(), model),
        contents: contents.keys().cloned().collect(),
        override_hides: Vec::new(),
        override_replaces: Vec::new(),
    }
}
