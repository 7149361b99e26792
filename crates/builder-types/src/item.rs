use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use uuid::Uuid;

use crate::body_shape::{BodyShape, BodyShapeType};
use crate::metrics::ModelMetrics;

/// Content path of the item thumbnail inside every content mapping.
pub const THUMBNAIL_PATH: &str = "thumbnail.png";

/// Item names longer than this are truncated on input.
pub const ITEM_NAME_MAX_LENGTH: usize = 32;

/// What an item is: something worn, or an animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ItemKind {
    Wearable,
    Emote,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Rarity {
    Unique,
    Mythic,
    Exotic,
    Legendary,
    Epic,
    Rare,
    Uncommon,
    Common,
}

impl Rarity {
    /// Maximum number of tokens that can be minted for an item of this rarity.
    pub fn max_supply(self) -> u64 {
        match self {
            Rarity::Unique => 1,
            Rarity::Mythic => 10,
            Rarity::Exotic => 50,
            Rarity::Legendary => 100,
            Rarity::Epic => 1_000,
            Rarity::Rare => 5_000,
            Rarity::Uncommon => 10_000,
            Rarity::Common => 100_000,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WearableCategory {
    Eyebrows,
    Eyes,
    FacialHair,
    Hair,
    Mouth,
    UpperBody,
    LowerBody,
    Feet,
    Earring,
    Eyewear,
    Hat,
    Helmet,
    Mask,
    Tiara,
    TopHead,
    Skin,
    HandsWear,
}

impl WearableCategory {
    /// Facial features are authored as flat images rather than 3D models.
    pub fn is_image_category(self) -> bool {
        matches!(
            self,
            WearableCategory::Eyebrows | WearableCategory::Eyes | WearableCategory::Mouth
        )
    }

    /// Categories offered for an upload, depending on whether it only holds images.
    pub fn available_for(image_only: bool) -> Vec<WearableCategory> {
        WearableCategory::iter()
            .filter(|c| c.is_image_category() == image_only)
            .collect()
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EmoteCategory {
    Dance,
    Stunt,
    Greetings,
    Fun,
    Poses,
    Reactions,
    Horror,
    Miscellaneous,
}

/// Category of either item kind. Names never overlap between the two sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ItemCategory {
    Wearable(WearableCategory),
    Emote(EmoteCategory),
}

impl ItemCategory {
    pub fn kind(self) -> ItemKind {
        match self {
            ItemCategory::Wearable(_) => ItemKind::Wearable,
            ItemCategory::Emote(_) => ItemKind::Emote,
        }
    }

    pub fn as_wearable(self) -> Option<WearableCategory> {
        match self {
            ItemCategory::Wearable(c) => Some(c),
            ItemCategory::Emote(_) => None,
        }
    }

    /// Every emote category, wrapped.
    pub fn emotes() -> Vec<ItemCategory> {
        EmoteCategory::iter().map(ItemCategory::Emote).collect()
    }
}

impl fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemCategory::Wearable(c) => fmt::Display::fmt(c, f),
            ItemCategory::Emote(c) => fmt::Display::fmt(c, f),
        }
    }
}

impl FromStr for ItemCategory {
    type Err = strum::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WearableCategory::from_str(s)
            .map(ItemCategory::Wearable)
            .or_else(|_| EmoteCategory::from_str(s).map(ItemCategory::Emote))
    }
}

impl From<WearableCategory> for ItemCategory {
    fn from(value: WearableCategory) -> Self {
        ItemCategory::Wearable(value)
    }
}

impl From<EmoteCategory> for ItemCategory {
    fn from(value: EmoteCategory) -> Self {
        ItemCategory::Emote(value)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema, Display, EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EmotePlayMode {
    #[default]
    Simple,
    Loop,
}

/// A body-shape specific bundle of content attached to an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Representation {
    pub body_shapes: Vec<BodyShape>,
    /// Prefixed content path of the model loaded for this representation.
    pub main_file: String,
    /// Every prefixed content path belonging to this representation.
    pub contents: Vec<String>,
    pub override_hides: Vec<String>,
    pub override_replaces: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemData {
    pub category: ItemCategory,
    pub representations: Vec<Representation>,
    #[serde(default)]
    pub replaces: Vec<String>,
    #[serde(default)]
    pub hides: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Only present on emotes.
    #[serde(rename = "loop", default, skip_serializing_if = "Option::is_none")]
    pub loop_animation: Option<bool>,
}

/// The persisted unit handed to the save pipeline.
///
/// Identity (`id`, `urn`) is fixed at creation; later edits only go through
/// the add-representation and replace-model flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urn: Option<String>,
    pub description: String,
    pub thumbnail: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub collection_id: Option<String>,
    pub total_supply: u64,
    pub is_published: bool,
    pub is_approved: bool,
    pub in_catalyst: bool,
    pub blockchain_content_hash: Option<String>,
    pub current_content_hash: Option<String>,
    pub catalyst_content_hash: Option<String>,
    pub rarity: Option<Rarity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beneficiary: Option<String>,
    pub data: ItemData,
    pub owner: String,
    pub metrics: ModelMetrics,
    /// Content path to content hash.
    pub contents: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Which selector the item's representations currently cover.
pub fn body_shape_type(item: &ItemRecord) -> Option<BodyShapeType> {
    let covers = |shape: BodyShape| {
        item.data
            .representations
            .iter()
            .any(|r| r.body_shapes.contains(&shape))
    };
    match (covers(BodyShape::Male), covers(BodyShape::Female)) {
        (true, true) => Some(BodyShapeType::Both),
        (true, false) => Some(BodyShapeType::Male),
        (false, true) => Some(BodyShapeType::Female),
        (false, false) => None,
    }
}

/// The shape an item still lacks, if it covers exactly one.
pub fn missing_body_shape_type(item: &ItemRecord) -> Option<BodyShapeType> {
    match body_shape_type(item)? {
        BodyShapeType::Male => Some(BodyShapeType::Female),
        BodyShapeType::Female => Some(BodyShapeType::Male),
        BodyShapeType::Both => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::WearableMetrics;

    fn representation(shape: BodyShape) -> Representation {
        Representation {
            body_shapes: vec![shape],
            main_file: format!("{}/model.glb", shape.selector()),
            contents: vec![format!("{}/model.glb", shape.selector())],
            override_hides: vec![],
            override_replaces: vec![],
        }
    }

    fn item(representations: Vec<Representation>) -> ItemRecord {
        let now = Utc::now();
        ItemRecord {
            id: Uuid::new_v4(),
            name: "hat".into(),
            urn: None,
            description: String::new(),
            thumbnail: THUMBNAIL_PATH.into(),
            kind: ItemKind::Wearable,
            collection_id: None,
            total_supply: 0,
            is_published: false,
            is_approved: false,
            in_catalyst: false,
            blockchain_content_hash: None,
            current_content_hash: None,
            catalyst_content_hash: None,
            rarity: Some(Rarity::Common),
            price: None,
            beneficiary: None,
            data: ItemData {
                category: WearableCategory::Hat.into(),
                representations,
                replaces: vec![],
                hides: vec![],
                tags: vec![],
                loop_animation: None,
            },
            owner: "0xabc".into(),
            metrics: ModelMetrics::Wearable(WearableMetrics::default()),
            contents: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn body_shape_type_reflects_representations() {
        assert_eq!(body_shape_type(&item(vec![])), None);
        assert_eq!(
            body_shape_type(&item(vec![representation(BodyShape::Male)])),
            Some(BodyShapeType::Male)
        );
        assert_eq!(
            body_shape_type(&item(vec![
                representation(BodyShape::Male),
                representation(BodyShape::Female)
            ])),
            Some(BodyShapeType::Both)
        );
    }

    #[test]
    fn missing_shape_is_the_other_one() {
        let male_only = item(vec![representation(BodyShape::Male)]);
        assert_eq!(missing_body_shape_type(&male_only), Some(BodyShapeType::Female));
        let both = item(vec![
            representation(BodyShape::Male),
            representation(BodyShape::Female),
        ]);
        assert_eq!(missing_body_shape_type(&both), None);
    }

    #[test]
    fn category_parses_either_kind() {
        assert_eq!(
            "hat".parse::<ItemCategory>().unwrap(),
            ItemCategory::Wearable(WearableCategory::Hat)
        );
        assert_eq!(
            "dance".parse::<ItemCategory>().unwrap(),
            ItemCategory::Emote(EmoteCategory::Dance)
        );
        assert!("spaceship".parse::<ItemCategory>().is_err());
        assert_eq!(ItemCategory::Wearable(WearableCategory::UpperBody).to_string(), "upper_body");
    }

    #[test]
    fn image_categories_are_split_from_model_categories() {
        let images = WearableCategory::available_for(true);
        assert_eq!(
            images,
            vec![WearableCategory::Eyebrows, WearableCategory::Eyes, WearableCategory::Mouth]
        );
        assert!(!WearableCategory::available_for(false).contains(&WearableCategory::Eyes));
    }

    #[test]
    fn rarity_supply_is_monotonic() {
        let supplies: Vec<u64> = Rarity::iter().map(Rarity::max_supply).collect();
        assert!(supplies.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(Rarity::Unique.max_supply(), 1);
    }

    #[test]
    fn record_serializes_with_wire_names() {
        let value = serde_json::to_value(item(vec![representation(BodyShape::Female)])).unwrap();
        assert_eq!(value["type"], "wearable");
        assert_eq!(value["data"]["category"], "hat");
        assert!(value["data"].get("loop").is_none());
        assert_eq!(
            value["data"]["representations"][0]["mainFile"],
            "female/model.glb"
        );
    }
}
