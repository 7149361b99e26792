//! Shared domain types for the item authoring pipeline.
//!
//! Everything here is plain data: body shapes, item kinds and categories,
//! rarities, representations, model metrics, the persisted [`ItemRecord`],
//! and the URN helpers used to identify third-party collections.

pub mod body_shape;
pub mod item;
pub mod metrics;
pub mod urn;

pub use body_shape::{BodyShape, BodyShapeType};
pub use item::{
    body_shape_type, missing_body_shape_type, EmoteCategory, EmotePlayMode, ItemCategory, ItemData,
    ItemKind, ItemRecord, Rarity, Representation, WearableCategory, ITEM_NAME_MAX_LENGTH,
    THUMBNAIL_PATH,
};
pub use metrics::{EmoteMetrics, ModelMetrics, WearableMetrics};
pub use urn::{build_third_party_urn, decode_urn, is_third_party, DecodedUrn, UrnError, UrnType};
