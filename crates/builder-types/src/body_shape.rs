use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Body-shape selector chosen for an upload.
///
/// The lowercase name doubles as the content prefix used by the sorter
/// (`male/model.glb`, `female/model.glb`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Display, EnumString,
    EnumIter, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BodyShapeType {
    Both,
    Male,
    Female,
}

impl BodyShapeType {
    /// Whether content for the male base avatar is produced for this selector.
    pub fn includes_male(self) -> bool {
        matches!(self, BodyShapeType::Both | BodyShapeType::Male)
    }

    /// Whether content for the female base avatar is produced for this selector.
    pub fn includes_female(self) -> bool {
        matches!(self, BodyShapeType::Both | BodyShapeType::Female)
    }
}

/// A concrete base avatar a representation is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Display, EnumString)]
pub enum BodyShape {
    #[serde(rename = "urn:decentraland:off-chain:base-avatars:BaseMale")]
    #[strum(serialize = "urn:decentraland:off-chain:base-avatars:BaseMale")]
    Male,
    #[serde(rename = "urn:decentraland:off-chain:base-avatars:BaseFemale")]
    #[strum(serialize = "urn:decentraland:off-chain:base-avatars:BaseFemale")]
    Female,
}

impl BodyShape {
    /// The selector that produces exactly this base avatar.
    pub fn selector(self) -> BodyShapeType {
        match self {
            BodyShape::Male => BodyShapeType::Male,
            BodyShape::Female => BodyShapeType::Female,
        }
    }
}

impl From<BodyShapeType> for BodyShape {
    /// Anything other than `Male` maps to the female base avatar.
    fn from(value: BodyShapeType) -> Self {
        match value {
            BodyShapeType::Male => BodyShape::Male,
            BodyShapeType::Female | BodyShapeType::Both => BodyShape::Female,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn selector_round_trips_through_strings() {
        assert_eq!(BodyShapeType::from_str("both").unwrap(), BodyShapeType::Both);
        assert_eq!(BodyShapeType::Female.to_string(), "female");
        assert!(BodyShapeType::from_str("unisex").is_err());
    }

    #[test]
    fn body_shape_serializes_as_base_avatar_urn() {
        let json = serde_json::to_string(&BodyShape::Male).unwrap();
        assert_eq!(json, "\"urn:decentraland:off-chain:base-avatars:BaseMale\"");
    }

    #[test]
    fn both_includes_each_shape() {
        assert!(BodyShapeType::Both.includes_male());
        assert!(BodyShapeType::Both.includes_female());
        assert!(!BodyShapeType::Male.includes_female());
        assert!(!BodyShapeType::Female.includes_male());
    }
}
