//! Decoding and building of `urn:decentraland:` identifiers.
//!
//! Only the shapes the item pipeline needs are recognised:
//!
//! ```text
//! urn:decentraland:off-chain:base-avatars:{id}
//! urn:decentraland:{network}:collections-v2:{address}[:{tokenId}]
//! urn:decentraland:{network}:collections-thirdparty:{name}[:{collectionId}[:{tokenId}]]
//! ```

use strum::{Display, EnumString};
use thiserror::Error;

const URN_PREFIX: &str = "urn:decentraland";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum UrnType {
    #[strum(serialize = "base-avatars")]
    BaseAvatars,
    #[strum(serialize = "collections-v2")]
    CollectionsV2,
    #[strum(serialize = "collections-thirdparty")]
    CollectionsThirdParty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedUrn {
    BaseAvatar {
        id: String,
    },
    CollectionV2 {
        network: String,
        collection_address: String,
        token_id: Option<String>,
    },
    ThirdParty {
        network: String,
        third_party_name: String,
        third_party_collection_id: Option<String>,
        third_party_token_id: Option<String>,
    },
}

impl DecodedUrn {
    pub fn urn_type(&self) -> UrnType {
        match self {
            DecodedUrn::BaseAvatar { .. } => UrnType::BaseAvatars,
            DecodedUrn::CollectionV2 { .. } => UrnType::CollectionsV2,
            DecodedUrn::ThirdParty { .. } => UrnType::CollectionsThirdParty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrnError {
    #[error("not a decentraland urn: {0}")]
    InvalidPrefix(String),

    #[error("unsupported urn type '{kind}' in {urn}")]
    UnsupportedType { kind: String, urn: String },

    #[error("malformed urn: {0}")]
    Malformed(String),
}

pub fn decode_urn(urn: &str) -> Result<DecodedUrn, UrnError> {
    let rest = urn
        .strip_prefix(URN_PREFIX)
        .and_then(|r| r.strip_prefix(':'))
        .ok_or_else(|| UrnError::InvalidPrefix(urn.to_owned()))?;

    let segments: Vec<&str> = rest.split(':').collect();
    if segments.len() < 3 || segments.iter().any(|s| s.is_empty()) {
        return Err(UrnError::Malformed(urn.to_owned()));
    }

    let network = segments[0];
    let kind: UrnType = segments[1].parse().map_err(|_| UrnError::UnsupportedType {
        kind: segments[1].to_owned(),
        urn: urn.to_owned(),
    })?;
    let tail = &segments[2..];
    let owned = |i: usize| tail.get(i).map(|s| (*s).to_owned());

    match kind {
        UrnType::BaseAvatars if tail.len() == 1 => Ok(DecodedUrn::BaseAvatar { id: tail[0].to_owned() }),
        UrnType::CollectionsV2 if tail.len() <= 2 => Ok(DecodedUrn::CollectionV2 {
            network: network.to_owned(),
            collection_address: tail[0].to_owned(),
            token_id: owned(1),
        }),
        UrnType::CollectionsThirdParty if tail.len() <= 3 => Ok(DecodedUrn::ThirdParty {
            network: network.to_owned(),
            third_party_name: tail[0].to_owned(),
            third_party_collection_id: owned(1),
            third_party_token_id: owned(2),
        }),
        _ => Err(UrnError::Malformed(urn.to_owned())),
    }
}

/// `true` only for well-formed third-party URNs; anything undecodable is not third party.
pub fn is_third_party(urn: &str) -> bool {
    matches!(decode_urn(urn), Ok(DecodedUrn::ThirdParty { .. }))
}

pub fn build_third_party_urn(
    network: &str,
    third_party_name: &str,
    third_party_collection_id: &str,
    third_party_token_id: Option<&str>,
) -> String {
    let mut urn = format!(
        "{URN_PREFIX}:{network}:{}:{third_party_name}:{third_party_collection_id}",
        UrnType::CollectionsThirdParty
    );
    if let Some(token_id) = third_party_token_id {
        urn.push(':');
        urn.push_str(token_id);
    }
    urn
}
