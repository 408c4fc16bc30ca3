//! Network rules and the network map they govern

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::envelope::{SignedEnvelope, SignedPayload};
use crate::hash::SecureHash;

/// Network-wide policy, identified by the content hash of its signed bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRules {
    /// Descriptors declaring a lower platform version are refused.
    pub minimum_platform_version: u32,
    pub max_message_size: u32,
    pub epoch: u32,
    pub modified_time: DateTime<Utc>,
}

impl SignedPayload for NetworkRules {}

pub type SignedNetworkRules = SignedEnvelope<NetworkRules>;

/// Point-in-time directory of admitted descriptors and the rules in force.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkMap {
    pub node_info_hashes: Vec<SecureHash>,
    pub network_parameter_hash: SecureHash,
}

impl SignedPayload for NetworkMap {}

pub type SignedNetworkMap = SignedEnvelope<NetworkMap>;

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::SigningKey;

    #[test]
    fn test_network_map_references_rules_by_hash() {
        let operator = SigningKey::from_slice(&[42u8; 32]).unwrap();
        let rules = NetworkRules {
            minimum_platform_version: 3,
            max_message_size: 10_485_760,
            epoch: 1,
            modified_time: Utc::now(),
        };
        let signed_rules = SignedNetworkRules::sign(&rules, &operator).unwrap();

        let map = NetworkMap {
            node_info_hashes: vec![],
            network_parameter_hash: signed_rules.content_hash(),
        };
        let signed_map = SignedNetworkMap::sign(&map, &operator).unwrap();

        let verified = signed_map.verify().unwrap();
        assert_eq!(verified.network_parameter_hash, signed_rules.content_hash());
        assert_eq!(signed_rules.verify().unwrap(), rules);
    }
}
