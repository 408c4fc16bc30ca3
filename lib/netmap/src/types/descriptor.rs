//! Participant descriptors

use p256::ecdsa::VerifyingKey;
use serde::{Deserialize, Serialize};

use crate::envelope::{SignedEnvelope, SignedPayload, VerificationError, decode_public_key};

/// A participant's self-asserted identity, addresses and platform version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDescriptor {
    pub legal_name: String,
    /// Base64 SEC1 (compressed) P-256 key that must sign the descriptor.
    pub identity_key: String,
    pub addresses: Vec<String>,
    pub platform_version: u32,
    /// Bumped by the participant whenever it republishes a changed descriptor.
    pub serial: u64,
}

pub type SignedDescriptor = SignedEnvelope<ParticipantDescriptor>;

impl SignedPayload for ParticipantDescriptor {
    fn authorize_signer(&self, signer: &VerifyingKey) -> Result<(), VerificationError> {
        let identity = decode_public_key(&self.identity_key)?;
        if &identity != signer {
            return Err(VerificationError::UnauthorizedSigner(format!(
                "descriptor for '{}' is not signed by its identity key",
                self.legal_name
            )));
        }
        Ok(())
    }
}
