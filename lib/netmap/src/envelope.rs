//! Signed envelopes
//!
//! An envelope carries the raw serialized payload together with the signer's
//! compressed SEC1 P-256 public key and an ECDSA signature over exactly those
//! bytes. The payload is only deserialized after the signature checks out, and
//! the content hash is taken over the same bytes, so a verified envelope and
//! its storage key always agree.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use p256::ecdsa::{
    Signature, SigningKey, VerifyingKey,
    signature::{Signer, Verifier},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::marker::PhantomData;
use thiserror::Error;

use crate::hash::SecureHash;

#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
    #[error("Signature verification failed")]
    VerificationFailed,
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
    #[error("Unauthorized signer: {0}")]
    UnauthorizedSigner(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A payload type that can travel inside a [`SignedEnvelope`].
pub trait SignedPayload: Serialize + DeserializeOwned {
    /// Reject a signer that is not allowed to vouch for this payload.
    fn authorize_signer(&self, _signer: &VerifyingKey) -> Result<(), VerificationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "")]
pub struct SignedEnvelope<T> {
    #[serde(with = "base64_bytes")]
    raw: Vec<u8>,
    public_key: String,
    signature: String,
    #[serde(skip)]
    _payload: PhantomData<fn() -> T>,
}

impl<T: SignedPayload> SignedEnvelope<T> {
    /// Serialize `payload` and sign the resulting bytes.
    pub fn sign(payload: &T, signing_key: &SigningKey) -> Result<Self, VerificationError> {
        let raw = serde_json::to_vec(payload)?;
        let signature: Signature = signing_key.sign(&raw);
        Ok(Self {
            public_key: encode_public_key(signing_key.verifying_key()),
            signature: STANDARD.encode(signature.to_bytes()),
            raw,
            _payload: PhantomData,
        })
    }

    /// Check the signature, then deserialize and authorize the payload.
    pub fn verify(&self) -> Result<T, VerificationError> {
        let public_key = decode_public_key(&self.public_key)?;

        let signature_bytes = STANDARD
            .decode(&self.signature)
            .map_err(|e| VerificationError::InvalidSignature(e.to_string()))?;
        let signature = Signature::from_slice(&signature_bytes)
            .map_err(|e| VerificationError::InvalidSignature(e.to_string()))?;

        public_key
            .verify(&self.raw, &signature)
            .map_err(|_| VerificationError::VerificationFailed)?;

        let payload: T = serde_json::from_slice(&self.raw)
            .map_err(|e| VerificationError::MalformedPayload(e.to_string()))?;
        payload.authorize_signer(&public_key)?;

        Ok(payload)
    }
}

impl<T> SignedEnvelope<T> {
    /// Content hash of the signed payload bytes.
    pub fn content_hash(&self) -> SecureHash {
        SecureHash::sha256(&self.raw)
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Base64 SEC1 (compressed) encoding of the signer's key.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Build an envelope from its parts without checking anything.
    pub fn from_parts(raw: Vec<u8>, public_key: String, signature: String) -> Self {
        Self {
            raw,
            public_key,
            signature,
            _payload: PhantomData,
        }
    }
}

/// Base64 SEC1 (compressed) encoding of a P-256 public key.
pub fn encode_public_key(key: &VerifyingKey) -> String {
    STANDARD.encode(key.to_encoded_point(true).as_bytes())
}

pub fn decode_public_key(encoded: &str) -> Result<VerifyingKey, VerificationError> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| VerificationError::InvalidPublicKey(e.to_string()))?;
    VerifyingKey::from_sec1_bytes(&bytes)
        .map_err(|e| VerificationError::InvalidPublicKey(e.to_string()))
}

mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
    }

    impl SignedPayload for Note {}

    fn key(seed: u8) -> SigningKey {
        SigningKey::from_slice(&[seed; 32]).unwrap()
    }

    #[test]
    fn test_sign_then_verify() {
        let note = Note {
            text: "hello".to_string(),
        };
        let envelope = SignedEnvelope::sign(&note, &key(1)).unwrap();
        assert_eq!(envelope.verify().unwrap(), note);
    }

    #[test]
    fn test_content_hash_covers_raw_payload() {
        let note = Note {
            text: "hello".to_string(),
        };
        let envelope = SignedEnvelope::sign(&note, &key(1)).unwrap();
        let raw = serde_json::to_vec(&note).unwrap();
        assert_eq!(envelope.content_hash(), SecureHash::sha256(&raw));
    }

    #[test]
    fn test_tampered_payload_fails() {
        let envelope = SignedEnvelope::sign(
            &Note {
                text: "hello".to_string(),
            },
            &key(1),
        )
        .unwrap();
        let forged: SignedEnvelope<Note> = SignedEnvelope::from_parts(
            br#"{"text":"goodbye"}"#.to_vec(),
            envelope.public_key.clone(),
            envelope.signature.clone(),
        );
        assert!(matches!(
            forged.verify(),
            Err(VerificationError::VerificationFailed)
        ));
    }

    #[test]
    fn test_wrong_key_fails() {
        let envelope = SignedEnvelope::sign(
            &Note {
                text: "hello".to_string(),
            },
            &key(1),
        )
        .unwrap();
        let swapped: SignedEnvelope<Note> = SignedEnvelope::from_parts(
            envelope.raw.clone(),
            encode_public_key(key(2).verifying_key()),
            envelope.signature.clone(),
        );
        assert!(matches!(
            swapped.verify(),
            Err(VerificationError::VerificationFailed)
        ));
    }

    #[test]
    fn test_garbage_key_and_signature() {
        let envelope: SignedEnvelope<Note> =
            SignedEnvelope::from_parts(b"{}".to_vec(), "!!".to_string(), String::new());
        assert!(matches!(
            envelope.verify(),
            Err(VerificationError::InvalidPublicKey(_))
        ));

        let envelope: SignedEnvelope<Note> = SignedEnvelope::from_parts(
            b"{}".to_vec(),
            encode_public_key(key(1).verifying_key()),
            STANDARD.encode([0u8; 3]),
        );
        assert!(matches!(
            envelope.verify(),
            Err(VerificationError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_signed_garbage_is_malformed() {
        let signing_key = key(3);
        let raw = b"not json".to_vec();
        let signature: Signature = signing_key.sign(&raw);
        let envelope: SignedEnvelope<Note> = SignedEnvelope::from_parts(
            raw,
            encode_public_key(signing_key.verifying_key()),
            STANDARD.encode(signature.to_bytes()),
        );
        assert!(matches!(
            envelope.verify(),
            Err(VerificationError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_envelope_json_shape() {
        let envelope = SignedEnvelope::sign(
            &Note {
                text: "x".to_string(),
            },
            &key(1),
        )
        .unwrap();
        let json: serde_json::Value = serde_json::to_value(&envelope).unwrap();
        assert!(json.get("raw").is_some());
        assert!(json.get("publicKey").is_some());
        assert!(json.get("signature").is_some());

        let parsed: SignedEnvelope<Note> = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, envelope);
    }
}
