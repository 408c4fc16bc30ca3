//! Network map library
//!
//! Types, content hashes and signed envelopes shared by the directory service
//! and the participants that publish to it.

#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::unwrap_in_result)
)]

pub mod envelope;
pub mod hash;
pub mod types;

pub use envelope::{SignedEnvelope, SignedPayload, VerificationError, encode_public_key};
pub use hash::{HashParseError, SecureHash};
pub use types::{
    ErrorCode, ErrorResponse, NetworkMap, NetworkRules, ParticipantDescriptor, SignedDescriptor,
    SignedNetworkMap, SignedNetworkRules,
};
