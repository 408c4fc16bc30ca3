//! Shared types for the network map directory

mod descriptor;
mod error;
mod rules;

pub use descriptor::{ParticipantDescriptor, SignedDescriptor};
pub use error::{ErrorCode, ErrorResponse};
pub use rules::{NetworkMap, NetworkRules, SignedNetworkMap, SignedNetworkRules};
