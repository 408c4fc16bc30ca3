//! API error types

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    BadRequest,
    NotFound,
    Unauthorized,
    NotInitialised,
    VersionTooLow,
    InternalError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub code: ErrorCode,
    /// Set with `VersionTooLow` so the caller learns the floor without another request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_version: Option<u32>,
}
