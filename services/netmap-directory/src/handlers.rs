//! Network map REST API handlers

use axum::{
    Json,
    body::Bytes,
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use netmap::{ErrorCode, ErrorResponse, SecureHash, SignedDescriptor};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::cache::{CacheError, SnapshotCache};
use crate::registration::{RegistrationError, RegistrationValidator};
use crate::storage::StorageError;

const OCTET_STREAM: &str = "application/octet-stream";

pub struct AppState {
    pub cache: Arc<SnapshotCache>,
    pub registration: RegistrationValidator,
}

#[derive(Debug)]
pub struct ApiError(pub StatusCode, pub Json<ErrorResponse>);

impl ApiError {
    fn new(status: StatusCode, code: ErrorCode, msg: impl Into<String>) -> Self {
        ApiError(
            status,
            Json(ErrorResponse {
                error: msg.into(),
                code,
                required_version: None,
            }),
        )
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorCode::NotFound, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorCode::BadRequest, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized, msg)
    }

    pub fn not_initialised(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::NotInitialised,
            msg,
        )
    }

    pub fn version_too_low(required: u32) -> Self {
        let mut err = Self::new(
            StatusCode::BAD_REQUEST,
            ErrorCode::VersionTooLow,
            format!("Minimum platform version is {}", required),
        );
        err.1.required_version = Some(required);
        err
    }

    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::InternalError,
            msg,
        )
    }
}

impl From<RegistrationError> for ApiError {
    fn from(e: RegistrationError) -> Self {
        match e {
            RegistrationError::Unauthorized(e) => ApiError::unauthorized(e.to_string()),
            RegistrationError::NotInitialised => ApiError::not_initialised(e.to_string()),
            RegistrationError::VersionTooLow { required, .. } => {
                ApiError::version_too_low(required)
            }
            RegistrationError::Storage(_) | RegistrationError::Cache(_) => {
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<CacheError> for ApiError {
    fn from(e: CacheError) -> Self {
        tracing::error!("Failed to load network map: {}", e);
        ApiError::internal_error("Internal server error")
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        tracing::error!("Storage error: {}", e);
        ApiError::internal_error("Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

fn parse_hash(hash: &str) -> Result<SecureHash, ApiError> {
    hash.parse()
        .map_err(|e| ApiError::bad_request(format!("Invalid hash '{}': {}", hash, e)))
}

fn octet_response<T: Serialize>(payload: &T) -> Result<Response, ApiError> {
    let bytes = serde_json::to_vec(payload)
        .map_err(|e| ApiError::internal_error(format!("Failed to serialize response: {}", e)))?;
    Ok(([(header::CONTENT_TYPE, OCTET_STREAM)], bytes).into_response())
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Accept a signed descriptor published by a participant.
pub async fn publish(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let envelope: SignedDescriptor = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!("Rejected malformed descriptor: {}", e);
        ApiError::unauthorized(format!("Malformed descriptor: {}", e))
    })?;

    match state.registration.register(envelope).await {
        Ok(_) => Ok(StatusCode::OK),
        Err(e) => {
            if matches!(
                e,
                RegistrationError::Storage(_) | RegistrationError::Cache(_)
            ) {
                tracing::error!(
                    "Unexpected error encountered while processing request: {}",
                    e
                );
            }
            Err(e.into())
        }
    }
}

/// Serve the current signed network map with a cache hint matching its remaining lifetime.
pub async fn get_network_map(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let cached = state.cache.current().await?;
    let network_map = cached
        .network_map
        .as_ref()
        .ok_or_else(|| ApiError::not_found("Network map has not been published"))?;

    let mut response = octet_response(&**network_map)?;
    let max_age = format!("max-age={}", cached.time_to_live().as_secs());
    if let Ok(value) = HeaderValue::from_str(&max_age) {
        response.headers_mut().insert(header::CACHE_CONTROL, value);
    }
    Ok(response)
}

pub async fn get_node_info(
    State(state): State<Arc<AppState>>,
    Path(node_info_hash): Path<String>,
) -> Result<Response, ApiError> {
    let hash = parse_hash(&node_info_hash)?;
    let descriptor = state.registration.get_descriptor(&hash).await?;
    tracing::trace!("Processed node info request for hash: '{}'", hash);

    match descriptor {
        Some(descriptor) => octet_response(&descriptor),
        None => Err(ApiError::not_found(format!("Node info not found: {}", hash))),
    }
}

pub async fn get_network_parameters(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
) -> Result<Response, ApiError> {
    let hash = parse_hash(&hash)?;
    let rules = state.registration.get_rules(&hash).await?;
    tracing::trace!("Processed network parameters request for hash: '{}'", hash);

    match rules {
        Some(rules) => octet_response(&rules),
        None => Err(ApiError::not_found(format!(
            "Network parameters not found: {}",
            hash
        ))),
    }
}

/// Report the caller's address as seen by the directory, preferring a proxy's `X-Forwarded-For`.
pub async fn my_ip(headers: HeaderMap, ConnectInfo(addr): ConnectInfo<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let ip = forwarded.unwrap_or_else(|| addr.to_string());
    tracing::trace!("Processed ip request from client, IP: '{}'", ip);
    ip
}
