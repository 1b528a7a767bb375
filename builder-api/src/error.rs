use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no payload header cached for this slot/parent/pubkey")]
    NoHeaderAvailable,
    #[error("no payload cached for block hash {0:?}")]
    NoPayloadForBlock(ethereum_consensus::primitives::Hash32),
    #[error("blinded block's blob commitments do not match the cached bundle")]
    BlobCommitmentsMismatch,
    #[error("validator registration signature did not verify")]
    InvalidRegistrationSignature,
    #[error("missing or invalid auth token")]
    Unauthorized,
    #[error("invalid hex in request path or body")]
    InvalidHex,
    #[error("{0}")]
    Consensus(#[from] ethereum_consensus::Error),
    #[error("{0}")]
    Core(#[from] builder_core::Error),
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            Self::NoHeaderAvailable => StatusCode::NO_CONTENT,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            _ => StatusCode::BAD_REQUEST,
        };
        let message = self.to_string();
        (status, Json(json!({ "code": status.as_u16(), "message": message }))).into_response()
    }
}
