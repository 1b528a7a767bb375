use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Jwt(#[from] crate::jwt::Error),
    #[error("http error calling the engine API: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("engine API returned an error response: {code} {message}")]
    Rpc { code: i64, message: String },
    #[error("payload {0} is not ready yet")]
    PayloadNotReady(String),
    #[error("deadline elapsed before the engine produced a payload")]
    Deadline,
    #[error("CL beacon API error: {0}")]
    BeaconApi(String),
}
