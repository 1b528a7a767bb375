use crate::{error::Error, state::AppState};
use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

/// Rejects write endpoints with 401 when `api_token_key` is configured and the request's token
/// header doesn't match it. A no-op when auth isn't configured.
pub async fn require_token<B>(
    State(state): State<AppState>,
    request: Request<B>,
    next: Next<B>,
) -> Result<Response, Error> {
    let Some(expected) = state.config.api_token_key.as_ref() else {
        return Ok(next.run(request).await)
    };
    let provided = request
        .headers()
        .get(&state.config.api_token_header)
        .and_then(|value| value.to_str().ok());
    if provided != Some(expected.as_str()) {
        return Err(Error::Unauthorized)
    }
    Ok(next.run(request).await)
}
