use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::http::errors::ApiError;
use crate::http::state::AppState;

/// X-API-Key check for the mutating route. A server without a configured
/// key runs open, matching local-development use.
pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.config.api_key.as_deref() else {
        return Ok(next.run(req).await);
    };

    let provided = req
        .headers()
        .get("x-api-key")
        .and_then(|h| h.to_str().ok());

    match provided {
        Some(key) if key == expected => Ok(next.run(req).await),
        _ => Err(ApiError::Unauthorized),
    }
}
