use axum::{
    extract::{Json, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

use crate::backend::AppState;

/// Bearer-key check for the admin routes. The key comes from configuration;
/// user-facing routes stay in front of this layer.
pub async fn api_key_auth(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<serde_json::Value>)> {
    let provided = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(key) if key == state.api_key.as_str() => Ok(next.run(req).await),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "invalid or missing API key" })),
        )),
    }
}
