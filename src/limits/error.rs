use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum LimitsError {
    /// No authenticated email was supplied with the request.
    #[error("Unauthorized")]
    Unauthorized,
    #[error("User not found")]
    UserNotFound,
    /// Also returned when the caller is not a member of the team, so a
    /// non-member cannot learn whether a team id exists.
    #[error("Team not found")]
    TeamNotFound,
    #[error("Data access failure: {0}")]
    DataAccess(anyhow::Error),
}

impl From<anyhow::Error> for LimitsError {
    fn from(err: anyhow::Error) -> Self {
        LimitsError::DataAccess(err)
    }
}

impl IntoResponse for LimitsError {
    fn into_response(self) -> Response {
        let status = match &self {
            LimitsError::Unauthorized => StatusCode::UNAUTHORIZED,
            LimitsError::UserNotFound | LimitsError::TeamNotFound => StatusCode::NOT_FOUND,
            LimitsError::DataAccess(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn response_parts(err: LimitsError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn unauthorized_maps_to_401() {
        let (status, body) = response_parts(LimitsError::Unauthorized).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            body,
            serde_json::json!({ "error": "Unauthorized", "status": 401 })
        );
    }

    #[tokio::test]
    async fn not_found_variants_map_to_404() {
        let (status, body) = response_parts(LimitsError::UserNotFound).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            serde_json::json!({ "error": "User not found", "status": 404 })
        );

        let (status, body) = response_parts(LimitsError::TeamNotFound).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            serde_json::json!({ "error": "Team not found", "status": 404 })
        );
    }

    #[tokio::test]
    async fn data_access_maps_to_500() {
        let err = LimitsError::DataAccess(anyhow::anyhow!("connection reset"));
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            serde_json::json!({
                "error": "Data access failure: connection reset",
                "status": 500
            })
        );
    }
}
