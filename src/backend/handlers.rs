use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};

use crate::backend::AppState;
use crate::db::models::{Role, SubscriptionStatus, SubscriptionType};
use crate::jobs::types::{Job, JobPayload};
use crate::limits::{LimitsError, LimitsRequest, LimitsResponse};
use crate::utils::logs_fmt::mask_email;

pub async fn limits_handler(
    State(state): State<AppState>,
    Json(payload): Json<LimitsRequest>,
) -> Result<Json<LimitsResponse>, LimitsError> {
    let resolved = state.resolver.resolve(&payload).await?;

    info!(
        email = %payload.email.as_deref().map(mask_email).unwrap_or_default(),
        team_id = payload.team_id,
        "Limits resolved"
    );

    Ok(Json(resolved))
}

#[derive(Debug, serde::Deserialize)]
pub struct CanSendDocumentRequest {
    pub email: String,
}

/// Reports whether another document fits in the caller's current-month
/// quota. The document-creation flow makes the actual admission decision.
pub async fn can_send_document_handler(
    State(state): State<AppState>,
    Json(payload): Json<CanSendDocumentRequest>,
) -> Result<impl IntoResponse, LimitsError> {
    let resolved = state
        .resolver
        .resolve(&LimitsRequest {
            email: Some(payload.email.clone()),
            team_id: None,
        })
        .await?;

    Ok(Json(serde_json::json!({
        "allowed": !resolved.remaining.documents.is_exhausted(),
        "remainingDocuments": resolved.remaining.documents,
    })))
}

#[derive(Debug, serde::Deserialize)]
pub struct UpdateSubscriptionRequest {
    pub id: i64,
    pub status: Option<SubscriptionStatus>,
    #[serde(rename = "type")]
    pub plan_type: Option<SubscriptionType>,
}

pub async fn admin_update_subscription_handler(
    State(state): State<AppState>,
    Json(payload): Json<UpdateSubscriptionRequest>,
) -> impl IntoResponse {
    match state
        .repo
        .update_subscription(payload.id, payload.status, payload.plan_type)
        .await
    {
        Ok(subscription) => {
            info!(
                subscription_id = subscription.id,
                status = ?subscription.status,
                plan = ?subscription.plan_type,
                "Subscription updated"
            );
            (StatusCode::OK, Json(serde_json::json!(subscription)))
        }
        Err(e) => {
            warn!(subscription_id = payload.id, "Failed to update subscription: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
        }
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct UpdateUserRequest {
    pub id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub roles: Option<Vec<Role>>,
}

pub async fn admin_update_user_handler(
    State(state): State<AppState>,
    Json(payload): Json<UpdateUserRequest>,
) -> impl IntoResponse {
    match state
        .repo
        .update_user_profile(payload.id, payload.name, payload.email, payload.roles)
        .await
    {
        Ok(user) => {
            info!(user_id = user.id, "User profile updated");
            (StatusCode::OK, Json(serde_json::json!(user)))
        }
        Err(e) => {
            warn!(user_id = payload.id, "Failed to update user: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
        }
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct UpgradeEmailRequest {
    pub user_id: i64,
}

pub async fn admin_upgrade_email_handler(
    State(state): State<AppState>,
    Json(payload): Json<UpgradeEmailRequest>,
) -> impl IntoResponse {
    let job = Job::new(JobPayload::SendAccountUpgradeEmail {
        user_id: payload.user_id,
    });
    let job_id = job.id;

    match state.jobs.send(job).await {
        Ok(()) => {
            info!(user_id = payload.user_id, %job_id, "Upgrade email queued");
            (
                StatusCode::ACCEPTED,
                Json(serde_json::json!({ "status": "queued", "job_id": job_id })),
            )
        }
        Err(e) => {
            warn!(user_id = payload.user_id, "Failed to queue upgrade email: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "error": "job queue unavailable" })),
            )
        }
    }
}

pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    match crate::db::health_check(state.repo.pool()).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "status": "ok" }))),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": e.to_string() })),
        ),
    }
}
