use std::time::Duration;

use axum::{
    Router,
    middleware::{self},
    routing,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::backend::{
    AppState,
    handlers::{
        admin_update_subscription_handler, admin_update_user_handler,
        admin_upgrade_email_handler, can_send_document_handler, health_handler, limits_handler,
    },
    middleware::api_key_auth,
};

pub fn build_router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/subscription", routing::post(admin_update_subscription_handler))
        .route("/user", routing::post(admin_update_user_handler))
        .route("/upgrade_email", routing::post(admin_upgrade_email_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), api_key_auth));

    Router::new()
        .route("/limits", routing::post(limits_handler))
        .route("/documents/can_send", routing::post(can_send_document_handler))
        .route("/health", routing::get(health_handler))
        .nest("/admin", admin)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
