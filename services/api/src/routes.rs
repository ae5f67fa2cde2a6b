use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use rcsa::workflows::assessment::{
    assessment_router, AlertPublisher, AssessmentRepository, AssessmentService,
};
use rcsa::workflows::library::LibraryEntry;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_assessment_routes<R, A>(
    service: Arc<AssessmentService<R, A>>,
) -> axum::Router
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    let library: Vec<LibraryEntry> = service.library().entries().to_vec();

    assessment_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/control-library",
            axum::routing::get(move || {
                let library = library.clone();
                async move { Json(library) }
            }),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
