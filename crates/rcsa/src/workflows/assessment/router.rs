use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::autofill::AutofillError;
use super::domain::{AssessmentError, RatingFactor};
use super::form::{FormUpdate, RiskProfile};
use super::repository::{AlertPublisher, AssessmentId, AssessmentRepository, RepositoryError};
use super::review::{ChallengeRequest, ReviewError, CHALLENGE_REASONS};
use super::scoring::compute_weighted_score;
use super::service::{AssessmentService, AssessmentServiceError};

/// Router builder exposing the assessment workflow over HTTP.
pub fn assessment_router<R, A>(service: Arc<AssessmentService<R, A>>) -> Router
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/assessments",
            get(list_handler::<R, A>).post(create_handler::<R, A>),
        )
        .route(
            "/api/v1/assessments/:assessment_id",
            get(view_handler::<R, A>).patch(update_handler::<R, A>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/submit",
            post(submit_handler::<R, A>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/approve",
            post(approve_handler::<R, A>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/challenge",
            post(challenge_handler::<R, A>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/issues/appetite-breach",
            post(breach_issue_handler::<R, A>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/export",
            get(export_handler::<R, A>),
        )
        .route("/api/v1/challenge-reasons", get(challenge_reasons_handler))
        .route("/api/v1/scoring/preview", post(scoring_preview_handler))
        .with_state(service)
}

const DEFAULT_LIST_LIMIT: usize = 50;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRequest {
    pub updates: Vec<FormUpdate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApproveRequest {
    pub reviewer: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BreachIssueRequest {
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewFactor {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub weighting: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringPreviewRequest {
    pub factors: Vec<PreviewFactor>,
}

fn error_response(error: AssessmentServiceError) -> Response {
    let status = match &error {
        AssessmentServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        AssessmentServiceError::Repository(RepositoryError::Conflict)
        | AssessmentServiceError::Repository(RepositoryError::Stale { .. }) => StatusCode::CONFLICT,
        AssessmentServiceError::Assessment(AssessmentError::Finalized)
        | AssessmentServiceError::Autofill(AutofillError::Rejected(AssessmentError::Finalized))
        | AssessmentServiceError::Review(ReviewError::Transition(_)) => StatusCode::CONFLICT,
        AssessmentServiceError::Assessment(_)
        | AssessmentServiceError::Review(ReviewError::Challenge(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AssessmentServiceError::Autofill(AutofillError::Provider(_)) => StatusCode::BAD_GATEWAY,
        AssessmentServiceError::Autofill(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AssessmentServiceError::Repository(RepositoryError::Unavailable(_))
        | AssessmentServiceError::Alert(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, Json(payload)).into_response()
}

pub(crate) async fn create_handler<R, A>(
    State(service): State<Arc<AssessmentService<R, A>>>,
    Json(profile): Json<RiskProfile>,
) -> Response
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    match service.create(profile) {
        Ok(record) => {
            let view = record.view(service.requirements());
            (StatusCode::CREATED, Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_handler<R, A>(
    State(service): State<Arc<AssessmentService<R, A>>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    match service.list(limit) {
        Ok(records) => {
            let views: Vec<_> = records
                .iter()
                .map(|record| record.view(service.requirements()))
                .collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn view_handler<R, A>(
    State(service): State<Arc<AssessmentService<R, A>>>,
    Path(assessment_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    match service.get(&AssessmentId(assessment_id)) {
        Ok(record) => {
            let view = record.view(service.requirements());
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_handler<R, A>(
    State(service): State<Arc<AssessmentService<R, A>>>,
    Path(assessment_id): Path<String>,
    Json(request): Json<UpdateRequest>,
) -> Response
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    match service.update(&AssessmentId(assessment_id), request.updates) {
        Ok(record) => {
            let view = record.view(service.requirements());
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_handler<R, A>(
    State(service): State<Arc<AssessmentService<R, A>>>,
    Path(assessment_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    match service.submit(&AssessmentId(assessment_id)) {
        Ok(record) => {
            let view = record.view(service.requirements());
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn approve_handler<R, A>(
    State(service): State<Arc<AssessmentService<R, A>>>,
    Path(assessment_id): Path<String>,
    Json(request): Json<ApproveRequest>,
) -> Response
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    match service.approve(&AssessmentId(assessment_id), &request.reviewer) {
        Ok(record) => {
            let view = record.view(service.requirements());
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn challenge_handler<R, A>(
    State(service): State<Arc<AssessmentService<R, A>>>,
    Path(assessment_id): Path<String>,
    Json(request): Json<ChallengeRequest>,
) -> Response
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    match service.challenge(&AssessmentId(assessment_id), request) {
        Ok(record) => {
            let view = record.view(service.requirements());
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn breach_issue_handler<R, A>(
    State(service): State<Arc<AssessmentService<R, A>>>,
    Path(assessment_id): Path<String>,
    Json(request): Json<BreachIssueRequest>,
) -> Response
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    match service.raise_breach_issue(&AssessmentId(assessment_id), request.owner.as_deref()) {
        Ok(issue) => (StatusCode::CREATED, Json(issue)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn export_handler<R, A>(
    State(service): State<Arc<AssessmentService<R, A>>>,
    Path(assessment_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    match service.export(&AssessmentId(assessment_id)) {
        Ok(payload) => (StatusCode::OK, Json(payload)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn challenge_reasons_handler() -> Response {
    (StatusCode::OK, Json(CHALLENGE_REASONS)).into_response()
}

pub(crate) async fn scoring_preview_handler(Json(request): Json<ScoringPreviewRequest>) -> Response {
    let factors: Vec<RatingFactor> = request
        .factors
        .into_iter()
        .zip(1..)
        .map(|(factor, id)| RatingFactor {
            id,
            value: factor.value,
            weighting: factor.weighting,
            ..RatingFactor::default()
        })
        .collect();

    let score = compute_weighted_score(&factors);
    let band = score.band();
    let payload = json!({
        "score": score,
        "band": band,
        "label": band.label(),
        "color_class": band.color_class(),
    });
    (StatusCode::OK, Json(payload)).into_response()
}
