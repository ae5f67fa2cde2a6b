//! Risk and control self-assessment (RCSA) workflow.
//!
//! Rating factors roll up into one-decimal section scores, the residual score
//! is checked against the organisation's risk appetite, section progress is
//! derived from the form fields, and a review state machine gates approval
//! and challenge.

pub mod appetite;
pub mod autofill;
pub mod domain;
pub mod export;
pub mod form;
pub mod progress;
pub mod report;
pub mod repository;
pub mod review;
pub mod router;
pub mod scoring;
pub mod section;
pub mod service;

#[cfg(test)]
mod tests;

pub use appetite::{is_within_appetite, AppetiteEvaluation, RiskAppetiteEvaluator};
pub use autofill::{
    AutofillError, AutofillKind, AutofillProvider, AutofillRequest, AutofillResponse,
    AutofillSuggestion, AutofillTarget,
};
pub use domain::{
    AssessmentError, AssessmentSection, Control, ControlCategory, ControlEffect, ControlPatch,
    Issue, RatingFactor, RiskAppetite, TestOutcome, TestResults,
};
pub use export::ExportPayload;
pub use form::{
    AssessmentForm, AutofillOutcome, AutofillTicket, FactorField, FieldPath, FormUpdate,
    NewIssue, ProfilePatch, RiskProfile,
};
pub use progress::{
    ProgressStatus, SectionProgress, SectionProgressTracker, SectionRequirements,
};
pub use report::{AssessmentReport, AssessmentSummary};
pub use repository::{
    AlertError, AlertPublisher, AssessmentAlert, AssessmentId, AssessmentRecord,
    AssessmentRepository, AssessmentView, RepositoryError,
};
pub use review::{
    transition, ChallengeDetails, ChallengeRejected, ChallengeRequest, InvalidTransition,
    ReviewAction, ReviewError, ReviewStatus, ReviewWorkflow,
};
pub use router::assessment_router;
pub use scoring::{compute_weighted_score, ManualOverride, Score, ScoreBand};
pub use service::{AssessmentService, AssessmentServiceError};
