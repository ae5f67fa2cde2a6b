use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::form::AssessmentForm;
use super::progress::SectionRequirements;
use super::report::{AssessmentReport, AssessmentSummary};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssessmentId(pub String);

impl fmt::Display for AssessmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stored assessment session. `revision` counts saves since creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentRecord {
    pub id: AssessmentId,
    pub form: AssessmentForm,
    #[serde(default)]
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AssessmentRecord {
    pub fn view(&self, requirements: &SectionRequirements) -> AssessmentView {
        AssessmentView {
            id: self.id.clone(),
            status: self.form.status().label(),
            form: self.form.clone(),
            summary: AssessmentReport::new(&self.form, requirements).summary(),
            revision: self.revision,
            updated_at: self.updated_at,
        }
    }
}

/// Storage abstraction so the service can be exercised in isolation.
pub trait AssessmentRepository: Send + Sync {
    fn insert(&self, record: AssessmentRecord) -> Result<AssessmentRecord, RepositoryError>;
    /// Replaces the stored record only while its revision still equals
    /// `expected_revision`; otherwise fails with [`RepositoryError::Stale`].
    fn update(
        &self,
        record: AssessmentRecord,
        expected_revision: u64,
    ) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &AssessmentId) -> Result<Option<AssessmentRecord>, RepositoryError>;
    fn list(&self, limit: usize) -> Result<Vec<AssessmentRecord>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record changed since revision {expected} (now at {found})")]
    Stale { expected: u64, found: u64 },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound notification hook (e-mail, workflow tooling, ...).
pub trait AlertPublisher: Send + Sync {
    fn publish(&self, alert: AssessmentAlert) -> Result<(), AlertError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentAlert {
    pub template: String,
    pub assessment_id: AssessmentId,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("alert transport unavailable: {0}")]
    Transport(String),
}

/// API representation of a stored assessment.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentView {
    pub id: AssessmentId,
    pub status: &'static str,
    pub form: AssessmentForm,
    pub summary: AssessmentSummary,
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
}
