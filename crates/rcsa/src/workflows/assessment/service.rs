use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;

use super::autofill::{AutofillError, AutofillProvider, AutofillResponse, AutofillTarget};
use super::domain::{AssessmentError, Issue, RiskAppetite};
use super::export::ExportPayload;
use super::form::{AssessmentForm, AutofillOutcome, AutofillTicket, FormUpdate, RiskProfile};
use super::progress::SectionRequirements;
use super::report::{AssessmentReport, AssessmentSummary};
use super::repository::{
    AlertError, AlertPublisher, AssessmentAlert, AssessmentId, AssessmentRecord,
    AssessmentRepository, RepositoryError,
};
use super::review::{ChallengeRequest, ReviewError};
use crate::workflows::library::ControlLibrary;

/// Service composing the repository, alert hooks, control library, and appetite.
pub struct AssessmentService<R, A> {
    repository: Arc<R>,
    alerts: Arc<A>,
    library: Arc<ControlLibrary>,
    requirements: Arc<SectionRequirements>,
    appetite: RiskAppetite,
}

const AUTOFILL_SAVE_ATTEMPTS: u32 = 3;

static ASSESSMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_assessment_id() -> AssessmentId {
    let id = ASSESSMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AssessmentId(format!("RCSA-{id:06}"))
}

impl<R, A> AssessmentService<R, A>
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    pub fn new(repository: Arc<R>, alerts: Arc<A>, appetite: RiskAppetite) -> Self {
        Self::with_library(repository, alerts, appetite, ControlLibrary::standard())
    }

    pub fn with_library(
        repository: Arc<R>,
        alerts: Arc<A>,
        appetite: RiskAppetite,
        library: ControlLibrary,
    ) -> Self {
        Self {
            repository,
            alerts,
            library: Arc::new(library),
            requirements: Arc::new(SectionRequirements::standard()),
            appetite,
        }
    }

    pub fn library(&self) -> &ControlLibrary {
        &self.library
    }

    pub fn requirements(&self) -> &SectionRequirements {
        &self.requirements
    }

    pub fn appetite(&self) -> &RiskAppetite {
        &self.appetite
    }

    /// Open a new Draft assessment with the standard factor sets.
    pub fn create(
        &self,
        mut profile: RiskProfile,
    ) -> Result<AssessmentRecord, AssessmentServiceError> {
        let id = next_assessment_id();
        let now = Utc::now();
        if profile.assessment_id.trim().is_empty() {
            profile.assessment_id = id.0.clone();
        }
        if profile.assessment_date.is_none() {
            profile.assessment_date = Some(now.date_naive());
        }

        let record = AssessmentRecord {
            id,
            form: AssessmentForm::new(profile, self.appetite.clone()),
            revision: 0,
            created_at: now,
            updated_at: now,
        };

        let stored = self.repository.insert(record)?;
        tracing::info!(assessment_id = %stored.id, risk = %stored.form.profile().risk, "assessment created");
        Ok(stored)
    }

    pub fn get(&self, id: &AssessmentId) -> Result<AssessmentRecord, AssessmentServiceError> {
        let record = self.repository.fetch(id)?.ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    pub fn list(&self, limit: usize) -> Result<Vec<AssessmentRecord>, AssessmentServiceError> {
        Ok(self.repository.list(limit)?)
    }

    /// Apply a batch of edits. Either every update lands or none does.
    pub fn update(
        &self,
        id: &AssessmentId,
        updates: Vec<FormUpdate>,
    ) -> Result<AssessmentRecord, AssessmentServiceError> {
        let mut record = self.get(id)?;
        let mut form = record.form.clone();
        let count = updates.len();
        for update in updates {
            form.apply(update, &self.library)?;
        }

        record.form = form;
        self.save(&mut record)?;
        tracing::debug!(assessment_id = %id, updates = count, "assessment updated");
        Ok(record)
    }

    pub fn submit(&self, id: &AssessmentId) -> Result<AssessmentRecord, AssessmentServiceError> {
        let mut record = self.get(id)?;
        let status = record.form.submit()?;
        self.save(&mut record)?;
        tracing::info!(assessment_id = %id, status = %status, "assessment submitted for review");
        Ok(record)
    }

    pub fn approve(
        &self,
        id: &AssessmentId,
        reviewer: &str,
    ) -> Result<AssessmentRecord, AssessmentServiceError> {
        let mut record = self.get(id)?;
        let status = record.form.approve(reviewer, Utc::now())?;
        self.save(&mut record)?;
        tracing::info!(assessment_id = %id, status = %status, reviewer, "assessment approved");

        let mut details = BTreeMap::new();
        details.insert("reviewer".to_string(), reviewer.to_string());
        details.insert(
            "residual_score".to_string(),
            record.form.residual_score().to_string(),
        );
        self.alerts.publish(AssessmentAlert {
            template: "assessment_approved".to_string(),
            assessment_id: id.clone(),
            details,
        })?;
        Ok(record)
    }

    pub fn challenge(
        &self,
        id: &AssessmentId,
        request: ChallengeRequest,
    ) -> Result<AssessmentRecord, AssessmentServiceError> {
        let mut record = self.get(id)?;
        let details = record.form.challenge(request, Utc::now())?.clone();
        self.save(&mut record)?;

        let sections = record
            .form
            .review()
            .challenged_sections()
            .into_iter()
            .map(|section| section.key())
            .collect::<Vec<_>>()
            .join(",");
        tracing::info!(
            assessment_id = %id,
            reviewer = %details.reviewer,
            sections = %sections,
            "assessment returned for rework"
        );

        let mut alert_details = BTreeMap::new();
        alert_details.insert("reviewer".to_string(), details.reviewer);
        alert_details.insert("reasons".to_string(), details.reasons.join("; "));
        alert_details.insert("sections".to_string(), sections);
        self.alerts.publish(AssessmentAlert {
            template: "assessment_challenged".to_string(),
            assessment_id: id.clone(),
            details: alert_details,
        })?;
        Ok(record)
    }

    /// Create a remediation issue for a residual score above appetite.
    /// The owner defaults to the assessor.
    pub fn raise_breach_issue(
        &self,
        id: &AssessmentId,
        owner: Option<&str>,
    ) -> Result<Issue, AssessmentServiceError> {
        let mut record = self.get(id)?;
        let owner = owner
            .map(str::to_string)
            .unwrap_or_else(|| record.form.profile().assessor.clone());
        let issue = record
            .form
            .raise_breach_issue(&owner, Utc::now().date_naive())?
            .clone();
        self.save(&mut record)?;
        tracing::warn!(
            assessment_id = %id,
            issue_key = %issue.issue_key,
            residual_score = %record.form.residual_score(),
            threshold = record.form.risk_appetite().threshold,
            "risk appetite breach issue raised"
        );

        let mut details = BTreeMap::new();
        details.insert("issue_key".to_string(), issue.issue_key.clone());
        details.insert("owner".to_string(), issue.owner.clone());
        details.insert("due_date".to_string(), issue.due_date.to_string());
        self.alerts.publish(AssessmentAlert {
            template: "appetite_breach".to_string(),
            assessment_id: id.clone(),
            details,
        })?;
        Ok(issue)
    }

    pub fn export(&self, id: &AssessmentId) -> Result<ExportPayload, AssessmentServiceError> {
        let record = self.get(id)?;
        Ok(ExportPayload::from_form(&record.form))
    }

    pub fn summary(&self, id: &AssessmentId) -> Result<AssessmentSummary, AssessmentServiceError> {
        let record = self.get(id)?;
        Ok(AssessmentReport::new(&record.form, &self.requirements).summary())
    }

    pub fn begin_autofill(
        &self,
        id: &AssessmentId,
        target: AutofillTarget,
    ) -> Result<AutofillTicket, AssessmentServiceError> {
        let record = self.get(id)?;
        Ok(record.form.autofill_ticket(target)?)
    }

    /// Apply a collaborator result against the latest stored form.
    pub fn complete_autofill(
        &self,
        id: &AssessmentId,
        ticket: &AutofillTicket,
        response: &AutofillResponse,
    ) -> Result<AutofillOutcome, AssessmentServiceError> {
        let mut attempt = 1;
        let outcome = loop {
            let mut record = self.get(id)?;
            let outcome = record.form.apply_autofill(ticket, response)?;
            if outcome.applied.is_empty() {
                break outcome;
            }
            match self.save(&mut record) {
                Ok(()) => break outcome,
                // Re-check the edit stamps against whatever was saved in between.
                Err(AssessmentServiceError::Repository(RepositoryError::Stale { found, .. }))
                    if attempt < AUTOFILL_SAVE_ATTEMPTS =>
                {
                    tracing::debug!(
                        assessment_id = %id,
                        revision = found,
                        attempt,
                        "autofill save raced an edit, retrying"
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        };
        if !outcome.discarded.is_empty() {
            tracing::info!(
                assessment_id = %id,
                discarded = outcome.discarded.len(),
                applied = outcome.applied.len(),
                "autofill result discarded for fields edited since the request"
            );
        }
        Ok(outcome)
    }

    /// Request, await, and apply one autofill. Provider failures leave the assessment untouched.
    pub fn autofill<P>(
        &self,
        id: &AssessmentId,
        target: AutofillTarget,
        provider: &P,
    ) -> Result<AutofillOutcome, AssessmentServiceError>
    where
        P: AutofillProvider + ?Sized,
    {
        let ticket = self.begin_autofill(id, target)?;
        let response = provider.complete(ticket.request()).map_err(|err| {
            tracing::warn!(assessment_id = %id, error = %err, "autofill provider failed");
            err
        })?;
        self.complete_autofill(id, &ticket, &response)
    }

    /// Writes back a record read earlier; fails as stale if anyone saved in between.
    fn save(&self, record: &mut AssessmentRecord) -> Result<(), AssessmentServiceError> {
        let expected = record.revision;
        record.revision = expected + 1;
        record.updated_at = Utc::now();
        self.repository.update(record.clone(), expected)?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssessmentServiceError {
    #[error(transparent)]
    Assessment(#[from] AssessmentError),
    #[error(transparent)]
    Review(#[from] ReviewError),
    #[error(transparent)]
    Autofill(#[from] AutofillError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Alert(#[from] AlertError),
}
