use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::workflows::assessment::autofill::{
    AutofillError, AutofillProvider, AutofillRequest, AutofillResponse,
};
use crate::workflows::assessment::domain::{AssessmentSection, RiskAppetite};
use crate::workflows::assessment::form::{FactorField, FormUpdate, RiskProfile};
use crate::workflows::assessment::repository::{
    AlertError, AlertPublisher, AssessmentAlert, AssessmentId, AssessmentRecord,
    AssessmentRepository, RepositoryError,
};
use crate::workflows::assessment::review::ChallengeRequest;
use crate::workflows::assessment::{assessment_router, AssessmentService};
use crate::workflows::library::ControlLibrary;

pub(super) fn appetite() -> RiskAppetite {
    RiskAppetite::new(3.0, "Moderate")
}

pub(super) fn profile() -> RiskProfile {
    RiskProfile {
        risk: "Unauthorised payment release".to_string(),
        era_id: "ERA-1187".to_string(),
        risk_hierarchy: "Operational > Payments > Release".to_string(),
        assessor: "M. Okafor".to_string(),
        ..RiskProfile::default()
    }
}

pub(super) fn set_value(section: AssessmentSection, factor_id: u32, value: &str) -> FormUpdate {
    FormUpdate::SetFactorField {
        section,
        factor_id,
        field: FactorField::Value,
        value: value.to_string(),
    }
}

pub(super) fn comments(section: AssessmentSection, text: &str) -> FormUpdate {
    FormUpdate::SetSectionComments {
        section,
        comments: text.to_string(),
    }
}

/// Inherent 4/2/3/5 at 25% (3.5), control 3 at 100% (3.0), residual 4/4 (4.0), all commented.
pub(super) fn completed_updates() -> Vec<FormUpdate> {
    vec![
        set_value(AssessmentSection::Inherent, 1, "4"),
        set_value(AssessmentSection::Inherent, 2, "2"),
        set_value(AssessmentSection::Inherent, 3, "3"),
        set_value(AssessmentSection::Inherent, 4, "5"),
        comments(AssessmentSection::Inherent, "High payment volumes"),
        set_value(AssessmentSection::Control, 1, "3"),
        FormUpdate::SetFactorField {
            section: AssessmentSection::Control,
            factor_id: 1,
            field: FactorField::Weighting,
            value: "100".to_string(),
        },
        comments(AssessmentSection::Control, "Dual control in place"),
        set_value(AssessmentSection::Residual, 1, "4"),
        set_value(AssessmentSection::Residual, 2, "4"),
        comments(AssessmentSection::Residual, "Residual exposure remains"),
        comments(AssessmentSection::Issues, "Breach to be tracked"),
    ]
}

pub(super) fn challenge_request() -> ChallengeRequest {
    ChallengeRequest {
        reviewer: "Second line risk".to_string(),
        justification: "Inherent scores ignore the 2024 loss events".to_string(),
        reasons: vec!["Incorrect risk score assessment".to_string()],
    }
}

pub(super) fn build_service() -> (
    AssessmentService<MemoryRepository, MemoryAlerts>,
    Arc<MemoryRepository>,
    Arc<MemoryAlerts>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let alerts = Arc::new(MemoryAlerts::default());
    let service = AssessmentService::new(repository.clone(), alerts.clone(), appetite());
    (service, repository, alerts)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<AssessmentId, AssessmentRecord>>>,
}

impl AssessmentRepository for MemoryRepository {
    fn insert(&self, record: AssessmentRecord) -> Result<AssessmentRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(
        &self,
        record: AssessmentRecord,
        expected_revision: u64,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let stored = guard.get(&record.id).ok_or(RepositoryError::NotFound)?;
        if stored.revision != expected_revision {
            return Err(RepositoryError::Stale {
                expected: expected_revision,
                found: stored.revision,
            });
        }
        guard.insert(record.id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &AssessmentId) -> Result<Option<AssessmentRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list(&self, limit: usize) -> Result<Vec<AssessmentRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().take(limit).cloned().collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryAlerts {
    events: Arc<Mutex<Vec<AssessmentAlert>>>,
}

impl MemoryAlerts {
    pub(super) fn events(&self) -> Vec<AssessmentAlert> {
        self.events.lock().expect("alert mutex poisoned").clone()
    }
}

impl AlertPublisher for MemoryAlerts {
    fn publish(&self, alert: AssessmentAlert) -> Result<(), AlertError> {
        self.events
            .lock()
            .expect("alert mutex poisoned")
            .push(alert);
        Ok(())
    }
}

/// Saves queued edits behind the caller's back right after its next read,
/// the way a second session saving in between would.
#[derive(Default)]
pub(super) struct InterleavingRepository {
    pub(super) inner: MemoryRepository,
    queued: Mutex<Vec<FormUpdate>>,
}

impl InterleavingRepository {
    pub(super) fn save_after_next_read(&self, updates: Vec<FormUpdate>) {
        *self.queued.lock().expect("queue mutex poisoned") = updates;
    }
}

impl AssessmentRepository for InterleavingRepository {
    fn insert(&self, record: AssessmentRecord) -> Result<AssessmentRecord, RepositoryError> {
        self.inner.insert(record)
    }

    fn update(
        &self,
        record: AssessmentRecord,
        expected_revision: u64,
    ) -> Result<(), RepositoryError> {
        self.inner.update(record, expected_revision)
    }

    fn fetch(&self, id: &AssessmentId) -> Result<Option<AssessmentRecord>, RepositoryError> {
        let read = self.inner.fetch(id)?;
        let queued = std::mem::take(&mut *self.queued.lock().expect("queue mutex poisoned"));
        match &read {
            Some(record) if !queued.is_empty() => {
                let mut edited = record.clone();
                let library = ControlLibrary::standard();
                for update in queued {
                    edited
                        .form
                        .apply(update, &library)
                        .expect("queued edit applies");
                }
                edited.revision += 1;
                self.inner.update(edited, record.revision)?;
            }
            _ => {}
        }
        Ok(read)
    }

    fn list(&self, limit: usize) -> Result<Vec<AssessmentRecord>, RepositoryError> {
        self.inner.list(limit)
    }
}

pub(super) struct UnavailableRepository;

impl AssessmentRepository for UnavailableRepository {
    fn insert(&self, _record: AssessmentRecord) -> Result<AssessmentRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(
        &self,
        _record: AssessmentRecord,
        _expected_revision: u64,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &AssessmentId) -> Result<Option<AssessmentRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self, _limit: usize) -> Result<Vec<AssessmentRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Provider returning a canned result and recording the requests it saw.
pub(super) struct ScriptedProvider {
    result: Result<String, String>,
    pub(super) requests: Mutex<Vec<AutofillRequest>>,
}

impl ScriptedProvider {
    pub(super) fn answering(result: &str) -> Self {
        Self {
            result: Ok(result.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl AutofillProvider for ScriptedProvider {
    fn complete(&self, request: &AutofillRequest) -> Result<AutofillResponse, AutofillError> {
        self.requests
            .lock()
            .expect("provider mutex poisoned")
            .push(request.clone());
        match &self.result {
            Ok(result) => Ok(AutofillResponse {
                result: result.clone(),
            }),
            Err(message) => Err(AutofillError::Provider(message.clone())),
        }
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn router_with_service(
    service: AssessmentService<MemoryRepository, MemoryAlerts>,
) -> axum::Router {
    assessment_router(Arc::new(service))
}
