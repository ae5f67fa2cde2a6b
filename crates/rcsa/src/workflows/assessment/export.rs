use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::RiskAppetite;
use super::form::AssessmentForm;
use super::scoring::Score;

/// Input handed to the presentation export collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    pub risk: String,
    pub era_id: String,
    pub assessment_id: String,
    pub assessment_date: Option<NaiveDate>,
    pub inherent_score: Score,
    pub control_score: Score,
    pub residual_score: Score,
    pub risk_appetite: RiskAppetite,
    pub is_within_appetite: bool,
    pub risk_hierarchy: String,
}

impl ExportPayload {
    pub fn from_form(form: &AssessmentForm) -> Self {
        let profile = form.profile();
        Self {
            risk: profile.risk.clone(),
            era_id: profile.era_id.clone(),
            assessment_id: profile.assessment_id.clone(),
            assessment_date: profile.assessment_date,
            inherent_score: form.inherent().score(),
            control_score: form.control().score(),
            residual_score: form.residual_score(),
            risk_appetite: form.risk_appetite().clone(),
            is_within_appetite: form.is_within_appetite(),
            risk_hierarchy: profile.risk_hierarchy.clone(),
        }
    }
}
