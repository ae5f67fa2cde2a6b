use chrono::{Duration, NaiveDate};
use serde::Serialize;

use super::domain::{Issue, RiskAppetite};
use super::scoring::Score;

pub const BREACH_ISSUE_DUE_DAYS: i64 = 14;

/// Within appetite iff the residual score does not exceed the threshold.
pub fn is_within_appetite(residual: f64, threshold: f64) -> bool {
    residual <= threshold
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppetiteEvaluation {
    pub residual_score: Score,
    pub threshold: f64,
    pub level: String,
    pub within_appetite: bool,
    /// Negative once the residual score exceeds the threshold.
    pub headroom: f64,
}

/// Compares residual scores against the organisation's risk appetite.
#[derive(Debug, Clone)]
pub struct RiskAppetiteEvaluator {
    appetite: RiskAppetite,
}

impl RiskAppetiteEvaluator {
    pub fn new(appetite: RiskAppetite) -> Self {
        Self { appetite }
    }

    pub fn appetite(&self) -> &RiskAppetite {
        &self.appetite
    }

    pub fn evaluate(&self, residual: Score) -> AppetiteEvaluation {
        let threshold = self.appetite.threshold;
        AppetiteEvaluation {
            residual_score: residual,
            threshold,
            level: self.appetite.level.clone(),
            within_appetite: is_within_appetite(residual.value(), threshold),
            headroom: Score::new(threshold - residual.value()).value(),
        }
    }

    /// Synthesizes the remediation issue for a breach. Not deduplicated:
    /// every call yields a fresh issue.
    pub fn breach_issue(
        &self,
        residual: Score,
        owner: &str,
        id: u32,
        sequence: u32,
        triggered_on: NaiveDate,
    ) -> Issue {
        breach_issue(
            residual,
            self.appetite.threshold,
            owner,
            id,
            sequence,
            triggered_on,
        )
    }
}

pub fn breach_issue(
    residual: Score,
    threshold: f64,
    owner: &str,
    id: u32,
    sequence: u32,
    triggered_on: NaiveDate,
) -> Issue {
    Issue {
        id,
        issue_key: format!("ISS-APP-{sequence}"),
        title: "Residual risk exceeds risk appetite".to_string(),
        description: format!(
            "Residual risk score of {residual} exceeds the risk appetite threshold of {threshold:.1}. \
             A remediation plan is required to bring the residual risk back within appetite."
        ),
        due_date: triggered_on + Duration::days(BREACH_ISSUE_DUE_DAYS),
        owner: owner.to_string(),
    }
}
