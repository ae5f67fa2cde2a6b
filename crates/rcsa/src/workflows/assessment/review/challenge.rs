use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::reasons::find_reason;

pub const MIN_JUSTIFICATION_CHARS: usize = 20;

/// Reviewer input for returning an assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeRequest {
    pub reviewer: String,
    pub justification: String,
    pub reasons: Vec<String>,
}

impl ChallengeRequest {
    /// Gate applied before a challenge can be submitted.
    pub fn validate(&self) -> Result<(), ChallengeRejected> {
        if self.reasons.is_empty() {
            return Err(ChallengeRejected::MissingReasons);
        }

        if let Some(unknown) = self
            .reasons
            .iter()
            .find(|reason| find_reason(reason).is_none())
        {
            return Err(ChallengeRejected::UnknownReason(unknown.clone()));
        }

        let found = self.justification.chars().count();
        if found < MIN_JUSTIFICATION_CHARS {
            return Err(ChallengeRejected::JustificationTooShort {
                min: MIN_JUSTIFICATION_CHARS,
                found,
            });
        }

        Ok(())
    }

    pub fn can_submit(&self) -> bool {
        self.validate().is_ok()
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ChallengeRejected {
    #[error("select at least one challenge reason")]
    MissingReasons,
    #[error("unknown challenge reason '{0}'")]
    UnknownReason(String),
    #[error("justification needs at least {min} characters (found {found})")]
    JustificationTooShort { min: usize, found: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeDetails {
    pub reviewer: String,
    pub date: DateTime<Utc>,
    pub reasons: Vec<String>,
    pub justification: String,
}

impl ChallengeDetails {
    pub(crate) fn from_request(request: ChallengeRequest, date: DateTime<Utc>) -> Self {
        let ChallengeRequest {
            reviewer,
            justification,
            reasons,
        } = request;

        Self {
            reviewer,
            date,
            reasons,
            justification,
        }
    }
}
