//! Assessment lifecycle: Draft, review, and the approve/challenge decision.
//!
//! Status only changes through [`transition`]; [`ReviewWorkflow`] pairs the
//! status with the latest challenge or approval record.

mod challenge;
mod reasons;

pub use challenge::{
    ChallengeDetails, ChallengeRejected, ChallengeRequest, MIN_JUSTIFICATION_CHARS,
};
pub use reasons::{
    challenged_sections, find_reason, is_section_challenged, ChallengeReason, CHALLENGE_REASONS,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::domain::AssessmentSection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReviewStatus {
    #[serde(rename = "Draft")]
    Draft,
    #[serde(rename = "Pending Review")]
    PendingReview,
    #[serde(rename = "Approved/Finalized")]
    Approved,
    #[serde(rename = "Returned for Rework/Challenged")]
    ReturnedForRework,
}

impl ReviewStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::PendingReview => "Pending Review",
            Self::Approved => "Approved/Finalized",
            Self::ReturnedForRework => "Returned for Rework/Challenged",
        }
    }

    /// States in which a reviewer may approve or challenge.
    pub const fn is_reviewable(self) -> bool {
        matches!(self, Self::PendingReview | Self::ReturnedForRework)
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Submit,
    Approve,
    Challenge,
}

impl ReviewAction {
    pub const fn all() -> [Self; 3] {
        [Self::Submit, Self::Approve, Self::Challenge]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Challenge => "challenge",
        }
    }
}

#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
#[error("cannot {verb} an assessment that is '{from}'", verb = .action.label())]
pub struct InvalidTransition {
    pub from: ReviewStatus,
    pub action: ReviewAction,
}

/// The only way a status changes.
pub fn transition(
    current: ReviewStatus,
    action: ReviewAction,
) -> Result<ReviewStatus, InvalidTransition> {
    use ReviewAction::*;
    use ReviewStatus::*;

    match (current, action) {
        (Draft | ReturnedForRework, Submit) => Ok(PendingReview),
        (PendingReview | ReturnedForRework, Approve) => Ok(Approved),
        (PendingReview | ReturnedForRework, Challenge) => Ok(ReturnedForRework),
        (from, action) => Err(InvalidTransition { from, action }),
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ReviewError {
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
    #[error(transparent)]
    Challenge(#[from] ChallengeRejected),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub reviewer: String,
    pub date: DateTime<Utc>,
}

/// Review status plus the most recent reviewer decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewWorkflow {
    status: ReviewStatus,
    #[serde(default)]
    challenge_details: Option<ChallengeDetails>,
    #[serde(default)]
    approval: Option<ApprovalRecord>,
}

impl Default for ReviewWorkflow {
    fn default() -> Self {
        Self {
            status: ReviewStatus::Draft,
            challenge_details: None,
            approval: None,
        }
    }
}

impl ReviewWorkflow {
    pub fn status(&self) -> ReviewStatus {
        self.status
    }

    pub fn challenge_details(&self) -> Option<&ChallengeDetails> {
        self.challenge_details.as_ref()
    }

    pub fn approval(&self) -> Option<&ApprovalRecord> {
        self.approval.as_ref()
    }

    pub fn available_actions(&self) -> Vec<ReviewAction> {
        ReviewAction::all()
            .into_iter()
            .filter(|action| transition(self.status, *action).is_ok())
            .collect()
    }

    /// Sends the assessment to review. A resubmission keeps the challenge on record.
    pub fn submit(&mut self) -> Result<ReviewStatus, ReviewError> {
        self.status = transition(self.status, ReviewAction::Submit)?;
        Ok(self.status)
    }

    pub fn approve(
        &mut self,
        reviewer: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<ReviewStatus, ReviewError> {
        self.status = transition(self.status, ReviewAction::Approve)?;
        self.challenge_details = None;
        self.approval = Some(ApprovalRecord {
            reviewer: reviewer.into(),
            date: now,
        });
        Ok(self.status)
    }

    /// Validates the request, then records it as the current challenge.
    pub fn challenge(
        &mut self,
        request: ChallengeRequest,
        now: DateTime<Utc>,
    ) -> Result<&ChallengeDetails, ReviewError> {
        let next = transition(self.status, ReviewAction::Challenge)?;
        request.validate()?;

        self.status = next;
        self.approval = None;
        Ok(self
            .challenge_details
            .insert(ChallengeDetails::from_request(request, now)))
    }

    pub fn is_section_challenged(&self, section: AssessmentSection) -> bool {
        self.challenge_details
            .as_ref()
            .is_some_and(|details| is_section_challenged(section, &details.reasons))
    }

    pub fn challenged_sections(&self) -> Vec<AssessmentSection> {
        self.challenge_details
            .as_ref()
            .map(|details| challenged_sections(&details.reasons))
            .unwrap_or_default()
    }
}
