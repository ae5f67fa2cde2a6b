use serde::Serialize;

use super::super::appetite::AppetiteEvaluation;
use super::super::domain::{AssessmentSection, Issue};
use super::super::progress::ProgressStatus;
use super::super::review::{ReviewAction, ReviewStatus};
use super::super::scoring::{Score, ScoreBand};

#[derive(Debug, Clone, Serialize)]
pub struct SectionScoreEntry {
    pub section: AssessmentSection,
    pub section_label: &'static str,
    pub score: Score,
    pub band: ScoreBand,
    pub band_label: &'static str,
    pub color_class: &'static str,
    pub overridden: bool,
    pub challenged: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionProgressEntry {
    pub section: AssessmentSection,
    pub section_label: &'static str,
    pub completed: usize,
    pub total: usize,
    pub percentage: u8,
    pub status: ProgressStatus,
    pub status_label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssessmentSummary {
    pub assessment_id: String,
    pub risk: String,
    pub status: ReviewStatus,
    pub status_label: &'static str,
    pub available_actions: Vec<ReviewAction>,
    pub scores: Vec<SectionScoreEntry>,
    pub progress: Vec<SectionProgressEntry>,
    pub overall_progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_required_section: Option<AssessmentSection>,
    pub appetite: AppetiteEvaluation,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub challenged_sections: Vec<AssessmentSection>,
    pub issues: Vec<Issue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recommended_actions: Vec<String>,
}
