use serde::Serialize;
use serde_json::Value;

use super::domain::AssessmentSection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressStatus {
    Pending,
    InProgress,
    Completed,
}

impl ProgressStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionProgress {
    pub total: usize,
    pub completed: usize,
    pub percentage: u8,
    pub status: ProgressStatus,
}

/// A field is filled unless it is missing, null, or an empty string. Numeric zero counts.
pub fn is_field_complete(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(text)) => !text.is_empty(),
        Some(_) => true,
    }
}

/// Completion of one section against the camelCase form-state object.
pub fn compute_progress(fields: &[&str], state: &Value) -> SectionProgress {
    let total = fields.len();
    let completed = fields
        .iter()
        .filter(|field| is_field_complete(state.get(**field)))
        .count();

    // Sections without required fields are view-only and vacuously complete.
    let percentage = if total == 0 {
        100
    } else {
        ((completed as f64 / total as f64) * 100.0).round() as u8
    };

    let status = if total == 0 || percentage == 100 {
        ProgressStatus::Completed
    } else if percentage > 0 {
        ProgressStatus::InProgress
    } else {
        ProgressStatus::Pending
    };

    SectionProgress {
        total,
        completed,
        percentage,
        status,
    }
}

/// Required form fields per tracked section, in navigation order.
#[derive(Debug, Clone)]
pub struct SectionRequirements {
    sections: Vec<(AssessmentSection, Vec<&'static str>)>,
}

impl SectionRequirements {
    pub fn standard() -> Self {
        Self {
            sections: vec![
                (
                    AssessmentSection::Inherent,
                    vec!["inherentRatingScore", "inherentRatingComments"],
                ),
                (
                    AssessmentSection::Control,
                    vec!["controlEffectivenessScore", "controlEffectivenessComments"],
                ),
                (
                    AssessmentSection::Residual,
                    vec!["residualRatingScore", "residualRatingComments"],
                ),
                (AssessmentSection::Heatmap, Vec::new()),
                (AssessmentSection::Issues, vec!["issuesComments"]),
            ],
        }
    }

    pub fn new(sections: Vec<(AssessmentSection, Vec<&'static str>)>) -> Self {
        Self { sections }
    }

    pub fn sections(&self) -> impl Iterator<Item = AssessmentSection> + '_ {
        self.sections.iter().map(|(section, _)| *section)
    }

    pub fn fields_for(&self, section: AssessmentSection) -> Option<&[&'static str]> {
        self.sections
            .iter()
            .find(|(candidate, _)| *candidate == section)
            .map(|(_, fields)| fields.as_slice())
    }
}

impl Default for SectionRequirements {
    fn default() -> Self {
        Self::standard()
    }
}

/// Per-section completion derived from a snapshot of the form state.
pub struct SectionProgressTracker<'a> {
    requirements: &'a SectionRequirements,
    state: &'a Value,
}

impl<'a> SectionProgressTracker<'a> {
    pub fn new(requirements: &'a SectionRequirements, state: &'a Value) -> Self {
        Self {
            requirements,
            state,
        }
    }

    /// `None` for sections the requirements table does not track.
    pub fn section_progress(&self, section: AssessmentSection) -> Option<SectionProgress> {
        self.requirements
            .fields_for(section)
            .map(|fields| compute_progress(fields, self.state))
    }

    pub fn entries(&self) -> Vec<(AssessmentSection, SectionProgress)> {
        self.requirements
            .sections
            .iter()
            .map(|(section, fields)| (*section, compute_progress(fields, self.state)))
            .collect()
    }

    /// First section in declared order that is not complete.
    pub fn next_required_section(&self) -> Option<AssessmentSection> {
        self.entries()
            .into_iter()
            .find(|(_, progress)| progress.status != ProgressStatus::Completed)
            .map(|(section, _)| section)
    }

    /// Mean percentage across sections that have required fields.
    pub fn overall_progress(&self) -> u8 {
        let counted: Vec<u8> = self
            .entries()
            .into_iter()
            .filter(|(_, progress)| progress.total > 0)
            .map(|(_, progress)| progress.percentage)
            .collect();

        if counted.is_empty() {
            return 0;
        }

        let sum: u32 = counted.iter().map(|pct| u32::from(*pct)).sum();
        (f64::from(sum) / counted.len() as f64).round() as u8
    }
}
