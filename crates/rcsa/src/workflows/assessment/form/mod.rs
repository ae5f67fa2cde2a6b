//! Form state for one assessment session.
//!
//! [`AssessmentForm`] owns every section of an assessment. Mutations go
//! through [`AssessmentForm::apply`] with a typed [`FormUpdate`]; each update
//! validates its input, recomputes the affected section score, and bumps the
//! edit version of the fields it touched so late autofill results can be
//! recognised as stale.

mod autofill;
mod update;
mod versions;

pub use autofill::{AutofillOutcome, AutofillTicket};
pub use update::{FormUpdate, NewIssue, ProfilePatch};
pub use versions::{EditVersions, FactorField, FieldPath};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::appetite::{AppetiteEvaluation, RiskAppetiteEvaluator};
use super::domain::{
    AssessmentError, AssessmentSection, Control, ControlCategory, Issue, RatingFactor,
    RiskAppetite,
};
use super::progress::{SectionProgress, SectionProgressTracker, SectionRequirements};
use super::review::{ChallengeDetails, ChallengeRequest, ReviewError, ReviewStatus, ReviewWorkflow};
use super::scoring::{Score, WeightedFactor};
use super::section::RatingSection;

/// Identifying metadata shown in the assessment header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskProfile {
    #[serde(default)]
    pub risk: String,
    #[serde(default)]
    pub era_id: String,
    #[serde(default)]
    pub assessment_id: String,
    #[serde(default)]
    pub assessment_date: Option<NaiveDate>,
    #[serde(default)]
    pub risk_hierarchy: String,
    #[serde(default)]
    pub assessor: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentForm {
    #[serde(flatten)]
    profile: RiskProfile,
    inherent: RatingSection<RatingFactor>,
    control: RatingSection<Control>,
    residual: RatingSection<RatingFactor>,
    #[serde(default)]
    issues_comments: String,
    #[serde(default)]
    issues: Vec<Issue>,
    #[serde(default)]
    breach_sequence: u32,
    #[serde(default)]
    risk_appetite: RiskAppetite,
    #[serde(default)]
    review: ReviewWorkflow,
    #[serde(skip)]
    versions: EditVersions,
}

/// Row-level access shared by rating factors and controls.
trait FactorRow: WeightedFactor {
    fn blank(id: u32) -> Self;
    fn field(&self, field: FactorField) -> &str;
    fn field_mut(&mut self, field: FactorField) -> &mut String;
}

impl FactorRow for RatingFactor {
    fn blank(id: u32) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    fn field(&self, field: FactorField) -> &str {
        match field {
            FactorField::Name => &self.name,
            FactorField::Value => &self.value,
            FactorField::Weighting => &self.weighting,
            FactorField::Comments => &self.comments,
        }
    }

    fn field_mut(&mut self, field: FactorField) -> &mut String {
        match field {
            FactorField::Name => &mut self.name,
            FactorField::Value => &mut self.value,
            FactorField::Weighting => &mut self.weighting,
            FactorField::Comments => &mut self.comments,
        }
    }
}

impl FactorRow for Control {
    fn blank(id: u32) -> Self {
        Control::blank(id)
    }

    fn field(&self, field: FactorField) -> &str {
        match field {
            FactorField::Name => &self.name,
            FactorField::Value => &self.effectiveness,
            FactorField::Weighting => &self.weighting,
            FactorField::Comments => &self.comments,
        }
    }

    fn field_mut(&mut self, field: FactorField) -> &mut String {
        match field {
            FactorField::Name => &mut self.name,
            FactorField::Value => &mut self.effectiveness,
            FactorField::Weighting => &mut self.weighting,
            FactorField::Comments => &mut self.comments,
        }
    }
}

enum SectionRef<'a> {
    Factors(&'a RatingSection<RatingFactor>),
    Controls(&'a RatingSection<Control>),
}

enum SectionMut<'a> {
    Factors(&'a mut RatingSection<RatingFactor>),
    Controls(&'a mut RatingSection<Control>),
}

/// Read-only copy of a factor row, independent of the section's row type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactorSnapshot {
    pub id: u32,
    pub name: String,
    pub value: String,
    pub weighting: String,
    pub comments: String,
}

fn snapshot<F: FactorRow>(row: &F) -> FactorSnapshot {
    FactorSnapshot {
        id: row.id(),
        name: row.field(FactorField::Name).to_string(),
        value: row.field(FactorField::Value).to_string(),
        weighting: row.field(FactorField::Weighting).to_string(),
        comments: row.field(FactorField::Comments).to_string(),
    }
}

fn score_field<F: WeightedFactor>(section: &RatingSection<F>) -> String {
    if section.is_scored() {
        section.score().to_string()
    } else {
        String::new()
    }
}

fn standard_inherent_factors() -> Vec<RatingFactor> {
    vec![
        RatingFactor::new(1, "Likelihood of occurrence", "25"),
        RatingFactor::new(2, "Financial impact", "25"),
        RatingFactor::new(3, "Regulatory impact", "25"),
        RatingFactor::new(4, "Reputational impact", "25"),
    ]
}

fn standard_residual_factors() -> Vec<RatingFactor> {
    vec![
        RatingFactor::new(1, "Residual likelihood", "50"),
        RatingFactor::new(2, "Residual impact", "50"),
    ]
}

impl AssessmentForm {
    /// Blank Draft assessment with the standard factor sets and one empty control.
    pub fn new(profile: RiskProfile, risk_appetite: RiskAppetite) -> Self {
        Self::with_sections(
            profile,
            risk_appetite,
            standard_inherent_factors(),
            vec![Control::blank(1)],
            standard_residual_factors(),
        )
    }

    pub fn with_sections(
        profile: RiskProfile,
        risk_appetite: RiskAppetite,
        inherent: Vec<RatingFactor>,
        controls: Vec<Control>,
        residual: Vec<RatingFactor>,
    ) -> Self {
        Self {
            profile,
            inherent: RatingSection::new(inherent),
            control: RatingSection::new(controls),
            residual: RatingSection::new(residual),
            issues_comments: String::new(),
            issues: Vec::new(),
            breach_sequence: 0,
            risk_appetite,
            review: ReviewWorkflow::default(),
            versions: EditVersions::default(),
        }
    }

    pub fn profile(&self) -> &RiskProfile {
        &self.profile
    }

    pub fn inherent(&self) -> &RatingSection<RatingFactor> {
        &self.inherent
    }

    pub fn control(&self) -> &RatingSection<Control> {
        &self.control
    }

    pub fn residual(&self) -> &RatingSection<RatingFactor> {
        &self.residual
    }

    pub fn issues_comments(&self) -> &str {
        &self.issues_comments
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn risk_appetite(&self) -> &RiskAppetite {
        &self.risk_appetite
    }

    pub fn review(&self) -> &ReviewWorkflow {
        &self.review
    }

    pub fn status(&self) -> ReviewStatus {
        self.review.status()
    }

    pub fn field_version(&self, path: FieldPath) -> u64 {
        self.versions.get(path)
    }

    fn rating_section(&self, section: AssessmentSection) -> Result<SectionRef<'_>, AssessmentError> {
        match section {
            AssessmentSection::Inherent => Ok(SectionRef::Factors(&self.inherent)),
            AssessmentSection::Control => Ok(SectionRef::Controls(&self.control)),
            AssessmentSection::Residual => Ok(SectionRef::Factors(&self.residual)),
            other => Err(AssessmentError::NotRatingSection(other)),
        }
    }

    fn rating_section_mut(
        &mut self,
        section: AssessmentSection,
    ) -> Result<SectionMut<'_>, AssessmentError> {
        match section {
            AssessmentSection::Inherent => Ok(SectionMut::Factors(&mut self.inherent)),
            AssessmentSection::Control => Ok(SectionMut::Controls(&mut self.control)),
            AssessmentSection::Residual => Ok(SectionMut::Factors(&mut self.residual)),
            other => Err(AssessmentError::NotRatingSection(other)),
        }
    }

    /// Displayed score of a rating section; `None` for the other tabs.
    pub fn section_score(&self, section: AssessmentSection) -> Option<Score> {
        match self.rating_section(section).ok()? {
            SectionRef::Factors(target) => Some(target.score()),
            SectionRef::Controls(target) => Some(target.score()),
        }
    }

    pub fn is_section_overridden(&self, section: AssessmentSection) -> bool {
        match self.rating_section(section) {
            Ok(SectionRef::Factors(target)) => target.is_overridden(),
            Ok(SectionRef::Controls(target)) => target.is_overridden(),
            Err(_) => false,
        }
    }

    pub fn factors(&self, section: AssessmentSection) -> Result<Vec<FactorSnapshot>, AssessmentError> {
        Ok(match self.rating_section(section)? {
            SectionRef::Factors(target) => target.entries().iter().map(snapshot).collect(),
            SectionRef::Controls(target) => target.entries().iter().map(snapshot).collect(),
        })
    }

    pub fn residual_score(&self) -> Score {
        self.residual.score()
    }

    pub fn appetite_evaluation(&self) -> AppetiteEvaluation {
        RiskAppetiteEvaluator::new(self.risk_appetite.clone()).evaluate(self.residual_score())
    }

    pub fn is_within_appetite(&self) -> bool {
        self.appetite_evaluation().within_appetite
    }

    /// Controls grouped in category order. Empty categories are left out.
    pub fn controls_by_category(&self) -> Vec<(ControlCategory, Vec<&Control>)> {
        ControlCategory::ordered()
            .into_iter()
            .map(|category| {
                let members: Vec<&Control> = self
                    .control
                    .entries()
                    .iter()
                    .filter(|control| control.category == category)
                    .collect();
                (category, members)
            })
            .filter(|(_, members)| !members.is_empty())
            .collect()
    }

    /// Flat camelCase view of the form fields, as read by progress tracking.
    ///
    /// Scores of sections with nothing rated and no override read as empty.
    pub fn field_state(&self) -> Value {
        json!({
            "risk": self.profile.risk,
            "eraId": self.profile.era_id,
            "assessmentId": self.profile.assessment_id,
            "assessmentDate": self.profile.assessment_date.map(|date| date.to_string()),
            "riskHierarchy": self.profile.risk_hierarchy,
            "assessor": self.profile.assessor,
            "inherentRatingScore": score_field(&self.inherent),
            "inherentRatingComments": self.inherent.comments(),
            "controlEffectivenessScore": score_field(&self.control),
            "controlEffectivenessComments": self.control.comments(),
            "residualRatingScore": score_field(&self.residual),
            "residualRatingComments": self.residual.comments(),
            "issuesComments": self.issues_comments,
            "rcsaStatus": self.status().label(),
            "isWithinAppetite": self.is_within_appetite(),
        })
    }

    pub fn progress(
        &self,
        requirements: &SectionRequirements,
    ) -> Vec<(AssessmentSection, SectionProgress)> {
        let state = self.field_state();
        SectionProgressTracker::new(requirements, &state).entries()
    }

    pub fn next_required_section(
        &self,
        requirements: &SectionRequirements,
    ) -> Option<AssessmentSection> {
        let state = self.field_state();
        SectionProgressTracker::new(requirements, &state).next_required_section()
    }

    pub fn overall_progress(&self, requirements: &SectionRequirements) -> u8 {
        let state = self.field_state();
        SectionProgressTracker::new(requirements, &state).overall_progress()
    }

    fn ensure_editable(&self) -> Result<(), AssessmentError> {
        if self.status() == ReviewStatus::Approved {
            return Err(AssessmentError::Finalized);
        }
        Ok(())
    }

    fn next_issue_id(&self) -> u32 {
        self.issues
            .iter()
            .map(|issue| issue.id)
            .max()
            .map_or(1, |max| max + 1)
    }

    /// Records a remediation issue for a residual score above appetite.
    ///
    /// Every call adds a new issue with the next `ISS-APP-{n}` key.
    pub fn raise_breach_issue(
        &mut self,
        owner: &str,
        triggered_on: NaiveDate,
    ) -> Result<&Issue, AssessmentError> {
        self.ensure_editable()?;

        let evaluator = RiskAppetiteEvaluator::new(self.risk_appetite.clone());
        let residual = self.residual_score();
        if evaluator.evaluate(residual).within_appetite {
            return Err(AssessmentError::WithinAppetite {
                score: residual.to_string(),
                threshold: self.risk_appetite.threshold,
            });
        }

        self.breach_sequence += 1;
        let issue = evaluator.breach_issue(
            residual,
            owner,
            self.next_issue_id(),
            self.breach_sequence,
            triggered_on,
        );
        self.versions.bump(FieldPath::Issues);
        self.issues.push(issue);
        Ok(&self.issues[self.issues.len() - 1])
    }

    pub fn submit(&mut self) -> Result<ReviewStatus, ReviewError> {
        self.review.submit()
    }

    pub fn approve(
        &mut self,
        reviewer: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<ReviewStatus, ReviewError> {
        self.review.approve(reviewer, now)
    }

    pub fn challenge(
        &mut self,
        request: ChallengeRequest,
        now: DateTime<Utc>,
    ) -> Result<&ChallengeDetails, ReviewError> {
        self.review.challenge(request, now)
    }

    pub fn is_section_challenged(&self, section: AssessmentSection) -> bool {
        self.review.is_section_challenged(section)
    }
}
