use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::scoring::{ScoreBand, WeightedFactor};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;
pub const MAX_WEIGHTING: f64 = 100.0;

/// Tabs of the assessment form, in the order an assessor works through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentSection {
    Inherent,
    Control,
    Residual,
    Heatmap,
    Treatment,
    Issues,
    Attachments,
}

impl AssessmentSection {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::Inherent,
            Self::Control,
            Self::Residual,
            Self::Heatmap,
            Self::Treatment,
            Self::Issues,
            Self::Attachments,
        ]
    }

    /// Sections whose score is aggregated from weighted factors.
    pub const fn rating_sections() -> [Self; 3] {
        [Self::Inherent, Self::Control, Self::Residual]
    }

    pub const fn is_rating(self) -> bool {
        matches!(self, Self::Inherent | Self::Control | Self::Residual)
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Inherent => "inherent",
            Self::Control => "control",
            Self::Residual => "residual",
            Self::Heatmap => "heatmap",
            Self::Treatment => "treatment",
            Self::Issues => "issues",
            Self::Attachments => "attachments",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Inherent => "Inherent Rating",
            Self::Control => "Control Effectiveness",
            Self::Residual => "Residual Rating",
            Self::Heatmap => "Heat Map",
            Self::Treatment => "Treatment",
            Self::Issues => "Issues",
            Self::Attachments => "Attachments",
        }
    }
}

impl std::fmt::Display for AssessmentSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Named, weighted rating used by the inherent and residual sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingFactor {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub weighting: String,
    #[serde(default)]
    pub comments: String,
}

impl RatingFactor {
    pub fn new(id: u32, name: impl Into<String>, weighting: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            weighting: weighting.into(),
            ..Self::default()
        }
    }

    pub fn band(&self) -> Option<ScoreBand> {
        WeightedFactor::rating(self).map(ScoreBand::classify)
    }
}

impl WeightedFactor for RatingFactor {
    fn id(&self) -> u32 {
        self.id
    }

    fn rating(&self) -> Option<f64> {
        parse_rating(&self.value).map(f64::from)
    }

    fn weight(&self) -> Option<f64> {
        parse_weighting(&self.weighting)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlCategory {
    Preventive,
    Detective,
    Corrective,
    Directive,
}

impl ControlCategory {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Preventive,
            Self::Detective,
            Self::Corrective,
            Self::Directive,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Preventive => "Preventive",
            Self::Detective => "Detective",
            Self::Corrective => "Corrective",
            Self::Directive => "Directive",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "preventive" | "preventative" => Some(Self::Preventive),
            "detective" => Some(Self::Detective),
            "corrective" => Some(Self::Corrective),
            "directive" => Some(Self::Directive),
            _ => None,
        }
    }
}

/// Design or operating effectiveness of a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlEffect {
    Ineffective,
    Partially,
    Effective,
    Highly,
}

impl ControlEffect {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ineffective => "Ineffective",
            Self::Partially => "Partially Effective",
            Self::Effective => "Effective",
            Self::Highly => "Highly Effective",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    Pass,
    Fail,
    Partial,
    Effective,
    Partially,
    Ineffective,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResults {
    pub last_tested: Option<NaiveDate>,
    pub result: TestOutcome,
    #[serde(default)]
    pub tester: String,
    #[serde(default)]
    pub findings: String,
}

/// Mitigating control rated for effectiveness; `effectiveness` plays the role of a factor value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Control {
    pub id: u32,
    #[serde(default)]
    pub control_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: ControlCategory,
    #[serde(default)]
    pub design_effect: Option<ControlEffect>,
    #[serde(default)]
    pub operative_effect: Option<ControlEffect>,
    #[serde(default)]
    pub effectiveness: String,
    #[serde(default)]
    pub weighting: String,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub is_key_control: bool,
    #[serde(default)]
    pub test_results: Option<TestResults>,
}

impl Control {
    pub fn blank(id: u32) -> Self {
        Self {
            id,
            control_id: String::new(),
            name: String::new(),
            description: String::new(),
            category: ControlCategory::Preventive,
            design_effect: None,
            operative_effect: None,
            effectiveness: String::new(),
            weighting: String::new(),
            comments: String::new(),
            is_key_control: false,
            test_results: None,
        }
    }
}

impl WeightedFactor for Control {
    fn id(&self) -> u32 {
        self.id
    }

    fn rating(&self) -> Option<f64> {
        parse_rating(&self.effectiveness).map(f64::from)
    }

    fn weight(&self) -> Option<f64> {
        parse_weighting(&self.weighting)
    }
}

/// Partial update for the descriptive attributes of a control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlPatch {
    #[serde(default)]
    pub control_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<ControlCategory>,
    #[serde(default)]
    pub design_effect: Option<ControlEffect>,
    #[serde(default)]
    pub operative_effect: Option<ControlEffect>,
    #[serde(default)]
    pub is_key_control: Option<bool>,
    #[serde(default)]
    pub test_results: Option<TestResults>,
}

impl ControlPatch {
    pub(crate) fn apply_to(self, control: &mut Control) {
        if let Some(control_id) = self.control_id {
            control.control_id = control_id;
        }
        if let Some(description) = self.description {
            control.description = description;
        }
        if let Some(category) = self.category {
            control.category = category;
        }
        if self.design_effect.is_some() {
            control.design_effect = self.design_effect;
        }
        if self.operative_effect.is_some() {
            control.operative_effect = self.operative_effect;
        }
        if let Some(is_key_control) = self.is_key_control {
            control.is_key_control = is_key_control;
        }
        if self.test_results.is_some() {
            control.test_results = self.test_results;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: u32,
    pub issue_key: String,
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    pub owner: String,
}

/// Maximum residual score the organisation tolerates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAppetite {
    pub threshold: f64,
    pub level: String,
    pub color: String,
    pub description: String,
}

impl RiskAppetite {
    pub fn new(threshold: f64, level: impl Into<String>) -> Self {
        let band = ScoreBand::classify(threshold);
        Self {
            threshold,
            level: level.into(),
            color: band.color_class().to_string(),
            description: format!(
                "Residual scores up to {threshold:.1} ({}) are tolerated without remediation",
                band.label()
            ),
        }
    }
}

impl Default for RiskAppetite {
    fn default() -> Self {
        Self::new(3.0, "Moderate")
    }
}

/// Validation failures for form edits.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AssessmentError {
    #[error("rating '{0}' must be a whole number between 1 and 5")]
    InvalidRating(String),
    #[error("weighting '{0}' must be a number between 0 and 100")]
    InvalidWeighting(String),
    #[error("{section} has no factor with id {id}")]
    FactorNotFound { section: AssessmentSection, id: u32 },
    #[error("{0} is not a rating section")]
    NotRatingSection(AssessmentSection),
    #[error("the control section must retain at least one control")]
    LastControl,
    #[error("control library entry '{0}' not found")]
    LibraryEntryNotFound(String),
    #[error("issue {0} not found")]
    IssueNotFound(u32),
    #[error("{0} does not accept section comments")]
    CommentsNotSupported(AssessmentSection),
    #[error("override value '{0}' is not numeric")]
    OverrideNotNumeric(String),
    #[error("manual override is not enabled for {0}")]
    OverrideNotEnabled(AssessmentSection),
    #[error("residual score {score} is within the appetite threshold {threshold:.1}")]
    WithinAppetite { score: String, threshold: f64 },
    #[error("assessment is finalized and can no longer be edited")]
    Finalized,
}

/// Parses a factor rating; empty or malformed input counts as unrated.
pub fn parse_rating(raw: &str) -> Option<u8> {
    raw.trim()
        .parse::<u8>()
        .ok()
        .filter(|value| (MIN_RATING..=MAX_RATING).contains(value))
}

pub fn parse_weighting(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && (0.0..=MAX_WEIGHTING).contains(value))
}

/// Normalizes a rating edit. Empty input clears the rating.
pub(crate) fn validate_rating(raw: &str) -> Result<String, AssessmentError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(String::new());
    }

    parse_rating(trimmed)
        .map(|value| value.to_string())
        .ok_or_else(|| AssessmentError::InvalidRating(raw.to_string()))
}

pub(crate) fn validate_weighting(raw: &str) -> Result<String, AssessmentError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(String::new());
    }

    parse_weighting(trimmed)
        .map(|_| trimmed.to_string())
        .ok_or_else(|| AssessmentError::InvalidWeighting(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_validation_accepts_only_one_through_five() {
        assert_eq!(validate_rating(" 4 ").expect("valid rating"), "4");
        assert_eq!(validate_rating("").expect("clearing allowed"), "");
        assert!(matches!(
            validate_rating("0"),
            Err(AssessmentError::InvalidRating(_))
        ));
        assert!(matches!(
            validate_rating("6"),
            Err(AssessmentError::InvalidRating(_))
        ));
        assert!(validate_rating("3.5").is_err());
    }

    #[test]
    fn weighting_validation_bounds_percentages() {
        assert_eq!(validate_weighting("25").expect("valid weighting"), "25");
        assert_eq!(validate_weighting("0").expect("zero weighting"), "0");
        assert_eq!(validate_weighting("100").expect("full weighting"), "100");
        assert!(validate_weighting("100.5").is_err());
        assert!(validate_weighting("-1").is_err());
        assert!(validate_weighting("lots").is_err());
    }

    #[test]
    fn control_reads_effectiveness_as_its_rating() {
        let mut control = Control::blank(1);
        control.effectiveness = "4".to_string();
        control.weighting = "50".to_string();

        assert_eq!(WeightedFactor::rating(&control), Some(4.0));
        assert_eq!(WeightedFactor::weight(&control), Some(50.0));
    }

    #[test]
    fn control_patch_only_touches_provided_fields() {
        let mut control = Control::blank(3);
        control.name = "Dual authorisation".to_string();

        ControlPatch {
            category: Some(ControlCategory::Detective),
            is_key_control: Some(true),
            ..ControlPatch::default()
        }
        .apply_to(&mut control);

        assert_eq!(control.category, ControlCategory::Detective);
        assert!(control.is_key_control);
        assert_eq!(control.name, "Dual authorisation");
        assert!(control.design_effect.is_none());
    }

    #[test]
    fn appetite_colour_follows_threshold_band() {
        let appetite = RiskAppetite::new(3.0, "Moderate");
        assert_eq!(appetite.color, ScoreBand::Medium.color_class());
        assert!(appetite.description.contains("3.0"));
    }
}
