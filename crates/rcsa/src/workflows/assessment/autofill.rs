//! Request and response shapes for the AI autofill collaborator.
//!
//! The model call itself lives behind [`AutofillProvider`]. This module only
//! parses what comes back: a bare rating, free-text commentary, or a JSON
//! array of per-factor suggestions that may arrive wrapped in a markdown fence.

use serde::{Deserialize, Deserializer, Serialize};

use super::domain::{parse_rating, AssessmentError, AssessmentSection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutofillKind {
    Rating,
    Comment,
    AutofillAll,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutofillRequest {
    #[serde(rename = "type")]
    pub kind: AutofillKind,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutofillResponse {
    pub result: String,
}

/// What an autofill request is meant to fill in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum AutofillTarget {
    FactorRating {
        section: AssessmentSection,
        factor_id: u32,
    },
    FactorComment {
        section: AssessmentSection,
        factor_id: u32,
    },
    SectionComments {
        section: AssessmentSection,
    },
    /// Ratings and comments for every row of a rating section.
    Section {
        section: AssessmentSection,
    },
}

impl AutofillTarget {
    pub const fn kind(self) -> AutofillKind {
        match self {
            Self::FactorRating { .. } => AutofillKind::Rating,
            Self::FactorComment { .. } | Self::SectionComments { .. } => AutofillKind::Comment,
            Self::Section { .. } => AutofillKind::AutofillAll,
        }
    }

    pub const fn section(self) -> AssessmentSection {
        match self {
            Self::FactorRating { section, .. }
            | Self::FactorComment { section, .. }
            | Self::SectionComments { section }
            | Self::Section { section } => section,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutofillSuggestion {
    pub id: u32,
    #[serde(default, deserialize_with = "text_or_number")]
    pub rating: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    }))
}

#[derive(Debug, thiserror::Error)]
pub enum AutofillError {
    #[error("autofill provider failed: {0}")]
    Provider(String),
    #[error("autofill returned an empty result")]
    EmptyResult,
    #[error("autofill rating '{0}' is not a whole number between 1 and 5")]
    InvalidRating(String),
    #[error("autofill suggestions are not valid JSON: {0}")]
    MalformedSuggestions(#[from] serde_json::Error),
    #[error(transparent)]
    Rejected(#[from] AssessmentError),
}

/// Seam for the remote model. Implementations block until the model answers.
pub trait AutofillProvider: Send + Sync {
    fn complete(&self, request: &AutofillRequest) -> Result<AutofillResponse, AutofillError>;
}

pub fn parse_rating_result(result: &str) -> Result<String, AutofillError> {
    let trimmed = result.trim();
    if trimmed.is_empty() {
        return Err(AutofillError::EmptyResult);
    }
    parse_rating(trimmed)
        .map(|rating| rating.to_string())
        .ok_or_else(|| AutofillError::InvalidRating(trimmed.to_string()))
}

pub fn parse_comment_result(result: &str) -> Result<String, AutofillError> {
    let trimmed = result.trim();
    if trimmed.is_empty() {
        return Err(AutofillError::EmptyResult);
    }
    Ok(trimmed.to_string())
}

/// Removes a surrounding ```` ``` ```` or ```` ```json ```` fence, if any.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parses an `autofill-all` result. Every rating is checked before anything is returned.
pub fn parse_suggestions(result: &str) -> Result<Vec<AutofillSuggestion>, AutofillError> {
    let body = strip_code_fence(result);
    if body.is_empty() {
        return Err(AutofillError::EmptyResult);
    }

    let mut suggestions: Vec<AutofillSuggestion> = serde_json::from_str(body)?;
    for suggestion in &mut suggestions {
        if let Some(rating) = suggestion.rating.take() {
            suggestion.rating = Some(parse_rating_result(&rating)?);
        }
        if let Some(comment) = suggestion.comment.take() {
            let comment = comment.trim();
            suggestion.comment = (!comment.is_empty()).then(|| comment.to_string());
        }
    }
    Ok(suggestions)
}
