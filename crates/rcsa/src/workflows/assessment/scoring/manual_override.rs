use serde::{Deserialize, Serialize};

use super::Score;

/// Assessor-entered replacement for a calculated section score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualOverride {
    pub enabled: bool,
    #[serde(default)]
    pub value: Option<Score>,
    #[serde(default)]
    pub justification: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OverrideInputError {
    #[error("override value '{0}' is not numeric")]
    NotNumeric(String),
    #[error("manual override is not enabled")]
    NotEnabled,
}

impl ManualOverride {
    /// Starts the override from the score currently on display.
    pub fn enable(&mut self, current: Score) {
        self.enabled = true;
        self.value = Some(current);
    }

    /// Rejects non-numeric input, leaving the previous value in place; clamps into 0-5.
    pub fn set_value(&mut self, raw: &str) -> Result<Score, OverrideInputError> {
        if !self.enabled {
            return Err(OverrideInputError::NotEnabled);
        }

        let parsed = raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| !value.is_nan())
            .ok_or_else(|| OverrideInputError::NotNumeric(raw.to_string()))?;

        let score = Score::clamped(parsed);
        self.value = Some(score);
        Ok(score)
    }

    pub fn set_justification(&mut self, justification: impl Into<String>) {
        self.justification = justification.into();
    }

    pub fn disable(&mut self) {
        *self = Self::default();
    }

    pub fn active_value(&self) -> Option<Score> {
        if self.enabled {
            self.value
        } else {
            None
        }
    }

    pub fn has_justification(&self) -> bool {
        !self.justification.trim().is_empty()
    }
}
