use serde::{Deserialize, Serialize};

use super::scoring::{
    compute_weighted_score, has_rated_entries, ManualOverride, OverrideInputError, Score,
    WeightedFactor,
};

/// One rating tab: its entries, the stored score, and the manual override.
///
/// The stored score tracks the weighted calculation until an override is
/// enabled; from then on factor edits leave it alone until the override is
/// switched off again. A loaded score is re-derived from the entries unless
/// the saved override is enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    rename_all = "camelCase",
    from = "StoredSection<F>",
    bound(deserialize = "F: WeightedFactor + Deserialize<'de>")
)]
pub struct RatingSection<F> {
    entries: Vec<F>,
    score: Score,
    #[serde(default, rename = "override")]
    manual_override: ManualOverride,
    #[serde(default)]
    comments: String,
}

/// Section as saved on disk, before the score is re-derived.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSection<F> {
    entries: Vec<F>,
    #[serde(default)]
    score: Score,
    #[serde(default, rename = "override")]
    manual_override: ManualOverride,
    #[serde(default)]
    comments: String,
}

impl<F: WeightedFactor> From<StoredSection<F>> for RatingSection<F> {
    fn from(stored: StoredSection<F>) -> Self {
        let StoredSection {
            entries,
            score,
            mut manual_override,
            comments,
        } = stored;

        let score = if manual_override.enabled {
            manual_override.value = manual_override
                .value
                .map(|value| Score::clamped(value.value()));
            score
        } else {
            compute_weighted_score(&entries)
        };

        Self {
            entries,
            score,
            manual_override,
            comments,
        }
    }
}

impl<F: WeightedFactor> RatingSection<F> {
    pub fn new(entries: Vec<F>) -> Self {
        let score = compute_weighted_score(&entries);
        Self {
            entries,
            score,
            manual_override: ManualOverride::default(),
            comments: String::new(),
        }
    }

    pub fn entries(&self) -> &[F] {
        &self.entries
    }

    pub fn entry(&self, id: u32) -> Option<&F> {
        self.entries.iter().find(|entry| entry.id() == id)
    }

    pub(crate) fn entry_mut(&mut self, id: u32) -> Option<&mut F> {
        self.entries.iter_mut().find(|entry| entry.id() == id)
    }

    /// Score on display: the override value while enabled, otherwise the calculation.
    pub fn score(&self) -> Score {
        self.manual_override.active_value().unwrap_or(self.score)
    }

    /// Fresh weighted calculation, regardless of any override.
    pub fn calculated_score(&self) -> Score {
        compute_weighted_score(&self.entries)
    }

    /// Whether the score field should count as filled in.
    pub fn is_scored(&self) -> bool {
        self.is_overridden() || has_rated_entries(&self.entries)
    }

    pub fn is_overridden(&self) -> bool {
        self.manual_override.enabled
    }

    pub fn manual_override(&self) -> &ManualOverride {
        &self.manual_override
    }

    pub fn comments(&self) -> &str {
        &self.comments
    }

    pub(crate) fn set_comments(&mut self, comments: String) {
        self.comments = comments;
    }

    pub(crate) fn next_id(&self) -> u32 {
        self.entries
            .iter()
            .map(WeightedFactor::id)
            .max()
            .map_or(1, |max| max + 1)
    }

    pub(crate) fn push(&mut self, entry: F) {
        self.entries.push(entry);
        self.recalculate();
    }

    pub(crate) fn remove(&mut self, id: u32) -> Option<F> {
        let index = self.entries.iter().position(|entry| entry.id() == id)?;
        let removed = self.entries.remove(index);
        self.recalculate();
        Some(removed)
    }

    /// Re-runs the weighted calculation unless an override is in force.
    pub(crate) fn recalculate(&mut self) {
        if !self.manual_override.enabled {
            self.score = compute_weighted_score(&self.entries);
        }
    }

    pub(crate) fn enable_override(&mut self) {
        let current = self.score();
        self.manual_override.enable(current);
        self.score = current;
    }

    pub(crate) fn set_override_value(&mut self, raw: &str) -> Result<Score, OverrideInputError> {
        let value = self.manual_override.set_value(raw)?;
        self.score = value;
        Ok(value)
    }

    pub(crate) fn set_override_justification(
        &mut self,
        justification: String,
    ) -> Result<(), OverrideInputError> {
        if !self.manual_override.enabled {
            return Err(OverrideInputError::NotEnabled);
        }
        self.manual_override.set_justification(justification);
        Ok(())
    }

    pub(crate) fn disable_override(&mut self) {
        self.manual_override.disable();
        self.score = compute_weighted_score(&self.entries);
    }
}
