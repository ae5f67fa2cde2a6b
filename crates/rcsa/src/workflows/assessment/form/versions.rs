use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::super::domain::AssessmentSection;

/// Editable text field on a factor row. `Value` is the effectiveness column for controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorField {
    Name,
    Value,
    Weighting,
    Comments,
}

/// Address of a field that carries an edit-version stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldPath {
    Factor {
        section: AssessmentSection,
        factor_id: u32,
        field: FactorField,
    },
    SectionComments {
        section: AssessmentSection,
    },
    Override {
        section: AssessmentSection,
    },
    Profile,
    Issues,
}

impl FieldPath {
    pub const fn factor(section: AssessmentSection, factor_id: u32, field: FactorField) -> Self {
        Self::Factor {
            section,
            factor_id,
            field,
        }
    }
}

/// Monotonic per-field counters. A field never edited reads as version 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditVersions {
    versions: BTreeMap<FieldPath, u64>,
}

impl EditVersions {
    pub fn get(&self, path: FieldPath) -> u64 {
        self.versions.get(&path).copied().unwrap_or(0)
    }

    pub(crate) fn bump(&mut self, path: FieldPath) -> u64 {
        let version = self.versions.entry(path).or_insert(0);
        *version += 1;
        *version
    }

    /// Bumps every field of a factor row, used when the row is added or removed.
    pub(crate) fn bump_factor(&mut self, section: AssessmentSection, factor_id: u32) {
        for field in [
            FactorField::Name,
            FactorField::Value,
            FactorField::Weighting,
            FactorField::Comments,
        ] {
            self.bump(FieldPath::factor(section, factor_id, field));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_start_at_zero_and_only_grow() {
        let mut versions = EditVersions::default();
        let path = FieldPath::factor(AssessmentSection::Inherent, 1, FactorField::Value);

        assert_eq!(versions.get(path), 0);
        assert_eq!(versions.bump(path), 1);
        assert_eq!(versions.bump(path), 2);
        assert_eq!(
            versions.get(FieldPath::factor(
                AssessmentSection::Inherent,
                1,
                FactorField::Comments
            )),
            0
        );
    }

    #[test]
    fn row_bumps_touch_every_field() {
        let mut versions = EditVersions::default();
        versions.bump_factor(AssessmentSection::Control, 4);

        assert_eq!(
            versions.get(FieldPath::factor(
                AssessmentSection::Control,
                4,
                FactorField::Weighting
            )),
            1
        );
    }
}
