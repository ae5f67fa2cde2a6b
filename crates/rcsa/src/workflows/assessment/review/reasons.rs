use serde::Serialize;

use super::super::domain::AssessmentSection;

const RATING_SECTIONS: &[AssessmentSection] = &[
    AssessmentSection::Inherent,
    AssessmentSection::Control,
    AssessmentSection::Residual,
];

/// Reviewer challenge reason and the sections it sends back for rework.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ChallengeReason {
    pub label: &'static str,
    pub sections: &'static [AssessmentSection],
}

pub const CHALLENGE_REASONS: &[ChallengeReason] = &[
    ChallengeReason {
        label: "Incorrect risk score assessment",
        sections: &[AssessmentSection::Inherent, AssessmentSection::Residual],
    },
    ChallengeReason {
        label: "Risk description or scope unclear",
        sections: &[AssessmentSection::Inherent],
    },
    ChallengeReason {
        label: "Control effectiveness overstated",
        sections: &[AssessmentSection::Control],
    },
    ChallengeReason {
        label: "Key controls missing or untested",
        sections: &[AssessmentSection::Control],
    },
    ChallengeReason {
        label: "Residual rating inconsistent with control environment",
        sections: &[AssessmentSection::Residual],
    },
    ChallengeReason {
        label: "Insufficient documentation/evidence",
        sections: RATING_SECTIONS,
    },
    ChallengeReason {
        label: "Assessment methodology not followed",
        sections: RATING_SECTIONS,
    },
];

pub fn find_reason(label: &str) -> Option<&'static ChallengeReason> {
    CHALLENGE_REASONS
        .iter()
        .find(|reason| reason.label == label.trim())
}

/// True iff any of the reasons maps to the section. Unknown reasons flag nothing.
pub fn is_section_challenged<S: AsRef<str>>(section: AssessmentSection, reasons: &[S]) -> bool {
    reasons
        .iter()
        .filter_map(|reason| find_reason(reason.as_ref()))
        .any(|reason| reason.sections.contains(&section))
}

/// Flagged sections in form order, without duplicates.
pub fn challenged_sections<S: AsRef<str>>(reasons: &[S]) -> Vec<AssessmentSection> {
    AssessmentSection::ordered()
        .into_iter()
        .filter(|section| is_section_challenged(*section, reasons))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_reason_flags_inherent_but_not_control() {
        let reasons = ["Incorrect risk score assessment"];
        assert!(is_section_challenged(AssessmentSection::Inherent, &reasons));
        assert!(!is_section_challenged(AssessmentSection::Control, &reasons));
    }

    #[test]
    fn documentation_reasons_flag_every_rating_section() {
        for label in [
            "Insufficient documentation/evidence",
            "Assessment methodology not followed",
        ] {
            assert_eq!(
                challenged_sections(&[label]),
                AssessmentSection::rating_sections().to_vec()
            );
        }
    }

    #[test]
    fn unknown_reasons_flag_nothing() {
        assert!(challenged_sections(&["Because"]).is_empty());
        assert!(find_reason("  Control effectiveness overstated ").is_some());
    }
}
