use std::fmt::Write as _;

use serde::Serialize;

use super::super::autofill::{
    parse_comment_result, parse_rating_result, parse_suggestions, AutofillError, AutofillKind,
    AutofillRequest, AutofillResponse, AutofillTarget,
};
use super::super::domain::{AssessmentError, AssessmentSection};
use super::versions::{FactorField, FieldPath};
use super::AssessmentForm;

/// Pending autofill request plus the field versions it was issued against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutofillTicket {
    target: AutofillTarget,
    request: AutofillRequest,
    stamps: Vec<(FieldPath, u64)>,
}

impl AutofillTicket {
    pub fn target(&self) -> AutofillTarget {
        self.target
    }

    pub fn request(&self) -> &AutofillRequest {
        &self.request
    }

    fn stamp(&self, path: FieldPath) -> Option<u64> {
        self.stamps
            .iter()
            .find(|(candidate, _)| *candidate == path)
            .map(|(_, version)| *version)
    }
}

/// Which fields an autofill result filled and which it left alone because
/// they were edited in the meantime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AutofillOutcome {
    pub applied: Vec<FieldPath>,
    pub discarded: Vec<FieldPath>,
}

impl AutofillOutcome {
    pub fn is_discarded(&self) -> bool {
        self.applied.is_empty() && !self.discarded.is_empty()
    }
}

impl AssessmentForm {
    /// Snapshots the current versions of the targeted fields and builds the model prompt context.
    pub fn autofill_ticket(&self, target: AutofillTarget) -> Result<AutofillTicket, AssessmentError> {
        let section = target.section();
        let mut context = String::new();
        let _ = writeln!(context, "Risk: {}", self.profile.risk);
        if !self.profile.risk_hierarchy.is_empty() {
            let _ = writeln!(context, "Risk hierarchy: {}", self.profile.risk_hierarchy);
        }
        let _ = writeln!(context, "Section: {}", section.label());

        let stamps = match target {
            AutofillTarget::FactorRating { factor_id, .. }
            | AutofillTarget::FactorComment { factor_id, .. } => {
                let factor = self
                    .factors(section)?
                    .into_iter()
                    .find(|factor| factor.id == factor_id)
                    .ok_or(AssessmentError::FactorNotFound {
                        section,
                        id: factor_id,
                    })?;
                let _ = writeln!(context, "Factor: {}", factor.name);
                if !factor.comments.is_empty() {
                    let _ = writeln!(context, "Existing comments: {}", factor.comments);
                }

                let field = if target.kind() == AutofillKind::Rating {
                    FactorField::Value
                } else {
                    FactorField::Comments
                };
                let path = FieldPath::factor(section, factor_id, field);
                vec![(path, self.versions.get(path))]
            }
            AutofillTarget::SectionComments { section } => {
                if !section.is_rating() && section != AssessmentSection::Issues {
                    return Err(AssessmentError::CommentsNotSupported(section));
                }
                if let Some(score) = self.section_score(section) {
                    let _ = writeln!(context, "Score: {score} ({})", score.band().label());
                }
                let path = FieldPath::SectionComments { section };
                vec![(path, self.versions.get(path))]
            }
            AutofillTarget::Section { section } => {
                let mut stamps = Vec::new();
                for factor in self.factors(section)? {
                    let weighting = if factor.weighting.is_empty() {
                        "unset".to_string()
                    } else {
                        format!("{}%", factor.weighting)
                    };
                    let _ = writeln!(
                        context,
                        "- [{}] {} (weighting {weighting})",
                        factor.id, factor.name
                    );
                    for field in [FactorField::Value, FactorField::Comments] {
                        let path = FieldPath::factor(section, factor.id, field);
                        stamps.push((path, self.versions.get(path)));
                    }
                }
                stamps
            }
        };

        Ok(AutofillTicket {
            target,
            request: AutofillRequest {
                kind: target.kind(),
                context,
            },
            stamps,
        })
    }

    /// Writes an autofill result unless the targeted fields moved on since the ticket.
    ///
    /// A result that fails to parse leaves the form untouched.
    pub fn apply_autofill(
        &mut self,
        ticket: &AutofillTicket,
        response: &AutofillResponse,
    ) -> Result<AutofillOutcome, AutofillError> {
        self.ensure_editable()?;

        let mut outcome = AutofillOutcome::default();
        match ticket.target {
            AutofillTarget::FactorRating { section, factor_id } => {
                let rating = parse_rating_result(&response.result)?;
                let path = FieldPath::factor(section, factor_id, FactorField::Value);
                if self.is_current(ticket, path) {
                    self.set_factor_field(section, factor_id, FactorField::Value, &rating)?;
                    outcome.applied.push(path);
                } else {
                    outcome.discarded.push(path);
                }
            }
            AutofillTarget::FactorComment { section, factor_id } => {
                let comment = parse_comment_result(&response.result)?;
                let path = FieldPath::factor(section, factor_id, FactorField::Comments);
                if self.is_current(ticket, path) {
                    self.set_factor_field(section, factor_id, FactorField::Comments, &comment)?;
                    outcome.applied.push(path);
                } else {
                    outcome.discarded.push(path);
                }
            }
            AutofillTarget::SectionComments { section } => {
                let comment = parse_comment_result(&response.result)?;
                let path = FieldPath::SectionComments { section };
                if self.is_current(ticket, path) {
                    self.set_section_comments(section, comment)?;
                    outcome.applied.push(path);
                } else {
                    outcome.discarded.push(path);
                }
            }
            AutofillTarget::Section { section } => {
                for suggestion in parse_suggestions(&response.result)? {
                    let fields = [
                        (FactorField::Value, suggestion.rating),
                        (FactorField::Comments, suggestion.comment),
                    ];
                    for (field, value) in fields {
                        let Some(value) = value else {
                            continue;
                        };
                        let path = FieldPath::factor(section, suggestion.id, field);
                        if self.is_current(ticket, path) {
                            self.set_factor_field(section, suggestion.id, field, &value)?;
                            outcome.applied.push(path);
                        } else {
                            outcome.discarded.push(path);
                        }
                    }
                }
            }
        }

        Ok(outcome)
    }

    /// False when the field was edited after the ticket, or was not part of it.
    fn is_current(&self, ticket: &AutofillTicket, path: FieldPath) -> bool {
        ticket
            .stamp(path)
            .is_some_and(|stamp| stamp == self.versions.get(path))
    }
}

#[cfg(test)]
mod tests {
    use super::super::{FormUpdate, RiskProfile};
    use super::*;
    use crate::workflows::assessment::domain::RiskAppetite;
    use crate::workflows::library::ControlLibrary;

    fn form() -> AssessmentForm {
        AssessmentForm::new(
            RiskProfile {
                risk: "Unauthorised payments".to_string(),
                ..RiskProfile::default()
            },
            RiskAppetite::default(),
        )
    }

    fn response(result: &str) -> AutofillResponse {
        AutofillResponse {
            result: result.to_string(),
        }
    }

    #[test]
    fn rating_result_fills_an_untouched_factor() {
        let mut form = form();
        let ticket = form
            .autofill_ticket(AutofillTarget::FactorRating {
                section: AssessmentSection::Inherent,
                factor_id: 2,
            })
            .expect("factor exists");
        assert!(ticket.request().context.contains("Financial impact"));

        let outcome = form
            .apply_autofill(&ticket, &response("4"))
            .expect("valid rating");
        assert_eq!(outcome.applied.len(), 1);
        assert_eq!(
            form.inherent().entry(2).map(|factor| factor.value.as_str()),
            Some("4")
        );
    }

    #[test]
    fn stale_results_do_not_overwrite_manual_edits() {
        let library = ControlLibrary::standard();
        let mut form = form();
        let ticket = form
            .autofill_ticket(AutofillTarget::FactorRating {
                section: AssessmentSection::Inherent,
                factor_id: 1,
            })
            .expect("factor exists");

        form.apply(
            FormUpdate::SetFactorField {
                section: AssessmentSection::Inherent,
                factor_id: 1,
                field: FactorField::Value,
                value: "2".to_string(),
            },
            &library,
        )
        .expect("manual edit");

        let outcome = form
            .apply_autofill(&ticket, &response("5"))
            .expect("parsed");
        assert!(outcome.is_discarded());
        assert_eq!(
            form.inherent().entry(1).map(|factor| factor.value.as_str()),
            Some("2")
        );
    }

    #[test]
    fn section_autofill_skips_only_the_edited_rows() {
        let library = ControlLibrary::standard();
        let mut form = form();
        let ticket = form
            .autofill_ticket(AutofillTarget::Section {
                section: AssessmentSection::Residual,
            })
            .expect("rating section");

        form.apply(
            FormUpdate::SetFactorField {
                section: AssessmentSection::Residual,
                factor_id: 2,
                field: FactorField::Comments,
                value: "Assessor note".to_string(),
            },
            &library,
        )
        .expect("manual comment");

        let outcome = form
            .apply_autofill(
                &ticket,
                &response(
                    "```json\n[{\"id\":1,\"rating\":\"3\",\"comment\":\"Mitigated\"},{\"id\":2,\"rating\":2,\"comment\":\"Model note\"}]\n```",
                ),
            )
            .expect("suggestions parse");

        assert_eq!(outcome.applied.len(), 3);
        assert_eq!(
            outcome.discarded,
            vec![FieldPath::factor(
                AssessmentSection::Residual,
                2,
                FactorField::Comments
            )]
        );
        let residual = form.residual();
        assert_eq!(residual.entry(1).map(|f| f.comments.as_str()), Some("Mitigated"));
        assert_eq!(residual.entry(2).map(|f| f.comments.as_str()), Some("Assessor note"));
        // (3 * 50 + 2 * 50) / 100
        assert_eq!(residual.score().to_string(), "2.5");
    }

    #[test]
    fn unparsable_results_leave_state_untouched() {
        let mut form = form();
        let before = form.clone();
        let ticket = form
            .autofill_ticket(AutofillTarget::Section {
                section: AssessmentSection::Inherent,
            })
            .expect("rating section");

        let err = form
            .apply_autofill(
                &ticket,
                &response("[{\"id\":1,\"rating\":\"4\"},{\"id\":2,\"rating\":\"seven\"}]"),
            )
            .expect_err("second rating invalid");
        assert!(matches!(err, AutofillError::InvalidRating(_)));
        assert_eq!(form, before);
    }

    #[test]
    fn unknown_targets_are_rejected_up_front() {
        let form = form();
        assert_eq!(
            form.autofill_ticket(AutofillTarget::FactorComment {
                section: AssessmentSection::Control,
                factor_id: 99,
            }),
            Err(AssessmentError::FactorNotFound {
                section: AssessmentSection::Control,
                id: 99,
            })
        );
        assert_eq!(
            form.autofill_ticket(AutofillTarget::SectionComments {
                section: AssessmentSection::Attachments,
            }),
            Err(AssessmentError::CommentsNotSupported(
                AssessmentSection::Attachments
            ))
        );
    }
}
