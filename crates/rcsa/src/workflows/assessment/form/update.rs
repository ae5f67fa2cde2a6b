use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::super::domain::{
    validate_rating, validate_weighting, AssessmentError, AssessmentSection, ControlPatch, Issue,
};
use super::super::scoring::OverrideInputError;
use super::super::section::RatingSection;
use super::versions::{FactorField, FieldPath};
use super::{AssessmentForm, FactorRow, SectionMut};
use crate::workflows::library::ControlLibrary;

/// Every edit an assessor can make to the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FormUpdate {
    SetFactorField {
        section: AssessmentSection,
        factor_id: u32,
        field: FactorField,
        value: String,
    },
    /// Appends a blank row; on the control section this is "Add Control".
    AddFactor {
        section: AssessmentSection,
    },
    RemoveFactor {
        section: AssessmentSection,
        factor_id: u32,
    },
    AddControlFromLibrary {
        control_id: String,
    },
    UpdateControl {
        factor_id: u32,
        patch: ControlPatch,
    },
    EnableOverride {
        section: AssessmentSection,
    },
    DisableOverride {
        section: AssessmentSection,
    },
    SetOverrideValue {
        section: AssessmentSection,
        value: String,
    },
    SetOverrideJustification {
        section: AssessmentSection,
        justification: String,
    },
    SetSectionComments {
        section: AssessmentSection,
        comments: String,
    },
    AddIssue {
        issue: NewIssue,
    },
    RemoveIssue {
        issue_id: u32,
    },
    SetProfile {
        profile: ProfilePatch,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIssue {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub owner: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePatch {
    #[serde(default)]
    pub risk: Option<String>,
    #[serde(default)]
    pub era_id: Option<String>,
    #[serde(default)]
    pub assessment_id: Option<String>,
    #[serde(default)]
    pub assessment_date: Option<NaiveDate>,
    #[serde(default)]
    pub risk_hierarchy: Option<String>,
    #[serde(default)]
    pub assessor: Option<String>,
}

fn write_field<F: FactorRow>(
    target: &mut RatingSection<F>,
    section: AssessmentSection,
    factor_id: u32,
    field: FactorField,
    value: String,
) -> Result<(), AssessmentError> {
    let entry = target
        .entry_mut(factor_id)
        .ok_or(AssessmentError::FactorNotFound {
            section,
            id: factor_id,
        })?;
    *entry.field_mut(field) = value;
    target.recalculate();
    Ok(())
}

fn add_blank<F: FactorRow>(target: &mut RatingSection<F>) -> u32 {
    let id = target.next_id();
    target.push(F::blank(id));
    id
}

fn remove_row<F: FactorRow>(
    target: &mut RatingSection<F>,
    section: AssessmentSection,
    factor_id: u32,
) -> Result<(), AssessmentError> {
    target
        .remove(factor_id)
        .map(|_| ())
        .ok_or(AssessmentError::FactorNotFound {
            section,
            id: factor_id,
        })
}

fn override_error(section: AssessmentSection, err: OverrideInputError) -> AssessmentError {
    match err {
        OverrideInputError::NotNumeric(raw) => AssessmentError::OverrideNotNumeric(raw),
        OverrideInputError::NotEnabled => AssessmentError::OverrideNotEnabled(section),
    }
}

impl AssessmentForm {
    /// Applies one edit. On error the form is left as it was.
    pub fn apply(
        &mut self,
        update: FormUpdate,
        library: &ControlLibrary,
    ) -> Result<(), AssessmentError> {
        self.ensure_editable()?;

        match update {
            FormUpdate::SetFactorField {
                section,
                factor_id,
                field,
                value,
            } => self.set_factor_field(section, factor_id, field, &value),
            FormUpdate::AddFactor { section } => {
                let id = match self.rating_section_mut(section)? {
                    SectionMut::Factors(target) => add_blank(target),
                    SectionMut::Controls(target) => add_blank(target),
                };
                self.versions.bump_factor(section, id);
                Ok(())
            }
            FormUpdate::RemoveFactor { section, factor_id } => {
                match self.rating_section_mut(section)? {
                    SectionMut::Factors(target) => remove_row(target, section, factor_id)?,
                    SectionMut::Controls(target) => {
                        if target.entry(factor_id).is_some() && target.entries().len() <= 1 {
                            return Err(AssessmentError::LastControl);
                        }
                        remove_row(target, section, factor_id)?
                    }
                }
                self.versions.bump_factor(section, factor_id);
                Ok(())
            }
            FormUpdate::AddControlFromLibrary { control_id } => {
                let entry = library
                    .find(&control_id)
                    .ok_or(AssessmentError::LibraryEntryNotFound(control_id))?;
                let id = self.control.next_id();
                self.control.push(entry.instantiate(id));
                self.versions.bump_factor(AssessmentSection::Control, id);
                Ok(())
            }
            FormUpdate::UpdateControl { factor_id, patch } => {
                let control =
                    self.control
                        .entry_mut(factor_id)
                        .ok_or(AssessmentError::FactorNotFound {
                            section: AssessmentSection::Control,
                            id: factor_id,
                        })?;
                patch.apply_to(control);
                self.versions.bump_factor(AssessmentSection::Control, factor_id);
                Ok(())
            }
            FormUpdate::EnableOverride { section } => {
                match self.rating_section_mut(section)? {
                    SectionMut::Factors(target) => target.enable_override(),
                    SectionMut::Controls(target) => target.enable_override(),
                }
                self.versions.bump(FieldPath::Override { section });
                Ok(())
            }
            FormUpdate::DisableOverride { section } => {
                match self.rating_section_mut(section)? {
                    SectionMut::Factors(target) => target.disable_override(),
                    SectionMut::Controls(target) => target.disable_override(),
                }
                self.versions.bump(FieldPath::Override { section });
                Ok(())
            }
            FormUpdate::SetOverrideValue { section, value } => {
                let result = match self.rating_section_mut(section)? {
                    SectionMut::Factors(target) => target.set_override_value(&value),
                    SectionMut::Controls(target) => target.set_override_value(&value),
                };
                result.map_err(|err| override_error(section, err))?;
                self.versions.bump(FieldPath::Override { section });
                Ok(())
            }
            FormUpdate::SetOverrideJustification {
                section,
                justification,
            } => {
                let result = match self.rating_section_mut(section)? {
                    SectionMut::Factors(target) => target.set_override_justification(justification),
                    SectionMut::Controls(target) => {
                        target.set_override_justification(justification)
                    }
                };
                result.map_err(|err| override_error(section, err))?;
                self.versions.bump(FieldPath::Override { section });
                Ok(())
            }
            FormUpdate::SetSectionComments { section, comments } => {
                self.set_section_comments(section, comments)
            }
            FormUpdate::AddIssue { issue } => {
                let id = self.next_issue_id();
                self.issues.push(Issue {
                    id,
                    issue_key: format!("ISS-{id:03}"),
                    title: issue.title,
                    description: issue.description,
                    due_date: issue.due_date,
                    owner: issue.owner,
                });
                self.versions.bump(FieldPath::Issues);
                Ok(())
            }
            FormUpdate::RemoveIssue { issue_id } => {
                let index = self
                    .issues
                    .iter()
                    .position(|issue| issue.id == issue_id)
                    .ok_or(AssessmentError::IssueNotFound(issue_id))?;
                self.issues.remove(index);
                self.versions.bump(FieldPath::Issues);
                Ok(())
            }
            FormUpdate::SetProfile { profile } => {
                self.apply_profile(profile);
                self.versions.bump(FieldPath::Profile);
                Ok(())
            }
        }
    }

    /// Validates and writes one factor cell, then recomputes the section score.
    pub(super) fn set_factor_field(
        &mut self,
        section: AssessmentSection,
        factor_id: u32,
        field: FactorField,
        raw: &str,
    ) -> Result<(), AssessmentError> {
        let value = match field {
            FactorField::Value => validate_rating(raw)?,
            FactorField::Weighting => validate_weighting(raw)?,
            FactorField::Name | FactorField::Comments => raw.to_string(),
        };

        match self.rating_section_mut(section)? {
            SectionMut::Factors(target) => write_field(target, section, factor_id, field, value)?,
            SectionMut::Controls(target) => write_field(target, section, factor_id, field, value)?,
        }
        self.versions
            .bump(FieldPath::factor(section, factor_id, field));
        Ok(())
    }

    pub(super) fn set_section_comments(
        &mut self,
        section: AssessmentSection,
        comments: String,
    ) -> Result<(), AssessmentError> {
        match section {
            AssessmentSection::Inherent => self.inherent.set_comments(comments),
            AssessmentSection::Control => self.control.set_comments(comments),
            AssessmentSection::Residual => self.residual.set_comments(comments),
            AssessmentSection::Issues => self.issues_comments = comments,
            other => return Err(AssessmentError::CommentsNotSupported(other)),
        }
        self.versions.bump(FieldPath::SectionComments { section });
        Ok(())
    }

    fn apply_profile(&mut self, patch: ProfilePatch) {
        let profile = &mut self.profile;
        if let Some(risk) = patch.risk {
            profile.risk = risk;
        }
        if let Some(era_id) = patch.era_id {
            profile.era_id = era_id;
        }
        if let Some(assessment_id) = patch.assessment_id {
            profile.assessment_id = assessment_id;
        }
        if patch.assessment_date.is_some() {
            profile.assessment_date = patch.assessment_date;
        }
        if let Some(risk_hierarchy) = patch.risk_hierarchy {
            profile.risk_hierarchy = risk_hierarchy;
        }
        if let Some(assessor) = patch.assessor {
            profile.assessor = assessor;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::RiskProfile;
    use super::*;
    use crate::workflows::assessment::domain::{ControlCategory, RatingFactor, RiskAppetite};
    use crate::workflows::assessment::review::ChallengeRequest;
    use chrono::Utc;

    fn form() -> AssessmentForm {
        AssessmentForm::new(RiskProfile::default(), RiskAppetite::default())
    }

    fn set(section: AssessmentSection, factor_id: u32, field: FactorField, value: &str) -> FormUpdate {
        FormUpdate::SetFactorField {
            section,
            factor_id,
            field,
            value: value.to_string(),
        }
    }

    fn rate_inherent(form: &mut AssessmentForm, library: &ControlLibrary, ratings: [&str; 4]) {
        for (index, rating) in ratings.into_iter().enumerate() {
            form.apply(
                set(
                    AssessmentSection::Inherent,
                    index as u32 + 1,
                    FactorField::Value,
                    rating,
                ),
                library,
            )
            .expect("valid rating");
        }
    }

    #[test]
    fn factor_edits_recompute_the_section_score() {
        let library = ControlLibrary::standard();
        let mut form = form();
        rate_inherent(&mut form, &library, ["4", "2", "3", "5"]);

        let score = form
            .section_score(AssessmentSection::Inherent)
            .expect("rating section");
        assert_eq!(score.to_string(), "3.5");
        assert_eq!(score.band().label(), "Medium");
        assert_eq!(form.field_state()["inherentRatingScore"], "3.5");
    }

    #[test]
    fn invalid_cells_are_rejected_without_side_effects() {
        let library = ControlLibrary::standard();
        let mut form = form();
        let path = FieldPath::factor(AssessmentSection::Inherent, 1, FactorField::Value);

        let err = form
            .apply(set(AssessmentSection::Inherent, 1, FactorField::Value, "7"), &library)
            .expect_err("out of range");
        assert_eq!(err, AssessmentError::InvalidRating("7".to_string()));
        assert_eq!(form.field_version(path), 0);

        let err = form
            .apply(
                set(AssessmentSection::Residual, 1, FactorField::Weighting, "120"),
                &library,
            )
            .expect_err("weighting above 100");
        assert!(matches!(err, AssessmentError::InvalidWeighting(_)));

        let err = form
            .apply(set(AssessmentSection::Heatmap, 1, FactorField::Value, "3"), &library)
            .expect_err("heat map has no factors");
        assert_eq!(
            err,
            AssessmentError::NotRatingSection(AssessmentSection::Heatmap)
        );
    }

    #[test]
    fn override_freezes_score_until_disabled() {
        let library = ControlLibrary::standard();
        let mut form = form();
        rate_inherent(&mut form, &library, ["4", "2", "3", "5"]);

        form.apply(
            FormUpdate::EnableOverride {
                section: AssessmentSection::Inherent,
            },
            &library,
        )
        .expect("enable override");
        form.apply(
            FormUpdate::SetOverrideValue {
                section: AssessmentSection::Inherent,
                value: "7".to_string(),
            },
            &library,
        )
        .expect("clamped override");
        assert_eq!(
            form.section_score(AssessmentSection::Inherent)
                .map(|score| score.to_string()),
            Some("5.0".to_string())
        );

        let err = form
            .apply(
                FormUpdate::SetOverrideValue {
                    section: AssessmentSection::Inherent,
                    value: "high".to_string(),
                },
                &library,
            )
            .expect_err("non numeric");
        assert_eq!(err, AssessmentError::OverrideNotNumeric("high".to_string()));

        form.apply(
            set(AssessmentSection::Inherent, 1, FactorField::Value, "1"),
            &library,
        )
        .expect("factor edit while overridden");
        assert_eq!(
            form.section_score(AssessmentSection::Inherent)
                .map(|score| score.to_string()),
            Some("5.0".to_string())
        );

        form.apply(
            FormUpdate::DisableOverride {
                section: AssessmentSection::Inherent,
            },
            &library,
        )
        .expect("disable override");
        // (1 + 2 + 3 + 5) / 4 = 2.75
        assert_eq!(
            form.section_score(AssessmentSection::Inherent)
                .map(|score| score.to_string()),
            Some("2.8".to_string())
        );
    }

    #[test]
    fn justification_requires_an_enabled_override() {
        let library = ControlLibrary::standard();
        let mut form = form();

        let err = form
            .apply(
                FormUpdate::SetOverrideJustification {
                    section: AssessmentSection::Residual,
                    justification: "Recent loss event".to_string(),
                },
                &library,
            )
            .expect_err("override is off");
        assert_eq!(
            err,
            AssessmentError::OverrideNotEnabled(AssessmentSection::Residual)
        );
    }

    #[test]
    fn control_section_keeps_its_last_control() {
        let library = ControlLibrary::standard();
        let mut form = form();

        let err = form
            .apply(
                FormUpdate::RemoveFactor {
                    section: AssessmentSection::Control,
                    factor_id: 1,
                },
                &library,
            )
            .expect_err("last control stays");
        assert_eq!(err, AssessmentError::LastControl);

        form.apply(
            FormUpdate::AddControlFromLibrary {
                control_id: "CTL-REC-001".to_string(),
            },
            &library,
        )
        .expect("library control added");
        let added = form.control().entry(2).expect("library control has next id");
        assert_eq!(added.category, ControlCategory::Detective);
        assert!(added.effectiveness.is_empty());

        form.apply(
            FormUpdate::RemoveFactor {
                section: AssessmentSection::Control,
                factor_id: 1,
            },
            &library,
        )
        .expect("blank control removed");
        assert_eq!(form.control().entries().len(), 1);

        let err = form
            .apply(
                FormUpdate::AddControlFromLibrary {
                    control_id: "CTL-NOPE".to_string(),
                },
                &library,
            )
            .expect_err("unknown library id");
        assert_eq!(
            err,
            AssessmentError::LibraryEntryNotFound("CTL-NOPE".to_string())
        );
    }

    #[test]
    fn control_attribute_edits_bump_field_versions() {
        let library = ControlLibrary::standard();
        let mut form = form();
        let name = FieldPath::factor(AssessmentSection::Control, 1, FactorField::Name);
        let before = form.field_version(name);

        form.apply(
            FormUpdate::UpdateControl {
                factor_id: 1,
                patch: ControlPatch {
                    description: Some("Dual sign-off on releases".to_string()),
                    category: Some(ControlCategory::Detective),
                    ..ControlPatch::default()
                },
            },
            &library,
        )
        .expect("control patched");

        assert_eq!(form.field_version(name), before + 1);
        assert_eq!(
            form.field_version(FieldPath::factor(
                AssessmentSection::Control,
                1,
                FactorField::Value
            )),
            before + 1
        );
        assert_eq!(
            form.control().entry(1).expect("control present").category,
            ControlCategory::Detective
        );
    }

    #[test]
    fn inherent_factors_can_be_removed_entirely() {
        let library = ControlLibrary::standard();
        let mut form = AssessmentForm::with_sections(
            RiskProfile::default(),
            RiskAppetite::default(),
            vec![RatingFactor::new(1, "Only factor", "100")],
            vec![crate::workflows::assessment::domain::Control::blank(1)],
            Vec::new(),
        );

        form.apply(
            FormUpdate::RemoveFactor {
                section: AssessmentSection::Inherent,
                factor_id: 1,
            },
            &library,
        )
        .expect("inherent may be emptied");
        assert!(form.inherent().entries().is_empty());
        assert_eq!(
            form.section_score(AssessmentSection::Inherent),
            Some(crate::workflows::assessment::scoring::Score::ZERO)
        );
    }

    #[test]
    fn comments_and_issues_update_field_state() {
        let library = ControlLibrary::standard();
        let mut form = form();

        form.apply(
            FormUpdate::SetSectionComments {
                section: AssessmentSection::Issues,
                comments: "Two open audit points".to_string(),
            },
            &library,
        )
        .expect("issues comments");
        form.apply(
            FormUpdate::AddIssue {
                issue: NewIssue {
                    title: "Reconciliation backlog".to_string(),
                    description: String::new(),
                    due_date: NaiveDate::from_ymd_opt(2025, 6, 30).expect("valid date"),
                    owner: "Ops".to_string(),
                },
            },
            &library,
        )
        .expect("manual issue");

        assert_eq!(form.field_state()["issuesComments"], "Two open audit points");
        assert_eq!(form.issues()[0].issue_key, "ISS-001");

        let err = form
            .apply(
                FormUpdate::SetSectionComments {
                    section: AssessmentSection::Heatmap,
                    comments: "n/a".to_string(),
                },
                &library,
            )
            .expect_err("heat map has no comments");
        assert_eq!(
            err,
            AssessmentError::CommentsNotSupported(AssessmentSection::Heatmap)
        );

        form.apply(FormUpdate::RemoveIssue { issue_id: 1 }, &library)
            .expect("remove issue");
        assert!(form.issues().is_empty());
        assert_eq!(
            form.apply(FormUpdate::RemoveIssue { issue_id: 1 }, &library),
            Err(AssessmentError::IssueNotFound(1))
        );
    }

    #[test]
    fn approved_forms_reject_edits() {
        let library = ControlLibrary::standard();
        let mut form = form();
        form.submit().expect("submit");
        form.approve("Reviewer", Utc::now()).expect("approve");

        let err = form
            .apply(
                FormUpdate::SetProfile {
                    profile: ProfilePatch {
                        risk: Some("Renamed".to_string()),
                        ..ProfilePatch::default()
                    },
                },
                &library,
            )
            .expect_err("finalized");
        assert_eq!(err, AssessmentError::Finalized);
        assert!(form.profile().risk.is_empty());
    }

    #[test]
    fn returned_forms_stay_editable() {
        let library = ControlLibrary::standard();
        let mut form = form();
        form.submit().expect("submit");
        form.challenge(
            ChallengeRequest {
                reviewer: "Reviewer".to_string(),
                justification: "Scores do not reflect loss data".to_string(),
                reasons: vec!["Incorrect risk score assessment".to_string()],
            },
            Utc::now(),
        )
        .expect("challenge");

        form.apply(
            set(AssessmentSection::Inherent, 2, FactorField::Value, "5"),
            &library,
        )
        .expect("rework allowed");
        assert!(form.is_section_challenged(AssessmentSection::Inherent));
    }

    #[test]
    fn updates_deserialize_from_tagged_json() {
        let update: FormUpdate = serde_json::from_value(serde_json::json!({
            "type": "set_factor_field",
            "section": "control",
            "factor_id": 1,
            "field": "value",
            "value": "4"
        }))
        .expect("tagged update");

        assert_eq!(update, set(AssessmentSection::Control, 1, FactorField::Value, "4"));
    }
}
