use super::super::domain::AssessmentSection;
use super::super::form::AssessmentForm;
use super::super::progress::SectionRequirements;
use super::insights::recommended_actions;
use super::views::{AssessmentSummary, SectionProgressEntry, SectionScoreEntry};

/// Read-only reporting over one assessment form.
pub struct AssessmentReport<'a> {
    form: &'a AssessmentForm,
    requirements: &'a SectionRequirements,
}

impl<'a> AssessmentReport<'a> {
    pub fn new(form: &'a AssessmentForm, requirements: &'a SectionRequirements) -> Self {
        Self { form, requirements }
    }

    pub fn scores(&self) -> Vec<SectionScoreEntry> {
        AssessmentSection::rating_sections()
            .into_iter()
            .filter_map(|section| {
                let score = self.form.section_score(section)?;
                let band = score.band();
                Some(SectionScoreEntry {
                    section,
                    section_label: section.label(),
                    score,
                    band,
                    band_label: band.label(),
                    color_class: band.color_class(),
                    overridden: self.form.is_section_overridden(section),
                    challenged: self.form.is_section_challenged(section),
                })
            })
            .collect()
    }

    pub fn progress(&self) -> Vec<SectionProgressEntry> {
        self.form
            .progress(self.requirements)
            .into_iter()
            .map(|(section, progress)| SectionProgressEntry {
                section,
                section_label: section.label(),
                completed: progress.completed,
                total: progress.total,
                percentage: progress.percentage,
                status: progress.status,
                status_label: progress.status.label(),
            })
            .collect()
    }

    pub fn summary(&self) -> AssessmentSummary {
        let status = self.form.status();
        let mut summary = AssessmentSummary {
            assessment_id: self.form.profile().assessment_id.clone(),
            risk: self.form.profile().risk.clone(),
            status,
            status_label: status.label(),
            available_actions: self.form.review().available_actions(),
            scores: self.scores(),
            progress: self.progress(),
            overall_progress: self.form.overall_progress(self.requirements),
            next_required_section: self.form.next_required_section(self.requirements),
            appetite: self.form.appetite_evaluation(),
            challenged_sections: self.form.review().challenged_sections(),
            issues: self.form.issues().to_vec(),
            recommended_actions: Vec::new(),
        };
        summary.recommended_actions = recommended_actions(&summary);
        summary
    }
}
