use super::super::review::ReviewStatus;
use super::views::AssessmentSummary;

const BREACH_KEY_PREFIX: &str = "ISS-APP-";

pub(crate) fn recommended_actions(summary: &AssessmentSummary) -> Vec<String> {
    let mut actions = Vec::new();

    let appetite = &summary.appetite;
    if !appetite.within_appetite {
        let has_breach_issue = summary
            .issues
            .iter()
            .any(|issue| issue.issue_key.starts_with(BREACH_KEY_PREFIX));
        if has_breach_issue {
            actions.push(format!(
                "Residual score {} still exceeds the {} appetite of {:.1}; track the open breach issue to closure",
                appetite.residual_score, appetite.level, appetite.threshold
            ));
        } else {
            actions.push(format!(
                "Residual score {} exceeds the {} appetite of {:.1}; raise a breach issue with a remediation plan",
                appetite.residual_score, appetite.level, appetite.threshold
            ));
        }
    }

    for section in &summary.challenged_sections {
        actions.push(format!(
            "Rework the {} section flagged by the reviewer challenge",
            section.label()
        ));
    }

    if let Some(next) = summary.next_required_section {
        let done = summary
            .progress
            .iter()
            .find(|entry| entry.section == next)
            .map_or(0, |entry| entry.percentage);
        actions.push(format!("Complete the {} section ({done}% done)", next.label()));
    }

    for entry in summary.scores.iter().filter(|entry| entry.overridden) {
        actions.push(format!(
            "Confirm the justification for the manual {} override",
            entry.section_label
        ));
    }

    if summary.status == ReviewStatus::PendingReview {
        actions.push("Awaiting reviewer approval or challenge".to_string());
    }

    actions
}
