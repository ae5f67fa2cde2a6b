use crate::infra::{InMemoryAlertPublisher, InMemoryAssessmentRepository};
use clap::Args;
use rcsa::config::AppConfig;
use rcsa::error::AppError;
use rcsa::workflows::assessment::{
    AssessmentForm, AssessmentReport, AssessmentSection, AssessmentService, AssessmentSummary,
    AutofillError, AutofillKind, AutofillProvider, AutofillRequest, AutofillResponse,
    AutofillTarget, ChallengeRequest, ExportPayload, FactorField, FormUpdate, RiskAppetite,
    RiskProfile, SectionRequirements,
};
use rcsa::workflows::library::ControlLibrary;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Override the residual risk appetite threshold (0-5).
    #[arg(long)]
    pub(crate) appetite_threshold: Option<f64>,
    /// Optional control library CSV export.
    #[arg(long)]
    pub(crate) control_library: Option<PathBuf>,
    /// Stop after scoring; skip the review walkthrough.
    #[arg(long)]
    pub(crate) skip_review: bool,
}

#[derive(Args, Debug)]
pub(crate) struct AssessArgs {
    /// Saved assessment form (JSON)
    #[arg(long)]
    pub(crate) form: PathBuf,
    /// Print the collaborator export payload instead of the summary
    #[arg(long)]
    pub(crate) export: bool,
}

/// Suggests mid-scale ratings without calling out to a model.
struct OfflineAutofill;

impl AutofillProvider for OfflineAutofill {
    fn complete(&self, request: &AutofillRequest) -> Result<AutofillResponse, AutofillError> {
        let result = match request.kind {
            AutofillKind::Rating => "3".to_string(),
            AutofillKind::Comment => "Reviewed against the latest loss data.".to_string(),
            AutofillKind::AutofillAll => {
                r#"[{"id":1,"rating":3,"comment":"Likelihood limited by dual sign-off"},{"id":2,"rating":3,"comment":"Impact capped by payment limits"}]"#
                    .to_string()
            }
        };
        Ok(AutofillResponse { result })
    }
}

pub(crate) fn run_assess(args: AssessArgs) -> Result<(), AppError> {
    let raw = std::fs::read_to_string(&args.form)?;
    let form: AssessmentForm = serde_json::from_str(&raw)?;

    if args.export {
        let payload = ExportPayload::from_form(&form);
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let requirements = SectionRequirements::standard();
    let summary = AssessmentReport::new(&form, &requirements).summary();
    render_summary(&summary);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        appetite_threshold,
        control_library,
        skip_review,
    } = args;

    let config = AppConfig::load()?;
    let mut appetite = config.appetite.risk_appetite();
    if let Some(threshold) = appetite_threshold {
        appetite = RiskAppetite::new(threshold.clamp(0.0, 5.0), appetite.level);
    }
    let library = match control_library {
        Some(path) => ControlLibrary::from_path(path)?,
        None => ControlLibrary::standard(),
    };

    println!("RCSA workbench demo");
    let repository = Arc::new(InMemoryAssessmentRepository::default());
    let alerts = Arc::new(InMemoryAlertPublisher::default());
    let service = AssessmentService::with_library(repository, alerts.clone(), appetite, library);

    let record = match service.create(demo_profile()) {
        Ok(record) => record,
        Err(err) => {
            println!("  Assessment could not be created: {}", err);
            return Ok(());
        }
    };
    let id = record.id.clone();
    println!(
        "- Opened {} for '{}' (appetite {} at {:.1})",
        id,
        record.form.profile().risk,
        service.appetite().level,
        service.appetite().threshold
    );

    if let Err(err) = service.update(&id, demo_updates(service.library())) {
        println!("  Form updates rejected: {}", err);
        return Ok(());
    }

    match service.autofill(
        &id,
        AutofillTarget::Section {
            section: AssessmentSection::Residual,
        },
        &OfflineAutofill,
    ) {
        Ok(outcome) => println!(
            "- Residual section autofilled: {} fields applied, {} discarded",
            outcome.applied.len(),
            outcome.discarded.len()
        ),
        Err(err) => println!("  Autofill unavailable: {}", err),
    }
    if let Err(err) = service.update(
        &id,
        vec![
            FormUpdate::SetFactorField {
                section: AssessmentSection::Residual,
                factor_id: 1,
                field: FactorField::Value,
                value: "4".to_string(),
            },
            FormUpdate::SetSectionComments {
                section: AssessmentSection::Residual,
                comments: "Manual release path still bypasses dual control".to_string(),
            },
        ],
    ) {
        println!("  Residual edits rejected: {}", err);
        return Ok(());
    }

    let summary = match service.summary(&id) {
        Ok(summary) => summary,
        Err(err) => {
            println!("  Summary unavailable: {}", err);
            return Ok(());
        }
    };
    render_summary(&summary);

    if !summary.appetite.within_appetite {
        match service.raise_breach_issue(&id, None) {
            Ok(issue) => println!(
                "- Raised {} for {} (due {})",
                issue.issue_key, issue.owner, issue.due_date
            ),
            Err(err) => println!("  Breach issue not raised: {}", err),
        }
    }

    if skip_review {
        return Ok(());
    }

    println!("\nReview walkthrough");
    match service.submit(&id) {
        Ok(record) => println!("- submit -> {}", record.form.status().label()),
        Err(err) => {
            println!("  submit failed: {}", err);
            return Ok(());
        }
    }

    let challenge = ChallengeRequest {
        reviewer: "Second line risk".to_string(),
        justification: "Control ratings are not backed by recent test evidence".to_string(),
        reasons: vec!["Key controls missing or untested".to_string()],
    };
    match service.challenge(&id, challenge) {
        Ok(record) => {
            let flagged: Vec<&str> = AssessmentSection::rating_sections()
                .iter()
                .filter(|section| record.form.is_section_challenged(**section))
                .map(|section| section.label())
                .collect();
            println!(
                "- challenge -> {} (flagged: {})",
                record.form.status().label(),
                flagged.join(", ")
            );
        }
        Err(err) => {
            println!("  challenge failed: {}", err);
            return Ok(());
        }
    }

    if let Err(err) = service.submit(&id) {
        println!("  resubmission failed: {}", err);
        return Ok(());
    }
    match service.approve(&id, "Operational risk committee") {
        Ok(record) => println!("- approve -> {}", record.form.status().label()),
        Err(err) => {
            println!("  approval failed: {}", err);
            return Ok(());
        }
    }

    match service.export(&id) {
        Ok(payload) => println!(
            "  Export payload:\n{}",
            serde_json::to_string_pretty(&payload)?
        ),
        Err(err) => println!("  Export unavailable: {}", err),
    }

    let events = alerts.events();
    if events.is_empty() {
        println!("  Alerts: none dispatched");
    } else {
        println!("  Alerts:");
        for alert in events {
            println!("    - template={} -> {}", alert.template, alert.assessment_id);
        }
    }

    Ok(())
}

fn render_summary(summary: &AssessmentSummary) {
    println!(
        "\nAssessment {} | {} | {}",
        summary.assessment_id, summary.risk, summary.status_label
    );
    println!("Scores:");
    for entry in &summary.scores {
        let mut flags = Vec::new();
        if entry.overridden {
            flags.push("override");
        }
        if entry.challenged {
            flags.push("challenged");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        println!(
            "  - {}: {} ({}){}",
            entry.section_label, entry.score, entry.band_label, flags
        );
    }
    println!("Progress ({}% overall):", summary.overall_progress);
    for entry in &summary.progress {
        println!(
            "  - {}: {}/{} {}",
            entry.section_label, entry.completed, entry.total, entry.status_label
        );
    }
    println!(
        "Residual {} vs appetite {:.1} ({}): {}",
        summary.appetite.residual_score,
        summary.appetite.threshold,
        summary.appetite.level,
        if summary.appetite.within_appetite {
            "within appetite"
        } else {
            "outside appetite"
        }
    );
    if !summary.recommended_actions.is_empty() {
        println!("Recommended actions:");
        for action in &summary.recommended_actions {
            println!("  - {}", action);
        }
    }
}

fn demo_profile() -> RiskProfile {
    RiskProfile {
        risk: "Unauthorised payment release".to_string(),
        era_id: "ERA-1187".to_string(),
        risk_hierarchy: "Operational > Payments > Release".to_string(),
        assessor: "M. Okafor".to_string(),
        ..RiskProfile::default()
    }
}

fn demo_updates(library: &ControlLibrary) -> Vec<FormUpdate> {
    let rate = |section, factor_id, value: &str| FormUpdate::SetFactorField {
        section,
        factor_id,
        field: FactorField::Value,
        value: value.to_string(),
    };

    let mut updates = vec![
        rate(AssessmentSection::Inherent, 1, "4"),
        rate(AssessmentSection::Inherent, 2, "5"),
        rate(AssessmentSection::Inherent, 3, "3"),
        rate(AssessmentSection::Inherent, 4, "3"),
        FormUpdate::SetSectionComments {
            section: AssessmentSection::Inherent,
            comments: "High-value payments released daily".to_string(),
        },
    ];
    // Library controls take ids 2 and 3; the blank starter row goes once they exist.
    for (entry, (id, effectiveness)) in library.entries().iter().take(2).zip([(2, "4"), (3, "3")]) {
        updates.push(FormUpdate::AddControlFromLibrary {
            control_id: entry.control_id.clone(),
        });
        updates.push(rate(AssessmentSection::Control, id, effectiveness));
        updates.push(FormUpdate::SetFactorField {
            section: AssessmentSection::Control,
            factor_id: id,
            field: FactorField::Weighting,
            value: "50".to_string(),
        });
    }
    updates.push(FormUpdate::RemoveFactor {
        section: AssessmentSection::Control,
        factor_id: 1,
    });
    updates.push(FormUpdate::SetSectionComments {
        section: AssessmentSection::Control,
        comments: "Controls taken from the central library".to_string(),
    });
    updates.push(FormUpdate::SetSectionComments {
        section: AssessmentSection::Issues,
        comments: "Breaches tracked in the issue log".to_string(),
    });
    updates
}
