use rcsa::workflows::assessment::{
    AssessmentForm, ControlCategory, FormUpdate, RiskAppetite, RiskProfile,
};
use rcsa::workflows::library::{ControlLibrary, ControlLibraryImportError};

const EXPORT: &str = "Control ID,Name,Description,Category,Key Control\n\
CTL-TP-001,Vendor due diligence,Annual onboarding review,Preventive,Yes\n\
CTL-TP-002,Contract exit plan,,Corrective,\n\
CTL-TP-003,Vendor SLA monitoring,Monthly KPI pack,detective,Y\n\
CTL-TP-001,Duplicate row,Ignored,Directive,No\n";

#[test]
fn imported_library_feeds_the_control_section() {
    let library = ControlLibrary::from_reader(EXPORT.as_bytes()).expect("export imports");
    assert_eq!(library.entries().len(), 3);

    let due_diligence = library.find("ctl-tp-001").expect("case-insensitive lookup");
    assert_eq!(due_diligence.name, "Vendor due diligence");
    assert!(due_diligence.is_key_control);
    assert_eq!(
        library
            .by_category(ControlCategory::Detective)
            .first()
            .map(|entry| entry.control_id.as_str()),
        Some("CTL-TP-003")
    );

    let mut form = AssessmentForm::new(RiskProfile::default(), RiskAppetite::new(3.0, "Moderate"));
    for control_id in ["CTL-TP-001", "CTL-TP-002"] {
        form.apply(
            FormUpdate::AddControlFromLibrary {
                control_id: control_id.to_string(),
            },
            &library,
        )
        .expect("library control added");
    }

    let groups = form.controls_by_category();
    let categories: Vec<ControlCategory> = groups.iter().map(|(category, _)| *category).collect();
    assert_eq!(
        categories,
        vec![ControlCategory::Preventive, ControlCategory::Corrective]
    );
    assert!(form
        .apply(
            FormUpdate::AddControlFromLibrary {
                control_id: "CTL-UNKNOWN".to_string(),
            },
            &library,
        )
        .is_err());
}

#[test]
fn unknown_categories_report_their_row() {
    let export = "Control ID,Name,Description,Category,Key Control\n\
CTL-TP-001,Vendor due diligence,,Preventive,\n\
CTL-TP-009,Wishful thinking,,Aspirational,\n";

    let err = ControlLibrary::from_reader(export.as_bytes()).expect_err("bad category");
    match err {
        ControlLibraryImportError::InvalidCategory { row, value } => {
            assert_eq!(row, 2);
            assert_eq!(value, "Aspirational");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_files_surface_io_errors() {
    let err = ControlLibrary::from_path("does/not/exist.csv").expect_err("missing file");
    assert!(matches!(err, ControlLibraryImportError::Io(_)));
}
