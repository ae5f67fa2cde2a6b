mod parser;

use crate::workflows::assessment::domain::{Control, ControlCategory};
use serde::Serialize;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

#[derive(Debug)]
pub enum ControlLibraryImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidCategory { row: usize, value: String },
    Empty,
}

impl std::fmt::Display for ControlLibraryImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlLibraryImportError::Io(err) => {
                write!(f, "failed to read control library: {}", err)
            }
            ControlLibraryImportError::Csv(err) => {
                write!(f, "invalid control library CSV: {}", err)
            }
            ControlLibraryImportError::InvalidCategory { row, value } => write!(
                f,
                "row {} has unknown control category '{}' (expected preventive, detective, corrective, or directive)",
                row, value
            ),
            ControlLibraryImportError::Empty => {
                write!(f, "control library export contained no controls")
            }
        }
    }
}

impl std::error::Error for ControlLibraryImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ControlLibraryImportError::Io(err) => Some(err),
            ControlLibraryImportError::Csv(err) => Some(err),
            ControlLibraryImportError::InvalidCategory { .. } | ControlLibraryImportError::Empty => {
                None
            }
        }
    }
}

impl From<std::io::Error> for ControlLibraryImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ControlLibraryImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Catalogued control an assessor can pull into the control section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryEntry {
    pub control_id: String,
    pub name: String,
    pub description: String,
    pub category: ControlCategory,
    pub is_key_control: bool,
}

impl LibraryEntry {
    /// Fresh control prefilled from the catalogue; ratings start blank.
    pub fn instantiate(&self, id: u32) -> Control {
        Control {
            control_id: self.control_id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category,
            is_key_control: self.is_key_control,
            ..Control::blank(id)
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControlLibrary {
    entries: Vec<LibraryEntry>,
}

impl ControlLibrary {
    pub fn standard() -> Self {
        Self {
            entries: standard_entries(),
        }
    }

    pub fn entries(&self) -> &[LibraryEntry] {
        &self.entries
    }

    pub fn find(&self, control_id: &str) -> Option<&LibraryEntry> {
        self.entries
            .iter()
            .find(|entry| entry.control_id.eq_ignore_ascii_case(control_id.trim()))
    }

    pub fn by_category(&self, category: ControlCategory) -> Vec<&LibraryEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.category == category)
            .collect()
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ControlLibraryImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Loads a CSV export; the first row for a control id wins.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ControlLibraryImportError> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut entries = Vec::new();

        for entry in parser::parse_entries(reader)? {
            if seen.insert(entry.control_id.to_ascii_uppercase()) {
                entries.push(entry);
            }
        }

        if entries.is_empty() {
            return Err(ControlLibraryImportError::Empty);
        }

        Ok(Self { entries })
    }
}

impl Default for ControlLibrary {
    fn default() -> Self {
        Self::standard()
    }
}

fn entry(
    control_id: &str,
    name: &str,
    description: &str,
    category: ControlCategory,
    is_key_control: bool,
) -> LibraryEntry {
    LibraryEntry {
        control_id: control_id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        category,
        is_key_control,
    }
}

fn standard_entries() -> Vec<LibraryEntry> {
    vec![
        entry(
            "CTL-ACC-001",
            "User access recertification",
            "Quarterly review of privileged and business-critical system access by line managers.",
            ControlCategory::Preventive,
            true,
        ),
        entry(
            "CTL-ACC-002",
            "Segregation of duties rule set",
            "System-enforced conflicts prevent one user from initiating and approving the same transaction.",
            ControlCategory::Preventive,
            true,
        ),
        entry(
            "CTL-PAY-001",
            "Dual authorisation of payments",
            "Payments above the delegated limit require a second independent approver before release.",
            ControlCategory::Preventive,
            true,
        ),
        entry(
            "CTL-REC-001",
            "Daily account reconciliation",
            "Operations reconcile nostro and suspense balances daily and escalate breaks older than two days.",
            ControlCategory::Detective,
            true,
        ),
        entry(
            "CTL-MON-001",
            "Exception reporting and monitoring",
            "Automated exception reports are reviewed each morning with sign-off retained as evidence.",
            ControlCategory::Detective,
            false,
        ),
        entry(
            "CTL-INC-001",
            "Incident management and root cause analysis",
            "Operational incidents are logged, triaged, and closed with documented root cause and actions.",
            ControlCategory::Corrective,
            false,
        ),
        entry(
            "CTL-BCP-001",
            "Business continuity recovery testing",
            "Annual failover test of critical processes against agreed recovery time objectives.",
            ControlCategory::Corrective,
            false,
        ),
        entry(
            "CTL-POL-001",
            "Policy attestation and training",
            "Staff attest annually to the operational risk policy and complete mandatory training.",
            ControlCategory::Directive,
            false,
        ),
    ]
}
