use super::{ControlLibraryImportError, LibraryEntry};
use crate::workflows::assessment::domain::ControlCategory;
use serde::{Deserialize, Deserializer};
use std::io::Read;

pub(crate) fn parse_entries<R: Read>(
    reader: R,
) -> Result<Vec<LibraryEntry>, ControlLibraryImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut entries = Vec::new();

    for (index, record) in csv_reader.deserialize::<LibraryRow>().enumerate() {
        let row = record?;
        let category = ControlCategory::parse(&row.category).ok_or_else(|| {
            ControlLibraryImportError::InvalidCategory {
                row: index + 1,
                value: row.category.clone(),
            }
        })?;

        entries.push(LibraryEntry {
            control_id: row.control_id,
            name: row.name,
            description: row.description.unwrap_or_default(),
            category,
            is_key_control: row.key_control.as_deref().is_some_and(is_truthy),
        });
    }

    Ok(entries)
}

#[derive(Debug, Deserialize)]
struct LibraryRow {
    #[serde(rename = "Control ID")]
    control_id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(
        rename = "Description",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    description: Option<String>,
    #[serde(rename = "Category")]
    category: String,
    #[serde(
        rename = "Key Control",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    key_control: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn is_truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "yes" | "y" | "true" | "1" | "key"
    )
}
