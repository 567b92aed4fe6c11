use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub email: String,
}

/// Load contacts from a JSON list or a `name<TAB>email` file.
///
/// TSV rows missing either column are skipped with a warning, as is a
/// leading `Name<TAB>Email` header.
pub fn load_contacts(path: &Path) -> Result<Vec<Contact>> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        return serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()));
    }
    Ok(parse_tsv_contacts(&text))
}

pub fn parse_tsv_contacts(text: &str) -> Vec<Contact> {
    let mut contacts = Vec::new();
    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let mut columns = line.split('\t').map(str::trim);
        let name = columns.next().unwrap_or_default();
        let email = columns.next().unwrap_or_default();
        if index == 0 && name.eq_ignore_ascii_case("name") && email.eq_ignore_ascii_case("email") {
            continue;
        }
        if name.is_empty() || email.is_empty() {
            tracing::warn!(line = index + 1, "skipping contact row without name and email");
            continue;
        }
        contacts.push(Contact {
            name: name.to_string(),
            email: email.to_string(),
        });
    }
    contacts
}
