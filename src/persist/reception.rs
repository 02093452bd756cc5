use super::payload::ReplaceEntry;
use crate::models::TaskItem;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const ID_ATTEMPTS: usize = 8;

/// A row as the store keeps it: parent links resolved to stable ids.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct StoredRow {
    pub id: String,
    pub name: String,

    #[serde(rename = "parent-id", default)]
    pub parent_id: Option<String>,

    #[serde(rename = "display-order", default)]
    pub display_order: u32,

    #[serde(default)]
    pub attributes: serde_json::Value,
}

impl StoredRow {
    pub fn into_item(self) -> TaskItem {
        TaskItem {
            id: self.id,
            name: self.name,
            parent_id: self.parent_id,
            level: 0,
            display_order: self.display_order,
            attributes: self.attributes,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ReplaceError {
    /// `parent` does not point strictly earlier in the payload.
    ForwardReference { index: usize, parent: usize },
    DuplicateId { id: String },
}

impl std::fmt::Display for ReplaceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplaceError::ForwardReference { index, parent } => {
                write!(f, "entry {index} references parent {parent}, which is not earlier")
            }
            ReplaceError::DuplicateId { id } => write!(f, "duplicate id {id}"),
        }
    }
}

/// Receiving side of a bulk replace.
///
/// Assigns an id to every entry first (reusing ids the client already knows, generating the
/// rest), then resolves back-references against those ids. Nothing is returned unless the
/// whole payload resolves, so the caller can swap collections atomically.
pub(crate) fn resolve_back_references(
    entries: &[ReplaceEntry],
    mut next_id: impl FnMut() -> String,
) -> Result<Vec<StoredRow>, ReplaceError> {
    let mut sent: HashSet<&str> = HashSet::with_capacity(entries.len());
    for e in entries {
        if let Some(id) = e.id.as_deref().filter(|id| !id.trim().is_empty()) {
            if !sent.insert(id) {
                return Err(ReplaceError::DuplicateId { id: id.to_string() });
            }
        }
    }

    let mut ids: Vec<String> = Vec::with_capacity(entries.len());
    let mut seen: HashSet<String> = HashSet::with_capacity(entries.len());
    for e in entries {
        let id = match e.id.as_deref().filter(|id| !id.trim().is_empty()) {
            Some(id) => id.to_string(),
            // A generated id must not take one a later entry already owns.
            None => {
                let mut id = next_id();
                let mut attempts = 1;
                while sent.contains(id.as_str()) || seen.contains(&id) {
                    if attempts == ID_ATTEMPTS {
                        return Err(ReplaceError::DuplicateId { id });
                    }
                    id = next_id();
                    attempts += 1;
                }
                id
            }
        };
        seen.insert(id.clone());
        ids.push(id);
    }

    let mut rows = Vec::with_capacity(entries.len());
    for (i, e) in entries.iter().enumerate() {
        let parent_id = match e.parent {
            None => None,
            Some(p) if p < i => Some(ids[p].clone()),
            Some(p) => return Err(ReplaceError::ForwardReference { index: i, parent: p }),
        };

        rows.push(StoredRow {
            id: ids[i].clone(),
            name: e.name.clone(),
            parent_id,
            display_order: e.display_order,
            attributes: e.attributes.clone(),
        });
    }

    Ok(rows)
}
