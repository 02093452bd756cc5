use crate::models::TaskItem;
use crate::storage::{load_json_from_storage, remove_from_storage, save_json_to_storage};
use serde::{Deserialize, Serialize};

fn key(owner_id: &str) -> String {
    format!("tasklist_snapshot::{owner_id}")
}

/// Local copy of a list, written on every mutation.
///
/// Survives a reload that happens before the debounced commit lands. Cleared once the store
/// has accepted the latest content.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct ListSnapshot {
    pub saved_ms: i64,
    pub owner_id: String,
    pub items: Vec<TaskItem>,
}

pub(crate) fn save_list_snapshot(owner_id: &str, items: &[TaskItem], saved_ms: i64) {
    if owner_id.trim().is_empty() {
        return;
    }

    let snap = ListSnapshot {
        saved_ms,
        owner_id: owner_id.to_string(),
        items: items.to_vec(),
    };

    save_json_to_storage(&key(owner_id), &snap);
}

pub(crate) fn load_list_snapshot(owner_id: &str) -> Option<ListSnapshot> {
    if owner_id.trim().is_empty() {
        return None;
    }
    load_json_from_storage::<ListSnapshot>(&key(owner_id))
}

pub(crate) fn clear_list_snapshot(owner_id: &str) {
    if owner_id.trim().is_empty() {
        return;
    }
    remove_from_storage(&key(owner_id));
}

/// Pick the rows to show after a fetch.
///
/// A snapshot only exists while it holds edits the store never saw, so it wins. Returns the
/// rows and whether they still need a commit.
pub(crate) fn prefer_unsynced(
    snapshot: Option<ListSnapshot>,
    fetched: Vec<TaskItem>,
) -> (Vec<TaskItem>, bool) {
    match snapshot {
        Some(s) => (s.items, true),
        None => (fetched, false),
    }
}
