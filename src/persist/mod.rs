//! Bridge between the in-memory outline and a collection store.
//!
//! A commit always sends the whole list (bulk replace). New rows carry no id, so parent
//! links travel as back-references into the same payload. The store answers with the ids
//! it assigned, which are mapped back onto the live outline.

pub(crate) mod local;
pub(crate) mod payload;
pub(crate) mod reception;
pub(crate) mod scheduler;

use crate::api::{ApiError, ApiResult};
use crate::models::TaskItem;
use payload::{to_entries, ReplaceEntry};
use reception::StoredRow;
use std::collections::HashMap;

pub(crate) use local::LocalStore;
pub(crate) use scheduler::{CommitScheduler, CommitStep};

/// Anything that can hold one collection of rows per owner.
pub(crate) trait CollectionStore {
    /// Atomically replace the owner's collection. Returns assigned ids in payload order.
    async fn replace_collection(
        &self,
        owner_id: &str,
        entries: &[ReplaceEntry],
    ) -> ApiResult<Vec<String>>;

    async fn fetch_collection(&self, owner_id: &str) -> ApiResult<Vec<StoredRow>>;
}

/// Payload frozen at send time, plus the local ids it was built from.
#[derive(Clone, Debug)]
pub(crate) struct CommitSnapshot {
    pub entries: Vec<ReplaceEntry>,
    pub sent_ids: Vec<String>,
}

impl CommitSnapshot {
    pub fn capture(items: &[TaskItem]) -> Self {
        Self {
            entries: to_entries(items),
            sent_ids: items.iter().map(|n| n.id.clone()).collect(),
        }
    }
}

/// Pair local ids with store ids by payload position. Only changed ids are kept.
pub(crate) fn id_remap(
    sent_ids: &[String],
    assigned: Vec<String>,
) -> ApiResult<HashMap<String, String>> {
    if sent_ids.len() != assigned.len() {
        return Err(ApiError::parse(format!(
            "store returned {} ids for {} rows",
            assigned.len(),
            sent_ids.len()
        )));
    }

    Ok(sent_ids
        .iter()
        .cloned()
        .zip(assigned)
        .filter(|(local, stored)| local != stored)
        .collect())
}

/// Send one snapshot. On success returns the local-to-stored id mapping to apply to the
/// live outline (which may have changed meanwhile).
pub(crate) async fn commit<S: CollectionStore>(
    store: &S,
    owner_id: &str,
    snapshot: &CommitSnapshot,
) -> ApiResult<HashMap<String, String>> {
    let assigned = store.replace_collection(owner_id, &snapshot.entries).await?;
    id_remap(&snapshot.sent_ids, assigned)
}

/// Fetch the owner's rows. Levels are not trusted; the caller normalizes.
pub(crate) async fn load<S: CollectionStore>(store: &S, owner_id: &str) -> ApiResult<Vec<TaskItem>> {
    let rows = store.fetch_collection(owner_id).await?;
    Ok(rows.into_iter().map(StoredRow::into_item).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::{AddAnchor, Outline, DEFAULT_MAX_LEVEL};
    use crate::util::{is_tmp_id, make_tmp_id};
    use futures::executor::block_on;
    use reception::resolve_back_references;
    use std::cell::{Cell, RefCell};

    /// In-memory store with the same reception rules as the real ones.
    #[derive(Default)]
    struct MemoryStore {
        collections: RefCell<HashMap<String, Vec<StoredRow>>>,
        counter: Cell<u32>,
        fail: Cell<bool>,
    }

    impl CollectionStore for MemoryStore {
        async fn replace_collection(
            &self,
            owner_id: &str,
            entries: &[ReplaceEntry],
        ) -> ApiResult<Vec<String>> {
            if self.fail.get() {
                return Err(ApiError::storage("store unavailable"));
            }
            let rows = resolve_back_references(entries, || {
                self.counter.set(self.counter.get() + 1);
                format!("row-{}", self.counter.get())
            })
            .map_err(ApiError::rejected)?;
            let ids = rows.iter().map(|r| r.id.clone()).collect();
            self.collections
                .borrow_mut()
                .insert(owner_id.to_string(), rows);
            Ok(ids)
        }

        async fn fetch_collection(&self, owner_id: &str) -> ApiResult<Vec<StoredRow>> {
            Ok(self
                .collections
                .borrow()
                .get(owner_id)
                .cloned()
                .unwrap_or_default())
        }
    }

    fn new_row(outline: &mut Outline, n: u64, name: &str, editing: Option<&str>) -> String {
        let id = make_tmp_id(1_000 + n as i64, n);
        outline.add(
            TaskItem::new(id.clone(), name.to_string()),
            editing,
            AddAnchor::Tail,
        );
        id
    }

    #[test]
    fn test_new_parent_and_child_commit_and_reload() {
        let store = MemoryStore::default();
        let owner = "tasklist:daily";

        let mut outline = Outline::new(DEFAULT_MAX_LEVEL);
        let a = new_row(&mut outline, 1, "A", None);
        let b = new_row(&mut outline, 2, "B", None);
        assert!(outline.nest(&b, &a));

        let snap = CommitSnapshot::capture(outline.items());
        assert_eq!(snap.entries[1].parent, Some(0));

        let remap = block_on(commit(&store, owner, &snap)).expect("commit should succeed");
        assert_eq!(remap.len(), 2);
        assert_eq!(outline.remap_ids(&remap), 2);

        let items = outline.items();
        assert!(items.iter().all(|n| !is_tmp_id(&n.id)));
        assert_eq!(items[1].parent_id.as_deref(), Some(items[0].id.as_str()));

        let rows = block_on(load(&store, owner)).expect("load should succeed");
        let reloaded = Outline::from_rows(&rows, DEFAULT_MAX_LEVEL);
        assert_eq!(reloaded, outline);
    }

    #[test]
    fn test_second_commit_keeps_ids() {
        let store = MemoryStore::default();
        let owner = "tasklist:weekly";

        let mut outline = Outline::new(DEFAULT_MAX_LEVEL);
        new_row(&mut outline, 1, "A", None);
        let remap = block_on(commit(&store, owner, &CommitSnapshot::capture(outline.items())))
            .expect("commit should succeed");
        outline.remap_ids(&remap);
        let first_id = outline.items()[0].id.clone();

        outline.rename(&first_id, "A2");
        let remap = block_on(commit(&store, owner, &CommitSnapshot::capture(outline.items())))
            .expect("commit should succeed");
        assert!(remap.is_empty());

        let rows = block_on(load(&store, owner)).expect("load should succeed");
        assert_eq!(rows[0].id, first_id);
        assert_eq!(rows[0].name, "A2");
    }

    #[test]
    fn test_mutation_during_flight_survives_reconciliation() {
        let store = MemoryStore::default();
        let owner = "tasklist:spot";

        let mut outline = Outline::new(DEFAULT_MAX_LEVEL);
        let a = new_row(&mut outline, 1, "A", None);
        let snap = CommitSnapshot::capture(outline.items());

        // Added after the snapshot was taken, as a child of the in-flight row.
        let c = new_row(&mut outline, 3, "C", None);
        assert!(outline.nest(&c, &a));

        let remap = block_on(commit(&store, owner, &snap)).expect("commit should succeed");
        outline.remap_ids(&remap);

        let items = outline.items();
        assert_eq!(items.len(), 2);
        assert!(!is_tmp_id(&items[0].id));
        assert_eq!(items[1].id, c);
        assert_eq!(items[1].parent_id.as_deref(), Some(items[0].id.as_str()));
    }

    #[test]
    fn test_failed_commit_leaves_everything_in_place() {
        let store = MemoryStore::default();
        store.fail.set(true);

        let mut outline = Outline::new(DEFAULT_MAX_LEVEL);
        new_row(&mut outline, 1, "A", None);
        let before = outline.clone();

        let err = block_on(commit(&store, "tasklist:yearly", &CommitSnapshot::capture(outline.items())))
            .expect_err("commit should fail");
        assert!(err.is_transient());
        assert_eq!(outline, before);
        assert!(block_on(load(&store, "tasklist:yearly"))
            .expect("load should succeed")
            .is_empty());
    }

    #[test]
    fn test_rejected_payload_keeps_previous_collection() {
        let store = MemoryStore::default();
        let owner = "tasklist:monthly";

        let mut outline = Outline::new(DEFAULT_MAX_LEVEL);
        new_row(&mut outline, 1, "A", None);
        block_on(commit(&store, owner, &CommitSnapshot::capture(outline.items())))
            .expect("commit should succeed");

        let bad = vec![ReplaceEntry {
            id: None,
            name: "X".to_string(),
            display_order: 1,
            parent: Some(0),
            attributes: serde_json::Value::Null,
        }];
        let err = block_on(store.replace_collection(owner, &bad)).expect_err("should reject");
        assert!(!err.is_transient());

        let rows = block_on(load(&store, owner)).expect("load should succeed");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "A");
    }

    #[test]
    fn test_id_remap_length_mismatch() {
        let err = id_remap(&["a".to_string()], vec![]).expect_err("should fail");
        assert_eq!(err.kind, crate::api::ApiErrorKind::Parse);
    }
}
