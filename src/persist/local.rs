use super::payload::ReplaceEntry;
use super::reception::{resolve_back_references, StoredRow};
use super::CollectionStore;
use crate::api::{ApiError, ApiResult};
use crate::storage::{load_json_from_storage, local_collection_key, try_save_json_to_storage};
use crate::util::random_u64;

/// Collections kept in `localStorage`, one key per owner.
///
/// Plays the same role as the backend: resolves back-references, assigns ids, and swaps the
/// stored collection in a single write.
#[derive(Clone, Debug, Default)]
pub(crate) struct LocalStore;

fn next_row_id() -> String {
    format!("row-{:x}", random_u64())
}

impl CollectionStore for LocalStore {
    async fn replace_collection(
        &self,
        owner_id: &str,
        entries: &[ReplaceEntry],
    ) -> ApiResult<Vec<String>> {
        let rows = resolve_back_references(entries, next_row_id).map_err(ApiError::rejected)?;
        try_save_json_to_storage(&local_collection_key(owner_id), &rows)
            .map_err(ApiError::storage)?;
        Ok(rows.into_iter().map(|r| r.id).collect())
    }

    async fn fetch_collection(&self, owner_id: &str) -> ApiResult<Vec<StoredRow>> {
        Ok(load_json_from_storage::<Vec<StoredRow>>(&local_collection_key(owner_id))
            .unwrap_or_default())
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use crate::storage::remove_from_storage;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn entry(name: &str, parent: Option<usize>) -> ReplaceEntry {
        ReplaceEntry {
            id: None,
            name: name.to_string(),
            display_order: 0,
            parent,
            attributes: serde_json::Value::Null,
        }
    }

    #[wasm_bindgen_test]
    async fn test_local_store_replace_then_fetch() {
        let owner = "tasklist:test-local";
        remove_from_storage(&local_collection_key(owner));

        let store = LocalStore;
        let ids = store
            .replace_collection(owner, &[entry("A", None), entry("B", Some(0))])
            .await
            .expect("replace should succeed");
        assert_eq!(ids.len(), 2);

        let rows = store.fetch_collection(owner).await.expect("fetch should succeed");
        assert_eq!(rows[1].parent_id.as_deref(), Some(ids[0].as_str()));

        // A rejected payload leaves the previous collection in place.
        let err = store
            .replace_collection(owner, &[entry("X", Some(3))])
            .await
            .expect_err("forward reference should be rejected");
        assert_eq!(err.kind, crate::api::ApiErrorKind::Rejected);
        let rows = store.fetch_collection(owner).await.expect("fetch should succeed");
        assert_eq!(rows.len(), 2);

        remove_from_storage(&local_collection_key(owner));
    }
}
