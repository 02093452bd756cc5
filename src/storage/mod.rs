use serde::{Deserialize, Serialize};

pub(crate) const TOKEN_KEY: &str = "tasklist_token";
pub(crate) const LAST_LIST_KEY: &str = "tasklist_last_list";

/// Collections written by the local store live under this prefix.
pub(crate) const LOCAL_COLLECTION_PREFIX: &str = "tasklist_collection::";

fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window().and_then(|w| w.local_storage().ok().flatten())
}

pub(crate) fn load_string_from_storage(key: &str) -> Option<String> {
    local_storage()?.get_item(key).ok().flatten()
}

pub(crate) fn load_json_from_storage<T: for<'de> Deserialize<'de>>(key: &str) -> Option<T> {
    let json = load_string_from_storage(key)?;
    serde_json::from_str(&json).ok()
}

/// Best-effort write. Quota errors and a missing `localStorage` are ignored.
pub(crate) fn save_json_to_storage<T: Serialize>(key: &str, value: &T) {
    let _ = try_save_json_to_storage(key, value);
}

/// Like [`save_json_to_storage`], but reports why the write did not happen.
pub(crate) fn try_save_json_to_storage<T: Serialize>(key: &str, value: &T) -> Result<(), String> {
    let json = serde_json::to_string(value).map_err(|e| e.to_string())?;
    let storage = local_storage().ok_or_else(|| "localStorage unavailable".to_string())?;
    storage
        .set_item(key, &json)
        .map_err(|e| format!("localStorage write failed: {e:?}"))
}

pub(crate) fn remove_from_storage(key: &str) {
    if let Some(storage) = local_storage() {
        let _ = storage.remove_item(key);
    }
}

pub(crate) fn local_collection_key(owner_id: &str) -> String {
    format!("{LOCAL_COLLECTION_PREFIX}{owner_id}")
}
