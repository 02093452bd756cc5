pub(crate) mod list_sync;

use crate::api::{ApiClient, ApiResult};
use crate::config::{EditorConfig, EnvConfig, StorageMode};
use crate::persist::payload::ReplaceEntry;
use crate::persist::reception::StoredRow;
use crate::persist::{CollectionStore, LocalStore};
use leptos::logging::log;
use leptos::prelude::*;

pub(crate) use list_sync::ListSyncController;

/// The store commits go to, chosen once from `window.ENV.STORAGE`.
#[derive(Clone)]
pub(crate) enum Backend {
    Api(ApiClient),
    Local(LocalStore),
}

impl CollectionStore for Backend {
    async fn replace_collection(
        &self,
        owner_id: &str,
        entries: &[ReplaceEntry],
    ) -> ApiResult<Vec<String>> {
        match self {
            Backend::Api(c) => CollectionStore::replace_collection(c, owner_id, entries).await,
            Backend::Local(s) => s.replace_collection(owner_id, entries).await,
        }
    }

    async fn fetch_collection(&self, owner_id: &str) -> ApiResult<Vec<StoredRow>> {
        match self {
            Backend::Api(c) => c.fetch_collection(owner_id).await,
            Backend::Local(s) => s.fetch_collection(owner_id).await,
        }
    }
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub api_client: RwSignal<ApiClient>,
    pub env: StoredValue<EnvConfig>,
    pub editor_config: StoredValue<EditorConfig>,
}

impl AppState {
    pub fn new() -> Self {
        let env = EnvConfig::new();
        let editor_config = EditorConfig::from(&env);
        let api_client = ApiClient::load_from_storage();
        if env.storage == StorageMode::Api && !api_client.is_authenticated() {
            log!("no token stored, list requests go out without Authorization");
        }

        Self {
            api_client: RwSignal::new(api_client),
            env: StoredValue::new(env),
            editor_config: StoredValue::new(editor_config),
        }
    }

    pub fn backend(&self) -> Backend {
        match self.env.with_value(|e| e.storage) {
            StorageMode::Api => Backend::Api(self.api_client.get_untracked()),
            StorageMode::Local => Backend::Local(LocalStore),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub(crate) struct AppContext(pub AppState);
