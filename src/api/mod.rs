use crate::config::EnvConfig;
use crate::persist::payload::{ReplaceCollectionRequest, ReplaceCollectionResponse, ReplaceEntry};
use crate::persist::reception::StoredRow;
use crate::persist::CollectionStore;
use crate::storage::TOKEN_KEY;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ApiErrorKind {
    Unauthorized,
    Network,
    Http,
    Parse,
    /// The store refused the payload (bad back-reference, duplicate id).
    Rejected,
    /// Browser storage failed (local mode).
    Storage,
}

#[derive(Clone, Debug)]
pub(crate) struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ApiError {
    fn network(e: reqwest::Error) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            message: e.to_string(),
        }
    }

    pub(crate) fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            message: e.to_string(),
        }
    }

    fn unauthorized() -> Self {
        Self {
            kind: ApiErrorKind::Unauthorized,
            message: "Unauthorized".to_string(),
        }
    }

    fn http(status: reqwest::StatusCode, body: String, ctx: &str) -> Self {
        // The backend answers 422 when a replace payload does not resolve.
        let kind = if status.as_u16() == 422 {
            ApiErrorKind::Rejected
        } else {
            ApiErrorKind::Http
        };
        Self {
            kind,
            message: format!("{ctx} ({status}): {body}"),
        }
    }

    pub(crate) fn rejected(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Rejected,
            message: e.to_string(),
        }
    }

    pub(crate) fn storage(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Storage,
            message: e.to_string(),
        }
    }

    /// Worth retrying later without user action.
    pub(crate) fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            ApiErrorKind::Network | ApiErrorKind::Http | ApiErrorKind::Storage
        )
    }
}

pub(crate) type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct GetCollectionRequest {
    #[serde(rename = "owner-id")]
    pub owner_id: String,
}

#[derive(Clone)]
pub(crate) struct ApiClient {
    pub(crate) base_url: String,
    pub(crate) token: Option<String>,
}

impl ApiClient {
    #[allow(dead_code)]
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            token: None,
        }
    }

    pub fn load_from_storage() -> Self {
        let base_url = EnvConfig::new().api_url;
        let token = leptos::web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .and_then(|s| s.get_item(TOKEN_KEY).ok().flatten());

        Self { base_url, token }
    }

    #[allow(dead_code)]
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub(crate) fn get_auth_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {t}"))
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn with_auth_headers(
        mut req: reqwest::RequestBuilder,
        auth: Option<String>,
    ) -> reqwest::RequestBuilder {
        if let Some(auth) = auth {
            req = req.header("Authorization", auth);
        }
        req
    }

    async fn request_api<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&impl serde::Serialize>,
    ) -> ApiResult<T> {
        let client = reqwest::Client::new();
        let url = format!("{}{}", self.base_url, path);
        let mut req = client.post(url);
        req = Self::with_auth_headers(req, self.get_auth_header());

        if let Some(b) = body {
            req = req.json(b);
        }

        let res = req.send().await.map_err(ApiError::network)?;

        if res.status().is_success() {
            res.json().await.map_err(ApiError::parse)
        } else if res.status().as_u16() == 401 {
            Err(ApiError::unauthorized())
        } else {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            Err(ApiError::http(status, body, "Request failed"))
        }
    }

    /// Replace the whole collection of `owner_id`. Returns the ids assigned, in payload order.
    pub async fn replace_collection(
        &self,
        owner_id: &str,
        entries: &[ReplaceEntry],
    ) -> ApiResult<Vec<String>> {
        let data: serde_json::Value = self
            .request_api(
                "/tasklist/replace-collection",
                Some(&ReplaceCollectionRequest {
                    owner_id: owner_id.to_string(),
                    items: entries.to_vec(),
                }),
            )
            .await?;
        Self::parse_replace_response(data)
    }

    pub async fn get_collection(&self, owner_id: &str) -> ApiResult<Vec<StoredRow>> {
        let data: serde_json::Value = self
            .request_api(
                "/tasklist/get-collection",
                Some(&GetCollectionRequest {
                    owner_id: owner_id.to_string(),
                }),
            )
            .await?;
        Ok(Self::parse_collection_response(data))
    }

    pub(crate) fn parse_replace_response(data: serde_json::Value) -> ApiResult<Vec<String>> {
        if let Ok(resp) = serde_json::from_value::<ReplaceCollectionResponse>(data.clone()) {
            return Ok(resp.ids);
        }
        // Bare array form.
        serde_json::from_value::<Vec<String>>(data.clone())
            .map_err(|_| ApiError::parse(format!("replace response is missing ids: {data}")))
    }

    pub(crate) fn parse_collection_response(data: serde_json::Value) -> Vec<StoredRow> {
        let list = data
            .get("items")
            .or_else(|| data.get("item-list"))
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let mut out: Vec<StoredRow> = Vec::with_capacity(list.len());
        for item in list {
            // Canonical contract: non-namespaced kebab-case keys.
            if let Ok(row) = serde_json::from_value::<StoredRow>(item.clone()) {
                if !row.id.trim().is_empty() {
                    out.push(row);
                }
                continue;
            }

            let get_s = |k: &str| item.get(k).and_then(|v| v.as_str()).map(|s| s.to_string());
            let get_u = |k: &str| item.get(k).and_then(|v| v.as_u64());

            let id = get_s("id")
                .or_else(|| get_s("tasklist-items/id"))
                .unwrap_or_default();
            if id.trim().is_empty() {
                continue;
            }

            out.push(StoredRow {
                id,
                name: get_s("name")
                    .or_else(|| get_s("tasklist-items/name"))
                    .unwrap_or_default(),
                parent_id: get_s("parent-id")
                    .or_else(|| get_s("tasklist-items/parent-id"))
                    .filter(|s| !s.trim().is_empty()),
                display_order: get_u("display-order")
                    .or_else(|| get_u("tasklist-items/display-order"))
                    .unwrap_or(0) as u32,
                attributes: item
                    .get("attributes")
                    .or_else(|| item.get("tasklist-items/attributes"))
                    .cloned()
                    .unwrap_or(serde_json::Value::Null),
            });
        }

        out
    }
}

impl CollectionStore for ApiClient {
    async fn replace_collection(
        &self,
        owner_id: &str,
        entries: &[ReplaceEntry],
    ) -> ApiResult<Vec<String>> {
        ApiClient::replace_collection(self, owner_id, entries).await
    }

    async fn fetch_collection(&self, owner_id: &str) -> ApiResult<Vec<StoredRow>> {
        self.get_collection(owner_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_client_new() {
        let client = ApiClient::new("http://localhost:6689".to_string());
        assert_eq!(client.base_url, "http://localhost:6689");
        assert!(client.token.is_none());
        assert!(!client.is_authenticated());
    }

    #[test]
    fn test_api_client_auth_header() {
        let mut client = ApiClient::new("http://localhost:6689".to_string());
        assert!(client.get_auth_header().is_none());

        client.set_token("my-jwt-token".to_string());
        assert!(client.is_authenticated());
        assert_eq!(client.get_auth_header().as_deref(), Some("Bearer my-jwt-token"));
    }

    #[test]
    fn test_parse_replace_response_shapes() {
        let ids = ApiClient::parse_replace_response(serde_json::json!({ "ids": ["r1", "r2"] }))
            .expect("object form should parse");
        assert_eq!(ids, vec!["r1", "r2"]);

        let ids = ApiClient::parse_replace_response(serde_json::json!(["r1"]))
            .expect("array form should parse");
        assert_eq!(ids, vec!["r1"]);

        let err = ApiClient::parse_replace_response(serde_json::json!({ "ok": true }))
            .expect_err("missing ids should fail");
        assert_eq!(err.kind, ApiErrorKind::Parse);
    }

    #[test]
    fn test_parse_collection_response_canonical_and_namespaced() {
        let data = serde_json::json!({
            "items": [
                { "id": "a", "name": "A", "parent-id": null, "display-order": 1 },
                {
                    "tasklist-items/id": "b",
                    "tasklist-items/name": "B",
                    "tasklist-items/parent-id": "a",
                    "tasklist-items/display-order": 2,
                    "tasklist-items/attributes": { "done": true }
                },
                { "name": "no id" }
            ]
        });

        let rows = ApiClient::parse_collection_response(data);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "a");
        assert_eq!(rows[1].parent_id.as_deref(), Some("a"));
        assert_eq!(rows[1].display_order, 2);
        assert_eq!(rows[1].attributes["done"], true);
    }

    #[test]
    fn test_error_transience() {
        assert!(ApiError::storage("quota").is_transient());
        assert!(!ApiError::rejected("forward reference").is_transient());
        assert!(!ApiError::parse("bad json").is_transient());
    }
}

// WASM-only tests (run with `cargo test --target wasm32-unknown-unknown` + wasm-bindgen-test-runner)
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_api_client_reads_token_from_storage() {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .expect("localStorage should exist");

        let _ = storage.remove_item(TOKEN_KEY);
        assert!(!ApiClient::load_from_storage().is_authenticated());

        let _ = storage.set_item(TOKEN_KEY, "t1");
        let c = ApiClient::load_from_storage();
        assert_eq!(c.get_auth_header().as_deref(), Some("Bearer t1"));

        let _ = storage.remove_item(TOKEN_KEY);
    }
}
