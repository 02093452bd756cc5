use crate::models::TaskItem;
use crate::util::is_tmp_id;
use leptos::logging::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One row of a bulk replace.
///
/// Parent links are expressed as `parent`: the index of the parent inside the same array,
/// always smaller than the entry's own index. New rows have no stable id to point at yet.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct ReplaceEntry {
    /// Stable id of an already-persisted row (omitted for new rows).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub name: String,

    #[serde(rename = "display-order")]
    pub display_order: u32,

    #[serde(default)]
    pub parent: Option<usize>,

    #[serde(default)]
    pub attributes: serde_json::Value,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct ReplaceCollectionRequest {
    #[serde(rename = "owner-id")]
    pub owner_id: String,
    pub items: Vec<ReplaceEntry>,
}

/// Identifiers assigned by the store, in payload order.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct ReplaceCollectionResponse {
    pub ids: Vec<String>,
}

/// Serialize a flat sequence into back-reference form.
pub(crate) fn to_entries(items: &[TaskItem]) -> Vec<ReplaceEntry> {
    let positions: HashMap<&str, usize> = items
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();

    items
        .iter()
        .enumerate()
        .map(|(i, n)| {
            let parent = n.parent_id.as_deref().and_then(|p| match positions.get(p) {
                Some(&pi) if pi < i => Some(pi),
                _ => {
                    // Pre-order guarantees parents come first; anything else is sent as a root.
                    warn!("row {} has no earlier parent {p}; sending as root", n.id);
                    None
                }
            });

            ReplaceEntry {
                id: (!is_tmp_id(&n.id)).then(|| n.id.clone()),
                name: n.name.clone(),
                display_order: i as u32 + 1,
                parent,
                attributes: n.attributes.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::invariants::tests::seq;

    #[test]
    fn test_back_references_point_earlier() {
        let items = seq(&[("a", 0), ("b", 1), ("c", 2), ("d", 1), ("e", 0)]);
        let entries = to_entries(&items);
        let parents: Vec<Option<usize>> = entries.iter().map(|e| e.parent).collect();
        assert_eq!(parents, vec![None, Some(0), Some(1), Some(0), None]);
        let orders: Vec<u32> = entries.iter().map(|e| e.display_order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_provisional_ids_are_not_sent() {
        let items = seq(&[("tmp-1-a", 0), ("row-9", 1)]);
        let entries = to_entries(&items);
        assert_eq!(entries[0].id, None);
        assert_eq!(entries[1].id.as_deref(), Some("row-9"));
    }

    #[test]
    fn test_request_wire_shape() {
        let items = seq(&[("tmp-1-a", 0), ("tmp-2-b", 1)]);
        let req = ReplaceCollectionRequest {
            owner_id: "tasklist:daily".to_string(),
            items: to_entries(&items),
        };
        let v = serde_json::to_value(&req).expect("should serialize");
        assert_eq!(v["owner-id"], "tasklist:daily");
        assert!(v["items"][0].get("id").is_none());
        assert!(v["items"][0]["parent"].is_null());
        assert_eq!(v["items"][1]["parent"], 0);
        assert_eq!(v["items"][1]["display-order"], 2);
    }
}
