use serde::{Deserialize, Serialize};

/// One row of a task list.
///
/// The editor keeps these in a flat, pre-order sequence. `level` and `display_order` are
/// derived from the sequence and recomputed after every structural change.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct TaskItem {
    /// Stable id once persisted, `tmp-*` before the first successful commit.
    pub id: String,

    pub name: String,

    #[serde(rename = "parent-id", default)]
    pub parent_id: Option<String>,

    #[serde(default)]
    pub level: usize,

    #[serde(rename = "display-order", default)]
    pub display_order: u32,

    /// Screen-specific payload (time range, day range, month, ...).
    /// Never inspected by tree operations.
    #[serde(default)]
    pub attributes: serde_json::Value,
}

impl TaskItem {
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            parent_id: None,
            level: 0,
            display_order: 0,
            attributes: serde_json::Value::Null,
        }
    }

    pub fn with_attributes(mut self, attributes: serde_json::Value) -> Self {
        self.attributes = attributes;
        self
    }
}

/// The five list screens. Each one owns exactly one collection.
#[derive(
    Serialize,
    Deserialize,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::AsRefStr,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub(crate) enum ListKind {
    Monthly,
    Weekly,
    Daily,
    Spot,
    Yearly,
}

impl ListKind {
    pub fn title(&self) -> &'static str {
        match self {
            ListKind::Monthly => "Monthly tasks",
            ListKind::Weekly => "Weekly tasks",
            ListKind::Daily => "Daily tasks",
            ListKind::Spot => "Spot tasks",
            ListKind::Yearly => "Yearly tasks",
        }
    }

    /// Attributes given to a freshly added row on this screen.
    pub fn default_attributes(&self) -> serde_json::Value {
        match self {
            ListKind::Monthly => serde_json::json!({ "day-range": null }),
            ListKind::Weekly => serde_json::json!({ "weekdays": [] }),
            ListKind::Daily => serde_json::json!({ "time-range": null }),
            ListKind::Spot => serde_json::json!({ "date": null }),
            ListKind::Yearly => serde_json::json!({ "month": null }),
        }
    }

    /// Collection owner key used by the storage collaborator.
    pub fn owner_id(&self) -> String {
        format!("tasklist:{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_list_kind_slug_roundtrip() {
        for kind in ListKind::iter() {
            let slug = kind.to_string();
            assert_eq!(ListKind::from_str(&slug).ok(), Some(kind));
        }
        assert!(ListKind::from_str("hourly").is_err());
    }

    #[test]
    fn test_task_item_wire_keys() {
        let mut item = TaskItem::new("n1".to_string(), "Plan".to_string());
        item.parent_id = Some("p".to_string());
        item.display_order = 3;

        let v = serde_json::to_value(&item).expect("should serialize");
        assert_eq!(v["parent-id"], "p");
        assert_eq!(v["display-order"], 3);

        let back: TaskItem = serde_json::from_value(v).expect("should parse");
        assert_eq!(back, item);
    }

    #[test]
    fn test_task_item_missing_optional_fields() {
        let item: TaskItem =
            serde_json::from_str(r#"{"id":"a","name":"A"}"#).expect("should parse");
        assert!(item.parent_id.is_none());
        assert_eq!(item.level, 0);
        assert!(item.attributes.is_null());
    }
}
