use crate::models::TaskItem;
use std::collections::HashSet;
use std::ops::Range;

/// A flat sequence that is not a valid pre-order traversal.
///
/// The mutation engine never produces one of these; seeing one means an engine bug.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Violation {
    DuplicateId {
        id: String,
    },
    SelfParent {
        id: String,
    },
    DanglingParent {
        id: String,
        parent: String,
    },
    DepthExceeded {
        id: String,
        level: usize,
        max_level: usize,
    },
    /// The parent exists but its block was closed (or it appears later) before this row.
    NotContiguous {
        id: String,
        parent: String,
    },
    LevelMismatch {
        id: String,
        expected: usize,
        found: usize,
    },
    OrderGap {
        index: usize,
        expected: u32,
        found: u32,
    },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::DuplicateId { id } => write!(f, "duplicate id {id}"),
            Violation::SelfParent { id } => write!(f, "{id} is its own parent"),
            Violation::DanglingParent { id, parent } => {
                write!(f, "{id} points at missing parent {parent}")
            }
            Violation::DepthExceeded {
                id,
                level,
                max_level,
            } => write!(f, "{id} sits at level {level} (max {max_level})"),
            Violation::NotContiguous { id, parent } => {
                write!(f, "{id} is detached from the block of its parent {parent}")
            }
            Violation::LevelMismatch {
                id,
                expected,
                found,
            } => write!(f, "{id} has level {found}, expected {expected}"),
            Violation::OrderGap {
                index,
                expected,
                found,
            } => write!(
                f,
                "display order at index {index} is {found}, expected {expected}"
            ),
        }
    }
}

/// Validate a flat sequence against all structural invariants.
///
/// Walks the sequence once keeping the chain of open ancestors: a row's parent must be on
/// that chain, which covers acyclicity, contiguity and level consistency in one pass.
pub(crate) fn check(items: &[TaskItem], max_level: usize) -> Result<(), Violation> {
    let mut ids: HashSet<&str> = HashSet::with_capacity(items.len());
    for n in items {
        if !ids.insert(n.id.as_str()) {
            return Err(Violation::DuplicateId { id: n.id.clone() });
        }
    }

    let mut open: Vec<&str> = Vec::new();
    for (i, n) in items.iter().enumerate() {
        let expected_order = i as u32 + 1;
        if n.display_order != expected_order {
            return Err(Violation::OrderGap {
                index: i,
                expected: expected_order,
                found: n.display_order,
            });
        }

        if n.level > max_level {
            return Err(Violation::DepthExceeded {
                id: n.id.clone(),
                level: n.level,
                max_level,
            });
        }

        let depth = match n.parent_id.as_deref() {
            None => 0,
            Some(p) if p == n.id => {
                return Err(Violation::SelfParent { id: n.id.clone() });
            }
            Some(p) if !ids.contains(p) => {
                return Err(Violation::DanglingParent {
                    id: n.id.clone(),
                    parent: p.to_string(),
                });
            }
            Some(p) => match open.iter().rposition(|a| *a == p) {
                Some(pos) => pos + 1,
                None => {
                    return Err(Violation::NotContiguous {
                        id: n.id.clone(),
                        parent: p.to_string(),
                    });
                }
            },
        };

        if n.level != depth {
            return Err(Violation::LevelMismatch {
                id: n.id.clone(),
                expected: depth,
                found: n.level,
            });
        }

        open.truncate(depth);
        open.push(n.id.as_str());
    }

    Ok(())
}

/// Panic on an invalid sequence in debug builds; compiled out in release.
#[track_caller]
pub(crate) fn debug_assert_valid(items: &[TaskItem], max_level: usize) {
    if cfg!(debug_assertions) {
        if let Err(v) = check(items, max_level) {
            panic!("outline invariant violated: {v}");
        }
    }
}

pub(crate) fn index_of(items: &[TaskItem], id: &str) -> Option<usize> {
    items.iter().position(|n| n.id == id)
}

/// First index after the descendant block of `idx`.
pub(crate) fn descendant_end(items: &[TaskItem], idx: usize) -> usize {
    let Some(head) = items.get(idx) else {
        return items.len();
    };
    items[idx + 1..]
        .iter()
        .position(|n| n.level <= head.level)
        .map(|off| idx + 1 + off)
        .unwrap_or(items.len())
}

/// A row plus its whole descendant block.
pub(crate) fn group_range(items: &[TaskItem], idx: usize) -> Range<usize> {
    idx..descendant_end(items, idx)
}

/// Rewrite `display_order` as 1..=N by position.
pub(crate) fn renumber(items: &mut [TaskItem]) {
    for (i, n) in items.iter_mut().enumerate() {
        n.display_order = i as u32 + 1;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a valid sequence from `(id, level)` pairs, deriving parents from levels.
    pub(crate) fn seq(rows: &[(&str, usize)]) -> Vec<TaskItem> {
        let mut open: Vec<String> = Vec::new();
        let mut out = Vec::new();
        for (i, (id, level)) in rows.iter().enumerate() {
            open.truncate(*level);
            let mut n = TaskItem::new(id.to_string(), id.to_string());
            n.parent_id = open.last().cloned();
            n.level = *level;
            n.display_order = i as u32 + 1;
            out.push(n);
            open.push(id.to_string());
        }
        out
    }

    #[test]
    fn test_valid_sequence_passes() {
        let s = seq(&[("a", 0), ("b", 1), ("c", 2), ("d", 1), ("e", 0)]);
        assert_eq!(check(&s, 2), Ok(()));
    }

    #[test]
    fn test_depth_bound() {
        let s = seq(&[("a", 0), ("b", 1), ("c", 2)]);
        assert!(matches!(
            check(&s, 1),
            Err(Violation::DepthExceeded { level: 2, .. })
        ));
    }

    #[test]
    fn test_detached_child_is_not_contiguous() {
        let mut s = seq(&[("a", 0), ("b", 0), ("c", 1)]);
        s[2].parent_id = Some("a".to_string());
        assert!(matches!(
            check(&s, 2),
            Err(Violation::NotContiguous { .. })
        ));
    }

    #[test]
    fn test_level_is_checked_against_parent() {
        let mut s = seq(&[("a", 0), ("b", 1)]);
        s[1].level = 2;
        assert!(matches!(
            check(&s, 2),
            Err(Violation::LevelMismatch {
                expected: 1,
                found: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_order_gap_and_duplicates() {
        let mut s = seq(&[("a", 0), ("b", 0)]);
        s[1].display_order = 3;
        assert!(matches!(check(&s, 2), Err(Violation::OrderGap { index: 1, .. })));

        let s = seq(&[("a", 0), ("a", 0)]);
        assert!(matches!(check(&s, 2), Err(Violation::DuplicateId { .. })));
    }

    #[test]
    fn test_cycles_and_dangling_parents() {
        let mut s = seq(&[("a", 0)]);
        s[0].parent_id = Some("a".to_string());
        assert!(matches!(check(&s, 2), Err(Violation::SelfParent { .. })));

        // a <-> b: a's parent only appears later, so it is never an open ancestor.
        let mut s = seq(&[("a", 0), ("b", 1)]);
        s[0].parent_id = Some("b".to_string());
        s[0].level = 1;
        assert!(matches!(check(&s, 2), Err(Violation::NotContiguous { .. })));

        let mut s = seq(&[("a", 0)]);
        s[0].parent_id = Some("ghost".to_string());
        assert!(matches!(check(&s, 2), Err(Violation::DanglingParent { .. })));
    }

    #[test]
    fn test_descendant_block_bounds() {
        let s = seq(&[("a", 0), ("b", 1), ("c", 2), ("d", 1), ("e", 0)]);
        assert_eq!(descendant_end(&s, 0), 4);
        assert_eq!(descendant_end(&s, 1), 3);
        assert_eq!(descendant_end(&s, 2), 3);
        assert_eq!(descendant_end(&s, 4), 5);
        assert_eq!(group_range(&s, 3), 3..4);
    }
}
