use super::codec::normalize;
use super::gesture::{DragOp, ReorderDest};
use super::invariants::{debug_assert_valid, descendant_end, group_range, index_of, renumber};
use crate::models::TaskItem;
use std::collections::{HashMap, HashSet};
use std::ops::Range;

/// Where a new row goes when nothing is being edited.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub(crate) enum AddAnchor {
    Head,
    #[default]
    Tail,
}

/// The editable flat sequence of one task list.
///
/// Rows live in one ordered `Vec`; `parent_id` and `level` are the only structural links.
/// Every structural operation moves a row together with its descendant block and either
/// produces a new valid sequence or leaves the current one untouched.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Outline {
    items: Vec<TaskItem>,
    max_level: usize,
}

impl Outline {
    pub fn new(max_level: usize) -> Self {
        Self {
            items: vec![],
            max_level,
        }
    }

    /// Load rows from storage or a local snapshot. Rows deeper than `max_level` are lifted to
    /// the deepest allowed level under their nearest kept ancestor.
    pub fn from_rows(rows: &[TaskItem], max_level: usize) -> Self {
        Self {
            items: normalize(rows, max_level),
            max_level,
        }
    }

    pub fn items(&self) -> &[TaskItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        index_of(&self.items, id)
    }

    pub fn get(&self, id: &str) -> Option<&TaskItem> {
        self.index_of(id).map(|i| &self.items[i])
    }

    /// Index range of `id` and its descendants.
    pub fn group_range(&self, id: &str) -> Option<Range<usize>> {
        self.index_of(id).map(|i| group_range(&self.items, i))
    }

    pub fn apply(&mut self, op: &DragOp) -> bool {
        match op {
            DragOp::Reorder { id, dest } => self.reorder(id, dest),
            DragOp::Nest { id, target } => self.nest(id, target),
            DragOp::Unnest { id } => self.unnest(id),
            DragOp::None => false,
        }
    }

    /// Whether `op` would change the sequence.
    pub fn accepts(&self, op: &DragOp) -> bool {
        match op {
            DragOp::Reorder { id, dest } => self.plan_reorder(id, dest).is_some(),
            DragOp::Nest { id, target } => self.plan_nest(id, target).is_some(),
            DragOp::Unnest { id } => self.plan_unnest(id).is_some(),
            DragOp::None => false,
        }
    }

    pub fn reorder(&mut self, id: &str, dest: &ReorderDest) -> bool {
        let next = self.plan_reorder(id, dest);
        self.commit(next)
    }

    pub fn nest(&mut self, id: &str, target: &str) -> bool {
        let next = self.plan_nest(id, target);
        self.commit(next)
    }

    pub fn unnest(&mut self, id: &str) -> bool {
        let next = self.plan_unnest(id);
        self.commit(next)
    }

    fn plan_reorder(&self, id: &str, dest: &ReorderDest) -> Option<Vec<TaskItem>> {
        let range = self.group_range(id)?;
        let head_level = self.items[range.start].level;
        let parent = self.items[range.start].parent_id.clone();

        // Destination as an index into the sequence without the moved group.
        let mut slot = match dest {
            ReorderDest::Before(before) => {
                let bi = self.index_of(before)?;
                if range.contains(&bi) {
                    return None;
                }
                if bi >= range.end {
                    bi - range.len()
                } else {
                    bi
                }
            }
            ReorderDest::ToEnd => self.items.len() - range.len(),
        };

        let (mut rest, group) = split_group(&self.items, range);

        // Never land inside a deeper run; that would cut a block away from its parent.
        while slot < rest.len() && rest[slot].level > head_level {
            slot += 1;
        }

        // Reorder keeps the parent, so the slot has to stay inside the parent's block.
        if let Some(p) = parent.as_deref() {
            let pi = index_of(&rest, p)?;
            let pend = descendant_end(&rest, pi);
            if slot <= pi || slot > pend {
                return None;
            }
        }

        rest.splice(slot..slot, group);
        self.changed(rest)
    }

    fn plan_nest(&self, id: &str, target: &str) -> Option<Vec<TaskItem>> {
        let range = self.group_range(id)?;
        let ti = self.index_of(target)?;
        if range.contains(&ti) {
            return None;
        }

        let target_level = self.items[ti].level;
        if target_level >= self.max_level {
            return None;
        }

        let head_level = self.items[range.start].level;
        let group_depth = self.items[range.clone()]
            .iter()
            .map(|n| n.level - head_level)
            .max()
            .unwrap_or(0);
        if target_level + 1 + group_depth > self.max_level {
            return None;
        }

        let (mut rest, mut group) = split_group(&self.items, range);
        rebase_levels(&mut group, target_level + 1);
        group[0].parent_id = Some(target.to_string());

        let ti = index_of(&rest, target)?;
        let slot = descendant_end(&rest, ti);
        rest.splice(slot..slot, group);
        self.changed(rest)
    }

    fn plan_unnest(&self, id: &str) -> Option<Vec<TaskItem>> {
        let range = self.group_range(id)?;
        let former_parent = self.items[range.start].parent_id.clone()?;

        let grandparent = self
            .index_of(&former_parent)
            .and_then(|pi| self.items[pi].parent_id.clone());
        let new_level = self.items[range.start].level.saturating_sub(1);

        let (mut rest, mut group) = split_group(&self.items, range);
        rebase_levels(&mut group, new_level);
        group[0].parent_id = grandparent;

        let slot = index_of(&rest, &former_parent)
            .map(|pi| descendant_end(&rest, pi))
            .unwrap_or(rest.len());
        rest.splice(slot..slot, group);
        self.changed(rest)
    }

    /// Insert a new row.
    ///
    /// With an edited row the new one becomes its next sibling (after its descendant block);
    /// otherwise it becomes a root at the head or tail of the list.
    pub fn add(&mut self, mut item: TaskItem, editing: Option<&str>, anchor: AddAnchor) {
        let at = editing.and_then(|id| self.index_of(id));
        let slot = match at {
            Some(ei) => {
                item.parent_id = self.items[ei].parent_id.clone();
                item.level = self.items[ei].level;
                descendant_end(&self.items, ei)
            }
            None => {
                item.parent_id = None;
                item.level = 0;
                match anchor {
                    AddAnchor::Head => 0,
                    AddAnchor::Tail => self.items.len(),
                }
            }
        };

        let mut next = self.items.clone();
        next.insert(slot, item);
        self.commit(Some(next));
    }

    pub fn rename(&mut self, id: &str, name: &str) -> bool {
        let Some(i) = self.index_of(id) else {
            return false;
        };
        if self.items[i].name == name {
            return false;
        }
        self.items[i].name = name.to_string();
        true
    }

    pub fn set_attributes(&mut self, id: &str, attributes: serde_json::Value) -> bool {
        let Some(i) = self.index_of(id) else {
            return false;
        };
        if self.items[i].attributes == attributes {
            return false;
        }
        self.items[i].attributes = attributes;
        true
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let selected = HashSet::from([id.to_string()]);
        self.bulk_delete(&selected) > 0
    }

    /// Remove exactly the selected rows.
    ///
    /// Unselected descendants stay; each is re-attached to its nearest surviving ancestor.
    /// Returns the number of removed rows.
    pub fn bulk_delete(&mut self, selected: &HashSet<String>) -> usize {
        let removed = self
            .items
            .iter()
            .filter(|n| selected.contains(&n.id))
            .count();
        if removed == 0 {
            return 0;
        }

        let parents: HashMap<&str, Option<&str>> = self
            .items
            .iter()
            .map(|n| (n.id.as_str(), n.parent_id.as_deref()))
            .collect();

        let mut next: Vec<TaskItem> = Vec::with_capacity(self.items.len() - removed);
        for n in self.items.iter().filter(|n| !selected.contains(&n.id)) {
            let mut parent = n.parent_id.as_deref();
            let mut hops = 0;
            while let Some(p) = parent {
                if !selected.contains(p) || hops > parents.len() {
                    break;
                }
                parent = parents.get(p).copied().flatten();
                hops += 1;
            }

            let mut kept = n.clone();
            kept.parent_id = parent.map(str::to_string);
            next.push(kept);
        }

        relevel(&mut next);
        self.commit(Some(next));
        removed
    }

    /// Swap ids (and parent links) after a commit assigned stable identifiers.
    /// Returns the number of rows whose id changed.
    pub fn remap_ids(&mut self, remap: &HashMap<String, String>) -> usize {
        let mut changed = 0;
        for n in self.items.iter_mut() {
            if let Some(new_id) = remap.get(&n.id) {
                if *new_id != n.id {
                    n.id = new_id.clone();
                    changed += 1;
                }
            }
            if let Some(p) = n.parent_id.as_mut() {
                if let Some(new_id) = remap.get(p.as_str()) {
                    *p = new_id.clone();
                }
            }
        }
        changed
    }

    fn changed(&self, mut next: Vec<TaskItem>) -> Option<Vec<TaskItem>> {
        renumber(&mut next);
        if next == self.items {
            None
        } else {
            Some(next)
        }
    }

    fn commit(&mut self, next: Option<Vec<TaskItem>>) -> bool {
        let Some(mut next) = next else {
            return false;
        };
        renumber(&mut next);
        debug_assert_valid(&next, self.max_level);
        self.items = next;
        true
    }
}

fn split_group(items: &[TaskItem], range: Range<usize>) -> (Vec<TaskItem>, Vec<TaskItem>) {
    let mut rest = items.to_vec();
    let group: Vec<TaskItem> = rest.drain(range).collect();
    (rest, group)
}

/// Shift a moved group so its head lands on `head_level`, keeping relative depths.
fn rebase_levels(group: &mut [TaskItem], head_level: usize) {
    let Some(old) = group.first().map(|n| n.level) else {
        return;
    };
    for n in group.iter_mut() {
        n.level = n.level - old + head_level;
    }
}

/// Recompute levels from parent links; parents always precede children.
fn relevel(items: &mut [TaskItem]) {
    let mut levels: HashMap<String, usize> = HashMap::with_capacity(items.len());
    for n in items.iter_mut() {
        let level = n
            .parent_id
            .as_deref()
            .and_then(|p| levels.get(p))
            .map(|l| l + 1)
            .unwrap_or(0);
        n.level = level;
        levels.insert(n.id.clone(), level);
    }
}
