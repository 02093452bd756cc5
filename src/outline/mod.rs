//! Hierarchical list editing on a flat, pre-order sequence of rows.

pub(crate) mod codec;
pub(crate) mod gesture;
pub(crate) mod invariants;
pub(crate) mod mutation;

pub(crate) use gesture::{
    classify, DragOp, DragSample, DropHint, GestureConfig, ReorderDest, RowHover,
};
pub(crate) use mutation::{AddAnchor, Outline};

/// Three tiers: root / child / grandchild.
pub(crate) const DEFAULT_MAX_LEVEL: usize = 2;
