use super::mutation::Outline;

/// Reorder destination: before an existing row, or after everything.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ReorderDest {
    Before(String),
    ToEnd,
}

/// Structural operation a drag resolves to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum DragOp {
    Reorder { id: String, dest: ReorderDest },
    Nest { id: String, target: String },
    Unnest { id: String },
    /// No valid drop target; dropping now changes nothing.
    None,
}

impl DragOp {
    pub fn is_none(&self) -> bool {
        matches!(self, DragOp::None)
    }

    /// Row the drop hint should be drawn on, and how.
    pub fn hint_for(&self, row_id: &str) -> Option<DropHint> {
        match self {
            DragOp::Reorder {
                dest: ReorderDest::Before(b),
                ..
            } if b == row_id => Some(DropHint::InsertAbove),
            DragOp::Nest { target, .. } if target == row_id => Some(DropHint::NestInto),
            DragOp::Unnest { id } if id == row_id => Some(DropHint::Outdent),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DropHint {
    InsertAbove,
    NestInto,
    Outdent,
}

/// Geometry thresholds; fractions are relative to the hovered row / name cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct GestureConfig {
    /// Distance from the list's left edge that counts as "unnest".
    pub unnest_margin_px: f64,
    pub nest_band_top: f64,
    pub nest_band_bottom: f64,
    /// Left part of the name cell kept for reordering.
    pub nest_name_cutoff: f64,
    /// Split point when dragging upward (dragged row below the hovered one).
    pub upward_threshold: f64,
    pub downward_threshold: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            unnest_margin_px: 24.0,
            nest_band_top: 0.3,
            nest_band_bottom: 0.7,
            nest_name_cutoff: 0.6,
            upward_threshold: 0.7,
            downward_threshold: 0.3,
        }
    }
}

/// The row under the pointer, with the pointer position inside it.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RowHover {
    pub target_id: String,
    pub y_in_row: f64,
    pub row_height: f64,
    pub x_in_name: f64,
    pub name_width: f64,
}

/// One pointer sample taken during a drag.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct DragSample {
    pub dragged_id: String,
    /// Horizontal offset from the list's left edge; negative means outside the list.
    pub pointer_x: f64,
    pub hover: Option<RowHover>,
}

fn fraction(v: f64, extent: f64) -> f64 {
    if extent > 0.0 && v.is_finite() {
        (v / extent).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Map a drag sample to an operation. Pure; never mutates the outline.
///
/// Priority: unnest zone, then the nest band, then reorder. Anything the engine would
/// reject or that resolves to the current position comes back as `DragOp::None`.
pub(crate) fn classify(outline: &Outline, sample: &DragSample, cfg: &GestureConfig) -> DragOp {
    let Some(di) = outline.index_of(&sample.dragged_id) else {
        return DragOp::None;
    };
    if !(sample.pointer_x >= 0.0) {
        return DragOp::None;
    }

    let items = outline.items();
    let dragged = &items[di];

    if sample.pointer_x <= cfg.unnest_margin_px && dragged.level > 0 {
        return DragOp::Unnest {
            id: dragged.id.clone(),
        };
    }

    let Some(hover) = sample.hover.as_ref() else {
        return DragOp::None;
    };
    let Some(ti) = outline.index_of(&hover.target_id) else {
        return DragOp::None;
    };
    if ti == di {
        return DragOp::None;
    }

    let rel_y = fraction(hover.y_in_row, hover.row_height);
    let rel_x = fraction(hover.x_in_name, hover.name_width);

    let in_band = rel_y >= cfg.nest_band_top && rel_y <= cfg.nest_band_bottom;
    if in_band && rel_x > cfg.nest_name_cutoff {
        let op = DragOp::Nest {
            id: dragged.id.clone(),
            target: hover.target_id.clone(),
        };
        if outline.accepts(&op) {
            return op;
        }
    }

    let threshold = if di > ti {
        cfg.upward_threshold
    } else {
        cfg.downward_threshold
    };

    let dest = if rel_y < threshold {
        ReorderDest::Before(hover.target_id.clone())
    } else {
        match items.get(ti + 1) {
            Some(next) => ReorderDest::Before(next.id.clone()),
            None => ReorderDest::ToEnd,
        }
    };

    let op = DragOp::Reorder {
        id: dragged.id.clone(),
        dest,
    };
    if outline.accepts(&op) {
        op
    } else {
        DragOp::None
    }
}
