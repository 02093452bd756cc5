use crate::components::ui::{Button, ButtonSize, ButtonVariant, Notice, NoticeText, Spinner};
use crate::models::{ListKind, TaskItem};
use crate::outline::{
    classify, AddAnchor, DragOp, DragSample, DropHint, GestureConfig, Outline, ReorderDest,
    RowHover,
};
use crate::state::list_sync::SyncStatus;
use crate::state::{AppContext, ListSyncController};
use crate::util::new_tmp_id;
use leptos::html;
use leptos::prelude::*;
use std::collections::{HashMap, HashSet};
use wasm_bindgen::JsCast;

/// Left gutter of the list, in px. Dropping inside it outdents.
const GUTTER_PX: f64 = 28.0;
const INDENT_PX: usize = 24;

pub(crate) fn is_done(item: &TaskItem) -> bool {
    item.attributes
        .get("done")
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

/// Same attributes with `done` flipped. Non-object payloads are replaced.
pub(crate) fn toggled_done(item: &TaskItem) -> serde_json::Value {
    let mut attrs = if item.attributes.is_object() {
        item.attributes.clone()
    } else {
        serde_json::json!({})
    };
    attrs["done"] = serde_json::Value::Bool(!is_done(item));
    attrs
}

/// A reorder to the end draws its line under the last row.
fn hints_tail(op: &DragOp) -> bool {
    matches!(
        op,
        DragOp::Reorder {
            dest: ReorderDest::ToEnd,
            ..
        }
    )
}

fn hint_class(hint: Option<DropHint>) -> &'static str {
    match hint {
        Some(DropHint::InsertAbove) => "border-t-2 border-t-primary",
        Some(DropHint::NestInto) => "bg-primary/10 ring-1 ring-primary/30",
        Some(DropHint::Outdent) => "border-l-2 border-l-primary",
        None => "border-t-2 border-t-transparent",
    }
}

/// Read one pointer sample from a drag event over the list container.
fn sample_from_event(
    ev: &web_sys::DragEvent,
    list: &web_sys::Element,
    dragged_id: String,
) -> DragSample {
    let x = ev.client_x() as f64;
    let y = ev.client_y() as f64;

    let list_rect = list.get_bounding_client_rect();
    let pointer_x = if x < list_rect.left() || x > list_rect.right() {
        -1.0
    } else {
        x - list_rect.left()
    };

    let hover = ev
        .target()
        .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
        .and_then(|el| el.closest("[data-row-id]").ok().flatten())
        .and_then(|row| {
            let target_id = row.get_attribute("data-row-id")?;
            let rect = row.get_bounding_client_rect();
            let (x_in_name, name_width) = row
                .query_selector("[data-name-cell]")
                .ok()
                .flatten()
                .map(|cell| {
                    let r = cell.get_bounding_client_rect();
                    (x - r.left(), r.width())
                })
                .unwrap_or((0.0, 0.0));

            Some(RowHover {
                target_id,
                y_in_row: y - rect.top(),
                row_height: rect.height(),
                x_in_name,
                name_width,
            })
        });

    DragSample {
        dragged_id,
        pointer_x,
        hover,
    }
}

#[derive(Clone)]
struct EditorCtx {
    kind: ListKind,
    outline: RwSignal<Outline>,
    sync: ListSyncController,
    gesture: GestureConfig,

    editing_id: RwSignal<Option<String>>,
    editing_value: RwSignal<String>,
    editing_ref: NodeRef<html::Input>,

    selected: RwSignal<HashSet<String>>,

    dragged_id: RwSignal<Option<String>>,
    preview: RwSignal<DragOp>,
}

impl EditorCtx {
    fn ready(&self) -> bool {
        self.sync.ready().get_untracked()
    }

    /// Run a mutation; schedule a commit only if it changed something.
    fn mutate(&self, f: impl FnOnce(&mut Outline) -> bool) -> bool {
        if !self.ready() {
            return false;
        }
        let changed = self.outline.try_update(f).unwrap_or(false);
        if changed {
            self.sync.on_mutation();
        }
        changed
    }

    fn start_edit(&self, id: String, name: String) {
        self.editing_value.set(name);
        self.editing_id.set(Some(id));
    }

    fn commit_edit(&self) {
        let Some(id) = self.editing_id.get_untracked() else {
            return;
        };
        let value = self.editing_value.get_untracked();
        self.mutate(|o| o.rename(&id, &value));
        self.editing_id.set(None);
    }

    fn cancel_edit(&self) {
        self.editing_id.set(None);
    }

    /// New row after the edited one, or at `anchor` when nothing is being edited.
    fn add_row(&self, anchor: AddAnchor) {
        if !self.ready() {
            return;
        }
        let editing = self.editing_id.get_untracked();
        self.commit_edit();

        let id = new_tmp_id();
        let item = TaskItem::new(id.clone(), String::new())
            .with_attributes(self.kind.default_attributes());

        self.mutate(|o| {
            o.add(item, editing.as_deref(), anchor);
            true
        });
        self.start_edit(id, String::new());
    }

    fn toggle_done(&self, id: &str) {
        self.mutate(|o| {
            let Some(attrs) = o.get(id).map(toggled_done) else {
                return false;
            };
            o.set_attributes(id, attrs)
        });
    }

    fn delete_row(&self, id: &str) {
        if self.mutate(|o| o.remove(id)) {
            self.selected.update(|s| {
                s.remove(id);
            });
            if self.editing_id.get_untracked().as_deref() == Some(id) {
                self.editing_id.set(None);
            }
        }
    }

    fn delete_selected(&self) {
        let selected = self.selected.get_untracked();
        if selected.is_empty() {
            return;
        }
        if self.mutate(|o| o.bulk_delete(&selected) > 0) {
            if let Some(e) = self.editing_id.get_untracked() {
                if selected.contains(&e) {
                    self.editing_id.set(None);
                }
            }
        }
        self.selected.set(HashSet::new());
    }

    fn toggle_selected(&self, id: &str) {
        self.selected.update(|s| {
            if !s.remove(id) {
                s.insert(id.to_string());
            }
        });
    }

    /// Follow ids assigned by a commit.
    fn apply_remap(&self, remap: &HashMap<String, String>) {
        self.editing_id.update(|e| {
            if let Some(new_id) = e.as_ref().and_then(|cur| remap.get(cur)) {
                *e = Some(new_id.clone());
            }
        });
        self.selected.update(|s| {
            let renamed: Vec<(String, String)> = s
                .iter()
                .filter_map(|id| remap.get(id).map(|n| (id.clone(), n.clone())))
                .collect();
            for (old, new) in renamed {
                s.remove(&old);
                s.insert(new);
            }
        });
    }

    fn update_preview(&self, op: DragOp) {
        if self.preview.with_untracked(|p| *p != op) {
            self.preview.set(op);
        }
    }

    fn clear_drag(&self) {
        self.dragged_id.set(None);
        self.update_preview(DragOp::None);
    }
}

#[component]
pub fn TaskListEditor(kind: ListKind) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let (max_level, gesture) = app_state
        .0
        .editor_config
        .with_value(|c| (c.max_level, c.gesture));

    let outline: RwSignal<Outline> = RwSignal::new(Outline::new(max_level));
    let editing_id: RwSignal<Option<String>> = RwSignal::new(None);
    let selected: RwSignal<HashSet<String>> = RwSignal::new(HashSet::new());
    let remap_cb: StoredValue<Option<EditorCtx>> = StoredValue::new(None);

    let on_remap = Callback::new(move |remap: HashMap<String, String>| {
        if let Some(ctx) = remap_cb.get_value() {
            ctx.apply_remap(&remap);
        }
    });

    let sync = ListSyncController::new(app_state, kind.owner_id(), outline, Some(on_remap));

    let ctx = EditorCtx {
        kind,
        outline,
        sync: sync.clone(),
        gesture,
        editing_id,
        editing_value: RwSignal::new(String::new()),
        editing_ref: NodeRef::new(),
        selected,
        dragged_id: RwSignal::new(None),
        preview: RwSignal::new(DragOp::None),
    };
    remap_cb.set_value(Some(ctx.clone()));

    sync.load();
    {
        let sync = sync.clone();
        on_cleanup(move || sync.stop());
    }

    // Focus the inline editor when editing_id changes.
    let editing_ref = ctx.editing_ref;
    Effect::new(move |_| {
        if editing_id.get().is_none() {
            return;
        }
        let Some(el) = editing_ref.get() else {
            return;
        };
        let Some(win) = web_sys::window() else {
            return;
        };
        // Focus on next tick so the node is mounted.
        let _ = win.set_timeout_with_callback_and_timeout_and_arguments_0(
            wasm_bindgen::closure::Closure::once_into_js(move || {
                let _ = el.focus();
            })
            .as_ref()
            .unchecked_ref(),
            0,
        );
    });

    let list_ref: NodeRef<html::Div> = NodeRef::new();
    let row_count = Memo::new(move |_| outline.with(|o| o.len()));
    let selected_count = Memo::new(move |_| selected.with(|s| s.len()));
    let notice = sync.notice();
    let status = sync.status();
    let loading = sync.loading();
    let ready = sync.ready();

    let ctx_sv = StoredValue::new(ctx);

    view! {
        <div class="space-y-3">
            <div class="flex flex-wrap items-center gap-2">
                <Button
                    size=ButtonSize::Sm
                    attr:disabled=move || !ready.get()
                    attr:title="Adds after the task being edited"
                    // Keep focus (and the edited row) while clicking.
                    on:mousedown=move |ev: web_sys::MouseEvent| ev.prevent_default()
                    on:click=move |_ev: web_sys::MouseEvent| {
                        ctx_sv.get_value().add_row(AddAnchor::Tail);
                    }
                >
                    "Add task"
                </Button>
                <Button
                    variant=ButtonVariant::Outline
                    size=ButtonSize::Sm
                    attr:disabled=move || !ready.get()
                    on:click=move |_ev: web_sys::MouseEvent| {
                        ctx_sv.get_value().add_row(AddAnchor::Head);
                    }
                >
                    "Add at top"
                </Button>
                <Button
                    variant=ButtonVariant::Destructive
                    size=ButtonSize::Sm
                    attr:disabled=move || selected_count.get() == 0
                    on:click=move |_ev: web_sys::MouseEvent| {
                        ctx_sv.get_value().delete_selected();
                    }
                >
                    {move || format!("Delete selected ({})", selected_count.get())}
                </Button>

                <span class="ml-auto inline-flex items-center gap-2 text-xs text-muted-foreground">
                    <Show when=move || loading.get() || status.get() == SyncStatus::Saving>
                        <Spinner />
                    </Show>
                    {move || status.get().label()}
                </span>
            </div>

            <Show when=move || notice.get().is_some()>
                <Notice>
                    <NoticeText>{move || notice.get().unwrap_or_default()}</NoticeText>
                </Notice>
            </Show>

            <div
                node_ref=list_ref
                class="task-list rounded-md"
                style=format!("padding-left: {GUTTER_PX}px")
                on:dragover=move |ev: web_sys::DragEvent| {
                    let ctx = ctx_sv.get_value();
                    let Some(dragged) = ctx.dragged_id.get_untracked() else {
                        return;
                    };
                    ev.prevent_default();
                    if let Some(dt) = ev.data_transfer() {
                        dt.set_drop_effect("move");
                    }
                    let Some(list) = list_ref.get_untracked() else {
                        return;
                    };
                    let sample = sample_from_event(&ev, &list, dragged);
                    let op = ctx.outline.with_untracked(|o| classify(o, &sample, &ctx.gesture));
                    ctx.update_preview(op);
                }
                on:dragleave=move |ev: web_sys::DragEvent| {
                    // Only when the pointer leaves the list itself, not a child row.
                    let inside = ev
                        .related_target()
                        .and_then(|t| t.dyn_into::<web_sys::Node>().ok())
                        .zip(list_ref.get_untracked())
                        .map(|(node, list)| list.contains(Some(&node)))
                        .unwrap_or(false);
                    if !inside {
                        ctx_sv.get_value().update_preview(DragOp::None);
                    }
                }
                on:drop=move |ev: web_sys::DragEvent| {
                    ev.prevent_default();
                    let ctx = ctx_sv.get_value();
                    let Some(dragged) = ctx.dragged_id.get_untracked() else {
                        return;
                    };
                    let op = match list_ref.get_untracked() {
                        Some(list) => {
                            let sample = sample_from_event(&ev, &list, dragged);
                            ctx.outline.with_untracked(|o| classify(o, &sample, &ctx.gesture))
                        }
                        None => ctx.preview.get_untracked(),
                    };
                    if !op.is_none() {
                        ctx.mutate(|o| o.apply(&op));
                    }
                    ctx.clear_drag();
                }
            >
                <Show
                    when=move || !outline.with(|o| o.is_empty())
                    fallback=move || view! {
                        <div class="py-2 text-xs text-muted-foreground">
                            {move || if loading.get() { "Loading…" } else { "No tasks yet" }}
                        </div>
                    }
                >
                    <div class="space-y-0.5">
                        <For
                            each=move || 0..row_count.get()
                            key=|i| *i
                            children=move |i| view! { <TaskRow index=i ctx=ctx_sv /> }
                        />
                    </div>
                </Show>
                <div class=move || {
                    if ctx_sv.get_value().preview.with(hints_tail) {
                        "h-1 rounded bg-primary"
                    } else {
                        "h-1"
                    }
                } />
            </div>
        </div>
    }
}

/// One row. Keyed by position, so a commit that swaps a temporary id for a stored one keeps
/// the DOM node (and the focused input) in place.
#[component]
fn TaskRow(index: usize, ctx: StoredValue<EditorCtx>) -> impl IntoView {
    let c = ctx.get_value();
    let outline = c.outline;
    let editing_id = c.editing_id;
    let editing_value = c.editing_value;
    let editing_ref = c.editing_ref;
    let selected = c.selected;
    let dragged_id = c.dragged_id;
    let preview = c.preview;

    let row = Memo::new(move |_| outline.with(|o| o.items().get(index).cloned()));
    let row_id = move || row.with(|r| r.as_ref().map(|r| r.id.clone()).unwrap_or_default());
    let is_editing = Memo::new(move |_| {
        let id = row_id();
        editing_id.with(|e| e.as_deref() == Some(id.as_str()))
    });

    let row_class = move || {
        let id = row_id();
        let hint = preview.with(|p| p.hint_for(&id));
        let dragging = dragged_id.with(|d| d.as_deref() == Some(id.as_str()));
        format!(
            "task-row flex items-center gap-2 py-1 rounded-md {} {}",
            hint_class(hint),
            if dragging { "opacity-50" } else { "" }
        )
    };

    let indent = move || {
        let level = row.with(|r| r.as_ref().map(|r| r.level).unwrap_or(0));
        format!("padding-left: {}px", level * INDENT_PX)
    };

    view! {
        <div
            data-row-id=row_id
            class=row_class
            style=indent
            draggable=move || if is_editing.get() { "false" } else { "true" }
            on:dragstart=move |ev: web_sys::DragEvent| {
                let ctx = ctx.get_value();
                ctx.commit_edit();
                let id = row_id();
                if let Some(dt) = ev.data_transfer() {
                    let _ = dt.set_data("text/plain", &id);
                    dt.set_effect_allowed("move");
                }
                ctx.dragged_id.set(Some(id));
            }
            on:dragend=move |_ev: web_sys::DragEvent| {
                ctx.get_value().clear_drag();
            }
        >
            <input
                type="checkbox"
                class="size-3.5"
                title="Select"
                prop:checked=move || {
                    let id = row_id();
                    selected.with(|s| s.contains(&id))
                }
                on:change=move |_ev| {
                    ctx.get_value().toggle_selected(&row_id());
                }
            />
            <span class="cursor-grab select-none text-muted-foreground" title="Drag to move">
                "⋮⋮"
            </span>
            <input
                type="checkbox"
                class="size-4"
                title="Done"
                prop:checked=move || row.with(|r| r.as_ref().map(is_done).unwrap_or(false))
                on:change=move |_ev| {
                    ctx.get_value().toggle_done(&row_id());
                }
            />

            <div data-name-cell="" class="min-w-0 flex-1 text-sm">
                <Show
                    when=move || is_editing.get()
                    fallback=move || {
                        let name = move || {
                            row.with(|r| {
                                r.as_ref()
                                    .map(|r| r.name.clone())
                                    .filter(|n| !n.trim().is_empty())
                                    .unwrap_or_else(|| "\u{00A0}".to_string())
                            })
                        };
                        let done = move || row.with(|r| r.as_ref().map(is_done).unwrap_or(false));
                        view! {
                            <div
                                class=move || {
                                    if done() {
                                        "cursor-text whitespace-pre-wrap min-h-[20px] line-through text-muted-foreground"
                                    } else {
                                        "cursor-text whitespace-pre-wrap min-h-[20px]"
                                    }
                                }
                                on:mousedown=move |_ev: web_sys::MouseEvent| {
                                    let ctx = ctx.get_value();
                                    if !ctx.ready() {
                                        return;
                                    }
                                    // Save the current buffer explicitly; blur is unreliable
                                    // when the input unmounts.
                                    ctx.commit_edit();
                                    let name = row
                                        .get_untracked()
                                        .map(|r| r.name)
                                        .unwrap_or_default();
                                    ctx.start_edit(row_id(), name);
                                }
                            >
                                {name}
                            </div>
                        }
                    }
                >
                    <input
                        node_ref=editing_ref
                        class="w-full bg-transparent outline-none"
                        placeholder="Task name"
                        prop:value=move || editing_value.get()
                        on:input=move |ev: web_sys::Event| {
                            if let Some(input) = ev
                                .target()
                                .and_then(|t| t.dyn_into::<web_sys::HtmlInputElement>().ok())
                            {
                                editing_value.set(input.value());
                            }
                        }
                        on:blur=move |_ev| {
                            let ctx = ctx.get_value();
                            if is_editing.get_untracked() {
                                ctx.commit_edit();
                            }
                        }
                        on:keydown=move |ev: web_sys::KeyboardEvent| {
                            let ctx = ctx.get_value();
                            match ev.key().as_str() {
                                "Enter" => {
                                    ev.prevent_default();
                                    ctx.add_row(AddAnchor::Tail);
                                }
                                "Escape" => {
                                    ev.prevent_default();
                                    ctx.cancel_edit();
                                }
                                _ => {}
                            }
                        }
                    />
                </Show>
            </div>

            <Button
                variant=ButtonVariant::Ghost
                size=ButtonSize::Icon
                class="h-7 w-7 text-destructive"
                attr:title="Delete"
                on:click=move |ev: web_sys::MouseEvent| {
                    ev.stop_propagation();
                    ctx.get_value().delete_row(&row_id());
                }
            >
                "×"
            </Button>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_done_flag() {
        let plain = TaskItem::new("a".to_string(), "A".to_string());
        assert!(!is_done(&plain));

        let attrs = toggled_done(&plain);
        assert_eq!(attrs, serde_json::json!({ "done": true }));

        let done = plain.with_attributes(serde_json::json!({ "time-range": "9-10", "done": true }));
        assert!(is_done(&done));
        let attrs = toggled_done(&done);
        assert_eq!(attrs["done"], false);
        assert_eq!(attrs["time-range"], "9-10");
    }

    #[test]
    fn test_hint_classes() {
        assert!(hint_class(Some(DropHint::InsertAbove)).contains("border-t-primary"));
        assert!(hint_class(Some(DropHint::NestInto)).contains("ring"));
        assert!(hint_class(None).contains("transparent"));

        let tail = DragOp::Reorder {
            id: "a".to_string(),
            dest: ReorderDest::ToEnd,
        };
        assert!(hints_tail(&tail));
        assert!(!hints_tail(&DragOp::None));
    }
}
