use crate::api::{ApiError, ApiErrorKind};
use crate::cache::{clear_list_snapshot, load_list_snapshot, prefer_unsynced, save_list_snapshot};
use crate::outline::Outline;
use crate::persist::{self, CommitScheduler, CommitSnapshot, CommitStep};
use crate::state::AppContext;
use crate::util::now_ms;
use leptos::ev;
use leptos::logging::{log, warn};
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_dom::helpers::{window_event_listener, WindowListenerHandle};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use wasm_bindgen::JsCast;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SyncStatus {
    Saved,
    /// Local edits waiting for the quiet period.
    Pending,
    Saving,
    Failed,
}

impl SyncStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SyncStatus::Saved => "Saved",
            SyncStatus::Pending => "Unsaved changes",
            SyncStatus::Saving => "Saving…",
            SyncStatus::Failed => "Not saved",
        }
    }
}

/// Text shown to the user when a commit fails. Local edits are never discarded.
pub(crate) fn commit_notice(e: &ApiError) -> String {
    match e.kind {
        ApiErrorKind::Network => "You're offline. Changes are kept and will be saved when the connection returns.".to_string(),
        ApiErrorKind::Unauthorized => "Your session expired. Changes are kept on this device.".to_string(),
        ApiErrorKind::Rejected => format!("The server rejected this list: {e}"),
        _ => format!("Couldn't save changes, retrying: {e}"),
    }
}

/// Per-list commit loop: local snapshot on every mutation, one debounced bulk replace at a
/// time, id reconciliation on success, retry on failure.
///
/// Lives as long as the list editor that created it; call [`ListSyncController::stop`] on
/// cleanup.
#[derive(Clone)]
pub(crate) struct ListSyncController {
    app_state: AppContext,
    owner_id: String,
    outline: RwSignal<Outline>,

    notice: RwSignal<Option<String>>,
    status: RwSignal<SyncStatus>,
    loading: RwSignal<bool>,

    /// False until the list was loaded (or recovered from a snapshot). Commits replace the
    /// whole collection, so nothing may be sent before that.
    ready: RwSignal<bool>,

    scheduler: Arc<Mutex<CommitScheduler>>,
    timer_id: Arc<Mutex<Option<i32>>>,

    /// Lets the editor follow renamed ids (editing row, selection).
    on_remap: Option<Callback<HashMap<String, String>>>,

    _online_handle: StoredValue<Option<WindowListenerHandle>>,
    _pagehide_handle: StoredValue<Option<WindowListenerHandle>>,
}

impl ListSyncController {
    pub fn new(
        app_state: AppContext,
        owner_id: String,
        outline: RwSignal<Outline>,
        on_remap: Option<Callback<HashMap<String, String>>>,
    ) -> Self {
        let (debounce_ms, retry_ms) = app_state
            .0
            .editor_config
            .with_value(|c| (c.debounce_ms, c.retry_ms));

        let s = Self {
            app_state,
            owner_id,
            outline,
            notice: RwSignal::new(None),
            status: RwSignal::new(SyncStatus::Saved),
            loading: RwSignal::new(false),
            ready: RwSignal::new(false),
            scheduler: Arc::new(Mutex::new(CommitScheduler::new(debounce_ms, retry_ms))),
            timer_id: Arc::new(Mutex::new(None)),
            on_remap,
            _online_handle: StoredValue::new(None),
            _pagehide_handle: StoredValue::new(None),
        };

        s.start_global_listeners();
        s
    }

    pub fn notice(&self) -> RwSignal<Option<String>> {
        self.notice
    }

    pub fn status(&self) -> RwSignal<SyncStatus> {
        self.status
    }

    pub fn loading(&self) -> RwSignal<bool> {
        self.loading
    }

    pub fn ready(&self) -> RwSignal<bool> {
        self.ready
    }

    fn max_level(&self) -> usize {
        self.app_state.0.editor_config.with_value(|c| c.max_level)
    }

    /// Fetch the list. An unsynced local snapshot wins over the fetched rows and is
    /// scheduled for commit.
    pub fn load(&self) {
        self.loading.set(true);
        let backend = self.app_state.0.backend();
        let s2 = self.clone();

        spawn_local(async move {
            let snapshot = load_list_snapshot(&s2.owner_id);
            let (rows, dirty, ok) = match persist::load(&backend, &s2.owner_id).await {
                Ok(rows) => {
                    let (rows, dirty) = prefer_unsynced(snapshot, rows);
                    (rows, dirty, true)
                }
                Err(e) => {
                    warn!("load {} failed: {e}", s2.owner_id);
                    let _ = s2.notice.try_set(Some(format!("Couldn't load this list: {e}")));
                    let recovered = snapshot.is_some();
                    let (rows, dirty) = prefer_unsynced(snapshot, vec![]);
                    (rows, dirty, recovered)
                }
            };

            let max_level = s2.max_level();
            let _ = s2.outline.try_set(Outline::from_rows(&rows, max_level));
            let _ = s2.loading.try_set(false);
            let _ = s2.ready.try_set(ok);

            if ok {
                if dirty {
                    log!("recovered unsynced snapshot for {}", s2.owner_id);
                    s2.on_mutation();
                } else {
                    let _ = s2.notice.try_set(None);
                }
            }
        });
    }

    /// Called by the editor after every mutation that changed the outline.
    pub fn on_mutation(&self) {
        if !self.ready.get_untracked() {
            return;
        }

        let now = now_ms();
        let owner_id = self.owner_id.clone();
        let _ = self
            .outline
            .try_with_untracked(|o| save_list_snapshot(&owner_id, o.items(), now));

        let (step, in_flight) = self
            .scheduler
            .lock()
            .map(|mut s| (s.touch(now), s.is_in_flight()))
            .unwrap_or((CommitStep::Idle, false));
        if !in_flight {
            self.status.set(SyncStatus::Pending);
        }
        self.arm(step);
    }

    /// Skip the quiet period.
    pub fn flush_now(&self) {
        let step = self
            .scheduler
            .lock()
            .map(|mut s| s.flush_now(now_ms()))
            .unwrap_or(CommitStep::Idle);
        self.arm(step);
    }

    pub fn stop(&self) {
        self.clear_timer();
        let _ = self._online_handle.try_update_value(|h| {
            if let Some(h) = h.take() {
                h.remove();
            }
        });
        let _ = self._pagehide_handle.try_update_value(|h| {
            if let Some(h) = h.take() {
                h.remove();
            }
        });
    }

    fn clear_timer(&self) {
        let Ok(mut slot) = self.timer_id.lock() else {
            return;
        };
        if let (Some(tid), Some(win)) = (slot.take(), web_sys::window()) {
            win.clear_timeout_with_handle(tid);
        }
    }

    fn arm(&self, step: CommitStep) {
        match step {
            CommitStep::Idle => {}
            CommitStep::Send => {
                self.clear_timer();
                self.send();
            }
            CommitStep::WaitUntil(deadline) => {
                self.clear_timer();
                let Some(win) = web_sys::window() else {
                    return;
                };

                let s2 = self.clone();
                let cb = wasm_bindgen::closure::Closure::once_into_js(move || {
                    s2.fire();
                });

                let delay = (deadline - now_ms()).clamp(0, i32::MAX as i64) as i32;
                let tid = win
                    .set_timeout_with_callback_and_timeout_and_arguments_0(
                        cb.as_ref().unchecked_ref(),
                        delay,
                    )
                    .unwrap_or(0);

                if let Ok(mut slot) = self.timer_id.lock() {
                    *slot = Some(tid);
                }
            }
        }
    }

    fn fire(&self) {
        if let Ok(mut slot) = self.timer_id.lock() {
            *slot = None;
        }
        let step = self
            .scheduler
            .lock()
            .map(|mut s| s.poll(now_ms()))
            .unwrap_or(CommitStep::Idle);
        self.arm(step);
    }

    /// Freeze the current outline and send it. The scheduler already marked it in flight.
    fn send(&self) {
        let Some(snapshot) = self
            .outline
            .try_with_untracked(|o| CommitSnapshot::capture(o.items()))
        else {
            return;
        };

        let _ = self.status.try_set(SyncStatus::Saving);
        let backend = self.app_state.0.backend();
        let s2 = self.clone();

        spawn_local(async move {
            let result = persist::commit(&backend, &s2.owner_id, &snapshot).await;
            let now = now_ms();

            let step = match result {
                Ok(remap) => {
                    let _ = s2.outline.try_update(|o| {
                        o.remap_ids(&remap);
                    });
                    if let (Some(cb), false) = (s2.on_remap, remap.is_empty()) {
                        cb.run(remap.clone());
                    }

                    let (step, dirty) = s2
                        .scheduler
                        .lock()
                        .map(|mut s| (s.finish(true, now), s.is_dirty()))
                        .unwrap_or((CommitStep::Idle, false));

                    if dirty {
                        // Keep the snapshot, now with stable ids.
                        let owner_id = s2.owner_id.clone();
                        let _ = s2
                            .outline
                            .try_with_untracked(|o| save_list_snapshot(&owner_id, o.items(), now));
                        let _ = s2.status.try_set(SyncStatus::Pending);
                    } else {
                        clear_list_snapshot(&s2.owner_id);
                        let _ = s2.status.try_set(SyncStatus::Saved);
                    }

                    log!(
                        "committed {} rows for {} ({} new ids)",
                        snapshot.sent_ids.len(),
                        s2.owner_id,
                        remap.len()
                    );
                    let _ = s2.notice.try_set(None);
                    step
                }
                Err(e) => {
                    warn!("commit {} failed: {e}", s2.owner_id);
                    let _ = s2.notice.try_set(Some(commit_notice(&e)));
                    let _ = s2.status.try_set(SyncStatus::Failed);

                    let step = s2
                        .scheduler
                        .lock()
                        .map(|mut s| s.finish(false, now))
                        .unwrap_or(CommitStep::Idle);

                    // Only transient failures retry on their own; the rest wait for the next
                    // edit or the `online` event.
                    if e.is_transient() {
                        step
                    } else {
                        CommitStep::Idle
                    }
                }
            };

            s2.arm(step);
        });
    }

    fn start_global_listeners(&self) {
        // online -> retry right away
        let s2 = self.clone();
        let online = window_event_listener(ev::online, move |_ev: web_sys::Event| {
            s2.flush_now();
        });
        self._online_handle.set_value(Some(online));

        // pagehide -> best-effort flush; the snapshot already holds the edits
        let s3 = self.clone();
        let pagehide =
            window_event_listener(ev::pagehide, move |_ev: web_sys::PageTransitionEvent| {
                s3.flush_now();
            });
        self._pagehide_handle.set_value(Some(pagehide));
    }
}
