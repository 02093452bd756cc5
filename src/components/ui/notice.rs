use leptos::prelude::*;
use leptos_ui::clx;

mod components {
    use super::*;
    // Inline error banner; lists keep working while it is shown.
    clx! {Notice, div, "w-full rounded-md border border-destructive/30 bg-destructive/5 px-3 py-2"}
    clx! {NoticeText, p, "text-destructive text-xs leading-relaxed"}
}

pub use components::*;
