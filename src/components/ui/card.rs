use leptos::prelude::*;
use leptos_ui::clx;

mod components {
    use super::*;
    clx! {Card, div, "bg-card text-card-foreground flex flex-col gap-3 rounded-lg border py-4"}
    clx! {CardHeader, div, "flex items-baseline justify-between gap-2 px-4"}
    clx! {CardTitle, h2, "font-semibold tracking-tight"}
    clx! {CardHint, span, "text-muted-foreground text-xs"}
    clx! {CardBody, div, "px-4"}
}

pub use components::*;
