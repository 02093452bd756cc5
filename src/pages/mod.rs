use crate::components::ui::{Card, CardBody, CardHeader, CardHint, CardTitle, Notice, NoticeText};
use crate::editor::TaskListEditor;
use crate::models::ListKind;
use crate::storage::{load_json_from_storage, save_json_to_storage, LAST_LIST_KEY};
use leptos::prelude::*;
use leptos_router::params::Params;
use std::str::FromStr;
use strum::IntoEnumIterator;

#[derive(Params, PartialEq, Clone, Debug)]
pub struct ListRouteParams {
    pub kind: Option<String>,
}

pub(crate) fn list_href(kind: ListKind) -> String {
    format!("/lists/{kind}")
}

/// Last opened list, as stored by [`ListPage`].
fn last_list() -> Option<ListKind> {
    let slug = load_json_from_storage::<String>(LAST_LIST_KEY)?;
    ListKind::from_str(&slug).ok()
}

#[component]
pub fn AppLayout(children: Children) -> impl IntoView {
    view! {
        <div class="min-h-screen bg-background text-foreground">
            <header class="border-b">
                <nav class="mx-auto flex max-w-3xl items-center gap-4 px-4 py-3 text-sm">
                    <a class="font-semibold" href="/">"Task lists"</a>
                    {ListKind::iter()
                        .map(|k| view! {
                            <a class="text-muted-foreground hover:text-foreground" href=list_href(k)>
                                {k.title()}
                            </a>
                        })
                        .collect_view()}
                </nav>
            </header>
            <main class="mx-auto max-w-3xl px-4 py-6">{children()}</main>
        </div>
    }
}

#[component]
pub fn HomePage() -> impl IntoView {
    let last = last_list();

    view! {
        <AppLayout>
            <div class="grid gap-3 sm:grid-cols-2">
                {ListKind::iter()
                    .map(|k| {
                        let is_last = last == Some(k);
                        view! {
                            <a href=list_href(k)>
                                <Card class=if is_last { "ring-1 ring-primary/30" } else { "" }>
                                    <CardHeader>
                                        <CardTitle class="text-base">{k.title()}</CardTitle>
                                        <Show when=move || is_last>
                                            <CardHint>"Last opened"</CardHint>
                                        </Show>
                                    </CardHeader>
                                </Card>
                            </a>
                        }
                    })
                    .collect_view()}
            </div>
        </AppLayout>
    }
}

#[component]
pub fn ListPage() -> impl IntoView {
    let params = leptos_router::hooks::use_params::<ListRouteParams>();

    // Params are reactive; read tracked so switching lists re-mounts the editor.
    let kind = Memo::new(move |_| {
        params
            .get()
            .ok()
            .and_then(|p| p.kind)
            .and_then(|k| ListKind::from_str(&k).ok())
    });

    Effect::new(move |_| {
        if let Some(k) = kind.get() {
            save_json_to_storage(LAST_LIST_KEY, &k.to_string());
        }
    });

    view! {
        <AppLayout>
            {move || match kind.get() {
                Some(k) => view! {
                    <Card>
                        <CardHeader>
                            <CardTitle class="text-lg">{k.title()}</CardTitle>
                        </CardHeader>
                        <CardBody>
                            <TaskListEditor kind=k />
                        </CardBody>
                    </Card>
                }
                .into_any(),
                None => view! {
                    <Notice>
                        <NoticeText>"Unknown list."</NoticeText>
                    </Notice>
                }
                .into_any(),
            }}
        </AppLayout>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_href_uses_slug() {
        assert_eq!(list_href(ListKind::Daily), "/lists/daily");
        assert_eq!(list_href(ListKind::Yearly), "/lists/yearly");
    }
}
