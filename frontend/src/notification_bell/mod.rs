// frontend/src/notification_bell/mod.rs
//
// Admin notification bell: badge, dropdown list, sound on new unread items,
// read-state bookkeeping and click dispatch into the rest of the admin panel.

pub mod anchors;
pub mod config;
pub mod dialog;
pub mod dispatch;
pub mod error;
pub mod feed;
pub mod render;
pub mod sound;
pub mod widget;

pub use config::BellConfig;
pub use dispatch::{AdminHooks, ReviewReply};
pub use widget::{NotificationWidget, WidgetDeps};

use anchors::{DocumentAnchors, WidgetAnchors};
use dialog::{DialogPresenter, InfoDialog, InfoDialogModal, SignalDialogs};
use dioxus::prelude::*;
use dioxus_signals::{ReadableExt, Signal, WritableExt};
use feed::{FirebaseFeed, NotificationFeed};
use render::{BellView, ListView, NotificationRow};
use sound::EvalSound;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{error, warn};
use widget::ListenerId;

// Autoplay is blocked until the user has done something on the page.
static HAS_INTERACTED: GlobalSignal<bool> = Signal::global(|| false);

// Bumped by clicks that reach the page root; the bell and its popup stop
// propagation, so every bump is an outside click.
static PAGE_CLICKS: GlobalSignal<u64> = Signal::global(|| 0);

pub fn note_interaction() {
    if !*HAS_INTERACTED.peek() {
        *HAS_INTERACTED.write() = true;
    }
}

pub fn note_page_click() {
    note_interaction();
    let next = PAGE_CLICKS.peek().wrapping_add(1);
    *PAGE_CLICKS.write() = next;
}

type Attached = Rc<RefCell<Option<(Rc<NotificationWidget>, ListenerId)>>>;

fn current(slot: &Attached) -> Option<Rc<NotificationWidget>> {
    slot.borrow().as_ref().map(|(w, _)| w.clone())
}

#[component]
pub fn NotificationBell(
    config: BellConfig,
    #[props(default = true)] show_mark_all: bool,
) -> Element {
    let dialog = use_signal(|| None::<InfoDialog>);
    let view = use_signal(BellView::default);
    let provided_hooks = try_use_context::<AdminHooks>();
    let slot: Attached = use_hook(|| Rc::new(RefCell::new(None)));
    let anchors = WidgetAnchors::default();

    // Attach after the first render so the anchors exist.
    {
        let slot = slot.clone();
        use_effect(move || {
            if slot.borrow().is_some() {
                return;
            }
            let config = config.clone();
            let hooks = provided_hooks.clone().unwrap_or_default();
            let slot = slot.clone();

            spawn(async move {
                let feed: Rc<dyn NotificationFeed> = match FirebaseFeed::new(&config) {
                    Ok(f) => Rc::new(f),
                    Err(e) => {
                        warn!("[BELL] disabled: {e}");
                        return;
                    }
                };
                let dialogs: Rc<dyn DialogPresenter> = Rc::new(SignalDialogs(dialog));
                let deps = WidgetDeps {
                    feed,
                    hooks: hooks.or_placeholders(dialogs.clone()),
                    dialogs,
                    sound: Rc::new(EvalSound::new(config.sound_src.clone())),
                    has_interacted: Rc::new(|| *HAS_INTERACTED.peek()),
                };

                let Some(w) = NotificationWidget::attach(
                    &WidgetAnchors::default(),
                    &DocumentAnchors,
                    &config,
                    deps,
                )
                .await
                else {
                    return;
                };

                let id = w.register_listener(move |v| {
                    let mut view = view;
                    view.set(v.clone());
                });
                *slot.borrow_mut() = Some((w.clone(), id));

                if let Err(e) = w.run().await {
                    warn!("[BELL] live query not started: {e}");
                }
            });
        });
    }

    // Outside clicks
    {
        let slot = slot.clone();
        use_effect(move || {
            let _clicks = *PAGE_CLICKS.read();
            if let Some(w) = current(&slot) {
                w.on_outside_click(false, false);
            }
        });
    }

    {
        let slot = slot.clone();
        use_drop(move || {
            if let Some((w, id)) = slot.borrow_mut().take() {
                w.unregister_listener(id);
                w.detach();
            }
        });
    }

    let v = view.read().clone();
    let badge_style = if v.badge.is_visible() {
        "position:absolute; top:-6px; right:-6px; min-width:18px; height:18px; padding:0 5px; border-radius:999px; background:#dc2626; color:#fff; font-size:11px; font-weight:800; display:flex; align-items:center; justify-content:center;"
    } else {
        "display:none;"
    };
    let popup_style = if v.popup_open {
        "position:absolute; top:44px; right:0; width:360px; max-height:440px; display:flex; flex-direction:column; background:#0f172a; border:1px solid #334155; border-radius:14px; box-shadow:0 20px 40px rgba(0,0,0,0.45); z-index:9000;"
    } else {
        "display:none;"
    };

    let bell_slot = slot.clone();
    let on_bell = move |evt: MouseEvent| {
        evt.stop_propagation();
        note_interaction();
        let Some(w) = current(&bell_slot) else {
            return;
        };

        let opening = !view.peek().popup_open;
        let delay = w.scroll_delay_ms();
        let toggled = w.clone();
        spawn(async move {
            if let Err(e) = toggled.toggle_popup().await {
                error!("[BELL] mark visible as read failed: {e}");
            }
        });
        if opening {
            let list_id = w.anchors().list.clone();
            spawn(async move {
                sleep_ms(delay).await;
                scroll_list_to_top(&list_id);
            });
        }
    };

    let mark_all_slot = slot.clone();
    let on_mark_all = move |evt: MouseEvent| {
        evt.stop_propagation();
        let Some(w) = current(&mark_all_slot) else {
            return;
        };
        if !w.has_mark_all_button() {
            return;
        }
        spawn(async move {
            if let Err(e) = w.mark_all_as_read().await {
                error!("[BELL] mark all as read failed: {e}");
            }
        });
    };

    let rows: Element = match &v.list {
        ListView::Empty(text) => rsx! {
            div { style: "padding:18px; text-align:center; color:#94a3b8; font-size:13px;", "{text}" }
        },
        ListView::Rows(rows) => rsx! {
            for row in rows.iter() {
                NotificationRowItem {
                    key: "{row.id}",
                    row: row.clone(),
                    slot: SlotProp(slot.clone()),
                }
            }
        },
    };

    rsx! {
        div { style: "position:relative; display:inline-block;",
            button {
                id: "{anchors.bell}",
                style: "position:relative; width:38px; height:38px; border-radius:999px; border:1px solid #334155; background:#111827; color:#e5e7eb; font-size:18px; cursor:pointer;",
                title: "Notifications",
                onclick: on_bell,
                "🔔"
                span { id: "{anchors.badge}", style: "{badge_style}", "{v.badge.text()}" }
            }

            div {
                id: "{anchors.popup}",
                style: "{popup_style}",
                onclick: move |evt: MouseEvent| evt.stop_propagation(),

                div { style: "display:flex; align-items:center; justify-content:space-between; padding:12px 14px; border-bottom:1px solid #1e293b;",
                    span { style: "font-weight:800; color:#e2e8f0;", "Notifications" }
                    if show_mark_all {
                        button {
                            id: "{anchors.mark_all}",
                            style: "padding:4px 10px; border-radius:8px; border:1px solid #2563eb; background:#020617; color:#93c5fd; font-size:12px; cursor:pointer;",
                            onclick: on_mark_all,
                            "Mark all as read"
                        }
                    }
                }

                div { id: "{anchors.list}", style: "overflow-y:auto; flex:1;", {rows} }
            }

            InfoDialogModal { dialog }
        }
    }
}

/// Props wrapper; every clone points at the same attached widget.
#[derive(Clone)]
struct SlotProp(Attached);

impl PartialEq for SlotProp {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[component]
fn NotificationRowItem(row: NotificationRow, slot: SlotProp) -> Element {
    let background = if row.unread { "#172554" } else { "transparent" };
    let weight = if row.unread { "800" } else { "600" };
    let id = row.id.clone();

    rsx! {
        div {
            style: "padding:10px 14px; border-bottom:1px solid #1e293b; cursor:pointer; background:{background};",
            "data-id": "{row.id}",
            "data-type": "{row.kind}",
            "data-booking-id": "{row.booking_id}",
            "data-user-id": "{row.user_id}",
            "data-location-id": "{row.location_id}",
            "data-review-id": "{row.review_id}",
            onclick: move |_| {
                let Some(w) = current(&slot.0) else {
                    return;
                };
                let id = id.clone();
                spawn(async move {
                    w.on_row_click(&id).await;
                });
            },
            strong { style: "display:block; font-size:13px; color:#f1f5f9; font-weight:{weight};", "{row.title}" }
            p { style: "margin:4px 0; font-size:12px; color:#cbd5f5;", "{row.body}" }
            small { style: "font-size:11px; color:#64748b;", "{row.time_label}" }
        }
    }
}

pub(crate) async fn sleep_ms(ms: u32) {
    #[cfg(target_arch = "wasm32")]
    {
        gloo_timers::future::TimeoutFuture::new(ms).await;
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        tokio::time::sleep(std::time::Duration::from_millis(ms as u64)).await;
    }
}

// --------------------------------------------------------------------------------------------
// JS helpers
// --------------------------------------------------------------------------------------------
fn scroll_list_to_top(list_id: &str) {
    js_eval(&format!(
        r#"
        (function() {{
          const el = document.getElementById({list_id:?});
          if (el) el.scrollTop = 0;
        }})();
        "#
    ));
}

#[cfg(target_arch = "wasm32")]
fn js_eval(js: &str) {
    let _ = js_sys::eval(js);
}

#[cfg(not(target_arch = "wasm32"))]
fn js_eval(js: &str) {
    dioxus::document::eval(js);
}
