use dioxus::prelude::*;
#[cfg(test)]
use std::cell::RefCell;
#[cfg(test)]
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoDialog {
    pub title: String,
    pub text: String,
}

impl InfoDialog {
    pub fn info(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
        }
    }
}

/// Where generic informational dialogs end up.
pub trait DialogPresenter {
    fn show(&self, dialog: InfoDialog);
}

/// Keeps the most recent dialog in a signal; [`InfoDialogModal`] renders it.
#[derive(Clone, Copy)]
pub struct SignalDialogs(pub Signal<Option<InfoDialog>>);

impl DialogPresenter for SignalDialogs {
    fn show(&self, dialog: InfoDialog) {
        let mut slot = self.0;
        slot.set(Some(dialog));
    }
}

/// Collects dialogs instead of showing them.
#[cfg(test)]
#[derive(Default, Clone)]
pub struct RecordingDialogs(Rc<RefCell<Vec<InfoDialog>>>);

#[cfg(test)]
impl RecordingDialogs {
    pub fn shown(&self) -> Vec<InfoDialog> {
        self.0.borrow().clone()
    }
}

#[cfg(test)]
impl DialogPresenter for RecordingDialogs {
    fn show(&self, dialog: InfoDialog) {
        self.0.borrow_mut().push(dialog);
    }
}

#[component]
pub fn InfoDialogModal(dialog: Signal<Option<InfoDialog>>) -> Element {
    let mut dialog = dialog;
    let current = dialog.read().clone();
    let Some(d) = current else {
        return rsx! {};
    };

    rsx! {
        div {
            style: "position:fixed; inset:0; z-index:10000; background:rgba(2,6,23,0.66); display:flex; align-items:center; justify-content:center;",
            div {
                role: "dialog",
                style: "min-width:320px; max-width:480px; background:#0f172a; border:1px solid #334155; border-radius:14px; padding:22px; color:#e2e8f0; text-align:center; box-shadow:0 20px 40px rgba(0,0,0,0.45);",
                div {
                    style: "width:48px; height:48px; margin:0 auto 12px auto; border-radius:999px; border:3px solid #3b82f6; color:#3b82f6; font-size:26px; font-weight:800; display:flex; align-items:center; justify-content:center;",
                    "i"
                }
                h3 { style: "margin:0 0 8px 0; font-size:18px;", "{d.title}" }
                p { style: "margin:0 0 18px 0; font-size:14px; color:#cbd5f5;", "{d.text}" }
                button {
                    style: "padding:8px 22px; border-radius:10px; border:1px solid #2563eb; background:#1d4ed8; color:#eff6ff; font-weight:700; cursor:pointer;",
                    onclick: move |_| dialog.set(None),
                    "OK"
                }
            }
        }
    }
}
