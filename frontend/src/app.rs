// frontend/src/app.rs
//
// Admin shell: routes, the native Connect screen and the dashboard header that
// hosts the notification bell.
//
// - Web builds are configured by the host page, so they skip Connect.
// - Native builds keep the database URL in the app data dir and ask for it once.

use crate::notification_bell::{note_interaction, note_page_click, BellConfig, NotificationBell};
use dioxus::prelude::*;
use dioxus_router::{Routable, Router};

#[cfg(not(target_arch = "wasm32"))]
use crate::notification_bell::feed::FirebaseFeed;
#[cfg(not(target_arch = "wasm32"))]
use dioxus_router::use_navigator;

// --- global css ---
const GLOBAL_CSS: &str = r#"
html, body {
    margin: 0;
    padding: 0;
    width: 100%;
    height: 100%;
    background: #020617;
}

:root, html {
    color-scheme: dark;
}

#main {
    width: 100%;
    height: 100%;
    background: #020617;
}

* { box-sizing: border-box; }
"#;

#[derive(Clone, Routable, PartialEq)]
pub enum Route {
    #[route("/")]
    Root {},

    #[route("/dashboard")]
    Dashboard {},

    #[cfg(not(target_arch = "wasm32"))]
    #[route("/connect")]
    Connect {},
}

#[cfg(not(target_arch = "wasm32"))]
fn snip(mut s: String, max: usize) -> String {
    s = s.replace('\r', "");
    if s.len() > max {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
        s.push('…');
    }
    s
}

// -------------------------
// Connection probe
// -------------------------
#[cfg(not(target_arch = "wasm32"))]
async fn probe_report(cfg: &BellConfig) -> String {
    let mut s = String::new();
    s.push_str(&format!("Database: {}\n", cfg.database_url));
    s.push_str(&format!("Feed path: /{}\n", cfg.feed_path));
    s.push_str(&format!(
        "Auth token: {}\n\n",
        if cfg.auth_token.is_some() { "set" } else { "none" }
    ));

    let feed = match FirebaseFeed::new(cfg) {
        Ok(f) => f,
        Err(e) => {
            s.push_str(&format!("❌ {e}\n"));
            return s;
        }
    };

    match feed.probe().await {
        Ok(lines) => {
            s.push_str("🎉 CONNECTION OK\n");
            for line in lines {
                s.push_str(&format!("✅ {line}\n"));
            }
        }
        Err(e) => {
            s.push_str(&format!("❌ probe failed\n    ERROR: {}\n", snip(e.to_string(), 300)));
            s.push_str("\nNotes:\n");
            s.push_str("- 401/403 usually means the database rules need an auth token.\n");
            s.push_str("- 404 means the database name in the URL is wrong.\n");
        }
    }
    s
}

// -------------------------
// App
// -------------------------
#[component]
pub fn App() -> Element {
    rsx! {
        document::Style { "{GLOBAL_CSS}" }
        Meta { name: "viewport", content: "width=device-width, initial-scale=1" }

        div {
            style: "min-height: 100vh; width: 100%; background: #020617; color: #e5e7eb;",
            Router::<Route> {}
        }
    }
}

#[component]
pub fn Root() -> Element {
    #[cfg(target_arch = "wasm32")]
    {
        return rsx! { Dashboard {} };
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let nav = use_navigator();

        use_effect(move || {
            if BellConfig::load().is_configured() {
                let _ = nav.replace(Route::Dashboard {});
            } else {
                let _ = nav.replace(Route::Connect {});
            }
        });

        rsx! { div {} }
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[component]
pub fn Connect() -> Element {
    let nav = use_navigator();

    let stored = BellConfig::load();
    let initial_url = BellConfig::stored_database_url()
        .unwrap_or_else(|| "https://your-project-default-rtdb.firebaseio.com".to_string());
    let initial_token = stored.auth_token.clone().unwrap_or_default();
    let initial_path = stored.feed_path.clone();

    let mut url_edit = use_signal(|| initial_url);
    let mut token_edit = use_signal(|| initial_token);
    let mut path_edit = use_signal(|| initial_path);

    let mut test_status = use_signal(|| "".to_string());
    let mut testing = use_signal(|| false);

    // The form values over whatever is stored.
    let edited_config = move || {
        let mut cfg = BellConfig::load();
        cfg.apply_overrides(|key| match key {
            "ADMINBELL_DATABASE_URL" => Some(url_edit()),
            "ADMINBELL_AUTH_TOKEN" => Some(token_edit()),
            "ADMINBELL_FEED_PATH" => Some(path_edit()),
            _ => None,
        });
        cfg
    };

    rsx! {
        div {
            style: "height:100vh; display:flex; align-items:center; justify-content:center; background:#020617; color:#e5e7eb; font-family:system-ui;",
            div {
                style: "width:min(760px, 94vw); padding:24px; border:1px solid #334155; border-radius:16px; background:#0b1220; box-shadow:0 12px 30px rgba(0,0,0,0.5);",

                h1 { style: "margin:0 0 12px 0; font-size:20px;", "Admin Panel" }

                p { style: "margin:0 0 16px 0; color:#94a3b8;",
                    "Enter the realtime database URL (including https://). Example: ",
                    code { "https://your-project-default-rtdb.firebaseio.com" }
                }

                input {
                    style: "width:100%; padding:12px; border-radius:12px; border:1px solid #334155; background:#020617; color:#e5e7eb; outline:none;",
                    value: "{url_edit()}",
                    oninput: move |evt| {
                        url_edit.set(evt.value());
                        test_status.set("".to_string());
                    },
                }

                input {
                    style: "width:100%; margin-top:10px; padding:12px; border-radius:12px; border:1px solid #334155; background:#020617; color:#e5e7eb; outline:none;",
                    r#type: "password",
                    placeholder: "Auth token (optional)",
                    value: "{token_edit()}",
                    oninput: move |evt| {
                        token_edit.set(evt.value());
                        test_status.set("".to_string());
                    },
                }

                input {
                    style: "width:100%; margin-top:10px; padding:12px; border-radius:12px; border:1px solid #334155; background:#020617; color:#e5e7eb; outline:none;",
                    placeholder: "Feed path (default: notifications)",
                    value: "{path_edit()}",
                    oninput: move |evt| {
                        path_edit.set(evt.value());
                        test_status.set("".to_string());
                    },
                }

                if !test_status().is_empty() {
                    pre {
                        style: "
                            margin:14px 0 0 0;
                            padding:12px;
                            border-radius:12px;
                            border:1px solid #334155;
                            background:#020617;
                            color:#cbd5e1;
                            font-family: ui-monospace, SFMono-Regular, Menlo, Monaco, Consolas, 'Liberation Mono', 'Courier New', monospace;
                            font-size:12px;
                            line-height:1.35;
                            max-height:420px;
                            overflow:auto;
                            white-space:pre;
                        ",
                        "{test_status()}"
                    }
                }

                div { style: "display:flex; gap:12px; margin-top:16px; justify-content:flex-end; flex-wrap:wrap;",

                    button {
                        style: "
                            padding:10px 14px;
                            border-radius:12px;
                            border:1px solid #334155;
                            background:#0f172a;
                            color:#e5e7eb;
                            cursor:pointer;
                        ",
                        disabled: testing(),
                        onclick: move |_| {
                            let cfg = edited_config();
                            if let Err(e) = cfg.validate() {
                                test_status.set(e.to_string());
                                return;
                            }

                            testing.set(true);
                            test_status.set("Testing connection...".to_string());

                            spawn(async move {
                                let report = probe_report(&cfg).await;
                                testing.set(false);
                                test_status.set(report);
                            });
                        },
                        if testing() { "Testing..." } else { "Test Connection" }
                    }

                    button {
                        style: "
                            padding:10px 14px;
                            border-radius:12px;
                            border:1px solid #334155;
                            background:#111827;
                            color:#e5e7eb;
                            cursor:pointer;
                        ",
                        onclick: move |_| {
                            let cfg = edited_config();
                            if let Err(e) = cfg.validate() {
                                test_status.set(e.to_string());
                                return;
                            }

                            BellConfig::set_database_url_and_persist(cfg.database_url.clone());
                            BellConfig::set_auth_token_and_persist(cfg.auth_token.as_deref().unwrap_or(""));
                            BellConfig::set_feed_path_and_persist(&cfg.feed_path);
                            let _ = nav.replace(Route::Dashboard {});
                        },
                        "Connect"
                    }
                }
            }
        }
    }
}

#[component]
pub fn Dashboard() -> Element {
    #[cfg(not(target_arch = "wasm32"))]
    let nav = use_navigator();

    let config = BellConfig::load();

    if !config.is_configured() {
        return rsx! {
            div {
                style: "height:100vh; display:flex; align-items:center; justify-content:center; background:#020617; color:#e5e7eb; font-family:system-ui;",
                div {
                    style: "width:min(560px, 92vw); padding:24px; border:1px solid #334155; border-radius:16px; background:#0b1220;",
                    h1 { style: "margin:0 0 12px 0; font-size:18px;", "Not connected" }
                    p { style: "margin:0; color:#94a3b8;",
                        if cfg!(target_arch = "wasm32") {
                            "Set window.__ADMINBELL_DATABASE_URL on the host page."
                        } else {
                            "Please configure the database URL on the Connect screen."
                        }
                    }
                }
            }
        };
    }

    // Native-only CONNECT button
    let connect_button: Element = {
        #[cfg(target_arch = "wasm32")]
        {
            rsx! { div {} }
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            rsx! {
                button {
                    style: "padding:0.4rem 0.8rem; border-radius:0.5rem; border:1px solid #4b5563; background:#020617; color:#e5e7eb; cursor:pointer; font-weight:800;",
                    onclick: move |_| {
                        let _ = nav.replace(Route::Connect {});
                    },
                    "CONNECT"
                }
            }
        }
    };

    rsx! {
        div {
            style: "min-height:100vh; display:flex; flex-direction:column; font-family:system-ui;",
            tabindex: "-1",
            onclick: move |_| note_page_click(),
            onkeydown: move |_| note_interaction(),

            div {
                style: "display:flex; align-items:center; justify-content:space-between; gap:12px; padding:12px 18px; border-bottom:1px solid #1e293b; background:#0b1220;",
                h1 { style: "color:#f97316; margin:0; font-size:22px; font-weight:800;", "Admin Panel" }
                div { style: "display:flex; align-items:center; gap:12px;",
                    NotificationBell { config }
                    {connect_button}
                }
            }

            div { style: "flex:1; padding:24px; color:#94a3b8;",
                "Bookings, reviews and messages open from the notification bell."
            }
        }
    }
}
