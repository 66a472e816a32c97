use adminbell_frontend::app;
use dioxus::prelude::*;
use tracing::info;

#[cfg(target_arch = "wasm32")]
fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(target_arch = "wasm32"))]
fn init_panic_hook() {}

fn init_logging() {
    // Browser console on web, stdout on desktop.
    if let Err(e) = dioxus::logger::init(dioxus::logger::tracing::Level::INFO) {
        eprintln!("logger already initialised: {e}");
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    init_panic_hook();
    init_logging();
    info!("[APP] starting web build");

    launch(app::App);
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    init_panic_hook();
    init_logging();
    info!("[APP] starting desktop build");

    let cfg = dioxus_desktop::Config::new().with_window(
        dioxus_desktop::WindowBuilder::new()
            .with_title("Admin Panel")
            .with_inner_size(dioxus_desktop::LogicalSize::new(1200.0, 800.0)),
    );
    LaunchBuilder::desktop().with_cfg(cfg).launch(app::App);
}
