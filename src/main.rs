#![warn(clippy::all, rust_2018_idioms)]
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

use std::sync::Arc;

use layer_composer::{ComposerApp, UnavailableBackend};

/// Env var naming a JSON config file
#[cfg(not(target_arch = "wasm32"))]
const CONFIG_ENV: &str = "LAYER_COMPOSER_CONFIG";

#[cfg(not(target_arch = "wasm32"))]
fn load_config() -> Option<layer_composer::ComposerConfig> {
    let path = std::env::var_os(CONFIG_ENV)?;
    match layer_composer::ComposerConfig::load(&path) {
        Ok(config) => {
            log::info!("Loaded config from {}", path.to_string_lossy());
            Some(config)
        }
        Err(err) => {
            log::error!("Ignoring config {}: {err}", path.to_string_lossy());
            None
        }
    }
}

// When compiling natively:
#[cfg(not(target_arch = "wasm32"))]
fn main() -> eframe::Result {
    env_logger::init(); // Log to stderr (if you run with `RUST_LOG=debug`).

    let config = load_config();
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([640.0, 480.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Layer Composer",
        native_options,
        Box::new(|cc| Ok(Box::new(ComposerApp::new(cc, Arc::new(UnavailableBackend), config)))),
    )
}

// When compiling to web using trunk:
#[cfg(target_arch = "wasm32")]
fn main() {
    use eframe::wasm_bindgen::JsCast as _;

    // Redirect `log` message to `console.log` and friends:
    eframe::WebLogger::init(log::LevelFilter::Debug).ok();

    let web_options = eframe::WebOptions::default();

    wasm_bindgen_futures::spawn_local(async {
        let Some(canvas) = web_sys::window()
            .and_then(|window| window.document())
            .and_then(|document| document.get_element_by_id("the_canvas_id"))
            .and_then(|element| element.dyn_into::<web_sys::HtmlCanvasElement>().ok())
        else {
            log::error!("Canvas element 'the_canvas_id' not found");
            return;
        };

        let start_result = eframe::WebRunner::new()
            .start(
                canvas,
                web_options,
                Box::new(|cc| Ok(Box::new(ComposerApp::new(cc, Arc::new(UnavailableBackend), None)))),
            )
            .await;

        if let Err(err) = start_result {
            log::error!("Failed to start eframe: {err:?}");
        }
    });
}
