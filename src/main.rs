mod app;
mod config;
mod decode;
mod editor;
mod library;
mod metadata;
mod pending;
mod picker;
mod processing;
mod state;

use std::path::PathBuf;

use app::PhotoFilterApp;
use config::AppConfig;
use processing::pipeline::{RenderBackend, RenderContext};

fn report_render_backend(backend: RenderBackend) {
    let requested = backend.label();
    if backend == RenderBackend::Cpu {
        tracing::info!(backend = requested, "render backend selected");
        return;
    }
    let status = processing::gpu_pipeline::runtime_status();
    let adapter_desc = match (
        status.adapter_name.as_deref(),
        status.adapter_backend.as_deref(),
    ) {
        (Some(name), Some(api)) => format!("{} ({})", name, api),
        (Some(name), None) => name.to_string(),
        _ => "n/a".to_string(),
    };
    let driver = status.adapter_driver.as_deref().unwrap_or("n/a");
    match backend {
        RenderBackend::Cpu => {}
        RenderBackend::Auto if status.available => tracing::info!(
            backend = requested,
            adapter = %adapter_desc,
            driver,
            "render backend selected (gpu active)"
        ),
        RenderBackend::Auto => {
            tracing::info!(backend = requested, "render backend selected (gpu unavailable; cpu)")
        }
        RenderBackend::Gpu if status.available => tracing::info!(
            backend = requested,
            adapter = %adapter_desc,
            driver,
            "render backend selected"
        ),
        RenderBackend::Gpu => tracing::warn!(
            backend = requested,
            "no gpu adapter is available; photos will show unfiltered"
        ),
    }
}

/// Optional photo to open at startup, given as the first argument.
fn load_initial_photo() -> Option<image::DynamicImage> {
    let path = std::env::args().nth(1).map(PathBuf::from)?;
    match decode::open_photo(&path) {
        Ok(img) => Some(img),
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "could not open startup photo");
            None
        }
    }
}

fn main() -> eframe::Result {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AppConfig::load();
    let backend = config.render_backend();
    report_render_backend(backend);
    let render = RenderContext::new(backend);
    let initial = load_initial_photo();

    let width = config.window_width.unwrap_or(760.0);
    let height = config.window_height.unwrap_or(720.0);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Photo Filter")
            .with_app_id("photo-filter")
            .with_inner_size([width, height]),
        ..Default::default()
    };

    eframe::run_native(
        "photo-filter",
        native_options,
        Box::new(move |cc| Ok(Box::new(PhotoFilterApp::new(cc, config, render, initial)))),
    )
}
