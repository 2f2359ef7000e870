//! SheetDock — Excel workbook session manager.
//!
//! Thin binary entry point. All logic lives in the `sheetdock-core`
//! and `sheetdock-gui` crates.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("SheetDock starting");

    let settings = sheetdock_core::config::Settings::load_or_default(&settings_path());
    let icon = sheetdock_gui::icon::generate_icon(64);

    // Build application state *before* opening the window so the first
    // rendered frame arrives immediately and the OS never fills the window
    // with its default white background.
    let state = sheetdock_gui::SheetDockState::build(settings);

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_title("SheetDock -- Workbook Session Manager")
            .with_inner_size([1100.0, 720.0])
            .with_min_inner_size([760.0, 480.0])
            .with_icon(icon)
            // Prevents Windows from filling the window with white before the
            // first OpenGL frame is rendered. DWM compositing is used instead,
            // which starts transparent/black rather than white.
            .with_transparent(true),
        ..Default::default()
    };

    eframe::run_native(
        "SheetDock",
        options,
        Box::new(|cc| {
            Ok(Box::new(sheetdock_gui::SheetDockApp::with_state(
                cc, state,
            )))
        }),
    )
    .map_err(|e| anyhow::anyhow!("eframe error: {e}"))?;

    Ok(())
}

/// Settings file next to the executable, falling back to the working
/// directory when the executable path cannot be resolved.
fn settings_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sheetdock_settings.json")
}
