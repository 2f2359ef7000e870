/// Main `eframe::App` implementation for SheetDock.
///
/// This is the top-level UI layout that composes all panels and widgets.
use crate::panels;
use crate::state::AppState;
use crate::widgets;
use sheetdock_core::config::Settings;

/// Pre-built application state.
///
/// Construct this **before** calling `eframe::run_native` so that the
/// startup work (settings load, initial scan kick-off) completes before the
/// OS window is created and the first rendered frame arrives immediately.
pub struct SheetDockState {
    pub(crate) inner: AppState,
}

impl SheetDockState {
    /// Load settings and start the initial inventory scan.
    /// Call this before `eframe::run_native`.
    pub fn build(settings: Settings) -> Self {
        let mut state = AppState::new(settings);
        state.start_scan();
        Self { inner: state }
    }
}

/// The SheetDock application.
pub struct SheetDockApp {
    state: AppState,
}

impl SheetDockApp {
    /// Create a new application instance from pre-built state.
    ///
    /// The state should have been constructed by [`SheetDockState::build()`]
    /// *before* `eframe::run_native` is called.
    pub fn with_state(cc: &eframe::CreationContext<'_>, state: SheetDockState) -> Self {
        // ── Font: Segoe UI ────────────────────────────────────────────────
        // Load Segoe UI from the Windows fonts directory and register it as
        // the highest-priority proportional font so every widget uses it.
        let system_root = std::env::var("SystemRoot").unwrap_or_else(|_| "C:\\Windows".to_string());
        let font_path = format!("{}\\Fonts\\segoeui.ttf", system_root);

        let mut fonts = egui::FontDefinitions::default();
        match std::fs::read(&font_path) {
            Ok(bytes) => {
                fonts.font_data.insert(
                    "SegoeUI".to_owned(),
                    egui::FontData::from_owned(bytes).into(),
                );
                fonts
                    .families
                    .entry(egui::FontFamily::Proportional)
                    .or_default()
                    .insert(0, "SegoeUI".to_owned());
                // Also use for monospace labels (file paths, console).
                fonts
                    .families
                    .entry(egui::FontFamily::Monospace)
                    .or_default()
                    .insert(0, "SegoeUI".to_owned());
                tracing::info!("Loaded Segoe UI from {}", font_path);
            }
            Err(e) => {
                tracing::warn!(
                    "Could not load Segoe UI from {}: {} -- using default font",
                    font_path,
                    e
                );
            }
        }
        cc.egui_ctx.set_fonts(fonts);

        // Apply initial dark visuals.
        cc.egui_ctx.set_visuals(egui::Visuals::dark());

        Self { state: state.inner }
    }
}

impl eframe::App for SheetDockApp {
    /// Override the GPU clear colour to match the active theme background,
    /// preventing a colour mismatch flash between frames.
    fn clear_color(&self, visuals: &egui::Visuals) -> [f32; 4] {
        let [r, g, b, a] = visuals.panel_fill.to_array();
        [
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        ]
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ── Apply theme ───────────────────────────────────────────────────
        // Called every frame so that toggling dark_mode takes effect
        // immediately on the next rendered frame.
        if self.state.dark_mode {
            ctx.set_visuals(egui::Visuals::dark());
        } else {
            ctx.set_visuals(egui::Visuals::light());
        }

        // ── Process background messages ───────────────────────────────────
        let _scan_changed = self.state.process_scan_messages();
        let _batch_changed = self.state.process_batch_events();

        // Request continuous repaint while a worker is in flight.
        if self.state.is_busy() {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }

        // ── Top toolbar ───────────────────────────────────────────────────
        egui::TopBottomPanel::top("toolbar")
            .min_height(36.0)
            .show(ctx, |ui| {
                ui.add_space(4.0);
                widgets::toolbar::toolbar(ui, &mut self.state);
                ui.add_space(4.0);
            });

        // ── About dialog ──────────────────────────────────────────────────
        let mut show_about = self.state.show_about;
        egui::Window::new("About SheetDock")
            .open(&mut show_about)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .fixed_size([340.0, 0.0])
            .show(ctx, |ui| {
                let accent = ui.visuals().hyperlink_color;
                let muted = ui.visuals().weak_text_color();
                let normal = ui.visuals().text_color();

                ui.vertical_centered(|ui| {
                    ui.add_space(8.0);
                    ui.label(
                        egui::RichText::new("📗 SheetDock")
                            .size(24.0)
                            .strong()
                            .color(accent),
                    );
                    ui.add_space(4.0);
                    ui.label(
                        egui::RichText::new(format!("v{}", env!("CARGO_PKG_VERSION")))
                            .size(13.0)
                            .color(muted),
                    );
                    ui.add_space(12.0);
                    ui.label(
                        egui::RichText::new(
                            "A workbook session manager for Excel.\n\
                             Save and restore open workbooks with their working\n\
                             positions, refresh stale external links, and clean\n\
                             up orphaned Excel processes.",
                        )
                        .size(12.0)
                        .color(normal),
                    );
                    ui.add_space(12.0);
                    ui.separator();
                    ui.add_space(8.0);
                    ui.label(
                        egui::RichText::new("Built with Rust & egui")
                            .size(11.0)
                            .color(muted),
                    );
                    ui.add_space(8.0);
                });
            });
        self.state.show_about = show_about;

        // ── Bottom status bar ─────────────────────────────────────────────
        egui::TopBottomPanel::bottom("status_bar")
            .min_height(24.0)
            .show(ctx, |ui| {
                ui.add_space(2.0);
                widgets::status_bar::status_bar(ui, &self.state);
                ui.add_space(2.0);
            });

        // ── Process health panel (optional bottom panel) ──────────────────
        if self.state.show_health_panel {
            egui::TopBottomPanel::bottom("health_panel")
                .resizable(true)
                .default_height(180.0)
                .min_height(100.0)
                .max_height(400.0)
                .show(ctx, |ui| {
                    ui.add_space(4.0);
                    panels::health_panel::health_panel(ui, &mut self.state);
                    ui.add_space(4.0);
                });
        }

        // ── Console panel ─────────────────────────────────────────────────
        egui::TopBottomPanel::bottom("console_panel")
            .resizable(true)
            .default_height(160.0)
            .min_height(80.0)
            .max_height(400.0)
            .show(ctx, |ui| {
                ui.add_space(4.0);
                panels::console_panel::console_panel(ui, &mut self.state);
                ui.add_space(4.0);
            });

        // ── Central panel (inventory table) ───────────────────────────────
        egui::CentralPanel::default().show(ctx, |ui| {
            panels::inventory_panel::inventory_panel(ui, &mut self.state);
        });
    }
}
