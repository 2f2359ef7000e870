/// Top action bar -- scan, session, link and window actions, theme toggle.
use crate::state::{AppPhase, AppState};
use egui::Ui;

/// Draw the toolbar.
pub fn toolbar(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui| {
        // App title -- uses the egui accent/hyperlink colour so it adapts to
        // dark and light mode automatically.
        ui.label(
            egui::RichText::new("📗 SheetDock")
                .size(18.0)
                .strong()
                .color(ui.visuals().hyperlink_color),
        );

        ui.separator();

        let idle = state.phase == AppPhase::Idle;

        // Refresh the inventory of open workbooks.
        let scan_btn = ui.add_enabled(
            idle,
            egui::Button::new("🔄 Refresh").min_size(egui::vec2(80.0, 28.0)),
        );
        if scan_btn
            .on_hover_text("Re-scan open workbooks")
            .clicked()
        {
            state.start_scan();
        }

        ui.separator();

        // Session capture/restore. Scope is the checked rows, or everything
        // when nothing is checked.
        let can_save = idle && !state.inventory.is_empty();
        if ui
            .add_enabled(can_save, egui::Button::new("💾 Save Session"))
            .on_hover_text(if state.selection.is_empty() {
                "Save all open workbooks to a session file"
            } else {
                "Save the checked workbooks to a session file"
            })
            .clicked()
        {
            state.start_save_session();
        }

        if ui
            .add_enabled(can_save, egui::Button::new("💾 Save & Close"))
            .on_hover_text("Save a session file, then close the captured workbooks")
            .clicked()
        {
            state.start_save_and_close();
        }

        if ui
            .add_enabled(idle, egui::Button::new("📂 Load Session"))
            .on_hover_text("Restore the most recent session file")
            .clicked()
        {
            state.start_load_latest_session();
        }

        ui.separator();

        // External link refresh across every open workbook.
        if ui
            .add_enabled(idle, egui::Button::new("🔗 Update Links"))
            .on_hover_text(format!(
                "Refresh links whose targets changed in the last {} day(s)",
                state.settings.lookback_days
            ))
            .clicked()
        {
            state.start_link_update();
        }

        ui.separator();

        // Window actions for the checked rows.
        let has_selection = !state.selection.is_empty();
        if ui
            .add_enabled(has_selection, egui::Button::new("⬆ Raise"))
            .on_hover_text("Bring the checked workbooks' windows to the front")
            .clicked()
        {
            state.bring_selection_to_front();
        }
        if ui
            .add_enabled(has_selection, egui::Button::new("⬇ Minimize Others"))
            .on_hover_text("Minimize every window except the checked ones")
            .clicked()
        {
            state.minimize_unselected();
        }

        // Right-aligned controls.
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            // About button.
            if ui.button("ℹ").on_hover_text("About SheetDock").clicked() {
                state.show_about = true;
            }

            // ── Theme toggle (☀ light / 🌙 dark) ──────────────────
            let theme_label = if state.dark_mode { "☀" } else { "🌙" };
            let theme_tip = if state.dark_mode {
                "Switch to light mode"
            } else {
                "Switch to dark mode"
            };
            if ui.button(theme_label).on_hover_text(theme_tip).clicked() {
                state.dark_mode = !state.dark_mode;
            }

            ui.separator();

            // ── Process health panel toggle ───────────────────────
            let zombies = state
                .health_records
                .iter()
                .filter(|r| {
                    r.classification == sheetdock_core::health::Classification::Zombie
                })
                .count();
            let health_label = if zombies > 0 {
                egui::RichText::new(format!("⚕ Health ({zombies})"))
                    .color(egui::Color32::from_rgb(0xf3, 0x8b, 0xa8))
            } else {
                egui::RichText::new("⚕ Health")
            };
            let health_tip = if state.show_health_panel {
                "Hide the process health panel"
            } else {
                "Show orphaned process detection"
            };
            if ui.button(health_label).on_hover_text(health_tip).clicked() {
                state.show_health_panel = !state.show_health_panel;
                if state.show_health_panel {
                    state.refresh_health();
                }
            }
        });
    });
}
