/// Bottom status bar — operation progress and inventory statistics.
use crate::state::{AppPhase, AppState};
use egui::Ui;

/// Draw the status bar at the bottom of the window.
pub fn status_bar(ui: &mut Ui, state: &AppState) {
    // Extract theme-adaptive colours once for this frame.
    let color_accent = ui.visuals().hyperlink_color;
    let color_weak = ui.visuals().weak_text_color();
    let color_normal = ui.visuals().text_color();
    let color_warning = egui::Color32::from_rgb(0xfa, 0xb3, 0x87);

    ui.horizontal(|ui| {
        match state.phase {
            AppPhase::Idle => {
                let text = if state.status_message.is_empty() {
                    "Ready"
                } else {
                    &state.status_message
                };
                ui.label(egui::RichText::new(text).size(12.0).color(color_weak));
            }
            AppPhase::Scanning => {
                ui.spinner();
                let display_path = truncate_path(&state.scan_current_path, 60);
                ui.label(
                    egui::RichText::new(format!("Reading {}...", display_path))
                        .size(12.0)
                        .color(color_normal),
                );
            }
            AppPhase::Working => {
                ui.spinner();
                ui.label(
                    egui::RichText::new(&state.status_message)
                        .size(12.0)
                        .color(color_normal),
                );
            }
        }

        ui.separator();
        ui.label(
            egui::RichText::new(format!("{} workbook(s)", state.inventory.len()))
                .size(12.0)
                .color(color_accent),
        );

        if !state.selection.is_empty() {
            ui.separator();
            ui.label(
                egui::RichText::new(format!("{} checked", state.selection.len()))
                    .size(12.0)
                    .color(color_normal),
            );
        }

        if let Some(duration) = state.scan_duration {
            ui.separator();
            ui.label(
                egui::RichText::new(format!("scanned in {:.1}s", duration.as_secs_f64()))
                    .size(12.0)
                    .color(color_weak),
            );
        }

        if let Some(ref summary) = state.last_summary {
            if summary.failed > 0 {
                ui.separator();
                ui.label(
                    egui::RichText::new(format!("{} failed", summary.failed))
                        .size(12.0)
                        .color(color_warning),
                );
            }
        }
    });
}

/// Truncate a path string to fit within `max_len` characters,
/// replacing the middle with "..." if needed.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.len() <= max_len {
        return path.to_string();
    }
    let half = (max_len - 3) / 2;
    format!("{}...{}", &path[..half], &path[path.len() - half..])
}
