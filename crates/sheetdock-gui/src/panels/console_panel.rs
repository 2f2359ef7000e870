/// Operation console — the running log of batch progress lines.
use crate::state::AppState;
use egui::Ui;

/// Draw the console panel.
pub fn console_panel(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui| {
        ui.label(
            egui::RichText::new("🖹 Console")
                .strong()
                .color(ui.visuals().hyperlink_color),
        );
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui
                .button("🗑 Clear")
                .on_hover_text("Clear the console")
                .clicked()
            {
                state.console.clear();
            }
        });
    });

    ui.separator();

    let muted = ui.visuals().weak_text_color();
    let text_col = ui.visuals().text_color();

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .stick_to_bottom(true)
        .show(ui, |ui| {
            if state.console.is_empty() {
                ui.label(
                    egui::RichText::new("No activity yet.")
                        .size(12.0)
                        .color(muted),
                );
                return;
            }
            for line in &state.console {
                let color = if line.starts_with("Failed") || line.contains("aborted") {
                    egui::Color32::from_rgb(0xf3, 0x8b, 0xa8)
                } else if line.starts_with("Skipped") {
                    egui::Color32::from_rgb(0xfa, 0xb3, 0x87)
                } else {
                    text_col
                };
                ui.label(egui::RichText::new(line).size(12.0).monospace().color(color));
            }
        });
}
