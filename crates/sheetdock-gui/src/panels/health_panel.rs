/// Process health panel.
///
/// Lists every matching host process with its classification and offers the
/// guarded cleanup action. Rendered as a bottom panel when
/// `state.show_health_panel` is `true`.
use crate::state::{AppPhase, AppState};
use egui::Ui;
use sheetdock_core::health::Classification;

/// Draw the process health panel.
pub fn health_panel(ui: &mut Ui, state: &mut AppState) {
    ui.vertical(|ui| {
        // ── Header row ────────────────────────────────────────────────────
        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new("⚕ Process Health")
                    .strong()
                    .color(ui.visuals().hyperlink_color),
            );

            ui.separator();
            ui.label(
                egui::RichText::new(format!("{} process(es)", state.health_records.len()))
                    .size(11.0)
                    .color(ui.visuals().weak_text_color()),
            );

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let idle = state.phase == AppPhase::Idle;
                let zombies = state
                    .health_records
                    .iter()
                    .any(|r| r.classification == Classification::Zombie);
                let can_clean = idle
                    && (zombies
                        || (!state.cleanup_zombie_only
                            && state
                                .health_records
                                .iter()
                                .any(|r| r.classification == Classification::Unknown)));
                if ui
                    .add_enabled(
                        can_clean,
                        egui::Button::new(
                            egui::RichText::new("🗑 Clean Up")
                                .color(egui::Color32::from_rgb(0xf3, 0x8b, 0xa8)),
                        ),
                    )
                    .on_hover_text("Terminate the selected orphaned processes")
                    .clicked()
                {
                    state.start_cleanup();
                }

                ui.separator();

                ui.checkbox(&mut state.cleanup_zombie_only, "zombies only")
                    .on_hover_text(
                        "When unchecked, windowless processes still inside the \
                         grace period are terminated too",
                    );

                ui.separator();

                if ui
                    .button("🔄 Refresh")
                    .on_hover_text("Re-inspect running processes")
                    .clicked()
                {
                    state.refresh_health();
                }
            });
        });

        ui.separator();

        // ── Content ──────────────────────────────────────────────────────
        if state.health_records.is_empty() {
            ui.centered_and_justified(|ui| {
                ui.label(
                    egui::RichText::new(format!(
                        "No {} processes found.",
                        state.settings.app_exe_name
                    ))
                    .size(12.0)
                    .color(ui.visuals().weak_text_color()),
                );
            });
            return;
        }

        let accent = ui.visuals().hyperlink_color;
        let muted = ui.visuals().weak_text_color();
        let text_col = ui.visuals().text_color();

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.add_sized(
                        [70.0, 16.0],
                        egui::Label::new(egui::RichText::new("PID").size(11.0).color(accent)),
                    );
                    ui.add_sized(
                        [160.0, 16.0],
                        egui::Label::new(
                            egui::RichText::new("Started").size(11.0).color(accent),
                        ),
                    );
                    ui.add_sized(
                        [90.0, 16.0],
                        egui::Label::new(egui::RichText::new("Memory").size(11.0).color(accent)),
                    );
                    ui.label(egui::RichText::new("State").size(11.0).color(accent));
                });

                ui.separator();

                for record in &state.health_records {
                    ui.horizontal(|ui| {
                        ui.add_sized(
                            [70.0, 18.0],
                            egui::Label::new(
                                egui::RichText::new(format!("{}", record.pid))
                                    .size(12.0)
                                    .color(text_col),
                            ),
                        );
                        ui.add_sized(
                            [160.0, 18.0],
                            egui::Label::new(
                                egui::RichText::new(record.started_display())
                                    .size(11.0)
                                    .color(muted),
                            ),
                        );
                        ui.add_sized(
                            [90.0, 18.0],
                            egui::Label::new(
                                egui::RichText::new(record.memory_display())
                                    .size(11.0)
                                    .color(muted),
                            ),
                        );
                        let (label, color) = match record.classification {
                            Classification::Healthy => {
                                ("healthy", egui::Color32::from_rgb(0xa6, 0xe3, 0xa1))
                            }
                            Classification::Zombie => {
                                ("zombie", egui::Color32::from_rgb(0xf3, 0x8b, 0xa8))
                            }
                            Classification::Unknown => {
                                ("unknown", egui::Color32::from_rgb(0xfa, 0xb3, 0x87))
                            }
                        };
                        ui.label(egui::RichText::new(label).size(12.0).strong().color(color));
                    });
                }
            });
    });
}
