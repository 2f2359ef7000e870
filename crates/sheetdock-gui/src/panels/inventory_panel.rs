/// Open-workbook inventory table.
///
/// One row per open workbook: a checkbox for the session/window scope, the
/// name, the working position captured at scan time, the on-disk
/// modification time, and whether a desktop window was matched. Clicking a
/// name raises that workbook's window.
use crate::state::AppState;
use egui::Ui;
use egui_extras::{Column, TableBuilder};
use sheetdock_core::platform::desktop::NativeDesktop;
use sheetdock_core::reconcile;

/// Draw the inventory table.
pub fn inventory_panel(ui: &mut Ui, state: &mut AppState) {
    if state.inventory.is_empty() {
        ui.centered_and_justified(|ui| {
            ui.label(
                egui::RichText::new("No open workbooks found. Press 🔄 Refresh to scan.")
                    .size(13.0)
                    .color(ui.visuals().weak_text_color()),
            );
        });
        return;
    }

    let accent = ui.visuals().hyperlink_color;
    let muted = ui.visuals().weak_text_color();
    let text_col = ui.visuals().text_color();

    // Deferred to after the table loop: acting on a row needs `&mut state`
    // while the loop borrows the inventory.
    let mut toggle: Option<std::path::PathBuf> = None;
    let mut raise: Option<usize> = None;

    TableBuilder::new(ui)
        .striped(true)
        .column(Column::exact(24.0))
        .column(Column::initial(220.0).at_least(120.0).resizable(true))
        .column(Column::initial(140.0).at_least(80.0).resizable(true))
        .column(Column::initial(80.0).at_least(60.0))
        .column(Column::initial(150.0).at_least(100.0))
        .column(Column::remainder())
        .header(20.0, |mut header| {
            let mut label = |header: &mut egui_extras::TableRow<'_, '_>, text: &str| {
                header.col(|ui| {
                    ui.label(egui::RichText::new(text).size(11.0).color(accent));
                });
            };
            label(&mut header, "");
            label(&mut header, "Workbook");
            label(&mut header, "Active Sheet");
            label(&mut header, "Cell");
            label(&mut header, "Modified");
            label(&mut header, "Window");
        })
        .body(|body| {
            body.rows(22.0, state.inventory.len(), |mut row| {
                let index = row.index();
                let record = &state.inventory[index];
                let checked = state.selection.contains(&record.file_path);

                row.col(|ui| {
                    let mut value = checked;
                    if ui.checkbox(&mut value, "").changed() {
                        toggle = Some(record.file_path.clone());
                    }
                });
                row.col(|ui| {
                    let name = egui::RichText::new(&record.display_name)
                        .size(12.0)
                        .color(text_col);
                    if ui
                        .add(egui::Label::new(name).sense(egui::Sense::click()))
                        .on_hover_text(record.file_path.display().to_string())
                        .clicked()
                    {
                        raise = Some(index);
                    }
                });
                row.col(|ui| {
                    ui.label(
                        egui::RichText::new(record.active_sheet.as_deref().unwrap_or("—"))
                            .size(12.0)
                            .color(text_col),
                    );
                });
                row.col(|ui| {
                    ui.label(
                        egui::RichText::new(record.active_cell.as_deref().unwrap_or("—"))
                            .size(12.0)
                            .color(muted),
                    );
                });
                row.col(|ui| {
                    ui.label(
                        egui::RichText::new(record.modified_display())
                            .size(11.0)
                            .color(muted),
                    );
                });
                row.col(|ui| {
                    if record.window.is_some() {
                        ui.label(egui::RichText::new("✔").size(12.0).color(accent));
                    } else {
                        ui.label(
                            egui::RichText::new("not matched")
                                .size(11.0)
                                .color(muted),
                        )
                        .on_hover_text("No desktop window matched this workbook's name");
                    }
                });
            });
        });

    if let Some(path) = toggle {
        if !state.selection.remove(&path) {
            state.selection.insert(path);
        }
    }
    if let Some(index) = raise {
        let record = state.inventory[index].clone();
        if reconcile::activate(&NativeDesktop, &record) != reconcile::WindowOutcome::Done {
            state.push_console(format!("Could not raise {}", record.display_name));
        }
    }
}
