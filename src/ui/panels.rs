use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – sweep selection and overlay list
// ---------------------------------------------------------------------------

/// Render the left panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Scan");
    ui.separator();

    if let Some(pending) = state.pending.as_mut() {
        ui.strong(&pending.file_name);
        ui.label(format!("{} scans", pending.record.len()));
        ui.label("Sweep field:");
        ui.text_edit_singleline(&mut pending.path_text);
        if !pending.candidates.is_empty() {
            egui::ComboBox::from_id_salt("sweep_candidates")
                .selected_text("suggestions")
                .show_ui(ui, |ui: &mut Ui| {
                    for candidate in &pending.candidates {
                        let text = candidate.to_string();
                        if ui.selectable_label(pending.path_text == text, &text).clicked() {
                            pending.path_text = text;
                        }
                    }
                });
        }
        if ui.button("Plot").clicked() {
            state.apply_pending();
        }
        ui.separator();
    }

    let Some(plotter) = state.plotter.as_mut() else {
        ui.label("No scan loaded.");
        return;
    };

    if let Some(name) = &state.file_name {
        ui.strong(name);
    }
    let dataset = plotter.dataset();
    let (y_lo, y_hi) = dataset.y_range();
    ui.label(format!(
        "{} spectra × {} points\n{} from {y_lo} to {y_hi}",
        dataset.n_rows(),
        dataset.n_columns(),
        plotter.options().legend_label
    ));
    ui.separator();

    ui.label(RichText::new("Shift + click: add spectrum").small());
    ui.label(RichText::new("Hold U + click: remove nearest").small());
    let modifiers = plotter.modifiers();
    if modifiers.shift {
        ui.label(RichText::new("selecting").color(Color32::LIGHT_GREEN));
    } else if modifiers.unselect {
        ui.label(RichText::new("removing").color(Color32::LIGHT_RED));
    }
    ui.separator();

    ui.horizontal(|ui: &mut Ui| {
        ui.strong(format!("Selected ({})", plotter.overlays().len()));
        if ui.small_button("Clear").clicked() {
            plotter.clear_overlays();
        }
    });

    let mut remove = None;
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            TableBuilder::new(ui)
                .striped(true)
                .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
                .column(Column::remainder())
                .column(Column::auto())
                .body(|mut body| {
                    for overlay in plotter.overlays().iter() {
                        body.row(18.0, |mut row| {
                            row.col(|ui| {
                                ui.label(
                                    RichText::new(&overlay.spectrum.label)
                                        .color(overlay.spectrum.color),
                                );
                            });
                            row.col(|ui| {
                                if ui.small_button("✖").clicked() {
                                    remove = Some(overlay.key);
                                }
                            });
                        });
                    }
                });
        });
    if let Some(key) = remove {
        plotter.remove_overlay(key);
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            let can_export = state.heatmap.is_some();
            if ui
                .add_enabled(can_export, egui::Button::new("Export heatmap PNG…"))
                .clicked()
            {
                export_heatmap_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(plotter) = &state.plotter {
            let (lo, hi) = plotter.color_range();
            ui.label(format!(
                "{}  ·  colour range {lo:.3} … {hi:.3}",
                plotter.colormap().label()
            ));
        }

        if let Some(msg) = &state.status_message {
            let color = if msg.starts_with("Error") {
                Color32::RED
            } else {
                Color32::GRAY
            };
            ui.label(RichText::new(msg).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open scan data")
        .add_filter("Supported files", &["json", "csv", "parquet", "pq"])
        .add_filter("JSON", &["json"])
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.open_path(&path, None);
    }
}

fn export_heatmap_dialog(state: &mut AppState) {
    let Some(heatmap) = &state.heatmap else {
        return;
    };
    let file = rfd::FileDialog::new()
        .set_title("Export heatmap")
        .add_filter("PNG", &["png"])
        .set_file_name("heatmap.png")
        .save_file();

    if let Some(path) = file {
        state.status_message = Some(match heatmap.save_png(&path) {
            Ok(()) => format!("Saved {}", path.display()),
            Err(e) => {
                log::error!("Heatmap export failed: {e:#}");
                format!("Error: {e:#}")
            }
        });
    }
}
