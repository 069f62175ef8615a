use eframe::egui;

use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct ScanViewerApp {
    pub state: AppState,
}

impl ScanViewerApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for ScanViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Keyboard: shift / u drive the click protocol ----
        let typing = ctx.wants_keyboard_input();
        ctx.input(|input| self.state.handle_keys(input, typing));

        self.state.ensure_texture(ctx);

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: sweep + overlays ----
        egui::SidePanel::left("scan_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: heatmap + spectra ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::scan_plot(ui, &mut self.state);
        });
    }
}
