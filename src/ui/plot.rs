use eframe::egui::{Id, Ui};
use egui_plot::{HLine, Legend, Line, Plot, PlotBounds, PlotImage, PlotPoint, PlotPoints};

use crate::plotter::REFERENCE_ALPHA;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Scan plot (central panel): heatmap above, selected spectra below
// ---------------------------------------------------------------------------

/// Render both linked panels.
pub fn scan_plot(ui: &mut Ui, state: &mut AppState) {
    let AppState {
        plotter,
        heatmap,
        texture,
        ..
    } = state;
    let Some(plotter) = plotter.as_mut() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a scan to view it  (File → Open…)");
        });
        return;
    };

    let options = plotter.options().clone();
    ui.vertical_centered(|ui: &mut Ui| {
        ui.heading(&options.title);
    });

    let panel_height = (ui.available_height() - ui.spacing().item_spacing.y) / 2.0;
    let link = Id::new("scan_x_axis");

    // ---- Heatmap ----
    let heat = Plot::new("scan_heatmap")
        .height(panel_height)
        .link_axis(link, [true, false])
        .y_axis_label(options.ylabel.clone())
        .allow_boxed_zoom(true)
        .show(ui, |plot_ui| {
            if let (Some(tex), Some(img)) = (texture.as_ref(), heatmap.as_ref()) {
                let [cx, cy] = img.center();
                plot_ui.image(PlotImage::new(tex.id(), PlotPoint::new(cx, cy), img.size()));
            }
            for overlay in plotter.overlays().iter() {
                plot_ui.hline(
                    HLine::new(overlay.reference.y)
                        .color(overlay.reference.color.gamma_multiply(REFERENCE_ALPHA))
                        .width(1.5),
                );
            }
        });

    if heat.response.clicked() {
        if let Some(pos) = heat.response.interact_pointer_pos() {
            let value = heat.transform.value_from_position(pos);
            plotter.click(value.y);
        }
    }

    // ---- Spectra ----
    let reset = plotter.take_view_reset();
    let (min, max) = plotter.spectrum_bounds();

    Plot::new("scan_spectra")
        .height(panel_height)
        .link_axis(link, [true, false])
        .legend(Legend::default())
        .x_axis_label(options.xlabel.clone())
        .y_axis_label(options.ilabel.clone())
        .allow_boxed_zoom(true)
        .show(ui, |plot_ui| {
            if reset {
                plot_ui.set_plot_bounds(PlotBounds::from_min_max(min, max));
            }
            for overlay in plotter.overlays().iter() {
                let points = PlotPoints::from(overlay.spectrum.points.clone());
                plot_ui.line(
                    Line::new(points)
                        .name(&overlay.spectrum.label)
                        .color(overlay.spectrum.color)
                        .width(1.5),
                );
            }
        });
}
