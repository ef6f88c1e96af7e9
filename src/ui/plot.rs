use eframe::egui::{Align2, Color32, RichText, Ui};
use egui_plot::{Legend, Line, Plot, PlotPoint, PlotPoints, Text};

use crate::state::ViewerState;

use super::scene::SEGMENT_WIDTH;

// ---------------------------------------------------------------------------
// Mask plot (central panel)
// ---------------------------------------------------------------------------

/// Render the mask plot in the central panel.
///
/// egui_plot has no inverted axis, so depths are plotted negated and the
/// y axis labels print them back as positive values.
pub fn mask_plot(ui: &mut Ui, state: &ViewerState) {
    let scene = match &state.scene {
        Some(scene) => scene,
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Open a mask file to view regions  (File → Open…)");
            });
            return;
        }
    };

    ui.vertical_centered(|ui: &mut Ui| {
        ui.heading(&scene.title);
    });

    let label_bg = Color32::from_rgba_unmultiplied(128, 128, 128, 128);

    Plot::new("mask_plot")
        .legend(Legend::default())
        .x_axis_label(scene.x_label.clone())
        .y_axis_label(scene.y_label.clone())
        .y_axis_formatter(|mark, _range| format!("{}", -mark.value))
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for seg in scene
                .segments
                .iter()
                .filter(|s| state.is_region_visible(s.region_id))
            {
                let points: PlotPoints = [[seg.time, -seg.start], [seg.time, -seg.stop]]
                    .into_iter()
                    .collect();
                plot_ui.line(
                    Line::new(points)
                        .color(scene.segment_color())
                        .width(SEGMENT_WIDTH),
                );
            }

            for outline in scene
                .outlines
                .iter()
                .filter(|o| state.is_type_visible(&o.type_name))
            {
                let points: PlotPoints = outline.points.iter().map(|&[t, d]| [t, -d]).collect();
                plot_ui.line(
                    Line::new(points)
                        .name(&outline.type_name)
                        .color(outline.color)
                        .width(1.5),
                );

                if state.show_labels {
                    let text = RichText::new(&outline.label.text)
                        .color(Color32::BLACK)
                        .background_color(label_bg);
                    plot_ui.text(
                        Text::new(
                            PlotPoint::new(outline.label.time, -outline.label.depth),
                            text,
                        )
                        .anchor(Align2::LEFT_BOTTOM),
                    );
                }
            }
        });
}
