use eframe::egui;

use crate::data::model::Survey;
use crate::error::{MaskError, Result};
use crate::state::ViewerState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct MaskViewerApp {
    pub state: ViewerState,
}

impl MaskViewerApp {
    pub fn new(survey: Survey) -> Self {
        Self {
            state: ViewerState::new(survey),
        }
    }
}

impl eframe::App for MaskViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: region types ----
        egui::SidePanel::left("region_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: plot ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::mask_plot(ui, &self.state);
        });
    }
}

/// Open a window showing `survey` and block until it is closed.
pub fn show(survey: Survey) -> Result<()> {
    let title = format!("echomask – {}", survey.source.display());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        &title,
        options,
        Box::new(|_cc| Ok(Box::new(MaskViewerApp::new(survey)))),
    )
    .map_err(|e| MaskError::Render(format!("viewer: {e}")))
}
