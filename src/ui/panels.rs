use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::decoder::RegionDecoder;
use crate::data::loader::load_store;
use crate::state::ViewerState;

// ---------------------------------------------------------------------------
// Left side panel – region types and region list
// ---------------------------------------------------------------------------

/// Render the left panel: type filter, label toggle and region summaries.
pub fn side_panel(ui: &mut Ui, state: &mut ViewerState) {
    ui.heading("Region types");
    ui.separator();

    let Some(scene) = &state.scene else {
        ui.label("No file loaded.");
        return;
    };

    // Clone what we need so we can mutate state inside the loop.
    let legend = scene.colors.legend_entries();

    ui.horizontal(|ui: &mut Ui| {
        if ui.small_button("All").clicked() {
            state.select_all();
        }
        if ui.small_button("None").clicked() {
            state.select_none();
        }
    });

    for (type_name, color) in &legend {
        let mut checked = state.is_type_visible(type_name);
        if ui
            .checkbox(&mut checked, RichText::new(type_name).color(*color))
            .changed()
        {
            state.toggle_type(type_name);
        }
    }

    ui.separator();
    ui.checkbox(&mut state.show_labels, "Show labels");
    ui.separator();

    let Some(survey) = &state.survey else {
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for region in &survey.regions {
                let header = format!("ID {} ({})", region.id, region.type_name);
                egui::CollapsingHeader::new(RichText::new(header).strong())
                    .id_salt(region.id)
                    .default_open(false)
                    .show(ui, |ui: &mut Ui| {
                        ui.label(format!("Name: {}", region.name));
                        ui.label(format!("Pings: {}", region.mask.len()));
                        let bb = &region.bounding_box;
                        ui.label(format!(
                            "Depth: {} – {} {}",
                            bb.min_depth, bb.max_depth, survey.units.depth
                        ));
                        for cat in &region.categories {
                            ui.label(format!("{}: {}", cat.category_name, cat.proportion));
                        }
                    });
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut ViewerState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(survey) = &state.survey {
            ui.label(format!(
                "{}: {} regions, {} visible, {} mask pings",
                survey.source.display(),
                survey.len(),
                state.visible_count(),
                survey.ping_count()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut ViewerState) {
    let file = rfd::FileDialog::new()
        .set_title("Open mask file")
        .add_filter("Survey file", &["nc", "h5", "hdf5"])
        .add_filter("JSON export", &["json"])
        .pick_file();

    if let Some(path) = file {
        let decoded = load_store(&path).and_then(|store| {
            RegionDecoder::new()
                .decode(store.as_ref(), &path)
                .map_err(anyhow::Error::from)
        });
        match decoded {
            Ok(survey) => {
                log::info!("Loaded {} regions from {}", survey.len(), path.display());
                state.set_survey(survey);
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}
