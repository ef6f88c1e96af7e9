use std::collections::BTreeSet;

use crate::data::model::Survey;
use crate::ui::scene::Scene;

// ---------------------------------------------------------------------------
// Viewer state
// ---------------------------------------------------------------------------

/// The full viewer state, independent of rendering.
pub struct ViewerState {
    /// Decoded survey (None until a file is loaded).
    pub survey: Option<Survey>,

    /// Plot primitives built from `survey`.
    pub scene: Option<Scene>,

    /// Region types currently drawn. Empty means nothing is drawn.
    pub visible_types: BTreeSet<String>,

    /// Whether region labels are drawn.
    pub show_labels: bool,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self {
            survey: None,
            scene: None,
            visible_types: BTreeSet::new(),
            show_labels: true,
            status_message: None,
        }
    }
}

impl ViewerState {
    pub fn new(survey: Survey) -> Self {
        let mut state = Self::default();
        state.set_survey(survey);
        state
    }

    /// Ingest a newly decoded survey and show every region type.
    pub fn set_survey(&mut self, survey: Survey) {
        let scene = Scene::from_survey(&survey);
        self.visible_types = all_types(&scene);
        self.scene = Some(scene);
        self.survey = Some(survey);
        self.status_message = None;
    }

    pub fn is_type_visible(&self, type_name: &str) -> bool {
        self.visible_types.contains(type_name)
    }

    /// Whether the region with `id` passes the type filter.
    pub fn is_region_visible(&self, id: i64) -> bool {
        self.survey
            .as_ref()
            .and_then(|s| s.regions.iter().find(|r| r.id == id))
            .is_some_and(|r| self.is_type_visible(&r.type_name))
    }

    pub fn toggle_type(&mut self, type_name: &str) {
        if !self.visible_types.remove(type_name) {
            self.visible_types.insert(type_name.to_string());
        }
    }

    pub fn select_all(&mut self) {
        if let Some(scene) = &self.scene {
            self.visible_types = all_types(scene);
        }
    }

    pub fn select_none(&mut self) {
        self.visible_types.clear();
    }

    /// Number of regions passing the type filter.
    pub fn visible_count(&self) -> usize {
        self.survey.as_ref().map_or(0, |s| {
            s.regions
                .iter()
                .filter(|r| self.is_type_visible(&r.type_name))
                .count()
        })
    }
}

fn all_types(scene: &Scene) -> BTreeSet<String> {
    scene.outlines.iter().map(|o| o.type_name.clone()).collect()
}
