use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

/// Grey used for outlines and label backgrounds, `(0.5, 0.5, 0.5)`.
pub const REGION_GREY: Color32 = Color32::from_rgb(128, 128, 128);

/// Mask segments are drawn in black.
pub const MASK_COLOR: Color32 = Color32::BLACK;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// `n` evenly spaced hues at fixed saturation and lightness, starting at red.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    let step = 360.0 / n.max(1) as f32;
    (0..n)
        .map(|i| {
            let rgb: Srgb = Hsl::new(i as f32 * step, 0.65, 0.45).into_color();
            let rgb: Srgb<u8> = rgb.into_format();
            Color32::from_rgb(rgb.red, rgb.green, rgb.blue)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Region type → Color32
// ---------------------------------------------------------------------------

/// Maps resolved region type names to distinct outline colours.
#[derive(Debug, Clone, Default)]
pub struct TypeColors {
    mapping: BTreeMap<String, Color32>,
}

impl TypeColors {
    /// Build the mapping from the set of type names present in a survey.
    pub fn new(type_names: &BTreeSet<String>) -> Self {
        let palette = generate_palette(type_names.len());
        TypeColors {
            mapping: type_names.iter().cloned().zip(palette).collect(),
        }
    }

    /// Colour for a type name; grey for names not seen at construction.
    pub fn color_for(&self, type_name: &str) -> Color32 {
        self.mapping.get(type_name).copied().unwrap_or(REGION_GREY)
    }

    /// Legend entries (type name → colour) for the UI.
    pub fn legend_entries(&self) -> Vec<(String, Color32)> {
        self.mapping
            .iter()
            .map(|(name, c)| (name.clone(), *c))
            .collect()
    }
}
