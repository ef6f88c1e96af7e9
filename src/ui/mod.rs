//! Plot output: a backend-neutral [`scene::Scene`] drawn either into a PNG
//! ([`raster`]) or into an interactive egui window ([`plot`], [`panels`]).

pub mod panels;
pub mod plot;
pub mod raster;
pub mod scene;
