use std::collections::BTreeSet;

use eframe::egui::Color32;

use crate::color::{TypeColors, MASK_COLOR};
use crate::data::model::Survey;

/// Line width of mask segments, in points.
pub const SEGMENT_WIDTH: f32 = 4.0;

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

/// One depth range of one ping, drawn as a vertical line at the ping time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub region_id: i64,
    pub time: f64,
    pub start: f64,
    pub stop: f64,
}

/// Text anchored at a point, drawn above and to the right of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub time: f64,
    pub depth: f64,
    pub text: String,
}

/// A region's bounding box and its label.
#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    pub region_id: i64,
    pub type_name: String,
    /// Closed polyline as `[time, depth]` points.
    pub points: [[f64; 2]; 5],
    pub color: Color32,
    pub label: Label,
}

/// Data-space extent of a scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub time_min: f64,
    pub time_max: f64,
    pub depth_min: f64,
    pub depth_max: f64,
}

impl Bounds {
    fn include(&mut self, time: f64, depth: f64) {
        self.time_min = self.time_min.min(time);
        self.time_max = self.time_max.max(time);
        self.depth_min = self.depth_min.min(depth);
        self.depth_max = self.depth_max.max(depth);
    }

    /// Grow each span by `fraction` of itself on both sides.
    pub fn with_margin(self, fraction: f64) -> Self {
        let dt = (self.time_max - self.time_min) * fraction;
        let dd = (self.depth_max - self.depth_min) * fraction;
        Bounds {
            time_min: self.time_min - dt,
            time_max: self.time_max + dt,
            depth_min: self.depth_min - dd,
            depth_max: self.depth_max + dd,
        }
    }

    /// Widen zero-length spans so axis mappings stay finite.
    fn padded(mut self) -> Self {
        if self.time_max - self.time_min <= f64::EPSILON {
            self.time_min -= 0.5;
            self.time_max += 0.5;
        }
        if self.depth_max - self.depth_min <= f64::EPSILON {
            self.depth_min -= 0.5;
            self.depth_max += 0.5;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Scene – backend-neutral description of the plot
// ---------------------------------------------------------------------------

/// Everything both plot backends draw. Depth increases downward.
#[derive(Debug, Clone)]
pub struct Scene {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub segments: Vec<Segment>,
    pub outlines: Vec<Outline>,
    pub colors: TypeColors,
}

impl Scene {
    pub fn from_survey(survey: &Survey) -> Self {
        let type_names: BTreeSet<String> =
            survey.regions.iter().map(|r| r.type_name.clone()).collect();
        let colors = TypeColors::new(&type_names);

        let mut segments = Vec::new();
        for region in &survey.regions {
            for (&time, depths) in region.mask.times.iter().zip(&region.mask.depths) {
                // A trailing unpaired value is dropped here; the transform reports it.
                for pair in depths.chunks_exact(2) {
                    segments.push(Segment {
                        region_id: region.id,
                        time,
                        start: pair[0],
                        stop: pair[1],
                    });
                }
            }
        }

        let outlines = survey
            .regions
            .iter()
            .map(|region| {
                let bb = &region.bounding_box;
                Outline {
                    region_id: region.id,
                    type_name: region.type_name.clone(),
                    points: [
                        [bb.start_time, bb.max_depth],
                        [bb.end_time, bb.max_depth],
                        [bb.end_time, bb.min_depth],
                        [bb.start_time, bb.min_depth],
                        [bb.start_time, bb.max_depth],
                    ],
                    color: colors.color_for(&region.type_name),
                    label: Label {
                        time: bb.start_time,
                        depth: bb.min_depth,
                        text: format!("ID: {} ({})", region.id, region.type_name),
                    },
                }
            })
            .collect();

        Scene {
            title: format!("Using c= {}", survey.sound_speed),
            x_label: format!("Time\n({})", survey.units.time),
            y_label: format!("Depth ({})", survey.units.depth),
            segments,
            outlines,
            colors,
        }
    }

    pub fn segment_color(&self) -> Color32 {
        MASK_COLOR
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty() && self.outlines.is_empty()
    }

    /// Extent of all segments and outlines, or `None` for an empty scene.
    pub fn bounds(&self) -> Option<Bounds> {
        let mut points = self
            .segments
            .iter()
            .flat_map(|s| [[s.time, s.start], [s.time, s.stop]])
            .chain(self.outlines.iter().flat_map(|o| o.points));

        let [t, d] = points.next()?;
        let mut bounds = Bounds {
            time_min: t,
            time_max: t,
            depth_min: d,
            depth_max: d,
        };
        for [t, d] in points {
            bounds.include(t, d);
        }
        Some(bounds.padded())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::data::decoder::tests::sample_store;
    use crate::data::decoder::RegionDecoder;

    fn scene() -> Scene {
        let survey = RegionDecoder::new()
            .decode(&sample_store(), Path::new("demo_mask.json"))
            .unwrap();
        Scene::from_survey(&survey)
    }

    #[test]
    fn one_segment_per_depth_pair() {
        let scene = scene();
        assert_eq!(scene.segments.len(), 3);
        assert_eq!(
            scene.segments[2],
            Segment {
                region_id: 1,
                time: 200000.0,
                start: 70.0,
                stop: 90.0
            }
        );
    }

    #[test]
    fn outlines_close_and_carry_labels() {
        let scene = scene();
        assert_eq!(scene.outlines.len(), 2);
        let o = &scene.outlines[0];
        assert_eq!(o.points[0], o.points[4]);
        assert_eq!(o.label.text, "ID: 1 (TRACKING)");
        assert_eq!((o.label.time, o.label.depth), (100000.0, 10.0));
        assert_eq!(scene.outlines[1].label.text, "ID: 2 (EXCLUDE)");
    }

    #[test]
    fn titles_carry_units_and_sound_speed() {
        let scene = scene();
        assert_eq!(scene.title, "Using c= 1496 m/s");
        assert_eq!(scene.y_label, "Depth (m)");
        assert!(scene.x_label.starts_with("Time\n("));
    }

    #[test]
    fn bounds_cover_segments_and_boxes() {
        let b = scene().bounds().unwrap();
        assert_eq!(b.time_min, 100000.0);
        assert_eq!(b.time_max, 400000.0);
        assert_eq!(b.depth_min, 5.0);
        assert_eq!(b.depth_max, 90.0);
    }
}
