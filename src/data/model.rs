use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Region – one annotated area of the echogram
// ---------------------------------------------------------------------------

/// Depth/time extent of a region, in native file units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Upper edge (shallowest depth).
    pub min_depth: f64,
    /// Lower edge (deepest depth).
    pub max_depth: f64,
    pub start_time: f64,
    pub end_time: f64,
}

/// One categorical tag attached to a region.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryAssignment {
    pub category_name: String,
    /// Not validated: proportions of a region may sum to anything.
    pub proportion: f64,
}

/// Ragged mask geometry of a single region.
///
/// `times[i]` is the timestamp of ping `i` and `depths[i]` its flattened
/// `(start, stop, start, stop, ...)` depth list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaskGeometry {
    pub times: Vec<f64>,
    pub depths: Vec<Vec<f64>>,
}

impl MaskGeometry {
    /// Number of pings in the mask.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: i64,
    pub name: String,
    /// Raw enumeration code as stored in the file.
    pub type_code: i64,
    /// Label resolved through the inverted enumeration table.
    pub type_name: String,
    pub categories: Vec<CategoryAssignment>,
    pub bounding_box: BoundingBox,
    pub mask: MaskGeometry,
}

impl Region {
    /// The first category assigned to the region, if any.
    pub fn primary_category(&self) -> Option<&CategoryAssignment> {
        self.categories.first()
    }
}

// ---------------------------------------------------------------------------
// File-level context
// ---------------------------------------------------------------------------

/// Unit and calendar strings of the file. Used for labels only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Units {
    pub depth: String,
    pub time: String,
    pub calendar: String,
}

/// Sound speed the interpretation was made with.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundSpeed {
    pub value: f64,
    pub units: String,
}

impl fmt::Display for SoundSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.units)
    }
}

// ---------------------------------------------------------------------------
// Survey – the decoded file, shared by every output
// ---------------------------------------------------------------------------

/// Everything decoded from one interpretation group.
#[derive(Debug, Clone)]
pub struct Survey {
    /// File the survey was read from; image output is written beside it.
    pub source: PathBuf,
    pub regions: Vec<Region>,
    pub units: Units,
    pub sound_speed: SoundSpeed,
}

impl Survey {
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Total number of pings across all region masks.
    pub fn ping_count(&self) -> usize {
        self.regions.iter().map(|r| r.mask.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Ping records – transform output, the LSSS school-mask wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthRange {
    pub min: f64,
    pub max: f64,
}

/// One ping of a school mask as LSSS expects it:
/// `{"pingNumber": 54001, "depthRanges": [{"min": 30.6, "max": 34.1}]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingRecord {
    pub ping_number: i64,
    pub depth_ranges: Vec<DepthRange>,
}
