use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{MaskError, Result};
use crate::mask::calibration::{
    Calibration, DepthCorrection, LinearPingClock, DEFAULT_DEPTH_OFFSET_MAX,
    DEFAULT_DEPTH_OFFSET_MIN, DEFAULT_PING_EPOCH, DEFAULT_PING_SCALE,
};
use crate::publish::DEFAULT_BASE_URL;

/// Survey files shipped with the LSSS demo.
const DEFAULT_FILES: [&str; 5] = [
    "demo_mask.nc",
    "2007205-D20070421-T085415.nc",
    "2009107-D20090522-T040634.nc",
    "tokt2005114-D20051118-T062010.nc",
    "tokt2006101-D20060124-T030844.nc",
];

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Run configuration. Built once in `main` and passed down; every field can
/// be set from a JSON file and then overridden on the command line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// LSSS API root, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Candidate input files used when none are given on the command line.
    pub files: Vec<PathBuf>,
    pub calibration: CalibrationConfig,
    pub outputs: Outputs,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: DEFAULT_BASE_URL.to_string(),
            files: DEFAULT_FILES.iter().map(PathBuf::from).collect(),
            calibration: CalibrationConfig::default(),
            outputs: Outputs::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text).map_err(|e| match e {
            MaskError::Config(msg) => MaskError::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(text).map_err(|e| MaskError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(MaskError::Config(format!(
                "base_url must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if self.calibration.ping_scale <= 0 {
            return Err(MaskError::Config(format!(
                "ping_scale must be positive, got {}",
                self.calibration.ping_scale
            )));
        }
        Ok(())
    }
}

/// Which outputs a run produces. Each is independent of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Outputs {
    /// POST every region's mask to LSSS.
    pub publish: bool,
    /// Write `<stem>.png` next to the input file.
    pub save_image: bool,
    /// Open an interactive plot window.
    pub show: bool,
}

/// Publishing only. The viewer (`--show`) blocks until its window is closed.
impl Default for Outputs {
    fn default() -> Self {
        Outputs {
            publish: true,
            save_image: false,
            show: false,
        }
    }
}

impl Outputs {
    pub fn renders(&self) -> bool {
        self.save_image || self.show
    }

    pub fn any(&self) -> bool {
        self.publish || self.renders()
    }
}

/// Ping clock and depth offsets for the mask transform.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalibrationConfig {
    pub ping_scale: i64,
    pub ping_epoch: i64,
    pub depth_offset_min: f64,
    pub depth_offset_max: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        CalibrationConfig {
            ping_scale: DEFAULT_PING_SCALE,
            ping_epoch: DEFAULT_PING_EPOCH,
            depth_offset_min: DEFAULT_DEPTH_OFFSET_MIN,
            depth_offset_max: DEFAULT_DEPTH_OFFSET_MAX,
        }
    }
}

impl From<CalibrationConfig> for Calibration {
    fn from(c: CalibrationConfig) -> Self {
        Calibration::new(
            LinearPingClock {
                scale: c.ping_scale,
                epoch: c.ping_epoch,
            },
            DepthCorrection {
                min_offset: c.depth_offset_min,
                max_offset: c.depth_offset_max,
            },
        )
    }
}
