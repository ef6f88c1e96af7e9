//! Mask → LSSS ping-record transform and its calibration.

pub mod calibration;
pub mod transform;

pub use calibration::{Calibration, DepthCorrection, LinearPingClock, PingClock};
pub use transform::{transform_mask, transform_region};
