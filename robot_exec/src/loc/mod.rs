//! # Localisation module
//!
//! This module provides the robot with an estimate of where it is on the
//! field. The [`PoseEstimator`] integrates per-cycle wheel travel using
//! differential-drive forward kinematics. Heading is either integrated from
//! the difference in wheel travel or, when a gyro is fitted, taken directly
//! from the absolute heading sensor which avoids integration drift.
//!
//! Frame conventions: X and Y in inches on the field, heading in degrees
//! from the field +X axis, positive counter-clockwise, always wrapped into
//! [-180, 180).

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

pub use params::{HeadingSource, LocParams};
pub use state::PoseEstimator;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use util::maths::wrap_deg;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The pose (position and heading on the field) of the robot.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position on the field
    ///
    /// Units: inches
    pub position_in: Vector2<f64>,

    /// Heading from the field +X axis, counter-clockwise positive, in
    /// [-180, 180).
    ///
    /// Units: degrees
    pub heading_deg: f64,
}

/// Raw sensor data for one control cycle.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorFrame {
    /// Count of the cycle the frame was sampled on. Must increase from one frame to the next.
    pub cycle: u64,

    /// Linear travel of the left side since the previous frame.
    ///
    /// Units: inches
    pub left_delta_in: f64,

    /// Linear travel of the right side since the previous frame.
    ///
    /// Units: inches
    pub right_delta_in: f64,

    /// Absolute heading reading from the gyro, if one is fitted.
    ///
    /// Units: degrees
    pub heading_deg: Option<f64>,
}

/// Status report for a single localisation update.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct LocStatusReport {
    /// The fault which caused this cycle's update to be skipped, if any.
    pub sensor_fault: Option<SensorFault>,

    /// Number of consecutive cycles which have been skipped due to faults.
    pub num_consec_faults: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A sensor reading which cannot be trusted. The update for that cycle is
/// skipped and the last good pose retained.
#[derive(Debug, Copy, Clone, PartialEq, thiserror::Error)]
pub enum SensorFault {
    #[error("Wheel deltas are not finite (left: {left}, right: {right})")]
    NonFiniteWheelDelta { left: f64, right: f64 },

    #[error("Wheel deltas (left: {left}, right: {right}) exceed the plausible limit of {limit} in")]
    WheelDeltaOutOfRange { left: f64, right: f64, limit: f64 },

    #[error("Heading reading is not finite ({0})")]
    NonFiniteHeading(f64),

    #[error("Heading source is the sensor but no heading was provided")]
    MissingHeading,

    #[error("Frame from cycle {cycle} is stale, already consumed a frame from cycle {last}")]
    StaleFrame { cycle: u64, last: u64 },
}

/// Errors that can occur while setting up localisation.
#[derive(Debug, thiserror::Error)]
pub enum LocError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Invalid localisation parameters: {0}")]
    InvalidParams(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    /// Create a new pose. The heading is wrapped into the canonical range.
    pub fn new(x_in: f64, y_in: f64, heading_deg: f64) -> Self {
        Self {
            position_in: Vector2::new(x_in, y_in),
            heading_deg: wrap_deg(heading_deg),
        }
    }

    pub fn x(&self) -> f64 {
        self.position_in[0]
    }

    pub fn y(&self) -> f64 {
        self.position_in[1]
    }

    /// Straight line distance to the given point.
    pub fn distance_to(&self, point_in: &Vector2<f64>) -> f64 {
        (point_in - self.position_in).norm()
    }

    /// Field heading (degrees, wrapped) of the line from this pose to the
    /// given point.
    pub fn bearing_to(&self, point_in: &Vector2<f64>) -> f64 {
        let d = point_in - self.position_in;
        wrap_deg(d[1].atan2(d[0]).to_degrees())
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

impl std::fmt::Display for Pose {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "({:.2}, {:.2}) in @ {:.2} deg",
            self.x(),
            self.y(),
            self.heading_deg
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pose_geometry() {
        let pose = Pose::new(0.0, 0.0, 0.0);
        assert_eq!(pose.distance_to(&Vector2::new(30.0, 40.0)), 50.0);
        assert_eq!(pose.bearing_to(&Vector2::new(10.0, 0.0)), 0.0);
        assert!((pose.bearing_to(&Vector2::new(0.0, 48.0)) - 90.0).abs() < 1e-9);
        assert!((pose.bearing_to(&Vector2::new(0.0, -5.0)) + 90.0).abs() < 1e-9);

        // Directly behind along -X is a half turn, which stays in range
        let behind = pose.bearing_to(&Vector2::new(-36.0, 0.0));
        assert!(behind >= -180.0 && behind < 180.0);
        assert!((behind.abs() - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_pose_new_wraps() {
        assert_eq!(Pose::new(1.0, 2.0, 540.0).heading_deg, -180.0);
        assert_eq!(Pose::new(1.0, 2.0, -450.0).heading_deg, -90.0);
        assert_eq!(Pose::default(), Pose::new(0.0, 0.0, 0.0));
    }
}
