//! # Drivetrain module
//!
//! Defines the boundary between the autonomy core and the drivetrain
//! hardware. The core commands normalised left/right demands and reads back
//! the linear distance each side has travelled since the last reset. Motor
//! ports, inversion and encoder scaling live behind the [`Drivetrain`] trait.
//!
//! A simulated implementation, [`SimDrivetrain`], is provided for running
//! routines off-robot.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod sim;

pub use sim::{SimDrivetrain, SimParams};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;
use util::maths::clamp;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A pair of normalised drive demands, one per side of the drivetrain.
///
/// Each side is in the range [-1, 1], positive driving that side forwards.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DrivePair {
    pub left: f64,
    pub right: f64,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// The actuation interface of a differential drivetrain.
pub trait Drivetrain {
    /// Command the left and right sides. Values are normalised to [-1, 1].
    fn drive_left_right(&mut self, left: f64, right: f64);

    /// Linear distance travelled by the left side since the last reset.
    ///
    /// Units: inches
    fn left_displacement(&self) -> f64;

    /// Linear distance travelled by the right side since the last reset.
    ///
    /// Units: inches
    fn right_displacement(&self) -> f64;

    /// Zero both displacement readings.
    fn reset_displacement(&mut self);

    /// Issue a demand pair, saturated to the valid range.
    fn drive(&mut self, demand: DrivePair) {
        let demand = demand.clamped();
        self.drive_left_right(demand.left, demand.right);
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DrivePair {
    /// Both sides stopped.
    pub const ZERO: DrivePair = DrivePair { left: 0.0, right: 0.0 };

    pub fn new(left: f64, right: f64) -> Self {
        Self { left, right }
    }

    /// Both sides at the same speed. Negative speeds drive backwards.
    pub fn straight(speed: f64) -> Self {
        Self {
            left: speed,
            right: speed,
        }
    }

    /// Turn on the spot.
    ///
    /// Follows the right hand rule about the robot's upwards axis, so a
    /// positive rate turns counter-clockwise (left side backwards, right side
    /// forwards) and a negative rate turns clockwise.
    pub fn point_turn(rate: f64) -> Self {
        Self {
            left: -rate,
            right: rate,
        }
    }

    /// Saturate both sides to [-1, 1]. Non-finite demands become zero.
    pub fn clamped(self) -> Self {
        let sat = |d: f64| {
            if d.is_finite() {
                clamp(&d, &-1.0, &1.0)
            }
            else {
                0.0
            }
        };

        Self {
            left: sat(self.left),
            right: sat(self.right),
        }
    }

    /// True if neither side is being driven.
    pub fn is_zero(&self) -> bool {
        self.left == 0.0 && self.right == 0.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_drive_pair() {
        assert_eq!(DrivePair::straight(0.5), DrivePair::new(0.5, 0.5));
        assert_eq!(DrivePair::straight(-0.25), DrivePair::new(-0.25, -0.25));
        assert_eq!(DrivePair::point_turn(0.5), DrivePair::new(-0.5, 0.5));
        assert_eq!(DrivePair::point_turn(-0.5), DrivePair::new(0.5, -0.5));
        assert!(DrivePair::ZERO.is_zero());
        assert!(!DrivePair::point_turn(0.1).is_zero());
    }

    #[test]
    fn test_clamped() {
        assert_eq!(DrivePair::new(1.5, -2.0).clamped(), DrivePair::new(1.0, -1.0));
        assert_eq!(DrivePair::new(0.3, -0.3).clamped(), DrivePair::new(0.3, -0.3));
        assert_eq!(DrivePair::new(f64::NAN, f64::INFINITY).clamped(), DrivePair::ZERO);
    }
}
