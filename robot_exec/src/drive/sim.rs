//! Simulated drivetrain
//!
//! Integrates the commanded demands over each cycle to produce ground truth
//! and the sensor frames the real encoders and gyro would give.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::Deserialize;

// Internal
use super::{DrivePair, Drivetrain};
use crate::loc::{Pose, SensorFrame};
use util::maths::{ang_err_deg, wrap_deg};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the simulated drivetrain.
#[derive(Debug, Clone, Deserialize)]
pub struct SimParams {
    /// Distance between the left and right wheels.
    ///
    /// Units: inches
    pub track_width_in: f64,

    /// Speed of a side driven at full demand.
    ///
    /// Units: inches/second
    pub max_wheel_speed_ins: f64,

    /// If true the simulated gyro heading is included in sensor frames.
    pub gyro_fitted: bool,

    /// Offset between the gyro's zero and the field +X axis.
    ///
    /// Units: degrees
    #[serde(default)]
    pub gyro_offset_deg: f64,
}

/// A perfect (slip free) differential drivetrain.
#[derive(Debug, Clone)]
pub struct SimDrivetrain {
    params: SimParams,

    /// Demand currently applied to the motors. Held until the next write.
    demand: DrivePair,

    /// Ground truth pose of the robot.
    pose: Pose,

    left_total_in: f64,
    right_total_in: f64,
    left_base_in: f64,
    right_base_in: f64,

    last_left_delta_in: f64,
    last_right_delta_in: f64,

    /// Number of cycles simulated, stamped onto each sensor frame.
    num_cycles: u64,

    writes_this_cycle: u32,
    max_writes_per_cycle: u32,
    num_writes: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimDrivetrain {
    /// Create a new stationary drivetrain at the field origin.
    pub fn new(params: SimParams) -> Self {
        Self {
            params,
            demand: DrivePair::ZERO,
            pose: Pose::default(),
            left_total_in: 0.0,
            right_total_in: 0.0,
            left_base_in: 0.0,
            right_base_in: 0.0,
            last_left_delta_in: 0.0,
            last_right_delta_in: 0.0,
            num_cycles: 0,
            writes_this_cycle: 0,
            max_writes_per_cycle: 0,
            num_writes: 0,
        }
    }

    /// Advance the simulation by one cycle of length `dt_s`, applying the
    /// currently held demand.
    pub fn advance(&mut self, dt_s: f64) {
        let left = self.demand.left * self.params.max_wheel_speed_ins * dt_s;
        let right = self.demand.right * self.params.max_wheel_speed_ins * dt_s;

        let heading_deg = wrap_deg(
            self.pose.heading_deg + ((right - left) / self.params.track_width_in).to_degrees(),
        );
        let mid_rad = (self.pose.heading_deg
            + 0.5 * ang_err_deg(heading_deg, self.pose.heading_deg))
        .to_radians();

        self.pose = Pose {
            position_in: self.pose.position_in
                + 0.5 * (left + right) * Vector2::new(mid_rad.cos(), mid_rad.sin()),
            heading_deg,
        };

        self.left_total_in += left;
        self.right_total_in += right;
        self.last_left_delta_in = left;
        self.last_right_delta_in = right;

        self.num_cycles += 1;
        self.writes_this_cycle = 0;
    }

    /// Get the sensor frame for the most recently simulated cycle.
    pub fn sensor_frame(&self) -> SensorFrame {
        SensorFrame {
            cycle: self.num_cycles,
            left_delta_in: self.last_left_delta_in,
            right_delta_in: self.last_right_delta_in,
            heading_deg: if self.params.gyro_fitted {
                Some(wrap_deg(self.pose.heading_deg + self.params.gyro_offset_deg))
            }
            else {
                None
            },
        }
    }

    /// Ground truth pose.
    pub fn true_pose(&self) -> Pose {
        self.pose
    }

    /// The demand currently being applied.
    pub fn last_demand(&self) -> DrivePair {
        self.demand
    }

    pub fn writes_this_cycle(&self) -> u32 {
        self.writes_this_cycle
    }

    /// Largest number of writes seen within a single cycle.
    pub fn max_writes_per_cycle(&self) -> u32 {
        self.max_writes_per_cycle
    }

    pub fn num_writes(&self) -> u64 {
        self.num_writes
    }
}

impl Drivetrain for SimDrivetrain {
    fn drive_left_right(&mut self, left: f64, right: f64) {
        self.demand = DrivePair::new(left, right).clamped();

        self.writes_this_cycle += 1;
        self.num_writes += 1;
        self.max_writes_per_cycle = self.max_writes_per_cycle.max(self.writes_this_cycle);
    }

    fn left_displacement(&self) -> f64 {
        self.left_total_in - self.left_base_in
    }

    fn right_displacement(&self) -> f64 {
        self.right_total_in - self.right_base_in
    }

    fn reset_displacement(&mut self) {
        self.left_base_in = self.left_total_in;
        self.right_base_in = self.right_total_in;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sim(gyro_fitted: bool) -> SimDrivetrain {
        SimDrivetrain::new(SimParams {
            track_width_in: 24.0,
            max_wheel_speed_ins: 60.0,
            gyro_fitted,
            gyro_offset_deg: 15.0,
        })
    }

    #[test]
    fn test_straight_and_displacement() {
        let mut s = sim(false);
        s.drive(DrivePair::straight(0.5));

        for _ in 0..10 {
            s.advance(0.02);
        }

        assert!((s.true_pose().x() - 6.0).abs() < 1e-9);
        assert!((s.left_displacement() - 6.0).abs() < 1e-9);
        assert!((s.right_displacement() - 6.0).abs() < 1e-9);
        assert_eq!(s.sensor_frame().heading_deg, None);
        assert_eq!(s.sensor_frame().cycle, 10);

        s.reset_displacement();
        assert_eq!(s.left_displacement(), 0.0);
        s.drive(DrivePair::straight(-1.0));
        s.advance(0.02);
        assert!((s.left_displacement() + 1.2).abs() < 1e-9);
        assert!((s.sensor_frame().right_delta_in + 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_point_turn_and_gyro() {
        let mut s = sim(true);
        s.drive(DrivePair::point_turn(0.5));
        s.advance(0.02);

        // 0.6 in per side on a 24 in track
        let expected = (1.2f64 / 24.0).to_degrees();
        assert!((s.true_pose().heading_deg - expected).abs() < 1e-9);
        assert!(s.true_pose().position_in.norm() < 1e-12);

        let frame = s.sensor_frame();
        assert!((frame.heading_deg.unwrap() - (expected + 15.0)).abs() < 1e-9);
        assert!((frame.left_delta_in + 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_write_counting() {
        let mut s = sim(false);
        s.drive(DrivePair::straight(2.0));
        assert_eq!(s.last_demand(), DrivePair::straight(1.0));
        assert_eq!(s.writes_this_cycle(), 1);

        s.advance(0.02);
        assert_eq!(s.writes_this_cycle(), 0);

        s.drive(DrivePair::ZERO);
        s.drive(DrivePair::ZERO);
        assert_eq!(s.max_writes_per_cycle(), 2);
        assert_eq!(s.num_writes(), 3);
    }
}
