//! Move by distance command

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use super::{CycleContext, Motion, MotionOutput, MotionStatus, Settler, Tolerances};
use crate::drive::{DrivePair, Drivetrain};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Drive straight for a signed distance, measured from the wheel displacement.
///
/// The drivetrain displacement is reset when the command starts. Negative distances drive
/// backwards.
#[derive(Debug, Clone)]
pub struct MoveByDistance {
    distance_in: f64,
    speed: f64,
    settler: Settler,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MoveByDistance {
    pub fn new(distance_in: f64, speed: f64, timeout_cycles: Option<u32>) -> Self {
        Self {
            distance_in,
            speed: speed.abs(),
            settler: Settler::new(Tolerances::new(1, timeout_cycles)),
        }
    }
}

impl Motion for MoveByDistance {
    fn name(&self) -> &'static str {
        "MoveByDistance"
    }

    fn start(&mut self, drive: &mut dyn Drivetrain) {
        drive.reset_displacement();
    }

    fn step(&mut self, ctx: &CycleContext) -> MotionOutput {
        if self.settler.status().is_done() {
            return MotionOutput::stopped(self.settler.status());
        }

        let reached = ctx.mean_displacement_in().abs() >= self.distance_in.abs();
        let status = self.settler.check(reached);

        if status.is_done() {
            MotionOutput::stopped(status)
        }
        else {
            MotionOutput::running(DrivePair::straight(self.speed * self.distance_in.signum()))
        }
    }

    fn status(&self) -> MotionStatus {
        self.settler.status()
    }
}
