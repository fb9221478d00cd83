//! # Motion commands
//!
//! A motion command is a single closed-loop manoeuvre. It is stepped once per control cycle with
//! a [`CycleContext`] holding the latest pose and wheel displacements, and returns the demand to
//! apply this cycle along with its completion status. Commands never write to the drivetrain
//! themselves (outside of their start hook), the [`Sequencer`](super::seq::Sequencer) issues the
//! demand on their behalf.
//!
//! Available commands:
//!
//! - [`RotateToAngle`] - bang-bang point turn onto an absolute heading.
//! - [`MoveToPosition`] - align with a target point then drive to it with heading trim.
//! - [`MoveByDistance`] - drive straight for a signed distance measured by the wheels.
//! - [`Wait`] - hold still for a fixed duration.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod move_by;
mod move_to;
mod rotate;
mod settle;
mod wait;

pub use move_by::MoveByDistance;
pub use move_to::MoveToPosition;
pub use rotate::RotateToAngle;
pub use settle::{Settler, Tolerances};
pub use wait::Wait;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;

use crate::{
    drive::{DrivePair, Drivetrain},
    loc::Pose,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Snapshot of everything a motion command may read in one cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleContext {
    pub pose: Pose,

    /// Left side travel since the drivetrain displacement was last reset.
    ///
    /// Units: inches
    pub left_displacement_in: f64,

    /// Right side travel since the drivetrain displacement was last reset.
    ///
    /// Units: inches
    pub right_displacement_in: f64,
}

/// Output of a single step of a motion command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionOutput {
    pub demand: DrivePair,
    pub status: MotionStatus,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Completion status of a motion command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MotionStatus {
    Running,

    /// The target was reached and held for the required number of cycles.
    Finished,

    /// The command ran out of time before reaching the target.
    TimedOut,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A closed-loop manoeuvre.
pub trait Motion: std::fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Called once by the sequencer when the command becomes live, before the first step.
    fn start(&mut self, _drive: &mut dyn Drivetrain) {}

    /// Compute this cycle's demand.
    ///
    /// Once a command reports a done status every further step must return the same status with a
    /// zero demand.
    fn step(&mut self, ctx: &CycleContext) -> MotionOutput;

    /// The latched status from the most recent step.
    fn status(&self) -> MotionStatus;
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CycleContext {
    /// Context with a pose but no wheel travel.
    pub fn from_pose(pose: Pose) -> Self {
        Self {
            pose,
            left_displacement_in: 0.0,
            right_displacement_in: 0.0,
        }
    }

    /// Mean travel of both sides, the distance the robot's centre has moved.
    pub fn mean_displacement_in(&self) -> f64 {
        0.5 * (self.left_displacement_in + self.right_displacement_in)
    }
}

impl MotionOutput {
    pub fn running(demand: DrivePair) -> Self {
        Self {
            demand,
            status: MotionStatus::Running,
        }
    }

    /// Zero output with the given status.
    pub fn stopped(status: MotionStatus) -> Self {
        Self {
            demand: DrivePair::ZERO,
            status,
        }
    }
}

impl MotionStatus {
    /// True if the command has finished, successfully or not.
    pub fn is_done(&self) -> bool {
        !matches!(self, MotionStatus::Running)
    }
}

// ------------------------------------------------------------------------------------------------
// TEST UTILITIES
// ------------------------------------------------------------------------------------------------

/// Closed-loop harness shared by the command tests.
#[cfg(test)]
pub(crate) mod harness {
    use super::*;
    use crate::drive::{SimDrivetrain, SimParams};
    use crate::loc::{HeadingSource, LocParams, PoseEstimator};
    use util::module::State;

    pub const DT_S: f64 = 0.02;

    pub struct Rig {
        pub sim: SimDrivetrain,
        pub loc: PoseEstimator,
    }

    impl Rig {
        pub fn new() -> Self {
            Self {
                sim: SimDrivetrain::new(SimParams {
                    track_width_in: 24.0,
                    max_wheel_speed_ins: 60.0,
                    gyro_fitted: false,
                    gyro_offset_deg: 0.0,
                }),
                loc: PoseEstimator::init(LocParams {
                    track_width_in: 24.0,
                    heading_source: HeadingSource::Odometry,
                    max_wheel_delta_in: 6.0,
                })
                .unwrap(),
            }
        }

        /// Run the command until it reports done or `max_cycles` pass, returning the number of
        /// cycles stepped and the final output.
        pub fn run(&mut self, cmd: &mut dyn Motion, max_cycles: usize) -> (usize, MotionOutput) {
            cmd.start(&mut self.sim);

            let mut out = MotionOutput::running(DrivePair::ZERO);
            for i in 0..max_cycles {
                self.sim.advance(DT_S);
                self.loc.update(&self.sim.sensor_frame());

                let ctx = CycleContext {
                    pose: self.loc.pose(),
                    left_displacement_in: self.sim.left_displacement(),
                    right_displacement_in: self.sim.right_displacement(),
                };
                out = cmd.step(&ctx);
                self.sim.drive(out.demand);

                if out.status.is_done() {
                    return (i + 1, out);
                }
            }

            (max_cycles, out)
        }
    }
}
