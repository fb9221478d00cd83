//! Move to position command

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use nalgebra::Vector2;
use util::maths::{ang_err_deg, clamp};

use super::{CycleContext, Motion, MotionOutput, MotionStatus, RotateToAngle, Settler, Tolerances};
use crate::{auto::MoveToParams, drive::DrivePair};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Drive to a point on the field.
///
/// The robot first turns on the spot to face the target, then drives straight towards it while
/// trimming the left/right demands in proportion to the bearing error. If the bearing error grows
/// beyond the realign threshold (for example after overshooting) the robot stops and turns to face
/// the target again.
#[derive(Debug, Clone)]
pub struct MoveToPosition {
    target_in: Vector2<f64>,
    speed: f64,
    rotate_speed: f64,
    tolerance_in: f64,
    params: MoveToParams,
    mode: MoveToMode,
    settler: Settler,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum MoveToMode {
    Aligning(RotateToAngle),
    Driving,
    Done,
}

/// Phase of a [`MoveToPosition`], without the aligner state.
#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MoveToPhase {
    Aligning,
    Driving,
    Done,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MoveToPosition {
    pub fn new(
        target_in: Vector2<f64>,
        speed: f64,
        rotate_speed: f64,
        tolerance_in: f64,
        params: MoveToParams,
        tol: Tolerances,
    ) -> Self {
        // The initial aligner is replaced on the first step once the bearing is known
        let aligner = Self::aligner(0.0, rotate_speed, &params);

        Self {
            target_in,
            speed: speed.abs(),
            rotate_speed: rotate_speed.abs(),
            tolerance_in: tolerance_in.abs(),
            params,
            mode: MoveToMode::Aligning(aligner),
            settler: Settler::new(tol),
        }
    }

    #[cfg(test)]
    fn phase(&self) -> MoveToPhase {
        match self.mode {
            MoveToMode::Aligning(_) => MoveToPhase::Aligning,
            MoveToMode::Driving => MoveToPhase::Driving,
            MoveToMode::Done => MoveToPhase::Done,
        }
    }

    fn aligner(bearing_deg: f64, rotate_speed: f64, params: &MoveToParams) -> RotateToAngle {
        RotateToAngle::new(
            bearing_deg,
            rotate_speed,
            params.align_tolerance_deg,
            Tolerances::new(1, None),
        )
    }

    /// Straight drive with differential trim towards the bearing.
    fn drive_demand(&self, err_deg: f64) -> DrivePair {
        let trim = clamp(
            &(self.params.trim_gain_per_deg * err_deg),
            &-self.params.max_trim,
            &self.params.max_trim,
        );

        DrivePair::new(self.speed - trim, self.speed + trim).clamped()
    }
}

impl Motion for MoveToPosition {
    fn name(&self) -> &'static str {
        "MoveToPosition"
    }

    fn step(&mut self, ctx: &CycleContext) -> MotionOutput {
        if self.settler.status().is_done() {
            return MotionOutput::stopped(self.settler.status());
        }

        let pose = &ctx.pose;
        let in_band = pose.distance_to(&self.target_in) <= self.tolerance_in;
        let status = self.settler.check(in_band);

        if status.is_done() {
            self.mode = MoveToMode::Done;
            return MotionOutput::stopped(status);
        }
        if in_band {
            return MotionOutput::running(DrivePair::ZERO);
        }

        let bearing_deg = pose.bearing_to(&self.target_in);

        if let MoveToMode::Aligning(ref mut aligner) = self.mode {
            aligner.retarget(bearing_deg);
            let out = aligner.step(ctx);

            if out.status != MotionStatus::Finished {
                return MotionOutput::running(out.demand);
            }

            debug!("Aligned with target at {:.2} deg, driving", bearing_deg);
            self.mode = MoveToMode::Driving;
        }

        let err_deg = ang_err_deg(bearing_deg, pose.heading_deg);

        if err_deg.abs() > self.params.realign_threshold_deg {
            debug!(
                "Bearing error of {:.2} deg exceeds the realign threshold, realigning",
                err_deg
            );
            self.mode = MoveToMode::Aligning(Self::aligner(
                bearing_deg,
                self.rotate_speed,
                &self.params,
            ));
            return MotionOutput::running(DrivePair::ZERO);
        }

        MotionOutput::running(self.drive_demand(err_deg))
    }

    fn status(&self) -> MotionStatus {
        self.settler.status()
    }
}
