//! Rotate to angle command

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use util::maths::{ang_err_deg, wrap_deg};

use super::{CycleContext, Motion, MotionOutput, MotionStatus, Settler, Tolerances};
use crate::drive::DrivePair;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Point turn onto an absolute field heading.
///
/// The turn is bang-bang: the robot spins at a fixed speed in the direction of the shortest
/// signed error and stops while within tolerance. An error of exactly half a turn is always
/// resolved clockwise.
#[derive(Debug, Clone)]
pub struct RotateToAngle {
    target_deg: f64,
    speed: f64,
    tolerance_deg: f64,
    settler: Settler,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RotateToAngle {
    pub fn new(target_deg: f64, speed: f64, tolerance_deg: f64, tol: Tolerances) -> Self {
        Self {
            target_deg: wrap_deg(target_deg),
            speed: speed.abs(),
            tolerance_deg: tolerance_deg.abs(),
            settler: Settler::new(tol),
        }
    }

    /// Change the target heading without resetting the settle or timeout counters.
    pub fn retarget(&mut self, target_deg: f64) {
        self.target_deg = wrap_deg(target_deg);
    }

    /// Point turn direction for the given error, +1 counter-clockwise, -1 clockwise.
    fn direction(err_deg: f64) -> f64 {
        if err_deg >= 180.0 {
            -1.0
        }
        else {
            err_deg.signum()
        }
    }
}

impl Motion for RotateToAngle {
    fn name(&self) -> &'static str {
        "RotateToAngle"
    }

    fn step(&mut self, ctx: &CycleContext) -> MotionOutput {
        if self.settler.status().is_done() {
            return MotionOutput::stopped(self.settler.status());
        }

        let err_deg = ang_err_deg(self.target_deg, ctx.pose.heading_deg);

        let in_band = err_deg.abs() <= self.tolerance_deg;
        let status = self.settler.check(in_band);

        if status.is_done() || in_band {
            MotionOutput {
                demand: DrivePair::ZERO,
                status,
            }
        }
        else {
            MotionOutput::running(DrivePair::point_turn(self.speed * Self::direction(err_deg)))
        }
    }

    fn status(&self) -> MotionStatus {
        self.settler.status()
    }
}

#[cfg(test)]
mod test {
    use super::super::harness::{Rig, DT_S};
    use super::*;
    use crate::{drive::Drivetrain, loc::Pose};

    #[test]
    fn test_turn_direction() {
        let mut cmd = RotateToAngle::new(90.0, 0.5, 2.0, Tolerances::default());
        let out = cmd.step(&CycleContext::from_pose(Pose::new(0.0, 0.0, 0.0)));
        assert_eq!(out, MotionOutput::running(DrivePair::point_turn(0.5)));

        // Shortest way from 170 to -170 is counter-clockwise through the wrap
        let mut cmd = RotateToAngle::new(-170.0, 0.5, 2.0, Tolerances::default());
        let out = cmd.step(&CycleContext::from_pose(Pose::new(0.0, 0.0, 170.0)));
        assert_eq!(out.demand, DrivePair::point_turn(0.5));

        // Just outside the tolerance on the other side of the wrap still turns the short way
        let mut cmd = RotateToAngle::new(-178.0, 0.5, 2.0, Tolerances::default());
        let out = cmd.step(&CycleContext::from_pose(Pose::new(0.0, 0.0, 177.5)));
        assert_eq!(out.demand, DrivePair::point_turn(0.5));

        // Negative speeds are treated as magnitudes
        let mut cmd = RotateToAngle::new(-90.0, -0.5, 2.0, Tolerances::default());
        let out = cmd.step(&CycleContext::from_pose(Pose::default()));
        assert_eq!(out.demand, DrivePair::point_turn(-0.5));
    }

    #[test]
    fn test_half_turn_tie_break() {
        for target in &[180.0, -180.0] {
            let mut cmd = RotateToAngle::new(*target, 0.5, 2.0, Tolerances::default());
            let out = cmd.step(&CycleContext::from_pose(Pose::default()));
            assert_eq!(out.demand, DrivePair::point_turn(-0.5));
        }

        // Closed loop the turn must stay clockwise all the way round
        let mut rig = Rig::new();
        let mut cmd = RotateToAngle::new(180.0, 0.5, 2.0, Tolerances::default());
        cmd.start(&mut rig.sim);
        for _ in 0..200 {
            rig.sim.advance(DT_S);
            rig.loc.update(&rig.sim.sensor_frame());
            let out = cmd.step(&CycleContext::from_pose(rig.loc.pose()));
            assert!(out.demand.right <= 0.0, "turned counter-clockwise");
            rig.sim.drive(out.demand);
            if out.status.is_done() {
                break;
            }
        }

        assert_eq!(cmd.status(), MotionStatus::Finished);
        assert!(ang_err_deg(180.0, rig.loc.pose().heading_deg).abs() <= 2.0);
    }

    #[test]
    fn test_closed_loop_convergence() {
        let mut rig = Rig::new();
        let mut cmd = RotateToAngle::new(90.0, 0.5, 2.0, Tolerances::default());
        let (cycles, out) = rig.run(&mut cmd, 500);

        assert_eq!(out.status, MotionStatus::Finished);
        assert!(out.demand.is_zero());
        assert!(cycles < 50);
        assert!((rig.loc.pose().heading_deg - 90.0).abs() <= 2.0);
        assert!(rig.loc.pose().position_in.norm() < 1e-9);

        // Further steps stay latched
        let out = cmd.step(&CycleContext::from_pose(Pose::default()));
        assert_eq!(out, MotionOutput::stopped(MotionStatus::Finished));
    }

    #[test]
    fn test_settle_cycles_hold_zero_output() {
        let mut cmd = RotateToAngle::new(10.0, 0.5, 2.0, Tolerances::new(3, None));
        let ctx = CycleContext::from_pose(Pose::new(0.0, 0.0, 9.0));

        assert_eq!(cmd.step(&ctx), MotionOutput::running(DrivePair::ZERO));
        assert_eq!(cmd.step(&ctx), MotionOutput::running(DrivePair::ZERO));
        assert_eq!(cmd.step(&ctx), MotionOutput::stopped(MotionStatus::Finished));
    }

    #[test]
    fn test_timeout() {
        let mut cmd = RotateToAngle::new(90.0, 0.5, 2.0, Tolerances::new(1, Some(5)));
        let ctx = CycleContext::from_pose(Pose::default());

        for _ in 0..4 {
            assert_eq!(cmd.step(&ctx).status, MotionStatus::Running);
        }
        assert_eq!(cmd.step(&ctx), MotionOutput::stopped(MotionStatus::TimedOut));
    }
}
