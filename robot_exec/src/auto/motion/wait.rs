//! Wait command

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use util::time::seconds_to_cycles;

use super::{CycleContext, Motion, MotionOutput, MotionStatus, Settler, Tolerances};
use crate::drive::Drivetrain;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Hold the drivetrain stopped for a fixed number of cycles.
#[derive(Debug, Clone)]
pub struct Wait {
    num_cycles: u32,
    settler: Settler,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Wait {
    /// Wait for `duration_s`, rounded up to a whole number of cycles.
    pub fn new(duration_s: f64, cycle_period_s: f64) -> Self {
        let num_cycles = seconds_to_cycles(duration_s, cycle_period_s);

        Self {
            num_cycles,
            settler: Settler::new(Tolerances::new(num_cycles, None)),
        }
    }
}

impl Motion for Wait {
    fn name(&self) -> &'static str {
        "Wait"
    }

    fn start(&mut self, _drive: &mut dyn Drivetrain) {
        debug!("Waiting for {} cycles", self.num_cycles);
    }

    fn step(&mut self, _ctx: &CycleContext) -> MotionOutput {
        MotionOutput::stopped(self.settler.check(true))
    }

    fn status(&self) -> MotionStatus {
        self.settler.status()
    }
}
