//! # Command sequencer
//!
//! The [`Sequencer`] runs an autonomous [`Routine`] one motion command at a time, in declared
//! order. It is stepped once per control cycle and is the only writer of the drivetrain while a
//! routine is active, issuing exactly one demand per step.
//!
//! Modes of execution:
//!
//! - `Idle` - No routine has been started.
//! - `Running(i)` - Command `i` is live and stepped every cycle.
//! - `Advancing(i)` - Command `i - 1` has just finished, command `i` is built and started on the
//!   next step so that two commands never actuate in the same cycle.
//! - `Done` - All commands have finished, the cursor is past the last command.
//! - `Canceled(i)` - The routine was cancelled while at command `i`. Not resumable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::mem;

use log::{debug, info, warn};
use serde::Serialize;

use super::{
    motion::{CycleContext, Motion, MotionStatus},
    AutoParams, AutoParamsError, Routine,
};
use crate::{
    drive::{DrivePair, Drivetrain},
    loc::{Pose, PoseEstimator},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Command sequencer
pub struct Sequencer {
    params: AutoParams,

    /// The routine being (or last) executed.
    routine: Option<Routine>,

    /// Executing mode
    mode: SeqMode,

    /// Set by [`Sequencer::cancel`] and observed at the start of the next step.
    cancel_requested: bool,

    /// Indexes of the commands which timed out.
    timed_out: Vec<usize>,

    /// Number of steps since the routine was started.
    num_cycles: u64,
}

/// Summary of the sequencer's progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeqReport {
    pub routine: Option<String>,
    pub state: SeqState,
    pub cursor: usize,
    pub num_cmds: usize,
    pub timed_out: Vec<usize>,
    pub num_cycles: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Public view of the sequencer's mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SeqState {
    Idle,
    Running(usize),
    Advancing(usize),
    Done,
    Canceled(usize),
}

#[derive(Debug)]
enum SeqMode {
    Idle,
    Running { index: usize, cmd: Box<dyn Motion> },
    Advancing { index: usize },
    Done,
    Canceled { index: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum SeqError {
    /// A routine is already running. It must finish or be cancelled before a new one is started.
    #[error("Attempted to start a routine while one is already active")]
    AlreadyRunning,

    #[error("Invalid autonomy parameters: {0}")]
    InvalidParams(AutoParamsError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Sequencer {
    /// Create an idle sequencer. The parameters are validated so that every command built from
    /// them is able to finish.
    pub fn new(params: AutoParams) -> Result<Self, SeqError> {
        params.validate().map_err(SeqError::InvalidParams)?;

        Ok(Self {
            params,
            routine: None,
            mode: SeqMode::Idle,
            cancel_requested: false,
            timed_out: Vec::new(),
            num_cycles: 0,
        })
    }

    /// Start executing the given routine.
    ///
    /// The pose estimator is zeroed and the first command is built and started immediately, it
    /// will be stepped on the next call to [`Sequencer::step`].
    pub fn start(
        &mut self,
        routine: Routine,
        loc: &mut PoseEstimator,
        drive: &mut dyn Drivetrain,
    ) -> Result<(), SeqError> {
        if self.is_active() {
            return Err(SeqError::AlreadyRunning);
        }

        info!(
            "Starting routine \"{}\" with {} commands",
            routine.name(),
            routine.len()
        );

        loc.zero();

        let mut cmd = routine.cmds()[0].build(&self.params);
        cmd.start(drive);
        debug!("Command 0 ({}) started", cmd.name());

        self.routine = Some(routine);
        self.mode = SeqMode::Running { index: 0, cmd };
        self.cancel_requested = false;
        self.timed_out.clear();
        self.num_cycles = 0;

        Ok(())
    }

    /// Step the sequencer, issuing this cycle's demand to the drivetrain.
    ///
    /// While a routine is active exactly one demand is written per call. Nothing is written when
    /// idle, done or cancelled.
    pub fn step(&mut self, pose: &Pose, drive: &mut dyn Drivetrain) -> SeqState {
        if !self.is_active() {
            self.cancel_requested = false;
            return self.state();
        }

        self.num_cycles += 1;

        // Cancellation is observed before any command runs
        if self.cancel_requested {
            self.cancel_requested = false;
            drive.drive(DrivePair::ZERO);

            let index = self.cursor();
            warn!("Routine cancelled at command {}", index);
            self.mode = SeqMode::Canceled { index };

            return self.state();
        }

        let (index, mut cmd) = match mem::replace(&mut self.mode, SeqMode::Idle) {
            SeqMode::Running { index, cmd } => (index, cmd),
            SeqMode::Advancing { index } => match self.routine.as_ref().map(|r| r.cmds()) {
                Some(cmds) if index < cmds.len() => {
                    let mut cmd = cmds[index].build(&self.params);
                    cmd.start(drive);
                    debug!("Command {} ({}) started", index, cmd.name());
                    (index, cmd)
                }
                _ => {
                    warn!("No command at index {} to advance to, stopping", index);
                    drive.drive(DrivePair::ZERO);
                    self.mode = SeqMode::Done;
                    return self.state();
                }
            },
            // Inactive modes were handled above
            other => {
                self.mode = other;
                return self.state();
            }
        };

        let ctx = CycleContext {
            pose: *pose,
            left_displacement_in: drive.left_displacement(),
            right_displacement_in: drive.right_displacement(),
        };
        let out = cmd.step(&ctx);

        if !out.status.is_done() {
            drive.drive(out.demand);
            self.mode = SeqMode::Running { index, cmd };
            return self.state();
        }

        drive.drive(DrivePair::ZERO);

        match out.status {
            MotionStatus::TimedOut => {
                warn!("Command {} ({}) timed out at {}", index, cmd.name(), pose);
                self.timed_out.push(index);
            }
            _ => info!("Command {} ({}) finished at {}", index, cmd.name(), pose),
        }

        let next = index + 1;
        self.mode = if next < self.num_cmds() {
            SeqMode::Advancing { index: next }
        }
        else {
            info!("Routine complete after {} cycles", self.num_cycles);
            SeqMode::Done
        };

        self.state()
    }

    /// Request cancellation of the active routine.
    ///
    /// The request is observed at the start of the next step, which stops the drivetrain.
    pub fn cancel(&mut self) {
        if self.is_active() {
            info!("Routine cancel requested");
            self.cancel_requested = true;
        }
    }

    /// True once the routine has completed or been cancelled.
    pub fn is_finished(&self) -> bool {
        matches!(self.mode, SeqMode::Done | SeqMode::Canceled { .. })
    }

    /// True while a routine is running or advancing.
    pub fn is_active(&self) -> bool {
        matches!(self.mode, SeqMode::Running { .. } | SeqMode::Advancing { .. })
    }

    /// Index of the current command. Equal to the routine length once done.
    pub fn cursor(&self) -> usize {
        match self.mode {
            SeqMode::Idle => 0,
            SeqMode::Running { index, .. } => index,
            SeqMode::Advancing { index } => index,
            SeqMode::Canceled { index } => index,
            SeqMode::Done => self.num_cmds(),
        }
    }

    pub fn state(&self) -> SeqState {
        match self.mode {
            SeqMode::Idle => SeqState::Idle,
            SeqMode::Running { index, .. } => SeqState::Running(index),
            SeqMode::Advancing { index } => SeqState::Advancing(index),
            SeqMode::Done => SeqState::Done,
            SeqMode::Canceled { index } => SeqState::Canceled(index),
        }
    }

    pub fn report(&self) -> SeqReport {
        SeqReport {
            routine: self.routine.as_ref().map(|r| r.name().to_string()),
            state: self.state(),
            cursor: self.cursor(),
            num_cmds: self.num_cmds(),
            timed_out: self.timed_out.clone(),
            num_cycles: self.num_cycles,
        }
    }

    fn num_cmds(&self) -> usize {
        self.routine.as_ref().map(|r| r.len()).unwrap_or(0)
    }
}
