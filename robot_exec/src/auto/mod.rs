//! # Autonomy Module
//!
//! This module provides the closed-loop autonomous driving for the robot. Motion commands
//! ([`motion`]) each perform a single manoeuvre against the current pose, and the
//! [`Sequencer`](seq::Sequencer) runs a validated [`Routine`](routine::Routine) of them one at a
//! time.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;

/// Motion commands - single closed-loop manoeuvres
pub mod motion;

/// Routine descriptors, validation and loading
pub mod routine;

/// Command sequencer - runs a routine one command at a time
pub mod seq;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use params::{AutoParams, AutoParamsError, MoveToParams};
pub use routine::{CmdSpec, Routine, RoutineBuilder, RoutineError};
pub use seq::{SeqError, SeqReport, SeqState, Sequencer};
