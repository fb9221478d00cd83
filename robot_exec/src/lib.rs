//! # Robot library.
//!
//! This library contains the autonomous navigation core of the robot: localisation, the
//! drivetrain interface, motion commands and the routine sequencer. The `robot_exec` binary runs
//! it in a fixed-period control loop.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Autonomy module - motion commands, routines and the command sequencer
pub mod auto;

/// Global data store of the executable
pub mod data_store;

/// Drivetrain module - actuation interface and a simulated drivetrain
pub mod drive;

/// Localisation module - provides the robot with an idea of where it is on the field
pub mod loc;
