//! # Autonomous routines
//!
//! A [`Routine`] is a named, ordered list of [`CmdSpec`] descriptors. Routines are validated when
//! they are constructed so that a running routine never meets a malformed command. They can be
//! built in code with a [`RoutineBuilder`] or loaded from TOML files in the `routines` parameter
//! directory, for example:
//!
//! ```toml
//! name = "square_up"
//!
//! [[cmds]]
//! type = "rotate_to_angle"
//! heading_deg = 90.0
//! tolerance_deg = 2.0
//!
//! [[cmds]]
//! type = "move_to_position"
//! x_in = 0.0
//! y_in = 48.0
//! tolerance_in = 1.0
//! ```

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use util::{params::LoadError, time::seconds_to_cycles};

use super::{
    motion::{Motion, MoveByDistance, MoveToPosition, RotateToAngle, Tolerances, Wait},
    AutoParams,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A validated autonomous routine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Routine {
    name: String,
    cmds: Vec<CmdSpec>,
}

/// Helper for building routines in code.
#[derive(Debug, Clone, Default)]
pub struct RoutineBuilder {
    name: String,
    cmds: Vec<CmdSpec>,
}

/// On-disk form of a routine.
#[derive(Debug, Deserialize)]
struct RoutineFile {
    name: Option<String>,
    cmds: Vec<CmdSpec>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Descriptor of a single motion command.
///
/// Optional values fall back to the [`AutoParams`] defaults when the command is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CmdSpec {
    /// Turn on the spot to an absolute field heading.
    RotateToAngle {
        heading_deg: f64,
        tolerance_deg: f64,
        #[serde(default)]
        speed: Option<f64>,
        #[serde(default)]
        settle_cycles: Option<u32>,
        #[serde(default)]
        timeout_s: Option<f64>,
    },

    /// Drive to a point on the field.
    MoveToPosition {
        x_in: f64,
        y_in: f64,
        tolerance_in: f64,
        #[serde(default)]
        speed: Option<f64>,
        #[serde(default)]
        settle_cycles: Option<u32>,
        #[serde(default)]
        timeout_s: Option<f64>,
    },

    /// Drive straight for a signed distance.
    MoveByDistance {
        distance_in: f64,
        #[serde(default)]
        speed: Option<f64>,
        #[serde(default)]
        timeout_s: Option<f64>,
    },

    /// Hold still.
    Wait { duration_s: f64 },
}

/// Errors raised when constructing or loading a routine.
#[derive(Debug, thiserror::Error)]
pub enum RoutineError {
    #[error("A routine must contain at least one command")]
    Empty,

    #[error("Command {index} is invalid: {reason}")]
    InvalidCommand { index: usize, reason: String },

    #[error("Could not load the routine: {0}")]
    LoadError(LoadError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Routine {
    /// Create a new routine, validating every command.
    pub fn new<S: Into<String>>(name: S, cmds: Vec<CmdSpec>) -> Result<Self, RoutineError> {
        if cmds.is_empty() {
            return Err(RoutineError::Empty);
        }

        for (index, cmd) in cmds.iter().enumerate() {
            cmd.validate()
                .map_err(|reason| RoutineError::InvalidCommand { index, reason })?;
        }

        Ok(Self {
            name: name.into(),
            cmds,
        })
    }

    /// Load the routine `routines/{name}.toml` from the parameters directory.
    pub fn load(name: &str) -> Result<Self, RoutineError> {
        let file: RoutineFile = util::params::load(&format!("routines/{}.toml", name))
            .map_err(RoutineError::LoadError)?;

        Self::new(file.name.unwrap_or_else(|| name.to_string()), file.cmds)
    }

    /// Parse a routine from a TOML document. `default_name` is used if the document does not
    /// name the routine.
    pub fn from_toml(default_name: &str, toml_str: &str) -> Result<Self, RoutineError> {
        let file: RoutineFile =
            util::params::from_str(toml_str).map_err(RoutineError::LoadError)?;

        Self::new(file.name.unwrap_or_else(|| default_name.to_string()), file.cmds)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cmds(&self) -> &[CmdSpec] {
        &self.cmds
    }

    pub fn len(&self) -> usize {
        self.cmds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }
}

impl RoutineBuilder {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            cmds: Vec::new(),
        }
    }

    pub fn rotate_to(mut self, heading_deg: f64, tolerance_deg: f64) -> Self {
        self.cmds.push(CmdSpec::RotateToAngle {
            heading_deg,
            tolerance_deg,
            speed: None,
            settle_cycles: None,
            timeout_s: None,
        });
        self
    }

    pub fn move_to(mut self, x_in: f64, y_in: f64, tolerance_in: f64) -> Self {
        self.cmds.push(CmdSpec::MoveToPosition {
            x_in,
            y_in,
            tolerance_in,
            speed: None,
            settle_cycles: None,
            timeout_s: None,
        });
        self
    }

    pub fn move_by(mut self, distance_in: f64, speed: f64) -> Self {
        self.cmds.push(CmdSpec::MoveByDistance {
            distance_in,
            speed: Some(speed),
            timeout_s: None,
        });
        self
    }

    pub fn wait(mut self, duration_s: f64) -> Self {
        self.cmds.push(CmdSpec::Wait { duration_s });
        self
    }

    /// Add a fully specified command.
    pub fn push(mut self, cmd: CmdSpec) -> Self {
        self.cmds.push(cmd);
        self
    }

    pub fn build(self) -> Result<Routine, RoutineError> {
        Routine::new(self.name, self.cmds)
    }
}

impl CmdSpec {
    /// Check the descriptor's values, returning the reason it is invalid if not.
    fn validate(&self) -> Result<(), String> {
        fn finite(name: &str, v: f64) -> Result<(), String> {
            if v.is_finite() {
                Ok(())
            }
            else {
                Err(format!("{} must be finite, found {}", name, v))
            }
        }

        fn positive(name: &str, v: f64) -> Result<(), String> {
            finite(name, v)?;
            if v > 0.0 {
                Ok(())
            }
            else {
                Err(format!("{} must be positive, found {}", name, v))
            }
        }

        fn options(
            speed: &Option<f64>,
            settle_cycles: &Option<u32>,
            timeout_s: &Option<f64>,
        ) -> Result<(), String> {
            if let Some(s) = speed {
                positive("speed", *s)?;
                if *s > 1.0 {
                    return Err(format!("speed must be at most 1, found {}", s));
                }
            }
            if let Some(0) = settle_cycles {
                return Err("settle_cycles must be at least 1".into());
            }
            if let Some(t) = timeout_s {
                positive("timeout_s", *t)?;
            }
            Ok(())
        }

        match self {
            CmdSpec::RotateToAngle {
                heading_deg,
                tolerance_deg,
                speed,
                settle_cycles,
                timeout_s,
            } => {
                finite("heading_deg", *heading_deg)?;
                positive("tolerance_deg", *tolerance_deg)?;
                options(speed, settle_cycles, timeout_s)
            }
            CmdSpec::MoveToPosition {
                x_in,
                y_in,
                tolerance_in,
                speed,
                settle_cycles,
                timeout_s,
            } => {
                finite("x_in", *x_in)?;
                finite("y_in", *y_in)?;
                positive("tolerance_in", *tolerance_in)?;
                options(speed, settle_cycles, timeout_s)
            }
            CmdSpec::MoveByDistance {
                distance_in,
                speed,
                timeout_s,
            } => {
                finite("distance_in", *distance_in)?;
                options(speed, &None, timeout_s)
            }
            CmdSpec::Wait { duration_s } => {
                finite("duration_s", *duration_s)?;
                if *duration_s < 0.0 {
                    return Err(format!("duration_s must not be negative, found {}", duration_s));
                }
                Ok(())
            }
        }
    }

    /// Build the live motion command for this descriptor.
    pub fn build(&self, params: &AutoParams) -> Box<dyn Motion> {
        let timeout =
            |t: &Option<f64>| t.map(|t| seconds_to_cycles(t, params.cycle_period_s).max(1));
        let settle = |s: &Option<u32>| s.unwrap_or(params.settle_cycles);

        match self {
            CmdSpec::RotateToAngle {
                heading_deg,
                tolerance_deg,
                speed,
                settle_cycles,
                timeout_s,
            } => Box::new(RotateToAngle::new(
                *heading_deg,
                speed.unwrap_or(params.rotate_speed),
                *tolerance_deg,
                Tolerances::new(settle(settle_cycles), timeout(timeout_s)),
            )),
            CmdSpec::MoveToPosition {
                x_in,
                y_in,
                tolerance_in,
                speed,
                settle_cycles,
                timeout_s,
            } => Box::new(MoveToPosition::new(
                Vector2::new(*x_in, *y_in),
                speed.unwrap_or(params.drive_speed),
                params.rotate_speed,
                *tolerance_in,
                params.move_to.clone(),
                Tolerances::new(settle(settle_cycles), timeout(timeout_s)),
            )),
            CmdSpec::MoveByDistance {
                distance_in,
                speed,
                timeout_s,
            } => Box::new(MoveByDistance::new(
                *distance_in,
                speed.unwrap_or(params.drive_speed),
                timeout(timeout_s),
            )),
            CmdSpec::Wait { duration_s } => {
                Box::new(Wait::new(*duration_s, params.cycle_period_s))
            }
        }
    }
}
