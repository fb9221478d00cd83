//! # Autonomy Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Parameters for the autonomy system.
#[derive(Debug, Deserialize, Clone)]
pub struct AutoParams {
    /// Period of the control cycle, used to convert durations into cycle counts.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Default demand magnitude used for point turns.
    pub rotate_speed: f64,

    /// Default demand magnitude used for straight driving.
    pub drive_speed: f64,

    /// Default number of consecutive in-tolerance cycles required before a command finishes.
    pub settle_cycles: u32,

    /// Parameters for the move to position command.
    pub move_to: MoveToParams,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MoveToParams {
    /// The bearing error within which the robot is considered aligned with its target and may
    /// start driving.
    ///
    /// Units: degrees
    pub align_tolerance_deg: f64,

    /// If the bearing error exceeds this threshold while driving the robot stops and realigns.
    ///
    /// Units: degrees
    pub realign_threshold_deg: f64,

    /// Differential trim applied per degree of bearing error while driving.
    pub trim_gain_per_deg: f64,

    /// Maximum magnitude of the differential trim.
    pub max_trim: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Autonomy parameters which would leave commands unable to converge.
#[derive(Debug, thiserror::Error)]
pub enum AutoParamsError {
    #[error("The cycle period must be positive, found {0}")]
    InvalidCyclePeriod(f64),

    #[error("{name} must be in (0, 1], found {value}")]
    InvalidSpeed { name: &'static str, value: f64 },

    #[error("settle_cycles must be at least 1")]
    ZeroSettleCycles,

    #[error("move_to.align_tolerance_deg must be positive, found {0}")]
    InvalidAlignTolerance(f64),

    #[error(
        "move_to.realign_threshold_deg ({realign}) must be larger than move_to.align_tolerance_deg \
        ({align})"
    )]
    RealignInsideAlignTolerance { align: f64, realign: f64 },

    #[error("{name} must be finite and not negative, found {value}")]
    InvalidTrim { name: &'static str, value: f64 },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl AutoParams {
    /// Check that every command built from these parameters is able to finish.
    pub fn validate(&self) -> Result<(), AutoParamsError> {
        if !(self.cycle_period_s.is_finite() && self.cycle_period_s > 0.0) {
            return Err(AutoParamsError::InvalidCyclePeriod(self.cycle_period_s));
        }

        for (name, value) in &[
            ("rotate_speed", self.rotate_speed),
            ("drive_speed", self.drive_speed),
        ] {
            if !(*value > 0.0 && *value <= 1.0) {
                return Err(AutoParamsError::InvalidSpeed {
                    name: *name,
                    value: *value,
                });
            }
        }

        if self.settle_cycles == 0 {
            return Err(AutoParamsError::ZeroSettleCycles);
        }

        self.move_to.validate()
    }
}

impl MoveToParams {
    fn validate(&self) -> Result<(), AutoParamsError> {
        let align = self.align_tolerance_deg;
        let realign = self.realign_threshold_deg;

        if !(align.is_finite() && align > 0.0) {
            return Err(AutoParamsError::InvalidAlignTolerance(align));
        }

        // Driving must not immediately trip the realign check on entry
        if !(realign.is_finite() && realign > align) {
            return Err(AutoParamsError::RealignInsideAlignTolerance { align, realign });
        }

        for (name, value) in &[
            ("move_to.trim_gain_per_deg", self.trim_gain_per_deg),
            ("move_to.max_trim", self.max_trim),
        ] {
            if !(value.is_finite() && *value >= 0.0) {
                return Err(AutoParamsError::InvalidTrim {
                    name: *name,
                    value: *value,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_auto_params_from_toml() {
        let params: AutoParams = util::params::from_str(
            r#"
            cycle_period_s = 0.02
            rotate_speed = 0.5
            drive_speed = 0.5
            settle_cycles = 1

            [move_to]
            align_tolerance_deg = 2.0
            realign_threshold_deg = 30.0
            trim_gain_per_deg = 0.02
            max_trim = 0.1
            "#,
        )
        .unwrap();

        assert_eq!(params.cycle_period_s, 0.02);
        assert_eq!(params.settle_cycles, 1);
        assert_eq!(params.move_to.realign_threshold_deg, 30.0);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_shipped_params_are_valid() {
        let params: AutoParams =
            util::params::from_str(include_str!("../../../params/auto.toml")).unwrap();
        params.validate().unwrap();
    }

    #[test]
    fn test_invalid_params() {
        let good: AutoParams = util::params::from_str(include_str!("../../../params/auto.toml"))
            .unwrap();

        let mut p = good.clone();
        p.cycle_period_s = 0.0;
        assert!(matches!(p.validate(), Err(AutoParamsError::InvalidCyclePeriod(_))));

        // A zero speed rotate never moves
        let mut p = good.clone();
        p.rotate_speed = 0.0;
        assert!(matches!(
            p.validate(),
            Err(AutoParamsError::InvalidSpeed { name: "rotate_speed", .. })
        ));

        let mut p = good.clone();
        p.drive_speed = 1.5;
        assert!(matches!(
            p.validate(),
            Err(AutoParamsError::InvalidSpeed { name: "drive_speed", .. })
        ));

        let mut p = good.clone();
        p.drive_speed = f64::NAN;
        assert!(p.validate().is_err());

        let mut p = good.clone();
        p.settle_cycles = 0;
        assert!(matches!(p.validate(), Err(AutoParamsError::ZeroSettleCycles)));

        let mut p = good.clone();
        p.move_to.align_tolerance_deg = -1.0;
        assert!(matches!(p.validate(), Err(AutoParamsError::InvalidAlignTolerance(_))));

        // Realigning inside the alignment band would flip between modes forever
        for realign in &[1.0, 2.0] {
            let mut p = good.clone();
            p.move_to.align_tolerance_deg = 2.0;
            p.move_to.realign_threshold_deg = *realign;
            assert!(matches!(
                p.validate(),
                Err(AutoParamsError::RealignInsideAlignTolerance { .. })
            ));
        }

        let mut p = good.clone();
        p.move_to.trim_gain_per_deg = -0.02;
        assert!(matches!(p.validate(), Err(AutoParamsError::InvalidTrim { .. })));

        let mut p = good;
        p.move_to.max_trim = f64::INFINITY;
        assert!(matches!(p.validate(), Err(AutoParamsError::InvalidTrim { .. })));
    }
}
