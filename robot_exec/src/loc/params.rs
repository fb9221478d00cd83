//! Localisation parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the pose estimator.
#[derive(Debug, Clone, Deserialize)]
pub struct LocParams {
    /// Distance between the left and right wheel contact points.
    ///
    /// Units: inches
    pub track_width_in: f64,

    /// Where the heading estimate comes from.
    pub heading_source: HeadingSource,

    /// Largest wheel travel in a single cycle which is physically plausible.
    /// Larger deltas are treated as sensor faults.
    ///
    /// Units: inches
    pub max_wheel_delta_in: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Source of the heading estimate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadingSource {
    /// Absolute heading from the gyro. A frame without a heading is a fault.
    Sensor,

    /// Heading integrated from the difference in wheel travel. Any heading in
    /// the frame is ignored.
    Odometry,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_loc_params_from_toml() {
        let params: LocParams =
            util::params::from_str(include_str!("../../../params/loc.toml")).unwrap();
        assert_eq!(params.heading_source, HeadingSource::Sensor);
        assert_eq!(params.track_width_in, 24.0);

        let res: Result<LocParams, _> = util::params::from_str(
            r#"
            track_width_in = 24.0
            heading_source = "compass"
            max_wheel_delta_in = 6.0
            "#,
        );
        assert!(res.is_err());
    }
}
