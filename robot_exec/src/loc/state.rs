//! Pose estimator state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};
use nalgebra::Vector2;

// Internal
use super::{HeadingSource, LocError, LocParams, LocStatusReport, Pose, SensorFault, SensorFrame};
use util::{
    maths::{ang_err_deg, wrap_deg},
    module::State,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Estimates the robot's pose on the field from wheel travel and, optionally,
/// an absolute heading sensor.
#[derive(Debug, Clone)]
pub struct PoseEstimator {
    params: LocParams,

    /// Current best estimate of the pose.
    pose: Pose,

    /// Offset between the heading sensor's frame and the field frame.
    ///
    /// Captured from the first valid frame after zeroing, so that the
    /// sensor's absolute reading at that moment maps to the origin heading.
    heading_offset_deg: Option<f64>,

    /// Cycle count of the last frame consumed.
    last_frame_cycle: Option<u64>,

    /// Number of consecutive frames rejected as faulty.
    num_consec_faults: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for PoseEstimator {
    type InitData = LocParams;
    type InitError = LocError;

    type InputData = SensorFrame;
    type OutputData = Pose;
    type StatusReport = LocStatusReport;
    type ProcError = std::convert::Infallible;

    /// Initialise the estimator at the origin.
    fn init(params: Self::InitData) -> Result<Self, Self::InitError> {
        if !(params.track_width_in.is_finite() && params.track_width_in > 0.0) {
            return Err(LocError::InvalidParams(format!(
                "track width must be positive, found {}",
                params.track_width_in
            )));
        }
        if !(params.max_wheel_delta_in > 0.0) {
            return Err(LocError::InvalidParams(format!(
                "maximum wheel delta must be positive, found {}",
                params.max_wheel_delta_in
            )));
        }

        Ok(Self {
            params,
            pose: Pose::default(),
            heading_offset_deg: None,
            last_frame_cycle: None,
            num_consec_faults: 0,
        })
    }

    /// Ingest one cycle of sensor data and return the updated pose.
    ///
    /// Faulty frames never produce an error, they are reported in the status
    /// report and the previous pose is returned.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let report = self.update(input_data);
        Ok((self.pose, report))
    }
}

impl PoseEstimator {
    /// Reset the pose to the field origin, facing along +X.
    pub fn zero(&mut self) {
        self.zero_to(Pose::default());
    }

    /// Reset the pose to the given origin.
    ///
    /// Any captured heading sensor offset is discarded and recaptured from
    /// the next frame. The frame cycle count is kept, zeroing does not make
    /// an old frame fresh again.
    pub fn zero_to(&mut self, origin: Pose) {
        self.pose = Pose::new(origin.x(), origin.y(), origin.heading_deg);
        self.heading_offset_deg = None;
        self.num_consec_faults = 0;

        debug!("Pose zeroed to {}", self.pose);
    }

    /// Get a snapshot of the current pose.
    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Integrate one frame of sensor data.
    ///
    /// The new pose is computed in full before being stored, so a rejected
    /// frame leaves the previous pose untouched.
    pub fn update(&mut self, frame: &SensorFrame) -> LocStatusReport {
        let checked = self.check_frame(frame);
        if !matches!(checked, Err(SensorFault::StaleFrame { .. })) {
            self.last_frame_cycle = Some(frame.cycle);
        }

        let sensor_heading_deg = match checked {
            Ok(h) => h,
            Err(fault) => {
                self.num_consec_faults += 1;
                warn!(
                    "Skipping pose update ({} consecutive): {}",
                    self.num_consec_faults, fault
                );
                return LocStatusReport {
                    sensor_fault: Some(fault),
                    num_consec_faults: self.num_consec_faults,
                };
            }
        };
        self.num_consec_faults = 0;

        let prev = self.pose;
        let forward_in = 0.5 * (frame.left_delta_in + frame.right_delta_in);

        let heading_deg = match sensor_heading_deg {
            Some(h) => {
                let offset = *self
                    .heading_offset_deg
                    .get_or_insert(h - prev.heading_deg);
                wrap_deg(h - offset)
            }
            None => wrap_deg(
                prev.heading_deg
                    + ((frame.right_delta_in - frame.left_delta_in)
                        / self.params.track_width_in)
                        .to_degrees(),
            ),
        };

        // Integrate along the mid-cycle heading, taking the short way round
        let mid_heading_rad =
            (prev.heading_deg + 0.5 * ang_err_deg(heading_deg, prev.heading_deg)).to_radians();
        let position_in = prev.position_in
            + forward_in * Vector2::new(mid_heading_rad.cos(), mid_heading_rad.sin());

        self.pose = Pose {
            position_in,
            heading_deg,
        };

        LocStatusReport::default()
    }

    /// Validate a frame, returning the heading reading to use (if the sensor
    /// is the heading source).
    fn check_frame(&self, frame: &SensorFrame) -> Result<Option<f64>, SensorFault> {
        if let Some(last) = self.last_frame_cycle {
            if frame.cycle <= last {
                return Err(SensorFault::StaleFrame {
                    cycle: frame.cycle,
                    last,
                });
            }
        }

        let (left, right) = (frame.left_delta_in, frame.right_delta_in);

        if !(left.is_finite() && right.is_finite()) {
            return Err(SensorFault::NonFiniteWheelDelta { left, right });
        }

        let limit = self.params.max_wheel_delta_in;
        if left.abs() > limit || right.abs() > limit {
            return Err(SensorFault::WheelDeltaOutOfRange { left, right, limit });
        }

        match self.params.heading_source {
            HeadingSource::Odometry => Ok(None),
            HeadingSource::Sensor => match frame.heading_deg {
                Some(h) if h.is_finite() => Ok(Some(h)),
                Some(h) => Err(SensorFault::NonFiniteHeading(h)),
                None => Err(SensorFault::MissingHeading),
            },
        }
    }
}
