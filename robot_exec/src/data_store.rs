//! # Data Store

use log::warn;
use serde::Serialize;
use util::module::State;

use crate::{
    auto::{AutoParams, Routine, SeqError, SeqState, Sequencer},
    drive::{SimDrivetrain, SimParams},
    loc::{LocError, LocParams, LocStatusReport, Pose, PoseEstimator},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u64,

    /// Simulation elapsed time
    pub sim_time_s: f64,

    // Localisation
    pub loc: PoseEstimator,
    pub pose: Pose,
    pub loc_status_rpt: LocStatusReport,

    // Drivetrain
    pub sim: SimDrivetrain,

    // Autonomy
    pub seq: Sequencer,
    pub seq_state: SeqState,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,
}

/// Errors raised while initialising the data store's modules.
#[derive(Debug, thiserror::Error)]
pub enum DataStoreInitError {
    #[error("Failed to initialise localisation: {0}")]
    Loc(LocError),

    #[error("Failed to initialise the sequencer: {0}")]
    Seq(SeqError),
}

/// One row of the per-cycle pose archive.
#[derive(Debug, Clone, Serialize)]
pub struct CycleRecord {
    pub cycle: u64,
    pub sim_time_s: f64,
    pub x_in: f64,
    pub y_in: f64,
    pub heading_deg: f64,
    pub true_x_in: f64,
    pub true_y_in: f64,
    pub true_heading_deg: f64,
    pub left_demand: f64,
    pub right_demand: f64,
    pub seq_state: String,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    pub fn new(
        auto_params: AutoParams,
        loc_params: LocParams,
        sim_params: SimParams,
    ) -> Result<Self, DataStoreInitError> {
        let loc = PoseEstimator::init(loc_params).map_err(DataStoreInitError::Loc)?;
        let seq = Sequencer::new(auto_params).map_err(DataStoreInitError::Seq)?;

        Ok(Self {
            num_cycles: 0,
            sim_time_s: 0.0,
            pose: loc.pose(),
            loc,
            loc_status_rpt: LocStatusReport::default(),
            sim: SimDrivetrain::new(sim_params),
            seq,
            seq_state: SeqState::Idle,
            num_consec_cycle_overruns: 0,
        })
    }

    /// Start the given routine from the current position, which becomes the field origin.
    pub fn start_routine(&mut self, routine: Routine) -> Result<(), SeqError> {
        self.seq.start(routine, &mut self.loc, &mut self.sim)?;
        self.pose = self.loc.pose();
        Ok(())
    }

    /// Execute one control cycle of length `dt_s`: simulate the drivetrain, update localisation
    /// then step the sequencer.
    pub fn cycle(&mut self, dt_s: f64) {
        // ---- DATA INPUT ----

        self.sim.advance(dt_s);
        let frame = self.sim.sensor_frame();

        // ---- LOCALISATION ----

        let (pose, loc_status_rpt) = match self.loc.proc(&frame) {
            Ok(o) => o,
            Err(e) => match e {},
        };
        if let Some(fault) = loc_status_rpt.sensor_fault {
            warn!("Localisation fault on cycle {}: {}", self.num_cycles, fault);
        }
        self.pose = pose;
        self.loc_status_rpt = loc_status_rpt;

        // ---- AUTONOMY ----

        self.seq_state = self.seq.step(&self.pose, &mut self.sim);

        // ---- CYCLE END ----

        self.num_cycles += 1;
        self.sim_time_s += dt_s;
    }

    /// Terminate the routine, whatever its state.
    ///
    /// The cancel is run through a cycle of its own so the zero demand is the only write in that
    /// cycle. Does nothing if no routine is active.
    pub fn stop(&mut self, dt_s: f64) {
        if self.seq.is_active() {
            self.seq.cancel();
            self.cycle(dt_s);
        }
    }

    /// Build the archive record for the cycle just executed.
    pub fn record(&self) -> CycleRecord {
        let truth = self.sim.true_pose();
        let demand = self.sim.last_demand();

        CycleRecord {
            cycle: self.num_cycles,
            sim_time_s: self.sim_time_s,
            x_in: self.pose.x(),
            y_in: self.pose.y(),
            heading_deg: self.pose.heading_deg,
            true_x_in: truth.x(),
            true_y_in: truth.y(),
            true_heading_deg: truth.heading_deg,
            left_demand: demand.left,
            right_demand: demand.right,
            seq_state: format!("{:?}", self.seq_state),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        auto::{MoveToParams, RoutineBuilder},
        drive::{DrivePair, Drivetrain},
        loc::HeadingSource,
    };
    use nalgebra::Vector2;
    use util::maths::ang_err_deg;

    const DT_S: f64 = 0.02;

    fn data_store(heading_source: HeadingSource) -> DataStore {
        DataStore::new(
            AutoParams {
                cycle_period_s: DT_S,
                rotate_speed: 0.5,
                drive_speed: 0.5,
                settle_cycles: 1,
                move_to: MoveToParams {
                    align_tolerance_deg: 2.0,
                    realign_threshold_deg: 30.0,
                    trim_gain_per_deg: 0.02,
                    max_trim: 0.1,
                },
            },
            LocParams {
                track_width_in: 24.0,
                heading_source,
                max_wheel_delta_in: 6.0,
            },
            SimParams {
                track_width_in: 24.0,
                max_wheel_speed_ins: 60.0,
                gyro_fitted: heading_source == HeadingSource::Sensor,
                gyro_offset_deg: 37.0,
            },
        )
        .unwrap()
    }

    /// Run until the sequencer finishes, checking no cycle writes the drivetrain twice.
    fn run_to_end(ds: &mut DataStore, max_cycles: u64) {
        while !ds.seq.is_finished() && ds.num_cycles < max_cycles {
            ds.cycle(DT_S);
            assert!(ds.sim.writes_this_cycle() <= 1);
        }
        assert!(ds.seq.is_finished(), "routine did not finish");
        assert!(ds.sim.max_writes_per_cycle() <= 1);
        assert!(ds.sim.last_demand().is_zero());
    }

    #[test]
    fn test_square_up_scenario() {
        for source in &[HeadingSource::Odometry, HeadingSource::Sensor] {
            let mut ds = data_store(*source);
            let routine = RoutineBuilder::new("square_up")
                .rotate_to(90.0, 2.0)
                .move_to(0.0, 48.0, 1.0)
                .build()
                .unwrap();
            ds.start_routine(routine).unwrap();

            run_to_end(&mut ds, 2000);

            assert_eq!(ds.seq_state, SeqState::Done);
            assert_eq!(ds.seq.cursor(), 2);
            assert!(ds.seq.report().timed_out.is_empty());
            assert!(ang_err_deg(90.0, ds.pose.heading_deg).abs() <= 2.0);
            assert!(ds.pose.distance_to(&Vector2::new(0.0, 48.0)) <= 1.0);
            assert!(ds.sim.true_pose().distance_to(&Vector2::new(0.0, 48.0)) <= 1.0);
        }
    }

    #[test]
    fn test_default_routine() {
        let mut ds = data_store(HeadingSource::Odometry);
        let routine = RoutineBuilder::new("default")
            .move_to(-36.0, 0.0, 1.0)
            .move_to(12.0, 0.0, 1.0)
            .build()
            .unwrap();
        ds.start_routine(routine).unwrap();

        // The first target must be reached before heading to the second
        let mut reached_first = false;
        while !ds.seq.is_finished() && ds.num_cycles < 3000 {
            ds.cycle(DT_S);
            if ds.seq_state == SeqState::Advancing(1) {
                assert!(ds.pose.distance_to(&Vector2::new(-36.0, 0.0)) <= 1.0);
                reached_first = true;
            }
        }

        assert!(reached_first);
        assert_eq!(ds.seq_state, SeqState::Done);
        assert!(ds.pose.distance_to(&Vector2::new(12.0, 0.0)) <= 1.0);
        assert!(ds.sim.max_writes_per_cycle() <= 1);
    }

    #[test]
    fn test_intake_down_routine() {
        let mut ds = data_store(HeadingSource::Odometry);
        let routine = RoutineBuilder::new("intake_down")
            .move_by(-100.0, 0.5)
            .wait(0.5)
            .move_by(100.0, 0.45)
            .build()
            .unwrap();
        ds.start_routine(routine).unwrap();

        run_to_end(&mut ds, 2000);

        // Ends roughly back where it started, each leg overshoots by less than a cycle of travel
        assert_eq!(ds.seq_state, SeqState::Done);
        assert!(ds.pose.x().abs() < 1.0);
        assert!(ds.pose.heading_deg.abs() < 1e-9);
    }

    #[test]
    fn test_cancel_mid_routine() {
        let mut ds = data_store(HeadingSource::Odometry);
        let routine = RoutineBuilder::new("long")
            .move_by(200.0, 0.5)
            .build()
            .unwrap();
        ds.start_routine(routine).unwrap();

        for _ in 0..20 {
            ds.cycle(DT_S);
        }
        assert_eq!(ds.sim.last_demand(), DrivePair::straight(0.5));

        ds.seq.cancel();
        ds.cycle(DT_S);
        assert_eq!(ds.seq_state, SeqState::Canceled(0));
        assert!(ds.sim.last_demand().is_zero());
        assert_eq!(ds.sim.writes_this_cycle(), 1);

        // The robot coasts no further
        ds.cycle(DT_S);
        let x = ds.pose.x();
        ds.cycle(DT_S);
        assert_eq!(ds.pose.x(), x);
        assert_eq!(ds.sim.writes_this_cycle(), 0);
    }

    #[test]
    fn test_stop_at_cycle_limit() {
        let mut ds = data_store(HeadingSource::Odometry);
        let routine = RoutineBuilder::new("far").move_by(500.0, 0.5).build().unwrap();
        ds.start_routine(routine).unwrap();

        for _ in 0..10 {
            ds.cycle(DT_S);
        }
        assert_eq!(ds.sim.writes_this_cycle(), 1);
        assert_eq!(ds.seq_state, SeqState::Running(0));

        ds.stop(DT_S);
        assert_eq!(ds.num_cycles, 11);
        assert_eq!(ds.sim.writes_this_cycle(), 1);
        assert_eq!(ds.sim.max_writes_per_cycle(), 1);
        assert!(ds.sim.last_demand().is_zero());
        assert_eq!(ds.seq_state, SeqState::Canceled(0));
        assert_eq!(ds.seq.report().state, SeqState::Canceled(0));

        // Stopping a finished routine writes nothing more
        let num_writes = ds.sim.num_writes();
        ds.stop(DT_S);
        assert_eq!(ds.num_cycles, 11);
        assert_eq!(ds.sim.num_writes(), num_writes);
    }

    #[test]
    fn test_invalid_auto_params() {
        let res = DataStore::new(
            AutoParams {
                cycle_period_s: DT_S,
                rotate_speed: 0.5,
                drive_speed: 0.5,
                settle_cycles: 1,
                move_to: MoveToParams {
                    align_tolerance_deg: 2.0,
                    realign_threshold_deg: 1.0,
                    trim_gain_per_deg: 0.02,
                    max_trim: 0.1,
                },
            },
            LocParams {
                track_width_in: 24.0,
                heading_source: HeadingSource::Odometry,
                max_wheel_delta_in: 6.0,
            },
            SimParams {
                track_width_in: 24.0,
                max_wheel_speed_ins: 60.0,
                gyro_fitted: false,
                gyro_offset_deg: 0.0,
            },
        );
        assert!(matches!(res, Err(DataStoreInitError::Seq(SeqError::InvalidParams(_)))));
    }

    #[test]
    fn test_record() {
        let mut ds = data_store(HeadingSource::Odometry);
        ds.sim.drive(DrivePair::straight(1.0));
        ds.cycle(DT_S);

        let rec = ds.record();
        assert_eq!(rec.cycle, 1);
        assert!((rec.x_in - 1.2).abs() < 1e-9);
        assert_eq!(rec.true_x_in, rec.x_in);
        assert_eq!(rec.seq_state, "Idle");
    }
}
