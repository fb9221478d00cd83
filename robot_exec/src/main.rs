//! Main robot-side executable entry point.
//!
//! # Architecture
//!
//! The executable runs a single autonomous routine against the simulated drivetrain:
//!
//!     - Initialise the session, logging and parameters
//!     - Load the routine and start the sequencer
//!     - Main loop:
//!         - Drivetrain simulation and sensor acquisition
//!         - Position determination
//!         - Command sequencing
//!         - Archiving
//!     - Stop the drivetrain and save a summary of the run
//!
//! Parameters are loaded from `$ROBOT_SW_ROOT/params`, routines from
//! `$ROBOT_SW_ROOT/params/routines/{name}.toml`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::eyre, eyre::WrapErr, Report};
use log::{info, warn};
use serde::Serialize;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use robot_lib::{
    auto::{AutoParams, Routine, SeqReport},
    data_store::DataStore,
    drive::SimParams,
    loc::{LocParams, Pose},
};
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Run an autonomous routine on the simulated robot.
#[derive(Debug, StructOpt)]
#[structopt(name = "robot_exec")]
struct Args {
    /// Name of the routine to run, loaded from `params/routines/{routine}.toml`.
    #[structopt(default_value = "default")]
    routine: String,

    /// Stop after this many cycles even if the routine hasn't finished.
    #[structopt(long, default_value = "3000")]
    max_cycles: u64,

    /// Cancel the routine after this many cycles.
    #[structopt(long)]
    cancel_after: Option<u64>,

    /// Run cycles back to back rather than in real time.
    #[structopt(long)]
    fast: bool,

    /// Don't write the per-cycle pose archive.
    #[structopt(long)]
    no_archive: bool,

    /// Minimum level of log messages to display. Must be at least `info`.
    #[structopt(long, default_value = "info")]
    log_level: LevelFilter,
}

/// Summary saved into the session at the end of the run.
#[derive(Debug, Serialize)]
struct RunSummary {
    seq: SeqReport,
    num_cycles: u64,
    sim_time_s: f64,
    final_pose: Pose,
    final_true_pose: Pose,
    num_drive_writes: u64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let args = Args::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("robot_exec", "sessions")
        .wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(args.log_level, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Robot Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let auto_params: AutoParams =
        util::params::load("auto.toml").wrap_err("Could not load autonomy params")?;
    let loc_params: LocParams =
        util::params::load("loc.toml").wrap_err("Could not load localisation params")?;
    let sim_params: SimParams =
        util::params::load("sim.toml").wrap_err("Could not load simulation params")?;

    info!("Exec parameters loaded");

    let cycle_period_s = auto_params.cycle_period_s;

    let routine = Routine::load(&args.routine)
        .wrap_err_with(|| format!("Failed to load the \"{}\" routine", args.routine))?;

    info!(
        "Loaded routine \"{}\" containing {} commands\n",
        routine.name(),
        routine.len()
    );

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::new(auto_params, loc_params, sim_params)
        .wrap_err("Failed to initialise modules")?;

    let mut arch_pose = if args.no_archive {
        Archiver::default()
    }
    else {
        Archiver::from_path(&session, "robot_exec/pose.csv")
            .map_err(|e| eyre!("Failed to create the pose archive: {}", e))?
    };

    ds.start_routine(routine)
        .wrap_err("Failed to start the routine")?;

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        if args.cancel_after == Some(ds.num_cycles) {
            info!("Cancelling the routine after {} cycles", ds.num_cycles);
            ds.seq.cancel();
        }

        ds.cycle(cycle_period_s);

        if let Err(e) = arch_pose.serialise(ds.record()) {
            warn!("Could not archive the pose: {}", e);
        }

        if ds.seq.is_finished() {
            info!("Routine ended in state {:?}", ds.seq_state);
            break;
        }

        if ds.num_cycles >= args.max_cycles {
            warn!(
                "Routine did not finish within {} cycles, stopping",
                args.max_cycles
            );
            ds.stop(cycle_period_s);
            if let Err(e) = arch_pose.serialise(ds.record()) {
                warn!("Could not archive the pose: {}", e);
            }
            break;
        }

        // ---- CYCLE MANAGEMENT ----

        if args.fast {
            continue;
        }

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(cycle_period_s).checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - cycle_period_s
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }
    }

    // ---- SHUTDOWN ----

    let summary = RunSummary {
        seq: ds.seq.report(),
        num_cycles: ds.num_cycles,
        sim_time_s: ds.sim_time_s,
        final_pose: ds.pose,
        final_true_pose: ds.sim.true_pose(),
        num_drive_writes: ds.sim.num_writes(),
    };

    info!(
        "Final pose {} (true pose {}) after {:.2} s",
        summary.final_pose, summary.final_true_pose, summary.sim_time_s
    );
    info!(
        "{} drivetrain writes, at most {} in one cycle",
        summary.num_drive_writes,
        ds.sim.max_writes_per_cycle()
    );
    if !summary.seq.timed_out.is_empty() {
        warn!("Commands timed out: {:?}", summary.seq.timed_out);
    }

    session.save("summary.json", summary);
    session.exit();

    info!("End of execution");

    Ok(())
}
