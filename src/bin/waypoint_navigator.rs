use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use waypoint_navigator::{
    configuration,
    driver::{LoggingDriver, VelocityDriver, ZenohVelocityDriver},
    error::ErrorWrapper,
    localiser::{start_pose_subscriber, PoseTracker},
    logging,
    runner::run_navigation_loop,
    simulation::SimulatedDriver,
};
use zenoh::prelude::r#async::*;

#[derive(Parser, Debug)]
#[command(version, about = "Finite-state waypoint navigator")]
struct Args {
    /// path to config
    #[arg(long)]
    config: Option<PathBuf>,

    /// drive a simulated robot instead of publishing over zenoh
    #[arg(long)]
    simulate: bool,

    /// read poses over zenoh but only log the commands
    #[arg(long, conflicts_with = "simulate")]
    log_only: bool,

    /// log as json lines
    #[arg(long)]
    json_logs: bool,

    /// Sets the level of verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbosity: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::setup_tracing(args.verbosity, args.json_logs);

    let app_config = configuration::AppConfig::load_config(&args.config)?;
    let controller = app_config.navigation.build_controller();
    let tick_period = app_config.navigation.tick_period();

    // the simulated driver seeds the tracker with its start pose
    let tracker = PoseTracker::default();

    let mut driver: Box<dyn VelocityDriver> = if args.simulate {
        info!("Simulating robot from {}", app_config.simulation.start_pose());
        Box::new(SimulatedDriver::new(
            app_config.simulation.start_pose(),
            tracker.clone(),
            tick_period,
        ))
    } else {
        let zenoh_config = app_config.zenoh.get_zenoh_config()?;
        let zenoh_session = zenoh::open(zenoh_config)
            .res()
            .await
            .map_err(ErrorWrapper::ZenohError)?
            .into_arc();

        start_pose_subscriber(zenoh_session.clone(), &app_config.topics.pose, tracker.clone())
            .await?;
        if args.log_only {
            info!("Commands will only be logged");
            Box::new(LoggingDriver::default())
        } else {
            Box::new(ZenohVelocityDriver::new(
                zenoh_session,
                &app_config.topics.command,
                &app_config.topics.status,
            ))
        }
    };

    let controller = run_navigation_loop(controller, tracker, &mut *driver, tick_period, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c {:?}", err);
        }
    })
    .await?;

    info!(
        "Stopped in {} after {} of {} waypoints",
        controller.state(),
        controller.current_index(),
        controller.waypoints().len()
    );
    Ok(())
}
