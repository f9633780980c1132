use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use waypoint_navigator::{
    configuration, error::ErrorWrapper, localiser::PoseSample, logging, messages::PoseMessage,
};
use zenoh::prelude::r#async::*;

/// Print poses arriving on the navigation pose topic
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// path to config
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::setup_tracing(0, false);

    let app_config = configuration::AppConfig::load_config(&args.config)?;
    let zenoh_config = app_config.zenoh.get_zenoh_config()?;
    let zenoh_session = zenoh::open(zenoh_config)
        .res()
        .await
        .map_err(ErrorWrapper::ZenohError)?;

    let subscriber = zenoh_session
        .declare_subscriber(app_config.topics.pose.as_str())
        .res()
        .await
        .map_err(ErrorWrapper::ZenohError)?;

    loop {
        let sample = subscriber.recv_async().await?;
        let message: String = sample.value.try_into()?;
        match serde_json::from_str::<PoseMessage>(&message) {
            Ok(message) => {
                let pose = PoseSample::from(&message).to_pose();
                println!(
                    "x: {:.2} y {:.2} yaw {:.2}",
                    pose.x(),
                    pose.y(),
                    pose.heading().to_degrees()
                );
            }
            Err(err) => println!("Unreadable pose {:?}", err),
        }
    }
}
