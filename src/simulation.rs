use crate::{
    command::VelocityCommand,
    driver::VelocityDriver,
    localiser::{PoseSample, PoseTracker},
    navigation::{normalize_angle, Pose2d},
};
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::trace;

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct SimulationConfig {
    #[serde(default)]
    pub start_x: f32,
    #[serde(default)]
    pub start_y: f32,
    /// radians
    #[serde(default)]
    pub start_heading: f32,
}

impl SimulationConfig {
    pub fn start_pose(&self) -> Pose2d {
        Pose2d::new((self.start_x, self.start_y), self.start_heading)
    }
}

/// Unicycle model of a differential-drive base with perfect actuation.
#[derive(Debug, Clone)]
pub struct DiffDriveSimulator {
    pose: Pose2d,
}

impl DiffDriveSimulator {
    pub fn new(start: Pose2d) -> Self {
        Self { pose: start }
    }

    pub fn pose(&self) -> &Pose2d {
        &self.pose
    }

    /// Integrate `command` over `dt` and return the resulting odometry sample.
    pub fn step(&mut self, command: &VelocityCommand, dt: Duration) -> PoseSample {
        let dt = dt.as_secs_f32();
        let heading = self.pose.heading();
        let x = self.pose.x() + command.linear() * heading.cos() * dt;
        let y = self.pose.y() + command.linear() * heading.sin() * dt;
        let heading = normalize_angle(heading + command.angular() * dt);
        self.pose = Pose2d::new((x, y), heading);
        PoseSample::from_planar(x, y, heading)
    }
}

/// Actuation sink that moves a simulated robot and feeds its odometry back
/// into a [`PoseTracker`].
pub struct SimulatedDriver {
    simulator: DiffDriveSimulator,
    tracker: PoseTracker,
    step: Duration,
}

impl SimulatedDriver {
    pub fn new(start: Pose2d, tracker: PoseTracker, step: Duration) -> Self {
        tracker.set(start);
        Self {
            simulator: DiffDriveSimulator::new(start),
            tracker,
            step,
        }
    }

    pub fn pose(&self) -> &Pose2d {
        self.simulator.pose()
    }
}

#[async_trait]
impl VelocityDriver for SimulatedDriver {
    async fn send(&mut self, command: VelocityCommand) -> Result<()> {
        let sample = self.simulator.step(&command, self.step);
        trace!(pose = %self.simulator.pose(), "Simulated step");
        self.tracker.update(&sample);
        Ok(())
    }
}
