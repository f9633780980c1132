use crate::{
    command::VelocityCommand,
    error::ErrorWrapper,
    messages::{NavigationStatus, VelocityCommandMessage},
};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};
use zenoh::{prelude::r#async::*, Session};

/// Consumer of the velocity commands produced every tick.
#[async_trait]
pub trait VelocityDriver: Send + Sync {
    async fn send(&mut self, command: VelocityCommand) -> Result<()>;

    /// Called whenever the navigator emits an event
    async fn report(&mut self, _status: &NavigationStatus) -> Result<()> {
        Ok(())
    }
}

/// Publishes commands and status as JSON over zenoh
pub struct ZenohVelocityDriver {
    zenoh_session: Arc<Session>,
    command_topic: String,
    status_topic: String,
}

impl ZenohVelocityDriver {
    pub fn new(zenoh_session: Arc<Session>, command_topic: &str, status_topic: &str) -> Self {
        Self {
            zenoh_session,
            command_topic: command_topic.to_owned(),
            status_topic: status_topic.to_owned(),
        }
    }
}

#[async_trait]
impl VelocityDriver for ZenohVelocityDriver {
    async fn send(&mut self, command: VelocityCommand) -> Result<()> {
        let message = serde_json::to_string(&VelocityCommandMessage::from(command))?;
        self.zenoh_session
            .put(self.command_topic.as_str(), message)
            .res_async()
            .await
            .map_err(ErrorWrapper::ZenohError)?;
        Ok(())
    }

    async fn report(&mut self, status: &NavigationStatus) -> Result<()> {
        debug!(?status, "Publishing navigation status");
        let message = serde_json::to_string(status)?;
        self.zenoh_session
            .put(self.status_topic.as_str(), message)
            .res_async()
            .await
            .map_err(ErrorWrapper::ZenohError)?;
        Ok(())
    }
}

/// Sink that only logs, for checking the navigator against live poses without
/// moving the robot
#[derive(Debug, Default)]
pub struct LoggingDriver {
    commands_sent: usize,
}

impl LoggingDriver {
    pub fn commands_sent(&self) -> usize {
        self.commands_sent
    }
}

#[async_trait]
impl VelocityDriver for LoggingDriver {
    async fn send(&mut self, command: VelocityCommand) -> Result<()> {
        self.commands_sent += 1;
        debug!(
            linear = command.linear(),
            angular = command.angular(),
            "Velocity command"
        );
        Ok(())
    }

    async fn report(&mut self, status: &NavigationStatus) -> Result<()> {
        info!(
            state = %status.state,
            index = status.current_index,
            waypoints = status.waypoint_count,
            completed = status.completed,
            "Navigation status"
        );
        Ok(())
    }
}
