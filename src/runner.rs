use crate::{
    command::VelocityCommand,
    driver::VelocityDriver,
    localiser::PoseTracker,
    messages::NavigationStatus,
    navigation::NavigationController,
};
use anyhow::Result;
use std::{future::Future, time::Duration};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Tick `controller` every `tick_period` until `shutdown` resolves.
///
/// Ticks that fall behind are skipped rather than queued. Each tick reads the
/// latest pose from `tracker` and sends exactly one command to `driver`. A
/// final stop command is sent on shutdown and the controller is handed back.
pub async fn run_navigation_loop<F>(
    mut controller: NavigationController,
    tracker: PoseTracker,
    driver: &mut dyn VelocityDriver,
    tick_period: Duration,
    shutdown: F,
) -> Result<NavigationController>
where
    F: Future<Output = ()>,
{
    let mut tick_timer = interval(tick_period);
    tick_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    info!(
        "Starting navigation through {} waypoints every {:?}",
        controller.waypoints().len(),
        tick_period
    );

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Navigation loop shutting down");
                break;
            }
            _ = tick_timer.tick() => {
                let pose = tracker.read();
                let output = controller.tick(&pose);
                debug!(
                    state = %controller.state(),
                    %pose,
                    linear = output.command.linear(),
                    angular = output.command.angular(),
                    "Tick"
                );
                driver.send(output.command).await?;
                if output.event.is_some() {
                    driver
                        .report(&NavigationStatus::from_controller(&controller))
                        .await?;
                }
            }
        }
    }

    driver.send(VelocityCommand::stopped()).await?;
    Ok(controller)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        navigation::{ControllerSettings, NavigationState, Pose2d, Waypoint},
        simulation::SimulatedDriver,
    };
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct RecordingDriver {
        commands: Arc<Mutex<Vec<VelocityCommand>>>,
        reports: Arc<Mutex<Vec<NavigationStatus>>>,
    }

    #[async_trait]
    impl VelocityDriver for RecordingDriver {
        async fn send(&mut self, command: VelocityCommand) -> Result<()> {
            self.commands.lock().unwrap().push(command);
            Ok(())
        }

        async fn report(&mut self, status: &NavigationStatus) -> Result<()> {
            self.reports.lock().unwrap().push(status.clone());
            Ok(())
        }
    }

    struct FailingDriver;

    #[async_trait]
    impl VelocityDriver for FailingDriver {
        async fn send(&mut self, _command: VelocityCommand) -> Result<()> {
            Err(anyhow::anyhow!("motor controller unplugged"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reaches_done_and_keeps_sending_zero() {
        let tracker = PoseTracker::default();
        let controller = NavigationController::new(
            vec![Waypoint::new(0.05, 0.0)],
            ControllerSettings::default(),
        );
        let mut driver = RecordingDriver::default();

        let controller = run_navigation_loop(
            controller,
            tracker,
            &mut driver,
            Duration::from_millis(5),
            tokio::time::sleep(Duration::from_millis(300)),
        )
        .await
        .unwrap();

        assert_eq!(controller.state(), NavigationState::Done);
        let commands = driver.commands.lock().unwrap();
        // 300ms of 5ms ticks on the paused clock, plus the final stop
        assert!(commands.len() > 50);
        // the MOVE tick that reaches the waypoint still carries a small forward speed
        assert!(commands.iter().any(|command| command.linear() > 0.0));
        assert!(commands.iter().rev().take(3).all(|command| command.is_stopped()));

        let reports = driver.reports.lock().unwrap();
        let completed: Vec<_> = reports.iter().filter(|status| status.completed).collect();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].current_index, 1);
        assert_eq!(completed[0].waypoint_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn drives_simulated_robot() {
        let tracker = PoseTracker::default();
        let controller = NavigationController::new(
            vec![Waypoint::new(0.5, 0.0)],
            ControllerSettings::default(),
        );
        // simulated time runs twenty times faster than the tick timer
        let mut driver =
            SimulatedDriver::new(Pose2d::default(), tracker.clone(), Duration::from_millis(100));

        let controller = run_navigation_loop(
            controller,
            tracker.clone(),
            &mut driver,
            Duration::from_millis(5),
            tokio::time::sleep(Duration::from_secs(2)),
        )
        .await
        .unwrap();

        assert!(controller.is_done());
        assert!((tracker.read().x() - 0.5).abs() < 0.15);
    }

    #[tokio::test(start_paused = true)]
    async fn driver_failure_stops_the_loop() {
        let controller = NavigationController::new(
            vec![Waypoint::new(1.0, 0.0)],
            ControllerSettings::default(),
        );
        let result = run_navigation_loop(
            controller,
            PoseTracker::default(),
            &mut FailingDriver,
            Duration::from_millis(5),
            std::future::pending(),
        )
        .await;
        assert!(result.is_err());
    }
}
