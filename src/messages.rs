use chrono::prelude::{DateTime, Utc};
use nalgebra as na;
use serde::{Deserialize, Serialize};

use crate::{
    command::VelocityCommand,
    localiser::PoseSample,
    navigation::{NavigationController, NavigationState},
};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Default)]
pub struct PointMessage {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct QuaternionMessage {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for QuaternionMessage {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

/// Odometry style pose sample as received over the wire
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PoseMessage {
    pub position: PointMessage,
    pub orientation: QuaternionMessage,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
}

impl From<&PoseMessage> for PoseSample {
    fn from(message: &PoseMessage) -> Self {
        let PointMessage { x, y, z } = message.position;
        let q = message.orientation;
        PoseSample::new(
            na::Point3::new(x, y, z),
            na::Quaternion::new(q.w, q.x, q.y, q.z),
        )
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct VelocityCommandMessage {
    pub linear: f32,
    pub angular: f32,
    pub time: DateTime<Utc>,
}

impl From<VelocityCommand> for VelocityCommandMessage {
    fn from(command: VelocityCommand) -> Self {
        Self {
            linear: command.linear(),
            angular: command.angular(),
            time: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NavigationStatus {
    pub state: NavigationState,
    pub current_index: usize,
    pub waypoint_count: usize,
    pub completed: bool,
    pub time: DateTime<Utc>,
}

impl NavigationStatus {
    pub fn from_controller(controller: &NavigationController) -> Self {
        Self {
            state: controller.state(),
            current_index: controller.current_index(),
            waypoint_count: controller.waypoints().len(),
            completed: controller.is_done(),
            time: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::{ControllerSettings, Waypoint};
    use approx::assert_relative_eq;

    #[test]
    fn parse_pose_message_without_time() {
        let json = r#"{
            "position": {"x": 1.5, "y": -2.0, "z": 0.1},
            "orientation": {"x": 0.0, "y": 0.0, "z": 0.7071068, "w": 0.7071068}
        }"#;
        let message: PoseMessage = serde_json::from_str(json).unwrap();
        assert_eq!(message.time, None);
        let pose = PoseSample::from(&message).to_pose();
        assert_relative_eq!(pose.x(), 1.5);
        assert_relative_eq!(pose.y(), -2.0);
        assert_relative_eq!(pose.heading(), std::f32::consts::FRAC_PI_2, epsilon = 1e-5);
    }

    #[test]
    fn parse_pose_message_with_time() {
        let json = r#"{
            "position": {"x": 0.0, "y": 0.0},
            "orientation": {"x": 0.0, "y": 0.0, "z": 0.0, "w": 1.0},
            "time": "2024-05-01T12:00:00Z"
        }"#;
        let message: PoseMessage = serde_json::from_str(json).unwrap();
        assert!(message.time.is_some());
        assert_eq!(message.position.z, 0.0);
    }

    #[test]
    fn status_serializes_state_name() {
        let controller = NavigationController::new(
            vec![Waypoint::new(1.0, 1.0)],
            ControllerSettings::default(),
        );
        let status = NavigationStatus::from_controller(&controller);
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "IDLE");
        assert_eq!(json["waypoint_count"], 1);
        assert_eq!(json["completed"], false);
    }

    #[test]
    fn command_message_keeps_components() {
        let message = VelocityCommandMessage::from(VelocityCommand::new(0.25, -0.5));
        assert_eq!(message.linear, 0.25);
        assert_eq!(message.angular, -0.5);
    }
}
