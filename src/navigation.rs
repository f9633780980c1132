use crate::command::VelocityCommand;
use crate::error::ConfigError;
use nalgebra as na;
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};
use std::fmt;
use tracing::{debug, info};

/// Wrap any angle into `(-PI, PI]`.
///
/// Angles already inside the interval are returned untouched so that the
/// function is idempotent bit for bit.
pub fn normalize_angle(angle: f32) -> f32 {
    if angle > -PI && angle <= PI {
        return angle;
    }
    // rem_euclid may round up to TAU, which still lands on PI below
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        PI
    } else {
        wrapped
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose2d {
    position: na::Point2<f32>,
    heading: f32,
}

impl Pose2d {
    pub fn from_na(position: na::Point2<f32>, heading: f32) -> Self {
        Self {
            position,
            heading: normalize_angle(heading),
        }
    }

    pub fn new((x, y): (f32, f32), heading: f32) -> Self {
        Self::from_na(na::Point2::new(x, y), heading)
    }

    pub fn position(&self) -> &na::Point2<f32> {
        &self.position
    }

    pub fn x(&self) -> f32 {
        self.position.x
    }

    pub fn y(&self) -> f32 {
        self.position.y
    }

    /// Yaw in radians, always inside `(-PI, PI]`
    pub fn heading(&self) -> f32 {
        self.heading
    }
}

impl Default for Pose2d {
    fn default() -> Self {
        Self::new((0.0, 0.0), 0.0)
    }
}

impl fmt::Display for Pose2d {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{:.3}, {:.3}] -> {:.1}",
            self.position.x,
            self.position.y,
            self.heading.to_degrees()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: f32,
    pub y: f32,
}

impl Waypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn position(&self) -> na::Point2<f32> {
        na::Point2::new(self.x, self.y)
    }
}

impl fmt::Display for Waypoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

/// Gains, tolerances and optional output limits of the control law.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct ControllerSettings {
    #[serde(default = "default_angular_gain")]
    pub angular_gain: f32,
    #[serde(default = "default_linear_gain")]
    pub linear_gain: f32,
    /// radians
    #[serde(default = "default_angle_tolerance")]
    pub angle_tolerance: f32,
    #[serde(default = "default_distance_tolerance")]
    pub distance_tolerance: f32,
    #[serde(default)]
    pub max_linear_speed: Option<f32>,
    #[serde(default)]
    pub max_angular_speed: Option<f32>,
}

fn default_angular_gain() -> f32 {
    1.5
}

fn default_linear_gain() -> f32 {
    0.5
}

fn default_angle_tolerance() -> f32 {
    0.05
}

fn default_distance_tolerance() -> f32 {
    0.15
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            angular_gain: default_angular_gain(),
            linear_gain: default_linear_gain(),
            angle_tolerance: default_angle_tolerance(),
            distance_tolerance: default_distance_tolerance(),
            max_linear_speed: None,
            max_angular_speed: None,
        }
    }
}

impl ControllerSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(value: f32) -> bool {
            value.is_finite() && value > 0.0
        }

        for (name, value) in [
            ("angular_gain", self.angular_gain),
            ("linear_gain", self.linear_gain),
        ] {
            if !positive(value) {
                return Err(ConfigError::InvalidGain { name, value });
            }
        }
        for (name, value) in [
            ("angle_tolerance", self.angle_tolerance),
            ("distance_tolerance", self.distance_tolerance),
        ] {
            if !positive(value) {
                return Err(ConfigError::InvalidTolerance { name, value });
            }
        }
        for (name, limit) in [
            ("max_linear_speed", self.max_linear_speed),
            ("max_angular_speed", self.max_angular_speed),
        ] {
            if let Some(value) = limit {
                if !positive(value) {
                    return Err(ConfigError::InvalidSpeedLimit { name, value });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NavigationState {
    Idle,
    Rotate,
    Move,
    Advance,
    Done,
}

impl fmt::Display for NavigationState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            NavigationState::Idle => "IDLE",
            NavigationState::Rotate => "ROTATE",
            NavigationState::Move => "MOVE",
            NavigationState::Advance => "ADVANCE",
            NavigationState::Done => "DONE",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationEvent {
    /// IDLE handed waypoint `index` to ROTATE
    WaypointStarted { index: usize },
    /// ADVANCE moved past waypoint `index`
    WaypointReached { index: usize },
    /// first tick spent in DONE
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutput {
    pub command: VelocityCommand,
    pub event: Option<NavigationEvent>,
}

/// Result of evaluating the current state once, before it is applied.
struct Transition {
    next: NavigationState,
    command: VelocityCommand,
    event: Option<NavigationEvent>,
}

impl Transition {
    fn to(next: NavigationState, command: VelocityCommand) -> Self {
        Self {
            next,
            command,
            event: None,
        }
    }

    fn with_event(mut self, event: NavigationEvent) -> Self {
        self.event = Some(event);
        self
    }
}

/// Finite-state waypoint follower.
///
/// Owns the waypoint list and the FSM state. It never touches the pose source
/// or the actuators, each call to [`NavigationController::tick`] takes a pose
/// snapshot and hands back the command for that tick.
///
/// A waypoint the robot can never get within `distance_tolerance` of keeps the
/// controller in MOVE forever. There is no timeout or recovery.
#[derive(Debug, Clone)]
pub struct NavigationController {
    settings: ControllerSettings,
    waypoints: Vec<Waypoint>,
    state: NavigationState,
    current_index: usize,
    completion_reported: bool,
}

impl NavigationController {
    pub fn new(waypoints: Vec<Waypoint>, settings: ControllerSettings) -> Self {
        Self {
            settings,
            waypoints,
            state: NavigationState::Idle,
            current_index: 0,
            completion_reported: false,
        }
    }

    pub fn state(&self) -> NavigationState {
        self.state
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn current_target(&self) -> Option<&Waypoint> {
        match self.state {
            NavigationState::Done => None,
            _ => self.waypoints.get(self.current_index),
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == NavigationState::Done
    }

    /// Run exactly one state evaluation and return the command for this tick.
    pub fn tick(&mut self, pose: &Pose2d) -> TickOutput {
        let transition = self.evaluate(pose);
        if transition.next != self.state {
            debug!(
                from = %self.state,
                to = %transition.next,
                index = self.current_index,
                "State transition"
            );
        }
        self.state = transition.next;
        TickOutput {
            command: transition.command,
            event: transition.event,
        }
    }

    fn evaluate(&mut self, pose: &Pose2d) -> Transition {
        use NavigationState::*;

        match self.state {
            Idle => {
                if self.current_index < self.waypoints.len() {
                    info!(
                        "Going to waypoint {} of {} at {}",
                        self.current_index + 1,
                        self.waypoints.len(),
                        self.waypoints[self.current_index]
                    );
                    Transition::to(Rotate, VelocityCommand::stopped()).with_event(
                        NavigationEvent::WaypointStarted {
                            index: self.current_index,
                        },
                    )
                } else {
                    Transition::to(Done, VelocityCommand::stopped())
                }
            }
            Rotate => {
                // ROTATE and MOVE are only entered from IDLE with a valid index
                let goal = self.waypoints[self.current_index];
                let error = heading_error(pose, &goal);
                let command = self.limit(VelocityCommand::rotation_only(
                    self.settings.angular_gain * error,
                ));
                if error.abs() < self.settings.angle_tolerance {
                    Transition::to(Move, command)
                } else {
                    Transition::to(Rotate, command)
                }
            }
            Move => {
                let goal = self.waypoints[self.current_index];
                let error = heading_error(pose, &goal);
                let distance = distance_to(pose, &goal);
                let command = self.limit(VelocityCommand::new(
                    self.settings.linear_gain * distance,
                    self.settings.angular_gain * error,
                ));
                if distance < self.settings.distance_tolerance {
                    Transition::to(Advance, command)
                } else {
                    Transition::to(Move, command)
                }
            }
            Advance => {
                let reached = self.current_index;
                self.current_index += 1;
                info!("Reached waypoint {} at {}", reached + 1, pose);
                Transition::to(Idle, VelocityCommand::stopped())
                    .with_event(NavigationEvent::WaypointReached { index: reached })
            }
            Done => {
                let transition = Transition::to(Done, VelocityCommand::stopped());
                if self.completion_reported {
                    transition
                } else {
                    self.completion_reported = true;
                    info!("All waypoints reached");
                    transition.with_event(NavigationEvent::Completed)
                }
            }
        }
    }

    fn limit(&self, command: VelocityCommand) -> VelocityCommand {
        command.clamped(
            self.settings.max_linear_speed,
            self.settings.max_angular_speed,
        )
    }
}

/// Signed angle the robot has to turn to face `goal`
pub fn heading_error(pose: &Pose2d, goal: &Waypoint) -> f32 {
    let delta = goal.position() - pose.position();
    let target_angle = delta.y.atan2(delta.x);
    normalize_angle(target_angle - pose.heading())
}

pub fn distance_to(pose: &Pose2d, goal: &Waypoint) -> f32 {
    na::distance(pose.position(), &goal.position())
}
