use thiserror::Error;

#[derive(Error, Debug)]
pub enum ErrorWrapper {
    #[error("Zenoh error {0:?}")]
    ZenohError(zenoh::Error),
}

/// Rejections raised while validating configuration before the control loop starts.
#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("waypoint list is empty")]
    NoWaypoints,
    #[error("waypoint {index} has non-finite coordinates ({x}, {y})")]
    NonFiniteWaypoint { index: usize, x: f32, y: f32 },
    #[error("{name} must be finite and positive, got {value}")]
    InvalidGain { name: &'static str, value: f32 },
    #[error("{name} must be finite and positive, got {value}")]
    InvalidTolerance { name: &'static str, value: f32 },
    #[error("{name} must be finite and positive when set, got {value}")]
    InvalidSpeedLimit { name: &'static str, value: f32 },
    #[error("tick period must be longer than zero")]
    ZeroTickPeriod,
}
