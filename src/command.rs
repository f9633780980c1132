/// Velocity for a differential-drive base.
///
/// `linear` is speed along the robot forward axis, `angular` is the yaw rate
/// about the vertical axis (counter-clockwise positive).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VelocityCommand {
    linear: f32,
    angular: f32,
}

impl VelocityCommand {
    pub fn new(linear: f32, angular: f32) -> VelocityCommand {
        VelocityCommand { linear, angular }
    }

    pub fn stopped() -> Self {
        Self {
            linear: 0.0,
            angular: 0.0,
        }
    }

    pub fn rotation_only(angular: f32) -> Self {
        Self {
            linear: 0.0,
            angular,
        }
    }

    /// Limit each component symmetrically. `None` leaves the component untouched.
    pub fn clamped(self, max_linear: Option<f32>, max_angular: Option<f32>) -> Self {
        let linear = match max_linear {
            Some(limit) => self.linear.clamp(-limit, limit),
            None => self.linear,
        };
        let angular = match max_angular {
            Some(limit) => self.angular.clamp(-limit, limit),
            None => self.angular,
        };
        Self { linear, angular }
    }

    pub fn is_stopped(&self) -> bool {
        self.linear == 0.0 && self.angular == 0.0
    }

    pub fn linear(&self) -> f32 {
        self.linear
    }

    pub fn angular(&self) -> f32 {
        self.angular
    }
}
