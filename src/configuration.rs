use config::Config;
use serde::Deserialize;
use std::{path::PathBuf, str, time::Duration};
use tracing::*;

use crate::{
    error::{ConfigError, ErrorWrapper},
    navigation::{ControllerSettings, NavigationController, Waypoint},
    simulation::SimulationConfig,
};

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub topics: TopicConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub zenoh: NavigatorZenohConfig,
}

impl AppConfig {
    pub fn load_config(config: &Option<PathBuf>) -> anyhow::Result<Self> {
        let settings = if let Some(config) = config {
            info!("Using configuration from {:?}", config);
            Config::builder()
                .add_source(config::File::with_name(
                    config
                        .to_str()
                        .ok_or_else(|| anyhow::anyhow!("Failed to convert path"))?,
                ))
                .add_source(environment_source())
                .build()?
        } else {
            info!("Using dev configuration");
            Config::builder()
                .add_source(config::File::with_name("config/settings"))
                .add_source(config::File::with_name("config/dev_settings").required(false))
                .add_source(environment_source())
                .build()?
        };

        let app_config: AppConfig = settings.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.navigation.validate()
    }
}

/// `APP_NAVIGATION__TICK_PERIOD_MS` overrides `navigation.tick_period_ms`
fn environment_source() -> config::Environment {
    config::Environment::with_prefix("APP")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Everything the control loop needs, fixed before it starts
#[derive(Deserialize, Debug, Clone)]
pub struct NavigationConfig {
    pub waypoints: Vec<Waypoint>,
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u64,
    #[serde(default)]
    pub control: ControllerSettings,
}

fn default_tick_period_ms() -> u64 {
    50
}

impl NavigationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.waypoints.is_empty() {
            return Err(ConfigError::NoWaypoints);
        }
        for (index, waypoint) in self.waypoints.iter().enumerate() {
            if !waypoint.x.is_finite() || !waypoint.y.is_finite() {
                return Err(ConfigError::NonFiniteWaypoint {
                    index,
                    x: waypoint.x,
                    y: waypoint.y,
                });
            }
        }
        if self.tick_period_ms == 0 {
            return Err(ConfigError::ZeroTickPeriod);
        }
        self.control.validate()
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    pub fn build_controller(&self) -> NavigationController {
        NavigationController::new(self.waypoints.clone(), self.control)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct TopicConfig {
    #[serde(default = "default_pose_topic")]
    pub pose: String,
    #[serde(default = "default_command_topic")]
    pub command: String,
    #[serde(default = "default_status_topic")]
    pub status: String,
}

fn default_pose_topic() -> String {
    String::from("navigation/pose")
}

fn default_command_topic() -> String {
    String::from("navigation/cmd_vel")
}

fn default_status_topic() -> String {
    String::from("navigation/status")
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            pose: default_pose_topic(),
            command: default_command_topic(),
            status: default_status_topic(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct NavigatorZenohConfig {
    #[serde(default)]
    pub connect: Vec<zenoh_config::EndPoint>,
    #[serde(default)]
    pub listen: Vec<zenoh_config::EndPoint>,
    #[serde(default)]
    pub config_path: Option<String>,
}

impl NavigatorZenohConfig {
    pub fn get_zenoh_config(&self) -> anyhow::Result<zenoh::config::Config> {
        let mut config = if let Some(conf_file) = &self.config_path {
            zenoh::config::Config::from_file(conf_file).map_err(ErrorWrapper::ZenohError)?
        } else {
            zenoh::config::Config::default()
        };
        if !self.connect.is_empty() {
            config.connect.endpoints.clone_from(&self.connect);
        }
        if !self.listen.is_empty() {
            config.listen.endpoints.clone_from(&self.listen);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static DEFAULT_CONFIG: &str = include_str!("../config/settings.yaml");

    fn parse(yaml: &str) -> AppConfig {
        Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize::<AppConfig>()
            .unwrap()
    }

    #[test]
    fn test_config() {
        let app_config = parse(DEFAULT_CONFIG);
        app_config.validate().unwrap();
        assert_eq!(app_config.navigation.waypoints.len(), 12);
        assert_eq!(app_config.navigation.waypoints[0], Waypoint::new(2.7, 0.0));
        assert_eq!(app_config.navigation.tick_period(), Duration::from_millis(50));
        assert_eq!(app_config.navigation.control, ControllerSettings::default());
    }

    #[test]
    fn environment_overrides_file() {
        std::env::set_var("APP_NAVIGATION__TICK_PERIOD_MS", "20");
        let app_config = AppConfig::load_config(&Some(PathBuf::from("config/settings.yaml")));
        std::env::remove_var("APP_NAVIGATION__TICK_PERIOD_MS");

        let app_config = app_config.unwrap();
        assert_eq!(app_config.navigation.tick_period_ms, 20);
        assert_eq!(app_config.navigation.waypoints.len(), 12);
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let app_config = parse(
            r#"
navigation:
  waypoints:
    - x: 1.0
      y: 2.0
"#,
        );
        app_config.validate().unwrap();
        assert_eq!(app_config.navigation.tick_period_ms, 50);
        assert_eq!(app_config.navigation.control, ControllerSettings::default());
        assert_eq!(app_config.topics.pose, "navigation/pose");
        assert_eq!(app_config.simulation, SimulationConfig::default());
    }

    #[test]
    fn speed_limits_are_read() {
        let app_config = parse(
            r#"
navigation:
  control:
    max_linear_speed: 0.4
    max_angular_speed: 1.0
  waypoints:
    - x: 1.0
      y: 2.0
"#,
        );
        assert_eq!(app_config.navigation.control.max_linear_speed, Some(0.4));
        assert_eq!(app_config.navigation.control.max_angular_speed, Some(1.0));
    }

    #[test]
    fn empty_waypoint_list_is_rejected() {
        let app_config = parse(
            r#"
navigation:
  waypoints: []
"#,
        );
        assert_eq!(app_config.validate(), Err(ConfigError::NoWaypoints));
    }

    #[test]
    fn zero_tick_period_is_rejected() {
        let app_config = parse(
            r#"
navigation:
  tick_period_ms: 0
  waypoints:
    - x: 1.0
      y: 2.0
"#,
        );
        assert_eq!(app_config.validate(), Err(ConfigError::ZeroTickPeriod));
    }

    #[test]
    fn non_finite_waypoint_is_rejected() {
        let config = NavigationConfig {
            waypoints: vec![Waypoint::new(1.0, 1.0), Waypoint::new(f32::INFINITY, 0.0)],
            tick_period_ms: 50,
            control: ControllerSettings::default(),
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonFiniteWaypoint { index: 1, .. })
        ));
    }

    #[test]
    fn negative_gain_is_rejected() {
        let config = NavigationConfig {
            waypoints: vec![Waypoint::new(1.0, 1.0)],
            tick_period_ms: 50,
            control: ControllerSettings {
                linear_gain: -0.5,
                ..Default::default()
            },
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidGain {
                name: "linear_gain",
                ..
            })
        ));
    }
}
