//! Monitor configuration.
//!
//! Sensors are described in a YAML file:
//!
//! ```yaml
//! format: json
//! sensors:
//!   - name: balcony
//!     transport:
//!       serial: /dev/ttyUSB0
//!     power: wake
//!     period: 1
//!     query_firmware: true
//!   - name: garage
//!     transport:
//!       tcp: 192.168.1.40:4001
//! ```
//!
//! The same structure is built from command-line flags when no file is
//! given.

use std::collections::HashSet;
use std::path::Path;

use sds011_protocol::{encode, Command};
use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, MonitorResult};

/// How a sensor is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportConfig {
    /// Local serial port path (e.g. `/dev/ttyUSB0`, `COM3`).
    Serial(String),
    /// TCP serial bridge address (e.g. `ser2net`), as `host:port`.
    Tcp(String),
}

impl std::fmt::Display for TransportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportConfig::Serial(path) => write!(f, "serial:{}", path),
            TransportConfig::Tcp(addr) => write!(f, "tcp:{}", addr),
        }
    }
}

/// Sleep/work state to request at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    /// Send the sleep command.
    Sleep,
    /// Send the wake command.
    Wake,
}

/// Output format for decoded events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// One human-readable line per event.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Configuration for one sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Name used in logs, metrics and output.
    pub name: String,
    /// Connection to the sensor.
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub transport: TransportConfig,
    /// Sleep/work state to request at startup.
    #[serde(default)]
    pub power: Option<PowerState>,
    /// Working period to set at startup (0-30, 0 = continuous).
    #[serde(default)]
    pub period: Option<i32>,
    /// Ask for the firmware version at startup.
    #[serde(default)]
    pub query_firmware: bool,
    /// Ask for one measurement at startup.
    #[serde(default)]
    pub query_data: bool,
}

impl SensorConfig {
    /// Create a sensor config with no startup commands.
    pub fn new(name: impl Into<String>, transport: TransportConfig) -> Self {
        SensorConfig {
            name: name.into(),
            transport,
            power: None,
            period: None,
            query_firmware: false,
            query_data: false,
        }
    }

    /// Commands to send once the channel is open, in order.
    ///
    /// Power state goes first so a sleeping sensor answers the rest.
    pub fn startup_commands(&self) -> Vec<(Command, Option<i32>)> {
        let mut commands = Vec::new();
        match self.power {
            Some(PowerState::Wake) => commands.push((Command::Wake, None)),
            Some(PowerState::Sleep) => commands.push((Command::Sleep, None)),
            None => {}
        }
        if self.query_firmware {
            commands.push((Command::QueryFirmwareVersion, None));
        }
        if let Some(period) = self.period {
            commands.push((Command::SetReportingPeriod, Some(period)));
        }
        if self.query_data {
            commands.push((Command::QueryData, None));
        }
        commands
    }
}

/// Top-level monitor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Event output format.
    #[serde(default)]
    pub format: OutputFormat,
    /// Sensors to monitor, one channel each.
    pub sensors: Vec<SensorConfig>,
}

impl MonitorConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> MonitorResult<Self> {
        let config: MonitorConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> MonitorResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Check the config for problems that would only surface at runtime.
    pub fn validate(&self) -> MonitorResult<()> {
        if self.sensors.is_empty() {
            return Err(MonitorError::InvalidConfig("no sensors configured".to_string()));
        }

        let mut names = HashSet::new();
        for sensor in &self.sensors {
            if sensor.name.trim().is_empty() {
                return Err(MonitorError::InvalidConfig("sensor name must not be empty".to_string()));
            }
            if !names.insert(sensor.name.as_str()) {
                return Err(MonitorError::InvalidConfig(format!(
                    "duplicate sensor name '{}'",
                    sensor.name
                )));
            }
            // Encoding every startup command catches out-of-range periods up front.
            for (command, parameter) in sensor.startup_commands() {
                encode(command, parameter)?;
            }
        }
        Ok(())
    }
}
