//! Host-side monitor for SDS011 dust sensors.
//!
//! Each configured sensor gets a channel task that owns the connection
//! (serial port or TCP serial bridge), feeds received bytes through an
//! [`sds011_protocol::FrameDecoder`] and writes command frames. Decoded
//! events from all sensors are merged by [`Monitor`] and rendered by
//! [`output::render`].
//!
//! ## Example
//!
//! ```no_run
//! use sds011_monitor::{Monitor, MonitorConfig, output};
//!
//! # async fn run() -> sds011_monitor::MonitorResult<()> {
//! let config = MonitorConfig::load("sensors.yaml")?;
//! let mut monitor = Monitor::connect(&config).await?;
//! while let Some(event) = monitor.next_event().await {
//!     println!("{}", output::render(&event, config.format)?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod monitor;
pub mod output;
pub mod telemetry;
pub mod transport;

pub use channel::{spawn_channel, ChannelHandle, ChannelSummary, SensorEvent};
pub use config::{MonitorConfig, OutputFormat, PowerState, SensorConfig, TransportConfig};
pub use error::{MonitorError, MonitorResult};
pub use monitor::Monitor;
pub use telemetry::{describe_metrics, metric_defs, Metric};
