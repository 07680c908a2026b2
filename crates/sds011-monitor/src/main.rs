use std::path::PathBuf;

use clap::{ArgGroup, Parser};
use sds011_monitor::{
    describe_metrics, output, Monitor, MonitorConfig, MonitorError, MonitorResult, OutputFormat,
    PowerState, SensorConfig, TransportConfig,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sds011-monitor")]
#[command(about = "Read particulate measurements from SDS011 dust sensors")]
#[command(group(ArgGroup::new("source").args(["config", "serial", "tcp"]).required(true)))]
struct Cli {
    /// YAML file describing one or more sensors
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port of a single sensor (e.g. /dev/ttyUSB0)
    #[arg(long)]
    serial: Option<String>,

    /// TCP serial bridge of a single sensor, as host:port
    #[arg(long)]
    tcp: Option<String>,

    /// Name for the single sensor
    #[arg(long, default_value = "sds011")]
    name: String,

    /// Put the sensor to sleep at startup
    #[arg(long, conflicts_with = "wake")]
    sleep: bool,

    /// Wake the sensor at startup
    #[arg(long)]
    wake: bool,

    /// Set the working period at startup (0-30, 0 = continuous)
    #[arg(long)]
    period: Option<i32>,

    /// Ask for the firmware version at startup
    #[arg(long)]
    firmware: bool,

    /// Ask for one measurement at startup
    #[arg(long)]
    query: bool,

    /// Output format (overrides the config file)
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Serve Prometheus metrics on this address
    #[cfg(feature = "prometheus")]
    #[arg(long)]
    metrics_addr: Option<std::net::SocketAddr>,
}

impl Cli {
    /// Build the monitor config from the file or the single-sensor flags.
    fn monitor_config(&self) -> MonitorResult<MonitorConfig> {
        let mut config = match &self.config {
            Some(path) => {
                info!(path = ?path, "Loading configuration");
                MonitorConfig::load(path)?
            }
            None => {
                let transport = match (&self.serial, &self.tcp) {
                    (Some(port), _) => TransportConfig::Serial(port.clone()),
                    (None, Some(addr)) => TransportConfig::Tcp(addr.clone()),
                    (None, None) => {
                        return Err(MonitorError::InvalidConfig(
                            "one of --config, --serial or --tcp is required".to_string(),
                        ))
                    }
                };
                let mut sensor = SensorConfig::new(self.name.clone(), transport);
                sensor.power = if self.sleep {
                    Some(PowerState::Sleep)
                } else if self.wake {
                    Some(PowerState::Wake)
                } else {
                    None
                };
                sensor.period = self.period;
                sensor.query_firmware = self.firmware;
                sensor.query_data = self.query;
                MonitorConfig {
                    format: OutputFormat::default(),
                    sensors: vec![sensor],
                }
            }
        };

        if let Some(format) = self.format {
            config.format = format;
        }
        config.validate()?;
        Ok(config)
    }

    fn log_filter(&self) -> EnvFilter {
        let level = match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "sds011_monitor={level},sds011_protocol={level},warn"
            ))
        })
    }
}

#[cfg(feature = "prometheus")]
fn install_prometheus(addr: Option<std::net::SocketAddr>) -> MonitorResult<()> {
    let Some(addr) = addr else {
        return Ok(());
    };
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| MonitorError::InvalidConfig(format!("metrics exporter: {}", e)))?;
    info!(%addr, "Prometheus exporter listening");
    Ok(())
}

#[tokio::main]
async fn main() -> MonitorResult<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(cli.log_filter())
        .with_writer(std::io::stderr)
        .init();

    #[cfg(feature = "prometheus")]
    install_prometheus(cli.metrics_addr)?;
    describe_metrics();

    let config = cli.monitor_config()?;
    info!(sensors = config.sensors.len(), format = ?config.format, "Starting sds011-monitor");

    let mut monitor = Monitor::connect(&config).await?;

    loop {
        tokio::select! {
            event = monitor.next_event() => {
                let Some(event) = event else {
                    info!("All sensor streams closed");
                    break;
                };
                match output::render(&event, config.format) {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!(sensor = %event.sensor, error = %e, "Failed to render event"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    for result in monitor.shutdown().await {
        match result {
            Ok(summary) => info!(
                sensor = %summary.sensor,
                events = summary.stats.events,
                rejected = summary.stats.rejected(),
                skipped_bytes = summary.stats.skipped_bytes,
                commands_sent = summary.commands_sent,
                "Channel summary"
            ),
            Err(e) => error!(error = %e, "Channel failed"),
        }
    }

    Ok(())
}
