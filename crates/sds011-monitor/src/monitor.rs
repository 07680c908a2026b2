//! Multi-sensor monitor.
//!
//! Opens one channel per configured sensor, sends each sensor its startup
//! commands and merges the decoded events into a single stream.

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::channel::{spawn_channel, ChannelHandle, ChannelSummary, SensorEvent};
use crate::config::{MonitorConfig, SensorConfig};
use crate::error::MonitorResult;
use crate::transport::{self, ByteStream};

/// Events buffered between the channels and the consumer.
const EVENT_QUEUE: usize = 256;

/// Running channels for a set of sensors.
pub struct Monitor {
    channels: Vec<ChannelHandle>,
    events: mpsc::Receiver<SensorEvent>,
    event_tx: Option<mpsc::Sender<SensorEvent>>,
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Monitor {
    /// Create a monitor with no channels.
    pub fn new() -> Self {
        let (event_tx, events) = mpsc::channel(EVENT_QUEUE);
        Monitor {
            channels: Vec::new(),
            events,
            event_tx: Some(event_tx),
        }
    }

    /// Connect to every sensor in `config` and send the startup commands.
    pub async fn connect(config: &MonitorConfig) -> MonitorResult<Self> {
        config.validate()?;
        let mut monitor = Monitor::new();
        for sensor in &config.sensors {
            if let Err(e) = monitor.connect_sensor(sensor).await {
                warn!(sensor = %sensor.name, error = %e, "Failed to start sensor, stopping the others");
                monitor.shutdown().await;
                return Err(e);
            }
        }
        monitor.seal();
        Ok(monitor)
    }

    async fn connect_sensor(&mut self, sensor: &SensorConfig) -> MonitorResult<()> {
        let stream = transport::open(&sensor.transport).await?;
        self.attach(sensor, stream).await
    }

    /// Start a channel for `sensor` over an already open stream.
    ///
    /// If a startup command cannot be queued, the channel is aborted and
    /// the stream closed.
    pub async fn attach<S>(&mut self, sensor: &SensorConfig, stream: S) -> MonitorResult<()>
    where
        S: ByteStream + 'static,
    {
        let Some(event_tx) = self.event_tx.clone() else {
            return Err(crate::error::MonitorError::InvalidConfig(
                "monitor no longer accepts sensors".to_string(),
            ));
        };

        info!(sensor = %sensor.name, transport = %sensor.transport, "Attaching sensor");
        let handle = spawn_channel(sensor.name.clone(), stream, event_tx);
        for (command, parameter) in sensor.startup_commands() {
            if let Err(e) = handle.send(command, parameter).await {
                handle.abort();
                return Err(e);
            }
        }
        self.channels.push(handle);
        Ok(())
    }

    /// Stop accepting new sensors.
    ///
    /// After this, [`next_event`](Self::next_event) returns `None` once every
    /// channel has ended.
    pub fn seal(&mut self) {
        self.event_tx = None;
    }

    /// Wait for the next decoded event from any sensor.
    pub async fn next_event(&mut self) -> Option<SensorEvent> {
        self.events.recv().await
    }

    /// Channel for the named sensor.
    pub fn channel(&self, sensor: &str) -> Option<&ChannelHandle> {
        self.channels.iter().find(|c| c.sensor() == sensor)
    }

    /// Names of all attached sensors.
    pub fn sensors(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.sensor()).collect()
    }

    /// Stop every channel and collect what they report.
    pub async fn shutdown(self) -> Vec<MonitorResult<ChannelSummary>> {
        let Monitor { channels, events, .. } = self;
        drop(events);

        let mut summaries = Vec::with_capacity(channels.len());
        for channel in channels {
            let name = channel.sensor().to_string();
            let result = channel.stop().await;
            if let Err(e) = &result {
                warn!(sensor = %name, error = %e, "Channel ended with error");
            }
            summaries.push(result);
        }
        summaries
    }
}
