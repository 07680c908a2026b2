//! Per-sensor I/O channel.
//!
//! Each sensor gets its own task that owns the connection and that sensor's
//! [`FrameDecoder`]. Received bytes are fed to the decoder in order; decoded
//! events are forwarded, tagged with the sensor name, to a shared event
//! channel. Commands reach the task through a per-sensor command channel and
//! are written to the connection as whole frames.
//!
//! There are no read timeouts: a partial frame waits for more bytes until
//! the stream ends or the channel is stopped.

use bytes::BytesMut;
use chrono::{DateTime, Utc};
use sds011_protocol::{encode, Command, CommandFrame, DecodedEvent, DecoderStats, FrameDecoder};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::error::{MonitorError, MonitorResult};
use crate::telemetry;
use crate::transport::ByteStream;

/// Read buffer size; one read rarely carries more than a few frames.
const READ_CHUNK: usize = 256;

/// Queued commands per sensor.
const COMMAND_QUEUE: usize = 16;

/// A decoded event together with where and when it arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorEvent {
    /// Name of the sensor that sent the frame.
    pub sensor: String,
    /// The decoded frame.
    pub event: DecodedEvent,
    /// Time the completing byte was read.
    pub received_at: DateTime<Utc>,
}

/// Final state of a channel after its stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSummary {
    /// Sensor name.
    pub sensor: String,
    /// Decoder counters at shutdown.
    pub stats: DecoderStats,
    /// Command frames written.
    pub commands_sent: u64,
}

/// Handle for talking to a running channel task.
#[derive(Debug)]
pub struct ChannelHandle {
    sensor: String,
    commands: mpsc::Sender<CommandFrame>,
    stop: oneshot::Sender<()>,
    task: JoinHandle<MonitorResult<ChannelSummary>>,
}

impl ChannelHandle {
    /// Name of the sensor this channel serves.
    pub fn sensor(&self) -> &str {
        &self.sensor
    }

    /// Encode a command and queue it for transmission.
    pub async fn send(&self, command: Command, parameter: Option<i32>) -> MonitorResult<()> {
        let frame = encode(command, parameter)?;
        debug!(sensor = %self.sensor, %command, ?parameter, "Queueing command");
        self.commands
            .send(frame)
            .await
            .map_err(|_| MonitorError::ChannelClosed(self.sensor.clone()))
    }

    /// Stop accepting commands and wait for the stream to end.
    pub async fn join(self) -> MonitorResult<ChannelSummary> {
        let ChannelHandle { sensor, commands, stop, task } = self;
        drop(commands);
        let result = task.await.map_err(|_| MonitorError::ChannelClosed(sensor))?;
        drop(stop);
        result
    }

    /// Ask the task to stop now and collect its summary.
    ///
    /// Any partial frame in the decoder is discarded.
    pub async fn stop(self) -> MonitorResult<ChannelSummary> {
        let ChannelHandle { sensor, commands, stop, task } = self;
        drop(commands);
        // Fails only if the task already ended.
        let _ = stop.send(());
        task.await.map_err(|_| MonitorError::ChannelClosed(sensor))?
    }

    /// Abort the channel task without waiting for the stream to end.
    pub fn abort(&self) {
        self.task.abort();
    }
}

/// Spawn the I/O task for one sensor.
pub fn spawn_channel<S>(sensor: impl Into<String>, stream: S, events: mpsc::Sender<SensorEvent>) -> ChannelHandle
where
    S: ByteStream + 'static,
{
    let sensor = sensor.into();
    let (commands, command_rx) = mpsc::channel(COMMAND_QUEUE);
    let (stop, stop_rx) = oneshot::channel();
    let task = tokio::spawn(run_channel(sensor.clone(), stream, command_rx, stop_rx, events));
    ChannelHandle {
        sensor,
        commands,
        stop,
        task,
    }
}

/// Pump bytes between the connection, the decoder and the channels.
async fn run_channel<S>(
    sensor: String,
    stream: S,
    mut commands: mpsc::Receiver<CommandFrame>,
    mut stop: oneshot::Receiver<()>,
    events: mpsc::Sender<SensorEvent>,
) -> MonitorResult<ChannelSummary>
where
    S: ByteStream,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    let mut decoder = FrameDecoder::new();
    let mut buf = BytesMut::with_capacity(READ_CHUNK);
    let mut commands_open = true;
    let mut stop_open = true;
    let mut commands_sent = 0u64;

    info!(sensor = %sensor, "Channel started");

    loop {
        tokio::select! {
            result = reader.read_buf(&mut buf) => {
                let n = result?;
                if n == 0 {
                    info!(sensor = %sensor, "Sensor stream closed");
                    break;
                }
                trace!(sensor = %sensor, bytes = %hex::encode(&buf[..]), "Received");
                telemetry::record_bytes(&sensor, n);

                let before = *decoder.stats();
                let received_at = Utc::now();
                let mut decoded = Vec::new();
                decoder.feed_all(&buf, |event| decoded.push(event));
                buf.clear();

                let after = *decoder.stats();
                telemetry::record_decoder_progress(&sensor, &before, &after);
                if after.rejected() > before.rejected() {
                    if let Some(rejection) = decoder.last_rejection() {
                        debug!(sensor = %sensor, %rejection, "Dropped malformed frame");
                    }
                }

                for event in decoded {
                    telemetry::record_event(&sensor, &event);
                    let tagged = SensorEvent { sensor: sensor.clone(), event, received_at };
                    if events.send(tagged).await.is_err() {
                        warn!(sensor = %sensor, "Event receiver dropped, stopping channel");
                        return Ok(summary(sensor, &decoder, commands_sent));
                    }
                }
            }

            command = commands.recv(), if commands_open => {
                match command {
                    Some(frame) => {
                        trace!(sensor = %sensor, bytes = %hex::encode(frame), "Sending");
                        writer.write_all(&frame).await?;
                        writer.flush().await?;
                        commands_sent += 1;
                        telemetry::record_command(&sensor);
                    }
                    None => {
                        debug!(sensor = %sensor, "Command channel closed, receive only");
                        commands_open = false;
                    }
                }
            }

            requested = &mut stop, if stop_open => {
                match requested {
                    Ok(()) => {
                        info!(sensor = %sensor, "Channel stopped");
                        break;
                    }
                    Err(_) => stop_open = false,
                }
            }
        }
    }

    Ok(summary(sensor, &decoder, commands_sent))
}

fn summary(sensor: String, decoder: &FrameDecoder, commands_sent: u64) -> ChannelSummary {
    ChannelSummary {
        sensor,
        stats: *decoder.stats(),
        commands_sent,
    }
}
