//! Metric declarations for the monitor.
//!
//! Metrics are declared as [`Metric`] constants so names, descriptions and
//! label keys live in one place. Without an installed recorder the
//! `metrics` macros are no-ops.

use metrics::{counter, describe_counter, Unit};
use sds011_protocol::{DecodedEvent, DecoderStats};

/// A counter declaration with its metadata.
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "sds011.frames.rejected").
    pub name: &'static str,
    /// Human-readable description of the metric.
    pub description: &'static str,
    /// The unit of measurement.
    pub unit: Unit,
    /// Expected label keys for this metric.
    pub labels: &'static [&'static str],
}

impl Metric {
    /// Creates a new counter metric with the given name.
    pub const fn counter(name: &'static str) -> Self {
        Self {
            name,
            description: "",
            unit: Unit::Count,
            labels: &[],
        }
    }

    /// Sets the description.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    /// Sets the expected label keys.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers the description with the installed recorder.
    pub fn describe(&self) {
        describe_counter!(self.name, self.unit, self.description);
    }
}

/// All metric definitions for the monitor.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Bytes read from a sensor connection.
    ///
    /// Labels: sensor
    pub const BYTES_RECEIVED: Metric = Metric::counter("sds011.bytes.received")
        .with_description("Bytes read from the sensor connection")
        .with_unit(Unit::Bytes)
        .with_labels(&["sensor"]);

    /// Bytes skipped while waiting for a start marker.
    ///
    /// Labels: sensor
    pub const BYTES_SKIPPED: Metric = Metric::counter("sds011.bytes.skipped")
        .with_description("Bytes ignored between frames")
        .with_unit(Unit::Bytes)
        .with_labels(&["sensor"]);

    /// Valid frames decoded into events.
    ///
    /// Labels: sensor, kind
    pub const EVENTS_DECODED: Metric = Metric::counter("sds011.events.decoded")
        .with_description("Valid frames decoded into events")
        .with_labels(&["sensor", "kind"]);

    /// Valid acknowledgements that have no event (set-device-id).
    ///
    /// Labels: sensor
    pub const ACKS_UNREPORTED: Metric = Metric::counter("sds011.acks.unreported")
        .with_description("Valid acknowledgements without a matching event")
        .with_labels(&["sensor"]);

    /// Frames dropped by the decoder.
    ///
    /// Labels: sensor, reason (framing, checksum, terminator)
    pub const FRAMES_REJECTED: Metric = Metric::counter("sds011.frames.rejected")
        .with_description("Frames dropped by the decoder")
        .with_labels(&["sensor", "reason"]);

    /// Command frames written to a sensor.
    ///
    /// Labels: sensor
    pub const COMMANDS_SENT: Metric = Metric::counter("sds011.commands.sent")
        .with_description("Command frames written to the sensor")
        .with_labels(&["sensor"]);

    /// Every metric above.
    pub const ALL: &[Metric] = &[
        BYTES_RECEIVED,
        BYTES_SKIPPED,
        EVENTS_DECODED,
        ACKS_UNREPORTED,
        FRAMES_REJECTED,
        COMMANDS_SENT,
    ];
}

/// Register descriptions for all metrics. Call once at startup.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

/// Count one decoded event.
pub fn record_event(sensor: &str, event: &DecodedEvent) {
    counter!(
        metric_defs::EVENTS_DECODED.name,
        "sensor" => sensor.to_string(),
        "kind" => event.kind()
    )
    .increment(1);
}

/// Count one command frame written.
pub fn record_command(sensor: &str) {
    counter!(metric_defs::COMMANDS_SENT.name, "sensor" => sensor.to_string()).increment(1);
}

/// Count bytes read from the connection.
pub fn record_bytes(sensor: &str, count: usize) {
    counter!(metric_defs::BYTES_RECEIVED.name, "sensor" => sensor.to_string()).increment(count as u64);
}

/// Counter increments between two decoder snapshots.
///
/// Returns `(reason, delta)` pairs for each rejection reason that grew.
pub fn rejection_deltas(before: &DecoderStats, after: &DecoderStats) -> Vec<(&'static str, u64)> {
    [
        ("framing", after.framing_errors - before.framing_errors),
        ("checksum", after.checksum_errors - before.checksum_errors),
        ("terminator", after.terminator_errors - before.terminator_errors),
    ]
    .into_iter()
    .filter(|&(_, delta)| delta > 0)
    .collect()
}

/// Publish what the decoder counted since the previous snapshot.
pub fn record_decoder_progress(sensor: &str, before: &DecoderStats, after: &DecoderStats) {
    for (reason, delta) in rejection_deltas(before, after) {
        counter!(
            metric_defs::FRAMES_REJECTED.name,
            "sensor" => sensor.to_string(),
            "reason" => reason
        )
        .increment(delta);
    }

    let skipped = after.skipped_bytes - before.skipped_bytes;
    if skipped > 0 {
        counter!(metric_defs::BYTES_SKIPPED.name, "sensor" => sensor.to_string()).increment(skipped);
    }

    let unreported = after.unreported_acks - before.unreported_acks;
    if unreported > 0 {
        counter!(metric_defs::ACKS_UNREPORTED.name, "sensor" => sensor.to_string()).increment(unreported);
    }
}
