//! Rendering of decoded events for stdout.

use chrono::SecondsFormat;
use sds011_protocol::{DecodedEvent, FirmwareDate};
use serde_json::{json, Value};

use crate::channel::SensorEvent;
use crate::config::OutputFormat;
use crate::error::MonitorResult;

/// Render one event as a single output line (without newline).
pub fn render(event: &SensorEvent, format: OutputFormat) -> MonitorResult<String> {
    match format {
        OutputFormat::Text => Ok(render_text(event)),
        OutputFormat::Json => Ok(serde_json::to_string(&to_json(event))?),
    }
}

fn render_text(event: &SensorEvent) -> String {
    format!(
        "{} {} {}",
        event.received_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        event.sensor,
        event.event
    )
}

/// JSON object describing an event.
pub fn to_json(event: &SensorEvent) -> Value {
    let mut value = json!({
        "time": event.received_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        "sensor": event.sensor,
        "kind": event.event.kind(),
        "device_id": event.event.device_id().to_string(),
    });

    let fields = match event.event {
        DecodedEvent::MeasurementReport { pm2_5, pm10, .. } => json!({
            "pm2_5": round_tenths(pm2_5),
            "pm10": round_tenths(pm10),
        }),
        DecodedEvent::SleepWakeAck { mode, is_sleep, .. } => json!({
            "mode": mode.to_string(),
            "is_sleep": is_sleep,
        }),
        DecodedEvent::FirmwareAck { version, .. } => json!({
            "version": version,
            "firmware_date": FirmwareDate::from_version(version).to_string(),
        }),
        DecodedEvent::PeriodAck { mode, period, .. } => json!({
            "mode": mode.to_string(),
            "period": period,
        }),
    };

    if let (Some(target), Value::Object(extra)) = (value.as_object_mut(), fields) {
        target.extend(extra);
    }
    value
}

/// Keeps 12.3 from printing as 12.300000190734863.
fn round_tenths(value: f32) -> f64 {
    format!("{:.1}", value).parse().unwrap_or(f64::from(value))
}
