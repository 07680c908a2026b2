//! Events decoded from sensor frames.

use crate::constants::PM_SCALE;
use crate::types::*;

/// A frame received from the sensor, decoded and validated.
///
/// One event is produced per valid frame. Frames that fail validation never
/// produce an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecodedEvent {
    /// Measurement report, sent periodically or in reply to a data query.
    MeasurementReport {
        /// PM2.5 concentration in µg/m³.
        pm2_5: f32,
        /// PM10 concentration in µg/m³.
        pm10: f32,
        /// Reporting device.
        device_id: DeviceId,
    },

    /// Reply to a sleep/work command.
    SleepWakeAck {
        /// Whether the command was a query or a set.
        mode: AccessMode,
        /// Whether the sensor is (now) sleeping.
        is_sleep: bool,
        /// Replying device.
        device_id: DeviceId,
    },

    /// Reply to a firmware version query.
    FirmwareAck {
        /// 24-bit firmware version, see [`FirmwareDate`].
        version: u32,
        /// Replying device.
        device_id: DeviceId,
    },

    /// Reply to a working period command.
    PeriodAck {
        /// Whether the command was a query or a set.
        mode: AccessMode,
        /// Working period as held by the device (0 = continuous).
        period: u8,
        /// Replying device.
        device_id: DeviceId,
    },
}

impl DecodedEvent {
    /// Build a measurement report from the raw fixed-point values.
    pub fn measurement(pm2_5_raw: u16, pm10_raw: u16, device_id: DeviceId) -> Self {
        DecodedEvent::MeasurementReport {
            pm2_5: f32::from(pm2_5_raw) / PM_SCALE,
            pm10: f32::from(pm10_raw) / PM_SCALE,
            device_id,
        }
    }

    /// Device that sent the frame.
    pub fn device_id(&self) -> DeviceId {
        match self {
            DecodedEvent::MeasurementReport { device_id, .. }
            | DecodedEvent::SleepWakeAck { device_id, .. }
            | DecodedEvent::FirmwareAck { device_id, .. }
            | DecodedEvent::PeriodAck { device_id, .. } => *device_id,
        }
    }

    /// Short name of the event kind, used for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            DecodedEvent::MeasurementReport { .. } => "measurement",
            DecodedEvent::SleepWakeAck { .. } => "sleep_wake",
            DecodedEvent::FirmwareAck { .. } => "firmware",
            DecodedEvent::PeriodAck { .. } => "period",
        }
    }

    /// Whether this event acknowledges a command.
    pub fn is_ack(&self) -> bool {
        !matches!(self, DecodedEvent::MeasurementReport { .. })
    }
}

impl std::fmt::Display for DecodedEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodedEvent::MeasurementReport { pm2_5, pm10, device_id } => {
                write!(f, "[{}] PM2.5 {:.1} µg/m³, PM10 {:.1} µg/m³", device_id, pm2_5, pm10)
            }
            DecodedEvent::SleepWakeAck { mode, is_sleep, device_id } => {
                let state = if *is_sleep { "sleeping" } else { "working" };
                write!(f, "[{}] sleep/work {}: {}", device_id, mode, state)
            }
            DecodedEvent::FirmwareAck { version, device_id } => {
                write!(f, "[{}] firmware {}", device_id, FirmwareDate::from_version(*version))
            }
            DecodedEvent::PeriodAck { mode, period, device_id } => {
                write!(f, "[{}] working period {}: {}", device_id, mode, period)
            }
        }
    }
}
