//! Frame decoding.
//!
//! The sensor sends 10-byte frames. Measurement reports and command
//! acknowledgements share the same outer shape:
//!
//! ```text
//! +----+----+--------------------------+-------+-------+-----+----+
//! | AA | C0 | pm25 lo pm25 hi pm10 lo  | id lo | id hi | sum | AB |
//! |    |    | pm10 hi                  |       |       |     |    |
//! +----+----+--------------------------+-------+-------+-----+----+
//! | AA | C5 | kind  b3  b4  b5         | id lo | id hi | sum | AB |
//! +----+----+--------------------------+-------+-------+-----+----+
//! ```
//!
//! The checksum is the sum, mod 256, of the six bytes between the source
//! tag and the checksum. [`FrameDecoder`] consumes the stream one byte at a
//! time and validates as it goes; nothing is buffered.

use crate::commands::{self, Command, CommandFrame};
use crate::constants::*;
use crate::error::{ProtocolError, Rejection};
use crate::responses::DecodedEvent;
use crate::types::*;

/// Sum, mod 256, of a run of bytes.
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Kind-specific fields collected before the device id.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Body {
    Measurement { pm2_5: u16, pm10: u16 },
    DeviceIdSet,
    SleepWake { mode: AccessMode, is_sleep: bool },
    Firmware { version: u32 },
    Period { mode: AccessMode, period: u8 },
}

impl Body {
    fn into_event(self, device_id: DeviceId) -> Option<DecodedEvent> {
        match self {
            Body::Measurement { pm2_5, pm10 } => Some(DecodedEvent::measurement(pm2_5, pm10, device_id)),
            Body::DeviceIdSet => None,
            Body::SleepWake { mode, is_sleep } => Some(DecodedEvent::SleepWakeAck { mode, is_sleep, device_id }),
            Body::Firmware { version } => Some(DecodedEvent::FirmwareAck { version, device_id }),
            Body::Period { mode, period } => Some(DecodedEvent::PeriodAck { mode, period, device_id }),
        }
    }
}

/// Where the decoder is within a frame. Partial fields travel with the state.
#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    /// Waiting for the start marker.
    Head,
    /// Start marker seen; next byte says report or reply.
    Source,

    // Measurement report
    Pm25Low,
    Pm25High { low: u8 },
    Pm10Low { pm2_5: u16 },
    Pm10High { pm2_5: u16, low: u8 },

    // Acknowledgement
    AckKind,
    /// Set-device-id filler bytes still to skip.
    Filler { remaining: u8 },
    SleepWakeMode,
    SleepWakeValue { mode: AccessMode },
    /// `shift` is the bit position of the next firmware byte.
    FirmwareByte { version: u32, shift: u8 },
    PeriodMode,
    PeriodValue { mode: AccessMode },
    /// Unused byte before the device id.
    Reserved { body: Body },

    // Common tail
    DeviceIdLow { body: Body },
    DeviceIdHigh { body: Body, low: u8 },
    Checksum { body: Body, device_id: DeviceId },
    Tail { body: Body, device_id: DeviceId, received: u8 },
}

/// Counters describing what the decoder has seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Valid frames that produced an event.
    pub events: u64,
    /// Valid acknowledgements with no matching event (set-device-id).
    pub unreported_acks: u64,
    /// Frames dropped because a byte did not fit its position.
    pub framing_errors: u64,
    /// Frames dropped because the checksum did not match.
    pub checksum_errors: u64,
    /// Frames dropped because the end marker was missing.
    pub terminator_errors: u64,
    /// Bytes ignored while waiting for a start marker.
    pub skipped_bytes: u64,
}

impl DecoderStats {
    /// Total frames dropped for any reason.
    pub fn rejected(&self) -> u64 {
        self.framing_errors + self.checksum_errors + self.terminator_errors
    }
}

/// Byte-at-a-time decoder for the sensor's serial output.
///
/// Feed every received byte, in order, to [`FrameDecoder::feed`]. An event
/// is returned on the byte that completes a valid frame; every other byte
/// returns `None`. Malformed frames are dropped silently and the decoder
/// waits for the next start marker. Use one decoder per sensor.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    state: State,
    /// Running sum of the data bytes of the current frame.
    sum: u8,
    stats: DecoderStats,
    last_rejection: Option<Rejection>,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a decoder waiting for a start marker.
    pub fn new() -> Self {
        FrameDecoder {
            state: State::Head,
            sum: 0,
            stats: DecoderStats::default(),
            last_rejection: None,
        }
    }

    /// Consume one received byte.
    pub fn feed(&mut self, byte: u8) -> Option<DecodedEvent> {
        match self.step(byte) {
            Ok(Some(state)) => {
                self.state = state;
                None
            }
            Ok(None) => self.finish_frame(),
            Err(rejection) => {
                self.reject(rejection, byte);
                None
            }
        }
    }

    /// Feed a run of bytes, handing each decoded event to `sink` in order.
    ///
    /// Returns the number of events delivered.
    pub fn feed_all<F>(&mut self, data: &[u8], mut sink: F) -> usize
    where
        F: FnMut(DecodedEvent),
    {
        let mut delivered = 0;
        for &byte in data {
            if let Some(event) = self.feed(byte) {
                sink(event);
                delivered += 1;
            }
        }
        delivered
    }

    /// Drop any partial frame and wait for the next start marker.
    pub fn reset(&mut self) {
        self.state = State::Head;
        self.sum = 0;
    }

    /// Whether the decoder is between frames.
    pub fn is_idle(&self) -> bool {
        self.state == State::Head
    }

    /// Counters accumulated since creation or the last [`reset_stats`](Self::reset_stats).
    pub fn stats(&self) -> &DecoderStats {
        &self.stats
    }

    /// Clear the counters and the last rejection.
    pub fn reset_stats(&mut self) {
        self.stats = DecoderStats::default();
        self.last_rejection = None;
    }

    /// Reason the most recent frame was dropped, if any was.
    pub fn last_rejection(&self) -> Option<Rejection> {
        self.last_rejection
    }

    /// Work out the next state for `byte`.
    ///
    /// `Ok(None)` means the end marker arrived and the frame is complete.
    fn step(&mut self, byte: u8) -> Result<Option<State>, Rejection> {
        let next = match self.state {
            State::Head => {
                if byte == HEAD {
                    self.sum = 0;
                    State::Source
                } else {
                    self.stats.skipped_bytes += 1;
                    State::Head
                }
            }
            State::Source => match byte {
                DATA_REPORT_ID => State::Pm25Low,
                REPLY_ID => State::AckKind,
                // Repeated start marker: the earlier one was line noise.
                HEAD => {
                    self.stats.skipped_bytes += 1;
                    State::Source
                }
                other => return Err(Rejection::UnexpectedSource(other)),
            },

            State::Pm25Low => self.data(byte, State::Pm25High { low: byte }),
            State::Pm25High { low } => {
                let pm2_5 = u16::from_le_bytes([low, byte]);
                self.data(byte, State::Pm10Low { pm2_5 })
            }
            State::Pm10Low { pm2_5 } => self.data(byte, State::Pm10High { pm2_5, low: byte }),
            State::Pm10High { pm2_5, low } => {
                let pm10 = u16::from_le_bytes([low, byte]);
                self.data(byte, State::DeviceIdLow { body: Body::Measurement { pm2_5, pm10 } })
            }

            State::AckKind => {
                let next = match byte {
                    FAMILY_SET_DEVICE_ID => State::Filler { remaining: 2 },
                    FAMILY_SLEEP_WORK => State::SleepWakeMode,
                    FAMILY_FIRMWARE => State::FirmwareByte { version: 0, shift: 0 },
                    FAMILY_WORKING_PERIOD => State::PeriodMode,
                    other => return Err(Rejection::UnexpectedAckKind(other)),
                };
                self.data(byte, next)
            }
            State::Filler { remaining } => {
                let next = if remaining > 1 {
                    State::Filler { remaining: remaining - 1 }
                } else {
                    State::Reserved { body: Body::DeviceIdSet }
                };
                self.data(byte, next)
            }
            State::SleepWakeMode => {
                let mode = AccessMode::from_byte(byte).ok_or(Rejection::UnexpectedMode(byte))?;
                self.data(byte, State::SleepWakeValue { mode })
            }
            State::SleepWakeValue { mode } => {
                let body = Body::SleepWake { mode, is_sleep: byte == STATE_SLEEP };
                self.data(byte, State::Reserved { body })
            }
            State::FirmwareByte { version, shift } => {
                let version = version | (u32::from(byte) << shift);
                let next = if shift < 16 {
                    State::FirmwareByte { version, shift: shift + 8 }
                } else {
                    State::DeviceIdLow { body: Body::Firmware { version } }
                };
                self.data(byte, next)
            }
            State::PeriodMode => {
                let mode = AccessMode::from_byte(byte).ok_or(Rejection::UnexpectedMode(byte))?;
                self.data(byte, State::PeriodValue { mode })
            }
            State::PeriodValue { mode } => {
                self.data(byte, State::Reserved { body: Body::Period { mode, period: byte } })
            }
            State::Reserved { body } => self.data(byte, State::DeviceIdLow { body }),

            State::DeviceIdLow { body } => self.data(byte, State::DeviceIdHigh { body, low: byte }),
            State::DeviceIdHigh { body, low } => {
                let device_id = DeviceId::from_le_bytes(low, byte);
                self.data(byte, State::Checksum { body, device_id })
            }
            State::Checksum { body, device_id } => State::Tail { body, device_id, received: byte },
            State::Tail { .. } => {
                if byte == TAIL {
                    return Ok(None);
                }
                return Err(Rejection::MissingTail(byte));
            }
        };
        Ok(Some(next))
    }

    /// Add a data byte to the running checksum and move on.
    fn data(&mut self, byte: u8, next: State) -> State {
        self.sum = self.sum.wrapping_add(byte);
        next
    }

    fn finish_frame(&mut self) -> Option<DecodedEvent> {
        let State::Tail { body, device_id, received } = self.state else {
            self.reset();
            return None;
        };
        let computed = self.sum;
        self.reset();

        if received != computed {
            self.reject(Rejection::ChecksumMismatch { computed, received }, TAIL);
            return None;
        }

        match body.into_event(device_id) {
            Some(event) => {
                self.stats.events += 1;
                log::trace!("decoded {} frame from {}", event.kind(), device_id);
                Some(event)
            }
            None => {
                self.stats.unreported_acks += 1;
                log::debug!("set-device-id acknowledgement from {}", device_id);
                None
            }
        }
    }

    fn reject(&mut self, rejection: Rejection, byte: u8) {
        match rejection {
            Rejection::ChecksumMismatch { .. } => self.stats.checksum_errors += 1,
            Rejection::MissingTail(_) => self.stats.terminator_errors += 1,
            _ => self.stats.framing_errors += 1,
        }
        log::debug!("dropping frame: {}", rejection);
        self.last_rejection = Some(rejection);

        self.reset();
        // The offending byte may be the start of the next frame.
        if byte == HEAD {
            self.state = State::Source;
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// Latest measurement seen by a [`SensorSession`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// PM2.5 in µg/m³.
    pub pm2_5: f32,
    /// PM10 in µg/m³.
    pub pm10: f32,
}

/// One sensor's decoder plus the last value of every decoded field.
///
/// This can be used with any byte stream (serial port, TCP bridge, test
/// fixture): feed received bytes, encode commands, and read back the most
/// recent state the sensor reported.
#[derive(Debug, Default)]
pub struct SensorSession {
    decoder: FrameDecoder,
    measurement: Option<Measurement>,
    fresh_measurement: bool,
    is_sleep: Option<bool>,
    firmware: Option<u32>,
    period: Option<u8>,
    device_id: Option<DeviceId>,
}

impl SensorSession {
    /// Create a session with no known state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode a command for transmission.
    pub fn encode_command(&self, command: Command, parameter: Option<i32>) -> Result<CommandFrame, ProtocolError> {
        commands::encode(command, parameter)
    }

    /// Feed one received byte; returns the event it completed, if any.
    pub fn feed(&mut self, byte: u8) -> Option<DecodedEvent> {
        let event = self.decoder.feed(byte)?;
        self.apply(&event);
        Some(event)
    }

    /// Feed received bytes, collecting the events they complete.
    pub fn feed_slice(&mut self, data: &[u8]) -> Vec<DecodedEvent> {
        data.iter().filter_map(|&b| self.feed(b)).collect()
    }

    fn apply(&mut self, event: &DecodedEvent) {
        self.device_id = Some(event.device_id());
        match *event {
            DecodedEvent::MeasurementReport { pm2_5, pm10, .. } => {
                self.measurement = Some(Measurement { pm2_5, pm10 });
                self.fresh_measurement = true;
            }
            DecodedEvent::SleepWakeAck { is_sleep, .. } => self.is_sleep = Some(is_sleep),
            DecodedEvent::FirmwareAck { version, .. } => self.firmware = Some(version),
            DecodedEvent::PeriodAck { period, .. } => self.period = Some(period),
        }
    }

    /// Most recent measurement, if one arrived since the last call.
    pub fn take_measurement(&mut self) -> Option<Measurement> {
        if std::mem::take(&mut self.fresh_measurement) {
            self.measurement
        } else {
            None
        }
    }

    /// Most recent measurement, whether or not it was already taken.
    pub fn last_measurement(&self) -> Option<Measurement> {
        self.measurement
    }

    /// Sleep state from the last sleep/work acknowledgement.
    pub fn is_sleep(&self) -> Option<bool> {
        self.is_sleep
    }

    /// Firmware version from the last firmware acknowledgement.
    pub fn firmware(&self) -> Option<u32> {
        self.firmware
    }

    /// Working period from the last period acknowledgement.
    pub fn period(&self) -> Option<u8> {
        self.period
    }

    /// Device id from the last valid frame.
    pub fn device_id(&self) -> Option<DeviceId> {
        self.device_id
    }

    /// The underlying decoder.
    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }

    /// Forget any partial frame.
    pub fn reset(&mut self) {
        self.decoder.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Build a device → host frame around six data bytes.
    fn reply_frame(source: u8, data: [u8; 6]) -> [u8; REPLY_FRAME_LEN] {
        let mut frame = [0u8; REPLY_FRAME_LEN];
        frame[0] = HEAD;
        frame[1] = source;
        frame[CHECKSUM_START..REPLY_CHECKSUM_OFFSET].copy_from_slice(&data);
        frame[REPLY_CHECKSUM_OFFSET] = checksum(&data);
        frame[REPLY_FRAME_LEN - 1] = TAIL;
        frame
    }

    fn measurement_frame(pm2_5: u16, pm10: u16, id: u16) -> [u8; REPLY_FRAME_LEN] {
        let [a, b] = pm2_5.to_le_bytes();
        let [c, d] = pm10.to_le_bytes();
        let [e, f] = id.to_le_bytes();
        reply_frame(DATA_REPORT_ID, [a, b, c, d, e, f])
    }

    fn ack_frame(kind: u8, b3: u8, b4: u8, b5: u8, id: u16) -> [u8; REPLY_FRAME_LEN] {
        let [e, f] = id.to_le_bytes();
        reply_frame(REPLY_ID, [kind, b3, b4, b5, e, f])
    }

    fn feed_frame(decoder: &mut FrameDecoder, frame: &[u8]) -> Vec<DecodedEvent> {
        let mut events = Vec::new();
        decoder.feed_all(frame, |e| events.push(e));
        events
    }

    #[test]
    fn test_measurement_frame() {
        let mut decoder = FrameDecoder::new();
        let frame = measurement_frame(0x1234, 0xABCD, 0xBEEF);

        for &byte in &frame[..9] {
            assert!(decoder.feed(byte).is_none());
        }
        let event = decoder.feed(frame[9]).expect("should decode on end marker");
        match event {
            DecodedEvent::MeasurementReport { pm2_5, pm10, device_id } => {
                assert_relative_eq!(pm2_5, 0x1234 as f32 / 10.0);
                assert_relative_eq!(pm10, 0xABCD as f32 / 10.0);
                assert_eq!(device_id, DeviceId(0xBEEF));
            }
            other => panic!("Expected MeasurementReport, got {:?}", other),
        }
        assert!(decoder.is_idle());
        assert_eq!(decoder.stats().events, 1);
    }

    #[test]
    fn test_measurement_round_trip_sweep() {
        let mut decoder = FrameDecoder::new();
        let values = [0u16, 1, 9, 255, 256, 999, 0x7FFF, 0x8000, u16::MAX];
        for &pm2_5 in &values {
            for &pm10 in &values {
                let id = pm2_5 ^ pm10.rotate_left(3);
                let events = feed_frame(&mut decoder, &measurement_frame(pm2_5, pm10, id));
                assert_eq!(events, vec![DecodedEvent::measurement(pm2_5, pm10, DeviceId(id))]);
            }
        }
    }

    #[test]
    fn test_real_sensor_capture() {
        // Captured from a sensor in active mode: PM2.5 7.5, PM10 12.0, id 0xE1C6
        let capture = [0xAA, 0xC0, 0x4B, 0x00, 0x78, 0x00, 0xC6, 0xE1, 0x6A, 0xAB];
        let mut decoder = FrameDecoder::new();
        let events = feed_frame(&mut decoder, &capture);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0], DecodedEvent::measurement(75, 120, DeviceId(0xE1C6)));
    }

    #[test]
    fn test_single_bit_flip_drops_frame() {
        let frame = measurement_frame(321, 654, 0x1A2B);
        let next = measurement_frame(11, 22, 0x0033);

        for offset in 2..8 {
            for bit in 0..8 {
                let mut corrupted = frame;
                corrupted[offset] ^= 1 << bit;

                let mut decoder = FrameDecoder::new();
                assert!(feed_frame(&mut decoder, &corrupted).is_empty(), "offset {} bit {}", offset, bit);
                assert!(decoder.is_idle());
                assert_eq!(decoder.stats().checksum_errors, 1);

                let events = feed_frame(&mut decoder, &next);
                assert_eq!(events, vec![DecodedEvent::measurement(11, 22, DeviceId(0x0033))]);
            }
        }
    }

    #[test]
    fn test_checksum_byte_corruption() {
        let mut frame = measurement_frame(10, 20, 1);
        frame[8] = frame[8].wrapping_add(1);
        let mut decoder = FrameDecoder::new();
        assert!(feed_frame(&mut decoder, &frame).is_empty());
        assert!(matches!(decoder.last_rejection(), Some(Rejection::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_resync_after_garbage() {
        let mut decoder = FrameDecoder::new();
        let garbage = [0x00, 0xFF, 0xAB, 0xC0, 0x13, 0x37, 0x42];
        assert!(feed_frame(&mut decoder, &garbage).is_empty());
        assert_eq!(decoder.stats().skipped_bytes, garbage.len() as u64);

        let events = feed_frame(&mut decoder, &measurement_frame(50, 60, 7));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].device_id(), DeviceId(7));
    }

    #[test]
    fn test_bad_source_tag() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(HEAD).is_none());
        assert!(decoder.feed(0xB4).is_none());
        assert!(decoder.is_idle());
        assert_eq!(decoder.last_rejection(), Some(Rejection::UnexpectedSource(0xB4)));
        assert_eq!(decoder.stats().framing_errors, 1);
    }

    #[test]
    fn test_repeated_head_restarts_frame() {
        // A stray 0xAA right before a real frame must not swallow its start marker.
        let mut decoder = FrameDecoder::new();
        let mut stream = vec![HEAD];
        stream.extend_from_slice(&measurement_frame(1, 2, 3));
        let events = feed_frame(&mut decoder, &stream);
        assert_eq!(events, vec![DecodedEvent::measurement(1, 2, DeviceId(3))]);
    }

    #[test]
    fn test_head_run_is_skipped_not_rejected() {
        let mut decoder = FrameDecoder::new();
        let mut stream = vec![HEAD; 5];
        stream.extend_from_slice(&measurement_frame(7, 8, 9)[1..]);
        let events = feed_frame(&mut decoder, &stream);
        assert_eq!(events, vec![DecodedEvent::measurement(7, 8, DeviceId(9))]);

        let stats = decoder.stats();
        assert_eq!(stats.framing_errors, 0);
        assert_eq!(stats.rejected(), 0);
        assert_eq!(stats.skipped_bytes, 4);
        assert_eq!(decoder.last_rejection(), None);
    }

    #[test]
    fn test_truncated_frame_followed_by_valid_frame() {
        let mut decoder = FrameDecoder::new();
        let truncated = &ack_frame(0x06, 0x01, 0x00, 0x00, 5)[..4];
        let mut stream = truncated.to_vec();
        // The next frame's head lands in the sleep/work value position and is
        // taken as data; that frame is lost, the one after it decodes.
        stream.extend_from_slice(&measurement_frame(100, 200, 9));
        stream.extend_from_slice(&measurement_frame(300, 400, 9));
        let events = feed_frame(&mut decoder, &stream);
        assert_eq!(events.last(), Some(&DecodedEvent::measurement(300, 400, DeviceId(9))));
        assert!(decoder.stats().rejected() >= 1);
    }

    #[test]
    fn test_bad_end_marker() {
        let mut frame = measurement_frame(10, 20, 30);
        frame[9] = 0x00;
        let mut decoder = FrameDecoder::new();
        assert!(feed_frame(&mut decoder, &frame).is_empty());
        assert_eq!(decoder.last_rejection(), Some(Rejection::MissingTail(0x00)));
        assert_eq!(decoder.stats().terminator_errors, 1);
        assert!(decoder.is_idle());
    }

    #[test]
    fn test_bad_end_marker_that_is_a_head() {
        let mut frame = measurement_frame(10, 20, 30);
        frame[9] = HEAD;
        let mut stream = frame.to_vec();
        // The next frame without its own head byte.
        stream.extend_from_slice(&measurement_frame(40, 50, 60)[1..]);
        let mut decoder = FrameDecoder::new();
        let events = feed_frame(&mut decoder, &stream);
        assert_eq!(events, vec![DecodedEvent::measurement(40, 50, DeviceId(60))]);
    }

    #[test]
    fn test_ack_modes() {
        for mode in [AccessMode::Query, AccessMode::Set] {
            let mut decoder = FrameDecoder::new();
            let events = feed_frame(&mut decoder, &ack_frame(FAMILY_WORKING_PERIOD, mode.as_byte(), 12, 0, 0x0042));
            assert_eq!(events, vec![DecodedEvent::PeriodAck { mode, period: 12, device_id: DeviceId(0x0042) }]);

            let events = feed_frame(&mut decoder, &ack_frame(FAMILY_SLEEP_WORK, mode.as_byte(), STATE_WORK, 0, 0x0042));
            assert_eq!(
                events,
                vec![DecodedEvent::SleepWakeAck { mode, is_sleep: false, device_id: DeviceId(0x0042) }]
            );
        }
    }

    #[test]
    fn test_acknowledgement_discrimination() {
        let mut decoder = FrameDecoder::new();

        let sleep = feed_frame(&mut decoder, &ack_frame(0x06, 0x01, 0x00, 0x00, 0x1234));
        assert_eq!(
            sleep,
            vec![DecodedEvent::SleepWakeAck { mode: AccessMode::Set, is_sleep: true, device_id: DeviceId(0x1234) }]
        );

        let firmware = feed_frame(&mut decoder, &ack_frame(0x07, 0x0F, 0x07, 0x0A, 0x1234));
        assert_eq!(
            firmware,
            vec![DecodedEvent::FirmwareAck { version: 0x0A070F, device_id: DeviceId(0x1234) }]
        );

        let period = feed_frame(&mut decoder, &ack_frame(0x08, 0x01, 0x05, 0x00, 0x1234));
        assert_eq!(
            period,
            vec![DecodedEvent::PeriodAck { mode: AccessMode::Set, period: 5, device_id: DeviceId(0x1234) }]
        );

        assert_eq!(decoder.stats().events, 3);
    }

    #[test]
    fn test_wake_ack_and_query_mode() {
        let mut decoder = FrameDecoder::new();
        let events = feed_frame(&mut decoder, &ack_frame(0x06, 0x00, 0x01, 0x00, 0xA160));
        assert_eq!(
            events,
            vec![DecodedEvent::SleepWakeAck { mode: AccessMode::Query, is_sleep: false, device_id: DeviceId(0xA160) }]
        );
    }

    #[test]
    fn test_ack_fields_do_not_leak_between_frames() {
        let mut decoder = FrameDecoder::new();
        feed_frame(&mut decoder, &ack_frame(0x07, 0xFF, 0xFF, 0xFF, 1));
        let events = feed_frame(&mut decoder, &ack_frame(0x08, 0x00, 0x00, 0x00, 2));
        assert_eq!(
            events,
            vec![DecodedEvent::PeriodAck { mode: AccessMode::Query, period: 0, device_id: DeviceId(2) }]
        );
        let events = feed_frame(&mut decoder, &ack_frame(0x07, 0x01, 0x00, 0x00, 3));
        assert_eq!(events, vec![DecodedEvent::FirmwareAck { version: 1, device_id: DeviceId(3) }]);
    }

    #[test]
    fn test_invalid_mode_selector() {
        let mut decoder = FrameDecoder::new();
        assert!(feed_frame(&mut decoder, &ack_frame(0x06, 0x02, 0x00, 0x00, 1)).is_empty());
        assert_eq!(decoder.last_rejection(), Some(Rejection::UnexpectedMode(0x02)));

        assert!(feed_frame(&mut decoder, &ack_frame(0x08, 0x07, 0x00, 0x00, 1)).is_empty());
        assert_eq!(decoder.last_rejection(), Some(Rejection::UnexpectedMode(0x07)));
    }

    #[test]
    fn test_unknown_ack_kind() {
        let mut decoder = FrameDecoder::new();
        assert!(feed_frame(&mut decoder, &ack_frame(0x04, 0x00, 0x00, 0x00, 1)).is_empty());
        assert_eq!(decoder.last_rejection(), Some(Rejection::UnexpectedAckKind(0x04)));
        assert!(decoder.is_idle());
    }

    #[test]
    fn test_set_device_id_ack_is_validated_without_event() {
        let mut decoder = FrameDecoder::new();
        assert!(feed_frame(&mut decoder, &ack_frame(0x05, 0x00, 0x00, 0x00, 0x4321)).is_empty());
        assert_eq!(decoder.stats().unreported_acks, 1);
        assert_eq!(decoder.stats().rejected(), 0);

        let mut bad = ack_frame(0x05, 0x00, 0x00, 0x00, 0x4321);
        bad[8] ^= 0x01;
        assert!(feed_frame(&mut decoder, &bad).is_empty());
        assert_eq!(decoder.stats().unreported_acks, 1);
        assert_eq!(decoder.stats().checksum_errors, 1);
    }

    #[test]
    fn test_split_delivery() {
        let mut decoder = FrameDecoder::new();
        let frame = measurement_frame(42, 43, 44);
        assert!(feed_frame(&mut decoder, &frame[..3]).is_empty());
        assert!(!decoder.is_idle());
        let events = feed_frame(&mut decoder, &frame[3..]);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_reset_drops_partial_frame() {
        let mut decoder = FrameDecoder::new();
        let frame = measurement_frame(42, 43, 44);
        feed_frame(&mut decoder, &frame[..5]);
        decoder.reset();
        assert!(feed_frame(&mut decoder, &frame[5..]).is_empty());
        assert_eq!(feed_frame(&mut decoder, &frame).len(), 1);

        decoder.reset_stats();
        assert_eq!(*decoder.stats(), DecoderStats::default());
        assert!(decoder.last_rejection().is_none());
    }

    #[test]
    fn test_independent_decoders() {
        let mut a = FrameDecoder::new();
        let mut b = FrameDecoder::new();
        let fa = measurement_frame(1, 1, 0xAAAA);
        let fb = measurement_frame(2, 2, 0xBBBB);

        let mut events = Vec::new();
        for i in 0..REPLY_FRAME_LEN {
            events.extend(a.feed(fa[i]));
            events.extend(b.feed(fb[i]));
        }
        assert_eq!(
            events,
            vec![
                DecodedEvent::measurement(1, 1, DeviceId(0xAAAA)),
                DecodedEvent::measurement(2, 2, DeviceId(0xBBBB)),
            ]
        );
    }

    #[test]
    fn test_session_tracks_latest_state() {
        let mut session = SensorSession::new();
        assert!(session.take_measurement().is_none());

        let mut stream = Vec::new();
        stream.extend_from_slice(&measurement_frame(123, 456, 0x0102));
        stream.extend_from_slice(&ack_frame(0x06, 0x01, 0x00, 0x00, 0x0102));
        stream.extend_from_slice(&ack_frame(0x07, 18, 11, 16, 0x0102));
        stream.extend_from_slice(&ack_frame(0x08, 0x00, 0x03, 0x00, 0x0102));
        let events = session.feed_slice(&stream);
        assert_eq!(events.len(), 4);

        let m = session.take_measurement().expect("fresh measurement");
        assert_relative_eq!(m.pm2_5, 12.3);
        assert_relative_eq!(m.pm10, 45.6);
        assert!(session.take_measurement().is_none());
        assert!(session.last_measurement().is_some());

        assert_eq!(session.is_sleep(), Some(true));
        assert_eq!(session.firmware().map(FirmwareDate::from_version), Some(FirmwareDate { year: 18, month: 11, day: 16 }));
        assert_eq!(session.period(), Some(3));
        assert_eq!(session.device_id(), Some(DeviceId(0x0102)));
    }

    #[test]
    fn test_session_encodes_commands() {
        let session = SensorSession::new();
        let frame = session.encode_command(Command::SetReportingPeriod, Some(1)).unwrap();
        assert_eq!(frame[4], 1);
        assert!(session.encode_command(Command::SetReportingPeriod, Some(99)).is_err());
    }
}
