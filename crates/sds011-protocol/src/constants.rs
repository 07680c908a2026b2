//! Protocol constants
//!
//! Wire values used by the SDS011 serial protocol. All frames start with
//! [`HEAD`] and end with [`TAIL`]; the byte after the head says who sent the
//! frame and what it carries.

// ============================================================================
// Markers
// ============================================================================

/// Start marker of every frame, in both directions.
pub const HEAD: u8 = 0xAA;
/// End marker of every frame, in both directions.
pub const TAIL: u8 = 0xAB;

// ============================================================================
// Source Tags (byte 1)
// ============================================================================

/// Host → sensor command frame.
pub const COMMAND_ID: u8 = 0xB4;
/// Sensor → host measurement report.
pub const DATA_REPORT_ID: u8 = 0xC0;
/// Sensor → host command acknowledgement.
pub const REPLY_ID: u8 = 0xC5;

// ============================================================================
// Command Families (byte 2)
// ============================================================================

/// Query a single measurement.
pub const FAMILY_QUERY_DATA: u8 = 0x04;
/// Set the device id.
pub const FAMILY_SET_DEVICE_ID: u8 = 0x05;
/// Query or set sleep/work state.
pub const FAMILY_SLEEP_WORK: u8 = 0x06;
/// Query the firmware version.
pub const FAMILY_FIRMWARE: u8 = 0x07;
/// Query or set the working period.
pub const FAMILY_WORKING_PERIOD: u8 = 0x08;

// ============================================================================
// Mode Selectors
// ============================================================================

/// The command only reads the current value.
pub const MODE_QUERY: u8 = 0x00;
/// The command changes the current value.
pub const MODE_SET: u8 = 0x01;

/// Sleep/work value meaning "sleeping".
pub const STATE_SLEEP: u8 = 0x00;
/// Sleep/work value meaning "working".
pub const STATE_WORK: u8 = 0x01;

// ============================================================================
// Sizes and Limits
// ============================================================================

/// Length of a host → sensor command frame.
pub const COMMAND_FRAME_LEN: usize = 19;
/// Length of a sensor → host report or acknowledgement frame.
pub const REPLY_FRAME_LEN: usize = 10;

/// First byte covered by the checksum, in both directions.
pub const CHECKSUM_START: usize = 2;
/// Offset of the checksum byte in a command frame.
pub const COMMAND_CHECKSUM_OFFSET: usize = 17;
/// Offset of the checksum byte in a reply frame.
pub const REPLY_CHECKSUM_OFFSET: usize = 8;

/// Offset of the mode selector in a command frame.
pub const COMMAND_MODE_OFFSET: usize = 3;
/// Offset of the command payload value in a command frame.
pub const COMMAND_VALUE_OFFSET: usize = 4;

/// Device id that addresses every sensor on the line.
pub const BROADCAST_DEVICE_ID: u16 = 0xFFFF;

/// Largest accepted working period.
pub const MAX_WORKING_PERIOD: i32 = 30;

/// Raw PM values carry one implied decimal digit.
pub const PM_SCALE: f32 = 10.0;
