//! Commands that can be sent to the sensor.
//!
//! Every command is a fixed 19-byte frame:
//!
//! ```text
//! +----+----+--------+------------------+-------+-------+-----+----+
//! | AA | B4 | family | payload [3..=14] | id lo | id hi | sum | AB |
//! +----+----+--------+------------------+-------+-------+-----+----+
//! ```
//!
//! The checksum is the sum, mod 256, of bytes 2 through 16. Commands are
//! always addressed to the broadcast id `FFFF`.

use crate::constants::*;
use crate::error::ProtocolError;
use crate::frame::checksum;

/// A complete command frame, ready for transmission.
pub type CommandFrame = [u8; COMMAND_FRAME_LEN];

/// Commands understood by the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Put the sensor to sleep (fan and laser off).
    Sleep,
    /// Wake the sensor up.
    Wake,
    /// Ask for the firmware version.
    QueryFirmwareVersion,
    /// Set the working period; needs a parameter in `0..=30`.
    SetReportingPeriod,
    /// Ask for a single measurement report.
    QueryData,
}

impl Command {
    /// Every command, in selector order.
    pub const ALL: [Command; 5] = [
        Command::Sleep,
        Command::Wake,
        Command::QueryFirmwareVersion,
        Command::SetReportingPeriod,
        Command::QueryData,
    ];

    /// Numeric selector used by [`encode_selector`].
    pub fn selector(self) -> u8 {
        match self {
            Command::Sleep => 1,
            Command::Wake => 2,
            Command::QueryFirmwareVersion => 3,
            Command::SetReportingPeriod => 4,
            Command::QueryData => 5,
        }
    }

    /// Lower-case name, as accepted by [`str::parse`].
    pub fn name(self) -> &'static str {
        match self {
            Command::Sleep => "sleep",
            Command::Wake => "wake",
            Command::QueryFirmwareVersion => "firmware",
            Command::SetReportingPeriod => "period",
            Command::QueryData => "query",
        }
    }

    /// Whether [`encode`] needs a parameter for this command.
    pub fn takes_parameter(self) -> bool {
        matches!(self, Command::SetReportingPeriod)
    }

    fn template(self) -> &'static CommandFrame {
        match self {
            Command::Sleep => &SLEEP_FRAME,
            Command::Wake => &WAKE_FRAME,
            Command::QueryFirmwareVersion => &FIRMWARE_FRAME,
            Command::SetReportingPeriod => &PERIOD_FRAME,
            Command::QueryData => &QUERY_FRAME,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for Command {
    type Error = ProtocolError;

    fn try_from(selector: u8) -> Result<Self, Self::Error> {
        Command::ALL
            .into_iter()
            .find(|cmd| cmd.selector() == selector)
            .ok_or(ProtocolError::UnsupportedCommand(selector))
    }
}

impl std::str::FromStr for Command {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Command::ALL
            .into_iter()
            .find(|cmd| cmd.name() == lower)
            .ok_or(ProtocolError::UnknownCommandName(s.to_string()))
    }
}

// ============================================================================
// Templates
// ============================================================================

const fn template(family: u8, mode: u8, value: u8, sum: u8) -> CommandFrame {
    let mut frame = [0u8; COMMAND_FRAME_LEN];
    frame[0] = HEAD;
    frame[1] = COMMAND_ID;
    frame[2] = family;
    frame[COMMAND_MODE_OFFSET] = mode;
    frame[COMMAND_VALUE_OFFSET] = value;
    let [id_low, id_high] = BROADCAST_DEVICE_ID.to_le_bytes();
    frame[15] = id_low;
    frame[16] = id_high;
    frame[COMMAND_CHECKSUM_OFFSET] = sum;
    frame[18] = TAIL;
    frame
}

const SLEEP_FRAME: CommandFrame = template(FAMILY_SLEEP_WORK, MODE_SET, STATE_SLEEP, 0x05);
const WAKE_FRAME: CommandFrame = template(FAMILY_SLEEP_WORK, MODE_SET, STATE_WORK, 0x06);
const FIRMWARE_FRAME: CommandFrame = template(FAMILY_FIRMWARE, 0x00, 0x00, 0x05);
const QUERY_FRAME: CommandFrame = template(FAMILY_QUERY_DATA, 0x00, 0x00, 0x02);
// Checksum is rewritten on every encode.
const PERIOD_FRAME: CommandFrame = template(FAMILY_WORKING_PERIOD, MODE_SET, 0x00, 0x00);

// ============================================================================
// Encoding
// ============================================================================

/// Encode a command into its 19-byte frame.
///
/// `parameter` is only used by [`Command::SetReportingPeriod`], where it is
/// required and must lie in `0..=30`. Other commands ignore it and return
/// their fixed frame.
pub fn encode(command: Command, parameter: Option<i32>) -> Result<CommandFrame, ProtocolError> {
    let mut frame = *command.template();

    if command.takes_parameter() {
        let value = parameter.ok_or(ProtocolError::MissingParameter(command))?;
        if !(0..=MAX_WORKING_PERIOD).contains(&value) {
            return Err(ProtocolError::InvalidParameter { command, value });
        }
        frame[COMMAND_VALUE_OFFSET] = value as u8;
        frame[COMMAND_CHECKSUM_OFFSET] = checksum(&frame[CHECKSUM_START..COMMAND_CHECKSUM_OFFSET]);
    }

    log::trace!("encoded {} command: {:02X?}", command, frame);
    Ok(frame)
}

/// Encode a command given by its numeric selector.
///
/// Selectors are 1 = sleep, 2 = wake, 3 = firmware query, 4 = working
/// period, 5 = data query.
pub fn encode_selector(selector: u8, parameter: Option<i32>) -> Result<CommandFrame, ProtocolError> {
    encode(Command::try_from(selector)?, parameter)
}
