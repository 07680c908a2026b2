//! Protocol error types.

use thiserror::Error;

use crate::commands::Command;

/// Errors returned when building a command frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Numeric command selector does not name a known command.
    #[error("unsupported command selector: {0}")]
    UnsupportedCommand(u8),

    /// Command parameter is outside its accepted range.
    #[error("invalid parameter for {command}: {value}")]
    InvalidParameter {
        /// Command the parameter was given for.
        command: Command,
        /// Rejected value.
        value: i32,
    },

    /// Command needs a parameter but none was given.
    #[error("{0} requires a parameter")]
    MissingParameter(Command),

    /// Command name could not be parsed.
    #[error("unknown command name: {0}")]
    UnknownCommandName(String),
}

/// Why the decoder dropped a partially received frame.
///
/// The decoder never returns these from `feed`; they are only visible
/// through [`FrameDecoder::last_rejection`](crate::FrameDecoder::last_rejection)
/// and the decoder statistics.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Byte after the start marker was neither a report nor a reply tag.
    #[error("unexpected source tag 0x{0:02X}")]
    UnexpectedSource(u8),

    /// Reply sub-discriminator is not a known acknowledgement kind.
    #[error("unexpected acknowledgement kind 0x{0:02X}")]
    UnexpectedAckKind(u8),

    /// Mode selector was neither query nor set.
    #[error("unexpected mode selector 0x{0:02X}")]
    UnexpectedMode(u8),

    /// Received checksum does not match the sum of the data bytes.
    #[error("checksum mismatch: computed 0x{computed:02X}, received 0x{received:02X}")]
    ChecksumMismatch {
        /// Sum of the data bytes, mod 256.
        computed: u8,
        /// Checksum byte carried by the frame.
        received: u8,
    },

    /// Frame did not end with the end marker.
    #[error("missing end marker, got 0x{0:02X}")]
    MissingTail(u8),
}
