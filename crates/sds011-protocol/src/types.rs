//! Common protocol types.

use crate::constants::*;

/// Two-byte device identifier carried by every frame.
///
/// On the wire the id is little-endian: the low byte comes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceId(pub u16);

impl DeviceId {
    /// Id that addresses every sensor on the line.
    pub const BROADCAST: DeviceId = DeviceId(BROADCAST_DEVICE_ID);

    /// Build an id from its wire bytes.
    pub fn from_le_bytes(low: u8, high: u8) -> Self {
        DeviceId(u16::from_le_bytes([low, high]))
    }

    /// Wire bytes, low byte first.
    pub fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }

    /// Whether this is the broadcast id.
    pub fn is_broadcast(self) -> bool {
        self == Self::BROADCAST
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}

impl From<u16> for DeviceId {
    fn from(id: u16) -> Self {
        DeviceId(id)
    }
}

impl From<DeviceId> for u16 {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

/// Whether an acknowledged command read or changed a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// The command only read the current value.
    Query,
    /// The command changed the value.
    Set,
}

impl AccessMode {
    /// Parse a mode selector byte; only `0x00` and `0x01` are valid.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            MODE_QUERY => Some(AccessMode::Query),
            MODE_SET => Some(AccessMode::Set),
            _ => None,
        }
    }

    /// Wire value of this mode.
    pub fn as_byte(self) -> u8 {
        match self {
            AccessMode::Query => MODE_QUERY,
            AccessMode::Set => MODE_SET,
        }
    }
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessMode::Query => write!(f, "query"),
            AccessMode::Set => write!(f, "set"),
        }
    }
}

/// Firmware version split into the build date it encodes.
///
/// The sensor reports its firmware as three bytes: year (since 2000),
/// month and day. The decoder combines them little-endian into a single
/// 24-bit number; this type splits that number back apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareDate {
    /// Two-digit year.
    pub year: u8,
    /// Month, 1-12 on a well-behaved device.
    pub month: u8,
    /// Day of month.
    pub day: u8,
}

impl FirmwareDate {
    /// Split a 24-bit firmware version into its date bytes.
    pub fn from_version(version: u32) -> Self {
        let [year, month, day, _] = version.to_le_bytes();
        FirmwareDate { year, month, day }
    }
}

impl std::fmt::Display for FirmwareDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}-{:02}-{:02}", self.year, self.month, self.day)
    }
}
