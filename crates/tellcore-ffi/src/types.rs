//! Typed views of the integers that cross the driver boundary
//!
//! Every conversion from a raw `int` here is a total lookup: codes the
//! driver may add in later releases land in an `Unknown` arm instead of
//! failing.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Failure categories of the driver's negative return codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultCategory {
    /// `TELLSTICK_ERROR_NOT_FOUND` (-1): no TellStick controller found
    NotFound,
    /// `TELLSTICK_ERROR_PERMISSION_DENIED` (-2)
    PermissionDenied,
    /// `TELLSTICK_ERROR_DEVICE_NOT_FOUND` (-3)
    DeviceNotFound,
    /// `TELLSTICK_ERROR_METHOD_NOT_SUPPORTED` (-4)
    MethodNotSupported,
    /// `TELLSTICK_ERROR_COMMUNICATION` (-5)
    CommunicationFailure,
    /// `TELLSTICK_ERROR_CONNECTING_SERVICE` (-6)
    ConnectionFailure,
    /// `TELLSTICK_ERROR_UNKNOWN_RESPONSE` (-7)
    UnknownResponse,
    /// `TELLSTICK_ERROR_UNKNOWN` (-99) and every unlisted negative code
    Unknown,
}

impl ResultCategory {
    /// Categorize a negative return code.
    pub fn from_code(code: i32) -> Self {
        match code {
            -1 => Self::NotFound,
            -2 => Self::PermissionDenied,
            -3 => Self::DeviceNotFound,
            -4 => Self::MethodNotSupported,
            -5 => Self::CommunicationFailure,
            -6 => Self::ConnectionFailure,
            -7 => Self::UnknownResponse,
            _ => Self::Unknown,
        }
    }

    /// The canonical driver code for this category
    pub fn code(self) -> i32 {
        match self {
            Self::NotFound => -1,
            Self::PermissionDenied => -2,
            Self::DeviceNotFound => -3,
            Self::MethodNotSupported => -4,
            Self::CommunicationFailure => -5,
            Self::ConnectionFailure => -6,
            Self::UnknownResponse => -7,
            Self::Unknown => -99,
        }
    }

    /// Fallback message used when the driver's own error string is empty
    pub fn error_message(self) -> &'static str {
        match self {
            Self::NotFound => "TellStick not found",
            Self::PermissionDenied => "Permission denied",
            Self::DeviceNotFound => "Device not found",
            Self::MethodNotSupported => "The method you tried to use is not supported by the device",
            Self::CommunicationFailure => "An error occurred while communicating with TellStick",
            Self::ConnectionFailure => "Could not connect to the Telldus Service",
            Self::UnknownResponse => "Received an unknown response",
            Self::Unknown => "Unknown error",
        }
    }
}

impl fmt::Display for ResultCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotFound => "not found",
            Self::PermissionDenied => "permission denied",
            Self::DeviceNotFound => "device not found",
            Self::MethodNotSupported => "method not supported",
            Self::CommunicationFailure => "communication failure",
            Self::ConnectionFailure => "connection failure",
            Self::UnknownResponse => "unknown response",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A single device command, as reported by state-change callbacks and
/// `tdLastSentCommand`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceMethod {
    TurnOn,
    TurnOff,
    Bell,
    Toggle,
    Dim,
    Learn,
    Execute,
    Up,
    Down,
    Stop,
    /// Any value that is not exactly one known method bit
    Unknown(i32),
}

impl DeviceMethod {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::TurnOn,
            2 => Self::TurnOff,
            4 => Self::Bell,
            8 => Self::Toggle,
            16 => Self::Dim,
            32 => Self::Learn,
            64 => Self::Execute,
            128 => Self::Up,
            256 => Self::Down,
            512 => Self::Stop,
            other => Self::Unknown(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::TurnOn => 1,
            Self::TurnOff => 2,
            Self::Bell => 4,
            Self::Toggle => 8,
            Self::Dim => 16,
            Self::Learn => 32,
            Self::Execute => 64,
            Self::Up => 128,
            Self::Down => 256,
            Self::Stop => 512,
            Self::Unknown(code) => code,
        }
    }
}

impl fmt::Display for DeviceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TurnOn => "on",
            Self::TurnOff => "off",
            Self::Bell => "bell",
            Self::Toggle => "toggle",
            Self::Dim => "dim",
            Self::Learn => "learn",
            Self::Execute => "execute",
            Self::Up => "up",
            Self::Down => "down",
            Self::Stop => "stop",
            Self::Unknown(code) => return write!(f, "unknown({code})"),
        };
        f.write_str(name)
    }
}

/// Bitmask of device methods, as taken and returned by `tdMethods`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceMethods(i32);

impl DeviceMethods {
    pub const NONE: Self = Self(0);
    pub const TURN_ON: Self = Self(1);
    pub const TURN_OFF: Self = Self(2);
    pub const BELL: Self = Self(4);
    pub const TOGGLE: Self = Self(8);
    pub const DIM: Self = Self(16);
    pub const LEARN: Self = Self(32);
    pub const EXECUTE: Self = Self(64);
    pub const UP: Self = Self(128);
    pub const DOWN: Self = Self(256);
    pub const STOP: Self = Self(512);
    /// Every method this binding knows how to send
    pub const ALL: Self = Self(1023);

    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> i32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The individual methods set in this mask, lowest bit first
    pub fn iter(self) -> impl Iterator<Item = DeviceMethod> {
        (0..10)
            .map(|shift| 1 << shift)
            .filter(move |bit| self.0 & bit != 0)
            .map(DeviceMethod::from_code)
    }
}

impl std::ops::BitOr for DeviceMethods {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for DeviceMethods {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl From<DeviceMethod> for DeviceMethods {
    fn from(method: DeviceMethod) -> Self {
        match method {
            DeviceMethod::Unknown(_) => Self::NONE,
            known => Self(known.code()),
        }
    }
}

/// Kind of entry in the driver's device table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    Device,
    Group,
    Scene,
    Unknown(i32),
}

impl DeviceType {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Device,
            2 => Self::Group,
            3 => Self::Scene,
            other => Self::Unknown(other),
        }
    }
}

/// What happened to a device, as reported by device-change callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceChange {
    Added,
    Changed,
    Removed,
    StateChanged,
    Unknown(i32),
}

impl DeviceChange {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Added,
            2 => Self::Changed,
            3 => Self::Removed,
            4 => Self::StateChanged,
            other => Self::Unknown(other),
        }
    }
}

/// Which attribute changed when a device reports [`DeviceChange::Changed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceChangeType {
    Name,
    Protocol,
    Model,
    Unknown(i32),
}

impl DeviceChangeType {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Name,
            2 => Self::Protocol,
            3 => Self::Model,
            other => Self::Unknown(other),
        }
    }
}

/// A single kind of sensor value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorValueType {
    Temperature,
    Humidity,
    RainRate,
    RainTotal,
    WindDirection,
    WindAverage,
    WindGust,
    Unknown(i32),
}

impl SensorValueType {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Temperature,
            2 => Self::Humidity,
            4 => Self::RainRate,
            8 => Self::RainTotal,
            16 => Self::WindDirection,
            32 => Self::WindAverage,
            64 => Self::WindGust,
            other => Self::Unknown(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Temperature => 1,
            Self::Humidity => 2,
            Self::RainRate => 4,
            Self::RainTotal => 8,
            Self::WindDirection => 16,
            Self::WindAverage => 32,
            Self::WindGust => 64,
            Self::Unknown(code) => code,
        }
    }
}

/// Bitmask of the value types a sensor reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorValueTypes(i32);

impl SensorValueTypes {
    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> i32 {
        self.0
    }

    pub fn contains(self, value_type: SensorValueType) -> bool {
        let bit = value_type.code();
        bit != 0 && self.0 & bit == bit
    }

    pub fn iter(self) -> impl Iterator<Item = SensorValueType> {
        (0..7)
            .map(|shift| 1 << shift)
            .filter(move |bit| self.0 & bit != 0)
            .map(SensorValueType::from_code)
    }
}

/// One sensor known to the driver, keyed by its protocol/model/id triplet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sensor {
    pub protocol: String,
    pub model: String,
    pub id: i32,
    pub value_types: SensorValueTypes,
}

/// A single value read from a sensor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorReading {
    pub protocol: String,
    pub model: String,
    pub sensor_id: i32,
    pub value_type: SensorValueType,
    pub value: Option<String>,
    /// Seconds since the epoch, on the driver's clock
    pub timestamp: i64,
}

impl SensorReading {
    /// The timestamp as a UTC instant, if it is representable
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

/// Payload of a device-state-changed callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStateChanged {
    pub device_id: i32,
    pub method: DeviceMethod,
    pub data: Option<String>,
}

/// Payload of a device-changed callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceChanged {
    pub device_id: i32,
    pub change: DeviceChange,
    pub change_type: DeviceChangeType,
}

/// Payload of a raw-device-event callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDeviceEvent {
    pub controller_id: i32,
    pub data: Option<String>,
}

/// Payload of a sensor-event callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorEvent(pub SensorReading);
