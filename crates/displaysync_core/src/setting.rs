//! Typed setting values and their wire decoding.

use crate::error::{SyncError, SyncResult};
use crate::registry::{EnumType, SettingKind};
use displaysync_codec::Value;
use std::fmt;

/// When the display is kept from blanking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InhibitMode {
    /// Normal dimming and blanking.
    Off,
    /// Stay on while a charger is connected.
    StayOnWithCharger,
    /// Stay dimmed while a charger is connected.
    StayDimWithCharger,
    /// Always stay on.
    StayOn,
    /// Always stay dimmed.
    StayDim,
}

impl InhibitMode {
    /// Maps a wire integer to a mode.
    pub fn from_wire(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(InhibitMode::Off),
            1 => Some(InhibitMode::StayOnWithCharger),
            2 => Some(InhibitMode::StayDimWithCharger),
            3 => Some(InhibitMode::StayOn),
            4 => Some(InhibitMode::StayDim),
            _ => None,
        }
    }

    /// Wire integer of this mode.
    pub fn to_wire(self) -> i32 {
        self as i32
    }
}

/// Double-tap to wake policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoubleTapMode {
    /// Never wake on double tap.
    Disabled,
    /// Always wake on double tap.
    Enabled,
    /// Wake on double tap unless the proximity sensor is covered.
    EnabledWithoutProximity,
}

impl DoubleTapMode {
    /// Maps a wire integer to a mode.
    pub fn from_wire(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(DoubleTapMode::Disabled),
            1 => Some(DoubleTapMode::Enabled),
            2 => Some(DoubleTapMode::EnabledWithoutProximity),
            _ => None,
        }
    }

    /// Wire integer of this mode.
    pub fn to_wire(self) -> i32 {
        self as i32
    }
}

/// A cached setting value. The variant always matches the setting's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingValue {
    /// Integer setting.
    Integer(i32),
    /// Boolean setting.
    Boolean(bool),
    /// Inhibit mode setting.
    Inhibit(InhibitMode),
    /// Double-tap mode setting.
    DoubleTap(DoubleTapMode),
}

impl SettingValue {
    /// Kind of this value.
    pub fn kind(&self) -> SettingKind {
        match self {
            SettingValue::Integer(_) => SettingKind::Integer,
            SettingValue::Boolean(_) => SettingKind::Boolean,
            SettingValue::Inhibit(_) => SettingKind::Enum(EnumType::InhibitMode),
            SettingValue::DoubleTap(_) => SettingKind::Enum(EnumType::DoubleTapMode),
        }
    }

    /// Wire representation: enums travel as plain integers.
    pub fn encode(&self) -> Value {
        match self {
            SettingValue::Integer(n) => Value::Int32(*n),
            SettingValue::Boolean(b) => Value::Bool(*b),
            SettingValue::Inhibit(mode) => Value::Int32(mode.to_wire()),
            SettingValue::DoubleTap(mode) => Value::Int32(mode.to_wire()),
        }
    }

    /// Returns the integer payload.
    pub fn as_integer(&self) -> Option<i32> {
        match self {
            SettingValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the boolean payload.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the inhibit mode payload.
    pub fn as_inhibit_mode(&self) -> Option<InhibitMode> {
        match self {
            SettingValue::Inhibit(mode) => Some(*mode),
            _ => None,
        }
    }

    /// Returns the double-tap mode payload.
    pub fn as_double_tap_mode(&self) -> Option<DoubleTapMode> {
        match self {
            SettingValue::DoubleTap(mode) => Some(*mode),
            _ => None,
        }
    }

    /// Parses user input for a setting of the given kind.
    ///
    /// Enumerations accept either their name or their wire integer.
    pub fn parse(kind: SettingKind, input: &str) -> Result<Self, String> {
        let input = input.trim();
        match kind {
            SettingKind::Integer => input
                .parse()
                .map(SettingValue::Integer)
                .map_err(|_| format!("'{input}' is not an integer")),
            SettingKind::Boolean => match input {
                "true" | "on" | "1" => Ok(SettingValue::Boolean(true)),
                "false" | "off" | "0" => Ok(SettingValue::Boolean(false)),
                _ => Err(format!("'{input}' is not a boolean")),
            },
            SettingKind::Enum(ty) => {
                let raw = ty
                    .variants()
                    .iter()
                    .find(|(_, name)| *name == input)
                    .map(|(raw, _)| *raw)
                    .or_else(|| input.parse().ok())
                    .ok_or_else(|| format!("'{input}' is not a valid {}", kind.name()))?;
                decode_enum(ty, raw).ok_or_else(|| format!("{raw} is not a valid {}", kind.name()))
            }
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (ty, raw) = match self {
            SettingValue::Integer(n) => return write!(f, "{n}"),
            SettingValue::Boolean(b) => return write!(f, "{b}"),
            SettingValue::Inhibit(mode) => (EnumType::InhibitMode, mode.to_wire()),
            SettingValue::DoubleTap(mode) => (EnumType::DoubleTapMode, mode.to_wire()),
        };
        match ty.variants().iter().find(|(n, _)| *n == raw) {
            Some((_, name)) => f.write_str(name),
            None => write!(f, "{raw}"),
        }
    }
}

fn decode_enum(ty: EnumType, raw: i32) -> Option<SettingValue> {
    match ty {
        EnumType::InhibitMode => InhibitMode::from_wire(raw).map(SettingValue::Inhibit),
        EnumType::DoubleTapMode => DoubleTapMode::from_wire(raw).map(SettingValue::DoubleTap),
    }
}

impl SettingKind {
    /// Decodes a bus value received for `key` according to this kind.
    ///
    /// Nothing is coerced across kinds: a boolean never decodes as an
    /// integer and vice versa, and an enum integer outside the known
    /// mapping is rejected.
    pub fn decode(self, key: &str, value: &Value) -> SyncResult<SettingValue> {
        let mismatch = || SyncError::decode(key, self.name(), value.type_name());
        match self {
            SettingKind::Integer => value.as_i32().map(SettingValue::Integer).ok_or_else(mismatch),
            SettingKind::Boolean => value.as_bool().map(SettingValue::Boolean).ok_or_else(mismatch),
            SettingKind::Enum(ty) => {
                let raw = value.as_i32().ok_or_else(mismatch)?;
                decode_enum(ty, raw)
                    .ok_or_else(|| SyncError::decode(key, self.name(), format!("out-of-range {raw}")))
            }
        }
    }
}
