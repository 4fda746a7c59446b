//! Static registry of remote-backed display settings.
//!
//! Each [`SettingId`] is bound to exactly one remote configuration key and
//! one value kind. The read path, the write path and change dispatch all
//! resolve keys through this table and nothing else.

use std::fmt;
use std::str::FromStr;

/// Live-only key for the number of brightness levels the panel supports.
///
/// Not registered: it is never cached and always fetched on demand.
pub const MAX_BRIGHTNESS_KEY: &str = "/system/osso/dsm/display/max_display_brightness_levels";

/// Identifier of a remote-backed setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SettingId {
    /// Display brightness level.
    Brightness,
    /// Seconds of inactivity before the display dims.
    DimTimeout,
    /// Seconds after dimming before the display blanks.
    BlankTimeout,
    /// Blanking inhibit policy.
    InhibitMode,
    /// Adaptive dimming toggle.
    AdaptiveDimmingEnabled,
    /// Low power mode toggle.
    LowPowerModeEnabled,
    /// Ambient light sensor toggle.
    AmbientLightSensorEnabled,
    /// Automatic brightness toggle.
    AutoBrightnessEnabled,
    /// Double-tap to wake policy.
    DoubleTapMode,
    /// Lid sensor toggle.
    LidSensorEnabled,
    /// Filter lid events with the ambient light sensor.
    LidSensorFilteringEnabled,
}

impl SettingId {
    /// All identifiers, in registry order.
    pub const ALL: [SettingId; 11] = [
        SettingId::Brightness,
        SettingId::DimTimeout,
        SettingId::BlankTimeout,
        SettingId::InhibitMode,
        SettingId::AdaptiveDimmingEnabled,
        SettingId::LowPowerModeEnabled,
        SettingId::AmbientLightSensorEnabled,
        SettingId::AutoBrightnessEnabled,
        SettingId::DoubleTapMode,
        SettingId::LidSensorEnabled,
        SettingId::LidSensorFilteringEnabled,
    ];

    /// Position in the registry table.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Stable kebab-case name.
    pub fn name(self) -> &'static str {
        match self {
            SettingId::Brightness => "brightness",
            SettingId::DimTimeout => "dim-timeout",
            SettingId::BlankTimeout => "blank-timeout",
            SettingId::InhibitMode => "inhibit-mode",
            SettingId::AdaptiveDimmingEnabled => "adaptive-dimming",
            SettingId::LowPowerModeEnabled => "low-power-mode",
            SettingId::AmbientLightSensorEnabled => "ambient-light-sensor",
            SettingId::AutoBrightnessEnabled => "auto-brightness",
            SettingId::DoubleTapMode => "double-tap-mode",
            SettingId::LidSensorEnabled => "lid-sensor",
            SettingId::LidSensorFilteringEnabled => "lid-sensor-filtering",
        }
    }

    /// Shorthand for [`lookup`].
    pub fn descriptor(self) -> &'static SettingDescriptor {
        lookup(self)
    }
}

impl fmt::Display for SettingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SettingId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SettingId::ALL
            .into_iter()
            .find(|id| id.name() == s)
            .ok_or_else(|| format!("unknown setting '{s}'"))
    }
}

/// Named enumeration carried as an integer on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumType {
    /// See [`crate::InhibitMode`].
    InhibitMode,
    /// See [`crate::DoubleTapMode`].
    DoubleTapMode,
}

impl EnumType {
    /// Integer-to-name mapping used on the wire.
    pub fn variants(self) -> &'static [(i32, &'static str)] {
        match self {
            EnumType::InhibitMode => &[
                (0, "off"),
                (1, "stay-on-with-charger"),
                (2, "stay-dim-with-charger"),
                (3, "stay-on"),
                (4, "stay-dim"),
            ],
            EnumType::DoubleTapMode => &[
                (0, "disabled"),
                (1, "enabled"),
                (2, "enabled-without-proximity"),
            ],
        }
    }
}

/// Kind of value a setting holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    /// Plain integer.
    Integer,
    /// Boolean toggle.
    Boolean,
    /// Enumerated integer.
    Enum(EnumType),
}

impl SettingKind {
    /// Name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            SettingKind::Integer => "integer",
            SettingKind::Boolean => "boolean",
            SettingKind::Enum(EnumType::InhibitMode) => "inhibit mode",
            SettingKind::Enum(EnumType::DoubleTapMode) => "double-tap mode",
        }
    }
}

/// Static binding of a setting to its remote key and kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingDescriptor {
    /// Local identifier.
    pub id: SettingId,
    /// Remote configuration key, preserved verbatim.
    pub remote_key: &'static str,
    /// Declared value kind.
    pub kind: SettingKind,
}

const fn descriptor(id: SettingId, remote_key: &'static str, kind: SettingKind) -> SettingDescriptor {
    SettingDescriptor {
        id,
        remote_key,
        kind,
    }
}

/// The registry, indexed by [`SettingId::index`].
pub static REGISTRY: [SettingDescriptor; 11] = [
    descriptor(
        SettingId::Brightness,
        "/system/osso/dsm/display/display_brightness",
        SettingKind::Integer,
    ),
    descriptor(
        SettingId::DimTimeout,
        "/system/osso/dsm/display/display_dim_timeout",
        SettingKind::Integer,
    ),
    descriptor(
        SettingId::BlankTimeout,
        "/system/osso/dsm/display/display_blank_timeout",
        SettingKind::Integer,
    ),
    descriptor(
        SettingId::InhibitMode,
        "/system/osso/dsm/display/inhibit_blank_mode",
        SettingKind::Enum(EnumType::InhibitMode),
    ),
    descriptor(
        SettingId::AdaptiveDimmingEnabled,
        "/system/osso/dsm/display/use_adaptive_display_dimming",
        SettingKind::Boolean,
    ),
    descriptor(
        SettingId::LowPowerModeEnabled,
        "/system/osso/dsm/display/use_low_power_mode",
        SettingKind::Boolean,
    ),
    descriptor(
        SettingId::AmbientLightSensorEnabled,
        "/system/osso/dsm/display/als_enabled",
        SettingKind::Boolean,
    ),
    descriptor(
        SettingId::AutoBrightnessEnabled,
        "/system/osso/dsm/display/als_autobrightness",
        SettingKind::Boolean,
    ),
    descriptor(
        SettingId::DoubleTapMode,
        "/system/osso/dsm/doubletap/mode",
        SettingKind::Enum(EnumType::DoubleTapMode),
    ),
    descriptor(
        SettingId::LidSensorEnabled,
        "/system/osso/dsm/locks/lid_sensor_enabled",
        SettingKind::Boolean,
    ),
    descriptor(
        SettingId::LidSensorFilteringEnabled,
        "/system/osso/dsm/locks/filter_lid_with_als",
        SettingKind::Boolean,
    ),
];

/// Returns the descriptor for a setting.
pub fn lookup(id: SettingId) -> &'static SettingDescriptor {
    &REGISTRY[id.index()]
}

/// Resolves a remote key back to its setting.
///
/// Returns `None` for keys this registry does not track; the service may
/// broadcast changes for keys outside the display domain.
pub fn reverse_lookup(remote_key: &str) -> Option<SettingId> {
    REGISTRY
        .iter()
        .find(|d| d.remote_key == remote_key)
        .map(|d| d.id)
}
