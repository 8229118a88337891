//! Runtime display and refresh settings.
//!
//! Settings live only for the session. Every change goes through
//! [`Settings::apply`], which clamps numeric inputs into range, and is
//! classified by [`SettingsChange::effect`] so the monitor knows whether to
//! reschedule, refresh, or merely restyle.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Allowed font sizes, in points.
pub const FONT_SIZE_RANGE: (u8, u8) = (8, 16);
/// Allowed refresh intervals, in minutes.
pub const REFRESH_INTERVAL_RANGE: (u32, u32) = (1, 60);
/// Allowed number of messages shown per account.
pub const MESSAGES_PER_ACCOUNT_RANGE: (u32, u32) = (5, 50);

/// An RGB accent color written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThemeColor {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl ThemeColor {
    /// Creates a color from its channels.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl Default for ThemeColor {
    fn default() -> Self {
        Self::rgb(0x1a, 0x73, 0xe8)
    }
}

impl fmt::Display for ThemeColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Error returned for strings that are not `#rrggbb`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color {0:?}, expected #rrggbb")]
pub struct ParseColorError(String);

impl FromStr for ThemeColor {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseColorError(s.to_string());
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// Current settings. Immutable; changes produce a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Dark color scheme.
    pub dark_mode: bool,
    /// Font size in points.
    pub font_size: u8,
    /// Minutes between scheduled refresh passes.
    pub refresh_interval_minutes: u32,
    /// How many messages per account the list shows.
    pub messages_per_account: u32,
    /// Whether the front end raises desktop notifications.
    pub notifications_enabled: bool,
    /// Accent color.
    pub theme_color: ThemeColor,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dark_mode: false,
            font_size: 10,
            refresh_interval_minutes: 5,
            messages_per_account: 10,
            notifications_enabled: true,
            theme_color: ThemeColor::default(),
        }
    }
}

impl Settings {
    /// Returns the settings with `change` applied, clamped into range.
    #[must_use]
    pub fn apply(&self, change: SettingsChange) -> Self {
        let mut next = self.clone();
        match change.clamped() {
            SettingsChange::DarkMode(on) => next.dark_mode = on,
            SettingsChange::FontSize(size) => next.font_size = size,
            SettingsChange::RefreshInterval(minutes) => next.refresh_interval_minutes = minutes,
            SettingsChange::MessagesPerAccount(count) => next.messages_per_account = count,
            SettingsChange::Notifications(on) => next.notifications_enabled = on,
            SettingsChange::ThemeColor(color) => next.theme_color = color,
        }
        next
    }

    /// Time between scheduled refresh passes.
    #[must_use]
    pub fn refresh_period(&self) -> Duration {
        minutes(self.refresh_interval_minutes)
    }
}

fn minutes(m: u32) -> Duration {
    Duration::from_secs(u64::from(m) * 60)
}

/// One user edit to the settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsChange {
    /// Toggle dark mode.
    DarkMode(bool),
    /// Set the font size.
    FontSize(u8),
    /// Set the refresh interval in minutes.
    RefreshInterval(u32),
    /// Set the number of messages shown per account.
    MessagesPerAccount(u32),
    /// Toggle desktop notifications.
    Notifications(bool),
    /// Set the accent color.
    ThemeColor(ThemeColor),
}

/// What the monitor must do after a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsEffect {
    /// Use a new timer period from the next tick on.
    Reschedule(Duration),
    /// Start a refresh pass immediately.
    RefreshNow,
    /// Only the presentation changes.
    Restyle,
    /// Nothing beyond storing the value.
    None,
}

impl SettingsChange {
    /// The same change with its value clamped into the allowed range.
    #[must_use]
    pub fn clamped(self) -> Self {
        match self {
            Self::FontSize(size) => Self::FontSize(size.clamp(FONT_SIZE_RANGE.0, FONT_SIZE_RANGE.1)),
            Self::RefreshInterval(m) => {
                Self::RefreshInterval(m.clamp(REFRESH_INTERVAL_RANGE.0, REFRESH_INTERVAL_RANGE.1))
            }
            Self::MessagesPerAccount(n) => Self::MessagesPerAccount(
                n.clamp(MESSAGES_PER_ACCOUNT_RANGE.0, MESSAGES_PER_ACCOUNT_RANGE.1),
            ),
            other => other,
        }
    }

    /// Classifies the change.
    ///
    /// Every messages-per-account change refreshes, even when the value is
    /// unchanged.
    #[must_use]
    pub fn effect(self) -> SettingsEffect {
        match self.clamped() {
            Self::RefreshInterval(m) => SettingsEffect::Reschedule(minutes(m)),
            Self::MessagesPerAccount(_) => SettingsEffect::RefreshNow,
            Self::DarkMode(_) | Self::FontSize(_) | Self::ThemeColor(_) => SettingsEffect::Restyle,
            Self::Notifications(_) => SettingsEffect::None,
        }
    }
}
