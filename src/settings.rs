use crate::cycle::DEFAULT_PHASE_SECS;
use serde::{Deserialize, Serialize};
use std::{fmt, ops::RangeInclusive, path::PathBuf, str::FromStr};

pub const PHASE_RANGE: RangeInclusive<u64> = 2..=10;
pub const GOAL_RANGE: RangeInclusive<u64> = 1..=60;
pub const VOLUME_RANGE: RangeInclusive<u8> = 0..=100;
const VOLUME_STEP: u8 = 5;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThemeName {
    #[default]
    Light,
    Dark,
}

impl ThemeName {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl fmt::Display for ThemeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Light => "light",
            Self::Dark => "dark",
        })
    }
}

impl FromStr for ThemeName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown theme '{other}' (expected light or dark)")),
        }
    }
}

/// User preferences, stored as `settings.json`. Keys missing from the file
/// take their default.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Seconds per phase.
    pub phase_duration: u64,
    /// Daily goal in minutes.
    pub goal_duration: u64,
    pub theme: ThemeName,
    pub voice_enabled: bool,
    pub soundscape: Option<PathBuf>,
    pub soundscape_enabled: bool,
    pub volume: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            phase_duration: DEFAULT_PHASE_SECS,
            goal_duration: 5,
            theme: ThemeName::Light,
            voice_enabled: true,
            soundscape: None,
            soundscape_enabled: false,
            volume: 60,
        }
    }
}

impl Settings {
    /// Pulls hand-edited values back into their slider ranges.
    pub fn clamped(mut self) -> Self {
        self.phase_duration = self.phase_duration.clamp(*PHASE_RANGE.start(), *PHASE_RANGE.end());
        self.goal_duration = self.goal_duration.clamp(*GOAL_RANGE.start(), *GOAL_RANGE.end());
        self.volume = self.volume.min(*VOLUME_RANGE.end());
        self
    }

    /// Moves the slider behind `field` one step. Returns `true` if anything
    /// changed.
    pub fn step(&mut self, field: SettingsField, forward: bool) -> bool {
        let before = self.clone();
        match field {
            SettingsField::PhaseDuration => {
                self.phase_duration = step_within(self.phase_duration, 1, forward, &PHASE_RANGE);
            }
            SettingsField::GoalDuration => {
                self.goal_duration = step_within(self.goal_duration, 1, forward, &GOAL_RANGE);
            }
            SettingsField::Volume => {
                self.volume = if forward {
                    self.volume.saturating_add(VOLUME_STEP).min(*VOLUME_RANGE.end())
                } else {
                    self.volume.saturating_sub(VOLUME_STEP)
                };
            }
            SettingsField::Theme => self.theme = self.theme.toggled(),
            SettingsField::Voice | SettingsField::Soundscape => return self.toggle(field),
        }
        *self != before
    }

    /// Flips a boolean field. Returns `true` if `field` is a toggle.
    pub fn toggle(&mut self, field: SettingsField) -> bool {
        match field {
            SettingsField::Voice => self.voice_enabled = !self.voice_enabled,
            SettingsField::Soundscape => self.soundscape_enabled = !self.soundscape_enabled,
            SettingsField::Theme => self.theme = self.theme.toggled(),
            _ => return false,
        }
        true
    }
}

fn step_within(value: u64, step: u64, forward: bool, range: &RangeInclusive<u64>) -> u64 {
    let next = if forward {
        value.saturating_add(step)
    } else {
        value.saturating_sub(step)
    };
    next.clamp(*range.start(), *range.end())
}

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum SettingsField {
    PhaseDuration,
    GoalDuration,
    Theme,
    Voice,
    Soundscape,
    Volume,
}

impl SettingsField {
    pub const ALL: [SettingsField; 6] = [
        Self::PhaseDuration,
        Self::GoalDuration,
        Self::Theme,
        Self::Voice,
        Self::Soundscape,
        Self::Volume,
    ];

    fn position(self) -> usize {
        Self::ALL.iter().position(|&f| f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.position() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.position() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_file_merges_over_defaults() {
        let loaded: Settings = serde_json::from_str(r#"{"goal_duration": 12}"#).unwrap();
        assert_eq!(
            loaded,
            Settings {
                goal_duration: 12,
                ..Settings::default()
            }
        );

        let loaded: Settings = serde_json::from_str(r#"{"phase_duration": 6, "theme": "dark"}"#).unwrap();
        assert_eq!(loaded.phase_duration, 6);
        assert_eq!(loaded.theme, ThemeName::Dark);
        assert!(loaded.voice_enabled);
    }

    #[test]
    fn clamped_pulls_values_into_range() {
        let s = Settings {
            phase_duration: 30,
            goal_duration: 0,
            volume: 250,
            ..Settings::default()
        }
        .clamped();
        assert_eq!((s.phase_duration, s.goal_duration, s.volume), (10, 1, 100));
    }

    #[test]
    fn sliders_stop_at_their_bounds() {
        let mut s = Settings {
            phase_duration: 10,
            ..Settings::default()
        };
        assert!(!s.step(SettingsField::PhaseDuration, true));
        assert!(s.step(SettingsField::PhaseDuration, false));
        assert_eq!(s.phase_duration, 9);

        s.goal_duration = 1;
        assert!(!s.step(SettingsField::GoalDuration, false));

        s.volume = 98;
        assert!(s.step(SettingsField::Volume, true));
        assert_eq!(s.volume, 100);
    }

    #[test]
    fn theme_and_toggles_flip() {
        let mut s = Settings::default();
        assert!(s.step(SettingsField::Theme, true));
        assert_eq!(s.theme, ThemeName::Dark);
        assert!(s.toggle(SettingsField::Voice));
        assert!(!s.voice_enabled);
        assert!(!s.toggle(SettingsField::Volume));
    }

    #[test]
    fn theme_parses_case_insensitively() {
        assert_eq!("Dark".parse::<ThemeName>(), Ok(ThemeName::Dark));
        assert!("neon".parse::<ThemeName>().is_err());
    }

    #[test]
    fn field_navigation_wraps() {
        assert_eq!(SettingsField::Volume.next(), SettingsField::PhaseDuration);
        assert_eq!(SettingsField::PhaseDuration.prev(), SettingsField::Volume);
    }
}
