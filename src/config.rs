// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Engine configuration, read from YAML.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use config::{Config, File};
use duration_string::DurationString;
use serde::{Deserialize, Serialize};

use crate::strip::envelope::StopMode;
use crate::strip::PlayMode;

pub mod error;

pub use self::error::ConfigError;

const DEFAULT_SAMPLE_RATE: u32 = 44100;
const DEFAULT_BPM: f64 = 120.0;
const DEFAULT_ROWS: usize = 8;
const DEFAULT_GRID_WIDTH: usize = 8;
const DEFAULT_RAMP_LENGTH: Duration = Duration::from_millis(5);

/// Settings for one strip. Anything unset falls back to the strip defaults.
#[derive(Deserialize, Clone, Serialize, Debug, Default, PartialEq)]
pub struct StripSettings {
    /// Number of chunks the selection is cut into (default: the grid width).
    num_chunks: Option<usize>,

    /// What happens at the end of the loop (default: loop).
    play_mode: Option<PlayMode>,

    /// How grid-initiated stops fade out (default: normal).
    stop_mode: Option<StopMode>,

    /// Strip gain between 0 and 1 (default: 1).
    volume: Option<f32>,

    /// Keep playing after the button is released (default: false).
    latched: Option<bool>,

    /// Play backwards (default: false).
    reversed: Option<bool>,

    /// Ignore tempo and selection changes when deriving speed (default: false).
    speed_locked: Option<bool>,
}

impl StripSettings {
    /// Returns these settings with every field set in `over` replaced.
    pub fn merged(&self, over: &StripSettings) -> StripSettings {
        StripSettings {
            num_chunks: over.num_chunks.or(self.num_chunks),
            play_mode: over.play_mode.or(self.play_mode),
            stop_mode: over.stop_mode.or(self.stop_mode),
            volume: over.volume.or(self.volume),
            latched: over.latched.or(self.latched),
            reversed: over.reversed.or(self.reversed),
            speed_locked: over.speed_locked.or(self.speed_locked),
        }
    }

    pub fn num_chunks(&self) -> Option<usize> {
        self.num_chunks
    }

    pub fn play_mode(&self) -> PlayMode {
        self.play_mode.unwrap_or_default()
    }

    pub fn stop_mode(&self) -> StopMode {
        self.stop_mode.unwrap_or_default()
    }

    pub fn volume(&self) -> f32 {
        self.volume.unwrap_or(1.0)
    }

    pub fn latched(&self) -> bool {
        self.latched.unwrap_or(false)
    }

    pub fn reversed(&self) -> bool {
        self.reversed.unwrap_or(false)
    }

    pub fn speed_locked(&self) -> bool {
        self.speed_locked.unwrap_or(false)
    }

    fn validate(&self, field: &str, grid_width: usize) -> Result<(), ConfigError> {
        if let Some(num_chunks) = self.num_chunks {
            if num_chunks == 0 || num_chunks > grid_width {
                return Err(ConfigError::invalid(
                    format!("{field}.num_chunks"),
                    format!("{num_chunks} is not between 1 and the grid width {grid_width}"),
                ));
            }
        }
        if let Some(volume) = self.volume {
            if !(0.0..=1.0).contains(&volume) {
                return Err(ConfigError::invalid(
                    format!("{field}.volume"),
                    format!("{volume} is not between 0 and 1"),
                ));
            }
        }
        if self.stop_mode == Some(StopMode::EnvelopeOnly) {
            return Err(ConfigError::invalid(
                format!("{field}.stop_mode"),
                "envelope_only never stops playback",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
impl StripSettings {
    /// Creates settings with only the chunk count and play mode set (test only).
    pub fn with_chunks(num_chunks: usize, play_mode: PlayMode) -> Self {
        Self {
            num_chunks: Some(num_chunks),
            play_mode: Some(play_mode),
            ..Default::default()
        }
    }
}

/// The engine configuration.
#[derive(Deserialize, Clone, Serialize, Debug, Default)]
pub struct EngineConfig {
    /// Host sample rate in Hz (default: 44100).
    sample_rate: Option<u32>,

    /// Initial tempo (default: 120).
    bpm: Option<f64>,

    /// Number of strips (default: 8).
    rows: Option<usize>,

    /// Buttons per grid row (default: 8).
    grid_width: Option<usize>,

    /// Length of start and stop ramps, e.g. "5ms" (default: 5ms).
    ramp_length: Option<String>,

    /// Settings applied to every strip.
    #[serde(default)]
    defaults: StripSettings,

    /// Per-row settings merged over the defaults, keyed by row index.
    #[serde(default)]
    overrides: HashMap<String, StripSettings>,
}

impl EngineConfig {
    /// Parses and validates a configuration file.
    pub fn deserialize(path: &Path) -> Result<EngineConfig, ConfigError> {
        let config = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<EngineConfig>()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every value the engine would otherwise have to reject later.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate() == 0 {
            return Err(ConfigError::invalid("sample_rate", "must be positive"));
        }
        let bpm = self.bpm();
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(ConfigError::invalid("bpm", format!("{bpm} is not positive")));
        }
        if self.rows() == 0 {
            return Err(ConfigError::invalid("rows", "must be at least 1"));
        }
        if self.grid_width() == 0 {
            return Err(ConfigError::invalid("grid_width", "must be at least 1"));
        }
        if self.ramp_length()?.is_zero() {
            return Err(ConfigError::invalid("ramp_length", "must not be zero"));
        }

        self.defaults.validate("defaults", self.grid_width())?;
        for (key, settings) in &self.overrides {
            let row = parse_row(key)?;
            if row >= self.rows() {
                return Err(ConfigError::invalid(
                    format!("overrides.{key}"),
                    format!("row {row} does not exist, there are {} rows", self.rows()),
                ));
            }
            settings.validate(&format!("overrides.{key}"), self.grid_width())?;
        }
        Ok(())
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    pub fn bpm(&self) -> f64 {
        self.bpm.unwrap_or(DEFAULT_BPM)
    }

    pub fn rows(&self) -> usize {
        self.rows.unwrap_or(DEFAULT_ROWS)
    }

    pub fn grid_width(&self) -> usize {
        self.grid_width.unwrap_or(DEFAULT_GRID_WIDTH)
    }

    /// Returns the ramp length as a duration.
    pub fn ramp_length(&self) -> Result<Duration, ConfigError> {
        match &self.ramp_length {
            Some(ramp_length) => Ok(DurationString::from_string(ramp_length.clone())
                .map_err(|e| ConfigError::InvalidDuration {
                    value: ramp_length.clone(),
                    reason: e.to_string(),
                })?
                .into()),
            None => Ok(DEFAULT_RAMP_LENGTH),
        }
    }

    /// Returns the settings for a row: the defaults with the row's override merged in.
    pub fn strip_settings(&self, row: usize) -> StripSettings {
        self.overrides
            .iter()
            .find(|(key, _)| parse_row(key).is_ok_and(|r| r == row))
            .map_or_else(
                || self.defaults.clone(),
                |(_, over)| self.defaults.merged(over),
            )
    }
}

#[cfg(test)]
impl EngineConfig {
    /// Creates a configuration from its core values (test only).
    pub fn new(sample_rate: u32, bpm: f64, rows: usize, grid_width: usize) -> Self {
        Self {
            sample_rate: Some(sample_rate),
            bpm: Some(bpm),
            rows: Some(rows),
            grid_width: Some(grid_width),
            ..Default::default()
        }
    }

    /// Adds a per-row override (test only).
    pub fn with_override(mut self, row: usize, settings: StripSettings) -> Self {
        self.overrides.insert(row.to_string(), settings);
        self
    }
}

fn parse_row(key: &str) -> Result<usize, ConfigError> {
    key.trim().parse::<usize>().map_err(|e| {
        ConfigError::invalid(format!("overrides.{key}"), format!("not a row index: {e}"))
    })
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use config::{Config, File, FileFormat};

    use super::*;

    fn parse(yaml: &str) -> EngineConfig {
        Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse("{}");
        config.validate().unwrap();

        assert_eq!(config.sample_rate(), 44100);
        assert_eq!(config.bpm(), 120.0);
        assert_eq!(config.rows(), 8);
        assert_eq!(config.grid_width(), 8);
        assert_eq!(config.ramp_length().unwrap(), Duration::from_millis(5));
        assert_eq!(config.strip_settings(3), StripSettings::default());
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
            sample_rate: 48000
            bpm: 96
            rows: 4
            grid_width: 16
            ramp_length: 10ms
            defaults:
              num_chunks: 16
              play_mode: play_to_end
              latched: true
            overrides:
              "2":
                num_chunks: 4
                stop_mode: tape
                volume: 0.5
        "#;
        let config = parse(yaml);
        config.validate().unwrap();

        assert_eq!(config.sample_rate(), 48000);
        assert_eq!(config.bpm(), 96.0);
        assert_eq!(config.ramp_length().unwrap(), Duration::from_millis(10));

        let row0 = config.strip_settings(0);
        assert_eq!(row0.num_chunks(), Some(16));
        assert_eq!(row0.play_mode(), PlayMode::PlayToEnd);
        assert_eq!(row0.stop_mode(), StopMode::Normal);

        let row2 = config.strip_settings(2);
        assert_eq!(row2.num_chunks(), Some(4));
        assert_eq!(row2.play_mode(), PlayMode::PlayToEnd);
        assert_eq!(row2.stop_mode(), StopMode::Tape);
        assert_eq!(row2.volume(), 0.5);
        assert!(row2.latched());
    }

    #[test]
    fn test_validation_errors() {
        let invalid = [
            "rows: 0",
            "grid_width: 0",
            "bpm: -10",
            "sample_rate: 0",
            "defaults:\n  num_chunks: 9",
            "defaults:\n  num_chunks: 0",
            "defaults:\n  volume: 1.5",
            "defaults:\n  stop_mode: envelope_only",
            "overrides:\n  \"12\":\n    latched: true",
            "overrides:\n  first:\n    latched: true",
        ];
        for yaml in invalid {
            assert!(
                matches!(parse(yaml).validate(), Err(ConfigError::Invalid { .. })),
                "expected {yaml:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_invalid_duration() {
        let config = parse("ramp_length: soon");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn test_deserialize_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "rows: 2\ngrid_width: 4\nbpm: 140").unwrap();

        let config = EngineConfig::deserialize(file.path()).unwrap();
        assert_eq!(config.rows(), 2);
        assert_eq!(config.grid_width(), 4);
        assert_eq!(config.bpm(), 140.0);
    }

    #[test]
    fn test_deserialize_rejects_invalid_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "rows: 0").unwrap();
        assert!(EngineConfig::deserialize(file.path()).is_err());

        let missing = Path::new("/nonexistent/gridslice.yaml");
        assert!(matches!(
            EngineConfig::deserialize(missing),
            Err(ConfigError::Load(_))
        ));
    }
}
