//! Host configuration for the editor widget

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::edit_mode::EditMode;
use crate::error::{KeyrollError, Result};

/// Grid / snap resolution, expressed relative to the timebase (one bar)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GridResolution {
    #[serde(rename = "8 bars")]
    EightBars,
    #[serde(rename = "4 bars")]
    FourBars,
    #[serde(rename = "2 bars")]
    TwoBars,
    #[serde(rename = "1 bar")]
    Bar,
    #[serde(rename = "1/2")]
    Half,
    #[serde(rename = "1/4")]
    Quarter,
    #[serde(rename = "1/4t")]
    QuarterTriplet,
    #[serde(rename = "1/8")]
    Eighth,
    #[serde(rename = "1/8t")]
    EighthTriplet,
    #[default]
    #[serde(rename = "1/16")]
    Sixteenth,
    #[serde(rename = "1/16t")]
    SixteenthTriplet,
    #[serde(rename = "1/32")]
    ThirtySecond,
    #[serde(rename = "1/32t")]
    ThirtySecondTriplet,
}

impl GridResolution {
    pub const ALL: [GridResolution; 13] = [
        Self::EightBars,
        Self::FourBars,
        Self::TwoBars,
        Self::Bar,
        Self::Half,
        Self::Quarter,
        Self::QuarterTriplet,
        Self::Eighth,
        Self::EighthTriplet,
        Self::Sixteenth,
        Self::SixteenthTriplet,
        Self::ThirtySecond,
        Self::ThirtySecondTriplet,
    ];

    /// Fraction of a bar
    pub fn bars(self) -> f64 {
        match self {
            Self::EightBars => 8.0,
            Self::FourBars => 4.0,
            Self::TwoBars => 2.0,
            Self::Bar => 1.0,
            Self::Half => 0.5,
            Self::Quarter => 0.25,
            Self::QuarterTriplet => 1.0 / 3.0,
            Self::Eighth => 0.125,
            Self::EighthTriplet => 1.0 / 6.0,
            Self::Sixteenth => 0.0625,
            Self::SixteenthTriplet => 1.0 / 12.0,
            Self::ThirtySecond => 0.03125,
            Self::ThirtySecondTriplet => 1.0 / 24.0,
        }
    }

    /// Grid quantum in whole ticks (never below one)
    pub fn ticks(self, timebase: u32) -> u64 {
        ((timebase as f64 * self.bars()).round() as u64).max(1)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::EightBars => "8 bars",
            Self::FourBars => "4 bars",
            Self::TwoBars => "2 bars",
            Self::Bar => "1 bar",
            Self::Half => "1/2",
            Self::Quarter => "1/4",
            Self::QuarterTriplet => "1/4t",
            Self::Eighth => "1/8",
            Self::EighthTriplet => "1/8t",
            Self::Sixteenth => "1/16",
            Self::SixteenthTriplet => "1/16t",
            Self::ThirtySecond => "1/32",
            Self::ThirtySecondTriplet => "1/32t",
        }
    }
}

impl fmt::Display for GridResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Editor configuration. Every field has a default so partial TOML files load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Tempo in BPM
    pub tempo: f64,
    /// Ticks per whole note
    pub timebase: u32,
    pub edit_mode: EditMode,
    pub grid: GridResolution,
    /// Velocity for newly inserted notes
    pub default_velocity: u8,
    /// Length of drag-inserted notes in ticks; the grid quantum when unset
    pub default_length: Option<u64>,
    /// Per-pitch non-overlap enforcement (drum tracks)
    pub monophonic: bool,
    pub loop_start: u64,
    pub loop_end: u64,
    pub show_cursor: bool,
    /// Ignore all pointer input when false
    pub enabled: bool,

    // -- Layout --
    pub width: f64,
    pub height: f64,
    pub x_ruler: f64,
    pub y_ruler: f64,
    pub kb_width: f64,
    pub x_offset: f64,
    pub x_range: f64,
    pub y_offset: f64,
    pub y_range: f64,
    pub wheel_zoom_x: bool,
    pub wheel_zoom_y: bool,

    // -- Notation and playback --
    /// Octave number offset; -1 makes `o4c` middle C (60)
    pub octave_adjust: i32,
    /// Fraction of the written length played back in grid modes
    pub grid_note_ratio: f64,
    /// Look-ahead window in seconds
    pub preload_secs: f64,
    /// Scheduler poll period in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            tempo: 120.0,
            timebase: 16,
            edit_mode: EditMode::default(),
            grid: GridResolution::default(),
            default_velocity: 100,
            default_length: None,
            monophonic: false,
            loop_start: 0,
            loop_end: 16,
            show_cursor: true,
            enabled: true,
            width: 640.0,
            height: 320.0,
            x_ruler: 24.0,
            y_ruler: 24.0,
            kb_width: 40.0,
            x_offset: 0.0,
            x_range: 16.0,
            y_offset: 60.0,
            y_range: 16.0,
            wheel_zoom_x: false,
            wheel_zoom_y: false,
            octave_adjust: -1,
            grid_note_ratio: 0.5,
            preload_secs: 1.0,
            poll_interval_ms: 25,
        }
    }
}

impl EditorConfig {
    /// Grid quantum in ticks for the configured timebase
    pub fn grid_ticks(&self) -> u64 {
        self.grid.ticks(self.timebase)
    }

    /// Length used for drag-inserted notes
    pub fn insert_length(&self) -> u64 {
        self.default_length.unwrap_or_else(|| self.grid_ticks()).max(1)
    }

    /// Report the first invalid value. The editor clamps instead of failing,
    /// so this is for hosts that want to reject bad files up front.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(KeyrollError::InvalidConfig(msg));

        if !(self.tempo.is_finite() && self.tempo > 0.0) {
            return invalid(format!("tempo must be positive, got {}", self.tempo));
        }
        if self.timebase == 0 {
            return invalid("timebase must be at least 1".into());
        }
        if !(1..=127).contains(&self.default_velocity) {
            return invalid(format!("default_velocity must be 1..127, got {}", self.default_velocity));
        }
        if self.default_length == Some(0) {
            return invalid("default_length must be at least 1 tick".into());
        }
        if self.loop_end <= self.loop_start {
            return invalid(format!(
                "loop_end ({}) must be greater than loop_start ({})",
                self.loop_end, self.loop_start
            ));
        }
        if self.width <= self.y_ruler + self.kb_width || self.height <= self.x_ruler {
            return invalid("widget is smaller than its rulers".into());
        }
        if !(self.x_range > 0.0) {
            return invalid(format!("x_range must be positive, got {}", self.x_range));
        }
        if !(self.y_range > 0.0 && self.y_range <= 128.0) {
            return invalid(format!("y_range must be in (0, 128], got {}", self.y_range));
        }
        if !(self.grid_note_ratio > 0.0 && self.grid_note_ratio <= 1.0) {
            return invalid(format!("grid_note_ratio must be in (0, 1], got {}", self.grid_note_ratio));
        }
        if !(self.preload_secs > 0.0) {
            return invalid(format!("preload_secs must be positive, got {}", self.preload_secs));
        }
        if self.poll_interval_ms == 0 {
            return invalid("poll_interval_ms must be at least 1".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit_mode::{InsertStyle, Polyphony};

    #[test]
    fn test_grid_ticks() {
        assert_eq!(GridResolution::Sixteenth.ticks(16), 1);
        assert_eq!(GridResolution::Quarter.ticks(16), 4);
        assert_eq!(GridResolution::Bar.ticks(96), 96);
        assert_eq!(GridResolution::EighthTriplet.ticks(96), 16);
        // Sub-tick resolutions still advance
        assert_eq!(GridResolution::ThirtySecondTriplet.ticks(16), 1);
    }

    #[test]
    fn test_default_is_valid() {
        let config = EditorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.insert_length(), 1);
    }

    #[test]
    fn test_validate_rejects_bad_loop() {
        let config = EditorConfig {
            loop_start: 8,
            loop_end: 8,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(KeyrollError::InvalidConfig(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EditorConfig =
            serde_json::from_str(r#"{"tempo": 90, "edit_mode": "gridmono", "grid": "1/8"}"#).unwrap();
        assert_eq!(config.tempo, 90.0);
        assert_eq!(config.edit_mode, EditMode::new(InsertStyle::Grid, Polyphony::Mono));
        assert_eq!(config.grid, GridResolution::Eighth);
        assert_eq!(config.timebase, 16);
    }

    #[test]
    fn test_unknown_edit_mode_fails_to_load() {
        let result: std::result::Result<EditorConfig, _> = serde_json::from_str(r#"{"edit_mode": "paint"}"#);
        assert!(result.is_err());
    }
}
