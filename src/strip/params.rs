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

//! Typed strip parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::envelope::StopMode;
use super::PlayMode;

/// Identifies one strip parameter.
#[derive(Deserialize, Clone, Copy, Serialize, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ParamId {
    NumChunks,
    PlayMode,
    StopMode,
    Volume,
    Latched,
    Reversed,
    SpeedLocked,
    PlaySpeed,
    RampLength,
    SelectionStart,
    SelectionEnd,
    VisualStart,
    VisualEnd,
    LoopStartChunk,
    LoopEndChunk,
    ChunkSize,
    IsPlaying,
    PlaybackPercentage,
    ButtonsHeld,
}

impl ParamId {
    pub const ALL: [ParamId; 19] = [
        ParamId::NumChunks,
        ParamId::PlayMode,
        ParamId::StopMode,
        ParamId::Volume,
        ParamId::Latched,
        ParamId::Reversed,
        ParamId::SpeedLocked,
        ParamId::PlaySpeed,
        ParamId::RampLength,
        ParamId::SelectionStart,
        ParamId::SelectionEnd,
        ParamId::VisualStart,
        ParamId::VisualEnd,
        ParamId::LoopStartChunk,
        ParamId::LoopEndChunk,
        ParamId::ChunkSize,
        ParamId::IsPlaying,
        ParamId::PlaybackPercentage,
        ParamId::ButtonsHeld,
    ];

    /// Derived parameters can be read but not set.
    pub fn is_read_only(self) -> bool {
        matches!(
            self,
            ParamId::LoopStartChunk
                | ParamId::LoopEndChunk
                | ParamId::ChunkSize
                | ParamId::IsPlaying
                | ParamId::PlaybackPercentage
                | ParamId::ButtonsHeld
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            ParamId::NumChunks => "num_chunks",
            ParamId::PlayMode => "play_mode",
            ParamId::StopMode => "stop_mode",
            ParamId::Volume => "volume",
            ParamId::Latched => "latched",
            ParamId::Reversed => "reversed",
            ParamId::SpeedLocked => "speed_locked",
            ParamId::PlaySpeed => "play_speed",
            ParamId::RampLength => "ramp_length",
            ParamId::SelectionStart => "selection_start",
            ParamId::SelectionEnd => "selection_end",
            ParamId::VisualStart => "visual_start",
            ParamId::VisualEnd => "visual_end",
            ParamId::LoopStartChunk => "loop_start_chunk",
            ParamId::LoopEndChunk => "loop_end_chunk",
            ParamId::ChunkSize => "chunk_size",
            ParamId::IsPlaying => "is_playing",
            ParamId::PlaybackPercentage => "playback_percentage",
            ParamId::ButtonsHeld => "buttons_held",
        }
    }

    /// The kind of value this parameter carries.
    pub fn kind(self) -> &'static str {
        match self {
            ParamId::Latched | ParamId::Reversed | ParamId::SpeedLocked | ParamId::IsPlaying => {
                "bool"
            }
            ParamId::NumChunks
            | ParamId::RampLength
            | ParamId::VisualStart
            | ParamId::VisualEnd
            | ParamId::LoopStartChunk
            | ParamId::LoopEndChunk
            | ParamId::ChunkSize => "int",
            ParamId::Volume | ParamId::PlaybackPercentage => "float",
            ParamId::PlaySpeed | ParamId::SelectionStart | ParamId::SelectionEnd => "double",
            ParamId::PlayMode => "play_mode",
            ParamId::StopMode => "stop_mode",
            ParamId::ButtonsHeld => "bool_array",
        }
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParamId {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParamId::ALL
            .into_iter()
            .find(|id| id.name() == s)
            .ok_or_else(|| ParamError::Unknown(s.to_string()))
    }
}

/// A parameter value.
#[derive(Deserialize, Clone, Serialize, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f32),
    Double(f64),
    PlayMode(PlayMode),
    StopMode(StopMode),
    BoolArray(Vec<bool>),
}

impl ParamValue {
    pub fn kind(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Int(_) => "int",
            ParamValue::Float(_) => "float",
            ParamValue::Double(_) => "double",
            ParamValue::PlayMode(_) => "play_mode",
            ParamValue::StopMode(_) => "stop_mode",
            ParamValue::BoolArray(_) => "bool_array",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Double(v) => write!(f, "{v}"),
            ParamValue::PlayMode(v) => write!(f, "{v:?}"),
            ParamValue::StopMode(v) => write!(f, "{v:?}"),
            ParamValue::BoolArray(v) => write!(f, "{v:?}"),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParamError {
    #[error("parameter {param} takes a {expected} value, got {got}")]
    TypeMismatch {
        param: ParamId,
        expected: &'static str,
        got: &'static str,
    },

    #[error("value {value} is out of range for parameter {param}")]
    OutOfRange { param: ParamId, value: String },

    #[error("parameter {0} is read-only")]
    ReadOnly(ParamId),

    #[error("unknown parameter {0}")]
    Unknown(String),

    #[error("unknown row {0}")]
    UnknownRow(usize),
}

impl ParamError {
    pub(crate) fn mismatch(param: ParamId, value: &ParamValue) -> Self {
        ParamError::TypeMismatch {
            param,
            expected: param.kind(),
            got: value.kind(),
        }
    }

    pub(crate) fn out_of_range(param: ParamId, value: impl fmt::Display) -> Self {
        ParamError::OutOfRange {
            param,
            value: value.to_string(),
        }
    }
}

/// Every readable parameter of one strip at a point in time.
#[derive(Deserialize, Clone, Serialize, Debug, PartialEq)]
pub struct StripSnapshot {
    pub row: usize,
    pub sample_loaded: bool,
    pub num_chunks: usize,
    pub play_mode: PlayMode,
    pub stop_mode: StopMode,
    pub volume: f32,
    pub latched: bool,
    pub reversed: bool,
    pub speed_locked: bool,
    pub play_speed: f64,
    pub ramp_length: usize,
    pub selection_start: f64,
    pub selection_end: f64,
    pub visual_start: u32,
    pub visual_end: u32,
    pub loop_start_chunk: usize,
    pub loop_end_chunk: usize,
    pub chunk_size: usize,
    pub is_playing: bool,
    pub playback_percentage: f32,
    pub buttons_held: Vec<bool>,
}
