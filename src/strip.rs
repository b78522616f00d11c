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

//! One performable row: a sample, a selection cut into chunks, and a row of grid buttons.
//!
//! A strip never owns its sample. It keeps a weak reference and goes silent when the
//! sample is dropped elsewhere.

use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::sample::SampleBuffer;

pub mod envelope;
pub mod params;
mod render;
pub mod selection;
pub mod tempo;
pub mod trigger;

use self::envelope::{Envelope, RampDown, StopMode};
use self::params::{ParamError, ParamId, ParamValue, StripSnapshot};
use self::selection::Selection;
use self::tempo::TempoMemory;
use self::trigger::{ButtonGrid, TriggerAction};

/// Default ramp length in samples (5ms at 44.1kHz).
pub const DEFAULT_RAMP_LENGTH: usize = 220;

/// What happens when the playhead reaches the end of what it is playing.
#[derive(Deserialize, Clone, Copy, Serialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlayMode {
    /// Wrap back to the start of the loop.
    #[default]
    Loop,
    /// Stop at the end of the loop.
    PlayToEnd,
    /// Stop at the end of the chunk that was pressed.
    PlayChunkOnce,
}

/// All state of one grid row.
#[derive(Debug)]
pub struct Strip {
    row: usize,
    sample: Option<Weak<SampleBuffer>>,
    host_sample_rate: u32,
    selection: Selection,
    buttons: ButtonGrid,
    envelope: Envelope,
    tempo: TempoMemory,
    loop_start_chunk: usize,
    loop_end_chunk: usize,
    /// The chunk of the last normal start, bounding PlayChunkOnce.
    trigger_chunk: usize,
    /// Fractional frame index into the sample.
    position: f64,
    /// Negative exactly when reversed.
    play_speed: f64,
    reversed: bool,
    latched: bool,
    playing: bool,
    speed_locked: bool,
    play_mode: PlayMode,
    stop_mode: StopMode,
    volume: f32,
    ramp_length: usize,
}

impl Strip {
    /// Creates an empty strip with one chunk per grid column.
    pub fn new(row: usize, grid_width: usize, host_sample_rate: u32) -> Strip {
        let grid_width = grid_width.max(1);
        Strip {
            row,
            sample: None,
            host_sample_rate,
            selection: Selection::new(grid_width),
            buttons: ButtonGrid::new(grid_width),
            envelope: Envelope::new(),
            tempo: TempoMemory::default(),
            loop_start_chunk: 0,
            loop_end_chunk: grid_width,
            trigger_chunk: 0,
            position: 0.0,
            play_speed: 1.0,
            reversed: false,
            latched: false,
            playing: false,
            speed_locked: false,
            play_mode: PlayMode::default(),
            stop_mode: StopMode::default(),
            volume: 1.0,
            ramp_length: DEFAULT_RAMP_LENGTH,
        }
    }

    pub fn row(&self) -> usize {
        self.row
    }

    /// Upgrades the weak sample reference, if the sample is still alive.
    pub fn sample(&self) -> Option<Arc<SampleBuffer>> {
        self.sample.as_ref().and_then(Weak::upgrade)
    }

    /// Swaps the observed sample and recomputes selection, loop and tempo state.
    /// Playback stops without a ramp since the old audio is gone.
    pub fn assign_sample(&mut self, sample: Option<&Arc<SampleBuffer>>, bpm: f64) {
        self.playing = false;
        self.envelope.reset();
        self.sample = sample.map(Arc::downgrade);
        self.selection.bind(sample.map_or(0, |sample| sample.frames()));

        self.loop_start_chunk = 0;
        self.loop_end_chunk = self.selection.num_chunks();
        self.trigger_chunk = 0;
        self.position = self.selection.start() as f64;

        self.tempo.clear();
        self.sync_tempo(bpm, !self.speed_locked);

        info!(
            row = self.row,
            frames = self.selection.total_frames(),
            chunk_size = self.selection.chunk_size(),
            speed = self.play_speed,
            "Sample assigned to strip"
        );
    }

    /// Re-derives the speed from the selection and `bpm`, ignoring the speed lock.
    pub fn resync_tempo(&mut self, bpm: f64) {
        self.sync_tempo(bpm, true);
        debug!(row = self.row, bpm, speed = self.play_speed, "Tempo resynced");
    }

    fn sync_tempo(&mut self, bpm: f64, update_speed: bool) {
        let length = self.selection.length();
        if update_speed {
            let sample_rate = self.sample().map_or(0, |sample| sample.sample_rate());
            if let Some(speed) =
                tempo::initial_speed(length, sample_rate, bpm, self.host_sample_rate)
            {
                self.play_speed = if self.reversed { -speed } else { speed };
            }
        }
        self.tempo.record(bpm, length);
    }

    /// Scales the speed by the tempo change unless the speed is locked. The tempo is
    /// remembered either way.
    pub fn on_bpm_changed(&mut self, bpm: f64) {
        if let Some(ratio) = self.tempo.bpm_ratio(bpm) {
            if !self.speed_locked {
                self.play_speed *= ratio;
            }
        }
    }

    fn on_selection_changed(&mut self) {
        if let Some(ratio) = self.tempo.selection_ratio(self.selection.length()) {
            if !self.speed_locked {
                self.play_speed *= ratio;
            }
        }
        self.update_play_params();
    }

    /// Pulls the playhead back inside the selection after it moved or resized.
    fn update_play_params(&mut self) {
        if self.selection.is_empty() {
            self.playing = false;
            self.envelope.reset();
            self.position = self.selection.start() as f64;
            return;
        }
        let num_chunks = self.selection.num_chunks();
        self.loop_end_chunk = self.loop_end_chunk.min(num_chunks);
        self.loop_start_chunk = self.loop_start_chunk.min(self.loop_end_chunk.saturating_sub(1));
        self.trigger_chunk = self.trigger_chunk.min(num_chunks - 1);
        self.position = self.position.clamp(
            self.selection.start() as f64,
            self.selection.end() as f64,
        );
    }

    /// Handles a grid button press and returns what it did.
    pub fn grid_press(&mut self, column: usize) -> TriggerAction {
        let action = self
            .buttons
            .press(column, self.selection.num_chunks(), self.latched);
        self.apply(action);
        action
    }

    /// Handles a grid button release and returns what it did.
    pub fn grid_release(&mut self, column: usize) -> TriggerAction {
        let action = self.buttons.release(column, self.latched);
        self.apply(action);
        action
    }

    /// True when pressing `column` now would restart playback from a new position.
    pub fn press_restarts(&self, column: usize) -> bool {
        self.playing
            && matches!(
                self.buttons
                    .peek_press(column, self.selection.num_chunks(), self.latched),
                TriggerAction::Start { .. }
            )
    }

    fn apply(&mut self, action: TriggerAction) {
        match action {
            TriggerAction::Start { chunk } => self.start_chunk(chunk),
            TriggerAction::InnerLoop { start, end } => {
                self.loop_start_chunk = start;
                self.loop_end_chunk = end;
                debug!(row = self.row, start, end, "Inner loop selected");
            }
            TriggerAction::Stop => self.stop(self.stop_mode),
            TriggerAction::Ignore => {}
        }
    }

    fn start_chunk(&mut self, chunk: usize) {
        if self.sample().is_none() || self.selection.is_empty() {
            debug!(row = self.row, chunk, "Nothing to play");
            return;
        }

        self.loop_start_chunk = 0;
        self.loop_end_chunk = self.selection.num_chunks();
        self.trigger_chunk = chunk;
        let edge = if self.reversed { chunk + 1 } else { chunk };
        self.position = self.selection.chunk_boundary(edge) as f64;
        self.playing = true;
        self.envelope.begin_ramp_up(self.ramp_length);
        debug!(row = self.row, chunk, position = self.position, "Playback started");
    }

    /// Ramps the strip down. EnvelopeOnly never ends playback, so it is treated as Normal.
    pub fn stop(&mut self, mode: StopMode) {
        if !self.playing {
            return;
        }
        let mode = match mode {
            StopMode::EnvelopeOnly => StopMode::Normal,
            mode => mode,
        };
        if self.envelope.begin_ramp_down(self.ramp_length, mode) == RampDown::Immediate {
            self.playing = false;
            self.envelope.reset();
        }
    }

    pub fn set_num_chunks(&mut self, num_chunks: usize) -> Result<(), ParamError> {
        if num_chunks == 0 || num_chunks > self.buttons.width() {
            return Err(ParamError::out_of_range(ParamId::NumChunks, num_chunks));
        }
        self.selection.set_num_chunks(num_chunks);
        self.loop_start_chunk = 0;
        self.loop_end_chunk = num_chunks;
        self.update_play_params();
        Ok(())
    }

    /// Flips the direction. The speed keeps its magnitude.
    pub fn set_reversed(&mut self, reversed: bool) {
        self.reversed = reversed;
        self.play_speed = if reversed {
            -self.play_speed.abs()
        } else {
            self.play_speed.abs()
        };
    }

    /// Sets the signed speed. A negative speed reverses the strip.
    pub fn set_play_speed(&mut self, speed: f64) -> Result<(), ParamError> {
        if !speed.is_finite() || speed == 0.0 {
            return Err(ParamError::out_of_range(ParamId::PlaySpeed, speed));
        }
        self.play_speed = speed;
        self.reversed = speed < 0.0;
        Ok(())
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<(), ParamError> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(ParamError::out_of_range(ParamId::Volume, volume));
        }
        self.volume = volume;
        Ok(())
    }

    pub fn set_stop_mode(&mut self, mode: StopMode) -> Result<(), ParamError> {
        if mode == StopMode::EnvelopeOnly {
            return Err(ParamError::out_of_range(ParamId::StopMode, "envelope_only"));
        }
        self.stop_mode = mode;
        Ok(())
    }

    pub fn set_ramp_length(&mut self, ramp_length: usize) -> Result<(), ParamError> {
        if ramp_length == 0 {
            return Err(ParamError::out_of_range(ParamId::RampLength, ramp_length));
        }
        self.ramp_length = ramp_length;
        Ok(())
    }

    pub fn set_play_mode(&mut self, mode: PlayMode) {
        self.play_mode = mode;
    }

    /// Latching clears no held state; a later release of a held button is simply ignored.
    pub fn set_latched(&mut self, latched: bool) {
        self.latched = latched;
    }

    pub fn set_speed_locked(&mut self, locked: bool) {
        self.speed_locked = locked;
    }

    pub fn set_selection_start(&mut self, fraction: f64) {
        self.selection.set_start_fraction(fraction);
        self.on_selection_changed();
    }

    pub fn set_selection_end(&mut self, fraction: f64) {
        self.selection.set_end_fraction(fraction);
        self.on_selection_changed();
    }

    pub fn set_visual_start(&mut self, pixel: u32) {
        self.selection.set_visual_start(pixel);
        self.on_selection_changed();
    }

    pub fn set_visual_end(&mut self, pixel: u32) {
        self.selection.set_visual_end(pixel);
        self.on_selection_changed();
    }

    /// Sets a parameter from a typed value.
    pub fn set_param(&mut self, id: ParamId, value: &ParamValue) -> Result<(), ParamError> {
        if id.is_read_only() {
            return Err(ParamError::ReadOnly(id));
        }

        match (id, value) {
            (ParamId::NumChunks, ParamValue::Int(v)) => {
                let n = usize::try_from(*v).map_err(|_| ParamError::out_of_range(id, v))?;
                self.set_num_chunks(n)
            }
            (ParamId::PlayMode, ParamValue::PlayMode(mode)) => {
                self.set_play_mode(*mode);
                Ok(())
            }
            (ParamId::StopMode, ParamValue::StopMode(mode)) => self.set_stop_mode(*mode),
            (ParamId::Volume, ParamValue::Float(v)) => self.set_volume(*v),
            (ParamId::Latched, ParamValue::Bool(v)) => {
                self.set_latched(*v);
                Ok(())
            }
            (ParamId::Reversed, ParamValue::Bool(v)) => {
                self.set_reversed(*v);
                Ok(())
            }
            (ParamId::SpeedLocked, ParamValue::Bool(v)) => {
                self.set_speed_locked(*v);
                Ok(())
            }
            (ParamId::PlaySpeed, ParamValue::Double(v)) => self.set_play_speed(*v),
            (ParamId::RampLength, ParamValue::Int(v)) => {
                let n = usize::try_from(*v).map_err(|_| ParamError::out_of_range(id, v))?;
                self.set_ramp_length(n)
            }
            (ParamId::SelectionStart | ParamId::SelectionEnd, ParamValue::Double(v)) => {
                if !(0.0..=1.0).contains(v) {
                    return Err(ParamError::out_of_range(id, v));
                }
                if id == ParamId::SelectionStart {
                    self.set_selection_start(*v);
                } else {
                    self.set_selection_end(*v);
                }
                Ok(())
            }
            (ParamId::VisualStart | ParamId::VisualEnd, ParamValue::Int(v)) => {
                let pixel = u32::try_from(*v)
                    .ok()
                    .filter(|pixel| *pixel <= selection::DISPLAY_WIDTH)
                    .ok_or_else(|| ParamError::out_of_range(id, v))?;
                if id == ParamId::VisualStart {
                    self.set_visual_start(pixel);
                } else {
                    self.set_visual_end(pixel);
                }
                Ok(())
            }
            _ => Err(ParamError::mismatch(id, value)),
        }
    }

    /// Reads a parameter.
    pub fn param(&self, id: ParamId) -> ParamValue {
        match id {
            ParamId::NumChunks => ParamValue::Int(self.selection.num_chunks() as i64),
            ParamId::PlayMode => ParamValue::PlayMode(self.play_mode),
            ParamId::StopMode => ParamValue::StopMode(self.stop_mode),
            ParamId::Volume => ParamValue::Float(self.volume),
            ParamId::Latched => ParamValue::Bool(self.latched),
            ParamId::Reversed => ParamValue::Bool(self.reversed),
            ParamId::SpeedLocked => ParamValue::Bool(self.speed_locked),
            ParamId::PlaySpeed => ParamValue::Double(self.play_speed),
            ParamId::RampLength => ParamValue::Int(self.ramp_length as i64),
            ParamId::SelectionStart => ParamValue::Double(self.selection.start_fraction()),
            ParamId::SelectionEnd => ParamValue::Double(self.selection.end_fraction()),
            ParamId::VisualStart => ParamValue::Int(self.selection.visual_start() as i64),
            ParamId::VisualEnd => ParamValue::Int(self.selection.visual_end() as i64),
            ParamId::LoopStartChunk => ParamValue::Int(self.loop_start_chunk as i64),
            ParamId::LoopEndChunk => ParamValue::Int(self.loop_end_chunk as i64),
            ParamId::ChunkSize => ParamValue::Int(self.selection.chunk_size() as i64),
            ParamId::IsPlaying => ParamValue::Bool(self.playing),
            ParamId::PlaybackPercentage => ParamValue::Float(self.playback_percentage()),
            ParamId::ButtonsHeld => ParamValue::BoolArray(self.buttons.held().to_vec()),
        }
    }

    pub fn snapshot(&self) -> StripSnapshot {
        StripSnapshot {
            row: self.row,
            sample_loaded: self.sample().is_some(),
            num_chunks: self.selection.num_chunks(),
            play_mode: self.play_mode,
            stop_mode: self.stop_mode,
            volume: self.volume,
            latched: self.latched,
            reversed: self.reversed,
            speed_locked: self.speed_locked,
            play_speed: self.play_speed,
            ramp_length: self.ramp_length,
            selection_start: self.selection.start_fraction(),
            selection_end: self.selection.end_fraction(),
            visual_start: self.selection.visual_start(),
            visual_end: self.selection.visual_end(),
            loop_start_chunk: self.loop_start_chunk,
            loop_end_chunk: self.loop_end_chunk,
            chunk_size: self.selection.chunk_size(),
            is_playing: self.playing,
            playback_percentage: self.playback_percentage(),
            buttons_held: self.buttons.held().to_vec(),
        }
    }

    /// Fraction of the selection the playhead has passed, or -1 when not playing.
    pub fn playback_percentage(&self) -> f32 {
        let length = self.selection.length();
        if !self.playing || length == 0 {
            return -1.0;
        }
        let offset = self.position - self.selection.start() as f64;
        (offset / length as f64).clamp(0.0, 1.0) as f32
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn play_speed(&self) -> f64 {
        self.play_speed
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn play_mode(&self) -> PlayMode {
        self.play_mode
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn ramp_length(&self) -> usize {
        self.ramp_length
    }

    pub fn loop_chunks(&self) -> (usize, usize) {
        (self.loop_start_chunk, self.loop_end_chunk)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn buttons(&self) -> &ButtonGrid {
        &self.buttons
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{constant, mono_buffer};

    fn strip_with_sample(frames: usize, num_chunks: usize) -> (Strip, Arc<SampleBuffer>) {
        let sample = mono_buffer(constant(frames, 0.5));
        let mut strip = Strip::new(0, 8, 44100);
        strip.set_num_chunks(num_chunks).unwrap();
        strip.assign_sample(Some(&sample), 120.0);
        (strip, sample)
    }

    #[test]
    fn test_press_starts_full_loop_at_chunk() {
        let (mut strip, _sample) = strip_with_sample(8000, 8);
        strip.grid_press(3);

        assert!(strip.is_playing());
        assert_eq!(strip.loop_chunks(), (0, 8));
        assert_eq!(strip.position(), 3000.0);
        assert!(strip.envelope().is_ramping_up());
    }

    #[test]
    fn test_inner_loop_keeps_position() {
        let (mut strip, _sample) = strip_with_sample(8000, 8);
        strip.grid_press(2);
        let position = strip.position();
        strip.grid_press(5);

        assert_eq!(strip.loop_chunks(), (2, 5));
        assert_eq!(strip.position(), position);
    }

    #[test]
    fn test_wraparound_loop() {
        let (mut strip, _sample) = strip_with_sample(8000, 8);
        strip.grid_press(7);
        strip.grid_press(0);
        assert_eq!(strip.loop_chunks(), (7, 8));
    }

    #[test]
    fn test_reversed_start_is_upper_chunk_edge() {
        let (mut strip, _sample) = strip_with_sample(8000, 8);
        strip.set_reversed(true);
        strip.grid_press(3);
        assert_eq!(strip.position(), 4000.0);
    }

    #[test]
    fn test_reverse_toggle_keeps_magnitude() {
        let (mut strip, _sample) = strip_with_sample(8000, 8);
        strip.set_play_speed(1.5).unwrap();
        strip.set_reversed(true);
        assert_eq!(strip.play_speed(), -1.5);
        strip.set_reversed(false);
        assert_eq!(strip.play_speed(), 1.5);

        strip.set_play_speed(-0.5).unwrap();
        assert!(strip.is_reversed());
        assert!(strip.set_play_speed(0.0).is_err());
    }

    #[test]
    fn test_release_stops_unlatched_only() {
        let (mut strip, _sample) = strip_with_sample(8000, 8);
        strip.grid_press(1);
        let mut output = vec![0.0; 50];
        strip.render(&mut output, 1, 0, 50, false);
        strip.grid_release(1);
        assert!(strip.envelope().is_ramping_down());
        assert!(strip.is_playing());

        // Released before anything was heard: there is nothing to fade.
        let (mut silent, _sample) = strip_with_sample(8000, 8);
        silent.grid_press(1);
        silent.grid_release(1);
        assert!(!silent.is_playing());

        let (mut latched, _sample) = strip_with_sample(8000, 8);
        latched.set_latched(true);
        latched.grid_press(1);
        latched.grid_release(1);
        assert!(!latched.envelope().is_ramping_down());
        assert!(latched.is_playing());
    }

    #[test]
    fn test_latched_stop_combo_uses_stop_mode() {
        let (mut strip, _sample) = strip_with_sample(8000, 8);
        strip.set_latched(true);
        strip.set_stop_mode(StopMode::Instant).unwrap();
        strip.grid_press(5);
        strip.grid_press(2);
        assert!(!strip.is_playing());
        assert_eq!(strip.loop_chunks(), (0, 8));
    }

    #[test]
    fn test_press_without_sample_does_not_play() {
        let mut strip = Strip::new(0, 8, 44100);
        strip.grid_press(0);
        assert!(!strip.is_playing());
        assert!(strip.buttons().is_held(0));
        assert_eq!(strip.playback_percentage(), -1.0);
    }

    #[test]
    fn test_selection_change_scales_speed() {
        let (mut strip, _sample) = strip_with_sample(8000, 8);
        let speed = strip.play_speed();
        strip.set_selection_end(0.5);
        assert!((strip.play_speed() - speed * 0.5).abs() < 1e-12);

        strip.set_speed_locked(true);
        strip.set_selection_end(1.0);
        assert!((strip.play_speed() - speed * 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_bpm_change_compounds_and_respects_lock() {
        let (mut strip, _sample) = strip_with_sample(8000, 8);
        let speed = strip.play_speed();
        strip.on_bpm_changed(180.0);
        strip.on_bpm_changed(240.0);
        assert!((strip.play_speed() - speed * 2.0).abs() < 1e-12);

        strip.set_speed_locked(true);
        strip.on_bpm_changed(120.0);
        assert!((strip.play_speed() - speed * 2.0).abs() < 1e-12);

        // Unlocking does not replay the change made while locked.
        strip.set_speed_locked(false);
        strip.on_bpm_changed(120.0);
        assert!((strip.play_speed() - speed * 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_bpm_change_keeps_direction() {
        let (mut strip, _sample) = strip_with_sample(8000, 8);
        strip.set_reversed(true);
        strip.on_bpm_changed(60.0);
        assert!(strip.play_speed() < 0.0);
    }

    #[test]
    fn test_num_chunks_resets_loop() {
        let (mut strip, _sample) = strip_with_sample(8000, 8);
        strip.grid_press(2);
        strip.grid_press(5);
        strip.set_num_chunks(4).unwrap();
        assert_eq!(strip.loop_chunks(), (0, 4));
        assert_eq!(strip.selection().chunk_size(), 2000);

        assert!(strip.set_num_chunks(0).is_err());
        assert!(strip.set_num_chunks(9).is_err());
    }

    #[test]
    fn test_selection_clamps_position() {
        let (mut strip, _sample) = strip_with_sample(8000, 8);
        strip.grid_press(7);
        strip.set_selection_end(0.5);
        assert!(strip.position() <= 4000.0);
    }

    #[test]
    fn test_dropped_sample_clears_selection_on_reassign() {
        let (mut strip, sample) = strip_with_sample(8000, 8);
        drop(sample);
        assert!(strip.sample().is_none());

        strip.assign_sample(None, 120.0);
        assert_eq!(strip.selection().chunk_size(), 0);
        assert_eq!(strip.param(ParamId::ChunkSize), ParamValue::Int(0));
    }

    #[test]
    fn test_set_param_errors() {
        let (mut strip, _sample) = strip_with_sample(8000, 8);
        assert_eq!(
            strip.set_param(ParamId::IsPlaying, &ParamValue::Bool(true)),
            Err(ParamError::ReadOnly(ParamId::IsPlaying))
        );
        assert!(matches!(
            strip.set_param(ParamId::Volume, &ParamValue::Double(0.5)),
            Err(ParamError::TypeMismatch { .. })
        ));
        assert!(matches!(
            strip.set_param(ParamId::Volume, &ParamValue::Float(1.5)),
            Err(ParamError::OutOfRange { .. })
        ));
        assert!(matches!(
            strip.set_param(ParamId::StopMode, &ParamValue::StopMode(StopMode::EnvelopeOnly)),
            Err(ParamError::OutOfRange { .. })
        ));
        assert!(matches!(
            strip.set_param(ParamId::NumChunks, &ParamValue::Int(-2)),
            Err(ParamError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_set_and_get_params() {
        let (mut strip, _sample) = strip_with_sample(8000, 8);
        strip
            .set_param(ParamId::PlayMode, &ParamValue::PlayMode(PlayMode::PlayToEnd))
            .unwrap();
        strip
            .set_param(ParamId::Volume, &ParamValue::Float(0.25))
            .unwrap();
        strip
            .set_param(ParamId::VisualStart, &ParamValue::Int(512))
            .unwrap();

        assert_eq!(
            strip.param(ParamId::PlayMode),
            ParamValue::PlayMode(PlayMode::PlayToEnd)
        );
        assert_eq!(strip.param(ParamId::Volume), ParamValue::Float(0.25));
        assert_eq!(strip.param(ParamId::SelectionStart), ParamValue::Double(0.5));
        assert_eq!(strip.param(ParamId::ChunkSize), ParamValue::Int(500));
    }

    #[test]
    fn test_snapshot() {
        let (mut strip, _sample) = strip_with_sample(8000, 4);
        strip.grid_press(1);
        let snapshot = strip.snapshot();

        assert_eq!(snapshot.row, strip.row());
        assert!(snapshot.sample_loaded);
        assert!(snapshot.is_playing);
        assert_eq!(snapshot.num_chunks, 4);
        assert_eq!(snapshot.chunk_size, 2000);
        assert_eq!(snapshot.playback_percentage, 0.25);
        assert!(snapshot.buttons_held[1]);
    }
}
