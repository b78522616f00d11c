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

//! The engine that owns every strip and renders them block by block.
//!
//! Each strip sits behind its own lock. The audio thread takes a strip's lock for the
//! whole of that strip's share of a block; control calls take the same lock, so a
//! strip never changes in the middle of a render segment. Grid events inside a block
//! split the strip's render into segments at their offsets.

use std::borrow::Cow;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, EngineConfig, StripSettings};
use crate::events::{EventReceiver, GridEvent, Notifier, StripEvent, DEFAULT_EVENT_CAPACITY};
use crate::sample::{SampleBuffer, SamplePool};
use crate::strip::envelope::StopMode;
use crate::strip::params::{ParamError, ParamId, ParamValue, StripSnapshot};
use crate::strip::Strip;
use crate::util::duration_to_frames;


/// The grid sampler engine.
pub struct Engine {
    /// One lock per strip, indexed by row.
    strips: Vec<Arc<Mutex<Strip>>>,
    /// Buffers the strips observe.
    pool: RwLock<SamplePool>,
    /// Current tempo.
    bpm: Mutex<f64>,
    /// Host sample rate in Hz.
    host_sample_rate: u32,
    /// Buttons per grid row.
    grid_width: usize,
    /// Change notifications.
    notifier: Notifier,
}

impl Engine {
    /// Creates an engine with `rows` empty strips.
    pub fn new(rows: usize, grid_width: usize, host_sample_rate: u32, bpm: f64) -> Engine {
        let grid_width = grid_width.max(1);
        let strips = (0..rows)
            .map(|row| Arc::new(Mutex::new(Strip::new(row, grid_width, host_sample_rate))))
            .collect();
        Engine {
            strips,
            pool: RwLock::new(SamplePool::new()),
            bpm: Mutex::new(bpm),
            host_sample_rate,
            grid_width,
            notifier: Notifier::new(DEFAULT_EVENT_CAPACITY),
        }
    }

    /// Creates an engine from a configuration, applying each row's settings.
    pub fn from_config(config: &EngineConfig) -> Result<Engine, ConfigError> {
        config.validate()?;
        let engine = Engine::new(
            config.rows(),
            config.grid_width(),
            config.sample_rate(),
            config.bpm(),
        );
        let ramp_length = duration_to_frames(config.ramp_length()?, config.sample_rate()).max(1);

        for (row, strip) in engine.strips.iter().enumerate() {
            let settings = config.strip_settings(row);
            let mut strip = strip.lock();
            apply_settings(&mut strip, &settings, ramp_length).map_err(|e| {
                ConfigError::invalid(format!("row {row}"), e.to_string())
            })?;
        }

        info!(
            rows = config.rows(),
            grid_width = config.grid_width(),
            sample_rate = config.sample_rate(),
            bpm = config.bpm(),
            ramp_length,
            "Engine created"
        );
        Ok(engine)
    }

    pub fn rows(&self) -> usize {
        self.strips.len()
    }

    pub fn grid_width(&self) -> usize {
        self.grid_width
    }

    pub fn host_sample_rate(&self) -> u32 {
        self.host_sample_rate
    }

    pub fn bpm(&self) -> f64 {
        *self.bpm.lock()
    }

    /// Gets the strip for a row.
    pub fn strip(&self, row: usize) -> Option<Arc<Mutex<Strip>>> {
        self.strips.get(row).cloned()
    }

    /// Registers a new change notification subscriber.
    pub fn subscribe(&self) -> EventReceiver {
        self.notifier.subscribe()
    }

    /// Mixes one block of every strip into the interleaved `output`.
    ///
    /// `events` should be ordered by offset. Offsets are relative to `start_offset` and
    /// events past the end of the block take effect at its end. A restarting press fades
    /// the strip out over the frames before it, so one at offset 0 gets no fade.
    pub fn process_block(
        &self,
        output: &mut [f32],
        channels: usize,
        start_offset: usize,
        num_frames: usize,
        events: &[GridEvent],
    ) {
        let ordered = events.windows(2).all(|w| w[0].offset <= w[1].offset);
        let events: Cow<[GridEvent]> = if ordered {
            Cow::Borrowed(events)
        } else {
            warn!("Grid events out of order, sorting");
            let mut sorted = events.to_vec();
            sorted.sort_by_key(|event| event.offset);
            Cow::Owned(sorted)
        };

        for event in events.iter().filter(|event| event.row >= self.strips.len()) {
            debug!(row = event.row, column = event.column, "Ignoring event for unknown row");
        }

        for (row, strip) in self.strips.iter().enumerate() {
            let mut strip = strip.lock();
            let mut playing = strip.is_playing();
            let mut cursor = 0;

            for event in events.iter().filter(|event| event.row == row) {
                let at = event.offset.min(num_frames);
                if at > cursor {
                    let restart = event.pressed && strip.press_restarts(event.column);
                    strip.render(output, channels, start_offset + cursor, at - cursor, restart);
                    self.report_transition(row, &mut playing, strip.is_playing());
                    cursor = at;
                }
                apply_grid_event(&mut strip, event);
                self.report_transition(row, &mut playing, strip.is_playing());
            }

            if cursor < num_frames {
                strip.render(output, channels, start_offset + cursor, num_frames - cursor, false);
                self.report_transition(row, &mut playing, strip.is_playing());
            }
        }
    }

    /// Applies a grid event right away, outside of block processing.
    ///
    /// No audio is rendered ahead of the event, so a press that restarts a playing strip
    /// gets no fade-out and may click. Presses that should be click-free belong in
    /// [Engine::process_block] at an offset past the start of the block.
    pub fn grid_event(&self, event: GridEvent) {
        let Some(strip) = self.strips.get(event.row) else {
            warn!(row = event.row, "Grid event for unknown row");
            return;
        };
        let mut strip = strip.lock();
        let mut playing = strip.is_playing();
        apply_grid_event(&mut strip, &event);
        self.report_transition(event.row, &mut playing, strip.is_playing());
    }

    /// Adds a buffer to the pool under a name.
    pub fn add_sample(&self, name: &str, buffer: SampleBuffer) -> Arc<SampleBuffer> {
        self.pool.write().insert(name, buffer)
    }

    /// Removes a buffer from the pool. Strips playing it go silent.
    pub fn remove_sample(&self, name: &str) -> bool {
        self.pool.write().remove(name).is_some()
    }

    /// Returns the pooled sample names.
    pub fn sample_names(&self) -> Vec<String> {
        self.pool
            .read()
            .names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Assigns a pooled sample to a row, or clears the row with `None`.
    pub fn assign_sample(&self, row: usize, name: Option<&str>) -> bool {
        let buffer = match name {
            Some(name) => match self.pool.read().get(name) {
                Some(buffer) => Some(buffer),
                None => {
                    warn!(row, name, "Unknown sample");
                    return false;
                }
            },
            None => None,
        };
        self.assign(row, buffer.as_ref(), name.map(str::to_string))
    }

    /// Assigns a buffer directly. The strip only observes it, so the caller must keep it alive.
    pub fn assign_buffer(&self, row: usize, buffer: Option<&Arc<SampleBuffer>>) -> bool {
        self.assign(row, buffer, None)
    }

    fn assign(&self, row: usize, buffer: Option<&Arc<SampleBuffer>>, name: Option<String>) -> bool {
        let Some(strip) = self.strips.get(row) else {
            warn!(row, "Sample assignment for unknown row");
            return false;
        };
        let bpm = self.bpm();
        let was_playing = {
            let mut strip = strip.lock();
            let was_playing = strip.is_playing();
            strip.assign_sample(buffer, bpm);
            was_playing
        };
        if was_playing {
            self.notifier.notify(StripEvent::PlaybackStopped { row });
        }
        self.notifier.notify(StripEvent::SampleAssigned { row, name });
        true
    }

    /// Sets the tempo and rescales every strip that is not speed-locked.
    pub fn set_bpm(&self, bpm: f64) -> bool {
        if !bpm.is_finite() || bpm <= 0.0 {
            warn!(bpm, "Ignoring invalid tempo");
            return false;
        }
        *self.bpm.lock() = bpm;
        for strip in &self.strips {
            strip.lock().on_bpm_changed(bpm);
        }
        info!(bpm, "Tempo changed");
        self.notifier.notify(StripEvent::TempoChanged { bpm });
        true
    }

    /// Re-derives a strip's speed from its selection and the current tempo.
    pub fn resync_tempo(&self, row: usize) -> bool {
        let Some(strip) = self.strips.get(row) else {
            warn!(row, "Tempo resync for unknown row");
            return false;
        };
        let speed = {
            let mut strip = strip.lock();
            strip.resync_tempo(self.bpm());
            strip.play_speed()
        };
        self.notifier.notify(StripEvent::ParamChanged {
            row,
            param: ParamId::PlaySpeed,
            value: ParamValue::Double(speed),
        });
        true
    }

    /// Ramps every strip down with the given mode.
    pub fn stop_all(&self, mode: StopMode) {
        for (row, strip) in self.strips.iter().enumerate() {
            let mut strip = strip.lock();
            let mut playing = strip.is_playing();
            strip.stop(mode);
            self.report_transition(row, &mut playing, strip.is_playing());
        }
        debug!(?mode, "Stopping all strips");
    }

    /// Sets a strip parameter. Invalid requests are logged and dropped.
    pub fn set_param(&self, row: usize, id: ParamId, value: ParamValue) -> bool {
        match self.try_set_param(row, id, &value) {
            Ok(value) => {
                debug!(row, param = %id, %value, "Parameter changed");
                self.notifier.notify(StripEvent::ParamChanged {
                    row,
                    param: id,
                    value,
                });
                true
            }
            Err(e) => {
                warn!(row, param = %id, %value, err = %e, "Rejected parameter change");
                false
            }
        }
    }

    /// Sets a parameter by name, as a control surface or preset file would.
    pub fn set_param_by_name(&self, row: usize, name: &str, value: ParamValue) -> bool {
        match name.parse::<ParamId>() {
            Ok(id) => self.set_param(row, id, value),
            Err(e) => {
                warn!(row, err = %e, "Rejected parameter change");
                false
            }
        }
    }

    fn try_set_param(
        &self,
        row: usize,
        id: ParamId,
        value: &ParamValue,
    ) -> Result<ParamValue, ParamError> {
        let strip = self
            .strips
            .get(row)
            .ok_or(ParamError::UnknownRow(row))?;
        let mut strip = strip.lock();
        let mut playing = strip.is_playing();
        strip.set_param(id, value)?;
        self.report_transition(row, &mut playing, strip.is_playing());
        Ok(strip.param(id))
    }

    /// Reads a strip parameter.
    pub fn param(&self, row: usize, id: ParamId) -> Option<ParamValue> {
        self.strips.get(row).map(|strip| strip.lock().param(id))
    }

    /// Fraction of the selection played, or -1 when the row is not playing or unknown.
    pub fn playback_percentage(&self, row: usize) -> f32 {
        self.strips
            .get(row)
            .map_or(-1.0, |strip| strip.lock().playback_percentage())
    }

    pub fn is_playing(&self, row: usize) -> bool {
        self.strips
            .get(row)
            .is_some_and(|strip| strip.lock().is_playing())
    }

    pub fn snapshot(&self, row: usize) -> Option<StripSnapshot> {
        self.strips.get(row).map(|strip| strip.lock().snapshot())
    }

    pub fn snapshots(&self) -> Vec<StripSnapshot> {
        self.strips
            .iter()
            .map(|strip| strip.lock().snapshot())
            .collect()
    }

    fn report_transition(&self, row: usize, playing: &mut bool, now: bool) {
        if *playing == now {
            return;
        }
        *playing = now;
        self.notifier.notify(if now {
            StripEvent::PlaybackStarted { row }
        } else {
            StripEvent::PlaybackStopped { row }
        });
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("rows", &self.strips.len())
            .field("grid_width", &self.grid_width)
            .field("host_sample_rate", &self.host_sample_rate)
            .field("bpm", &self.bpm())
            .field("pool", &*self.pool.read())
            .finish()
    }
}

fn apply_grid_event(strip: &mut Strip, event: &GridEvent) {
    let action = if event.pressed {
        strip.grid_press(event.column)
    } else {
        strip.grid_release(event.column)
    };
    debug!(
        row = event.row,
        column = event.column,
        pressed = event.pressed,
        ?action,
        "Grid event"
    );
}

fn apply_settings(
    strip: &mut Strip,
    settings: &StripSettings,
    ramp_length: usize,
) -> Result<(), ParamError> {
    if let Some(num_chunks) = settings.num_chunks() {
        strip.set_num_chunks(num_chunks)?;
    }
    strip.set_play_mode(settings.play_mode());
    strip.set_stop_mode(settings.stop_mode())?;
    strip.set_volume(settings.volume())?;
    strip.set_latched(settings.latched());
    strip.set_reversed(settings.reversed());
    strip.set_speed_locked(settings.speed_locked());
    strip.set_ramp_length(ramp_length)
}
