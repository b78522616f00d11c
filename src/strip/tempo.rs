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

//! Tempo sync.
//!
//! A freshly assigned selection is fitted to a window of whole bars and then snapped
//! by powers of two towards unity speed. Later tempo and selection edits scale the
//! speed proportionally from the last values seen, so repeated edits compound.

/// Beats in one bar.
pub const BEATS_PER_BAR: f64 = 4.0;

/// Bars in the window a selection is fitted to.
pub const BARS_PER_WINDOW: f64 = 4.0;

/// Length of the tempo window in host samples.
pub fn window_samples(bpm: f64, host_sample_rate: f64) -> f64 {
    BARS_PER_WINDOW * BEATS_PER_BAR * 60.0 / bpm * host_sample_rate
}

/// Halves or doubles `raw` for as long as that brings it strictly closer to 1.0.
pub fn normalize_speed(raw: f64) -> f64 {
    if !raw.is_finite() || raw <= 0.0 {
        return 1.0;
    }

    let mut speed = raw;
    if speed > 1.0 {
        while (speed / 2.0 - 1.0).abs() < (speed - 1.0).abs() {
            speed /= 2.0;
        }
    } else {
        while (speed * 2.0 - 1.0).abs() < (speed - 1.0).abs() {
            speed *= 2.0;
        }
    }
    speed
}

/// Speed at which a selection of `selection_length` frames fits the tempo window,
/// snapped towards unity. None when any input is degenerate.
pub fn initial_speed(
    selection_length: usize,
    sample_rate: u32,
    bpm: f64,
    host_sample_rate: u32,
) -> Option<f64> {
    if selection_length == 0 || sample_rate == 0 || host_sample_rate == 0 {
        return None;
    }
    if !bpm.is_finite() || bpm <= 0.0 {
        return None;
    }

    let selection_secs = selection_length as f64 / sample_rate as f64;
    let window_secs = window_samples(bpm, host_sample_rate as f64) / host_sample_rate as f64;
    Some(normalize_speed(selection_secs / window_secs))
}

/// The last tempo and selection length the speed was derived from.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TempoMemory {
    previous_bpm: f64,
    previous_selection_length: usize,
}

impl TempoMemory {
    pub fn record(&mut self, bpm: f64, selection_length: usize) {
        self.previous_bpm = bpm;
        self.previous_selection_length = selection_length;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn previous_bpm(&self) -> f64 {
        self.previous_bpm
    }

    pub fn previous_selection_length(&self) -> usize {
        self.previous_selection_length
    }

    /// Records `new_bpm` and returns the factor to scale the speed by, if there is
    /// a usable previous tempo.
    pub fn bpm_ratio(&mut self, new_bpm: f64) -> Option<f64> {
        if !new_bpm.is_finite() || new_bpm <= 0.0 {
            return None;
        }
        let previous = std::mem::replace(&mut self.previous_bpm, new_bpm);
        (previous > 0.0).then(|| new_bpm / previous)
    }

    /// Records `new_length` and returns the factor to scale the speed by. An empty
    /// selection is not recorded so the next real length compares against the last one.
    pub fn selection_ratio(&mut self, new_length: usize) -> Option<f64> {
        if new_length == 0 {
            return None;
        }
        let previous = std::mem::replace(&mut self.previous_selection_length, new_length);
        (previous > 0).then(|| new_length as f64 / previous as f64)
    }
}
