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

//! Synthetic signals and level measurements for offline rendering.

use std::f32::consts::PI;

/// Lowest level reported in dBFS.
pub const SILENCE_DBFS: f32 = -120.0;

/// Generates an interleaved sine wave with the same signal on every channel.
pub fn sine(
    frequency: f32,
    amplitude: f32,
    channels: u16,
    sample_rate: u32,
    frames: usize,
) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    let mut samples = Vec::with_capacity(frames * channels);
    for i in 0..frames {
        let t = i as f32 / sample_rate.max(1) as f32;
        let value = amplitude * (2.0 * PI * frequency * t).sin();
        samples.extend(std::iter::repeat(value).take(channels));
    }
    samples
}

/// Largest absolute sample value.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0, |max, s| max.max(s.abs()))
}

/// Root mean square of a signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|&x| x * x).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Converts a linear level to dBFS, flooring silence.
pub fn to_dbfs(level: f32) -> f32 {
    if level <= 0.0 {
        return SILENCE_DBFS;
    }
    (20.0 * level.log10()).max(SILENCE_DBFS)
}
