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

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::sample::SampleBuffer;

pub use crate::signal::{peak, rms, sine};

/// A mono signal holding one value.
pub fn constant(frames: usize, value: f32) -> Vec<f32> {
    vec![value; frames]
}

/// A mono signal rising linearly from 0 by `step` per frame.
pub fn ramp(frames: usize, step: f32) -> Vec<f32> {
    (0..frames).map(|i| i as f32 * step).collect()
}

/// A shared mono buffer at 44.1kHz.
pub fn mono_buffer(data: Vec<f32>) -> Arc<SampleBuffer> {
    Arc::new(SampleBuffer::from_interleaved(data, 1, 44100))
}

/// Extracts one channel from an interleaved buffer.
pub fn channel(interleaved: &[f32], channels: usize, channel: usize) -> Vec<f32> {
    interleaved
        .iter()
        .skip(channel)
        .step_by(channels)
        .copied()
        .collect()
}

/// Wait for the given predicate to return true or fail.
#[inline]
pub fn eventually<F>(predicate: F, error_msg: &str)
where
    F: Fn() -> bool,
{
    let start = Instant::now();
    let mut tick = Duration::from_millis(1);
    let timeout = Duration::from_secs(5);
    let max_tick = Duration::from_millis(50);

    loop {
        if start.elapsed() > timeout {
            panic!("{}", error_msg);
        }
        if predicate() {
            return;
        }

        thread::sleep(tick);
        tick = std::cmp::min(tick * 2, max_tick);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generators() {
        assert_eq!(constant(3, 0.5), vec![0.5, 0.5, 0.5]);
        assert_eq!(ramp(3, 0.25), vec![0.0, 0.25, 0.5]);
        assert_eq!(channel(&[1.0, 2.0, 3.0, 4.0], 2, 1), vec![2.0, 4.0]);
        assert_eq!(mono_buffer(constant(10, 0.0)).frames(), 10);
    }
}
