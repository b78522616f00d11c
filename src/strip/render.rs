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

//! The per-sample playback loop.

use super::envelope::{EnvelopeStep, StopMode};
use super::{PlayMode, Strip};
use crate::sample::SampleBuffer;

/// Interpolated values outside the legal range are replaced by silence.
#[inline]
fn guard(value: f32) -> f32 {
    if (-1.0..=1.0).contains(&value) {
        value
    } else {
        0.0
    }
}

impl Strip {
    /// Mixes `num_frames` frames into the interleaved `output`, starting at `start_frame`.
    ///
    /// Output is accumulated, never overwritten. When `restart_follows` is set, a press
    /// that restarts playback lands right after the last frame, and the strip fades out
    /// ahead of it.
    pub fn render(
        &mut self,
        output: &mut [f32],
        channels: usize,
        start_frame: usize,
        num_frames: usize,
        restart_follows: bool,
    ) {
        if !self.playing || channels == 0 {
            return;
        }
        let Some(sample) = self.sample() else {
            self.playing = false;
            self.envelope.reset();
            return;
        };
        if self.selection.is_empty() || self.host_sample_rate == 0 {
            return;
        }

        let rate_ratio = sample.sample_rate() as f64 / self.host_sample_rate as f64;
        let (lo, hi) = self.playback_range();
        let stereo_source = sample.channel_count() > 1;
        let volume = self.volume as f64;

        for i in 0..num_frames {
            let base = (start_frame + i) * channels;
            let Some(out) = output.get_mut(base..base + channels) else {
                break;
            };

            let (left, right) = self.read_frame(&sample, stereo_source);
            let gain = (volume * self.envelope.gain()) as f32;
            if channels == 1 {
                out[0] += (left + right) * 0.5 * gain;
            } else {
                out[0] += left * gain;
                out[1] += right * gain;
            }

            let increment = self.play_speed * self.envelope.tape_speed_factor() * rate_ratio;
            self.look_ahead(increment, lo, hi, restart_follows.then_some(num_frames - i));

            let step = self.envelope.advance();
            self.position += increment;

            if step == (EnvelopeStep::Finished { stop_playback: true }) {
                self.playing = false;
                break;
            }

            let crossed = if increment >= 0.0 {
                self.position >= hi
            } else {
                self.position < lo
            };
            if !crossed {
                continue;
            }

            match self.play_mode {
                PlayMode::Loop => {
                    self.position = self.playback_start_position();
                    // A user stop keeps fading through the wrap.
                    let stopping = self.envelope.is_ramping_down()
                        && self.envelope.stop_ramp().mode != StopMode::EnvelopeOnly;
                    if !stopping {
                        self.envelope.begin_ramp_up(self.ramp_length);
                    }
                }
                PlayMode::PlayToEnd | PlayMode::PlayChunkOnce => {
                    self.playing = false;
                    self.envelope.reset();
                    break;
                }
            }
        }
    }

    /// Reads the interpolated frame at the playhead as a left/right pair.
    #[inline]
    fn read_frame(&self, sample: &SampleBuffer, stereo_source: bool) -> (f32, f32) {
        let base = self.position.floor();
        let frac = (self.position - base) as f32;
        let frame = base.max(0.0) as usize;
        let interpolate = |channel: usize| {
            let a = sample.sample(frame, channel);
            let b = sample.sample(frame + 1, channel);
            guard(a + (b - a) * frac)
        };

        let left = interpolate(0);
        let right = if stereo_source { interpolate(1) } else { left };
        (left, right)
    }

    /// Starts a fade ahead of a restart press or the playback boundary. Skipped while a
    /// fade-out is running, so each approach fades at most once. A fade-in still in
    /// progress is cut short and faded from its current level.
    fn look_ahead(&mut self, increment: f64, lo: f64, hi: f64, until_restart: Option<usize>) {
        if self.envelope.is_ramping_down() {
            return;
        }

        if let Some(remaining) = until_restart {
            if remaining <= self.ramp_length {
                self.envelope.begin_ramp_down(remaining, StopMode::EnvelopeOnly);
                return;
            }
        }

        if increment == 0.0 {
            return;
        }
        let boundary = if increment > 0.0 { hi } else { lo };
        let samples_left = (boundary - self.position) / increment;
        if samples_left >= 0.0 && samples_left < self.ramp_length as f64 {
            let mode = match self.play_mode {
                PlayMode::Loop => StopMode::EnvelopeOnly,
                PlayMode::PlayToEnd | PlayMode::PlayChunkOnce => StopMode::Normal,
            };
            self.envelope.begin_ramp_down(samples_left.ceil() as usize + 1, mode);
        }
    }

    /// Frames bounding what is currently playing, lowest first.
    fn playback_range(&self) -> (f64, f64) {
        let (first, last) = match self.play_mode {
            PlayMode::PlayChunkOnce => (self.trigger_chunk, self.trigger_chunk + 1),
            PlayMode::Loop | PlayMode::PlayToEnd => (self.loop_start_chunk, self.loop_end_chunk),
        };
        (
            self.selection.chunk_boundary(first) as f64,
            self.selection.chunk_boundary(last) as f64,
        )
    }

    /// Where a loop pass begins: the upper edge when reversed.
    pub fn playback_start_position(&self) -> f64 {
        let (lo, hi) = self.playback_range();
        if self.reversed {
            hi
        } else {
            lo
        }
    }

    /// Where a loop pass ends: the lower edge when reversed.
    pub fn playback_end_position(&self) -> f64 {
        let (lo, hi) = self.playback_range();
        if self.reversed {
            lo
        } else {
            hi
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testutil::{constant, peak, ramp};

    /// Eight chunks at native speed with ten sample ramps.
    fn looping_strip(data: Vec<f32>, channels: u16) -> (Strip, Arc<SampleBuffer>) {
        let sample = Arc::new(SampleBuffer::from_interleaved(data, channels, 44100));
        let mut strip = Strip::new(0, 8, 44100);
        strip.assign_sample(Some(&sample), 120.0);
        strip.set_play_speed(1.0).unwrap();
        strip.set_ramp_length(10).unwrap();
        (strip, sample)
    }

    #[test]
    fn test_forward_loop_wraps_and_ramps_up() {
        let (mut strip, _sample) = looping_strip(constant(800, 0.5), 1);
        strip.grid_press(7);

        let mut output = vec![0.0; 100];
        strip.render(&mut output, 1, 0, 100, false);

        assert!(strip.is_playing());
        assert_eq!(strip.position(), 0.0);
        assert!(strip.envelope().is_ramping_up());
        assert_eq!(strip.envelope().start_ramp().level, 0.0);
    }

    #[test]
    fn test_reverse_loop_wraps_to_upper_edge() {
        let (mut strip, _sample) = looping_strip(constant(800, 0.5), 1);
        strip.set_reversed(true);
        strip.grid_press(0);
        assert_eq!(strip.position(), 100.0);

        let mut output = vec![0.0; 101];
        strip.render(&mut output, 1, 0, 101, false);

        assert_eq!(strip.position(), 800.0);
        assert_eq!(strip.playback_start_position(), 800.0);
        assert_eq!(strip.playback_end_position(), 0.0);
    }

    #[test]
    fn test_play_to_end_stops_at_boundary() {
        let (mut strip, _sample) = looping_strip(constant(800, 0.5), 1);
        strip.set_play_mode(PlayMode::PlayToEnd);
        strip.grid_press(7);

        let mut output = vec![0.0; 200];
        strip.render(&mut output, 1, 0, 200, false);

        assert!(!strip.is_playing());
        assert!(output[100..].iter().all(|s| *s == 0.0));
        // The look-ahead faded the tail out.
        assert!(output[99] < output[50]);
    }

    #[test]
    fn test_play_chunk_once_stops_after_chunk() {
        let (mut strip, _sample) = looping_strip(constant(800, 0.5), 1);
        strip.set_play_mode(PlayMode::PlayChunkOnce);
        strip.grid_press(2);

        let mut output = vec![0.0; 300];
        strip.render(&mut output, 1, 0, 300, false);

        assert!(!strip.is_playing());
        assert!(output[100..].iter().all(|s| *s == 0.0));
        assert!((strip.position() - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_output_is_accumulated() {
        let (mut strip, _sample) = looping_strip(constant(800, 0.5), 1);
        strip.grid_press(0);

        let mut output = vec![0.25; 50];
        strip.render(&mut output, 1, 0, 50, false);
        assert_eq!(output[0], 0.25);
        assert_eq!(output[20], 0.75);
    }

    #[test]
    fn test_amplitude_never_exceeds_volume() {
        let data: Vec<f32> = (0..800)
            .map(|i| if i % 2 == 0 { 0.8 } else { -0.8 })
            .collect();
        let (mut strip, _sample) = looping_strip(data, 1);
        strip.set_volume(0.5).unwrap();
        strip.set_play_speed(0.37).unwrap();

        let mut output = vec![0.0; 4000];
        strip.grid_press(3);
        strip.render(&mut output, 1, 0, 1000, false);
        strip.grid_press(5);
        strip.render(&mut output, 1, 1000, 1000, true);
        strip.grid_release(5);
        strip.stop(StopMode::Tape);
        strip.render(&mut output, 1, 2000, 2000, false);

        assert!(peak(&output) <= 0.4 + 1e-6);
    }

    #[test]
    fn test_out_of_range_input_is_silenced() {
        let (mut strip, _sample) = looping_strip(constant(800, 2.0), 1);
        strip.grid_press(0);

        let mut output = vec![0.0; 100];
        strip.render(&mut output, 1, 0, 100, false);
        assert_eq!(peak(&output), 0.0);
    }

    #[test]
    fn test_channel_mapping() {
        // Stereo source, mono destination: channels are averaged.
        let stereo: Vec<f32> = (0..800).flat_map(|_| [0.2, 0.6]).collect();
        let (mut strip, _sample) = looping_strip(stereo, 2);
        strip.set_ramp_length(1).unwrap();
        strip.grid_press(0);
        let mut output = vec![0.0; 4];
        strip.render(&mut output, 1, 0, 4, false);
        assert_eq!(output[0], 0.0);
        assert!((output[1] - 0.4).abs() < 1e-6);

        // Mono source, stereo destination: the channel is copied.
        let (mut strip, _sample) = looping_strip(constant(800, 0.3), 1);
        strip.set_ramp_length(1).unwrap();
        strip.grid_press(0);
        let mut output = vec![0.0; 8];
        strip.render(&mut output, 2, 0, 4, false);
        assert_eq!(output[2], 0.3);
        assert_eq!(output[3], 0.3);
    }

    #[test]
    fn test_interpolates_between_frames() {
        let (mut strip, _sample) = looping_strip(ramp(800, 0.001), 1);
        strip.set_ramp_length(1).unwrap();
        strip.set_play_speed(0.5).unwrap();
        strip.grid_press(0);

        let mut output = vec![0.0; 4];
        strip.render(&mut output, 1, 0, 4, false);
        assert!((output[1] - 0.0005).abs() < 1e-6);
        assert!((output[2] - 0.001).abs() < 1e-6);
    }

    #[test]
    fn test_restart_look_ahead_fades_without_stopping() {
        let (mut strip, _sample) = looping_strip(constant(800, 0.5), 1);
        strip.grid_press(0);

        let mut output = vec![0.0; 70];
        strip.render(&mut output, 1, 0, 20, false);
        strip.render(&mut output, 1, 20, 50, true);

        assert!(strip.is_playing());
        assert!(output[69] < 0.1);
        assert_eq!(output[59], 0.5);
    }

    /// Renders frame by frame and returns the lowest and highest playhead seen.
    fn position_range(strip: &mut Strip, frames: usize) -> (f64, f64) {
        let mut output = [0.0];
        let (mut low, mut high) = (f64::MAX, f64::MIN);
        for _ in 0..frames {
            strip.render(&mut output, 1, 0, 1, false);
            low = low.min(strip.position());
            high = high.max(strip.position());
        }
        (low, high)
    }

    #[test]
    fn test_inner_loop_stays_in_bounds() {
        let (mut strip, _sample) = looping_strip(constant(800, 0.5), 1);
        strip.grid_press(2);
        strip.grid_press(5);
        assert_eq!(strip.loop_chunks(), (2, 5));

        let (low, high) = position_range(&mut strip, 2000);
        assert!(strip.is_playing());
        assert!(low >= 200.0);
        assert!(high < 500.0 && high > 490.0);
    }

    #[test]
    fn test_reversed_inner_loop_stays_in_bounds() {
        let (mut strip, _sample) = looping_strip(constant(800, 0.5), 1);
        strip.set_reversed(true);
        strip.grid_press(2);
        strip.grid_press(5);

        let (low, high) = position_range(&mut strip, 2000);
        assert!(strip.is_playing());
        assert!(low >= 200.0 && low < 210.0);
        assert_eq!(high, 500.0);
    }

    #[test]
    fn test_wraparound_loop_stays_in_last_chunk() {
        let (mut strip, _sample) = looping_strip(constant(800, 0.5), 1);
        strip.grid_press(7);
        strip.grid_press(0);
        assert_eq!(strip.loop_chunks(), (7, 8));

        let (low, high) = position_range(&mut strip, 1000);
        assert!(low >= 700.0);
        assert!(high < 800.0);

        let (mut reversed, _sample) = looping_strip(constant(800, 0.5), 1);
        reversed.set_reversed(true);
        reversed.grid_press(7);
        reversed.grid_press(0);

        let (low, high) = position_range(&mut reversed, 1000);
        assert!(low >= 700.0);
        assert_eq!(high, 800.0);
    }

    /// A strip whose playhead sits inside the envelope-only fade ahead of the loop end.
    fn strip_fading_at_loop_end() -> (Strip, Arc<SampleBuffer>) {
        let (mut strip, sample) = looping_strip(constant(8000, 0.5), 1);
        strip.set_ramp_length(220).unwrap();
        strip.grid_press(7);
        let mut output = vec![0.0; 900];
        strip.render(&mut output, 1, 0, 900, false);

        assert!(strip.envelope().is_ramping_down());
        assert_eq!(strip.envelope().stop_ramp().mode, StopMode::EnvelopeOnly);
        (strip, sample)
    }

    #[test]
    fn test_release_during_loop_end_fade_stops() {
        let (mut strip, _sample) = strip_fading_at_loop_end();
        strip.grid_release(7);
        assert_eq!(strip.envelope().stop_ramp().mode, StopMode::Normal);

        let mut output = vec![0.0; 10_000];
        strip.render(&mut output, 1, 0, 10_000, false);
        assert!(!strip.is_playing());
        assert!(output[200..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_instant_stop_during_loop_end_fade() {
        let (mut strip, _sample) = strip_fading_at_loop_end();
        strip.stop(StopMode::Instant);
        assert!(!strip.is_playing());
        assert!(!strip.envelope().is_ramping_down());
    }

    #[test]
    fn test_restart_during_ramp_up_fades_smoothly() {
        let (mut strip, _sample) = looping_strip(constant(8000, 0.5), 1);
        strip.set_ramp_length(220).unwrap();
        strip.set_latched(true);
        strip.grid_press(0);
        strip.grid_release(0);

        let mut output = vec![0.0; 400];
        strip.render(&mut output, 1, 0, 50, false);
        assert!(strip.envelope().is_ramping_up());
        strip.render(&mut output, 1, 50, 100, true);
        assert!(strip.press_restarts(4));
        strip.grid_press(4);
        strip.render(&mut output, 1, 150, 250, false);

        assert!(output[149] < 0.01);
        let largest_step = output
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .fold(0.0, f32::max);
        assert!(largest_step < 0.005);
    }

    #[test]
    fn test_tape_stop_slows_playhead() {
        let (mut strip, _sample) = looping_strip(constant(100_000, 0.5), 1);
        strip.grid_press(0);
        let mut output = vec![0.0; 50_000];
        strip.render(&mut output, 1, 0, 20, false);

        strip.stop(StopMode::Tape);
        let before = strip.position();
        strip.render(&mut output, 1, 20, 1000, false);
        let travelled = strip.position() - before;
        assert!(travelled < 1000.0);
        assert!(strip.is_playing());

        strip.render(&mut output, 1, 1020, 48_000, false);
        assert!(!strip.is_playing());
    }

    #[test]
    fn test_dropped_sample_stops_rendering() {
        let (mut strip, sample) = looping_strip(constant(800, 0.5), 1);
        strip.grid_press(0);
        drop(sample);

        let mut output = vec![0.0; 10];
        strip.render(&mut output, 1, 0, 10, false);
        assert!(!strip.is_playing());
        assert_eq!(peak(&output), 0.0);
    }

    #[test]
    fn test_sample_rate_ratio() {
        let sample = Arc::new(SampleBuffer::from_interleaved(constant(800, 0.5), 1, 22050));
        let mut strip = Strip::new(0, 8, 44100);
        strip.assign_sample(Some(&sample), 120.0);
        strip.set_play_speed(1.0).unwrap();
        strip.grid_press(0);

        let mut output = vec![0.0; 10];
        strip.render(&mut output, 1, 0, 10, false);
        assert!((strip.position() - 5.0).abs() < 1e-9);
    }
}
