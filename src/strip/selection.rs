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

//! The region of the sample a strip plays, and its division into chunks.
//!
//! The region is stored as fractions of the sample so it survives being rebound to
//! a sample of a different length. Frame positions are derived from the fractions.

/// Width in pixels of the waveform display that visual positions refer to.
pub const DISPLAY_WIDTH: u32 = 1024;

#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    start_fraction: f64,
    end_fraction: f64,
    num_chunks: usize,
    /// Frames in the bound sample, zero when nothing is bound.
    total_frames: usize,
    start: usize,
    end: usize,
    chunk_size: usize,
}

impl Selection {
    /// Creates a selection covering the whole sample.
    pub fn new(num_chunks: usize) -> Self {
        Self {
            start_fraction: 0.0,
            end_fraction: 1.0,
            num_chunks: num_chunks.max(1),
            total_frames: 0,
            start: 0,
            end: 0,
            chunk_size: 0,
        }
    }

    /// Rebinds the selection to a sample with `total_frames` frames. Zero clears it.
    pub fn bind(&mut self, total_frames: usize) {
        self.total_frames = total_frames;
        self.recompute();
    }

    pub fn set_start_fraction(&mut self, fraction: f64) {
        self.start_fraction = sanitize(fraction).min(self.end_fraction);
        self.recompute();
    }

    pub fn set_end_fraction(&mut self, fraction: f64) {
        self.end_fraction = sanitize(fraction).max(self.start_fraction);
        self.recompute();
    }

    pub fn set_visual_start(&mut self, pixel: u32) {
        self.set_start_fraction(pixel as f64 / DISPLAY_WIDTH as f64);
    }

    pub fn set_visual_end(&mut self, pixel: u32) {
        self.set_end_fraction(pixel as f64 / DISPLAY_WIDTH as f64);
    }

    pub fn set_num_chunks(&mut self, num_chunks: usize) {
        self.num_chunks = num_chunks.max(1);
        self.recompute();
    }

    fn recompute(&mut self) {
        if self.total_frames == 0 {
            self.start = 0;
            self.end = 0;
            self.chunk_size = 0;
            return;
        }

        let total = self.total_frames as f64;
        self.start = ((self.start_fraction * total).floor() as usize).min(self.total_frames);
        self.end =
            ((self.end_fraction * total).floor() as usize).clamp(self.start, self.total_frames);
        self.chunk_size = (self.end - self.start) / self.num_chunks;
    }

    pub fn start_fraction(&self) -> f64 {
        self.start_fraction
    }

    pub fn end_fraction(&self) -> f64 {
        self.end_fraction
    }

    pub fn visual_start(&self) -> u32 {
        (self.start_fraction * DISPLAY_WIDTH as f64).round() as u32
    }

    pub fn visual_end(&self) -> u32 {
        (self.end_fraction * DISPLAY_WIDTH as f64).round() as u32
    }

    pub fn num_chunks(&self) -> usize {
        self.num_chunks
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    /// First frame of the selection.
    pub fn start(&self) -> usize {
        self.start
    }

    /// One past the last frame of the selection.
    pub fn end(&self) -> usize {
        self.end
    }

    pub fn length(&self) -> usize {
        self.end - self.start
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// True when there is nothing to play.
    pub fn is_empty(&self) -> bool {
        self.chunk_size == 0
    }

    /// Frame at which the given chunk boundary lies.
    pub fn chunk_boundary(&self, chunk: usize) -> usize {
        self.start + chunk * self.chunk_size
    }
}

fn sanitize(fraction: f64) -> f64 {
    if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    }
}
