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

//! Sample buffers and the pool that owns them.
//!
//! Buffers are decoded elsewhere and handed over entirely in memory. The pool holds
//! the strong references; strips only observe buffers through weak references, so
//! removing a buffer from the pool silences every strip that was playing it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

/// Decoded PCM audio held in memory.
#[derive(Clone)]
pub struct SampleBuffer {
    /// Interleaved f32 samples.
    data: Vec<f32>,
    /// Number of channels per frame.
    channel_count: u16,
    /// Native sample rate of the audio data.
    sample_rate: u32,
}

impl SampleBuffer {
    /// Creates a buffer from interleaved samples. Trailing samples that do not make up a
    /// whole frame are dropped.
    pub fn from_interleaved(mut data: Vec<f32>, channel_count: u16, sample_rate: u32) -> Self {
        let channel_count = channel_count.max(1);
        let whole = data.len() - data.len() % channel_count as usize;
        data.truncate(whole);
        Self {
            data,
            channel_count,
            sample_rate,
        }
    }

    /// Returns the number of channels.
    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    /// Returns the native sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the length in frames.
    pub fn frames(&self) -> usize {
        self.data.len() / self.channel_count as usize
    }

    /// Reads one sample. Anything outside the buffer reads as silence.
    #[inline]
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        let channels = self.channel_count as usize;
        if channel >= channels {
            return 0.0;
        }
        self.data
            .get(frame * channels + channel)
            .copied()
            .unwrap_or(0.0)
    }

    /// Returns the playing time at the native rate.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

impl std::fmt::Debug for SampleBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleBuffer")
            .field("channels", &self.channel_count)
            .field("sample_rate", &self.sample_rate)
            .field("frames", &self.frames())
            .finish()
    }
}

/// Named, shared sample buffers.
#[derive(Default)]
pub struct SamplePool {
    samples: HashMap<String, Arc<SampleBuffer>>,
}

impl SamplePool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a buffer under the given name, replacing any previous buffer with that name.
    pub fn insert(&mut self, name: &str, buffer: SampleBuffer) -> Arc<SampleBuffer> {
        let buffer = Arc::new(buffer);
        info!(
            name,
            channels = buffer.channel_count(),
            sample_rate = buffer.sample_rate(),
            duration_ms = buffer.duration().as_millis(),
            memory_kb = buffer.memory_size() / 1024,
            "Sample added to pool"
        );
        if self
            .samples
            .insert(name.to_string(), buffer.clone())
            .is_some()
        {
            debug!(name, "Replaced existing sample");
        }
        buffer
    }

    /// Gets a buffer by name.
    pub fn get(&self, name: &str) -> Option<Arc<SampleBuffer>> {
        self.samples.get(name).cloned()
    }

    /// Removes a buffer. Strips observing it go silent once the last strong reference drops.
    pub fn remove(&mut self, name: &str) -> Option<Arc<SampleBuffer>> {
        let removed = self.samples.remove(name);
        if removed.is_some() {
            debug!(name, "Sample removed from pool");
        }
        removed
    }

    /// Returns the number of buffers in the pool.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the pool holds no buffers.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns the sample names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.samples.keys().map(String::as_str).collect();
        names.sort();
        names
    }

    /// Returns the total memory used by pooled buffers.
    pub fn total_memory_usage(&self) -> usize {
        self.samples.values().map(|s| s.memory_size()).sum()
    }
}

impl std::fmt::Debug for SamplePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplePool")
            .field("samples", &self.samples.len())
            .field("total_memory_kb", &(self.total_memory_usage() / 1024))
            .finish()
    }
}
