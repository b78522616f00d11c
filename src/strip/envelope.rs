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

//! Start and stop ramps.
//!
//! Every start, stop and loop wrap goes through a short linear gain ramp so that
//! playback never jumps between two unrelated sample values. The tape mode also
//! slows the playhead down while it fades.

use serde::{Deserialize, Serialize};

/// Amount the tape speed factor drops per output sample during a tape stop.
pub const TAPE_STOP_STEP: f64 = 0.000_02;

/// Below this tape speed factor the gain follows the reel down.
const TAPE_FADE_THRESHOLD: f64 = 0.25;

/// Below this tape speed factor a tape stop is finished.
const TAPE_STOP_THRESHOLD: f64 = 0.1;

/// How a ramp-down behaves and what happens once it is done.
#[derive(Deserialize, Clone, Copy, Serialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopMode {
    /// Linear fade, then playback stops.
    #[default]
    Normal,
    /// Linear fade, playback keeps running. Used when a new note or a loop wrap follows.
    EnvelopeOnly,
    /// Playhead decelerates like a tape reel, fading out at the very end.
    Tape,
    /// Stops on the spot without any ramp.
    Instant,
}

/// Fade-in state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StartRamp {
    pub active: bool,
    pub level: f64,
    pub increment: f64,
}

/// Fade-out state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StopRamp {
    pub active: bool,
    pub level: f64,
    pub decrement: f64,
    pub mode: StopMode,
}

/// Result of asking for a ramp-down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RampDown {
    /// A new ramp-down is running.
    Started,
    /// A ramp-down was already running and was left untouched.
    AlreadyActive,
    /// An envelope-only fade was running and now ends playback when it finishes.
    Converted,
    /// Instant mode: the caller must stop playback now.
    Immediate,
}

/// Result of advancing the envelope by one sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvelopeStep {
    Running,
    /// A ramp-down just finished. `stop_playback` is false for envelope-only ramps.
    Finished { stop_playback: bool },
}

/// The envelope controller of one strip. At most one of the two ramps is active.
#[derive(Clone, Debug)]
pub struct Envelope {
    start: StartRamp,
    stop: StopRamp,
    tape_speed_factor: f64,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}

impl Envelope {
    pub fn new() -> Self {
        Self {
            start: StartRamp {
                active: false,
                level: 1.0,
                increment: 0.0,
            },
            stop: StopRamp {
                active: false,
                level: 1.0,
                decrement: 0.0,
                mode: StopMode::Normal,
            },
            tape_speed_factor: 1.0,
        }
    }

    /// Starts a fade-in over `length` samples, cancelling any fade-out.
    pub fn begin_ramp_up(&mut self, length: usize) {
        self.cancel_stop();
        self.start = StartRamp {
            active: true,
            level: 0.0,
            increment: 1.0 / length.max(1) as f64,
        };
    }

    /// Starts a fade-out over `length` samples unless one is already running.
    ///
    /// The fade starts from the current gain, so a fade-in that is cut short never jumps
    /// back up. A stop that arrives during an envelope-only fade takes the fade over
    /// without restarting it.
    pub fn begin_ramp_down(&mut self, length: usize, mode: StopMode) -> RampDown {
        if mode == StopMode::Instant {
            self.reset();
            return RampDown::Immediate;
        }

        if self.stop.active {
            if self.stop.mode == StopMode::EnvelopeOnly && mode != StopMode::EnvelopeOnly {
                self.stop.mode = mode;
                return RampDown::Converted;
            }
            return RampDown::AlreadyActive;
        }

        let level = if self.start.active {
            self.start.level.clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.start.active = false;
        self.start.level = 1.0;

        // Already silent: nothing left to fade.
        if level <= 0.0 && mode != StopMode::EnvelopeOnly {
            self.cancel_stop();
            return RampDown::Immediate;
        }

        self.stop = StopRamp {
            active: true,
            level,
            decrement: level / length.max(1) as f64,
            mode,
        };
        self.tape_speed_factor = 1.0;
        RampDown::Started
    }

    /// Drops both ramps and returns to unity gain.
    pub fn reset(&mut self) {
        self.start.active = false;
        self.start.level = 1.0;
        self.cancel_stop();
    }

    fn cancel_stop(&mut self) {
        self.stop.active = false;
        self.stop.level = 1.0;
        self.tape_speed_factor = 1.0;
    }

    /// Gain to apply to the current sample.
    #[inline]
    pub fn gain(&self) -> f64 {
        if self.start.active {
            self.start.level.clamp(0.0, 1.0)
        } else if self.stop.active {
            self.stop.level.clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    /// Multiplier on the playback increment; below 1.0 only during a tape stop.
    #[inline]
    pub fn tape_speed_factor(&self) -> f64 {
        self.tape_speed_factor
    }

    /// Moves the active ramp on by one sample.
    #[inline]
    pub fn advance(&mut self) -> EnvelopeStep {
        if self.start.active {
            self.start.level += self.start.increment;
            if self.start.level >= 1.0 {
                self.start.level = 1.0;
                self.start.active = false;
            }
            return EnvelopeStep::Running;
        }

        if !self.stop.active {
            return EnvelopeStep::Running;
        }

        let finished = match self.stop.mode {
            StopMode::Normal | StopMode::EnvelopeOnly => {
                self.stop.level -= self.stop.decrement;
                self.stop.level < 0.0
            }
            StopMode::Tape => {
                self.tape_speed_factor -= TAPE_STOP_STEP;
                if self.tape_speed_factor < TAPE_FADE_THRESHOLD {
                    self.stop.level = self.stop.level.min(4.0 * self.tape_speed_factor);
                }
                self.tape_speed_factor < TAPE_STOP_THRESHOLD
            }
            StopMode::Instant => true,
        };

        if !finished {
            return EnvelopeStep::Running;
        }

        let mode = self.stop.mode;
        self.cancel_stop();
        EnvelopeStep::Finished {
            stop_playback: mode != StopMode::EnvelopeOnly,
        }
    }

    pub fn start_ramp(&self) -> StartRamp {
        self.start
    }

    pub fn stop_ramp(&self) -> StopRamp {
        self.stop
    }

    pub fn is_ramping_up(&self) -> bool {
        self.start.active
    }

    pub fn is_ramping_down(&self) -> bool {
        self.stop.active
    }
}
