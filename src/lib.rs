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

//! A grid-triggered sample slicing and looping engine.
//!
//! Each row of a button grid drives one [strip::Strip]: a sample, a selection cut into
//! equal chunks and a playhead that jumps between them. The [engine::Engine] owns the
//! strips and mixes them into interleaved blocks for the host.

pub mod config;
pub mod engine;
pub mod events;
pub mod sample;
pub mod script;
pub mod signal;
pub mod strip;
pub mod util;

#[cfg(test)]
pub mod testutil;
