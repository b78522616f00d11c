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

//! Button grid state for one strip.
//!
//! Interprets presses and releases into playback actions. Holding one button and
//! pressing another to its right selects an inner loop; pressing to its left stops
//! a latched strip.

/// What a grid event asks the strip to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerAction {
    /// Loop the full selection and start playing from the given chunk.
    Start { chunk: usize },
    /// Restrict the loop to `start..end` chunks without moving the playhead.
    InnerLoop { start: usize, end: usize },
    /// Ramp the strip down.
    Stop,
    /// Nothing to do.
    Ignore,
}

/// Held state of every column in one grid row.
#[derive(Clone, Debug)]
pub struct ButtonGrid {
    held: Vec<bool>,
}

impl ButtonGrid {
    pub fn new(width: usize) -> Self {
        Self {
            held: vec![false; width],
        }
    }

    pub fn width(&self) -> usize {
        self.held.len()
    }

    pub fn held(&self) -> &[bool] {
        &self.held
    }

    pub fn is_held(&self, column: usize) -> bool {
        self.held.get(column).copied().unwrap_or(false)
    }

    /// Works out what pressing `column` would do without registering the press.
    pub fn peek_press(&self, column: usize, num_chunks: usize, latched: bool) -> TriggerAction {
        if column >= num_chunks || column >= self.held.len() {
            return TriggerAction::Ignore;
        }

        let leftmost = self
            .held
            .iter()
            .take(num_chunks)
            .enumerate()
            .find(|(c, held)| **held && *c != column)
            .map(|(c, _)| c);

        let last = num_chunks - 1;
        match leftmost {
            Some(anchor) if column > anchor => TriggerAction::InnerLoop {
                start: anchor,
                end: column,
            },
            _ if column == 0 && last > 0 && self.is_held(last) => TriggerAction::InnerLoop {
                start: last,
                end: num_chunks,
            },
            Some(_) if latched => TriggerAction::Stop,
            _ => TriggerAction::Start { chunk: column },
        }
    }

    /// Registers a press and returns the resulting action.
    pub fn press(&mut self, column: usize, num_chunks: usize, latched: bool) -> TriggerAction {
        let action = self.peek_press(column, num_chunks, latched);
        if action != TriggerAction::Ignore {
            self.held[column] = true;
        }
        action
    }

    /// Registers a release. Only a button that was registered as held can stop playback.
    pub fn release(&mut self, column: usize, latched: bool) -> TriggerAction {
        let Some(held) = self.held.get_mut(column) else {
            return TriggerAction::Ignore;
        };
        let was_held = std::mem::replace(held, false);
        if was_held && !latched {
            TriggerAction::Stop
        } else {
            TriggerAction::Ignore
        }
    }
}
