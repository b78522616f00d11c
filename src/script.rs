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

//! Scripted grid presses for offline rendering.
//!
//! A press is written `row:column@start` or `row:column@start-end`, where start and end
//! are durations such as `250ms` or `1s`. Without an end the button is never released.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use duration_string::DurationString;

use crate::events::GridEvent;
use crate::util::duration_to_frames;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ScriptError {
    #[error("press {press:?} is missing its {part}")]
    Missing { press: String, part: &'static str },

    #[error("press {press:?} has an invalid {part}: {reason}")]
    Invalid {
        press: String,
        part: &'static str,
        reason: String,
    },

    #[error("press {0:?} is released before it is pressed")]
    ReleaseBeforePress(String),
}

/// One scripted button press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScriptedPress {
    pub row: usize,
    pub column: usize,
    pub press_at: Duration,
    pub release_at: Option<Duration>,
}

impl FromStr for ScriptedPress {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let press = s.trim();
        let missing = |part| ScriptError::Missing {
            press: press.to_string(),
            part,
        };
        let invalid = |part, reason: String| ScriptError::Invalid {
            press: press.to_string(),
            part,
            reason,
        };

        let (button, timing) = press.split_once('@').ok_or_else(|| missing("timing"))?;
        let (row, column) = button.split_once(':').ok_or_else(|| missing("column"))?;
        let row = row
            .trim()
            .parse::<usize>()
            .map_err(|e| invalid("row", e.to_string()))?;
        let column = column
            .trim()
            .parse::<usize>()
            .map_err(|e| invalid("column", e.to_string()))?;

        let parse_duration = |part, value: &str| -> Result<Duration, ScriptError> {
            DurationString::from_string(value.trim().to_string())
                .map(Into::into)
                .map_err(|e| invalid(part, e.to_string()))
        };
        let (press_at, release_at) = match timing.split_once('-') {
            Some((start, end)) => (
                parse_duration("press time", start)?,
                Some(parse_duration("release time", end)?),
            ),
            None => (parse_duration("press time", timing)?, None),
        };

        if release_at.is_some_and(|release| release < press_at) {
            return Err(ScriptError::ReleaseBeforePress(press.to_string()));
        }

        Ok(ScriptedPress {
            row,
            column,
            press_at,
            release_at,
        })
    }
}

impl fmt::Display for ScriptedPress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}@{}ms",
            self.row,
            self.column,
            self.press_at.as_millis()
        )?;
        if let Some(release) = self.release_at {
            write!(f, "-{}ms", release.as_millis())?;
        }
        Ok(())
    }
}

/// A parsed set of presses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PressScript {
    presses: Vec<ScriptedPress>,
}

impl PressScript {
    /// Parses presses separated by commas or whitespace.
    pub fn parse<S: AsRef<str>>(items: &[S]) -> Result<PressScript, ScriptError> {
        let presses = items
            .iter()
            .flat_map(|item| {
                item.as_ref()
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|press| !press.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .map(|press| press.parse::<ScriptedPress>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PressScript { presses })
    }

    pub fn presses(&self) -> &[ScriptedPress] {
        &self.presses
    }

    pub fn is_empty(&self) -> bool {
        self.presses.is_empty()
    }

    /// Returns every press and release as an absolute frame paired with its grid event,
    /// ordered by frame. Event offsets are left at zero for the caller to rebase.
    pub fn timeline(&self, sample_rate: u32) -> Vec<(usize, GridEvent)> {
        let mut timeline: Vec<(usize, GridEvent)> = self
            .presses
            .iter()
            .flat_map(|press| {
                let pressed = (
                    duration_to_frames(press.press_at, sample_rate),
                    GridEvent::press(press.row, press.column, 0),
                );
                let released = press.release_at.map(|release| {
                    (
                        duration_to_frames(release, sample_rate),
                        GridEvent::release(press.row, press.column, 0),
                    )
                });
                std::iter::once(pressed).chain(released)
            })
            .collect();
        timeline.sort_by_key(|(frame, _)| *frame);
        timeline
    }
}
