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

//! Messages into and out of the engine.

use crossbeam_channel::TrySendError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::strip::params::{ParamId, ParamValue};

/// Default number of undelivered notifications a subscriber may have queued.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// A grid button press or release, timestamped within the current audio block.
#[derive(Deserialize, Clone, Copy, Serialize, Debug, PartialEq, Eq)]
pub struct GridEvent {
    /// The strip the button belongs to.
    pub row: usize,
    /// The button's column.
    pub column: usize,
    /// True for a press, false for a release.
    pub pressed: bool,
    /// Frame offset from the start of the block.
    pub offset: usize,
}

impl GridEvent {
    pub fn press(row: usize, column: usize, offset: usize) -> GridEvent {
        GridEvent {
            row,
            column,
            pressed: true,
            offset,
        }
    }

    pub fn release(row: usize, column: usize, offset: usize) -> GridEvent {
        GridEvent {
            row,
            column,
            pressed: false,
            offset,
        }
    }
}

/// A change notification for UI and persistence consumers.
#[derive(Deserialize, Clone, Serialize, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StripEvent {
    ParamChanged {
        row: usize,
        param: ParamId,
        value: ParamValue,
    },
    SampleAssigned {
        row: usize,
        name: Option<String>,
    },
    PlaybackStarted {
        row: usize,
    },
    PlaybackStopped {
        row: usize,
    },
    TempoChanged {
        bpm: f64,
    },
}

pub type EventSender = crossbeam_channel::Sender<StripEvent>;
pub type EventReceiver = crossbeam_channel::Receiver<StripEvent>;

/// Fans notifications out to subscribers. Sends never block: a full subscriber misses
/// the event and a disconnected one is dropped.
pub struct Notifier {
    capacity: usize,
    subscribers: Mutex<Vec<EventSender>>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Notifier {
        Notifier {
            capacity: capacity.max(1),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Registers a new subscriber.
    pub fn subscribe(&self) -> EventReceiver {
        let (tx, rx) = crossbeam_channel::bounded(self.capacity);
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn notify(&self, event: StripEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("Subscriber queue full, dropping event");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
