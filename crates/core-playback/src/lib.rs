//! Playback scheduler: a virtual clock over an ordered event timeline.
//!
//! The scheduler owns the timeline and a cursor into it, never text state.
//! It is driven by an external tick (`advance`) and hands back the slice of
//! events that became due, so the caller can feed them to a reconstructor.
//!
//! States:
//! - `Idle`: nothing loaded.
//! - `Stopped`: loaded, clock at 0.
//! - `Playing`: clock advances by `elapsed * speed` on each tick.
//! - `Paused`: clock frozen. Reaching the end of the timeline while playing
//!   lands here with `is_finished()` set.
//!
//! Delivery contract: across any mix of ticks, each event is handed out once,
//! in timeline order, with nothing skipped. `seek` moves the cursor and returns
//! the full prefix `time <= t` so the caller can rebuild state from scratch;
//! ticks after a seek resume right after that prefix.

use core_events::Event;
use std::time::Duration;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PlaybackState {
    #[default]
    Idle,
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OperationError {
    #[error("no document loaded")]
    NoDocument,
    #[error("invalid playback speed {0}: must be a finite number greater than 0")]
    InvalidSpeed(f64),
    #[error("event {index}: time {time} precedes previous event time {previous}")]
    UnorderedEvents {
        index: usize,
        time: f64,
        previous: f64,
    },
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    events: Vec<Event>,
    /// Number of events already handed out.
    cursor: usize,
    /// Event-time milliseconds.
    clock: f64,
    speed: f64,
    state: PlaybackState,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            cursor: 0,
            clock: 0.0,
            speed: 1.0,
            state: PlaybackState::Idle,
        }
    }

    /// Replace the timeline. On error the previous timeline stays loaded.
    pub fn load_events(&mut self, events: Vec<Event>) -> Result<(), OperationError> {
        let mut previous = f64::NEG_INFINITY;
        for (index, event) in events.iter().enumerate() {
            if event.time.is_nan() || event.time < previous {
                return Err(OperationError::UnorderedEvents {
                    index,
                    time: event.time,
                    previous,
                });
            }
            previous = event.time;
        }
        self.events = events;
        self.cursor = 0;
        self.clock = 0.0;
        self.state = PlaybackState::Stopped;
        debug!(
            target: "playback.scheduler",
            events = self.events.len(),
            duration_ms = self.duration(),
            "timeline_loaded"
        );
        Ok(())
    }

    pub fn play(&mut self) -> Result<(), OperationError> {
        match self.state {
            PlaybackState::Idle => Err(OperationError::NoDocument),
            PlaybackState::Playing => Ok(()),
            PlaybackState::Stopped | PlaybackState::Paused => {
                self.transition(PlaybackState::Playing);
                Ok(())
            }
        }
    }

    /// Freeze the clock. No-op unless playing.
    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.transition(PlaybackState::Paused);
        }
    }

    /// Rewind to 0 without unloading.
    pub fn stop(&mut self) {
        if self.state == PlaybackState::Idle {
            return;
        }
        self.clock = 0.0;
        self.cursor = 0;
        self.transition(PlaybackState::Stopped);
    }

    /// Move the clock to `time` (clamped to `[0, duration]`, NaN as 0) and return
    /// every event with `event.time <= time`, in order, for replay from scratch.
    pub fn seek(&mut self, time: f64) -> Result<&[Event], OperationError> {
        if self.state == PlaybackState::Idle {
            return Err(OperationError::NoDocument);
        }
        let target = if time.is_nan() {
            0.0
        } else {
            time.clamp(0.0, self.duration())
        };
        self.clock = target;
        self.cursor = self.events.partition_point(|e| e.time <= target);
        if self.state != PlaybackState::Playing {
            let next = if target > 0.0 {
                PlaybackState::Paused
            } else {
                PlaybackState::Stopped
            };
            self.transition(next);
        }
        debug!(
            target: "playback.scheduler",
            requested = time,
            clock = self.clock,
            replay = self.cursor,
            "seek"
        );
        Ok(&self.events[..self.cursor])
    }

    pub fn set_speed(&mut self, multiplier: f64) -> Result<(), OperationError> {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(OperationError::InvalidSpeed(multiplier));
        }
        self.speed = multiplier;
        trace!(target: "playback.scheduler", speed = multiplier, "speed_set");
        Ok(())
    }

    /// Advance the clock by `elapsed` wall time and return the events that became due.
    /// Returns nothing unless playing.
    pub fn advance(&mut self, elapsed: Duration) -> &[Event] {
        if self.state != PlaybackState::Playing {
            return &[];
        }
        let duration = self.duration();
        let step = elapsed.as_nanos() as f64 / 1_000_000.0 * self.speed;
        self.clock = (self.clock + step).min(duration);
        let from = self.cursor;
        let clock = self.clock;
        self.cursor = from + self.events[from..].partition_point(|e| e.time <= clock);
        if self.cursor == self.events.len() && self.clock >= duration {
            self.transition(PlaybackState::Paused);
            debug!(target: "playback.scheduler", clock = self.clock, "finished");
        }
        if self.cursor > from {
            trace!(
                target: "playback.scheduler",
                clock = self.clock,
                due = self.cursor - from,
                "advance"
            );
        }
        &self.events[from..self.cursor]
    }

    /// Time of the last event, or 0 when empty.
    pub fn duration(&self) -> f64 {
        self.events.last().map(|e| e.time.max(0.0)).unwrap_or(0.0)
    }

    pub fn current_time(&self) -> f64 {
        self.clock
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Loaded, clock at the end and every event delivered.
    pub fn is_finished(&self) -> bool {
        self.state != PlaybackState::Idle
            && self.cursor == self.events.len()
            && self.clock >= self.duration()
    }

    /// Events handed out since the last load, stop or seek base.
    pub fn delivered(&self) -> &[Event] {
        &self.events[..self.cursor]
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    fn transition(&mut self, next: PlaybackState) {
        if self.state != next {
            trace!(
                target: "playback.scheduler",
                from = ?self.state,
                to = ?next,
                clock = self.clock,
                "transition"
            );
            self.state = next;
        }
    }
}
