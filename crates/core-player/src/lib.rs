//! Player: one loaded document, one scheduler, one reconstructor.
//!
//! The player glues the timeline to the state machine. Every event the
//! scheduler hands out is applied to the reconstructor and then pushed to the
//! registered observers together with the resulting snapshot, synchronously
//! and in order. Seeking resets to the initial text and replays the prefix,
//! notifying observers for each replayed event exactly as forward playback
//! would.

use core_events::{Document, Event, LoadError, SessionMeta};
use core_playback::{OperationError, PlaybackState, Scheduler};
use core_state::{Applied, EditPolicy, Reconstructor, TextState};
use std::time::Duration;
use tracing::{debug, info};

/// Receives state changes as they happen. All methods default to no-ops.
pub trait PlaybackObserver: Send + Sync + 'static {
    /// Text was reset to the document's initial state (load, stop, seek).
    fn on_reset(&self, _state: &TextState) {}
    /// One event was applied; `state` already reflects it.
    fn on_event(&self, _event: &Event, _applied: Applied, _state: &TextState) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Debug, Clone)]
pub struct PlayerOptions {
    pub speed: f64,
    /// Start playing as soon as a document is loaded.
    pub auto_play: bool,
    pub policy: EditPolicy,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            speed: 1.0,
            auto_play: false,
            policy: EditPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub playback: PlaybackState,
    pub is_playing: bool,
    pub current_time: f64,
    pub duration: f64,
    pub speed: f64,
    pub text_state: TextState,
}

#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Operation(#[from] OperationError),
}

pub struct Player {
    session: Option<SessionMeta>,
    initial_text: String,
    scheduler: Scheduler,
    reconstructor: Reconstructor,
    observers: Vec<(ObserverId, Box<dyn PlaybackObserver>)>,
    next_observer: u64,
    auto_play: bool,
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

impl Player {
    pub fn new() -> Self {
        Self {
            session: None,
            initial_text: String::new(),
            scheduler: Scheduler::new(),
            reconstructor: Reconstructor::new(""),
            observers: Vec::new(),
            next_observer: 0,
            auto_play: false,
        }
    }

    pub fn with_options(options: PlayerOptions) -> Result<Self, PlayerError> {
        let mut player = Self::new();
        player.scheduler.set_speed(options.speed)?;
        player.reconstructor.set_policy(options.policy);
        player.auto_play = options.auto_play;
        Ok(player)
    }

    /// Replace the loaded document. Nothing changes if the document is rejected.
    pub fn load(&mut self, document: Document) -> Result<(), PlayerError> {
        document.validate()?;
        let Document {
            session,
            initial_text,
            events,
            ..
        } = document;
        self.scheduler.load_events(events)?;
        info!(
            target: "player",
            session = %session.id,
            events = self.scheduler.events().len(),
            duration_ms = self.scheduler.duration(),
            "document_loaded"
        );
        self.session = Some(session);
        self.initial_text = initial_text;
        self.reconstructor.reset(&self.initial_text);
        notify_reset(&self.reconstructor, &self.observers);
        if self.auto_play {
            self.scheduler.play()?;
        }
        Ok(())
    }

    /// Parse, validate and load a JSON document.
    pub fn load_json(&mut self, json: &str) -> Result<(), PlayerError> {
        let document = Document::from_json(json)?;
        self.load(document)
    }

    pub fn is_loaded(&self) -> bool {
        self.session.is_some()
    }

    /// Start or resume. A finished timeline rewinds first.
    pub fn play(&mut self) -> Result<(), PlayerError> {
        if self.scheduler.state() == PlaybackState::Paused && self.scheduler.is_finished() {
            debug!(target: "player", "rewind_finished");
            self.stop();
        }
        self.scheduler.play()?;
        Ok(())
    }

    pub fn pause(&mut self) {
        self.scheduler.pause();
    }

    /// Rewind to 0 and restore the initial text.
    pub fn stop(&mut self) {
        self.scheduler.stop();
        if self.is_loaded() {
            self.reconstructor.reset(&self.initial_text);
            notify_reset(&self.reconstructor, &self.observers);
        }
    }

    /// Jump to `time` ms by resetting and replaying every event up to it.
    pub fn seek(&mut self, time: f64) -> Result<(), PlayerError> {
        let replay = self.scheduler.seek(time)?;
        self.reconstructor.reset(&self.initial_text);
        notify_reset(&self.reconstructor, &self.observers);
        deliver(&mut self.reconstructor, &self.observers, replay);
        let replayed = replay.len();
        debug!(
            target: "player",
            time = self.scheduler.current_time(),
            replayed,
            "seek"
        );
        Ok(())
    }

    pub fn set_speed(&mut self, multiplier: f64) -> Result<(), PlayerError> {
        self.scheduler.set_speed(multiplier)?;
        Ok(())
    }

    /// Advance playback by `elapsed` wall time. Returns how many events were applied.
    pub fn tick(&mut self, elapsed: Duration) -> usize {
        let due = self.scheduler.advance(elapsed);
        deliver(&mut self.reconstructor, &self.observers, due);
        due.len()
    }

    pub fn state(&self) -> PlayerState {
        PlayerState {
            playback: self.scheduler.state(),
            is_playing: self.scheduler.is_playing(),
            current_time: self.scheduler.current_time(),
            duration: self.scheduler.duration(),
            speed: self.scheduler.speed(),
            text_state: self.reconstructor.state(),
        }
    }

    pub fn text_state(&self) -> TextState {
        self.reconstructor.state()
    }

    pub fn is_finished(&self) -> bool {
        self.scheduler.is_finished()
    }

    pub fn session(&self) -> Option<&SessionMeta> {
        self.session.as_ref()
    }

    pub fn initial_text(&self) -> &str {
        &self.initial_text
    }

    pub fn add_observer(&mut self, observer: Box<dyn PlaybackObserver>) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, observer));
        id
    }

    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(other, _)| *other != id);
        self.observers.len() != before
    }

    pub fn clear_observers(&mut self) {
        self.observers.clear();
    }
}

fn notify_reset(reconstructor: &Reconstructor, observers: &[(ObserverId, Box<dyn PlaybackObserver>)]) {
    if observers.is_empty() {
        return;
    }
    let state = reconstructor.state();
    for (_, observer) in observers {
        observer.on_reset(&state);
    }
}

fn deliver(
    reconstructor: &mut Reconstructor,
    observers: &[(ObserverId, Box<dyn PlaybackObserver>)],
    events: &[Event],
) {
    for event in events {
        let applied = reconstructor.apply_event(event);
        if observers.is_empty() {
            continue;
        }
        let state = reconstructor.state();
        for (_, observer) in observers {
            observer.on_event(event, applied, &state);
        }
    }
}
