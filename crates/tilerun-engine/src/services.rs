//! Scoring and sound services.
//!
//! The world owns one [`Services`] value and lends it to reactions and
//! updates by `&mut`. There is no global state: a headless run, a test and a
//! real frontend each supply their own sinks.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Named sound-effect trigger points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundEvent {
    /// An enemy was landed on.
    Stomp,
    /// A plain coin block was emptied.
    Coin,
    /// A brick broke.
    BreakBlock,
    /// A block was hit without effect.
    Bump,
    /// A block released an item.
    PowerUpAppear,
    /// The player picked up an item.
    PowerUpConsumed,
    /// The player lost its tall form.
    Shrink,
    Death,
    /// A shell was sent sliding.
    Kick,
}

/// Receives score awards.
pub trait ScoreSink {
    fn add_score(&mut self, amount: u32);
}

/// Receives sound triggers.
pub trait SoundSink {
    fn trigger(&mut self, event: SoundEvent);
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl ScoreSink for Silent {
    fn add_score(&mut self, _amount: u32) {}
}

impl SoundSink for Silent {
    fn trigger(&mut self, _event: SoundEvent) {}
}

#[derive(Debug, Default)]
struct Recording {
    score: u64,
    awards: Vec<u32>,
    sounds: Vec<SoundEvent>,
}

/// Records score awards and sounds for inspection.
///
/// Clones share the same recording, so a test can keep one handle and pass
/// another to the world.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    inner: Rc<RefCell<Recording>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total score awarded so far.
    pub fn score(&self) -> u64 {
        self.inner.borrow().score
    }

    /// Individual awards, in order.
    pub fn awards(&self) -> Vec<u32> {
        self.inner.borrow().awards.clone()
    }

    /// Triggered sounds, in order.
    pub fn sounds(&self) -> Vec<SoundEvent> {
        self.inner.borrow().sounds.clone()
    }

    /// How many times `event` was triggered.
    pub fn count(&self, event: SoundEvent) -> usize {
        self.inner
            .borrow()
            .sounds
            .iter()
            .filter(|s| **s == event)
            .count()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        let mut rec = self.inner.borrow_mut();
        rec.score = 0;
        rec.awards.clear();
        rec.sounds.clear();
    }
}

impl ScoreSink for EventRecorder {
    fn add_score(&mut self, amount: u32) {
        let mut rec = self.inner.borrow_mut();
        rec.score += u64::from(amount);
        rec.awards.push(amount);
    }
}

impl SoundSink for EventRecorder {
    fn trigger(&mut self, event: SoundEvent) {
        self.inner.borrow_mut().sounds.push(event);
    }
}

/// The services handed to gameplay code.
pub struct Services {
    score: Box<dyn ScoreSink>,
    sound: Box<dyn SoundSink>,
}

impl Services {
    pub fn new(score: impl ScoreSink + 'static, sound: impl SoundSink + 'static) -> Self {
        Self {
            score: Box::new(score),
            sound: Box::new(sound),
        }
    }

    /// Services that discard every event.
    pub fn silent() -> Self {
        Self::new(Silent, Silent)
    }

    /// Services backed by a shared recorder.
    pub fn recording(recorder: &EventRecorder) -> Self {
        Self::new(recorder.clone(), recorder.clone())
    }

    pub fn add_score(&mut self, amount: u32) {
        trace!(amount, "score");
        self.score.add_score(amount);
    }

    pub fn play(&mut self, event: SoundEvent) {
        trace!(?event, "sound");
        self.sound.trigger(event);
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
