use std::{
    cell::RefCell,
    collections::{HashMap, HashSet, hash_map::Entry},
    fmt::Debug,
};

use log::{debug, warn};
#[cfg(test)]
use mockall::automock;
pub use platforms::input::{KeyKind, MouseKind};
use platforms::{Result, input::Emitter};

use crate::{rng::Rng, run::MS_PER_TICK_F32};

/// Base mean in milliseconds to generate a pair from.
const BASE_MEAN_MS_DELAY: f32 = 100.0;

/// Base standard deviation in milliseconds to generate a pair from.
const BASE_STD_MS_DELAY: f32 = 20.0;

/// The rate at which generated mean and standard deviation revert to their bases.
const MEAN_STD_REVERSION_RATE: f32 = 0.2;

/// The scale of noise added to generated mean and standard deviation.
const MEAN_STD_VOLATILITY: f32 = 3.0;

/// Ticks between re-randomizing the delay mean and standard deviation.
const UPDATE_MEAN_STD_PAIR_INTERVAL: u64 = 200;

/// Bounds in milliseconds of the delay before a pressed key is released.
const MIN_KEY_UP_DELAY_MS: f32 = 80.0;
const MAX_KEY_UP_DELAY_MS: f32 = 120.0;

/// Minimum gap between two presses of the same key.
///
/// A press while the previous up stroke is still delayed is dropped, so repeated presses must be
/// spaced past the longest delay rounded up to whole ticks.
pub const KEY_REPEAT_MILLIS: u64 = 150;

/// A trait for sending simulated inputs to the game client.
///
/// Every method is fire-and-forget. Failures are only logged and the caller observes the effect
/// through later frames.
#[cfg_attr(test, automock)]
pub trait Input: Debug {
    /// Performs a tick update releasing delayed key strokes.
    fn update(&mut self, tick: u64);

    /// Presses a single key `kind`.
    ///
    /// The up stroke is delayed by a random number of ticks.
    fn send_key(&self, kind: KeyKind);

    /// Holds down key `kind` until [`Self::send_key_up`].
    fn send_key_down(&self, kind: KeyKind);

    /// Releases a held key `kind`.
    fn send_key_up(&self, kind: KeyKind);

    /// Whether key `kind` can be pressed again, its previous up stroke having been sent.
    fn is_key_cleared(&self, kind: KeyKind) -> bool;

    /// Sends mouse `kind` to `(x, y)` relative to the captured frame.
    fn send_mouse(&self, x: u32, y: u32, kind: MouseKind);

    /// Types `text` into the focused control.
    fn send_text(&self, text: &str);

    /// Releases every key currently held down.
    fn release_all(&self);

    /// Whether all keys are released.
    fn all_keys_cleared(&self) -> bool;
}

/// Default implementation of [`Input`] on top of a platform [`Emitter`].
#[derive(Debug)]
pub struct DefaultInput {
    emitter: Box<dyn Emitter>,
    delay_rng: Rng,
    delay_mean_std_pair: (f32, f32),
    delay_map: RefCell<HashMap<KeyKind, u32>>,
    held: RefCell<HashSet<KeyKind>>,
}

impl DefaultInput {
    pub fn new(emitter: impl Emitter + 'static, rng: Rng) -> Self {
        Self {
            emitter: Box::new(emitter),
            delay_rng: rng,
            delay_mean_std_pair: (BASE_MEAN_MS_DELAY, BASE_STD_MS_DELAY),
            delay_map: RefCell::new(HashMap::new()),
            held: RefCell::new(HashSet::new()),
        }
    }

    #[inline]
    fn log_failure(action: &str, result: Result<()>) {
        if let Err(err) = result {
            warn!(target: "input", "{action} failed: {err}");
        }
    }

    /// Tracks input delay for a key about to be pressed.
    ///
    /// Returns `true` when only the down stroke should be sent now. The up stroke is then sent by
    /// [`Input::update`] once the delay has run out.
    fn track_input_delay(&self, kind: KeyKind) -> Option<bool> {
        let mut map = self.delay_map.borrow_mut();
        let entry = map.entry(kind);
        if matches!(entry, Entry::Occupied(_)) {
            return None;
        }

        let (_, delay_tick_count) = self.random_input_delay_tick_count();
        if delay_tick_count == 0 {
            return Some(false);
        }

        let _ = entry.insert_entry(delay_tick_count);
        Some(true)
    }

    #[inline]
    fn random_input_delay_tick_count(&self) -> (f32, u32) {
        let (mean, std) = self.delay_mean_std_pair;
        self.delay_rng
            .random_delay_tick_count(
                mean,
                std,
                MS_PER_TICK_F32,
                MIN_KEY_UP_DELAY_MS,
                MAX_KEY_UP_DELAY_MS,
            )
    }
}

impl Input for DefaultInput {
    fn update(&mut self, tick: u64) {
        if tick > 0 && tick.is_multiple_of(UPDATE_MEAN_STD_PAIR_INTERVAL) {
            let (mean, std) = self.delay_mean_std_pair;
            self.delay_mean_std_pair = self.delay_rng.random_mean_std_pair(
                BASE_MEAN_MS_DELAY,
                mean,
                BASE_STD_MS_DELAY,
                std,
                MEAN_STD_REVERSION_RATE,
                MEAN_STD_VOLATILITY,
            );
        }

        let mut map = self.delay_map.borrow_mut();
        if map.is_empty() {
            return;
        }
        map.retain(|kind, delay| {
            *delay = delay.saturating_sub(1);
            if *delay == 0 {
                Self::log_failure("delayed key up", self.emitter.send_key_up(*kind));
                false
            } else {
                true
            }
        });
    }

    fn send_key(&self, kind: KeyKind) {
        debug!(target: "input", "press {kind:?}");
        match self.track_input_delay(kind) {
            Some(true) => Self::log_failure("key down", self.emitter.send_key_down(kind)),
            Some(false) => Self::log_failure("key press", self.emitter.send_key(kind)),
            None => (),
        }
    }

    fn send_key_down(&self, kind: KeyKind) {
        debug!(target: "input", "hold {kind:?}");
        self.held.borrow_mut().insert(kind);
        Self::log_failure("key down", self.emitter.send_key_down(kind));
    }

    fn send_key_up(&self, kind: KeyKind) {
        debug!(target: "input", "release {kind:?}");
        self.held.borrow_mut().remove(&kind);
        if !self.delay_map.borrow().contains_key(&kind) {
            Self::log_failure("key up", self.emitter.send_key_up(kind));
        }
    }

    fn is_key_cleared(&self, kind: KeyKind) -> bool {
        !self.delay_map.borrow().contains_key(&kind)
    }

    fn send_mouse(&self, x: u32, y: u32, kind: MouseKind) {
        debug!(target: "input", "mouse {kind:?} at ({x}, {y})");
        Self::log_failure("mouse", self.emitter.send_mouse(x as i32, y as i32, kind));
    }

    fn send_text(&self, text: &str) {
        debug!(target: "input", "text {text:?}");
        Self::log_failure("text", self.emitter.send_text(text));
    }

    fn release_all(&self) {
        let held = self.held.borrow_mut().drain().collect::<Vec<_>>();
        for kind in held {
            Self::log_failure("key up", self.emitter.send_key_up(kind));
        }
    }

    fn all_keys_cleared(&self) -> bool {
        self.delay_map.borrow().is_empty() && self.held.borrow().is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// An [`Emitter`] recording every stroke as text.
    #[derive(Debug, Default, Clone)]
    pub(crate) struct RecordingEmitter {
        strokes: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingEmitter {
        pub(crate) fn strokes(&self) -> Vec<String> {
            self.strokes.lock().unwrap().clone()
        }

        fn record(&self, stroke: String) -> Result<()> {
            self.strokes.lock().unwrap().push(stroke);
            Ok(())
        }
    }

    impl Emitter for RecordingEmitter {
        fn send_key_down(&self, kind: KeyKind) -> Result<()> {
            self.record(format!("down {kind:?}"))
        }

        fn send_key_up(&self, kind: KeyKind) -> Result<()> {
            self.record(format!("up {kind:?}"))
        }

        fn send_mouse(&self, x: i32, y: i32, kind: MouseKind) -> Result<()> {
            self.record(format!("mouse {kind:?} {x} {y}"))
        }

        fn send_text(&self, text: &str) -> Result<()> {
            self.record(format!("text {text}"))
        }
    }

    #[test]
    fn send_key_delays_up_stroke() {
        let emitter = RecordingEmitter::default();
        let mut input = DefaultInput::new(emitter.clone(), Rng::new([3; 32]));

        input.send_key(KeyKind::A);
        input.send_key(KeyKind::A);
        assert_eq!(emitter.strokes(), vec!["down A"]);
        assert!(!input.all_keys_cleared());
        assert!(!input.is_key_cleared(KeyKind::A));
        assert!(input.is_key_cleared(KeyKind::B));

        for tick in 1..=10 {
            input.update(tick);
        }
        assert_eq!(emitter.strokes(), vec!["down A", "up A"]);
        assert!(input.all_keys_cleared());
    }

    #[test]
    fn release_all_releases_held_keys() {
        let emitter = RecordingEmitter::default();
        let input = DefaultInput::new(emitter.clone(), Rng::new([3; 32]));

        input.send_key_down(KeyKind::W);
        input.send_mouse(10, 20, MouseKind::Click);
        input.release_all();

        assert_eq!(
            emitter.strokes(),
            vec!["down W", "mouse Click 10 20", "up W"]
        );
        assert!(input.all_keys_cleared());
    }
}
