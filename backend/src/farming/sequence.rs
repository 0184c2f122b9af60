use std::{collections::VecDeque, time::Duration};

use tokio::time::Instant;

use crate::{
    bridge::{Input, KeyKind, MouseKind},
    geometry::Point,
};

/// A single simulated input or pause.
#[derive(Clone, PartialEq, Debug)]
pub enum Step {
    KeyDown(KeyKind),
    KeyUp(KeyKind),
    Key(KeyKind),
    Text(String),
    Click(Point),
    Wait(u64),
}

/// A multi-step input sequence that always runs to completion.
///
/// Steps are executed in order across ticks, only [`Step::Wait`] spans ticks. While a sequence
/// is pending, no stage logic is evaluated.
#[derive(Debug, Default)]
pub struct Sequence {
    steps: VecDeque<Step>,
    wait_until: Option<Instant>,
}

impl Sequence {
    pub fn push(&mut self, step: Step) -> &mut Self {
        self.steps.push_back(step);
        self
    }

    pub fn extend(&mut self, steps: impl IntoIterator<Item = Step>) -> &mut Self {
        self.steps.extend(steps);
        self
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        !self.steps.is_empty() || self.wait_until.is_some()
    }

    /// Executes steps until a wait is in progress or the sequence is empty.
    ///
    /// Returns `true` if the sequence is still pending afterward.
    pub fn update(&mut self, input: &dyn Input) -> bool {
        loop {
            if let Some(until) = self.wait_until {
                if Instant::now() < until {
                    return true;
                }
                self.wait_until = None;
            }

            let Some(step) = self.steps.pop_front() else {
                return false;
            };
            match step {
                Step::KeyDown(key) => input.send_key_down(key),
                Step::KeyUp(key) => input.send_key_up(key),
                Step::Key(key) => input.send_key(key),
                Step::Text(text) => input.send_text(&text),
                Step::Click(point) => input.send_mouse(point.x, point.y, MouseKind::Click),
                Step::Wait(millis) => {
                    self.wait_until = Some(Instant::now() + Duration::from_millis(millis));
                }
            }
        }
    }
}
