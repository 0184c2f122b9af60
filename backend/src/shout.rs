use std::time::Duration;

use log::info;
use tokio::time::Instant;

use crate::{
    bridge::{KEY_REPEAT_MILLIS, KeyKind},
    ecs::Resources,
    farming::{Farming, FarmingEntity, Step},
};

/// Periodic chat broadcast state.
#[derive(Debug)]
pub struct ShoutEntity {
    last: Instant,
    /// Index of the next message to send.
    index: usize,
}

impl Default for ShoutEntity {
    fn default() -> Self {
        Self {
            last: Instant::now(),
            index: 0,
        }
    }
}

/// Queues the next configured chat message onto the farming [`Sequence`](crate::farming::Sequence).
///
/// Messages are only sent while searching with no other input pending so a fight is never
/// interrupted by the chat box.
pub fn run_system(resources: &Resources, shout: &mut ShoutEntity, farming: &mut FarmingEntity) {
    let settings = &resources.settings.shout;
    if !settings.enabled || settings.messages.is_empty() {
        return;
    }
    if shout.last.elapsed() < Duration::from_millis(settings.interval_millis) {
        return;
    }
    if farming.context.sequence.is_pending() || !matches!(farming.state, Farming::SearchingForEnemy)
    {
        return;
    }

    let message = &settings.messages[shout.index % settings.messages.len()];
    info!(target: "shout", "shouting message {}", shout.index % settings.messages.len());
    farming.context.sequence.extend([
        Step::Key(KeyKind::Enter),
        Step::Wait(KEY_REPEAT_MILLIS),
        Step::Text(message.clone()),
        Step::Key(KeyKind::Enter),
        Step::Wait(KEY_REPEAT_MILLIS),
        Step::Key(KeyKind::Esc),
    ]);
    shout.index = (shout.index + 1) % settings.messages.len();
    shout.last = Instant::now();
}
