use std::time::Duration;

use log::debug;
use tokio::time::Instant;

use super::{Farming, FarmingEntity};
use crate::{ecs::Resources, snapshot::{AliveState, Snapshot}, transition, transition_if};

#[derive(Clone, Copy, Debug)]
pub struct Initializing {
    /// Panel checks that found the resource panel closed.
    failed: u32,
    last_check: Instant,
}

impl Initializing {
    pub fn new() -> Self {
        Self {
            failed: 0,
            last_check: Instant::now(),
        }
    }
}

/// Updates [`Farming::Initializing`].
///
/// Leaves as soon as the own resource panel is readable, pressing the panel key every few failed
/// checks otherwise.
pub fn update_initializing_state(
    resources: &Resources,
    farming: &mut FarmingEntity,
    snapshot: &Snapshot,
) {
    let Farming::Initializing(mut initializing) = farming.state else {
        panic!("state is not initializing")
    };
    let config = &resources.settings.farming;

    transition_if!(
        farming,
        Farming::SearchingForEnemy,
        snapshot.own.alive != AliveState::TrayClosed
    );
    transition_if!(
        initializing.last_check.elapsed() < Duration::from_millis(config.panel_check_millis)
    );

    initializing.failed += 1;
    initializing.last_check = Instant::now();
    if initializing.failed % config.panel_retry_limit.max(1) == 0 {
        debug!(
            target: "farming",
            "resource panel still closed after {} checks",
            initializing.failed
        );
        resources.input.send_key(resources.settings.keys.panel.into());
    }
    transition!(farming, Farming::Initializing(initializing));
}
