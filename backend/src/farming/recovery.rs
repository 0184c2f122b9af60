use std::time::Duration;

use log::info;
use tokio::time::Instant;

use super::{Farming, FarmingEntity, initializing::Initializing};
use crate::{
    bridge::KeyKind,
    ecs::Resources,
    snapshot::{AliveState, Snapshot},
    transition, transition_if,
};

/// Progress of the reconnect sequence.
#[derive(Clone, Copy, Default, Debug)]
pub struct Offline {
    confirms: u32,
    cleanups: u32,
    last: Option<Instant>,
}

/// Updates [`Farming::Dead`].
///
/// Leaves once the character is no longer observed dead, otherwise confirms the revive dialog
/// periodically.
pub fn update_dead_state(resources: &Resources, farming: &mut FarmingEntity, snapshot: &Snapshot) {
    let Farming::Dead(last) = farming.state else {
        panic!("state is not dead")
    };
    let interval = Duration::from_millis(resources.settings.farming.death_confirm_millis);

    transition_if!(
        farming,
        Farming::Initializing(Initializing::new()),
        snapshot.own.alive != AliveState::Dead,
        {
            info!(target: "farming", "character revived");
        }
    );
    transition_if!(last.is_some_and(|last| last.elapsed() < interval));

    resources
        .input
        .send_key(resources.settings.keys.confirm.into());
    transition!(farming, Farming::Dead(Some(Instant::now())));
}

/// Updates [`Farming::Offline`].
///
/// Presses the confirm key then the cleanup key the configured number of times each, one press
/// per interval, before starting over from [`Farming::Initializing`].
pub fn update_offline_state(resources: &Resources, farming: &mut FarmingEntity) {
    let Farming::Offline(mut offline) = farming.state else {
        panic!("state is not offline")
    };
    let config = &resources.settings.offline;

    let (key, interval) = if offline.confirms < config.confirm_count {
        (config.confirm_key, config.confirm_interval_millis)
    } else if offline.cleanups < config.cleanup_count {
        (config.cleanup_key, config.cleanup_interval_millis)
    } else {
        info!(target: "farming", "reconnect sequence finished");
        transition!(farming, Farming::Initializing(Initializing::new()));
    };
    transition_if!(
        offline
            .last
            .is_some_and(|last| last.elapsed() < Duration::from_millis(interval))
    );

    resources.input.send_key(KeyKind::from(key));
    if offline.confirms < config.confirm_count {
        offline.confirms += 1;
    } else {
        offline.cleanups += 1;
    }
    offline.last = Some(Instant::now());
    transition!(farming, Farming::Offline(offline));
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;
    use tokio::time::advance;

    use super::*;
    use crate::{
        bridge::MockInput,
        farming::tests::{settings_without_slots, snapshot},
    };

    #[tokio::test(start_paused = true)]
    async fn dead_confirms_periodically_until_revived() {
        let mut input = MockInput::default();
        input.expect_send_key().with(eq(KeyKind::Enter)).times(2).return_const(());
        let resources = Resources::with_settings(Some(input), None, settings_without_slots());
        let mut farming = FarmingEntity {
            state: Farming::Dead(None),
            ..FarmingEntity::default()
        };
        let dead = snapshot([0, 50, 50, 0, 0], vec![], false);

        update_dead_state(&resources, &mut farming, &dead);
        advance(Duration::from_millis(4000)).await;
        update_dead_state(&resources, &mut farming, &dead);
        advance(Duration::from_millis(1000)).await;
        update_dead_state(&resources, &mut farming, &dead);
        assert!(matches!(farming.state, Farming::Dead(Some(_))));

        update_dead_state(&resources, &mut farming, &snapshot([100, 50, 50, 0, 0], vec![], false));
        assert!(matches!(farming.state, Farming::Initializing(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn offline_presses_confirm_then_cleanup() {
        let mut input = MockInput::default();
        input.expect_send_key().with(eq(KeyKind::Enter)).times(2).return_const(());
        input.expect_send_key().with(eq(KeyKind::Esc)).times(1).return_const(());
        let mut settings = settings_without_slots();
        settings.offline.confirm_count = 2;
        settings.offline.cleanup_count = 1;
        let resources = Resources::with_settings(Some(input), None, settings);
        let mut farming = FarmingEntity {
            state: Farming::Offline(Offline::default()),
            ..FarmingEntity::default()
        };

        update_offline_state(&resources, &mut farming);
        // Too early for the next press
        update_offline_state(&resources, &mut farming);
        for _ in 0..2 {
            advance(Duration::from_millis(1000)).await;
            update_offline_state(&resources, &mut farming);
        }
        assert!(matches!(farming.state, Farming::Offline(_)));
        update_offline_state(&resources, &mut farming);

        assert!(matches!(farming.state, Farming::Initializing(_)));
    }
}
