use std::time::Duration;

use log::debug;
use tokio::time::Instant;

use super::{Farming, FarmingEntity, Step};
use crate::{
    SlotKind,
    bridge::{KEY_REPEAT_MILLIS, KeyKind},
    ecs::Resources,
    transition, transition_if,
};

#[derive(Clone, Copy, Debug)]
pub struct AfterEnemyKill {
    entered: Instant,
}

impl AfterEnemyKill {
    pub fn new() -> Self {
        Self {
            entered: Instant::now(),
        }
    }
}

/// Updates [`Farming::AfterEnemyKill`].
///
/// Loots once the drop had time to appear. A pet slot loots by itself, otherwise the pick slot
/// or the pick key is pressed repeatedly.
pub fn update_after_enemy_kill_state(resources: &Resources, farming: &mut FarmingEntity) {
    let Farming::AfterEnemyKill(after_kill) = farming.state else {
        panic!("state is not after enemy kill")
    };
    let settings = &resources.settings;
    let config = &settings.farming;
    let input = resources.input.as_ref();
    let context = &mut farming.context;

    transition_if!(
        after_kill.entered.elapsed() < Duration::from_millis(config.defeat_interval_millis)
    );

    if context
        .scheduler
        .use_usable_slot(input, &settings.slots, SlotKind::Pet, 0)
    {
        debug!(target: "farming", "looting with pet");
        transition!(farming, Farming::SearchingForEnemy);
    }

    let pick = settings
        .slots
        .iter()
        .find(|slot| slot.enabled && slot.kind == SlotKind::Pick)
        .copied();
    let key = match pick {
        Some(slot) => {
            context.scheduler.use_slot(input, slot);
            KeyKind::digit(slot.index)
        }
        None => {
            let key = KeyKind::from(settings.keys.pick);
            input.send_key(key);
            Some(key)
        }
    };
    if let Some(key) = key {
        let interval = config.pickup_interval_millis.max(KEY_REPEAT_MILLIS);
        for _ in 1..config.pickup_presses {
            context
                .sequence
                .extend([Step::Wait(interval), Step::Key(key)]);
        }
    }
    transition!(farming, Farming::SearchingForEnemy);
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;
    use tokio::time::advance;

    use super::*;
    use crate::{
        Slot,
        bridge::MockInput,
        farming::tests::settings_without_slots,
    };

    fn after_kill() -> FarmingEntity {
        FarmingEntity {
            state: Farming::AfterEnemyKill(AfterEnemyKill::new()),
            ..FarmingEntity::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_drop_then_picks_with_key() {
        let mut input = MockInput::default();
        input.expect_send_key().with(eq(KeyKind::Z)).times(10).return_const(());
        let resources = Resources::with_settings(Some(input), None, settings_without_slots());
        let mut farming = after_kill();

        update_after_enemy_kill_state(&resources, &mut farming);
        assert!(matches!(farming.state, Farming::AfterEnemyKill(_)));
        advance(Duration::from_millis(1000)).await;
        update_after_enemy_kill_state(&resources, &mut farming);
        assert!(matches!(farming.state, Farming::SearchingForEnemy));

        while farming.context.sequence.update(resources.input.as_ref()) {
            advance(Duration::from_millis(100)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn pet_loots_without_presses() {
        let mut input = MockInput::default();
        input.expect_send_key().with(eq(KeyKind::F1)).once().return_const(());
        input.expect_send_key().with(eq(KeyKind::Five)).once().return_const(());
        let mut settings = settings_without_slots();
        settings.slots = vec![
            Slot::new(0, 4, SlotKind::Pick),
            Slot::new(0, 5, SlotKind::Pet),
        ];
        let resources = Resources::with_settings(Some(input), None, settings);
        let mut farming = after_kill();

        advance(Duration::from_millis(1000)).await;
        update_after_enemy_kill_state(&resources, &mut farming);

        assert!(matches!(farming.state, Farming::SearchingForEnemy));
        assert!(!farming.context.sequence.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn pick_slot_is_pressed_repeatedly() {
        let mut input = MockInput::default();
        input.expect_send_key().with(eq(KeyKind::F1)).once().return_const(());
        input.expect_send_key().with(eq(KeyKind::Four)).times(3).return_const(());
        let mut settings = settings_without_slots();
        settings.slots = vec![Slot::new(0, 4, SlotKind::Pick)];
        settings.farming.pickup_presses = 3;
        let resources = Resources::with_settings(Some(input), None, settings);
        let mut farming = after_kill();

        advance(Duration::from_millis(1000)).await;
        update_after_enemy_kill_state(&resources, &mut farming);
        while farming.context.sequence.update(resources.input.as_ref()) {
            advance(Duration::from_millis(100)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn short_pickup_interval_spaces_presses_past_key_up_delay() {
        let mut input = MockInput::default();
        input.expect_send_key().with(eq(KeyKind::Z)).times(2).return_const(());
        let mut settings = settings_without_slots();
        settings.farming.pickup_presses = 2;
        settings.farming.pickup_interval_millis = 10;
        let resources = Resources::with_settings(Some(input), None, settings);
        let mut farming = after_kill();

        advance(Duration::from_millis(1000)).await;
        update_after_enemy_kill_state(&resources, &mut farming);
        assert!(farming.context.sequence.update(resources.input.as_ref()));
        advance(Duration::from_millis(100)).await;
        assert!(farming.context.sequence.update(resources.input.as_ref()));
        advance(Duration::from_millis(KEY_REPEAT_MILLIS - 100)).await;

        assert!(!farming.context.sequence.update(resources.input.as_ref()));
    }
}
