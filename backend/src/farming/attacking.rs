use std::time::Duration;

use log::{debug, info};
use tokio::time::Instant;

use super::{
    AvoidReason, Farming, FarmingContext, FarmingEntity, Step, after_kill::AfterEnemyKill,
    cancel_key,
};
use crate::{
    SlotKind, bridge::KeyKind, ecs::Resources, snapshot::Snapshot, transition, transition_if,
};

/// Target HP percentage below which a target counts as pulled when several are allowed.
const PULLED_HP: u32 = 90;

/// Fight progress of the selected target.
#[derive(Clone, Copy, Debug)]
pub struct Attacking {
    started: Instant,
    last_hp: u32,
    /// When the target HP last decreased or an obstacle avoidance attempt was made.
    last_hp_update: Instant,
    /// Obstacle avoidance attempts made.
    obstacle_count: u32,
    /// Consecutive ticks without the selection marker.
    lost_count: u32,
}

impl Attacking {
    pub fn new(hp: u32) -> Self {
        let now = Instant::now();
        Self {
            started: now,
            last_hp: hp,
            last_hp_update: now,
            obstacle_count: 0,
            lost_count: 0,
        }
    }
}

/// Starts fighting the current selection.
pub(super) fn start_attack(context: &mut FarmingContext, snapshot: &Snapshot) -> Farming {
    context.stats.start_attack();
    Farming::Attacking(Attacking::new(snapshot.target.hp))
}

/// Updates [`Farming::Attacking`].
pub fn update_attacking_state(
    resources: &Resources,
    farming: &mut FarmingEntity,
    snapshot: &Snapshot,
) {
    let Farming::Attacking(mut attacking) = farming.state else {
        panic!("state is not attacking")
    };
    let settings = &resources.settings;
    let config = &settings.farming;
    let target = snapshot.target;

    transition_if!(
        farming,
        Farming::AfterEnemyKill(AfterEnemyKill::new()),
        !target.is_alive(),
        {
            farming.context.record_kill(&settings.avoidance);
        }
    );

    if snapshot.marker.is_some() {
        attacking.lost_count = 0;
    } else {
        attacking.lost_count += 1;
    }
    transition_if!(
        farming,
        Farming::SearchingForEnemy,
        attacking.lost_count >= config.target_lost_limit,
        {
            info!(target: "farming", "target lost");
            resources.input.send_key(cancel_key(resources));
        }
    );
    transition_if!(farming, Farming::SearchingForEnemy, target.is_npc(), {
        info!(target: "farming", "selection is not a mob");
        resources.input.send_key(cancel_key(resources));
    });

    let now = Instant::now();
    if target.hp < attacking.last_hp {
        attacking.last_hp = target.hp;
        attacking.last_hp_update = now;
    }

    if now.duration_since(attacking.last_hp_update)
        >= Duration::from_millis(config.obstacle_threshold_millis)
    {
        let limit = if target.hp >= 100 {
            config.never_hit_avoid_count
        } else {
            config.obstacle_avoid_count
        };
        transition_if!(
            farming,
            Farming::SearchingForEnemy,
            attacking.obstacle_count >= limit,
            {
                info!(target: "farming", "target unreachable after {limit} attempts");
                resources.input.send_key(cancel_key(resources));
                farming
                    .context
                    .avoid_target(AvoidReason::Unreachable, &settings.avoidance);
            }
        );

        attacking.obstacle_count += 1;
        attacking.last_hp_update = now;
        debug!(
            target: "farming",
            "target HP frozen, avoiding obstacle attempt {}",
            attacking.obstacle_count
        );
        avoid_obstacle(resources, &mut farming.context, attacking.obstacle_count);
        transition!(farming, Farming::Attacking(attacking));
    }

    transition_if!(
        farming,
        Farming::SearchingForEnemy,
        attacking.started.elapsed() >= Duration::from_secs(config.attack_max_time_secs),
        {
            info!(target: "farming", "attack timed out");
            resources.input.send_key(cancel_key(resources));
            farming
                .context
                .avoid_target(AvoidReason::Unreachable, &settings.avoidance);
        }
    );

    let cap = config.max_concurrent_targets;
    transition_if!(
        farming,
        Farming::SearchingForEnemy,
        cap > 1 && farming.context.engaged + 1 < cap && target.hp < PULLED_HP,
        {
            farming.context.engaged += 1;
            debug!(target: "farming", "pulled target, {} engaged", farming.context.engaged + 1);
            resources.input.send_key(cancel_key(resources));
        }
    );

    let close = snapshot
        .marker_distance
        .is_some_and(|distance| distance < config.area_attack_distance as f32);
    let scheduler = &mut farming.context.scheduler;
    let input = resources.input.as_ref();
    let used_area = close
        && scheduler.use_usable_slot(input, &settings.slots, SlotKind::AreaAttack, snapshot.own.hp);
    if !used_area {
        scheduler.use_usable_slot(input, &settings.slots, SlotKind::Attack, snapshot.own.hp);
    }
    transition!(farming, Farming::Attacking(attacking));
}

/// Queues one strafe and jump while walking forward.
///
/// Odd attempts strafe left and even attempts strafe right.
fn avoid_obstacle(resources: &Resources, context: &mut FarmingContext, attempt: u32) {
    let keys = &resources.settings.keys;
    let forward = KeyKind::from(keys.forward);
    let jump = KeyKind::from(keys.jump);
    let strafe = KeyKind::from(if attempt % 2 == 1 {
        keys.strafe_left
    } else {
        keys.strafe_right
    });

    context.sequence.extend([
        Step::KeyDown(forward),
        Step::KeyDown(jump),
        Step::KeyDown(strafe),
        Step::Wait(200),
        Step::KeyUp(strafe),
        Step::Wait(600),
        Step::KeyUp(jump),
        Step::KeyUp(forward),
        Step::Wait(resources.settings.farming.obstacle_cooldown_millis),
    ]);
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;
    use tokio::time::advance;

    use super::*;
    use crate::{
        Slot,
        bridge::MockInput,
        farming::tests::{permissive_input, settings_without_slots, snapshot},
        geometry::Bounds,
    };

    fn attacking(hp: u32) -> FarmingEntity {
        FarmingEntity {
            state: Farming::Attacking(Attacking::new(hp)),
            ..FarmingEntity::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn uses_attack_slot_while_target_alive() {
        let mut input = MockInput::default();
        input.expect_send_key().with(eq(KeyKind::F1)).once().return_const(());
        input.expect_send_key().with(eq(KeyKind::Zero)).once().return_const(());
        let mut settings = settings_without_slots();
        settings.slots = vec![Slot::new(0, 0, SlotKind::Attack)];
        let resources = Resources::with_settings(Some(input), None, settings);
        let mut farming = attacking(100);

        let first = snapshot([90, 90, 90, 70, 50], vec![], true);
        let second = snapshot([90, 90, 90, 60, 50], vec![], true);
        update_attacking_state(&resources, &mut farming, &first);
        // Attack shared cooldown
        update_attacking_state(&resources, &mut farming, &second);

        assert!(farming.state.is_attacking());
    }

    #[tokio::test(start_paused = true)]
    async fn area_attack_only_when_marker_close() {
        let mut input = MockInput::default();
        input.expect_send_key().with(eq(KeyKind::F1)).once().return_const(());
        input.expect_send_key().with(eq(KeyKind::Five)).once().return_const(());
        input.expect_send_key().with(eq(KeyKind::Zero)).once().return_const(());
        let mut settings = settings_without_slots();
        settings.slots = vec![
            Slot::new(0, 0, SlotKind::Attack),
            Slot::new(0, 5, SlotKind::AreaAttack),
        ];
        let resources = Resources::with_settings(Some(input), None, settings);
        let mut farming = attacking(100);

        let close = snapshot([90, 90, 90, 70, 50], vec![], true);
        update_attacking_state(&resources, &mut farming, &close);
        let mut far = snapshot([90, 90, 90, 60, 50], vec![], true);
        far.marker_distance = Some(200.0);
        update_attacking_state(&resources, &mut farming, &far);

        assert!(farming.state.is_attacking());
    }

    #[tokio::test(start_paused = true)]
    async fn never_hit_target_gives_up_sooner() {
        let resources = Resources::with_settings(
            Some(permissive_input()),
            None,
            settings_without_slots(),
        );
        let mut farming = attacking(100);
        farming.context.target = Some(Bounds::new(300, 200, 40, 10));
        let full = snapshot([90, 90, 90, 100, 50], vec![], true);

        for _ in 0..2 {
            advance(Duration::from_millis(10000)).await;
            update_attacking_state(&resources, &mut farming, &full);
            assert!(farming.state.is_attacking());
        }
        advance(Duration::from_millis(10000)).await;
        update_attacking_state(&resources, &mut farming, &full);

        assert!(matches!(farming.state, Farming::SearchingForEnemy));
        assert_eq!(farming.context.avoid.count(AvoidReason::Unreachable), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn lost_marker_drops_target() {
        let resources = Resources::with_settings(
            Some(permissive_input()),
            None,
            settings_without_slots(),
        );
        let mut farming = attacking(80);
        let lost = snapshot([90, 90, 90, 80, 50], vec![], false);

        for _ in 0..resources.settings.farming.target_lost_limit - 1 {
            update_attacking_state(&resources, &mut farming, &lost);
            assert!(farming.state.is_attacking());
        }
        update_attacking_state(&resources, &mut farming, &lost);

        assert!(matches!(farming.state, Farming::SearchingForEnemy));
    }

    #[tokio::test(start_paused = true)]
    async fn attack_timeout_abandons_target() {
        let resources = Resources::with_settings(
            Some(permissive_input()),
            None,
            settings_without_slots(),
        );
        let mut farming = attacking(100);
        farming.context.target = Some(Bounds::new(300, 200, 40, 10));

        // Keep HP decreasing so obstacle avoidance never starts
        let mut hp = 99;
        for _ in 0..30 {
            advance(Duration::from_secs(9)).await;
            let hit = snapshot([90, 90, 90, hp, 50], vec![], true);
            update_attacking_state(&resources, &mut farming, &hit);
            hp -= 1;
        }
        assert!(farming.state.is_attacking());
        advance(Duration::from_secs(30)).await;
        let hit = snapshot([90, 90, 90, hp, 50], vec![], true);
        update_attacking_state(&resources, &mut farming, &hit);

        assert!(matches!(farming.state, Farming::SearchingForEnemy));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_cap_releases_pulled_target() {
        let mut settings = settings_without_slots();
        settings.farming.max_concurrent_targets = 3;
        let resources = Resources::with_settings(Some(permissive_input()), None, settings);
        let pulled = snapshot([90, 90, 90, 85, 50], vec![], true);

        let mut farming = attacking(100);
        update_attacking_state(&resources, &mut farming, &pulled);
        assert!(matches!(farming.state, Farming::SearchingForEnemy));
        assert_eq!(farming.context.engaged, 1);
        assert_eq!(farming.context.avoid.count(AvoidReason::Unreachable), 0);

        farming.state = Farming::Attacking(Attacking::new(100));
        update_attacking_state(&resources, &mut farming, &pulled);
        assert!(matches!(farming.state, Farming::SearchingForEnemy));
        assert_eq!(farming.context.engaged, 2);

        // Cap reached so the third target is fought to the end
        farming.state = Farming::Attacking(Attacking::new(100));
        update_attacking_state(&resources, &mut farming, &pulled);
        assert!(farming.state.is_attacking());
    }
}
