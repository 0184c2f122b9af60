use std::time::Duration;

use log::debug;
use tokio::time::Instant;

use super::{AvoidReason, Farming, FarmingEntity, attacking::start_attack, cancel_key};
use crate::{ecs::Resources, snapshot::Snapshot, transition, transition_if};

#[derive(Clone, Copy, Debug)]
pub struct VerifyTarget {
    started: Instant,
}

impl VerifyTarget {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

/// Updates [`Farming::EnemyFound`].
///
/// Waits for the selection to settle before verifying it.
pub fn update_enemy_found_state(resources: &Resources, farming: &mut FarmingEntity) {
    let Farming::EnemyFound(clicked) = farming.state else {
        panic!("state is not enemy found")
    };

    transition_if!(
        farming,
        Farming::VerifyTarget(VerifyTarget::new()),
        clicked.elapsed() >= Duration::from_millis(resources.settings.farming.settle_millis)
    );
}

/// Updates [`Farming::VerifyTarget`].
pub fn update_verify_target_state(
    resources: &Resources,
    farming: &mut FarmingEntity,
    snapshot: &Snapshot,
) {
    let Farming::VerifyTarget(verify) = farming.state else {
        panic!("state is not verify target")
    };
    let settings = &resources.settings;
    let target = snapshot.target;

    transition_if!(farming, Farming::SearchingForEnemy, target.is_npc(), {
        debug!(target: "farming", "clicked a non-mob");
        resources.input.send_key(cancel_key(resources));
        farming
            .context
            .avoid_target(AvoidReason::FailedSelection, &settings.avoidance);
    });

    if target.is_mover() && target.is_alive() && snapshot.marker.is_some() {
        transition_if!(
            farming,
            Farming::SearchingForEnemy,
            target.hp < 100 && farming.context.engaged == 0,
            {
                debug!(target: "farming", "mob already engaged at {}% HP", target.hp);
                resources.input.send_key(cancel_key(resources));
                farming
                    .context
                    .avoid_target(AvoidReason::Engaged, &settings.avoidance);
            }
        );
        transition!(farming, start_attack(&mut farming.context, snapshot));
    }

    transition_if!(
        farming,
        Farming::SearchingForEnemy,
        verify.started.elapsed() >= Duration::from_millis(settings.farming.verify_timeout_millis),
        {
            debug!(target: "farming", "selection failed");
            if target.is_alive() {
                resources.input.send_key(cancel_key(resources));
            }
            farming
                .context
                .avoid_target(AvoidReason::FailedSelection, &settings.avoidance);
        }
    );
}
