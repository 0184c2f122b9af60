use std::time::Duration;

use log::{debug, info};
use tokio::time::Instant;

use super::{Farming, FarmingContext, FarmingEntity, Step, attacking::start_attack, cancel_key};
use crate::{
    bridge::{KeyKind, MouseKind},
    detect::{MobKind, Target},
    ecs::Resources,
    snapshot::Snapshot,
    transition,
};

/// Rotations made at each camera pitch before the pitch changes.
const ROTATIONS: std::ops::RangeInclusive<u64> = 7..=12;

/// Seconds of walking forward once every pitch was tried.
const FORWARD_SECS: std::ops::RangeInclusive<u64> = 20..=40;

/// Milliseconds of a random jump delay or strafe while walking.
const WALK_EXTRA_MILLIS: std::ops::RangeInclusive<u64> = 500..=2000;

/// Camera search progress while no mob is visible.
#[derive(Clone, Copy, Debug)]
pub struct SearchState {
    /// Remaining rotations at the current pitch.
    count: u32,
    /// Pitch pass, looking down in passes `1..=3` and up in `4..=6` before walking.
    pass: u32,
    /// Whether rotations go left instead of right.
    reverse: bool,
    pub(super) forward_until: Option<Instant>,
    /// Whether the camera was already raised because of a crowd.
    careful: bool,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            count: 0,
            pass: 1,
            reverse: false,
            forward_until: None,
            careful: false,
        }
    }
}

/// Updates [`Farming::SearchingForEnemy`].
pub fn update_searching_state(
    resources: &Resources,
    farming: &mut FarmingEntity,
    snapshot: &Snapshot,
) {
    let settings = &resources.settings;
    let context = &mut farming.context;

    // Something attacked first and is already selected
    if let Some(marker) = snapshot.marker
        && snapshot.target.is_alive()
        && !context.avoid.contains(marker.bounds.center())
    {
        if snapshot.target.is_npc() {
            debug!(target: "farming", "cancelling non-mob selection");
            resources.input.send_key(cancel_key(resources));
            return;
        }
        if snapshot.target.is_mover() {
            stop_forward(resources, context);
            context.target = Some(marker.bounds);
            transition!(farming, start_attack(context, snapshot));
        }
    }

    if !snapshot.mobs.is_empty() {
        if snapshot.mobs.len() > settings.farming.careful_mobs_count && !context.search.careful {
            info!(target: "farming", "{} mobs visible, raising camera", snapshot.mobs.len());
            resources.input.send_key(settings.keys.look_up.into());
            context.search.careful = true;
            return;
        }

        if let Some(mob) = select_mob(resources, context, snapshot) {
            stop_forward(resources, context);
            let point = mob.attack_point(settings.detection.mob.attack_offset);
            debug!(target: "farming", "clicking {} mob at {point:?}", mob.kind);
            resources
                .input
                .send_mouse(point.x, point.y, MouseKind::ClickVerified);
            context.target = Some(mob.bounds);
            transition!(farming, Farming::EnemyFound(Instant::now()));
        }
    }

    search_view(resources, context);
    if context
        .search
        .forward_until
        .is_some_and(|until| Instant::now() >= until)
    {
        stop_forward(resources, context);
        context.search.pass = 1;
    }
}

/// Picks the mob closest to the screen center from the highest priority category with an
/// eligible mob.
///
/// Mobs whose name plate center is avoided are skipped. Only aggressive mobs are eligible while
/// own HP is below the minimum attack HP.
fn select_mob(
    resources: &Resources,
    context: &mut FarmingContext,
    snapshot: &Snapshot,
) -> Option<Target> {
    let center = snapshot.screen_center();
    let offset = resources.settings.detection.mob.attack_offset;
    let low_hp = snapshot.own.hp < resources.settings.farming.attack_min_hp;

    for kind in [MobKind::Aggressive, MobKind::Passive, MobKind::Violet] {
        if low_hp && kind != MobKind::Aggressive {
            break;
        }
        let closest = snapshot
            .mobs_of(kind)
            .filter(|mob| !context.avoid.contains(mob.bounds.center()))
            .min_by(|a, b| {
                let a = a.attack_point(offset).distance(center);
                let b = b.attack_point(offset).distance(center);
                a.total_cmp(&b)
            })
            .copied();
        if closest.is_some() {
            return closest;
        }
    }
    None
}

/// Turns the camera around, then changes pitch, then walks forward.
fn search_view(resources: &Resources, context: &mut FarmingContext) {
    let keys = &resources.settings.keys;
    let search = &mut context.search;

    if search.count > 0 {
        let key = KeyKind::from(if search.reverse {
            keys.rotate_left
        } else {
            keys.rotate_right
        });
        // A press before the previous release is dropped by the input
        if resources.input.is_key_cleared(key) {
            resources.input.send_key(key);
            search.count -= 1;
        }
        return;
    }

    match search.pass {
        1..=3 => {
            resources.input.send_key(keys.look_down.into());
            search.count = resources.rng.random_range(ROTATIONS) as u32;
            search.pass += 1;
        }
        4..=6 => {
            resources.input.send_key(keys.look_up.into());
            search.count = resources.rng.random_range(ROTATIONS) as u32;
            search.pass += 1;
        }
        _ => start_forward(resources, context),
    }
}

fn start_forward(resources: &Resources, context: &mut FarmingContext) {
    let keys = &resources.settings.keys;
    let rng = &resources.rng;
    let secs = rng.random_range(FORWARD_SECS);
    info!(target: "farming", "no mob around, walking forward for {secs}s");

    resources.input.send_key_down(keys.forward.into());
    context.search.forward_until = Some(Instant::now() + Duration::from_secs(secs));
    if rng.random_bool(1.0 / 3.0) {
        context.sequence.extend([
            Step::Wait(rng.random_range(WALK_EXTRA_MILLIS)),
            Step::Key(keys.jump.into()),
        ]);
    }
    let strafe: Option<KeyKind> = match rng.random_range(0..=5) {
        1 => Some(keys.strafe_left.into()),
        2 => Some(keys.strafe_right.into()),
        _ => None,
    };
    if let Some(key) = strafe {
        context.sequence.extend([
            Step::KeyDown(key),
            Step::Wait(rng.random_range(WALK_EXTRA_MILLIS)),
            Step::KeyUp(key),
        ]);
    }

    let search = &mut context.search;
    search.pass = 1;
    search.reverse = !search.reverse;
    search.careful = false;
}

fn stop_forward(resources: &Resources, context: &mut FarmingContext) {
    if context.search.forward_until.take().is_some() {
        resources
            .input
            .send_key_up(resources.settings.keys.forward.into());
    }
}
