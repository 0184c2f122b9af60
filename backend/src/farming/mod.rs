use std::{mem::discriminant, time::Duration};

use after_kill::{AfterEnemyKill, update_after_enemy_kill_state};
use attacking::{Attacking, update_attacking_state};
use escaping::{Escaping, update_escaping_state};
use initializing::{Initializing, update_initializing_state};
use log::{info, warn};
use recovery::{Offline, update_dead_state, update_offline_state};
use restore::update_restores;
use searching::{SearchState, update_searching_state};
use strum::Display;
use tokio::time::Instant;
use verify::{VerifyTarget, update_enemy_found_state, update_verify_target_state};

use crate::{
    AvoidanceSettings,
    bridge::KeyKind,
    ecs::Resources,
    geometry::Bounds,
    scheduler::Scheduler,
    snapshot::{AliveState, Snapshot},
    transition_if,
};

mod after_kill;
mod attacking;
mod avoid;
mod escaping;
mod initializing;
mod recovery;
mod restore;
mod searching;
mod sequence;
mod stats;
mod verify;

pub use {
    avoid::{AvoidList, AvoidReason},
    sequence::{Sequence, Step},
    stats::Statistics,
};

/// Consecutive tray-closed ticks after which an active stage falls back to initializing.
const TRAY_CLOSED_TICKS: u32 = 5;

#[derive(Debug)]
pub struct FarmingEntity {
    pub state: Farming,
    pub context: FarmingContext,
}

impl Default for FarmingEntity {
    fn default() -> Self {
        Self {
            state: Farming::Initializing(Initializing::new()),
            context: FarmingContext::default(),
        }
    }
}

impl FarmingEntity {
    /// Restarts the cycle from [`Farming::Initializing`] after the bot was halted.
    ///
    /// Statistics and avoided areas are kept.
    pub fn resume(&mut self) {
        self.state = Farming::Initializing(Initializing::new());
        self.context.sequence = Sequence::default();
        self.context.search = SearchState::default();
        self.context.target = None;
        self.context.engaged = 0;
        self.context.tray_closed_ticks = 0;
        self.context.watchdog = Instant::now();
    }
}

/// The farming cycle stages.
///
/// Every variant carrying an [`Instant`] stores when it was entered so its timeouts re-arm on
/// each transition.
#[derive(Clone, Copy, Debug, Display)]
pub enum Farming {
    /// Waits for the own resource panel to become visible.
    Initializing(Initializing),
    /// Looks for a mob to click, turning the camera and walking when none is visible.
    SearchingForEnemy,
    /// A mob was clicked, waiting for the selection to settle.
    EnemyFound(Instant),
    /// Checks that the click selected a live mob.
    VerifyTarget(VerifyTarget),
    /// Fights the selected mob.
    Attacking(Attacking),
    /// Waits for the drop then loots.
    AfterEnemyKill(AfterEnemyKill),
    /// Runs away to recover HP.
    Escaping(Escaping),
    /// Confirms the death dialog periodically, storing the last confirmation.
    Dead(Option<Instant>),
    /// Runs the reconnect sequence.
    Offline(Offline),
}

impl Farming {
    /// Whether restores and low HP escape apply in this stage.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Farming::SearchingForEnemy
                | Farming::EnemyFound(_)
                | Farming::VerifyTarget(_)
                | Farming::Attacking(_)
                | Farming::AfterEnemyKill(_)
                | Farming::Escaping(_)
        )
    }

    #[inline]
    pub fn is_attacking(&self) -> bool {
        matches!(self, Farming::Attacking(_))
    }
}

/// State persisted across ticks and stages.
#[derive(Debug)]
pub struct FarmingContext {
    pub scheduler: Scheduler,
    /// The pending multi-step input.
    pub sequence: Sequence,
    pub avoid: AvoidList,
    pub stats: Statistics,
    search: SearchState,
    /// Bounds of the mob currently selected or last clicked.
    target: Option<Bounds>,
    /// Mobs released alive to pull further ones before any dies.
    engaged: u32,
    /// Last kill or recovery, whichever is later.
    watchdog: Instant,
    tray_closed_ticks: u32,
}

impl Default for FarmingContext {
    fn default() -> Self {
        Self {
            scheduler: Scheduler::default(),
            sequence: Sequence::default(),
            avoid: AvoidList::default(),
            stats: Statistics::default(),
            search: SearchState::default(),
            target: None,
            engaged: 0,
            watchdog: Instant::now(),
            tray_closed_ticks: 0,
        }
    }
}

impl FarmingContext {
    /// Excludes the current target's bounds from selection for `reason`.
    fn avoid_target(&mut self, reason: AvoidReason, settings: &AvoidanceSettings) {
        if let Some(bounds) = self.target {
            self.avoid.add(bounds, reason, settings);
        }
    }

    fn record_kill(&mut self, settings: &AvoidanceSettings) {
        self.avoid_target(AvoidReason::Killed, settings);
        self.stats.record_kill();
        self.engaged = 0;
        self.target = None;
        self.watchdog = Instant::now();
        info!(target: "farming", "killed mob, total {}", self.stats.kills());
    }
}

/// Runs one controller tick over `snapshot`.
///
/// A pending [`Sequence`] is advanced first and no stage logic runs until it completes.
pub fn run_system(resources: &Resources, farming: &mut FarmingEntity, snapshot: &Snapshot) {
    if farming.context.sequence.update(resources.input.as_ref()) {
        return;
    }

    let previous = farming.state;
    update_state(resources, farming, snapshot);
    if discriminant(&previous) != discriminant(&farming.state) {
        info!(target: "farming", "{previous} -> {}", farming.state);
        if matches!(previous, Farming::Dead(_) | Farming::Offline(_))
            && matches!(farming.state, Farming::Initializing(_))
        {
            farming.context.watchdog = Instant::now();
        }
    }
}

fn update_state(resources: &Resources, farming: &mut FarmingEntity, snapshot: &Snapshot) {
    let settings = &resources.settings;

    transition_if!(
        farming,
        Farming::Dead(None),
        snapshot.own.alive == AliveState::Dead
            && !matches!(farming.state, Farming::Dead(_) | Farming::Offline(_)),
        {
            warn!(target: "farming", "character died");
            release_held(resources, &mut farming.context);
        }
    );
    transition_if!(
        farming,
        Farming::Offline(Offline::default()),
        !matches!(farming.state, Farming::Offline(_))
            && farming.context.watchdog.elapsed()
                >= Duration::from_secs(settings.farming.watchdog_secs),
        {
            warn!(
                target: "farming",
                "no kill for {}s, assuming disconnected",
                settings.farming.watchdog_secs
            );
            release_held(resources, &mut farming.context);
        }
    );

    if farming.state.is_active() && snapshot.own.alive == AliveState::TrayClosed {
        farming.context.tray_closed_ticks += 1;
    } else {
        farming.context.tray_closed_ticks = 0;
    }
    transition_if!(
        farming,
        Farming::Initializing(Initializing::new()),
        farming.context.tray_closed_ticks >= TRAY_CLOSED_TICKS,
        {
            farming.context.tray_closed_ticks = 0;
            release_held(resources, &mut farming.context);
        }
    );

    if farming.state.is_active() && snapshot.own.alive == AliveState::Alive {
        let escape = update_restores(resources, &mut farming.context, snapshot.own);
        transition_if!(
            farming,
            Farming::Escaping(Escaping::new()),
            escape && !matches!(farming.state, Farming::Escaping(_)),
            {
                warn!(target: "farming", "HP {}% too low, escaping", snapshot.own.hp);
                release_held(resources, &mut farming.context);
            }
        );
    }

    match farming.state {
        Farming::Initializing(_) => update_initializing_state(resources, farming, snapshot),
        Farming::SearchingForEnemy => update_searching_state(resources, farming, snapshot),
        Farming::EnemyFound(_) => update_enemy_found_state(resources, farming),
        Farming::VerifyTarget(_) => update_verify_target_state(resources, farming, snapshot),
        Farming::Attacking(_) => update_attacking_state(resources, farming, snapshot),
        Farming::AfterEnemyKill(_) => update_after_enemy_kill_state(resources, farming),
        Farming::Escaping(_) => update_escaping_state(resources, farming),
        Farming::Dead(_) => update_dead_state(resources, farming, snapshot),
        Farming::Offline(_) => update_offline_state(resources, farming),
    }
}

/// Releases every held key and forgets the walking state.
fn release_held(resources: &Resources, context: &mut FarmingContext) {
    resources.input.release_all();
    context.search.forward_until = None;
    context.target = None;
}

#[inline]
fn cancel_key(resources: &Resources) -> KeyKind {
    resources.settings.keys.cancel.into()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockall::predicate::eq;
    use tokio::time::advance;

    use super::*;
    use crate::{
        Settings, Slot, SlotKind,
        bar::Bars,
        bridge::MockInput,
        detect::{MobKind, Target, TargetKind},
    };

    /// Input accepting every call.
    pub(super) fn permissive_input() -> MockInput {
        let mut input = MockInput::default();
        input.expect_send_key().return_const(());
        input.expect_send_key_down().return_const(());
        input.expect_send_key_up().return_const(());
        input.expect_send_mouse().return_const(());
        input.expect_send_text().return_const(());
        input.expect_release_all().return_const(());
        input.expect_all_keys_cleared().return_const(true);
        input.expect_is_key_cleared().return_const(true);
        input
    }

    /// Settings without slots so restores never fire.
    pub(super) fn settings_without_slots() -> Settings {
        Settings {
            slots: vec![],
            ..Settings::default()
        }
    }

    /// Builds a snapshot from bar widths indexed as own HP, MP, FP then target HP, MP.
    pub(super) fn snapshot(widths: [u32; 5], mobs: Vec<Target>, marker: bool) -> Snapshot {
        let mut bars = Bars::new(KeyKind::T);
        let input = MockInput::default();
        bars.update_widths([100; 5], &input);
        bars.update_widths(widths, &input);
        let marker = marker.then_some(Target {
            kind: TargetKind::SelectionMarker,
            bounds: Bounds::new(395, 280, 10, 6),
        });
        Snapshot::from_parts(&bars, mobs, marker, (800, 600))
    }

    pub(super) fn mob(kind: MobKind, x: u32, y: u32) -> Target {
        Target {
            kind: TargetKind::Mob(kind),
            bounds: Bounds::new(x, y, 40, 10),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn attacking_target_hp_zero_goes_to_after_enemy_kill() {
        let resources = Resources::with_settings(
            Some(permissive_input()),
            None,
            settings_without_slots(),
        );
        let mut farming = FarmingEntity {
            state: Farming::Attacking(Attacking::new(60)),
            ..FarmingEntity::default()
        };

        run_system(&resources, &mut farming, &snapshot([90, 90, 90, 0, 0], vec![], true));

        assert!(matches!(farming.state, Farming::AfterEnemyKill(_)));
        assert_eq!(farming.context.stats.kills(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dead_from_any_active_stage() {
        let resources = Resources::with_settings(
            Some(permissive_input()),
            None,
            settings_without_slots(),
        );
        let mut farming = FarmingEntity {
            state: Farming::SearchingForEnemy,
            ..FarmingEntity::default()
        };

        run_system(&resources, &mut farming, &snapshot([0, 50, 50, 0, 0], vec![], false));

        assert!(matches!(farming.state, Farming::Dead(None)));
    }

    #[tokio::test(start_paused = true)]
    async fn tray_closed_falls_back_to_initializing() {
        let resources = Resources::with_settings(
            Some(permissive_input()),
            None,
            settings_without_slots(),
        );
        let mut farming = FarmingEntity {
            state: Farming::EnemyFound(Instant::now()),
            ..FarmingEntity::default()
        };
        let closed = snapshot([0, 0, 0, 0, 0], vec![], false);

        for _ in 0..TRAY_CLOSED_TICKS - 1 {
            run_system(&resources, &mut farming, &closed);
            assert!(!matches!(farming.state, Farming::Initializing(_)));
            farming.state = Farming::EnemyFound(Instant::now());
        }
        run_system(&resources, &mut farming, &closed);

        assert!(matches!(farming.state, Farming::Initializing(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn low_hp_without_restore_escapes() {
        let resources = Resources::with_settings(
            Some(permissive_input()),
            None,
            settings_without_slots(),
        );
        let mut farming = FarmingEntity {
            state: Farming::Attacking(Attacking::new(80)),
            ..FarmingEntity::default()
        };

        run_system(&resources, &mut farming, &snapshot([5, 50, 50, 80, 50], vec![], true));

        assert!(matches!(farming.state, Farming::Escaping(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn low_hp_with_food_restores_instead_of_escaping() {
        let mut input = MockInput::default();
        input.expect_send_key().with(eq(KeyKind::F1)).once().return_const(());
        input.expect_send_key().with(eq(KeyKind::Two)).once().return_const(());
        input.expect_send_key().return_const(());
        input.expect_send_mouse().return_const(());
        let settings = Settings {
            slots: vec![Slot::new(0, 2, SlotKind::Food).with_threshold(60)],
            ..Settings::default()
        };
        let resources = Resources::with_settings(Some(input), None, settings);
        let mut farming = FarmingEntity {
            state: Farming::Attacking(Attacking::new(80)),
            ..FarmingEntity::default()
        };

        run_system(&resources, &mut farming, &snapshot([5, 50, 50, 80, 50], vec![], true));

        assert!(farming.state.is_attacking());
    }

    #[tokio::test(start_paused = true)]
    async fn frozen_target_hp_strafes_then_avoids_target() {
        let mut settings = settings_without_slots();
        settings.farming.obstacle_threshold_millis = 10000;
        settings.farming.obstacle_avoid_count = 5;
        settings.avoidance.unreachable_millis = 5000;
        let mut input = MockInput::default();
        input.expect_send_key().return_const(());
        input.expect_send_mouse().return_const(());
        // Each attempt holds then releases forward, jump and one strafe key
        input.expect_send_key_down().times(5 * 3).return_const(());
        input.expect_send_key_up().times(5 * 3).return_const(());
        let resources = Resources::with_settings(Some(input), None, settings);
        let mut farming = FarmingEntity {
            state: Farming::Attacking(Attacking::new(80)),
            ..FarmingEntity::default()
        };
        farming.context.target = Some(Bounds::new(380, 250, 40, 10));
        let frozen = snapshot([90, 90, 90, 80, 50], vec![], true);

        let mut attempts = 0;
        for _ in 0..2000 {
            run_system(&resources, &mut farming, &frozen);
            farming.context.watchdog = Instant::now();
            if !farming.state.is_attacking() {
                break;
            }
            if farming.context.sequence.is_pending() {
                attempts += 1;
                while farming.context.sequence.update(resources.input.as_ref()) {
                    advance(Duration::from_millis(100)).await;
                }
            }
            advance(Duration::from_millis(100)).await;
        }

        assert_eq!(attempts, 5);
        assert!(matches!(farming.state, Farming::SearchingForEnemy));
        assert_eq!(farming.context.avoid.count(AvoidReason::Unreachable), 1);
        advance(Duration::from_millis(5000)).await;
        assert_eq!(farming.context.avoid.count(AvoidReason::Unreachable), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn watchdog_goes_offline_then_reconnects_to_initializing() {
        let mut input = MockInput::default();
        input.expect_release_all().return_const(());
        input
            .expect_send_key()
            .with(eq(KeyKind::Enter))
            .times(30)
            .return_const(());
        input
            .expect_send_key()
            .with(eq(KeyKind::Esc))
            .times(10)
            .return_const(());
        input.expect_send_key().return_const(());
        input.expect_send_key_down().return_const(());
        input.expect_send_key_up().return_const(());
        let resources = Resources::with_settings(Some(input), None, settings_without_slots());
        let mut farming = FarmingEntity {
            state: Farming::SearchingForEnemy,
            ..FarmingEntity::default()
        };
        let idle = snapshot([90, 90, 90, 0, 0], vec![], false);

        advance(Duration::from_secs(600)).await;
        run_system(&resources, &mut farming, &idle);
        assert!(matches!(farming.state, Farming::Offline(_)));

        for _ in 0..60 {
            run_system(&resources, &mut farming, &idle);
            if matches!(farming.state, Farming::Initializing(_)) {
                break;
            }
            advance(Duration::from_secs(1)).await;
        }

        assert!(matches!(farming.state, Farming::Initializing(_)));
        assert!(farming.context.watchdog.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn searching_clicks_closest_aggressive_mob() {
        let mut input = MockInput::default();
        input
            .expect_send_mouse()
            .withf(|x, y, kind| {
                *x == 420 && *y == 325 && *kind == crate::bridge::MouseKind::ClickVerified
            })
            .once()
            .return_const(());
        let resources = Resources::with_settings(Some(input), None, settings_without_slots());
        let mut farming = FarmingEntity {
            state: Farming::SearchingForEnemy,
            ..FarmingEntity::default()
        };
        let mobs = vec![
            mob(MobKind::Aggressive, 0, 0),
            mob(MobKind::Aggressive, 400, 300),
            mob(MobKind::Passive, 390, 290),
        ];

        run_system(&resources, &mut farming, &snapshot([90, 90, 90, 0, 0], mobs, false));

        assert!(matches!(farming.state, Farming::EnemyFound(_)));
    }
}
