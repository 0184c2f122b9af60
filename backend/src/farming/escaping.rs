use std::time::Duration;

use log::info;
use tokio::time::Instant;

use super::{Farming, FarmingEntity, Step, cancel_key};
use crate::{
    Slot, SlotKind, bridge::KeyKind, ecs::Resources, transition, transition_if,
};

/// Milliseconds the camera turns away before running.
const TURN_MILLIS: u64 = 1000;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum EscapePhase {
    /// Deselects, turns around and mounts a board if one is bound.
    Turning,
    /// Holds forward away from the fight.
    Running,
    /// Stands still to regenerate.
    Resting,
}

/// Running away from a fight to recover HP.
#[derive(Clone, Copy, Debug)]
pub struct Escaping {
    phase: EscapePhase,
    since: Instant,
    /// The board slot mounted while turning.
    board: Option<Slot>,
}

impl Escaping {
    pub fn new() -> Self {
        Self {
            phase: EscapePhase::Turning,
            since: Instant::now(),
            board: None,
        }
    }
}

/// Updates [`Farming::Escaping`].
///
/// Running time starts when the turn is queued so it includes the turn itself.
pub fn update_escaping_state(resources: &Resources, farming: &mut FarmingEntity) {
    let Farming::Escaping(mut escaping) = farming.state else {
        panic!("state is not escaping")
    };
    let settings = &resources.settings;
    let keys = &settings.keys;
    let input = resources.input.as_ref();
    let context = &mut farming.context;

    match escaping.phase {
        EscapePhase::Turning => {
            input.send_key(cancel_key(resources));
            escaping.board = context
                .scheduler
                .get_usable_slot(&settings.slots, SlotKind::Board, 0);
            if let Some(board) = escaping.board {
                info!(target: "farming", "mounting board to escape");
                context.scheduler.use_slot(input, board);
            }
            let rotate = KeyKind::from(keys.rotate_left);
            context.sequence.extend([
                Step::KeyDown(rotate),
                Step::Wait(TURN_MILLIS),
                Step::KeyUp(rotate),
                Step::KeyDown(keys.forward.into()),
            ]);
            escaping.phase = EscapePhase::Running;
            escaping.since = Instant::now();
        }
        EscapePhase::Running => {
            transition_if!(
                farming,
                Farming::Escaping(escaping),
                escaping.since.elapsed() < Duration::from_secs(settings.farming.escape_run_secs)
            );
            input.send_key_up(keys.forward.into());
            escaping.phase = EscapePhase::Resting;
            escaping.since = Instant::now();
        }
        EscapePhase::Resting => {
            transition_if!(
                farming,
                Farming::Escaping(escaping),
                escaping.since.elapsed()
                    < Duration::from_secs(settings.farming.escape_mount_wait_secs)
            );
            if let Some(board) = escaping.board {
                info!(target: "farming", "dismounting board");
                context.scheduler.use_slot(input, board);
            }
            info!(target: "farming", "escape finished");
            transition!(farming, Farming::SearchingForEnemy);
        }
    }
    transition!(farming, Farming::Escaping(escaping));
}
