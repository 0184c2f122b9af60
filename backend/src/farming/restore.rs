use log::debug;

use super::FarmingContext;
use crate::{SlotKind, ecs::Resources, snapshot::OwnStatus};

/// Uses restore and buff slots for the observed own status.
///
/// HP restores are tried in order of food, pill then heal and at most one is used per tick.
/// Returns whether HP is below the escape threshold with nothing used to restore it.
pub fn update_restores(
    resources: &Resources,
    context: &mut FarmingContext,
    own: OwnStatus,
) -> bool {
    let settings = &resources.settings;
    let input = resources.input.as_ref();
    let scheduler = &mut context.scheduler;

    let mut restored = false;
    if own.hp < 100 {
        restored = [SlotKind::Food, SlotKind::Pill, SlotKind::Heal]
            .into_iter()
            .any(|kind| scheduler.use_usable_slot(input, &settings.slots, kind, own.hp));
    }
    if own.mp < 100 {
        scheduler.use_usable_slot(input, &settings.slots, SlotKind::MpRestore, own.mp);
    }
    if own.fp < 100 {
        scheduler.use_usable_slot(input, &settings.slots, SlotKind::FpRestore, own.fp);
    }
    for buff in scheduler.get_all_usable(&settings.slots, SlotKind::Buff, own.mp) {
        debug!(target: "farming", "buffing with slot {}:{}", buff.page, buff.index);
        scheduler.use_slot(input, buff);
    }

    !restored && own.hp < settings.farming.escape_hp
}
