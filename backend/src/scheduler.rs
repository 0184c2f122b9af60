use std::{collections::HashMap, time::Duration};

use log::debug;
use tokio::time::Instant;

use crate::{
    Slot, SlotKind,
    bridge::{Input, KeyKind},
};

/// Cooldown applied to a slot that has none configured.
const DEFAULT_SLOT_COOLDOWN_MILLIS: u64 = 100;

/// Decides which ability or item binding fires next.
///
/// The binding table itself is read-only here. Only last-used timestamps are owned and they
/// expire lazily when queried.
#[derive(Debug, Default)]
pub struct Scheduler {
    slot_cooldowns: HashMap<(usize, usize), Instant>,
    kind_cooldowns: HashMap<SlotKind, Instant>,
    current_page: Option<usize>,
}

impl Scheduler {
    /// Picks the enabled `kind` slot with the strictly lowest threshold whose cooldown elapsed
    /// and whose threshold is satisfied by `current`, then starts its cooldown.
    ///
    /// Slots without threshold rank after every slot with one. Ties keep declaration order.
    pub fn get_usable_slot(
        &mut self,
        slots: &[Slot],
        kind: SlotKind,
        current: u32,
    ) -> Option<Slot> {
        if !self.is_kind_ready(kind) {
            return None;
        }

        let mut best = None::<Slot>;
        for slot in self.candidates(slots, kind, current) {
            let better = match best {
                None => true,
                Some(best) => rank(&slot) < rank(&best),
            };
            if better {
                best = Some(slot);
            }
        }
        let slot = best?;
        self.record_use(&slot);
        Some(slot)
    }

    /// Returns every enabled `kind` slot that is off cooldown and satisfied by `current`, starting
    /// the cooldown of each.
    pub fn get_all_usable(&mut self, slots: &[Slot], kind: SlotKind, current: u32) -> Vec<Slot> {
        if !self.is_kind_ready(kind) {
            return vec![];
        }

        let usable = self.candidates(slots, kind, current);
        for slot in &usable {
            self.record_use(slot);
        }
        usable
    }

    /// Whether any enabled slot of `kind` exists regardless of cooldown.
    pub fn has_slot(slots: &[Slot], kind: SlotKind) -> bool {
        slots.iter().any(|slot| slot.enabled && slot.kind == kind)
    }

    /// Presses `slot`, switching to its page first when needed.
    pub fn use_slot(&mut self, input: &dyn Input, slot: Slot) {
        if self.current_page != Some(slot.page) {
            if let Some(key) = KeyKind::function(slot.page) {
                input.send_key(key);
                self.current_page = Some(slot.page);
            }
        }
        if let Some(key) = KeyKind::digit(slot.index) {
            debug!(target: "scheduler", "using {} slot {}:{}", slot.kind, slot.page, slot.index);
            input.send_key(key);
        }
    }

    /// Same as [`Self::get_usable_slot`] followed by [`Self::use_slot`].
    ///
    /// Returns whether a slot was used.
    pub fn use_usable_slot(
        &mut self,
        input: &dyn Input,
        slots: &[Slot],
        kind: SlotKind,
        current: u32,
    ) -> bool {
        match self.get_usable_slot(slots, kind, current) {
            Some(slot) => {
                self.use_slot(input, slot);
                true
            }
            None => false,
        }
    }

    fn candidates(&mut self, slots: &[Slot], kind: SlotKind, current: u32) -> Vec<Slot> {
        slots
            .iter()
            .filter(|slot| slot.enabled && slot.kind == kind)
            .filter(|slot| slot.is_threshold_satisfied(current))
            .copied()
            .filter(|slot| self.is_slot_ready(slot))
            .collect()
    }

    fn is_slot_ready(&mut self, slot: &Slot) -> bool {
        let cooldown = slot
            .cooldown_millis
            .unwrap_or(DEFAULT_SLOT_COOLDOWN_MILLIS);
        expire(&mut self.slot_cooldowns, slot.key(), cooldown)
    }

    fn is_kind_ready(&mut self, kind: SlotKind) -> bool {
        match kind.shared_cooldown_millis() {
            Some(cooldown) => expire(&mut self.kind_cooldowns, kind, cooldown),
            None => true,
        }
    }

    fn record_use(&mut self, slot: &Slot) {
        let now = Instant::now();
        self.slot_cooldowns.insert(slot.key(), now);
        if slot.kind.shared_cooldown_millis().is_some() {
            self.kind_cooldowns.insert(slot.kind, now);
        }
    }
}

/// Removes the entry of `key` once `cooldown_millis` has elapsed since it was recorded.
///
/// Returns `true` when there is no active cooldown.
fn expire<K: Eq + std::hash::Hash>(
    map: &mut HashMap<K, Instant>,
    key: K,
    cooldown_millis: u64,
) -> bool {
    match map.get(&key) {
        Some(used) if used.elapsed() < Duration::from_millis(cooldown_millis) => false,
        Some(_) => {
            map.remove(&key);
            true
        }
        None => true,
    }
}

#[inline]
fn rank(slot: &Slot) -> u64 {
    slot.threshold.map(u64::from).unwrap_or(u64::MAX)
}
