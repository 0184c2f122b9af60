use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// The kind of ability or item bound to a slot.
///
/// The numeric representation groups kinds by purpose: offense and support below `10`,
/// consumables from `11`, resource restores from `21` and looting from `31`.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[repr(u8)]
pub enum SlotKind {
    Attack = 1,
    Buff = 2,
    Heal = 3,
    Board = 5,
    AreaAttack = 6,
    Food = 11,
    Pill = 12,
    MpRestore = 21,
    FpRestore = 22,
    Pick = 31,
    Pet = 32,
}

/// How a slot's threshold is compared against the observed value.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ThresholdRule {
    /// Eligible while the value is at or above the threshold.
    AtLeast,
    /// Eligible once the value has dropped to or below the threshold.
    AtMost,
}

impl ThresholdRule {
    #[inline]
    pub fn is_satisfied(self, current: u32, threshold: u32) -> bool {
        match self {
            ThresholdRule::AtLeast => current >= threshold,
            ThresholdRule::AtMost => current <= threshold,
        }
    }
}

impl SlotKind {
    pub fn threshold_rule(self) -> ThresholdRule {
        match self {
            SlotKind::Heal
            | SlotKind::Food
            | SlotKind::Pill
            | SlotKind::MpRestore
            | SlotKind::FpRestore => ThresholdRule::AtMost,
            SlotKind::Attack
            | SlotKind::AreaAttack
            | SlotKind::Buff
            | SlotKind::Board
            | SlotKind::Pick
            | SlotKind::Pet => ThresholdRule::AtLeast,
        }
    }

    /// Cooldown in milliseconds shared by every slot of this kind.
    pub fn shared_cooldown_millis(self) -> Option<u64> {
        match self {
            SlotKind::Attack | SlotKind::AreaAttack => Some(300),
            SlotKind::Food => Some(2500),
            SlotKind::Pill => Some(10000),
            SlotKind::MpRestore | SlotKind::FpRestore => Some(1500),
            SlotKind::Buff
            | SlotKind::Heal
            | SlotKind::Board
            | SlotKind::Pick
            | SlotKind::Pet => None,
        }
    }
}

/// An ability or item binding at `(page, index)`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Slot {
    /// Zero-based bar page, switched with `F1` onward.
    pub page: usize,
    /// Zero-based slot on the page, pressed with the matching digit key.
    pub index: usize,
    pub kind: SlotKind,
    #[serde(default)]
    pub threshold: Option<u32>,
    #[serde(default)]
    pub cooldown_millis: Option<u64>,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

impl Slot {
    pub fn new(page: usize, index: usize, kind: SlotKind) -> Self {
        Self {
            page,
            index,
            kind,
            threshold: None,
            cooldown_millis: None,
            enabled: true,
        }
    }

    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_cooldown(mut self, millis: u64) -> Self {
        self.cooldown_millis = Some(millis);
        self
    }

    #[inline]
    pub fn key(&self) -> (usize, usize) {
        (self.page, self.index)
    }

    /// Whether `current` satisfies this slot's threshold.
    ///
    /// A slot without threshold is always eligible.
    pub fn is_threshold_satisfied(&self, current: u32) -> bool {
        self.threshold
            .is_none_or(|threshold| self.kind.threshold_rule().is_satisfied(current, threshold))
    }
}

fn enabled_default() -> bool {
    true
}

pub(crate) fn slots_default() -> Vec<Slot> {
    vec![
        Slot::new(0, 0, SlotKind::Attack),
        Slot::new(0, 1, SlotKind::Heal).with_threshold(50),
        Slot::new(0, 2, SlotKind::MpRestore).with_threshold(30),
        Slot::new(0, 3, SlotKind::FpRestore).with_threshold(30),
        Slot::new(0, 4, SlotKind::Pick),
    ]
}
