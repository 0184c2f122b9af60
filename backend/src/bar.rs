use log::info;
use strum::{Display, EnumCount, EnumIter, IntoEnumIterator};

use crate::{
    BarDetection, DetectionConfig,
    bridge::{Input, KeyKind},
    detect::Detector,
};

/// Consecutive all-zero readings after which a group's panel is considered closed.
const CLOSED_PANEL_TICKS: u32 = 5;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, EnumIter, EnumCount)]
pub enum BarKind {
    SelfHp,
    SelfMp,
    SelfFp,
    TargetHp,
    TargetMp,
}

impl BarKind {
    fn detection(self, config: &DetectionConfig) -> &BarDetection {
        match self {
            BarKind::SelfHp => &config.self_hp,
            BarKind::SelfMp => &config.self_mp,
            BarKind::SelfFp => &config.self_fp,
            BarKind::TargetHp => &config.target_hp,
            BarKind::TargetMp => &config.target_mp,
        }
    }
}

/// One resource bar's detection state.
///
/// The percentage is relative to the widest reading ever observed so the bar adapts to maximum
/// resource changes without knowing the actual maximum.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct BarInfo {
    width: u32,
    max_width: u32,
}

impl BarInfo {
    /// Records a new `width` reading.
    pub fn update(&mut self, width: u32) {
        self.width = width;
        self.max_width = self.max_width.max(width);
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[cfg(test)]
    pub fn max_width(&self) -> u32 {
        self.max_width
    }

    /// Current width as a rounded percentage of the maximum width in `[0, 100]`.
    pub fn percentage(&self) -> u32 {
        if self.max_width == 0 {
            return 0;
        }
        let percentage = (self.width as f32 * 100.0 / self.max_width as f32).round() as u32;
        percentage.min(100)
    }
}

/// A group of bars shown together in one panel.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct BarGroup {
    bars: &'static [BarKind],
    toggle_key: Option<KeyKind>,
    zero_count: u32,
    closed: bool,
}

impl BarGroup {
    fn new(bars: &'static [BarKind], toggle_key: Option<KeyKind>) -> Self {
        Self {
            bars,
            toggle_key,
            zero_count: 0,
            closed: false,
        }
    }

    /// Updates the closed state from whether every bar of this group read zero.
    ///
    /// Returns the toggle key to press when the panel is inferred closed.
    fn update(&mut self, all_zero: bool) -> Option<KeyKind> {
        if !all_zero {
            self.zero_count = 0;
            self.closed = false;
            return None;
        }

        self.zero_count += 1;
        if self.zero_count < CLOSED_PANEL_TICKS {
            return None;
        }
        self.zero_count = 0;
        self.closed = true;
        self.toggle_key
    }
}

/// All bars with their panel groups.
#[derive(Debug)]
pub struct Bars {
    infos: [BarInfo; BarKind::COUNT],
    own: BarGroup,
    target: BarGroup,
}

impl Bars {
    /// Creates bars pressing `panel_key` when the own resource panel looks closed.
    pub fn new(panel_key: KeyKind) -> Self {
        Self {
            infos: [BarInfo::default(); BarKind::COUNT],
            own: BarGroup::new(
                &[BarKind::SelfHp, BarKind::SelfMp, BarKind::SelfFp],
                Some(panel_key),
            ),
            target: BarGroup::new(&[BarKind::TargetHp, BarKind::TargetMp], None),
        }
    }

    pub fn set_panel_key(&mut self, key: KeyKind) {
        self.own.toggle_key = Some(key);
    }

    #[inline]
    pub fn info(&self, kind: BarKind) -> BarInfo {
        self.infos[kind as usize]
    }

    #[inline]
    pub fn percentage(&self, kind: BarKind) -> u32 {
        self.info(kind).percentage()
    }

    /// Whether the own resource panel was inferred closed.
    #[inline]
    pub fn is_own_panel_closed(&self) -> bool {
        self.own.closed
    }

    #[cfg(test)]
    pub fn is_target_panel_closed(&self) -> bool {
        self.target.closed
    }

    /// Re-measures every bar from `detector` then updates panel stability.
    pub fn update(&mut self, detector: &dyn Detector, config: &DetectionConfig, input: &dyn Input) {
        for (info, kind) in self.infos.iter_mut().zip(BarKind::iter()) {
            let detection = kind.detection(config);
            let width = detector
                .detect_color_points(detection.region, &detection.colors, config.bar_tolerance)
                .width();
            info.update(width);
        }
        self.update_groups(input);
    }

    /// Same as [`Self::update`] but with already measured `widths` indexed by [`BarKind`].
    #[cfg(test)]
    pub fn update_widths(&mut self, widths: [u32; BarKind::COUNT], input: &dyn Input) {
        for (info, width) in self.infos.iter_mut().zip(widths) {
            info.update(width);
        }
        self.update_groups(input);
    }

    fn update_groups(&mut self, input: &dyn Input) {
        let infos = self.infos;
        let all_zero = |group: &BarGroup| {
            group
                .bars
                .iter()
                .all(|kind| infos[*kind as usize].width() == 0)
        };

        let own_zero = all_zero(&self.own);
        if let Some(key) = self.own.update(own_zero) {
            info!(target: "detect", "resource panel looks closed, toggling");
            input.send_key(key);
        }
        let target_zero = all_zero(&self.target);
        if let Some(key) = self.target.update(target_zero) {
            input.send_key(key);
        }
    }
}
