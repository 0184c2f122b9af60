use strum::Display;

use crate::{
    DetectionConfig,
    bar::{BarKind, Bars},
    bridge::Input,
    detect::{Detector, MobKind, Target, TargetKind},
    geometry::Point,
};

/// Alive tri-state of the own character.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Display)]
pub enum AliveState {
    /// The resource panel is not visible so nothing is known.
    #[default]
    TrayClosed,
    Alive,
    Dead,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct OwnStatus {
    pub hp: u32,
    pub mp: u32,
    pub fp: u32,
    pub alive: AliveState,
}

/// Status of the currently selected entity.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct TargetStatus {
    pub hp: u32,
    pub mp: u32,
}

impl TargetStatus {
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Whether the selection looks like a non-combat entity with full HP and no MP.
    #[inline]
    pub fn is_npc(&self) -> bool {
        self.hp == 100 && self.mp == 0
    }

    /// Whether the selection is a mob, which always shows an MP bar.
    #[inline]
    pub fn is_mover(&self) -> bool {
        self.mp > 0
    }
}

/// One tick's aggregated observation.
#[derive(Clone, PartialEq, Default, Debug)]
pub struct Snapshot {
    pub own: OwnStatus,
    pub target: TargetStatus,
    pub marker: Option<Target>,
    /// Distance in pixels between the marker and the screen center.
    pub marker_distance: Option<f32>,
    /// Mobs ordered by [`MobKind`] priority.
    pub mobs: Vec<Target>,
    pub screen: (u32, u32),
}

impl Snapshot {
    /// Runs every detector on the current frame.
    ///
    /// `bars` keeps state across ticks and may press the panel key through `input`.
    pub fn capture(
        detector: &dyn Detector,
        bars: &mut Bars,
        config: &DetectionConfig,
        input: &dyn Input,
    ) -> Snapshot {
        bars.update(detector, config, input);
        let mobs = detector.detect_mobs(&config.mob);
        let marker = detector.detect_marker(&config.marker);

        Snapshot::from_parts(bars, mobs, marker, detector.size())
    }

    pub fn from_parts(
        bars: &Bars,
        mobs: Vec<Target>,
        marker: Option<Target>,
        screen: (u32, u32),
    ) -> Snapshot {
        let own_closed = bars.is_own_panel_closed()
            || [BarKind::SelfHp, BarKind::SelfMp, BarKind::SelfFp]
                .into_iter()
                .all(|kind| bars.info(kind).width() == 0);
        // A sliver of HP rounds to 0% but is still alive
        let hp_empty = bars.info(BarKind::SelfHp).width() == 0;
        let alive = match (own_closed, hp_empty) {
            (true, _) => AliveState::TrayClosed,
            (false, true) => AliveState::Dead,
            (false, false) => AliveState::Alive,
        };
        let center = Point::new(screen.0 / 2, screen.1 / 2);
        let marker_distance = marker.map(|marker| marker.bounds.center().distance(center));

        Snapshot {
            own: OwnStatus {
                hp: bars.percentage(BarKind::SelfHp),
                mp: bars.percentage(BarKind::SelfMp),
                fp: bars.percentage(BarKind::SelfFp),
                alive,
            },
            target: TargetStatus {
                hp: bars.percentage(BarKind::TargetHp),
                mp: bars.percentage(BarKind::TargetMp),
            },
            marker,
            marker_distance,
            mobs,
            screen,
        }
    }

    #[inline]
    pub fn screen_center(&self) -> Point {
        Point::new(self.screen.0 / 2, self.screen.1 / 2)
    }

    pub fn mobs_of(&self, kind: MobKind) -> impl Iterator<Item = &Target> {
        self.mobs
            .iter()
            .filter(move |mob| mob.kind == TargetKind::Mob(kind))
    }
}
