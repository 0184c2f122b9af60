use serde::{Deserialize, Serialize};

use crate::geometry::Bounds;

/// A reference color in RGB order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Where and how to look for one resource bar.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct BarDetection {
    pub region: Bounds,
    pub colors: Vec<Rgb>,
}

/// Tunables for name-plate detection of mobs.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct MobDetection {
    #[serde(default = "passive_color_default")]
    pub passive: Rgb,
    #[serde(default = "aggressive_color_default")]
    pub aggressive: Rgb,
    #[serde(default = "violet_color_default")]
    pub violet: Rgb,
    #[serde(default = "mob_tolerance_default")]
    pub tolerance: u8,
    /// Name plates must be strictly wider than this.
    #[serde(default = "min_width_default")]
    pub min_width: u32,
    /// Name plates must be strictly narrower than this.
    #[serde(default = "max_width_default")]
    pub max_width: u32,
    #[serde(default = "min_height_default")]
    pub min_height: u32,
    #[serde(default = "max_height_default")]
    pub max_height: u32,
    /// Height of the bottom UI band excluded from the search.
    #[serde(default = "bottom_band_default")]
    pub bottom_band: u32,
    /// Plates whose top-left corner falls inside this region overlap the own resource panel.
    #[serde(default = "ignore_region_default")]
    pub ignore_region: Bounds,
    #[serde(default = "kernel_size_default")]
    pub kernel_size: u32,
    #[serde(default = "morph_iterations_default")]
    pub close_iterations: u32,
    #[serde(default = "morph_iterations_default")]
    pub open_iterations: u32,
    /// Largest horizontal gap between pixels of one plate.
    #[serde(default = "cluster_gap_x_default")]
    pub cluster_gap_x: u32,
    /// Largest vertical gap between pixels of one plate.
    #[serde(default = "cluster_gap_y_default")]
    pub cluster_gap_y: u32,
    /// Vertical offset added below the plate to click on the body.
    #[serde(default = "attack_offset_default")]
    pub attack_offset: i32,
}

impl Default for MobDetection {
    fn default() -> Self {
        Self {
            passive: passive_color_default(),
            aggressive: aggressive_color_default(),
            violet: violet_color_default(),
            tolerance: mob_tolerance_default(),
            min_width: min_width_default(),
            max_width: max_width_default(),
            min_height: min_height_default(),
            max_height: max_height_default(),
            bottom_band: bottom_band_default(),
            ignore_region: ignore_region_default(),
            kernel_size: kernel_size_default(),
            close_iterations: morph_iterations_default(),
            open_iterations: morph_iterations_default(),
            cluster_gap_x: cluster_gap_x_default(),
            cluster_gap_y: cluster_gap_y_default(),
            attack_offset: attack_offset_default(),
        }
    }
}

/// Tunables for the selection marker drawn above the current target.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct MarkerDetection {
    /// Colors tried in order, the first one with enough matches wins.
    #[serde(default = "marker_colors_default")]
    pub colors: Vec<Rgb>,
    #[serde(default = "marker_tolerance_default")]
    pub tolerance: u8,
    #[serde(default = "marker_min_points_default")]
    pub min_points: usize,
}

impl Default for MarkerDetection {
    fn default() -> Self {
        Self {
            colors: marker_colors_default(),
            tolerance: marker_tolerance_default(),
            min_points: marker_min_points_default(),
        }
    }
}

/// Every detection tunable in one place.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct DetectionConfig {
    #[serde(default = "bar_tolerance_default")]
    pub bar_tolerance: u8,
    #[serde(default = "self_hp_default")]
    pub self_hp: BarDetection,
    #[serde(default = "self_mp_default")]
    pub self_mp: BarDetection,
    #[serde(default = "self_fp_default")]
    pub self_fp: BarDetection,
    #[serde(default = "target_hp_default")]
    pub target_hp: BarDetection,
    #[serde(default = "target_mp_default")]
    pub target_mp: BarDetection,
    #[serde(default)]
    pub mob: MobDetection,
    #[serde(default)]
    pub marker: MarkerDetection,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            bar_tolerance: bar_tolerance_default(),
            self_hp: self_hp_default(),
            self_mp: self_mp_default(),
            self_fp: self_fp_default(),
            target_hp: target_hp_default(),
            target_mp: target_mp_default(),
            mob: MobDetection::default(),
            marker: MarkerDetection::default(),
        }
    }
}

const SELF_BARS_REGION: Bounds = Bounds::new(105, 30, 120, 80);

fn hp_colors() -> Vec<Rgb> {
    vec![
        Rgb(174, 18, 55),
        Rgb(188, 24, 62),
        Rgb(204, 30, 70),
        Rgb(220, 36, 78),
    ]
}

fn mp_colors() -> Vec<Rgb> {
    vec![
        Rgb(20, 84, 196),
        Rgb(36, 132, 220),
        Rgb(44, 164, 228),
        Rgb(56, 188, 232),
    ]
}

fn fp_colors() -> Vec<Rgb> {
    vec![
        Rgb(45, 230, 29),
        Rgb(28, 172, 28),
        Rgb(44, 124, 52),
        Rgb(20, 146, 20),
    ]
}

fn bar_tolerance_default() -> u8 {
    2
}

fn self_hp_default() -> BarDetection {
    BarDetection {
        region: SELF_BARS_REGION,
        colors: hp_colors(),
    }
}

fn self_mp_default() -> BarDetection {
    BarDetection {
        region: SELF_BARS_REGION,
        colors: mp_colors(),
    }
}

fn self_fp_default() -> BarDetection {
    BarDetection {
        region: SELF_BARS_REGION,
        colors: fp_colors(),
    }
}

fn target_hp_default() -> BarDetection {
    BarDetection {
        region: Bounds::new(300, 30, 250, 30),
        colors: hp_colors(),
    }
}

fn target_mp_default() -> BarDetection {
    BarDetection {
        region: Bounds::new(300, 50, 250, 10),
        colors: mp_colors(),
    }
}

fn passive_color_default() -> Rgb {
    Rgb(234, 234, 149)
}

fn aggressive_color_default() -> Rgb {
    Rgb(179, 23, 23)
}

fn violet_color_default() -> Rgb {
    Rgb(182, 144, 146)
}

fn mob_tolerance_default() -> u8 {
    5
}

fn min_width_default() -> u32 {
    15
}

fn max_width_default() -> u32 {
    150
}

fn min_height_default() -> u32 {
    5
}

fn max_height_default() -> u32 {
    30
}

fn bottom_band_default() -> u32 {
    100
}

fn ignore_region_default() -> Bounds {
    Bounds::new(0, 0, 250, 110)
}

fn kernel_size_default() -> u32 {
    3
}

fn morph_iterations_default() -> u32 {
    1
}

fn cluster_gap_x_default() -> u32 {
    50
}

fn cluster_gap_y_default() -> u32 {
    3
}

fn attack_offset_default() -> i32 {
    15
}

fn marker_colors_default() -> Vec<Rgb> {
    vec![Rgb(131, 148, 205), Rgb(246, 90, 106)]
}

fn marker_tolerance_default() -> u8 {
    5
}

fn marker_min_points_default() -> usize {
    20
}
