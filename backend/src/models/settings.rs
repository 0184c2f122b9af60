use serde::{Deserialize, Serialize};

use super::{DetectionConfig, KeyBinding, KeyBindings, Slot, deserialize_with_ok_or_default};
use crate::impl_identifiable;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(skip_serializing, default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default = "super::slots::slots_default")]
    pub slots: Vec<Slot>,
    #[serde(default)]
    pub keys: KeyBindings,
    #[serde(default)]
    pub farming: FarmingSettings,
    #[serde(default)]
    pub avoidance: AvoidanceSettings,
    #[serde(default)]
    pub offline: OfflineSettings,
    #[serde(default)]
    pub shout: ShoutSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            id: None,
            detection: DetectionConfig::default(),
            slots: super::slots::slots_default(),
            keys: KeyBindings::default(),
            farming: FarmingSettings::default(),
            avoidance: AvoidanceSettings::default(),
            offline: OfflineSettings::default(),
            shout: ShoutSettings::default(),
        }
    }
}

impl_identifiable!(Settings);

/// Timings and limits of the farming cycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FarmingSettings {
    /// Interval between resource panel checks while initializing.
    pub panel_check_millis: u64,
    /// The panel key is pressed once every this many failed panel checks.
    pub panel_retry_limit: u32,
    /// Delay after clicking a mob before its selection is verified.
    pub settle_millis: u64,
    /// Time allowed for a click to produce a live selection.
    pub verify_timeout_millis: u64,
    /// Visible mob count above which the camera is raised once.
    pub careful_mobs_count: usize,
    /// Own HP percentage below which passive and violet mobs are left alone.
    pub attack_min_hp: u32,
    /// Own HP percentage below which the character escapes.
    pub escape_hp: u32,
    /// Time without target HP decrease before obstacle avoidance starts.
    pub obstacle_threshold_millis: u64,
    pub obstacle_avoid_count: u32,
    /// Avoidance attempts when the target was never hit.
    pub never_hit_avoid_count: u32,
    /// Wait after each avoidance attempt.
    pub obstacle_cooldown_millis: u64,
    pub attack_max_time_secs: u64,
    /// Consecutive ticks without a live target before the attack is dropped.
    pub target_lost_limit: u32,
    /// Maximum number of mobs pulled before one of them dies.
    pub max_concurrent_targets: u32,
    /// Selection marker distance in pixels below which area attacks are used.
    pub area_attack_distance: u32,
    /// Wait after a kill before looting.
    pub defeat_interval_millis: u64,
    pub pickup_presses: u32,
    pub pickup_interval_millis: u64,
    /// Time spent running away while escaping.
    pub escape_run_secs: u64,
    /// Time spent resting after running away before dismounting.
    pub escape_mount_wait_secs: u64,
    /// Time without a kill before the client is assumed disconnected.
    pub watchdog_secs: u64,
    pub death_confirm_millis: u64,
}

impl Default for FarmingSettings {
    fn default() -> Self {
        Self {
            panel_check_millis: 1000,
            panel_retry_limit: 2,
            settle_millis: 150,
            verify_timeout_millis: 1500,
            careful_mobs_count: 7,
            attack_min_hp: 70,
            escape_hp: 10,
            obstacle_threshold_millis: 10000,
            obstacle_avoid_count: 5,
            never_hit_avoid_count: 2,
            obstacle_cooldown_millis: 1000,
            attack_max_time_secs: 300,
            target_lost_limit: 5,
            max_concurrent_targets: 1,
            area_attack_distance: 75,
            defeat_interval_millis: 1000,
            pickup_presses: 10,
            pickup_interval_millis: 300,
            escape_run_secs: 10,
            escape_mount_wait_secs: 20,
            watchdog_secs: 600,
            death_confirm_millis: 5000,
        }
    }
}

/// How long bounds stay excluded from selection for each reason.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvoidanceSettings {
    pub killed_millis: u64,
    pub engaged_millis: u64,
    pub failed_selection_millis: u64,
    pub unreachable_millis: u64,
    /// Padding added around avoided bounds to absorb small camera movements.
    pub grow_px: u32,
}

impl Default for AvoidanceSettings {
    fn default() -> Self {
        Self {
            killed_millis: 5000,
            engaged_millis: 10000,
            failed_selection_millis: 3000,
            unreachable_millis: 5000,
            grow_px: 20,
        }
    }
}

/// The reconnect sequence run after a suspected disconnection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfflineSettings {
    #[serde(deserialize_with = "deserialize_with_ok_or_default")]
    pub confirm_key: KeyBinding,
    pub confirm_count: u32,
    pub confirm_interval_millis: u64,
    #[serde(deserialize_with = "deserialize_with_ok_or_default")]
    pub cleanup_key: KeyBinding,
    pub cleanup_count: u32,
    pub cleanup_interval_millis: u64,
}

impl Default for OfflineSettings {
    fn default() -> Self {
        Self {
            confirm_key: KeyBinding::Enter,
            confirm_count: 30,
            confirm_interval_millis: 1000,
            cleanup_key: KeyBinding::Esc,
            cleanup_count: 10,
            cleanup_interval_millis: 1000,
        }
    }
}

/// Periodic chat messages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShoutSettings {
    pub enabled: bool,
    pub messages: Vec<String>,
    pub interval_millis: u64,
}

impl Default for ShoutSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            messages: vec![],
            interval_millis: 30000,
        }
    }
}
