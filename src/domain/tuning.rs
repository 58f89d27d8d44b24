// Gameplay tuning for the VIP mode. Runtime/server constants live in `frameworks::config`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VipSelection {
    /// Uniform over all candidates.
    Random,
    /// Uniform over the best `top_players_pool_size` candidates.
    TopPlayers,
}

/// When a VIP leaves or switches away, how soon the old team gets a replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepartureReassignment {
    Immediate,
    Delayed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerIcon {
    Skull,
    Triangle,
    Flag,
    Crosshair,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiTuning {
    pub enable_hud: bool,
}

impl Default for UiTuning {
    fn default() -> Self {
        Self { enable_hud: true }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarkerTuning {
    pub enable_3d_icons: bool,
    pub enable_minimap_spotting: bool,
    pub enable_enemy_icons: bool,
    pub vertical_offset_meters: f32,
    pub ping_interval_ms: u64,
    pub ping_duration_seconds: f32,
    pub enemy_icon: MarkerIcon,
    pub friendly_icon: MarkerIcon,
    pub enemy_color_rgb: [f32; 3],
    pub friendly_color_rgb: [f32; 3],
}

impl Default for MarkerTuning {
    fn default() -> Self {
        Self {
            enable_3d_icons: true,
            enable_minimap_spotting: true,
            enable_enemy_icons: true,
            vertical_offset_meters: 3.0,
            ping_interval_ms: 1000,
            ping_duration_seconds: 1.5,
            enemy_icon: MarkerIcon::Skull,
            friendly_icon: MarkerIcon::Triangle,
            enemy_color_rgb: [1.0, 0.0, 0.0],
            friendly_color_rgb: [0.0, 1.0, 0.0],
        }
    }
}

impl MarkerTuning {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn ping_duration(&self) -> Duration {
        seconds(self.ping_duration_seconds)
    }
}

/// Match rules, loaded once per process.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VipFiestaConfig {
    pub target_vip_kills: u32,
    pub time_limit_minutes: u32,
    pub vip_reassign_delay_seconds: f32,
    pub show_intro_on_deploy: bool,
    pub on_time_limit_announce_winner: bool,
    pub stop_counting_after_win: bool,
    pub vip_selection: VipSelection,
    pub top_players_pool_size: usize,
    pub departure_reassignment: DepartureReassignment,
    pub ui: UiTuning,
    pub markers: MarkerTuning,
}

impl Default for VipFiestaConfig {
    fn default() -> Self {
        Self {
            target_vip_kills: 3,
            time_limit_minutes: 3,
            vip_reassign_delay_seconds: 5.0,
            show_intro_on_deploy: true,
            on_time_limit_announce_winner: true,
            stop_counting_after_win: true,
            vip_selection: VipSelection::Random,
            top_players_pool_size: 3,
            departure_reassignment: DepartureReassignment::Immediate,
            ui: UiTuning::default(),
            markers: MarkerTuning::default(),
        }
    }
}

/// Non-negative seconds that fit a `Duration`; anything else maps to zero.
fn seconds(value: f32) -> Duration {
    if value < 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f32(value).unwrap_or_default()
}

fn is_valid_seconds(value: f32) -> bool {
    value >= 0.0 && Duration::try_from_secs_f32(value).is_ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TuningError {
    ZeroTargetKills,
    ZeroPoolSize,
    InvalidDelay,
    ZeroPingInterval,
    InvalidPingDuration,
}

impl fmt::Display for TuningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            TuningError::ZeroTargetKills => "target_vip_kills must be at least 1",
            TuningError::ZeroPoolSize => "top_players_pool_size must be at least 1",
            TuningError::InvalidDelay => {
                "vip_reassign_delay_seconds must be a non-negative, representable duration"
            }
            TuningError::ZeroPingInterval => "markers.ping_interval_ms must be at least 1",
            TuningError::InvalidPingDuration => {
                "markers.ping_duration_seconds must be a non-negative, representable duration"
            }
        };
        f.write_str(msg)
    }
}

impl VipFiestaConfig {
    pub fn validate(&self) -> Result<(), TuningError> {
        if self.target_vip_kills == 0 {
            return Err(TuningError::ZeroTargetKills);
        }
        if self.top_players_pool_size == 0 {
            return Err(TuningError::ZeroPoolSize);
        }
        if !is_valid_seconds(self.vip_reassign_delay_seconds) {
            return Err(TuningError::InvalidDelay);
        }
        if self.markers.ping_interval_ms == 0 {
            return Err(TuningError::ZeroPingInterval);
        }
        if !is_valid_seconds(self.markers.ping_duration_seconds) {
            return Err(TuningError::InvalidPingDuration);
        }
        Ok(())
    }

    pub fn reassign_delay(&self) -> Duration {
        seconds(self.vip_reassign_delay_seconds)
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(u64::from(self.time_limit_minutes) * 60)
    }

    /// Match is frozen once won when the rules stop counting after a win.
    pub fn scoring_frozen(&self, ended: bool) -> bool {
        ended && self.stop_counting_after_win
    }
}
