//! Game settings and preferences
//!
//! Persisted separately from stats through the storage port.

use serde::{Deserialize, Serialize};

use crate::consts::{COLLAPSE_DURATION_MS, TICK_INTERVAL_MS};
use crate::persistence;
use crate::platform::KeyValueStore;
use crate::sim::Rules;

/// Win condition, applied on every path that ends a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinRule {
    /// Score must be strictly greater than this
    pub min_score: i64,
    /// Completed collapse cycles required
    pub min_collapses: u32,
}

impl Default for WinRule {
    fn default() -> Self {
        Self {
            min_score: 200,
            min_collapses: 3,
        }
    }
}

impl WinRule {
    pub fn is_win(&self, score: i64, collapse_count: u32) -> bool {
        score > self.min_score && collapse_count >= self.min_collapses
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Timing ===
    /// Cadence of the external timer driver (ms)
    pub tick_interval_ms: u32,
    /// Collapse lockout window (ms)
    pub collapse_duration_ms: u32,

    // === Rules ===
    pub win_rule: WinRule,

    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    pub muted: bool,

    // === Accessibility ===
    /// Reduced motion (no shake, rotation or drift hints)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_interval_ms: TICK_INTERVAL_MS,
            collapse_duration_ms: COLLAPSE_DURATION_MS,
            win_rule: WinRule::default(),
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Storage key
    pub const STORAGE_KEY: &'static str = "entropy_grid_settings";

    /// Simulation rules derived from these settings
    pub fn rules(&self) -> Rules {
        Rules {
            win_rule: self.win_rule,
            reduced_motion: self.reduced_motion,
        }
    }

    /// Tick interval in seconds, as passed to `timer_tick`
    pub fn tick_secs(&self) -> f32 {
        self.tick_interval_ms.max(1) as f32 / 1000.0
    }

    /// Effective volume (0 when muted)
    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            (self.master_volume * self.sfx_volume).clamp(0.0, 1.0)
        }
    }

    /// Clamp out-of-range values from hand-edited storage
    pub fn sanitized(mut self) -> Self {
        self.tick_interval_ms = self.tick_interval_ms.clamp(10, 1000);
        self.master_volume = self.master_volume.clamp(0.0, 1.0);
        self.sfx_volume = self.sfx_volume.clamp(0.0, 1.0);
        self
    }

    /// Load settings, falling back to defaults
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match persistence::load::<Settings>(store, Self::STORAGE_KEY) {
            Ok(Some(settings)) => {
                log::info!("Loaded settings");
                settings.sanitized()
            }
            Ok(None) => {
                log::info!("Using default settings");
                Self::default()
            }
            Err(e) => {
                log::warn!("Failed to load settings, using defaults: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) {
        match persistence::save(store, Self::STORAGE_KEY, self) {
            Ok(()) => log::info!("Settings saved"),
            Err(e) => log::warn!("Failed to save settings: {}", e),
        }
    }
}
