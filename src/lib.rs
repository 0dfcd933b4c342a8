//! Entropy Grid - A reactive tile game whose rules keep changing
//!
//! Core modules:
//! - `sim`: Deterministic simulation (phases, scoring, state transitions)
//! - `session`: End-of-game behaviour summary
//! - `stats`: Aggregate stats across games
//! - `game`: Driver that owns the current state and the injected ports
//! - `platform`: Browser/native platform abstraction (storage, clock)
//! - `persistence`: Versioned JSON save/load
//! - `audio`: Audio cue port

pub mod audio;
pub mod game;
pub mod persistence;
pub mod platform;
pub mod session;
pub mod settings;
pub mod sim;
pub mod stats;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use game::Game;
pub use session::{BehaviorMetrics, GameSession, summarize};
pub use settings::{Settings, WinRule};
pub use stats::GameStats;

/// Game configuration constants
pub mod consts {
    /// Grid is 4x4
    pub const GRID_SIZE: usize = 16;

    /// Meter bounds (entropy and sanity)
    pub const METER_MIN: f32 = 0.0;
    pub const METER_MAX: f32 = 100.0;
    pub const STARTING_SANITY: f32 = 100.0;

    /// Entropy gained per click before phase bonus
    pub const ENTROPY_BASE_GAIN: f32 = 2.0;
    /// Extra entropy for a fast (< FAST_CLICK_MS) click
    pub const ENTROPY_FAST_BONUS: f32 = 1.0;
    /// Extra entropy for an incorrect click
    pub const ENTROPY_WRONG_BONUS: f32 = 2.0;
    /// Entropy added when the round timer runs out
    pub const ENTROPY_TIMEOUT_GAIN: f32 = 5.0;

    /// Sanity regained on a correct click
    pub const SANITY_CORRECT_GAIN: f32 = 0.5;
    /// Extra sanity drain per completed collapse
    pub const SANITY_COLLAPSE_PENALTY: f32 = 0.5;
    /// Timeout drains this many times the phase drain rate
    pub const TIMEOUT_DRAIN_FACTOR: f32 = 2.0;

    /// Flat score penalty when the round timer runs out
    pub const TIMEOUT_SCORE_PENALTY: i64 = 5;

    /// Response time thresholds (ms)
    pub const FAST_CLICK_MS: f64 = 1000.0;
    pub const QUICK_RESPONSE_MS: f64 = 1500.0;
    pub const HESITATION_MS: f64 = 3000.0;

    /// Default timer tick cadence (ms)
    pub const TICK_INTERVAL_MS: u32 = 100;
    /// Collapse lockout window (ms)
    pub const COLLAPSE_DURATION_MS: u32 = 2000;
}

/// Clamp a meter value into [0, 100]
#[inline]
pub fn clamp_meter(value: f32) -> f32 {
    use consts::{METER_MAX, METER_MIN};
    if value.is_nan() {
        return METER_MIN;
    }
    value.clamp(METER_MIN, METER_MAX)
}

/// Current wall-clock time in milliseconds
#[inline]
pub fn now_ms() -> f64 {
    platform::now_ms()
}
