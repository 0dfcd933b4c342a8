//! Phase-dependent scoring rules
//!
//! The rules deliberately contradict each other across phases. Scoring
//! reads a state snapshot and never mutates it; the only side effect is
//! drawing from the injected random source in phases 4 and 5.

use super::phase::Phase;
use super::rng::RandomSource;
use super::state::{GameState, TileColor};
use crate::consts::QUICK_RESPONSE_MS;

pub const OBEDIENCE_REWARD: i32 = 10;
pub const OBEDIENCE_PENALTY: i32 = -5;
pub const HIDDEN_TRUTH_REWARD: i32 = 15;
pub const HIDDEN_TRUTH_PENALTY: i32 = -8;
pub const INVERSION_REWARD: i32 = 12;
pub const INVERSION_PENALTY: i32 = -15;

pub const BEHAVIOR_QUICK_BONUS: i32 = 8;
pub const BEHAVIOR_REPEAT_PENALTY: i32 = -10;
pub const BEHAVIOR_VARIETY_BONUS: i32 = 5;
pub const BEHAVIOR_COIN_FLIP: i32 = 5;
/// Streak length that counts as repetitive
pub const BEHAVIOR_REPEAT_STREAK: u32 = 3;
/// Unique colors needed for the variety bonus
pub const BEHAVIOR_VARIETY_COLORS: usize = 3;

/// Chance a chaos click scores a random amount
pub const CHAOS_RANDOM_CHANCE: f32 = 0.3;
pub const CHAOS_RANDOM_MIN: i32 = -10;
pub const CHAOS_RANDOM_MAX: i32 = 19;
pub const CHAOS_REWARD: i32 = 20;
pub const CHAOS_PENALTY: i32 = -15;

/// Score delta for clicking `clicked` in the given state
pub fn score_delta<R: RandomSource + ?Sized>(
    state: &GameState,
    clicked: TileColor,
    response_time_ms: f64,
    rng: &mut R,
) -> i32 {
    match state.phase {
        Phase::Obedience => {
            if clicked == state.current_instruction {
                OBEDIENCE_REWARD
            } else {
                OBEDIENCE_PENALTY
            }
        }
        Phase::HiddenTruth => {
            if clicked == state.secret_correct_color {
                HIDDEN_TRUTH_REWARD
            } else {
                HIDDEN_TRUTH_PENALTY
            }
        }
        Phase::Inversion => {
            if clicked == state.current_instruction {
                INVERSION_PENALTY
            } else {
                INVERSION_REWARD
            }
        }
        Phase::Behavior => behavior_delta(state, clicked, response_time_ms, rng),
        Phase::Chaos => {
            if rng.chance(CHAOS_RANDOM_CHANCE) {
                rng.between(CHAOS_RANDOM_MIN, CHAOS_RANDOM_MAX)
            } else if clicked == state.secret_correct_color {
                CHAOS_REWARD
            } else {
                CHAOS_PENALTY
            }
        }
    }
}

/// Streak length after clicking `clicked`
pub fn streak_after(state: &GameState, clicked: TileColor) -> u32 {
    match state.last_clicked_color() {
        Some(last) if last == clicked => state.consecutive_same_color + 1,
        _ => 1,
    }
}

// Streak and variety include the click being scored.
fn behavior_delta<R: RandomSource + ?Sized>(
    state: &GameState,
    clicked: TileColor,
    response_time_ms: f64,
    rng: &mut R,
) -> i32 {
    let mut delta = 0;
    if response_time_ms < QUICK_RESPONSE_MS {
        delta += BEHAVIOR_QUICK_BONUS;
    }
    if streak_after(state, clicked) >= BEHAVIOR_REPEAT_STREAK {
        delta += BEHAVIOR_REPEAT_PENALTY;
    }
    if state.unique_colors_clicked.with(clicked).len() >= BEHAVIOR_VARIETY_COLORS {
        delta += BEHAVIOR_VARIETY_BONUS;
    }
    if delta == 0 {
        delta = if rng.chance(0.5) {
            BEHAVIOR_COIN_FLIP
        } else {
            -BEHAVIOR_COIN_FLIP
        };
    }
    delta
}
