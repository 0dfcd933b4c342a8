//! End-of-game session summary
//!
//! Reduces the click log into behaviour metrics. Pure and deterministic:
//! the same history always yields the same metrics.

use serde::{Deserialize, Serialize};

use crate::consts::{FAST_CLICK_MS, HESITATION_MS};
use crate::sim::{ClickRecord, EndReason, GameState, Phase, TileColor};

/// Value reported for ratio metrics when there are no clicks
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Behaviour metrics derived from one game's clicks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorMetrics {
    pub total_clicks: usize,
    /// Mean response time (ms)
    pub average_click_speed: f64,
    /// Mode of clicked colors, ties to the first in enumeration order
    pub most_clicked_color: TileColor,
    /// Longest run of identical consecutive colors
    pub repetition_count: usize,
    /// Unique colors / clicks * 100
    pub variety_score: f64,
    /// % of clicks slower than 3s
    pub hesitation_score: f64,
    /// % of clicks faster than 1s
    pub impulsivity_score: f64,
    /// % of clicks that scored positively
    pub pattern_adherence: f64,
}

impl Default for BehaviorMetrics {
    fn default() -> Self {
        Self {
            total_clicks: 0,
            average_click_speed: 0.0,
            most_clicked_color: TileColor::Red,
            repetition_count: 0,
            variety_score: NEUTRAL_SCORE,
            hesitation_score: NEUTRAL_SCORE,
            impulsivity_score: NEUTRAL_SCORE,
            pattern_adherence: NEUTRAL_SCORE,
        }
    }
}

/// Immutable record handed to stats/profiling once a game ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    pub seed: u64,
    pub started_at_ms: f64,
    pub ended_at_ms: f64,
    pub duration_secs: f64,
    pub final_score: i64,
    pub final_phase: Phase,
    pub final_entropy: f32,
    pub final_sanity: f32,
    pub won: bool,
    /// None if the game was abandoned before sanity ran out
    pub end_reason: Option<EndReason>,
    pub click_sequence: Vec<TileColor>,
    pub rules_followed: usize,
    pub rules_broken: usize,
    pub metrics: BehaviorMetrics,
    pub collapse_count: u32,
}

/// Reduce a click log into behaviour metrics
pub fn behavior_metrics(history: &[ClickRecord]) -> BehaviorMetrics {
    if history.is_empty() {
        return BehaviorMetrics::default();
    }

    let total = history.len();
    let percent = |count: usize| count as f64 / total as f64 * 100.0;

    let mut counts = [0usize; 4];
    for click in history {
        counts[click.color.index()] += 1;
    }
    let unique = counts.iter().filter(|&&c| c > 0).count();

    let mut most_clicked_color = TileColor::ALL[0];
    let mut best = 0;
    for color in TileColor::ALL {
        if counts[color.index()] > best {
            best = counts[color.index()];
            most_clicked_color = color;
        }
    }

    BehaviorMetrics {
        total_clicks: total,
        average_click_speed: history.iter().map(|c| c.response_time_ms).sum::<f64>()
            / total as f64,
        most_clicked_color,
        repetition_count: longest_run(history),
        variety_score: percent(unique),
        hesitation_score: percent(
            history
                .iter()
                .filter(|c| c.response_time_ms > HESITATION_MS)
                .count(),
        ),
        impulsivity_score: percent(
            history
                .iter()
                .filter(|c| c.response_time_ms < FAST_CLICK_MS)
                .count(),
        ),
        pattern_adherence: percent(history.iter().filter(|c| c.was_correct).count()),
    }
}

fn longest_run(history: &[ClickRecord]) -> usize {
    let mut longest = 0;
    let mut run = 0;
    let mut prev = None;
    for click in history {
        run = if prev == Some(click.color) { run + 1 } else { 1 };
        longest = longest.max(run);
        prev = Some(click.color);
    }
    longest
}

/// Build the session record for a finished (or abandoned) game
pub fn summarize(state: &GameState) -> GameSession {
    let ended_at_ms = state.ended_at_ms.unwrap_or_else(|| {
        state
            .click_history
            .last()
            .map(|c| c.timestamp_ms)
            .unwrap_or(state.started_at_ms)
    });
    let rules_followed = state.rules_followed();

    GameSession {
        seed: state.seed,
        started_at_ms: state.started_at_ms,
        ended_at_ms,
        duration_secs: ((ended_at_ms - state.started_at_ms) / 1000.0).max(0.0),
        final_score: state.score,
        final_phase: state.phase,
        final_entropy: state.entropy,
        final_sanity: state.sanity,
        won: state.outcome.is_some_and(|o| o.won),
        end_reason: state.outcome.map(|o| o.reason),
        click_sequence: state.click_history.iter().map(|c| c.color).collect(),
        rules_followed,
        rules_broken: state.click_history.len() - rules_followed,
        metrics: behavior_metrics(&state.click_history),
        collapse_count: state.collapse_count,
    }
}
