//! State transitions
//!
//! Every transition takes the current snapshot by reference and returns the
//! next one together with the events it produced. Invalid events (wrong
//! lifecycle state, unknown tile) return the input unchanged with no events.

use serde::{Deserialize, Serialize};

use super::generate::{calm_tiles, generate_tiles, mutate_random_tile, random_color};
use super::phase::{Phase, phase_of};
use super::rng::RandomSource;
use super::scoring::{score_delta, streak_after};
use super::state::{ClickRecord, EndReason, GameState, GameStatus, Outcome, TileColor};
use crate::clamp_meter;
use crate::consts::*;
use crate::settings::WinRule;

/// Remaining time below this counts as expired (absorbs f32 drift from
/// repeated fractional ticks)
const TIMER_EPSILON_SECS: f32 = 1e-4;

/// Rules that vary with settings rather than with the phase table
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rules {
    pub win_rule: WinRule,
    /// Strip shake/rotation/drift hints from generated tiles
    pub reduced_motion: bool,
}

/// Observable state deltas (audio cues, HUD flashes, telemetry)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    GameStarted {
        seed: u64,
    },
    ClickScored {
        tile_id: u8,
        color: TileColor,
        delta: i32,
        was_correct: bool,
    },
    PhaseChanged {
        from: Phase,
        to: Phase,
    },
    /// The round timer expired without a click
    TimeRanOut,
    CollapseStarted {
        at_ms: f64,
    },
    CollapseCompleted {
        collapse_count: u32,
    },
    GameEnded {
        outcome: Outcome,
    },
}

/// Result of a transition
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub state: GameState,
    pub events: Vec<GameEvent>,
}

impl Step {
    fn unchanged(state: &GameState) -> Self {
        Self {
            state: state.clone(),
            events: Vec::new(),
        }
    }

    pub fn ended(&self) -> Option<Outcome> {
        self.events.iter().find_map(|e| match e {
            GameEvent::GameEnded { outcome } => Some(*outcome),
            _ => None,
        })
    }

    pub fn collapse_started(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, GameEvent::CollapseStarted { .. }))
    }
}

/// Fresh game: counters zeroed, new grid, instruction and secret color
pub fn start_game<R: RandomSource + ?Sized>(
    seed: u64,
    now_ms: f64,
    rules: &Rules,
    rng: &mut R,
) -> Step {
    let mut state = GameState {
        seed,
        status: GameStatus::Playing,
        started_at_ms: now_ms,
        secret_correct_color: random_color(rng),
        ..GameState::idle()
    };
    new_round(&mut state, now_ms, rules, rng, true);

    log::info!(
        "Game started (seed {}, instruction {}, secret {})",
        seed,
        state.current_instruction.as_str(),
        state.secret_correct_color.as_str()
    );

    Step {
        state,
        events: vec![GameEvent::GameStarted { seed }],
    }
}

/// Player clicked a tile
pub fn tile_click<R: RandomSource + ?Sized>(
    state: &GameState,
    tile_id: u8,
    now_ms: f64,
    rules: &Rules,
    rng: &mut R,
) -> Step {
    if state.status != GameStatus::Playing {
        return Step::unchanged(state);
    }
    let Some(tile) = state.tile(tile_id).copied() else {
        log::debug!("Click on unknown tile {}", tile_id);
        return Step::unchanged(state);
    };

    let response_time_ms = state
        .round_started_at_ms
        .map(|start| (now_ms - start).max(0.0))
        .unwrap_or(0.0);
    let delta = score_delta(state, tile.color, response_time_ms, rng);
    let was_correct = delta > 0;
    let scored_phase = state.phase;

    let mut next = state.clone();
    let mut events = vec![GameEvent::ClickScored {
        tile_id,
        color: tile.color,
        delta,
        was_correct,
    }];

    next.click_history.push(ClickRecord {
        timestamp_ms: now_ms,
        color: tile.color,
        tile_id,
        score_delta: delta,
        was_correct,
        response_time_ms,
    });
    next.score += i64::from(delta);

    let mut entropy_gain = ENTROPY_BASE_GAIN + f32::from(scored_phase.number());
    if response_time_ms < FAST_CLICK_MS {
        entropy_gain += ENTROPY_FAST_BONUS;
    }
    if !was_correct {
        entropy_gain += ENTROPY_WRONG_BONUS;
    }
    set_entropy(&mut next, state.entropy + entropy_gain, &mut events);

    let sanity_change = if was_correct {
        SANITY_CORRECT_GAIN
    } else {
        -next.incorrect_drain()
    };
    next.sanity = clamp_meter(next.sanity + sanity_change);

    next.consecutive_same_color = streak_after(state, tile.color);
    next.unique_colors_clicked = state.unique_colors_clicked.with(tile.color);

    log::debug!(
        "Click tile {} ({}) in {:?}: {:+} (score {}, entropy {:.1}, sanity {:.1})",
        tile_id,
        tile.color.as_str(),
        scored_phase,
        delta,
        next.score,
        next.entropy,
        next.sanity
    );

    if check_terminal(&mut next, EndReason::SanityDepleted, now_ms, rules, &mut events) {
        return Step {
            state: next,
            events,
        };
    }

    let regenerate = next.phase != Phase::Chaos;
    new_round(&mut next, now_ms, rules, rng, regenerate);
    check_collapse(&mut next, now_ms, &mut events);

    Step {
        state: next,
        events,
    }
}

/// Advance the round timer by `delta_secs`
pub fn timer_tick<R: RandomSource + ?Sized>(
    state: &GameState,
    delta_secs: f32,
    now_ms: f64,
    rules: &Rules,
    rng: &mut R,
) -> Step {
    if state.status != GameStatus::Playing || state.round_started_at_ms.is_none() {
        return Step::unchanged(state);
    }
    if !delta_secs.is_finite() || delta_secs <= 0.0 {
        return Step::unchanged(state);
    }

    let mut next = state.clone();
    next.time_remaining -= delta_secs;
    if next.time_remaining > TIMER_EPSILON_SECS {
        return Step {
            state: next,
            events: Vec::new(),
        };
    }

    let mut events = vec![GameEvent::TimeRanOut];
    next.time_remaining = 0.0;
    next.sanity = clamp_meter(next.sanity - state.timeout_drain());
    set_entropy(&mut next, state.entropy + ENTROPY_TIMEOUT_GAIN, &mut events);

    log::debug!(
        "Time ran out in {:?} (entropy {:.1}, sanity {:.1})",
        state.phase,
        next.entropy,
        next.sanity
    );

    // Sanity-zero takes precedence over the flat penalty and regeneration
    if check_terminal(&mut next, EndReason::TimeRanOut, now_ms, rules, &mut events) {
        return Step {
            state: next,
            events,
        };
    }

    next.score -= TIMEOUT_SCORE_PENALTY;
    new_round(&mut next, now_ms, rules, rng, true);
    check_collapse(&mut next, now_ms, &mut events);

    Step {
        state: next,
        events,
    }
}

/// Finish a collapse: entropy and phase reset, collapse counted
pub fn complete_collapse<R: RandomSource + ?Sized>(
    state: &GameState,
    now_ms: f64,
    rules: &Rules,
    rng: &mut R,
) -> Step {
    if state.status != GameStatus::Collapsing {
        return Step::unchanged(state);
    }

    let mut next = state.clone();
    let mut events = Vec::new();

    if next.phase != Phase::Obedience {
        events.push(GameEvent::PhaseChanged {
            from: next.phase,
            to: Phase::Obedience,
        });
    }
    next.entropy = 0.0;
    next.phase = Phase::Obedience;
    next.collapse_count += 1;
    next.secret_correct_color = random_color(rng);
    next.status = GameStatus::Playing;
    next.collapse_started_at_ms = None;
    new_round(&mut next, now_ms, rules, rng, true);

    log::info!(
        "Collapse #{} complete, back to {}",
        next.collapse_count,
        next.phase_config().name
    );
    events.push(GameEvent::CollapseCompleted {
        collapse_count: next.collapse_count,
    });

    Step {
        state: next,
        events,
    }
}

/// True once a collapse has run for at least `duration_ms`
pub fn collapse_due(state: &GameState, now_ms: f64, duration_ms: u32) -> bool {
    match (state.status, state.collapse_started_at_ms) {
        (GameStatus::Collapsing, Some(started)) => now_ms - started >= f64::from(duration_ms),
        _ => false,
    }
}

/// Clamp entropy, recompute phase, advance the secret color on change
fn set_entropy(state: &mut GameState, entropy: f32, events: &mut Vec<GameEvent>) {
    state.entropy = clamp_meter(entropy);
    let phase = phase_of(state.entropy);
    if phase != state.phase {
        log::info!(
            "Phase {} -> {} ({})",
            state.phase.number(),
            phase.number(),
            phase.config().name
        );
        events.push(GameEvent::PhaseChanged {
            from: state.phase,
            to: phase,
        });
        state.phase = phase;
        state.secret_correct_color = state.secret_correct_color.next();
    }
}

/// New instruction, new (or mutated) grid, timer reset to the phase duration
fn new_round<R: RandomSource + ?Sized>(
    state: &mut GameState,
    now_ms: f64,
    rules: &Rules,
    rng: &mut R,
    regenerate: bool,
) {
    let effects = state.phase_config().visual_effects;
    if regenerate || state.tiles.is_empty() {
        state.tiles = generate_tiles(rng, &effects);
    } else {
        mutate_random_tile(&mut state.tiles, rng, &effects);
    }
    if rules.reduced_motion {
        calm_tiles(&mut state.tiles);
    }
    state.current_instruction = random_color(rng);
    state.time_remaining = state.phase_config().timer_duration;
    state.round_started_at_ms = Some(now_ms);
}

fn check_terminal(
    state: &mut GameState,
    reason: EndReason,
    now_ms: f64,
    rules: &Rules,
    events: &mut Vec<GameEvent>,
) -> bool {
    if state.sanity > 0.0 || state.status == GameStatus::Ended {
        return false;
    }
    let outcome = Outcome {
        won: rules.win_rule.is_win(state.score, state.collapse_count),
        reason,
    };
    state.status = GameStatus::Ended;
    state.ended_at_ms = Some(now_ms);
    state.collapse_started_at_ms = None;
    state.round_started_at_ms = None;
    state.outcome = Some(outcome);

    log::info!(
        "Game over ({:?}): score {}, collapses {}, {}",
        reason,
        state.score,
        state.collapse_count,
        if outcome.won { "won" } else { "lost" }
    );
    events.push(GameEvent::GameEnded { outcome });
    true
}

fn check_collapse(state: &mut GameState, now_ms: f64, events: &mut Vec<GameEvent>) {
    if state.status != GameStatus::Playing || state.entropy < METER_MAX {
        return;
    }
    state.status = GameStatus::Collapsing;
    state.collapse_started_at_ms = Some(now_ms);
    log::info!("Entropy saturated, collapsing (cycle {})", state.collapse_count + 1);
    events.push(GameEvent::CollapseStarted { at_ms: now_ms });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::rng::GameRng;
    use crate::sim::rng::scripted::ScriptedRandom;
    use proptest::prelude::*;

    fn rules() -> Rules {
        Rules::default()
    }

    fn started(seed: u64) -> (GameState, GameRng) {
        let mut rng = GameRng::new(seed);
        let step = start_game(seed, 0.0, &rules(), &mut rng);
        (step.state, rng)
    }

    /// Grid where tile i has color i % 4
    fn striped(state: &mut GameState) {
        for tile in &mut state.tiles {
            tile.color = TileColor::from_index(tile.id as usize);
        }
    }

    #[test]
    fn test_start_game() {
        let (state, _) = started(5);
        assert_eq!(state.status, GameStatus::Playing);
        assert!(state.is_playing());
        assert!(!state.is_collapsing());
        assert_eq!(state.tiles.len(), GRID_SIZE);
        assert_eq!(state.score, 0);
        assert_eq!(state.entropy, 0.0);
        assert_eq!(state.sanity, 100.0);
        assert_eq!(state.phase, Phase::Obedience);
        assert_eq!(state.time_remaining, 5.0);
        assert_eq!(state.round_started_at_ms, Some(0.0));
        assert!(state.click_history.is_empty());
    }

    #[test]
    fn test_three_obedient_clicks() {
        let (mut state, mut rng) = started(11);
        let mut now = 0.0;
        for _ in 0..3 {
            striped(&mut state);
            now += 1500.0;
            let id = state.current_instruction.index() as u8;
            state = tile_click(&state, id, now, &rules(), &mut rng).state;
        }
        assert_eq!(state.score, 30);
        // 3 * (2 + 1), slow and correct clicks add nothing extra
        assert_eq!(state.entropy, 9.0);
        assert_eq!(state.phase, Phase::Obedience);
        assert_eq!(state.sanity, 100.0);
        assert_eq!(state.click_history.len(), 3);
        assert!(state.click_history.iter().all(|c| c.was_correct));
    }

    #[test]
    fn test_fast_wrong_click_entropy_and_sanity() {
        let (mut state, mut rng) = started(12);
        striped(&mut state);
        let wrong = state.current_instruction.next().index() as u8;
        let step = tile_click(&state, wrong, 400.0, &rules(), &mut rng);
        // 2 + 1 + fast 1 + wrong 2
        assert_eq!(step.state.entropy, 6.0);
        assert_eq!(step.state.sanity, 98.0);
        assert_eq!(step.state.score, -5);
        assert!(!step.state.click_history[0].was_correct);
        assert_eq!(step.state.click_history[0].response_time_ms, 400.0);
    }

    #[test]
    fn test_click_ignored_when_not_playing() {
        let idle = GameState::idle();
        let mut rng = GameRng::new(1);
        let step = tile_click(&idle, 0, 10.0, &rules(), &mut rng);
        assert_eq!(step.state, idle);
        assert!(step.events.is_empty());
    }

    #[test]
    fn test_unknown_tile_is_noop() {
        let (state, mut rng) = started(3);
        let step = tile_click(&state, 99, 100.0, &rules(), &mut rng);
        assert_eq!(step.state, state);
        assert!(step.events.is_empty());
    }

    #[test]
    fn test_secret_advances_only_on_phase_change() {
        let (mut state, mut rng) = started(21);
        state.entropy = 20.0;
        let secret = state.secret_correct_color;

        // 20 + 3 + 2 (wrong) = 25 -> phase 2
        striped(&mut state);
        let wrong = state.current_instruction.next().index() as u8;
        let step = tile_click(&state, wrong, 2000.0, &rules(), &mut rng);
        assert_eq!(step.state.phase, Phase::HiddenTruth);
        assert_eq!(step.state.secret_correct_color, secret.next());
        assert!(step.events.contains(&GameEvent::PhaseChanged {
            from: Phase::Obedience,
            to: Phase::HiddenTruth,
        }));

        // Stay in phase 2: secret stable
        let state = step.state;
        let id = state.tiles[0].id;
        let step = tile_click(&state, id, 4000.0, &rules(), &mut rng);
        assert_eq!(step.state.phase, Phase::HiddenTruth);
        assert_eq!(step.state.secret_correct_color, secret.next());
    }

    #[test]
    fn test_chaos_keeps_grid_and_mutates_one_tile() {
        let (mut state, _) = started(8);
        state.entropy = 92.0;
        state.phase = Phase::Chaos;
        let before = state.tiles.clone();
        // mutated tile 0, new color red, instruction blue
        let mut rng = ScriptedRandom::calm().with_indices(&[0, 0, 1]);
        let step = tile_click(&state, 3, 2000.0, &rules(), &mut rng);
        let changed: Vec<_> = before
            .iter()
            .zip(&step.state.tiles)
            .filter(|(a, b)| a != b)
            .map(|(a, _)| a.id)
            .collect();
        assert!(changed.len() <= 1);
        assert!(step.state.tiles.iter().filter(|t| t.is_shaking).count() >= 1);
    }

    #[test]
    fn test_collapse_cycle() {
        let (mut state, _) = started(9);
        state.entropy = 95.0;
        state.phase = Phase::Chaos;
        striped(&mut state);
        let wrong = state.secret_correct_color.next().index() as u8;
        let mut rng = ScriptedRandom::calm();

        let step = tile_click(&state, wrong, 1000.0, &rules(), &mut rng);
        assert!(step.collapse_started());
        assert_eq!(step.state.entropy, 100.0);
        assert_eq!(step.state.status, GameStatus::Collapsing);
        assert!(step.state.is_playing());
        let collapsing = step.state;

        // Clicks and ticks are locked out
        let blocked = tile_click(&collapsing, 0, 1500.0, &rules(), &mut rng);
        assert_eq!(blocked.state, collapsing);
        let blocked = timer_tick(&collapsing, 0.1, 1600.0, &rules(), &mut rng);
        assert_eq!(blocked.state, collapsing);

        assert!(!collapse_due(&collapsing, 2999.0, COLLAPSE_DURATION_MS));
        assert!(collapse_due(&collapsing, 3000.0, COLLAPSE_DURATION_MS));

        let step = complete_collapse(&collapsing, 3000.0, &rules(), &mut rng);
        assert_eq!(step.state.entropy, 0.0);
        assert_eq!(step.state.phase, Phase::Obedience);
        assert_eq!(step.state.collapse_count, 1);
        assert_eq!(step.state.status, GameStatus::Playing);
        assert_eq!(step.state.time_remaining, 5.0);
        assert!(step.events.contains(&GameEvent::CollapseCompleted { collapse_count: 1 }));

        // Completing twice does nothing
        let again = complete_collapse(&step.state, 3100.0, &rules(), &mut rng);
        assert_eq!(again.state, step.state);
    }

    #[test]
    fn test_timer_tick_counts_down() {
        let (state, mut rng) = started(4);
        let step = timer_tick(&state, 0.1, 100.0, &rules(), &mut rng);
        assert!((step.state.time_remaining - 4.9).abs() < 1e-5);
        assert!(step.events.is_empty());
        assert_eq!(step.state.sanity, 100.0);
    }

    fn ticks_until_timeout(mut state: GameState, rng: &mut GameRng) -> u32 {
        let mut now = 0.0;
        for n in 1..=1000 {
            now += 100.0;
            let step = timer_tick(&state, 0.1, now, &rules(), rng);
            if step.events.contains(&GameEvent::TimeRanOut) {
                return n;
            }
            state = step.state;
        }
        panic!("timer never ran out");
    }

    #[test]
    fn test_round_lasts_exact_tick_count() {
        let (state, mut rng) = started(4);
        assert_eq!(ticks_until_timeout(state, &mut rng), 50);

        for (entropy, phase, ticks) in [
            (30.0, Phase::HiddenTruth, 45),
            (60.0, Phase::Inversion, 40),
            (80.0, Phase::Behavior, 35),
            (91.0, Phase::Chaos, 30),
        ] {
            let (mut state, mut rng) = started(4);
            state.entropy = entropy;
            state.phase = phase;
            state.time_remaining = phase.config().timer_duration;
            assert_eq!(ticks_until_timeout(state, &mut rng), ticks, "{:?}", phase);
        }
    }

    #[test]
    fn test_timeout_penalty() {
        let (state, mut rng) = started(4);
        let step = timer_tick(&state, 5.0, 5000.0, &rules(), &mut rng);
        assert!(step.events.contains(&GameEvent::TimeRanOut));
        assert_eq!(step.state.sanity, 96.0);
        assert_eq!(step.state.entropy, 5.0);
        assert_eq!(step.state.score, -5);
        assert_eq!(step.state.time_remaining, 5.0);
        assert_eq!(step.state.round_started_at_ms, Some(5000.0));
    }

    #[test]
    fn test_timeout_to_zero_skips_penalty() {
        let (mut state, mut rng) = started(4);
        state.sanity = 3.0;
        state.score = 40;
        let tiles = state.tiles.clone();
        let step = timer_tick(&state, 6.0, 6000.0, &rules(), &mut rng);
        let outcome = step.ended().expect("game should end");
        assert_eq!(outcome.reason, EndReason::TimeRanOut);
        assert!(!outcome.won);
        assert_eq!(step.state.score, 40);
        assert_eq!(step.state.tiles, tiles);
        assert_eq!(step.state.sanity, 0.0);
        assert!(!step.state.is_playing());
    }

    #[test]
    fn test_termination_is_idempotent() {
        let (mut state, mut rng) = started(6);
        state.sanity = 1.0;
        striped(&mut state);
        let wrong = state.current_instruction.next().index() as u8;
        let step = tile_click(&state, wrong, 2000.0, &rules(), &mut rng);
        assert_eq!(step.ended().map(|o| o.reason), Some(EndReason::SanityDepleted));
        let ended = step.state;
        assert_eq!(ended.status, GameStatus::Ended);

        let click = tile_click(&ended, 0, 2500.0, &rules(), &mut rng);
        let tick = timer_tick(&ended, 10.0, 2600.0, &rules(), &mut rng);
        assert_eq!(click.state, ended);
        assert_eq!(tick.state, ended);
        assert!(click.events.is_empty() && tick.events.is_empty());
    }

    #[test]
    fn test_win_rule_applied_on_end() {
        let (mut state, mut rng) = started(6);
        state.sanity = 1.0;
        state.score = 500;
        state.collapse_count = 3;
        let step = timer_tick(&state, 10.0, 10_000.0, &rules(), &mut rng);
        assert_eq!(step.ended().map(|o| o.won), Some(true));
    }

    #[test]
    fn test_reduced_motion_strips_hints() {
        let mut rng = GameRng::new(17);
        let rules = Rules {
            reduced_motion: true,
            ..Rules::default()
        };
        let (mut state, _) = started(17);
        state.entropy = 80.0;
        state.phase = Phase::Behavior;
        let step = timer_tick(&state, 10.0, 10_000.0, &rules, &mut rng);
        assert!(step.state.tiles.iter().all(|t| !t.is_shaking && t.rotation == 0.0));
    }

    proptest! {
        #[test]
        fn meters_stay_clamped(seed in any::<u64>(), actions in prop::collection::vec((0u8..20, 0u32..4000), 1..120)) {
            let mut rng = GameRng::new(seed);
            let mut state = start_game(seed, 0.0, &rules(), &mut rng).state;
            let mut now = 0.0;
            for (tile, gap) in actions {
                now += f64::from(gap);
                state = if tile < 16 {
                    tile_click(&state, tile, now, &rules(), &mut rng).state
                } else {
                    timer_tick(&state, gap as f32 / 1000.0, now, &rules(), &mut rng).state
                };
                if collapse_due(&state, now, COLLAPSE_DURATION_MS) {
                    state = complete_collapse(&state, now, &rules(), &mut rng).state;
                }
                prop_assert!((0.0..=100.0).contains(&state.entropy));
                prop_assert!((0.0..=100.0).contains(&state.sanity));
                prop_assert_eq!(state.phase, phase_of(state.entropy));
            }
        }

        #[test]
        fn secret_moves_iff_phase_moves(seed in any::<u64>(), clicks in prop::collection::vec((0u8..16, 100u32..3000), 1..60)) {
            let mut rng = GameRng::new(seed);
            let mut state = start_game(seed, 0.0, &rules(), &mut rng).state;
            let mut now = 0.0;
            for (tile, gap) in clicks {
                if state.status != GameStatus::Playing {
                    break;
                }
                now += f64::from(gap);
                let next = tile_click(&state, tile, now, &rules(), &mut rng).state;
                let phase_moved = next.phase != state.phase;
                let secret_moved = next.secret_correct_color != state.secret_correct_color;
                prop_assert_eq!(phase_moved, secret_moved);
                state = next;
            }
        }
    }
}
