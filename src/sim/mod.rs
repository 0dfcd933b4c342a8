//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Randomness only through an injected `RandomSource`
//! - Time only through explicit `now_ms` arguments
//! - Transitions return new snapshots, never mutate the caller's state
//! - No rendering, audio or storage dependencies

pub mod generate;
pub mod phase;
pub mod rng;
pub mod scoring;
pub mod state;
pub mod tick;

pub use generate::{generate_tiles, mutate_random_tile, random_color};
pub use phase::{PHASE_TABLE, Phase, PhaseConfig, VisualEffects, phase_of};
pub use rng::{GameRng, RandomSource};
pub use scoring::score_delta;
pub use state::{
    ClickRecord, ColorSet, EndReason, GameState, GameStatus, Outcome, Tile, TileColor,
};
pub use tick::{
    GameEvent, Rules, Step, collapse_due, complete_collapse, start_game, tile_click,
    timer_tick,
};
