//! Game state and core simulation types
//!
//! `GameState` is a value: transitions clone it, mutate the clone and hand
//! back the new snapshot, so the previous state is never aliased.

use serde::{Deserialize, Serialize};

use super::phase::{Phase, PhaseConfig};
use crate::consts::*;

/// Tile colors, in fixed enumeration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TileColor {
    Red,
    Blue,
    Green,
    Yellow,
}

impl TileColor {
    pub const ALL: [TileColor; 4] = [
        TileColor::Red,
        TileColor::Blue,
        TileColor::Green,
        TileColor::Yellow,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Self {
        Self::ALL[i % Self::ALL.len()]
    }

    /// Next color in enumeration order, wrapping
    pub fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TileColor::Red => "red",
            TileColor::Blue => "blue",
            TileColor::Green => "green",
            TileColor::Yellow => "yellow",
        }
    }
}

/// Set of colors as a 4-bit mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColorSet(u8);

impl ColorSet {
    pub fn with(self, color: TileColor) -> Self {
        Self(self.0 | (1 << color.index()))
    }

    pub fn contains(&self, color: TileColor) -> bool {
        self.0 & (1 << color.index()) != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = TileColor> + '_ {
        TileColor::ALL.into_iter().filter(|c| self.contains(*c))
    }
}

/// A grid tile. Only `id` and `color` matter to scoring; the rest are
/// render hints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub id: u8,
    pub color: TileColor,
    #[serde(default)]
    pub is_shaking: bool,
    /// Degrees
    #[serde(default)]
    pub rotation: f32,
    /// Pixels (x, y)
    #[serde(default)]
    pub drift: (f32, f32),
}

impl Tile {
    pub fn new(id: u8, color: TileColor) -> Self {
        Self {
            id,
            color,
            is_shaking: false,
            rotation: 0.0,
            drift: (0.0, 0.0),
        }
    }
}

/// One scored click (immutable once appended)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClickRecord {
    pub timestamp_ms: f64,
    pub color: TileColor,
    pub tile_id: u8,
    pub score_delta: i32,
    pub was_correct: bool,
    /// Milliseconds since the round started
    pub response_time_ms: f64,
}

/// Lifecycle of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GameStatus {
    /// No game started yet
    #[default]
    Idle,
    /// Accepting clicks and ticks
    Playing,
    /// Entropy saturated, locked out until the collapse completes
    Collapsing,
    /// Sanity ran out
    Ended,
}

/// What ended the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    /// Sanity hit zero on a click
    SanityDepleted,
    /// Sanity hit zero when the round timer ran out
    TimeRanOut,
}

/// Terminal verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub won: bool,
    pub reason: EndReason,
}

/// Complete game state (deterministic, serializable)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub status: GameStatus,
    pub score: i64,
    pub phase: Phase,
    /// 0-100
    pub entropy: f32,
    /// 0-100
    pub sanity: f32,
    /// Seconds left in the current round
    pub time_remaining: f32,
    /// Color shown to the player
    pub current_instruction: TileColor,
    /// Color that actually scores from phase 2 on (hidden)
    pub secret_correct_color: TileColor,
    pub tiles: Vec<Tile>,
    /// Append-only click log
    pub click_history: Vec<ClickRecord>,
    pub consecutive_same_color: u32,
    pub unique_colors_clicked: ColorSet,
    /// Completed collapse cycles this game
    pub collapse_count: u32,
    pub started_at_ms: f64,
    /// Round clock start; None until the clock is running
    pub round_started_at_ms: Option<f64>,
    pub collapse_started_at_ms: Option<f64>,
    pub ended_at_ms: Option<f64>,
    pub outcome: Option<Outcome>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::idle()
    }
}

impl GameState {
    /// State before any game has been started
    pub fn idle() -> Self {
        Self {
            seed: 0,
            status: GameStatus::Idle,
            score: 0,
            phase: Phase::Obedience,
            entropy: 0.0,
            sanity: STARTING_SANITY,
            time_remaining: Phase::Obedience.config().timer_duration,
            current_instruction: TileColor::Red,
            secret_correct_color: TileColor::Red,
            tiles: Vec::new(),
            click_history: Vec::new(),
            consecutive_same_color: 0,
            unique_colors_clicked: ColorSet::default(),
            collapse_count: 0,
            started_at_ms: 0.0,
            round_started_at_ms: None,
            collapse_started_at_ms: None,
            ended_at_ms: None,
            outcome: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.status, GameStatus::Playing | GameStatus::Collapsing)
    }

    pub fn is_collapsing(&self) -> bool {
        self.status == GameStatus::Collapsing
    }

    pub fn is_ended(&self) -> bool {
        self.status == GameStatus::Ended
    }

    /// Config of the current phase
    pub fn phase_config(&self) -> &'static PhaseConfig {
        self.phase.config()
    }

    pub fn tile(&self, id: u8) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.id == id)
    }

    /// Color of the most recent click
    pub fn last_clicked_color(&self) -> Option<TileColor> {
        self.click_history.last().map(|c| c.color)
    }

    /// Sanity lost on an incorrect click at the current phase
    pub fn incorrect_drain(&self) -> f32 {
        self.phase_config().sanity_drain_rate
            + SANITY_COLLAPSE_PENALTY * self.collapse_count as f32
    }

    /// Sanity lost when the round timer runs out
    pub fn timeout_drain(&self) -> f32 {
        TIMEOUT_DRAIN_FACTOR * self.phase_config().sanity_drain_rate
            + SANITY_COLLAPSE_PENALTY * self.collapse_count as f32
    }

    pub fn rules_followed(&self) -> usize {
        self.click_history.iter().filter(|c| c.was_correct).count()
    }

    pub fn rules_broken(&self) -> usize {
        self.click_history.len() - self.rules_followed()
    }
}
