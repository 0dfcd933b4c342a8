//! Aggregate stats across games
//!
//! Persisted through the storage port. Rolling histories are capped so the
//! saved blob stays small.

use serde::{Deserialize, Serialize};

use crate::persistence;
use crate::platform::KeyValueStore;
use crate::session::GameSession;

/// Most recent final scores kept
pub const MAX_SCORE_HISTORY: usize = 50;
/// Most recent full sessions kept
pub const MAX_RECENT_SESSIONS: usize = 20;

/// Aggregate record updated once per finished game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GameStats {
    pub total_games: u32,
    pub wins: u32,
    pub losses: u32,
    pub current_win_streak: u32,
    pub best_win_streak: u32,
    pub current_loss_streak: u32,
    pub worst_loss_streak: u32,
    pub best_score: Option<i64>,
    pub total_clicks: u64,
    pub total_collapses: u64,
    pub total_play_secs: f64,
    /// Newest last
    pub recent_scores: Vec<i64>,
    /// Newest last
    pub recent_sessions: Vec<GameSession>,
}

impl GameStats {
    /// Storage key
    pub const STORAGE_KEY: &'static str = "entropy_grid_stats";

    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one finished session into the aggregate
    pub fn record(&mut self, session: &GameSession) {
        self.total_games += 1;
        if session.won {
            self.wins += 1;
            self.current_win_streak += 1;
            self.current_loss_streak = 0;
            self.best_win_streak = self.best_win_streak.max(self.current_win_streak);
        } else {
            self.losses += 1;
            self.current_loss_streak += 1;
            self.current_win_streak = 0;
            self.worst_loss_streak = self.worst_loss_streak.max(self.current_loss_streak);
        }

        self.best_score = Some(
            self.best_score
                .map_or(session.final_score, |best| best.max(session.final_score)),
        );
        self.total_clicks += session.metrics.total_clicks as u64;
        self.total_collapses += u64::from(session.collapse_count);
        self.total_play_secs += session.duration_secs;

        push_capped(&mut self.recent_scores, session.final_score, MAX_SCORE_HISTORY);
        push_capped(&mut self.recent_sessions, session.clone(), MAX_RECENT_SESSIONS);
    }

    /// Wins / games * 100 (0 with no games)
    pub fn win_rate(&self) -> f64 {
        if self.total_games == 0 {
            0.0
        } else {
            f64::from(self.wins) / f64::from(self.total_games) * 100.0
        }
    }

    /// Mean of the rolling score window
    pub fn average_recent_score(&self) -> Option<f64> {
        if self.recent_scores.is_empty() {
            return None;
        }
        Some(self.recent_scores.iter().sum::<i64>() as f64 / self.recent_scores.len() as f64)
    }

    /// Load stats, starting fresh if missing or unreadable
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match persistence::load::<GameStats>(store, Self::STORAGE_KEY) {
            Ok(Some(stats)) => {
                log::info!("Loaded stats ({} games)", stats.total_games);
                stats
            }
            Ok(None) => {
                log::info!("No stats found, starting fresh");
                Self::new()
            }
            Err(e) => {
                log::warn!("Discarding unreadable stats: {}", e);
                Self::new()
            }
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), persistence::PersistenceError> {
        persistence::save(store, Self::STORAGE_KEY, self)?;
        log::info!("Stats saved ({} games)", self.total_games);
        Ok(())
    }
}

fn push_capped<T>(items: &mut Vec<T>, item: T, cap: usize) {
    items.push(item);
    if items.len() > cap {
        let excess = items.len() - cap;
        items.drain(..excess);
    }
}
