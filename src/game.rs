//! Game driver
//!
//! Single owner of the authoritative `GameState`. Hosts (the browser glue,
//! the headless runner, tests) forward clicks and timer ticks here; the
//! driver runs the pure transitions, plays audio cues, schedules the
//! collapse timeout and records finished sessions.

use crate::audio::{AudioPort, cue_for};
use crate::persistence;
use crate::platform::KeyValueStore;
use crate::session::{GameSession, summarize};
use crate::settings::Settings;
use crate::sim::{self, GameEvent, GameRng, GameState, Step};
use crate::stats::GameStats;

/// Storage key for the most recent session
pub const LAST_SESSION_KEY: &str = "entropy_grid_last_session";

/// Identifies one scheduled collapse; stale once it completes or a new
/// game starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollapseToken {
    generation: u64,
    /// Collapses already completed in this game when this one was scheduled
    cycle: u32,
}

/// A collapse waiting for its lockout window to pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingCollapse {
    pub token: CollapseToken,
    pub due_at_ms: f64,
}

pub struct Game<S: KeyValueStore, A: AudioPort> {
    settings: Settings,
    /// Draws per-game seeds
    seeds: GameRng,
    /// Randomness for the current game
    rng: GameRng,
    state: GameState,
    stats: GameStats,
    store: S,
    audio: A,
    /// Bumped on every start_game
    generation: u64,
    pending_collapse: Option<PendingCollapse>,
    last_session: Option<GameSession>,
}

impl<S: KeyValueStore, A: AudioPort> Game<S, A> {
    /// Create a driver, loading settings and stats from `store`
    pub fn new(seed: u64, store: S, audio: A) -> Self {
        let settings = Settings::load(&store);
        Self::with_settings(seed, settings, store, audio)
    }

    pub fn with_settings(seed: u64, settings: Settings, store: S, audio: A) -> Self {
        let stats = GameStats::load(&store);
        Self {
            settings,
            seeds: GameRng::new(seed),
            rng: GameRng::new(seed),
            state: GameState::idle(),
            stats,
            store,
            audio,
            generation: 0,
            pending_collapse: None,
            last_session: None,
        }
    }

    /// Current snapshot (read-only)
    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn stats(&self) -> &GameStats {
        &self.stats
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn last_session(&self) -> Option<&GameSession> {
        self.last_session.as_ref()
    }

    pub fn pending_collapse(&self) -> Option<PendingCollapse> {
        self.pending_collapse
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }

    /// Replace settings and persist them
    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings.sanitized();
        self.settings.save(&mut self.store);
    }

    /// Start a new game with a fresh seed; supersedes any pending collapse
    pub fn start_game(&mut self, now_ms: f64) -> Vec<GameEvent> {
        let seed = self.seeds.next_seed();
        self.start_game_with_seed(seed, now_ms)
    }

    /// Start a new game with an explicit seed (replays, tests)
    pub fn start_game_with_seed(&mut self, seed: u64, now_ms: f64) -> Vec<GameEvent> {
        self.generation += 1;
        if self.pending_collapse.take().is_some() {
            log::info!("Pending collapse cancelled by new game");
        }
        self.rng = GameRng::new(seed);
        let step = sim::start_game(seed, now_ms, &self.settings.rules(), &mut self.rng);
        self.apply(step)
    }

    /// Forward a tile click
    pub fn tile_click(&mut self, tile_id: u8, now_ms: f64) -> Vec<GameEvent> {
        let step = sim::tile_click(
            &self.state,
            tile_id,
            now_ms,
            &self.settings.rules(),
            &mut self.rng,
        );
        self.apply(step)
    }

    /// Forward a timer tick. Completes a due collapse first, so a host that
    /// only runs a tick loop needs no separate timeout callback.
    pub fn timer_tick(&mut self, delta_secs: f32, now_ms: f64) -> Vec<GameEvent> {
        let mut events = self.poll(now_ms);
        let step = sim::timer_tick(
            &self.state,
            delta_secs,
            now_ms,
            &self.settings.rules(),
            &mut self.rng,
        );
        events.extend(self.apply(step));
        events
    }

    /// Complete the pending collapse if its window has passed
    pub fn poll(&mut self, now_ms: f64) -> Vec<GameEvent> {
        match self.pending_collapse {
            Some(pending) if now_ms >= pending.due_at_ms => self.finish_collapse(now_ms),
            _ => Vec::new(),
        }
    }

    /// Timeout callback for hosts that schedule the collapse themselves
    pub fn on_collapse_timeout(&mut self, token: CollapseToken, now_ms: f64) -> Vec<GameEvent> {
        match self.pending_collapse {
            Some(pending) if pending.token == token => self.finish_collapse(now_ms),
            _ => {
                log::debug!("Ignoring stale collapse timeout");
                Vec::new()
            }
        }
    }

    fn finish_collapse(&mut self, now_ms: f64) -> Vec<GameEvent> {
        self.pending_collapse = None;
        let step = sim::complete_collapse(&self.state, now_ms, &self.settings.rules(), &mut self.rng);
        self.apply(step)
    }

    /// Commit a transition and react to its events
    fn apply(&mut self, step: Step) -> Vec<GameEvent> {
        self.state = step.state;
        let volume = self.settings.effective_volume();

        for event in &step.events {
            if volume > 0.0 {
                if let Some(cue) = cue_for(event) {
                    self.audio.play(cue, volume);
                }
            }
            match event {
                GameEvent::CollapseStarted { at_ms } => {
                    self.pending_collapse = Some(PendingCollapse {
                        token: CollapseToken {
                            generation: self.generation,
                            cycle: self.state.collapse_count,
                        },
                        due_at_ms: at_ms + f64::from(self.settings.collapse_duration_ms),
                    });
                }
                GameEvent::GameEnded { .. } => self.record_session(),
                _ => {}
            }
        }

        step.events
    }

    fn record_session(&mut self) {
        let session = summarize(&self.state);
        self.stats.record(&session);
        if let Err(e) = self.stats.save(&mut self.store) {
            log::warn!("Failed to save stats: {}", e);
        }
        if let Err(e) = persistence::save(&mut self.store, LAST_SESSION_KEY, &session) {
            log::warn!("Failed to save session: {}", e);
        }
        self.last_session = Some(session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioCue, CueLog};
    use crate::platform::MemoryStore;
    use crate::sim::{GameStatus, Phase, TileColor};

    fn game() -> Game<MemoryStore, CueLog> {
        Game::new(1234, MemoryStore::default(), CueLog::default())
    }

    /// Put the current game one wrong chaos click away from collapsing
    fn near_collapse(game: &mut Game<MemoryStore, CueLog>) -> u8 {
        game.state.entropy = 95.0;
        game.state.phase = Phase::Chaos;
        for tile in &mut game.state.tiles {
            tile.color = TileColor::from_index(tile.id as usize);
        }
        game.state.secret_correct_color.next().index() as u8
    }

    /// Click until a collapse starts (chaos may score a random positive)
    fn drive_to_collapse(game: &mut Game<MemoryStore, CueLog>, now: f64) {
        let mut t = now;
        while !game.state().is_collapsing() {
            let tile = near_collapse(game);
            game.tile_click(tile, t);
            t += 10.0;
            assert!(game.state().is_playing());
        }
    }

    #[test]
    fn test_events_before_start_are_noops() {
        let mut game = game();
        assert!(game.tile_click(0, 0.0).is_empty());
        assert!(game.timer_tick(0.1, 100.0).is_empty());
        assert_eq!(game.state().status, GameStatus::Idle);
    }

    #[test]
    fn test_collapse_via_poll() {
        let mut game = game();
        game.start_game(0.0);
        drive_to_collapse(&mut game, 1000.0);
        let pending = game.pending_collapse().expect("collapse scheduled");

        assert!(game.tile_click(0, pending.due_at_ms - 1.0).is_empty());
        assert!(game.poll(pending.due_at_ms - 1.0).is_empty());
        let events = game.poll(pending.due_at_ms);
        assert!(events.contains(&GameEvent::CollapseCompleted { collapse_count: 1 }));
        assert_eq!(game.state().entropy, 0.0);
        assert_eq!(game.state().phase, Phase::Obedience);
        assert_eq!(game.state().collapse_count, 1);
        assert!(game.pending_collapse().is_none());
        assert!(game.audio().cues.contains(&AudioCue::CollapseStart));
        assert!(game.audio().cues.contains(&AudioCue::CollapseEnd));
    }

    #[test]
    fn test_timer_tick_completes_due_collapse() {
        let mut game = game();
        game.start_game(0.0);
        drive_to_collapse(&mut game, 1000.0);
        let due = game.pending_collapse().expect("collapse scheduled").due_at_ms;
        assert!(game.timer_tick(0.1, due - 500.0).is_empty());
        let events = game.timer_tick(0.1, due);
        assert!(events.contains(&GameEvent::CollapseCompleted { collapse_count: 1 }));
        assert!(game.state().time_remaining < 5.0);
    }

    #[test]
    fn test_new_game_cancels_pending_collapse() {
        let mut game = game();
        game.start_game(0.0);
        drive_to_collapse(&mut game, 1000.0);
        let stale = game.pending_collapse().expect("collapse scheduled");

        game.start_game(1500.0);
        assert!(game.pending_collapse().is_none());
        assert_eq!(game.state().status, GameStatus::Playing);
        assert!(game.on_collapse_timeout(stale.token, 5000.0).is_empty());
        assert_eq!(game.state().collapse_count, 0);
    }

    #[test]
    fn test_collapse_timeout_callback() {
        let mut game = game();
        game.start_game(0.0);
        drive_to_collapse(&mut game, 1000.0);
        let pending = game.pending_collapse().expect("collapse scheduled");
        let events = game.on_collapse_timeout(pending.token, pending.due_at_ms);
        assert!(events.contains(&GameEvent::CollapseCompleted { collapse_count: 1 }));
    }

    #[test]
    fn test_earlier_collapse_token_cannot_end_later_collapse() {
        let mut game = game();
        game.start_game(0.0);
        drive_to_collapse(&mut game, 1000.0);
        let first = game.pending_collapse().expect("first collapse scheduled");
        game.poll(first.due_at_ms);
        assert_eq!(game.state().collapse_count, 1);

        drive_to_collapse(&mut game, 3500.0);
        let second = game.pending_collapse().expect("second collapse scheduled");
        assert_ne!(first.token, second.token);

        // A late callback for the first collapse leaves the lockout in place
        let late = second.due_at_ms - 1990.0;
        assert!(game.on_collapse_timeout(first.token, late).is_empty());
        assert!(game.state().is_collapsing());
        assert_eq!(game.pending_collapse(), Some(second));

        let events = game.on_collapse_timeout(second.token, second.due_at_ms);
        assert!(events.contains(&GameEvent::CollapseCompleted { collapse_count: 2 }));
    }

    #[test]
    fn test_game_end_records_session_once() {
        let mut game = game();
        game.start_game(0.0);
        game.state.sanity = 1.0;
        let events = game.timer_tick(10.0, 10_000.0);
        assert!(events.iter().any(|e| matches!(e, GameEvent::GameEnded { .. })));
        assert_eq!(game.state().status, GameStatus::Ended);

        let session = game.last_session().expect("session recorded").clone();
        assert!(!session.won);
        assert_eq!(session.metrics.pattern_adherence, 50.0);
        assert_eq!(game.stats().total_games, 1);
        assert_eq!(game.stats().losses, 1);

        // Further events are ignored and do not re-record
        assert!(game.timer_tick(10.0, 20_000.0).is_empty());
        assert!(game.tile_click(0, 20_000.0).is_empty());
        assert_eq!(game.stats().total_games, 1);
        assert!(game.audio().cues.contains(&AudioCue::GameLost));

        // Persisted for the next driver
        let stats = GameStats::load(game.store());
        assert_eq!(stats.total_games, 1);
        let saved: Option<GameSession> =
            persistence::load(game.store(), LAST_SESSION_KEY).expect("valid save");
        assert_eq!(saved, Some(session));
    }

    #[test]
    fn test_same_seed_replays_identically() {
        let mut a = game();
        let mut b = game();
        a.start_game_with_seed(99, 0.0);
        b.start_game_with_seed(99, 0.0);
        for i in 0..30u8 {
            let now = f64::from(i) * 700.0 + 700.0;
            a.tile_click(i % 16, now);
            b.tile_click(i % 16, now);
            a.timer_tick(0.1, now + 50.0);
            b.timer_tick(0.1, now + 50.0);
        }
        assert_eq!(a.state(), b.state());
    }

    #[test]
    fn test_muted_plays_nothing() {
        let settings = Settings {
            muted: true,
            ..Settings::default()
        };
        let mut game = Game::with_settings(5, settings, MemoryStore::default(), CueLog::default());
        game.start_game(0.0);
        game.timer_tick(10.0, 10_000.0);
        assert!(game.audio().cues.is_empty());
    }

    #[test]
    fn test_settings_persist() {
        let mut game = game();
        game.set_settings(Settings {
            reduced_motion: true,
            ..Settings::default()
        });
        let reloaded = Settings::load(game.store());
        assert!(reloaded.reduced_motion);
    }
}
