//! Entropy Grid entry point
//!
//! The browser build starts from `entropy_grid::web`; the native binary runs
//! a headless autoplay game and prints the resulting session as JSON.

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use entropy_grid::Game;
    use entropy_grid::audio::CueLog;
    use entropy_grid::platform::MemoryStore;
    use entropy_grid::sim::{GameRng, GameState, Phase, RandomSource, TileColor};

    /// Give up after this much simulated time
    const MAX_SIM_MS: f64 = 30.0 * 60.0 * 1000.0;

    /// Bot that plays the rules it can see and guesses the rest
    struct Autoplayer {
        rng: GameRng,
        /// Simulated time of the next click
        next_click_ms: f64,
    }

    impl Autoplayer {
        fn new(seed: u64) -> Self {
            Self {
                rng: GameRng::new(seed ^ 0x9e37_79b9_7f4a_7c15),
                next_click_ms: 0.0,
            }
        }

        fn schedule(&mut self, now: f64) {
            // 400-3400ms reaction time
            self.next_click_ms = now + 400.0 + f64::from(self.rng.between(0, 3000));
        }

        fn pick_tile(&mut self, state: &GameState) -> u8 {
            let want: Option<TileColor> = match state.phase {
                Phase::Obedience => Some(state.current_instruction),
                Phase::Inversion => Some(state.current_instruction.next()),
                _ => None,
            };
            let candidates: Vec<u8> = state
                .tiles
                .iter()
                .filter(|t| want.is_none_or(|c| t.color == c))
                .map(|t| t.id)
                .collect();
            if candidates.is_empty() {
                return self.rng.below(state.tiles.len().max(1)) as u8;
            }
            candidates[self.rng.below(candidates.len())]
        }
    }

    pub fn run(seed: u64) {
        let mut game = Game::new(seed, MemoryStore::default(), CueLog::default());
        let tick_ms = f64::from(game.settings().tick_interval_ms);
        let tick_secs = game.settings().tick_secs();
        let mut bot = Autoplayer::new(seed);

        let mut now = 0.0;
        game.start_game(now);
        bot.schedule(now);

        while !game.state().is_ended() && now < MAX_SIM_MS {
            now += tick_ms;
            game.timer_tick(tick_secs, now);
            if game.state().is_collapsing() {
                bot.schedule(now);
                continue;
            }
            if now >= bot.next_click_ms && !game.state().is_ended() {
                let tile = bot.pick_tile(game.state());
                game.tile_click(tile, now);
                bot.schedule(now);
            }
        }

        let state = game.state();
        log::info!(
            "Finished after {:.1}s simulated: score {}, phase {}, collapses {}",
            now / 1000.0,
            state.score,
            state.phase.number(),
            state.collapse_count
        );
        log::info!("{} audio cues emitted", game.audio().cues.len());

        match game.last_session() {
            Some(session) => match serde_json::to_string_pretty(session) {
                Ok(json) => println!("{}", json),
                Err(e) => log::error!("Failed to encode session: {}", e),
            },
            None => log::warn!("Game did not finish within {}s", MAX_SIM_MS / 1000.0),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    let seed = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse::<u64>().ok())
        .unwrap_or_else(|| entropy_grid::now_ms() as u64);
    log::info!("Entropy Grid (headless) starting with seed {}", seed);
    headless::run(seed);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is web::wasm_start, this is just to satisfy the compiler
}
