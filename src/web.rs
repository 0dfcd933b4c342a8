//! Browser bindings
//!
//! Thin wasm-bindgen wrapper so the JS renderer can drive a `Game` and read
//! snapshots as JSON.

use wasm_bindgen::prelude::*;

use crate::audio::{AudioCue, AudioPort};
use crate::game::Game;
use crate::platform::{KeyValueStore, LocalStore, MemoryStore, now_ms};

/// LocalStorage when available, memory otherwise
enum BrowserStore {
    Local(LocalStore),
    Memory(MemoryStore),
}

impl KeyValueStore for BrowserStore {
    fn get(&self, key: &str) -> Result<Option<String>, crate::persistence::PersistenceError> {
        match self {
            BrowserStore::Local(s) => s.get(key),
            BrowserStore::Memory(s) => s.get(key),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), crate::persistence::PersistenceError> {
        match self {
            BrowserStore::Local(s) => s.set(key, value),
            BrowserStore::Memory(s) => s.set(key, value),
        }
    }

    fn remove(&mut self, key: &str) -> Result<(), crate::persistence::PersistenceError> {
        match self {
            BrowserStore::Local(s) => s.remove(key),
            BrowserStore::Memory(s) => s.remove(key),
        }
    }
}

/// Queues cues for JS to pick up each frame
#[derive(Default)]
struct QueuedAudio {
    queue: Vec<(AudioCue, f32)>,
}

impl AudioPort for QueuedAudio {
    fn play(&mut self, cue: AudioCue, volume: f32) {
        self.queue.push((cue, volume));
    }
}

#[wasm_bindgen(start)]
pub fn wasm_start() {
    console_error_panic_hook::set_once();
    if let Err(e) = console_log::init_with_level(log::Level::Info) {
        web_sys::console::warn_1(&format!("Failed to init logger: {}", e).into());
    }
}

/// Serialize for JS; empty string (and a console error) on failure
fn to_json<T: serde::Serialize>(what: &str, value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(json) => json,
        Err(e) => {
            log::error!("Failed to encode {}: {}", what, e);
            String::new()
        }
    }
}

#[wasm_bindgen]
pub struct WebGame {
    inner: Game<BrowserStore, QueuedAudio>,
}

#[wasm_bindgen]
impl WebGame {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WebGame {
        let store = match LocalStore::open() {
            Some(local) => BrowserStore::Local(local),
            None => {
                log::warn!("LocalStorage unavailable, stats will not persist");
                BrowserStore::Memory(MemoryStore::default())
            }
        };
        let seed = now_ms() as u64;
        WebGame {
            inner: Game::new(seed, store, QueuedAudio::default()),
        }
    }

    #[wasm_bindgen(js_name = startGame)]
    pub fn start_game(&mut self) {
        self.inner.start_game(now_ms());
    }

    #[wasm_bindgen(js_name = tileClick)]
    pub fn tile_click(&mut self, tile_id: u8) {
        self.inner.tile_click(tile_id, now_ms());
    }

    #[wasm_bindgen(js_name = timerTick)]
    pub fn timer_tick(&mut self, delta_secs: f32) {
        self.inner.timer_tick(delta_secs, now_ms());
    }

    /// Milliseconds between `timerTick` calls
    #[wasm_bindgen(js_name = tickIntervalMs)]
    pub fn tick_interval_ms(&self) -> u32 {
        self.inner.settings().tick_interval_ms
    }

    #[wasm_bindgen(js_name = stateJson)]
    pub fn state_json(&self) -> String {
        to_json("state", self.inner.state())
    }

    #[wasm_bindgen(js_name = statsJson)]
    pub fn stats_json(&self) -> String {
        to_json("stats", self.inner.stats())
    }

    /// Last finished session, or empty string
    #[wasm_bindgen(js_name = sessionJson)]
    pub fn session_json(&self) -> String {
        self.inner
            .last_session()
            .map(|s| to_json("session", s))
            .unwrap_or_default()
    }

    /// Drain queued audio cues as "Cue:volume" strings
    #[wasm_bindgen(js_name = drainAudioCues)]
    pub fn drain_audio_cues(&mut self) -> Vec<String> {
        self.inner
            .audio_mut()
            .queue
            .drain(..)
            .map(|(cue, vol)| format!("{:?}:{:.2}", cue, vol))
            .collect()
    }
}

impl Default for WebGame {
    fn default() -> Self {
        Self::new()
    }
}
