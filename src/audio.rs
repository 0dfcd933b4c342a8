//! Audio cue port
//!
//! The game never synthesizes sound itself. It maps simulation events to
//! cues and hands them to whatever `AudioPort` the host injected.

use crate::sim::{GameEvent, Phase};

/// Sound cue types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCue {
    /// Click scored positively
    Correct,
    /// Click scored zero or negative
    Wrong,
    /// Rules changed
    PhaseShift(Phase),
    /// Round timer expired
    Timeout,
    /// Entropy saturated
    CollapseStart,
    /// World rebuilt after a collapse
    CollapseEnd,
    GameWon,
    GameLost,
}

/// Host-provided sink for audio cues
pub trait AudioPort {
    fn play(&mut self, cue: AudioCue, volume: f32);
}

/// Discards every cue
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudio;

impl AudioPort for NullAudio {
    fn play(&mut self, _cue: AudioCue, _volume: f32) {}
}

/// Records cues (headless runs and tests)
#[derive(Debug, Default, Clone)]
pub struct CueLog {
    pub cues: Vec<AudioCue>,
}

impl AudioPort for CueLog {
    fn play(&mut self, cue: AudioCue, _volume: f32) {
        self.cues.push(cue);
    }
}

/// Cue for a simulation event, if it has one
pub fn cue_for(event: &GameEvent) -> Option<AudioCue> {
    match event {
        GameEvent::GameStarted { .. } => None,
        GameEvent::ClickScored { was_correct, .. } => Some(if *was_correct {
            AudioCue::Correct
        } else {
            AudioCue::Wrong
        }),
        GameEvent::PhaseChanged { to, .. } => Some(AudioCue::PhaseShift(*to)),
        GameEvent::TimeRanOut => Some(AudioCue::Timeout),
        GameEvent::CollapseStarted { .. } => Some(AudioCue::CollapseStart),
        GameEvent::CollapseCompleted { .. } => Some(AudioCue::CollapseEnd),
        GameEvent::GameEnded { outcome } => Some(if outcome.won {
            AudioCue::GameWon
        } else {
            AudioCue::GameLost
        }),
    }
}
