//! Phase table and phase derivation
//!
//! Each phase is a rule regime. The current phase is a pure function of
//! entropy: the highest phase whose threshold does not exceed it.

use serde::{Deserialize, Serialize};

/// One of the five rule regimes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Click the instructed color
    Obedience = 1,
    /// A hidden color scores, whatever the instruction says
    HiddenTruth = 2,
    /// The instructed color is now wrong
    Inversion = 3,
    /// Timing and variety are scored instead of color
    Behavior = 4,
    /// Anything goes
    Chaos = 5,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Obedience,
        Phase::HiddenTruth,
        Phase::Inversion,
        Phase::Behavior,
        Phase::Chaos,
    ];

    /// 1-based phase number
    pub fn number(self) -> u8 {
        self as u8
    }

    /// Static configuration for this phase
    pub fn config(self) -> &'static PhaseConfig {
        &PHASE_TABLE[self as usize - 1]
    }
}

/// Render parameters for a phase (opaque to scoring)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualEffects {
    /// Chance (0-1) that a freshly generated tile shakes
    pub shake_chance: f32,
    /// Max tile rotation either way (degrees)
    pub max_rotation_deg: f32,
    /// Max tile drift (pixels)
    pub max_drift_px: f32,
    /// Hue shift intensity (0-1)
    pub color_shift: f32,
    /// Scanline/glitch overlay
    pub glitch: bool,
}

impl VisualEffects {
    pub const CALM: VisualEffects = VisualEffects {
        shake_chance: 0.0,
        max_rotation_deg: 0.0,
        max_drift_px: 0.0,
        color_shift: 0.0,
        glitch: false,
    };
}

/// Static per-phase configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseConfig {
    pub phase: Phase,
    pub name: &'static str,
    /// Minimum entropy for this phase
    pub entropy_threshold: f32,
    /// Round timer (seconds)
    pub timer_duration: f32,
    /// Sanity lost per incorrect click
    pub sanity_drain_rate: f32,
    /// Passed through to the HUD, not applied to score deltas
    pub score_multiplier: f32,
    pub visual_effects: VisualEffects,
}

/// Phase table, ordered by strictly increasing threshold
pub static PHASE_TABLE: [PhaseConfig; 5] = [
    PhaseConfig {
        phase: Phase::Obedience,
        name: "Obedience",
        entropy_threshold: 0.0,
        timer_duration: 5.0,
        sanity_drain_rate: 2.0,
        score_multiplier: 1.0,
        visual_effects: VisualEffects::CALM,
    },
    PhaseConfig {
        phase: Phase::HiddenTruth,
        name: "Hidden Truth",
        entropy_threshold: 25.0,
        timer_duration: 4.5,
        sanity_drain_rate: 3.0,
        score_multiplier: 1.5,
        visual_effects: VisualEffects {
            shake_chance: 0.05,
            max_rotation_deg: 2.0,
            max_drift_px: 0.0,
            color_shift: 0.1,
            glitch: false,
        },
    },
    PhaseConfig {
        phase: Phase::Inversion,
        name: "Inversion",
        entropy_threshold: 50.0,
        timer_duration: 4.0,
        sanity_drain_rate: 4.0,
        score_multiplier: 2.0,
        visual_effects: VisualEffects {
            shake_chance: 0.15,
            max_rotation_deg: 6.0,
            max_drift_px: 2.0,
            color_shift: 0.25,
            glitch: false,
        },
    },
    PhaseConfig {
        phase: Phase::Behavior,
        name: "Behavior",
        entropy_threshold: 75.0,
        timer_duration: 3.5,
        sanity_drain_rate: 5.0,
        score_multiplier: 2.5,
        visual_effects: VisualEffects {
            shake_chance: 0.3,
            max_rotation_deg: 12.0,
            max_drift_px: 5.0,
            color_shift: 0.45,
            glitch: true,
        },
    },
    PhaseConfig {
        phase: Phase::Chaos,
        name: "Chaos",
        entropy_threshold: 90.0,
        timer_duration: 3.0,
        sanity_drain_rate: 6.0,
        score_multiplier: 3.0,
        visual_effects: VisualEffects {
            shake_chance: 0.6,
            max_rotation_deg: 25.0,
            max_drift_px: 10.0,
            color_shift: 0.8,
            glitch: true,
        },
    },
];

/// Highest phase whose threshold is <= entropy (phase 1 always matches)
pub fn phase_of(entropy: f32) -> Phase {
    PHASE_TABLE
        .iter()
        .rev()
        .find(|cfg| cfg.entropy_threshold <= entropy)
        .map(|cfg| cfg.phase)
        .unwrap_or(Phase::Obedience)
}
