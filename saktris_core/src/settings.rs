//! Game configuration.
//!
//! Every toggle lives here and is passed into `GameState::new`; there is no
//! process-wide mutable configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::arrival::ArrivalMode;
use crate::board::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    TwoPlayer,
    VsAi,
    /// Real-time: turns are replaced by per-side cooldowns and timed
    /// auto-placements.
    Action,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiDifficulty {
    Easy,
    Medium,
    Hard,
}

/// A clock preset, or a custom base time and increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeControl {
    Bullet,
    Blitz,
    Rapid,
    Classical,
    Custom {
        time: Duration,
        increment: Duration,
    },
}

impl TimeControl {
    pub fn initial_time(self) -> Duration {
        match self {
            TimeControl::Bullet => Duration::from_secs(60),
            TimeControl::Blitz => Duration::from_secs(180),
            TimeControl::Rapid => Duration::from_secs(600),
            TimeControl::Classical => Duration::from_secs(1800),
            TimeControl::Custom { time, .. } => time,
        }
    }

    pub fn increment(self) -> Duration {
        match self {
            TimeControl::Bullet => Duration::ZERO,
            TimeControl::Blitz => Duration::from_secs(2),
            TimeControl::Rapid => Duration::from_secs(5),
            TimeControl::Classical => Duration::from_secs(30),
            TimeControl::Custom { increment, .. } => increment,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TimeControl::Bullet => "bullet",
            TimeControl::Blitz => "blitz",
            TimeControl::Rapid => "rapid",
            TimeControl::Classical => "classical",
            TimeControl::Custom { .. } => "custom",
        }
    }
}

/// Timing parameters for Action mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSettings {
    /// Time a side must wait between its own moves.
    pub move_cooldown: Duration,
    /// Interval between automatic piece arrivals (sides alternate).
    pub arrival_interval: Duration,
    /// Bounds of the AI's reaction delay, sampled uniformly after its
    /// cooldown expires.
    pub ai_reaction_min: Duration,
    pub ai_reaction_max: Duration,
}

impl Default for ActionSettings {
    fn default() -> Self {
        Self {
            move_cooldown: Duration::from_secs(3),
            arrival_interval: Duration::from_secs(8),
            ai_reaction_min: Duration::from_millis(400),
            ai_reaction_max: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    pub game_mode: GameMode,
    pub arrival_mode: ArrivalMode,
    /// Moves a side must make between arrivals. Clamped to at least 1.
    pub arrival_frequency: u32,
    pub time_control: Option<TimeControl>,
    pub use_ai: bool,
    pub ai_side: Side,
    pub ai_difficulty: AiDifficulty,
    pub triplet_clear_enabled: bool,
    pub action: ActionSettings,
    pub rng_seed: u64,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            game_mode: GameMode::TwoPlayer,
            arrival_mode: ArrivalMode::Fixed,
            arrival_frequency: 1,
            time_control: None,
            use_ai: false,
            ai_side: Side::Black,
            ai_difficulty: AiDifficulty::Medium,
            triplet_clear_enabled: true,
            action: ActionSettings::default(),
            rng_seed: 0,
        }
    }
}
