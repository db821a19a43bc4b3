//! Rule engine and game-state machine for Saktris, a chess/Tetris hybrid:
//! pieces arrive one at a time from per-side queues and are placed on the
//! owner's back row, three same-side pieces in a line clear and knock a
//! victim off the board, and an optional real-time Action mode replaces
//! turns with per-side cooldowns and automatic placements.
//!
//! This crate is the rules core only: it exposes a narrow command surface on
//! [`game::GameState`] and reports everything observable through
//! [`events::GameEvent`]. Rendering, input and the computer opponent live
//! elsewhere (the companion engine crate drives the AI against this state).

pub mod arrival;
pub mod board;
pub mod clock;
pub mod draw;
pub mod events;
pub mod game;
pub mod settings;
pub mod snapshot;

#[cfg(test)]
pub(crate) mod test_utils;
