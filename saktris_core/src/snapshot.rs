//! Single-record game persistence.
//!
//! A [`GameSnapshot`] round-trips the entire game: board occupancy with
//! per-piece moved bits, arrival queues including RNG state, draw-detector
//! history, clock, move log and the touch-recency log (so a loaded game
//! resolves triplet pushers identically). The concrete wire format is
//! whatever serde serializer the host picks; the record layout is stable
//! across minor versions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    arrival::ArrivalManager,
    board::{Board, MoveRecord, Piece, Side, Square, SquareParity},
    clock::Clock,
    draw::DrawDetector,
    game::{ActionState, GameOverReason, GameState, GameStatus, PendingPromotion, TouchLog},
    settings::GameSettings,
};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("unsupported snapshot version {0} (expected {SNAPSHOT_VERSION})")]
    UnsupportedVersion(u32),
}

/// Sparse board serialization: occupied squares only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub pieces: Vec<(Square, Piece)>,
    pub en_passant: Option<Square>,
    pub first_bishop_parity: [Option<SquareParity>; 2],
}

impl BoardSnapshot {
    pub fn capture(board: &Board) -> Self {
        Self {
            pieces: board.pieces().collect(),
            en_passant: board.en_passant_target(),
            first_bishop_parity: [
                board.first_bishop_parity(Side::White),
                board.first_bishop_parity(Side::Black),
            ],
        }
    }

    pub fn restore(&self) -> Board {
        let mut board = Board::new();
        for &(square, piece) in &self.pieces {
            board.put_piece(square, piece);
        }
        board.set_en_passant_target(self.en_passant);
        board.set_first_bishop_parity(Side::White, self.first_bishop_parity[0]);
        board.set_first_bishop_parity(Side::Black, self.first_bishop_parity[1]);
        board
    }
}

/// The full game in one serializable record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub version: u32,
    pub settings: GameSettings,
    /// Redundant with `settings.time_control`, kept for display without
    /// decoding the settings.
    pub time_control_name: Option<String>,
    pub board: BoardSnapshot,
    pub status: GameStatus,
    pub current_player: Side,
    pub move_count: u32,
    pub winner: Option<Side>,
    pub game_over_reason: Option<GameOverReason>,
    pub arrivals: ArrivalManager,
    pub draws: DrawDetector,
    pub clock: Option<Clock>,
    pub history: Vec<MoveRecord>,
    pub history_index: usize,
    pub pending_promotion: Option<PendingPromotion>,
    pub touch: TouchLog,
    pub action: Option<ActionState>,
}

impl GameState {
    /// Captures the complete game state.
    pub fn snapshot(&self) -> GameSnapshot {
        let (settings, board, arrivals, draws, clock, touch, action) = self.parts();

        GameSnapshot {
            version: SNAPSHOT_VERSION,
            settings: *settings,
            time_control_name: settings.time_control.map(|tc| tc.name().to_owned()),
            board: BoardSnapshot::capture(board),
            status: self.status(),
            current_player: self.current_player(),
            move_count: self.move_count(),
            winner: self.winner(),
            game_over_reason: self.game_over_reason(),
            arrivals: arrivals.clone(),
            draws: draws.clone(),
            clock: clock.clone(),
            history: self.history().to_vec(),
            history_index: self.history_index(),
            pending_promotion: self.pending_promotion(),
            touch: self.touch_log().clone(),
            action: action.clone(),
        }
    }

    /// Rebuilds a game from a snapshot. The restored game is behaviourally
    /// indistinguishable from the original: same legal moves, same arrival
    /// order, same AI choices for a fixed seed. The event queue starts empty;
    /// events are notifications, not state.
    pub fn restore(snapshot: GameSnapshot) -> Result<Self, SnapshotError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }

        Ok(GameState::from_parts(
            snapshot.settings,
            snapshot.board.restore(),
            snapshot.arrivals,
            snapshot.draws,
            snapshot.clock,
            snapshot.status,
            snapshot.current_player,
            snapshot.move_count,
            snapshot.history,
            snapshot.history_index,
            snapshot.pending_promotion,
            snapshot.winner,
            snapshot.game_over_reason,
            snapshot.touch,
            snapshot.action,
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::board::PieceKind;
    use crate::settings::{GameMode, TimeControl};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn round_trip(game: &GameState) -> GameState {
        let json = serde_json::to_string(&game.snapshot()).unwrap();
        let snapshot: GameSnapshot = serde_json::from_str(&json).unwrap();
        GameState::restore(snapshot).unwrap()
    }

    #[test]
    fn mid_game_round_trip_is_behaviourally_identical() {
        let mut game = GameState::new(GameSettings {
            time_control: Some(TimeControl::Blitz),
            rng_seed: 11,
            ..GameSettings::default()
        });
        game.try_place_piece(4).unwrap();
        game.try_place_piece(3).unwrap();
        game.try_move(Square::E1, Square::E3).unwrap();
        game.tick(Duration::from_secs(2));
        game.take_events();

        let mut restored = round_trip(&game);

        assert_eq!(restored.board(), game.board());
        assert_eq!(restored.status(), game.status());
        assert_eq!(restored.current_player(), game.current_player());
        assert_eq!(restored.move_count(), game.move_count());
        assert_eq!(restored.history(), game.history());
        assert_eq!(
            restored.clock().map(|c| c.remaining(Side::White)),
            game.clock().map(|c| c.remaining(Side::White))
        );
        assert_eq!(
            restored.arrivals().queue(Side::Black).collect::<Vec<_>>(),
            game.arrivals().queue(Side::Black).collect::<Vec<_>>()
        );

        // Same command, same result on both.
        restored.try_move(Square::D8, Square::D6).unwrap();
        game.try_move(Square::D8, Square::D6).unwrap();
        assert_eq!(restored.board(), game.board());
        assert_eq!(restored.status(), game.status());
    }

    #[test]
    fn pending_promotion_survives_the_round_trip() {
        let mut game = GameState::new(GameSettings {
            rng_seed: 3,
            ..GameSettings::default()
        });
        game.take_events();
        game_board_setup(&mut game);
        game.try_move(Square::A7, Square::A8).unwrap();
        assert!(game.pending_promotion().is_some());

        let mut restored = round_trip(&game);
        assert_eq!(restored.pending_promotion(), game.pending_promotion());

        restored.complete_promotion(PieceKind::Queen).unwrap();
        assert_eq!(
            restored.board().piece_at(Square::A8).map(|p| p.kind()),
            Some(PieceKind::Queen)
        );
    }

    fn game_board_setup(game: &mut GameState) {
        // Direct board access for test setup lives in the game module's
        // tests; here we go through the snapshot itself.
        let mut snapshot = game.snapshot();
        snapshot.board.pieces = vec![
            (Square::A7, Piece::pawn(Side::White).marked_moved()),
            (Square::H1, Piece::king(Side::White).marked_moved()),
            (Square::H8, Piece::king(Side::Black).marked_moved()),
        ];
        *game = GameState::restore(snapshot).unwrap();
    }

    #[test]
    fn action_mode_round_trip_preserves_timers() {
        let mut game = GameState::new(GameSettings {
            game_mode: GameMode::Action,
            rng_seed: 7,
            ..GameSettings::default()
        });
        game.tick(Duration::from_secs(3));
        game.take_events();

        let restored = round_trip(&game);

        assert_eq!(
            restored.action_arrival_timer(),
            game.action_arrival_timer()
        );
        assert_eq!(
            restored.action_cooldown(Side::White),
            game.action_cooldown(Side::White)
        );
        assert_eq!(
            restored.action_next_arrival_side(),
            game.action_next_arrival_side()
        );
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let game = GameState::new(GameSettings::default());
        let mut snapshot = game.snapshot();
        snapshot.version = 999;

        assert_eq!(
            GameState::restore(snapshot).err(),
            Some(SnapshotError::UnsupportedVersion(999))
        );
    }

    #[test]
    fn arrival_rng_state_round_trips() {
        // Two restored copies of the same snapshot must draw identical
        // future queues.
        let game = GameState::new(GameSettings {
            arrival_mode: crate::arrival::ArrivalMode::RandomDifferent,
            rng_seed: 123,
            ..GameSettings::default()
        });

        let a = round_trip(&game);
        let b = round_trip(&game);
        assert_eq!(
            a.arrivals().queue(Side::White).collect::<Vec<_>>(),
            b.arrivals().queue(Side::White).collect::<Vec<_>>()
        );
        assert_eq!(
            a.arrivals().queue(Side::White).collect::<Vec<_>>(),
            game.arrivals().queue(Side::White).collect::<Vec<_>>()
        );
    }
}
