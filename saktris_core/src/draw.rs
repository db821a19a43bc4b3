//! Draw detection: the fifty-move rule, threefold repetition via the position
//! hash, and insufficient material.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::board::{Board, Side};

/// Why a game is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawReason {
    FiftyMoveRule,
    ThreefoldRepetition,
    InsufficientMaterial,
}

/// Tracks repetition counts and the half-move clock.
///
/// Positions are keyed by [`Board::position_hash`], which covers occupancy,
/// side to move, castling rights and the en passant target -- so two
/// positions count as "the same" exactly when they permit the same legal
/// continuations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawDetector {
    positions: HashMap<u64, u32>,
    halfmove_clock: u32,
}

impl DrawDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of half-moves since the last capture or pawn move.
    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    /// Records that a move was completed, resetting the half-move clock on
    /// any capture or pawn move and advancing it otherwise.
    pub fn on_move_made(&mut self, was_capture: bool, was_pawn_move: bool) {
        if was_capture || was_pawn_move {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }
    }

    /// Records the current position (with the given side to move) for
    /// repetition counting, returning how many times it has now occurred.
    pub fn record_position(&mut self, board: &Board, to_move: Side) -> u32 {
        let count = self
            .positions
            .entry(board.position_hash(to_move))
            .or_insert(0);
        *count += 1;
        *count
    }

    /// How many times the current position has been seen.
    pub fn occurrences(&self, board: &Board, to_move: Side) -> u32 {
        self.positions
            .get(&board.position_hash(to_move))
            .copied()
            .unwrap_or(0)
    }

    /// Runs every draw test against the current position.
    ///
    /// `arrivals_pending` suppresses the insufficient-material draw: while
    /// either side still has queue or pool entries or an unplaced current
    /// piece, new material may yet arrive and mate may still be possible.
    pub fn check_all_draws(
        &self,
        board: &Board,
        to_move: Side,
        arrivals_pending: bool,
    ) -> Option<DrawReason> {
        if self.halfmove_clock >= 100 {
            return Some(DrawReason::FiftyMoveRule);
        }

        if self.occurrences(board, to_move) >= 3 {
            return Some(DrawReason::ThreefoldRepetition);
        }

        if !arrivals_pending && board.insufficient_material() {
            return Some(DrawReason::InsufficientMaterial);
        }

        None
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::board::{Piece, Square};
    use pretty_assertions::assert_eq;

    fn kings_board() -> Board {
        let mut board = Board::new();
        board.put_piece(Square::E1, Piece::king(Side::White).marked_moved());
        board.put_piece(Square::E8, Piece::king(Side::Black).marked_moved());
        board
    }

    #[test]
    fn halfmove_clock_resets_on_capture_or_pawn_move() {
        let mut detector = DrawDetector::new();

        detector.on_move_made(false, false);
        detector.on_move_made(false, false);
        assert_eq!(detector.halfmove_clock(), 2);

        detector.on_move_made(true, false);
        assert_eq!(detector.halfmove_clock(), 0);

        detector.on_move_made(false, false);
        detector.on_move_made(false, true);
        assert_eq!(detector.halfmove_clock(), 0);
    }

    #[test]
    fn fifty_move_rule_triggers_at_one_hundred_half_moves() {
        let mut detector = DrawDetector::new();
        let board = kings_board();

        for _ in 0..99 {
            detector.on_move_made(false, false);
        }
        // Suppression flag keeps insufficient material out of the way here.
        assert_eq!(detector.check_all_draws(&board, Side::White, true), None);

        detector.on_move_made(false, false);
        assert_eq!(
            detector.check_all_draws(&board, Side::White, true),
            Some(DrawReason::FiftyMoveRule)
        );
    }

    #[test]
    fn threefold_repetition_counts_identical_positions() {
        let mut detector = DrawDetector::new();
        let board = kings_board();

        detector.record_position(&board, Side::White);
        detector.record_position(&board, Side::White);
        assert_eq!(detector.check_all_draws(&board, Side::White, true), None);

        // The same occupancy with the other side to move is a different
        // position.
        detector.record_position(&board, Side::Black);
        assert_eq!(detector.check_all_draws(&board, Side::White, true), None);

        detector.record_position(&board, Side::White);
        assert_eq!(
            detector.check_all_draws(&board, Side::White, true),
            Some(DrawReason::ThreefoldRepetition)
        );
    }

    #[test]
    fn repetition_distinguishes_en_passant_state() {
        let mut detector = DrawDetector::new();
        let mut board = kings_board();

        board.set_en_passant_target(Some(Square::E3));
        detector.record_position(&board, Side::White);
        detector.record_position(&board, Side::White);

        board.set_en_passant_target(None);
        detector.record_position(&board, Side::White);
        assert_eq!(detector.occurrences(&board, Side::White), 1);
    }

    #[test]
    fn insufficient_material_suppressed_while_arrivals_pending() {
        let detector = DrawDetector::new();
        let board = kings_board();

        assert_eq!(detector.check_all_draws(&board, Side::White, true), None);
        assert_eq!(
            detector.check_all_draws(&board, Side::White, false),
            Some(DrawReason::InsufficientMaterial)
        );
    }

    #[test]
    fn serde_round_trip() {
        let mut detector = DrawDetector::new();
        let board = kings_board();
        detector.record_position(&board, Side::White);
        detector.on_move_made(false, false);

        let json = serde_json::to_string(&detector).unwrap();
        let restored: DrawDetector = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, detector);
    }
}
