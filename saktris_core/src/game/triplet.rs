//! The triplet-clear rule.
//!
//! After a piece lands on a square, three same-side pieces in a row or
//! column through that square are cleared from the board, and the first
//! piece beyond the leading end of the triple in the push direction is
//! knocked off with them. The push direction is decided by move recency:
//! the most recently touched square of the triple is the leading edge.

use crate::board::{Board, Piece, Square, Triplet};
use crate::events::GameEvent;
use crate::game::{GameOverReason, GameState, GameStatus, TouchLog};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct TripletOutcome {
    pub triple: [Square; 3],
    pub victim: Option<(Square, Piece)>,
    pub direction: (i8, i8),
}

/// Resolves the triplet through `to`, if any. At most one triplet fires per
/// move; when several runs pass through `to`, the one whose squares were
/// touched most recently (greatest maximum stamp, then greatest total) wins.
pub(super) fn resolve_triplet(
    board: &Board,
    touch: &TouchLog,
    to: Square,
) -> Option<TripletOutcome> {
    let candidates = board.find_triplets_through(to);

    let triplet = candidates.into_iter().max_by_key(|triplet| {
        let stamps = triplet
            .squares
            .map(|square| touch.last_touch(square).unwrap_or(0));
        let total: u64 = stamps.iter().sum();
        (stamps.into_iter().max(), total)
    })?;

    let Triplet {
        squares,
        horizontal,
    } = triplet;

    let stamps = squares.map(|square| touch.last_touch(square));

    // The pusher is the square touched last; with no recency information at
    // all, fall back to the landing square itself.
    let pusher = stamps
        .iter()
        .enumerate()
        .filter_map(|(i, stamp)| stamp.map(|s| (i, s)))
        .max_by_key(|&(_, stamp)| stamp)
        .map(|(i, _)| i)
        .unwrap_or_else(|| squares.iter().position(|&s| s == to).unwrap_or(2));

    // The triple slides toward (and past) its leading edge. When the pusher
    // is the middle square, the second most recently touched end becomes the
    // trailing edge instead.
    let towards_positive = match pusher {
        0 => false,
        2 => true,
        _ => {
            let start = stamps[0].unwrap_or(0);
            let end = stamps[2].unwrap_or(0);
            // Push away from the more recently touched end.
            start >= end
        }
    };

    let direction = match (horizontal, towards_positive) {
        (true, true) => (1, 0),
        (true, false) => (-1, 0),
        (false, true) => (0, 1),
        (false, false) => (0, -1),
    };

    let far_end = if towards_positive {
        squares[2]
    } else {
        squares[0]
    };

    // Scan beyond the far end for the victim.
    let mut victim = None;
    let mut current = far_end;
    while let Some(next) = current.try_offset(direction.0, direction.1) {
        if let Some(piece) = board.piece_at(next) {
            victim = Some((next, piece));
            break;
        }
        current = next;
    }

    Some(TripletOutcome {
        triple: squares,
        victim,
        direction,
    })
}

impl GameState {
    /// Detects and executes a triplet-clear at `to`. Returns true when the
    /// clear captured a king and ended the game.
    pub(super) fn run_triplet_clear(&mut self, to: Square) -> bool {
        let Some(outcome) = resolve_triplet(&self.board, &self.touch, to) else {
            return false;
        };

        self.emit(GameEvent::TripletClearing {
            triple: outcome.triple,
            victim: outcome.victim.map(|(square, _)| square),
            direction: outcome.direction,
        });

        for square in outcome.triple {
            self.board.remove_piece(square);
        }

        if let Some((square, piece)) = outcome.victim {
            self.board.remove_piece(square);
            if piece.is_king() {
                self.end_game(
                    GameStatus::Checkmate,
                    Some(piece.side().flip()),
                    GameOverReason::TripletClear,
                );
                return true;
            }
        }

        false
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::board::{PieceKind, Side};
    use crate::settings::GameSettings;
    use pretty_assertions::assert_eq;

    fn game_with_empty_board() -> GameState {
        let mut game = GameState::new(GameSettings {
            rng_seed: 1,
            ..GameSettings::default()
        });
        game.take_events();
        game
    }

    #[test]
    fn triplet_push_captures_a_king() {
        // White pawns on a4, b4, c4 with c4 most recently landed on; the
        // black king sits two squares beyond on e4.
        let mut game = game_with_empty_board();
        game.board.put_piece(Square::A4, Piece::pawn(Side::White).marked_moved());
        game.board.put_piece(Square::B4, Piece::pawn(Side::White).marked_moved());
        game.board.put_piece(Square::C4, Piece::pawn(Side::White).marked_moved());
        game.board.put_piece(Square::E4, Piece::king(Side::Black).marked_moved());
        game.touch.touch(Square::A4);
        game.touch.touch(Square::B4);
        game.touch.touch(Square::C4);

        assert!(game.run_triplet_clear(Square::C4));

        assert_eq!(game.board.piece_at(Square::A4), None);
        assert_eq!(game.board.piece_at(Square::B4), None);
        assert_eq!(game.board.piece_at(Square::C4), None);
        assert_eq!(game.board.piece_at(Square::E4), None);
        assert_eq!(game.status(), GameStatus::Checkmate);
        assert_eq!(game.winner(), Some(Side::White));
        assert_eq!(game.game_over_reason(), Some(GameOverReason::TripletClear));

        let events = game.take_events();
        assert!(events.contains(&GameEvent::TripletClearing {
            triple: [Square::A4, Square::B4, Square::C4],
            victim: Some(Square::E4),
            direction: (1, 0),
        }));
        assert!(events.contains(&GameEvent::GameOver {
            winner: Some(Side::White),
            reason: GameOverReason::TripletClear,
        }));
    }

    #[test]
    fn push_direction_follows_the_pusher() {
        // Same pawns, but a4 was the last square landed on: the triple now
        // slides toward the a-file and off the board edge with no victim.
        let mut game = game_with_empty_board();
        game.board.put_piece(Square::A4, Piece::pawn(Side::White).marked_moved());
        game.board.put_piece(Square::B4, Piece::pawn(Side::White).marked_moved());
        game.board.put_piece(Square::C4, Piece::pawn(Side::White).marked_moved());
        game.board.put_piece(Square::E4, Piece::king(Side::Black).marked_moved());
        game.touch.touch(Square::C4);
        game.touch.touch(Square::B4);
        game.touch.touch(Square::A4);

        let outcome = resolve_triplet(&game.board, &game.touch, Square::A4).unwrap();
        assert_eq!(outcome.direction, (-1, 0));
        assert_eq!(outcome.victim, None);

        assert!(!game.run_triplet_clear(Square::A4));
        // The triple is gone but the bystander king survives.
        assert_eq!(game.board.piece_at(Square::E4).map(|p| p.kind()), Some(PieceKind::King));
        assert_eq!(game.status(), GameStatus::Playing);
    }

    #[test]
    fn middle_pusher_pushes_away_from_second_latest() {
        // The middle square was landed on last; the push goes away from the
        // more recently touched end (c4), i.e. toward the a-file.
        let mut game = game_with_empty_board();
        game.board.put_piece(Square::A4, Piece::pawn(Side::White).marked_moved());
        game.board.put_piece(Square::B4, Piece::pawn(Side::White).marked_moved());
        game.board.put_piece(Square::C4, Piece::pawn(Side::White).marked_moved());
        game.touch.touch(Square::A4);
        game.touch.touch(Square::C4);
        game.touch.touch(Square::B4);

        let outcome = resolve_triplet(&game.board, &game.touch, Square::B4).unwrap();
        assert_eq!(outcome.direction, (-1, 0));
    }

    #[test]
    fn vertical_triplet_scans_along_the_column() {
        let mut game = game_with_empty_board();
        game.board.put_piece(Square::D2, Piece::rook(Side::White).marked_moved());
        game.board.put_piece(Square::D3, Piece::pawn(Side::White).marked_moved());
        game.board.put_piece(Square::D4, Piece::pawn(Side::White).marked_moved());
        game.board.put_piece(Square::D7, Piece::knight(Side::Black).marked_moved());
        game.touch.touch(Square::D2);
        game.touch.touch(Square::D3);
        game.touch.touch(Square::D4);

        let outcome = resolve_triplet(&game.board, &game.touch, Square::D4).unwrap();
        assert_eq!(outcome.direction, (0, 1));
        assert_eq!(
            outcome.victim,
            Some((Square::D7, Piece::knight(Side::Black).marked_moved()))
        );

        assert!(!game.run_triplet_clear(Square::D4));
        assert_eq!(game.board.piece_at(Square::D7), None);
        // A non-king victim does not end the game.
        assert_eq!(game.status(), GameStatus::Playing);
    }

    #[test]
    fn no_triplet_no_effect() {
        let mut game = game_with_empty_board();
        game.board.put_piece(Square::A4, Piece::pawn(Side::White).marked_moved());
        game.board.put_piece(Square::B4, Piece::pawn(Side::White).marked_moved());

        assert!(!game.run_triplet_clear(Square::B4));
        assert!(game.take_events().is_empty());
        assert!(game.board.piece_at(Square::A4).is_some());
    }

    #[test]
    fn triplet_fires_at_the_end_of_a_real_move() {
        // Drive a triplet through the public command surface: white pawns on
        // a4 and b4, a third pawn moves up from c3 to c4.
        let mut game = game_with_empty_board();
        game.board.put_piece(Square::A4, Piece::pawn(Side::White).marked_moved());
        game.board.put_piece(Square::B4, Piece::pawn(Side::White).marked_moved());
        game.board.put_piece(Square::C3, Piece::pawn(Side::White).marked_moved());
        game.board.put_piece(Square::H1, Piece::king(Side::White).marked_moved());
        game.board.put_piece(Square::H8, Piece::king(Side::Black).marked_moved());
        game.touch.touch(Square::A4);
        game.touch.touch(Square::B4);

        game.try_move(Square::C3, Square::C4).unwrap();

        // All three pawns cleared; the push ran toward the c-file's far side.
        assert_eq!(game.board().piece_at(Square::A4), None);
        assert_eq!(game.board().piece_at(Square::B4), None);
        assert_eq!(game.board().piece_at(Square::C4), None);
        assert_eq!(game.current_player(), Side::Black);
    }
}
