//! Static placement scoring: where the AI drops an arriving piece.

use arrayvec::ArrayVec;
use rand::Rng;
use rand_chacha::ChaCha12Rng;
use saktris_core::board::{Board, Piece, PieceKind, Side, Square};

/// Picks the best column on `side`'s back row for the arriving `kind`, or
/// [`None`] when no legal placement exists (the caller falls through to the
/// move search). Equal-scoring columns are tie-broken with the seeded RNG.
pub fn choose_placement(
    board: &Board,
    side: Side,
    kind: PieceKind,
    rng: &mut ChaCha12Rng,
) -> Option<u8> {
    let piece = Piece::new(side, kind);

    let mut best_score = i64::MIN;
    let mut best: ArrayVec<u8, 8> = ArrayVec::new();

    for column in 0..8u8 {
        let Some(square) = Square::on_back_row(side, column) else {
            continue;
        };
        if !board.can_place_piece_at(square, piece) {
            continue;
        }
        // A placement must not ignore an existing check.
        if !board.placement_escapes_check(square, piece) {
            continue;
        }

        let score = score_column(board, side, kind, square);
        if score > best_score {
            best_score = score;
            best.clear();
            best.push(column);
        } else if score == best_score {
            best.push(column);
        }
    }

    if best.is_empty() {
        None
    } else {
        Some(best[rng.gen_range(0..best.len())])
    }
}

fn score_column(board: &Board, side: Side, kind: PieceKind, square: Square) -> i64 {
    // Twice the distance from the centre file: 1, 3, 5 or 7.
    let edge_distance = (2 * square.file() as i64 - 7).abs();

    let mut score = match kind {
        // Rooks want open edges and corners.
        PieceKind::Rook => (edge_distance - 1) * 5,
        // The king prefers the sheltered middle of the row, but not the
        // very centre files where it blocks development.
        PieceKind::King => match square.file() {
            2..=5 => 15,
            _ => 0,
        },
        // Everything else pulls toward the centre.
        _ => (7 - edge_distance) * 5,
    };

    // Dropping a piece onto an attacked square is asking to lose it.
    if board.is_square_attacked(square, side.flip()) {
        score -= kind.value();
    }

    score
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;

    fn rng() -> ChaCha12Rng {
        ChaCha12Rng::seed_from_u64(42)
    }

    #[test]
    fn knights_prefer_central_columns() {
        let board = Board::new();
        let column = choose_placement(&board, Side::White, PieceKind::Knight, &mut rng()).unwrap();
        assert!((3..=4).contains(&column));
    }

    #[test]
    fn rooks_prefer_the_edges() {
        let board = Board::new();
        let column = choose_placement(&board, Side::White, PieceKind::Rook, &mut rng()).unwrap();
        assert!(column == 0 || column == 7);
    }

    #[test]
    fn attacked_squares_are_penalised() {
        // A black rook rakes the d-file; the queen should go anywhere else.
        let mut board = Board::new();
        board.put_piece(Square::D5, Piece::rook(Side::Black).marked_moved());

        let column = choose_placement(&board, Side::White, PieceKind::Queen, &mut rng()).unwrap();
        assert_ne!(column, 3);
    }

    #[test]
    fn occupied_columns_are_skipped() {
        let mut board = Board::new();
        for file in 0..7 {
            board.put_piece(
                Square::new(file, 0).unwrap(),
                Piece::pawn(Side::White).marked_moved(),
            );
        }

        let column = choose_placement(&board, Side::White, PieceKind::Knight, &mut rng());
        assert_eq!(column, Some(7));
    }

    #[test]
    fn full_back_row_yields_none() {
        let mut board = Board::new();
        for file in 0..8 {
            board.put_piece(
                Square::new(file, 0).unwrap(),
                Piece::pawn(Side::White).marked_moved(),
            );
        }

        assert_eq!(
            choose_placement(&board, Side::White, PieceKind::Knight, &mut rng()),
            None
        );
    }

    #[test]
    fn second_bishop_goes_to_the_opposite_color() {
        let mut board = Board::new();
        // First bishop on c1, a dark square.
        board
            .place_piece(Square::C1, Piece::bishop(Side::White))
            .unwrap();

        let column = choose_placement(&board, Side::White, PieceKind::Bishop, &mut rng()).unwrap();
        let square = Square::on_back_row(Side::White, column).unwrap();
        assert_eq!(square.parity(), Square::C1.parity().flip());
    }

    #[test]
    fn placement_while_in_check_must_block() {
        let mut board = Board::new();
        board.put_piece(Square::A1, Piece::king(Side::White).marked_moved());
        board.put_piece(Square::H1, Piece::rook(Side::Black).marked_moved());

        // Only columns b..g block the rank-one check; column 7 is the rook
        // itself and column 0 the king.
        let column = choose_placement(&board, Side::White, PieceKind::Knight, &mut rng()).unwrap();
        assert!((1..=6).contains(&column));
    }

    #[test]
    fn determinism_under_a_fixed_seed() {
        let board = Board::new();
        let a = choose_placement(&board, Side::White, PieceKind::Pawn, &mut rng());
        let b = choose_placement(&board, Side::White, PieceKind::Pawn, &mut rng());
        assert_eq!(a, b);
    }
}
