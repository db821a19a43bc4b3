//! Pseudo-legal move generation.
//!
//! Each piece kind gets its own pure generation function taking the board and
//! a square; [`Board::pseudo_legal_moves`](super::Board::pseudo_legal_moves)
//! dispatches on the piece's kind. Legality filtering (not leaving one's own
//! king in check) is layered on top by the board via make/undo.

use arrayvec::ArrayVec;

use super::{
    moves::Move,
    piece::{Piece, PieceKind, Side},
    square::Square,
    Board,
};

/// Maximum number of moves that could occur in a legal position, used for
/// stack-allocating a vector to hold moves.
pub const MAX_MOVES: usize = 256;

/// Board-wide move list.
pub type MoveVec = ArrayVec<Move, MAX_MOVES>;

/// Move list for a single piece. A queen in the open tops out at 27 moves; a
/// king with both castles at 10.
pub type PieceMoves = ArrayVec<Move, 32>;

const ROOK_DIRS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const BISHOP_DIRS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const KING_DIRS: [(i8, i8); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];
const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

pub(super) fn generate(board: &Board, from: Square, piece: Piece, out: &mut PieceMoves) {
    match piece.kind() {
        PieceKind::Pawn => pawn_moves(board, from, piece, out),
        PieceKind::Knight => knight_moves(board, from, piece, out),
        PieceKind::Bishop => sliding_moves(board, from, piece, &BISHOP_DIRS, out),
        PieceKind::Rook => sliding_moves(board, from, piece, &ROOK_DIRS, out),
        PieceKind::Queen => {
            sliding_moves(board, from, piece, &ROOK_DIRS, out);
            sliding_moves(board, from, piece, &BISHOP_DIRS, out);
        }
        PieceKind::King => king_moves(board, from, piece, out),
    }
}

fn push_quiet(from: Square, to: Square, piece: Piece, out: &mut PieceMoves) {
    out.push(Move::new(from, to, piece));
}

fn push_capture(from: Square, to: Square, piece: Piece, victim: Piece, out: &mut PieceMoves) {
    let mut mv = Move::new(from, to, piece);
    mv.captured = Some((to, victim));
    out.push(mv);
}

fn pawn_moves(board: &Board, from: Square, piece: Piece, out: &mut PieceMoves) {
    let side = piece.side();
    let forward = side.forward();

    // Single push, and the double push for a pawn that has never moved.
    // Arriving pieces are placed on the back row, so the two-step is keyed off
    // the moved bit rather than a fixed starting rank.
    if let Some(one) = from.try_offset(0, forward) {
        if board.piece_at(one).is_none() {
            push_quiet(from, one, piece, out);

            if !piece.has_moved() {
                if let Some(two) = one.try_offset(0, forward) {
                    if board.piece_at(two).is_none() {
                        let mut mv = Move::new(from, two, piece);
                        mv.double_pawn_push = true;
                        out.push(mv);
                    }
                }
            }
        }
    }

    // Diagonal captures, including en passant.
    for dfile in [-1, 1] {
        let Some(to) = from.try_offset(dfile, forward) else {
            continue;
        };

        match board.piece_at(to) {
            Some(victim) if victim.side() != side => push_capture(from, to, piece, victim, out),
            None if board.en_passant_target() == Some(to) => {
                // The captured pawn sits behind the target square.
                let Some(victim_square) = to.try_offset(0, -forward) else {
                    continue;
                };
                match board.piece_at(victim_square) {
                    Some(victim) if victim.is_pawn() && victim.side() != side => {
                        let mut mv = Move::new(from, to, piece);
                        mv.captured = Some((victim_square, victim));
                        out.push(mv);
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }
}

fn knight_moves(board: &Board, from: Square, piece: Piece, out: &mut PieceMoves) {
    for (dfile, drank) in KNIGHT_OFFSETS {
        let Some(to) = from.try_offset(dfile, drank) else {
            continue;
        };

        match board.piece_at(to) {
            None => push_quiet(from, to, piece, out),
            Some(victim) if victim.side() != piece.side() => {
                push_capture(from, to, piece, victim, out)
            }
            Some(_) => {}
        }
    }
}

fn sliding_moves(
    board: &Board,
    from: Square,
    piece: Piece,
    dirs: &[(i8, i8)],
    out: &mut PieceMoves,
) {
    for &(dfile, drank) in dirs {
        let mut current = from;
        while let Some(to) = current.try_offset(dfile, drank) {
            match board.piece_at(to) {
                None => {
                    push_quiet(from, to, piece, out);
                    current = to;
                }
                Some(victim) => {
                    if victim.side() != piece.side() {
                        push_capture(from, to, piece, victim, out);
                    }
                    break;
                }
            }
        }
    }
}

fn king_moves(board: &Board, from: Square, piece: Piece, out: &mut PieceMoves) {
    for (dfile, drank) in KING_DIRS {
        let Some(to) = from.try_offset(dfile, drank) else {
            continue;
        };

        match board.piece_at(to) {
            None => push_quiet(from, to, piece, out),
            Some(victim) if victim.side() != piece.side() => {
                push_capture(from, to, piece, victim, out)
            }
            Some(_) => {}
        }
    }

    castling_moves(board, from, piece, out);
}

/// Castling, generalised to placed pieces: the king and the chosen rook must
/// both be unmoved on their side's back rank, the squares between them empty,
/// and none of the king's transit squares (start, crossed, destination)
/// attacked. The king always moves two files toward the rook and the rook
/// lands on the square the king crossed.
fn castling_moves(board: &Board, from: Square, piece: Piece, out: &mut PieceMoves) {
    let side = piece.side();
    let back_rank = side.back_rank();

    if piece.has_moved() || from.rank() != back_rank {
        return;
    }

    for rook_file in 0..8u8 {
        let rook_square = Square::new_unchecked(rook_file, back_rank);
        let is_castle_rook = matches!(
            board.piece_at(rook_square),
            Some(p) if p.kind() == PieceKind::Rook && p.side() == side && !p.has_moved()
        );
        if !is_castle_rook {
            continue;
        }

        let king_file = from.file() as i8;
        let dir: i8 = if rook_file as i8 > king_file { 1 } else { -1 };

        let king_dest_file = king_file + 2 * dir;
        if !(0..8).contains(&king_dest_file) {
            continue;
        }

        // Squares strictly between king and rook must be empty.
        let mut file = king_file + dir;
        let mut blocked = false;
        while file != rook_file as i8 {
            let square = Square::new_unchecked(file as u8, back_rank);
            if board.piece_at(square).is_some() {
                blocked = true;
                break;
            }
            file += dir;
        }
        if blocked {
            continue;
        }

        // The king's destination must be free (the vacating rook's own square
        // counts as free).
        let king_dest = Square::new_unchecked(king_dest_file as u8, back_rank);
        if king_dest != rook_square && board.piece_at(king_dest).is_some() {
            continue;
        }

        // None of the king's transit squares may be attacked.
        let enemy = side.flip();
        let transit_attacked = (0..=2).any(|step| {
            let square = Square::new_unchecked((king_file + step * dir) as u8, back_rank);
            square_attacked_by(board, square, enemy)
        });
        if transit_attacked {
            continue;
        }

        let rook_dest = Square::new_unchecked((king_file + dir) as u8, back_rank);
        let mut mv = Move::new(from, king_dest, piece);
        mv.castle_rook = Some((rook_square, rook_dest));
        out.push(mv);
    }
}

/// Whether `by`'s pieces attack `square`. Works backwards from the square:
/// knight and king offsets, pawn attack origins, and sliding rays until the
/// first blocker.
pub(super) fn square_attacked_by(board: &Board, square: Square, by: Side) -> bool {
    for (dfile, drank) in KNIGHT_OFFSETS {
        if let Some(origin) = square.try_offset(dfile, drank) {
            if board
                .piece_at(origin)
                .is_some_and(|p| p.side() == by && p.kind() == PieceKind::Knight)
            {
                return true;
            }
        }
    }

    for (dfile, drank) in KING_DIRS {
        if let Some(origin) = square.try_offset(dfile, drank) {
            if board
                .piece_at(origin)
                .is_some_and(|p| p.side() == by && p.kind() == PieceKind::King)
            {
                return true;
            }
        }
    }

    // A pawn of `by` attacks this square from one rank backwards (relative to
    // `by`'s forward direction) on either adjacent file.
    for dfile in [-1, 1] {
        if let Some(origin) = square.try_offset(dfile, -by.forward()) {
            if board
                .piece_at(origin)
                .is_some_and(|p| p.side() == by && p.is_pawn())
            {
                return true;
            }
        }
    }

    for &(dfile, drank) in &ROOK_DIRS {
        if let Some(piece) = first_piece_on_ray(board, square, dfile, drank) {
            if piece.side() == by
                && matches!(piece.kind(), PieceKind::Rook | PieceKind::Queen)
            {
                return true;
            }
        }
    }

    for &(dfile, drank) in &BISHOP_DIRS {
        if let Some(piece) = first_piece_on_ray(board, square, dfile, drank) {
            if piece.side() == by
                && matches!(piece.kind(), PieceKind::Bishop | PieceKind::Queen)
            {
                return true;
            }
        }
    }

    false
}

fn first_piece_on_ray(board: &Board, from: Square, dfile: i8, drank: i8) -> Option<Piece> {
    let mut current = from;
    while let Some(next) = current.try_offset(dfile, drank) {
        if let Some(piece) = board.piece_at(next) {
            return Some(piece);
        }
        current = next;
    }
    None
}
