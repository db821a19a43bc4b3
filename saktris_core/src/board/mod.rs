//! Board representation, move generation and move execution.

mod castling;
mod move_gen;
mod moves;
mod piece;
mod square;
mod zobrist;

pub use castling::Castling;
pub use move_gen::{MoveVec, PieceMoves, MAX_MOVES};
pub use moves::{ExecutedMove, Move, MoveRecord, UnmakeData};
pub use piece::{InvalidPieceByte, Piece, PieceKind, Side};
pub use square::{ParseSquareError, Square, SquareParity};
pub use zobrist::PositionHash;

use arrayvec::ArrayVec;
use std::fmt::{Display, Write};
use thiserror::Error;

/// Why a move request could not be executed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    #[error("no piece at {0}")]
    NoPieceAt(Square),
    #[error("no legal move from {from} to {to}")]
    NoSuchMove { from: Square, to: Square },
}

/// Why a piece could not be placed on a square.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceError {
    #[error("square {0} is occupied")]
    SquareOccupied(Square),
    #[error("bishop must be placed on the opposite square color to the first bishop")]
    BishopColorRule,
}

/// Why a pending promotion could not be completed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionError {
    #[error("no pawn awaiting promotion at {0}")]
    NoPawnAt(Square),
    #[error("pawns cannot promote to {0:?}")]
    InvalidPiece(PieceKind),
}

/// Three same-side pieces on consecutive squares of a row or column.
///
/// `squares` is ordered by ascending file (horizontal) or ascending rank
/// (vertical).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triplet {
    pub squares: [Square; 3],
    pub horizontal: bool,
}

/// The 8x8 Saktris board.
///
/// A mailbox of 64 optional pieces plus the en passant target and, per side,
/// the square color of the first bishop that side placed (which constrains
/// where later bishops may be placed). Unlike a standard chess board there is
/// no side-to-move here: turn order belongs to the game state, and Action
/// mode moves both sides against the same board without alternation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    squares: [Option<Piece>; 64],
    en_passant_target: Option<Square>,
    first_bishop_parity: [Option<SquareParity>; 2],
}

impl Board {
    /// Creates an empty board. Saktris games start with no pieces; everything
    /// arrives through the queue.
    pub fn new() -> Self {
        Self {
            squares: [None; 64],
            en_passant_target: None,
            first_bishop_parity: [None; 2],
        }
    }

    /// Returns the piece that's on a specific square.
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.squares[square.index()]
    }

    /// Returns an iterator over all the pieces on the board and the squares
    /// they're on, by increasing square index.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        self.squares
            .iter()
            .enumerate()
            .filter_map(|(index, piece)| {
                piece.map(|piece| (Square::from_index_unchecked(index), piece))
            })
    }

    /// Number of pieces the given side has on the board.
    pub fn census(&self, side: Side) -> usize {
        self.pieces().filter(|(_, piece)| piece.side() == side).count()
    }

    /// Puts a piece on a square with no rule checking. Intended for test
    /// setup and snapshot restoration; gameplay placements go through
    /// [`Self::place_piece`].
    pub fn put_piece(&mut self, square: Square, piece: Piece) {
        self.squares[square.index()] = Some(piece);
    }

    /// Removes and returns the piece on a square, if any.
    pub fn remove_piece(&mut self, square: Square) -> Option<Piece> {
        self.squares[square.index()].take()
    }

    pub fn en_passant_target(&self) -> Option<Square> {
        self.en_passant_target
    }

    pub(crate) fn set_en_passant_target(&mut self, target: Option<Square>) {
        self.en_passant_target = target;
    }

    /// The square color of the first bishop this side placed, if any. Later
    /// bishops of the same side must be placed on the opposite color, so each
    /// side ends up with one light-squared and one dark-squared bishop.
    pub fn first_bishop_parity(&self, side: Side) -> Option<SquareParity> {
        self.first_bishop_parity[side.index()]
    }

    pub(crate) fn set_first_bishop_parity(&mut self, side: Side, parity: Option<SquareParity>) {
        self.first_bishop_parity[side.index()] = parity;
    }

    /// Checks whether `piece` may be placed on `square`, reporting why not.
    pub fn check_placement(&self, square: Square, piece: Piece) -> Result<(), PlaceError> {
        if self.piece_at(square).is_some() {
            return Err(PlaceError::SquareOccupied(square));
        }

        if piece.is_bishop() {
            if let Some(first) = self.first_bishop_parity(piece.side()) {
                if square.parity() == first {
                    return Err(PlaceError::BishopColorRule);
                }
            }
        }

        Ok(())
    }

    /// Whether `piece` may be placed on `square`.
    pub fn can_place_piece_at(&self, square: Square, piece: Piece) -> bool {
        self.check_placement(square, piece).is_ok()
    }

    /// Places a piece, enforcing the placement rules and recording the first
    /// bishop color for the side.
    pub fn place_piece(&mut self, square: Square, piece: Piece) -> Result<(), PlaceError> {
        self.check_placement(square, piece)?;

        if piece.is_bishop() && self.first_bishop_parity(piece.side()).is_none() {
            self.first_bishop_parity[piece.side().index()] = Some(square.parity());
        }
        self.put_piece(square, piece);
        Ok(())
    }

    /// Whether placing `piece` on `square` would leave the placing side's
    /// king out of check. Used both to reject placements that ignore a check
    /// and to detect placements that refute an apparent checkmate.
    pub fn placement_escapes_check(&self, square: Square, piece: Piece) -> bool {
        if !self.can_place_piece_at(square, piece) {
            return false;
        }

        let mut scratch = self.clone();
        scratch.put_piece(square, piece);
        !scratch.is_in_check(piece.side())
    }

    /// Generate the pseudo-legal moves for the piece on `from`.
    pub fn pseudo_legal_moves(&self, from: Square) -> PieceMoves {
        let mut out = PieceMoves::new();
        if let Some(piece) = self.piece_at(from) {
            move_gen::generate(self, from, piece, &mut out);
        }
        out
    }

    /// Generate the legal moves for the piece on `from`: the pseudo-legal
    /// moves minus any that leave the piece's own king in check, computed via
    /// a temporary make/undo.
    pub fn legal_moves(&self, from: Square) -> PieceMoves {
        let Some(piece) = self.piece_at(from) else {
            return PieceMoves::new();
        };

        let mut pseudo = PieceMoves::new();
        move_gen::generate(self, from, piece, &mut pseudo);

        let mut scratch = self.clone();
        pseudo
            .into_iter()
            .filter(|&mv| {
                let unmake = scratch.make_move(mv);
                let safe = !scratch.is_in_check(piece.side());
                scratch.undo_move(unmake);
                safe
            })
            .collect()
    }

    /// Generate all legal moves for every piece of the given side.
    pub fn legal_moves_for(&self, side: Side) -> MoveVec {
        let mut out = MoveVec::new();
        for (square, piece) in self.pieces() {
            if piece.side() == side {
                out.extend(self.legal_moves(square));
            }
        }
        out
    }

    /// Whether the given side has at least one legal move.
    pub fn has_any_legal_move(&self, side: Side) -> bool {
        for (square, piece) in self.pieces() {
            if piece.side() == side && !self.legal_moves(square).is_empty() {
                return true;
            }
        }
        false
    }

    /// Make a move on the board without checking its legality, returning the
    /// data needed to undo it. The undo record is owned by the caller and
    /// stackable, which is how the search walks the tree without board
    /// copies.
    pub fn make_move(&mut self, mv: Move) -> UnmakeData {
        let prior_en_passant = self.en_passant_target.take();

        self.squares[mv.from.index()] = None;
        if let Some((square, _)) = mv.captured {
            self.squares[square.index()] = None;
        }

        // Lift the rook before dropping the king so a king landing on the
        // rook's own square (adjacent-rook castle) is not clobbered.
        if let Some((rook_from, _)) = mv.castle_rook {
            self.squares[rook_from.index()] = None;
        }

        let landed = match mv.promotion {
            Some(kind) => Piece::new(mv.side(), kind).marked_moved(),
            None => mv.piece.marked_moved(),
        };
        self.squares[mv.to.index()] = Some(landed);

        if let Some((_, rook_to)) = mv.castle_rook {
            self.squares[rook_to.index()] = Some(Piece::rook(mv.side()).marked_moved());
        }

        self.en_passant_target = mv.skipped_square();

        UnmakeData {
            mv,
            prior_en_passant,
        }
    }

    /// Undo a move previously made with [`Self::make_move`]. Restores the
    /// board, the captured piece (with its original `has_moved` state and
    /// square), and the en passant target exactly.
    pub fn undo_move(&mut self, unmake: UnmakeData) {
        let UnmakeData {
            mv,
            prior_en_passant,
        } = unmake;

        if let Some((_, rook_to)) = mv.castle_rook {
            self.squares[rook_to.index()] = None;
        }

        self.squares[mv.to.index()] = None;
        self.squares[mv.from.index()] = Some(mv.piece);

        if let Some((rook_from, _)) = mv.castle_rook {
            // Castling requires an unmoved rook, so the pre-move rook state is
            // implied.
            self.squares[rook_from.index()] = Some(Piece::rook(mv.side()));
        }

        if let Some((square, piece)) = mv.captured {
            self.squares[square.index()] = Some(piece);
        }

        self.en_passant_target = prior_en_passant;
    }

    /// Find and execute the legal move from `from` to `to`.
    ///
    /// A pawn reaching its promotion rank is left on the board as a pawn and
    /// reported with `needs_promotion`; the game loop holds the turn until
    /// [`Self::promote_pawn`] supplies the piece.
    pub fn execute_move(&mut self, from: Square, to: Square) -> Result<ExecutedMove, MoveError> {
        if self.piece_at(from).is_none() {
            return Err(MoveError::NoPieceAt(from));
        }

        let mv = self
            .legal_moves(from)
            .into_iter()
            .find(|m| m.to == to)
            .ok_or(MoveError::NoSuchMove { from, to })?;

        let needs_promotion = mv.reaches_promotion_rank();
        let captured_king = mv
            .captured
            .and_then(|(_, piece)| piece.is_king().then(|| piece.side()));

        self.make_move(mv);

        Ok(ExecutedMove {
            mv,
            needs_promotion,
            captured_king,
        })
    }

    /// Convert the pawn on `square` into the given kind.
    pub fn promote_pawn(&mut self, square: Square, kind: PieceKind) -> Result<Piece, PromotionError> {
        if !kind.is_valid_promotion() {
            return Err(PromotionError::InvalidPiece(kind));
        }

        match self.piece_at(square) {
            Some(piece) if piece.is_pawn() => {
                let promoted = Piece::new(piece.side(), kind).marked_moved();
                self.put_piece(square, promoted);
                Ok(promoted)
            }
            _ => Err(PromotionError::NoPawnAt(square)),
        }
    }

    /// Finds the king of the given side, if it is on the board.
    pub fn king_square(&self, side: Side) -> Option<Square> {
        self.pieces()
            .find(|(_, piece)| piece.is_king() && piece.side() == side)
            .map(|(square, _)| square)
    }

    /// Whether `by`'s pieces attack `square`.
    pub fn is_square_attacked(&self, square: Square, by: Side) -> bool {
        move_gen::square_attacked_by(self, square, by)
    }

    /// Whether the given side's king is attacked. A side with no king on the
    /// board is not "in check" -- king loss is a terminal condition handled
    /// by the game state.
    pub fn is_in_check(&self, side: Side) -> bool {
        match self.king_square(side) {
            Some(square) => self.is_square_attacked(square, side.flip()),
            None => false,
        }
    }

    /// Castling rights derived from the `has_moved` bits of each side's king
    /// and rooks on their back rank. "Kingside" means a rook on a higher file
    /// than the king.
    pub fn castling_rights(&self) -> Castling {
        let mut rights = Castling::empty();

        for side in [Side::White, Side::Black] {
            let back_rank = side.back_rank();

            let king = self.pieces().find(|(square, piece)| {
                piece.is_king()
                    && piece.side() == side
                    && !piece.has_moved()
                    && square.rank() == back_rank
            });
            let Some((king_square, _)) = king else {
                continue;
            };

            for (square, piece) in self.pieces() {
                if piece.kind() != PieceKind::Rook
                    || piece.side() != side
                    || piece.has_moved()
                    || square.rank() != back_rank
                {
                    continue;
                }

                let flag = match (side, square.file() > king_square.file()) {
                    (Side::White, true) => Castling::WHITE_KINGSIDE,
                    (Side::White, false) => Castling::WHITE_QUEENSIDE,
                    (Side::Black, true) => Castling::BLACK_KINGSIDE,
                    (Side::Black, false) => Castling::BLACK_QUEENSIDE,
                };
                rights |= flag;
            }
        }

        rights
    }

    /// Zobrist-style hash of this position with the given side to move.
    /// Hash-equal positions permit the same set of legal continuations.
    pub fn position_hash(&self, to_move: Side) -> u64 {
        let mut hash = PositionHash::side_to_move(to_move)
            ^ PositionHash::castling(self.castling_rights())
            ^ PositionHash::en_passant(self.en_passant_target);

        for (square, piece) in self.pieces() {
            hash ^= PositionHash::piece(piece, square);
        }

        hash.get()
    }

    /// Checks if the material left on the board cannot deliver mate: bare
    /// kings, king and a single minor piece against a king, or king and
    /// bishop each with same-colored bishops.
    ///
    /// The caller is responsible for suppressing this while arrivals remain;
    /// new material may yet appear.
    pub fn insufficient_material(&self) -> bool {
        let mut knights = 0;
        let mut bishops: [Option<SquareParity>; 2] = [None; 2];
        let mut bishop_counts = [0usize; 2];

        for (square, piece) in self.pieces() {
            match piece.kind() {
                PieceKind::Pawn | PieceKind::Rook | PieceKind::Queen => return false,
                PieceKind::Knight => knights += 1,
                PieceKind::Bishop => {
                    bishops[piece.side().index()] = Some(square.parity());
                    bishop_counts[piece.side().index()] += 1;
                }
                PieceKind::King => {}
            }
        }

        // Only kings and minor pieces are left.
        let minor_count = knights + bishop_counts[0] + bishop_counts[1];

        // Bare kings, or one side has a king plus a single minor piece.
        if minor_count <= 1 {
            return true;
        }

        // King and bishop each, bishops on the same color.
        if minor_count == 2 && bishop_counts[0] == 1 && bishop_counts[1] == 1 {
            return bishops[0] == bishops[1];
        }

        false
    }

    /// Finds every run of three consecutive same-side pieces, on the row and
    /// column through `pos`, that includes `pos`. Returns up to six candidate
    /// triplets; the game layer picks one via move recency.
    pub fn find_triplets_through(&self, pos: Square) -> ArrayVec<Triplet, 6> {
        let mut out = ArrayVec::new();
        let Some(piece) = self.piece_at(pos) else {
            return out;
        };
        let side = piece.side();

        let same_side = |square: Square| {
            self.piece_at(square)
                .is_some_and(|piece| piece.side() == side)
        };

        let (file, rank) = (pos.file(), pos.rank());

        for start in file.saturating_sub(2)..=file.min(5) {
            let squares = [
                Square::new_unchecked(start, rank),
                Square::new_unchecked(start + 1, rank),
                Square::new_unchecked(start + 2, rank),
            ];
            if squares.iter().all(|&square| same_side(square)) {
                out.push(Triplet {
                    squares,
                    horizontal: true,
                });
            }
        }

        for start in rank.saturating_sub(2)..=rank.min(5) {
            let squares = [
                Square::new_unchecked(file, start),
                Square::new_unchecked(file, start + 1),
                Square::new_unchecked(file, start + 2),
            ];
            if squares.iter().all(|&square| same_side(square)) {
                out.push(Triplet {
                    squares,
                    horizontal: false,
                });
            }
        }

        out
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for rank in (0..8).rev() {
            for file in 0..8 {
                let square = Square::new_unchecked(file, rank);
                match self.piece_at(square) {
                    Some(piece) => f.write_char(piece.as_char())?,
                    None => f.write_char('.')?,
                }
            }
            f.write_char('\n')?;
        }
        Ok(())
    }
}
