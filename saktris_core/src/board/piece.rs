use std::{
    fmt::{Debug, Display, Write},
    num::NonZeroU8,
};

use num_derive::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Represents the kind of a piece, but not its side.
///
/// Piece kinds are assigned integers 1-6, so that they fit in 3 bits, and also
/// that 0 is unused -- this is so that Rust can optimise [`Option<PieceKind>`]
/// to use the value 0 for [`None`].
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive, Serialize, Deserialize,
)]
pub enum PieceKind {
    Pawn = 1,
    Knight = 2,
    Bishop = 3,
    Rook = 4,
    Queen = 5,
    King = 6,
}

impl PieceKind {
    pub const ALL: [PieceKind; 6] = [
        Self::Pawn,
        Self::Knight,
        Self::Bishop,
        Self::Rook,
        Self::Queen,
        Self::King,
    ];

    /// The full per-side allotment of a Saktris game, in the order pieces
    /// arrive in Fixed mode: the pawn rank first, then the back rank from the
    /// queenside in.
    pub const FULL_SET: [PieceKind; 16] = [
        Self::Pawn,
        Self::Pawn,
        Self::Pawn,
        Self::Pawn,
        Self::Pawn,
        Self::Pawn,
        Self::Pawn,
        Self::Pawn,
        Self::Rook,
        Self::Knight,
        Self::Bishop,
        Self::Queen,
        Self::King,
        Self::Bishop,
        Self::Knight,
        Self::Rook,
    ];

    /// Convenience method for constructing a white [`Piece`].
    pub const fn white(self) -> Piece {
        Piece::new(Side::White, self)
    }

    /// Convenience method for constructing a black [`Piece`].
    pub const fn black(self) -> Piece {
        Piece::new(Side::Black, self)
    }

    /// Convenience method for constructing a [`Piece`] of the supplied
    /// [`Side`].
    pub const fn with_side(self, side: Side) -> Piece {
        Piece::new(side, self)
    }

    /// Standard centipawn value of this piece kind.
    pub const fn value(self) -> i64 {
        match self {
            PieceKind::Pawn => 100,
            PieceKind::Knight => 320,
            PieceKind::Bishop => 330,
            PieceKind::Rook => 500,
            PieceKind::Queen => 900,
            PieceKind::King => 20_000,
        }
    }

    /// Returns true if this kind is a slider (i.e. a bishop, rook, or queen).
    pub const fn is_slider(self) -> bool {
        matches!(self, PieceKind::Bishop | PieceKind::Rook | PieceKind::Queen)
    }

    /// Returns true if a pawn may promote to this kind.
    pub const fn is_valid_promotion(self) -> bool {
        matches!(
            self,
            PieceKind::Knight | PieceKind::Bishop | PieceKind::Rook | PieceKind::Queen
        )
    }

    pub const fn as_uppercase_char(self) -> char {
        match self {
            PieceKind::Pawn => 'P',
            PieceKind::Knight => 'N',
            PieceKind::Bishop => 'B',
            PieceKind::Rook => 'R',
            PieceKind::Queen => 'Q',
            PieceKind::King => 'K',
        }
    }

    pub const fn as_lowercase_char(self) -> char {
        match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        }
    }

    pub const fn try_from_char(c: char) -> Option<Self> {
        Some(match c.to_ascii_uppercase() {
            'P' => PieceKind::Pawn,
            'N' => PieceKind::Knight,
            'B' => PieceKind::Bishop,
            'R' => PieceKind::Rook,
            'Q' => PieceKind::Queen,
            'K' => PieceKind::King,
            _ => return None,
        })
    }

    pub const fn index(self) -> usize {
        self as usize - 1
    }
}

impl From<Piece> for PieceKind {
    fn from(value: Piece) -> Self {
        value.kind()
    }
}

/// Represents a player in a Saktris game (either white or black).
///
/// Uses 0 for white and 8 for black, such that the [`Piece`] representation
/// can simply be formed from a bitwise or of the [`Side`] and [`PieceKind`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    #[default]
    White = 0,
    Black = 8,
}

impl Side {
    /// Returns true if this is [`Side::White`].
    pub const fn is_white(self) -> bool {
        match self {
            Side::White => true,
            Side::Black => false,
        }
    }

    /// Returns true if this is [`Side::Black`].
    pub const fn is_black(self) -> bool {
        !self.is_white()
    }

    /// Inverts the side, i.e. maps [`Side::White`] to [`Side::Black`] and
    /// vice versa.
    pub const fn flip(self) -> Self {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Side::White => 0,
            Side::Black => 1,
        }
    }

    /// The rank on which this side's arriving pieces are placed.
    pub const fn back_rank(self) -> u8 {
        match self {
            Side::White => 0,
            Side::Black => 7,
        }
    }

    /// The rank on which this side's pawns promote.
    pub const fn promotion_rank(self) -> u8 {
        self.flip().back_rank()
    }

    /// Rank delta for "forward" from this side's point of view.
    pub const fn forward(self) -> i8 {
        match self {
            Side::White => 1,
            Side::Black => -1,
        }
    }
}

/// Raised when decoding a byte that is not a valid packed [`Piece`].
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
#[error("invalid piece byte: {0:#04x}")]
pub struct InvalidPieceByte(pub u8);

/// Represents a piece in a Saktris game.
///
/// Internal representation is a 5 bit integer: the low 4 bits are a bitwise-or
/// of the [`Side`] and [`PieceKind`] (as in a classic nibble-packed chess
/// piece), and bit 4 records whether the piece has moved from the square it
/// was placed on. Since [`PieceKind`] can never be 0, Rust can optimise the
/// [`None`] of an [`Option<Piece>`] to be represented by 0.
///
/// The moved bit participates in equality: a rook that has moved is not the
/// same piece state as one that has not, which is exactly the distinction
/// castling and the pawn two-step rule care about.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub struct Piece(NonZeroU8);

const MOVED_BIT: u8 = 0x10;

impl Piece {
    /// Constructs a [`Piece`] from a [`Side`] and a [`PieceKind`], with the
    /// moved bit clear.
    pub const fn new(side: Side, kind: PieceKind) -> Self {
        // Safety: kind as u8 can never be 0
        unsafe { Self(NonZeroU8::new_unchecked(side as u8 | kind as u8)) }
    }

    /// Convenience method for constructing a pawn of the given [`Side`].
    pub const fn pawn(side: Side) -> Self {
        Self::new(side, PieceKind::Pawn)
    }

    /// Convenience method for constructing a knight of the given [`Side`].
    pub const fn knight(side: Side) -> Self {
        Self::new(side, PieceKind::Knight)
    }

    /// Convenience method for constructing a bishop of the given [`Side`].
    pub const fn bishop(side: Side) -> Self {
        Self::new(side, PieceKind::Bishop)
    }

    /// Convenience method for constructing a rook of the given [`Side`].
    pub const fn rook(side: Side) -> Self {
        Self::new(side, PieceKind::Rook)
    }

    /// Convenience method for constructing a queen of the given [`Side`].
    pub const fn queen(side: Side) -> Self {
        Self::new(side, PieceKind::Queen)
    }

    /// Convenience method for constructing a king of the given [`Side`].
    pub const fn king(side: Side) -> Self {
        Self::new(side, PieceKind::King)
    }

    /// Constructs a [`Piece`] from its 5-bit representation.
    ///
    /// `value` is first truncated to 5 bits. If the low nibble does not encode
    /// a valid side/kind combination, [`None`] is returned.
    pub const fn try_from_u8(value: u8) -> Option<Self> {
        let value = value & 0x1F;
        if value & 0x07 == 0 || value & 0x07 == 7 {
            None
        } else {
            // Safety: if value was 0, then value & 0x07 == 0, so we wouldn't
            // get to this branch
            unsafe { Some(Self(NonZeroU8::new_unchecked(value))) }
        }
    }

    /// Returns the [`Side`] of this piece.
    pub const fn side(self) -> Side {
        if self.0.get() & 8 > 0 {
            Side::Black
        } else {
            Side::White
        }
    }

    /// Returns if this piece is white.
    pub const fn is_white(self) -> bool {
        self.side().is_white()
    }

    /// Returns if this piece is black.
    pub const fn is_black(self) -> bool {
        self.side().is_black()
    }

    /// Returns the [`PieceKind`] of this piece.
    pub const fn kind(self) -> PieceKind {
        match self.0.get() & 0x07 {
            1 => PieceKind::Pawn,
            2 => PieceKind::Knight,
            3 => PieceKind::Bishop,
            4 => PieceKind::Rook,
            5 => PieceKind::Queen,
            6 => PieceKind::King,
            // Safety invariant of the representation: the low 3 bits always
            // hold a valid PieceKind.
            _ => unreachable!(),
        }
    }

    pub const fn is_pawn(self) -> bool {
        matches!(self.kind(), PieceKind::Pawn)
    }

    pub const fn is_king(self) -> bool {
        matches!(self.kind(), PieceKind::King)
    }

    pub const fn is_bishop(self) -> bool {
        matches!(self.kind(), PieceKind::Bishop)
    }

    /// Whether this piece has left the square it was placed on at least once.
    pub const fn has_moved(self) -> bool {
        self.0.get() & MOVED_BIT != 0
    }

    /// Returns a copy of this piece with the moved bit set.
    pub const fn marked_moved(self) -> Self {
        // Safety: or-ing a bit into a non-zero value keeps it non-zero
        unsafe { Self(NonZeroU8::new_unchecked(self.0.get() | MOVED_BIT)) }
    }

    /// Returns the internal 5-bit representation of this piece.
    pub const fn get(self) -> u8 {
        self.0.get()
    }

    /// The side/kind nibble of this piece with the moved bit masked off.
    ///
    /// Two pieces with the same nibble are interchangeable for position
    /// hashing and display purposes.
    pub const fn nibble(self) -> u8 {
        self.0.get() & 0x0F
    }

    pub const fn is_slider(self) -> bool {
        self.kind().is_slider()
    }

    pub const fn as_char(self) -> char {
        if self.side().is_white() {
            self.kind().as_uppercase_char()
        } else {
            self.kind().as_lowercase_char()
        }
    }

    pub const fn try_from_char(c: char) -> Option<Self> {
        let kind = match PieceKind::try_from_char(c) {
            Some(kind) => kind,
            None => return None,
        };

        let side = if c.is_ascii_uppercase() {
            Side::White
        } else {
            Side::Black
        };

        Some(Self::new(side, kind))
    }
}

impl From<Piece> for u8 {
    fn from(value: Piece) -> Self {
        value.get()
    }
}

impl TryFrom<u8> for Piece {
    type Error = InvalidPieceByte;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value & !0x1F != 0 {
            return Err(InvalidPieceByte(value));
        }
        Piece::try_from_u8(value).ok_or(InvalidPieceByte(value))
    }
}

impl From<(Side, PieceKind)> for Piece {
    fn from((side, kind): (Side, PieceKind)) -> Self {
        Self::new(side, kind)
    }
}

impl Debug for Piece {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Piece")
            .field("side", &self.side())
            .field("kind", &self.kind())
            .field("has_moved", &self.has_moved())
            .finish()
    }
}

impl Display for Piece {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_char(self.as_char())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    const ALL_SIDES: &[Side] = &[Side::White, Side::Black];

    #[test]
    fn piece_create_and_unpack() {
        for &side in ALL_SIDES {
            for kind in PieceKind::ALL {
                let piece = Piece::new(side, kind);
                assert_eq!(piece.side(), side);
                assert_eq!(piece.kind(), kind);
                assert!(!piece.has_moved());
            }
        }
    }

    #[test]
    fn piece_moved_bit() {
        let pawn = Piece::pawn(Side::White);
        let moved = pawn.marked_moved();

        assert!(!pawn.has_moved());
        assert!(moved.has_moved());
        assert_ne!(pawn, moved);

        // Kind and side survive the marking, and marking is idempotent.
        assert_eq!(moved.kind(), PieceKind::Pawn);
        assert_eq!(moved.side(), Side::White);
        assert_eq!(moved.marked_moved(), moved);
    }

    #[test]
    fn piece_nibble_masks_moved_bit() {
        let rook = Piece::rook(Side::Black);
        assert_eq!(rook.nibble(), rook.marked_moved().nibble());
    }

    #[test]
    fn piece_try_from_u8() {
        for repr in 0u8..=0x1F {
            let piece = Piece::try_from_u8(repr);
            match repr & 0x07 {
                0 | 7 => assert_eq!(piece, None),
                _ => {
                    let piece = piece.unwrap();
                    assert_eq!(piece.get(), repr);
                }
            }
        }

        // Bits above the representation are truncated.
        assert_eq!(
            Piece::try_from_u8(0x20 | 1),
            Some(Piece::pawn(Side::White))
        );
    }

    #[test]
    fn piece_serde_round_trip() {
        for &side in ALL_SIDES {
            for kind in PieceKind::ALL {
                for piece in [Piece::new(side, kind), Piece::new(side, kind).marked_moved()] {
                    let json = serde_json::to_string(&piece).unwrap();
                    let back: Piece = serde_json::from_str(&json).unwrap();
                    assert_eq!(back, piece);
                }
            }
        }

        assert!(serde_json::from_str::<Piece>("0").is_err());
        assert!(serde_json::from_str::<Piece>("7").is_err());
        assert!(serde_json::from_str::<Piece>("255").is_err());
    }

    #[test]
    fn side_flip_and_ranks() {
        assert_eq!(Side::White.flip(), Side::Black);
        assert_eq!(Side::Black.flip(), Side::White);

        assert_eq!(Side::White.back_rank(), 0);
        assert_eq!(Side::Black.back_rank(), 7);
        assert_eq!(Side::White.promotion_rank(), 7);
        assert_eq!(Side::Black.promotion_rank(), 0);

        assert_eq!(Side::White.forward(), 1);
        assert_eq!(Side::Black.forward(), -1);
    }

    #[test]
    fn piece_kind_values() {
        assert_eq!(PieceKind::Pawn.value(), 100);
        assert_eq!(PieceKind::Knight.value(), 320);
        assert_eq!(PieceKind::Bishop.value(), 330);
        assert_eq!(PieceKind::Rook.value(), 500);
        assert_eq!(PieceKind::Queen.value(), 900);
        assert_eq!(PieceKind::King.value(), 20_000);
    }

    #[test]
    fn piece_kind_promotions() {
        assert!(!PieceKind::Pawn.is_valid_promotion());
        assert!(!PieceKind::King.is_valid_promotion());
        for kind in [
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Rook,
            PieceKind::Queen,
        ] {
            assert!(kind.is_valid_promotion());
        }
    }

    #[test]
    fn full_set_composition() {
        let count = |kind| {
            PieceKind::FULL_SET
                .iter()
                .filter(|&&k| k == kind)
                .count()
        };

        assert_eq!(PieceKind::FULL_SET.len(), 16);
        assert_eq!(count(PieceKind::Pawn), 8);
        assert_eq!(count(PieceKind::Knight), 2);
        assert_eq!(count(PieceKind::Bishop), 2);
        assert_eq!(count(PieceKind::Rook), 2);
        assert_eq!(count(PieceKind::Queen), 1);
        assert_eq!(count(PieceKind::King), 1);
    }

    #[test]
    fn piece_display() {
        assert_eq!(format!("{}", Piece::king(Side::White)), "K");
        assert_eq!(format!("{}", Piece::knight(Side::Black)), "n");
        assert_eq!(Piece::try_from_char('q'), Some(Piece::queen(Side::Black)));
        assert_eq!(Piece::try_from_char('x'), None);
    }
}
