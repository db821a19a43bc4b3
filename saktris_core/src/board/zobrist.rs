use std::{
    fmt::Debug,
    ops::{BitXor, BitXorAssign},
    sync::OnceLock,
};

use rand::{RngCore, SeedableRng};

use super::{castling::Castling, piece::Piece, piece::Side, square::Square};

/// A Zobrist-style position hash.
///
/// Covers occupancy (piece side/kind per square -- the moved bit is excluded,
/// it is reflected in the castling rights instead), the side to move, the
/// derived castling rights, and the en passant file. That is exactly the
/// state that determines the set of legal continuations from a position, so
/// hash-equal positions are repetition-equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PositionHash(pub u64);

impl PositionHash {
    pub fn piece(piece: Piece, square: Square) -> Self {
        let instance = ZobristTable::get_instance();
        let index = piece.nibble() as usize;
        Self(instance.pieces[index * 64 + square.index()])
    }

    pub fn side_to_move(side: Side) -> Self {
        let instance = ZobristTable::get_instance();
        match side {
            Side::White => Self(0),
            Side::Black => Self(instance.black),
        }
    }

    pub fn castling(castling: Castling) -> Self {
        let instance = ZobristTable::get_instance();
        let index = castling.bits() as usize;
        Self(instance.castling[index])
    }

    pub fn en_passant(en_passant: Option<Square>) -> Self {
        let instance = ZobristTable::get_instance();
        match en_passant {
            Some(square) => {
                let index = square.file() as usize;
                Self(instance.en_passant[index])
            }
            None => Self(0),
        }
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl BitXor for PositionHash {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self::Output {
        Self(self.0 ^ rhs.0)
    }
}

impl BitXorAssign for PositionHash {
    fn bitxor_assign(&mut self, rhs: Self) {
        *self = *self ^ rhs;
    }
}

impl Debug for PositionHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PositionHash")
            .field(&format_args!("{:#016X}", self.0))
            .finish()
    }
}

struct ZobristTable {
    pieces: [u64; 16 * 64], // piece nibbles fit in a 4-bit integer
    black: u64,
    castling: [u64; 16],
    en_passant: [u64; 8],
}

impl ZobristTable {
    fn new() -> Self {
        let mut rng = rand_chacha::ChaCha12Rng::from_seed([
            0x53, 0x61, 0x6b, 0x74, 0x72, 0x69, 0x73, 0x21, 0x9e, 0x07, 0x44, 0x1c, 0xd2, 0x5a,
            0x86, 0xf3, 0x2b, 0xc9, 0x70, 0x1d, 0xe5, 0x38, 0xaa, 0x04, 0x6f, 0x91, 0x5c, 0xb2,
            0x0e, 0x67, 0xd8, 0x3a,
        ]);

        let mut pieces = [0; 16 * 64];
        pieces.fill_with(|| rng.next_u64());

        let black = rng.next_u64();

        let mut castling = [0; 16];
        castling.fill_with(|| rng.next_u64());

        let mut en_passant = [0; 8];
        en_passant.fill_with(|| rng.next_u64());

        Self {
            pieces,
            black,
            castling,
            en_passant,
        }
    }

    pub fn get_instance() -> &'static Self {
        static INSTANCE: OnceLock<ZobristTable> = OnceLock::new();

        INSTANCE.get_or_init(Self::new)
    }
}
