use std::{
    fmt::{Debug, Display, Write},
    str::FromStr,
};

use paste::paste;
use seq_macro::seq;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::piece::Side;

/// The color of a board square, used by the bishop placement rule and the
/// insufficient-material test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SquareParity {
    Light,
    Dark,
}

impl SquareParity {
    pub const fn flip(self) -> Self {
        match self {
            SquareParity::Light => SquareParity::Dark,
            SquareParity::Dark => SquareParity::Light,
        }
    }
}

/// Represents a square on the board.
///
/// Internally, represents a square as an integer from 0-63, ordered by
/// increasing file then rank, so that 0 is a1, 1 is b1, 2 is c1... 7 is h1, 8
/// is a2, 9 is b2, etc. Rank 0 is White's back row and rank 7 is Black's.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub struct Square(u8);

impl Square {
    /// Construct a [`Square`] from the provided file and rank.
    ///
    /// Files are numbered 0-7 with 0 being file A and 7 being file H.
    ///
    /// Ranks are numbered 0-7 with 0 being rank 1 and 7 being rank 8.
    ///
    /// Returns [`None`] if either `file` or `rank` are greater than 7.
    pub const fn new(file: u8, rank: u8) -> Option<Self> {
        if file >= 8 || rank >= 8 {
            None
        } else {
            Some(Self(8 * rank + file))
        }
    }

    /// Construct a [`Square`] from the provided file and rank, without
    /// checking that they are valid. The result is truncated to 0-63, so the
    /// square is always valid -- but likely not the one you wanted if the
    /// inputs were out of range.
    pub const fn new_unchecked(file: u8, rank: u8) -> Self {
        Self(rank.overflowing_mul(8).0.overflowing_add(file).0 % 64)
    }

    /// Construct a [`Square`] from the provided [`usize`] index.
    ///
    /// The indexing scheme starts with 0 being a1, 7 being h1, and 63 being
    /// h8. Values outside the range 0-63 will return [`None`].
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < 64 {
            Some(Self(index as _))
        } else {
            None
        }
    }

    /// Construct a [`Square`] from the provided [`usize`] index.
    ///
    /// Values outside the range 0-63 will be truncated to within the range to
    /// produce a valid square.
    pub const fn from_index_unchecked(index: usize) -> Self {
        Self((index % 64) as _)
    }

    /// The square on `side`'s back row at the given column, or [`None`] if
    /// the column is out of range.
    pub const fn on_back_row(side: Side, column: u8) -> Option<Self> {
        Self::new(column, side.back_rank())
    }

    /// Returns the index of this square as a [`u8`].
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Returns the index of this square as a [`usize`].
    pub const fn index(self) -> usize {
        self.0 as _
    }

    /// Returns the file of this square, numbered 0-7 from file A.
    pub const fn file(self) -> u8 {
        self.0 % 8
    }

    /// Returns the rank of this square, numbered 0-7 from rank 1.
    pub const fn rank(self) -> u8 {
        self.0 / 8
    }

    /// The color of this square. a1 is a dark square.
    pub const fn parity(self) -> SquareParity {
        if (self.file() + self.rank()) % 2 == 0 {
            SquareParity::Dark
        } else {
            SquareParity::Light
        }
    }

    /// Returns an iterator over every single square.
    pub fn all() -> impl Iterator<Item = Square> {
        (0..64).map(Square)
    }

    /// Offsets this square by a file and rank delta, returning [`None`] if
    /// the result would leave the board. This is the workhorse of mailbox
    /// move generation: walking a ray is repeated `try_offset` with the same
    /// deltas.
    pub const fn try_offset(self, dfile: i8, drank: i8) -> Option<Self> {
        let file = self.file() as i8 + dfile;
        let rank = self.rank() as i8 + drank;

        if file < 0 || file >= 8 || rank < 0 || rank >= 8 {
            None
        } else {
            Some(Self((rank * 8 + file) as u8))
        }
    }
}

impl Display for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_char((self.file() + b'a') as _)?;
        f.write_char((self.rank() + b'1') as _)
    }
}

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
#[error("invalid square")]
pub struct ParseSquareError;

impl FromStr for Square {
    type Err = ParseSquareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut char_iter = s.chars();
        let file = char_iter.next().ok_or(ParseSquareError)?;
        let rank = char_iter.next().ok_or(ParseSquareError)?;
        if char_iter.next().is_some() {
            return Err(ParseSquareError);
        }

        let file = (file as i32) - ('a' as i32);
        let rank = (rank as i32) - ('1' as i32);
        if (0..8).contains(&file) && (0..8).contains(&rank) {
            Ok(Square::new_unchecked(file as _, rank as _))
        } else {
            Err(ParseSquareError)
        }
    }
}

impl From<Square> for u8 {
    fn from(value: Square) -> Self {
        value.get()
    }
}

impl TryFrom<u8> for Square {
    type Error = ParseSquareError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_index(value as usize).ok_or(ParseSquareError)
    }
}

/// Board square aliases
#[allow(clippy::eq_op, clippy::char_lit_as_u8)]
impl Square {
    seq!(RANK in 1..=8 {
        seq!(FILE in 'A'..='H' {
            paste! {
                pub const [<FILE RANK>]: Square =
                    Square::new_unchecked(FILE as u8 - b'A', RANK - 1);
            }
        });
    });
}

impl Debug for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "{}{}",
            (self.file() + b'A') as char,
            (self.rank() + b'1') as char
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn square_new() {
        assert_eq!(Square::new(7, 5), Some(Square(47)));
        assert_eq!(Square::new(3, 2), Some(Square(19)));
        assert_eq!(Square::new(1, 7), Some(Square(57)));
        assert_eq!(Square::new(0, 6), Some(Square(48)));

        assert_eq!(Square::new(9, 3), None);
        assert_eq!(Square::new(0, 8), None);
        assert_eq!(Square::new(1, 20), None);
        assert_eq!(Square::new(128, 37), None);
    }

    #[test]
    fn square_aliases() {
        assert_eq!(Square::new_unchecked(7, 5), Square::H6);
        assert_eq!(Square::new_unchecked(3, 2), Square::D3);
        assert_eq!(Square::new_unchecked(1, 7), Square::B8);
        assert_eq!(Square::new_unchecked(0, 6), Square::A7);
    }

    #[test]
    fn square_file_and_rank() {
        for file in 0..8 {
            for rank in 0..8 {
                let square = Square::new(file, rank).unwrap();
                assert_eq!(square.file(), file);
                assert_eq!(square.rank(), rank);
            }
        }
    }

    #[test]
    fn square_back_row() {
        assert_eq!(Square::on_back_row(Side::White, 3), Some(Square::D1));
        assert_eq!(Square::on_back_row(Side::Black, 0), Some(Square::A8));
        assert_eq!(Square::on_back_row(Side::White, 8), None);
    }

    #[test]
    fn square_parity() {
        assert_eq!(Square::A1.parity(), SquareParity::Dark);
        assert_eq!(Square::B1.parity(), SquareParity::Light);
        assert_eq!(Square::C1.parity(), SquareParity::Dark);
        assert_eq!(Square::F1.parity(), SquareParity::Light);
        assert_eq!(Square::H8.parity(), SquareParity::Dark);

        for square in Square::all() {
            for (dfile, drank) in [(1i8, 0i8), (0, 1)] {
                if let Some(neighbour) = square.try_offset(dfile, drank) {
                    assert_eq!(square.parity(), neighbour.parity().flip());
                }
            }
        }
    }

    #[test]
    fn square_try_offset() {
        assert_eq!(Square::E4.try_offset(0, 1), Some(Square::E5));
        assert_eq!(Square::A1.try_offset(1, 1), Some(Square::B2));
        assert_eq!(Square::H3.try_offset(-1, 0), Some(Square::G3));
        assert_eq!(Square::F6.try_offset(1, -1), Some(Square::G5));

        assert_eq!(Square::A1.try_offset(-1, 0), None);
        assert_eq!(Square::H6.try_offset(1, 2), None);
        assert_eq!(Square::E8.try_offset(0, 1), None);
    }

    #[test]
    fn square_display() {
        let cases = [
            (Square(17), "b3"),
            (Square(63), "h8"),
            (Square(3), "d1"),
            (Square(46), "g6"),
        ];

        for (square, expected) in cases {
            assert_eq!(format!("{square}"), expected);
        }
    }

    #[test]
    fn square_from_str() {
        assert_eq!("a7".parse::<Square>(), Ok(Square(48)));
        assert_eq!("f2".parse::<Square>(), Ok(Square(13)));

        assert_eq!("".parse::<Square>(), Err(ParseSquareError));
        assert_eq!("x".parse::<Square>(), Err(ParseSquareError));
        assert_eq!("f23".parse::<Square>(), Err(ParseSquareError));
        assert_eq!("a1 ".parse::<Square>(), Err(ParseSquareError));
    }

    #[test]
    fn square_all() {
        let mut expected = Vec::new();
        for rank in 0..8 {
            for file in 0..8 {
                expected.push(Square::new(file, rank).unwrap());
            }
        }

        let all = Square::all().collect::<Vec<_>>();

        assert_eq!(all, expected);
    }
}
