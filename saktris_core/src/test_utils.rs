use std::fmt::Debug;

use pretty_assertions::assert_eq;

use crate::board::{Board, Piece, Square};

pub fn assert_in_any_order<T: Eq + Ord + Debug>(
    values: impl IntoIterator<Item = T>,
    expected: impl IntoIterator<Item = T>,
) {
    let mut values = values.into_iter().collect::<Vec<_>>();
    values.sort();

    let mut expected = expected.into_iter().collect::<Vec<_>>();
    expected.sort();

    assert_eq!(values, expected);
}

/// Builds a board from an ASCII diagram for test setup.
///
/// Eight newline-separated rows of eight characters, top row being rank 8.
/// Uppercase letters are white pieces, lowercase black, `.` is an empty
/// square. Every piece is created with its moved bit set, so diagrams behave
/// like mid-game positions (no surprise double-steps or castling); tests that
/// depend on unmoved pieces or the bishop placement state set those up with
/// [`Board::put_piece`] / [`Board::place_piece`] directly.
pub fn board_from_art(art: &str) -> Board {
    let mut board = Board::new();

    let rows: Vec<&str> = art.lines().map(str::trim).collect();
    assert_eq!(rows.len(), 8, "board art must have 8 rows");

    for (row_index, row) in rows.iter().enumerate() {
        assert_eq!(row.chars().count(), 8, "board art rows must have 8 squares");
        let rank = 7 - row_index as u8;

        for (file, c) in row.chars().enumerate() {
            if c == '.' {
                continue;
            }
            let piece = Piece::try_from_char(c)
                .unwrap_or_else(|| panic!("invalid piece char {c:?} in board art"));
            board.put_piece(
                Square::new(file as u8, rank).unwrap(),
                piece.marked_moved(),
            );
        }
    }

    board
}
