//! Wire encoding of board cells.
//!
//! A cell is written as its row letter followed by its column digit, so row 0
//! column 5 is `A5`. The scheme only covers 10×10 boards: rows past `J` or
//! columns past `9` have no encoding.

use crate::config::BOARD_SIZE;

/// Failure to encode or decode a coordinate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordError {
    #[error("cell ({row}, {col}) is outside the board")]
    OutOfRange { row: usize, col: usize },
    #[error("malformed coordinate {0:?}")]
    Malformed(String),
}

/// Encode a (row, col) pair, e.g. `(0, 5)` → `"A5"`.
pub fn encode(row: usize, col: usize) -> Result<String, CoordError> {
    let size = BOARD_SIZE as usize;
    if row >= size || col >= size {
        return Err(CoordError::OutOfRange { row, col });
    }
    let letter = (b'A' + row as u8) as char;
    Ok(format!("{}{}", letter, col))
}

/// Decode a coordinate string back into (row, col).
pub fn decode(coord: &str) -> Result<(usize, usize), CoordError> {
    let bytes = coord.as_bytes();
    if bytes.len() != 2 {
        return Err(CoordError::Malformed(coord.to_string()));
    }
    let size = BOARD_SIZE;
    let (letter, digit) = (bytes[0], bytes[1]);
    if !(b'A'..b'A' + size).contains(&letter) || !(b'0'..b'0' + size).contains(&digit) {
        return Err(CoordError::Malformed(coord.to_string()));
    }
    Ok(((letter - b'A') as usize, (digit - b'0') as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_row_letter_then_column_digit() {
        assert_eq!(encode(0, 5).unwrap(), "A5");
        assert_eq!(encode(9, 0).unwrap(), "J0");
        assert!(encode(10, 0).is_err());
    }

    #[test]
    fn rejects_lowercase_and_long_forms() {
        assert!(decode("a5").is_err());
        assert!(decode("A10").is_err());
        assert!(decode("K1").is_err());
        assert!(decode("").is_err());
    }
}
