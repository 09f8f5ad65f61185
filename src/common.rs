//! Board errors shared by the placement and shot-tracking code.

use crate::bitboard::BitBoardError;

/// Errors returned by board and fleet operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    /// Underlying bitboard error (index outside the grid).
    BitBoardError(BitBoardError),
    /// Named ship not found in the catalog.
    NameNotFound,
    /// Ship size does not match the catalog entry for its name.
    SizeMismatch,
    /// Attempted to place a ship that is already placed.
    ShipAlreadyPlaced,
    /// Referenced ship has not been placed.
    ShipNotPlaced,
    /// Ship placement overlaps another ship.
    ShipOverlaps,
    /// Ship placement is out of bounds.
    ShipOutOfBounds,
    /// Every catalog ship is already on the board.
    FleetComplete,
    /// Random placement gave up.
    UnableToPlaceShip,
    /// A replayed grid held a cell code outside 0..=3.
    UnknownCellCode(u8),
}

impl From<BitBoardError> for BoardError {
    fn from(err: BitBoardError) -> Self {
        BoardError::BitBoardError(err)
    }
}

impl core::fmt::Display for BoardError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BoardError::BitBoardError(e) => write!(f, "BitBoard error: {}", e),
            BoardError::NameNotFound => write!(f, "Ship name not found in configuration"),
            BoardError::SizeMismatch => write!(f, "Ship size does not match its type"),
            BoardError::ShipAlreadyPlaced => write!(f, "Ship is already placed on the board"),
            BoardError::ShipNotPlaced => write!(f, "Ship has not been placed"),
            BoardError::ShipOverlaps => write!(f, "Ship placement overlaps with another ship"),
            BoardError::ShipOutOfBounds => write!(f, "Ship placement is out of bounds"),
            BoardError::FleetComplete => write!(f, "All ships are already placed"),
            BoardError::UnableToPlaceShip => write!(f, "Unable to place ship"),
            BoardError::UnknownCellCode(code) => write!(f, "Unknown cell code {}", code),
        }
    }
}

impl std::error::Error for BoardError {}
