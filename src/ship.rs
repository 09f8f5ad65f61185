//! Ship definitions, orientation and the placement footprint of a ship.

use core::fmt;
use num_traits::{PrimInt, Unsigned, Zero};
use serde::{Deserialize, Serialize};

use crate::bitboard::BitBoard;
use crate::common::BoardError;
use crate::config::ship_type_by_name;

/// Orientation of a ship on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    /// The other orientation.
    pub fn toggled(self) -> Self {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }

    pub fn from_horizontal(horizontal: bool) -> Self {
        if horizontal {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        }
    }

    pub fn is_horizontal(self) -> bool {
        self == Orientation::Horizontal
    }
}

/// Type of ship: name and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShipType {
    name: &'static str,
    length: usize,
}

impl ShipType {
    /// Create a new ship type.
    pub const fn new(name: &'static str, length: usize) -> Self {
        Self { name, length }
    }

    /// Ship's name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Ship's length.
    pub fn length(&self) -> usize {
        self.length
    }
}

/// A ship anchored on an N×N board together with the cells it covers.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ship<T, const N: usize>
where
    T: PrimInt + Unsigned + Zero,
{
    ship_type: ShipType,
    orientation: Orientation,
    row: usize,
    col: usize,
    mask: BitBoard<T, N>,
}

impl<T, const N: usize> Ship<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    /// Anchor a ship at (`row`, `col`) extending right or down.
    /// Fails if any covered cell falls outside the board.
    pub fn new(
        ship_type: ShipType,
        orientation: Orientation,
        row: usize,
        col: usize,
    ) -> Result<Self, BoardError> {
        let len = ship_type.length();
        let fits = match orientation {
            Orientation::Horizontal => row < N && col + len <= N,
            Orientation::Vertical => col < N && row + len <= N,
        };
        if !fits {
            return Err(BoardError::ShipOutOfBounds);
        }

        let mask = BitBoard::<T, N>::from_cells((0..len).map(|i| match orientation {
            Orientation::Horizontal => (row, col + i),
            Orientation::Vertical => (row + i, col),
        }))?;
        Ok(Ship {
            ship_type,
            orientation,
            row,
            col,
            mask,
        })
    }

    /// The same ship turned about its anchor.
    pub fn rotated(&self) -> Result<Self, BoardError> {
        Self::new(self.ship_type, self.orientation.toggled(), self.row, self.col)
    }

    /// Ship's type.
    pub fn ship_type(&self) -> ShipType {
        self.ship_type
    }

    /// Anchor of the ship (row, col).
    pub fn origin(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    /// Orientation of the ship.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Cells covered by the ship.
    pub fn mask(&self) -> BitBoard<T, N> {
        self.mask
    }

    /// Wire form of this placement.
    pub fn to_placement(&self) -> ShipPlacement {
        ShipPlacement {
            name: self.ship_type.name().to_string(),
            size: self.ship_type.length(),
            row: self.row,
            col: self.col,
            horizontal: self.orientation.is_horizontal(),
        }
    }

    /// Rebuild a ship from its wire form, checking the name against the catalog.
    pub fn from_placement(placement: &ShipPlacement) -> Result<Self, BoardError> {
        let ship_type = ship_type_by_name(&placement.name).ok_or(BoardError::NameNotFound)?;
        if ship_type.length() != placement.size {
            return Err(BoardError::SizeMismatch);
        }
        Self::new(
            ship_type,
            Orientation::from_horizontal(placement.horizontal),
            placement.row,
            placement.col,
        )
    }
}

impl<T, const N: usize> fmt::Debug for Ship<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ship {{ name: \"{}\", origin: ({}, {}), orientation: {:?} }}",
            self.ship_type.name(),
            self.row,
            self.col,
            self.orientation,
        )
    }
}

/// A ship placement as it travels in `PLACE_SHIPS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipPlacement {
    pub name: String,
    pub size: usize,
    pub row: usize,
    pub col: usize,
    pub horizontal: bool,
}
