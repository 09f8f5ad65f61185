//! Placement-phase fleet builder.
//!
//! Ships are placed in catalog order. The builder validates every step against
//! the same rules the own board enforces, so a completed fleet can be loaded
//! into a game without further checks.

use rand::Rng;

use crate::board::{OwnBoard, PlacedShip};
use crate::common::BoardError;
use crate::config::{BOARD_SIZE, NUM_SHIPS, SHIPS};
use crate::ship::{Orientation, ShipPlacement, ShipType};

#[derive(Debug, Clone)]
pub struct FleetBuilder {
    board: OwnBoard,
    orientation: Orientation,
}

impl Default for FleetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FleetBuilder {
    pub fn new() -> Self {
        Self {
            board: OwnBoard::new(),
            orientation: Orientation::Horizontal,
        }
    }

    /// The catalog ship that will be placed next, if any remain.
    pub fn next_ship(&self) -> Option<ShipType> {
        SHIPS.get(self.board.ships().len()).copied()
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Flip the orientation used for the next placement.
    pub fn toggle_orientation(&mut self) -> Orientation {
        self.orientation = self.orientation.toggled();
        self.orientation
    }

    /// Place the next ship anchored at (row, col) in the current orientation.
    pub fn place_next(&mut self, row: usize, col: usize) -> Result<PlacedShip, BoardError> {
        let ship_type = self.next_ship().ok_or(BoardError::FleetComplete)?;
        let ship = PlacedShip::new(ship_type, self.orientation, row, col)?;
        self.board.place(ship)?;
        Ok(ship)
    }

    /// Rotate an already placed ship in place.
    pub fn rotate(&mut self, index: usize) -> Result<(), BoardError> {
        self.board.rotate(index)
    }

    /// Remove every placed ship.
    pub fn reset(&mut self) {
        self.board.clear_ships();
    }

    /// Choose a random legal (row, col, orientation) for `ship_type`.
    pub fn random_placement<R: Rng>(
        &self,
        rng: &mut R,
        ship_type: ShipType,
    ) -> Result<(usize, usize, Orientation), BoardError> {
        let size = BOARD_SIZE as usize;
        for _ in 0..100 {
            let orient = if rng.random() {
                Orientation::Horizontal
            } else {
                Orientation::Vertical
            };
            let (max_r, max_c) = match orient {
                Orientation::Vertical => (size - ship_type.length(), size - 1),
                Orientation::Horizontal => (size - 1, size - ship_type.length()),
            };
            let r = rng.random_range(0..=max_r);
            let c = rng.random_range(0..=max_c);
            let ship = PlacedShip::new(ship_type, orient, r, c)?;
            if self.board.check_placement(&ship).is_ok() {
                return Ok((r, c, orient));
            }
        }
        Err(BoardError::UnableToPlaceShip)
    }

    /// Place every remaining ship at random.
    pub fn auto_place<R: Rng>(&mut self, rng: &mut R) -> Result<(), BoardError> {
        while let Some(ship_type) = self.next_ship() {
            let (r, c, orient) = self.random_placement(rng, ship_type)?;
            self.board.place(PlacedShip::new(ship_type, orient, r, c)?)?;
        }
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.board.ships().len() == NUM_SHIPS
    }

    pub fn board(&self) -> &OwnBoard {
        &self.board
    }

    pub fn placements(&self) -> Vec<ShipPlacement> {
        self.board.placements()
    }
}
