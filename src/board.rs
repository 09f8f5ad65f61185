//! Client-side view of the two boards of a game.
//!
//! The own board knows where our ships are and where the opponent has fired.
//! The target board only records the outcome of our own shots. Neither board
//! decides hits: every mark comes from a server `MOVE_RESULT`.

use crate::bitboard::BitBoard;
use crate::common::BoardError;
use crate::config::{BOARD_SIZE, HITS_PER_SHIP_ESTIMATE, NUM_SHIPS};
use crate::ship::{Ship, ShipPlacement};

pub type BB = BitBoard<u128, { BOARD_SIZE as usize }>;

/// A ship positioned on the standard board.
pub type PlacedShip = Ship<u128, { BOARD_SIZE as usize }>;

/// State of a single cell as shown to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Ship,
    Hit,
    Miss,
}

/// Outcome of a shot to record on a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Hit,
    Miss,
}

/// Hit and miss layers shared by both boards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Shots {
    hits: BB,
    misses: BB,
}

impl Shots {
    /// Record a shot. Returns whether the cell changed.
    ///
    /// A hit is final: a later miss never downgrades it and a repeated hit
    /// is a no-op.
    pub fn mark(&mut self, row: usize, col: usize, mark: Mark) -> Result<bool, BoardError> {
        if self.hits.get(row, col)? {
            return Ok(false);
        }
        match mark {
            Mark::Hit => {
                self.misses.clear(row, col)?;
                self.hits.set(row, col)?;
                Ok(true)
            }
            Mark::Miss => {
                if self.misses.get(row, col)? {
                    return Ok(false);
                }
                self.misses.set(row, col)?;
                Ok(true)
            }
        }
    }

    pub fn hits(&self) -> BB {
        self.hits
    }

    pub fn misses(&self) -> BB {
        self.misses
    }

    fn cell(&self, row: usize, col: usize) -> Result<Option<Cell>, BoardError> {
        if self.hits.get(row, col)? {
            Ok(Some(Cell::Hit))
        } else if self.misses.get(row, col)? {
            Ok(Some(Cell::Miss))
        } else {
            Ok(None)
        }
    }
}

/// The player's own board: ship placements plus incoming fire.
#[derive(Debug, Clone, Default)]
pub struct OwnBoard {
    ships: Vec<PlacedShip>,
    ship_map: BB,
    shots: Shots,
}

impl OwnBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that `ship` could be added without touching any placed ship.
    pub fn check_placement(&self, ship: &PlacedShip) -> Result<(), BoardError> {
        self.check_against(ship, None)
    }

    fn check_against(&self, ship: &PlacedShip, skip: Option<usize>) -> Result<(), BoardError> {
        let mut occupied = BB::new();
        for (i, placed) in self.ships.iter().enumerate() {
            if Some(i) == skip {
                continue;
            }
            if placed.ship_type().name() == ship.ship_type().name() {
                return Err(BoardError::ShipAlreadyPlaced);
            }
            occupied |= placed.mask();
        }
        if !(occupied & ship.mask()).is_empty() {
            return Err(BoardError::ShipOverlaps);
        }
        Ok(())
    }

    /// Add a ship. Rejected placements leave the board untouched.
    pub fn place(&mut self, ship: PlacedShip) -> Result<(), BoardError> {
        if self.ships.len() >= NUM_SHIPS {
            return Err(BoardError::FleetComplete);
        }
        self.check_placement(&ship)?;
        self.ship_map |= ship.mask();
        self.ships.push(ship);
        Ok(())
    }

    /// Turn the ship at `index` about its anchor, re-validating bounds and overlap.
    pub fn rotate(&mut self, index: usize) -> Result<(), BoardError> {
        let current = self.ships.get(index).ok_or(BoardError::ShipNotPlaced)?;
        let rotated = current.rotated()?;
        self.check_against(&rotated, Some(index))?;
        self.ships[index] = rotated;
        self.rebuild_ship_map();
        Ok(())
    }

    /// Replace all ships with `placements`. Either every placement is legal and
    /// the board takes them all, or the board is left unchanged.
    pub fn load_placements(&mut self, placements: &[ShipPlacement]) -> Result<(), BoardError> {
        let mut staged = OwnBoard::new();
        for placement in placements {
            staged.place(PlacedShip::from_placement(placement)?)?;
        }
        self.ships = staged.ships;
        self.ship_map = staged.ship_map;
        Ok(())
    }

    /// Replace the whole board with a server-replayed grid of cell codes
    /// (0 empty, 1 ship, 2 hit, 3 miss). Ship identities are not part of the
    /// grid, so only the raw ship map is restored and the ship list stays
    /// empty. The board is unchanged on error.
    pub fn restore_grid(&mut self, grid: &[Vec<u8>]) -> Result<(), BoardError> {
        let mut ship_map = BB::new();
        let mut shots = Shots::default();
        for (r, row) in grid.iter().enumerate() {
            for (c, &code) in row.iter().enumerate() {
                match code {
                    0 => {}
                    1 => ship_map.set(r, c)?,
                    2 => {
                        ship_map.set(r, c)?;
                        shots.mark(r, c, Mark::Hit)?;
                    }
                    3 => {
                        shots.mark(r, c, Mark::Miss)?;
                    }
                    other => return Err(BoardError::UnknownCellCode(other)),
                }
            }
        }
        self.ships.clear();
        self.ship_map = ship_map;
        self.shots = shots;
        Ok(())
    }

    /// Remove every ship, keeping recorded shots.
    pub fn clear_ships(&mut self) {
        self.ships.clear();
        self.ship_map.clear_all();
    }

    fn rebuild_ship_map(&mut self) {
        self.ship_map = self
            .ships
            .iter()
            .fold(BB::new(), |acc, ship| acc | ship.mask());
    }

    pub fn ships(&self) -> &[PlacedShip] {
        &self.ships
    }

    pub fn placements(&self) -> Vec<ShipPlacement> {
        self.ships.iter().map(PlacedShip::to_placement).collect()
    }

    pub fn ship_map(&self) -> BB {
        self.ship_map
    }

    pub fn shots(&self) -> &Shots {
        &self.shots
    }

    /// Record an opponent shot.
    pub fn mark(&mut self, row: usize, col: usize, mark: Mark) -> Result<bool, BoardError> {
        self.shots.mark(row, col, mark)
    }

    pub fn cell(&self, row: usize, col: usize) -> Result<Cell, BoardError> {
        if let Some(cell) = self.shots.cell(row, col)? {
            return Ok(cell);
        }
        if self.ship_map.get(row, col)? {
            Ok(Cell::Ship)
        } else {
            Ok(Cell::Empty)
        }
    }
}

/// The opponent-facing board: outcomes of our own shots only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetBoard {
    shots: Shots,
}

impl TargetBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one of our shots.
    pub fn mark(&mut self, row: usize, col: usize, mark: Mark) -> Result<bool, BoardError> {
        self.shots.mark(row, col, mark)
    }

    pub fn shots(&self) -> &Shots {
        &self.shots
    }

    /// Cells we have not fired at yet.
    pub fn untargeted(&self) -> BB {
        !(self.shots.hits() | self.shots.misses())
    }

    pub fn cell(&self, row: usize, col: usize) -> Result<Cell, BoardError> {
        Ok(self.shots.cell(row, col)?.unwrap_or(Cell::Empty))
    }
}

/// Figures derived from the two boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardStats {
    pub my_hits: usize,
    pub my_misses: usize,
    pub opponent_hits: usize,
    pub opponent_misses: usize,
    /// Estimate only: the client never learns which of its ships went down.
    pub my_ships_remaining: usize,
    /// Estimate only: derived from our cumulative hit count.
    pub opponent_ships_remaining: usize,
}

impl BoardStats {
    /// Scan both boards.
    pub fn scan(own: &OwnBoard, target: &TargetBoard) -> Self {
        let my_hits = target.shots().hits().count_ones();
        let my_misses = target.shots().misses().count_ones();
        let opponent_hits = own.shots().hits().count_ones();
        let opponent_misses = own.shots().misses().count_ones();
        Self {
            my_hits,
            my_misses,
            opponent_hits,
            opponent_misses,
            my_ships_remaining: NUM_SHIPS.saturating_sub(opponent_hits / HITS_PER_SHIP_ESTIMATE),
            opponent_ships_remaining: NUM_SHIPS.saturating_sub(my_hits / HITS_PER_SHIP_ESTIMATE),
        }
    }

    /// Our hit rate in whole percent.
    pub fn my_accuracy(&self) -> u32 {
        accuracy(self.my_hits, self.my_misses)
    }

    /// The opponent's hit rate in whole percent.
    pub fn opponent_accuracy(&self) -> u32 {
        accuracy(self.opponent_hits, self.opponent_misses)
    }
}

impl Default for BoardStats {
    fn default() -> Self {
        Self::scan(&OwnBoard::new(), &TargetBoard::new())
    }
}

fn accuracy(hits: usize, misses: usize) -> u32 {
    let shots = hits + misses;
    if shots == 0 {
        0
    } else {
        ((hits as f64 / shots as f64) * 100.0).round() as u32
    }
}
