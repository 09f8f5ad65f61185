use crate::board::{BoardStats, Mark, OwnBoard, TargetBoard};
use crate::common::BoardError;
use crate::coord::{self, CoordError};
use crate::fleet::FleetBuilder;
use crate::protocol::{EndReason, GameResult, ShotResult};
use crate::ship::ShipPlacement;

/// Sub-state of an active game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Placing,
    Playing,
}

impl Phase {
    /// Phase named in a `RECONNECT_SUCCESS` payload.
    pub fn from_wire(phase: &str) -> Option<Self> {
        match phase {
            "placing_ships" | "placing" => Some(Phase::Placing),
            "playing" => Some(Phase::Playing),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub from: String,
    pub message: String,
}

/// A `MOVE_RESULT` that could not be applied.
#[derive(Debug, thiserror::Error)]
pub enum ShotError {
    #[error(transparent)]
    Coord(#[from] CoordError),
    #[error("{0}")]
    Board(#[from] BoardError),
}

/// Result of a finished game as shown to the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSummary {
    pub opponent: String,
    pub result: GameResult,
    pub reason: EndReason,
    pub elo: Option<i32>,
}

impl GameSummary {
    pub fn headline(&self) -> String {
        let outcome = match self.result {
            GameResult::Win => "You won",
            GameResult::Lose => "You lost",
            GameResult::Draw => "Draw",
        };
        match self.elo {
            Some(elo) => format!("{}: {} (ELO {})", outcome, self.reason.describe(), elo),
            None => format!("{}: {}", outcome, self.reason.describe()),
        }
    }
}

/// Everything the client tracks about the game in progress.
#[derive(Debug, Clone)]
pub struct GameState {
    opponent: String,
    phase: Phase,
    your_turn: bool,
    fleet: FleetBuilder,
    own: OwnBoard,
    target: TargetBoard,
    placement_submitted: bool,
    placement_confirmed: bool,
    stats: BoardStats,
    chat: Vec<ChatLine>,
    opponent_away: bool,
}

impl GameState {
    /// Fresh game straight after `GAME_START`.
    pub fn new(opponent: impl Into<String>, your_turn: bool) -> Self {
        Self {
            opponent: opponent.into(),
            phase: Phase::Placing,
            your_turn,
            fleet: FleetBuilder::new(),
            own: OwnBoard::new(),
            target: TargetBoard::new(),
            placement_submitted: false,
            placement_confirmed: false,
            stats: BoardStats::default(),
            chat: Vec::new(),
            opponent_away: false,
        }
    }

    /// Game rebuilt after a reconnect. Both boards start empty; the server
    /// replays the own grid separately once play has started, see
    /// [`GameState::restore_own_board`]. Our earlier shots are never replayed.
    pub fn resumed(opponent: impl Into<String>, your_turn: bool, phase: Phase) -> Self {
        let mut game = Self::new(opponent, your_turn);
        game.phase = phase;
        game.placement_submitted = phase == Phase::Playing;
        game.placement_confirmed = phase == Phase::Playing;
        game
    }

    /// Load the own grid replayed in `RECONNECT_SUCCESS`.
    pub fn restore_own_board(&mut self, grid: &[Vec<u8>]) -> Result<(), BoardError> {
        self.own.restore_grid(grid)?;
        self.refresh_stats();
        Ok(())
    }

    pub fn opponent(&self) -> &str {
        &self.opponent
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn your_turn(&self) -> bool {
        self.your_turn
    }

    pub fn fleet(&self) -> &FleetBuilder {
        &self.fleet
    }

    pub fn fleet_mut(&mut self) -> &mut FleetBuilder {
        &mut self.fleet
    }

    pub fn own_board(&self) -> &OwnBoard {
        &self.own
    }

    pub fn target_board(&self) -> &TargetBoard {
        &self.target
    }

    pub fn placement_submitted(&self) -> bool {
        self.placement_submitted
    }

    /// True once the server acknowledged the submitted fleet.
    pub fn placement_confirmed(&self) -> bool {
        self.placement_confirmed
    }

    pub fn stats(&self) -> BoardStats {
        self.stats
    }

    pub fn chat(&self) -> &[ChatLine] {
        &self.chat
    }

    pub fn opponent_away(&self) -> bool {
        self.opponent_away
    }

    /// Copy the completed fleet onto the own board and return what to send.
    /// The server does not echo placements, so the own board is filled
    /// optimistically.
    pub fn submit_placement(&mut self) -> Result<Vec<ShipPlacement>, BoardError> {
        let placements = self.fleet.placements();
        self.own.load_placements(&placements)?;
        self.placement_submitted = true;
        Ok(placements)
    }

    /// The server kept our fleet; it can no longer be reverted.
    pub fn confirm_placement(&mut self) -> bool {
        if !self.placement_submitted {
            return false;
        }
        self.placement_confirmed = true;
        true
    }

    /// Undo an optimistic placement the server refused. The fleet builder
    /// keeps its ships so the player can adjust and resubmit.
    pub fn revert_placement(&mut self) {
        self.own.clear_ships();
        self.placement_submitted = false;
        self.refresh_stats();
    }

    pub fn start_playing(&mut self) {
        self.phase = Phase::Playing;
        self.placement_confirmed = self.placement_submitted;
    }

    pub fn set_turn(&mut self, your_turn: bool) {
        self.your_turn = your_turn;
    }

    /// Record a `MOVE_RESULT`. Returns whether a board changed. The turn flag
    /// is left alone.
    pub fn apply_shot(
        &mut self,
        coord: &str,
        result: ShotResult,
        is_your_shot: Option<bool>,
    ) -> Result<bool, ShotError> {
        let (row, col) = coord::decode(coord)?;
        let mark = match result {
            ShotResult::Hit | ShotResult::AlreadyHit => Mark::Hit,
            ShotResult::Miss => Mark::Miss,
        };
        let changed = if is_your_shot.unwrap_or(true) {
            self.target.mark(row, col, mark)?
        } else {
            self.own.mark(row, col, mark)?
        };
        if changed {
            self.refresh_stats();
        }
        Ok(changed)
    }

    pub fn push_chat(&mut self, from: impl Into<String>, message: impl Into<String>) {
        self.chat.push(ChatLine {
            from: from.into(),
            message: message.into(),
        });
    }

    pub fn set_opponent_away(&mut self, away: bool) {
        self.opponent_away = away;
    }

    fn refresh_stats(&mut self) {
        self.stats = BoardStats::scan(&self.own, &self.target);
    }
}
