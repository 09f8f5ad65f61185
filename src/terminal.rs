//! Line-oriented front-end for playing from a terminal.

use std::fmt::Write as _;

use log::warn;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{sleep, Duration};

use crate::board::{Cell, OwnBoard, TargetBoard};
use crate::client_node::{ClientError, ClientNode};
use crate::common::BoardError;
use crate::config::BOARD_SIZE;
use crate::protocol::PlayerStatus;
use crate::session::{Action, GameState, NoticeLevel, Overlay, Phase, SessionMachine, Stage};
use crate::store::SessionStore;
use crate::transport::WsTransport;

const RELINK_ATTEMPTS: u32 = 5;
const RELINK_DELAY: Duration = Duration::from_secs(2);

pub const HELP: &str = "\
Commands:
  login <user> <password>     register <user> <password>     logout
  players | leaderboard | history
  challenge <user>            search | cancel
  accept | reject             answer the prompt on top
  place <coord>               e.g. place A0 (next ship in catalog order)
  turn                        toggle orientation for the next ship
  rotate <n>                  rotate placed ship n (0-based)
  reset | auto | confirm      fleet editing
  fire <coord>                e.g. fire B7
  chat <text>                 surrender | draw
  reconnect | dismiss | board | help | quit";

/// One parsed line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Act(Action),
    /// Accept or reject whatever prompt is on top.
    Answer(bool),
    Show,
    Help,
    Quit,
}

/// Parse a command line. Errors are messages for the player.
pub fn parse_command(line: &str) -> Result<Option<Input>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let mut arg = |name: &str| {
        words
            .next()
            .map(str::to_string)
            .ok_or_else(|| format!("missing {name}"))
    };

    let input = match verb.to_ascii_lowercase().as_str() {
        "login" => Input::Act(Action::Login {
            username: arg("username")?,
            password: arg("password")?,
        }),
        "register" => Input::Act(Action::Register {
            username: arg("username")?,
            password: arg("password")?,
        }),
        "logout" => Input::Act(Action::Logout),
        "players" => Input::Act(Action::RefreshPlayers),
        "leaderboard" => Input::Act(Action::RefreshLeaderboard),
        "history" => Input::Act(Action::RefreshHistory),
        "challenge" => Input::Act(Action::Challenge {
            target: arg("username")?,
        }),
        "accept" | "yes" => Input::Answer(true),
        "reject" | "no" => Input::Answer(false),
        "place" => Input::Act(Action::PlaceShip {
            coord: arg("coordinate")?.to_ascii_uppercase(),
        }),
        "turn" => Input::Act(Action::ToggleOrientation),
        "rotate" => {
            let index = arg("ship number")?;
            let index = index
                .parse()
                .map_err(|_| format!("{index:?} is not a ship number"))?;
            Input::Act(Action::RotateShip { index })
        }
        "reset" => Input::Act(Action::ResetFleet),
        "auto" => Input::Act(Action::AutoPlace),
        "confirm" => Input::Act(Action::ConfirmShips),
        "fire" => Input::Act(Action::Fire {
            coord: arg("coordinate")?.to_ascii_uppercase(),
        }),
        "chat" => {
            let message = line.trim_start()[verb.len()..].trim().to_string();
            Input::Act(Action::Chat { message })
        }
        "surrender" => Input::Act(Action::Surrender),
        "draw" => Input::Act(Action::OfferDraw),
        "search" => Input::Act(Action::StartMatching),
        "cancel" => Input::Act(Action::CancelMatching),
        "ready" => Input::Act(Action::MatchReady),
        "decline" => Input::Act(Action::MatchDecline),
        "reconnect" => Input::Act(Action::Reconnect),
        "dismiss" => Input::Act(Action::DismissNotice),
        "board" | "show" => Input::Show,
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => return Err(format!("unknown command {other:?}, try `help`")),
    };
    Ok(Some(input))
}

/// Turn accept/reject into the action for the prompt on top.
pub fn resolve_answer(machine: &SessionMachine, accept: bool) -> Option<Action> {
    match machine.top_overlay()? {
        Overlay::DrawOffer { .. } => Some(Action::AnswerDraw { accept }),
        Overlay::MatchFound(offer) if accept && offer.self_ready => None,
        Overlay::MatchFound(_) if accept => Some(Action::MatchReady),
        Overlay::MatchFound(_) => Some(Action::MatchDecline),
        Overlay::Challenge { .. } => Some(Action::AnswerChallenge { accept }),
        Overlay::Notice(_) => Some(Action::DismissNotice),
    }
}

fn header() -> String {
    let mut out = String::from("  ");
    for c in 0..BOARD_SIZE as usize {
        let _ = write!(out, " {}", c);
    }
    out
}

fn render_grid(cell: impl Fn(usize, usize) -> Result<Cell, BoardError>) -> String {
    let mut out = header();
    for r in 0..BOARD_SIZE as usize {
        let _ = write!(out, "\n{} ", (b'A' + r as u8) as char);
        for c in 0..BOARD_SIZE as usize {
            let ch = match cell(r, c).unwrap_or(Cell::Empty) {
                Cell::Hit => 'X',
                Cell::Miss => 'o',
                Cell::Ship => 'S',
                Cell::Empty => '.',
            };
            let _ = write!(out, " {}", ch);
        }
    }
    out
}

pub fn render_own(board: &OwnBoard) -> String {
    render_grid(|r, c| board.cell(r, c))
}

pub fn render_target(board: &TargetBoard) -> String {
    render_grid(|r, c| board.cell(r, c))
}

fn render_game(game: &GameState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Game vs {}", game.opponent());
    match game.phase() {
        Phase::Placing => {
            let fleet = game.fleet();
            let board = if game.placement_submitted() {
                game.own_board()
            } else {
                fleet.board()
            };
            let _ = writeln!(out, "{}", render_own(board));
            match fleet.next_ship() {
                _ if game.placement_submitted() => {
                    let _ = writeln!(out, "Ships submitted, waiting for the opponent");
                }
                Some(ship) => {
                    let _ = writeln!(
                        out,
                        "Next: {} (length {}), {:?}",
                        ship.name(),
                        ship.length(),
                        fleet.orientation()
                    );
                }
                None => {
                    let _ = writeln!(out, "Fleet complete, `confirm` to submit");
                }
            }
        }
        Phase::Playing => {
            let stats = game.stats();
            let _ = writeln!(out, "Opponent board:\n{}", render_target(game.target_board()));
            let _ = writeln!(out, "\nYour board:\n{}", render_own(game.own_board()));
            let _ = writeln!(
                out,
                "\nShots {}/{} ({}%), ships left ~{}   Incoming {}/{} ({}%), yours left ~{}",
                stats.my_hits,
                stats.my_hits + stats.my_misses,
                stats.my_accuracy(),
                stats.opponent_ships_remaining,
                stats.opponent_hits,
                stats.opponent_hits + stats.opponent_misses,
                stats.opponent_accuracy(),
                stats.my_ships_remaining,
            );
            let turn = if game.your_turn() { "Your turn" } else { "Opponent's turn" };
            let _ = writeln!(out, "{}", turn);
        }
    }
    if game.opponent_away() {
        let _ = writeln!(out, "(opponent disconnected)");
    }
    for line in game.chat().iter().rev().take(5).rev() {
        let _ = writeln!(out, "<{}> {}", line.from, line.message);
    }
    out
}

/// Full view of the session.
pub fn render_screen(machine: &SessionMachine) -> String {
    let mut out = String::new();
    let link = if machine.bridge_live() { "online" } else { "offline" };
    match (machine.stage(), machine.identity()) {
        (Stage::Unauthenticated, _) => {
            let _ = writeln!(out, "[{link}] not logged in");
        }
        (_, Some(identity)) => {
            let _ = writeln!(out, "[{link}] {} (ELO {})", identity.username, identity.elo);
        }
        (_, None) => {
            let _ = writeln!(out, "[{link}]");
        }
    }

    if let Some(game) = machine.game() {
        out.push_str(&render_game(game));
    } else if machine.stage() == Stage::Lobby {
        let lobby = machine.lobby();
        if machine.negotiations().searching() {
            let _ = writeln!(out, "Searching for an opponent...");
        }
        for player in &lobby.players {
            let status = match &player.status {
                PlayerStatus::Code(code) => code.to_string(),
                PlayerStatus::Label(label) => label.clone(),
            };
            let _ = writeln!(out, "  {:<16} {:>5}  {}", player.username, player.elo, status);
        }
        for entry in &lobby.leaderboard {
            let _ = writeln!(
                out,
                "  #{:<3} {:<16} {:>5}  {}/{} ({:.1}%)",
                entry.rank, entry.username, entry.elo, entry.wins, entry.games, entry.winrate
            );
        }
        for record in &lobby.history {
            let _ = writeln!(out, "  {:?} vs {}", record.result, record.opponent);
        }
        if let Some(summary) = machine.last_summary() {
            let _ = writeln!(out, "Last game: {}", summary.headline());
        }
    }

    match machine.top_overlay() {
        Some(Overlay::DrawOffer { from }) => {
            let _ = writeln!(out, ">> {from} offers a draw (accept/reject)");
        }
        Some(Overlay::MatchFound(offer)) if offer.self_ready => {
            let _ = writeln!(
                out,
                ">> Match found: {} (ELO {}) waiting for opponent, opponent {} (reject to decline)",
                offer.opponent,
                offer.elo,
                ready_word(offer.opponent_ready),
            );
        }
        Some(Overlay::MatchFound(offer)) => {
            let _ = writeln!(
                out,
                ">> Match found: {} (ELO {}) you {}, opponent {} (accept/reject)",
                offer.opponent,
                offer.elo,
                ready_word(offer.self_ready),
                ready_word(offer.opponent_ready),
            );
        }
        Some(Overlay::Challenge { challenger }) => {
            let _ = writeln!(out, ">> {challenger} challenges you (accept/reject)");
        }
        Some(Overlay::Notice(_)) | None => {}
    }
    out
}

fn ready_word(ready: bool) -> &'static str {
    if ready {
        "ready"
    } else {
        "not ready"
    }
}

fn print_notices<S: SessionStore>(node: &mut ClientNode<S>) {
    for notice in node.take_notices() {
        let tag = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warn",
            NoticeLevel::Error => "error",
        };
        println!("[{tag}] {}", notice.text);
    }
}

/// Reopen the bridge link after it ended. `false` once every attempt failed.
async fn relink<S: SessionStore>(node: &mut ClientNode<S>, relay_url: &str) -> bool {
    for attempt in 1..=RELINK_ATTEMPTS {
        sleep(RELINK_DELAY).await;
        println!("Reconnecting to {relay_url} ({attempt}/{RELINK_ATTEMPTS})");
        match WsTransport::connect(relay_url).await {
            Ok(transport) => {
                node.replace_transport(Box::new(transport));
                return true;
            }
            Err(e) => warn!("[terminal] reconnect attempt {} failed: {}", attempt, e),
        }
    }
    false
}

/// Drive `node` from stdin until the player quits or the bridge stays unreachable.
pub async fn run<S: SessionStore>(node: &mut ClientNode<S>, relay_url: &str) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{HELP}");

    loop {
        tokio::select! {
            event = node.next_event() => match event? {
                Some(event) => {
                    node.handle(event).await?;
                    print_notices(node);
                    print!("{}", render_screen(node.machine()));
                }
                None => {
                    node.link_closed().await?;
                    print_notices(node);
                    println!("Connection to the bridge closed");
                    if !relink(node, relay_url).await {
                        println!("Bridge unreachable, giving up");
                        return Ok(());
                    }
                }
            },
            line = lines.next_line() => {
                let Some(line) = line? else {
                    return Ok(());
                };
                let action = match parse_command(&line) {
                    Ok(None) => continue,
                    Ok(Some(Input::Quit)) => return Ok(()),
                    Ok(Some(Input::Help)) => {
                        println!("{HELP}");
                        continue;
                    }
                    Ok(Some(Input::Show)) => {
                        print!("{}", render_screen(node.machine()));
                        continue;
                    }
                    Ok(Some(Input::Answer(accept))) => match resolve_answer(node.machine(), accept) {
                        Some(action) => action,
                        None => {
                            println!("Nothing to answer");
                            continue;
                        }
                    },
                    Ok(Some(Input::Act(action))) => action,
                    Err(message) => {
                        println!("{message}");
                        continue;
                    }
                };
                match node.perform(action).await {
                    Ok(()) => {}
                    Err(ClientError::Action(e)) => println!("[error] {e}"),
                    Err(ClientError::Link(e)) => return Err(e),
                }
                print_notices(node);
                print!("{}", render_screen(node.machine()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_coordinates_and_free_text() {
        assert_eq!(
            parse_command("fire b7").unwrap(),
            Some(Input::Act(Action::Fire {
                coord: "B7".to_string()
            }))
        );
        assert_eq!(
            parse_command("chat good  luck ").unwrap(),
            Some(Input::Act(Action::Chat {
                message: "good  luck".to_string()
            }))
        );
        assert_eq!(parse_command("   ").unwrap(), None);
        assert!(parse_command("login alice").is_err());
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn ready_match_has_nothing_to_accept() {
        let mut machine = SessionMachine::new(None);
        machine.handle_relay(crate::protocol::RelayEvent::connected());
        machine.handle_relay(crate::protocol::RelayEvent::ServerMessage(serde_json::json!({
            "cmd": "LOGIN_SUCCESS", "payload": {"username": "alice", "elo": 1000}
        })));
        machine.handle_relay(crate::protocol::RelayEvent::ServerMessage(serde_json::json!({
            "cmd": "MATCH_FOUND", "payload": {"opponent": "bob", "elo": 1100}
        })));
        assert_eq!(resolve_answer(&machine, true), Some(Action::MatchReady));

        machine.perform(Action::MatchReady).unwrap();
        assert_eq!(resolve_answer(&machine, true), None);
        assert_eq!(resolve_answer(&machine, false), Some(Action::MatchDecline));
        assert!(render_screen(&machine).contains("waiting for opponent"));
    }

    #[test]
    fn grid_uses_row_letters() {
        let grid = render_target(&TargetBoard::new());
        let lines: Vec<&str> = grid.lines().collect();
        assert_eq!(lines.len(), 11);
        assert!(lines[1].starts_with("A "));
        assert!(lines[10].starts_with("J "));
    }
}
