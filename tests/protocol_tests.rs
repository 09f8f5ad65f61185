use battleship_bridge::protocol::{
    decode_event, ChallengeStatus, Command, DrawStatus, EndReason, Event, GameResult,
    PlayerStatus, ProtocolError, RelayEvent, RelayRequest, ShotResult,
};
use battleship_bridge::ShipPlacement;
use serde_json::json;

#[test]
fn test_commands_use_cmd_payload_envelope() {
    let login = serde_json::to_value(Command::Login {
        username: "alice".into(),
        password: None,
    })
    .unwrap();
    assert_eq!(login, json!({"cmd": "LOGIN", "payload": {"username": "alice"}}));

    let logout = serde_json::to_value(Command::Logout {}).unwrap();
    assert_eq!(logout, json!({"cmd": "LOGOUT", "payload": {}}));

    let reply = serde_json::to_value(Command::ChallengeReply {
        challenger_username: "bob".into(),
        status: ChallengeStatus::Accept,
    })
    .unwrap();
    assert_eq!(
        reply,
        json!({"cmd": "CHALLENGE_REPLY", "payload": {"challenger_username": "bob", "status": "ACCEPT"}})
    );

    let draw = serde_json::to_value(Command::DrawReply {
        status: DrawStatus::Reject,
    })
    .unwrap();
    assert_eq!(draw, json!({"cmd": "DRAW_REPLY", "payload": {"status": "reject"}}));
}

#[test]
fn test_place_ships_shape() {
    let cmd = Command::PlaceShips {
        ships: vec![ShipPlacement {
            name: "Destroyer".into(),
            size: 2,
            row: 9,
            col: 8,
            horizontal: true,
        }],
    };
    assert_eq!(
        serde_json::to_value(cmd).unwrap(),
        json!({"cmd": "PLACE_SHIPS", "payload": {"ships": [
            {"name": "Destroyer", "size": 2, "row": 9, "col": 8, "horizontal": true}
        ]}})
    );
}

#[test]
fn test_integer_turn_flags() {
    let event = decode_event(json!({
        "cmd": "GAME_START",
        "payload": {"opponent": "bob", "your_turn": 1}
    }))
    .unwrap();
    assert_eq!(
        event,
        Event::GameStart {
            opponent: "bob".into(),
            your_turn: true
        }
    );

    let event = decode_event(json!({"cmd": "TURN_CHANGE", "payload": {"your_turn": false}})).unwrap();
    assert_eq!(event, Event::TurnChange { your_turn: false });
}

#[test]
fn test_move_result_optional_fields() {
    let event = decode_event(json!({
        "cmd": "MOVE_RESULT",
        "payload": {"coord": "A5", "result": "ALREADY_HIT", "ship_sunk": "", "is_your_shot": 0}
    }))
    .unwrap();
    assert_eq!(
        event,
        Event::MoveResult {
            coord: "A5".into(),
            result: ShotResult::AlreadyHit,
            ship_sunk: None,
            is_your_shot: Some(false),
        }
    );

    let event = decode_event(json!({
        "cmd": "MOVE_RESULT",
        "payload": {"coord": "J9", "result": "HIT", "ship_sunk": "Carrier"}
    }))
    .unwrap();
    assert!(matches!(
        event,
        Event::MoveResult { ship_sunk: Some(ref s), is_your_shot: None, .. } if s == "Carrier"
    ));
}

#[test]
fn test_login_success_token_is_camel_case() {
    let event = decode_event(json!({
        "cmd": "LOGIN_SUCCESS",
        "payload": {"username": "alice", "elo": 1000, "sessionToken": "tok1", "extra": true}
    }))
    .unwrap();
    assert_eq!(
        event,
        Event::LoginSuccess {
            username: "alice".into(),
            elo: 1000,
            session_token: Some("tok1".into()),
        }
    );
}

#[test]
fn test_game_end_reasons() {
    for (code, reason) in [
        ("ALL_SHIPS_SUNK", EndReason::AllShipsSunk),
        ("SURRENDER", EndReason::Surrender),
        ("DRAW_ACCEPTED", EndReason::DrawAccepted),
        ("OPPONENT_LOGOUT_GAME", EndReason::OpponentDisconnected),
        ("OPPONENT_LOGOUT_SETUP", EndReason::SetupAbandoned),
        ("OPPONENT_TIMEOUT", EndReason::OpponentTimeout),
        ("COSMIC_RAY", EndReason::Other("COSMIC_RAY".into())),
    ] {
        let event = decode_event(json!({
            "cmd": "GAME_END",
            "payload": {"result": "WIN", "reason": code}
        }))
        .unwrap();
        assert_eq!(
            event,
            Event::GameEnd {
                result: GameResult::Win,
                reason: reason.clone(),
                elo: None
            }
        );
        assert_eq!(reason.code(), code);
    }
    assert!(EndReason::OpponentTimeout.describe().contains("60"));
}

#[test]
fn test_lobby_lists() {
    let event = decode_event(json!({
        "cmd": "PLAYER_LIST",
        "payload": {"players": [{"username": "bob", "elo": 990, "status": 1}]}
    }))
    .unwrap();
    let Event::PlayerList { players } = event else {
        panic!("expected player list");
    };
    assert_eq!(players[0].status, PlayerStatus::Code(1));

    let event = decode_event(json!({
        "cmd": "LEADERBOARD",
        "payload": {"players": [{"rank": 1, "username": "bob", "elo": 1500, "games": 10, "wins": 7, "winrate": 70.0}]}
    }))
    .unwrap();
    assert!(matches!(event, Event::Leaderboard { ref players } if players[0].wins == 7));
}

#[test]
fn test_unknown_and_malformed_events() {
    let err = decode_event(json!({"cmd": "TELEPORT", "payload": {}})).unwrap_err();
    assert!(matches!(err, ProtocolError::UnknownCommand(ref c) if c == "TELEPORT"));

    let err = decode_event(json!({"payload": {}})).unwrap_err();
    assert!(matches!(err, ProtocolError::MissingCommand));

    let err = decode_event(json!({"cmd": "MOVE_RESULT", "payload": {"coord": "A5"}})).unwrap_err();
    assert!(matches!(err, ProtocolError::Malformed { ref cmd, .. } if cmd == "MOVE_RESULT"));
}

#[test]
fn test_relay_envelope() {
    let request = RelayRequest::command(&Command::Move { coord: "B2".into() }).unwrap();
    assert_eq!(
        serde_json::to_value(&request).unwrap(),
        json!({"event": "client-message", "data": {"cmd": "MOVE", "payload": {"coord": "B2"}}})
    );

    let event: RelayEvent = serde_json::from_value(json!({
        "event": "server-error",
        "data": {"error": "connect ECONNREFUSED"}
    }))
    .unwrap();
    assert!(event.is_terminal());
    assert_eq!(
        serde_json::to_value(RelayEvent::connected()).unwrap()["event"],
        "server-connected"
    );
    let refusal = RelayEvent::Error {
        message: "Malformed client-message".to_string(),
    };
    assert!(!refusal.is_terminal());
}

#[test]
fn test_server_notices_and_acks() {
    let welcome = decode_event(json!({
        "cmd": "WELCOME",
        "payload": {"message": "Welcome to BattleShip Server"}
    }))
    .unwrap();
    assert!(matches!(welcome, Event::Welcome { message: Some(_) }));

    let reply = decode_event(json!({
        "cmd": "CHALLENGE_REPLY",
        "payload": {"player": "bob", "status": "REJECT"}
    }))
    .unwrap();
    assert_eq!(
        reply,
        Event::ChallengeReply {
            player: Some("bob".into()),
            status: ChallengeStatus::Reject
        }
    );
    let reply = decode_event(json!({
        "cmd": "CHALLENGE_REPLY",
        "payload": {"target_username": "bob", "status": "ACCEPT"}
    }))
    .unwrap();
    assert!(matches!(
        reply,
        Event::ChallengeReply { player: Some(ref p), status: ChallengeStatus::Accept } if p == "bob"
    ));

    let ack = decode_event(json!({
        "cmd": "PLACE_SHIP_ACK",
        "payload": {"message": "Waiting for opponent"}
    }))
    .unwrap();
    assert_eq!(
        ack,
        Event::PlaceShipAck {
            message: Some("Waiting for opponent".into())
        }
    );

    let error =
        decode_event(json!({"cmd": "ERROR", "payload": {"message": "Not in a game"}})).unwrap();
    assert_eq!(
        error,
        Event::Error {
            message: "Not in a game".into()
        }
    );
}

#[test]
fn test_reconnect_carries_own_grid() {
    let mut grid = vec![vec![0u8; 10]; 10];
    grid[0][0] = 1;
    grid[0][1] = 2;
    grid[5][5] = 3;
    let event = decode_event(json!({
        "cmd": "RECONNECT_SUCCESS",
        "payload": {
            "status": "IN_GAME", "username": "alice", "opponent": "bob",
            "your_turn": 0, "phase": "playing", "myBoard": grid, "elo": 1000
        }
    }))
    .unwrap();
    let board = match event {
        Event::ReconnectSuccess {
            my_board: Some(board),
            ..
        } => board,
        other => panic!("expected RECONNECT_SUCCESS with a grid, got {:?}", other),
    };
    assert_eq!(board.len(), 10);
    assert_eq!(board[0][1], 2);
}
