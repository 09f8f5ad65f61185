use battleship_bridge::coord::encode;
use battleship_bridge::protocol::RelayEvent;
use battleship_bridge::session::{Action, SessionMachine};
use battleship_bridge::BOARD_SIZE;
use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde_json::{json, Value};

const SIZE: usize = BOARD_SIZE as usize;

#[derive(Debug, Clone)]
enum Step {
    Shot {
        row: usize,
        col: usize,
        result: &'static str,
        mine: bool,
    },
    Turn(bool),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => (
            0..SIZE,
            0..SIZE,
            prop_oneof![Just("HIT"), Just("MISS"), Just("ALREADY_HIT")],
            any::<bool>()
        )
            .prop_map(|(row, col, result, mine)| Step::Shot { row, col, result, mine }),
        1 => any::<bool>().prop_map(Step::Turn),
    ]
}

fn message(m: &mut SessionMachine, msg: Value) {
    m.handle_relay(RelayEvent::ServerMessage(msg));
}

fn playing(your_turn: bool, seed: u64) -> SessionMachine {
    let mut m = SessionMachine::with_rng(None, SmallRng::seed_from_u64(seed));
    m.handle_relay(RelayEvent::connected());
    message(
        &mut m,
        json!({"cmd": "LOGIN_SUCCESS", "payload": {"username": "alice", "elo": 1000}}),
    );
    message(
        &mut m,
        json!({"cmd": "GAME_START", "payload": {"opponent": "bob", "your_turn": your_turn}}),
    );
    m.perform(Action::AutoPlace).unwrap();
    m.perform(Action::ConfirmShips).unwrap();
    message(&mut m, json!({"cmd": "GAME_READY", "payload": {}}));
    m
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn turn_flag_changes_only_on_turn_change(
        start in any::<bool>(),
        seed in any::<u64>(),
        steps in prop::collection::vec(step_strategy(), 0..40),
    ) {
        let mut m = playing(start, seed);
        let mut expected = start;
        for step in steps {
            match step {
                Step::Shot { row, col, result, mine } => {
                    let coord = encode(row, col).unwrap();
                    message(&mut m, json!({"cmd": "MOVE_RESULT", "payload": {
                        "coord": coord, "result": result, "is_your_shot": mine
                    }}));
                }
                Step::Turn(flag) => {
                    expected = flag;
                    message(&mut m, json!({"cmd": "TURN_CHANGE", "payload": {"your_turn": flag}}));
                }
            }
            prop_assert_eq!(m.game().unwrap().your_turn(), expected);
        }
    }

    #[test]
    fn hit_cells_never_return_to_miss(
        seed in any::<u64>(),
        shots in prop::collection::vec((0..SIZE, 0..SIZE, any::<bool>()), 1..60),
    ) {
        let mut m = playing(true, seed);
        let mut hits = std::collections::HashSet::new();
        for (row, col, hit) in shots {
            let result = if hit { "HIT" } else { "MISS" };
            message(&mut m, json!({"cmd": "MOVE_RESULT", "payload": {
                "coord": encode(row, col).unwrap(), "result": result, "is_your_shot": true
            }}));
            if hit {
                hits.insert((row, col));
            }
        }
        let stats = m.game().unwrap().stats();
        prop_assert_eq!(stats.my_hits, hits.len());
    }
}
