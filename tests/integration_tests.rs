//! Full-game and networked integration tests.
//!
//! The unit tests colocated with `board`, `movelog`, `game`, `protocol`, and
//! `registry` cover each module's contract in isolation; these tests drive
//! whole scenarios end to end, per the server-level scenarios in §8.

use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

use michi_rust::game::GameData;
use michi_rust::point::Stone;
use michi_rust::protocol::{Request, Response};
use michi_rust::server::Server;

fn play(g: &mut GameData, i: i32, j: i32) -> bool {
    g.try_move(i, j)
}

#[test]
fn simple_capture_scenario() {
    let mut g = GameData::new(9);
    // Black surrounds a lone white stone at (0,0), playing elsewhere with
    // white to keep turn order honest.
    assert!(play(&mut g, 8, 8)); // B elsewhere
    assert!(play(&mut g, 0, 0)); // W the doomed stone
    assert!(play(&mut g, 0, 1)); // B
    assert!(play(&mut g, 8, 7)); // W elsewhere
    assert!(play(&mut g, 1, 0)); // B captures
    assert_eq!(g.board.stone(0, 0), Stone::Empty);
    assert_eq!(
        g.log.captured_count_at(g.log.move_count() - 1),
        1,
        "exactly one stone captured"
    );
}

#[test]
fn suicide_rejection_scenario() {
    let mut g = GameData::new(9);
    assert!(play(&mut g, 8, 8)); // B
    assert!(play(&mut g, 3, 4)); // W
    assert!(play(&mut g, 8, 7)); // B
    assert!(play(&mut g, 5, 4)); // W
    assert!(play(&mut g, 8, 6)); // B
    assert!(play(&mut g, 4, 3)); // W
    assert!(play(&mut g, 8, 5)); // B
    assert!(play(&mut g, 4, 5)); // W completes the diamond around (4,4)

    let before = g.board.clone();
    let count_before = g.log.move_count();
    assert!(!play(&mut g, 4, 4));
    assert_eq!(g.board, before);
    assert_eq!(g.log.move_count(), count_before);
}

#[test]
fn ko_rejection_scenario() {
    let mut g = GameData::new(9);
    assert!(play(&mut g, 0, 1)); // B
    assert!(play(&mut g, 0, 2)); // W
    assert!(play(&mut g, 1, 0)); // B
    assert!(play(&mut g, 1, 1)); // W (will be captured)
    assert!(play(&mut g, 2, 1)); // B
    assert!(play(&mut g, 1, 3)); // W elsewhere
    assert!(play(&mut g, 8, 8)); // B elsewhere
    assert!(play(&mut g, 2, 2)); // W completes the diamond

    assert!(play(&mut g, 1, 2)); // B captures the lone white stone
    assert_eq!(g.board.stone(1, 1), Stone::Empty);

    let before = g.board.clone();
    assert!(!play(&mut g, 1, 1), "immediate recapture must be rejected as ko");
    assert_eq!(g.board, before, "ko rejection must restore the board exactly");
}

#[test]
fn pass_pass_scoring_scenario() {
    let mut g = GameData::new(9);
    assert!(g.pass());
    assert!(g.pass());
    let mut black = 0.0;
    let mut white = 0.0;
    assert_eq!(g.winner(&mut black, &mut white), Stone::White);
    assert_eq!(black, 0.0);
    assert_eq!(white, 3.5);
}

#[test]
fn resign_scenario_ignores_board_state() {
    let mut g = GameData::new(9);
    assert!(play(&mut g, 4, 4));
    assert!(play(&mut g, 2, 2));
    assert!(play(&mut g, 6, 6));
    assert!(g.resign()); // white to move resigns
    let mut black = 0.0;
    let mut white = 0.0;
    assert_eq!(g.winner(&mut black, &mut white), Stone::Black);
}

#[test]
fn undo_redo_round_trip_scenario() {
    let mut g = GameData::new(9);
    let moves = [
        (0, 0),
        (0, 1),
        (1, 0),
        (1, 1),
        (2, 2),
        (3, 3),
        (4, 4),
        (5, 5),
        (6, 6),
        (7, 7),
    ];
    for &(i, j) in &moves {
        assert!(play(&mut g, i, j));
    }
    let snapshot = g.board.clone();

    g.undo_n(10);
    assert_eq!(g.log.move_count(), 0);
    assert_eq!(g.log.last_valid_move_count(), 10);
    for i in 0..9 {
        for j in 0..9 {
            assert_eq!(g.board.stone(i, j), Stone::Empty);
        }
    }

    for _ in 0..10 {
        g.redo();
    }
    assert_eq!(g.board, snapshot);
    assert_eq!(g.log.move_count(), 10);
}

#[test]
fn every_rejection_leaves_game_bit_identical() {
    let mut g = GameData::new(9);
    assert!(play(&mut g, 4, 4));
    let board_before = g.board.clone();
    let count_before = g.log.move_count();

    assert!(!play(&mut g, 4, 4)); // occupied
    assert!(!play(&mut g, 20, 20)); // out of range
    assert!(!play(&mut g, -5, 0)); // out of range, not a sentinel

    assert_eq!(g.board, board_before);
    assert_eq!(g.log.move_count(), count_before);
}

// ---------------------------------------------------------------------
// Networked server scenarios
// ---------------------------------------------------------------------

fn connect_with_timeout(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    stream
}

#[test]
fn two_clients_create_join_and_exchange_a_move() {
    // Spawn the server through its public run() entrypoint on a background
    // thread, bound to an ephemeral port.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener); // release the port; Server::run rebinds it below.

    let server = Server::new();
    let run_addr = addr;
    std::thread::spawn(move || {
        let _ = server.run(run_addr);
    });
    // Give the accept loop a moment to bind.
    std::thread::sleep(Duration::from_millis(100));

    let mut a = connect_with_timeout(addr);
    let mut b = connect_with_timeout(addr);

    Request::NewRoom {
        board_size: 9,
        name: "arena".into(),
    }
    .write(&mut a)
    .unwrap();
    let room_id = match Response::read(&mut a).unwrap() {
        Response::NewRoomResult { room_id } => room_id,
        other => panic!("unexpected response: {other:?}"),
    };
    assert!(room_id > 0);

    Request::ListRooms.write(&mut b).unwrap();
    match Response::read(&mut b).unwrap() {
        Response::ListRooms { rooms } => {
            assert_eq!(rooms.len(), 1);
            assert_eq!(rooms[0].room_id, room_id);
            assert!(rooms[0].can_join);
        }
        other => panic!("unexpected response: {other:?}"),
    }

    Request::JoinRoom { room_id }.write(&mut b).unwrap();
    assert!(matches!(
        Response::read(&mut b).unwrap(),
        Response::JoinResult { success: true }
    ));
    assert!(matches!(
        Response::read(&mut a).unwrap(),
        Response::PlayerJoined
    ));

    Request::MakeMove { mv: (4, 4) }.write(&mut a).unwrap();
    match Response::read(&mut b).unwrap() {
        Response::NewMove { room_id: rid, mv } => {
            assert_eq!(rid, room_id);
            assert_eq!(mv, (4, 4));
        }
        other => panic!("unexpected response: {other:?}"),
    }

    let _ = a.flush();
}
