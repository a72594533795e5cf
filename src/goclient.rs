//! A minimal line-oriented CLI that drives [`crate::client::ClientSession`]
//! end to end: connect, create/join/list rooms, play moves by typed
//! coordinates, pass/resign, undo locally. The rendering/input layer proper
//! is out of scope (§1) — this is the "something driving the client path"
//! SPEC_FULL calls for, playing the same smoke-demo role the teacher's own
//! `main.rs` plays for its MCTS core.

use std::io::{self, BufRead, Write};
use std::time::Duration;

use log::{info, warn};

use crate::client::ClientSession;
use crate::game::GameData;
use crate::point::Stone;
use crate::protocol::Request;

/// How long a background poller waits between checks of the decoded server
/// event flags, before printing anything new to the terminal.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn run(addr: &str) -> anyhow::Result<()> {
    let session = ClientSession::connect(addr)?;
    info!("connected to {addr}");
    println!("connected to {addr}. Type `help` for commands.");

    // The locally-mirrored game, applied to optimistically per §6; replaced
    // wholesale by an `IllegalMove` resync snapshot.
    let mut game: Option<GameData> = None;
    let mut room_id: i32 = 0;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    print!("> ");
    io::stdout().flush().ok();
    while let Some(line) = lines.next() {
        let line = line?;
        drain_events(&session, &mut game);

        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("help") => print_help(),
            Some("new") => {
                let size: i32 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(9);
                let name = parts.next().unwrap_or("room").to_string();
                session.send(&Request::NewRoom {
                    board_size: size,
                    name,
                })?;
                if let Some(id) = wait_for(|| session.state.take_room_id()) {
                    if id == 0 {
                        println!("room creation rejected (already in a room, or bad size)");
                    } else {
                        room_id = id;
                        game = Some(GameData::new(size as u8));
                        println!("created room {id}");
                    }
                }
            }
            Some("join") => {
                let Some(id) = parts.next().and_then(|s| s.parse::<i32>().ok()) else {
                    println!("usage: join <room_id>");
                    continue;
                };
                session.send(&Request::JoinRoom { room_id: id })?;
                if let Some(success) = wait_for(|| session.state.take_join_result()) {
                    if success {
                        room_id = id;
                        // The board size isn't known until a list_rooms or
                        // the first move; assume 9 until told otherwise by
                        // an illegal_move resync.
                        game = Some(GameData::new(9));
                        println!("joined room {id}");
                    } else {
                        println!("join rejected (room full, unknown, or already in a room)");
                    }
                }
            }
            Some("leave") => {
                session.send(&Request::LeaveRoom)?;
                room_id = 0;
                game = None;
                println!("left the room");
            }
            Some("list") => {
                session.send(&Request::ListRooms)?;
                if let Some(rooms) = wait_for(|| session.state.take_rooms()) {
                    println!("{} room(s):", rooms.len());
                    for r in rooms {
                        println!(
                            "  #{} \"{}\" size={} can_join={}",
                            r.room_id, r.name, r.board.size, r.can_join
                        );
                    }
                }
            }
            Some("move") => {
                let (Some(i), Some(j)) = (
                    parts.next().and_then(|s| s.parse::<i32>().ok()),
                    parts.next().and_then(|s| s.parse::<i32>().ok()),
                ) else {
                    println!("usage: move <i> <j>");
                    continue;
                };
                if room_id == 0 {
                    println!("not in a room");
                    continue;
                }
                if let Some(g) = &mut game {
                    g.try_move(i, j);
                }
                session.send(&Request::MakeMove {
                    mv: (i as i8, j as i8),
                })?;
            }
            Some("pass") => {
                if let Some(g) = &mut game {
                    g.pass();
                }
                session.send(&Request::MakeMove { mv: (-1, 0) })?;
            }
            Some("resign") => {
                if let Some(g) = &mut game {
                    g.resign();
                }
                session.send(&Request::MakeMove { mv: (-2, 0) })?;
            }
            Some("undo") => {
                if let Some(g) = &mut game {
                    g.undo();
                    println!("undone locally (server is not informed)");
                } else {
                    println!("not in a room");
                }
            }
            Some("board") => match &game {
                Some(g) => print!("{}", g.board),
                None => println!("not in a room"),
            },
            Some("exit") | Some("quit") => {
                let _ = session.send(&Request::Exit);
                break;
            }
            Some(other) => println!("unknown command: {other} (try `help`)"),
            None => {}
        }
        print!("> ");
        io::stdout().flush().ok();
    }
    Ok(())
}

fn print_help() {
    println!(
        "commands: new <size> <name> | join <id> | leave | list | move <i> <j> | pass | resign | undo | board | exit"
    );
}

/// Poll `take` for up to a few seconds, the decode worker being a separate
/// thread that deposits the reply asynchronously.
fn wait_for<T>(mut take: impl FnMut() -> Option<T>) -> Option<T> {
    for _ in 0..50 {
        if let Some(v) = take() {
            return Some(v);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    None
}

/// Apply and print any server-pushed events (opponent moves, peer joining,
/// peer leaving, an illegal-move resync) that arrived since the last poll.
fn drain_events(session: &ClientSession, game: &mut Option<GameData>) {
    if let Some((room, mv)) = session.state.take_opponent_move() {
        if let Some(g) = game {
            g.try_move(mv.0 as i32, mv.1 as i32);
        }
        println!("\nopponent played {:?} in room {room}", mv);
    }
    if session.state.take_player_joined() {
        println!("\nan opponent joined your room");
    }
    if session.state.take_other_player_left() {
        println!("\nthe other player left the room");
    }
    if let Some(snapshot) = session.state.take_illegal_move() {
        println!("\nillegal move rejected by the server; resyncing local board");
        *game = Some(*snapshot);
    }
    if session.state.connection_lost() {
        warn!("connection to server lost");
        println!("\nconnection to server lost");
    }
    if let Some(g) = game {
        let mut black = 0.0;
        let mut white = 0.0;
        let winner = g.winner(&mut black, &mut white);
        if winner != Stone::Empty {
            println!("\ngame over: {winner} wins ({black} - {white})");
        }
    }
}
