//! The session server: accept loop, per-connection worker, request dispatch.
//!
//! One OS thread per connection, spawned detached on accept — a direct port
//! of the reference server's `pthread_create` + `pthread_detach` loop
//! (`examples/original_source/server/main.cpp`). Blocking reads on the
//! client socket are this thread's only suspension point; there is no
//! poll/select and no async runtime.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::connection::Connection;
use crate::game::GameData;
use crate::protocol::{self, ProtocolError, Request, Response, RoomListing};
use crate::registry::{ClientRegistry, RoomRegistry};

/// Default listen port, matching the reference server's `SERVER_PORT`.
pub const DEFAULT_PORT: u16 = 1234;
/// `listen` backlog, matching the reference server's `QUEUE_SIZE`.
pub const BACKLOG: i32 = 5;

enum MoveOutcome {
    Accepted(Option<usize>),
    Rejected(Box<GameData>),
}

/// Shared state every connection worker dispatches against.
pub struct Server {
    rooms: RoomRegistry,
    clients: ClientRegistry,
}

impl Server {
    pub fn new() -> Arc<Self> {
        Arc::new(Server {
            rooms: RoomRegistry::new(),
            clients: ClientRegistry::new(),
        })
    }

    /// Bind and accept connections forever, spawning a detached worker
    /// thread per connection. Returns only on a fatal accept/bind error —
    /// per the error design, accept failure is fatal to the whole server.
    pub fn run(self: Arc<Self>, bind_addr: SocketAddr) -> std::io::Result<()> {
        let listener = TcpListener::bind(bind_addr)?;
        info!("listening on {bind_addr}");
        loop {
            let (stream, peer) = listener.accept()?;
            let server = Arc::clone(&self);
            std::thread::spawn(move || server.handle_connection(stream, peer));
        }
    }

    fn handle_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let conn = match Connection::new(stream) {
            Ok(c) => Arc::new(c),
            Err(e) => {
                warn!("failed to wrap accepted connection from {peer}: {e}");
                return;
            }
        };
        let client_id = self.clients.register(Arc::clone(&conn));
        info!("client {client_id} connected from {peer}");

        let mut active_room_id: usize = 0;
        loop {
            match conn.recv() {
                Ok(Request::None) => {
                    debug!("client {client_id} sent an empty request, closing");
                    break;
                }
                Ok(Request::Exit) => {
                    debug!("client {client_id} requested exit");
                    break;
                }
                Ok(Request::NewRoom { board_size, name }) => {
                    let response = self.new_room(client_id, &mut active_room_id, board_size, name);
                    if conn.send(&response).is_err() {
                        break;
                    }
                }
                Ok(Request::JoinRoom { room_id }) => {
                    if self
                        .join_room(client_id, &mut active_room_id, room_id, &conn)
                        .is_err()
                    {
                        break;
                    }
                }
                Ok(Request::LeaveRoom) => {
                    self.leave_room(client_id, &mut active_room_id);
                }
                Ok(Request::MakeMove { mv }) => {
                    if self.make_move(client_id, active_room_id, mv, &conn).is_err() {
                        break;
                    }
                }
                Ok(Request::ListRooms) => {
                    if self.list_rooms(&conn).is_err() {
                        break;
                    }
                }
                Err(ProtocolError::Eof) => {
                    debug!("client {client_id} closed the connection");
                    break;
                }
                Err(e) => {
                    warn!("client {client_id} ({peer}) decode error: {e}");
                    break;
                }
            }
        }

        self.leave_room(client_id, &mut active_room_id);
        self.clients.unregister(client_id);
        conn.shutdown();
        info!("client {client_id} disconnected");
    }

    fn new_room(
        &self,
        client_id: usize,
        active_room_id: &mut usize,
        board_size: i32,
        name: String,
    ) -> Response {
        if *active_room_id != 0 || !(2..=19).contains(&board_size) {
            return Response::NewRoomResult { room_id: 0 };
        }
        let room_id = self.rooms.create(name, board_size as u8);
        self.rooms.with_room(room_id, |room| {
            room.seat(client_id);
        });
        *active_room_id = room_id;
        info!("client {client_id} created room {room_id} (size {board_size})");
        Response::NewRoomResult {
            room_id: room_id as i32,
        }
    }

    fn join_room(
        &self,
        client_id: usize,
        active_room_id: &mut usize,
        room_id: i32,
        conn: &Connection,
    ) -> protocol::Result<()> {
        if *active_room_id != 0 || room_id <= 0 {
            return conn.send(&Response::JoinResult { success: false });
        }
        let room_id = room_id as usize;
        let seated = self.rooms.with_room(room_id, |room| {
            if !room.can_join() {
                return None;
            }
            room.seat(client_id).map(|_| room.peer_of(client_id))
        });

        match seated.flatten() {
            Some(peer_id) => {
                *active_room_id = room_id;
                debug!("client {client_id} joined room {room_id}");
                conn.send(&Response::JoinResult { success: true })?;
                if let Some(peer_id) = peer_id {
                    if let Some(peer_conn) = self.clients.connection_of(peer_id) {
                        let _ = peer_conn.send(&Response::PlayerJoined);
                    }
                }
                Ok(())
            }
            None => conn.send(&Response::JoinResult { success: false }),
        }
    }

    fn leave_room(&self, client_id: usize, active_room_id: &mut usize) {
        if *active_room_id == 0 {
            return;
        }
        let room_id = *active_room_id;
        *active_room_id = 0;

        let outcome = self.rooms.with_room(room_id, |room| {
            let peer = room.peer_of(client_id);
            room.vacate(client_id);
            (peer, room.is_empty())
        });

        if let Some((peer_id, now_empty)) = outcome {
            if let Some(peer_id) = peer_id {
                if let Some(peer_conn) = self.clients.connection_of(peer_id) {
                    let _ = peer_conn.send(&Response::Exit);
                }
            }
            if now_empty {
                self.rooms.remove(room_id);
                debug!("room {room_id} torn down (last occupant left)");
            }
        }
    }

    fn make_move(
        &self,
        client_id: usize,
        active_room_id: usize,
        mv: (i8, i8),
        conn: &Connection,
    ) -> protocol::Result<()> {
        if active_room_id == 0 {
            return Ok(());
        }

        let outcome = self.rooms.with_room(active_room_id, |room| {
            if room.game.try_move(mv.0 as i32, mv.1 as i32) {
                MoveOutcome::Accepted(room.peer_of(client_id))
            } else {
                MoveOutcome::Rejected(Box::new(room.game.clone()))
            }
        });

        match outcome {
            // The opponent already tore the room down; go idle silently.
            None => Ok(()),
            Some(MoveOutcome::Accepted(peer_id)) => {
                if let Some(peer_id) = peer_id {
                    if let Some(peer_conn) = self.clients.connection_of(peer_id) {
                        let _ = peer_conn.send(&Response::NewMove {
                            room_id: active_room_id as i32,
                            mv,
                        });
                    }
                }
                Ok(())
            }
            Some(MoveOutcome::Rejected(snapshot)) => {
                debug!("client {client_id} attempted an illegal move {mv:?} in room {active_room_id}");
                conn.send(&Response::IllegalMove { snapshot })
            }
        }
    }

    fn list_rooms(&self, conn: &Connection) -> protocol::Result<()> {
        let rooms = self
            .rooms
            .list()
            .into_iter()
            .map(|(room_id, name, can_join, board)| RoomListing {
                room_id: room_id as i32,
                name,
                can_join,
                board,
            })
            .collect();
        conn.send(&Response::ListRooms { rooms })
    }
}

impl Default for Server {
    fn default() -> Self {
        Server {
            rooms: RoomRegistry::new(),
            clients: ClientRegistry::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::time::Duration;

    fn spawn_test_server() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Server::new();
        std::thread::spawn(move || {
            loop {
                let (stream, peer) = match listener.accept() {
                    Ok(v) => v,
                    Err(_) => return,
                };
                let server = Arc::clone(&server);
                std::thread::spawn(move || server.handle_connection(stream, peer));
            }
        });
        addr
    }

    fn connect(addr: SocketAddr) -> TcpStream {
        let stream = TcpStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        stream
    }

    fn send_request(stream: &mut TcpStream, req: Request) {
        req.write(stream).unwrap();
    }

    fn read_response(stream: &mut TcpStream) -> Response {
        Response::read(stream).unwrap()
    }

    #[test]
    fn new_room_then_list_rooms_sees_it() {
        let addr = spawn_test_server();
        let mut a = connect(addr);

        send_request(
            &mut a,
            Request::NewRoom {
                board_size: 9,
                name: "arena".into(),
            },
        );
        let resp = read_response(&mut a);
        let room_id = match resp {
            Response::NewRoomResult { room_id } => room_id,
            other => panic!("unexpected response: {other:?}"),
        };
        assert!(room_id > 0);

        let mut b = connect(addr);
        send_request(&mut b, Request::ListRooms);
        match read_response(&mut b) {
            Response::ListRooms { rooms } => {
                assert_eq!(rooms.len(), 1);
                assert_eq!(rooms[0].room_id, room_id);
                assert_eq!(rooms[0].name, "arena");
                assert!(rooms[0].can_join);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn join_and_exchange_a_move() {
        let addr = spawn_test_server();
        let mut a = connect(addr);
        let mut b = connect(addr);

        send_request(
            &mut a,
            Request::NewRoom {
                board_size: 9,
                name: "r".into(),
            },
        );
        let room_id = match read_response(&mut a) {
            Response::NewRoomResult { room_id } => room_id,
            other => panic!("unexpected response: {other:?}"),
        };

        send_request(&mut b, Request::JoinRoom { room_id });
        assert!(matches!(
            read_response(&mut b),
            Response::JoinResult { success: true }
        ));
        assert!(matches!(read_response(&mut a), Response::PlayerJoined));

        send_request(&mut a, Request::MakeMove { mv: (4, 4) });
        match read_response(&mut b) {
            Response::NewMove { room_id: rid, mv } => {
                assert_eq!(rid, room_id);
                assert_eq!(mv, (4, 4));
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn illegal_move_gets_a_resync_snapshot() {
        let addr = spawn_test_server();
        let mut a = connect(addr);
        let mut b = connect(addr);

        send_request(
            &mut a,
            Request::NewRoom {
                board_size: 9,
                name: "r".into(),
            },
        );
        let room_id = match read_response(&mut a) {
            Response::NewRoomResult { room_id } => room_id,
            other => panic!("unexpected: {other:?}"),
        };
        send_request(&mut b, Request::JoinRoom { room_id });
        read_response(&mut b);
        read_response(&mut a); // player_joined

        send_request(&mut a, Request::MakeMove { mv: (0, 0) });
        read_response(&mut b); // new_move for black's play

        // White plays on the same occupied point: illegal.
        send_request(&mut b, Request::MakeMove { mv: (0, 0) });
        match read_response(&mut b) {
            Response::IllegalMove { .. } => {}
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn leaving_a_room_notifies_the_peer() {
        let addr = spawn_test_server();
        let mut a = connect(addr);
        let mut b = connect(addr);

        send_request(
            &mut a,
            Request::NewRoom {
                board_size: 9,
                name: "r".into(),
            },
        );
        let room_id = match read_response(&mut a) {
            Response::NewRoomResult { room_id } => room_id,
            other => panic!("unexpected: {other:?}"),
        };
        send_request(&mut b, Request::JoinRoom { room_id });
        read_response(&mut b);
        read_response(&mut a); // player_joined

        send_request(&mut a, Request::LeaveRoom);
        assert!(matches!(read_response(&mut b), Response::Exit));
    }

    #[test]
    fn second_join_to_full_room_fails() {
        let addr = spawn_test_server();
        let mut a = connect(addr);
        let mut b = connect(addr);
        let mut c = connect(addr);

        send_request(
            &mut a,
            Request::NewRoom {
                board_size: 9,
                name: "r".into(),
            },
        );
        let room_id = match read_response(&mut a) {
            Response::NewRoomResult { room_id } => room_id,
            other => panic!("unexpected: {other:?}"),
        };
        send_request(&mut b, Request::JoinRoom { room_id });
        read_response(&mut b);
        read_response(&mut a);

        send_request(&mut c, Request::JoinRoom { room_id });
        assert!(matches!(
            read_response(&mut c),
            Response::JoinResult { success: false }
        ));

        // avoid unused-binding warning: drop the raw stream explicitly
        let _ = a.write(&[]);
    }
}
