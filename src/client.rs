//! Client-side session state: the decode worker and the flag/payload block
//! the UI (or, here, the `goclient` CLI) samples each tick.
//!
//! Grounded on `examples/original_source/client/main.cpp`'s `ClientState`
//! struct and its `client_thread` response-reading loop: one worker thread
//! owns the socket's read half and deposits decoded responses into flags the
//! caller polls and clears. The reference client stores raw `bool` fields
//! with no synchronization, relying on the UI thread reading them at frame
//! boundaries; this port gives each slot its own `Mutex<Option<T>>` so a
//! "sample and clear" read is atomic without reproducing the reference's
//! data race.

use std::net::TcpStream;
use std::sync::{Arc, Mutex};

use log::{info, warn};

use crate::connection::Connection;
use crate::game::GameData;
use crate::protocol::{self, Request, Response, RoomListing};

/// Decoded server events the client session has not yet been told to clear.
///
/// Each field is sampled and cleared independently, mirroring the reference
/// `ClientState`'s per-event boolean flags (`got_opponent_move`,
/// `got_room_id`, `got_join_result`, `got_game_list`, ...).
#[derive(Default)]
pub struct ClientState {
    opponent_move: Mutex<Option<(i32, (i8, i8))>>,
    room_id: Mutex<Option<i32>>,
    join_result: Mutex<Option<bool>>,
    player_joined: Mutex<bool>,
    rooms: Mutex<Option<Vec<RoomListing>>>,
    /// A resync snapshot sent after this client's own move was rejected.
    illegal_move: Mutex<Option<Box<GameData>>>,
    other_player_left: Mutex<bool>,
    connection_lost: Mutex<bool>,
}

impl ClientState {
    pub fn new() -> Self {
        ClientState::default()
    }

    pub fn take_opponent_move(&self) -> Option<(i32, (i8, i8))> {
        self.opponent_move.lock().unwrap().take()
    }

    pub fn take_room_id(&self) -> Option<i32> {
        self.room_id.lock().unwrap().take()
    }

    pub fn take_join_result(&self) -> Option<bool> {
        self.join_result.lock().unwrap().take()
    }

    pub fn take_player_joined(&self) -> bool {
        std::mem::take(&mut *self.player_joined.lock().unwrap())
    }

    pub fn take_rooms(&self) -> Option<Vec<RoomListing>> {
        self.rooms.lock().unwrap().take()
    }

    pub fn take_illegal_move(&self) -> Option<Box<GameData>> {
        self.illegal_move.lock().unwrap().take()
    }

    pub fn take_other_player_left(&self) -> bool {
        std::mem::take(&mut *self.other_player_left.lock().unwrap())
    }

    pub fn connection_lost(&self) -> bool {
        *self.connection_lost.lock().unwrap()
    }
}

/// A connected client session: the shared connection, the decode worker's
/// output, and a locally-mirrored [`GameData`] the caller applies moves to
/// optimistically (per §6's client contract — authority still lives on the
/// server, and an `IllegalMove` snapshot replaces this mirror wholesale).
pub struct ClientSession {
    pub connection: Arc<Connection>,
    pub state: Arc<ClientState>,
}

impl ClientSession {
    /// Connect to `addr` and spawn the decode worker. The worker thread
    /// runs for the lifetime of the connection; it exits (setting
    /// `connection_lost`) on EOF or a decode error, the same terminal
    /// conditions the reference `client_thread` treats as fatal.
    pub fn connect(addr: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| anyhow::anyhow!("connecting to {addr}: {e}"))?;
        let connection = Arc::new(Connection::new(stream)?);
        let state = Arc::new(ClientState::new());

        let worker_conn = Arc::clone(&connection);
        let worker_state = Arc::clone(&state);
        std::thread::spawn(move || decode_worker(worker_conn, worker_state));

        Ok(ClientSession { connection, state })
    }

    pub fn send(&self, request: &Request) -> protocol::Result<()> {
        self.connection.send_request(request)
    }
}

/// Read responses off the connection forever, depositing each into `state`.
/// A `RESPONSE_EXIT` (peer left) auto-sends `leave_room`, matching the
/// reference client's immediate `REQUEST_LEAVE_ROOM` reply to that event.
fn decode_worker(connection: Arc<Connection>, state: Arc<ClientState>) {
    loop {
        let response = match connection.recv_response() {
            Ok(r) => r,
            Err(e) => {
                warn!("server connection lost: {e}");
                *state.connection_lost.lock().unwrap() = true;
                return;
            }
        };

        match response {
            Response::None => info!("got response none"),
            Response::NewMove { room_id, mv } => {
                *state.opponent_move.lock().unwrap() = Some((room_id, mv));
            }
            Response::NewRoomResult { room_id } => {
                *state.room_id.lock().unwrap() = Some(room_id);
            }
            Response::JoinResult { success } => {
                *state.join_result.lock().unwrap() = Some(success);
            }
            Response::PlayerJoined => {
                *state.player_joined.lock().unwrap() = true;
            }
            Response::ListRooms { rooms } => {
                *state.rooms.lock().unwrap() = Some(rooms);
            }
            Response::IllegalMove { snapshot } => {
                *state.illegal_move.lock().unwrap() = Some(snapshot);
            }
            Response::Exit => {
                *state.other_player_left.lock().unwrap() = true;
                let _ = connection.send_request(&Request::LeaveRoom);
            }
        }
    }
}
