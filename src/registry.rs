//! Slotted, mutex-guarded registries for rooms and connected clients.
//!
//! Both registries use the same shape: a `Vec` of `Option<T>` slots where
//! index 0 is never handed out (an id of 0 means "no room"/"no client" on
//! the wire, mirroring the reference client's `assert(cs->room_id == 0)`
//! sentinel for "not yet in a room"). A freed slot is reused by the next
//! registration rather than the vector growing unbounded over a long
//! server lifetime.

use std::sync::{Mutex, MutexGuard};

use crate::connection::Connection;
use crate::game::GameData;

/// A game in progress plus the two (at most) participants' room-local
/// seats. Seat 0 is black (the creator), seat 1 is white (the joiner); an
/// empty seat is `None`.
///
/// Seats hold client ids, not `Connection` handles directly: a room never
/// owns a connection, it only knows which client currently occupies each
/// seat, and the session worker resolves that id through the
/// `ClientRegistry` under the registry lock it already holds. This avoids
/// a room and a connection ever needing to reference each other directly.
pub struct Room {
    pub name: String,
    pub game: GameData,
    pub seats: [Option<usize>; 2],
}

impl Room {
    pub fn new(name: String, board_size: u8) -> Self {
        Room {
            name,
            game: GameData::new(board_size),
            seats: [None, None],
        }
    }

    /// Whether a third player could still join (both seats taken is full).
    pub fn can_join(&self) -> bool {
        self.seats.iter().any(|s| s.is_none())
    }

    /// Seat `client_id` in the first empty seat, returning its index.
    pub fn seat(&mut self, client_id: usize) -> Option<usize> {
        for (idx, seat) in self.seats.iter_mut().enumerate() {
            if seat.is_none() {
                *seat = Some(client_id);
                return Some(idx);
            }
        }
        None
    }

    /// Clear the seat occupied by `client_id`, if any.
    pub fn vacate(&mut self, client_id: usize) {
        for seat in self.seats.iter_mut() {
            if *seat == Some(client_id) {
                *seat = None;
            }
        }
    }

    /// The other seat's occupant, if `client_id` occupies one of the two
    /// seats and the other is filled.
    pub fn peer_of(&self, client_id: usize) -> Option<usize> {
        match self.seats {
            [Some(a), Some(b)] if a == client_id => Some(b),
            [Some(a), Some(b)] if b == client_id => Some(a),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.seats.iter().all(|s| s.is_none())
    }
}

/// A slotted registry: index 0 is reserved invalid, slots are reused.
struct Slots<T> {
    slots: Vec<Option<T>>,
}

impl<T> Slots<T> {
    fn new() -> Self {
        Slots {
            slots: vec![None], // slot 0 reserved
        }
    }

    fn insert(&mut self, value: T) -> usize {
        for (idx, slot) in self.slots.iter_mut().enumerate().skip(1) {
            if slot.is_none() {
                *slot = Some(value);
                return idx;
            }
        }
        self.slots.push(Some(value));
        self.slots.len() - 1
    }

    fn remove(&mut self, id: usize) -> Option<T> {
        self.slots.get_mut(id).and_then(|s| s.take())
    }

    fn get(&self, id: usize) -> Option<&T> {
        self.slots.get(id).and_then(|s| s.as_ref())
    }

    fn get_mut(&mut self, id: usize) -> Option<&mut T> {
        self.slots.get_mut(id).and_then(|s| s.as_mut())
    }

    fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, s)| s.as_ref().map(|v| (id, v)))
    }
}

/// The set of rooms live on the server, keyed by room id (1-based; 0 means
/// "no room").
pub struct RoomRegistry {
    rooms: Mutex<Slots<Room>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        RoomRegistry {
            rooms: Mutex::new(Slots::new()),
        }
    }

    pub fn create(&self, name: String, board_size: u8) -> usize {
        let mut rooms = self.lock();
        rooms.insert(Room::new(name, board_size))
    }

    /// Drop a room entirely (used when its last occupant leaves).
    pub fn remove(&self, room_id: usize) {
        let mut rooms = self.lock();
        rooms.remove(room_id);
    }

    fn lock(&self) -> MutexGuard<'_, Slots<Room>> {
        self.rooms.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `f` with exclusive access to the room at `room_id`, if it
    /// exists. Returns `None` if the slot is empty (room id unknown or
    /// already closed).
    pub fn with_room<R>(&self, room_id: usize, f: impl FnOnce(&mut Room) -> R) -> Option<R> {
        let mut rooms = self.lock();
        rooms.get_mut(room_id).map(f)
    }

    /// A snapshot listing of every live room, for `list_rooms`.
    pub fn list(&self) -> Vec<(usize, String, bool, crate::board::Board)> {
        let rooms = self.lock();
        rooms
            .iter()
            .map(|(id, room)| (id, room.name.clone(), room.can_join(), room.game.board.clone()))
            .collect()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The set of currently-connected clients, keyed by client id. Kept
/// separately from rooms so a connection can be looked up (for, say,
/// diagnostics or a future admin command) without locking every room.
pub struct ClientRegistry {
    clients: Mutex<Slots<std::sync::Arc<Connection>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        ClientRegistry {
            clients: Mutex::new(Slots::new()),
        }
    }

    pub fn register(&self, conn: std::sync::Arc<Connection>) -> usize {
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        clients.insert(conn)
    }

    pub fn unregister(&self, client_id: usize) {
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        clients.remove(client_id);
    }

    pub fn connection_of(&self, client_id: usize) -> Option<std::sync::Arc<Connection>> {
        let clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        clients.get(client_id).cloned()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_ids_start_at_one_and_reuse_freed_slots() {
        let reg = RoomRegistry::new();
        let a = reg.create("a".into(), 9);
        let b = reg.create("b".into(), 9);
        assert_eq!(a, 1);
        assert_eq!(b, 2);

        reg.remove(a);
        let c = reg.create("c".into(), 9);
        assert_eq!(c, 1, "freed slot 1 should be reused before growing");
    }

    #[test]
    fn with_room_on_unknown_id_returns_none() {
        let reg = RoomRegistry::new();
        assert!(reg.with_room(42, |_| ()).is_none());
        assert!(reg.with_room(0, |_| ()).is_none());
    }

    #[test]
    fn list_reflects_live_rooms_only() {
        let reg = RoomRegistry::new();
        let a = reg.create("alpha".into(), 9);
        let _b = reg.create("beta".into(), 13);
        reg.remove(a);
        let listing = reg.list();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].1, "beta");
    }

    #[test]
    fn room_seating_fills_first_empty_seat_then_vacates() {
        let mut room = Room::new("r".into(), 9);

        assert_eq!(room.seat(7), Some(0));
        assert_eq!(room.seat(9), Some(1));
        assert!(!room.can_join());
        assert_eq!(room.peer_of(7), Some(9));
        assert_eq!(room.peer_of(9), Some(7));

        room.vacate(7);
        assert!(room.can_join());
        assert!(!room.is_empty());
        assert_eq!(room.peer_of(9), None);

        room.vacate(9);
        assert!(room.is_empty());
    }

    fn loopback_connection() -> std::sync::Arc<Connection> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = std::net::TcpStream::connect(addr).unwrap();
        let (server_side, _) = listener.accept().unwrap();
        drop(client);
        std::sync::Arc::new(Connection::new(server_side).unwrap())
    }

    #[test]
    fn client_registry_round_trips_connections() {
        let reg = ClientRegistry::new();
        let conn = loopback_connection();
        let id = reg.register(conn.clone());
        assert!(id >= 1);
        assert!(reg.connection_of(id).is_some());
        reg.unregister(id);
        assert!(reg.connection_of(id).is_none());
    }
}
