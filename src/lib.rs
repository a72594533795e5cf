//! An online two-player Go service: an authoritative rules engine plus a
//! concurrent, multi-room session server speaking a length-prefixed binary
//! protocol over TCP.
//!
//! ## Modules
//!
//! - [`point`] - board coordinates and the `Stone` color
//! - [`board`] - bit-packed board storage and flood-fill primitives
//! - [`movelog`] - the bounded, reversible move/capture log
//! - [`game`] - `GameData`, the rules engine (capture, suicide, ko, scoring)
//! - [`protocol`] - the wire codec (`Request`/`Response`, framing)
//! - [`connection`] - a socket wrapped for single-writer-at-a-time sends
//! - [`registry`] - the room and client registries
//! - [`server`] - the session server: accept loop and per-connection worker
//! - [`client`] - client-side session state and its decode worker
//!
//! ## Example
//!
//! ```
//! use michi_rust::game::GameData;
//!
//! let mut game = GameData::new(9);
//! assert!(game.try_move(2, 2));
//! assert!(game.pass());
//! assert!(game.pass());
//!
//! let mut black = 0.0;
//! let mut white = 0.0;
//! let winner = game.winner(&mut black, &mut white);
//! println!("winner: {winner} ({black} - {white})");
//! ```

pub mod board;
pub mod client;
pub mod connection;
pub mod game;
pub mod goclient;
pub mod movelog;
pub mod point;
pub mod protocol;
pub mod registry;
pub mod server;
