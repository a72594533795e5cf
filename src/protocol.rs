//! Wire protocol: tagged request/response records over a framed TCP stream.
//!
//! The reference server (`examples/original_source/protocol.h`) sends a
//! C `union` of fixed size per message; this port follows the Design Notes'
//! redesign instead: every field is written out explicitly in little-endian
//! order, one at a time, so two endpoints built from different compilers or
//! architectures still agree on the bytes. There is no implicit padding —
//! a reader decodes exactly as many bytes as the tag says it will.

use std::io::{self, Read, Write};

use crate::board::{Board, CellBitmap, MAX_N};
use crate::game::GameData;
use crate::movelog::MAX_MOVES;
use crate::point::Point;

/// Bytes in a room name (padded with trailing NULs, like the reference
/// server's `char name[16]`).
pub const NAME_LEN: usize = 16;
/// 384 bits / 8 = 48 bytes per bitmap, matching the reference server's
/// `std::bitset<384>` capacity.
const BITMAP_BYTES: usize = 48;

/// Anything that can go wrong decoding a frame off the wire.
#[derive(Debug)]
pub enum ProtocolError {
    /// The peer closed the connection (cleanly or not) before a full
    /// record was read.
    Eof,
    Io(io::Error),
    /// An unrecognized request/response tag.
    BadTag(u32),
    /// A room name longer than `NAME_LEN` UTF-8 bytes.
    NameTooLong,
    /// A board size outside 2..=19.
    SizeOutOfRange(i32),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::Eof => write!(f, "connection closed mid-frame"),
            ProtocolError::Io(e) => write!(f, "I/O error: {e}"),
            ProtocolError::BadTag(t) => write!(f, "unrecognized wire tag {t}"),
            ProtocolError::NameTooLong => write!(f, "room name longer than {NAME_LEN} bytes"),
            ProtocolError::SizeOutOfRange(n) => write!(f, "board size {n} out of range 2..=19"),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<io::Error> for ProtocolError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            ProtocolError::Eof
        } else {
            ProtocolError::Io(e)
        }
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

// ---------------------------------------------------------------------
// Low-level framing helpers
// ---------------------------------------------------------------------

/// Read exactly `buf.len()` bytes, looping until the buffer is full or the
/// peer closes/errors.
pub fn read_exact(r: &mut impl Read, buf: &mut [u8]) -> Result<()> {
    r.read_exact(buf)?;
    Ok(())
}

/// Write exactly `buf`, looping until every byte is written or an error
/// occurs.
pub fn write_exact(w: &mut impl Write, buf: &[u8]) -> Result<()> {
    w.write_all(buf)?;
    Ok(())
}

fn read_u32(r: &mut impl Read) -> Result<u32> {
    let mut b = [0u8; 4];
    read_exact(r, &mut b)?;
    Ok(u32::from_le_bytes(b))
}

fn write_u32(w: &mut impl Write, v: u32) -> Result<()> {
    write_exact(w, &v.to_le_bytes())
}

fn read_i32(r: &mut impl Read) -> Result<i32> {
    let mut b = [0u8; 4];
    read_exact(r, &mut b)?;
    Ok(i32::from_le_bytes(b))
}

fn write_i32(w: &mut impl Write, v: i32) -> Result<()> {
    write_exact(w, &v.to_le_bytes())
}

fn read_i16(r: &mut impl Read) -> Result<i16> {
    let mut b = [0u8; 2];
    read_exact(r, &mut b)?;
    Ok(i16::from_le_bytes(b))
}

fn write_i16(w: &mut impl Write, v: i16) -> Result<()> {
    write_exact(w, &v.to_le_bytes())
}

fn read_i8(r: &mut impl Read) -> Result<i8> {
    let mut b = [0u8; 1];
    read_exact(r, &mut b)?;
    Ok(b[0] as i8)
}

fn write_i8(w: &mut impl Write, v: i8) -> Result<()> {
    write_exact(w, &[v as u8])
}

fn read_bool(r: &mut impl Read) -> Result<bool> {
    let mut b = [0u8; 1];
    read_exact(r, &mut b)?;
    Ok(b[0] != 0)
}

fn write_bool(w: &mut impl Write, v: bool) -> Result<()> {
    write_exact(w, &[v as u8])
}

fn read_name(r: &mut impl Read) -> Result<String> {
    let mut buf = [0u8; NAME_LEN];
    read_exact(r, &mut buf)?;
    let end = buf.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}

fn write_name(w: &mut impl Write, name: &str) -> Result<()> {
    if name.len() > NAME_LEN {
        return Err(ProtocolError::NameTooLong);
    }
    let mut buf = [0u8; NAME_LEN];
    buf[..name.len()].copy_from_slice(name.as_bytes());
    write_exact(w, &buf)
}

fn read_point(r: &mut impl Read) -> Result<Point> {
    let i = read_i8(r)? as i32;
    let j = read_i8(r)? as i32;
    Ok(Point::new(i, j))
}

fn write_point(w: &mut impl Write, p: Point) -> Result<()> {
    write_i8(w, p.i as i8)?;
    write_i8(w, p.j as i8)
}

fn read_bitmap(r: &mut impl Read) -> Result<CellBitmap> {
    let mut bytes = [0u8; BITMAP_BYTES];
    read_exact(r, &mut bytes)?;
    let mut words = [0u64; BITMAP_BYTES / 8];
    for (k, w) in words.iter_mut().enumerate() {
        let mut wb = [0u8; 8];
        wb.copy_from_slice(&bytes[k * 8..k * 8 + 8]);
        *w = u64::from_le_bytes(wb);
    }
    Ok(CellBitmap::from_words(words))
}

fn write_bitmap(w: &mut impl Write, bitmap: &CellBitmap) -> Result<()> {
    let mut bytes = [0u8; BITMAP_BYTES];
    for (k, word) in bitmap.words().iter().enumerate() {
        bytes[k * 8..k * 8 + 8].copy_from_slice(&word.to_le_bytes());
    }
    write_exact(w, &bytes)
}

// ---------------------------------------------------------------------
// Board / GameData wire records
// ---------------------------------------------------------------------

pub fn write_board(w: &mut impl Write, board: &Board) -> Result<()> {
    write_bitmap(w, &board.presence_bitmap())?;
    write_bitmap(w, &board.color_bitmap())?;
    write_i32(w, board.size as i32)
}

pub fn read_board(r: &mut impl Read) -> Result<Board> {
    let presence = read_bitmap(r)?;
    let color = read_bitmap(r)?;
    let size = read_i32(r)?;
    if !(2..=MAX_N as i32).contains(&size) {
        return Err(ProtocolError::SizeOutOfRange(size));
    }
    Ok(Board::from_bitmaps(size as u8, presence, color))
}

pub fn write_game_data(w: &mut impl Write, game: &GameData) -> Result<()> {
    write_board(w, &game.board)?;
    let log = &game.log;
    write_i16(w, log.move_count() as i16)?;
    write_i16(w, log.last_valid_move_count() as i16)?;
    write_i16(w, log.removed_count_total() as i16)?;
    for n in 0..MAX_MOVES {
        let p = if n < log.last_valid_move_count() {
            log.move_at(n)
        } else {
            Point::new(0, 0)
        };
        write_point(w, p)?;
    }
    for n in 0..MAX_MOVES {
        let c = if n < log.last_valid_move_count() {
            log.captured_count_at(n) as i16
        } else {
            0
        };
        write_i16(w, c)?;
    }
    for k in 0..MAX_MOVES {
        let p = if k < log.removed_count_total() {
            log.captured_stone_at(k)
        } else {
            Point::new(0, 0)
        };
        write_point(w, p)?;
    }
    Ok(())
}

pub fn read_game_data(r: &mut impl Read) -> Result<GameData> {
    let board = read_board(r)?;
    let move_count = read_i16(r)? as usize;
    let last_valid_move_count = read_i16(r)? as usize;
    let removed_count_total = read_i16(r)? as usize;

    let mut moves = Vec::with_capacity(MAX_MOVES);
    for _ in 0..MAX_MOVES {
        moves.push(read_point(r)?);
    }
    let mut removed_count = Vec::with_capacity(MAX_MOVES);
    for _ in 0..MAX_MOVES {
        removed_count.push(read_i16(r)?);
    }
    let mut removed = Vec::with_capacity(MAX_MOVES);
    for _ in 0..MAX_MOVES {
        removed.push(read_point(r)?);
    }

    moves.truncate(last_valid_move_count);
    removed_count.truncate(last_valid_move_count);
    removed.truncate(removed_count_total);

    let mut game = GameData::new(board.size);
    game.board = board;
    game.log = crate::movelog::MoveLog::from_parts(
        moves,
        removed_count,
        removed,
        move_count,
        last_valid_move_count,
        removed_count_total,
    );
    Ok(game)
}

// ---------------------------------------------------------------------
// Request / Response
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    None,
    NewRoom { board_size: i32, name: String },
    JoinRoom { room_id: i32 },
    LeaveRoom,
    MakeMove { mv: (i8, i8) },
    ListRooms,
    Exit,
}

mod request_tag {
    pub const NONE: u32 = 0;
    pub const NEW_ROOM: u32 = 1;
    pub const JOIN_ROOM: u32 = 2;
    pub const LEAVE_ROOM: u32 = 3;
    pub const MAKE_MOVE: u32 = 4;
    pub const LIST_ROOMS: u32 = 5;
    pub const EXIT: u32 = 6;
}

impl Request {
    pub fn read(r: &mut impl Read) -> Result<Request> {
        let tag = read_u32(r)?;
        Ok(match tag {
            request_tag::NONE => Request::None,
            request_tag::NEW_ROOM => {
                let board_size = read_i32(r)?;
                let name = read_name(r)?;
                Request::NewRoom { board_size, name }
            }
            request_tag::JOIN_ROOM => Request::JoinRoom {
                room_id: read_i32(r)?,
            },
            request_tag::LEAVE_ROOM => Request::LeaveRoom,
            request_tag::MAKE_MOVE => {
                let x = read_i8(r)?;
                let y = read_i8(r)?;
                Request::MakeMove { mv: (x, y) }
            }
            request_tag::LIST_ROOMS => Request::ListRooms,
            request_tag::EXIT => Request::Exit,
            other => return Err(ProtocolError::BadTag(other)),
        })
    }

    pub fn write(&self, w: &mut impl Write) -> Result<()> {
        match self {
            Request::None => write_u32(w, request_tag::NONE),
            Request::NewRoom { board_size, name } => {
                write_u32(w, request_tag::NEW_ROOM)?;
                write_i32(w, *board_size)?;
                write_name(w, name)
            }
            Request::JoinRoom { room_id } => {
                write_u32(w, request_tag::JOIN_ROOM)?;
                write_i32(w, *room_id)
            }
            Request::LeaveRoom => write_u32(w, request_tag::LEAVE_ROOM),
            Request::MakeMove { mv } => {
                write_u32(w, request_tag::MAKE_MOVE)?;
                write_i8(w, mv.0)?;
                write_i8(w, mv.1)
            }
            Request::ListRooms => write_u32(w, request_tag::LIST_ROOMS),
            Request::Exit => write_u32(w, request_tag::EXIT),
        }
    }
}

/// One entry of a `list_rooms` response tail.
#[derive(Clone, Debug)]
pub struct RoomListing {
    pub room_id: i32,
    pub name: String,
    pub can_join: bool,
    pub board: Board,
}

impl RoomListing {
    fn read(r: &mut impl Read) -> Result<Self> {
        let room_id = read_i32(r)?;
        let name = read_name(r)?;
        let can_join = read_bool(r)?;
        let board = read_board(r)?;
        Ok(RoomListing {
            room_id,
            name,
            can_join,
            board,
        })
    }

    fn write(&self, w: &mut impl Write) -> Result<()> {
        write_i32(w, self.room_id)?;
        write_name(w, &self.name)?;
        write_bool(w, self.can_join)?;
        write_board(w, &self.board)
    }
}

#[derive(Debug, Clone)]
pub enum Response {
    None,
    NewMove { room_id: i32, mv: (i8, i8) },
    NewRoomResult { room_id: i32 },
    JoinResult { success: bool },
    PlayerJoined,
    ListRooms { rooms: Vec<RoomListing> },
    IllegalMove { snapshot: Box<GameData> },
    Exit,
}

mod response_tag {
    pub const NONE: u32 = 0;
    pub const NEW_MOVE: u32 = 1;
    pub const NEW_ROOM_RESULT: u32 = 2;
    pub const JOIN_RESULT: u32 = 3;
    pub const PLAYER_JOINED: u32 = 4;
    pub const LIST_ROOMS: u32 = 5;
    pub const ILLEGAL_MOVE: u32 = 6;
    pub const EXIT: u32 = 7;
}

impl Response {
    pub fn read(r: &mut impl Read) -> Result<Response> {
        let tag = read_u32(r)?;
        Ok(match tag {
            response_tag::NONE => Response::None,
            response_tag::NEW_MOVE => {
                let room_id = read_i32(r)?;
                let x = read_i8(r)?;
                let y = read_i8(r)?;
                Response::NewMove {
                    room_id,
                    mv: (x, y),
                }
            }
            response_tag::NEW_ROOM_RESULT => Response::NewRoomResult {
                room_id: read_i32(r)?,
            },
            response_tag::JOIN_RESULT => Response::JoinResult {
                success: read_bool(r)?,
            },
            response_tag::PLAYER_JOINED => Response::PlayerJoined,
            response_tag::LIST_ROOMS => {
                let size = read_i32(r)?;
                let mut rooms = Vec::with_capacity(size.max(0) as usize);
                for _ in 0..size {
                    rooms.push(RoomListing::read(r)?);
                }
                Response::ListRooms { rooms }
            }
            response_tag::ILLEGAL_MOVE => {
                let snapshot = Box::new(read_game_data(r)?);
                Response::IllegalMove { snapshot }
            }
            response_tag::EXIT => Response::Exit,
            other => return Err(ProtocolError::BadTag(other)),
        })
    }

    pub fn write(&self, w: &mut impl Write) -> Result<()> {
        match self {
            Response::None => write_u32(w, response_tag::NONE),
            Response::NewMove { room_id, mv } => {
                write_u32(w, response_tag::NEW_MOVE)?;
                write_i32(w, *room_id)?;
                write_i8(w, mv.0)?;
                write_i8(w, mv.1)
            }
            Response::NewRoomResult { room_id } => {
                write_u32(w, response_tag::NEW_ROOM_RESULT)?;
                write_i32(w, *room_id)
            }
            Response::JoinResult { success } => {
                write_u32(w, response_tag::JOIN_RESULT)?;
                write_bool(w, *success)
            }
            Response::PlayerJoined => write_u32(w, response_tag::PLAYER_JOINED),
            Response::ListRooms { rooms } => {
                write_u32(w, response_tag::LIST_ROOMS)?;
                write_i32(w, rooms.len() as i32)?;
                for room in rooms {
                    room.write(w)?;
                }
                Ok(())
            }
            Response::IllegalMove { snapshot } => {
                write_u32(w, response_tag::ILLEGAL_MOVE)?;
                write_game_data(w, snapshot)
            }
            Response::Exit => write_u32(w, response_tag::EXIT),
        }
    }
}
