//! The authoritative, reversible rules engine.
//!
//! `GameData` composes a [`Board`] and a [`MoveLog`]: the board is always
//! exactly the result of replaying the log's first `move_count` entries from
//! an empty position. Every public operation either succeeds and extends
//! the log, or fails and leaves `GameData` bit-identical to how it was
//! called — the rules engine never panics on an illegal move and never
//! partially applies one.

use crate::board::{Board, CellBitmap, MAX_CELLS};
use crate::movelog::MoveLog;
use crate::point::{Point, Stone};

/// 3.5 points for boards up to 12x12, 6.5 for larger boards.
fn komi_for(size: u8) -> f32 {
    if size <= 12 {
        3.5
    } else {
        6.5
    }
}

/// A Go game: board state plus its reversible move history.
#[derive(Clone, Debug)]
pub struct GameData {
    pub board: Board,
    pub log: MoveLog,
}

impl GameData {
    pub fn new(size: u8) -> Self {
        GameData {
            board: Board::new(size),
            log: MoveLog::new(),
        }
    }

    /// The color to move, inferred from how many moves have been played.
    pub fn active_player(&self) -> Stone {
        Stone::to_move(self.log.move_count())
    }

    /// Attempt to play `(i, j)` for the active player.
    ///
    /// Returns `true` and extends the log on success. Returns `false` and
    /// leaves `self` completely unchanged on any rejection: occupied
    /// target, out-of-range coordinates, suicide, or ko.
    pub fn try_move(&mut self, i: i32, j: i32) -> bool {
        let p = Point::new(i, j);
        let s = self.active_player();

        if p.is_sentinel() {
            self.log.register_move(p);
            return true;
        }
        if !self.board.in_bounds(i, j) {
            return false;
        }
        if self.board.stone(i, j) != Stone::Empty {
            return false;
        }

        let previous_presence = self.presence_before_last_move();

        self.board.set(i, j, s);

        let opponent = s.opponent();
        let mut to_remove: Vec<Point> = Vec::new();
        let mut marked = [false; MAX_CELLS];
        for n in [
            Point::new(i - 1, j),
            Point::new(i + 1, j),
            Point::new(i, j - 1),
            Point::new(i, j + 1),
        ] {
            if !self.board.in_bounds(n.i, n.j) {
                continue;
            }
            if self.board.stone(n.i, n.j) != opponent {
                continue;
            }
            let group = self.board.group_of(n.i, n.j);
            if self.board.liberties(&group) == 0 {
                for &stone in &group {
                    let idx = stone.i as usize * crate::board::MAX_N + stone.j as usize;
                    if !marked[idx] {
                        marked[idx] = true;
                        to_remove.push(stone);
                    }
                }
            }
        }

        let played_group = self.board.group_of(i, j);
        let played_liberties = self.board.liberties(&played_group);
        if played_liberties == 0 && to_remove.is_empty() {
            // Suicide: restore and reject.
            self.board.set(i, j, Stone::Empty);
            return false;
        }

        for &stone in &to_remove {
            self.board.set(stone.i, stone.j, Stone::Empty);
        }

        // Simple ko: reject if this move exactly reproduces the presence
        // bitmap from before the previous move. Presence bits only, not
        // color: a single-step check, not full positional superko.
        if self.board.presence_bitmap() == previous_presence {
            self.board.set(i, j, Stone::Empty);
            for &stone in &to_remove {
                self.board.set(stone.i, stone.j, opponent);
            }
            return false;
        }

        self.log.register_move(p);
        self.log.register_capture(&to_remove);
        true
    }

    /// Presence bitmap the board would have after virtually undoing the
    /// most recent move, without mutating `self`.
    fn presence_before_last_move(&self) -> CellBitmap {
        let Some(last) = self.log.last_move() else {
            return self.board.presence_bitmap();
        };
        if last.is_sentinel() {
            return self.board.presence_bitmap();
        }

        let move_index = self.log.move_count() - 1;
        let mut shadow = self.board.clone();
        shadow.set(last.i, last.j, Stone::Empty);

        let n_captured = self.log.captured_count_at(move_index);
        if n_captured > 0 {
            let captured_color = Stone::to_move(move_index).opponent();
            let total = self.log.removed_count_total();
            for k in (total - n_captured)..total {
                let stone = self.log.captured_stone_at(k);
                shadow.set(stone.i, stone.j, captured_color);
            }
        }

        shadow.presence_bitmap()
    }

    /// `try_move(-1, 0)` — pass.
    pub fn pass(&mut self) -> bool {
        self.try_move(Point::PASS.i, Point::PASS.j)
    }

    /// `try_move(-2, 0)` — resign.
    pub fn resign(&mut self) -> bool {
        self.try_move(Point::RESIGN.i, Point::RESIGN.j)
    }

    /// Undo the most recent move. No-op at the start of the game.
    pub fn undo(&mut self) {
        if self.log.move_count() == 0 {
            return;
        }
        let undone_color = self.active_player().opponent();
        let Some((p, captured)) = self.log.pop() else {
            return;
        };
        if p.is_sentinel() {
            return;
        }
        self.board.set(p.i, p.j, Stone::Empty);
        let restored_color = undone_color.opponent();
        for stone in captured {
            self.board.set(stone.i, stone.j, restored_color);
        }
    }

    /// Undo up to `n` moves, stopping early at the start of the game.
    pub fn undo_n(&mut self, n: usize) {
        for _ in 0..n {
            if self.log.move_count() == 0 {
                break;
            }
            self.undo();
        }
    }

    /// Redo the move undone most recently. No-op if there is nothing to
    /// redo. Always succeeds: the engine is deterministic, so a move that
    /// was legal once is legal again when replayed from the same state.
    pub fn redo(&mut self) {
        if self.log.move_count() == self.log.last_valid_move_count() {
            return;
        }
        let next = self.log.move_at(self.log.move_count());
        let ok = self.try_move(next.i, next.j);
        debug_assert!(ok, "redo of a previously-legal move must succeed");
    }

    /// The winner, or `Stone::Empty` if the game is not yet over.
    ///
    /// The game ends on resignation or two consecutive passes. On
    /// resignation the winner is the opposite of whoever resigned (the
    /// active player at the moment of resignation is the loser). On two
    /// passes, territory is scored by flood-filling every empty region,
    /// captures are tallied from the log, and komi is added to white.
    pub fn winner(&self, black_points: &mut f32, white_points: &mut f32) -> Stone {
        *black_points = 0.0;
        *white_points = 0.0;

        let count = self.log.move_count();
        if count == 0 {
            return Stone::Empty;
        }
        let last = self.log.move_at(count - 1);
        if last.is_resign() {
            return Stone::to_move(count);
        }
        if !last.is_pass() {
            return Stone::Empty;
        }
        if count < 2 {
            return Stone::Empty;
        }
        let previous = self.log.move_at(count - 2);
        if !previous.is_pass() {
            return Stone::Empty;
        }

        let mut visited = [false; MAX_CELLS];
        let size = self.board.size as i32;
        for i in 0..size {
            for j in 0..size {
                self.board
                    .count_region(i, j, &mut visited, black_points, white_points);
            }
        }

        for idx in 0..count {
            let captures = self.log.captured_count_at(idx) as f32;
            if idx % 2 == 0 {
                *black_points += captures;
            } else {
                *white_points += captures;
            }
        }

        *white_points += komi_for(self.board.size);

        if *white_points > *black_points {
            Stone::White
        } else {
            Stone::Black
        }
    }
}
