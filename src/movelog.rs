//! The reversible move/capture log behind undo and redo.
//!
//! Bounded to 512 entries: a long-lived server never wants a single
//! pathological game to grow its log without limit, and a real game is
//! always far shorter than this.

use crate::point::Point;

/// Maximum number of moves (and, separately, maximum number of captured
/// stones) a single game's log can hold.
pub const MAX_MOVES: usize = 512;

/// An ordered, bounded record of moves played and the stones each one
/// captured.
///
/// Invariant: `move_count <= last_valid_move_count`. A new move played after
/// an undo truncates the redo tail by resetting `last_valid_move_count` to
/// `move_count` before the new entry is appended.
#[derive(Clone, Debug)]
pub struct MoveLog {
    moves: Vec<Point>,
    /// For each applied move, how many stones it captured.
    removed_count: Vec<u16>,
    /// All captured stones across the game, in move order.
    removed: Vec<Point>,
    move_count: usize,
    last_valid_move_count: usize,
}

impl MoveLog {
    pub fn new() -> Self {
        MoveLog {
            moves: Vec::new(),
            removed_count: Vec::new(),
            removed: Vec::new(),
            move_count: 0,
            last_valid_move_count: 0,
        }
    }

    pub fn move_count(&self) -> usize {
        self.move_count
    }

    pub fn last_valid_move_count(&self) -> usize {
        self.last_valid_move_count
    }

    pub fn removed_count_total(&self) -> usize {
        self.removed.len()
    }

    /// The most recently applied move, if any.
    pub fn last_move(&self) -> Option<Point> {
        self.move_count.checked_sub(1).map(|i| self.moves[i])
    }

    /// The move at index `n` (only valid for `n < last_valid_move_count`).
    pub fn move_at(&self, n: usize) -> Point {
        self.moves[n]
    }

    /// How many stones the move at index `n` captured.
    pub fn captured_count_at(&self, n: usize) -> usize {
        self.removed_count[n] as usize
    }

    /// The captured stone at absolute offset `k` into the captured-stones
    /// sequence (as returned by `removed_count_total`'s indexing space).
    pub fn captured_stone_at(&self, k: usize) -> Point {
        self.removed[k]
    }

    /// Append `(i, j)` at `move_count`, advancing the cursor and lifting the
    /// redo high-water mark if this move extends past it.
    ///
    /// If a stale redo tail exists (from an earlier undo) and `p` matches
    /// the move already recorded at this slot, this is a redo continuing
    /// that branch and the tail is left intact. If `p` differs, the caller
    /// is starting a new branch: the stale tail (and its captures) is
    /// discarded and `last_valid_move_count` drops to the new cursor, per
    /// the truncation invariant.
    pub fn register_move(&mut self, p: Point) {
        debug_assert!(self.move_count < MAX_MOVES, "move log exhausted");
        if self.move_count >= MAX_MOVES {
            // An engineering invariant, not a rule violation: a real game
            // never reaches 512 moves. Debug builds catch it above; a
            // release build drops the move rather than growing past the
            // bound the wire format's fixed-size arrays assume.
            return;
        }
        let has_stale_tail = self.move_count < self.moves.len();
        let is_redo = has_stale_tail && self.moves[self.move_count] == p;

        if has_stale_tail && !is_redo {
            self.moves.truncate(self.move_count);
            self.removed_count.truncate(self.move_count);
            let kept = self.removed_count_before(self.move_count);
            self.removed.truncate(kept);
            self.last_valid_move_count = self.move_count;
        }

        if self.move_count == self.moves.len() {
            self.moves.push(p);
            self.removed_count.push(0);
        } else {
            self.removed_count[self.move_count] = 0;
        }
        self.move_count += 1;
        if self.last_valid_move_count < self.move_count {
            self.last_valid_move_count = self.move_count;
        }
    }

    /// Record that the move just appended by `register_move` captured
    /// `stones`, appending them to the captured-stone sequence.
    pub fn register_capture(&mut self, stones: &[Point]) {
        debug_assert!(self.move_count > 0);
        self.removed_count[self.move_count - 1] = stones.len() as u16;
        self.removed.truncate(self.removed_count_before(self.move_count - 1));
        self.removed.extend_from_slice(stones);
    }

    /// Sum of `removed_count` for all moves strictly before `n` — the offset
    /// into `removed` where move `n`'s captures begin.
    fn removed_count_before(&self, n: usize) -> usize {
        self.removed_count[..n].iter().map(|&c| c as usize).sum()
    }

    /// Decrement `move_count`. The caller (GameData::undo) is responsible
    /// for restoring the board; this only pops the log cursor and returns
    /// the undone move plus its captured stones (most recent first, as
    /// pushed).
    pub fn pop(&mut self) -> Option<(Point, Vec<Point>)> {
        if self.move_count == 0 {
            return None;
        }
        self.move_count -= 1;
        let p = self.moves[self.move_count];
        let n_captured = self.removed_count[self.move_count] as usize;
        let start = self.removed.len() - n_captured;
        let captured = self.removed[start..].to_vec();
        self.removed.truncate(start);
        Some((p, captured))
    }
}

impl Default for MoveLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveLog {
    /// Rebuild a log from its raw parts, as decoded off the wire. The
    /// caller is trusted to hand over internally-consistent vectors (fixed
    /// length `MAX_MOVES`, counts summing correctly) — this is only used to
    /// reconstruct a `GameData` snapshot that was itself produced by
    /// encoding a valid, in-memory log.
    pub fn from_parts(
        moves: Vec<Point>,
        removed_count: Vec<u16>,
        removed: Vec<Point>,
        move_count: usize,
        last_valid_move_count: usize,
        removed_count_total: usize,
    ) -> Self {
        debug_assert_eq!(removed.len(), removed_count_total);
        MoveLog {
            moves,
            removed_count,
            removed,
            move_count,
            last_valid_move_count,
        }
    }
}
