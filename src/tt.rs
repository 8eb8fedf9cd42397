//! The transposition table: a fixed-size, power-of-two-masked cache of
//! previously searched positions, keyed by Zobrist hash.
//!
//! Mate scores are stored "from the current node" but need to be
//! path-independent to be reusable from other nodes, so they're
//! normalized relative to the root on store and denormalized relative to
//! the probing node's ply on retrieval (see normalize_mate_score /
//! denormalize_mate_score).

use crate::movegen::ChessMove;

pub const MATE_SCORE: i32 = 100_000;
// Scores at or beyond this magnitude are mate-distance scores and need
// ply-relative normalization; material/PST scores never approach this
// range (a full material advantage tops out in the low thousands).
pub const MATE_THRESHOLD: i32 = 90_000;

const DEFAULT_TABLE_SIZE_MB: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TTFlag {
    Exact,
    LowerBound,
    UpperBound,
}

#[derive(Clone, Copy)]
pub struct TTEntry {
    pub key: u64,
    pub depth: u8,
    pub value: i32,
    pub flag: TTFlag,
    pub best_move: Option<ChessMove>,
}

impl Default for TTEntry {
    fn default() -> TTEntry {
        TTEntry {
            key: 0,
            depth: 0,
            value: 0,
            flag: TTFlag::Exact,
            best_move: None,
        }
    }
}

pub struct TranspositionTable {
    entries: Vec<Option<TTEntry>>,
    mask: usize,
}

impl TranspositionTable {
    // Size the table in megabytes, rounding down to a power of two
    // number of entries (minimum 1024) so indexing can use a cheap mask
    // instead of a modulo.
    pub fn new(size_mb: usize) -> TranspositionTable {
        let entry_size = std::mem::size_of::<Option<TTEntry>>();
        let requested_entries = (size_mb * 1024 * 1024) / entry_size;
        let num_entries = requested_entries.next_power_of_two().max(1024);
        // next_power_of_two rounds UP; if that overshoots the requested
        // budget, back off to the previous power of two.
        let num_entries = if num_entries > requested_entries && num_entries > 1024 {
            num_entries / 2
        } else {
            num_entries
        };
        TranspositionTable {
            entries: vec![None; num_entries],
            mask: num_entries - 1,
        }
    }

    pub fn with_default_size() -> TranspositionTable {
        TranspositionTable::new(DEFAULT_TABLE_SIZE_MB)
    }

    pub fn clear(&mut self) {
        for e in self.entries.iter_mut() {
            *e = None;
        }
    }

    fn index(&self, hash: u64) -> usize {
        hash as usize & self.mask
    }

    // Look up a position by hash. `ply` is the distance from the root of
    // the current search, used to denormalize any mate score found.
    pub fn probe(&self, hash: u64, ply: i32) -> Option<TTEntry> {
        let entry = self.entries[self.index(hash)]?;
        if entry.key != hash {
            return None;
        }
        let mut denormalized = entry;
        denormalized.value = denormalize_mate_score(entry.value, ply);
        Some(denormalized)
    }

    // Store a position. Replacement policy: always store into an empty
    // slot; otherwise replace only if the new entry searched strictly
    // deeper, or searched the same depth (or deeper-but-stale) and is an
    // exact score while the resident entry isn't.
    pub fn store(&mut self, hash: u64, depth: u8, value: i32, flag: TTFlag, best_move: Option<ChessMove>, ply: i32) {
        let normalized_value = normalize_mate_score(value, ply);
        let index = self.index(hash);
        let should_replace = match &self.entries[index] {
            None => true,
            Some(existing) => {
                depth > existing.depth
                    || (depth >= existing.depth && flag == TTFlag::Exact && existing.flag != TTFlag::Exact)
            }
        };
        if should_replace {
            self.entries[index] = Some(TTEntry {
                key: hash,
                depth,
                value: normalized_value,
                flag,
                best_move,
            });
        }
    }
}

// Convert a score found `ply` levels below the root into a
// root-relative, path-independent score suitable for caching: a mate
// found further from the current node is actually further from the
// root, so its magnitude needs to grow by `ply`.
fn normalize_mate_score(value: i32, ply: i32) -> i32 {
    if value > MATE_THRESHOLD {
        value + ply
    } else if value < -MATE_THRESHOLD {
        value - ply
    } else {
        value
    }
}

// Convert a cached root-relative mate score back into a score relative
// to the probing node, `ply` levels below the root.
fn denormalize_mate_score(value: i32, ply: i32) -> i32 {
    if value > MATE_THRESHOLD {
        value - ply
    } else if value < -MATE_THRESHOLD {
        value + ply
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_probe_roundtrip() {
        let mut tt = TranspositionTable::new(1);
        tt.store(12345, 4, 57, TTFlag::Exact, None, 2);
        let entry = tt.probe(12345, 2).unwrap();
        assert_eq!(entry.value, 57);
        assert_eq!(entry.depth, 4);
        assert_eq!(entry.flag, TTFlag::Exact);
    }

    #[test]
    fn test_probe_miss_on_key_mismatch_or_empty() {
        let tt = TranspositionTable::new(1);
        assert!(tt.probe(999, 0).is_none());
    }

    #[test]
    fn test_mate_score_adjustment_round_trips_through_different_ply() {
        let mut tt = TranspositionTable::new(1);
        // A mate found 3 plies below some node where ply_from_root = 5.
        let mate_score_at_node = MATE_SCORE - 3;
        tt.store(42, 10, mate_score_at_node, TTFlag::Exact, None, 5);
        // Probed again from a different node at ply_from_root = 2: the
        // mate should now look 3 plies further away (ply diff = 3).
        let entry = tt.probe(42, 2).unwrap();
        assert_eq!(entry.value, MATE_SCORE - 6);
    }

    #[test]
    fn test_replacement_prefers_deeper_search() {
        let mut tt = TranspositionTable::new(1);
        tt.store(7, 2, 10, TTFlag::UpperBound, None, 0);
        tt.store(7, 8, 20, TTFlag::UpperBound, None, 0);
        let entry = tt.probe(7, 0).unwrap();
        assert_eq!(entry.depth, 8);
        assert_eq!(entry.value, 20);
    }

    #[test]
    fn test_replacement_rejects_shallower_non_exact_search() {
        let mut tt = TranspositionTable::new(1);
        tt.store(7, 8, 20, TTFlag::Exact, None, 0);
        tt.store(7, 2, 10, TTFlag::UpperBound, None, 0);
        let entry = tt.probe(7, 0).unwrap();
        assert_eq!(entry.depth, 8);
        assert_eq!(entry.value, 20);
    }
}
