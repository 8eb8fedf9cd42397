//! Move ordering: killer moves, the history heuristic, and the
//! capture/promotion priority scheme used to sort moves before each
//! search node is explored. The transposition-table move itself is not
//! scored here -- callers splice it to the front of the move list before
//! calling score_move on the rest.

use crate::movegen::ChessMove;
use crate::pieces;

pub const MAX_PLY: usize = 128;

const KILLER_PRIMARY_BONUS: i32 = 900_000;
const KILLER_SECONDARY_BONUS: i32 = 800_000;
const PROMOTION_BONUS: i32 = 9_000;
const CAPTURE_BASE_BONUS: i32 = 100_000;

// Two killer-move slots per ply: quiet moves that caused a beta cutoff
// at that ply in some other branch of the tree, tried early since
// they're likely to be strong in sibling positions too.
pub struct KillerTable {
    killers: Vec<[Option<ChessMove>; 2]>,
}

impl KillerTable {
    pub fn new() -> KillerTable {
        KillerTable {
            killers: vec![[None, None]; MAX_PLY],
        }
    }

    pub fn clear(&mut self) {
        for slot in self.killers.iter_mut() {
            *slot = [None, None];
        }
    }

    // Record a cutoff-causing quiet move at the given ply. The existing
    // primary killer (if different) is demoted to secondary.
    pub fn store(&mut self, mv: ChessMove, ply: usize) {
        if ply >= MAX_PLY {
            return;
        }
        if let Some(primary) = self.killers[ply][0] {
            if primary.start_square == mv.start_square && primary.end_square == mv.end_square {
                return;
            }
        }
        self.killers[ply][1] = self.killers[ply][0];
        self.killers[ply][0] = Some(mv);
    }

    // Returns Some(bonus) if the move matches a stored killer at this
    // ply, where a primary-slot match scores higher than a secondary one.
    fn bonus_for(&self, mv: &ChessMove, ply: usize) -> Option<i32> {
        if ply >= MAX_PLY {
            return None;
        }
        if let Some(primary) = self.killers[ply][0] {
            if primary.start_square == mv.start_square && primary.end_square == mv.end_square {
                return Some(KILLER_PRIMARY_BONUS);
            }
        }
        if let Some(secondary) = self.killers[ply][1] {
            if secondary.start_square == mv.start_square && secondary.end_square == mv.end_square {
                return Some(KILLER_SECONDARY_BONUS);
            }
        }
        None
    }
}

// Accumulates a depth-squared bonus for quiet moves, indexed by
// (from square, to square), that have historically caused beta cutoffs.
// This is consulted only when a move is neither a capture, promotion,
// nor a killer.
pub struct HistoryTable {
    history: Box<[[i32; 64]; 64]>,
}

impl HistoryTable {
    pub fn new() -> HistoryTable {
        HistoryTable {
            history: Box::new([[0; 64]; 64]),
        }
    }

    pub fn clear(&mut self) {
        for row in self.history.iter_mut() {
            for v in row.iter_mut() {
                *v = 0;
            }
        }
    }

    pub fn update(&mut self, mv: &ChessMove, depth: u8) {
        let bonus = (depth as i32) * (depth as i32);
        self.history[mv.start_square][mv.end_square] += bonus;
    }

    fn score(&self, mv: &ChessMove) -> i32 {
        self.history[mv.start_square][mv.end_square]
    }
}

// Score a single move for ordering purposes, combining (in descending
// priority): promotions, MVV-LVA captures, killer moves, and the
// history heuristic for everything else.
pub fn score_move(mv: &ChessMove, ply: usize, killers: &KillerTable, history: &HistoryTable) -> i32 {
    if mv.promotion.is_some() {
        if let Some(victim) = mv.captured_piece {
            return CAPTURE_BASE_BONUS + pieces::MVV_LVA[victim][mv.piece] + PROMOTION_BONUS;
        }
        return PROMOTION_BONUS;
    }
    if let Some(victim) = mv.captured_piece {
        return CAPTURE_BASE_BONUS + pieces::MVV_LVA[victim][mv.piece];
    }
    if let Some(bonus) = killers.bonus_for(mv, ply) {
        return bonus;
    }
    history.score(mv)
}

// Sort moves in place by descending priority score. Callers that have
// already identified a transposition-table move should move it to index
// 0 themselves, either before or after calling this.
pub fn order_moves(moves: &mut Vec<ChessMove>, ply: usize, killers: &KillerTable, history: &HistoryTable) {
    for mv in moves.iter_mut() {
        mv.priority = score_move(mv, ply, killers, history);
    }
    moves.sort_unstable_by(|a, b| b.priority.cmp(&a.priority));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_move(start: usize, end: usize) -> ChessMove {
        ChessMove {
            start_square: start,
            end_square: end,
            piece: pieces::KNIGHT,
            captured_piece: None,
            promotion: None,
            priority: 0,
            is_en_passant: false,
        }
    }

    #[test]
    fn test_killer_primary_then_secondary() {
        let mut killers = KillerTable::new();
        let m1 = quiet_move(1, 18);
        let m2 = quiet_move(6, 21);
        killers.store(m1, 3);
        killers.store(m2, 3);
        assert_eq!(killers.bonus_for(&m2, 3), Some(KILLER_PRIMARY_BONUS));
        assert_eq!(killers.bonus_for(&m1, 3), Some(KILLER_SECONDARY_BONUS));
    }

    #[test]
    fn test_history_accumulates_depth_squared() {
        let mut history = HistoryTable::new();
        let mv = quiet_move(12, 28);
        history.update(&mv, 4);
        history.update(&mv, 3);
        assert_eq!(history.score(&mv), 16 + 9);
    }

    #[test]
    fn test_capture_outranks_quiet_history() {
        let killers = KillerTable::new();
        let mut history = HistoryTable::new();
        let quiet = quiet_move(12, 28);
        history.update(&quiet, 20); // inflate history score artificially high
        let capture = ChessMove {
            start_square: 12,
            end_square: 20,
            piece: pieces::PAWN,
            captured_piece: Some(pieces::PAWN),
            promotion: None,
            priority: 0,
            is_en_passant: false,
        };
        assert!(score_move(&capture, 0, &killers, &history) > score_move(&quiet, 0, &killers, &history));
    }

    #[test]
    fn test_underpromotion_gets_same_bonus_as_queen_promotion() {
        let killers = KillerTable::new();
        let history = HistoryTable::new();
        let promote = |promo: usize| ChessMove {
            start_square: 48,
            end_square: 56,
            piece: pieces::PAWN,
            captured_piece: None,
            promotion: Some(promo),
            priority: 0,
            is_en_passant: false,
        };
        let queen_score = score_move(&promote(pieces::QUEEN), 0, &killers, &history);
        let knight_score = score_move(&promote(pieces::KNIGHT), 0, &killers, &history);
        assert_eq!(queen_score, PROMOTION_BONUS);
        assert_eq!(knight_score, PROMOTION_BONUS);
    }
}
