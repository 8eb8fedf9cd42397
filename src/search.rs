//! The main search: negamax alpha-beta with transposition-table probing,
//! move ordering, and a quiescence extension at the leaves. This module
//! owns a single search episode's statistics; `controller` drives the
//! iterative-deepening loop on top of it and owns the state (TT,
//! killers, history) that persists across moves within a game.

use crate::chess_board::ChessBoard;
use crate::evaluate;
use crate::movegen::{self, ChessMove};
use crate::ordering::{self, HistoryTable, KillerTable};
use crate::pieces;
use crate::tt::{TTFlag, TranspositionTable};

pub const INFINITY: i32 = 1_000_000;

// In-check quiescence is allowed to run deeper than the not-in-check
// case, since forced evasions are typically short-lived but must all be
// resolved before standing pat is trustworthy.
const QS_MAX_DEPTH_IN_CHECK: u8 = 6;
const QS_MAX_DEPTH_QUIET: u8 = 12;

const DELTA_PRUNING_MARGIN: i32 = 100;
const DELTA_PRUNING_MIN_PHASE: i32 = 4;

// Per-iteration counters, reset by the controller at the start of each
// depth.
#[derive(Debug, Default, Clone, Copy)]
pub struct SearchStats {
    pub nodes_searched: u64,
    pub quiescence_nodes: u64,
    pub tt_hits: u64,
    pub tt_misses: u64,
    pub tt_cutoffs: u64,
    pub ab_cutoffs: u64,
}

impl SearchStats {
    pub fn reset(&mut self) {
        *self = SearchStats::default();
    }
}

// Owns the board and the tables the search consults and updates: the
// transposition table, killer moves, and history heuristic. These
// persist across `select_move` calls within a game (see `controller`);
// only `SearchStats` resets every iteration.
pub struct SearchEngine {
    pub board: ChessBoard,
    pub tt: TranspositionTable,
    pub killers: KillerTable,
    pub history: HistoryTable,
    pub stats: SearchStats,
}

impl SearchEngine {
    pub fn new() -> SearchEngine {
        SearchEngine {
            board: ChessBoard::new(),
            tt: TranspositionTable::with_default_size(),
            killers: KillerTable::new(),
            history: HistoryTable::new(),
            stats: SearchStats::default(),
        }
    }

    pub fn new_game(&mut self) {
        self.board.new_game();
        self.clear_tables();
    }

    pub fn clear_tables(&mut self) {
        self.tt.clear();
        self.killers.clear();
        self.history.clear();
    }

    fn side_to_move(&self) -> usize {
        if self.board.whites_turn { pieces::COLOR_WHITE } else { pieces::COLOR_BLACK }
    }

    // Negamax alpha-beta search from the current board position.
    // `alpha`/`beta` are expressed relative to the side to move (negamax
    // convention): a positive score favors whoever is to move at this
    // node. Returns a side-to-move-relative score.
    pub fn negamax(&mut self, depth: u8, mut alpha: i32, mut beta: i32, ply_from_root: i32) -> i32 {
        self.stats.nodes_searched += 1;

        // Repetition / fifty-move gate: only away from the root, so the
        // root is always free to commit to its own best move even if a
        // line has repeated earlier in the game.
        if ply_from_root > 0 && (self.board.is_repetition(2) || self.board.can_claim_fifty_move_or_repetition()) {
            return 0;
        }

        if self.board.is_checkmate() || self.board.is_stalemate() || self.board.is_insufficient_material() {
            return self.relative_evaluate(ply_from_root);
        }

        if depth == 0 {
            return self.quiescence(alpha, beta, ply_from_root, 0);
        }

        let alpha_original = alpha;
        let beta_original = beta;

        // TT probe, skipped at the root: the controller needs to see
        // every root move's real score, not a cached cutoff.
        let mut tt_move: Option<ChessMove> = None;
        if ply_from_root > 0 {
            if let Some(entry) = self.tt.probe(self.board.zobrist_hash, ply_from_root) {
                self.stats.tt_hits += 1;
                tt_move = entry.best_move;
                if entry.depth >= depth {
                    match entry.flag {
                        TTFlag::Exact => {
                            self.stats.tt_cutoffs += 1;
                            return entry.value;
                        }
                        TTFlag::LowerBound => alpha = alpha.max(entry.value),
                        TTFlag::UpperBound => beta = beta.min(entry.value),
                    }
                    if alpha >= beta {
                        self.stats.tt_cutoffs += 1;
                        return entry.value;
                    }
                }
            } else {
                self.stats.tt_misses += 1;
            }
        }

        let my_color = self.side_to_move();
        let mut moves = movegen::generate_all_psuedo_legal_moves(&self.board, my_color);
        movegen::retain_only_legal_moves(&mut self.board, &mut moves);

        ordering::order_moves(&mut moves, ply_from_root as usize, &self.killers, &self.history);
        splice_move_to_front(&mut moves, tt_move);

        let mut best_score = -INFINITY;
        let mut best_move: Option<ChessMove> = None;

        for mv in moves.iter() {
            self.board.make_move(mv.start_square, mv.end_square, mv.promotion);
            let score = -self.negamax(depth - 1, -beta, -alpha, ply_from_root + 1);
            self.board.unmake_move();

            if score > best_score {
                best_score = score;
                best_move = Some(*mv);
            }
            if best_score > alpha {
                alpha = best_score;
            }
            if alpha >= beta {
                self.stats.ab_cutoffs += 1;
                if mv.is_quiet() {
                    self.history.update(mv, depth);
                    self.killers.store(*mv, ply_from_root as usize);
                }
                break;
            }
        }

        let flag = if best_score <= alpha_original {
            TTFlag::UpperBound
        } else if best_score >= beta_original {
            TTFlag::LowerBound
        } else {
            TTFlag::Exact
        };
        self.tt.store(self.board.zobrist_hash, depth, best_score, flag, best_move, ply_from_root);

        best_score
    }

    // Quiescence search: resolve captures (and, when in check, every
    // evasion) until the position is quiet, so the search doesn't stop
    // mid-tactic. Returns a side-to-move-relative score. Never touches
    // the transposition table, killers, or history.
    pub fn quiescence(&mut self, mut alpha: i32, beta: i32, ply_from_root: i32, qs_depth: u8) -> i32 {
        self.stats.quiescence_nodes += 1;

        if self.board.is_checkmate() || self.board.is_stalemate() || self.board.is_insufficient_material() {
            return self.relative_evaluate(ply_from_root);
        }

        let in_check = self.board.is_in_check();
        let cap = if in_check { QS_MAX_DEPTH_IN_CHECK } else { QS_MAX_DEPTH_QUIET };
        if qs_depth >= cap {
            return self.relative_evaluate(ply_from_root);
        }

        let stand_pat = self.relative_evaluate(ply_from_root);

        if !in_check {
            if stand_pat >= beta {
                return beta;
            }
            if stand_pat > alpha {
                alpha = stand_pat;
            }
        }

        let my_color = self.side_to_move();
        let mut moves = if in_check {
            let mut m = movegen::generate_all_psuedo_legal_moves(&self.board, my_color);
            movegen::retain_only_legal_moves(&mut self.board, &mut m);
            m
        } else {
            let mut m = movegen::generate_capture_moves(&self.board, my_color);
            movegen::retain_only_legal_moves(&mut self.board, &mut m);
            m
        };

        if moves.is_empty() {
            return stand_pat;
        }

        ordering::order_moves(&mut moves, ply_from_root as usize, &self.killers, &self.history);

        let phase = evaluate::calculate_game_phase(&self.board);

        for mv in moves.iter() {
            if !in_check && phase > DELTA_PRUNING_MIN_PHASE && mv.promotion.is_none() {
                if let Some(victim) = mv.captured_piece {
                    let victim_value = pieces::PIECE_VALUES_MG[victim];
                    if stand_pat + victim_value + DELTA_PRUNING_MARGIN < alpha {
                        continue;
                    }
                }
            }

            self.board.make_move(mv.start_square, mv.end_square, mv.promotion);
            let score = -self.quiescence(-beta, -alpha, ply_from_root + 1, qs_depth + 1);
            self.board.unmake_move();

            if score > alpha {
                alpha = score;
            }
            if alpha >= beta {
                return beta;
            }
        }

        alpha
    }

    // evaluate::evaluate is White-relative; negamax/quiescence work in
    // side-to-move-relative terms.
    fn relative_evaluate(&mut self, ply_from_root: i32) -> i32 {
        let white_relative = evaluate::evaluate(&mut self.board, ply_from_root);
        if self.board.whites_turn { white_relative } else { -white_relative }
    }
}

// Move a candidate move (if present among `moves`) to the front,
// preserving the relative order of the rest. Used to place the
// transposition-table move first after the remaining moves have already
// been scored and sorted.
fn splice_move_to_front(moves: &mut Vec<ChessMove>, candidate: Option<ChessMove>) {
    let Some(candidate) = candidate else { return };
    if let Some(pos) = moves.iter().position(|m| {
        m.start_square == candidate.start_square && m.end_square == candidate.end_square && m.promotion == candidate.promotion
    }) {
        let mv = moves.remove(pos);
        moves.insert(0, mv);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_minimax(board: &mut ChessBoard, depth: u8, ply_from_root: i32) -> i32 {
        if board.is_checkmate() || board.is_stalemate() || board.is_insufficient_material() {
            let white_relative = evaluate::evaluate(board, ply_from_root);
            return if board.whites_turn { white_relative } else { -white_relative };
        }
        if depth == 0 {
            let white_relative = evaluate::evaluate(board, ply_from_root);
            return if board.whites_turn { white_relative } else { -white_relative };
        }
        let color = if board.whites_turn { pieces::COLOR_WHITE } else { pieces::COLOR_BLACK };
        let mut moves = movegen::generate_all_psuedo_legal_moves(board, color);
        movegen::retain_only_legal_moves(board, &mut moves);
        let mut best = -INFINITY;
        for mv in moves.iter() {
            board.make_move(mv.start_square, mv.end_square, mv.promotion);
            let score = -naive_minimax(board, depth - 1, ply_from_root + 1);
            board.unmake_move();
            best = best.max(score);
        }
        best
    }

    #[test]
    fn test_alpha_beta_matches_naive_minimax_shallow() {
        let mut engine = SearchEngine::new();
        engine.board.new_game();
        engine.board.make_move(12, 28, None); // e4
        engine.board.make_move(51, 35, None); // d5

        let mut reference_board = ChessBoard::new();
        reference_board.new_game();
        reference_board.make_move(12, 28, None);
        reference_board.make_move(51, 35, None);

        let ab_score = engine.negamax(3, -INFINITY, INFINITY, 0);
        let minimax_score = naive_minimax(&mut reference_board, 3, 0);
        assert_eq!(ab_score, minimax_score);
    }

    #[test]
    fn test_mate_in_one_is_found() {
        let mut engine = SearchEngine::new();
        engine.board.set_from_fen("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1").unwrap();
        let score = engine.negamax(2, -INFINITY, INFINITY, 0);
        assert!(score >= 99_998);
    }

    #[test]
    fn test_quiescence_resolves_hanging_capture() {
        let mut engine = SearchEngine::new();
        // White's queen hangs to a black pawn; a static, non-quiescent
        // eval would see White up a queen, but quiescence should already
        // account for the reply ...dxe4.
        engine.board.set_from_fen("4k3/8/8/3p4/4Q3/8/8/4K3 w - - 0 1").unwrap();
        let depth0_score = engine.negamax(0, -INFINITY, INFINITY, 0);
        assert!(depth0_score < 800);
    }

    #[test]
    fn test_repetition_gate_is_reachable_via_shuffling() {
        let mut engine = SearchEngine::new();
        engine.board.new_game();
        for _ in 0..2 {
            engine.board.make_move(1, 18, None); // Nb1-c3
            engine.board.make_move(57, 42, None); // Nb8-c6
            engine.board.make_move(18, 1, None); // Nc3-b1
            engine.board.make_move(42, 57, None); // Nc6-b8
        }
        assert!(engine.board.is_repetition(2));
    }
}
