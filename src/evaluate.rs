//! Static position evaluation: terminal detection, then tapered material
//! + piece-square scoring, always expressed from White's perspective.
//! The search negates as needed for its own (side-to-move-relative)
//! negamax framing.

use crate::chess_board::ChessBoard;
use crate::pieces;
use crate::tt::MATE_SCORE;

pub const TEMPO_BONUS: i32 = 10;

// Returns true if the current position is drawn by insufficient mating
// material for either side.
pub fn is_draw_by_insufficient_material(board: &ChessBoard) -> bool {
    board.is_insufficient_material()
}

// Returns true if the current position has already occurred three times
// (including the current occurrence) over the course of the game.
pub fn is_draw_by_threefold_repetition(board: &ChessBoard) -> bool {
    board.is_repetition(3)
}

// Sum of PHASE_WEIGHT over all non-pawn, non-king pieces on the board,
// clamped to pieces::MAX_PHASE.  24 means "full material", 0 means
// "bare kings and pawns".
pub fn calculate_game_phase(board: &ChessBoard) -> i32 {
    let mut phase = 0;
    for color in 0..2 {
        for piece in 0..6 {
            let count = crate::bitboard::pop_count(board.bb_pieces[color][piece]) as i32;
            phase += pieces::PHASE_WEIGHT[piece] * count;
        }
    }
    phase.min(pieces::MAX_PHASE)
}

// Tapered material + piece-square evaluation, from White's perspective,
// with no terminal detection and no tempo bonus.  Used both by
// `evaluate` and by anything that only wants the material balance.
fn tapered_material_and_pst(board: &ChessBoard) -> i32 {
    let phase = calculate_game_phase(board);
    let mut mg_score = [0i32; 2];
    let mut eg_score = [0i32; 2];

    for color in 0..2 {
        for piece in 0..6 {
            for square in crate::bitboard::occupied_squares(board.bb_pieces[color][piece]) {
                let pst_square = if color == pieces::COLOR_WHITE {
                    square
                } else {
                    pieces::mirror_square(square)
                };
                mg_score[color] += pieces::PIECE_VALUES_MG[piece] + pieces::PST_MIDDLE_GAME[piece][pst_square];
                eg_score[color] += pieces::PIECE_VALUES_EG[piece] + pieces::PST_END_GAME[piece][pst_square];
            }
        }
    }

    let mg = mg_score[pieces::COLOR_WHITE] - mg_score[pieces::COLOR_BLACK];
    let eg = eg_score[pieces::COLOR_WHITE] - eg_score[pieces::COLOR_BLACK];

    (mg * phase + eg * (pieces::MAX_PHASE - phase)) / pieces::MAX_PHASE
}

// Full position evaluation, from White's perspective, positive favors
// White.  `ply_from_root` is needed to prefer shorter mates: a mate
// found deeper in the tree scores closer to zero than one found at the
// root.
//
// Checkmate and stalemate require enumerating legal moves, which in turn
// requires make/unmake, hence the `&mut ChessBoard` receiver; the board
// is left unchanged on return.
pub fn evaluate(board: &mut ChessBoard, ply_from_root: i32) -> i32 {
    if board.is_checkmate() {
        return if board.whites_turn {
            -MATE_SCORE + ply_from_root
        } else {
            MATE_SCORE - ply_from_root
        };
    }
    if board.is_stalemate() || board.is_insufficient_material() {
        return 0;
    }
    tapered_material_and_pst(board) + if board.whites_turn { TEMPO_BONUS } else { -TEMPO_BONUS }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starting_position_is_balanced_apart_from_tempo() {
        let mut board = ChessBoard::new();
        board.new_game();
        // The starting position is symmetric, so the only difference
        // from zero should be the tempo bonus for White to move.
        assert_eq!(evaluate(&mut board, 0), TEMPO_BONUS);
    }

    #[test]
    fn test_extra_queen_is_heavily_favored() {
        let mut board = ChessBoard::new();
        board.set_from_fen("4k3/8/8/8/8/8/8/3QK3 w - - 0 1").unwrap();
        assert!(evaluate(&mut board, 0) > 800);
    }

    #[test]
    fn test_game_phase_starting_position_is_max() {
        let mut board = ChessBoard::new();
        board.new_game();
        assert_eq!(calculate_game_phase(&board), pieces::MAX_PHASE);
    }

    #[test]
    fn test_game_phase_bare_kings_is_zero() {
        let mut board = ChessBoard::new();
        board.set_from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert_eq!(calculate_game_phase(&board), 0);
    }

    #[test]
    fn test_insufficient_material_delegates_to_board() {
        let mut board = ChessBoard::new();
        board.set_from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert!(is_draw_by_insufficient_material(&board));
    }

    #[test]
    fn test_stalemate_evaluates_to_zero() {
        let mut board = ChessBoard::new();
        board.set_from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(evaluate(&mut board, 0), 0);
    }

    #[test]
    fn test_mate_in_one_scores_near_mate_score() {
        let mut board = ChessBoard::new();
        board.set_from_fen("6k1/5ppp/8/8/8/8/5PPP/R6K w - - 0 1").unwrap();
        board.make_move(0, 56, None); // Ra1-a8#
        assert!(evaluate(&mut board, 1) >= MATE_SCORE - 1000);
        board.unmake_move();
    }

    #[test]
    fn test_evaluation_symmetry_up_to_tempo() {
        let mut white_to_move = ChessBoard::new();
        white_to_move.set_from_fen("4k3/8/8/8/8/8/8/3QK3 w - - 0 1").unwrap();
        let mut black_to_move = ChessBoard::new();
        black_to_move.set_from_fen("3qk3/8/8/8/8/8/8/4K3 b - - 0 1").unwrap();
        // Mirroring the position and swapping the side to move should
        // negate the score apart from the (now doubled) tempo term.
        let a = evaluate(&mut white_to_move, 0);
        let b = evaluate(&mut black_to_move, 0);
        assert_eq!(a, -b);
    }
}
