use criterion::{black_box, criterion_group, criterion_main, Criterion};
use corvus_chess::chess_board::ChessBoard;
use corvus_chess::movegen;
use corvus_chess::pieces;

fn perft(board: &mut ChessBoard, depth: usize) -> u64 {
    if depth == 0 {
        return 1;
    }
    let my_color = if board.whites_turn { pieces::COLOR_WHITE } else { pieces::COLOR_BLACK };
    let mut moves = movegen::generate_all_psuedo_legal_moves(board, my_color);
    movegen::retain_only_legal_moves(board, &mut moves);
    let mut count = 0;
    for mv in moves.iter() {
        board.make_move(mv.start_square, mv.end_square, mv.promotion);
        count += perft(board, depth - 1);
        board.unmake_move();
    }
    count
}

fn bench_perft_depth_4(c: &mut Criterion) {
    let mut board = ChessBoard::new();
    board.new_game();
    c.bench_function("perft depth 4", |b| {
        b.iter(|| black_box(perft(&mut board, 4)))
    });
}

fn bench_perft_depth_5(c: &mut Criterion) {
    let mut board = ChessBoard::new();
    board.new_game();
    c.bench_function("perft depth 5", |b| {
        b.iter(|| black_box(perft(&mut board, 5)))
    });
}

criterion_group!(benches, bench_perft_depth_4, bench_perft_depth_5);
criterion_main!(benches);
