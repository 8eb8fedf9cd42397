use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use corvus_chess::controller::Engine;

fn bench_search_startpos(c: &mut Criterion) {
    c.bench_function("search_depth_4_startpos", |b| {
        b.iter(|| {
            let mut engine = Engine::new(4);
            engine.new_game();
            engine.select_move(Duration::from_secs(30), Some(4), Duration::from_secs(30))
        })
    });
}

fn bench_search_kiwipete(c: &mut Criterion) {
    let kiwipete = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
    c.bench_function("search_depth_4_kiwipete", |b| {
        b.iter(|| {
            let mut engine = Engine::new(4);
            engine.set_board_from_fen(kiwipete, None).unwrap();
            engine.select_move(Duration::from_secs(30), Some(4), Duration::from_secs(30))
        })
    });
}

criterion_group!(benches, bench_search_startpos, bench_search_kiwipete);
criterion_main!(benches);
