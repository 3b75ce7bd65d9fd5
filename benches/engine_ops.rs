use ai_2048_sim::engine::{self as GameEngine, Board, Move};
use criterion::{criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, SeedableRng};
use std::hint::black_box;

fn warm() { GameEngine::new(); }

fn corpus() -> Vec<Board> {
    let mut rng = StdRng::seed_from_u64(4242);
    let mut boards = Vec::new();
    let mut b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
    boards.push(b);
    let seq = [Move::Left, Move::Up, Move::Right, Move::Down];
    for i in 0..128 {
        let nb = b.shift(seq[i % seq.len()]);
        if nb != b { b = nb.with_random_tile(&mut rng); }
        boards.push(b);
    }
    boards
}

fn bench_moves(c: &mut Criterion) {
    warm();
    let boards = corpus();

    c.bench_function("engine/apply_move_all_dirs", |bch| {
        bch.iter(|| {
            let mut acc = 0u64;
            for &bd in &boards {
                for dir in Move::ALL {
                    let out = bd.apply_move(dir);
                    acc = acc.wrapping_add(out.board.raw() ^ out.score_delta);
                }
            }
            black_box(acc)
        })
    });

    c.bench_function("engine/legal_moves", |bch| {
        bch.iter(|| {
            let mut acc = 0usize;
            for &bd in &boards { acc += bd.legal_moves().len(); }
            black_box(acc)
        })
    });

    c.bench_function("engine/can_move", |bch| {
        bch.iter(|| {
            let mut acc = 0u32;
            for &bd in &boards { acc += bd.can_move() as u32; }
            black_box(acc)
        })
    });

    c.bench_function("engine/spawn", |bch| {
        let mut rng = StdRng::seed_from_u64(1);
        bch.iter(|| {
            let mut acc = 0u64;
            for &bd in &boards { acc ^= bd.with_random_tile(&mut rng).raw(); }
            black_box(acc)
        })
    });
}

criterion_group!(engine_ops, bench_moves);
criterion_main!(engine_ops);
