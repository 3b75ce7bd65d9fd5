use ai_2048_sim::engine::{self as GameEngine, Move};
use ai_2048_sim::expectimax::{Expectimax, ExpectimaxConfig};
use ai_2048_sim::game::GameState;
use ai_2048_sim::mcts::{Mcts, MctsConfig};
use criterion::{criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, SeedableRng};
use std::hint::black_box;
use std::time::Duration;

fn warm() { GameEngine::new(); }

fn corpus() -> Vec<GameState> {
    let mut rng = StdRng::seed_from_u64(7777);
    let mut states = Vec::new();
    let mut s = GameState::new(&mut rng);
    states.push(s);
    let seq = [Move::Left, Move::Up, Move::Right, Move::Down];
    for i in 0..64 {
        if let Ok(next) = s.apply(seq[i % seq.len()], &mut rng) { s = next; }
        if s.is_terminal() { break; }
        states.push(s);
    }
    states
}

fn move_index(m: Move) -> u64 {
    Move::ALL.iter().position(|&x| x == m).map_or(0, |i| i as u64)
}

fn bench_expectimax(c: &mut Criterion) {
    warm();
    let states = corpus();
    let mut ex = Expectimax::with_config(ExpectimaxConfig { depth: 3 });

    c.bench_function("expectimax/branch_evals", |bch| {
        bch.iter(|| {
            let mut acc = 0.0;
            for s in &states {
                if let Ok(branches) = ex.branch_evals(s) {
                    for be in branches { if be.legal { acc += be.ev; } }
                }
            }
            black_box(acc)
        })
    });

    c.bench_function("expectimax/best_move", |bch| {
        bch.iter(|| {
            let mut acc = 0u64;
            for s in &states {
                acc ^= ex.best_move(s).map(move_index).unwrap_or(0);
            }
            black_box(acc)
        })
    });
}

fn bench_mcts(c: &mut Criterion) {
    warm();
    let states = corpus();
    // Iteration-capped so the measurement does not depend on the clock.
    let cfg = MctsConfig {
        time_budget: Duration::from_secs(60),
        max_iterations: Some(200),
        seed: Some(11),
        ..Default::default()
    };
    let Ok(mut mcts) = Mcts::with_config(cfg) else { return };

    c.bench_function("mcts/best_move_200_iters", |bch| {
        bch.iter(|| {
            let mut acc = 0u64;
            for s in states.iter().take(8) {
                acc ^= mcts.best_move(s).map(move_index).unwrap_or(0);
            }
            black_box(acc)
        })
    });
}

fn bench_e2e(c: &mut Criterion) {
    warm();
    let mut ex = Expectimax::with_config(ExpectimaxConfig { depth: 3 });
    c.bench_function("e2e/expectimax_64_moves", |bch| {
        bch.iter(|| {
            let mut rng = StdRng::seed_from_u64(13);
            let mut s = GameState::new(&mut rng);
            let mut steps = 0;
            while steps < 64 && !s.is_terminal() {
                let Ok(dir) = ex.best_move(&s) else { break };
                let Ok(next) = s.apply(dir, &mut rng) else { break };
                s = next;
                steps += 1;
            }
            black_box((s.board().raw(), steps))
        })
    });
}

criterion_group!(search, bench_expectimax, bench_mcts, bench_e2e);
criterion_main!(search);
