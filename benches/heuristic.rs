#![cfg(feature = "bench-internal")]
use ai_2048_sim::engine::Move;
use ai_2048_sim::game::GameState;
use ai_2048_sim::heuristic;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{rngs::StdRng, SeedableRng};
use std::hint::black_box;

/// States reached by cycling the four moves from a seeded opening.
fn played_states(plies: usize) -> Vec<GameState> {
    let mut rng = StdRng::seed_from_u64(2048);
    let mut state = GameState::new(&mut rng);
    let mut states = vec![state];
    for dir in Move::ALL.into_iter().cycle().take(plies) {
        if state.is_terminal() {
            break;
        }
        if let Ok(next) = state.apply(dir, &mut rng) {
            state = next;
            states.push(state);
        }
    }
    states
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("heuristic");
    for plies in [16usize, 128] {
        let states = played_states(plies);
        group.bench_with_input(BenchmarkId::new("evaluate", plies), &states, |bch, states| {
            bch.iter(|| states.iter().map(heuristic::evaluate).fold(0.0, f64::max))
        });
        group.bench_with_input(BenchmarkId::new("board_value", plies), &states, |bch, states| {
            bch.iter(|| {
                states
                    .iter()
                    .map(|s| ai_2048_sim::heuristic_value(black_box(s.board())))
                    .sum::<f64>()
            })
        });
    }
    group.finish();
}

criterion_group!(heuristic_benches, bench_evaluate);
criterion_main!(heuristic_benches);
