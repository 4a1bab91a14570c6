use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::json;

use tba_insights::matches::Match;
use tba_insights::opr::{TeamIndex, build_system, solve_contributions};

/// Synthetic event: `teams` teams rotating through 3v3 qualification
/// matches, scores derived from fixed per-team contributions so the
/// system is realistic but deterministic.
fn synthetic_event(teams: usize, matches: usize) -> Vec<Match> {
    let contribution = |t: usize| 5.0 + (t % 17) as f64;
    (0..matches)
        .map(|i| {
            let pick = |k: usize| (i * 6 + k) % teams;
            let blue: Vec<String> = (0..3).map(|k| format!("frc{}", pick(k))).collect();
            let red: Vec<String> = (3..6).map(|k| format!("frc{}", pick(k))).collect();
            let blue_pts: f64 = (0..3).map(|k| contribution(pick(k))).sum();
            let red_pts: f64 = (3..6).map(|k| contribution(pick(k))).sum();
            serde_json::from_value(json!({
                "key": format!("2019bench_qm{}", i + 1),
                "comp_level": "qm",
                "event_key": "2019bench",
                "alliances": {
                    "blue": { "team_keys": blue },
                    "red": { "team_keys": red }
                },
                "score_breakdown": {
                    "blue": { "totalPoints": blue_pts },
                    "red": { "totalPoints": red_pts }
                }
            }))
            .expect("synthetic match json")
        })
        .collect()
}

fn bench_build_system(c: &mut Criterion) {
    let matches = synthetic_event(40, 80);
    let index = TeamIndex::build(&matches);
    c.bench_function("build_system_40x80", |b| {
        b.iter(|| {
            let (matrix, target) =
                build_system(black_box(&matches), black_box(&index), "totalPoints").unwrap();
            black_box((matrix.nrows(), target.len()));
        })
    });
}

fn bench_solve(c: &mut Criterion) {
    let matches = synthetic_event(40, 80);
    c.bench_function("solve_contributions_40x80", |b| {
        b.iter(|| {
            let oprs = solve_contributions(black_box(&matches), "totalPoints").unwrap();
            black_box(oprs.len());
        })
    });
}

criterion_group!(benches, bench_build_system, bench_solve);
criterion_main!(benches);
