use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use fare_backend::algorithms::{fit_series, rarity, score, HoltWinters, WEEKLY_PERIOD};

/// Weekly pattern with a gentle upward drift and a little deterministic noise.
fn synthetic_series(len: usize) -> Vec<f64> {
    let pattern = [0.0, 4.0, -3.0, 2.0, 6.0, -5.0, -1.0];
    (0..len)
        .map(|i| {
            let noise = ((i * 37 % 11) as f64 - 5.0) * 0.4;
            200.0 + i as f64 * 0.15 + pattern[i % WEEKLY_PERIOD] + noise
        })
        .collect()
}

fn bench_grid_search_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("holt_winters_fit");

    for len in [14usize, 90, 365] {
        let series = synthetic_series(len);
        group.bench_with_input(BenchmarkId::new("grid_search", len), &series, |b, y| {
            b.iter(|| fit_series(black_box(y), WEEKLY_PERIOD));
        });
    }

    group.finish();
}

fn bench_score_series(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoring");

    let series = synthetic_series(90);
    let model = match HoltWinters::default().fit(&series) {
        Ok(model) => model,
        Err(e) => panic!("benchmark series failed to fit: {}", e),
    };

    group.bench_function("score_and_rarity_90", |b| {
        b.iter(|| {
            for (price, fitted) in series.iter().zip(&model.fitted) {
                black_box(score(*price, *fitted, &model.residuals));
                black_box(rarity(*price, &series));
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_grid_search_fit, bench_score_series);
criterion_main!(benches);
