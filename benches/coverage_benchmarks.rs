use criterion::{black_box, criterion_group, criterion_main, Criterion};
use picover::coverage::{calibration_probability, randomized_inclusion};
use picover::data::BoundMatrix;
use picover::rolling::{rolling_coverage, MethodBounds};
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

fn synthetic_intervals(n: usize, rng: &mut StdRng) -> (BoundMatrix, Vec<f64>) {
    let mut lower = Vec::with_capacity(n);
    let mut upper = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    for _ in 0..n {
        let center = rng.random::<f64>() * 10.0;
        let width = rng.random::<f64>() * 2.0;
        lower.push(center - width);
        upper.push(center + width);
        y.push(center + (rng.random::<f64>() - 0.5) * 4.0);
    }
    (BoundMatrix::new(lower, upper).unwrap(), y)
}

pub fn coverage_benchmarks(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let (bounds, y) = synthetic_intervals(10_000, &mut rng);

    c.bench_function("calibration_probability 10k", |b| {
        b.iter(|| calibration_probability(black_box(&bounds), black_box(&y), black_box(0.8)))
    });

    let prob_si = calibration_probability(&bounds, &y, 0.8).unwrap();
    let mut draw_rng = StdRng::seed_from_u64(1);
    c.bench_function("randomized_inclusion 10k", |b| {
        b.iter(|| randomized_inclusion(black_box(&bounds), black_box(prob_si), black_box(&y), &mut draw_rng))
    });

    let (test_bounds, y_small) = synthetic_intervals(2_000, &mut rng);
    let (train_bounds, _) = synthetic_intervals(2_000, &mut rng);
    let score: Vec<f64> = (0..2_000).map(|_| rng.random::<f64>()).collect();
    let mut roll_rng = StdRng::seed_from_u64(2);
    c.bench_function("rolling_coverage 2k window 100", |b| {
        b.iter(|| {
            let methods = [MethodBounds {
                test: &test_bounds,
                train: &train_bounds,
            }];
            rolling_coverage(
                black_box(&methods),
                black_box(&y_small),
                black_box(&score),
                black_box(0.8),
                black_box(100),
                &mut roll_rng,
            )
        })
    });
}

criterion_group!(benches, coverage_benchmarks);
criterion_main!(benches);
