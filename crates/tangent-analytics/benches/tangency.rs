use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use ndarray::Array2;
use rand::{Rng, SeedableRng, rngs::StdRng};
use tangent_analytics::{
    CovarianceEstimator, EwmaConfig, EwmaCovarianceEstimator, ReturnBasis,
    SampleCovarianceEstimator, stats, tangency_weights,
};

const PERIODS: usize = 520;

fn random_returns(n_assets: usize) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(7);
    Array2::from_shape_fn((PERIODS, n_assets), |_| rng.gen_range(-0.05..0.05))
}

fn bench_covariance(c: &mut Criterion) {
    let mut group = c.benchmark_group("covariance");
    for &n in &[10, 50, 200] {
        let returns = random_returns(n);
        group.bench_with_input(BenchmarkId::new("sample", n), &returns, |b, r| {
            let estimator = SampleCovarianceEstimator::default();
            b.iter(|| black_box(estimator.estimate(r)))
        });
        group.bench_with_input(BenchmarkId::new("ewma", n), &returns, |b, r| {
            let estimator = EwmaCovarianceEstimator::new(EwmaConfig::default()).unwrap();
            b.iter(|| black_box(estimator.estimate(r)))
        });
    }
    group.finish();
}

fn bench_tangency_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("tangency_weights");
    for &n in &[10, 50, 200] {
        let returns = random_returns(n);
        let mu = stats::column_means(returns.view()).unwrap();
        let sigma = stats::sample_covariance(returns.view()).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &(mu, sigma), |b, (mu, sigma)| {
            b.iter(|| black_box(tangency_weights(mu, sigma, ReturnBasis::Excess)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_covariance, bench_tangency_solve);
criterion_main!(benches);
