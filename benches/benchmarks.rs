criterion::criterion_main!(benches);
criterion::criterion_group! {
    name = benches;
    config = criterion::Criterion::default()
        .without_plots()
        .noise_threshold(3.0)
        .significance_level(0.01)
        .sample_size(10)
        .measurement_time(std::time::Duration::from_secs(1));
    targets =
        solving_euclidean_transport,
        solving_quaternion_transport,
        building_quaternion_ground_cost,
        mapping_relative_measures,
}

use ndarray::Array2;
use ndarray::Array3;
use possync::geometry::Manifold;
use possync::measure::RelativeMeasure;
use possync::particles::Prior;
use possync::transport::Metric;
use possync::transport::Reduction;
use possync::transport::Sinkhorn;
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn uniform(n: usize, p: usize) -> Array2<f32> {
    Array2::from_elem((n, p), 1.0 / p as f32)
}

fn clouds(prior: Prior, batch: usize, points: usize, dim: usize) -> (Array3<f32>, Array3<f32>) {
    let mut rng = SmallRng::seed_from_u64(0);
    let x = prior.sample(&mut rng, batch, points, dim);
    let y = prior.sample(&mut rng, batch, points, dim);
    (x, y)
}

fn solving_euclidean_transport(c: &mut criterion::Criterion) {
    c.bench_function("solve a 16x64x64 euclidean transport batch", |b| {
        let (x, y) = clouds(Prior::Gaussian, 16, 64, 3);
        let (wx, wy) = (uniform(16, 64), uniform(16, 64));
        let solver = Sinkhorn::new(Metric::Euclidean { power: 2 }, 0.05, 100, 0.1, Reduction::Sum)
            .expect("solver");
        b.iter(|| solver.transport(x.view(), y.view(), wx.view(), wy.view()))
    });
}

fn solving_quaternion_transport(c: &mut criterion::Criterion) {
    c.bench_function("solve a 16x64x64 quaternion transport batch", |b| {
        let (x, y) = clouds(Prior::GaussianQuaternion, 16, 64, 4);
        let (wx, wy) = (uniform(16, 64), uniform(16, 64));
        let solver = Sinkhorn::new(
            Metric::Quaternion { squared: false },
            0.05,
            100,
            0.1,
            Reduction::Sum,
        )
        .expect("solver");
        b.iter(|| solver.transport(x.view(), y.view(), wx.view(), wy.view()))
    });
}

fn building_quaternion_ground_cost(c: &mut criterion::Criterion) {
    c.bench_function("build a 16x128x128 geodesic cost tensor", |b| {
        let (x, y) = clouds(Prior::GaussianQuaternion, 16, 128, 4);
        let metric = Metric::Quaternion { squared: true };
        b.iter(|| metric.cost(x.view(), y.view()))
    });
}

fn mapping_relative_measures(c: &mut criterion::Criterion) {
    c.bench_function("map 32 particles through a 20-edge product measure", |b| {
        let mut rng = SmallRng::seed_from_u64(0);
        let data = Prior::GaussianQuaternion.sample(&mut rng, 10, 32, 4);
        let weights = uniform(10, 32);
        let edges = (0..10)
            .flat_map(|i| [(i, (i + 1) % 10), (i, (i + 2) % 10)])
            .collect::<Vec<_>>();
        let map = RelativeMeasure::new(edges, Manifold::Quaternion, true);
        b.iter(|| map.map(data.view(), weights.view()))
    });
}
