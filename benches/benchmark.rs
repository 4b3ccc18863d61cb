use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::Matrix4;
use ndarray::Array4;
use neuroprep::motion_fd::aff12_to_matrix;
use neuroprep::roi_split::{binary_mask, unique_labels};
use neuroprep::{FramewiseDisplacement, BRAIN_RADIUS_MM};

fn transforms(ntpts: usize) -> Vec<Matrix4<f64>> {
    (0..ntpts)
        .map(|t| {
            let theta = 0.001 * (t as f64).sin();
            let (s, c) = theta.sin_cos();
            aff12_to_matrix(&[c, -s, 0., 0.1 * (t as f64).cos(), s, c, 0., 0.05, 0., 0., 1., 0.])
        })
        .collect()
}

fn segmentation() -> Array4<f64> {
    Array4::from_shape_fn((64, 64, 64, 1), |(i, j, k, _)| ((i / 8 + j / 8 + k / 8) % 12) as f64)
}

fn bench_fd(c: &mut Criterion) {
    let mats = transforms(1200);
    c.bench_function("fd_jenkinson", |b| {
        b.iter(|| FramewiseDisplacement::from_transforms(black_box(&mats), BRAIN_RADIUS_MM).unwrap())
    });
}

fn bench_split(c: &mut Criterion) {
    let data = segmentation();
    c.bench_function("unique_labels", |b| b.iter(|| unique_labels(black_box(&data))));
    c.bench_function("binary_mask", |b| b.iter(|| binary_mask(black_box(&data), 7.0)));
}

criterion_group!(benches, bench_fd, bench_split);
criterion_main!(benches);
