use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use flagmap::cluster::cluster_points;
use flagmap::geo::Point;
use flagmap::map::{MapRenderer, Viewport};
use flagmap::render_policy::{plan_markers, ExpandedSet};

/// Deterministic scatter around a campus-sized area
fn scatter(n: usize) -> Vec<Point> {
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state % 10_000) as f64 / 10_000.0
    };
    (0..n)
        .map(|i| Point::new(i as i64 + 1, 12.90 + next() * 0.1, 77.55 + next() * 0.1))
        .collect()
}

fn bench_cluster(c: &mut Criterion) {
    let mut group = c.benchmark_group("cluster_points");
    for n in [50, 200, 800] {
        let points = scatter(n);
        for zoom in [10, 14] {
            group.bench_with_input(BenchmarkId::new(format!("z{zoom}"), n), &points, |b, pts| {
                b.iter(|| cluster_points(black_box(pts), zoom))
            });
        }
    }
    group.finish();
}

fn bench_plan(c: &mut Criterion) {
    let points = scatter(200);
    let clusters = cluster_points(&points, 10);
    let mut expanded = ExpandedSet::new();
    for idx in (0..clusters.len()).step_by(3) {
        expanded.toggle(idx);
    }

    c.bench_function("plan_markers_200", |b| {
        b.iter(|| plan_markers(black_box(&clusters), black_box(&expanded)))
    });
}

fn bench_render(c: &mut Criterion) {
    let points = scatter(200);
    let clusters = cluster_points(&points, 14);
    let plan = plan_markers(&clusters, &ExpandedSet::new());
    let viewport = Viewport::new(points[0].position(), 0.0421, 320, 160);
    let renderer = MapRenderer::new();

    c.bench_function("render_markers_200", |b| {
        b.iter(|| renderer.render(160, 40, black_box(&viewport), black_box(&plan), None))
    });
}

criterion_group!(benches, bench_cluster, bench_plan, bench_render);
criterion_main!(benches);
