use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use boxclust_core::layout::{
    BoxId, ClusteringParams, ClusteringState, Color, IndexEntry, PageBox, PageSize, SpatialIndex,
    cluster_boxes, discover_neighbours,
};
use boxclust_core::utils::HasBBox;

const PAGE: PageSize = PageSize::new(1280.0, 4000.0);

struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn gen_f64(&mut self, min: f64, max: f64) -> f64 {
        let n = self.next_u64() as f64 / u64::MAX as f64;
        min + (max - min) * n
    }
}

/// Rows of small boxes with jittered gaps, roughly like a text-heavy page.
fn gen_page(seed: u64, n: usize) -> Vec<PageBox> {
    let mut rng = XorShift64::new(seed);
    let palette = [
        Color::new(20, 20, 20),
        Color::new(0, 90, 200),
        Color::new(200, 40, 40),
    ];
    let mut boxes = Vec::with_capacity(n);
    let (mut x, mut y) = (10.0, 10.0);
    for i in 0..n {
        let w = rng.gen_f64(20.0, 120.0);
        let h = rng.gen_f64(10.0, 24.0);
        if x + w > PAGE.width - 10.0 {
            x = 10.0;
            y += rng.gen_f64(30.0, 60.0);
        }
        let color = palette[(rng.next_u64() % palette.len() as u64) as usize];
        boxes.push(PageBox::new(
            BoxId::new(i),
            format!("b{i}"),
            (x, y, x + w, y + h),
            color,
        ));
        x += w + rng.gen_f64(2.0, 30.0);
    }
    boxes
}

fn bench_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial_index");
    for n in [500usize, 2_000] {
        let boxes = gen_page(0x5EED ^ n as u64, n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("load_search", n), &boxes, |b, boxes| {
            b.iter(|| {
                let mut index = SpatialIndex::new();
                index.load(boxes.iter().map(|pb| IndexEntry {
                    entity: pb.entity(),
                    bbox: pb.bbox(),
                }));
                let hits = index.search((200.0, 200.0, 600.0, 600.0));
                black_box(hits.len());
            })
        });
    }
    group.finish();
}

fn bench_discovery(c: &mut Criterion) {
    let mut group = c.benchmark_group("neighbour_discovery");
    for parallel in [false, true] {
        let boxes = gen_page(0xD15C, 2_000);
        let params = ClusteringParams {
            parallel_discovery: parallel,
            ..ClusteringParams::default()
        };
        let label = if parallel { "parallel" } else { "sequential" };
        group.bench_function(BenchmarkId::new(label, boxes.len()), |b| {
            b.iter(|| {
                let mut state = ClusteringState::new(PAGE, boxes.clone(), params.clone());
                black_box(discover_neighbours(&mut state));
            })
        });
    }
    group.finish();
}

fn bench_cluster_boxes(c: &mut Criterion) {
    let mut group = c.benchmark_group("cluster_boxes");
    group.sample_size(20);
    let params = ClusteringParams::default();
    for n in [200usize, 1_000] {
        let boxes = gen_page(0xC1u64 ^ n as u64, n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &boxes, |b, boxes| {
            b.iter(|| {
                let seg = cluster_boxes(&params, PAGE, boxes.clone()).unwrap();
                black_box(seg.clusters.len());
            })
        });
    }
    group.finish();
}

criterion_group!(
    clustering_benches,
    bench_index,
    bench_discovery,
    bench_cluster_boxes
);
criterion_main!(clustering_benches);
