//! # Window Store Benchmarks
//!
//! | Operation | Shape |
//! |-----------|-------|
//! | `add_box` | linear chain, layers of width 4 |
//! | `get_status_update` | fresh cursor over a full window |
//! | `gc` | one window of expired layers |
//! | wire encode | one diff frame per atom |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use cw_01_window_store::{StatusCursor, WindowDag};
use cw_02_diff_sync::encode_diff;
use rand::Rng;
use shared_types::{DagBox, Hash, Index, Topic, ZERO_HASH};
use std::time::Duration;

fn random_key<R: Rng>(rng: &mut R) -> Hash {
    rng.gen()
}

/// Store holding `layers` indices of `width` nodes each, every node
/// parented to the first node of the previous index.
fn filled(capacity: Index, layers: Index, width: usize) -> WindowDag {
    let dag = WindowDag::new(capacity).unwrap();
    let mut rng = rand::thread_rng();
    let mut parent = ZERO_HASH;
    for i in 0..layers {
        let mut first = None;
        for _ in 0..width {
            let key = random_key(&mut rng);
            dag.add_box(DagBox::with_bytes(i, key, parent, b"foobar".to_vec()))
                .unwrap();
            first.get_or_insert(key);
        }
        parent = first.unwrap_or(ZERO_HASH);
    }
    dag
}

fn bench_add_box(c: &mut Criterion) {
    let mut group = c.benchmark_group("cw-01-add-box");
    group.measurement_time(Duration::from_secs(5));

    for layers in [100u64, 1_000] {
        group.throughput(Throughput::Elements(layers * 4));
        group.bench_with_input(BenchmarkId::new("chain_width_4", layers), &layers, |b, &n| {
            b.iter(|| black_box(filled(300, n, 4)))
        });
    }
    group.finish();
}

fn bench_status_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("cw-01-status-update");
    let dag = filled(300, 300, 4);
    let max = dag.max_index();

    for window in [20usize, 100, 300] {
        let start = max.saturating_sub(window as Index) + 1;
        group.bench_with_input(BenchmarkId::new("fresh_cursor", window), &window, |b, &w| {
            b.iter(|| {
                let mut cursor = StatusCursor::new(w);
                black_box(dag.get_status_update(&mut cursor, start, max + 1))
            })
        });
    }
    group.finish();
}

fn bench_gc(c: &mut Criterion) {
    c.bench_function("cw-01-gc-full-window", |b| {
        b.iter_with_setup(
            || {
                let dag = filled(100, 100, 4);
                // push the whole window out
                dag.add_box(DagBox::with_bytes(250, [0xff; 32], ZERO_HASH, vec![]))
                    .unwrap();
                dag
            },
            |dag| black_box(dag.gc()),
        )
    });
}

fn bench_encode(c: &mut Criterion) {
    let dag = filled(100, 100, 4);
    let mut cursor = StatusCursor::new(100);
    let atoms = dag.get_status_update(&mut cursor, 0, 100);

    let mut group = c.benchmark_group("cw-02-wire");
    group.throughput(Throughput::Elements(atoms.len() as u64));
    group.bench_function("encode_diff_window", |b| {
        b.iter(|| {
            for atom in &atoms {
                black_box(encode_diff(Topic::BLOCKS, atom));
            }
        })
    });
    group.finish();
}

criterion_group!(benches, bench_add_box, bench_status_update, bench_gc, bench_encode);
criterion_main!(benches);
