use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::time::Duration;
use treebin_maps::{Natural, TreeMap};

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn filled(seed: u64, n: usize) -> TreeMap<u64, u64> {
    lcg(seed).take(n).zip(0u64..).collect()
}

fn bench_insert_random_100k(c: &mut Criterion) {
    c.bench_function("tree::insert_random_100k", |b| {
        b.iter_batched(
            TreeMap::<u64, u64>::new,
            |mut m| {
                for (i, x) in lcg(1).take(100_000).enumerate() {
                    m.insert(x, i as u64);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_from_sorted_100k(c: &mut Criterion) {
    c.bench_function("tree::from_sorted_100k", |b| {
        b.iter_batched(
            || (0..100_000u64).map(|k| (k, k)).collect::<Vec<_>>(),
            |entries| black_box(TreeMap::from_sorted(Natural, entries).unwrap()),
            BatchSize::SmallInput,
        )
    });
}

fn bench_get_and_navigate(c: &mut Criterion) {
    let m = filled(7, 100_000);
    let probes: Vec<u64> = lcg(0xdead_beef).take(10_000).collect();

    c.bench_function("tree::get_miss_10k_on_100k", |b| {
        b.iter(|| {
            for k in &probes {
                black_box(m.get(k));
            }
        })
    });

    c.bench_function("tree::floor_ceiling_10k_on_100k", |b| {
        b.iter(|| {
            for k in &probes {
                black_box(m.floor_key(k));
                black_box(m.ceiling_key(k));
            }
        })
    });
}

fn bench_remove_and_pop(c: &mut Criterion) {
    c.bench_function("tree::remove_random_10k_of_110k", |b| {
        b.iter_batched(
            || {
                let m = filled(5, 110_000);
                let doomed: Vec<u64> = m.keys().copied().step_by(11).collect();
                (m, doomed)
            },
            |(mut m, doomed)| {
                for k in &doomed {
                    black_box(m.remove(k));
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("tree::pop_first_all_100k", |b| {
        b.iter_batched(
            || filled(9, 100_000),
            |mut m| {
                while let Some(e) = m.pop_first() {
                    black_box(e);
                }
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_views(c: &mut Criterion) {
    let m: TreeMap<u64, u64> = (0..100_000u64).map(|k| (k, k)).collect();

    c.bench_function("tree::sub_map_iter_10k", |b| {
        b.iter(|| {
            let view = m.sub_map(40_000, true, 50_000, false).unwrap();
            black_box(view.values().copied().fold(0u64, u64::wrapping_add))
        })
    });

    c.bench_function("tree::descending_view_iter_10k", |b| {
        b.iter(|| {
            let head = m.head_map(10_000, false).unwrap();
            black_box(head.descending_map().keys().count())
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(12)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches_build;
    config = bench_config();
    targets = bench_insert_random_100k, bench_from_sorted_100k
}
criterion_group! {
    name = benches_ops;
    config = bench_config();
    targets = bench_get_and_navigate, bench_remove_and_pop, bench_views
}
criterion_main!(benches_build, benches_ops);
