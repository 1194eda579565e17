use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use seedbloom::*;

pub fn bitmap_bench(c: &mut Criterion) {
    let bitmap = AtomicBitmap::new_with_capacity(1024);

    c.bench_function("bitmap_set", |b| b.iter(|| bitmap.set(black_box(42))));
    c.bench_function("bitmap_lookup_hit", |b| {
        bitmap.set(42);
        b.iter(|| black_box(bitmap.get(42)))
    });
    c.bench_function("bitmap_lookup_miss", |b| b.iter(|| black_box(bitmap.get(43))));
}

pub fn hash_bench(c: &mut Criterion) {
    c.bench_function("hash_accumulate_short", |b| {
        b.iter(|| black_box(hash::accumulate(black_box("hello"))))
    });
    c.bench_function("hash_accumulate_url", |b| {
        b.iter(|| {
            black_box(hash::accumulate(black_box(
                "https://example.com/some/fairly/long/path?with=query&params=1",
            )))
        })
    });
}

pub fn filter_bench(c: &mut Criterion) {
    for profile in [
        Profile::VerySmall,
        Profile::Small,
        Profile::Middle,
        Profile::High,
    ] {
        let name = format!("{profile:?}").to_lowercase();
        let filter = MembershipFilter::with_profile(profile, 100_000, None).unwrap();
        filter.add("present");

        c.bench_function(&format!("filter_add_{name}"), |b| {
            b.iter(|| filter.add(black_box("present")))
        });
        c.bench_function(&format!("filter_check_hit_{name}"), |b| {
            b.iter(|| black_box(filter.check(black_box("present"))))
        });
        c.bench_function(&format!("filter_check_miss_{name}"), |b| {
            b.iter(|| black_box(filter.check(black_box("absent"))))
        });
    }

    c.bench_function("filter_add_if_not_exist_fresh", |b| {
        b.iter_batched(
            || MembershipFilter::new(1_000).unwrap(),
            |filter| {
                for i in 0..100 {
                    black_box(filter.add_if_not_exist(&i.to_string()));
                }
            },
            BatchSize::SmallInput,
        )
    });
}

pub fn codec_bench(c: &mut Criterion) {
    let filter = MembershipFilter::new(100_000).unwrap();
    for i in 0..10_000 {
        filter.add(&i.to_string());
    }
    let bytes = filter.to_bytes();

    c.bench_function("codec_to_bytes", |b| b.iter(|| black_box(filter.to_bytes())));
    c.bench_function("codec_from_bytes", |b| {
        b.iter(|| black_box(MembershipFilter::from_bytes(&bytes).unwrap()))
    });
}

criterion_group!(benches, bitmap_bench, hash_bench, filter_bench, codec_bench);
criterion_main!(benches);
