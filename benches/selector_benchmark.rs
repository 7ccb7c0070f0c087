use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use selector_cache::{Arg, CachedSelector, Dependents, Mode};

#[derive(Clone)]
struct Post {
	site_id: i64,
}

struct State {
	posts: Arc<Vec<Post>>,
	site_count: i64,
}

fn state(posts: usize) -> State {
	let posts: Vec<Post> = (0..posts)
		.map(|i| Post {
			site_id: (i % 16) as i64,
		})
		.collect();
	State {
		posts: Arc::new(posts),
		site_count: 16,
	}
}

fn site_posts() -> CachedSelector<State, usize> {
	CachedSelector::builder()
		.selector(|deps: &Dependents, args: &[Arg]| {
			let site = args.first().and_then(Arg::as_primitive).and_then(|p| p.as_i64());
			deps.get::<Vec<Post>>("posts")
				.map_or(0, |posts| posts.iter().filter(|p| Some(p.site_id) == site).count())
		})
		.dependents(|state: &State, _: &[Arg]| {
			Dependents::new()
				.with_object("posts", state.posts.clone())
				.with("sites", state.site_count)
		})
		.mode(Mode::Production)
		.build()
		.expect("builder should succeed")
}

fn bench_hit(c: &mut Criterion) {
	let selector = site_posts();
	let state = state(1000);
	let args = [Arg::from(3)];
	selector.select(&state, &args);

	c.bench_function("select_hit", |b| {
		b.iter(|| black_box(selector.select(black_box(&state), black_box(&args))));
	});
}

fn bench_miss(c: &mut Criterion) {
	let mut group = c.benchmark_group("select_miss");

	for size in [100, 1000, 10000] {
		group.throughput(Throughput::Elements(size as u64));
		group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
			let selector = site_posts();
			b.iter(|| {
				// A fresh posts object every iteration forces a miss.
				let state = state(size);
				black_box(selector.select(&state, &[Arg::from(1)]))
			});
		});
	}

	group.finish();
}

fn bench_argument_keys(c: &mut Criterion) {
	let mut group = c.benchmark_group("argument_keys");

	for keys in [16, 256, 4096] {
		group.throughput(Throughput::Elements(keys as u64));
		group.bench_with_input(BenchmarkId::from_parameter(keys), &keys, |b, &keys| {
			let selector = site_posts();
			let state = state(100);
			b.iter(|| {
				for k in 0..keys {
					black_box(selector.select(&state, &[Arg::from(k as i64)]));
				}
			});
		});
	}

	group.finish();
}

criterion_group!(benches, bench_hit, bench_miss, bench_argument_keys);
criterion_main!(benches);
