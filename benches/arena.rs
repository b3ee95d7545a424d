use criterion::{Criterion, black_box, criterion_group, criterion_main};
use vmarena::{Arena, ArenaOptions, kib, mib};

fn bench_push(c: &mut Criterion) {
  let mut arena = Arena::with_options(ArenaOptions::new().commit_size(kib(64)).reserve_size(mib(64)));

  c.bench_function("push_16bytes", |b| {
    b.iter(|| {
      if arena.pos() > mib(32) {
        arena.clear();
      }
      black_box(arena.push(black_box(16), 8));
    });
  });

  c.bench_function("scope_push_pop", |b| {
    b.iter(|| {
      let mut scope = arena.scope();
      for _ in 0..16 {
        black_box(scope.push(64, 16));
      }
    });
  });
}

fn bench_create_release(c: &mut Criterion) {
  c.bench_function("create_release_64mib", |b| {
    b.iter(|| {
      let arena = Arena::new();
      black_box(arena.pos());
      arena.release();
    });
  });
}

criterion_group!(benches, bench_push, bench_create_release);
criterion_main!(benches);
