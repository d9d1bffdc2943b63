use criterion::BenchmarkGroup;
use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::criterion_group;
use criterion::criterion_main;
use std::hint::black_box;
use weft::Channel;
use weft::Term;
use weft::chan::buffers;
use weft::select::AltsOptions;
use weft::select::Operation;

const CAPACITY: &[usize] = &[1, 16, 256];

fn bench_offer_poll(criterion: &mut Criterion) {
  let mut group: BenchmarkGroup<_> = criterion.benchmark_group("offer_poll");

  for capacity in CAPACITY {
    let id: BenchmarkId = BenchmarkId::new("fixed", capacity);

    group.bench_with_input(id, capacity, |bench, &capacity| {
      let channel: Channel = weft::chan(capacity);

      bench.iter(|| {
        for value in 0..capacity {
          weft::offer(&channel, Term::new(value));
        }

        for _ in 0..capacity {
          black_box(weft::poll(&channel));
        }
      });
    });

    let id: BenchmarkId = BenchmarkId::new("sliding", capacity);

    group.bench_with_input(id, capacity, |bench, &capacity| {
      let channel: Channel = weft::chan(buffers::sliding(capacity));

      bench.iter(|| {
        for value in 0..capacity * 2 {
          weft::offer(&channel, Term::new(value));
        }

        for _ in 0..capacity {
          black_box(weft::poll(&channel));
        }
      });
    });
  }

  group.finish();
}

fn bench_alts(criterion: &mut Criterion) {
  let mut group: BenchmarkGroup<_> = criterion.benchmark_group("alts");

  for width in [2_usize, 8, 32] {
    let id: BenchmarkId = BenchmarkId::new("default", width);
    let channels: Vec<Channel> = (0..width).map(|_| weft::chan(0)).collect();

    group.bench_with_input(id, &channels, |bench, channels| {
      bench.iter(|| {
        let operations: Vec<Operation> = channels.iter().map(Operation::from).collect();

        weft::do_alts(
          operations,
          |result| {
            black_box(result);
          },
          AltsOptions::new().with_default(Term::unit()),
        );
      });
    });
  }

  group.finish();
}

criterion_group! {
  name = benches;
  config = Criterion::default();
  targets = bench_offer_poll, bench_alts
}

criterion_main!(benches);
