use chrono::Utc;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rust_decimal::Decimal;

use stockbook_core::{BatchId, CorrelationId, IngredientId, LocationId};
use stockbook_ledger::{
    InMemoryMovementLog, Movement, MovementLog, StockKey, StockPosition, rebuild_positions,
};

fn seed_log(movement_count: usize) -> (InMemoryMovementLog, StockKey) {
    let log = InMemoryMovementLog::new();
    let ingredient = IngredientId::new();
    let location = LocationId::new();
    let key = StockKey::new(ingredient, location);

    for i in 0..movement_count {
        let movement = if i % 3 == 0 {
            Movement::receipt(
                ingredient,
                location,
                Decimal::new(500, 2),
                Decimal::new(215, 2),
                BatchId::new(),
                format!("PO-{i}"),
                None,
                Utc::now(),
            )
        } else {
            Movement::consumption(
                ingredient,
                location,
                Decimal::new(100, 2),
                Decimal::new(215, 2),
                CorrelationId::new(),
                Utc::now(),
            )
        };
        log.append(vec![movement], None).unwrap();
    }

    (log, key)
}

fn bench_full_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("position_rebuild_by_replay");

    for size in [100usize, 1_000, 10_000] {
        let (log, key) = seed_log(size);
        let snapshot = log.snapshot();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &snapshot, |b, snap| {
            b.iter(|| {
                let positions = rebuild_positions(black_box(snap));
                black_box(positions.get(&key).map(|p| p.quantity));
            });
        });
    }

    group.finish();
}

fn bench_incremental_apply(c: &mut Criterion) {
    let (log, key) = seed_log(1_000);
    let snapshot = log.snapshot();

    c.bench_function("position_incremental_apply_1000", |b| {
        b.iter(|| {
            let mut position = StockPosition::empty(key);
            for stored in &snapshot {
                position.apply(black_box(&stored.movement));
            }
            black_box(position.quantity);
        });
    });
}

criterion_group!(benches, bench_full_replay, bench_incremental_apply);
criterion_main!(benches);
