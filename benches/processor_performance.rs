use criterion::{Criterion, black_box, criterion_group, criterion_main};
use lapquery::{
    Compiler, QuerySet, Sample, TelemetrySchema, VariableResolver, compile_query,
};
use std::time::Duration;

// ~60Hz over a 90 second lap
const SAMPLES_PER_LAP: usize = 5400;

fn create_sample(point_no: usize) -> Sample {
    let lap_pct = (point_no % SAMPLES_PER_LAP) as f64 / SAMPLES_PER_LAP as f64;
    Sample::new(
        point_no as f64 / 60.,
        point_no as f32 / SAMPLES_PER_LAP as f32,
    )
    .with_field("fuel_level", 100. - point_no as f64 * 0.0005)
    .with_field("speed", 50. + 30. * (lap_pct * std::f64::consts::TAU).sin())
    .with_field("engine_rpm", 5000. + 2000. * lap_pct)
    .with_field("car_idx_position", vec![3., 1., 2., 4.])
}

fn create_session(laps: usize) -> Vec<Sample> {
    (0..laps * SAMPLES_PER_LAP).map(create_sample).collect()
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    let resolver = VariableResolver::new(&TelemetrySchema::builtin()).unwrap();

    group.bench_function("compile_simple_query", |b| {
        b.iter(|| black_box(compile_query("LAP_DELTA(FuelLevel)", &resolver).unwrap()));
    });

    group.bench_function("compile_nested_query", |b| {
        b.iter(|| {
            black_box(
                compile_query(
                    "(FuelLevel - 1) / LAP_AVERAGE(DECREASING_SUM(FuelLevel, 1), 3)",
                    &resolver,
                )
                .unwrap(),
            )
        });
    });

    group.finish();
}

fn bench_processors(c: &mut Criterion) {
    let mut group = c.benchmark_group("processors");
    let resolver = VariableResolver::new(&TelemetrySchema::builtin()).unwrap();
    let session = create_session(6);

    for query in [
        "Speed",
        "LAP_DELTA(FuelLevel)",
        "LAP_AVERAGE(Speed, 5)",
        "DECREASING_SUM(FuelLevel, 5)",
        "CarIdxPosition * 2",
    ] {
        group.bench_function(format!("process_6_laps {}", query), |b| {
            b.iter(|| {
                let mut compiled = compile_query(query, &resolver).unwrap();
                for sample in &session {
                    black_box(compiled.process(sample));
                }
            });
        });
    }

    group.finish();
}

fn bench_query_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_set");
    let resolver = VariableResolver::new(&TelemetrySchema::builtin()).unwrap();
    let compiler = Compiler::new(&resolver);
    let session = create_session(3);
    let queries = [
        "LAP_DELTA(FuelLevel)",
        "LAP_AVERAGE(Speed, 2)",
        "FuelLevel / LAP_AVERAGE(LAP_DELTA(FuelLevel), 2)",
        "DECREASING_SUM(FuelLevel, 1)",
    ];

    group.bench_function("process_single_sample", |b| {
        let mut set = QuerySet::compile(&queries, &compiler).unwrap();
        let sample = create_sample(0);
        b.iter(|| black_box(set.process(black_box(&sample))));
    });

    group.bench_function("replay_3_laps", |b| {
        b.iter(|| {
            let mut set = QuerySet::compile(&queries, &compiler).unwrap();
            for sample in &session {
                black_box(set.process(sample));
            }
        });
    });

    group.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");

    let sample = create_sample(0);

    group.bench_function("serialize_sample", |b| {
        b.iter(|| black_box(serde_json::to_string(&sample).unwrap()));
    });

    let json = serde_json::to_string(&sample).unwrap();
    group.bench_function("deserialize_sample", |b| {
        b.iter(|| black_box(serde_json::from_str::<Sample>(&json).unwrap()));
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .sample_size(20);
    targets = bench_compile, bench_processors, bench_query_set, bench_serialization
}
criterion_main!(benches);
