// Integration tests for the query engine
//
// Queries are compiled against the built-in schema and driven with recorded sessions,
// the same way the command line consumer does it:
// 1. Write a session history as JSON Lines
// 2. Replay it through a query set
// 3. Continue with live samples handed over through a channel
// 4. Write results and read them back

use std::{
    io::{BufRead, Write},
    sync::mpsc,
    thread,
};

use lapquery::{
    Compiler, Expression, LapQueryError, QuerySet, ResultPoint, ResultThrottle, ResultWriter,
    Sample, TelemetrySchema, Value, VariableResolver, compile_query, parse,
    telemetry::{ChannelSampleSource, JsonLinesSampleSource, MemorySampleSource, SyntheticFields},
};
use tempfile::NamedTempFile;

const SAMPLES_PER_LAP: usize = 40;
const FUEL_PER_LAP: f64 = 2.5;

fn resolver() -> VariableResolver {
    VariableResolver::new(&TelemetrySchema::builtin()).unwrap()
}

/// A steady stint: constant fuel burn, speed varying within each lap and a refuel at `pit_lap`.
fn stint(laps: usize, pit_lap: Option<usize>) -> Vec<Sample> {
    let mut fuel = 60.;
    let mut samples = Vec::new();
    for i in 0..laps * SAMPLES_PER_LAP {
        let distance = i as f32 / SAMPLES_PER_LAP as f32;
        if i > 0 {
            fuel -= FUEL_PER_LAP / SAMPLES_PER_LAP as f64;
        }
        if pit_lap.is_some_and(|lap| i == lap * SAMPLES_PER_LAP) {
            fuel = 60.;
        }
        let lap_pct = (i % SAMPLES_PER_LAP) as f64 / SAMPLES_PER_LAP as f64;
        samples.push(
            Sample::new(i as f64 * 2.25, distance)
                .with_field("fuel_level", fuel)
                .with_field("speed", 40. + 20. * lap_pct)
                .with_field("lap", (i / SAMPLES_PER_LAP) as i64)
                .with_field("car_idx_position", vec![1., 2., 3.])
                .with_synthetic(SyntheticFields {
                    stint_lap: Some((i / SAMPLES_PER_LAP) as f64),
                    ..Default::default()
                }),
        );
    }
    samples
}

fn history_file(samples: &[Sample]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for sample in samples {
        writeln!(file, "{}", serde_json::to_string(sample).unwrap()).unwrap();
    }
    file.flush().unwrap();
    file
}

fn scalar(point: &ResultPoint) -> f64 {
    point.value.as_scalar().unwrap()
}

#[test]
fn test_parse_shapes() {
    assert_eq!(parse("Speed").unwrap(), Expression::Variable("Speed".to_string()));
    assert_eq!(
        parse("LAP_DELTA(Speed)").unwrap(),
        Expression::FunctionCall(
            "LAP_DELTA".to_string(),
            vec![Expression::Variable("Speed".to_string())]
        )
    );
    assert_eq!(
        parse("LAP_AVERAGE(Speed, 5)").unwrap(),
        Expression::FunctionCall(
            "LAP_AVERAGE".to_string(),
            vec![
                Expression::Variable("Speed".to_string()),
                Expression::NumberLiteral(5)
            ]
        )
    );
}

#[test]
fn test_compile_errors_are_distinct() {
    let errors: Vec<String> = ["", "1abc", "LAP_DELTA(A,B)", "LAP_DELTA(A"]
        .iter()
        .map(|q| match parse(q) {
            Ok(e) => panic!("{q} parsed into {e}"),
            Err(e) => e.to_string(),
        })
        .collect();

    assert!(matches!(parse(""), Err(LapQueryError::EmptyQuery)));
    assert!(matches!(parse("1abc"), Err(LapQueryError::MalformedNumber { .. })));
    assert!(matches!(
        parse("LAP_DELTA(A,B)"),
        Err(LapQueryError::WrongArgumentCount { .. })
    ));
    assert!(matches!(
        parse("LAP_DELTA(A"),
        Err(LapQueryError::UnclosedParenthesis { .. })
    ));
    for (i, a) in errors.iter().enumerate() {
        for b in &errors[i + 1..] {
            assert_ne!(a, b);
        }
    }
}

#[test]
fn test_fuel_queries_over_a_stint() {
    let resolver = resolver();
    let compiler = Compiler::new(&resolver);
    let mut set = QuerySet::compile(
        &[
            "LAP_DELTA(FuelLevel)",
            "DECREASING_SUM(FuelLevel, 3)",
            "FuelLevel / LAP_AVERAGE(LAP_DELTA(FuelLevel), 2)",
        ],
        &compiler,
    )
    .unwrap();
    assert_eq!(set.required_lookback(), 3.);

    let mut last = Vec::new();
    for sample in stint(6, None) {
        last = set.process(&sample);
    }

    assert!((scalar(&last[0]) - FUEL_PER_LAP).abs() < 1e-4);
    assert!((scalar(&last[1]) - 3. * FUEL_PER_LAP).abs() < 1e-4);
    let fuel_left = 60. - FUEL_PER_LAP * (6. - 1. / SAMPLES_PER_LAP as f64);
    let laps_left = scalar(&last[2]);
    assert!(
        (laps_left - fuel_left / FUEL_PER_LAP).abs() < 1e-3,
        "laps left {}",
        laps_left
    );
}

#[test]
fn test_refuel_does_not_count_as_burn() {
    let resolver = resolver();
    let mut query = compile_query("DECREASING_SUM(FuelLevel, 2)", &resolver).unwrap();

    let mut last = Value::ZERO;
    for sample in stint(5, Some(3)) {
        last = query.evaluate(&sample);
    }

    // the jump back to a full tank is not counted, only the burn after it
    let burnt = last.as_scalar().unwrap();
    assert!((burnt - 2. * FUEL_PER_LAP).abs() < 0.1, "burnt {}", burnt);
}

#[test]
fn test_list_fields_flow_through_arithmetic() {
    let resolver = resolver();
    let mut query = compile_query("CarIdxPosition * 2", &resolver).unwrap();
    let samples = stint(1, None);
    assert_eq!(
        query.evaluate(&samples[0]),
        Value::List(vec![2., 4., 6.])
    );
}

#[test]
fn test_synthetic_fields_are_queryable() {
    let resolver = resolver();
    let mut query = compile_query("StintLap + 1", &resolver).unwrap();
    let samples = stint(3, None);
    assert_eq!(query.evaluate(&samples[SAMPLES_PER_LAP * 2]), Value::Scalar(3.));
}

#[test]
fn test_history_replay_then_live_tail() {
    let samples = stint(6, None);
    let split = samples.len() / 2;
    let history = history_file(&samples[..split]);
    let queries = ["LAP_AVERAGE(Speed, 2)", "DECREASING_SUM(FuelLevel, 1)"];

    let resolver = resolver();
    let compiler = Compiler::new(&resolver);

    // reference: everything in one pass
    let mut reference = QuerySet::compile(&queries, &compiler).unwrap();
    let mut expected = Vec::new();
    reference
        .drain(
            &mut MemorySampleSource::from_samples(samples.clone()),
            |index, point| {
                expected.push((index, point));
                Ok(())
            },
        )
        .unwrap();

    let mut set = QuerySet::compile(&queries, &compiler).unwrap();
    let mut actual = Vec::new();
    let mut file_source = JsonLinesSampleSource::from_file(history.path()).unwrap();
    let replayed = set
        .drain(&mut file_source, |index, point| {
            actual.push((index, point));
            Ok(())
        })
        .unwrap();
    assert_eq!(replayed, split);

    let (samples_tx, samples_rx) = mpsc::channel();
    let live_samples = samples[split..].to_vec();
    let producer = thread::spawn(move || {
        for sample in live_samples {
            samples_tx.send(sample).unwrap();
        }
    });
    let mut live = ChannelSampleSource::new(samples_rx);
    set.drain(&mut live, |index, point| {
        actual.push((index, point));
        Ok(())
    })
    .unwrap();
    producer.join().unwrap();

    assert_eq!(actual, expected);
}

#[test]
fn test_broken_history_line_is_reported() {
    let mut file = NamedTempFile::new().unwrap();
    let sample = serde_json::to_string(&Sample::new(0., 0.)).unwrap();
    writeln!(file, "{}", sample).unwrap();
    writeln!(file, "{{\"session_time\": ").unwrap();
    file.flush().unwrap();

    let resolver = resolver();
    let compiler = Compiler::new(&resolver);
    let mut set = QuerySet::compile(&["Speed"], &compiler).unwrap();
    let mut source = JsonLinesSampleSource::from_file(file.path()).unwrap();
    match set.drain(&mut source, |_, _| Ok(())) {
        Err(LapQueryError::SampleParseError { description }) => {
            assert!(description.starts_with("line 2"), "{}", description)
        }
        other => panic!("Expected SampleParseError, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_throttled_results_written_as_json_lines() {
    let resolver = resolver();
    let compiler = Compiler::new(&resolver);
    let mut set = QuerySet::compile(&["Lap", "LAP_DELTA(FuelLevel)"], &compiler).unwrap();
    let texts: Vec<String> = set.queries().map(|q| q.text().to_string()).collect();
    let mut throttle = ResultThrottle::new(0., set.len());
    let output = NamedTempFile::new().unwrap();
    let mut writer = ResultWriter::create(output.path()).unwrap();

    set.drain(
        &mut MemorySampleSource::from_samples(stint(3, None)),
        |index, point| {
            if throttle.admit(index, &point) {
                writer.write(&texts[index], &point)?;
            }
            Ok(())
        },
    )
    .unwrap();
    writer.flush().unwrap();

    let lines: Vec<serde_json::Value> = std::io::BufReader::new(output.reopen().unwrap())
        .lines()
        .map(|line| serde_json::from_str(&line.unwrap()).unwrap())
        .collect();
    // the lap counter only changes three times
    let laps: Vec<f64> = lines
        .iter()
        .filter(|line| line["query"] == "Lap")
        .map(|line| line["value"].as_f64().unwrap())
        .collect();
    assert_eq!(laps, vec![0., 1., 2.]);
    assert!(
        lines
            .iter()
            .any(|line| line["query"] == "LAP_DELTA(FuelLevel)")
    );
}
