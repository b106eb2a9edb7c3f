use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Sender},
    },
    thread,
};

use clap::{Parser, Subcommand};
use lapquery::{
    Compiler, EngineConfig, LapQueryError, QuerySet, ResultPoint, ResultThrottle, ResultWriter,
    Sample,
    telemetry::{ChannelSampleSource, JsonLinesSampleSource},
};
use log::{error, info, warn};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Telemetry schema file, overrides the one in the config file
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluates queries over a recorded session and, optionally, the live samples that follow it
    Run {
        #[arg(short, long = "query", required = true)]
        queries: Vec<String>,

        /// JSON Lines file with the session history
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Where to write results, standard output when missing
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep reading live samples from standard input after the history
        #[arg(short, long)]
        follow: bool,

        #[arg(long)]
        rate_hz: Option<f64>,

        #[arg(long)]
        buffer_capacity: Option<usize>,
    },
    /// Compiles queries and prints how much history they need
    Check {
        #[arg(short, long = "query", required = true)]
        queries: Vec<String>,
    },
    /// Lists every variable a query can reference
    Fields,
    /// Prints the active configuration
    Config {
        #[arg(long)]
        save: bool,
    },
}

/// Writes the results that make it through the throttle.
struct ResultSink {
    texts: Vec<String>,
    throttle: ResultThrottle,
    writer: ResultWriter<Box<dyn Write>>,
    flush_each: bool,
}

impl ResultSink {
    fn emit(&mut self, index: usize, point: ResultPoint) -> Result<(), LapQueryError> {
        if !self.throttle.admit(index, &point) {
            return Ok(());
        }
        self.writer.write(&self.texts[index], &point)?;
        if self.flush_each {
            self.writer.flush()?;
        }
        Ok(())
    }
}

/// Ctrl-C during the replay stops it after the current sample so buffered results are
/// flushed. Live results are flushed as they are written, so it exits straight away there.
#[derive(Default)]
struct Shutdown {
    replaying: AtomicBool,
    requested: AtomicBool,
}

impl Shutdown {
    fn interrupt(&self) {
        if self.replaying.load(Ordering::SeqCst) && !self.requested.swap(true, Ordering::SeqCst) {
            eprintln!("Stopping replay...");
            return;
        }
        eprintln!("Exiting...");
        std::process::exit(0);
    }
}

fn spawn_stdin_reader(samples_tx: Sender<Sample>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for (line_no, line) in io::stdin().lock().lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    error!("Error reading live samples: {}", e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Sample>(&line) {
                Ok(sample) => {
                    if samples_tx.send(sample).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("Skipping live sample on line {}: {}", line_no + 1, e),
            }
        }
    })
}

fn run(
    shutdown: &Shutdown,
    config: &EngineConfig,
    queries: &[String],
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    follow: bool,
) -> Result<(), LapQueryError> {
    let resolver = config.resolver()?;
    let compiler = Compiler::new(&resolver).with_buffer_capacity(config.buffer_capacity);
    let mut query_set = QuerySet::compile(queries, &compiler)?;
    info!(
        "Registered {} queries, replay needs {} laps of history",
        query_set.len(),
        query_set.required_lookback()
    );

    let out: Box<dyn Write> = match &output {
        Some(path) => Box::new(
            std::fs::File::create(path).map_err(|e| LapQueryError::WriterError { source: e })?,
        ),
        None => Box::new(io::stdout()),
    };
    let mut sink = ResultSink {
        texts: query_set.queries().map(|q| q.text().to_string()).collect(),
        throttle: ResultThrottle::new(config.output_rate_hz, query_set.len()),
        writer: ResultWriter::new(out),
        flush_each: false,
    };

    if let Some(input) = &input {
        let mut history = JsonLinesSampleSource::from_file(input)?;
        shutdown.replaying.store(true, Ordering::SeqCst);
        let replayed = query_set.drain_until(&mut history, &shutdown.requested, |index, point| {
            sink.emit(index, point)
        });
        shutdown.replaying.store(false, Ordering::SeqCst);
        sink.writer.flush()?;
        replayed?;
        if shutdown.requested.load(Ordering::SeqCst) {
            return Ok(());
        }
    }

    // without a history file the live stream is the only input
    if follow || input.is_none() {
        let (samples_tx, samples_rx) = mpsc::channel::<Sample>();
        let reader = spawn_stdin_reader(samples_tx);
        let mut live = ChannelSampleSource::new(samples_rx);
        sink.flush_each = true;
        query_set.drain(&mut live, |index, point| sink.emit(index, point))?;
        if reader.join().is_err() {
            warn!("Live sample reader stopped unexpectedly");
        }
    }

    sink.writer.flush()
}

fn check(config: &EngineConfig, queries: &[String]) -> Result<(), LapQueryError> {
    let resolver = config.resolver()?;
    let compiler = Compiler::new(&resolver).with_buffer_capacity(config.buffer_capacity);
    let query_set = QuerySet::compile(queries, &compiler)?;
    for query in query_set.queries() {
        println!(
            "{}\t{}\tlookback {} laps",
            query.text(),
            query.expression(),
            query.required_lookback()
        );
    }
    println!("replay lookback {} laps", query_set.required_lookback());
    Ok(())
}

fn fields(config: &EngineConfig) -> Result<(), LapQueryError> {
    let resolver = config.resolver()?;
    for name in resolver.field_names() {
        println!("{}", name);
    }
    Ok(())
}

fn show_config(config: &EngineConfig, save: bool) -> Result<(), LapQueryError> {
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| LapQueryError::ConfigSerializeError { source: e })?;
    println!("{}", json);
    if save {
        config.save()?;
        if let Some(path) = EngineConfig::default_path() {
            info!("Saved config to {:?}", path);
        }
    }
    Ok(())
}

fn main() {
    colog::init();

    let cli = Args::parse();
    let shutdown = Arc::new(Shutdown::default());
    let handler_shutdown = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || handler_shutdown.interrupt()) {
        warn!("Could not set Ctrl-C handler: {}", e);
    }

    let mut config = EngineConfig::from_local_file().unwrap_or_default();
    if cli.schema.is_some() {
        config.schema_path = cli.schema.clone();
    }

    let result = match cli.command {
        Commands::Run {
            queries,
            input,
            output,
            follow,
            rate_hz,
            buffer_capacity,
        } => {
            if let Some(rate_hz) = rate_hz {
                config.output_rate_hz = rate_hz;
            }
            if let Some(buffer_capacity) = buffer_capacity {
                config.buffer_capacity = buffer_capacity;
            }
            run(&shutdown, &config, &queries, input, output, follow)
        }
        Commands::Check { queries } => check(&config, &queries),
        Commands::Fields => fields(&config),
        Commands::Config { save } => show_config(&config, save),
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}
