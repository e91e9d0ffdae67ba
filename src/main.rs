//! Stress Signal Agent CLI
//!
//! Replays recorded input through the signal pipeline, or serves it over HTTP.

use clap::{Parser, Subcommand, ValueEnum};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use stress_signal_agent::{
    channel::{PredictionPayload, RenderSink, StressLevel},
    collector::{EventQueue, InputEvent, DEFAULT_QUEUE_CAPACITY},
    config::{Config, SourceConfig},
    core::{FeatureSnapshot, RecordOutcome, SessionOptions},
    Tracker, SIGNALS_DECLARATION, VERSION,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stress-signal")]
#[command(version = VERSION)]
#[command(about = "Behavioral stress signals from keyboard and pointer input", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed a JSON Lines recording of input events through the pipeline
    Replay {
        /// Input file, or '-' for stdin
        #[arg(long, short, default_value = "-")]
        input: String,

        /// Input sources to record (keyboard, mouse, or all)
        #[arg(long, default_value = "all")]
        sources: String,

        /// Publish a snapshot every N recorded events (0: only at the end)
        #[arg(long, default_value = "50")]
        every: usize,

        /// Output format for snapshots and predictions
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Pace events by their timestamps instead of replaying at full speed
        #[arg(long)]
        realtime: bool,

        /// Seed for simulated click pressure
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Serve the pipeline over HTTP (requires server feature)
    #[cfg(feature = "server")]
    Serve {
        /// Port to bind (defaults to the configured server_port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show configuration
    Config,

    /// List the stress levels reported by the classifier
    Levels,

    /// Display what the agent derives and forwards
    Signals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let config = config.unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config ({e}); using defaults");
        Config::default()
    });
    init_tracing(&config.log_filter);

    match cli.command {
        Commands::Replay {
            input,
            sources,
            every,
            format,
            realtime,
            seed,
        } => {
            if let Err(e) = cmd_replay(&config, &input, &sources, every, format, realtime, seed) {
                eprintln!("Error: {e:#}");
                std::process::exit(1);
            }
        }
        #[cfg(feature = "server")]
        Commands::Serve { port } => {
            if let Err(e) = cmd_serve(config, port) {
                eprintln!("Error: {e:#}");
                std::process::exit(1);
            }
        }
        Commands::Config => {
            cmd_config(&config, cli.config);
        }
        Commands::Levels => {
            cmd_levels();
        }
        Commands::Signals => {
            println!("{SIGNALS_DECLARATION}");
        }
    }
}

/// Install the global subscriber. Logs go to stderr; stdout carries output.
fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Prints snapshots and predictions to stdout.
struct ConsoleSink {
    format: OutputFormat,
}

impl ConsoleSink {
    fn emit_json(&self, value: serde_json::Value) {
        let mut stdout = std::io::stdout().lock();
        if let Ok(line) = serde_json::to_string(&value) {
            let _ = writeln!(stdout, "{line}");
        }
    }
}

impl RenderSink for ConsoleSink {
    fn on_snapshot(&mut self, snapshot: &FeatureSnapshot) {
        match self.format {
            OutputFormat::Text => println!(
                "[snapshot] wpm: {:.0} | backspace: {:.2} | randomness: {:.2} | clicks/s: {:.2} | pressure: {:.2} | distance: {:.0}px",
                snapshot.typing_speed_wpm,
                snapshot.backspace_ratio,
                snapshot.mouse_randomness,
                snapshot.click_frequency,
                snapshot.average_pressure,
                snapshot.total_distance
            ),
            OutputFormat::Json => self.emit_json(serde_json::json!({
                "type": "snapshot",
                "snapshot": snapshot,
            })),
        }
    }

    fn on_prediction(&mut self, prediction: &PredictionPayload) {
        match self.format {
            OutputFormat::Text => println!(
                "[prediction] {} (confidence {:.0}%)",
                prediction.level,
                prediction.confidence * 100.0
            ),
            OutputFormat::Json => self.emit_json(prediction.raw.clone()),
        }
    }
}

/// One parsed line of a replay file.
enum ReplayLine {
    Event(InputEvent),
    /// A classifier message, kept as text for the tracker to parse
    Message(String),
}

fn parse_line(line: &str) -> Result<Option<ReplayLine>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let value: serde_json::Value = serde_json::from_str(line)?;
    if value.get("type").is_some() {
        return Ok(Some(ReplayLine::Message(line.to_string())));
    }
    serde_json::from_value(value).map(|event| Some(ReplayLine::Event(event)))
}

fn open_input(input: &str) -> anyhow::Result<Box<dyn BufRead + Send>> {
    if input == "-" {
        Ok(Box::new(BufReader::new(std::io::stdin())))
    } else {
        let file = std::fs::File::open(input)
            .map_err(|e| anyhow::anyhow!("Could not open {input}: {e}"))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

fn cmd_replay(
    config: &Config,
    input: &str,
    sources: &str,
    every: usize,
    format: OutputFormat,
    realtime: bool,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    let source_config = SourceConfig::from_csv(sources);
    if !source_config.any_enabled() {
        anyhow::bail!("At least one source must be enabled (keyboard or mouse)");
    }

    let options = SessionOptions {
        buffers: config.buffers,
        sources: source_config,
        simulate_pressure: config.simulate_pressure,
        pressure_seed: seed,
    };
    let mut tracker = Tracker::new(options, ConsoleSink { format });

    #[cfg(feature = "gateway")]
    let mut gateway_replies = None;
    #[cfg(feature = "gateway")]
    if config.classifier_url.is_some() {
        use stress_signal_agent::gateway::{
            GatewayChannel, GatewayConfig, DEFAULT_GATEWAY_QUEUE_CAPACITY,
        };
        let gateway = GatewayChannel::spawn(
            GatewayConfig::from_config(config)?,
            DEFAULT_GATEWAY_QUEUE_CAPACITY,
        )?;
        tracing::info!(device_id = gateway.device_id(), "Forwarding events to classifier");
        gateway_replies = Some(gateway.messages());
        tracker = tracker.with_channel(gateway);
    }
    #[cfg(not(feature = "gateway"))]
    if config.classifier_url.is_some() {
        tracing::warn!("classifier_url ignored (gateway feature not enabled at compile time)");
    }

    // Reader thread: events go through the queue, classifier messages beside it.
    let mut queue = EventQueue::new(DEFAULT_QUEUE_CAPACITY);
    let sender = queue
        .sender()
        .ok_or_else(|| anyhow::anyhow!("Event queue closed"))?;
    queue.close();
    let (message_tx, message_rx) = crossbeam_channel::unbounded::<String>();
    let reader = open_input(input)?;

    let reader_thread = thread::Builder::new()
        .name("replay-reader".to_string())
        .spawn(move || {
            let mut malformed = 0u64;
            for (number, line) in reader.lines().enumerate() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::error!("Read error: {e}");
                        break;
                    }
                };
                match parse_line(&line) {
                    Ok(Some(ReplayLine::Event(event))) => {
                        if sender.send(event).is_err() {
                            break;
                        }
                    }
                    Ok(Some(ReplayLine::Message(text))) => {
                        if message_tx.send(text).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        malformed += 1;
                        tracing::warn!(line = number + 1, "Skipping malformed line: {e}");
                    }
                }
            }
            malformed
        })?;

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    tracker.start();
    let mut recorded_since_publish = 0usize;
    let mut pace: Option<(Instant, u64)> = None;

    while running.load(Ordering::SeqCst) {
        while let Ok(text) = message_rx.try_recv() {
            let _ = tracker.handle_message(&text);
        }
        #[cfg(feature = "gateway")]
        if let Some(replies) = &gateway_replies {
            while let Ok(text) = replies.try_recv() {
                let _ = tracker.handle_message(&text);
            }
        }

        let event = match queue.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => event,
            Err(stress_signal_agent::CollectorError::Timeout) => continue,
            Err(_) => break,
        };

        if realtime {
            let timestamp = event.timestamp_ms();
            let (started, first) = *pace.get_or_insert((Instant::now(), timestamp));
            let due = started + Duration::from_millis(timestamp.saturating_sub(first));
            while running.load(Ordering::SeqCst) {
                let now = Instant::now();
                if now >= due {
                    break;
                }
                thread::sleep((due - now).min(Duration::from_millis(100)));
            }
        }

        if let RecordOutcome::Recorded(_) = tracker.record_event(event) {
            recorded_since_publish += 1;
            if every > 0 && recorded_since_publish >= every {
                tracker.publish_snapshot();
                recorded_since_publish = 0;
            }
        }
    }

    // Messages that arrived after the last event.
    while let Ok(text) = message_rx.try_recv() {
        let _ = tracker.handle_message(&text);
    }

    tracker.publish_snapshot();
    tracker.pause();

    // After Ctrl+C the reader may still be blocked on input; leave it behind.
    drop(queue);
    if running.load(Ordering::SeqCst) {
        match reader_thread.join() {
            Ok(malformed) if malformed > 0 => {
                tracing::warn!(malformed, "Some input lines could not be parsed");
            }
            Ok(_) => {}
            Err(_) => tracing::error!("Replay reader thread panicked"),
        }
    }

    if format == OutputFormat::Text {
        eprintln!();
        eprintln!("{}", tracker.log().summary());
    }

    Ok(())
}

#[cfg(feature = "server")]
fn cmd_serve(config: Config, port: Option<u16>) -> anyhow::Result<()> {
    use stress_signal_agent::server::{run, ServerConfig};

    let port = port.unwrap_or(config.server_port);
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async move {
        let (addr, shutdown_tx) = run(ServerConfig::new(port, config)).await?;
        println!("Stress Signal Agent v{VERSION}");
        println!("Listening on http://{addr}");
        println!("Press Ctrl+C to stop");

        tokio::signal::ctrl_c().await?;
        let _ = shutdown_tx.send(());
        Ok::<(), anyhow::Error>(())
    })
}

fn cmd_config(config: &Config, path: Option<PathBuf>) {
    println!("Configuration");
    println!("=============");
    println!();
    println!(
        "Config file: {:?}",
        path.unwrap_or_else(Config::config_path)
    );
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(config).unwrap_or_else(|_| "Error".to_string())
    );
}

fn cmd_levels() {
    println!("Stress levels");
    println!("=============");
    for level in StressLevel::ALL {
        println!("  {}  {}", level.index(), level.label());
    }
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    }) {
        tracing::warn!("Could not install Ctrl+C handler: {e}");
    }
}
