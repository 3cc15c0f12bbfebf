use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use tasktime::cli::ReplayCli;
use tasktime::clock::ManualClock;
use tasktime::events::Replayer;
use tasktime::{BenchmarkConfig, TimingAggregator};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn open_events(args: &ReplayCli) -> Result<Box<dyn BufRead>> {
    if args.events.as_os_str() == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(&args.events)
        .with_context(|| format!("Failed to open event log {}", args.events.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

fn main() -> Result<()> {
    let args = ReplayCli::parse();
    init_tracing(args.debug);

    let mut config = BenchmarkConfig::from_env();
    if args.enable {
        config.enabled = true;
    }
    if let Some(dir) = &args.benchmark_dir {
        config.run_dir = Some(dir.clone());
    }

    let events = open_events(&args)?;
    let clock = ManualClock::new();
    let aggregator = TimingAggregator::with_clock(config, clock.clone())
        .context("Failed to start benchmark run")?;

    if !aggregator.is_enabled() {
        eprintln!("Benchmark timing disabled (set IDOPS_BENCHMARK=1 or pass --enable)");
    }

    let outcome = Replayer::new(&aggregator, clock)
        .replay(events)
        .context("Failed to read event log")?;

    if outcome.skipped_lines > 0 {
        eprintln!(
            "Skipped {} malformed event log line(s)",
            outcome.skipped_lines
        );
    }

    if let (Some(summary), Some(path)) = (&outcome.summary, aggregator.summary_path()) {
        for line in summary.announcement(&path) {
            println!("{}", line);
        }
    }

    Ok(())
}
