use std::io::{self, Write};
use std::process::exit;
use std::time::Duration;

use clap::Parser;
use log::{error, info, warn};

use workpool::process::SyntheticDelay;
use workpool::{report, BatchResult, LaunchPolicy, PoolConfig, Result, WorkerPool};

const EXIT_CONFIG: i32 = 1;
const EXIT_TIMEOUT: i32 = 2;

#[derive(Parser)]
#[command(
    name = "workpool",
    version,
    about = "Process strings concurrently and summarize the results"
)]
struct Cli {
    /// Strings to process, comma-separated
    #[arg(long, value_name = "STRINGS")]
    strings: String,

    /// Most tasks running at once (defaults to the number of CPUs)
    #[arg(long, value_name = "N")]
    max_concurrency: Option<usize>,

    /// Launch policy: "bounded", "unbounded" or "work-stealing"
    #[arg(long, default_value = "bounded", value_name = "POLICY")]
    policy: LaunchPolicy,

    /// Stop waiting for the batch after this many milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Multiplier applied to the simulated work delay
    #[arg(long, default_value_t = 1.0, value_name = "SCALE")]
    time_scale: f64,

    /// Print the batch as JSON instead of a report
    #[arg(long)]
    json: bool,
}

/// Splits a comma-separated list, trimming entries and dropping empty ones.
fn split_by_commas(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(batch) if batch.is_complete() => {}
        Ok(_) => exit(EXIT_TIMEOUT),
        Err(e) => {
            error!("{}", e);
            exit(EXIT_CONFIG);
        }
    }
}

fn run(cli: Cli) -> Result<BatchResult> {
    let strings = split_by_commas(&cli.strings);
    let mut config = PoolConfig::new(cli.max_concurrency.unwrap_or_else(num_cpus::get))
        .policy(cli.policy);
    if let Some(ms) = cli.timeout_ms {
        config = config.timeout(Duration::from_millis(ms));
    }

    info!("workpool {}", env!("CARGO_PKG_VERSION"));
    info!(
        "Launch policy: {}, max concurrency: {}",
        config.launch_policy(),
        config.max_concurrency()
    );

    let work = SyntheticDelay::new(cli.time_scale);
    let pool = WorkerPool::new(config, move |payload: &str| work.process(payload))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if !cli.json {
        report::write_start(&mut out, strings.len())?;
        out.flush()?;
    }

    let batch = pool.run(strings)?;
    if !batch.is_complete() {
        warn!("Batch did not complete before the timeout");
    }

    if cli.json {
        serde_json::to_writer_pretty(&mut out, &batch)?;
        writeln!(out)?;
    } else {
        report::write_report(&mut out, &batch)?;
    }
    out.flush()?;

    Ok(batch)
}
