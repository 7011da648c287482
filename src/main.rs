//! Command-line driver for the sieve engine.
//!
//! Usage: sieve run --size 10000000 --save sieve.dat --timeout-ms 2000

use std::path::{Path, PathBuf};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use sieve::{SieveConfig, SieveEngine, SieveOutcome, SieveWorker};

#[derive(Parser, Debug)]
#[command(name = "sieve", about = "Bit-packed Sieve of Eratosthenes")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, default_value_t = false, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sieve in the background until done or the time limit hits
    Run(RunArgs),
    /// Write the primes of a saved sieve, one per line
    Export {
        #[arg(long)]
        state: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Show latest prime and sieve size of a saved sieve
    Info {
        #[arg(long)]
        state: PathBuf,
    },
    /// Next prime after N according to a saved sieve
    Next {
        #[arg(long)]
        state: PathBuf,
        n: u64,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Upper bound (inclusive); defaults to SIEVE_SIZE or the built-in default
    #[arg(long)]
    size: Option<u64>,

    /// Continue from a saved sieve instead of starting fresh
    #[arg(long, conflicts_with = "size")]
    resume: Option<PathBuf>,

    /// Save the sieve state when the pass ends
    #[arg(long)]
    save: Option<PathBuf>,

    /// Export found primes when the pass ends
    #[arg(long)]
    export: Option<PathBuf>,

    /// Interrupt the pass after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt().init();
    }

    let config = SieveConfig::from_env();
    match cli.command {
        Command::Run(args) => run(args, &config),
        Command::Export { state, out } => {
            let engine = load_engine(&state)?;
            let written = engine
                .export_primes(&out)
                .with_context(|| format!("exporting to {}", out.display()))?;
            println!("Exported {} primes below {} to {}", written, engine.latest_prime(), out.display());
            Ok(())
        }
        Command::Info { state } => {
            let engine = load_engine(&state)?;
            println!("Latest prime: {}", engine.latest_prime());
            println!("Sieve size:   {}", engine.sieve_size());
            Ok(())
        }
        Command::Next { state, n } => {
            let engine = load_engine(&state)?;
            println!("{}", engine.find_next_prime(n)?);
            Ok(())
        }
    }
}

fn load_engine(state: &Path) -> anyhow::Result<SieveEngine> {
    let engine = SieveEngine::new(0)?;
    engine
        .data_load(state)
        .with_context(|| format!("loading {}", state.display()))?;
    Ok(engine)
}

fn run(args: RunArgs, config: &SieveConfig) -> anyhow::Result<()> {
    let engine = match &args.resume {
        Some(state) => load_engine(state)?,
        None => match args.size {
            Some(size) => SieveEngine::new(size)?,
            None => SieveEngine::from_config(config)?,
        },
    };
    let engine = Arc::new(engine);

    let started = Instant::now();
    let deadline = args.timeout_ms.map(|ms| started + Duration::from_millis(ms));
    let worker = SieveWorker::spawn(Arc::clone(&engine), config.progress_buffer)?;

    let mut found = 0u64;
    loop {
        let received = match deadline {
            Some(deadline) => worker
                .progress()
                .recv_timeout(deadline.saturating_duration_since(Instant::now())),
            None => worker.progress().recv().map_err(RecvTimeoutError::from),
        };
        match received {
            Ok(prime) => {
                found += 1;
                if found % config.report_every == 0 {
                    info!(found, prime, "progress");
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                info!("time limit reached");
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let outcome = worker.stop()?;
    let elapsed = started.elapsed();
    match outcome {
        SieveOutcome::Completed => println!("✓ Sieve complete"),
        SieveOutcome::Cancelled => println!("Sieve interrupted"),
    }
    println!("Latest prime: {}", engine.latest_prime());
    println!("Sieve size:   {}", engine.sieve_size());
    println!("Time:         {:?}", elapsed);

    if let Some(path) = &args.save {
        engine
            .data_save(path)
            .with_context(|| format!("saving to {}", path.display()))?;
        println!("Saved sieve data to {}", path.display());
    }
    if let Some(path) = &args.export {
        let written = engine
            .export_primes(path)
            .with_context(|| format!("exporting to {}", path.display()))?;
        println!("Exported {} primes to {}", written, path.display());
    }

    Ok(())
}
