//! wordcount binary
//!
//! Counts the words in files (or stdin) with a persistent WordStore and
//! prints the totals.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use clap::Parser;
use crossbeam::channel::{self, Receiver, Sender};
use tracing_subscriber::{fmt, EnvFilter};
use wordcount::{Config, WalSyncStrategy, WordCount, WordStore};

/// Persistent word counter
#[derive(Parser, Debug)]
#[command(name = "wordcount")]
#[command(about = "Count word occurrences into a persistent store")]
#[command(version)]
struct Args {
    /// Input files (reads stdin when none are given)
    files: Vec<PathBuf>,

    /// Data directory
    #[arg(short, long, default_value = "./wordcount_data")]
    data_dir: PathBuf,

    /// Keep counts from a previous run instead of starting fresh
    #[arg(long)]
    resume: bool,

    /// Worker threads recording observations
    #[arg(short, long, default_value = "4")]
    workers: usize,

    /// fsync the WAL every N observations (1 = every write)
    #[arg(long, default_value = "100")]
    sync_every: usize,

    /// Checkpoint after this many observations (0 disables)
    #[arg(long, default_value = "100000")]
    checkpoint_interval: u64,

    /// Number of table shards
    #[arg(long, default_value = "16")]
    shards: usize,

    /// Lowercase words before counting
    #[arg(long)]
    lowercase: bool,

    /// Print only this word's count
    #[arg(long)]
    word: Option<String>,

    /// Print at most N entries, highest counts first
    #[arg(long)]
    top: Option<usize>,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,wordcount=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("wordcount v{}", wordcount::VERSION);
    tracing::info!("Data directory: {}", args.data_dir.display());

    let config = build_config(&args);

    let opened = if args.resume {
        WordStore::open(config)
    } else {
        WordStore::initialize(config)
    };
    let store = match opened {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&store, &args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }

    if let Err(e) = store.close() {
        tracing::error!("Failed to close store: {}", e);
        std::process::exit(1);
    }
}

fn build_config(args: &Args) -> Config {
    let sync = match args.sync_every {
        0 | 1 => WalSyncStrategy::EveryWrite,
        count => WalSyncStrategy::EveryNEntries { count },
    };
    let checkpoint_interval = match args.checkpoint_interval {
        0 => None,
        n => Some(n),
    };

    Config::builder()
        .data_dir(&args.data_dir)
        .wal_sync_strategy(sync)
        .checkpoint_interval(checkpoint_interval)
        .shard_count(args.shards)
        .build()
}

fn run(store: &WordStore, args: &Args) -> wordcount::Result<()> {
    let failures = AtomicU64::new(0);
    let workers = args.workers.max(1);
    let (tx, rx) = channel::bounded::<String>(4096);

    let sent = std::thread::scope(|scope| {
        for _ in 0..workers {
            let rx = rx.clone();
            let failures = &failures;
            scope.spawn(move || record_worker(store, rx, failures));
        }
        drop(rx);

        feed_words(args, tx)
    })?;

    let failed = failures.load(Ordering::Relaxed);
    tracing::info!(observed = sent, failed, distinct = store.len(), "Ingest finished");

    print_counts(store, args)
}

fn record_worker(store: &WordStore, rx: Receiver<String>, failures: &AtomicU64) {
    for word in rx {
        if let Err(e) = store.record(&word) {
            tracing::warn!(word = %word, error = %e, "Failed to record observation");
            failures.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Send every word of every input; returns how many were sent
fn feed_words(args: &Args, tx: Sender<String>) -> wordcount::Result<u64> {
    let mut sent = 0u64;

    if args.files.is_empty() {
        sent += feed_reader(io::stdin().lock(), args.lowercase, &tx)?;
    } else {
        for path in &args.files {
            tracing::debug!(file = %path.display(), "Reading input");
            let reader = BufReader::new(File::open(path)?);
            sent += feed_reader(reader, args.lowercase, &tx)?;
        }
    }

    Ok(sent)
}

fn feed_reader<R: BufRead>(mut reader: R, lowercase: bool, tx: &Sender<String>) -> wordcount::Result<u64> {
    let mut sent = 0u64;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(sent);
        }
        // Invalid UTF-8 is replaced rather than aborting the whole ingest
        let line = String::from_utf8_lossy(&buf);
        for word in line.split_whitespace() {
            let word = if lowercase {
                word.to_lowercase()
            } else {
                word.to_owned()
            };
            // Workers only hang up if they all panicked
            if tx.send(word).is_err() {
                return Ok(sent);
            }
            sent += 1;
        }
    }
}

fn print_counts(store: &WordStore, args: &Args) -> wordcount::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Some(word) = &args.word {
        let count = store.fetch_one(word)?.map(|wc| wc.count).unwrap_or(0);
        writeln!(out, "{}\t{}", word, count)?;
        return Ok(());
    }

    let mut entries: Vec<WordCount> = store.fetch_all()?.collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));

    let limit = args.top.unwrap_or(entries.len());
    for entry in entries.iter().take(limit) {
        writeln!(out, "{}\t{}", entry.word, entry.count)?;
    }
    Ok(())
}
