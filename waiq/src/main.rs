//! waiqd - host daemon for the waiq signal aggregation engine
//!
//! Stands in for the platform scheduler and notification listener:
//! - `sense` samples Wi-Fi and location into the shared context every five minutes
//! - `listen` feeds posted notifications (JSON lines on stdin) to the capture pipeline
//! - `messages` prints message and conversation views as JSON
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/waiq/data.db (~/.local/share/waiq/data.db)
//! - Logs: $XDG_STATE_HOME/waiq/waiq.log (~/.local/state/waiq/waiq.log)
//! - Config: $XDG_CONFIG_HOME/waiq/config.toml (~/.config/waiq/config.toml)

mod process_lock;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use process_lock::acquire_sense_guard;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use waiq_core::context::SAMPLE_INTERVAL;
use waiq_core::messages::{DEFAULT_ALL_LIMIT, DEFAULT_PENDING_LIMIT};
use waiq_core::notifications::CaptureOutcome;
use waiq_core::{
    Config, ContextMerger, Database, Device, MessageAggregator, NotificationCapture,
    PostedNotification,
};

#[derive(Parser)]
#[command(name = "waiqd")]
#[command(about = "Capture notifications, aggregate SMS and sample ambient context")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sample Wi-Fi and location into the context every five minutes
    Sense {
        /// Take a single sample and exit
        #[arg(long)]
        once: bool,
    },

    /// Read posted notifications as JSON lines from stdin
    Listen {
        /// JSON array of notifications already showing when the listener connects
        #[arg(long)]
        active: Option<PathBuf>,
    },

    /// Print message views as JSON
    Messages {
        #[command(subcommand)]
        view: MessageView,
    },
}

#[derive(Subcommand)]
enum MessageView {
    /// Unread received messages, newest first
    Pending {
        #[arg(long, default_value_t = DEFAULT_PENDING_LIMIT)]
        limit: usize,
    },
    /// Received messages, newest first
    All {
        #[arg(long, default_value_t = DEFAULT_ALL_LIMIT)]
        limit: usize,
    },
    /// Messages exchanged with one phone number
    From { phone: String },
    /// Conversation summaries
    Threads,
    /// Number of unread messages
    Unread,
    /// Mark a message as read
    MarkRead { id: String },
    /// Delete a message
    Delete { id: String },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;

    let _log_guard =
        waiq_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!("waiqd starting");

    let db_path = config.database_path();
    match args.command {
        Command::Sense { once } => {
            let _sense_guard =
                acquire_sense_guard(&db_path).context("failed to acquire process lock")?;
            let db = open_database(&db_path)?;
            run_sense(&config, db, once)
        }
        Command::Listen { active } => {
            let db = open_database(&db_path)?;
            run_listen(&config, db, active.as_deref())
        }
        Command::Messages { view } => {
            let db = open_database(&db_path)?;
            run_messages(&config, db, view)
        }
    }
}

fn open_database(db_path: &Path) -> Result<Arc<Database>> {
    tracing::info!(path = %db_path.display(), "Opening database");

    let db = Database::open(db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;
    Ok(Arc::new(db))
}

/// Sample immediately, then every [`SAMPLE_INTERVAL`] until Ctrl+C
fn run_sense(config: &Config, db: Arc<Database>, once: bool) -> Result<()> {
    let device = Arc::new(Device::new(db.clone(), config.permissions.clone()));
    let merger = ContextMerger::new(db, device.clone(), device);

    if once {
        let report = merger.sample();
        print_sample(&report);
        return Ok(());
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        eprintln!("\nShutting down...");
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;

    println!(
        "Sampling every {}s. Press Ctrl+C to stop.",
        SAMPLE_INTERVAL.as_secs()
    );

    let mut iteration = 0u64;
    while running.load(Ordering::SeqCst) {
        iteration += 1;
        let report = merger.sample();
        print_sample(&report);
        tracing::debug!(iteration, "Sense iteration complete");

        // Sleep in short ticks so Ctrl+C is honored promptly
        let next = Instant::now() + SAMPLE_INTERVAL;
        while running.load(Ordering::SeqCst) && Instant::now() < next {
            thread::sleep(Duration::from_secs(1));
        }
    }

    println!("Sampler stopped.");
    tracing::info!(iterations = iteration, "waiqd sense stopped");

    Ok(())
}

fn print_sample(report: &waiq_core::context::SampleReport) {
    let timestamp = chrono::Local::now().format("%H:%M:%S");
    let location = match &report.location {
        Some(fix) => format!("{},{}", fix.latitude, fix.longitude),
        None => "none".to_string(),
    };
    let wifi = if report.ssid.is_empty() {
        "none"
    } else {
        report.ssid.as_str()
    };
    println!("[{}] wifi={} location={}", timestamp, wifi, location);

    if !report.context_written {
        eprintln!("Warning: context could not be persisted (see log)");
    }
}

/// Feed posted notifications from stdin to the capture pipeline
fn run_listen(config: &Config, db: Arc<Database>, active: Option<&Path>) -> Result<()> {
    let capture = NotificationCapture::new(db, &config.capture);

    if let Some(path) = active {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read active notifications: {}", path.display()))?;
        let active: Vec<PostedNotification> = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse active notifications: {}", path.display()))?;
        let stored = capture.capture_active(&active);
        println!("Cached {} of {} active notifications", stored, active.len());
    }

    let mut stored = 0usize;
    let mut skipped = 0usize;
    let mut malformed = 0usize;

    for (index, line) in io::stdin().lock().lines().enumerate() {
        let line = line.context("failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        let notification: PostedNotification = match serde_json::from_str(&line) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(line = index + 1, error = %e, "Skipping malformed notification");
                malformed += 1;
                continue;
            }
        };

        match capture.capture(&notification) {
            CaptureOutcome::Stored { .. } => stored += 1,
            CaptureOutcome::Skipped(_) => skipped += 1,
            CaptureOutcome::Failed => {}
        }
    }

    println!(
        "Listener finished: {} stored, {} skipped, {} malformed, {} buffered",
        stored,
        skipped,
        malformed,
        capture.buffer().items().len()
    );
    tracing::info!(stored, skipped, malformed, "waiqd listen complete");

    Ok(())
}

fn run_messages(config: &Config, db: Arc<Database>, view: MessageView) -> Result<()> {
    let device = Arc::new(Device::new(db, config.permissions.clone()));
    let aggregator = MessageAggregator::new(device.clone(), device);

    let output = match view {
        MessageView::Pending { limit } => {
            serde_json::to_string_pretty(&aggregator.pending_messages(limit))?
        }
        MessageView::All { limit } => {
            serde_json::to_string_pretty(&aggregator.all_messages(limit))?
        }
        MessageView::From { phone } => {
            serde_json::to_string_pretty(&aggregator.messages_from_contact(&phone))?
        }
        MessageView::Threads => serde_json::to_string_pretty(&aggregator.threads())?,
        MessageView::Unread => aggregator.unread_count().to_string(),
        MessageView::MarkRead { id } => aggregator.mark_as_read(&id).to_string(),
        MessageView::Delete { id } => aggregator.delete_message(&id).to_string(),
    };
    println!("{}", output);

    Ok(())
}
