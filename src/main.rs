use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracksync::controller::PlayerController;
use tracksync::library::{LibraryIndex, scan_folders};
use tracksync::session::{MediaSession, SimulatedSession, TrackRef};
use tracksync::state::PlaybackSnapshot;
use tracksync::store::PlaybackStateStore;

/// Application configuration from CLI
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Config {
    /// Folder to scan for audio files
    #[arg(long, default_value = ".")]
    folder: PathBuf,
    /// Persist the scanned library index to this file
    #[arg(long)]
    index: Option<PathBuf>,
    /// Progress sampling interval in milliseconds (UI smoothness knob)
    #[arg(long, default_value_t = 250)]
    tick_ms: u64,
    /// Emit one JSON object per snapshot change instead of text lines
    #[arg(long)]
    json: bool,
    /// Enable backend debug logging to stderr
    #[arg(long)]
    pub debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cfg = Config::parse();
    init_tracing(cfg.debug);

    let entries = scan_folders(&cfg.folder)?;
    if entries.is_empty() {
        eprintln!("no audio files under {}", cfg.folder.display());
        return Ok(());
    }
    let queue: Vec<TrackRef> = entries.iter().map(|e| TrackRef::new(&e.path)).collect();
    let index = LibraryIndex::from_entries(entries);
    if let Some(path) = &cfg.index {
        index.save(path).await?;
    }

    let session: Arc<dyn MediaSession> = Arc::new(SimulatedSession::new());
    let store = PlaybackStateStore::spawn(
        PlayerController::with_session(session),
        Arc::new(index),
        Duration::from_millis(cfg.tick_ms),
    );
    store.start_playback(queue, 0);

    let mut snapshots = store.subscribe();
    let mut saw_playback = false;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snap = snapshots.borrow_and_update().clone();
                if cfg.json {
                    println!("{}", serde_json::to_string(&snap)?);
                } else {
                    print_line(&snap);
                }
                // The queue has run out once we have seen playback and the
                // engine reports stopped again.
                if snap.stopped && saw_playback {
                    break;
                }
                saw_playback = saw_playback || !snap.stopped;
            }
        }
    }

    store.dispose().await;
    Ok(())
}

fn print_line(snap: &PlaybackSnapshot) {
    if snap.stopped {
        println!("stopped");
        return;
    }
    let marker = if snap.is_playing { ">" } else { "=" };
    println!(
        "{} {}  {} / {}  ({:.0}%)",
        marker, snap.track_name, snap.progress_formatted, snap.duration_formatted, snap.progress_percent
    );
}

fn init_tracing(debug: bool) {
    let default_filter = if debug { "tracksync=debug" } else { "tracksync=warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
