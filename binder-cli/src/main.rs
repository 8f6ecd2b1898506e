//! Binder draft sync tool
//!
//! Pushes locally stored drafts to Nostr relays as encrypted snapshots and
//! restores them on another machine holding the same identity.
//!
//! Usage:
//!   binder --relay wss://relay.example.com import book.json
//!   binder --relay wss://relay.example.com push <book-id>
//!   binder --relay wss://relay.example.com pull

use anyhow::{Context, Result, bail};
use binder_store::{DraftStore, SqliteDraftStore};
use binder_sync::{
    AuthState, DraftSync, KeysSigner, NostrRelayTransport, RelayTransportConfig, RestoreOutcome,
    StaticRelaySettings, SyncSession,
};
use binder_types::{Book, BookId, ChapterDraft, ChapterId};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}, sync::Arc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "binder")]
#[command(about = "Encrypted Binder draft sync over Nostr relays")]
struct Args {
    /// Path to the local draft database
    #[arg(short, long, default_value = "binder-drafts.db")]
    db: PathBuf,

    /// Path to the identity key file (hex secret key)
    #[arg(short, long, default_value = "binder-identity.key")]
    identity: PathBuf,

    /// Relay to sync with (repeatable)
    #[arg(short, long = "relay", required = true)]
    relays: Vec<String>,

    /// Accept ws:// relays on localhost
    #[arg(long)]
    dev: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a book bundle (JSON) into the local database
    Import { path: PathBuf },
    /// Write a book and its chapters as a bundle
    Export { book: String, path: PathBuf },
    /// List local books
    List,
    /// Publish an encrypted snapshot of a book
    Push { book: String },
    /// Restore the newest snapshot from the relays
    Pull,
    /// Delete a book locally and tell other devices
    Delete { book: String },
    /// Publish the revision history of a chapter
    PushHistory { chapter: String },
    /// Restore the revision history of a chapter
    PullHistory { chapter: String },
}

/// A book with its chapters, as read and written by import/export.
#[derive(Debug, Serialize, Deserialize)]
struct BookBundle {
    book: Book,
    #[serde(default)]
    chapters: Vec<ChapterDraft>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .compact()
        .init();

    let store = Arc::new(
        SqliteDraftStore::open(&args.db)
            .with_context(|| format!("Failed to open draft database {:?}", args.db))?,
    );
    let signer = load_or_generate_signer(&args.identity)?;
    let pubkey = signer.keys().public_key().to_hex();
    info!("Identity: {}", pubkey);

    // Local keys sign directly, so the scope keys derive from the local
    // secret and stay stable across runs.
    let auth = AuthState::delegated(pubkey, signer.secret_key_hex());
    let settings = StaticRelaySettings::with_options(&args.relays, args.dev)
        .context("Invalid relay configuration")?;
    let transport = NostrRelayTransport::new(RelayTransportConfig::default());

    let sync = DraftSync::new(
        store.clone(),
        Arc::new(signer),
        Arc::new(settings),
        Arc::new(transport),
        Arc::new(SyncSession::logged_in(auth)),
    );

    match args.command {
        Command::Import { path } => import(store.as_ref(), &path).await,
        Command::Export { book, path } => export(store.as_ref(), &parse_book(&book)?, &path).await,
        Command::List => list(store.as_ref()).await,
        Command::Push { book } => {
            let report = sync.sync_book(&parse_book(&book)?).await?;
            if report.accepted == 0 {
                bail!("No relay accepted the snapshot ({} attempted)", report.attempted);
            }
            println!("Pushed to {}/{} relays", report.accepted, report.attempted);
            Ok(())
        }
        Command::Pull => {
            print_outcome(sync.restore_latest_snapshot().await?);
            Ok(())
        }
        Command::Delete { book } => {
            let id = parse_book(&book)?;
            let Some(book) = store.get_book(&id).await? else {
                bail!("Book {} not found", id);
            };
            store.delete_chapters_for_book(&id).await?;
            store.delete_book(&id).await?;
            let report = sync.notify_book_deletion(&book).await?;
            println!(
                "Deleted \"{}\"; notice sent to {}/{} relays",
                book.title, report.accepted, report.attempted
            );
            Ok(())
        }
        Command::PushHistory { chapter } => {
            let report = sync.publish_chapter_snapshots(&parse_chapter(&chapter)?).await?;
            println!("Pushed history to {}/{} relays", report.accepted, report.attempted);
            Ok(())
        }
        Command::PullHistory { chapter } => {
            print_outcome(sync.restore_chapter_snapshots(&parse_chapter(&chapter)?).await?);
            Ok(())
        }
    }
}

fn parse_book(s: &str) -> Result<BookId> {
    BookId::parse(s).with_context(|| format!("Invalid book id: {s}"))
}

fn parse_chapter(s: &str) -> Result<ChapterId> {
    ChapterId::parse(s).with_context(|| format!("Invalid chapter id: {s}"))
}

async fn import(store: &dyn DraftStore, path: &Path) -> Result<()> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read bundle {path:?}"))?;
    let bundle: BookBundle = serde_json::from_slice(&bytes).context("Failed to parse bundle")?;
    bundle
        .book
        .validate_chapter_order(Some(bundle.chapters.as_slice()))
        .context("Bundle chapter order is inconsistent")?;

    store.save_book(&bundle.book).await?;
    for chapter in &bundle.chapters {
        store.save_chapter(chapter).await?;
    }
    println!(
        "Imported \"{}\" ({}) with {} chapters",
        bundle.book.title,
        bundle.book.id,
        bundle.chapters.len()
    );
    Ok(())
}

async fn export(store: &dyn DraftStore, id: &BookId, path: &Path) -> Result<()> {
    let Some(book) = store.get_book(id).await? else {
        bail!("Book {} not found", id);
    };
    let chapters = store.get_chapters_for_book(id).await?;
    let bundle = BookBundle { book, chapters };
    fs::write(path, serde_json::to_vec_pretty(&bundle)?)
        .with_context(|| format!("Failed to write bundle {path:?}"))?;
    println!("Exported {} chapters to {:?}", bundle.chapters.len(), path);
    Ok(())
}

async fn list(store: &dyn DraftStore) -> Result<()> {
    let books = store.list_books().await?;
    if books.is_empty() {
        println!("No books");
    }
    for book in books {
        println!("{}  {}  ({} chapters)", book.id, book.title, book.chapter_order.len());
    }
    Ok(())
}

fn print_outcome(outcome: RestoreOutcome) {
    match outcome {
        RestoreOutcome::Noop => println!("Nothing to restore"),
        RestoreOutcome::AlreadyApplied => println!("Already up to date"),
        RestoreOutcome::Applied(report) => println!(
            "Restored: {} books written, {} deleted, {} chapters written, {} kept, \
             {} history entries",
            report.books_written,
            report.books_deleted,
            report.chapters_written,
            report.chapters_kept,
            report.history_saved
        ),
    }
}

fn load_or_generate_signer(path: &Path) -> Result<KeysSigner> {
    if path.exists() {
        info!("Loading identity from {:?}", path);
        let secret = fs::read_to_string(path).context("Failed to read identity file")?;
        KeysSigner::parse(secret.trim()).context("Failed to decode identity key")
    } else {
        warn!("Generating new identity at {:?}", path);
        let signer = KeysSigner::generate();
        fs::write(path, signer.secret_key_hex()).context("Failed to write identity file")?;
        Ok(signer)
    }
}
