//! Background sync work.
//!
//! Callers that do not want to wait for a sync hand it to the supervisor.
//! Every command runs as its own task; when a task ends its result is
//! logged, so failures are never silently dropped.

use crate::error::{SyncError, SyncResult};
use crate::orchestrator::DraftSync;
use binder_types::{Book, BookId, ChapterId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, warn};

/// Capacity of the command queue.
const COMMAND_QUEUE_SIZE: usize = 32;

/// Work the supervisor can run.
#[derive(Debug, Clone)]
pub enum SyncCommand {
    SyncBook(BookId),
    NotifyDeletion(Book),
    RestoreLatest,
    PublishHistory(ChapterId),
    RestoreHistory(ChapterId),
}

impl SyncCommand {
    fn label(&self) -> String {
        match self {
            Self::SyncBook(id) => format!("sync of book {id}"),
            Self::NotifyDeletion(book) => format!("deletion notice for book {}", book.id),
            Self::RestoreLatest => "restore of latest snapshot".to_string(),
            Self::PublishHistory(id) => format!("history publish for chapter {id}"),
            Self::RestoreHistory(id) => format!("history restore for chapter {id}"),
        }
    }
}

/// Totals over a supervisor's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupervisorReport {
    pub succeeded: usize,
    pub failed: usize,
}

/// Runs [`SyncCommand`]s in the background.
pub struct SyncSupervisor {
    command_tx: mpsc::Sender<SyncCommand>,
    handle: JoinHandle<SupervisorReport>,
}

impl SyncSupervisor {
    /// Starts the supervisor loop on the current runtime.
    pub fn spawn(sync: Arc<DraftSync>) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_SIZE);
        let handle = tokio::spawn(run_loop(sync, command_rx));
        Self { command_tx, handle }
    }

    /// Queues a command, waiting for room if the queue is full.
    pub async fn submit(&self, command: SyncCommand) -> SyncResult<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| SyncError::ChannelClosed)
    }

    /// Queues a command without waiting.
    pub fn try_submit(&self, command: SyncCommand) -> SyncResult<()> {
        self.command_tx
            .try_send(command)
            .map_err(|_| SyncError::ChannelClosed)
    }

    /// Stops accepting commands, waits for running ones and returns totals.
    pub async fn shutdown(self) -> SyncResult<SupervisorReport> {
        drop(self.command_tx);
        Ok(self.handle.await?)
    }
}

async fn run_loop(
    sync: Arc<DraftSync>,
    mut command_rx: mpsc::Receiver<SyncCommand>,
) -> SupervisorReport {
    let mut tasks = JoinSet::new();
    let mut report = SupervisorReport::default();

    loop {
        tokio::select! {
            command = command_rx.recv() => match command {
                Some(command) => {
                    debug!("Starting background {}", command.label());
                    tasks.spawn(run_command(Arc::clone(&sync), command));
                }
                None => break,
            },
            Some(finished) = tasks.join_next(), if !tasks.is_empty() => {
                record(&mut report, finished);
            }
        }
    }

    while let Some(finished) = tasks.join_next().await {
        record(&mut report, finished);
    }
    report
}

async fn run_command(sync: Arc<DraftSync>, command: SyncCommand) -> (String, SyncResult<()>) {
    let label = command.label();
    let result = match command {
        SyncCommand::SyncBook(id) => sync.sync_book(&id).await.map(drop),
        SyncCommand::NotifyDeletion(book) => sync.notify_book_deletion(&book).await.map(drop),
        SyncCommand::RestoreLatest => sync.restore_latest_snapshot().await.map(drop),
        SyncCommand::PublishHistory(id) => sync.publish_chapter_snapshots(&id).await.map(drop),
        SyncCommand::RestoreHistory(id) => sync.restore_chapter_snapshots(&id).await.map(drop),
    };
    (label, result)
}

fn record(report: &mut SupervisorReport, finished: Result<(String, SyncResult<()>), JoinError>) {
    match finished {
        Ok((label, Ok(()))) => {
            debug!("Background {} finished", label);
            report.succeeded += 1;
        }
        Ok((label, Err(e))) => {
            warn!("Background {} failed: {}", label, e);
            report.failed += 1;
        }
        Err(e) => {
            warn!("Background sync task panicked: {}", e);
            report.failed += 1;
        }
    }
}
