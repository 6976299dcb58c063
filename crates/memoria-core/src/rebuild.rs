//! Rebuild-per-creator background task (§5): re-ingests every memo for one `creator` from the
//! upstream [`MemoSource`], enforcing at most one active rebuild per creator via a process-wide
//! status map.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tokio::sync::RwLock;

use crate::ingest::IngestionPipeline;
use crate::memo_source::MemoSource;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StateError {
    #[error("a rebuild for creator {0:?} is already running")]
    AlreadyRunning(String),
}

/// The lifecycle of one rebuild request (§5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildState {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Status of one creator's most recent rebuild, polled by callers rather than pushed.
#[derive(Debug, Clone)]
pub struct RebuildStatus {
    pub creator: String,
    pub state: RebuildState,
    pub memos_seen: usize,
    pub memos_indexed: usize,
    pub memos_failed: usize,
    pub started_at: u64,
    pub finished_at: Option<u64>,
    pub error: Option<String>,
}

impl RebuildStatus {
    fn pending(creator: &str, started_at: u64) -> Self {
        Self {
            creator: creator.to_string(),
            state: RebuildState::Pending,
            memos_seen: 0,
            memos_indexed: 0,
            memos_failed: 0,
            started_at,
            finished_at: None,
            error: None,
        }
    }
}

fn now_unix_seconds() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// Owns the process-wide per-creator rebuild status map and drives rebuilds against a
/// [`MemoSource`] and [`IngestionPipeline`] (§5 "rebuild-all-for-user").
///
/// The rebuild task records status but does not abort partway on a per-memo failure: those are
/// counted in `memos_failed` and the rebuild continues (§7 ProviderError policy).
pub struct RebuildManager {
    source: Arc<dyn MemoSource>,
    pipeline: Arc<IngestionPipeline>,
    statuses: RwLock<HashMap<String, RebuildStatus>>,
}

impl RebuildManager {
    pub fn new(source: Arc<dyn MemoSource>, pipeline: Arc<IngestionPipeline>) -> Self {
        Self { source, pipeline, statuses: RwLock::new(HashMap::new()) }
    }

    pub async fn status(&self, creator: &str) -> Option<RebuildStatus> {
        self.statuses.read().await.get(creator).cloned()
    }

    /// Starts a rebuild for `creator`, rejecting a concurrent second rebuild for the same
    /// creator with [`StateError::AlreadyRunning`] (§5). Runs to completion before returning;
    /// callers that want fire-and-forget semantics should `tokio::spawn` this themselves.
    pub async fn rebuild(&self, creator: &str) -> Result<RebuildStatus, StateError> {
        {
            let mut statuses = self.statuses.write().await;
            if let Some(existing) = statuses.get(creator) {
                if existing.state == RebuildState::Running {
                    return Err(StateError::AlreadyRunning(creator.to_string()));
                }
            }
            statuses.insert(creator.to_string(), RebuildStatus::pending(creator, now_unix_seconds()));
        }

        {
            let mut statuses = self.statuses.write().await;
            if let Some(status) = statuses.get_mut(creator) {
                status.state = RebuildState::Running;
            }
        }

        let memos = match self.source.list_by_creator(creator).await {
            Ok(memos) => memos,
            Err(e) => {
                let mut statuses = self.statuses.write().await;
                let status = statuses.get_mut(creator).expect("status inserted above");
                status.state = RebuildState::Failed;
                status.error = Some(e.to_string());
                status.finished_at = Some(now_unix_seconds());
                return Ok(status.clone());
            }
        };

        let mut seen = 0usize;
        let mut indexed = 0usize;
        let mut failed = 0usize;
        for memo in &memos {
            seen += 1;
            match self.pipeline.ingest(memo).await {
                Ok(_) => indexed += 1,
                Err(e) => {
                    failed += 1;
                    tracing::warn!(creator, memo_uid = memo.uid(), error = %e, "rebuild failed to index memo");
                }
            }
        }

        let mut statuses = self.statuses.write().await;
        let status = statuses.get_mut(creator).expect("status inserted above");
        status.memos_seen = seen;
        status.memos_indexed = indexed;
        status.memos_failed = failed;
        status.state = RebuildState::Completed;
        status.finished_at = Some(now_unix_seconds());
        Ok(status.clone())
    }
}
