//! Process-wide stack cache rebuilt from the join.
//!
//! ## Design
//!
//! - The graph lives behind `RwLock<Arc<StackGraph>>`; readers clone the `Arc`
//!   and never hold the lock across an await.
//! - A rebuild builds into a local [`GraphBuilder`] and publishes with a single
//!   assignment, so readers observe either the old or the new graph in full.
//! - Rebuilds are serialized by an async mutex held across the storage call.
//! - A failed rebuild leaves the previous graph and the `initialized` flag alone.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::RwLock;
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::CacheConfig;
use crate::models::{Stack, StackId};

use super::error::StoreResult;
use super::graph::{GraphBuilder, StackGraph};
use super::source::RowSource;

/// Point-in-time view of the cache for monitoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct CacheStats {
    pub initialized: bool,
    /// Number of successful rebuilds since startup.
    pub generation: u64,
    pub stack_count: usize,
    pub flashcard_count: usize,
    pub study_session_count: usize,
}

pub struct CacheStore {
    source: Arc<dyn RowSource>,
    graph: RwLock<Arc<StackGraph>>,
    initialized: AtomicBool,
    generation: AtomicU64,
    rebuild_lock: Mutex<()>,
    config: CacheConfig,
}

impl CacheStore {
    pub fn new(source: Arc<dyn RowSource>, config: CacheConfig) -> Self {
        Self {
            source,
            graph: RwLock::new(Arc::new(StackGraph::empty())),
            initialized: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            rebuild_lock: Mutex::new(()),
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Re-run the join and replace the cached graph.
    pub async fn rebuild(&self) -> StoreResult<()> {
        let _guard = self.rebuild_lock.lock().await;
        self.rebuild_locked().await
    }

    /// Rebuild only if no rebuild has succeeded yet.
    ///
    /// Concurrent first readers queue on the rebuild lock and re-check the
    /// flag, so only one of them touches storage.
    pub async fn ensure_ready(&self) -> StoreResult<()> {
        if self.is_initialized() {
            return Ok(());
        }

        let _guard = self.rebuild_lock.lock().await;
        if self.is_initialized() {
            return Ok(());
        }
        self.rebuild_locked().await
    }

    async fn rebuild_locked(&self) -> StoreResult<()> {
        let start_time = Instant::now();

        let rows = match self.source.fetch_rows().await {
            Ok(rows) => rows,
            Err(err) => {
                log::warn!("stack cache rebuild failed while fetching rows: {}", err);
                return Err(err);
            }
        };

        let mut builder = GraphBuilder::new();
        for row in rows {
            if let Err(err) = builder.push(row) {
                log::warn!("stack cache rebuild aborted: {}", err);
                return Err(err);
            }
        }
        let row_count = builder.rows_seen();
        let graph = builder.finish();

        let stack_count = graph.len();
        *self.graph.write() = Arc::new(graph);
        self.initialized.store(true, Ordering::Release);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;

        let elapsed = start_time.elapsed();
        if elapsed > self.config.slow_rebuild_threshold {
            log::warn!(
                "slow stack cache rebuild: {} rows into {} stacks took {:.2}ms",
                row_count,
                stack_count,
                elapsed.as_secs_f64() * 1000.0
            );
        } else {
            log::debug!(
                "stack cache rebuilt (generation {}): {} rows into {} stacks in {:.2}ms",
                generation,
                row_count,
                stack_count,
                elapsed.as_secs_f64() * 1000.0
            );
        }

        Ok(())
    }

    /// Current immutable graph. Later rebuilds do not affect a snapshot already taken.
    pub fn snapshot(&self) -> Arc<StackGraph> {
        Arc::clone(&self.graph.read())
    }

    pub fn get(&self, stack_id: StackId) -> Option<Stack> {
        self.snapshot().get(stack_id).cloned()
    }

    /// All cached stacks in insertion order.
    pub fn list(&self) -> Vec<Stack> {
        self.snapshot().stacks().to_vec()
    }

    pub fn stats(&self) -> CacheStats {
        let graph = self.snapshot();
        CacheStats {
            initialized: self.is_initialized(),
            generation: self.generation(),
            stack_count: graph.len(),
            flashcard_count: graph.flashcard_count(),
            study_session_count: graph.study_session_count(),
        }
    }
}
