//! Flashcard data-access layer: the join-row source, the graph builder that
//! folds it into stack aggregates, the cache that serves reads, and the
//! repository that keeps the cache in step with writes.

mod cache;
mod error;
mod graph;
mod postgres;
mod repository;
mod row;
mod source;

pub use cache::{CacheStats, CacheStore};
pub use error::{StoreError, StoreResult};
pub use graph::{GraphBuilder, StackGraph, build_graph};
pub use postgres::PgStore;
pub use repository::FlashcardRepository;
pub use row::{FlashcardProjection, JoinRow, STACK_GRAPH_QUERY, StudySessionProjection};
pub use source::{RowSource, WriteStore};
