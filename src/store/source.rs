//! Storage seams consumed by the cache and the repository.
//!
//! [`RowSource`] is the read side (the join the cache is rebuilt from) and
//! [`WriteStore`] the statement side. [`super::PgStore`] implements both against
//! PostgreSQL; tests substitute an in-memory store.

use chrono::{DateTime, Utc};

use crate::models::{FlashcardId, StackId, StudySessionId};

use super::error::StoreResult;
use super::row::JoinRow;

#[rocket::async_trait]
pub trait RowSource: Send + Sync {
    /// Execute the stack/flashcard/study-session join.
    async fn fetch_rows(&self) -> StoreResult<Vec<JoinRow>>;
}

/// Parameterized INSERT/UPDATE/DELETE statements.
///
/// Update and delete return whether a row matched.
#[rocket::async_trait]
pub trait WriteStore: Send + Sync {
    async fn insert_stack(&self, name: &str) -> StoreResult<StackId>;

    async fn update_stack(&self, stack_id: StackId, name: &str) -> StoreResult<bool>;

    async fn delete_stack(&self, stack_id: StackId) -> StoreResult<bool>;

    async fn insert_flashcard(
        &self,
        stack_id: StackId,
        front: &str,
        back: &str,
    ) -> StoreResult<FlashcardId>;

    async fn update_flashcard(
        &self,
        flashcard_id: FlashcardId,
        front: &str,
        back: &str,
    ) -> StoreResult<bool>;

    async fn delete_flashcard(&self, flashcard_id: FlashcardId) -> StoreResult<bool>;

    async fn insert_study_session(
        &self,
        stack_id: StackId,
        study_time: DateTime<Utc>,
        score: i32,
    ) -> StoreResult<StudySessionId>;
}
