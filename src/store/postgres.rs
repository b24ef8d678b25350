use chrono::{DateTime, Utc};
use rocket_db_pools::sqlx::{self, PgPool};

use crate::models::{FlashcardId, StackId, StudySessionId};

use super::error::StoreResult;
use super::row::{JoinRow, RawJoinRow, STACK_GRAPH_QUERY};
use super::source::{RowSource, WriteStore};

/// PostgreSQL-backed row source and statement sink.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[rocket::async_trait]
impl RowSource for PgStore {
    async fn fetch_rows(&self) -> StoreResult<Vec<JoinRow>> {
        let rows: Vec<RawJoinRow> = sqlx::query_as(STACK_GRAPH_QUERY)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(JoinRow::from).collect())
    }
}

#[rocket::async_trait]
impl WriteStore for PgStore {
    async fn insert_stack(&self, name: &str) -> StoreResult<StackId> {
        let id: i32 = sqlx::query_scalar("INSERT INTO stacks (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    async fn update_stack(&self, stack_id: StackId, name: &str) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE stacks SET name = $1 WHERE id = $2")
            .bind(name)
            .bind(stack_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_stack(&self, stack_id: StackId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM stacks WHERE id = $1")
            .bind(stack_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_flashcard(
        &self,
        stack_id: StackId,
        front: &str,
        back: &str,
    ) -> StoreResult<FlashcardId> {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO flashcards (stack_id, front, back) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(stack_id)
        .bind(front)
        .bind(back)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn update_flashcard(
        &self,
        flashcard_id: FlashcardId,
        front: &str,
        back: &str,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"UPDATE flashcards
               SET front = $1,
                   back = $2
               WHERE id = $3"#,
        )
        .bind(front)
        .bind(back)
        .bind(flashcard_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_flashcard(&self, flashcard_id: FlashcardId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM flashcards WHERE id = $1")
            .bind(flashcard_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_study_session(
        &self,
        stack_id: StackId,
        study_time: DateTime<Utc>,
        score: i32,
    ) -> StoreResult<StudySessionId> {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO study_sessions (stack_id, study_time, score) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(stack_id)
        .bind(study_time)
        .bind(score)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }
}
