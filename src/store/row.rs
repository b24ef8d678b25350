//! Row shapes produced by the stack/flashcard/study-session join.
//!
//! The join is `stacks LEFT JOIN flashcards LEFT JOIN study_sessions`, so each
//! row carries one stack plus at most one flashcard and at most one study
//! session. A child whose columns came back NULL is represented as `None`
//! rather than a half-filled struct.

use chrono::{DateTime, Utc};
use rocket_db_pools::sqlx::FromRow;

use crate::models::{Flashcard, FlashcardId, StackId, StudySession, StudySessionId};

/// Query feeding the cache rebuild. Column aliases split the three
/// projections at `stack_id`, `flashcard_id` and `session_id`.
pub const STACK_GRAPH_QUERY: &str = r#"
    SELECT
        s.id AS stack_id,
        s.name AS stack_name,
        f.id AS flashcard_id,
        f.front AS flashcard_front,
        f.back AS flashcard_back,
        ss.id AS session_id,
        ss.study_time AS session_study_time,
        ss.score AS session_score
    FROM stacks s
    LEFT JOIN flashcards f ON s.id = f.stack_id
    LEFT JOIN study_sessions ss ON s.id = ss.stack_id
    ORDER BY s.id, f.id, ss.id
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashcardProjection {
    pub id: FlashcardId,
    pub front: String,
    pub back: String,
}

impl FlashcardProjection {
    pub fn into_flashcard(self, stack_id: StackId) -> Flashcard {
        Flashcard {
            id: self.id,
            stack_id,
            front: self.front,
            back: self.back,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudySessionProjection {
    pub id: StudySessionId,
    pub study_time: DateTime<Utc>,
    pub score: i32,
}

impl StudySessionProjection {
    pub fn into_study_session(self, stack_id: StackId) -> StudySession {
        StudySession {
            id: self.id,
            stack_id,
            study_time: self.study_time,
            score: self.score,
        }
    }
}

/// One denormalized row of the join.
///
/// The stack columns stay optional here so a broken row reaches the graph
/// builder and is reported as malformed instead of failing inside the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRow {
    pub stack_id: Option<StackId>,
    pub stack_name: Option<String>,
    pub flashcard: Option<FlashcardProjection>,
    pub study_session: Option<StudySessionProjection>,
}

impl JoinRow {
    pub fn stack_only(stack_id: StackId, name: impl Into<String>) -> Self {
        Self {
            stack_id: Some(stack_id),
            stack_name: Some(name.into()),
            flashcard: None,
            study_session: None,
        }
    }

    pub fn with_flashcard(
        mut self,
        id: FlashcardId,
        front: impl Into<String>,
        back: impl Into<String>,
    ) -> Self {
        self.flashcard = Some(FlashcardProjection {
            id,
            front: front.into(),
            back: back.into(),
        });
        self
    }

    pub fn with_study_session(
        mut self,
        id: StudySessionId,
        study_time: DateTime<Utc>,
        score: i32,
    ) -> Self {
        self.study_session = Some(StudySessionProjection {
            id,
            study_time,
            score,
        });
        self
    }
}

/// Raw column mapping for [`STACK_GRAPH_QUERY`].
#[derive(Debug, FromRow)]
pub(crate) struct RawJoinRow {
    pub stack_id: Option<i32>,
    pub stack_name: Option<String>,
    pub flashcard_id: Option<i32>,
    pub flashcard_front: Option<String>,
    pub flashcard_back: Option<String>,
    pub session_id: Option<i32>,
    pub session_study_time: Option<DateTime<Utc>>,
    pub session_score: Option<i32>,
}

impl From<RawJoinRow> for JoinRow {
    fn from(row: RawJoinRow) -> Self {
        let flashcard = match (row.flashcard_id, row.flashcard_front, row.flashcard_back) {
            (Some(id), Some(front), Some(back)) => Some(FlashcardProjection { id, front, back }),
            _ => None,
        };

        let study_session = match (row.session_id, row.session_study_time, row.session_score) {
            (Some(id), Some(study_time), Some(score)) => Some(StudySessionProjection {
                id,
                study_time,
                score,
            }),
            _ => None,
        };

        JoinRow {
            stack_id: row.stack_id,
            stack_name: row.stack_name,
            flashcard,
            study_session,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(stack_id: Option<i32>) -> RawJoinRow {
        RawJoinRow {
            stack_id,
            stack_name: Some("Algebra".to_string()),
            flashcard_id: None,
            flashcard_front: None,
            flashcard_back: None,
            session_id: None,
            session_study_time: None,
            session_score: None,
        }
    }

    #[test]
    fn null_child_columns_become_none() {
        let row = JoinRow::from(raw(Some(1)));
        assert_eq!(row, JoinRow::stack_only(1, "Algebra"));
    }

    #[test]
    fn partially_null_child_is_treated_as_absent() {
        let mut source = raw(Some(1));
        source.flashcard_id = Some(7);
        source.flashcard_front = Some("2+2".to_string());

        let row = JoinRow::from(source);
        assert!(row.flashcard.is_none());
    }

    #[test]
    fn complete_children_are_split_out() {
        let now = Utc::now();
        let mut source = raw(Some(1));
        source.flashcard_id = Some(7);
        source.flashcard_front = Some("2+2".to_string());
        source.flashcard_back = Some("4".to_string());
        source.session_id = Some(3);
        source.session_study_time = Some(now);
        source.session_score = Some(80);

        let row = JoinRow::from(source);
        assert_eq!(
            row,
            JoinRow::stack_only(1, "Algebra")
                .with_flashcard(7, "2+2", "4")
                .with_study_session(3, now, 80)
        );
    }

    #[test]
    fn null_stack_id_is_preserved_for_the_builder() {
        let row = JoinRow::from(raw(None));
        assert_eq!(row.stack_id, None);
    }
}
