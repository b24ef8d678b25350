//! Folding the denormalized join into nested stack aggregates.
//!
//! ## Algorithm
//!
//! The join crosses two independent one-to-many relations against the same
//! parent, so a stack with `F` flashcards and `S` sessions arrives as
//! `max(1, F) * max(1, S)` rows. Each row is folded in order:
//!
//! 1. An unseen stack id opens a new aggregate (first-seen order is kept).
//! 2. A flashcard projection is appended unless its id was already seen for
//!    that stack.
//! 3. The same for the study session projection.
//!
//! Step 2 and 3 deduplication is what turns the fan-out back into the real
//! child sets; skipping it multiplies every child by the other side's count.

use std::collections::{HashMap, HashSet};

use crate::models::{FlashcardId, Stack, StackId, StudySessionId};

use super::error::{StoreError, StoreResult};
use super::row::JoinRow;

/// Immutable, ordered snapshot of every cached stack.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackGraph {
    stacks: Vec<Stack>,
    index: HashMap<StackId, usize>,
}

impl StackGraph {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, stack_id: StackId) -> Option<&Stack> {
        self.index.get(&stack_id).map(|&pos| &self.stacks[pos])
    }

    /// Stacks in first-seen order.
    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    pub fn flashcard_count(&self) -> usize {
        self.stacks.iter().map(|stack| stack.flashcards.len()).sum()
    }

    pub fn study_session_count(&self) -> usize {
        self.stacks.iter().map(|stack| stack.study_sessions.len()).sum()
    }
}

#[derive(Default)]
struct SeenChildren {
    flashcards: HashSet<FlashcardId>,
    study_sessions: HashSet<StudySessionId>,
}

/// Incremental fold over join rows; call [`GraphBuilder::finish`] once the
/// row stream is exhausted.
#[derive(Default)]
pub struct GraphBuilder {
    stacks: Vec<Stack>,
    index: HashMap<StackId, usize>,
    seen: Vec<SeenChildren>,
    rows: usize,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows folded so far.
    pub fn rows_seen(&self) -> usize {
        self.rows
    }

    pub fn push(&mut self, row: JoinRow) -> StoreResult<()> {
        let row_number = self.rows;
        self.rows += 1;

        let stack_id = row
            .stack_id
            .ok_or_else(|| StoreError::malformed(row_number, "stack id is null"))?;

        let pos = match self.index.get(&stack_id) {
            Some(&pos) => pos,
            None => {
                let name = row.stack_name.ok_or_else(|| {
                    StoreError::malformed(row_number, format!("stack {stack_id} has a null name"))
                })?;
                self.stacks.push(Stack::new(stack_id, name));
                self.seen.push(SeenChildren::default());
                self.index.insert(stack_id, self.stacks.len() - 1);
                self.stacks.len() - 1
            }
        };

        let stack = &mut self.stacks[pos];
        let seen = &mut self.seen[pos];

        if let Some(card) = row.flashcard {
            if seen.flashcards.insert(card.id) {
                stack.flashcards.push(card.into_flashcard(stack_id));
            }
        }

        if let Some(session) = row.study_session {
            if seen.study_sessions.insert(session.id) {
                stack
                    .study_sessions
                    .push(session.into_study_session(stack_id));
            }
        }

        Ok(())
    }

    pub fn finish(self) -> StackGraph {
        StackGraph {
            stacks: self.stacks,
            index: self.index,
        }
    }
}

/// Build a complete graph from a row stream, aborting on the first malformed row.
pub fn build_graph<I>(rows: I) -> StoreResult<StackGraph>
where
    I: IntoIterator<Item = JoinRow>,
{
    let mut builder = GraphBuilder::new();
    for row in rows {
        builder.push(row)?;
    }
    Ok(builder.finish())
}
