//! Read and write operations over the cached stack graph.
//!
//! Every write runs its statement(s) and then rebuilds the cache before
//! returning, so the caller's next read sees its own write. Reads only touch
//! storage when the cache has never been built.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::{
    FlashcardId, FlashcardInfo, NewFlashcard, PlayStack, StackId, StackInfo, StudySessionId,
    StudySessionInfo,
};

use super::cache::CacheStore;
use super::error::{StoreError, StoreResult};
use super::source::WriteStore;

#[derive(Clone)]
pub struct FlashcardRepository {
    writer: Arc<dyn WriteStore>,
    cache: Arc<CacheStore>,
}

impl FlashcardRepository {
    pub fn new(writer: Arc<dyn WriteStore>, cache: Arc<CacheStore>) -> Self {
        Self { writer, cache }
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    // ===== Writes =====

    /// Insert the stack, then each flashcard in order.
    ///
    /// The inserts are not wrapped in a transaction: if a flashcard insert
    /// fails the stack and any earlier flashcards remain. The cache is only
    /// rebuilt when every statement succeeded.
    pub async fn create_stack(
        &self,
        name: &str,
        flashcards: &[NewFlashcard],
    ) -> StoreResult<StackId> {
        let stack_id = self.writer.insert_stack(name).await?;

        for card in flashcards {
            self.writer
                .insert_flashcard(stack_id, &card.front, &card.back)
                .await?;
        }

        log::info!(
            "created stack {} '{}' with {} flashcards",
            stack_id,
            name,
            flashcards.len()
        );

        self.cache.rebuild().await?;
        Ok(stack_id)
    }

    pub async fn update_stack(&self, stack_id: StackId, name: &str) -> StoreResult<bool> {
        let updated = self.writer.update_stack(stack_id, name).await?;
        self.cache.rebuild().await?;
        Ok(updated)
    }

    pub async fn delete_stack(&self, stack_id: StackId) -> StoreResult<bool> {
        let deleted = self.writer.delete_stack(stack_id).await?;
        if deleted {
            log::info!("deleted stack {}", stack_id);
        }
        self.cache.rebuild().await?;
        Ok(deleted)
    }

    pub async fn create_flashcard(
        &self,
        stack_id: StackId,
        front: &str,
        back: &str,
    ) -> StoreResult<FlashcardId> {
        let flashcard_id = self.writer.insert_flashcard(stack_id, front, back).await?;
        self.cache.rebuild().await?;
        Ok(flashcard_id)
    }

    pub async fn update_flashcard(
        &self,
        flashcard_id: FlashcardId,
        front: &str,
        back: &str,
    ) -> StoreResult<bool> {
        let updated = self
            .writer
            .update_flashcard(flashcard_id, front, back)
            .await?;
        self.cache.rebuild().await?;
        Ok(updated)
    }

    pub async fn delete_flashcard(&self, flashcard_id: FlashcardId) -> StoreResult<bool> {
        let deleted = self.writer.delete_flashcard(flashcard_id).await?;
        self.cache.rebuild().await?;
        Ok(deleted)
    }

    pub async fn create_study_session(
        &self,
        stack_id: StackId,
        study_time: DateTime<Utc>,
        score: i32,
    ) -> StoreResult<StudySessionId> {
        let session_id = self
            .writer
            .insert_study_session(stack_id, study_time, score)
            .await?;
        self.cache.rebuild().await?;
        Ok(session_id)
    }

    // ===== Reads =====

    pub async fn list_stacks(&self) -> StoreResult<Vec<StackInfo>> {
        self.cache.ensure_ready().await?;
        let graph = self.cache.snapshot();
        Ok(graph.stacks().iter().map(StackInfo::from).collect())
    }

    pub async fn get_stack_by_id(&self, stack_id: StackId) -> StoreResult<Option<StackInfo>> {
        self.cache.ensure_ready().await?;
        Ok(self.cache.snapshot().get(stack_id).map(StackInfo::from))
    }

    /// Stack with its flashcards for a study run. The stack must exist.
    pub async fn get_playable_stack(&self, stack_id: StackId) -> StoreResult<PlayStack> {
        self.cache.ensure_ready().await?;
        let graph = self.cache.snapshot();
        let stack = graph
            .get(stack_id)
            .ok_or_else(|| StoreError::stack_not_found(stack_id))?;

        Ok(PlayStack {
            id: stack.id,
            name: stack.name.clone(),
            flashcards: stack.flashcards.iter().map(FlashcardInfo::from).collect(),
        })
    }

    /// Flashcards of a stack that must exist.
    pub async fn list_stack_flashcards(&self, stack_id: StackId) -> StoreResult<Vec<FlashcardInfo>> {
        self.cache.ensure_ready().await?;
        let graph = self.cache.snapshot();
        let stack = graph
            .get(stack_id)
            .ok_or_else(|| StoreError::stack_not_found(stack_id))?;

        Ok(stack.flashcards.iter().map(FlashcardInfo::from).collect())
    }

    /// `None` when either the stack is unknown or the flashcard belongs elsewhere.
    pub async fn get_flashcard(
        &self,
        stack_id: StackId,
        flashcard_id: FlashcardId,
    ) -> StoreResult<Option<FlashcardInfo>> {
        self.cache.ensure_ready().await?;
        let graph = self.cache.snapshot();

        Ok(graph
            .get(stack_id)
            .and_then(|stack| stack.flashcard(flashcard_id))
            .map(FlashcardInfo::from))
    }

    /// Every study session, grouped by stack in cache order.
    pub async fn list_study_sessions(&self) -> StoreResult<Vec<StudySessionInfo>> {
        self.cache.ensure_ready().await?;
        let graph = self.cache.snapshot();

        Ok(graph
            .stacks()
            .iter()
            .flat_map(|stack| {
                stack
                    .study_sessions
                    .iter()
                    .map(move |session| StudySessionInfo {
                        id: session.id,
                        stack_id: stack.id,
                        stack_name: stack.name.clone(),
                        study_time: session.study_time,
                        score: session.score,
                    })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::test_support::MemoryStore;
    use chrono::TimeZone;

    fn repository(store: &Arc<MemoryStore>) -> FlashcardRepository {
        let cache = Arc::new(CacheStore::new(store.clone(), CacheConfig::default()));
        FlashcardRepository::new(store.clone(), cache)
    }

    fn card(front: &str, back: &str) -> NewFlashcard {
        NewFlashcard {
            front: front.to_string(),
            back: back.to_string(),
        }
    }

    async fn seed_algebra(repo: &FlashcardRepository) -> StackId {
        repo.create_stack("Algebra", &[card("2+2", "4"), card("3+3", "6")])
            .await
            .expect("stack created")
    }

    #[tokio::test]
    async fn list_stacks_on_cold_cache_rebuilds_exactly_once() {
        let store = Arc::new(MemoryStore::new());
        store.seed_stack("Algebra", &[("2+2", "4")]);
        store.seed_stack("History", &[]);
        let repo = repository(&store);

        let stacks = repo.list_stacks().await.unwrap();

        assert_eq!(store.fetch_count(), 1);
        let names: Vec<&str> = stacks.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Algebra", "History"]);

        repo.list_stacks().await.unwrap();
        assert_eq!(store.fetch_count(), 1);
    }

    #[tokio::test]
    async fn created_stack_is_readable_with_its_flashcards() {
        let store = Arc::new(MemoryStore::new());
        let repo = repository(&store);

        let stack_id = seed_algebra(&repo).await;
        let play = repo.get_playable_stack(stack_id).await.unwrap();

        assert_eq!(play.name, "Algebra");
        let fronts: Vec<&str> = play.flashcards.iter().map(|c| c.front.as_str()).collect();
        assert_eq!(fronts, vec!["2+2", "3+3"]);
    }

    #[tokio::test]
    async fn every_write_rebuilds_before_returning() {
        let store = Arc::new(MemoryStore::new());
        let repo = repository(&store);

        let stack_id = seed_algebra(&repo).await;
        let generation = repo.cache().generation();

        repo.update_stack(stack_id, "Arithmetic").await.unwrap();
        assert_eq!(
            repo.get_stack_by_id(stack_id).await.unwrap().unwrap().name,
            "Arithmetic"
        );

        let flashcard_id = repo.create_flashcard(stack_id, "4+4", "8").await.unwrap();
        repo.update_flashcard(flashcard_id, "4+4", "eight").await.unwrap();
        assert_eq!(
            repo.get_flashcard(stack_id, flashcard_id)
                .await
                .unwrap()
                .unwrap()
                .back,
            "eight"
        );

        repo.delete_flashcard(flashcard_id).await.unwrap();
        assert_eq!(repo.get_flashcard(stack_id, flashcard_id).await.unwrap(), None);

        let when = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        repo.create_study_session(stack_id, when, 75).await.unwrap();
        let sessions = repo.list_study_sessions().await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].stack_name, "Arithmetic");
        assert_eq!(sessions[0].study_time, when);

        assert_eq!(repo.cache().generation(), generation + 5);
    }

    #[tokio::test]
    async fn deleted_stack_is_gone_on_next_read() {
        let store = Arc::new(MemoryStore::new());
        let repo = repository(&store);
        let stack_id = seed_algebra(&repo).await;

        assert!(repo.delete_stack(stack_id).await.unwrap());

        assert_eq!(repo.get_stack_by_id(stack_id).await.unwrap(), None);
        assert!(repo.list_stacks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unmatched_update_still_rebuilds() {
        let store = Arc::new(MemoryStore::new());
        let repo = repository(&store);

        assert!(!repo.update_stack(42, "Nope").await.unwrap());
        assert!(!repo.delete_flashcard(42).await.unwrap());
        assert_eq!(store.fetch_count(), 2);
    }

    #[tokio::test]
    async fn flashcard_from_another_stack_is_none() {
        let store = Arc::new(MemoryStore::new());
        let repo = repository(&store);
        let algebra = seed_algebra(&repo).await;
        let other = repo
            .create_stack("Geography", &[card("Capital of France", "Paris")])
            .await
            .unwrap();
        let foreign = repo.list_stack_flashcards(other).await.unwrap()[0].id;

        assert_eq!(repo.get_flashcard(algebra, foreign).await.unwrap(), None);
        assert_eq!(repo.get_flashcard(algebra, 99).await.unwrap(), None);
        assert_eq!(repo.get_flashcard(404, foreign).await.unwrap(), None);
    }

    #[tokio::test]
    async fn presence_assuming_reads_fail_with_not_found() {
        let store = Arc::new(MemoryStore::new());
        let repo = repository(&store);

        let err = repo.get_playable_stack(7).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        let err = repo.list_stack_flashcards(7).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn failed_flashcard_insert_leaves_partial_stack_and_skips_rebuild() {
        let store = Arc::new(MemoryStore::new());
        let repo = repository(&store);
        store.fail_flashcard_inserts_after(1);

        let err = repo
            .create_stack("Chemistry", &[card("H2O", "water"), card("NaCl", "salt")])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
        assert_eq!(store.fetch_count(), 0);

        let stacks = repo.list_stacks().await.unwrap();
        assert_eq!(stacks.len(), 1);
        let cards = repo.list_stack_flashcards(stacks[0].id).await.unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].front, "H2O");
    }

    #[tokio::test]
    async fn write_surfaces_rebuild_failure() {
        let store = Arc::new(MemoryStore::new());
        let repo = repository(&store);
        let stack_id = seed_algebra(&repo).await;

        store.fail_next_fetch();
        let err = repo.update_stack(stack_id, "Renamed").await.unwrap_err();
        assert!(matches!(err, StoreError::StorageUnavailable(_)));

        // Last good graph is still served.
        assert_eq!(
            repo.get_stack_by_id(stack_id).await.unwrap().unwrap().name,
            "Algebra"
        );
    }

    #[tokio::test]
    async fn study_sessions_are_listed_per_stack() {
        let store = Arc::new(MemoryStore::new());
        let repo = repository(&store);
        let algebra = seed_algebra(&repo).await;
        let history = repo.create_stack("History", &[]).await.unwrap();
        let when = Utc.with_ymd_and_hms(2024, 1, 1, 8, 30, 0).unwrap();

        repo.create_study_session(history, when, 50).await.unwrap();
        repo.create_study_session(algebra, when, 100).await.unwrap();
        repo.create_study_session(algebra, when, 80).await.unwrap();

        let sessions = repo.list_study_sessions().await.unwrap();
        let summary: Vec<(&str, i32)> = sessions
            .iter()
            .map(|s| (s.stack_name.as_str(), s.score))
            .collect();
        assert_eq!(
            summary,
            vec![("Algebra", 100), ("Algebra", 80), ("History", 50)]
        );

        // Two flashcards times two sessions still yields two flashcards.
        assert_eq!(repo.list_stack_flashcards(algebra).await.unwrap().len(), 2);
    }
}
