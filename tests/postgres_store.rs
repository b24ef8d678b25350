use flashcards_api::build_repository;
use flashcards_api::config::CacheConfig;
use flashcards_api::models::NewFlashcard;
use flashcards_api::store::{PgStore, RowSource, StoreError};
use flashcards_api::test_support::{TestDatabase, TestDatabaseError, TestFixtures};

async fn provision(test_name: &str) -> Option<TestDatabase> {
    match TestDatabase::new_from_env().await {
        Ok(db) => Some(db),
        Err(TestDatabaseError::MissingUrl) => {
            eprintln!("skipping {test_name}: TEST_DATABASE_URL not set");
            None
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    }
}

#[tokio::test]
async fn join_fans_out_children_in_id_order() {
    let Some(test_db) = provision("join fan-out test").await else {
        return;
    };
    let pool = test_db.pool_clone();
    let fixtures = TestFixtures::new(&pool);

    let algebra = fixtures.insert_stack("Algebra").await.expect("stack");
    fixtures.insert_flashcard(algebra, "2+2", "4").await.expect("card");
    fixtures.insert_flashcard(algebra, "3*3", "9").await.expect("card");
    fixtures.insert_study_session(algebra, 8).await.expect("session");
    let empty = fixtures.insert_stack("Empty").await.expect("stack");

    let rows = PgStore::new(pool.clone())
        .fetch_rows()
        .await
        .expect("join query");

    // 2 flashcards x 1 session, plus one bare row for the empty stack
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].stack_id, Some(algebra));
    assert_eq!(rows[2].stack_id, Some(empty));
    assert!(rows[2].flashcard.is_none());
    assert!(rows[2].study_session.is_none());

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn repository_reads_its_own_writes() {
    let Some(test_db) = provision("repository round trip test").await else {
        return;
    };
    let repository = build_repository(test_db.pool_clone(), CacheConfig::default());

    let stack_id = repository
        .create_stack(
            "Algebra",
            &[NewFlashcard {
                front: "2+2".to_string(),
                back: "4".to_string(),
            }],
        )
        .await
        .expect("create stack");

    let play = repository
        .get_playable_stack(stack_id)
        .await
        .expect("playable stack");
    assert_eq!(play.name, "Algebra");
    assert_eq!(play.flashcards.len(), 1);

    assert!(repository.delete_stack(stack_id).await.expect("delete"));
    assert!(matches!(
        repository.get_playable_stack(stack_id).await,
        Err(StoreError::NotFound(_))
    ));

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn out_of_band_rows_appear_after_rebuild() {
    let Some(test_db) = provision("out of band rebuild test").await else {
        return;
    };
    let pool = test_db.pool_clone();
    let repository = build_repository(pool.clone(), CacheConfig::default());

    assert!(repository.list_stacks().await.expect("list").is_empty());

    TestFixtures::new(&pool)
        .insert_stack("Geography")
        .await
        .expect("stack");
    assert!(repository.list_stacks().await.expect("list").is_empty());

    repository.cache().rebuild().await.expect("rebuild");
    let stacks = repository.list_stacks().await.expect("list");
    assert_eq!(stacks.len(), 1);
    assert_eq!(stacks[0].name, "Geography");

    test_db.close().await.expect("failed to drop test database");
}
