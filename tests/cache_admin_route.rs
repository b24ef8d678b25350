use flashcards_api::api_routes;
use flashcards_api::test_support::{TestRocketBuilder, memory_repository};
use rocket::http::Status;

#[tokio::test]
async fn stats_do_not_trigger_rebuild() {
    let (store, repository) = memory_repository();
    store.seed_stack("Algebra", &[("2+2", "4")]);

    let client = TestRocketBuilder::new()
        .manage_repository(repository)
        .mount_api_routes(api_routes())
        .async_client()
        .await;

    let response = client.get("/api/v1/admin/cache").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let stats: serde_json::Value = response.into_json().await.expect("stats");
    assert_eq!(stats["initialized"], false);
    assert_eq!(stats["generation"], 0);
    assert_eq!(store.fetch_count(), 0);
}

#[tokio::test]
async fn forced_rebuild_picks_up_out_of_band_rows() {
    let (store, repository) = memory_repository();
    store.seed_stack("Algebra", &[("2+2", "4")]);

    let client = TestRocketBuilder::new()
        .manage_repository(repository)
        .mount_api_routes(api_routes())
        .async_client()
        .await;

    let response = client.post("/api/v1/admin/cache/rebuild").dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    store.seed_stack("Geography", &[("Capital of France", "Paris")]);

    let response = client.post("/api/v1/admin/cache/rebuild").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let stats: serde_json::Value = response.into_json().await.expect("stats");
    assert_eq!(stats["initialized"], true);
    assert_eq!(stats["generation"], 2);
    assert_eq!(stats["stack_count"], 2);
    assert_eq!(stats["flashcard_count"], 2);
}
