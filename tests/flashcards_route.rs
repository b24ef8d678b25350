use flashcards_api::api_routes;
use flashcards_api::models::{CreatedResponse, DataResponse, FlashcardInfo};
use flashcards_api::test_support::{TestRocketBuilder, memory_repository};
use rocket::http::Status;
use serde_json::json;

#[tokio::test]
async fn flashcard_lifecycle_is_visible_through_reads() {
    let (store, repository) = memory_repository();
    let stack_id = store.seed_stack("Algebra", &[("2+2", "4")]);

    let client = TestRocketBuilder::new()
        .manage_repository(repository)
        .mount_api_routes(api_routes())
        .async_client()
        .await;

    let response = client
        .post(format!("/api/v1/stacks/{stack_id}/flashcards"))
        .json(&json!({"front": "3*3", "back": "9"}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let created: CreatedResponse = response.into_json().await.expect("created id");

    let response = client
        .put(format!("/api/v1/flashcards/{}", created.id))
        .json(&json!({"front": "  3*4", "back": "12\n"}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let response = client
        .get(format!("/api/v1/stacks/{stack_id}/flashcards/{}", created.id))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let card: FlashcardInfo = response.into_json().await.expect("flashcard");
    assert_eq!(card.front, "3*4");
    assert_eq!(card.back, "12");

    let response = client
        .delete(format!("/api/v1/flashcards/{}", created.id))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let response = client
        .get(format!("/api/v1/stacks/{stack_id}/flashcards"))
        .dispatch()
        .await;
    let payload: DataResponse<Vec<FlashcardInfo>> =
        response.into_json().await.expect("flashcard list");
    let fronts: Vec<&str> = payload.data.iter().map(|c| c.front.as_str()).collect();
    assert_eq!(fronts, vec!["2+2"]);
}

#[tokio::test]
async fn flashcard_of_another_stack_is_not_found() {
    let (store, repository) = memory_repository();
    let algebra = store.seed_stack("Algebra", &[("2+2", "4")]);
    let geography = store.seed_stack("Geography", &[]);

    let client = TestRocketBuilder::new()
        .manage_repository(repository)
        .mount_api_routes(api_routes())
        .async_client()
        .await;

    let response = client
        .get(format!("/api/v1/stacks/{algebra}/flashcards/1"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let response = client
        .get(format!("/api/v1/stacks/{geography}/flashcards/1"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);
}

#[tokio::test]
async fn create_flashcard_for_unknown_stack_is_not_found() {
    let (_store, repository) = memory_repository();
    let client = TestRocketBuilder::new()
        .manage_repository(repository)
        .mount_api_routes(api_routes())
        .async_client()
        .await;

    let response = client
        .post("/api/v1/stacks/9/flashcards")
        .json(&json!({"front": "a", "back": "b"}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);

    let response = client
        .put("/api/v1/flashcards/9")
        .json(&json!({"front": "a", "back": "b"}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);
}

#[tokio::test]
async fn created_flashcard_text_is_trimmed() {
    let (store, repository) = memory_repository();
    let stack_id = store.seed_stack("Algebra", &[]);

    let client = TestRocketBuilder::new()
        .manage_repository(repository)
        .mount_api_routes(api_routes())
        .async_client()
        .await;

    let response = client
        .post(format!("/api/v1/stacks/{stack_id}/flashcards"))
        .json(&json!({"front": "  5-1 ", "back": " 4 "}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let created: CreatedResponse = response.into_json().await.expect("created id");

    let response = client
        .get(format!("/api/v1/stacks/{stack_id}/flashcards/{}", created.id))
        .dispatch()
        .await;
    let card: FlashcardInfo = response.into_json().await.expect("flashcard");
    assert_eq!(card.front, "5-1");
    assert_eq!(card.back, "4");
}
