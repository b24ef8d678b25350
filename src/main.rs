#[macro_use]
extern crate rocket;

#[launch]
fn rocket() -> _ {
    let rocket = flashcards_api::rocket();
    log::info!("Starting Flashcards API Server");
    rocket
}
