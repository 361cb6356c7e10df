use actix_web::{http::StatusCode, test, web, App};
use mongodb::Client;
use serde_json::{json, Value};

use splitledger::{auth::TokenSigner, routes, store::Store};

// The driver connects lazily, so requests rejected before touching the
// store never need a running MongoDB.
async fn state() -> (web::Data<Store>, web::Data<TokenSigner>) {
    let client = Client::with_uri_str("mongodb://127.0.0.1:27017")
        .await
        .unwrap();
    (
        web::Data::new(Store::new(client.database("splitledger_test"))),
        web::Data::new(TokenSigner::new("test-secret", 1)),
    )
}

#[actix_web::test]
async fn splitter_routes_need_a_token() {
    let (store, signer) = state().await;
    let app = test::init_service(
        App::new()
            .app_data(store)
            .app_data(signer)
            .configure(routes::configure),
    )
    .await;

    let request = test::TestRequest::get()
        .uri("/api/splitter/groups")
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn tokens_from_another_key_are_rejected() {
    let (store, signer) = state().await;
    let app = test::init_service(
        App::new()
            .app_data(store)
            .app_data(signer)
            .configure(routes::configure),
    )
    .await;

    let request = test::TestRequest::get()
        .uri("/api/insights")
        .insert_header(("Authorization", "Bearer e30.c2lnbmF0dXJl"))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["error"], "Unauthorized: invalid token");
}

#[actix_web::test]
async fn short_passwords_are_refused() {
    let (store, signer) = state().await;
    let app = test::init_service(
        App::new()
            .app_data(store)
            .app_data(signer)
            .configure(routes::configure),
    )
    .await;

    let request = test::TestRequest::post()
        .uri("/api/register")
        .set_json(json!({ "username": "alice", "password": "123" }))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
