mod common;

use common::{TestApp, AZURE_PATH, GEMINI_PATH};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn chat_relays_to_gemini_and_records_both_messages() {
    let app = TestApp::spawn().await;
    app.mount_gemini_reply("Hello there").await;
    let chat_id = app.new_chat().await;

    let response = app
        .post_chat(&json!({ "message": "Hi", "chatId": chat_id }))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["response"], "Hello there");
    assert_eq!(body["chatId"], chat_id);
    let timestamp = body["timestamp"].as_str().unwrap();
    assert_eq!(timestamp.len(), 5);
    assert_eq!(&timestamp[2..3], ":");

    let history = app.history().await;
    let messages = history[&chat_id].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["text"], "Hi");
    assert_eq!(messages[0]["isUser"], true);
    assert_eq!(messages[1]["text"], "Hello there");
    assert_eq!(messages[1]["isUser"], false);
    assert_eq!(messages[1]["timestamp"], timestamp);
    assert!(messages[0].get("file").is_none());
}

#[tokio::test]
async fn gemini_session_carries_earlier_turns() {
    let app = TestApp::spawn().await;
    app.mount_gemini_reply("noted").await;
    let chat_id = app.new_chat().await;

    app.post_chat(&json!({ "message": "My name is Ada", "chatId": chat_id }))
        .await;
    app.post_chat(&json!({ "message": "What is my name?", "chatId": chat_id }))
        .await;

    let requests = app.gemini.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let second: Value = serde_json::from_slice(&requests[1].body).unwrap();
    let contents = second["contents"].as_array().unwrap();
    assert_eq!(contents.len(), 3);
    assert_eq!(contents[0]["parts"][0]["text"], "My name is Ada");
    assert_eq!(contents[2]["parts"][0]["text"], "What is my name?");
}

#[tokio::test]
async fn azure_model_uses_stateless_endpoint() {
    let app = TestApp::spawn().await;
    app.mount_azure_body(json!({ "chat_output": "from azure" }))
        .await;

    let response = app
        .post_chat(&json!({ "message": "Hi", "chatId": "c1", "model": "azure" }))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["response"], "from azure");
    assert!(app.gemini.received_requests().await.unwrap().is_empty());

    let requests = app.azure.received_requests().await.unwrap();
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent, json!({ "chat_input": "Hi" }));
}

#[tokio::test]
async fn azure_unknown_shape_is_returned_as_json_text() {
    let app = TestApp::spawn().await;
    app.mount_azure_body(json!({ "answer": "42" })).await;

    let response = app
        .post_chat(&json!({ "message": "Hi", "chatId": "c1", "model": "azure" }))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["response"], r#"{"answer":"42"}"#);
}

#[tokio::test]
async fn provider_failure_is_500_and_records_nothing() {
    let app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path(AZURE_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&app.azure)
        .await;
    let chat_id = app.new_chat().await;

    let response = app
        .post_chat(&json!({ "message": "Hi", "chatId": chat_id, "model": "azure" }))
        .await;

    assert_eq!(response.status().as_u16(), 500);
    let body: Value = response.json().await.unwrap();
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("503"));
    assert!(error.contains("overloaded"));

    let history = app.history().await;
    assert_eq!(history[&chat_id], json!([]));
}

#[tokio::test]
async fn gemini_error_status_is_500() {
    let app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
        .mount(&app.gemini)
        .await;

    let response = app
        .post_chat(&json!({ "message": "Hi", "chatId": "c1" }))
        .await;

    assert_eq!(response.status().as_u16(), 500);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("quota exceeded"));
    assert!(app.history().await.get("c1").is_none());
}

#[tokio::test]
async fn chat_to_unknown_id_creates_the_conversation() {
    let app = TestApp::spawn().await;
    app.mount_gemini_reply("hi").await;

    app.post_chat(&json!({ "message": "Hello", "chatId": "fresh" }))
        .await;

    let history = app.history().await;
    assert_eq!(history["fresh"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn missing_chat_id_is_bad_request() {
    let app = TestApp::spawn().await;

    let response = app.post_chat(&json!({ "message": "Hi" })).await;

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
    assert!(app.gemini.received_requests().await.unwrap().is_empty());
}
