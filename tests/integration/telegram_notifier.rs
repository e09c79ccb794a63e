//! TelegramNotifier against a mocked Bot API

use rust_screener::models::TelegramConfig;
use rust_screener::notifier::{deliver, DeliveryStatus, Notifier, TelegramNotifier};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::api_mock::{mount_telegram, TEST_BOT_TOKEN, TEST_CHAT_ID};
use crate::common::fixtures::telegram_ok;
use crate::common::logging::{init_test_logging, log_test_step};

fn notifier(server: &MockServer) -> TelegramNotifier {
    let credentials = TelegramConfig {
        token: TEST_BOT_TOKEN.to_string(),
        chat_id: TEST_CHAT_ID.to_string(),
    };
    TelegramNotifier::new(&server.uri(), &credentials)
}

#[tokio::test]
async fn test_send_text_posts_chat_and_text() {
    init_test_logging();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/sendMessage", TEST_BOT_TOKEN)))
        .and(body_string_contains("chat_id=42"))
        .and(body_string_contains("text=hello"))
        .respond_with(ResponseTemplate::new(200).set_body_json(telegram_ok()))
        .expect(1)
        .mount(&server)
        .await;

    notifier(&server).send_text("hello").await.unwrap();
}

#[tokio::test]
async fn test_send_text_rejected_by_api() {
    init_test_logging();

    let server = MockServer::start().await;
    mount_telegram(
        &server,
        "sendMessage",
        200,
        json!({"ok": false, "error_code": 400, "description": "Bad Request: chat not found"}),
    )
    .await;

    let err = notifier(&server).send_text("hello").await.unwrap_err();

    assert!(err.to_string().contains("chat not found"));
}

#[tokio::test]
async fn test_send_text_http_error() {
    init_test_logging();

    let server = MockServer::start().await;
    mount_telegram(
        &server,
        "sendMessage",
        401,
        json!({"ok": false, "error_code": 401, "description": "Unauthorized"}),
    )
    .await;

    assert!(notifier(&server).send_text("hello").await.is_err());
}

#[tokio::test]
async fn test_send_document_is_multipart_upload() {
    init_test_logging();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/sendDocument", TEST_BOT_TOKEN)))
        .and(body_string_contains("name=\"document\""))
        .and(body_string_contains("filename=\"filtered_stocks_2025-08-29.xlsx\""))
        .and(body_string_contains("name=\"caption\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(telegram_ok()))
        .expect(1)
        .mount(&server)
        .await;

    notifier(&server)
        .send_document(
            b"PK fake workbook".to_vec(),
            "filtered_stocks_2025-08-29.xlsx",
            "filtered_stocks_2025-08-29.xlsx",
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_deliver_reports_partial_success() {
    init_test_logging();
    log_test_step("Message rejected, document accepted");

    let server = MockServer::start().await;
    mount_telegram(&server, "sendMessage", 500, json!({"ok": false, "description": "boom"})).await;
    mount_telegram(&server, "sendDocument", 200, telegram_ok()).await;

    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("filtered_stocks_2025-08-29.xlsx");
    std::fs::write(&report, b"PK").unwrap();

    let status = deliver(&notifier(&server), "summary", &report).await;

    assert_eq!(status, DeliveryStatus { text_sent: false, document_sent: true });
}
