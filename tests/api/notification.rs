use std::sync::{Arc, Mutex};

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use nexa_crawler::{
    configuration::Telegram,
    notification::{Notifier, TelegramNotifier},
};
use secrecy::SecretString;
use serde_json::{Value, json};

use crate::helper::spawn_server;

type Received = Arc<Mutex<Vec<Value>>>;

async fn send_message(State(received): State<Received>, Json(body): Json<Value>) -> Json<Value> {
    received.lock().unwrap().push(body);
    Json(json!({ "ok": true }))
}

async fn notifier(router: Router) -> TelegramNotifier {
    let base = spawn_server(router).await;

    TelegramNotifier::new(
        reqwest::Client::new(),
        Telegram {
            bot_token: SecretString::from("123:token".to_string()),
            chat_id: "-100200".to_string(),
            api_base: format!("{}/", base),
        },
    )
}

#[tokio::test]
async fn message_is_posted_to_the_chat() {
    let received = Received::default();
    let router = Router::new()
        .route("/bot123:token/sendMessage", post(send_message))
        .with_state(received.clone());
    let notifier = notifier(router).await;

    notifier.send_message("New manga saved: Solo Leveling").await;

    let received = received.lock().unwrap().clone();
    assert_eq!(
        received,
        vec![json!({
            "chat_id": "-100200",
            "text": "New manga saved: Solo Leveling",
            "parse_mode": "Markdown",
        })]
    );
}

#[tokio::test]
async fn rejected_message_does_not_interrupt_the_caller() {
    let router = Router::new().route(
        "/bot123:token/sendMessage",
        post(|| async { (StatusCode::BAD_REQUEST, "chat not found") }),
    );
    let notifier = notifier(router).await;

    notifier.send_message("Browser closed.").await;
}

#[tokio::test]
async fn unreachable_api_does_not_interrupt_the_caller() {
    let notifier = TelegramNotifier::new(
        reqwest::Client::new(),
        Telegram {
            bot_token: SecretString::from("123:token".to_string()),
            chat_id: "-100200".to_string(),
            api_base: "http://127.0.0.1:1".to_string(),
        },
    );

    notifier.send_message("Checking for updates...").await;
}
