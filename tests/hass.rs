//! Integration tests for the Home Assistant WebSocket connection.
//!
//! A local tokio-tungstenite server plays the Home Assistant side of the
//! auth handshake and answers commands by id.

use std::future::Future;
use std::time::Duration;

use calorie_panel::{ClientError, HassConnection, WsConnection};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{WebSocketStream, accept_async, tungstenite::Message};

type Server = WebSocketStream<TcpStream>;

const TOKEN: &str = "long-lived-token";

/// Accept exactly one connection and hand it to `handler`.
async fn serve<F, Fut>(handler: F) -> String
where
    F: FnOnce(Server) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = accept_async(stream).await.unwrap();
        handler(ws).await;
    });
    format!("http://{}", addr)
}

async fn send(ws: &mut Server, value: Value) {
    ws.send(Message::text(value.to_string())).await.unwrap();
}

async fn recv(ws: &mut Server) -> Option<Value> {
    while let Some(frame) = ws.next().await {
        match frame {
            Ok(Message::Text(text)) => return Some(serde_json::from_str(&text).unwrap()),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
    None
}

/// Run the server half of the auth handshake.
async fn handshake(ws: &mut Server) {
    send(ws, json!({"type": "auth_required", "ha_version": "2024.6.0"})).await;
    let auth = recv(ws).await.unwrap();
    assert_eq!(auth["type"], "auth");
    if auth["access_token"] == TOKEN {
        send(ws, json!({"type": "auth_ok", "ha_version": "2024.6.0"})).await;
    } else {
        send(ws, json!({"type": "auth_invalid", "message": "Invalid access token"})).await;
    }
}

fn reply(id: &Value, result: Value) -> Value {
    json!({"id": id, "type": "result", "success": true, "result": result})
}

async fn connect(url: &str, timeout: Duration) -> Result<WsConnection, ClientError> {
    WsConnection::connect(url, TOKEN, timeout).await
}

// ==================== Handshake Tests ====================

#[tokio::test]
async fn test_handshake_then_call() {
    let url = serve(|mut ws| async move {
        handshake(&mut ws).await;
        while let Some(command) = recv(&mut ws).await {
            let echo = json!({"echo": command["type"], "entity_id": command["entity_id"]});
            send(&mut ws, reply(&command["id"], echo)).await;
        }
    })
    .await;

    let connection = connect(&url, Duration::from_secs(5)).await.unwrap();
    let result = connection
        .call(json!({"type": "calorie_tracker/get_daily_data", "entity_id": "sensor.me"}))
        .await
        .unwrap();

    assert_eq!(result["echo"], "calorie_tracker/get_daily_data");
    assert_eq!(result["entity_id"], "sensor.me");
}

#[tokio::test]
async fn test_invalid_token_is_unauthorized() {
    let url = serve(|mut ws| async move {
        handshake(&mut ws).await;
    })
    .await;

    let result = WsConnection::connect(&url, "wrong", Duration::from_secs(5)).await;

    assert!(matches!(result, Err(ClientError::Unauthorized)));
}

#[tokio::test]
async fn test_unexpected_greeting_is_rejected() {
    let url = serve(|mut ws| async move {
        send(&mut ws, json!({"type": "hello"})).await;
    })
    .await;

    let result = connect(&url, Duration::from_secs(5)).await;

    assert!(matches!(result, Err(ClientError::Decode(_))));
}

// ==================== Routing Tests ====================

/// Replies arriving out of order still reach the right caller.
#[tokio::test]
async fn test_replies_routed_by_id() {
    let url = serve(|mut ws| async move {
        handshake(&mut ws).await;
        let first = recv(&mut ws).await.unwrap();
        let second = recv(&mut ws).await.unwrap();
        assert_ne!(first["id"], second["id"]);
        send(&mut ws, reply(&second["id"], json!({"type": second["type"]}))).await;
        send(&mut ws, reply(&first["id"], json!({"type": first["type"]}))).await;
        // Keep the socket open until the client hangs up
        while recv(&mut ws).await.is_some() {}
    })
    .await;

    let connection = connect(&url, Duration::from_secs(5)).await.unwrap();
    let (a, b) = tokio::join!(
        connection.call(json!({"type": "calorie_tracker/get_weekly_summary"})),
        connection.call(json!({"type": "calorie_tracker/get_logged_dates"})),
    );

    assert_eq!(a.unwrap()["type"], "calorie_tracker/get_weekly_summary");
    assert_eq!(b.unwrap()["type"], "calorie_tracker/get_logged_dates");
}

#[tokio::test]
async fn test_error_result_becomes_rpc_error() {
    let url = serve(|mut ws| async move {
        handshake(&mut ws).await;
        if let Some(command) = recv(&mut ws).await {
            send(
                &mut ws,
                json!({
                    "id": command["id"],
                    "type": "result",
                    "success": false,
                    "error": {"code": "not_found", "message": "Entry not found"}
                }),
            )
            .await;
        }
        while recv(&mut ws).await.is_some() {}
    })
    .await;

    let connection = connect(&url, Duration::from_secs(5)).await.unwrap();
    let result = connection
        .call(json!({"type": "calorie_tracker/delete_food_entry", "entry_id": "x"}))
        .await;

    match result {
        Err(ClientError::Rpc { code, message }) => {
            assert_eq!(code, "not_found");
            assert_eq!(message, "Entry not found");
        }
        other => panic!("Expected RPC error, got {:?}", other),
    }
}

// ==================== Failure Tests ====================

#[tokio::test]
async fn test_disconnect_fails_pending_calls() {
    let url = serve(|mut ws| async move {
        handshake(&mut ws).await;
        let _ = recv(&mut ws).await;
        let _ = ws.close(None).await;
    })
    .await;

    let connection = connect(&url, Duration::from_secs(5)).await.unwrap();
    let result = connection
        .call(json!({"type": "calorie_tracker/get_user_profile"}))
        .await;

    assert!(matches!(result, Err(ClientError::Network(_))));
}

#[tokio::test]
async fn test_unanswered_call_times_out() {
    let url = serve(|mut ws| async move {
        handshake(&mut ws).await;
        while recv(&mut ws).await.is_some() {}
    })
    .await;

    let connection = connect(&url, Duration::from_millis(200)).await.unwrap();
    let result = connection
        .call(json!({"type": "calorie_tracker/get_user_profile"}))
        .await;

    match result {
        Err(ClientError::Network(message)) => assert!(message.contains("timed out")),
        other => panic!("Expected timeout, got {:?}", other),
    }
}

/// Calls after the server hung up fail at once instead of waiting out the timeout.
#[tokio::test]
async fn test_call_after_disconnect_fails_fast() {
    let url = serve(|mut ws| async move {
        handshake(&mut ws).await;
        let _ = ws.close(None).await;
    })
    .await;

    let connection = connect(&url, Duration::from_secs(30)).await.unwrap();
    for _ in 0..100 {
        if connection.is_closed() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(connection.is_closed());

    let result = tokio::time::timeout(
        Duration::from_secs(1),
        connection.call(json!({"type": "calorie_tracker/get_user_profile"})),
    )
    .await
    .expect("Call should not wait for the request timeout");

    match result {
        Err(ClientError::Network(message)) => assert_eq!(message, "connection closed"),
        other => panic!("Expected closed connection, got {:?}", other),
    }
}
