//! Integration tests for WebSocket connection and messaging.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use http::StatusCode;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::helpers::{GUEST, HOST, OUTSIDER, ROOM, TestApp};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(addr: std::net::SocketAddr, query: &str) -> Client {
    let (ws, _) = connect_async(format!("ws://{addr}/ws?{query}"))
        .await
        .expect("WebSocket connect failed");
    ws
}

async fn send(ws: &mut Client, frame: Value) {
    ws.send(Message::text(frame.to_string()))
        .await
        .expect("Failed to send frame");
}

/// Next text frame as JSON.
async fn next_json(ws: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("Timed out waiting for a frame")
            .expect("Stream ended")
            .expect("WebSocket error");
        if msg.is_text() {
            return serde_json::from_str(msg.to_text().unwrap()).unwrap();
        }
    }
}

/// True once the server has closed the socket.
async fn wait_closed(ws: &mut Client) -> bool {
    loop {
        match tokio::time::timeout(Duration::from_secs(5), ws.next()).await {
            Err(_) => return false,
            Ok(None) | Ok(Some(Err(_))) | Ok(Some(Ok(Message::Close(_)))) => return true,
            Ok(Some(Ok(_))) => {}
        }
    }
}

#[tokio::test]
async fn test_ws_upgrade_without_user_id() {
    let app = TestApp::new().await;

    let response = app.request("GET", "/ws", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let addr = app.spawn().await;
    let err = connect_async(format!("ws://{addr}/ws?user_id=abc"))
        .await
        .unwrap_err();
    assert!(
        matches!(&err, WsError::Http(resp) if resp.status() == StatusCode::BAD_REQUEST),
        "Expected HTTP 400, got {err:?}"
    );
}

#[tokio::test]
async fn test_message_reaches_every_online_member() {
    let app = TestApp::new().await;
    let addr = app.spawn().await;

    let mut host = connect(addr, &format!("user_id={HOST}")).await;
    let mut guest = connect(addr, &format!("user_id={GUEST}")).await;
    let mut outsider = connect(addr, &format!("user_id={OUTSIDER}")).await;
    app.wait_for_connections(3).await;

    send(
        &mut host,
        json!({ "type": "send_message", "post_id": ROOM, "sender_id": HOST, "content": "hi" }),
    )
    .await;

    for ws in [&mut host, &mut guest] {
        let frame = next_json(ws).await;
        assert_eq!(frame["type"], "new_message");
        assert_eq!(frame["post_id"], 42);
        assert_eq!(frame["sender_id"], json!(HOST));
        assert_eq!(frame["sender_name"], "ana");
        assert_eq!(frame["content"], "hi");
    }

    let nothing = tokio::time::timeout(Duration::from_millis(200), outsider.next()).await;
    assert!(nothing.is_err(), "Non-member received a frame");

    let history = app
        .request(
            "POST",
            "/api/chat/messages",
            Some(json!({ "post_id": ROOM, "user_id": GUEST })),
        )
        .await;
    let messages = history.body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    let read_users = messages[0]["read_users"].as_array().unwrap();
    assert!(read_users.contains(&json!(HOST)));
    assert!(read_users.contains(&json!(GUEST)));
}

#[tokio::test]
async fn test_non_member_send_is_rejected() {
    let app = TestApp::new().await;
    let addr = app.spawn().await;

    let mut outsider = connect(addr, &format!("user_id={OUTSIDER}")).await;
    let mut host = connect(addr, &format!("user_id={HOST}")).await;
    app.wait_for_connections(2).await;

    send(
        &mut outsider,
        json!({ "type": "send_message", "post_id": ROOM, "sender_id": OUTSIDER, "content": "let me in" }),
    )
    .await;

    let frame = next_json(&mut outsider).await;
    assert_eq!(frame["type"], "error");
    assert_eq!(
        frame["message"],
        "Not authorized to send messages in this chat room"
    );
    assert_eq!(app.store.message_count(ROOM).await, 0);

    let nothing = tokio::time::timeout(Duration::from_millis(200), host.next()).await;
    assert!(nothing.is_err(), "Member received a rejected message");
}

#[tokio::test]
async fn test_bad_frames_get_error_replies() {
    let app = TestApp::new().await;
    let addr = app.spawn().await;

    let mut host = connect(addr, &format!("user_id={HOST}")).await;
    app.wait_for_connections(1).await;

    host.send(Message::text("not json")).await.unwrap();
    let frame = next_json(&mut host).await;
    assert_eq!(frame["message"], "Failed to process message");

    send(&mut host, json!({ "type": "send_message", "post_id": ROOM })).await;
    let frame = next_json(&mut host).await;
    assert_eq!(frame["message"], "Missing required fields");

    assert_eq!(app.store.message_count(ROOM).await, 0);
}

#[tokio::test]
async fn test_reconnect_from_same_device_replaces_connection() {
    let app = TestApp::new().await;
    let addr = app.spawn().await;

    let mut first = connect(addr, &format!("user_id={GUEST}&device=phone")).await;
    app.wait_for_connections(1).await;

    let mut second = connect(addr, &format!("user_id={GUEST}&device=phone")).await;
    assert!(wait_closed(&mut first).await, "Stale connection stayed open");
    app.wait_for_connections(1).await;

    send(
        &mut second,
        json!({ "type": "send_message", "post_id": ROOM, "sender_id": GUEST, "content": "back" }),
    )
    .await;
    let frame = next_json(&mut second).await;
    assert_eq!(frame["content"], "back");
    assert_eq!(app.engine.stats().metrics.connections_replaced, 1);
}
