//! Integration tests for the chat REST endpoints.

use http::StatusCode;
use serde_json::json;

use crate::helpers::{GUEST, HOST, OUTSIDER, ROOM, TestApp};

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;

    let response = app.request("GET", "/api/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["database"], "connected");
    assert_eq!(response.body["ws_connections"], 0);
    assert!(response.body["realtime"]["messages_dispatched"].is_u64());
}

#[tokio::test]
async fn test_history_requires_fields() {
    let app = TestApp::new().await;

    let response = app
        .request("POST", "/api/chat/messages", Some(json!({ "post_id": 42 })))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Missing required fields");
}

#[tokio::test]
async fn test_history_refuses_non_member() {
    let app = TestApp::new().await;
    app.seed_messages(3).await;

    let response = app
        .request(
            "POST",
            "/api/chat/messages",
            Some(json!({ "post_id": ROOM, "user_id": OUTSIDER })),
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["error"], "FORBIDDEN");
    assert_eq!(
        response.body["message"],
        "Not authorized to access this chat room"
    );
}

#[tokio::test]
async fn test_history_pages_through_150_messages() {
    let app = TestApp::new().await;
    app.seed_messages(150).await;

    let first = app
        .request(
            "POST",
            "/api/chat/messages",
            Some(json!({ "post_id": ROOM, "user_id": GUEST, "limit": 50 })),
        )
        .await;
    assert_eq!(first.status, StatusCode::OK);
    let messages = first.body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 50);
    assert_eq!(first.body["has_more"], true);
    assert_eq!(first.body["oldest_id"], messages[49]["id"]);
    assert_eq!(messages[0]["sender_name"], "ana");
    assert!(
        messages[0]["created_at"]
            .as_str()
            .unwrap()
            .ends_with('Z')
    );

    let mut ids: Vec<i64> = messages.iter().map(|m| m["id"].as_i64().unwrap()).collect();
    let mut before = first.body["oldest_id"].clone();
    loop {
        let page = app
            .request(
                "POST",
                "/api/chat/messages",
                Some(json!({ "post_id": ROOM, "user_id": GUEST, "before_id": before, "limit": 50 })),
            )
            .await;
        assert_eq!(page.status, StatusCode::OK);
        ids.extend(
            page.body["messages"]
                .as_array()
                .unwrap()
                .iter()
                .map(|m| m["id"].as_i64().unwrap()),
        );
        if page.body["has_more"] == false {
            break;
        }
        before = page.body["oldest_id"].clone();
    }

    let expected: Vec<i64> = (1..=150).rev().collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn test_initial_load_clears_unread() {
    let app = TestApp::new().await;
    app.seed_messages(5).await;

    let rooms = app
        .request("POST", &format!("/api/chat/rooms/{GUEST}"), Some(json!({})))
        .await;
    assert_eq!(rooms.status, StatusCode::OK);
    assert_eq!(rooms.body["rooms"][0]["unread_count"], 5);

    let history = app
        .request(
            "POST",
            "/api/chat/messages",
            Some(json!({ "post_id": ROOM, "user_id": GUEST })),
        )
        .await;
    assert_eq!(history.status, StatusCode::OK);
    let read_users = history.body["messages"][0]["read_users"].as_array().unwrap();
    assert!(read_users.contains(&json!(GUEST)));

    let rooms = app
        .request("POST", &format!("/api/chat/rooms/{GUEST}"), None)
        .await;
    assert_eq!(rooms.body["rooms"][0]["unread_count"], 0);
}

#[tokio::test]
async fn test_room_list() {
    let app = TestApp::new().await;
    app.seed_messages(2).await;

    let response = app
        .request(
            "POST",
            &format!("/api/chat/rooms/{HOST}"),
            Some(json!({ "page": 1, "per_page": 10 })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["page"], 1);
    assert_eq!(response.body["per_page"], 10);
    assert_eq!(response.body["pages"], 1);
    assert_eq!(response.body["total"], 1);
    let room = &response.body["rooms"][0];
    assert_eq!(room["post_id"], 42);
    assert_eq!(room["name"], "Sunday hike");
    assert_eq!(room["latest_message"]["content"], "message 1");
}

#[tokio::test]
async fn test_room_list_unknown_user() {
    let app = TestApp::new().await;

    let response = app
        .request("POST", "/api/chat/rooms/999", Some(json!({})))
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["message"], "User not found");
}

#[tokio::test]
async fn test_member_list() {
    let app = TestApp::new().await;

    let response = app
        .request("GET", &format!("/api/chat/rooms/{ROOM}/members"), None)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let members = response.body["members"].as_array().unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0]["user_id"], json!(HOST));
    assert_eq!(members[0]["is_host"], true);
    assert_eq!(members[1]["display_name"], "ben");
    assert_eq!(members[1]["level"], 1);

    let missing = app.request("GET", "/api/chat/rooms/7/members", None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}
