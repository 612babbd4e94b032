//! Shared test helpers for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use sparkup_api::{AppState, build_app};
use sparkup_cache::MembershipCache;
use sparkup_core::config::{AppConfig, DatabaseProvider};
use sparkup_core::types::{PostId, UserId};
use sparkup_database::ChatStores;
use sparkup_database::memory::MemoryChatStore;
use sparkup_database::store::{MessageStore, RoomStore};
use sparkup_entity::message::NewMessage;
use sparkup_realtime::RealtimeEngine;

/// Room every fixture user except `OUTSIDER` belongs to.
pub const ROOM: PostId = PostId(42);
/// Owner of `ROOM`.
pub const HOST: UserId = UserId(1);
/// Second member of `ROOM`.
pub const GUEST: UserId = UserId(2);
/// Registered user who is not in `ROOM`.
pub const OUTSIDER: UserId = UserId(3);

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Store backing the app, for seeding and direct checks
    pub store: Arc<MemoryChatStore>,
    /// The engine behind `/ws`
    pub engine: Arc<RealtimeEngine>,
}

impl TestApp {
    /// Create an app on the in-memory store with room 42 seeded.
    pub async fn new() -> Self {
        let mut config = AppConfig::default();
        config.database.provider = DatabaseProvider::Memory;

        let store = Arc::new(MemoryChatStore::new());
        store.add_user(HOST, Some("ana")).await;
        store.add_user(GUEST, Some("ben")).await;
        store.add_user(OUTSIDER, Some("cai")).await;
        store
            .create_room(ROOM, "Sunday hike", HOST)
            .await
            .expect("Failed to create room");
        store
            .add_member(ROOM, GUEST)
            .await
            .expect("Failed to add member");

        let stores = ChatStores::from_memory(store.clone());
        let cache = MembershipCache::new(&config.cache.membership, stores.members.clone());
        let engine = RealtimeEngine::new(config.realtime.clone(), cache, stores.messages.clone());
        let state = AppState::new(config, stores, engine);
        let engine = state.realtime.clone();

        Self {
            router: build_app(state),
            store,
            engine,
        }
    }

    /// Insert `count` messages from the host into `ROOM`.
    pub async fn seed_messages(&self, count: usize) {
        for i in 0..count {
            self.store
                .insert_message(NewMessage {
                    post_id: ROOM,
                    sender_id: HOST,
                    content: format!("message {i}"),
                })
                .await
                .expect("Failed to seed message");
        }
    }

    /// Make an HTTP request to the test app
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    /// Serve the app on an ephemeral port and return its address.
    pub async fn spawn(&self) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("No local address");
        let router = self.router.clone();
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Test server failed");
        });
        addr
    }

    /// Wait until the engine holds `count` connections.
    pub async fn wait_for_connections(&self, count: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while self.engine.stats().connections != count {
            assert!(
                tokio::time::Instant::now() < deadline,
                "Expected {count} connections, have {}",
                self.engine.stats().connections
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}
