//! In-process implementation of the store traits.
//!
//! Used for development (`database.provider = "memory"`) and by tests
//! across the workspace. All state sits behind one lock, so every
//! operation is atomic. Deleting a room removes its memberships, messages,
//! and read marks explicitly.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use sparkup_core::error::AppError;
use sparkup_core::result::AppResult;
use sparkup_core::types::{MessageId, PageRequest, PageResponse, PostId, UserId};
use sparkup_entity::membership::{MemberProfile, ParticipationLevel, RoomMember, RoomMembership};
use sparkup_entity::message::{ChatMessage, NewMessage};
use sparkup_entity::room::{ChatRoom, LatestMessage, RoomOverview};

use crate::store::{MembershipStore, MessageStore, RoomStore};

#[derive(Debug, Clone)]
struct UserRecord {
    nickname: Option<String>,
    rating: f64,
}

#[derive(Debug, Clone)]
struct RoomRecord {
    room: ChatRoom,
    owner_id: UserId,
}

#[derive(Debug, Clone)]
struct MessageRecord {
    post_id: PostId,
    sender_id: UserId,
    content: String,
    created_at: DateTime<Utc>,
    read_users: BTreeSet<UserId>,
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, UserRecord>,
    rooms: HashMap<PostId, RoomRecord>,
    members: BTreeMap<(PostId, UserId), DateTime<Utc>>,
    messages: BTreeMap<MessageId, MessageRecord>,
    last_message_id: i64,
}

impl State {
    fn display_name(&self, user_id: UserId) -> String {
        let nickname = self.users.get(&user_id).and_then(|u| u.nickname.clone());
        RoomMember::new(user_id, nickname).display_name
    }

    fn room_member_ids(&self, post_id: PostId) -> impl Iterator<Item = (UserId, DateTime<Utc>)> + '_ {
        self.members
            .range((post_id, UserId(i64::MIN))..=(post_id, UserId(i64::MAX)))
            .map(|((_, user_id), joined_at)| (*user_id, *joined_at))
    }

    fn to_message(&self, id: MessageId, record: &MessageRecord) -> ChatMessage {
        ChatMessage {
            id,
            post_id: record.post_id,
            sender_id: record.sender_id,
            sender_name: self.display_name(record.sender_id),
            content: record.content.clone(),
            created_at: record.created_at,
            read_users: record.read_users.clone(),
        }
    }

    fn unread_in(&self, post_id: PostId, user_id: UserId) -> u64 {
        self.messages
            .values()
            .filter(|m| m.post_id == post_id && !m.read_users.contains(&user_id))
            .count() as u64
    }

    fn room_exists(&self, post_id: PostId) -> AppResult<()> {
        if self.rooms.contains_key(&post_id) {
            Ok(())
        } else {
            Err(AppError::not_found(format!("Chat room {post_id} not found")))
        }
    }

    fn user_exists(&self, user_id: UserId) -> AppResult<()> {
        if self.users.contains_key(&user_id) {
            Ok(())
        } else {
            Err(AppError::not_found(format!("User {user_id} not found")))
        }
    }
}

/// In-memory chat store.
#[derive(Debug, Default)]
pub struct MemoryChatStore {
    state: RwLock<State>,
    fail_writes: AtomicBool,
    member_queries: AtomicU64,
}

impl MemoryChatStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user account, optionally with a profile nickname.
    pub async fn add_user(&self, user_id: UserId, nickname: Option<&str>) {
        let mut state = self.state.write().await;
        state.users.insert(
            user_id,
            UserRecord {
                nickname: nickname.map(str::to_string),
                rating: 0.0,
            },
        );
    }

    /// Set a user's average rating.
    pub async fn set_rating(&self, user_id: UserId, rating: f64) {
        if let Some(user) = self.state.write().await.users.get_mut(&user_id) {
            user.rating = rating;
        }
    }

    /// Make every subsequent write fail with a database error until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of `room_members` queries served so far.
    pub fn member_queries(&self) -> u64 {
        self.member_queries.load(Ordering::SeqCst)
    }

    /// Number of stored messages in a room.
    pub async fn message_count(&self, post_id: PostId) -> usize {
        self.state
            .read()
            .await
            .messages
            .values()
            .filter(|m| m.post_id == post_id)
            .count()
    }

    fn check_writable(&self, operation: &str) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::database(format!(
                "{operation} failed: store unavailable"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RoomStore for MemoryChatStore {
    async fn create_room(
        &self,
        post_id: PostId,
        name: &str,
        owner_id: UserId,
    ) -> AppResult<ChatRoom> {
        self.check_writable("Create room")?;
        let mut state = self.state.write().await;
        state.user_exists(owner_id)?;
        if state.rooms.contains_key(&post_id) {
            return Err(AppError::conflict(format!(
                "Chat room for post {post_id} already exists"
            )));
        }

        let now = Utc::now();
        let room = ChatRoom {
            post_id,
            name: name.to_string(),
            created_at: now,
        };
        state.rooms.insert(
            post_id,
            RoomRecord {
                room: room.clone(),
                owner_id,
            },
        );
        state.members.insert((post_id, owner_id), now);
        debug!(post_id = %post_id, owner_id = %owner_id, "Created chat room");
        Ok(room)
    }

    async fn find_room(&self, post_id: PostId) -> AppResult<Option<ChatRoom>> {
        Ok(self
            .state
            .read()
            .await
            .rooms
            .get(&post_id)
            .map(|r| r.room.clone()))
    }

    async fn rename_room(&self, post_id: PostId, name: &str) -> AppResult<ChatRoom> {
        self.check_writable("Rename room")?;
        let mut state = self.state.write().await;
        let record = state
            .rooms
            .get_mut(&post_id)
            .ok_or_else(|| AppError::not_found(format!("Chat room {post_id} not found")))?;
        record.room.name = name.to_string();
        Ok(record.room.clone())
    }

    async fn delete_room(&self, post_id: PostId) -> AppResult<bool> {
        self.check_writable("Delete room")?;
        let mut state = self.state.write().await;
        if state.rooms.remove(&post_id).is_none() {
            return Ok(false);
        }
        state.members.retain(|(room, _), _| *room != post_id);
        state.messages.retain(|_, m| m.post_id != post_id);
        debug!(post_id = %post_id, "Deleted chat room with dependents");
        Ok(true)
    }

    async fn add_member(&self, post_id: PostId, user_id: UserId) -> AppResult<RoomMembership> {
        self.check_writable("Add member")?;
        let mut state = self.state.write().await;
        state.room_exists(post_id)?;
        state.user_exists(user_id)?;
        let joined_at = *state
            .members
            .entry((post_id, user_id))
            .or_insert_with(Utc::now);
        Ok(RoomMembership {
            post_id,
            user_id,
            joined_at,
        })
    }

    async fn remove_member(&self, post_id: PostId, user_id: UserId) -> AppResult<bool> {
        self.check_writable("Remove member")?;
        let mut state = self.state.write().await;
        Ok(state.members.remove(&(post_id, user_id)).is_some())
    }

    async fn rooms_for_user(
        &self,
        user_id: UserId,
        page: &PageRequest,
    ) -> AppResult<PageResponse<RoomOverview>> {
        let state = self.state.read().await;

        let mut overviews: Vec<RoomOverview> = state
            .members
            .keys()
            .filter(|(_, member)| *member == user_id)
            .filter_map(|(post_id, _)| state.rooms.get(post_id))
            .map(|record| {
                let post_id = record.room.post_id;
                let latest_message = state
                    .messages
                    .iter()
                    .rev()
                    .find(|(_, m)| m.post_id == post_id)
                    .map(|(id, m)| LatestMessage {
                        id: *id,
                        sender_id: m.sender_id,
                        sender_name: state.display_name(m.sender_id),
                        content: m.content.clone(),
                        created_at: m.created_at,
                    });
                let last_activity = latest_message
                    .as_ref()
                    .map(|m| m.created_at)
                    .or(Some(record.room.created_at));
                RoomOverview {
                    post_id,
                    name: record.room.name.clone(),
                    unread_count: state.unread_in(post_id, user_id),
                    latest_message,
                    last_activity,
                }
            })
            .collect();

        overviews.sort_by(|a, b| {
            b.last_activity
                .cmp(&a.last_activity)
                .then(b.post_id.cmp(&a.post_id))
        });

        let total = overviews.len() as u64;
        let items = overviews
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(page.limit()).unwrap_or(usize::MAX))
            .collect();
        Ok(PageResponse::new(items, page, total))
    }
}

#[async_trait]
impl MembershipStore for MemoryChatStore {
    async fn user_exists(&self, user_id: UserId) -> AppResult<bool> {
        Ok(self.state.read().await.users.contains_key(&user_id))
    }

    async fn room_members(&self, post_id: PostId) -> AppResult<Vec<RoomMember>> {
        self.member_queries.fetch_add(1, Ordering::SeqCst);
        let state = self.state.read().await;
        Ok(state
            .room_member_ids(post_id)
            .map(|(user_id, _)| RoomMember {
                user_id,
                display_name: state.display_name(user_id),
            })
            .collect())
    }

    async fn is_member(&self, post_id: PostId, user_id: UserId) -> AppResult<bool> {
        Ok(self
            .state
            .read()
            .await
            .members
            .contains_key(&(post_id, user_id)))
    }

    async fn member_profiles(&self, post_id: PostId) -> AppResult<Vec<MemberProfile>> {
        let state = self.state.read().await;
        let owner_id = state.rooms.get(&post_id).map(|r| r.owner_id);

        let mut members: Vec<MemberProfile> = state
            .room_member_ids(post_id)
            .map(|(user_id, joined_at)| {
                let participations = state
                    .members
                    .keys()
                    .filter(|(room, member)| *member == user_id && *room != post_id)
                    .count() as u64;
                MemberProfile {
                    user_id,
                    display_name: state.display_name(user_id),
                    rating: state.users.get(&user_id).map(|u| u.rating).unwrap_or(0.0),
                    joined_at,
                    is_host: owner_id == Some(user_id),
                    participations,
                    level: ParticipationLevel::from_participations(participations),
                }
            })
            .collect();
        MemberProfile::sort_for_listing(&mut members);
        Ok(members)
    }
}

#[async_trait]
impl MessageStore for MemoryChatStore {
    async fn insert_message(&self, message: NewMessage) -> AppResult<ChatMessage> {
        self.check_writable("Insert message")?;
        let mut state = self.state.write().await;
        state.room_exists(message.post_id)?;
        state.user_exists(message.sender_id)?;

        state.last_message_id += 1;
        let id = MessageId(state.last_message_id);
        let record = MessageRecord {
            post_id: message.post_id,
            sender_id: message.sender_id,
            content: message.content,
            created_at: Utc::now(),
            read_users: BTreeSet::from([message.sender_id]),
        };
        let stored = state.to_message(id, &record);
        state.messages.insert(id, record);
        Ok(stored)
    }

    async fn message_page(
        &self,
        post_id: PostId,
        before_id: Option<MessageId>,
        fetch_limit: u32,
    ) -> AppResult<Vec<ChatMessage>> {
        let state = self.state.read().await;
        let upper = before_id.unwrap_or(MessageId(i64::MAX));
        Ok(state
            .messages
            .range(..upper)
            .rev()
            .filter(|(_, m)| m.post_id == post_id)
            .take(fetch_limit as usize)
            .map(|(id, m)| state.to_message(*id, m))
            .collect())
    }

    async fn mark_read(&self, user_id: UserId, ids: &[MessageId]) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        self.check_writable("Mark read")?;
        let mut state = self.state.write().await;
        if let Some(missing) = ids.iter().find(|id| !state.messages.contains_key(*id)) {
            return Err(AppError::not_found(format!("Message {missing} not found")));
        }

        let mut grown = 0;
        for id in ids {
            if let Some(record) = state.messages.get_mut(id) {
                if record.read_users.insert(user_id) {
                    grown += 1;
                }
            }
        }
        Ok(grown)
    }

    async fn count_unread(&self, post_id: PostId, user_id: UserId) -> AppResult<u64> {
        Ok(self.state.read().await.unread_in(post_id, user_id))
    }
}
