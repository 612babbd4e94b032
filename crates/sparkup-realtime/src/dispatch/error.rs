//! Send failures and the text the sender sees for each.

use thiserror::Error;

use sparkup_core::error::AppError;

/// Why a `send_message` frame was rejected.
///
/// The `Display` text is exactly what goes back to the sender in the
/// `error` frame; the wrapped [`AppError`] is only logged.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// `post_id`, `sender_id`, or `content` was absent or empty.
    #[error("Missing required fields")]
    MissingFields,
    /// The sender is not in the room's membership snapshot.
    #[error("Not authorized to send messages in this chat room")]
    NotAuthorized,
    /// The store rejected the insert; nothing was persisted or delivered.
    #[error("Failed to save message")]
    PersistFailed(#[source] AppError),
    /// Membership could not be loaded.
    #[error("Failed to process message")]
    MembershipUnavailable(#[source] AppError),
    /// The frame was not valid JSON or had an unknown type.
    #[error("Failed to process message")]
    Malformed(#[source] AppError),
}
