//! PostgreSQL implementations of the store traits.

pub mod membership;
pub mod message;
pub mod room;

pub use membership::MembershipRepository;
pub use message::MessageRepository;
pub use room::RoomRepository;

use sparkup_core::error::{AppError, ErrorKind};

/// Map a failed write, turning constraint violations into caller errors.
pub(crate) fn write_error(e: sqlx::Error, context: String) -> AppError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            return AppError::conflict(format!("{context}: already exists"));
        }
        if db.is_foreign_key_violation() {
            return AppError::not_found(format!("{context}: referenced record does not exist"));
        }
    }
    AppError::with_source(ErrorKind::Database, context, e)
}
