//! Chat services.

pub mod history;
pub mod members;
pub mod rooms;

pub use history::{HistoryQuery, HistoryService, MessagePage};
pub use members::MemberService;
pub use rooms::RoomService;
