//! `send_message` handling.

pub mod dispatcher;
pub mod error;

pub use dispatcher::{DispatchReceipt, MessageDispatcher};
pub use error::DispatchError;
