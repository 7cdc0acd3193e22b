//! Session management
//!
//! This module provides the `Session` record and its message history, the
//! on-disk `SessionStorage`, and the shared `SessionStore` that every run
//! and control operation goes through.

pub mod message;
pub mod session;
pub mod storage;
pub mod store;

pub use message::{Message, MessageRole};
pub use session::Session;
pub use storage::SessionStorage;
pub use store::SessionStore;
