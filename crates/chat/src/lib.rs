//! Durable chat: message model, storage, and the HTTP façade services.
//!
//! This crate owns the authoritative send path (persist first, then fan out)
//! and the history/active-user/delete operations. Realtime delivery is
//! injected through [`fanout::RoomFanout`]; the gateway implements it.

pub mod directory;
pub mod error;
pub mod fanout;
pub mod model;
pub mod service;
pub mod store;

pub use {
    directory::{InMemoryUserDirectory, UserDirectory, UserProfile},
    error::ChatError,
    fanout::RoomFanout,
    model::{ActiveUser, Message, MessagePage, Pagination},
    service::ChatService,
    store::{MessageStore, SqliteMessageStore},
};
