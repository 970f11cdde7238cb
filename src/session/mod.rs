//! Persistence for interview state between requests.

mod store;

pub use store::{new_session_key, FileSessionStore, MemorySessionStore, SessionStore};
