//! Nickname storage: the store contract, its adapters, and the page cache

mod cache;
mod labels;
mod nicknames;

pub use cache::NicknameCache;
pub use labels::SqliteNicknameStore;
pub use nicknames::{
    remove_nickname, upsert_nickname, MapChange, MemoryNicknameStore, NicknameError, NicknameMap,
    NicknameStore,
};
