//! Nickname store contract and in-process adapter

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};

use crate::domain::{classify_exact, normalize};

/// Lookup key (see [`normalize`]) to user-chosen nickname
pub type NicknameMap = BTreeMap<String, String>;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Whole-map change notification, fired after a successful `set`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapChange {
    pub old: NicknameMap,
    pub new: NicknameMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NicknameError {
    #[error("nickname cannot be empty")]
    EmptyNickname,
    #[error("not a recognized address: {0}")]
    InvalidAddress(String),
}

/// Persistent key/nickname mapping shared by every page and the manager.
///
/// `set` replaces the whole map, so writers must read, merge and write.
/// There is no compare-and-swap: two concurrent writers race and the last
/// write wins.
#[async_trait]
pub trait NicknameStore: Send + Sync {
    async fn get(&self) -> Result<NicknameMap>;

    async fn set(&self, map: NicknameMap) -> Result<()>;

    fn subscribe(&self) -> broadcast::Receiver<MapChange>;
}

/// Add or replace one nickname, keeping every other entry.
///
/// Returns the lookup key the nickname was stored under.
pub async fn upsert_nickname(
    store: &dyn NicknameStore,
    address: &str,
    nickname: &str,
) -> Result<String> {
    let address = address.trim();
    let nickname = nickname.trim();
    if classify_exact(address).is_none() {
        bail!(NicknameError::InvalidAddress(address.to_string()));
    }
    if nickname.is_empty() {
        bail!(NicknameError::EmptyNickname);
    }

    let key = normalize(address);
    let mut map = store.get().await?;
    map.insert(key.clone(), nickname.to_string());
    store.set(map).await?;
    Ok(key)
}

/// Remove one entry. Returns whether anything was removed.
pub async fn remove_nickname(store: &dyn NicknameStore, key: &str) -> Result<bool> {
    let key = key.trim();
    let mut map = store.get().await?;
    let removed = map.remove(key).is_some() || map.remove(&normalize(key)).is_some();
    if removed {
        store.set(map).await?;
    }
    Ok(removed)
}

// === Memory adapter ===

#[derive(Debug)]
struct MemoryInner {
    map: RwLock<NicknameMap>,
    changes: broadcast::Sender<MapChange>,
    unavailable: AtomicBool,
}

/// Shared in-process store. Clones are handles to the same map, which is
/// how several open pages observe each other's writes.
#[derive(Debug, Clone)]
pub struct MemoryNicknameStore {
    inner: Arc<MemoryInner>,
}

impl Default for MemoryNicknameStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryNicknameStore {
    pub fn new() -> Self {
        Self::with_map(NicknameMap::new())
    }

    pub fn with_map(map: NicknameMap) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(MemoryInner {
                map: RwLock::new(map),
                changes,
                unavailable: AtomicBool::new(false),
            }),
        }
    }

    /// Simulate storage being unreachable (reads and writes fail).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            bail!("nickname storage is unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl NicknameStore for MemoryNicknameStore {
    async fn get(&self) -> Result<NicknameMap> {
        self.check_available()?;
        Ok(self.inner.map.read().await.clone())
    }

    async fn set(&self, map: NicknameMap) -> Result<()> {
        self.check_available()?;
        let old = {
            let mut current = self.inner.map.write().await;
            std::mem::replace(&mut *current, map.clone())
        };
        // No subscribers is not an error.
        let _ = self.inner.changes.send(MapChange { old, new: map });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<MapChange> {
        self.inner.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVM_MIXED: &str = "0xABCDEF0123456789abcdef0123456789ABCDEF01";
    const EVM_LOWER: &str = "0xabcdef0123456789abcdef0123456789abcdef01";
    const BTC_GENESIS: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

    #[tokio::test]
    async fn test_upsert_merges_and_normalizes() {
        let store = MemoryNicknameStore::new();
        upsert_nickname(&store, BTC_GENESIS, "Genesis").await.unwrap();
        let key = upsert_nickname(&store, EVM_MIXED, "  Alice ").await.unwrap();
        assert_eq!(key, EVM_LOWER);

        let map = store.get().await.unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(EVM_LOWER).map(String::as_str), Some("Alice"));
        assert_eq!(map.get(BTC_GENESIS).map(String::as_str), Some("Genesis"));
    }

    #[tokio::test]
    async fn test_upsert_rejects_bad_input() {
        let store = MemoryNicknameStore::new();
        let err = upsert_nickname(&store, EVM_LOWER, "   ").await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<NicknameError>(),
            Some(&NicknameError::EmptyNickname)
        );
        let err = upsert_nickname(&store, "0x123", "Short").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<NicknameError>(),
            Some(NicknameError::InvalidAddress(_))
        ));
        assert!(store.get().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_notifies_every_handle() {
        let store = MemoryNicknameStore::new();
        let other_tab = store.clone();
        let mut rx = other_tab.subscribe();

        upsert_nickname(&store, EVM_LOWER, "Alice").await.unwrap();
        let change = rx.recv().await.unwrap();
        assert!(change.old.is_empty());
        assert_eq!(change.new.get(EVM_LOWER).map(String::as_str), Some("Alice"));
    }

    #[tokio::test]
    async fn test_remove_nickname() {
        let store = MemoryNicknameStore::new();
        upsert_nickname(&store, EVM_LOWER, "Alice").await.unwrap();
        assert!(remove_nickname(&store, EVM_MIXED).await.unwrap());
        assert!(!remove_nickname(&store, EVM_LOWER).await.unwrap());
        assert!(store.get().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_store_errors() {
        let store = MemoryNicknameStore::new();
        store.set_unavailable(true);
        assert!(store.get().await.is_err());
        assert!(store.set(NicknameMap::new()).await.is_err());
    }
}
