//! Page-wide snapshot of the nickname map

use std::sync::Arc;

use super::nicknames::NicknameMap;
use crate::domain::normalize;

/// Cached copy of the persisted map, read by every page feature.
///
/// Starts unloaded; each change notification swaps the whole snapshot, so a
/// reader never sees a half-applied update.
#[derive(Debug, Clone, Default)]
pub struct NicknameCache {
    snapshot: Option<Arc<NicknameMap>>,
}

impl NicknameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Swap in a new snapshot. Returns true when this is the first load.
    pub fn replace(&mut self, map: NicknameMap) -> bool {
        let first = self.snapshot.is_none();
        self.snapshot = Some(Arc::new(map));
        first
    }

    pub fn snapshot(&self) -> Arc<NicknameMap> {
        self.snapshot.clone().unwrap_or_default()
    }

    /// Nickname for a raw address as it appears on the page.
    pub fn lookup(&self, address: &str) -> Option<&str> {
        let map = self.snapshot.as_deref()?;
        map.get(&normalize(address))
            .map(String::as_str)
            .filter(|nickname| !nickname.is_empty())
    }

    pub fn len(&self) -> usize {
        self.snapshot.as_deref().map_or(0, NicknameMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_normalizes_evm_only() {
        let mut cache = NicknameCache::new();
        assert!(!cache.is_loaded());
        assert_eq!(cache.lookup("0xABCDEF0123456789abcdef0123456789ABCDEF01"), None);

        let mut map = NicknameMap::new();
        map.insert(
            "0xabcdef0123456789abcdef0123456789abcdef01".into(),
            "Alice".into(),
        );
        map.insert("3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy".into(), "Vault".into());
        assert!(cache.replace(map));
        assert!(!cache.replace(cache.snapshot().as_ref().clone()));

        assert_eq!(
            cache.lookup("0xABCDEF0123456789abcdef0123456789ABCDEF01"),
            Some("Alice")
        );
        assert_eq!(cache.lookup("3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy"), Some("Vault"));
        assert_eq!(cache.lookup("3j98t1wpez73cnmqviecrnyiwrnqrhwnly"), None);
    }
}
