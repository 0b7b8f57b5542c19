//! SQLite-backed nickname store

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use tokio::sync::broadcast;

use super::nicknames::{MapChange, NicknameMap, NicknameStore};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Change notifications only reach subscribers of this handle; writes made by
/// another process against the same file are seen on the next `get`.
#[derive(Debug)]
pub struct SqliteNicknameStore {
    conn: Mutex<Connection>,
    changes: broadcast::Sender<MapChange>,
}

impl SqliteNicknameStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).with_context(|| format!("open db {}", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory().context("open in-memory db")?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let store = Self {
            conn: Mutex::new(conn),
            changes,
        };
        store.init()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("nickname db lock poisoned"))
    }

    fn init(&self) -> Result<()> {
        self.lock()?.execute_batch(
            "CREATE TABLE IF NOT EXISTS nicknames (
                address  TEXT PRIMARY KEY,
                nickname TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    fn load_all(&self) -> Result<NicknameMap> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT address, nickname FROM nicknames ORDER BY address")?;
        let mut rows = stmt.query([])?;
        let mut out = NicknameMap::new();
        while let Some(row) = rows.next()? {
            let address: String = row.get(0)?;
            let nickname: String = row.get(1)?;
            out.insert(address, nickname);
        }
        Ok(out)
    }

    fn replace_all(&self, map: &NicknameMap) -> Result<NicknameMap> {
        let old = self.load_all()?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM nicknames", [])?;
        {
            let mut insert =
                tx.prepare("INSERT INTO nicknames(address, nickname) VALUES (?1, ?2)")?;
            for (address, nickname) in map {
                insert.execute(params![address, nickname])?;
            }
        }
        tx.commit().context("commit nickname map")?;
        Ok(old)
    }
}

#[async_trait]
impl NicknameStore for SqliteNicknameStore {
    async fn get(&self) -> Result<NicknameMap> {
        self.load_all()
    }

    async fn set(&self, map: NicknameMap) -> Result<()> {
        let old = self.replace_all(&map)?;
        let _ = self.changes.send(MapChange { old, new: map });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<MapChange> {
        self.changes.subscribe()
    }
}
