//! Persistent Tier
//!
//! SQLite-backed storage: one database, one table per registered store,
//! primary key `key`, plus an index over `size_bytes` used when enumerating
//! sizes for the usage report. Statements run on the blocking pool.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::{KeyValueStore, Tier};
use crate::cache::{duration_ms, CacheEntry, StoreDescriptor};
use crate::config::PersistentLocation;
use crate::error::TierError;

// == Handle ==
/// Open database connection, created once per store instance.
#[derive(Clone)]
pub struct Handle {
    conn: Arc<Mutex<Connection>>,
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle").field("conn", &"<sqlite>").finish()
    }
}

// == Persistent Store ==
pub struct PersistentStore {
    location: PersistentLocation,
    /// Stores that own a table
    collections: HashSet<String>,
    handle: OnceCell<Handle>,
}

impl fmt::Debug for PersistentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentStore")
            .field("location", &self.location)
            .field("collections", &self.collections)
            .finish()
    }
}

impl PersistentStore {
    /// Describes the database; nothing is opened until `init`.
    pub fn new(location: PersistentLocation, stores: &[StoreDescriptor]) -> Self {
        Self {
            location,
            collections: stores.iter().map(|s| s.name.clone()).collect(),
            handle: OnceCell::new(),
        }
    }

    // == Init ==
    /// Opens the database and creates one table per store.
    ///
    /// Idempotent: later calls return the cached handle. Fails with
    /// `StorageUnavailable` when the platform has no usable storage.
    pub async fn init(&self) -> Result<&Handle, TierError> {
        self.handle
            .get_or_try_init(|| async {
                let location = self.location.clone();
                let collections: Vec<String> = self.collections.iter().cloned().collect();
                tokio::task::spawn_blocking(move || open_database(&location, &collections))
                    .await
                    .map_err(|err| TierError::StorageUnavailable(err.to_string()))?
            })
            .await
    }

    fn table_for(&self, store: &StoreDescriptor) -> Result<String, TierError> {
        if self.collections.contains(&store.name) {
            Ok(table_name(&store.name))
        } else {
            Err(TierError::UnknownCollection(store.name.clone()))
        }
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, TierError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, TierError> + Send + 'static,
    {
        let handle = self.init().await?.clone();
        tokio::task::spawn_blocking(move || {
            let conn = handle
                .conn
                .lock()
                .map_err(|_| TierError::Backend("connection lock poisoned".to_string()))?;
            f(&conn)
        })
        .await
        .map_err(|err| TierError::Backend(err.to_string()))?
    }
}

fn table_name(store: &str) -> String {
    format!("cache_{}", store)
}

fn open_database(location: &PersistentLocation, collections: &[String]) -> Result<Handle, TierError> {
    let unavailable = |err: rusqlite::Error| TierError::StorageUnavailable(err.to_string());

    let conn = match location {
        PersistentLocation::Disabled => {
            return Err(TierError::StorageUnavailable(
                "persistent storage disabled".to_string(),
            ))
        }
        PersistentLocation::InMemory => Connection::open_in_memory().map_err(unavailable)?,
        PersistentLocation::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(|err| TierError::StorageUnavailable(err.to_string()))?;
            }
            let conn = Connection::open(path).map_err(unavailable)?;
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                row.get::<_, String>(0)
            })
            .map_err(unavailable)?;
            conn.pragma_update(None, "synchronous", "NORMAL")
                .map_err(unavailable)?;
            conn
        }
    };

    for store in collections {
        let table = table_name(store);
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{table}\" (
                key        TEXT PRIMARY KEY NOT NULL,
                payload    TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                size_bytes INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS \"{table}_by_size\" ON \"{table}\" (size_bytes, key);"
        ))
        .map_err(unavailable)?;
    }

    info!(
        "Persistent tier opened at {:?} with {} collections",
        location,
        collections.len()
    );

    Ok(Handle {
        conn: Arc::new(Mutex::new(conn)),
    })
}

#[async_trait]
impl KeyValueStore for PersistentStore {
    fn tier(&self) -> Tier {
        Tier::Persistent
    }

    async fn get(&self, store: &StoreDescriptor, key: &str) -> Result<Option<CacheEntry>, TierError> {
        let table = self.table_for(store)?;
        let key = key.to_string();

        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    &format!(
                        "SELECT payload, created_at, size_bytes FROM \"{table}\" WHERE key = ?1"
                    ),
                    params![key],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, i64>(2)?,
                        ))
                    },
                )
                .optional()?;

            let Some((raw, created_at, size_bytes)) = row else {
                return Ok(None);
            };

            let payload = serde_json::from_str(&raw)
                .map_err(|err| TierError::CorruptEntry(format!("{}: {}", key, err)))?;

            Ok(Some(CacheEntry {
                key,
                payload,
                created_at: created_at.max(0) as u64,
                size_bytes: size_bytes.max(0) as u64,
            }))
        })
        .await
    }

    async fn put(&self, store: &StoreDescriptor, entry: &CacheEntry) -> Result<(), TierError> {
        let table = self.table_for(store)?;
        let raw = serde_json::to_string(&entry.payload)
            .map_err(|err| TierError::WriteFailed(err.to_string()))?;
        let key = entry.key.clone();
        let created_at = i64::try_from(entry.created_at).unwrap_or(i64::MAX);
        let size_bytes = i64::try_from(entry.size_bytes).unwrap_or(i64::MAX);

        self.with_conn(move |conn| {
            conn.execute(
                &format!(
                    "INSERT OR REPLACE INTO \"{table}\" (key, payload, created_at, size_bytes)
                     VALUES (?1, ?2, ?3, ?4)"
                ),
                params![key, raw, created_at, size_bytes],
            )
            .map_err(|err| TierError::WriteFailed(err.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, store: &StoreDescriptor, key: &str) {
        let Ok(table) = self.table_for(store) else {
            return;
        };
        let owned_key = key.to_string();

        let result = self
            .with_conn(move |conn| {
                conn.execute(
                    &format!("DELETE FROM \"{table}\" WHERE key = ?1"),
                    params![owned_key],
                )?;
                Ok(())
            })
            .await;

        if let Err(err) = result {
            warn!("Persistent delete of {}/{} failed: {}", store.name, key, err);
        }
    }

    async fn delete_expired(&self, store: &StoreDescriptor, key: &str, now_ms: u64) {
        let Ok(table) = self.table_for(store) else {
            return;
        };
        let owned_key = key.to_string();
        // Valid while created_at >= now - max_age
        let oldest_valid = now_ms.saturating_sub(duration_ms(store.max_age)) as i64;

        let result = self
            .with_conn(move |conn| {
                conn.execute(
                    &format!("DELETE FROM \"{table}\" WHERE key = ?1 AND created_at < ?2"),
                    params![owned_key, oldest_valid],
                )?;
                Ok(())
            })
            .await;

        if let Err(err) = result {
            warn!("Persistent eviction of {}/{} failed: {}", store.name, key, err);
        }
    }

    async fn clear(&self, store: &StoreDescriptor) {
        let Ok(table) = self.table_for(store) else {
            return;
        };

        let result = self
            .with_conn(move |conn| {
                conn.execute(&format!("DELETE FROM \"{table}\""), [])?;
                Ok(())
            })
            .await;

        if let Err(err) = result {
            warn!("Persistent clear of {} failed: {}", store.name, err);
        }
    }

    async fn enumerate_sizes(&self, store: &StoreDescriptor) -> Result<Vec<(String, u64)>, TierError> {
        let table = self.table_for(store)?;

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT key, size_bytes FROM \"{table}\" ORDER BY size_bytes"
            ))?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?.max(0) as u64))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
    }
}
