//! SQLite store for save generations.
//!
//! Each generation is serialised to JSON and stored in a single table:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS save_generations (
//!     key        TEXT PRIMARY KEY,
//!     generation INTEGER NOT NULL,
//!     data       BLOB NOT NULL,
//!     saved_at   TEXT NOT NULL,
//!     checksum   TEXT
//! );
//! ```
//!
//! - WAL mode for reads during gameplay.
//! - JSON inside a BLOB keeps the schema stable when record payloads change.
//! - Optional CRC-32 checksum detects save corruption.
//! - Rotating backups via SQLite's online-backup API, skipped when the
//!   live database fails its integrity check.

use std::path::{Path, PathBuf};
use std::time::Instant;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tracing::{debug, info, warn};

use crate::config::PersistenceConfig;
use crate::error::{KeepsakeError, Result};
use crate::record::SaveGeneration;

use super::SaveStore;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS save_generations (
    key        TEXT PRIMARY KEY,
    generation INTEGER NOT NULL,
    data       BLOB NOT NULL,
    saved_at   TEXT NOT NULL,
    checksum   TEXT
);";

// ---------------------------------------------------------------------------
// CRC-32 checksum helper
// ---------------------------------------------------------------------------

fn crc32_hex(data: &[u8]) -> String {
    format!("{:08x}", crc32_compute(data))
}

/// CRC-32 (ISO 3309 / ITU-T V.42).
fn crc32_compute(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            if crc & 1 == 1 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}

/// Smallest string greater than every string starting with `prefix`, for a
/// primary-key range scan. Keys compare bytewise, which for UTF-8 is code
/// point order. `None` when no such bound exists (empty prefix, or one made
/// only of `char::MAX`).
fn prefix_end(prefix: &str) -> Option<String> {
    let mut end: Vec<char> = prefix.chars().collect();
    while let Some(last) = end.pop() {
        let successor = (u32::from(last) + 1..=u32::from(char::MAX)).find_map(char::from_u32);
        if let Some(next) = successor {
            end.push(next);
            return Some(end.into_iter().collect());
        }
    }
    None
}

// ---------------------------------------------------------------------------
// SqliteStore
// ---------------------------------------------------------------------------

/// Handle to an open SQLite database of [`SaveGeneration`]s.
///
/// ```no_run
/// # use keepsake_core::config::PersistenceConfig;
/// # use keepsake_core::record::SaveGeneration;
/// # use keepsake_core::store::{SaveStore, SqliteStore};
/// let store = SqliteStore::open("saves.db", &PersistenceConfig::default())?;
/// store.write("Adventure_P1_S1_0", &SaveGeneration::new("Adventure_P1_S1_0", 0))?;
/// let loaded = store.read("Adventure_P1_S1_0")?;
/// # Ok::<(), keepsake_core::error::KeepsakeError>(())
/// ```
pub struct SqliteStore {
    conn: Mutex<Connection>,
    config: PersistenceConfig,
    db_path: PathBuf,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("db_path", &self.db_path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) a database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`KeepsakeError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(
            path = %db_path.display(),
            wal = config.wal_mode,
            "Save store opened"
        );

        Ok(Self {
            conn: Mutex::new(conn),
            config: config.clone(),
            db_path,
        })
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`KeepsakeError::Database`] on SQLite failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
            config: config.clone(),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Number of stored generations across all keys.
    ///
    /// # Errors
    ///
    /// Returns [`KeepsakeError::Database`] on SQLite failures.
    pub fn generation_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM save_generations", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Path to the database file (`:memory:` for in-memory databases).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Copy the live database to `dest` through SQLite's online-backup API.
    ///
    /// # Errors
    ///
    /// Returns [`KeepsakeError::Database`] on SQLite failures.
    pub fn backup_to<P: AsRef<Path>>(&self, dest: P) -> Result<()> {
        let start = Instant::now();
        let mut target = Connection::open(dest.as_ref())?;
        let conn = self.conn.lock();
        rusqlite::backup::Backup::new(&conn, &mut target)?.run_to_completion(
            256,
            std::time::Duration::from_millis(50),
            None,
        )?;
        debug!(
            dest = %dest.as_ref().display(),
            elapsed_ms = start.elapsed().as_millis(),
            "Copied save database"
        );
        Ok(())
    }

    /// Whether `PRAGMA integrity_check` reports a healthy database.
    ///
    /// # Errors
    ///
    /// Returns [`KeepsakeError::Database`] if the check itself fails.
    pub fn is_healthy(&self) -> Result<bool> {
        let verdict: String = self
            .conn
            .lock()
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(verdict == "ok")
    }

    /// `saves.db` → `saves.db.bak.<slot>`.
    fn backup_slot(&self, slot: u32) -> PathBuf {
        let mut name = self.db_path.as_os_str().to_owned();
        name.push(format!(".bak.{slot}"));
        PathBuf::from(name)
    }
}

impl SaveStore for SqliteStore {
    fn exists(&self, key: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached("SELECT 1 FROM save_generations WHERE key = ?1")?;
        Ok(stmt.exists(params![key])?)
    }

    fn write(&self, key: &str, generation: &SaveGeneration) -> Result<()> {
        let start = Instant::now();
        let json =
            serde_json::to_vec(generation).map_err(|e| KeepsakeError::Serialization(e.to_string()))?;
        let checksum = self.config.checksum_enabled.then(|| crc32_hex(&json));

        self.conn.lock().execute(
            "INSERT INTO save_generations (key, generation, data, saved_at, checksum)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(key) DO UPDATE SET
                generation = excluded.generation,
                data = excluded.data,
                saved_at = excluded.saved_at,
                checksum = excluded.checksum",
            params![
                key,
                generation.generation_index,
                json,
                generation.saved_at.to_rfc3339(),
                checksum
            ],
        )?;

        debug!(
            key,
            records = generation.len(),
            bytes = json.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Wrote save generation"
        );
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Option<SaveGeneration>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare_cached("SELECT data, checksum FROM save_generations WHERE key = ?1")?;
        let row: Option<(Vec<u8>, Option<String>)> = stmt
            .query_row(params![key], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;

        let Some((data, stored_checksum)) = row else {
            return Ok(None);
        };

        if self.config.checksum_enabled {
            if let Some(expected) = stored_checksum {
                let actual = crc32_hex(&data);
                if expected != actual {
                    warn!(
                        key,
                        expected = %expected,
                        actual = %actual,
                        "Checksum mismatch, possible save corruption"
                    );
                }
            }
        }

        let generation: SaveGeneration =
            serde_json::from_slice(&data).map_err(|e| KeepsakeError::Serialization(e.to_string()))?;
        Ok(Some(generation))
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let deleted = self
            .conn
            .lock()
            .execute("DELETE FROM save_generations WHERE key = ?1", params![key])?;
        Ok(deleted > 0)
    }

    fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let keys = match prefix_end(prefix) {
            Some(end) => {
                let mut stmt = conn.prepare_cached(
                    "SELECT key FROM save_generations WHERE key >= ?1 AND key < ?2 ORDER BY key",
                )?;
                stmt.query_map(params![prefix, end], |row| row.get::<_, String>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt =
                    conn.prepare_cached("SELECT key FROM save_generations WHERE key >= ?1 ORDER BY key")?;
                stmt.query_map(params![prefix], |row| row.get::<_, String>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(keys)
    }

    fn create_backup(&self) -> Result<bool> {
        let keep = self.config.backup_count;
        if keep == 0 || self.db_path.as_os_str() == ":memory:" {
            return Ok(false);
        }
        if !self.is_healthy()? {
            warn!(path = %self.db_path.display(), "Integrity check failed, keeping existing backups");
            return Ok(false);
        }

        // Newest backup is slot 1; shift the rest up and drop anything past `keep`.
        let overflow = self.backup_slot(keep);
        if overflow.exists() {
            std::fs::remove_file(&overflow)?;
        }
        for slot in (1..keep).rev() {
            let from = self.backup_slot(slot);
            if from.exists() {
                std::fs::rename(&from, self.backup_slot(slot + 1))?;
            }
        }
        self.backup_to(self.backup_slot(1))?;
        info!(path = %self.db_path.display(), keep, "Save backup rotated");
        Ok(true)
    }
}
