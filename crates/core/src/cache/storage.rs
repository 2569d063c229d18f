//! Cache-level administration: listing, deletion, cleanup.

use std::collections::HashSet;

use super::connection::CacheDb;
use super::hash::compute_cache_key;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// One named cache and how much it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSummary {
    pub name: String,
    pub entries: u64,
    pub bytes: u64,
}

/// A stored request, without its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryKey {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub stored_at: String,
}

impl CacheDb {
    /// List every non-empty cache with entry counts, ordered by name.
    pub async fn cache_summaries(&self) -> Result<Vec<CacheSummary>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<CacheSummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT cache_name, COUNT(*), COALESCE(SUM(LENGTH(body)), 0)
                    FROM cache_entries GROUP BY cache_name ORDER BY cache_name",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok(CacheSummary {
                        name: row.get(0)?,
                        entries: row.get::<_, i64>(1)? as u64,
                        bytes: row.get::<_, i64>(2)? as u64,
                    })
                })?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of every non-empty cache.
    pub async fn cache_names(&self) -> Result<Vec<String>, Error> {
        Ok(self.cache_summaries().await?.into_iter().map(|s| s.name).collect())
    }

    /// Requests stored in a cache, oldest first.
    pub async fn keys(&self, cache_name: &str) -> Result<Vec<EntryKey>, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntryKey>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, stored_at FROM cache_entries
                    WHERE cache_name = ?1 ORDER BY stored_at ASC, url ASC",
                )?;
                let rows = stmt.query_map(params![cache_name], |row| {
                    Ok(EntryKey { method: row.get(0)?, url: row.get(1)?, status: row.get(2)?, stored_at: row.get(3)? })
                })?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a whole cache. Returns the number of deleted entries.
    pub async fn delete_cache(&self, cache_name: &str) -> Result<u64, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM cache_entries WHERE cache_name = ?1", params![cache_name])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete caches named `<prefix>-...` that are not in `current`.
    ///
    /// Caches without the prefix belong to someone else and are left alone.
    /// Returns the names that were deleted.
    pub async fn delete_outdated_caches(&self, prefix: &str, current: &[String]) -> Result<Vec<String>, Error> {
        let owned = format!("{prefix}-");
        let mut deleted = Vec::new();

        for name in self.cache_names().await? {
            if name.starts_with(&owned) && !current.contains(&name) {
                let count = self.delete_cache(&name).await?;
                tracing::info!(cache = %name, entries = count, "deleted outdated cache");
                deleted.push(name);
            }
        }

        Ok(deleted)
    }

    /// Drop the least recently stored entries of a cache until it holds at
    /// most `max_entries`.
    ///
    /// `GET` entries for the URLs in `keep` are never dropped, even if that
    /// leaves the cache above the cap. Returns the number of deleted entries.
    pub async fn purge_oldest(&self, cache_name: &str, max_entries: usize, keep: &[String]) -> Result<u64, Error> {
        let cache_name = cache_name.to_string();
        let keep: HashSet<String> = keep.iter().map(|url| compute_cache_key("GET", url)).collect();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let tx = conn.transaction()?;
                let hashes = {
                    let mut stmt = tx.prepare(
                        "SELECT key_hash FROM cache_entries WHERE cache_name = ?1
                        ORDER BY stored_at ASC, url ASC",
                    )?;
                    let rows = stmt.query_map(params![cache_name], |row| row.get::<_, String>(0))?;
                    rows.collect::<Result<Vec<_>, _>>()?
                };

                let excess = hashes.len().saturating_sub(max_entries);
                let mut deleted = 0;
                for hash in hashes.iter().filter(|h| !keep.contains(*h)).take(excess) {
                    deleted += tx.execute(
                        "DELETE FROM cache_entries WHERE cache_name = ?1 AND key_hash = ?2",
                        params![cache_name, hash],
                    )?;
                }
                tx.commit()?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}
