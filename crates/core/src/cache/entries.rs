//! Per-cache response storage: put, match, delete.

use super::connection::CacheDb;
use super::hash::compute_cache_key;
use crate::{CachedResponse, Error};
use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

impl CacheDb {
    /// Store a response under `(cache_name, method, response.url)`.
    ///
    /// Uses UPSERT semantics: a later put for the same request replaces the
    /// earlier one. Returns the stored copy with `stored_at` filled in.
    pub async fn put_entry(
        &self, cache_name: &str, method: &str, response: &CachedResponse,
    ) -> Result<CachedResponse, Error> {
        self.put_entry_for(cache_name, method, &response.url, response).await
    }

    /// Store a response under an explicit request URL.
    ///
    /// Redirected responses are filed under the URL that was requested, not
    /// the one they finally came from, so the next lookup for the same
    /// request finds them.
    pub async fn put_entry_for(
        &self, cache_name: &str, method: &str, request_url: &str, response: &CachedResponse,
    ) -> Result<CachedResponse, Error> {
        let key_hash = compute_cache_key(method, request_url);
        let cache_name = cache_name.to_string();
        let method = method.to_ascii_uppercase();
        let request_url = request_url.to_string();
        let headers_json = serde_json::to_string(&response.headers)?;
        let stored_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true);

        let mut stored = response.clone();
        stored.stored_at = Some(stored_at.clone());
        let body = response.body.to_vec();
        let status = response.status;

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO cache_entries (cache_name, key_hash, url, method, status, headers_json, body, stored_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(cache_name, key_hash) DO UPDATE SET
                        url = excluded.url,
                        method = excluded.method,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![cache_name, key_hash, request_url, method, status, headers_json, body, stored_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(stored)
    }

    /// Look up a stored response.
    ///
    /// Returns None if the cache has no entry for the request.
    pub async fn match_entry(&self, cache_name: &str, method: &str, url: &str) -> Result<Option<CachedResponse>, Error> {
        let key_hash = compute_cache_key(method, url);
        let cache_name = cache_name.to_string();

        let row = self
            .conn
            .call(move |conn| -> Result<Option<(String, u16, String, Vec<u8>, String)>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status, headers_json, body, stored_at
                    FROM cache_entries WHERE cache_name = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![cache_name, key_hash], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                });

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        let Some((url, status, headers_json, body, stored_at)) = row else {
            return Ok(None);
        };

        Ok(Some(CachedResponse {
            url,
            status,
            headers: serde_json::from_str(&headers_json)?,
            body: Bytes::from(body),
            stored_at: Some(stored_at),
        }))
    }

    /// Check whether a cache holds an entry for the request.
    pub async fn has_entry(&self, cache_name: &str, method: &str, url: &str) -> Result<bool, Error> {
        let key_hash = compute_cache_key(method, url);
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM cache_entries WHERE cache_name = ?1 AND key_hash = ?2)",
                    params![cache_name, key_hash],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a single entry. Returns whether anything was removed.
    pub async fn delete_entry(&self, cache_name: &str, method: &str, url: &str) -> Result<bool, Error> {
        let key_hash = compute_cache_key(method, url);
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM cache_entries WHERE cache_name = ?1 AND key_hash = ?2",
                    params![cache_name, key_hash],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}
