//! Entry reads and writes within a generation.

use super::connection::CacheDb;
use super::hash::compute_entry_key;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// An immutable copy of a response captured at write time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoredResponse {
    /// Final response URL; absent for opaque responses.
    pub url: Option<String>,
    pub status_code: u16,
    /// Header name/value pairs in response order.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

/// A request identity paired with the response stored for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub request_method: String,
    pub request_url: String,
    pub response: StoredResponse,
}

impl CacheEntry {
    pub fn key(&self) -> String {
        compute_entry_key(&self.request_method, &self.request_url)
    }
}

/// Listing row for an entry, without the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EntrySummary {
    pub request_method: String,
    pub request_url: String,
    pub status_code: u16,
    pub body_len: usize,
    pub stored_at: String,
}

impl CacheDb {
    /// Insert or replace the entry for a request in a generation.
    ///
    /// The generation is created if it doesn't exist yet. A later put for the
    /// same request replaces the earlier one.
    pub async fn put_entry(&self, generation: &str, entry: &CacheEntry) -> Result<(), Error> {
        let generation = generation.to_string();
        let key = entry.key();
        let entry = entry.clone();
        let headers_json = serde_json::to_string(&entry.response.headers)?;
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![&generation, now],
                )?;
                tx.execute(
                    "INSERT INTO entries (
                    generation, key, request_method, request_url,
                    response_url, status_code, headers_json, body, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(generation, key) DO UPDATE SET
                    request_method = excluded.request_method,
                    request_url = excluded.request_url,
                    response_url = excluded.response_url,
                    status_code = excluded.status_code,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    stored_at = excluded.stored_at",
                    params![
                        &generation,
                        &key,
                        entry.request_method.to_ascii_uppercase(),
                        &entry.request_url,
                        &entry.response.url,
                        entry.response.status_code as i64,
                        &headers_json,
                        &entry.response.body,
                        &entry.response.stored_at,
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the stored response for a request in a generation.
    ///
    /// Returns None if the generation or the entry doesn't exist.
    pub async fn match_entry(&self, generation: &str, method: &str, url: &str) -> Result<Option<StoredResponse>, Error> {
        let generation = generation.to_string();
        let key = compute_entry_key(method, url);
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT response_url, status_code, headers_json, body, stored_at
                FROM entries WHERE generation = ?1 AND key = ?2",
                )?;

                let row = stmt.query_row(params![generation, key], |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                });

                match row {
                    Ok((url, status, headers_json, body, stored_at)) => {
                        let status_code = u16::try_from(status)
                            .map_err(|_| Error::CorruptEntry(format!("status code out of range: {status}")))?;
                        let headers = serde_json::from_str(&headers_json)?;
                        Ok(Some(StoredResponse { url, status_code, headers, body, stored_at }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// List the entries of a generation, ordered by request URL.
    pub async fn list_entries(&self, generation: &str) -> Result<Vec<EntrySummary>, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntrySummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT request_method, request_url, status_code, length(body), stored_at
                FROM entries WHERE generation = ?1 ORDER BY request_url ASC, request_method ASC",
                )?;
                let rows = stmt
                    .query_map(params![generation], |row| {
                        Ok(EntrySummary {
                            request_method: row.get(0)?,
                            request_url: row.get(1)?,
                            status_code: row.get::<_, i64>(2)? as u16,
                            body_len: row.get::<_, i64>(3)? as usize,
                            stored_at: row.get(4)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }
}
