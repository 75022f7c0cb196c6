//! [`CacheStore`] implementation for the SQLite backend.
//!
//! Generations live in the `generations` table; entries reference their
//! generation with `ON DELETE CASCADE`, so deleting a generation row drops
//! every entry in one statement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension, Transaction};

use super::connection::CacheDb;
use super::{CacheEntry, CacheStore, RequestKey};
use crate::Error;
use crate::request::{HeaderList, ResponseSnapshot};

/// Row shape shared by the insert paths.
struct EntryRow {
    key_hash: String,
    method: String,
    url: String,
    status: i64,
    headers_json: String,
    body: Vec<u8>,
    stored_at: String,
}

impl EntryRow {
    fn encode(entry: &CacheEntry) -> Result<Self, Error> {
        Ok(Self {
            key_hash: entry.key.digest(),
            method: entry.key.method().to_string(),
            url: entry.key.url().to_string(),
            status: i64::from(entry.response.status),
            headers_json: serde_json::to_string(&entry.response.headers)?,
            body: entry.response.body.to_vec(),
            stored_at: entry.stored_at.to_rfc3339(),
        })
    }
}

fn ensure_generation(tx: &Transaction<'_>, generation: &str) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO generations (name, created_at) VALUES (?1, ?2)
         ON CONFLICT(name) DO NOTHING",
        params![generation, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn upsert_entry(tx: &Transaction<'_>, generation: &str, row: &EntryRow) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO entries (generation, key_hash, method, url, status, headers_json, body, stored_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(generation, key_hash) DO UPDATE SET
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            generation,
            &row.key_hash,
            &row.method,
            &row.url,
            row.status,
            &row.headers_json,
            &row.body,
            &row.stored_at,
        ],
    )?;
    Ok(())
}

fn decode_entry(
    method: String, url: String, status: i64, headers_json: String, body: Vec<u8>, stored_at: String,
) -> Result<CacheEntry, Error> {
    let status = u16::try_from(status).map_err(|_| Error::Serialization(format!("invalid status {status}")))?;
    let headers: HeaderList = serde_json::from_str(&headers_json)?;
    let stored_at = DateTime::parse_from_rfc3339(&stored_at)
        .map_err(|e| Error::Serialization(e.to_string()))?
        .with_timezone(&Utc);

    Ok(CacheEntry {
        key: RequestKey::from_stored(method, url),
        response: ResponseSnapshot { status, headers, body: body.into() },
        stored_at,
    })
}

#[async_trait]
impl CacheStore for CacheDb {
    async fn generations(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn lookup(&self, generation: &str, key: &RequestKey) -> Result<Option<CacheEntry>, Error> {
        let generation = generation.to_string();
        let key_hash = key.digest();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let row = conn
                    .query_row(
                        "SELECT method, url, status, headers_json, body, stored_at
                         FROM entries WHERE generation = ?1 AND key_hash = ?2",
                        params![generation, key_hash],
                        |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, String>(1)?,
                                row.get::<_, i64>(2)?,
                                row.get::<_, String>(3)?,
                                row.get::<_, Vec<u8>>(4)?,
                                row.get::<_, String>(5)?,
                            ))
                        },
                    )
                    .optional()?;

                row.map(|(method, url, status, headers_json, body, stored_at)| {
                    decode_entry(method, url, status, headers_json, body, stored_at)
                })
                .transpose()
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, generation: &str, entry: CacheEntry) -> Result<(), Error> {
        let generation = generation.to_string();
        let row = EntryRow::encode(&entry)?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_generation(&tx, &generation)?;
                upsert_entry(&tx, &generation, &row)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(|e| Error::CacheWrite(Error::from(e).to_string()))
    }

    async fn commit_generation(&self, generation: &str, entries: Vec<CacheEntry>) -> Result<(), Error> {
        let generation = generation.to_string();
        let rows = entries.iter().map(EntryRow::encode).collect::<Result<Vec<_>, _>>()?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM generations WHERE name = ?1", params![generation])?;
                ensure_generation(&tx, &generation)?;
                for row in &rows {
                    upsert_entry(&tx, &generation, row)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(|e| Error::CacheWrite(Error::from(e).to_string()))
    }

    async fn delete_generation(&self, generation: &str) -> Result<bool, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM generations WHERE name = ?1", params![generation])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self, generation: &str) -> Result<Vec<RequestKey>, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<RequestKey>, Error> {
                let mut stmt = conn.prepare("SELECT method, url FROM entries WHERE generation = ?1 ORDER BY url")?;
                let keys = stmt
                    .query_map(params![generation], |row| {
                        Ok(RequestKey::from_stored(row.get(0)?, row.get(1)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }
}
