//! `CacheStore` implementation on top of SQLite.
//!
//! Entries live in the `entries` table keyed by `(namespace, key_hash)`.
//! Deleting a row from `namespaces` cascades to its entries.

use super::connection::CacheDb;
use crate::{CacheEntry, CacheStore, CapturedResponse, Error, Namespace};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Owned column values for one `entries` row.
struct EntryRow {
    key_hash: String,
    method: String,
    url: String,
    status_code: i64,
    content_type: Option<String>,
    headers_json: String,
    body: Vec<u8>,
    stored_at: String,
}

impl EntryRow {
    fn from_entry(entry: &CacheEntry) -> Result<Self, Error> {
        Ok(Self {
            key_hash: entry.key.clone(),
            method: entry.method.clone(),
            url: entry.url.clone(),
            status_code: i64::from(entry.response.status),
            content_type: entry.response.content_type.clone(),
            headers_json: serde_json::to_string(&entry.response.headers)?,
            body: entry.response.body.to_vec(),
            stored_at: entry.stored_at.to_rfc3339(),
        })
    }

    fn into_entry(self) -> Result<CacheEntry, Error> {
        let status = u16::try_from(self.status_code)
            .map_err(|_| Error::InvalidInput(format!("stored status out of range: {}", self.status_code)))?;
        let stored_at = DateTime::parse_from_rfc3339(&self.stored_at)
            .map_err(|e| Error::InvalidInput(format!("stored_at: {e}")))?
            .with_timezone(&Utc);

        Ok(CacheEntry {
            key: self.key_hash,
            method: self.method,
            url: self.url,
            response: CapturedResponse {
                status,
                content_type: self.content_type,
                headers: serde_json::from_str(&self.headers_json)?,
                body: Bytes::from(self.body),
            },
            stored_at,
        })
    }
}

fn ensure_namespace(conn: &rusqlite::Connection, namespace: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO namespaces (name, created_at) VALUES (?1, ?2)",
        params![namespace, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn upsert_row(conn: &rusqlite::Connection, namespace: &str, row: &EntryRow) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO entries (
            namespace, key_hash, method, url, status_code,
            content_type, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(namespace, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status_code = excluded.status_code,
            content_type = excluded.content_type,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            namespace,
            &row.key_hash,
            &row.method,
            &row.url,
            row.status_code,
            &row.content_type,
            &row.headers_json,
            &row.body,
            &row.stored_at,
        ],
    )?;
    Ok(())
}

#[async_trait::async_trait]
impl CacheStore for CacheDb {
    async fn open(&self, namespace: &Namespace) -> Result<(), Error> {
        let name = namespace.as_str().to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                ensure_namespace(conn, &name)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn match_entry(&self, namespace: &Namespace, key: &str) -> Result<Option<CacheEntry>, Error> {
        let name = namespace.as_str().to_string();
        let key = key.to_string();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key_hash, method, url, status_code, content_type, headers_json, body, stored_at
                    FROM entries WHERE namespace = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![name, key], |row| {
                    Ok(EntryRow {
                        key_hash: row.get(0)?,
                        method: row.get(1)?,
                        url: row.get(2)?,
                        status_code: row.get(3)?,
                        content_type: row.get(4)?,
                        headers_json: row.get(5)?,
                        body: row.get(6)?,
                        stored_at: row.get(7)?,
                    })
                });

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(EntryRow::into_entry).transpose()
    }

    async fn put(&self, namespace: &Namespace, entry: &CacheEntry) -> Result<(), Error> {
        let name = namespace.as_str().to_string();
        let row = EntryRow::from_entry(entry)?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM namespaces WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Err(Error::StoreUnavailable(format!("namespace {name} does not exist")));
                }
                upsert_row(conn, &name, &row)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn put_all(&self, namespace: &Namespace, entries: &[CacheEntry]) -> Result<(), Error> {
        let name = namespace.as_str().to_string();
        let rows = entries.iter().map(EntryRow::from_entry).collect::<Result<Vec<_>, _>>()?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
                ensure_namespace(&tx, &name)?;
                for row in &rows {
                    upsert_row(&tx, &name, row)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn delete_namespace(&self, namespace: &Namespace) -> Result<bool, Error> {
        let name = namespace.as_str().to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM namespaces WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn list_namespaces(&self) -> Result<Vec<Namespace>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<Namespace>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM namespaces ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names.into_iter().map(Namespace::new).collect())
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self, namespace: &Namespace) -> Result<Vec<String>, Error> {
        let name = namespace.as_str().to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE namespace = ?1 ORDER BY url")?;
                let urls = stmt
                    .query_map(params![name], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }
}
