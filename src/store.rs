//! Record Storage
//! Mission: Generic CRUD over bookings, menu items and packages
//!
//! Documents are stored as opaque JSON; the gateway never looks inside them.

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Bookings,
    MenuItems,
    Packages,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::Bookings,
        Collection::MenuItems,
        Collection::Packages,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            Collection::Bookings => "bookings",
            Collection::MenuItems => "menu_items",
            Collection::Packages => "packages",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub data: serde_json::Value,
    pub created_at: String,
    pub updated_at: String,
}

/// Record storage with SQLite backend
pub struct RecordStore {
    db_path: String,
}

impl RecordStore {
    pub fn new(db_path: &str) -> Result<Self> {
        let store = Self {
            db_path: db_path.to_string(),
        };
        store.init_db()?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .with_context(|| format!("Failed to open record database at {}", self.db_path))
    }

    fn init_db(&self) -> Result<()> {
        let conn = self.connect()?;
        for collection in Collection::ALL {
            conn.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {} (
                        id TEXT PRIMARY KEY,
                        data TEXT NOT NULL,
                        created_at TEXT NOT NULL,
                        updated_at TEXT NOT NULL
                    )",
                    collection.table()
                ),
                [],
            )
            .with_context(|| format!("Failed to create table {}", collection.table()))?;
        }
        Ok(())
    }

    pub fn create(&self, collection: Collection, data: serde_json::Value) -> Result<Record> {
        let now = Utc::now().to_rfc3339();
        let record = Record {
            id: Uuid::new_v4().to_string(),
            data,
            created_at: now.clone(),
            updated_at: now,
        };

        let conn = self.connect()?;
        conn.execute(
            &format!(
                "INSERT INTO {} (id, data, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
                collection.table()
            ),
            params![
                record.id,
                record.data.to_string(),
                record.created_at,
                record.updated_at,
            ],
        )
        .context("Failed to insert record")?;

        info!(table = collection.table(), id = %record.id, "Created record");
        Ok(record)
    }

    pub fn get(&self, collection: Collection, id: &str) -> Result<Option<Record>> {
        let conn = self.connect()?;
        let record = conn
            .query_row(
                &format!(
                    "SELECT id, data, created_at, updated_at FROM {} WHERE id = ?1",
                    collection.table()
                ),
                params![id],
                record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Replace the document. Returns None when the id does not exist.
    pub fn update(
        &self,
        collection: Collection,
        id: &str,
        data: serde_json::Value,
    ) -> Result<Option<Record>> {
        let conn = self.connect()?;
        let updated_at = Utc::now().to_rfc3339();
        let rows = conn.execute(
            &format!(
                "UPDATE {} SET data = ?1, updated_at = ?2 WHERE id = ?3",
                collection.table()
            ),
            params![data.to_string(), updated_at, id],
        )?;

        if rows == 0 {
            return Ok(None);
        }
        self.get(collection, id)
    }

    /// Returns false when nothing was deleted
    pub fn delete(&self, collection: Collection, id: &str) -> Result<bool> {
        let conn = self.connect()?;
        let rows = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", collection.table()),
            params![id],
        )?;
        if rows > 0 {
            info!(table = collection.table(), id, "Deleted record");
        }
        Ok(rows > 0)
    }

    pub fn list(&self, collection: Collection) -> Result<Vec<Record>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, data, created_at, updated_at FROM {} ORDER BY created_at",
            collection.table()
        ))?;
        let records = stmt
            .query_map([], record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    let data: String = row.get(1)?;
    Ok(Record {
        id: row.get(0)?,
        data: serde_json::from_str(&data).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
    })
}
