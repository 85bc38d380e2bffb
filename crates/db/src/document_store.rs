//! [`DocumentStore`] over PostgreSQL.
//!
//! Every base table in the `public` schema is a collection and every row a
//! document, rendered with `to_jsonb(row)`. Writes go back through
//! `jsonb_populate_record`, so column types (timestamps, arrays, JSONB) are
//! restored exactly as exported. A document is identified by the table's
//! primary key columns.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use pollsite_core::backup::snapshot::Document;
use pollsite_core::backup::store::DocumentStore;
use pollsite_core::backup::BackupError;
use sqlx::types::Json;
use sqlx::PgPool;

/// Column layout of one table.
#[derive(Debug)]
struct TableInfo {
    columns: Vec<String>,
    primary_key: Vec<String>,
}

pub struct PgDocumentStore {
    pool: PgPool,
    database_name: String,
    tables: Mutex<HashMap<String, Arc<TableInfo>>>,
}

fn store_err(e: sqlx::Error) -> BackupError {
    BackupError::Store(e.to_string())
}

/// Quote an SQL identifier.
fn ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn qualified(table: &str) -> String {
    format!("public.{}", ident(table))
}

impl PgDocumentStore {
    /// Build a store for the database `pool` is connected to.
    pub async fn new(pool: PgPool) -> Result<Self, sqlx::Error> {
        let database_name: String = sqlx::query_scalar("SELECT current_database()::TEXT")
            .fetch_one(&pool)
            .await?;
        Ok(Self {
            pool,
            database_name,
            tables: Mutex::new(HashMap::new()),
        })
    }

    /// Number of rows in a collection.
    pub async fn count_documents(&self, collection: &str) -> Result<i64, BackupError> {
        self.table_info(collection).await?;
        let query = format!("SELECT COUNT(*) FROM {}", qualified(collection));
        sqlx::query_scalar(&query)
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)
    }

    /// Column and primary key layout, cached for the life of the store.
    /// Unknown tables are rejected here, so every name that reaches an SQL
    /// string below is an existing table.
    async fn table_info(&self, table: &str) -> Result<Arc<TableInfo>, BackupError> {
        if let Some(info) = self.cached(table) {
            return Ok(info);
        }

        let columns: Vec<String> = sqlx::query_scalar(
            "SELECT column_name::TEXT FROM information_schema.columns
             WHERE table_schema = 'public' AND table_name = $1
             ORDER BY ordinal_position",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        if columns.is_empty() {
            return Err(BackupError::UnknownCollection(table.to_string()));
        }

        let primary_key: Vec<String> = sqlx::query_scalar(
            "SELECT a.attname::TEXT
             FROM pg_index i
             JOIN pg_class c ON c.oid = i.indrelid
             JOIN pg_namespace n ON n.oid = c.relnamespace
             JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = ANY(i.indkey)
             WHERE n.nspname = 'public' AND c.relname = $1 AND i.indisprimary
             ORDER BY a.attnum",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        if primary_key.is_empty() {
            return Err(BackupError::Store(format!(
                "collection '{table}' has no primary key"
            )));
        }

        let info = Arc::new(TableInfo { columns, primary_key });
        if let Ok(mut tables) = self.tables.lock() {
            tables.insert(table.to_string(), Arc::clone(&info));
        }
        Ok(info)
    }

    fn cached(&self, table: &str) -> Option<Arc<TableInfo>> {
        self.tables.lock().ok()?.get(table).cloned()
    }

    /// Columns of `info` present in `doc`, checking the key is complete.
    fn document_columns<'i>(
        info: &'i TableInfo,
        table: &str,
        doc: &Document,
    ) -> Result<Vec<&'i str>, BackupError> {
        if let Some(missing) = info.primary_key.iter().find(|k| !doc.contains_key(k.as_str())) {
            return Err(BackupError::Store(format!(
                "document for '{table}' has no '{missing}' value"
            )));
        }
        Ok(info
            .columns
            .iter()
            .filter(|c| doc.contains_key(c.as_str()))
            .map(String::as_str)
            .collect())
    }

    fn insert_sql(table: &str, columns: &[&str]) -> String {
        let list = columns.iter().map(|c| ident(c)).collect::<Vec<_>>().join(", ");
        format!(
            "INSERT INTO {tbl} AS target ({list})
             SELECT {list} FROM jsonb_populate_record(NULL::{tbl}, $1)",
            tbl = qualified(table),
        )
    }
}

impl DocumentStore for PgDocumentStore {
    fn database_name(&self) -> &str {
        &self.database_name
    }

    async fn list_collections(&self) -> Result<Vec<String>, BackupError> {
        sqlx::query_scalar(
            "SELECT table_name::TEXT FROM information_schema.tables
             WHERE table_schema = 'public' AND table_type = 'BASE TABLE'
             ORDER BY table_name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Document>, BackupError> {
        let info = self.table_info(collection).await?;
        let order = info.primary_key.iter().map(|k| format!("t.{}", ident(k))).collect::<Vec<_>>();
        let query = format!(
            "SELECT to_jsonb(t) FROM {} t ORDER BY {}",
            qualified(collection),
            order.join(", ")
        );
        let rows: Vec<Json<Document>> = sqlx::query_scalar(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(rows.into_iter().map(|Json(doc)| doc).collect())
    }

    async fn upsert(&self, collection: &str, doc: &Document) -> Result<(), BackupError> {
        let info = self.table_info(collection).await?;
        let columns = Self::document_columns(&info, collection, doc)?;

        let key = info.primary_key.iter().map(|k| ident(k)).collect::<Vec<_>>().join(", ");
        let updatable: Vec<&str> = columns
            .iter()
            .copied()
            .filter(|c| !info.primary_key.iter().any(|k| k.as_str() == *c))
            .collect();

        // Rows already equal to the document are left untouched, so their
        // updated_at trigger does not fire.
        let conflict = if updatable.is_empty() {
            format!("ON CONFLICT ({key}) DO NOTHING")
        } else {
            let sets = updatable
                .iter()
                .map(|c| format!("{col} = EXCLUDED.{col}", col = ident(c)))
                .collect::<Vec<_>>()
                .join(", ");
            let current = updatable
                .iter()
                .map(|c| format!("to_jsonb(target.{})", ident(c)))
                .collect::<Vec<_>>()
                .join(", ");
            let incoming = updatable
                .iter()
                .map(|c| format!("to_jsonb(EXCLUDED.{})", ident(c)))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "ON CONFLICT ({key}) DO UPDATE SET {sets}
                 WHERE ROW({current}) IS DISTINCT FROM ROW({incoming})"
            )
        };

        let query = format!("{} {conflict}", Self::insert_sql(collection, &columns));
        sqlx::query(&query)
            .bind(Json(doc))
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn insert(&self, collection: &str, doc: &Document) -> Result<(), BackupError> {
        let info = self.table_info(collection).await?;
        let columns = Self::document_columns(&info, collection, doc)?;
        sqlx::query(&Self::insert_sql(collection, &columns))
            .bind(Json(doc))
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn delete_all(&self, collection: &str) -> Result<u64, BackupError> {
        self.table_info(collection).await?;
        let result = sqlx::query(&format!("DELETE FROM {}", qualified(collection)))
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected())
    }

    /// Move serial sequences past the highest restored key.
    async fn finalize_collection(&self, collection: &str) -> Result<(), BackupError> {
        let info = self.table_info(collection).await?;
        let table = qualified(collection);
        for key in &info.primary_key {
            let sequence: Option<String> =
                sqlx::query_scalar("SELECT pg_get_serial_sequence($1, $2)")
                    .bind(&table)
                    .bind(key)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(store_err)?;
            let Some(sequence) = sequence else {
                continue;
            };
            let query = format!(
                "SELECT setval($1::regclass, COALESCE(MAX({col}), 1), MAX({col}) IS NOT NULL)
                 FROM {table}",
                col = ident(key),
            );
            sqlx::query(&query)
                .bind(&sequence)
                .execute(&self.pool)
                .await
                .map_err(store_err)?;
        }
        Ok(())
    }
}
