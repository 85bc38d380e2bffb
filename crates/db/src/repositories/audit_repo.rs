//! Repository for the `audit_logs` table.

use pollsite_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::audit::{AuditLog, AuditQuery, CreateAuditLog};

const COLUMNS: &str = "id, user_id, action_type, entity_type, entity_id, details_json, created_at";

/// Page size when the caller gives none.
pub const DEFAULT_LIMIT: i64 = 50;
/// Upper bound on a single page.
pub const MAX_LIMIT: i64 = 500;

pub struct AuditLogRepo;

impl AuditLogRepo {
    pub async fn insert(pool: &PgPool, entry: &CreateAuditLog) -> Result<AuditLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO audit_logs (user_id, action_type, entity_type, entity_id, details_json)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AuditLog>(&query)
            .bind(entry.user_id)
            .bind(&entry.action_type)
            .bind(&entry.entity_type)
            .bind(entry.entity_id)
            .bind(&entry.details_json)
            .fetch_one(pool)
            .await
    }

    /// Newest first, paginated.
    pub async fn query(pool: &PgPool, params: &AuditQuery) -> Result<Vec<AuditLog>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = params.offset.unwrap_or(0).max(0);

        let (where_clause, binds) = build_filter(params);
        let next = binds.len() + 1;
        let query = format!(
            "SELECT {COLUMNS} FROM audit_logs {where_clause}
             ORDER BY created_at DESC, id DESC
             LIMIT ${next} OFFSET ${}",
            next + 1
        );

        let mut q = sqlx::query_as::<_, AuditLog>(&query);
        for value in &binds {
            q = match value {
                BindValue::BigInt(v) => q.bind(*v),
                BindValue::Text(v) => q.bind(v.as_str()),
                BindValue::Timestamp(v) => q.bind(*v),
            };
        }
        q.bind(limit).bind(offset).fetch_all(pool).await
    }

    pub async fn count(pool: &PgPool, params: &AuditQuery) -> Result<i64, sqlx::Error> {
        let (where_clause, binds) = build_filter(params);
        let query = format!("SELECT COUNT(*) FROM audit_logs {where_clause}");

        let mut q = sqlx::query_scalar::<_, i64>(&query);
        for value in &binds {
            q = match value {
                BindValue::BigInt(v) => q.bind(*v),
                BindValue::Text(v) => q.bind(v.as_str()),
                BindValue::Timestamp(v) => q.bind(*v),
            };
        }
        q.fetch_one(pool).await
    }
}

enum BindValue {
    BigInt(i64),
    Text(String),
    Timestamp(Timestamp),
}

fn build_filter(params: &AuditQuery) -> (String, Vec<BindValue>) {
    let mut conditions: Vec<String> = Vec::new();
    let mut binds: Vec<BindValue> = Vec::new();

    let mut push = |column: &str, op: &str, value: BindValue| {
        binds.push(value);
        conditions.push(format!("{column} {op} ${}", binds.len()));
    };

    if let Some(user_id) = params.user_id {
        push("user_id", "=", BindValue::BigInt(user_id));
    }
    if let Some(ref action_type) = params.action_type {
        push("action_type", "=", BindValue::Text(action_type.clone()));
    }
    if let Some(ref entity_type) = params.entity_type {
        push("entity_type", "=", BindValue::Text(entity_type.clone()));
    }
    if let Some(entity_id) = params.entity_id {
        push("entity_id", "=", BindValue::BigInt(entity_id));
    }
    if let Some(from) = params.from {
        push("created_at", ">=", BindValue::Timestamp(from));
    }
    if let Some(to) = params.to {
        push("created_at", "<=", BindValue::Timestamp(to));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    (where_clause, binds)
}
