//! Database helpers for accounts and the DigiLocker directory.
//!
//! Status changes are single-row updates; nothing here coordinates
//! concurrent writers.

use crate::onboarding::{kyc::normalize_phone, AccountStatus, DigiLockerRecord};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::{info_span, Instrument, Span};
use utoipa::ToSchema;

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub phone: String,
    pub status: AccountStatus,
}

fn db_span(operation: &str, statement: &str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn user_from_row(row: &PgRow) -> Result<UserRecord> {
    let status: String = row.try_get("status")?;
    Ok(UserRecord {
        id: row.try_get("id")?,
        phone: row.try_get("phone")?,
        status: status.parse().map_err(|err: String| anyhow!(err))?,
    })
}

/// Create tables and seed the DigiLocker directory.
pub async fn apply_schema(pool: &PgPool) -> Result<()> {
    for (index, statement) in split_sql_statements(SCHEMA_SQL).iter().enumerate() {
        sqlx::query(statement)
            .execute(pool)
            .instrument(db_span("DDL", "schema.sql"))
            .await
            .with_context(|| format!("failed to execute schema statement {}", index + 1))?;
    }

    Ok(())
}

/// Split a SQL script on statement-terminating lines, dropping comments.
pub(crate) fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}

pub async fn find_user_by_phone(pool: &PgPool, phone: &str) -> Result<Option<UserRecord>> {
    let query = "SELECT id, phone, status FROM users WHERE phone = $1";
    let row = sqlx::query(query)
        .bind(phone)
        .fetch_optional(pool)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to lookup user by phone")?;

    row.as_ref().map(user_from_row).transpose()
}

/// Insert a `pending` account; a no-op when the phone is already known.
pub async fn create_pending_user(pool: &PgPool, phone: &str) -> Result<bool> {
    let query = "INSERT INTO users (phone, status) VALUES ($1, 'pending') ON CONFLICT (phone) DO NOTHING";
    let result = sqlx::query(query)
        .bind(phone)
        .execute(pool)
        .instrument(db_span("INSERT", query))
        .await
        .context("failed to create user")?;

    Ok(result.rows_affected() == 1)
}

pub async fn set_status_by_phone(pool: &PgPool, phone: &str, status: AccountStatus) -> Result<bool> {
    let query = "UPDATE users SET status = $2, updated_at = NOW() WHERE phone = $1";
    let result = sqlx::query(query)
        .bind(phone)
        .bind(status.as_str())
        .execute(pool)
        .instrument(db_span("UPDATE", query))
        .await
        .context("failed to update user status by phone")?;

    Ok(result.rows_affected() > 0)
}

/// Returns false when no account has this id.
pub async fn set_status_by_id(pool: &PgPool, id: i64, status: AccountStatus) -> Result<bool> {
    let query = "UPDATE users SET status = $2, updated_at = NOW() WHERE id = $1";
    let result = sqlx::query(query)
        .bind(id)
        .bind(status.as_str())
        .execute(pool)
        .instrument(db_span("UPDATE", query))
        .await
        .context("failed to update user status by id")?;

    Ok(result.rows_affected() > 0)
}

pub async fn list_users_by_status(pool: &PgPool, status: AccountStatus) -> Result<Vec<UserRecord>> {
    let query = "SELECT id, phone, status FROM users WHERE status = $1 ORDER BY id";
    let rows = sqlx::query(query)
        .bind(status.as_str())
        .fetch_all(pool)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to list users")?;

    rows.iter().map(user_from_row).collect()
}

pub async fn delete_all_users(pool: &PgPool) -> Result<u64> {
    let query = "DELETE FROM users";
    let result = sqlx::query(query)
        .execute(pool)
        .instrument(db_span("DELETE", query))
        .await
        .context("failed to delete users")?;

    Ok(result.rows_affected())
}

/// Look up a DigiLocker account by Aadhaar number or registered mobile.
/// Mobiles are stored under their canonical phone key.
pub async fn find_digilocker_record(
    pool: &PgPool,
    digilocker_id: &str,
) -> Result<Option<DigiLockerRecord>> {
    let query = r"
        SELECT aadhaar, mobile, name, dob, pan
        FROM digilocker_users
        WHERE aadhaar = $1 OR mobile = $2
        ORDER BY id
        LIMIT 1
    ";
    let row = sqlx::query(query)
        .bind(digilocker_id.trim())
        .bind(normalize_phone(digilocker_id))
        .fetch_optional(pool)
        .instrument(db_span("SELECT", "digilocker_users by aadhaar or mobile"))
        .await
        .context("failed to lookup DigiLocker record")?;

    row.map(|row| -> Result<DigiLockerRecord> {
        Ok(DigiLockerRecord {
            aadhaar: row.try_get("aadhaar")?,
            mobile: row.try_get("mobile")?,
            name: row.try_get("name")?,
            dob: row.try_get("dob")?,
            pan: row.try_get("pan")?,
        })
    })
    .transpose()
}
