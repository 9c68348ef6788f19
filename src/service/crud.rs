//! Generic CRUD execution against PostgreSQL.
//!
//! One [`Crud`] instance serves one record type for the life of the process;
//! all per-call state lives in the caller's session, so a single instance is
//! safe to share across concurrent units of work.
//!
//! The engine trusts its callers: input schemas are validated before
//! invocation, and the session lifecycle (and any retry) belongs to the
//! caller. Each mutating operation is a single `INSERT`/`UPDATE`/`DELETE ...
//! RETURNING` statement, so the commit point is statement execution and
//! RETURNING picks up server-generated fields.

use crate::config::Settings;
use crate::error::{AppError, FieldError};
use crate::model::Record;
use crate::sql::{self, BindValue, QueryBuf};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::PgConnection;
use std::marker::PhantomData;

/// PostgreSQL SQLSTATE for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

/// Update payload: a full input schema, or a partial field-to-value map.
///
/// Schema inputs mark optional fields with `skip_serializing_if`, so unset
/// fields never reach the statement; a field map is the way to set a column
/// to NULL explicitly.
pub enum Patch<'a, U> {
    Schema(&'a U),
    Fields(Map<String, Value>),
}

impl<'a, U> From<&'a U> for Patch<'a, U> {
    fn from(schema: &'a U) -> Self {
        Patch::Schema(schema)
    }
}

impl<U> From<Map<String, Value>> for Patch<'_, U> {
    fn from(fields: Map<String, Value>) -> Self {
        Patch::Fields(fields)
    }
}

/// Reusable CRUD operations for one record type `M` with create schema `C`
/// and update schema `U`.
pub struct Crud<M, C, U> {
    page_ceiling: u32,
    _marker: PhantomData<fn() -> (M, C, U)>,
}

impl<M, C, U> Crud<M, C, U>
where
    M: Record,
    C: Serialize,
    U: Serialize,
{
    /// The pagination ceiling comes from settings; no caller can page past it.
    pub fn new(settings: &Settings) -> Self {
        Self::with_page_ceiling(settings.page_size)
    }

    pub fn with_page_ceiling(page_ceiling: u32) -> Self {
        Crud {
            page_ceiling,
            _marker: PhantomData,
        }
    }

    /// Insert a new record from a validated input schema. Returns the stored
    /// row, including server-generated fields.
    pub async fn create(&self, session: &mut PgConnection, input: &C) -> Result<M, AppError> {
        let body = field_map(input)?;
        let q = sql::insert(&M::TABLE, &body);
        Ok(fetch_one::<M>(session, &q).await?)
    }

    /// Look up one record by primary key. Absence is `None`, never an error.
    pub async fn read(
        &self,
        session: &mut PgConnection,
        id: &M::Id,
    ) -> Result<Option<M>, AppError> {
        let q = sql::select_by_id(&M::TABLE, id_value(id)?);
        Ok(fetch_optional::<M>(session, &q).await?)
    }

    /// Same lookup, but absence becomes a NotFound error naming the record
    /// type. Use this when exactly one record must exist.
    pub async fn read_or_fail(&self, session: &mut PgConnection, id: &M::Id) -> Result<M, AppError> {
        self.read(session, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} not found", M::NAME)))
    }

    /// List records with optional equality filters, ordered by primary key.
    /// `limit` is clamped to the configured page ceiling regardless of what
    /// the caller asks for.
    pub async fn read_many(
        &self,
        session: &mut PgConnection,
        filters: &[(&str, Value)],
        skip: u32,
        limit: Option<u32>,
    ) -> Result<Vec<M>, AppError> {
        let limit = self.clamp_limit(limit);
        let q = sql::select_list(&M::TABLE, filters, limit, skip);
        Ok(fetch_all::<M>(session, &q).await?)
    }

    /// Apply a partial update to an existing record: exactly the fields
    /// present in the patch are written, the rest are left untouched.
    /// Returns the refreshed row.
    pub async fn update(
        &self,
        session: &mut PgConnection,
        record: &M,
        patch: Patch<'_, U>,
    ) -> Result<M, AppError> {
        let body = match patch {
            Patch::Schema(schema) => field_map(schema)?,
            Patch::Fields(fields) => fields,
        };
        let q = sql::update(&M::TABLE, id_value(&record.id())?, &body);
        Ok(fetch_one::<M>(session, &q).await?)
    }

    /// Delete by primary key. Returns the deleted row, or `None` when no row
    /// matched (same convention as `read`).
    pub async fn delete(
        &self,
        session: &mut PgConnection,
        id: &M::Id,
    ) -> Result<Option<M>, AppError> {
        let q = sql::delete(&M::TABLE, id_value(id)?);
        Ok(fetch_optional::<M>(session, &q).await?)
    }

    /// Translate a unique-constraint violation into a field error naming the
    /// declared unique column that triggered it.
    ///
    /// The constraint identifier reported by the driver is consulted first
    /// (PostgreSQL names unique indexes `{table}_{column}_key`); searching
    /// the raw message text is the fallback, and depends on the driver's
    /// wording. Any error this method cannot explain is returned unchanged.
    ///
    /// Calling this for a record type that declares no unique keys is a
    /// programming error and asserts.
    pub fn parse_uniqueness_violation(&self, error: sqlx::Error) -> Result<FieldError, sqlx::Error> {
        assert!(
            !M::TABLE.unique_keys.is_empty(),
            "{} declares no unique keys",
            M::NAME
        );
        let Some(db_err) = error.as_database_error() else {
            return Err(error);
        };
        if db_err.code().as_deref() != Some(UNIQUE_VIOLATION) {
            return Err(error);
        }
        match match_unique_key(M::TABLE.unique_keys, db_err.constraint(), db_err.message()) {
            Some(key) => Ok(FieldError::already_exists(key)),
            None => Err(error),
        }
    }

    fn clamp_limit(&self, limit: Option<u32>) -> u32 {
        limit.unwrap_or(self.page_ceiling).min(self.page_ceiling)
    }
}

/// Serialize an input schema to its field map. Fields skipped during
/// serialization (unset optionals) do not appear and are never written.
fn field_map<T: Serialize>(input: &T) -> Result<Map<String, Value>, AppError> {
    match serde_json::to_value(input) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::Validation("input must serialize to an object".into())),
        Err(e) => Err(AppError::Validation(e.to_string())),
    }
}

fn id_value<I: Serialize>(id: &I) -> Result<Value, AppError> {
    serde_json::to_value(id).map_err(|e| AppError::Validation(e.to_string()))
}

fn match_unique_key(
    keys: &'static [&'static str],
    constraint: Option<&str>,
    message: &str,
) -> Option<&'static str> {
    if let Some(constraint) = constraint {
        if let Some(key) = keys.iter().find(|k| constraint.contains(**k)) {
            return Some(key);
        }
    }
    keys.iter().find(|k| message.contains(**k)).copied()
}

async fn fetch_one<M: Record>(session: &mut PgConnection, q: &QueryBuf) -> Result<M, sqlx::Error> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query_as::<_, M>(&q.sql);
    for p in &q.params {
        query = query.bind(BindValue::from(p));
    }
    query.fetch_one(&mut *session).await
}

async fn fetch_optional<M: Record>(
    session: &mut PgConnection,
    q: &QueryBuf,
) -> Result<Option<M>, sqlx::Error> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query_as::<_, M>(&q.sql);
    for p in &q.params {
        query = query.bind(BindValue::from(p));
    }
    query.fetch_optional(&mut *session).await
}

async fn fetch_all<M: Record>(
    session: &mut PgConnection,
    q: &QueryBuf,
) -> Result<Vec<M>, sqlx::Error> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query_as::<_, M>(&q.sql);
    for p in &q.params {
        query = query.bind(BindValue::from(p));
    }
    query.fetch_all(&mut *session).await
}
