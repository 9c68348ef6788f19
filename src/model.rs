//! The record abstraction every persisted entity implements.

use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::FromRow;

/// Static description of the table backing a [`Record`] type.
#[derive(Debug, Clone, Copy)]
pub struct Table {
    /// Table name (optionally schema-qualified).
    pub name: &'static str,
    /// Primary key column. Single-column keys only.
    pub pk: &'static str,
    /// All columns, selected and returned by every operation. Body keys
    /// outside this list are ignored when building statements.
    pub columns: &'static [&'static str],
    /// Columns whose bind placeholders need an explicit `$n::type` cast
    /// (timestamps, enums). Most columns bind without one.
    pub pg_types: &'static [(&'static str, &'static str)],
    /// Columns covered by a UNIQUE constraint. Consulted when translating
    /// a uniqueness violation into a field error.
    pub unique_keys: &'static [&'static str],
}

impl Table {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| *c == name)
    }

    pub fn pg_type_of(&self, column: &str) -> Option<&'static str> {
        self.pg_types
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, ty)| *ty)
    }
}

/// A persisted entity. Implemented once per table; the CRUD engine is
/// generic over implementations of this trait.
pub trait Record: for<'r> FromRow<'r, PgRow> + Send + Sync + Unpin {
    /// Primary key type. Serialized for binding, so integer and uuid keys
    /// both work.
    type Id: Serialize + Send + Sync;

    /// Human-readable entity name, used in not-found messages.
    const NAME: &'static str;

    /// Backing table description.
    const TABLE: Table;

    fn id(&self) -> Self::Id;
}
