//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from a table description.

use crate::model::Table;
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL (safe: only from static table descriptions).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// Placeholder for one param, with an explicit cast when the column declares one.
fn placeholder(table: &Table, column: &str, n: usize) -> String {
    match table.pg_type_of(column) {
        Some(ty) => format!("${}::{}", n, ty),
        None => format!("${}", n),
    }
}

fn column_list(table: &Table) -> String {
    table
        .columns
        .iter()
        .map(|c| quoted(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// SELECT by primary key.
pub fn select_by_id(table: &Table, id: Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(id);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        column_list(table),
        quoted(table.name),
        quoted(table.pk),
        placeholder(table, table.pk, n)
    );
    q
}

/// SELECT list with optional equality filters, ORDER BY pk, LIMIT/OFFSET.
/// Filters naming unknown columns are ignored; params bind in filter order.
pub fn select_list(table: &Table, filters: &[(&str, Value)], limit: u32, offset: u32) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut where_parts = Vec::new();
    for (col, val) in filters {
        if !table.has_column(col) {
            continue;
        }
        let n = q.push_param(val.clone());
        where_parts.push(format!("{} = {}", quoted(col), placeholder(table, col, n)));
    }
    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {} LIMIT {} OFFSET {}",
        column_list(table),
        quoted(table.name),
        where_clause,
        quoted(table.pk),
        limit,
        offset
    );
    q
}

/// INSERT the body's columns, RETURNING all columns so server-generated
/// fields come back. Columns absent from the body are omitted so the
/// database applies its defaults; body keys outside the table are ignored.
pub fn insert(table: &Table, body: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in table.columns {
        let Some(val) = body.get(*c) else { continue };
        let n = q.push_param(val.clone());
        cols.push(quoted(c));
        placeholders.push(placeholder(table, c, n));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        quoted(table.name),
        cols.join(", "),
        placeholders.join(", "),
        column_list(table)
    );
    q
}

/// UPDATE by id: SET only columns present in body (never the pk), RETURNING
/// all columns. An empty effective body degenerates to a plain re-select.
pub fn update(table: &Table, id: Value, body: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for c in table.columns {
        if *c == table.pk {
            continue;
        }
        let Some(val) = body.get(*c) else { continue };
        let n = q.push_param(val.clone());
        sets.push(format!("{} = {}", quoted(c), placeholder(table, c, n)));
    }
    if sets.is_empty() {
        return select_by_id(table, id);
    }
    let id_n = q.push_param(id);
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        quoted(table.name),
        sets.join(", "),
        quoted(table.pk),
        placeholder(table, table.pk, id_n),
        column_list(table)
    );
    q
}

/// DELETE by id, RETURNING the deleted row.
pub fn delete(table: &Table, id: Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(id);
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING {}",
        quoted(table.name),
        quoted(table.pk),
        placeholder(table, table.pk, n),
        column_list(table)
    );
    q
}
