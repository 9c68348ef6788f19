//! Convert serde_json::Value to values sqlx can bind.

use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::{Database, Type};

/// A value bindable to a PostgreSQL query, converted from serde_json::Value.
/// Strings that parse as UUIDs bind as native uuids so pk comparisons work
/// without a cast.
#[derive(Clone, Debug)]
pub enum BindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Uuid(uuid::Uuid),
    Json(Value),
}

impl From<&Value> for BindValue {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => BindValue::Null,
            Value::Bool(b) => BindValue::Bool(*b),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => BindValue::I64(i),
                (None, Some(f)) => BindValue::F64(f),
                (None, None) => BindValue::Null,
            },
            Value::String(s) => match uuid::Uuid::parse_str(s) {
                Ok(u) => BindValue::Uuid(u),
                Err(_) => BindValue::String(s.clone()),
            },
            Value::Array(_) | Value::Object(_) => BindValue::Json(v.clone()),
        }
    }
}

impl<'q> Encode<'q, Postgres> for BindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        match self {
            BindValue::Null => <Option<String> as Encode<Postgres>>::encode_by_ref(&None, buf),
            BindValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf),
            BindValue::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf),
            BindValue::F64(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf),
            BindValue::String(s) => <String as Encode<Postgres>>::encode_by_ref(s, buf),
            BindValue::Uuid(u) => <uuid::Uuid as Encode<Postgres>>::encode_by_ref(u, buf),
            BindValue::Json(v) => <Value as Encode<Postgres>>::encode_by_ref(v, buf),
        }
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            BindValue::Null => <String as Type<Postgres>>::type_info(),
            BindValue::Bool(_) => <bool as Type<Postgres>>::type_info(),
            BindValue::I64(_) => <i64 as Type<Postgres>>::type_info(),
            BindValue::F64(_) => <f64 as Type<Postgres>>::type_info(),
            BindValue::String(_) => <String as Type<Postgres>>::type_info(),
            BindValue::Uuid(_) => <uuid::Uuid as Type<Postgres>>::type_info(),
            BindValue::Json(_) => <Value as Type<Postgres>>::type_info(),
        })
    }
}

impl Type<Postgres> for BindValue {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }
}
