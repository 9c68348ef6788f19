//! Round-trip tests for the CRUD engine against a live PostgreSQL.
//!
//! These need a reachable database: `DATABASE_URL=... cargo test -- --ignored`.
//! Every unit of work runs in a rollback session, so nothing persists.

use chrono::{DateTime, Utc};
use crudkit::{with_rollback_session, AppError, Crud, FieldError, Patch, Record, Session, Table};
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;

#[derive(Debug, sqlx::FromRow)]
struct Contact {
    id: i64,
    email: String,
    full_name: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl Record for Contact {
    type Id = i64;
    const NAME: &'static str = "Contact";
    const TABLE: Table = Table {
        name: "crudkit_test_contacts",
        pk: "id",
        columns: &["id", "email", "full_name", "is_active", "created_at"],
        pg_types: &[("created_at", "timestamptz")],
        unique_keys: &["email"],
    };

    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Serialize)]
struct ContactCreate {
    email: String,
    full_name: Option<String>,
    is_active: bool,
}

impl ContactCreate {
    fn new(email: &str) -> Self {
        ContactCreate {
            email: email.into(),
            full_name: Some("Ada Lovelace".into()),
            is_active: true,
        }
    }
}

#[derive(Serialize, Default)]
struct ContactUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_active: Option<bool>,
}

async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
    let pool = PgPool::connect(&url).await.expect("failed to connect");
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS crudkit_test_contacts (
            id BIGSERIAL PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            full_name TEXT,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(&pool)
    .await
    .expect("failed to create fixture table");
    pool
}

fn engine() -> Crud<Contact, ContactCreate, ContactUpdate> {
    Crud::with_page_ceiling(50)
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn create_then_read_round_trips() {
    let pool = pool().await;
    let crud = engine();
    with_rollback_session(&pool, |session: &mut Session| {
        Box::pin(async move {
            let created = crud.create(session, &ContactCreate::new("ada@trip.test")).await?;
            // Server-generated fields come back on the created value itself.
            assert!(created.id > 0);
            assert!(created.created_at <= Utc::now());

            let read = crud.read(session, &created.id()).await?.expect("row must exist");
            assert_eq!(read.email, "ada@trip.test");
            assert_eq!(read.full_name.as_deref(), Some("Ada Lovelace"));
            assert!(read.is_active);
            Ok(())
        })
    })
    .await
    .expect("unit of work failed");
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn read_absent_is_none_and_read_or_fail_is_not_found() {
    let pool = pool().await;
    let crud = engine();
    with_rollback_session(&pool, |session: &mut Session| {
        Box::pin(async move {
            assert!(crud.read(session, &-1).await?.is_none());
            let err = crud.read_or_fail(session, &-1).await.unwrap_err();
            match err {
                AppError::NotFound(msg) => assert_eq!(msg, "Contact not found"),
                other => panic!("expected NotFound, got {other:?}"),
            }
            Ok(())
        })
    })
    .await
    .expect("unit of work failed");
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn partial_update_touches_only_present_fields() {
    let pool = pool().await;
    let crud = engine();
    with_rollback_session(&pool, |session: &mut Session| {
        Box::pin(async move {
            let created = crud.create(session, &ContactCreate::new("ada@patch.test")).await?;

            let patch = ContactUpdate {
                full_name: Some("Countess of Lovelace".into()),
                ..Default::default()
            };
            let updated = crud.update(session, &created, Patch::Schema(&patch)).await?;
            assert_eq!(updated.email, "ada@patch.test");
            assert_eq!(updated.full_name.as_deref(), Some("Countess of Lovelace"));
            assert!(updated.is_active);

            // A field map is how a caller sets a column to NULL explicitly.
            let mut fields = serde_json::Map::new();
            fields.insert("full_name".into(), json!(null));
            let cleared = crud.update(session, &updated, Patch::Fields(fields)).await?;
            assert_eq!(cleared.full_name, None);
            assert_eq!(cleared.email, "ada@patch.test");
            Ok(())
        })
    })
    .await
    .expect("unit of work failed");
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn read_many_clamps_pages_and_filters() {
    let pool = pool().await;
    let crud = engine();
    with_rollback_session(&pool, |session: &mut Session| {
        Box::pin(async move {
            for i in 0..3 {
                let mut input = ContactCreate::new(&format!("user{i}@page.test"));
                input.is_active = i != 2;
                crud.create(session, &input).await?;
            }

            let all = crud.read_many(session, &[], 0, Some(1_000_000)).await?;
            assert_eq!(all.len(), 3);

            let page = crud.read_many(session, &[], 1, Some(1)).await?;
            assert_eq!(page.len(), 1);
            assert_eq!(page[0].email, "user1@page.test");

            let active = crud
                .read_many(session, &[("is_active", json!(true))], 0, None)
                .await?;
            assert_eq!(active.len(), 2);
            Ok(())
        })
    })
    .await
    .expect("unit of work failed");
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn delete_removes_the_row() {
    let pool = pool().await;
    let crud = engine();
    with_rollback_session(&pool, |session: &mut Session| {
        Box::pin(async move {
            let created = crud.create(session, &ContactCreate::new("ada@gone.test")).await?;
            let deleted = crud.delete(session, &created.id()).await?.expect("row was there");
            assert_eq!(deleted.email, "ada@gone.test");
            assert!(crud.read(session, &created.id()).await?.is_none());
            assert!(crud.delete(session, &created.id()).await?.is_none());
            Ok(())
        })
    })
    .await
    .expect("unit of work failed");
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn duplicate_email_parses_to_a_field_error() {
    let pool = pool().await;
    let crud = engine();
    with_rollback_session(&pool, |session: &mut Session| {
        Box::pin(async move {
            crud.create(session, &ContactCreate::new("dup@unique.test")).await?;
            let err = crud
                .create(session, &ContactCreate::new("dup@unique.test"))
                .await
                .unwrap_err();
            let AppError::Db(db_err) = err else {
                panic!("expected a storage error, got {err:?}");
            };
            let field = crud
                .parse_uniqueness_violation(db_err)
                .expect("violation names a declared unique field");
            assert_eq!(field, FieldError::already_exists("email"));
            Ok(())
        })
    })
    .await
    .expect("unit of work failed");
}
