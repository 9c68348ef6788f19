//! crudkit: minimal REST API scaffold over PostgreSQL.
//!
//! Env-driven settings, a pooled session provider with scoped acquisition,
//! a generic CRUD engine parameterized over a record type and its input
//! schemas, and a small axum surface with CORS. Resource endpoints are built
//! on top of [`Crud`] per entity.

pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;

pub use config::Settings;
pub use db::{pool, with_rollback_session, with_session, Session};
pub use error::{AppError, ConfigError, FieldError};
pub use model::{Record, Table};
pub use routes::app_router;
pub use service::{Crud, Patch};
pub use state::AppState;
