//! Parameterized SQL construction for the CRUD engine.

pub mod bind;
pub mod builder;

pub use bind::BindValue;
pub use builder::{delete, insert, select_by_id, select_list, update, QueryBuf};
