//! Generic persistence services.

pub mod crud;

pub use crud::{Crud, Patch};
