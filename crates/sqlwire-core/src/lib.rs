//! Core types for sqlwire.
//!
//! This crate provides the surface shared between the wire-protocol engine
//! and anything consuming it (bindings, pools, application code):
//!
//! - `Error` — the classified error taxonomy every failure is reported as
//! - `Value` — dynamically-typed SQL values decoded from result sets
//! - `Row` / `ColumnInfo` — ordered row data with shared column metadata

pub mod error;
pub mod row;
pub mod value;

pub use error::{Error, ErrorClass, ErrorKind, Result};
pub use row::{ColumnInfo, FromValue, Row};
pub use value::Value;
