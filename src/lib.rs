//! Criteria-driven SELECT over pooled SQLite connections for the Runar ecosystem.
//!
//! # Intention
//!
//! - Turn a declarative, backend-agnostic find [`Criteria`] into a compiled
//!   query, run it on one pooled connection, and return typed rows.
//! - Map every stage fault onto one of three caller-visible outcomes
//!   (see [`SelectError`]).
//!
//! # Architectural Boundaries
//!
//! - Read path only: no inserts, updates, deletes, transactions or migrations.
//! - The pool and the dialect sit behind the [`ConnectionManager`] and
//!   [`Dialect`] traits; [`sqlite`] provides both for SQLite.

pub mod connection;
pub mod criteria;
pub mod dialect;
pub mod error;
pub mod normalize;
pub mod schema;
pub mod select;
pub mod sqlite;
pub mod statement;
pub mod translate;
pub mod value;

pub use connection::ConnectionManager;
pub use criteria::Criteria;
pub use dialect::{Dialect, NativeQuery};
pub use error::{
    AcquireError, CompileError, ErrorKind, ExecuteError, Registry, ReleaseError, SelectError,
    Stage, TranslateError,
};
pub use normalize::{normalize, CoercionMiss};
pub use schema::{
    resolve, ColumnDefinition, DataType, Datastore, ModelDefinition, ModelMeta, ResolvedTable,
    Schema, TableDefinition, DEFAULT_SCHEMA_NAME,
};
pub use select::{select, SelectOutput, SelectWarning};
pub use statement::Statement;
pub use translate::translate;
pub use value::{Record, Value};
