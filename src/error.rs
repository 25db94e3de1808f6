//! Error types for the select pipeline.
//!
//! Every stage has its own fault enum. [`SelectError`] is what crosses back
//! to the caller: exactly one of three discrete outcomes, each carrying the
//! originating [`Stage`] and the underlying cause.

use std::fmt;

use thiserror::Error;

/// Pipeline step a fault originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    Translate,
    Compile,
    Acquire,
    Execute,
    Release,
    Normalize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Resolve => "resolving the table schema",
            Self::Translate => "translating criteria into a statement",
            Self::Compile => "compiling the statement into a query",
            Self::Acquire => "acquiring a connection from the pool",
            Self::Execute => "running the select query",
            Self::Release => "releasing the connection back into the pool",
            Self::Normalize => "normalizing result values",
        };
        f.write_str(label)
    }
}

/// Which datastore registry was missing the requested table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registry {
    Models,
    Schema,
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Models => f.write_str("model"),
            Self::Schema => f.write_str("column schema"),
        }
    }
}

/// Stable discriminant for branching on a [`SelectError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidDatastore,
    BadConnection,
    Internal,
}

/// Caller-visible outcome of a failed select.
#[derive(Debug, Error)]
pub enum SelectError {
    /// The datastore is missing registry entries for the table.
    #[error("invalid datastore: no {missing} registered for table `{table}`")]
    InvalidDatastore { table: String, missing: Registry },

    /// A connection could not be obtained, or failed while in use.
    #[error("bad connection while {stage}: {source}")]
    BadConnection {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },

    /// The criteria could not be translated or compiled.
    #[error("error while {stage}: {source}")]
    Internal {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },
}

impl SelectError {
    pub(crate) fn bad_connection(stage: Stage, source: impl Into<anyhow::Error>) -> Self {
        Self::BadConnection {
            stage,
            source: source.into(),
        }
    }

    pub(crate) fn internal(stage: Stage, source: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            stage,
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidDatastore { .. } => ErrorKind::InvalidDatastore,
            Self::BadConnection { .. } => ErrorKind::BadConnection,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// The stage that failed. Configuration faults always come from resolution.
    pub fn stage(&self) -> Stage {
        match self {
            Self::InvalidDatastore { .. } => Stage::Resolve,
            Self::BadConnection { stage, .. } | Self::Internal { stage, .. } => *stage,
        }
    }

    /// Only infrastructure faults may succeed when the whole select is re-run.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BadConnection { .. })
    }
}

/// Criteria that cannot be expressed as a find statement.
#[derive(Debug, Error, PartialEq)]
pub enum TranslateError {
    #[error("table name must not be empty")]
    EmptyTableName,

    #[error("`where` clause must be an object, got {0}")]
    WhereNotObject(&'static str),

    #[error("`{0}` expects an array")]
    ExpectedArray(String),

    #[error("unknown operator `{operator}` on attribute `{attribute}`")]
    UnknownOperator { attribute: String, operator: String },

    #[error("invalid value for attribute `{attribute}`: {reason}")]
    InvalidValue { attribute: String, reason: String },

    #[error("invalid sort clause: {0}")]
    InvalidSort(String),

    #[error("projection must name at least one attribute")]
    EmptyProjection,
}

/// Statement constructs the target dialect cannot represent.
#[derive(Debug, Error, PartialEq)]
pub enum CompileError {
    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),

    #[error("limit {0} exceeds the dialect's maximum")]
    LimitOutOfRange(u64),

    #[error("offset {0} exceeds the dialect's maximum")]
    OffsetOutOfRange(u64),

    #[error("query binds {0} parameters, more than the dialect allows")]
    TooManyParameters(usize),
}

/// The pool could not hand out a healthy connection.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("acquisition task failed: {0}")]
    Interrupted(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// The backend rejected the query or the connection broke mid-query.
///
/// By the time this is returned the connection has been torn down.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("query task failed: {0}")]
    Interrupted(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Returning a connection to its pool failed.
#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("connection was already invalidated")]
    Invalidated,

    #[error("connection still has an open transaction; discarded instead of pooled")]
    OpenTransaction,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
