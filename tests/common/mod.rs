#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use rusqlite::Connection;
use sqlite_select::sqlite::{SqliteConfig, SqlitePool};
use sqlite_select::{
    AcquireError, ConnectionManager, DataType, Datastore, ModelDefinition, ReleaseError,
    TableDefinition,
};
use tempfile::TempDir;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Initialize the database schema and seed rows
fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE people (
            id INTEGER PRIMARY KEY,
            age INTEGER
        );
        INSERT INTO people (id, age) VALUES (1, 25), (2, 40);

        CREATE TABLE users (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            age INTEGER,
            active INTEGER NOT NULL,
            profile TEXT,
            joined_at TEXT,
            balance TEXT
        );
        INSERT INTO users (id, name, age, active, profile, joined_at, balance) VALUES
            (1, 'ada',   25,   1, '{"langs":["en"]}', '2021-03-04 05:06:07',  '10.5'),
            (2, 'grace', 40,   0, NULL,               '2020-01-01T00:00:00Z', '3'),
            (3, 'linus', 33,   1, '[1,2]',            NULL,                   NULL),
            (4, 'mar_y', NULL, 0, 'not json',         '2022-02-02',           '7.25'),
            (5, 'Alan',  52,   1, '{}',               NULL,                   '0');
        "#,
    )
}

pub fn users_table() -> TableDefinition {
    TableDefinition::new("users")
        .column("id", DataType::Integer)
        .column("name", DataType::Text)
        .column("age", DataType::Integer)
        .column("active", DataType::Boolean)
        .column("profile", DataType::Json)
        .column("joined_at", DataType::DateTime)
        .column("balance", DataType::Real)
}

pub fn people_table() -> TableDefinition {
    TableDefinition::new("people")
        .column("id", DataType::Integer)
        .column("age", DataType::Integer)
}

/// A seeded file-backed database and its config. Keep the `TempDir` alive.
pub fn create_temp_db() -> (SqliteConfig, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("select.db");
    let conn = Connection::open(&path).unwrap();
    initialize_schema(&conn).unwrap();
    drop(conn);
    (SqliteConfig::new(path.to_str().unwrap()).with_pool_size(2), dir)
}

pub fn with_registries<M>(datastore: Datastore<M>) -> Datastore<M> {
    datastore
        .with_model(ModelDefinition::new("users").with_primary_key("id"))
        .with_model(ModelDefinition::new("people").with_primary_key("id"))
        .with_table(users_table())
        .with_table(people_table())
}

pub fn sqlite_datastore() -> (Datastore<SqlitePool>, TempDir) {
    let (config, dir) = create_temp_db();
    let datastore = with_registries(Datastore::open("default", &config).unwrap());
    (datastore, dir)
}

/// Wraps a manager and counts acquire attempts and releases.
pub struct CountingManager<M> {
    inner: M,
    acquired: AtomicUsize,
    released: AtomicUsize,
    fail_acquire: bool,
}

impl<M> CountingManager<M> {
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
            fail_acquire: false,
        }
    }

    pub fn failing(inner: M) -> Self {
        Self {
            fail_acquire: true,
            ..Self::new(inner)
        }
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<M: ConnectionManager> ConnectionManager for CountingManager<M> {
    type Connection = M::Connection;

    async fn acquire(&self) -> Result<Self::Connection, AcquireError> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        if self.fail_acquire {
            return Err(AcquireError::Other(anyhow::anyhow!("pool exhausted")));
        }
        self.inner.acquire().await
    }

    async fn release(&self, connection: Self::Connection) -> Result<(), ReleaseError> {
        self.released.fetch_add(1, Ordering::SeqCst);
        self.inner.release(connection).await
    }
}

pub fn counting_datastore() -> (Datastore<CountingManager<SqlitePool>>, TempDir) {
    let (config, dir) = create_temp_db();
    let pool = SqlitePool::open(&config).unwrap();
    let datastore = with_registries(Datastore::new("counted", CountingManager::new(pool)));
    (datastore, dir)
}
