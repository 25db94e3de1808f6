//! Datastore handle, model/schema registries and the schema resolver.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{Registry, SelectError};

/// Namespace used when a model does not override it. SQLite calls the
/// primary attached database `main`.
pub const DEFAULT_SCHEMA_NAME: &str = "main";

/// Logical column types the normalizer coerces raw values into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Integer,
    Real,
    Text,
    Blob,
    Boolean,
    DateTime,
    Json,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Physical column schema of one table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, name: &str, data_type: DataType) -> Self {
        self.columns.push(ColumnDefinition::new(name, data_type));
        self
    }
}

/// Column-schema registry keyed by table name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Vec<TableDefinition>")]
pub struct Schema {
    tables: HashMap<String, TableDefinition>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(mut self, table: TableDefinition) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    pub fn table(&self, name: &str) -> Option<&TableDefinition> {
        self.tables.get(name)
    }
}

impl From<Vec<TableDefinition>> for Schema {
    fn from(tables: Vec<TableDefinition>) -> Self {
        tables.into_iter().fold(Self::new(), Self::add_table)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMeta {
    /// Overrides [`DEFAULT_SCHEMA_NAME`] for this model.
    #[serde(default)]
    pub schema_name: Option<String>,
}

/// Per-table model metadata.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDefinition {
    pub table_name: String,
    #[serde(default)]
    pub primary_key: Option<String>,
    #[serde(default)]
    pub meta: ModelMeta,
}

impl ModelDefinition {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            primary_key: None,
            meta: ModelMeta::default(),
        }
    }

    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = Some(column.into());
        self
    }

    pub fn with_schema_name(mut self, schema_name: impl Into<String>) -> Self {
        self.meta.schema_name = Some(schema_name.into());
        self
    }
}

/// Configuration/manager pair identifying one physical backend, plus the
/// registries describing the tables it serves.
#[derive(Debug)]
pub struct Datastore<M> {
    identity: String,
    manager: M,
    models: HashMap<String, ModelDefinition>,
    schema: Schema,
}

impl<M> Datastore<M> {
    pub fn new(identity: impl Into<String>, manager: M) -> Self {
        Self {
            identity: identity.into(),
            manager,
            models: HashMap::new(),
            schema: Schema::new(),
        }
    }

    pub fn with_model(mut self, model: ModelDefinition) -> Self {
        self.models.insert(model.table_name.clone(), model);
        self
    }

    pub fn with_table(mut self, table: TableDefinition) -> Self {
        self.schema = self.schema.add_table(table);
        self
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    pub fn model(&self, table_name: &str) -> Option<&ModelDefinition> {
        self.models.get(table_name)
    }

    pub fn table_schema(&self, table_name: &str) -> Option<&TableDefinition> {
        self.schema.table(table_name)
    }
}

/// Registry entries for one table, with the effective namespace applied.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedTable<'a> {
    pub model: &'a ModelDefinition,
    pub columns: &'a TableDefinition,
    pub schema_name: &'a str,
}

/// Looks up the model and column schema for `table_name`.
///
/// The model registry is checked before the schema registry; either one
/// missing makes the datastore invalid for this request.
pub fn resolve<'a, M>(
    datastore: &'a Datastore<M>,
    table_name: &str,
) -> Result<ResolvedTable<'a>, SelectError> {
    let invalid = |missing| SelectError::InvalidDatastore {
        table: table_name.to_string(),
        missing,
    };

    let model = datastore.model(table_name).ok_or_else(|| invalid(Registry::Models))?;
    let schema_name = model
        .meta
        .schema_name
        .as_deref()
        .unwrap_or(DEFAULT_SCHEMA_NAME);
    let columns = datastore
        .table_schema(table_name)
        .ok_or_else(|| invalid(Registry::Schema))?;

    Ok(ResolvedTable {
        model,
        columns,
        schema_name,
    })
}
