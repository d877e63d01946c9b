//! Schema registry
//!
//! Describes the tables statements are built against: key columns, all
//! columns, and named associations to other tables. A [`Schema`] is loaded
//! once (from JSON or built in code), validated, and then only read. Builders
//! borrow it explicitly; there is no global registry.
//!
//! ```json
//! {
//!   "tables": {
//!     "user": {
//!       "keys": ["id"],
//!       "columns": ["id", "data"],
//!       "associations": {
//!         "accounts": {
//!           "kind": "MxN",
//!           "table": "account",
//!           "associative_table": "user_account",
//!           "fks": { "user_id": ["user", "id"], "account_id": ["account", "id"] }
//!         }
//!       }
//!     }
//!   }
//! }
//! ```

use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::ast::Ident;
use crate::error::{BuildResult, SchemaError};

/// The whole registry: tables by name
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    /// Database schema that qualifies every table reference, e.g. `public`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub tables: IndexMap<String, TableSchema>,
}

/// One table
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableSchema {
    /// Primary key columns
    pub keys: Vec<String>,
    /// Other column sets with a unique constraint
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternate_keys: Vec<Vec<String>>,
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub associations: IndexMap<String, Association>,
}

/// A named relationship from one table to another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Association {
    /// One-to-many
    #[serde(rename = "N")]
    N(AssociationDef),
    /// Many-to-many through an associative table
    #[serde(rename = "MxN")]
    MxN(AssociationDef),
}

impl Association {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::N(_) => "N",
            Self::MxN(_) => "MxN",
        }
    }

    pub fn def(&self) -> &AssociationDef {
        match self {
            Self::N(def) | Self::MxN(def) => def,
        }
    }
}

/// Tables and foreign keys of an association
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationDef {
    /// The associated table
    pub table: String,
    /// The table holding the foreign keys
    pub associative_table: String,
    /// Foreign key column of the associative table → referenced (table, column)
    pub fks: IndexMap<String, ForeignKey>,
}

impl AssociationDef {
    /// Referenced columns of `table`, in fk declaration order
    pub fn referenced_columns<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a str> {
        self.fks
            .values()
            .filter(move |fk| fk.table == table)
            .map(|fk| fk.column.as_str())
    }
}

/// A `(table, column)` pair; serialized as a two-element array
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
}

impl ForeignKey {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl From<(String, String)> for ForeignKey {
    fn from((table, column): (String, String)) -> Self {
        Self { table, column }
    }
}

impl From<ForeignKey> for (String, String) {
    fn from(fk: ForeignKey) -> Self {
        (fk.table, fk.column)
    }
}

impl Schema {
    /// Parse and validate a JSON schema document
    pub fn from_json_str(json: &str) -> BuildResult<Self> {
        let schema: Schema =
            serde_json::from_str(json).map_err(|e| SchemaError::Parse(e.to_string()))?;
        schema.validate()?;
        Ok(schema)
    }

    /// Read, parse and validate a JSON schema file
    pub fn from_path(path: impl AsRef<Path>) -> BuildResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| SchemaError::Parse(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Add or replace a table, for schemas assembled in code
    pub fn with_table(mut self, name: impl Into<String>, table: TableSchema) -> Self {
        self.tables.insert(name.into(), table);
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// The namespace as an identifier for qualified table references
    pub fn namespace_ident(&self) -> Option<Ident> {
        self.namespace.as_ref().map(Ident::new)
    }

    pub fn table(&self, name: &str) -> BuildResult<&TableSchema> {
        self.tables.get(name).ok_or_else(|| {
            SchemaError::UnknownTable {
                table: name.to_string(),
            }
            .into()
        })
    }

    pub fn association(&self, table: &str, name: &str) -> BuildResult<&Association> {
        self.table(table)?.associations.get(name).ok_or_else(|| {
            SchemaError::UnknownAssociation {
                table: table.to_string(),
                association: name.to_string(),
            }
            .into()
        })
    }

    /// Check internal consistency
    ///
    /// Keys must be columns, associations must point at known tables, and
    /// every foreign key must name a column of the associative table and a
    /// column of the table it references.
    pub fn validate(&self) -> BuildResult<()> {
        for (name, table) in &self.tables {
            if table.keys.is_empty() {
                return Err(invalid(format!("table {} declares no key columns", name)));
            }
            for key in table.keys.iter().chain(table.alternate_keys.iter().flatten()) {
                if !table.has_column(key) {
                    return Err(invalid(format!(
                        "key column {} is not a column of table {}",
                        key, name
                    )));
                }
            }
            for (assoc_name, association) in &table.associations {
                self.validate_association(name, assoc_name, association)?;
            }
        }
        Ok(())
    }

    fn validate_association(
        &self,
        owner: &str,
        name: &str,
        association: &Association,
    ) -> BuildResult<()> {
        let def = association.def();
        let context = |detail: String| invalid(format!("association {}.{}: {}", owner, name, detail));

        if !self.tables.contains_key(&def.table) {
            return Err(context(format!("unknown table {}", def.table)));
        }
        let associative = self
            .tables
            .get(&def.associative_table)
            .ok_or_else(|| context(format!("unknown table {}", def.associative_table)))?;

        for (column, fk) in &def.fks {
            if !associative.has_column(column) {
                return Err(context(format!(
                    "{} is not a column of {}",
                    column, def.associative_table
                )));
            }
            let referenced = self
                .tables
                .get(&fk.table)
                .ok_or_else(|| context(format!("fk {} references unknown table {}", column, fk.table)))?;
            if !referenced.has_column(&fk.column) {
                return Err(context(format!(
                    "fk {} references unknown column {}.{}",
                    column, fk.table, fk.column
                )));
            }
        }

        if let Association::MxN(_) = association {
            if def.fks.len() != 2 {
                return Err(context(format!(
                    "MxN associations need exactly two fks, found {}",
                    def.fks.len()
                )));
            }
            for side in [owner, def.table.as_str()] {
                if !def.fks.values().any(|fk| fk.table == side) {
                    return Err(context(format!("no fk references {}", side)));
                }
            }
        }
        Ok(())
    }
}

fn invalid(detail: String) -> crate::error::BuildError {
    SchemaError::Invalid(detail).into()
}

impl TableSchema {
    pub fn new<K, C>(keys: K, columns: C) -> Self
    where
        K: IntoIterator,
        K::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            alternate_keys: vec![],
            columns: columns.into_iter().map(Into::into).collect(),
            associations: IndexMap::new(),
        }
    }

    pub fn with_alternate_key<K>(mut self, key: K) -> Self
    where
        K: IntoIterator,
        K::Item: Into<String>,
    {
        self.alternate_keys
            .push(key.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_association(mut self, name: impl Into<String>, association: Association) -> Self {
        self.associations.insert(name.into(), association);
        self
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Fail with `UnknownColumn` on the first name that is not a column
    pub fn ensure_columns<'a>(
        &self,
        table: &str,
        columns: impl IntoIterator<Item = &'a str>,
    ) -> BuildResult<()> {
        for column in columns {
            if !self.has_column(column) {
                return Err(SchemaError::UnknownColumn {
                    table: table.to_string(),
                    column: column.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Whether `columns` is exactly the primary key or an alternate key,
    /// ignoring order
    pub fn is_key<'a>(&self, columns: impl IntoIterator<Item = &'a str>) -> bool {
        let wanted: IndexSet<&str> = columns.into_iter().collect();
        std::iter::once(&self.keys)
            .chain(self.alternate_keys.iter())
            .any(|key| {
                key.len() == wanted.len() && key.iter().all(|c| wanted.contains(c.as_str()))
            })
    }
}
