//! Association expansion
//!
//! `insert("user", ..).associate({"accounts": {..}})` turns into
//!
//! ```sql
//! with "user" as (insert into "user" (...) values (...) returning "id"),
//!      "account" as (insert into "account" (...) values (...) returning "id")
//! insert into "user_account" ("user_id", "account_id")
//! select "user"."id", "account"."id" from "user" cross join "account"
//! ```
//!
//! The join row reads both generated keys from the CTEs, so it never holds a
//! literal key even when the caller supplied one.

use tracing::debug;

use super::insert::{insert_stmt, InsertBuilder};
use super::AssociationMap;
use crate::ast::{
    rewrite, Expr, FromClause, Ident, InsertStmt, InsertValues, SelectColumn, SelectStmt, Stmt,
};
use crate::error::{BuildResult, SchemaError, UnsupportedOperation};
use crate::schema::{Association, AssociationDef};

impl<'s> InsertBuilder<'s> {
    /// Insert a related row through an MxN association and link it to this
    /// one
    ///
    /// Exactly one association is accepted per call. The returned builder
    /// targets the associative table, so a following `returning` applies to
    /// the join insert.
    pub fn associate(&self, associations: &AssociationMap) -> BuildResult<Self> {
        let (name, values) = match associations.first() {
            Some(entry) if associations.len() == 1 => entry,
            _ => {
                return Err(UnsupportedOperation::AssociationFanOut {
                    count: associations.len(),
                }
                .into())
            }
        };

        let owner = self.table.as_str();
        let def = match self.schema.association(owner, name)? {
            Association::MxN(def) => def,
            other => {
                return Err(UnsupportedOperation::UnsupportedAssociationKind {
                    table: owner.to_string(),
                    association: name.clone(),
                    kind: other.kind(),
                }
                .into())
            }
        };
        if def.table == owner {
            return Err(UnsupportedOperation::SelfAssociation {
                table: owner.to_string(),
                association: name.clone(),
            }
            .into());
        }

        let owner_keys = referenced_idents(def, owner, name)?;
        let associated_keys = referenced_idents(def, &def.table, name)?;

        debug!(
            owner,
            association = %name,
            associated = %def.table,
            associative_table = %def.associative_table,
            "Expanding MxN association"
        );

        // An owner that is already a WITH chain keeps its bindings in front;
        // returning lands on its body, the owner insert itself
        let owner_stmt = rewrite::with_returning(&self.stmt, &owner_keys)?;
        let associated_stmt = rewrite::with_returning(
            &Stmt::Insert(insert_stmt(self.schema, &def.table, values)?),
            &associated_keys,
        )?;
        let join = join_insert(self, def, owner)?;

        let stmt = rewrite::insert_with(
            def.table.as_str(),
            &associated_stmt,
            &rewrite::insert_with(owner, &owner_stmt, &Stmt::Insert(join))?,
        )?;

        Ok(Self {
            schema: self.schema,
            table: def.associative_table.clone(),
            stmt,
        })
    }
}

/// `insert into <associative> (<fk columns>) select <alias>.<key>, ... from
/// <owner> cross join <associated>`
fn join_insert(builder: &InsertBuilder<'_>, def: &AssociationDef, owner: &str) -> BuildResult<InsertStmt> {
    builder
        .schema
        .table(&def.associative_table)?
        .ensure_columns(&def.associative_table, def.fks.keys().map(String::as_str))?;

    let columns: Vec<Ident> = def.fks.keys().map(Ident::new).collect();
    let selected: Vec<SelectColumn> = def
        .fks
        .values()
        .map(|fk| SelectColumn::expr(Expr::qualified_column(fk.table.as_str(), fk.column.as_str())))
        .collect();
    let source = SelectStmt::columns(selected)
        .with_from(FromClause::table(owner).cross_join(FromClause::table(def.table.as_str())));

    Ok(
        InsertStmt::new(def.associative_table.as_str(), columns, InsertValues::Query(Box::new(source)))
            .with_schema(builder.schema.namespace_ident()),
    )
}

/// Key columns of `table` the association's foreign keys point at
fn referenced_idents(def: &AssociationDef, table: &str, name: &str) -> BuildResult<Vec<Ident>> {
    let idents: Vec<Ident> = def.referenced_columns(table).map(Ident::new).collect();
    if idents.is_empty() {
        return Err(SchemaError::Invalid(format!(
            "association {} has no foreign key referencing {}",
            name, table
        ))
        .into());
    }
    Ok(idents)
}
