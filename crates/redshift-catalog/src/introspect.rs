//! Row-to-descriptor mapping over the catalog queries.

use std::sync::OnceLock;

use regex::Regex;
use sqlx::postgres::PgPool;
use sqlx::Row;
use tracing::debug;

use redshift_ddl::constraints::{Relation, StaticCatalog};
use redshift_ddl::descriptor::{
    ColumnDescriptor, ConstraintKind, ConstraintRef, DefaultValue, ForeignRef, LogicalType,
};
use redshift_ddl::error::Result;

use crate::queries;

fn sized_type_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([a-z ]+?)\((\d+)(?:,\s*(\d+))?\)$").expect("static regex"))
}

/// Parses an engine-rendered type string back into a [`LogicalType`].
///
/// Unrecognized types map to [`LogicalType::Text`]: reverse-engineering
/// prefers a lossy descriptor over refusing the whole table.
#[must_use]
pub fn parse_db_type(db_type: &str) -> LogicalType {
    let db_type = db_type.trim().to_ascii_lowercase();
    match db_type.as_str() {
        "smallint" | "int2" => return LogicalType::SmallInt,
        "integer" | "int" | "int4" => return LogicalType::Integer,
        "bigint" | "int8" => return LogicalType::BigInt,
        "double precision" | "float8" | "real" | "float4" => return LogicalType::Float,
        "boolean" | "bool" => return LogicalType::Boolean,
        "date" => return LogicalType::Date,
        "character varying" | "varchar" | "varchar(max)" => return LogicalType::Varchar(None),
        "varbyte" | "binary varying" => return LogicalType::Binary(None),
        "super" => return LogicalType::Json,
        _ => {}
    }
    if db_type.starts_with("time ") || db_type == "time" {
        return LogicalType::Time;
    }
    if db_type.starts_with("timestamp") {
        return LogicalType::DateTime;
    }
    if let Some(captures) = sized_type_re().captures(&db_type) {
        let base = captures.get(1).map_or("", |m| m.as_str());
        let first: u32 = captures
            .get(2)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        match base {
            "character varying" | "varchar" => return LogicalType::Varchar(Some(first)),
            "character" | "char" | "bpchar" => return LogicalType::Char(first),
            "varbyte" | "binary varying" => return LogicalType::Binary(Some(first)),
            "numeric" | "decimal" => {
                let scale: u8 = captures
                    .get(3)
                    .and_then(|m| m.as_str().parse().ok())
                    .unwrap_or(0);
                let precision = u8::try_from(first).unwrap_or(u8::MAX);
                return LogicalType::Decimal(precision, scale);
            }
            _ => {}
        }
    }
    LogicalType::Text
}

/// A constraint as read from the catalog, with the raw foreign-key
/// target still attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntrospectedConstraint {
    /// The constraint itself.
    pub constraint: ConstraintRef,
    /// Foreign key target as `table.column`, for FK constraints.
    pub foreign_target: Option<String>,
}

/// Reads live engine metadata into planner descriptors.
pub struct CatalogIntrospection {
    pool: PgPool,
}

impl CatalogIntrospection {
    /// Creates an introspection adapter over the given pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Reads the column descriptors of a table, in attribute order.
    ///
    /// # Errors
    ///
    /// Passes engine errors through unwrapped.
    pub async fn table_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        debug!(table, "introspecting columns");
        let rows = sqlx::query(queries::TABLE_COLUMNS)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;
        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get("column_name")?;
            let data_type: String = row.try_get("data_type")?;
            let nullable: bool = row.try_get("is_nullable")?;
            let default: Option<String> = row.try_get("column_default")?;

            let mut column = ColumnDescriptor::new(name, parse_db_type(&data_type));
            column.nullable = nullable;
            if let Some(expression) = default {
                column.default = DefaultValue::Expression(expression);
            }
            columns.push(column);
        }
        Ok(columns)
    }

    /// Reads the named constraints of a table.
    ///
    /// # Errors
    ///
    /// Passes engine errors through unwrapped.
    pub async fn table_constraints(&self, table: &str) -> Result<Vec<IntrospectedConstraint>> {
        debug!(table, "introspecting constraints");
        let rows = sqlx::query(queries::TABLE_CONSTRAINTS)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;
        let mut constraints = Vec::new();
        for row in rows {
            let name: String = row.try_get("constraint_name")?;
            let constraint_type: String = row.try_get("constraint_type")?;
            let columns: Vec<String> = row.try_get("columns")?;
            let foreign_target: Option<String> = row.try_get("foreign_target")?;

            let Some(kind) = constraint_kind(&constraint_type) else {
                continue;
            };
            constraints.push(IntrospectedConstraint {
                constraint: ConstraintRef::new(name, kind, columns),
                foreign_target,
            });
        }
        Ok(constraints)
    }

    /// Reads the index bookkeeping entries of a table, skipping the
    /// primary key's implicit entry.
    ///
    /// # Errors
    ///
    /// Passes engine errors through unwrapped.
    pub async fn table_indexes(&self, table: &str) -> Result<Vec<ConstraintRef>> {
        debug!(table, "introspecting indexes");
        let rows = sqlx::query(queries::TABLE_INDEXES)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;
        let mut indexes = Vec::new();
        for row in rows {
            let is_primary: bool = row.try_get("is_primary")?;
            if is_primary {
                continue;
            }
            let name: String = row.try_get("index_name")?;
            let columns: Vec<String> = row.try_get("columns")?;
            indexes.push(ConstraintRef::new(name, ConstraintKind::Index, columns));
        }
        Ok(indexes)
    }

    /// Builds an offline [`StaticCatalog`] snapshot covering the given
    /// tables, ready to hand to the planner.
    ///
    /// # Errors
    ///
    /// Passes engine errors through unwrapped.
    pub async fn snapshot(&self, tables: &[&str]) -> Result<StaticCatalog> {
        let mut catalog = StaticCatalog::new();
        for &table in tables {
            let columns = self.table_columns(table).await?;
            for introspected in self.table_constraints(table).await? {
                if introspected.constraint.kind == ConstraintKind::ForeignKey {
                    if let Some(relation) = referencing_relation(table, &columns, &introspected) {
                        if let Some(fk) = relation.column.references.clone() {
                            catalog.add_relation(fk.table, fk.column, relation);
                        }
                    }
                }
                catalog.add_constraint(table, introspected.constraint);
            }
            for index in self.table_indexes(table).await? {
                catalog.add_constraint(table, index);
            }
        }
        Ok(catalog)
    }
}

fn constraint_kind(constraint_type: &str) -> Option<ConstraintKind> {
    match constraint_type {
        "u" => Some(ConstraintKind::Unique),
        "p" => Some(ConstraintKind::PrimaryKey),
        "f" => Some(ConstraintKind::ForeignKey),
        "c" => Some(ConstraintKind::Check),
        _ => None,
    }
}

/// Turns an introspected foreign key into the [`Relation`] the
/// constraint lifecycle cascades over.
#[must_use]
pub fn referencing_relation(
    table: &str,
    columns: &[ColumnDescriptor],
    introspected: &IntrospectedConstraint,
) -> Option<Relation> {
    let target = introspected.foreign_target.as_deref()?;
    let (ref_table, ref_column) = target.split_once('.')?;
    let member = introspected.constraint.columns.first()?;
    let mut column = columns.iter().find(|c| &c.name == member)?.clone();
    column.references = Some(ForeignRef {
        table: ref_table.to_string(),
        column: ref_column.to_string(),
    });
    Some(Relation {
        table: table.to_string(),
        column,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_db_type_scalar_names() {
        assert_eq!(parse_db_type("integer"), LogicalType::Integer);
        assert_eq!(parse_db_type("int4"), LogicalType::Integer);
        assert_eq!(parse_db_type("bigint"), LogicalType::BigInt);
        assert_eq!(parse_db_type("smallint"), LogicalType::SmallInt);
        assert_eq!(parse_db_type("double precision"), LogicalType::Float);
        assert_eq!(parse_db_type("boolean"), LogicalType::Boolean);
        assert_eq!(parse_db_type("date"), LogicalType::Date);
        assert_eq!(parse_db_type("super"), LogicalType::Json);
    }

    #[test]
    fn test_parse_db_type_sized_names() {
        assert_eq!(
            parse_db_type("character varying(10)"),
            LogicalType::Varchar(Some(10))
        );
        assert_eq!(parse_db_type("varchar(20)"), LogicalType::Varchar(Some(20)));
        assert_eq!(parse_db_type("varchar(max)"), LogicalType::Varchar(None));
        assert_eq!(parse_db_type("character(5)"), LogicalType::Char(5));
        assert_eq!(parse_db_type("varbyte(10)"), LogicalType::Binary(Some(10)));
        assert_eq!(parse_db_type("numeric(10, 2)"), LogicalType::Decimal(10, 2));
    }

    #[test]
    fn test_parse_db_type_temporal_names() {
        assert_eq!(
            parse_db_type("timestamp without time zone"),
            LogicalType::DateTime
        );
        assert_eq!(parse_db_type("timestamp"), LogicalType::DateTime);
        assert_eq!(parse_db_type("time without time zone"), LogicalType::Time);
    }

    #[test]
    fn test_parse_db_type_unknown_falls_back_to_text() {
        assert_eq!(parse_db_type("geometry"), LogicalType::Text);
    }

    #[test]
    fn test_constraint_kind_codes() {
        assert_eq!(constraint_kind("u"), Some(ConstraintKind::Unique));
        assert_eq!(constraint_kind("p"), Some(ConstraintKind::PrimaryKey));
        assert_eq!(constraint_kind("f"), Some(ConstraintKind::ForeignKey));
        assert_eq!(constraint_kind("c"), Some(ConstraintKind::Check));
        assert_eq!(constraint_kind("x"), None);
    }

    #[test]
    fn test_referencing_relation_resolves_target() {
        let columns = vec![ColumnDescriptor::new("pony_id", LogicalType::Integer).not_null()];
        let introspected = IntrospectedConstraint {
            constraint: ConstraintRef::new(
                "test_rider_pony_id_fk_test_pony_id",
                ConstraintKind::ForeignKey,
                vec!["pony_id".to_string()],
            ),
            foreign_target: Some("test_pony.id".to_string()),
        };
        let relation = referencing_relation("test_rider", &columns, &introspected).unwrap();
        assert_eq!(relation.table, "test_rider");
        assert_eq!(
            relation.column.references,
            Some(ForeignRef {
                table: "test_pony".to_string(),
                column: "id".to_string(),
            })
        );
    }
}
