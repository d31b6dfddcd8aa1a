//! Constraint catalog lookup and lifecycle management.
//!
//! A pending type change can conflict with foreign keys, unique
//! constraints and primary keys — both on the altered column and on
//! columns in *other* tables that reference it. This module owns the
//! drop-before/recreate-after sequencing around those conflicts,
//! including the multi-table cascade when a referenced key changes
//! type.

use crate::builder::StatementBuilder;
use crate::descriptor::{ColumnDescriptor, ConstraintKind, ConstraintRef, LogicalType};
use crate::error::{Result, SchemaError};
use crate::plan::Plan;
use crate::strategy::{classify, AlterCase, TypeChangeStrategy};

/// Derives the deterministic name for a UNIQUE constraint.
#[must_use]
pub fn unique_name(table: &str, columns: &[&str]) -> String {
    format!("{}_{}_uniq", table, columns.join("_"))
}

/// Derives the deterministic name for a PRIMARY KEY constraint.
#[must_use]
pub fn primary_key_name(table: &str, column: &str) -> String {
    format!("{table}_{column}_pk")
}

/// Derives the deterministic name for a FOREIGN KEY constraint.
#[must_use]
pub fn foreign_key_name(table: &str, column: &str, ref_table: &str, ref_column: &str) -> String {
    format!("{table}_{column}_fk_{ref_table}_{ref_column}")
}

/// Derives the deterministic name for a CHECK constraint.
#[must_use]
pub fn check_name(table: &str, column: &str) -> String {
    format!("{table}_{column}_check")
}

/// A column in another table that references the column being altered.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    /// The referencing table.
    pub table: String,
    /// The referencing column, as currently stored.
    pub column: ColumnDescriptor,
}

/// Read-only access to the named constraints and relations known to the
/// engine catalog.
///
/// The live implementation is a snapshot built by the catalog
/// introspection crate; tests use [`StaticCatalog`] directly.
pub trait ConstraintCatalog {
    /// Returns the constraints of `kind` covering exactly `columns` on
    /// `table`.
    fn constraints(
        &self,
        table: &str,
        columns: &[&str],
        kind: ConstraintKind,
    ) -> Result<Vec<ConstraintRef>>;

    /// Returns every non-many-to-many relation pointing at
    /// `table.column` from another table.
    fn relations_to(&self, table: &str, column: &str) -> Result<Vec<Relation>>;
}

/// In-memory constraint catalog.
///
/// Populated either by hand (tests, offline planning) or from a live
/// introspection snapshot.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    constraints: Vec<(String, ConstraintRef)>,
    relations: Vec<(String, String, Relation)>,
}

impl StaticCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a named constraint on a table.
    pub fn add_constraint(&mut self, table: impl Into<String>, constraint: ConstraintRef) {
        self.constraints.push((table.into(), constraint));
    }

    /// Records that `relation` references `table.column`.
    pub fn add_relation(
        &mut self,
        table: impl Into<String>,
        column: impl Into<String>,
        relation: Relation,
    ) {
        self.relations.push((table.into(), column.into(), relation));
    }
}

impl ConstraintCatalog for StaticCatalog {
    fn constraints(
        &self,
        table: &str,
        columns: &[&str],
        kind: ConstraintKind,
    ) -> Result<Vec<ConstraintRef>> {
        let mut wanted: Vec<&str> = columns.to_vec();
        wanted.sort_unstable();
        Ok(self
            .constraints
            .iter()
            .filter(|(t, c)| {
                if t != table || c.kind != kind {
                    return false;
                }
                let mut have: Vec<&str> = c.columns.iter().map(String::as_str).collect();
                have.sort_unstable();
                have == wanted
            })
            .map(|(_, c)| c.clone())
            .collect())
    }

    fn relations_to(&self, table: &str, column: &str) -> Result<Vec<Relation>> {
        Ok(self
            .relations
            .iter()
            .filter(|(t, c, _)| t == table && c == column)
            .map(|(_, _, rel)| rel.clone())
            .collect())
    }
}

/// Plans constraint drops and recreations around a value alteration.
#[derive(Debug)]
pub struct ConstraintLifecycle<'a, C: ?Sized> {
    catalog: &'a C,
    builder: &'a StatementBuilder,
}

impl<'a, C: ConstraintCatalog + ?Sized> ConstraintLifecycle<'a, C> {
    /// Creates a lifecycle manager over a catalog and builder.
    #[must_use]
    pub fn new(catalog: &'a C, builder: &'a StatementBuilder) -> Self {
        Self { catalog, builder }
    }

    /// Looks up the constraints of `kind` owning `columns`.
    ///
    /// Under `strict`, exactly one match is required; zero or several is
    /// an ambiguous schema state and planning aborts. Without `strict`
    /// the operation applies to every match found.
    ///
    /// # Errors
    ///
    /// [`SchemaError::AmbiguousConstraints`] on a strict cardinality
    /// violation.
    pub fn owning(
        &self,
        table: &str,
        columns: &[&str],
        kind: ConstraintKind,
        strict: bool,
    ) -> Result<Vec<ConstraintRef>> {
        let found = self.catalog.constraints(table, columns, kind)?;
        if strict && found.len() != 1 {
            return Err(SchemaError::AmbiguousConstraints {
                table: table.to_string(),
                columns: columns.iter().map(ToString::to_string).collect(),
                kind,
                expected: 1,
                actual: found.len(),
            });
        }
        Ok(found)
    }

    /// Drops every foreign key in other tables that references
    /// `table.column`, returning the drop statements and the relations
    /// so they can be cascaded and recreated later.
    pub fn drop_referencing(
        &self,
        table: &str,
        column: &str,
        strict: bool,
    ) -> Result<(Plan, Vec<Relation>)> {
        let relations = self.catalog.relations_to(table, column)?;
        let mut plan = Plan::new();
        for relation in &relations {
            for constraint in self.owning(
                &relation.table,
                &[relation.column.name.as_str()],
                ConstraintKind::ForeignKey,
                strict,
            )? {
                plan.push(self.builder.drop_constraint(&relation.table, &constraint.name));
            }
        }
        Ok((plan, relations))
    }

    /// Alters every referencing column to the new key type, reusing the
    /// type-change strategy per relation. The referencing foreign keys
    /// must already be dropped.
    pub fn cascade_type_change(
        &self,
        relations: &[Relation],
        new_type: &LogicalType,
        new_db_type: &str,
        strict: bool,
        backwards: bool,
    ) -> Result<Plan> {
        let strategy = TypeChangeStrategy::new(self.builder);
        let mut plan = Plan::new();
        for relation in relations {
            // The foreign key itself is already gone at this point, so
            // it no longer counts as an owning constraint.
            let mut source = relation.column.clone();
            source.references = None;
            let mut target = source.clone();
            target.logical_type = new_type.clone();

            match classify(&relation.table, &source, &target)? {
                AlterCase::Unchanged => {}
                AlterCase::InPlaceResize => plan.push(self.builder.alter_column_type(
                    &relation.table,
                    &source.name,
                    new_db_type,
                )),
                AlterCase::ConstrainedResize(kind) => {
                    let owning = self.owning(&relation.table, &[source.name.as_str()], kind, strict)?;
                    let fragment = strategy.constrained_resize(
                        &relation.table,
                        &target,
                        new_db_type,
                        kind,
                        &owning,
                    )?;
                    plan.extend(fragment.actions);
                    plan.extend(fragment.post_actions);
                }
                AlterCase::Recreate => plan.extend(strategy.recreate(
                    &relation.table,
                    &source,
                    &target,
                    new_db_type,
                    backwards,
                )?),
            }
        }
        Ok(plan)
    }

    /// Recreates the foreign keys dropped by [`Self::drop_referencing`],
    /// pointing at the (possibly renamed) key column.
    #[must_use]
    pub fn recreate_referencing(&self, relations: &[Relation], table: &str, column: &str) -> Plan {
        let mut plan = Plan::new();
        for relation in relations {
            plan.push(self.builder.add_foreign_key(
                &relation.table,
                &foreign_key_name(&relation.table, &relation.column.name, table, column),
                &relation.column.name,
                table,
                column,
            ));
        }
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DefaultValue;

    fn catalog_with_pk() -> StaticCatalog {
        let mut catalog = StaticCatalog::new();
        catalog.add_constraint(
            "test_pony",
            ConstraintRef::new(
                "test_pony_pkey",
                ConstraintKind::PrimaryKey,
                vec!["id".to_string()],
            ),
        );
        catalog
    }

    #[test]
    fn test_constraint_names() {
        assert_eq!(unique_name("test_pony", &["name"]), "test_pony_name_uniq");
        assert_eq!(primary_key_name("test_pony", "id"), "test_pony_id_pk");
        assert_eq!(
            foreign_key_name("test_rider", "pony_id", "test_pony", "id"),
            "test_rider_pony_id_fk_test_pony_id"
        );
        assert_eq!(check_name("test_pony", "weight"), "test_pony_weight_check");
    }

    #[test]
    fn test_static_catalog_lookup_matches_column_set() {
        let catalog = catalog_with_pk();
        let found = catalog
            .constraints("test_pony", &["id"], ConstraintKind::PrimaryKey)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "test_pony_pkey");

        assert!(catalog
            .constraints("test_pony", &["other"], ConstraintKind::PrimaryKey)
            .unwrap()
            .is_empty());
        assert!(catalog
            .constraints("test_pony", &["id"], ConstraintKind::Unique)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_strict_lookup_requires_exactly_one() {
        let builder = StatementBuilder::default();
        let mut catalog = catalog_with_pk();
        let lifecycle = ConstraintLifecycle::new(&catalog, &builder);
        assert!(lifecycle
            .owning("test_pony", &["id"], ConstraintKind::PrimaryKey, true)
            .is_ok());

        // Zero matches is as fatal as several.
        let err = lifecycle
            .owning("test_pony", &["id"], ConstraintKind::Unique, true)
            .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::AmbiguousConstraints {
                expected: 1,
                actual: 0,
                ..
            }
        ));

        catalog.add_constraint(
            "test_pony",
            ConstraintRef::new(
                "test_pony_pkey_dup",
                ConstraintKind::PrimaryKey,
                vec!["id".to_string()],
            ),
        );
        let lifecycle = ConstraintLifecycle::new(&catalog, &builder);
        assert!(matches!(
            lifecycle
                .owning("test_pony", &["id"], ConstraintKind::PrimaryKey, true)
                .unwrap_err(),
            SchemaError::AmbiguousConstraints { actual: 2, .. }
        ));
    }

    #[test]
    fn test_non_strict_lookup_returns_all_matches() {
        let builder = StatementBuilder::default();
        let mut catalog = StaticCatalog::new();
        for name in ["idx_a", "idx_b"] {
            catalog.add_constraint(
                "test_pony",
                ConstraintRef::new(name, ConstraintKind::Index, vec!["name".to_string()]),
            );
        }
        let lifecycle = ConstraintLifecycle::new(&catalog, &builder);
        let found = lifecycle
            .owning("test_pony", &["name"], ConstraintKind::Index, false)
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_drop_and_recreate_referencing() {
        let builder = StatementBuilder::default();
        let mut catalog = catalog_with_pk();
        catalog.add_constraint(
            "test_rider",
            ConstraintRef::new(
                "test_rider_pony_id_fk_test_pony_id",
                ConstraintKind::ForeignKey,
                vec!["pony_id".to_string()],
            ),
        );
        catalog.add_relation(
            "test_pony",
            "id",
            Relation {
                table: "test_rider".to_string(),
                column: ColumnDescriptor::new("pony_id", LogicalType::Varchar(Some(10)))
                    .not_null()
                    .references("test_pony", "id"),
            },
        );

        let lifecycle = ConstraintLifecycle::new(&catalog, &builder);
        let (plan, relations) = lifecycle.drop_referencing("test_pony", "id", true).unwrap();
        assert_eq!(
            plan.rendered(),
            vec![
                r#"ALTER TABLE "test_rider" DROP CONSTRAINT "test_rider_pony_id_fk_test_pony_id";"#
            ]
        );
        assert_eq!(relations.len(), 1);

        let cascade = lifecycle
            .cascade_type_change(
                &relations,
                &LogicalType::Varchar(Some(20)),
                "varchar(20)",
                true,
                false,
            )
            .unwrap();
        assert_eq!(
            cascade.rendered(),
            vec![r#"ALTER TABLE "test_rider" ALTER COLUMN "pony_id" TYPE varchar(20);"#]
        );

        let readd = lifecycle.recreate_referencing(&relations, "test_pony", "id");
        assert_eq!(
            readd.rendered(),
            vec![
                r#"ALTER TABLE "test_rider" ADD CONSTRAINT "test_rider_pony_id_fk_test_pony_id" FOREIGN KEY ("pony_id") REFERENCES "test_pony" ("id");"#
            ]
        );
    }

    #[test]
    fn test_cascade_recreates_when_kind_changes() {
        let builder = StatementBuilder::default();
        let catalog = StaticCatalog::new();
        let lifecycle = ConstraintLifecycle::new(&catalog, &builder);
        let relations = vec![Relation {
            table: "test_rider".to_string(),
            column: ColumnDescriptor::new("pony_id", LogicalType::Integer)
                .not_null()
                .default(DefaultValue::Integer(0))
                .references("test_pony", "id"),
        }];
        let plan = lifecycle
            .cascade_type_change(
                &relations,
                &LogicalType::BigInt,
                "bigint",
                false,
                false,
            )
            .unwrap();
        // Integer -> bigint is a family change, so the referencing
        // column goes through the shadow protocol.
        assert_eq!(plan.len(), 4);
        assert!(plan.rendered()[0].contains("\"pony_id_tmp\" bigint"));
    }
}
