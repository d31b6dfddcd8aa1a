//! Type and default change strategy.
//!
//! Given a before/after column pair, decides which alteration path the
//! engine allows: nothing, a single in-place `ALTER COLUMN ... TYPE`, a
//! constraint-aware resize, or the four-step shadow-column replacement
//! protocol. The engine cannot change a column's type, nullability or
//! default in place except for pure size changes, which is what makes
//! this decision worth isolating.

use crate::builder::StatementBuilder;
use crate::constraints::{foreign_key_name, primary_key_name, unique_name};
use crate::descriptor::{ColumnDescriptor, ConstraintKind, ConstraintRef, DefaultValue, LogicalType};
use crate::error::{Result, SchemaError};
use crate::plan::Plan;

/// The alteration path chosen for a before/after column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlterCase {
    /// Nothing changed; the plan fragment is empty.
    Unchanged,
    /// Pure size change on an unconstrained column: one in-place alter.
    InPlaceResize,
    /// Pure size change on a column owned by exactly one unique,
    /// primary-key or foreign-key constraint: drop it, alter in place,
    /// recreate it.
    ConstrainedResize(ConstraintKind),
    /// Everything else goes through the shadow-column protocol.
    Recreate,
}

/// A strategy result: the main fragment plus statements that must run
/// after the value side of the alteration completes.
#[derive(Debug, Clone, Default)]
pub struct StrategyPlan {
    /// Statements performing the value alteration.
    pub actions: Plan,
    /// Statements to run afterwards (constraint recreation).
    pub post_actions: Plan,
}

/// Classifies a before/after column pair into an [`AlterCase`].
///
/// # Errors
///
/// Fails when the column is owned by more than one of
/// {unique, primary key, foreign key}, or when an identity column's
/// type would have to change — neither has a safe sequencing on this
/// engine.
pub fn classify(
    table: &str,
    old: &ColumnDescriptor,
    new: &ColumnDescriptor,
) -> Result<AlterCase> {
    let type_changed = old.logical_type != new.logical_type;
    let default_changed = old.default != new.default;
    let null_changed = old.nullable != new.nullable;

    if !type_changed && !default_changed && !null_changed {
        return Ok(AlterCase::Unchanged);
    }

    // Identity columns cannot be rebuilt by copying data into a shadow
    // column, and the engine has no other path for them.
    if type_changed && (old.logical_type.is_auto() || new.logical_type.is_auto()) {
        return Err(SchemaError::UnsupportedAlter {
            table: table.to_string(),
            column: new.name.clone(),
        });
    }

    if new.logical_type.is_resize_of(&old.logical_type) && !default_changed && !null_changed {
        let mut owners = Vec::new();
        if old.primary_key {
            owners.push(ConstraintKind::PrimaryKey);
        }
        if old.unique {
            owners.push(ConstraintKind::Unique);
        }
        if old.references.is_some() {
            owners.push(ConstraintKind::ForeignKey);
        }
        return match owners.as_slice() {
            [] => Ok(AlterCase::InPlaceResize),
            [kind] => Ok(AlterCase::ConstrainedResize(*kind)),
            _ => Err(SchemaError::UnsupportedAlter {
                table: table.to_string(),
                column: new.name.clone(),
            }),
        };
    }

    Ok(AlterCase::Recreate)
}

/// Returns the type-appropriate zero value, or `None` when the type has
/// no sensible one.
#[must_use]
pub fn type_zero(logical_type: &LogicalType) -> Option<DefaultValue> {
    match logical_type {
        LogicalType::SmallInt | LogicalType::Integer | LogicalType::BigInt => {
            Some(DefaultValue::Integer(0))
        }
        LogicalType::Decimal(_, _) => Some(DefaultValue::Integer(0)),
        LogicalType::Float => Some(DefaultValue::Float(0.0)),
        LogicalType::Char(_) | LogicalType::Varchar(_) | LogicalType::Text => {
            Some(DefaultValue::String(String::new()))
        }
        LogicalType::Binary(_) => Some(DefaultValue::Bytes(Vec::new())),
        LogicalType::Boolean => Some(DefaultValue::Bool(false)),
        LogicalType::Date | LogicalType::Time | LogicalType::DateTime => {
            Some(DefaultValue::Expression("GETDATE()".to_string()))
        }
        LogicalType::AutoInteger
        | LogicalType::AutoBigInt
        | LogicalType::Uuid
        | LogicalType::Json => None,
    }
}

/// Plans the value side of a column alteration.
#[derive(Debug)]
pub struct TypeChangeStrategy<'a> {
    builder: &'a StatementBuilder,
}

impl<'a> TypeChangeStrategy<'a> {
    /// Creates a strategy over the given statement builder.
    #[must_use]
    pub fn new(builder: &'a StatementBuilder) -> Self {
        Self { builder }
    }

    /// Resolves the default that will be materialized on the new
    /// column.
    ///
    /// Declared defaults always win. A missing default on a NOT NULL
    /// target is an error on the way forward; on a down-migration the
    /// caller's own default computation is unavailable, so a type zero
    /// is synthesized instead.
    ///
    /// # Errors
    ///
    /// [`SchemaError::MissingDefault`] forward,
    /// [`SchemaError::UnknownTypeDefault`] backwards with no zero
    /// mapping.
    pub fn effective_default(
        &self,
        table: &str,
        new: &ColumnDescriptor,
        backwards: bool,
    ) -> Result<DefaultValue> {
        if new.has_default() {
            return Ok(new.default.clone());
        }
        if new.nullable {
            return Ok(DefaultValue::None);
        }
        if backwards {
            type_zero(&new.logical_type).ok_or_else(|| SchemaError::UnknownTypeDefault {
                column: new.name.clone(),
                logical_type: new.logical_type.clone(),
            })
        } else {
            Err(SchemaError::MissingDefault {
                table: table.to_string(),
                column: new.name.clone(),
            })
        }
    }

    /// Plans a constraint-aware in-place resize: drop the owning
    /// constraint(s), alter the type, recreate the constraint with a
    /// deterministically derived name.
    pub fn constrained_resize(
        &self,
        table: &str,
        new: &ColumnDescriptor,
        new_db_type: &str,
        kind: ConstraintKind,
        owning: &[ConstraintRef],
    ) -> Result<StrategyPlan> {
        let mut actions = Plan::new();
        for constraint in owning {
            actions.push(self.builder.drop_constraint(table, &constraint.name));
        }
        actions.push(
            self.builder
                .alter_column_type(table, &new.name, new_db_type),
        );

        let mut post_actions = Plan::new();
        match kind {
            ConstraintKind::Unique => post_actions.push(self.builder.add_unique(
                table,
                &unique_name(table, &[new.name.as_str()]),
                &[new.name.as_str()],
            )),
            ConstraintKind::PrimaryKey => post_actions.push(self.builder.add_primary_key(
                table,
                &primary_key_name(table, &new.name),
                &[new.name.as_str()],
            )),
            ConstraintKind::ForeignKey => {
                if let Some(fk) = &new.references {
                    post_actions.push(self.builder.add_foreign_key(
                        table,
                        &foreign_key_name(table, &new.name, &fk.table, &fk.column),
                        &new.name,
                        &fk.table,
                        &fk.column,
                    ));
                }
            }
            ConstraintKind::Check | ConstraintKind::Index => {}
        }
        Ok(StrategyPlan {
            actions,
            post_actions,
        })
    }

    /// Plans the four-step shadow-column replacement protocol.
    ///
    /// Always exactly four statements, in this order: add the shadow
    /// column under the new definition, copy data across (casting when
    /// storage families differ, guarding NULLs), drop the original,
    /// rename the shadow into place. The sequence must never be
    /// reordered; the caller owns the transaction boundary.
    ///
    /// # Errors
    ///
    /// Propagates effective-default resolution failures.
    pub fn recreate(
        &self,
        table: &str,
        old: &ColumnDescriptor,
        new: &ColumnDescriptor,
        new_db_type: &str,
        backwards: bool,
    ) -> Result<Plan> {
        let shadow = format!("{}_tmp", new.name);
        let default = self.effective_default(table, new, backwards)?;

        let mut plan = Plan::new();
        plan.push(self.builder.add_column_from_parts(
            table,
            &shadow,
            new_db_type,
            &default,
            new.nullable,
        ));
        let cast = (old.logical_type.is_binary() != new.logical_type.is_binary())
            .then(|| self.builder.strip_length(new_db_type));
        plan.push(self.builder.copy_column(table, &shadow, &new.name, cast));
        plan.push(self.builder.drop_column(table, &new.name));
        plan.push(self.builder.rename_column(table, &shadow, &new.name));
        Ok(plan)
    }
}
