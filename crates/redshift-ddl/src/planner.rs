//! Top-level schema planner.
//!
//! Sequences the statement builder, type-change strategy and constraint
//! lifecycle into flat, ordered plans for a single field alteration,
//! a field addition or a full table creation. The planner holds no
//! resources and keeps no state between calls; each entry point takes
//! descriptors in and hands an ordered [`Plan`] back for the caller to
//! execute verbatim.

use tracing::debug;

use crate::builder::StatementBuilder;
use crate::config::PlannerConfig;
use crate::constraints::{
    check_name, foreign_key_name, primary_key_name, unique_name, ConstraintCatalog,
    ConstraintLifecycle,
};
use crate::descriptor::{
    AlterationRequest, ColumnDescriptor, ConstraintKind, TableSpec,
};
use crate::error::{Result, SchemaError};
use crate::plan::Plan;
use crate::strategy::{classify, AlterCase, TypeChangeStrategy};

/// Plans DDL sequences against a constraint catalog.
#[derive(Debug)]
pub struct SchemaPlanner<C> {
    builder: StatementBuilder,
    catalog: C,
}

impl<C: ConstraintCatalog> SchemaPlanner<C> {
    /// Creates a planner with the given configuration and catalog.
    #[must_use]
    pub fn new(config: PlannerConfig, catalog: C) -> Self {
        Self {
            builder: StatementBuilder::new(config),
            catalog,
        }
    }

    /// Returns the statement builder.
    #[must_use]
    pub fn builder(&self) -> &StatementBuilder {
        &self.builder
    }

    /// Returns the constraint catalog.
    #[must_use]
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Builds an [`AlterationRequest`] with engine parameters resolved
    /// through this planner's configuration.
    #[must_use]
    pub fn alteration_request(
        &self,
        table: &str,
        old_field: ColumnDescriptor,
        new_field: ColumnDescriptor,
    ) -> AlterationRequest {
        let old_db_params = self.builder.db_params(&old_field);
        let new_db_params = self.builder.db_params(&new_field);
        AlterationRequest::new(table, old_field, new_field, old_db_params, new_db_params)
    }

    /// Plans a single field alteration.
    ///
    /// Phases run in a fixed order; any phase whose precondition does
    /// not hold is omitted. Conflicting constraints are dropped before
    /// the value change and recreated after it, and a type change on a
    /// referenced key cascades into every referencing table.
    ///
    /// # Errors
    ///
    /// Propagates classification, constraint-cardinality and
    /// default-resolution failures; nothing is emitted on error.
    pub fn plan_alter_field(&self, request: &AlterationRequest) -> Result<Plan> {
        let old = &request.old_field;
        let new = &request.new_field;
        let table = request.table.as_str();

        let case = classify(table, old, new)?;
        let lifecycle = ConstraintLifecycle::new(&self.catalog, &self.builder);
        let strategy = TypeChangeStrategy::new(&self.builder);
        let mut plan = Plan::new();

        let fk_retargeted = old.references != new.references;

        // Foreign key owned by the altered column. A constrained resize
        // handles its own constraint, so only removal, retargeting and
        // a full rebuild need the drop here.
        let own_fk_dropped = old.references.is_some()
            && (fk_retargeted || matches!(case, AlterCase::Recreate));
        if own_fk_dropped {
            for constraint in lifecycle.owning(
                table,
                &[old.name.as_str()],
                ConstraintKind::ForeignKey,
                request.strict,
            )? {
                plan.push(self.builder.drop_constraint(table, &constraint.name));
            }
        }

        // Uniqueness removed.
        if old.unique && !new.unique {
            for constraint in
                lifecycle.owning(table, &[old.name.as_str()], ConstraintKind::Unique, request.strict)?
            {
                plan.push(self.builder.drop_constraint(table, &constraint.name));
            }
        }

        // Foreign keys in other tables referencing this key must go
        // before its type can change.
        let mut relations = Vec::new();
        if (old.primary_key || old.unique)
            && matches!(case, AlterCase::ConstrainedResize(_) | AlterCase::Recreate)
        {
            let (drops, rels) = lifecycle.drop_referencing(table, &old.name, request.strict)?;
            plan.extend(drops);
            relations = rels;
        }

        // Index bookkeeping cleanup. The engine has no physical
        // indexes and several catalog entries may match, so this is
        // never strict.
        if old.db_index && !new.db_index {
            for constraint in
                lifecycle.owning(table, &[old.name.as_str()], ConstraintKind::Index, false)?
            {
                plan.push(self.builder.drop_constraint(table, &constraint.name));
            }
        }

        // Check constraint changed or removed.
        let check_changed = request.old_db_params.check != request.new_db_params.check;
        if request.old_db_params.check.is_some() && check_changed {
            for constraint in
                lifecycle.owning(table, &[old.name.as_str()], ConstraintKind::Check, request.strict)?
            {
                plan.push(self.builder.drop_constraint(table, &constraint.name));
            }
        }

        // Rename; everything after this refers to the new name.
        if old.name != new.name {
            plan.push(self.builder.rename_column(table, &old.name, &new.name));
        }

        // The primary key is released up front when it is being removed
        // or when the column is about to be rebuilt. A constrained
        // resize drops and recreates it itself.
        if old.primary_key && (!new.primary_key || matches!(case, AlterCase::Recreate)) {
            for constraint in lifecycle.owning(
                table,
                &[old.name.as_str()],
                ConstraintKind::PrimaryKey,
                request.strict,
            )? {
                plan.push(self.builder.drop_constraint(table, &constraint.name));
            }
        }

        // The value alteration itself.
        match case {
            AlterCase::Unchanged => {}
            AlterCase::InPlaceResize => plan.push(self.builder.alter_column_type(
                table,
                &new.name,
                &request.new_db_params.db_type,
            )),
            AlterCase::ConstrainedResize(kind) => {
                let owning = lifecycle.owning(table, &[old.name.as_str()], kind, request.strict)?;
                let fragment = strategy.constrained_resize(
                    table,
                    new,
                    &request.new_db_params.db_type,
                    kind,
                    &owning,
                )?;
                plan.extend(fragment.actions);
                plan.extend(fragment.post_actions);
            }
            AlterCase::Recreate => plan.extend(strategy.recreate(
                table,
                old,
                new,
                &request.new_db_params.db_type,
                request.backwards,
            )?),
        }

        // Cascade the new key type into every referencing column.
        if !relations.is_empty() {
            plan.extend(lifecycle.cascade_type_change(
                &relations,
                &new.logical_type,
                &request.new_db_params.db_type,
                request.strict,
                request.backwards,
            )?);
        }

        // Uniqueness added, or restored after a rebuild.
        if new.unique && (!old.unique || matches!(case, AlterCase::Recreate)) {
            plan.push(self.builder.add_unique(
                table,
                &unique_name(table, &[new.name.as_str()]),
                &[new.name.as_str()],
            ));
        }

        // Primary key added, or restored after a rebuild.
        if new.primary_key && (!old.primary_key || matches!(case, AlterCase::Recreate)) {
            plan.push(self.builder.add_primary_key(
                table,
                &primary_key_name(table, &new.name),
                &[new.name.as_str()],
            ));
        }

        // Foreign key on the altered column.
        if let Some(fk) = &new.references {
            if fk_retargeted || matches!(case, AlterCase::Recreate) {
                plan.push(self.builder.add_foreign_key(
                    table,
                    &foreign_key_name(table, &new.name, &fk.table, &fk.column),
                    &new.name,
                    &fk.table,
                    &fk.column,
                ));
            }
        }

        // Referencing foreign keys come back last, after both sides
        // carry the new type.
        if !relations.is_empty() {
            plan.extend(lifecycle.recreate_referencing(&relations, table, &new.name));
        }

        // Check constraint newly present or changed.
        if let Some(expression) = &request.new_db_params.check {
            if check_changed {
                plan.push(
                    self.builder
                        .add_check(table, &check_name(table, &new.name), expression),
                );
            }
        }

        debug!(
            table,
            column = %new.name,
            statements = plan.len(),
            "planned field alteration"
        );
        Ok(plan)
    }

    /// Plans adding a column to an existing table.
    ///
    /// # Errors
    ///
    /// Fails pre-flight with [`SchemaError::MissingDefault`] when the
    /// column is NOT NULL without any effective default: the engine
    /// would reject the statement on a populated table, so no SQL is
    /// emitted at all.
    pub fn plan_add_field(&self, table: &str, column: &ColumnDescriptor) -> Result<Plan> {
        if !column.nullable && !column.has_default() && !column.logical_type.is_auto() {
            return Err(SchemaError::MissingDefault {
                table: table.to_string(),
                column: column.name.clone(),
            });
        }

        let mut plan = Plan::new();
        plan.push(self.builder.add_column(table, column));
        if column.unique && !column.primary_key {
            plan.push(self.builder.add_unique(
                table,
                &unique_name(table, &[column.name.as_str()]),
                &[column.name.as_str()],
            ));
        }
        if let Some(fk) = &column.references {
            plan.push(self.builder.add_foreign_key(
                table,
                &foreign_key_name(table, &column.name, &fk.table, &fk.column),
                &column.name,
                &fk.table,
                &fk.column,
            ));
            // The engine caches relation metadata per session; a new
            // foreign key is not visible until the connection cycles.
            plan.reconnect_required = true;
        }
        debug!(table, column = %column.name, "planned field addition");
        Ok(plan)
    }

    /// Plans a `CREATE TABLE`, its implicit many-to-many join tables
    /// and its deferred constraints.
    ///
    /// Constraint statements are deferred until after every table in
    /// the group exists. The single-distribution-key invariant is
    /// checked before any SQL is produced.
    ///
    /// # Errors
    ///
    /// [`SchemaError::MultipleDistributionKeys`] on a misconfigured
    /// spec.
    pub fn plan_create_table(&self, spec: &TableSpec) -> Result<Plan> {
        let mut plan = Plan::new();
        plan.push(self.builder.create_table(spec)?);

        for join_table in &spec.many_to_many {
            plan.extend(self.plan_create_table(join_table)?);
        }

        for column in &spec.columns {
            if column.unique && !column.primary_key {
                plan.push(self.builder.add_unique(
                    &spec.name,
                    &unique_name(&spec.name, &[column.name.as_str()]),
                    &[column.name.as_str()],
                ));
            }
            if let Some(fk) = &column.references {
                plan.push(self.builder.add_foreign_key(
                    &spec.name,
                    &foreign_key_name(&spec.name, &column.name, &fk.table, &fk.column),
                    &column.name,
                    &fk.table,
                    &fk.column,
                ));
            }
        }
        for group in &spec.unique_together {
            let columns: Vec<&str> = group.iter().map(String::as_str).collect();
            plan.push(self.builder.add_unique(
                &spec.name,
                &unique_name(&spec.name, &columns),
                &columns,
            ));
        }

        debug!(table = %spec.name, statements = plan.len(), "planned table creation");
        Ok(plan)
    }

    /// Secondary indexes do not exist on this engine.
    ///
    /// # Errors
    ///
    /// Always returns [`SchemaError::NotSupported`].
    pub fn plan_create_index(&self, _table: &str, _columns: &[&str]) -> Result<Plan> {
        Err(SchemaError::NotSupported("secondary index creation"))
    }

    /// The engine has no sequences to reset behind identity columns.
    ///
    /// # Errors
    ///
    /// Always returns [`SchemaError::NotSupported`].
    pub fn plan_reset_sequence(&self, _table: &str) -> Result<Plan> {
        Err(SchemaError::NotSupported("sequence reset"))
    }

    /// Row locking is unavailable on this engine.
    ///
    /// # Errors
    ///
    /// Always returns [`SchemaError::NotSupported`].
    pub fn for_update_sql(&self) -> Result<String> {
        Err(SchemaError::NotSupported("SELECT ... FOR UPDATE"))
    }

    /// `DISTINCT ON` with explicit fields is unavailable on this
    /// engine.
    ///
    /// # Errors
    ///
    /// Always returns [`SchemaError::NotSupported`].
    pub fn distinct_on_sql(&self, _fields: &[&str]) -> Result<String> {
        Err(SchemaError::NotSupported("DISTINCT ON with explicit fields"))
    }
}
