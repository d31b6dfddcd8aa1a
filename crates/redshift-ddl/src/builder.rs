//! Statement builder: pure DDL/DML rendering.
//!
//! Every function here turns descriptors into `(sql, params)` pairs and
//! nothing else — no catalog lookups, no engine calls, no decisions
//! about *when* a statement is needed. Sequencing lives in the planner.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::PlannerConfig;
use crate::descriptor::{ColumnDescriptor, DbParams, DefaultValue, LogicalType, TableSpec};
use crate::error::Result;
use crate::plan::PlannedStatement;

fn varchar_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^varchar\((\d+)\)$").expect("static regex"))
}

/// Renders primitive DDL/DML statements for the engine dialect.
#[derive(Debug, Clone)]
pub struct StatementBuilder {
    config: PlannerConfig,
}

impl StatementBuilder {
    /// Creates a builder with the given configuration.
    #[must_use]
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Double-quotes an identifier.
    #[must_use]
    pub fn quote_name(&self, name: &str) -> String {
        format!("\"{name}\"")
    }

    /// Renders the DDL type string for a logical type, with the
    /// varchar byte-length multiplier applied.
    #[must_use]
    pub fn db_type(&self, logical_type: &LogicalType) -> String {
        self.scale_varchar(&logical_type.engine_type())
    }

    /// Resolves a descriptor into its engine parameters.
    #[must_use]
    pub fn db_params(&self, column: &ColumnDescriptor) -> DbParams {
        DbParams {
            db_type: self.db_type(&column.logical_type),
            check: column.check.clone(),
        }
    }

    /// Multiplies the declared length of a `varchar(n)` type string by
    /// the configured multiplier. `varchar(max)` and any string that
    /// does not parse as a sized varchar pass through unchanged.
    #[must_use]
    pub fn scale_varchar(&self, db_type: &str) -> String {
        if self.config.varchar_length_multiplier == 1 {
            return db_type.to_string();
        }
        match varchar_re()
            .captures(db_type)
            .and_then(|c| c.get(1)?.as_str().parse::<u64>().ok())
        {
            Some(n) => format!(
                "varchar({})",
                n * u64::from(self.config.varchar_length_multiplier)
            ),
            None => db_type.to_string(),
        }
    }

    /// Strips a parenthesised length from a type string, for use as an
    /// explicit cast target: `varchar(10)` becomes `varchar`.
    #[must_use]
    pub fn strip_length<'a>(&self, db_type: &'a str) -> &'a str {
        match db_type.find('(') {
            Some(pos) => db_type[..pos].trim_end(),
            None => db_type,
        }
    }

    /// Renders a column definition fragment with its bind values.
    #[must_use]
    pub fn column_sql(&self, column: &ColumnDescriptor) -> (String, Vec<DefaultValue>) {
        let mut sql = format!(
            "{} {}",
            self.quote_name(&column.name),
            self.db_type(&column.logical_type)
        );
        let mut params = Vec::new();
        if column.has_default() {
            sql.push_str(" DEFAULT %s");
            params.push(column.default.clone());
        }
        sql.push_str(if column.nullable { " NULL" } else { " NOT NULL" });
        if column.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if let Some(ref check) = column.check {
            sql.push_str(&format!(" CHECK ({check})"));
        }
        (sql, params)
    }

    /// Renders `ALTER TABLE ... ADD COLUMN` for a full descriptor.
    #[must_use]
    pub fn add_column(&self, table: &str, column: &ColumnDescriptor) -> PlannedStatement {
        let (definition, params) = self.column_sql(column);
        PlannedStatement::with_params(
            format!(
                "ALTER TABLE {} ADD COLUMN {}",
                self.quote_name(table),
                definition
            ),
            params,
        )
    }

    /// Renders `ADD COLUMN` from pre-resolved parts. Used by the
    /// shadow-column protocol, where the type string is authoritative.
    #[must_use]
    pub fn add_column_from_parts(
        &self,
        table: &str,
        column: &str,
        db_type: &str,
        default: &DefaultValue,
        nullable: bool,
    ) -> PlannedStatement {
        let mut sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            self.quote_name(table),
            self.quote_name(column),
            db_type
        );
        let mut params = Vec::new();
        if default.is_declared() {
            sql.push_str(" DEFAULT %s");
            params.push(default.clone());
        }
        sql.push_str(if nullable { " NULL" } else { " NOT NULL" });
        PlannedStatement::with_params(sql, params)
    }

    /// Renders an in-place `ALTER COLUMN ... TYPE`.
    #[must_use]
    pub fn alter_column_type(&self, table: &str, column: &str, db_type: &str) -> PlannedStatement {
        PlannedStatement::new(format!(
            "ALTER TABLE {} ALTER COLUMN {} TYPE {}",
            self.quote_name(table),
            self.quote_name(column),
            db_type
        ))
    }

    /// Renders the shadow-copy `UPDATE`. The `IS NOT NULL` guard keeps
    /// genuine NULLs from being replaced by the new default.
    #[must_use]
    pub fn copy_column(
        &self,
        table: &str,
        target: &str,
        source: &str,
        cast: Option<&str>,
    ) -> PlannedStatement {
        let cast_suffix = cast.map(|c| format!("::{c}")).unwrap_or_default();
        PlannedStatement::new(format!(
            "UPDATE {table} SET {target} = {source}{cast} WHERE {source} IS NOT NULL",
            table = self.quote_name(table),
            target = self.quote_name(target),
            source = self.quote_name(source),
            cast = cast_suffix,
        ))
    }

    /// Renders `DROP COLUMN`, cascading per configuration.
    #[must_use]
    pub fn drop_column(&self, table: &str, column: &str) -> PlannedStatement {
        let mut sql = format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.quote_name(table),
            self.quote_name(column)
        );
        if self.config.cascade_drop_column {
            sql.push_str(" CASCADE");
        }
        PlannedStatement::new(sql)
    }

    /// Renders `RENAME COLUMN`.
    #[must_use]
    pub fn rename_column(&self, table: &str, old: &str, new: &str) -> PlannedStatement {
        PlannedStatement::new(format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            self.quote_name(table),
            self.quote_name(old),
            self.quote_name(new)
        ))
    }

    /// Renders `ADD CONSTRAINT ... UNIQUE`.
    #[must_use]
    pub fn add_unique(&self, table: &str, name: &str, columns: &[&str]) -> PlannedStatement {
        PlannedStatement::new(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({})",
            self.quote_name(table),
            self.quote_name(name),
            self.quoted_list(columns)
        ))
    }

    /// Renders `ADD CONSTRAINT ... PRIMARY KEY`.
    #[must_use]
    pub fn add_primary_key(&self, table: &str, name: &str, columns: &[&str]) -> PlannedStatement {
        PlannedStatement::new(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
            self.quote_name(table),
            self.quote_name(name),
            self.quoted_list(columns)
        ))
    }

    /// Renders `ADD CONSTRAINT ... FOREIGN KEY`.
    #[must_use]
    pub fn add_foreign_key(
        &self,
        table: &str,
        name: &str,
        column: &str,
        ref_table: &str,
        ref_column: &str,
    ) -> PlannedStatement {
        PlannedStatement::new(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.quote_name(table),
            self.quote_name(name),
            self.quote_name(column),
            self.quote_name(ref_table),
            self.quote_name(ref_column)
        ))
    }

    /// Renders `ADD CONSTRAINT ... CHECK`.
    #[must_use]
    pub fn add_check(&self, table: &str, name: &str, expression: &str) -> PlannedStatement {
        PlannedStatement::new(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} CHECK ({})",
            self.quote_name(table),
            self.quote_name(name),
            expression
        ))
    }

    /// Renders `DROP CONSTRAINT`.
    #[must_use]
    pub fn drop_constraint(&self, table: &str, name: &str) -> PlannedStatement {
        PlannedStatement::new(format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.quote_name(table),
            self.quote_name(name)
        ))
    }

    /// Renders `CREATE TABLE` with the warehouse placement options.
    ///
    /// # Errors
    ///
    /// Fails when the spec declares more than one distribution key.
    pub fn create_table(&self, spec: &TableSpec) -> Result<PlannedStatement> {
        let mut params = Vec::new();
        let definitions: Vec<String> = spec
            .columns
            .iter()
            .map(|column| {
                let (sql, column_params) = self.column_sql(column);
                params.extend(column_params);
                sql
            })
            .collect();

        let mut sql = format!(
            "CREATE TABLE {} ({})",
            self.quote_name(&spec.name),
            definitions.join(", ")
        );
        let options = self.table_options(spec)?;
        if !options.is_empty() {
            sql.push(' ');
            sql.push_str(&options);
        }
        Ok(PlannedStatement::with_params(sql, params))
    }

    /// Renders the `DISTKEY`/`SORTKEY` clause for a table spec.
    ///
    /// # Errors
    ///
    /// Fails when the spec declares more than one distribution key.
    pub fn table_options(&self, spec: &TableSpec) -> Result<String> {
        let mut parts = Vec::new();
        if let Some(dist) = spec.distribution_key()? {
            parts.push(format!("DISTKEY({})", self.quote_name(dist)));
        }
        if !spec.sort_keys.is_empty() {
            let keys: Vec<&str> = spec.sort_keys.iter().map(String::as_str).collect();
            parts.push(format!("SORTKEY({})", self.quoted_list(&keys)));
        }
        Ok(parts.join(" "))
    }

    fn quoted_list(&self, names: &[&str]) -> String {
        names
            .iter()
            .map(|n| self.quote_name(n))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for StatementBuilder {
    fn default() -> Self {
        Self::new(PlannerConfig::default())
    }
}
