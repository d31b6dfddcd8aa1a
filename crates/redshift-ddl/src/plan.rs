//! Planned statements and ordered plans.

use serde::{Deserialize, Serialize};

use crate::descriptor::DefaultValue;

/// A single SQL statement with its ordered bind values.
///
/// The template uses `%s` placeholders. The engine does not accept
/// server-side binds in DDL, so [`PlannedStatement::to_sql`]
/// interpolates the parameters as quoted literals client-side before
/// execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedStatement {
    /// SQL template with `%s` placeholders.
    pub sql: String,
    /// Bind values, in placeholder order.
    pub params: Vec<DefaultValue>,
}

impl PlannedStatement {
    /// Creates a statement with no parameters.
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Creates a statement with bind values.
    #[must_use]
    pub fn with_params(sql: impl Into<String>, params: Vec<DefaultValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Renders the executable SQL, substituting each `%s` placeholder
    /// with the corresponding parameter as a literal.
    #[must_use]
    pub fn to_sql(&self) -> String {
        let mut out = String::with_capacity(self.sql.len());
        let mut params = self.params.iter();
        let mut rest = self.sql.as_str();
        while let Some(pos) = rest.find("%s") {
            out.push_str(&rest[..pos]);
            let literal = params
                .next()
                .and_then(DefaultValue::to_sql)
                .unwrap_or_else(|| "NULL".to_string());
            out.push_str(&literal);
            rest = &rest[pos + 2..];
        }
        out.push_str(rest);
        out
    }
}

/// An ordered sequence of planned statements.
///
/// Order is a correctness invariant: later statements may depend on the
/// side effects of earlier ones (a shadow column must exist before the
/// copy into it runs).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Statements in execution order.
    pub statements: Vec<PlannedStatement>,
    /// When true, the caller must close and reopen its connection after
    /// the plan runs to flush cached catalog state.
    pub reconnect_required: bool,
}

impl Plan {
    /// Creates an empty plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a statement.
    pub fn push(&mut self, statement: PlannedStatement) {
        self.statements.push(statement);
    }

    /// Appends every statement of `other`, merging its reconnect flag.
    pub fn extend(&mut self, other: Plan) {
        self.statements.extend(other.statements);
        self.reconnect_required |= other.reconnect_required;
    }

    /// Returns whether the plan contains no statements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Returns the number of statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Renders every statement as terminated, executable SQL.
    #[must_use]
    pub fn rendered(&self) -> Vec<String> {
        self.statements
            .iter()
            .map(|s| {
                let sql = s.to_sql();
                if sql.ends_with(';') {
                    sql
                } else {
                    format!("{sql};")
                }
            })
            .collect()
    }
}

impl IntoIterator for Plan {
    type Item = PlannedStatement;
    type IntoIter = std::vec::IntoIter<PlannedStatement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.into_iter()
    }
}
