//! Column and table descriptors.
//!
//! These types are read-only snapshots describing the shape of a column
//! or table at planning time. The calling migration executor constructs
//! them per request and discards them once the plan has run; nothing
//! here is persisted or shared across requests.

use serde::{Deserialize, Serialize};

/// Logical column types understood by the planner.
///
/// This is a closed enumeration: every component that branches on a
/// column's type matches it exhaustively, so adding a variant forces
/// every decision point to be revisited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogicalType {
    /// 16-bit integer.
    SmallInt,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    BigInt,
    /// Auto-incrementing 32-bit integer (rendered as an identity column).
    AutoInteger,
    /// Auto-incrementing 64-bit integer.
    AutoBigInt,
    /// Double-precision float.
    Float,
    /// Fixed-point decimal with precision and scale.
    Decimal(u8, u8),
    /// Fixed-length character string.
    Char(u32),
    /// Variable-length character string; `None` means `varchar(max)`.
    Varchar(Option<u32>),
    /// Unbounded text. The engine has no text type, so this renders as
    /// `varchar(max)`.
    Text,
    /// Variable-length binary; `None` means the engine's default width.
    Binary(Option<u32>),
    /// Boolean.
    Boolean,
    /// Date only.
    Date,
    /// Time of day only.
    Time,
    /// Date and time without time zone.
    DateTime,
    /// UUID. The engine has no native UUID type; stored as `varchar(32)`.
    Uuid,
    /// Semi-structured JSON data.
    Json,
}

impl LogicalType {
    /// Returns the engine DDL type string, without any byte-length
    /// scaling applied.
    #[must_use]
    pub fn engine_type(&self) -> String {
        match self {
            Self::SmallInt => "smallint".to_string(),
            Self::Integer => "integer".to_string(),
            Self::BigInt => "bigint".to_string(),
            Self::AutoInteger => "integer identity(1, 1)".to_string(),
            Self::AutoBigInt => "bigint identity(1, 1)".to_string(),
            Self::Float => "double precision".to_string(),
            Self::Decimal(p, s) => format!("numeric({p}, {s})"),
            Self::Char(n) => format!("char({n})"),
            Self::Varchar(Some(n)) => format!("varchar({n})"),
            Self::Varchar(None) | Self::Text => "varchar(max)".to_string(),
            Self::Binary(Some(n)) => format!("varbyte({n})"),
            Self::Binary(None) => "varbyte".to_string(),
            Self::Boolean => "boolean".to_string(),
            Self::Date => "date".to_string(),
            Self::Time => "time".to_string(),
            Self::DateTime => "timestamp".to_string(),
            Self::Uuid => "varchar(32)".to_string(),
            Self::Json => "super".to_string(),
        }
    }

    /// Returns whether this is an auto-incrementing (identity) type.
    #[must_use]
    pub fn is_auto(&self) -> bool {
        matches!(self, Self::AutoInteger | Self::AutoBigInt)
    }

    /// Returns whether this type stores binary data.
    #[must_use]
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }

    /// Returns whether this type stores character data.
    #[must_use]
    pub fn is_character(&self) -> bool {
        matches!(self, Self::Char(_) | Self::Varchar(_) | Self::Text | Self::Uuid)
    }

    /// Returns whether `self` is the same kind of type as `old` with
    /// only a different declared size.
    #[must_use]
    pub fn is_resize_of(&self, old: &Self) -> bool {
        match (old, self) {
            (Self::Char(a), Self::Char(b)) => a != b,
            (Self::Varchar(Some(a)), Self::Varchar(Some(b))) => a != b,
            (Self::Binary(Some(a)), Self::Binary(Some(b))) => a != b,
            (Self::Decimal(p1, s1), Self::Decimal(p2, s2)) => (p1, s1) != (p2, s2),
            _ => false,
        }
    }
}

/// Default value for a column.
///
/// Doubles as the bind-value type for planned statements: the shadow
/// column's `DEFAULT %s` takes its effective default as a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum DefaultValue {
    /// No default declared.
    #[default]
    None,
    /// Explicit NULL default.
    Null,
    /// Boolean default.
    Bool(bool),
    /// Integer default.
    Integer(i64),
    /// Float default.
    Float(f64),
    /// String default.
    String(String),
    /// Binary default, rendered through the engine's hex constructor.
    Bytes(Vec<u8>),
    /// JSON default, rendered as a quoted JSON literal.
    Json(serde_json::Value),
    /// Raw SQL expression (e.g. `GETDATE()`).
    Expression(String),
}

impl DefaultValue {
    /// Returns the SQL literal for this default, or `None` if no
    /// default is declared.
    #[must_use]
    pub fn to_sql(&self) -> Option<String> {
        match self {
            Self::None => None,
            Self::Null => Some("NULL".to_string()),
            Self::Bool(b) => Some(if *b { "true" } else { "false" }.to_string()),
            Self::Integer(i) => Some(i.to_string()),
            Self::Float(f) => Some(format!("{f:?}")),
            Self::String(s) => Some(format!("'{}'", s.replace('\'', "''"))),
            Self::Bytes(b) => {
                let hex: String = b.iter().map(|byte| format!("{byte:02x}")).collect();
                Some(format!("to_varbyte('{hex}', 'hex')::varbyte"))
            }
            Self::Json(v) => Some(format!("'{}'", v.to_string().replace('\'', "''"))),
            Self::Expression(expr) => Some(expr.clone()),
        }
    }

    /// Returns whether a default is declared at all.
    #[must_use]
    pub fn is_declared(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Foreign key target: the referenced table and column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignRef {
    /// Referenced table name.
    pub table: String,
    /// Referenced column name.
    pub column: String,
}

/// Immutable snapshot of a single column.
///
/// Constructed from the caller's field metadata at alteration-request
/// time and discarded after the plan executes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,
    /// Logical type, including any declared size.
    pub logical_type: LogicalType,
    /// Whether the column allows NULL values.
    pub nullable: bool,
    /// Declared default value, if any.
    pub default: DefaultValue,
    /// Whether this column is the table's primary key.
    pub primary_key: bool,
    /// Whether this column carries a UNIQUE constraint.
    pub unique: bool,
    /// Foreign key target, if this column references another table.
    pub references: Option<ForeignRef>,
    /// Check constraint expression, if any.
    pub check: Option<String>,
    /// Whether the caller tracks an index on this column. The engine
    /// has no secondary indexes, so this only drives constraint-catalog
    /// bookkeeping.
    pub db_index: bool,
}

impl ColumnDescriptor {
    /// Creates a new nullable column descriptor with no constraints.
    #[must_use]
    pub fn new(name: impl Into<String>, logical_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            logical_type,
            nullable: true,
            default: DefaultValue::None,
            primary_key: false,
            unique: false,
            references: None,
            check: None,
            db_index: false,
        }
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Marks the column nullable (the default).
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default = value;
        self
    }

    /// Marks the column as the primary key. Primary keys are
    /// implicitly NOT NULL.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Marks the column UNIQUE.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets a foreign key reference.
    #[must_use]
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.references = Some(ForeignRef {
            table: table.into(),
            column: column.into(),
        });
        self
    }

    /// Sets a check constraint expression.
    #[must_use]
    pub fn check(mut self, expr: impl Into<String>) -> Self {
        self.check = Some(expr.into());
        self
    }

    /// Marks the column as index-tracked by the caller.
    #[must_use]
    pub fn db_index(mut self) -> Self {
        self.db_index = true;
        self
    }

    /// Returns whether the column declares any default.
    #[must_use]
    pub fn has_default(&self) -> bool {
        self.default.is_declared()
    }
}

/// Kinds of named constraints tracked in the engine catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// UNIQUE constraint.
    Unique,
    /// PRIMARY KEY constraint.
    PrimaryKey,
    /// FOREIGN KEY constraint.
    ForeignKey,
    /// CHECK constraint.
    Check,
    /// Index bookkeeping entry (no physical index exists on this engine).
    Index,
}

/// A named constraint as found in the engine catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintRef {
    /// Constraint name.
    pub name: String,
    /// Constraint kind.
    pub kind: ConstraintKind,
    /// Ordered columns the constraint covers.
    pub columns: Vec<String>,
}

impl ConstraintRef {
    /// Creates a constraint reference.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ConstraintKind, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            columns,
        }
    }
}

/// Engine-rendered column parameters: the DDL type string and the
/// rendered check expression, both resolved before planning starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbParams {
    /// Rendered DDL type (byte-length scaling already applied).
    pub db_type: String,
    /// Rendered check expression, if any.
    pub check: Option<String>,
}

/// A single field alteration request: the before/after column
/// descriptors plus their resolved engine parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlterationRequest {
    /// Table holding the column.
    pub table: String,
    /// Column state before the alteration.
    pub old_field: ColumnDescriptor,
    /// Desired column state.
    pub new_field: ColumnDescriptor,
    /// Resolved engine parameters for the old state.
    pub old_db_params: DbParams,
    /// Resolved engine parameters for the new state.
    pub new_db_params: DbParams,
    /// When true, constraint lookups must find exactly one match or
    /// planning aborts.
    pub strict: bool,
    /// True for a down-migration, the only direction in which the
    /// planner synthesizes type-zero defaults.
    pub backwards: bool,
}

impl AlterationRequest {
    /// Creates a request with the given descriptors and parameters.
    #[must_use]
    pub fn new(
        table: impl Into<String>,
        old_field: ColumnDescriptor,
        new_field: ColumnDescriptor,
        old_db_params: DbParams,
        new_db_params: DbParams,
    ) -> Self {
        Self {
            table: table.into(),
            old_field,
            new_field,
            old_db_params,
            new_db_params,
            strict: false,
            backwards: false,
        }
    }

    /// Enables strict constraint-cardinality checking.
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Marks this request as a down-migration.
    #[must_use]
    pub fn backwards(mut self) -> Self {
        self.backwards = true;
        self
    }
}

/// Full table definition for `CREATE TABLE`, including warehouse
/// placement options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    /// Table name.
    pub name: String,
    /// Ordered column definitions.
    pub columns: Vec<ColumnDescriptor>,
    /// Column-name groups that must be unique together.
    pub unique_together: Vec<Vec<String>>,
    /// Columns tagged as the distribution key. At most one is valid;
    /// declaring more is a definition error caught at plan time, which
    /// is why this stays a list instead of an `Option`.
    pub dist_key_columns: Vec<String>,
    /// Ordered sort key columns, rendered verbatim into `SORTKEY(...)`.
    pub sort_keys: Vec<String>,
    /// Implicit many-to-many join tables created alongside this one.
    pub many_to_many: Vec<TableSpec>,
}

impl TableSpec {
    /// Creates an empty table definition.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            unique_together: Vec::new(),
            dist_key_columns: Vec::new(),
            sort_keys: Vec::new(),
            many_to_many: Vec::new(),
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    /// Adds a unique-together group.
    #[must_use]
    pub fn unique_together(mut self, columns: Vec<String>) -> Self {
        self.unique_together.push(columns);
        self
    }

    /// Tags a column as the distribution key.
    #[must_use]
    pub fn dist_key(mut self, column: impl Into<String>) -> Self {
        self.dist_key_columns.push(column.into());
        self
    }

    /// Appends a sort key column.
    #[must_use]
    pub fn sort_key(mut self, column: impl Into<String>) -> Self {
        self.sort_keys.push(column.into());
        self
    }

    /// Adds an implicit many-to-many join table.
    #[must_use]
    pub fn many_to_many(mut self, spec: TableSpec) -> Self {
        self.many_to_many.push(spec);
        self
    }

    /// Returns the single distribution key column, if any.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::MultipleDistributionKeys`] when more than
    /// one column is tagged.
    pub fn distribution_key(&self) -> crate::error::Result<Option<&str>> {
        match self.dist_key_columns.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(only.as_str())),
            _ => Err(crate::error::SchemaError::MultipleDistributionKeys {
                table: self.name.clone(),
            }),
        }
    }
}
