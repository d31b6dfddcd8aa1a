//! Schema-alteration planning for Amazon Redshift.
//!
//! Redshift accepts only a restricted subset of PostgreSQL DDL: there
//! are no secondary indexes, no `ALTER COLUMN ... DROP DEFAULT`, no
//! in-place type changes for constrained columns, and no NOT NULL
//! toggling alongside a default. `redshift-ddl` turns a requested
//! logical column change into the exact sequence of primitive
//! statements the engine will accept, preserving existing data and
//! referential integrity along the way.
//!
//! # Architecture
//!
//! - **Descriptors** — read-only snapshots of columns, constraints and
//!   table definitions ([`descriptor`])
//! - **Statement builder** — pure DDL/DML rendering, including the
//!   varchar byte-length multiplier ([`builder`])
//! - **Strategy** — picks no-op, in-place alter, constraint-aware
//!   resize or the four-step shadow-column protocol ([`strategy`])
//! - **Constraint lifecycle** — drop-before/recreate-after sequencing
//!   and multi-table cascades ([`constraints`])
//! - **Planner** — the per-request state machine tying it together
//!   ([`planner`])
//! - **Executor** — runs a plan over a pooled connection ([`executor`])
//!
//! # Example
//!
//! ```rust
//! use redshift_ddl::prelude::*;
//!
//! let planner = SchemaPlanner::new(PlannerConfig::default(), StaticCatalog::new());
//! let column = ColumnDescriptor::new("name", LogicalType::Varchar(Some(10)));
//! let plan = planner.plan_add_field("test_pony", &column).unwrap();
//! assert_eq!(
//!     plan.rendered(),
//!     vec![r#"ALTER TABLE "test_pony" ADD COLUMN "name" varchar(10) NULL;"#]
//! );
//! ```

pub mod builder;
pub mod config;
pub mod constraints;
pub mod descriptor;
pub mod error;
pub mod executor;
pub mod plan;
pub mod planner;
pub mod strategy;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::builder::StatementBuilder;
    pub use crate::config::PlannerConfig;
    pub use crate::constraints::{
        ConstraintCatalog, ConstraintLifecycle, Relation, StaticCatalog,
    };
    pub use crate::descriptor::{
        AlterationRequest, ColumnDescriptor, ConstraintKind, ConstraintRef, DbParams,
        DefaultValue, ForeignRef, LogicalType, TableSpec,
    };
    pub use crate::error::{Result, SchemaError};
    pub use crate::executor::PlanExecutor;
    pub use crate::plan::{Plan, PlannedStatement};
    pub use crate::planner::SchemaPlanner;
    pub use crate::strategy::{classify, AlterCase, StrategyPlan, TypeChangeStrategy};
}
