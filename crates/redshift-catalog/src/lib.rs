//! System-catalog introspection for the Redshift schema planner.
//!
//! Reads the engine's attribute, type, class, namespace and constraint
//! catalog tables and maps the rows back into the descriptor types the
//! planner consumes. The usual flow is to take an offline
//! [`StaticCatalog`](redshift_ddl::constraints::StaticCatalog) snapshot
//! of the tables involved in a migration and hand it to the planner:
//!
//! ```rust,ignore
//! let introspection = CatalogIntrospection::new(pool);
//! let catalog = introspection.snapshot(&["test_pony", "test_rider"]).await?;
//! let planner = SchemaPlanner::new(PlannerConfig::default(), catalog);
//! ```
//!
//! Everything here is read-only; planning logic lives in `redshift-ddl`.

pub mod introspect;
pub mod queries;

pub use introspect::{
    parse_db_type, referencing_relation, CatalogIntrospection, IntrospectedConstraint,
};
