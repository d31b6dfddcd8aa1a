//! Planner configuration.

use serde::{Deserialize, Serialize};

/// Immutable configuration for the planner and statement builder.
///
/// Constructed once and threaded through by value; there is no global
/// mutable state anywhere in the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Multiplier applied to declared `varchar(n)` lengths. The engine
    /// measures column width in bytes while callers usually measure in
    /// characters, so multi-byte encodings need headroom. Applied only
    /// to sized varchar types, never to `varchar(max)`.
    pub varchar_length_multiplier: u32,
    /// Whether `DROP COLUMN` statements cascade to dependent objects.
    pub cascade_drop_column: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            varchar_length_multiplier: 1,
            cascade_drop_column: true,
        }
    }
}

impl PlannerConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the varchar byte-length multiplier.
    #[must_use]
    pub fn varchar_length_multiplier(mut self, multiplier: u32) -> Self {
        self.varchar_length_multiplier = multiplier;
        self
    }

    /// Disables CASCADE on dropped columns.
    #[must_use]
    pub fn without_cascade(mut self) -> Self {
        self.cascade_drop_column = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlannerConfig::new();
        assert_eq!(config.varchar_length_multiplier, 1);
        assert!(config.cascade_drop_column);
    }

    #[test]
    fn test_builder() {
        let config = PlannerConfig::new()
            .varchar_length_multiplier(3)
            .without_cascade();
        assert_eq!(config.varchar_length_multiplier, 3);
        assert!(!config.cascade_drop_column);
    }
}
