//! Literal system-catalog queries.
//!
//! These query texts are contract surface: tests assert against them
//! and downstream tooling greps for them, so field order and filter
//! predicates stay fixed.

/// Column name, rendered type, nullability and default expression for
/// every live column of a table.
pub const TABLE_COLUMNS: &str = "\
SELECT a.attname AS column_name,
       format_type(a.atttypid, a.atttypmod) AS data_type,
       NOT (a.attnotnull OR (t.typtype = 'd' AND t.typnotnull)) AS is_nullable,
       pg_get_expr(ad.adbin, ad.adrelid) AS column_default
FROM pg_attribute a
LEFT JOIN pg_attrdef ad ON a.attrelid = ad.adrelid AND a.attnum = ad.adnum
JOIN pg_type t ON a.atttypid = t.oid
JOIN pg_class c ON a.attrelid = c.oid
JOIN pg_namespace n ON c.relnamespace = n.oid
WHERE c.relkind IN ('r', 'v')
  AND c.relname = $1
  AND n.nspname NOT IN ('pg_catalog', 'pg_toast')
  AND a.attnum > 0
  AND NOT a.attisdropped
ORDER BY a.attnum";

/// Named constraints of a table with their member columns. The foreign
/// key target is resolved to a single `table.column` string.
pub const TABLE_CONSTRAINTS: &str = "\
SELECT c.conname AS constraint_name,
       c.contype::text AS constraint_type,
       ARRAY(SELECT ca.attname
             FROM unnest(c.conkey) WITH ORDINALITY cols(colid, arridx)
             JOIN pg_attribute ca ON cols.colid = ca.attnum AND ca.attrelid = c.conrelid
             ORDER BY cols.arridx) AS columns,
       (SELECT fc.relname || '.' || fa.attname
        FROM pg_attribute fa
        JOIN pg_class fc ON fa.attrelid = fc.oid
        WHERE fa.attrelid = c.confrelid AND fa.attnum = c.confkey[1]) AS foreign_target
FROM pg_constraint c
JOIN pg_class cl ON c.conrelid = cl.oid
WHERE cl.relname = $1
  AND pg_catalog.pg_table_is_visible(cl.oid)
ORDER BY c.conname";

/// Index bookkeeping entries for a table. The engine has no physical
/// secondary indexes; anything reported here is catalog state only.
pub const TABLE_INDEXES: &str = "\
SELECT c2.relname AS index_name,
       idx.indisunique AS is_unique,
       idx.indisprimary AS is_primary,
       ARRAY(SELECT ia.attname
             FROM unnest(idx.indkey) WITH ORDINALITY cols(colid, arridx)
             JOIN pg_attribute ia ON cols.colid = ia.attnum AND ia.attrelid = c.oid
             ORDER BY cols.arridx) AS columns
FROM pg_class c
JOIN pg_index idx ON c.oid = idx.indrelid
JOIN pg_class c2 ON idx.indexrelid = c2.oid
WHERE c.relname = $1
ORDER BY c2.relname";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_query_shape() {
        assert!(TABLE_COLUMNS.starts_with("SELECT a.attname AS column_name"));
        assert!(TABLE_COLUMNS.contains("LEFT JOIN pg_attrdef ad"));
        assert!(TABLE_COLUMNS.contains("n.nspname NOT IN ('pg_catalog', 'pg_toast')"));
        assert!(TABLE_COLUMNS.ends_with("ORDER BY a.attnum"));
    }

    #[test]
    fn test_constraint_query_resolves_foreign_target() {
        assert!(TABLE_CONSTRAINTS.contains("fc.relname || '.' || fa.attname"));
        assert!(TABLE_CONSTRAINTS.contains("c.contype::text"));
    }

    #[test]
    fn test_index_query_shape() {
        assert!(TABLE_INDEXES.contains("pg_index"));
        assert!(TABLE_INDEXES.contains("idx.indisprimary"));
    }
}
