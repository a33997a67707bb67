//! Purpose: Normalize raw column and table names into statement-safe identifiers.
//! Exports: `sanitize_identifier`, `normalize_table_name`, `field_list`.
//! Role: Pure string helpers used by schema building and row insertion.
//! Invariants: Column names replace `:`, `.`, space and `-` with `_`; table names only spaces.
//! Invariants: Both functions are idempotent; collisions are the caller's concern.

const IDENTIFIER_REPLACED: [char; 4] = [':', '.', ' ', '-'];

/// Replace every `:`, `.`, space and `-` in a column name with `_`.
pub fn sanitize_identifier(name: &str) -> String {
    IDENTIFIER_REPLACED
        .iter()
        .fold(name.to_string(), |acc, ch| acc.replace(*ch, "_"))
}

/// Table names only have spaces converted; `:`, `.` and `-` are kept.
pub fn normalize_table_name(name: &str) -> String {
    name.replace(' ', "_")
}

/// Sanitized column names joined with `, `, in dataset order.
pub fn field_list<'a, I>(names: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .map(sanitize_identifier)
        .collect::<Vec<_>>()
        .join(", ")
}
