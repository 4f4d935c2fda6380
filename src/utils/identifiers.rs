//! Identifier handling at the Oracle/PostgreSQL boundary.
//!
//! Oracle reports object names in upper case unless they were created
//! quoted; PostgreSQL folds unquoted names to lower case. Internally the
//! engine works with lower-case names everywhere and only switches to the
//! upper-case form when a key is compared against Oracle-reported metadata.

/// PostgreSQL reserved words (reserved and type/function-name categories
/// of the PostgreSQL scanner). Unreserved keywords such as `level` or
/// `name` are legal bare identifiers and are intentionally absent.
///
/// Kept sorted so `is_pg_reserved` can binary-search.
static PG_RESERVED_WORDS: &[&str] = &[
    "all",
    "analyse",
    "analyze",
    "and",
    "any",
    "array",
    "as",
    "asc",
    "asymmetric",
    "authorization",
    "binary",
    "both",
    "case",
    "cast",
    "check",
    "collate",
    "collation",
    "column",
    "concurrently",
    "constraint",
    "create",
    "cross",
    "current_catalog",
    "current_date",
    "current_role",
    "current_schema",
    "current_time",
    "current_timestamp",
    "current_user",
    "default",
    "deferrable",
    "desc",
    "distinct",
    "do",
    "else",
    "end",
    "except",
    "false",
    "fetch",
    "for",
    "foreign",
    "freeze",
    "from",
    "full",
    "grant",
    "group",
    "having",
    "ilike",
    "in",
    "initially",
    "inner",
    "intersect",
    "into",
    "is",
    "isnull",
    "join",
    "lateral",
    "leading",
    "left",
    "like",
    "limit",
    "localtime",
    "localtimestamp",
    "natural",
    "not",
    "notnull",
    "null",
    "offset",
    "on",
    "only",
    "or",
    "order",
    "outer",
    "overlaps",
    "placing",
    "primary",
    "references",
    "returning",
    "right",
    "select",
    "session_user",
    "similar",
    "some",
    "symmetric",
    "system_user",
    "table",
    "tablesample",
    "then",
    "to",
    "trailing",
    "true",
    "union",
    "unique",
    "user",
    "using",
    "variadic",
    "verbose",
    "when",
    "where",
    "window",
    "with",
];

/// Strip surrounding double quotes and fold to the engine-internal
/// lower-case form.
pub fn normalize_oracle_name(name: &str) -> String {
    strip_quotes(name).to_lowercase()
}

/// Strip surrounding double quotes and fold to the upper-case form Oracle
/// uses when reporting catalog metadata.
pub fn oracle_metadata_key(name: &str) -> String {
    strip_quotes(name).to_uppercase()
}

fn strip_quotes(name: &str) -> &str {
    let trimmed = name.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

/// Whether `name` (already lower-cased) is a PostgreSQL reserved word.
pub fn is_pg_reserved(name: &str) -> bool {
    PG_RESERVED_WORDS.binary_search(&name).is_ok()
}

/// Whether an identifier can be emitted bare. Bare identifiers must match
/// `[a-z_][a-z0-9_]*` and must not be reserved.
pub fn needs_quoting(name: &str) -> bool {
    if name.is_empty() {
        return true;
    }
    let mut chars = name.chars();
    let first = chars.next().expect("non-empty");
    if !(first.is_ascii_lowercase() || first == '_') {
        return true;
    }
    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
        return true;
    }
    is_pg_reserved(name)
}

/// Emit an identifier for PostgreSQL, quoting when required. Embedded
/// double quotes are doubled per the SQL rules.
pub fn quote_ident(name: &str) -> String {
    if needs_quoting(name) {
        format!("\"{}\"", name.replace('"', "\"\""))
    } else {
        name.to_string()
    }
}

/// Normalize and quote in one step. This is what the emission pass calls
/// for every identifier it writes.
pub fn emit_ident(name: &str) -> String {
    quote_ident(&normalize_oracle_name(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_words_are_sorted() {
        let mut sorted = PG_RESERVED_WORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, PG_RESERVED_WORDS);
    }

    #[test]
    fn test_normalize_oracle_name() {
        assert_eq!(normalize_oracle_name("EMPLOYEES"), "employees");
        assert_eq!(normalize_oracle_name("\"MixedCase\""), "mixedcase");
        assert_eq!(normalize_oracle_name("  hr  "), "hr");
    }

    #[test]
    fn test_oracle_metadata_key() {
        assert_eq!(oracle_metadata_key("employees"), "EMPLOYEES");
        assert_eq!(oracle_metadata_key("\"emp\""), "EMP");
    }

    #[test]
    fn plain_identifiers_stay_bare() {
        assert_eq!(quote_ident("emp_id"), "emp_id");
        assert_eq!(quote_ident("_hidden"), "_hidden");
        assert_eq!(quote_ident("t1"), "t1");
        // unreserved keywords stay bare too
        assert_eq!(quote_ident("level"), "level");
        assert_eq!(quote_ident("name"), "name");
    }

    #[test]
    fn reserved_and_odd_identifiers_are_quoted() {
        assert_eq!(quote_ident("user"), "\"user\"");
        assert_eq!(quote_ident("order"), "\"order\"");
        assert_eq!(quote_ident("2fast"), "\"2fast\"");
        assert_eq!(quote_ident("Mixed"), "\"Mixed\"");
        assert_eq!(quote_ident("with space"), "\"with space\"");
        assert_eq!(quote_ident("odd\"one"), "\"odd\"\"one\"");
    }

    #[test]
    fn emit_ident_normalizes_then_quotes() {
        assert_eq!(emit_ident("EMPLOYEES"), "employees");
        assert_eq!(emit_ident("ORDER"), "\"order\"");
    }
}
