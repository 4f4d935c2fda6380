//! Pseudo-column typing.

use super::types::ValueType;

/// Type an identifier that is one of Oracle's pseudo-columns. Returns
/// `None` for ordinary identifiers so the caller can fall through to
/// column resolution.
pub fn resolve_pseudo_column(name: &str) -> Option<ValueType> {
    match name.to_lowercase().as_str() {
        "sysdate" | "current_date" => Some(ValueType::date()),
        "systimestamp" | "current_timestamp" | "localtimestamp" => Some(ValueType::timestamp()),
        "rownum" | "level" | "uid" => Some(ValueType::numeric()),
        "user" | "rowid" | "sessiontimezone" | "dbtimezone" => Some(ValueType::text()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_inference::types::TypeCategory;

    #[test]
    fn pseudo_column_table() {
        assert_eq!(resolve_pseudo_column("SYSDATE").unwrap().category, TypeCategory::Date);
        assert_eq!(
            resolve_pseudo_column("systimestamp").unwrap().category,
            TypeCategory::Timestamp
        );
        assert_eq!(resolve_pseudo_column("LEVEL").unwrap().category, TypeCategory::Numeric);
        assert_eq!(resolve_pseudo_column("rownum").unwrap().category, TypeCategory::Numeric);
        assert_eq!(resolve_pseudo_column("USER").unwrap().category, TypeCategory::Text);
        assert_eq!(resolve_pseudo_column("dbtimezone").unwrap().category, TypeCategory::Text);
        assert!(resolve_pseudo_column("emp_id").is_none());
    }
}
