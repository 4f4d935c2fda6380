//! Column reference typing against the alias and CTE scopes.

use crate::oracle_sql_parser::ast::IdentPath;
use crate::schema_catalog::MetadataIndex;

use super::scopes::{CteDef, ScopeStack};
use super::types::ValueType;

/// Resolve a (possibly qualified) column reference.
///
/// Qualified references try, in order: a CTE named like the qualifier, a
/// table alias (which itself may point at a CTE or inline view), and a
/// direct table key. The alias mapping preserves explicit schema
/// qualifiers, so `ws1.col` over `co_abs.abs_werk_sperren ws1` is looked
/// up under the `co_abs` schema and not the current one.
///
/// Unqualified references scan every table in scope, innermost frame
/// first; the first frame with exactly one owning table wins, and two
/// owning tables inside the same frame make the reference ambiguous
/// (UNKNOWN).
pub fn resolve_column(
    path: &IdentPath<'_>,
    index: &MetadataIndex,
    current_schema: &str,
    aliases: &ScopeStack<String>,
    ctes: &ScopeStack<CteDef>,
) -> ValueType {
    if path.segments.len() == 1 {
        return resolve_unqualified(&path.joined_lower(), index, current_schema, aliases, ctes);
    }

    let qualifier = path.qualifier().expect("qualified path");
    let column = path.last().to_lowercase();

    // a CTE named like the qualifier
    if !qualifier.contains('.') {
        if let Some(cte) = ctes.lookup(&qualifier) {
            return cte.column_type(&column).cloned().unwrap_or_default();
        }
        // a table alias; the aliased name may itself be a CTE
        if let Some(table) = aliases.lookup(&qualifier) {
            if let Some(cte) = ctes.lookup(table) {
                return cte.column_type(&column).cloned().unwrap_or_default();
            }
            return index
                .column_type(table, &column, current_schema)
                .map(ValueType::from_column_info)
                .unwrap_or_default();
        }
    }

    // a direct (possibly schema-qualified) table key
    if let Some(info) = index.column_type(&qualifier, &column, current_schema) {
        return ValueType::from_column_info(info);
    }

    log::debug!("column resolver: no source for '{}'", path.joined_lower());
    ValueType::unknown()
}

fn resolve_unqualified(
    column: &str,
    index: &MetadataIndex,
    current_schema: &str,
    aliases: &ScopeStack<String>,
    ctes: &ScopeStack<CteDef>,
) -> ValueType {
    for frame in aliases.frames() {
        let mut found: Option<ValueType> = None;
        let mut owners = 0usize;
        for table in frame.values() {
            let candidate = if let Some(cte) = ctes.lookup(table) {
                cte.column_type(column).cloned()
            } else {
                index
                    .column_type(table, column, current_schema)
                    .map(ValueType::from_column_info)
            };
            if let Some(value_type) = candidate {
                owners += 1;
                found = Some(value_type);
            }
        }
        match owners {
            0 => continue,
            1 => return found.expect("one owner"),
            _ => {
                log::debug!("column resolver: '{}' is ambiguous in scope", column);
                return ValueType::unknown();
            }
        }
    }
    log::debug!("column resolver: '{}' not found in any scope", column);
    ValueType::unknown()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_inference::types::TypeCategory;

    fn index() -> MetadataIndex {
        let mut index = MetadataIndex::new();
        index
            .add_column("co_abs.abs_werk_sperren", "spa_abgelehnt_am", "DATE")
            .add_column("hr.employees", "emp_id", "NUMBER(10)")
            .add_column("hr.employees", "name", "VARCHAR2(100)")
            .add_column("hr.departments", "name", "VARCHAR2(100)")
            .add_column("hr.departments", "dept_id", "NUMBER(4)");
        index
    }

    fn scopes_with(entries: &[(&str, &str)]) -> ScopeStack<String> {
        let mut aliases = ScopeStack::new();
        aliases.push_frame();
        for (alias, table) in entries {
            aliases.insert(alias, table.to_string());
        }
        aliases
    }

    #[test]
    fn alias_preserves_schema_qualifier() {
        let index = index();
        let aliases = scopes_with(&[("ws1", "co_abs.abs_werk_sperren")]);
        let ctes = ScopeStack::new();
        let path = IdentPath {
            segments: vec!["ws1", "spa_abgelehnt_am"],
        };
        // current schema differs from the table's schema on purpose
        let ty = resolve_column(&path, &index, "co_xm_pub_core", &aliases, &ctes);
        assert_eq!(ty.category, TypeCategory::Date);
    }

    #[test]
    fn unqualified_single_owner() {
        let index = index();
        let aliases = scopes_with(&[("e", "hr.employees")]);
        let ctes = ScopeStack::new();
        let path = IdentPath::single("emp_id");
        let ty = resolve_column(&path, &index, "hr", &aliases, &ctes);
        assert_eq!(ty.category, TypeCategory::Numeric);
    }

    #[test]
    fn unqualified_ambiguous_in_same_scope() {
        let index = index();
        let aliases = scopes_with(&[("e", "hr.employees"), ("d", "hr.departments")]);
        let ctes = ScopeStack::new();
        let path = IdentPath::single("name");
        let ty = resolve_column(&path, &index, "hr", &aliases, &ctes);
        assert!(ty.is_unknown());
    }

    #[test]
    fn inner_scope_wins_over_outer() {
        let index = index();
        let mut aliases = ScopeStack::new();
        aliases.push_frame();
        aliases.insert("e", "hr.employees".to_string());
        aliases.push_frame();
        aliases.insert("d", "hr.departments".to_string());
        let ctes = ScopeStack::new();
        // dept_id only exists in the inner frame's table
        let ty = resolve_column(&IdentPath::single("dept_id"), &index, "hr", &aliases, &ctes);
        assert_eq!(ty.category, TypeCategory::Numeric);
        // emp_id falls through to the outer frame (correlated subquery)
        let ty = resolve_column(&IdentPath::single("emp_id"), &index, "hr", &aliases, &ctes);
        assert_eq!(ty.category, TypeCategory::Numeric);
    }

    #[test]
    fn cte_columns_resolve_through_alias() {
        let index = index();
        let mut ctes: ScopeStack<CteDef> = ScopeStack::new();
        ctes.push_frame();
        ctes.insert(
            "c",
            CteDef {
                columns: vec![("tg".to_string(), ValueType::numeric())],
            },
        );
        let aliases = scopes_with(&[("c", "c")]);
        // qualified by the CTE name
        let ty = resolve_column(
            &IdentPath {
                segments: vec!["c", "tg"],
            },
            &index,
            "hr",
            &aliases,
            &ctes,
        );
        assert_eq!(ty.category, TypeCategory::Numeric);
        // unqualified, through the FROM alias
        let ty = resolve_column(&IdentPath::single("tg"), &index, "hr", &aliases, &ctes);
        assert_eq!(ty.category, TypeCategory::Numeric);
    }

    #[test]
    fn unknown_reference() {
        let index = index();
        let aliases = scopes_with(&[("e", "hr.employees")]);
        let ctes = ScopeStack::new();
        let ty = resolve_column(&IdentPath::single("nope"), &index, "hr", &aliases, &ctes);
        assert!(ty.is_unknown());
    }
}
