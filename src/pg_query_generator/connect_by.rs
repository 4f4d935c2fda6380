//! CONNECT BY to `WITH RECURSIVE` rewriting.
//!
//! An Oracle hierarchical query block becomes
//!
//! ```text
//! WITH RECURSIVE <table>_hierarchy AS (
//!   <base case>            -- START WITH rows, level 1
//!   UNION ALL
//!   <recursive case>       -- children joined through the PRIOR condition
//! )
//! <final select>
//! ```
//!
//! The analysis half validates the bounded shape (single named table,
//! START WITH present, exactly one `PRIOR col = col` comparison, no
//! NOCYCLE, no CONNECT_BY_ROOT / CONNECT_BY_ISLEAF) and collects the
//! distinct `SYS_CONNECT_BY_PATH` invocations; the generation half builds
//! the three parts. Column references in the recursive member are
//! qualified with the child alias by a string-level rewrite over the
//! emitted text, masking string literals first.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::oracle_sql_parser::ast::{
    BinaryOp, Expr, ExprKind, SelectItem, SelectStatement, TableExpr, UnaryOp,
};
use crate::utils::identifiers::normalize_oracle_name;

use super::{PgGeneratorError, SqlRenderer};

/// One materialized `SYS_CONNECT_BY_PATH(expr, sep)` column.
struct PathColumn {
    expr_sql: String,
    sep_sql: String,
    name: String,
}

/// How a select-list item participates in the rewrite.
enum ItemRole {
    /// Bare `LEVEL`; satisfied by the generated `level` column.
    Level,
    /// Bare `SYS_CONNECT_BY_PATH(...)`; satisfied by its `path_N` column.
    Path,
    /// Carried through the CTE under the given column name.
    Carried { name: String, named_by_itself: bool },
}

pub fn render_hierarchical_statement(
    renderer: &mut SqlRenderer<'_, '_, '_>,
    statement: &SelectStatement<'_>,
) -> Result<String, PgGeneratorError> {
    if !statement.unions.is_empty() {
        return Err(PgGeneratorError::UnionWithConnectBy);
    }
    let block = &statement.body;
    let connect_by = block.connect_by.as_ref().expect("hierarchical block");

    if connect_by.nocycle {
        return Err(PgGeneratorError::NocycleNotSupported);
    }
    for pseudo in ["connect_by_root", "connect_by_isleaf"] {
        if block.source.to_lowercase().contains(pseudo) {
            return Err(PgGeneratorError::UnsupportedPseudoColumn(
                pseudo.to_uppercase(),
            ));
        }
    }
    let Some(start_with) = &block.start_with else {
        return Err(PgGeneratorError::ConnectByWithoutStartWith);
    };
    if block.from.len() != 1 || !block.from[0].joins.is_empty() {
        return Err(PgGeneratorError::MultipleTablesInConnectBy);
    }
    let table_ref = &block.from[0];
    let TableExpr::Named(table_path) = &table_ref.table else {
        return Err(PgGeneratorError::SubqueryInConnectBy);
    };

    // paths may not appear inside filters
    for filter in [Some(start_with), block.where_clause.as_ref(), Some(&connect_by.condition)]
        .into_iter()
        .flatten()
    {
        if contains_path_call(filter) {
            return Err(PgGeneratorError::MisplacedConnectByPath);
        }
    }

    let (prior_column, child_column) = extract_prior_join(&connect_by.condition)?;

    let child_alias = table_ref
        .alias
        .map(normalize_oracle_name)
        .unwrap_or_else(|| "t".to_string());
    let hierarchy_alias = if child_alias == "h" { "hh" } else { "h" };
    let cte_name = format!("{}_hierarchy", normalize_oracle_name(table_path.last()));

    // distinct SYS_CONNECT_BY_PATH invocations, keyed by (expr, separator)
    let mut paths: Vec<PathColumn> = Vec::new();
    let mut roles: Vec<ItemRole> = Vec::with_capacity(block.select_list.len());
    for (i, item) in block.select_list.iter().enumerate() {
        roles.push(classify_item(renderer, item, i, &mut paths)?);
    }
    for order_item in &block.order_by {
        if let Some(call_key) = path_call_key(renderer, &order_item.expr)? {
            register_path(renderer, &mut paths, call_key);
        } else if contains_path_call(&order_item.expr) {
            return Err(PgGeneratorError::MisplacedConnectByPath);
        }
    }

    let level_one = "1".to_string();
    let level_next = format!("({}.level + 1)", hierarchy_alias);

    // ----- base case -----
    let mut base_columns: Vec<String> = Vec::new();
    let mut recursive_columns: Vec<String> = Vec::new();
    let mut exposed: Vec<String> = Vec::new();
    for (item, role) in block.select_list.iter().zip(&roles) {
        if let ItemRole::Carried { name, named_by_itself } = role {
            let base_sql = with_level(renderer, &level_one, |r| r.render_expr(&item.expr))?;
            let recursive_sql = qualify_columns(
                &with_level(renderer, &level_next, |r| r.render_expr(&item.expr))?,
                &child_alias,
            );
            if *named_by_itself {
                base_columns.push(base_sql);
                recursive_columns.push(recursive_sql);
            } else {
                base_columns.push(format!("{} AS {}", base_sql, name));
                recursive_columns.push(format!("{} AS {}", recursive_sql, name));
            }
            exposed.push(name.clone());
        }
    }

    // the join needs the parent key in the CTE even when it is not selected
    if !exposed.iter().any(|name| *name == prior_column) {
        base_columns.push(prior_column.clone());
        recursive_columns.push(format!("{}.{}", child_alias, prior_column));
        exposed.push(prior_column.clone());
    }

    base_columns.push("1 AS level".to_string());
    recursive_columns.push(format!("{}.level + 1 AS level", hierarchy_alias));

    for path in &paths {
        base_columns.push(format!("{} || {} AS {}", path.sep_sql, path.expr_sql, path.name));
        recursive_columns.push(format!(
            "{}.{} || {} || {} AS {}",
            hierarchy_alias,
            path.name,
            path.sep_sql,
            qualify_columns(&path.expr_sql, &child_alias),
            path.name
        ));
    }

    let table_sql = renderer.render_table_primary(&table_ref.table)?;
    let base_from = match table_ref.alias {
        Some(alias) => format!("{} {}", table_sql, normalize_oracle_name(alias)),
        None => table_sql.clone(),
    };

    let start_with_sql = with_level(renderer, &level_one, |r| r.render_expr(start_with))?;
    let mut base_case = format!(
        "SELECT {} FROM {} WHERE {}",
        base_columns.join(", "),
        base_from,
        start_with_sql
    );
    if let Some(where_clause) = &block.where_clause {
        let where_sql = with_level(renderer, &level_one, |r| r.render_expr(where_clause))?;
        base_case.push_str(&format!(" AND ({})", where_sql));
    }

    // ----- recursive case -----
    let mut recursive_case = format!(
        "SELECT {} FROM {} {} JOIN {} {} ON {}.{} = {}.{}",
        recursive_columns.join(", "),
        table_sql,
        child_alias,
        cte_name,
        hierarchy_alias,
        child_alias,
        child_column,
        hierarchy_alias,
        prior_column
    );
    if let Some(where_clause) = &block.where_clause {
        let where_sql = with_level(renderer, &level_next, |r| r.render_expr(where_clause))?;
        recursive_case.push_str(&format!(
            " WHERE {}",
            qualify_columns(&where_sql, &child_alias)
        ));
    }

    // ----- final select -----
    let path_replacements: HashMap<(String, String), String> = paths
        .iter()
        .map(|path| ((path.expr_sql.clone(), path.sep_sql.clone()), path.name.clone()))
        .collect();

    let mut final_items: Vec<String> = Vec::new();
    for (item, role) in block.select_list.iter().zip(&roles) {
        let mut sql = match role {
            ItemRole::Level => "level".to_string(),
            ItemRole::Path => {
                let key = path_call_key(renderer, &item.expr)?.expect("classified as path");
                path_replacements
                    .get(&key)
                    .cloned()
                    .expect("registered path")
            }
            ItemRole::Carried { name, .. } => name.clone(),
        };
        if let Some(alias) = item.alias {
            let alias = normalize_oracle_name(alias);
            if alias != sql {
                sql.push_str(&format!(" AS {}", alias));
            }
        }
        final_items.push(sql);
    }

    let mut final_select = format!(
        "SELECT {}{} FROM {}",
        if block.distinct { "DISTINCT " } else { "" },
        final_items.join(", "),
        cte_name
    );

    with_final_substitutions(renderer, path_replacements, |r| {
        if !block.group_by.is_empty() {
            let exprs: Result<Vec<_>, _> =
                block.group_by.iter().map(|expr| r.render_expr(expr)).collect();
            final_select.push_str(&format!(" GROUP BY {}", exprs?.join(", ")));
        }
        if let Some(having) = &block.having {
            final_select.push_str(&format!(" HAVING {}", r.render_expr(having)?));
        }
        if !block.order_by.is_empty() {
            final_select.push_str(&format!(" ORDER BY {}", r.render_order_items(&block.order_by)?));
        }
        Ok::<(), PgGeneratorError>(())
    })?;

    // ----- assemble, keeping any statement-level CTEs -----
    let mut cte_defs: Vec<String> = Vec::new();
    for cte in &statement.ctes {
        let inner = renderer.render_select_statement(&cte.query)?;
        let columns = match &cte.columns {
            Some(columns) => format!(
                " ({})",
                columns
                    .iter()
                    .map(|column| normalize_oracle_name(column))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            None => String::new(),
        };
        cte_defs.push(format!(
            "{}{} AS ({})",
            normalize_oracle_name(cte.name),
            columns,
            inner
        ));
    }
    cte_defs.push(format!(
        "{} AS (\n  {}\n  UNION ALL\n  {}\n)",
        cte_name, base_case, recursive_case
    ));

    Ok(format!(
        "WITH RECURSIVE {}\n{}",
        cte_defs.join(", "),
        final_select
    ))
}

/// Temporarily install a LEVEL replacement on the renderer.
fn with_level<R>(
    renderer: &mut SqlRenderer<'_, '_, '_>,
    replacement: &str,
    f: impl FnOnce(&mut SqlRenderer<'_, '_, '_>) -> R,
) -> R {
    let saved = std::mem::replace(&mut renderer.level_replacement, Some(replacement.to_string()));
    let result = f(renderer);
    renderer.level_replacement = saved;
    result
}

/// Temporarily install the final-select substitutions (LEVEL -> `level`,
/// path calls -> their generated columns).
fn with_final_substitutions<R>(
    renderer: &mut SqlRenderer<'_, '_, '_>,
    path_replacements: HashMap<(String, String), String>,
    f: impl FnOnce(&mut SqlRenderer<'_, '_, '_>) -> R,
) -> R {
    let saved_level = std::mem::replace(&mut renderer.level_replacement, Some("level".to_string()));
    let saved_paths = std::mem::replace(&mut renderer.path_replacements, path_replacements);
    let result = f(renderer);
    renderer.level_replacement = saved_level;
    renderer.path_replacements = saved_paths;
    result
}

fn classify_item(
    renderer: &mut SqlRenderer<'_, '_, '_>,
    item: &SelectItem<'_>,
    index: usize,
    paths: &mut Vec<PathColumn>,
) -> Result<ItemRole, PgGeneratorError> {
    if is_bare_level(&item.expr) {
        return Ok(ItemRole::Level);
    }
    if let Some(key) = path_call_key(renderer, &item.expr)? {
        register_path(renderer, paths, key);
        return Ok(ItemRole::Path);
    }
    if contains_path_call(&item.expr) {
        return Err(PgGeneratorError::MisplacedConnectByPath);
    }
    let named_by_itself = item.alias.is_none() && item.expr.as_column_path().is_some();
    let name = item
        .alias
        .map(normalize_oracle_name)
        .or_else(|| {
            item.expr
                .as_column_path()
                .map(|path| normalize_oracle_name(path.last()))
        })
        .unwrap_or_else(|| {
            let generated = format!("column_{index}");
            renderer.ctx.warn(format!(
                "select-list element {} of the hierarchical query has no name; \
                 defaulted to '{}'",
                index + 1,
                generated
            ));
            generated
        });
    Ok(ItemRole::Carried {
        name,
        named_by_itself,
    })
}

fn is_bare_level(expr: &Expr<'_>) -> bool {
    matches!(
        &expr.kind,
        ExprKind::Column(path)
            if path.segments.len() == 1 && path.last().eq_ignore_ascii_case("level")
    )
}

/// `(rendered expr, rendered separator)` when the expression is a direct
/// `SYS_CONNECT_BY_PATH` call.
fn path_call_key(
    renderer: &mut SqlRenderer<'_, '_, '_>,
    expr: &Expr<'_>,
) -> Result<Option<(String, String)>, PgGeneratorError> {
    let ExprKind::FunctionCall(call) = &expr.kind else {
        return Ok(None);
    };
    if call.name.segments.len() != 1
        || !call.name.last().eq_ignore_ascii_case("sys_connect_by_path")
    {
        return Ok(None);
    }
    if call.args.len() != 2 {
        return Err(PgGeneratorError::MisplacedConnectByPath);
    }
    let expr_sql = renderer.render_expr(&call.args[0])?;
    let sep_sql = renderer.render_expr(&call.args[1])?;
    Ok(Some((expr_sql, sep_sql)))
}

fn register_path(
    renderer: &mut SqlRenderer<'_, '_, '_>,
    paths: &mut Vec<PathColumn>,
    key: (String, String),
) {
    if paths
        .iter()
        .any(|path| path.expr_sql == key.0 && path.sep_sql == key.1)
    {
        return;
    }
    let name = renderer.ctx.next_generated_name("path");
    paths.push(PathColumn {
        expr_sql: key.0,
        sep_sql: key.1,
        name,
    });
}

fn contains_path_call(expr: &Expr<'_>) -> bool {
    expr.source.to_lowercase().contains("sys_connect_by_path")
}

/// Extract the parent/child join columns from the CONNECT BY condition:
/// `PRIOR x = y` or `y = PRIOR x`, qualifiers stripped.
fn extract_prior_join(condition: &Expr<'_>) -> Result<(String, String), PgGeneratorError> {
    match &condition.kind {
        ExprKind::Paren(inner) => extract_prior_join(inner),
        ExprKind::Binary {
            op: BinaryOp::Eq,
            left,
            right,
        } => {
            if let Some(prior) = as_prior_column(left) {
                let child = as_plain_column(right)
                    .ok_or(PgGeneratorError::UnsupportedConnectByCondition)?;
                return Ok((prior, child));
            }
            if let Some(prior) = as_prior_column(right) {
                let child = as_plain_column(left)
                    .ok_or(PgGeneratorError::UnsupportedConnectByCondition)?;
                return Ok((prior, child));
            }
            Err(PgGeneratorError::NoPriorInConnectBy)
        }
        _ => {
            if contains_prior(condition) {
                Err(PgGeneratorError::UnsupportedConnectByCondition)
            } else {
                Err(PgGeneratorError::NoPriorInConnectBy)
            }
        }
    }
}

fn as_prior_column(expr: &Expr<'_>) -> Option<String> {
    match &expr.kind {
        ExprKind::Paren(inner) => as_prior_column(inner),
        ExprKind::Unary {
            op: UnaryOp::Prior,
            operand,
        } => as_plain_column(operand),
        _ => None,
    }
}

fn as_plain_column(expr: &Expr<'_>) -> Option<String> {
    expr.as_column_path()
        .map(|path| normalize_oracle_name(path.last()))
}

fn contains_prior(expr: &Expr<'_>) -> bool {
    expr.source.to_lowercase().contains("prior")
}

lazy_static! {
    /// Bare or double-quoted identifiers in emitted PostgreSQL text.
    static ref IDENTIFIER_RE: Regex =
        Regex::new(r#""[^"]*"|[A-Za-z_][A-Za-z0-9_$#]*"#).expect("valid regex");
}

/// Keywords (and keyword-like emitted tokens) that must never be
/// qualified in the recursive member's WHERE clause.
fn is_qualification_keyword(token: &str) -> bool {
    const KEYWORDS: &[&str] = &[
        "ALL", "AND", "ANY", "AS", "ASC", "BETWEEN", "CASE", "CAST", "CURRENT_DATE",
        "CURRENT_TIMESTAMP", "CURRENT_USER", "DATE", "DESC", "DISTINCT", "ELSE", "END",
        "EXISTS", "FALSE", "FROM", "IN", "INTERVAL", "IS", "LIKE", "LOCALTIMESTAMP", "NOT",
        "NULL", "OR", "SELECT", "SOME", "THEN", "TIMESTAMP", "TRUE", "WHEN", "WHERE",
    ];
    let upper = token.to_uppercase();
    KEYWORDS.contains(&upper.as_str())
}

/// Prefix every free-standing column identifier with `alias.`.
///
/// String literals are masked and restored verbatim; identifiers already
/// qualified (preceded by a dot), acting as qualifiers (followed by a
/// dot), or naming functions (followed by an opening parenthesis) are
/// left alone, as are keywords.
pub(crate) fn qualify_columns(sql: &str, alias: &str) -> String {
    let (masked, literals) = mask_string_literals(sql);
    let mut result = String::with_capacity(masked.len() + 16);
    let mut last_end = 0;

    for matched in IDENTIFIER_RE.find_iter(&masked) {
        result.push_str(&masked[last_end..matched.start()]);
        let token = matched.as_str();
        let preceding = masked[..matched.start()].trim_end().chars().next_back();
        let following = masked[matched.end()..].trim_start().chars().next();
        let quoted = token.starts_with('"');

        let qualify = preceding != Some('.')
            && following != Some('.')
            && following != Some('(')
            && (quoted || !is_qualification_keyword(token));
        if qualify {
            result.push_str(alias);
            result.push('.');
        }
        result.push_str(token);
        last_end = matched.end();
    }
    result.push_str(&masked[last_end..]);
    restore_string_literals(result, &literals)
}

/// Replace `'...'` literals (with `''` doubling) by placeholders the
/// identifier regex cannot match.
fn mask_string_literals(sql: &str) -> (String, Vec<String>) {
    let mut masked = String::with_capacity(sql.len());
    let mut literals = Vec::new();
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\'' {
            masked.push(ch);
            continue;
        }
        let mut literal = String::from('\'');
        loop {
            match chars.next() {
                Some('\'') => {
                    if chars.peek() == Some(&'\'') {
                        literal.push_str("''");
                        chars.next();
                    } else {
                        literal.push('\'');
                        break;
                    }
                }
                Some(c) => literal.push(c),
                None => break,
            }
        }
        masked.push_str(&format!("\u{1}{}\u{1}", literals.len()));
        literals.push(literal);
    }
    (masked, literals)
}

fn restore_string_literals(sql: String, literals: &[String]) -> String {
    let mut result = sql;
    for (i, literal) in literals.iter().enumerate() {
        result = result.replace(&format!("\u{1}{}\u{1}", i), literal);
    }
    result
}
