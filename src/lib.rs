//! orapg - Oracle to PostgreSQL SQL / PL/SQL transformation engine.
//!
//! A two-pass compiler over a bounded Oracle subset:
//!
//! 1. the parser produces a borrowed AST whose nodes carry stable span
//!    keys,
//! 2. the type-analysis pass walks it post-order against an immutable
//!    metadata index and fills a span-keyed type cache,
//! 3. the emission pass walks it again and produces PostgreSQL text,
//!    consulting the cache for type-dependent rewrites and delegating
//!    CONNECT BY blocks to the recursive-CTE transformer.
//!
//! The crate is a library: a transformation is a pure function of
//! `(oracle_text, current_schema, metadata_index)`, transformations own
//! all their mutable state, and the shared metadata index is read-only,
//! so independent transformations can run on independent threads.

pub mod diagnostics;
pub mod oracle_sql_parser;
pub mod pg_query_generator;
pub mod schema_catalog;
pub mod type_inference;
pub mod utils;

pub use diagnostics::{Diagnostic, Severity};
pub use pg_query_generator::PgGeneratorError;
pub use schema_catalog::{
    resolve_synonym, ChainResolution, ColumnTypeInfo, MetadataIndex, MethodSignature,
    SynonymTarget, TypeField,
};
pub use type_inference::{TypeCategory, ValueType};

use oracle_sql_parser::{strip_comments, ParseIssue};
use pg_query_generator::{SqlRenderer, TransformationContext};

/// Outcome of one transformation. Success iff `postgres_sql` is present;
/// diagnostics accompany both outcomes.
#[derive(Debug)]
pub struct TransformationResult {
    pub postgres_sql: Option<String>,
    pub error_message: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl TransformationResult {
    pub fn success(&self) -> bool {
        self.postgres_sql.is_some()
    }

    fn parse_failure(issues: Vec<ParseIssue>) -> Self {
        let message = issues
            .iter()
            .map(|issue| {
                if issue.near.is_empty() {
                    format!("{} (offset {})", issue.message, issue.offset)
                } else {
                    format!(
                        "{} near '{}' (offset {})",
                        issue.message, issue.near, issue.offset
                    )
                }
            })
            .collect::<Vec<_>>()
            .join("; ");
        TransformationResult {
            postgres_sql: None,
            error_message: Some(format!("parse failed: {}", message)),
            diagnostics: Vec::new(),
        }
    }
}

/// Transform an Oracle SELECT statement (view body, query) into
/// PostgreSQL.
pub fn transform_select(
    oracle_sql: &str,
    current_schema: &str,
    index: &MetadataIndex,
) -> TransformationResult {
    let cleaned = strip_comments(oracle_sql);
    let outcome = oracle_sql_parser::parse_select(&cleaned);
    let Some(statement) = outcome.value else {
        return TransformationResult::parse_failure(outcome.issues);
    };
    let analysis = type_inference::analyze_select(&cleaned, &statement, index, current_schema);
    let mut ctx =
        TransformationContext::new(index, current_schema, analysis.cache, analysis.diagnostics);
    let rendered = SqlRenderer::new(&cleaned, &mut ctx).render_select_statement(&statement);
    finish(rendered, ctx)
}

/// Transform an Oracle PL/SQL function definition into a
/// `LANGUAGE plpgsql` function.
pub fn transform_function(
    oracle_plsql: &str,
    current_schema: &str,
    index: &MetadataIndex,
) -> TransformationResult {
    let cleaned = strip_comments(oracle_plsql);
    let outcome = oracle_sql_parser::parse_function(&cleaned);
    let Some(declaration) = outcome.value else {
        return TransformationResult::parse_failure(outcome.issues);
    };
    let analysis = type_inference::analyze_callable(&cleaned, &declaration, index, current_schema);
    let mut ctx =
        TransformationContext::new(index, current_schema, analysis.cache, analysis.diagnostics);
    let rendered = SqlRenderer::new(&cleaned, &mut ctx).render_callable(&declaration);
    finish(rendered, ctx)
}

/// Transform an Oracle PL/SQL procedure definition into a
/// `LANGUAGE plpgsql` procedure.
pub fn transform_procedure(
    oracle_plsql: &str,
    current_schema: &str,
    index: &MetadataIndex,
) -> TransformationResult {
    let cleaned = strip_comments(oracle_plsql);
    let outcome = oracle_sql_parser::parse_procedure(&cleaned);
    let Some(declaration) = outcome.value else {
        return TransformationResult::parse_failure(outcome.issues);
    };
    let analysis = type_inference::analyze_callable(&cleaned, &declaration, index, current_schema);
    let mut ctx =
        TransformationContext::new(index, current_schema, analysis.cache, analysis.diagnostics);
    let rendered = SqlRenderer::new(&cleaned, &mut ctx).render_callable(&declaration);
    finish(rendered, ctx)
}

/// Transform a standalone Oracle scalar expression.
pub fn transform_expression(
    oracle_expr: &str,
    current_schema: &str,
    index: &MetadataIndex,
) -> TransformationResult {
    let cleaned = strip_comments(oracle_expr);
    let outcome = oracle_sql_parser::parse_expression(&cleaned);
    let Some(expression) = outcome.value else {
        return TransformationResult::parse_failure(outcome.issues);
    };
    let analysis = type_inference::analyze_expression(&cleaned, &expression, index, current_schema);
    let mut ctx =
        TransformationContext::new(index, current_schema, analysis.cache, analysis.diagnostics);
    let rendered = SqlRenderer::new(&cleaned, &mut ctx).render_expression(&expression);
    finish(rendered, ctx)
}

fn finish(
    rendered: Result<String, PgGeneratorError>,
    ctx: TransformationContext<'_>,
) -> TransformationResult {
    match rendered {
        Ok(postgres_sql) => TransformationResult {
            postgres_sql: Some(postgres_sql),
            error_message: None,
            diagnostics: ctx.diagnostics,
        },
        Err(error) => TransformationResult {
            postgres_sql: None,
            error_message: Some(error.to_string()),
            diagnostics: ctx.diagnostics,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_round_trip() {
        let index = MetadataIndex::new();
        let result = transform_select("SELECT 100 + 50 FROM dual", "hr", &index);
        assert!(result.success(), "{:?}", result.error_message);
        assert_eq!(result.postgres_sql.as_deref(), Some("SELECT 100 + 50"));
    }

    #[test]
    fn parse_failures_are_reported_not_raised() {
        let index = MetadataIndex::new();
        let result = transform_select("SELECT FROM", "hr", &index);
        assert!(!result.success());
        assert!(result.error_message.unwrap().starts_with("parse failed"));
    }

    #[test]
    fn transformations_are_idempotent() {
        let mut index = MetadataIndex::new();
        index.add_column("hr.emp", "sal", "NUMBER(8,2)");
        let sql = "SELECT NVL(sal, 0) FROM emp WHERE sal > 10 ORDER BY sal DESC";
        let a = transform_select(sql, "hr", &index);
        let b = transform_select(sql, "hr", &index);
        assert_eq!(a.postgres_sql, b.postgres_sql);
    }

    #[test]
    fn expression_entry_point() {
        let index = MetadataIndex::new();
        let result = transform_expression("NVL(x, 0) + 1", "hr", &index);
        assert!(result.success());
        let sql = result.postgres_sql.unwrap();
        assert!(sql.contains("coalesce"), "{sql}");
    }
}
