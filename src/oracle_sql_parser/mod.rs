//! nom-based recogniser for the Oracle SQL / PL/SQL subset the engine
//! rewrites.
//!
//! Entry points return a [`ParseOutcome`]: errors are collected with
//! location detail instead of raised, so a caller can log and skip the
//! affected object. Callers strip comments first (see
//! [`strip_comments`]) and keep the cleaned text alive for the lifetime
//! of the borrowed AST.

pub mod ast;
pub mod common;
mod errors;
mod expression;
mod plsql;
mod select;

use nom::Offset;

use ast::{CallableKind, Expr, FunctionDecl, SelectStatement};
use common::PResult;
pub use common::strip_comments;
pub use errors::OracleParsingError;

/// One collected parse problem, located by byte offset into the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIssue {
    pub offset: usize,
    /// Short excerpt of the input at the failure point.
    pub near: String,
    pub message: String,
}

impl ParseIssue {
    fn at(source: &str, remaining: &str, message: impl Into<String>) -> Self {
        ParseIssue {
            offset: source.offset(remaining),
            near: remaining.chars().take(40).collect(),
            message: message.into(),
        }
    }
}

/// Result of a parse: either a value, or the collected issues.
#[derive(Debug)]
pub struct ParseOutcome<T> {
    pub value: Option<T>,
    pub issues: Vec<ParseIssue>,
}

impl<T> ParseOutcome<T> {
    pub fn success(&self) -> bool {
        self.value.is_some()
    }
}

fn finish<'a, T>(source: &'a str, result: PResult<'a, T>) -> ParseOutcome<T> {
    match result {
        Ok((rest, value)) => {
            let trailing = rest.trim().trim_end_matches('/').trim().trim_end_matches(';').trim();
            if trailing.is_empty() {
                ParseOutcome {
                    value: Some(value),
                    issues: Vec::new(),
                }
            } else {
                ParseOutcome {
                    value: None,
                    issues: vec![ParseIssue::at(
                        source,
                        rest.trim_start(),
                        "unexpected trailing input",
                    )],
                }
            }
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => ParseOutcome {
            value: None,
            issues: e
                .errors
                .into_iter()
                .map(|(remaining, context)| ParseIssue::at(source, remaining, context))
                .collect(),
        },
        Err(nom::Err::Incomplete(_)) => ParseOutcome {
            value: None,
            issues: vec![ParseIssue {
                offset: source.len(),
                near: String::new(),
                message: "unexpected end of input".to_string(),
            }],
        },
    }
}

/// Parse a SELECT statement (with optional WITH clause and UNION chain).
pub fn parse_select(source: &str) -> ParseOutcome<SelectStatement<'_>> {
    finish(source, select::parse_select_statement(source))
}

/// Parse a `CREATE [OR REPLACE] FUNCTION` definition.
pub fn parse_function(source: &str) -> ParseOutcome<FunctionDecl<'_>> {
    let outcome = finish(source, plsql::parse_callable(source));
    expect_kind(source, outcome, CallableKind::Function)
}

/// Parse a `CREATE [OR REPLACE] PROCEDURE` definition.
pub fn parse_procedure(source: &str) -> ParseOutcome<FunctionDecl<'_>> {
    let outcome = finish(source, plsql::parse_callable(source));
    expect_kind(source, outcome, CallableKind::Procedure)
}

fn expect_kind<'a>(
    source: &'a str,
    outcome: ParseOutcome<FunctionDecl<'a>>,
    expected: CallableKind,
) -> ParseOutcome<FunctionDecl<'a>> {
    match outcome.value {
        Some(decl) if decl.kind != expected => ParseOutcome {
            value: None,
            issues: vec![ParseIssue {
                offset: 0,
                near: source.chars().take(40).collect(),
                message: match expected {
                    CallableKind::Function => "expected a FUNCTION, found a PROCEDURE".to_string(),
                    CallableKind::Procedure => "expected a PROCEDURE, found a FUNCTION".to_string(),
                },
            }],
        },
        value => ParseOutcome {
            value,
            issues: outcome.issues,
        },
    }
}

/// Parse a standalone scalar expression.
pub fn parse_expression(source: &str) -> ParseOutcome<Expr<'_>> {
    finish(source, expression::parse_expression(source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_with_trailing_semicolon() {
        assert!(parse_select("SELECT 1 FROM dual;").success());
        assert!(parse_select("SELECT 1 FROM dual").success());
    }

    #[test]
    fn parse_failure_reports_location() {
        let outcome = parse_select("SELECT FROM dual");
        assert!(!outcome.success());
        assert!(!outcome.issues.is_empty());
    }

    #[test]
    fn trailing_garbage_is_an_issue() {
        let outcome = parse_select("SELECT 1 FROM dual MINUS SELECT 2 FROM dual");
        assert!(!outcome.success());
        assert_eq!(outcome.issues[0].message, "unexpected trailing input");
    }

    #[test]
    fn function_vs_procedure_kind() {
        let function = "CREATE FUNCTION f RETURN NUMBER IS BEGIN RETURN 1; END;";
        assert!(parse_function(function).success());
        assert!(!parse_procedure(function).success());
    }

    #[test]
    fn expression_entry() {
        assert!(parse_expression("NVL(x, 0) + 1").success());
        assert!(!parse_expression("1 +").success());
    }
}
