//! Pass 2: PostgreSQL text emission.
//!
//! A second post-order traversal over the same AST. Each render method
//! returns the text fragment its parent splices in; type-dependent
//! rewrites (ROUND/TRUNC on dates, defensive casts, date arithmetic)
//! consult the type cache written by pass 1. CONNECT BY query blocks are
//! delegated to the hierarchical transformer in [`connect_by`].

use std::collections::HashMap;

pub mod connect_by;
mod context;
mod errors;
mod expression;
mod function_registry;
mod plsql;
mod select;

pub use context::TransformationContext;
pub use errors::PgGeneratorError;
pub use function_registry::{get_function_mapping, is_function_mapped, FunctionMapping};

use crate::type_inference::ValueType;

/// The emission visitor. One instance renders one object; the
/// CONNECT BY transformer spawns short-lived copies with substitutions
/// installed for LEVEL and the materialized path columns.
pub struct SqlRenderer<'s, 'c, 'i> {
    pub(crate) source: &'s str,
    pub(crate) ctx: &'c mut TransformationContext<'i>,
    /// Replacement text for bare `LEVEL` references (CONNECT BY bodies
    /// and final selects).
    pub(crate) level_replacement: Option<String>,
    /// `(rendered expr, rendered separator)` -> generated column name for
    /// `SYS_CONNECT_BY_PATH` calls in the final select.
    pub(crate) path_replacements: HashMap<(String, String), String>,
    /// CTE names currently in scope; these must never be treated as
    /// synonym candidates when a FROM reference is resolved.
    pub(crate) known_ctes: Vec<String>,
}

impl<'s, 'c, 'i> SqlRenderer<'s, 'c, 'i> {
    pub fn new(source: &'s str, ctx: &'c mut TransformationContext<'i>) -> Self {
        SqlRenderer {
            source,
            ctx,
            level_replacement: None,
            path_replacements: HashMap::new(),
            known_ctes: Vec::new(),
        }
    }

    /// The inferred type of a node, UNKNOWN when pass 1 recorded nothing.
    pub(crate) fn type_of(&self, expr: &crate::oracle_sql_parser::ast::Expr<'_>) -> ValueType {
        self.ctx.cache.lookup(expr.span(self.source))
    }
}
