//! Pass 1: type inference over the AST.
//!
//! The sub-resolvers (literal, pseudo-column, column, operator, function)
//! are pure functions; the analyzer wires them into a single post-order
//! traversal that fills the span-keyed type cache consumed by pass 2.

mod analyzer;
mod column;
mod functions;
mod literal;
mod operator;
mod pseudo_column;
mod scopes;
mod type_cache;
mod types;

pub use analyzer::{analyze_callable, analyze_expression, analyze_select, TypeAnalysis};
pub use column::resolve_column;
pub use functions::resolve_function;
pub use literal::resolve_literal;
pub use operator::{resolve_binary, resolve_unary};
pub use pseudo_column::resolve_pseudo_column;
pub use scopes::{CteDef, ScopeStack};
pub use type_cache::TypeCache;
pub use types::{highest_precedence, TypeCategory, ValueType};
