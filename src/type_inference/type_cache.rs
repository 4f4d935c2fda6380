//! Span-keyed type cache shared by the two passes.
//!
//! Pass 1 (type analysis) writes an entry per visited AST node; pass 2
//! (emission) only reads. Missing keys read as UNKNOWN, which downstream
//! code treats as "insert a defensive cast".

use std::collections::HashMap;

use crate::oracle_sql_parser::ast::Span;

use super::types::ValueType;

#[derive(Debug, Default, Clone)]
pub struct TypeCache {
    entries: HashMap<Span, ValueType>,
}

impl TypeCache {
    pub fn new() -> Self {
        TypeCache::default()
    }

    /// Record a type for a node. The first write wins: wrapper nodes that
    /// share a span with their child (an aliased select item and its
    /// expression, say) carry the same type, and an entry must never
    /// change once written.
    pub fn record(&mut self, span: Span, value_type: ValueType) {
        if let Some(existing) = self.entries.get(&span) {
            if *existing != value_type {
                log::debug!(
                    "type cache: span {:?} already holds {:?}, ignoring {:?}",
                    span,
                    existing,
                    value_type
                );
            }
            return;
        }
        self.entries.insert(span, value_type);
    }

    /// Look up a node's type; absent entries read as UNKNOWN.
    pub fn lookup(&self, span: Span) -> ValueType {
        self.entries.get(&span).cloned().unwrap_or_default()
    }

    pub fn contains(&self, span: Span) -> bool {
        self.entries.contains_key(&span)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate all entries; test support for cache-content assertions.
    pub fn iter(&self) -> impl Iterator<Item = (&Span, &ValueType)> {
        self.entries.iter()
    }
}
