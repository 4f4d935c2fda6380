//! Per-transformation mutable context shared by the emission pass.

use std::collections::HashMap;

use crate::diagnostics::Diagnostic;
use crate::schema_catalog::{resolve_synonym_chain, ChainResolution, MetadataIndex};
use crate::type_inference::TypeCache;

/// Everything pass 2 needs besides the AST: the catalog snapshot, the
/// type cache written by pass 1, the generated-name counter, the
/// diagnostics sink, and a memo for synonym chains. Lives exactly as
/// long as one transformation; counters are never shared across
/// transformations.
pub struct TransformationContext<'i> {
    pub current_schema: String,
    pub index: &'i MetadataIndex,
    pub cache: TypeCache,
    pub diagnostics: Vec<Diagnostic>,
    name_counter: u32,
    synonym_memo: HashMap<String, Option<(String, String)>>,
}

impl<'i> TransformationContext<'i> {
    pub fn new(
        index: &'i MetadataIndex,
        current_schema: &str,
        cache: TypeCache,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        TransformationContext {
            current_schema: current_schema.to_lowercase(),
            index,
            cache,
            diagnostics,
            name_counter: 0,
            synonym_memo: HashMap::new(),
        }
    }

    /// Next generated name for a prefix: `path_1`, `path_2`, ... The
    /// counter is monotonic within this transformation.
    pub fn next_generated_name(&mut self, prefix: &str) -> String {
        self.name_counter += 1;
        format!("{}_{}", prefix, self.name_counter)
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.diagnostics.push(Diagnostic::warning(message));
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::debug!("{}", message);
        self.diagnostics.push(Diagnostic::info(message));
    }

    /// Resolve an unqualified object name through the synonym chains,
    /// memoized. Cycles and database links surface as a warning and
    /// leave the original reference in place.
    pub fn resolve_object_synonym(&mut self, name: &str) -> Option<(String, String)> {
        let key = name.to_lowercase();
        if let Some(memoized) = self.synonym_memo.get(&key) {
            return memoized.clone();
        }
        let resolution = match resolve_synonym_chain(self.index, &self.current_schema, &key) {
            ChainResolution::Resolved(schema, target) => Some((schema, target)),
            ChainResolution::NotASynonym => None,
            ChainResolution::Cycle => {
                self.warn(format!(
                    "synonym chain for '{}' is cyclic; keeping the original reference",
                    key
                ));
                None
            }
            ChainResolution::RemoteLink(link) => {
                self.warn(format!(
                    "synonym '{}' targets a remote object over database link '{}'; \
                     keeping the original reference",
                    key, link
                ));
                None
            }
        };
        self.synonym_memo.insert(key, resolution.clone());
        resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_names_are_monotonic() {
        let index = MetadataIndex::new();
        let mut ctx = TransformationContext::new(&index, "hr", TypeCache::new(), Vec::new());
        assert_eq!(ctx.next_generated_name("path"), "path_1");
        assert_eq!(ctx.next_generated_name("path"), "path_2");
        assert_eq!(ctx.next_generated_name("column"), "column_3");
    }

    #[test]
    fn independent_contexts_do_not_share_counters() {
        let index = MetadataIndex::new();
        let mut a = TransformationContext::new(&index, "hr", TypeCache::new(), Vec::new());
        let mut b = TransformationContext::new(&index, "hr", TypeCache::new(), Vec::new());
        assert_eq!(a.next_generated_name("path"), "path_1");
        assert_eq!(b.next_generated_name("path"), "path_1");
    }

    #[test]
    fn synonym_resolution_is_memoized_and_warns_on_cycle() {
        let mut index = MetadataIndex::new();
        index
            .add_synonym("a", "x", "b", "y")
            .add_synonym("b", "y", "a", "x")
            .add_synonym("hr", "emp", "hr", "employees");
        let mut ctx = TransformationContext::new(&index, "hr", TypeCache::new(), Vec::new());
        assert_eq!(
            ctx.resolve_object_synonym("emp"),
            Some(("hr".to_string(), "employees".to_string()))
        );
        let mut cyclic = TransformationContext::new(&index, "a", TypeCache::new(), Vec::new());
        assert_eq!(cyclic.resolve_object_synonym("x"), None);
        assert_eq!(cyclic.diagnostics.len(), 1);
        // memoized: a second lookup does not add another warning
        assert_eq!(cyclic.resolve_object_synonym("x"), None);
        assert_eq!(cyclic.diagnostics.len(), 1);
    }
}
