//! Synonym resolution.
//!
//! A single step checks the current schema first and the `public` owner
//! second. Synonyms may point at other synonyms; callers that need the
//! terminal target use [`resolve_synonym_chain`], which walks the chain
//! with a visited set so a cyclic definition cannot loop forever.

use super::metadata_index::MetadataIndex;

/// One resolution step: `current_schema` first, then `public`.
pub fn resolve_synonym(
    index: &MetadataIndex,
    current_schema: &str,
    name: &str,
) -> Option<(String, String)> {
    index
        .synonym(current_schema, name)
        .or_else(|| index.synonym("public", name))
        .map(|target| (target.target_owner.clone(), target.target_name.clone()))
}

/// Outcome of walking a synonym chain to its terminal target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainResolution {
    /// The name is not a synonym under the current schema or `public`.
    NotASynonym,
    /// Terminal `(schema, name)` the chain ends on.
    Resolved(String, String),
    /// The chain revisited an earlier link.
    Cycle,
    /// The chain ends on a remote object behind a database link, which
    /// cannot be migrated. Carries the link name.
    RemoteLink(String),
}

/// Iteratively resolve a synonym to its terminal target. Each hop uses
/// the owner of the previous target as the lookup schema.
pub fn resolve_synonym_chain(
    index: &MetadataIndex,
    current_schema: &str,
    name: &str,
) -> ChainResolution {
    let mut visited: Vec<(String, String)> = Vec::new();
    let mut schema = current_schema.to_lowercase();
    let mut name = name.to_lowercase();

    loop {
        let target = match index
            .synonym(&schema, &name)
            .or_else(|| index.synonym("public", &name))
        {
            Some(target) => target,
            None if visited.is_empty() => return ChainResolution::NotASynonym,
            None => return ChainResolution::Resolved(schema, name),
        };
        if let Some(link) = &target.db_link {
            return ChainResolution::RemoteLink(link.clone());
        }
        let link = (schema.clone(), name.clone());
        if visited.contains(&link) {
            return ChainResolution::Cycle;
        }
        visited.push(link);
        schema = target.target_owner.clone();
        name = target.target_name.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with_chain() -> MetadataIndex {
        let mut index = MetadataIndex::new();
        index
            .add_synonym("app", "emp", "hr", "emp_all")
            .add_synonym("hr", "emp_all", "hr", "employees")
            .add_synonym("public", "everyone", "hr", "employees");
        index
    }

    #[test]
    fn single_step_prefers_current_schema() {
        let mut index = MetadataIndex::new();
        index
            .add_synonym("app", "emp", "app", "local_emp")
            .add_synonym("public", "emp", "hr", "employees");
        assert_eq!(
            resolve_synonym(&index, "app", "emp"),
            Some(("app".into(), "local_emp".into()))
        );
        assert_eq!(
            resolve_synonym(&index, "sales", "emp"),
            Some(("hr".into(), "employees".into()))
        );
        assert_eq!(resolve_synonym(&index, "sales", "unknown"), None);
    }

    #[test]
    fn chain_resolves_to_terminal_target() {
        let index = index_with_chain();
        assert_eq!(
            resolve_synonym_chain(&index, "app", "emp"),
            ChainResolution::Resolved("hr".into(), "employees".into())
        );
    }

    #[test]
    fn public_fallback_applies_on_every_hop() {
        let index = index_with_chain();
        assert_eq!(
            resolve_synonym_chain(&index, "sales", "everyone"),
            ChainResolution::Resolved("hr".into(), "employees".into())
        );
    }

    #[test]
    fn non_synonym_is_reported() {
        let index = index_with_chain();
        assert_eq!(
            resolve_synonym_chain(&index, "app", "employees"),
            ChainResolution::NotASynonym
        );
    }

    #[test]
    fn cycles_terminate() {
        let mut index = MetadataIndex::new();
        index
            .add_synonym("a", "x", "b", "y")
            .add_synonym("b", "y", "a", "x");
        assert_eq!(resolve_synonym_chain(&index, "a", "x"), ChainResolution::Cycle);
    }

    #[test]
    fn remote_links_are_surfaced() {
        let mut index = MetadataIndex::new();
        index.add_remote_synonym("app", "remote_emp", "hr", "employees", "PROD_LINK");
        assert_eq!(
            resolve_synonym_chain(&index, "app", "remote_emp"),
            ChainResolution::RemoteLink("PROD_LINK".into())
        );
    }
}
