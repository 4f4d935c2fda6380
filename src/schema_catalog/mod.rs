//! Read-only view of the Oracle catalog the transformation runs against.

mod metadata_index;
mod synonyms;

pub use metadata_index::{ColumnTypeInfo, MetadataIndex, MethodSignature, SynonymTarget, TypeField};
pub use synonyms::{resolve_synonym, resolve_synonym_chain, ChainResolution};
