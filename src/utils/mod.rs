pub mod identifiers;
pub mod type_mapping;
