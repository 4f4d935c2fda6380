//! The immutable metadata snapshot the transformation engine works from.
//!
//! External extractor jobs read the Oracle catalog (tables, columns,
//! synonyms, object types, package functions, type methods) and hand the
//! result over either through the builder methods or as a JSON snapshot.
//! The engine itself never talks to a database: every lookup during both
//! passes goes through this index, and the index never changes once a
//! transformation has started.
//!
//! All keys are stored lower-case; lookups fold their arguments, so they
//! are case-insensitive.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::utils::identifiers::normalize_oracle_name;

/// Catalog information for a single table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnTypeInfo {
    /// The Oracle type token as reported by the catalog, e.g.
    /// `VARCHAR2(200)` or `NUMBER(10,2)`.
    pub oracle_type: String,
    /// Owner of the column's type when the type is object-typed;
    /// `None` for scalar built-ins.
    #[serde(default)]
    pub owner: Option<String>,
}

/// Target of an Oracle synonym.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynonymTarget {
    pub target_owner: String,
    pub target_name: String,
    /// Database link for remote synonyms; those cannot be migrated.
    #[serde(default)]
    pub db_link: Option<String>,
}

/// One field of an object type, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeField {
    pub name: String,
    pub oracle_type: String,
}

/// Signature of an object-type method or package function.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MethodSignature {
    /// Oracle return type token; `None` for procedures.
    #[serde(default)]
    pub return_type: Option<String>,
    #[serde(default)]
    pub arg_types: Vec<String>,
}

/// Read-only snapshot of the Oracle catalog subset the engine needs.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MetadataIndex {
    /// `schema.table` (or bare `table`) -> column -> type info.
    #[serde(default)]
    columns: HashMap<String, HashMap<String, ColumnTypeInfo>>,
    /// owner -> synonym name -> target.
    #[serde(default)]
    synonyms: HashMap<String, HashMap<String, SynonymTarget>>,
    /// `owner.type` -> ordered fields.
    #[serde(default)]
    type_fields: HashMap<String, Vec<TypeField>>,
    /// Known user-defined composite types, as `owner.type`.
    #[serde(default)]
    object_type_names: HashSet<String>,
    /// Fully-qualified `package.function` names.
    #[serde(default)]
    package_functions: HashSet<String>,
    /// `owner.type.method` -> signature.
    #[serde(default)]
    type_methods: HashMap<String, MethodSignature>,
}

impl MetadataIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot an extractor job serialized to JSON. Keys are
    /// re-normalized so hand-written snapshots with mixed case work too.
    pub fn from_json(snapshot: &str) -> Result<Self, serde_json::Error> {
        let raw: MetadataIndex = serde_json::from_str(snapshot)?;
        Ok(raw.normalized())
    }

    fn normalized(self) -> Self {
        let mut index = MetadataIndex::new();
        for (table_key, columns) in self.columns {
            for (column, info) in columns {
                index
                    .columns
                    .entry(normalize_oracle_name(&table_key))
                    .or_default()
                    .insert(normalize_oracle_name(&column), info);
            }
        }
        for (owner, entries) in self.synonyms {
            for (name, target) in entries {
                index
                    .synonyms
                    .entry(normalize_oracle_name(&owner))
                    .or_default()
                    .insert(
                        normalize_oracle_name(&name),
                        SynonymTarget {
                            target_owner: normalize_oracle_name(&target.target_owner),
                            target_name: normalize_oracle_name(&target.target_name),
                            db_link: target.db_link,
                        },
                    );
            }
        }
        for (type_key, fields) in self.type_fields {
            index
                .type_fields
                .insert(normalize_oracle_name(&type_key), fields);
        }
        for name in self.object_type_names {
            index.object_type_names.insert(normalize_oracle_name(&name));
        }
        for name in self.package_functions {
            index.package_functions.insert(normalize_oracle_name(&name));
        }
        for (key, signature) in self.type_methods {
            index
                .type_methods
                .insert(normalize_oracle_name(&key), signature);
        }
        index
    }

    // ----- builder surface (used by extractor jobs and tests) -----

    pub fn add_column(
        &mut self,
        table_key: &str,
        column: &str,
        oracle_type: &str,
    ) -> &mut Self {
        self.add_typed_column(table_key, column, oracle_type, None)
    }

    pub fn add_typed_column(
        &mut self,
        table_key: &str,
        column: &str,
        oracle_type: &str,
        type_owner: Option<&str>,
    ) -> &mut Self {
        self.columns
            .entry(normalize_oracle_name(table_key))
            .or_default()
            .insert(
                normalize_oracle_name(column),
                ColumnTypeInfo {
                    oracle_type: oracle_type.trim().to_string(),
                    owner: type_owner.map(normalize_oracle_name),
                },
            );
        self
    }

    pub fn add_synonym(
        &mut self,
        owner: &str,
        name: &str,
        target_owner: &str,
        target_name: &str,
    ) -> &mut Self {
        self.synonyms
            .entry(normalize_oracle_name(owner))
            .or_default()
            .insert(
                normalize_oracle_name(name),
                SynonymTarget {
                    target_owner: normalize_oracle_name(target_owner),
                    target_name: normalize_oracle_name(target_name),
                    db_link: None,
                },
            );
        self
    }

    pub fn add_remote_synonym(
        &mut self,
        owner: &str,
        name: &str,
        target_owner: &str,
        target_name: &str,
        db_link: &str,
    ) -> &mut Self {
        self.synonyms
            .entry(normalize_oracle_name(owner))
            .or_default()
            .insert(
                normalize_oracle_name(name),
                SynonymTarget {
                    target_owner: normalize_oracle_name(target_owner),
                    target_name: normalize_oracle_name(target_name),
                    db_link: Some(db_link.to_string()),
                },
            );
        self
    }

    pub fn add_object_type(&mut self, owner: &str, type_name: &str, fields: Vec<TypeField>) -> &mut Self {
        let key = format!(
            "{}.{}",
            normalize_oracle_name(owner),
            normalize_oracle_name(type_name)
        );
        self.object_type_names.insert(key.clone());
        self.type_fields.insert(key, fields);
        self
    }

    pub fn add_package_function(&mut self, qualified_name: &str) -> &mut Self {
        self.package_functions
            .insert(normalize_oracle_name(qualified_name));
        self
    }

    pub fn add_type_method(
        &mut self,
        owner: &str,
        type_name: &str,
        method: &str,
        signature: MethodSignature,
    ) -> &mut Self {
        let key = format!(
            "{}.{}.{}",
            normalize_oracle_name(owner),
            normalize_oracle_name(type_name),
            normalize_oracle_name(method)
        );
        self.type_methods.insert(key, signature);
        self
    }

    // ----- lookup surface -----

    /// Column type lookup. The table key is tried as given; when it
    /// carries no schema qualifier, `current_schema.table` is tried next.
    pub fn column_type(
        &self,
        table_key: &str,
        column: &str,
        current_schema: &str,
    ) -> Option<&ColumnTypeInfo> {
        self.table_columns(table_key, current_schema)
            .and_then(|columns| columns.get(&normalize_oracle_name(column)))
    }

    /// All columns of a table, resolved with the same key fallback as
    /// [`column_type`](Self::column_type).
    pub fn table_columns(
        &self,
        table_key: &str,
        current_schema: &str,
    ) -> Option<&HashMap<String, ColumnTypeInfo>> {
        let key = normalize_oracle_name(table_key);
        if let Some(columns) = self.columns.get(&key) {
            return Some(columns);
        }
        if !key.contains('.') {
            let qualified = format!("{}.{}", normalize_oracle_name(current_schema), key);
            return self.columns.get(&qualified);
        }
        None
    }

    /// Single-step synonym lookup under one owner.
    pub fn synonym(&self, owner: &str, name: &str) -> Option<&SynonymTarget> {
        self.synonyms
            .get(&normalize_oracle_name(owner))
            .and_then(|entries| entries.get(&normalize_oracle_name(name)))
    }

    pub fn is_object_type(&self, owner: &str, type_name: &str) -> bool {
        let key = format!(
            "{}.{}",
            normalize_oracle_name(owner),
            normalize_oracle_name(type_name)
        );
        self.object_type_names.contains(&key)
    }

    /// Ordered fields of an object type, keyed as `owner.type`.
    pub fn object_type_fields(&self, owner: &str, type_name: &str) -> Option<&[TypeField]> {
        let key = format!(
            "{}.{}",
            normalize_oracle_name(owner),
            normalize_oracle_name(type_name)
        );
        self.type_fields.get(&key).map(Vec::as_slice)
    }

    pub fn is_package_function(&self, qualified_name: &str) -> bool {
        self.package_functions
            .contains(&normalize_oracle_name(qualified_name))
    }

    /// Signature of `owner.type.method`, when known.
    pub fn type_method(&self, owner: &str, type_name: &str, method: &str) -> Option<&MethodSignature> {
        let key = format!(
            "{}.{}.{}",
            normalize_oracle_name(owner),
            normalize_oracle_name(type_name),
            normalize_oracle_name(method)
        );
        self.type_methods.get(&key)
    }

    /// Signature lookup by an already-joined qualified name
    /// (`owner.type.method` or `package.function`).
    pub fn callable_signature(&self, qualified_name: &str) -> Option<&MethodSignature> {
        self.type_methods.get(&normalize_oracle_name(qualified_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> MetadataIndex {
        let mut index = MetadataIndex::new();
        index
            .add_column("hr.employees", "emp_id", "NUMBER(10)")
            .add_column("hr.employees", "hire_date", "DATE")
            .add_column("cfg", "number_days", "NUMBER")
            .add_synonym("hr", "emp", "hr", "employees")
            .add_package_function("billing.compute_total");
        index
    }

    #[test]
    fn qualified_lookup() {
        let index = sample_index();
        let info = index.column_type("hr.employees", "EMP_ID", "other").unwrap();
        assert_eq!(info.oracle_type, "NUMBER(10)");
    }

    #[test]
    fn unqualified_lookup_prepends_current_schema() {
        let index = sample_index();
        let info = index.column_type("employees", "hire_date", "hr").unwrap();
        assert_eq!(info.oracle_type, "DATE");
        assert!(index.column_type("employees", "hire_date", "sales").is_none());
    }

    #[test]
    fn bare_table_keys_work_as_given() {
        let index = sample_index();
        assert!(index.column_type("cfg", "number_days", "anything").is_some());
    }

    #[test]
    fn lookups_are_case_insensitive() {
        let index = sample_index();
        assert!(index.column_type("HR.EMPLOYEES", "Emp_Id", "hr").is_some());
        assert!(index.synonym("HR", "EMP").is_some());
        assert!(index.is_package_function("BILLING.COMPUTE_TOTAL"));
    }

    #[test]
    fn from_json_normalizes_keys() {
        let snapshot = r#"{
            "columns": {
                "HR.EMPLOYEES": {
                    "SALARY": { "oracle_type": "NUMBER(8,2)" }
                }
            },
            "synonyms": {
                "PUBLIC": {
                    "EMP": { "target_owner": "HR", "target_name": "EMPLOYEES" }
                }
            }
        }"#;
        let index = MetadataIndex::from_json(snapshot).unwrap();
        assert!(index.column_type("hr.employees", "salary", "hr").is_some());
        let target = index.synonym("public", "emp").unwrap();
        assert_eq!(target.target_owner, "hr");
        assert_eq!(target.target_name, "employees");
    }
}
