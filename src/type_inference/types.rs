//! Value types inferred over the AST.
//!
//! A [`ValueType`] is a category plus the canonical PostgreSQL type name
//! and, for numerics, optional precision and scale. Categories carry a
//! total precedence order used wherever a construct must pick one
//! representative type among heterogeneous operands (NVL, COALESCE,
//! DECODE, CASE): `Timestamp > Date > Numeric > Text > Boolean > Null >
//! Unknown`. `Composite` sits above the scalars but never competes in
//! practice.

use crate::schema_catalog::ColumnTypeInfo;
use crate::utils::type_mapping::{
    classify_oracle_type, map_oracle_type, number_precision_scale, OracleTypeClass,
};

/// Category of an inferred type. Declaration order is precedence order,
/// lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum TypeCategory {
    #[default]
    Unknown,
    Null,
    Boolean,
    Text,
    Numeric,
    Date,
    Timestamp,
    Composite,
}

impl TypeCategory {
    pub fn precedence(self) -> u8 {
        self as u8
    }

    pub fn is_date_like(self) -> bool {
        matches!(self, TypeCategory::Date | TypeCategory::Timestamp)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValueType {
    pub category: TypeCategory,
    /// Canonical PostgreSQL type name, or `schema.type` for composites.
    pub pg_name: Option<String>,
    pub precision: Option<u8>,
    pub scale: Option<i8>,
}

impl ValueType {
    pub fn unknown() -> Self {
        ValueType::default()
    }

    pub fn null() -> Self {
        ValueType {
            category: TypeCategory::Null,
            ..Default::default()
        }
    }

    pub fn boolean() -> Self {
        ValueType {
            category: TypeCategory::Boolean,
            pg_name: Some("boolean".to_string()),
            ..Default::default()
        }
    }

    pub fn text() -> Self {
        ValueType {
            category: TypeCategory::Text,
            pg_name: Some("text".to_string()),
            ..Default::default()
        }
    }

    pub fn numeric() -> Self {
        ValueType {
            category: TypeCategory::Numeric,
            pg_name: Some("numeric".to_string()),
            ..Default::default()
        }
    }

    pub fn numeric_with(precision: Option<u8>, scale: Option<i8>) -> Self {
        ValueType {
            category: TypeCategory::Numeric,
            pg_name: Some("numeric".to_string()),
            precision,
            scale,
        }
    }

    pub fn date() -> Self {
        ValueType {
            category: TypeCategory::Date,
            pg_name: Some("date".to_string()),
            ..Default::default()
        }
    }

    pub fn timestamp() -> Self {
        ValueType {
            category: TypeCategory::Timestamp,
            pg_name: Some("timestamp".to_string()),
            ..Default::default()
        }
    }

    pub fn composite(pg_name: impl Into<String>) -> Self {
        ValueType {
            category: TypeCategory::Composite,
            pg_name: Some(pg_name.into()),
            ..Default::default()
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.category == TypeCategory::Unknown
    }

    pub fn is_date_like(&self) -> bool {
        self.category.is_date_like()
    }

    /// Infer a value type from an Oracle type token as reported by the
    /// catalog (e.g. `NUMBER(10,2)`, `VARCHAR2(200 BYTE)`).
    pub fn from_oracle(oracle_type: &str) -> ValueType {
        let normalized = oracle_type.trim().to_lowercase();
        let base = normalized
            .split(['(', ' '])
            .next()
            .unwrap_or(normalized.as_str());
        match base {
            "number" | "numeric" | "decimal" | "dec" => {
                let (precision, scale) = number_precision_scale(&normalized);
                ValueType::numeric_with(precision, scale)
            }
            "integer" | "int" | "smallint" | "pls_integer" | "binary_integer"
            | "simple_integer" | "float" | "real" | "binary_float" | "binary_double" => {
                ValueType {
                    category: TypeCategory::Numeric,
                    pg_name: Some(map_oracle_type(&normalized)),
                    ..Default::default()
                }
            }
            "double" => ValueType {
                category: TypeCategory::Numeric,
                pg_name: Some("double precision".to_string()),
                ..Default::default()
            },
            "varchar2" | "nvarchar2" | "varchar" | "char" | "nchar" | "character" | "clob"
            | "nclob" | "string" | "rowid" | "urowid" => ValueType::text(),
            "long" if normalized == "long" => ValueType::text(),
            "date" => ValueType::date(),
            "timestamp" => {
                if normalized.contains("time zone") {
                    ValueType {
                        category: TypeCategory::Timestamp,
                        pg_name: Some("timestamptz".to_string()),
                        ..Default::default()
                    }
                } else {
                    ValueType::timestamp()
                }
            }
            "boolean" => ValueType::boolean(),
            "xmltype" => ValueType {
                category: TypeCategory::Text,
                pg_name: Some("xml".to_string()),
                ..Default::default()
            },
            _ => ValueType {
                category: TypeCategory::Unknown,
                pg_name: Some(map_oracle_type(&normalized)),
                ..Default::default()
            },
        }
    }

    /// Infer a value type from catalog column information, classifying
    /// owner-qualified types into composites / XML / system-opaque.
    pub fn from_column_info(info: &ColumnTypeInfo) -> ValueType {
        match &info.owner {
            None => ValueType::from_oracle(&info.oracle_type),
            Some(owner) => match classify_oracle_type(Some(owner), &info.oracle_type) {
                OracleTypeClass::BuiltIn => ValueType::from_oracle(&info.oracle_type),
                OracleTypeClass::Xml => ValueType {
                    category: TypeCategory::Text,
                    pg_name: Some("xml".to_string()),
                    ..Default::default()
                },
                OracleTypeClass::SystemOpaque => ValueType::composite("jsonb"),
                OracleTypeClass::UserComposite => ValueType::composite(format!(
                    "{}.{}",
                    owner.to_lowercase(),
                    info.oracle_type.trim().to_lowercase()
                )),
            },
        }
    }
}

/// Pick the highest-precedence type among candidates, ignoring NULL and
/// UNKNOWN. When nothing concrete remains the result is UNKNOWN.
pub fn highest_precedence<'t>(candidates: impl IntoIterator<Item = &'t ValueType>) -> ValueType {
    let mut best: Option<&ValueType> = None;
    for candidate in candidates {
        if matches!(candidate.category, TypeCategory::Unknown | TypeCategory::Null) {
            continue;
        }
        match best {
            Some(current) if current.category.precedence() >= candidate.category.precedence() => {}
            _ => best = Some(candidate),
        }
    }
    best.cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_order() {
        assert!(TypeCategory::Timestamp > TypeCategory::Date);
        assert!(TypeCategory::Date > TypeCategory::Numeric);
        assert!(TypeCategory::Numeric > TypeCategory::Text);
        assert!(TypeCategory::Text > TypeCategory::Boolean);
        assert!(TypeCategory::Boolean > TypeCategory::Null);
        assert!(TypeCategory::Null > TypeCategory::Unknown);
    }

    #[test]
    fn from_oracle_tokens() {
        assert_eq!(ValueType::from_oracle("DATE"), ValueType::date());
        assert_eq!(
            ValueType::from_oracle("NUMBER(10,2)"),
            ValueType::numeric_with(Some(10), Some(2))
        );
        assert_eq!(ValueType::from_oracle("VARCHAR2(200)").category, TypeCategory::Text);
        assert_eq!(
            ValueType::from_oracle("TIMESTAMP(6) WITH TIME ZONE").pg_name.as_deref(),
            Some("timestamptz")
        );
        assert!(ValueType::from_oracle("SOMETHING_ODD").is_unknown());
    }

    #[test]
    fn composite_classification() {
        let info = ColumnTypeInfo {
            oracle_type: "ADDRESS_T".to_string(),
            owner: Some("hr".to_string()),
        };
        let ty = ValueType::from_column_info(&info);
        assert_eq!(ty.category, TypeCategory::Composite);
        assert_eq!(ty.pg_name.as_deref(), Some("hr.address_t"));

        let opaque = ColumnTypeInfo {
            oracle_type: "ANYDATA".to_string(),
            owner: Some("sys".to_string()),
        };
        assert_eq!(
            ValueType::from_column_info(&opaque).pg_name.as_deref(),
            Some("jsonb")
        );
    }

    #[test]
    fn highest_precedence_ignores_null_and_unknown() {
        let candidates = [ValueType::null(), ValueType::text(), ValueType::date()];
        assert_eq!(highest_precedence(candidates.iter()), ValueType::date());
        let nothing = [ValueType::null(), ValueType::unknown()];
        assert_eq!(highest_precedence(nothing.iter()), ValueType::unknown());
    }
}
