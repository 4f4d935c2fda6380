//! Oracle to PostgreSQL scalar type mapping and Oracle type classification.
//!
//! The mapping is purely textual: it receives the Oracle type token the
//! catalog reported (possibly parameterized, e.g. `NUMBER(10,2)`) and
//! returns the PostgreSQL type name to emit. Types it does not know pass
//! through unchanged so user-defined composite names survive.

use std::collections::HashMap;

use lazy_static::lazy_static;

/// Classification of an Oracle type reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleTypeClass {
    /// A scalar built-in (`VARCHAR2`, `NUMBER`, `DATE`, ...).
    BuiltIn,
    /// `XMLTYPE` in either of its system owners; maps to PostgreSQL `xml`.
    Xml,
    /// System-owned opaque type (`AQ$_*`, `ANYDATA`, `SDO_GEOMETRY`, ...);
    /// serialized as `jsonb` on the PostgreSQL side.
    SystemOpaque,
    /// A user-defined object type; becomes a PostgreSQL composite.
    UserComposite,
}

lazy_static! {
    /// Exact-match mapping for normalized (lower-cased, unparameterized)
    /// Oracle type tokens.
    static ref EXACT_TYPE_MAP: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        // character data
        m.insert("varchar2", "text");
        m.insert("nvarchar2", "text");
        m.insert("varchar", "text");
        m.insert("char", "text");
        m.insert("nchar", "text");
        m.insert("character", "text");
        m.insert("character varying", "text");
        m.insert("char varying", "text");
        m.insert("nchar varying", "text");
        m.insert("national character", "text");
        m.insert("national char", "text");
        m.insert("national character varying", "text");
        m.insert("national char varying", "text");
        m.insert("clob", "text");
        m.insert("nclob", "text");
        m.insert("long", "text");
        m.insert("string", "text");
        // numeric data
        m.insert("number", "numeric");
        m.insert("numeric", "numeric");
        m.insert("decimal", "numeric");
        m.insert("dec", "numeric");
        m.insert("integer", "integer");
        m.insert("int", "integer");
        m.insert("smallint", "smallint");
        m.insert("pls_integer", "integer");
        m.insert("binary_integer", "integer");
        m.insert("simple_integer", "integer");
        m.insert("natural", "integer");
        m.insert("naturaln", "integer");
        m.insert("positive", "integer");
        m.insert("positiven", "integer");
        m.insert("signtype", "smallint");
        m.insert("float", "double precision");
        m.insert("real", "real");
        m.insert("double precision", "double precision");
        m.insert("binary_float", "real");
        m.insert("binary_double", "double precision");
        // date/time
        m.insert("date", "date");
        m.insert("timestamp", "timestamp");
        m.insert("timestamp with time zone", "timestamptz");
        m.insert("timestamp with local time zone", "timestamptz");
        m.insert("interval year to month", "interval");
        m.insert("interval day to second", "interval");
        // binary data
        m.insert("raw", "bytea");
        m.insert("long raw", "bytea");
        m.insert("blob", "bytea");
        m.insert("bfile", "bytea");
        // row addresses have no PostgreSQL counterpart; keep the text form
        m.insert("rowid", "text");
        m.insert("urowid", "text");
        // booleans (23c SQL, PL/SQL)
        m.insert("boolean", "boolean");
        m.insert("pl/sql boolean", "boolean");
        // XML
        m.insert("xmltype", "xml");
        m.insert("sys.xmltype", "xml");
        m.insert("public.xmltype", "xml");
        // system-opaque types serialized as jsonb
        m.insert("anydata", "jsonb");
        m.insert("anytype", "jsonb");
        m.insert("anydataset", "jsonb");
        m.insert("sys.anydata", "jsonb");
        m.insert("sys.anytype", "jsonb");
        m.insert("sys.anydataset", "jsonb");
        m.insert("sdo_geometry", "jsonb");
        m.insert("mdsys.sdo_geometry", "jsonb");
        m
    };
}

/// Parameterized prefixes, checked before the exact table. The parameter
/// list is dropped: `VARCHAR2(200 BYTE)` and `VARCHAR2(200 CHAR)` both
/// become `text`, `NUMBER(10,2)` becomes `numeric`.
static PARAMETERIZED_PREFIXES: &[(&str, &str)] = &[
    ("varchar2(", "text"),
    ("nvarchar2(", "text"),
    ("varchar(", "text"),
    ("char(", "text"),
    ("nchar(", "text"),
    ("character(", "text"),
    ("number(", "numeric"),
    ("numeric(", "numeric"),
    ("decimal(", "numeric"),
    ("float(", "double precision"),
    ("raw(", "bytea"),
    ("urowid(", "text"),
    ("timestamp(", "timestamp"),
    ("interval year", "interval"),
    ("interval day", "interval"),
];

/// Map an Oracle scalar type token to its PostgreSQL type name.
/// Unknown tokens pass through lower-cased.
pub fn map_oracle_type(oracle_type: &str) -> String {
    let normalized = oracle_type.trim().to_lowercase();
    // parameterized timestamps keep their time-zone suffix; Oracle
    // reports the default precision, so `TIMESTAMP(6) WITH TIME ZONE`
    // is the common form
    if normalized.starts_with("timestamp")
        && (normalized.ends_with("with time zone") || normalized.ends_with("with local time zone"))
    {
        return "timestamptz".to_string();
    }
    for (prefix, pg) in PARAMETERIZED_PREFIXES {
        if normalized.starts_with(prefix) {
            return (*pg).to_string();
        }
    }
    if let Some(pg) = EXACT_TYPE_MAP.get(normalized.as_str()) {
        return (*pg).to_string();
    }
    normalized
}

/// Extract `(precision, scale)` from a parameterized `NUMBER(p[,s])`
/// token. Returns `(None, None)` when the token carries no parameters.
pub fn number_precision_scale(oracle_type: &str) -> (Option<u8>, Option<i8>) {
    let normalized = oracle_type.trim().to_lowercase();
    let Some(open) = normalized.find('(') else {
        return (None, None);
    };
    let Some(close) = normalized.rfind(')') else {
        return (None, None);
    };
    if close <= open {
        return (None, None);
    }
    let inner = &normalized[open + 1..close];
    let mut parts = inner.splitn(2, ',');
    let precision = parts.next().and_then(|p| p.trim().parse::<u8>().ok());
    let scale = parts.next().and_then(|s| s.trim().parse::<i8>().ok());
    (precision, scale)
}

/// Names under `sys`/`public` ownership that are opaque to the migration
/// and get serialized as `jsonb`.
static SYSTEM_OPAQUE_NAMES: &[&str] = &["anydata", "anytype", "anydataset", "sdo_geometry"];

/// Classify an Oracle type reference by owner and name.
///
/// No owner means a scalar built-in. `sys`/`public` ownership means a
/// system type: `xmltype` is XML, the listed opaque names (plus the
/// `aq$_` queue-payload family) are system-opaque, and anything else
/// `sys`-owned is treated as opaque as well. Every other owner is a
/// user-defined composite.
pub fn classify_oracle_type(owner: Option<&str>, name: &str) -> OracleTypeClass {
    let name = name.trim().to_lowercase();
    let Some(owner) = owner else {
        return OracleTypeClass::BuiltIn;
    };
    let owner = owner.trim().to_lowercase();
    if owner == "sys" || owner == "public" {
        if name == "xmltype" {
            return OracleTypeClass::Xml;
        }
        if name.starts_with("aq$_") || SYSTEM_OPAQUE_NAMES.contains(&name.as_str()) {
            return OracleTypeClass::SystemOpaque;
        }
        if owner == "sys" {
            return OracleTypeClass::SystemOpaque;
        }
        return OracleTypeClass::BuiltIn;
    }
    OracleTypeClass::UserComposite
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_mappings() {
        assert_eq!(map_oracle_type("VARCHAR2"), "text");
        assert_eq!(map_oracle_type("NUMBER"), "numeric");
        assert_eq!(map_oracle_type("DATE"), "date");
        assert_eq!(map_oracle_type("TIMESTAMP WITH TIME ZONE"), "timestamptz");
        assert_eq!(map_oracle_type("BLOB"), "bytea");
        assert_eq!(map_oracle_type("XMLTYPE"), "xml");
    }

    #[test]
    fn parameterized_prefixes() {
        assert_eq!(map_oracle_type("VARCHAR2(200 BYTE)"), "text");
        assert_eq!(map_oracle_type("NUMBER(10,2)"), "numeric");
        assert_eq!(map_oracle_type("FLOAT(126)"), "double precision");
        assert_eq!(map_oracle_type("TIMESTAMP(6)"), "timestamp");
    }

    #[test]
    fn parameterized_timestamps_keep_their_time_zone() {
        assert_eq!(map_oracle_type("TIMESTAMP(6) WITH TIME ZONE"), "timestamptz");
        assert_eq!(
            map_oracle_type("TIMESTAMP(6) WITH LOCAL TIME ZONE"),
            "timestamptz"
        );
        assert_eq!(map_oracle_type("TIMESTAMP(3)"), "timestamp");
    }

    #[test]
    fn unknown_types_pass_through() {
        assert_eq!(map_oracle_type("HR.ADDRESS_T"), "hr.address_t");
    }

    #[test]
    fn precision_and_scale_extraction() {
        assert_eq!(number_precision_scale("NUMBER(10,2)"), (Some(10), Some(2)));
        assert_eq!(number_precision_scale("NUMBER(5)"), (Some(5), None));
        assert_eq!(number_precision_scale("NUMBER"), (None, None));
    }

    #[test]
    fn classification() {
        assert_eq!(classify_oracle_type(None, "VARCHAR2"), OracleTypeClass::BuiltIn);
        assert_eq!(classify_oracle_type(Some("sys"), "XMLTYPE"), OracleTypeClass::Xml);
        assert_eq!(
            classify_oracle_type(Some("public"), "ANYDATA"),
            OracleTypeClass::SystemOpaque
        );
        assert_eq!(
            classify_oracle_type(Some("sys"), "AQ$_JMS_TEXT_MESSAGE"),
            OracleTypeClass::SystemOpaque
        );
        assert_eq!(
            classify_oracle_type(Some("hr"), "ADDRESS_T"),
            OracleTypeClass::UserComposite
        );
    }
}
