//! Built-in function result typing.
//!
//! A fixed table maps an upper-cased Oracle built-in to its result rule.
//! Qualified calls (package functions, object-type methods) are typed
//! from the metadata index's recorded signatures instead. Anything the
//! table and the index both miss types as UNKNOWN with a debug log.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::oracle_sql_parser::ast::IdentPath;
use crate::schema_catalog::MetadataIndex;

use super::types::{highest_precedence, ValueType};

#[derive(Debug, Clone, Copy)]
enum ReturnRule {
    Text,
    Numeric,
    Date,
    Timestamp,
    /// Result has the type of the given argument (MIN, MAX, NULLIF).
    Propagate(usize),
    /// DATE argument keeps its date-ness, everything else is numeric
    /// (ROUND, TRUNC).
    DateOrNumeric(usize),
    /// Highest precedence among all arguments (NVL, COALESCE, LEAST,
    /// GREATEST).
    HighestOfAll,
    /// Highest precedence among the listed arguments (NVL2).
    HighestOfArgs(&'static [usize]),
    /// DECODE's search/result pair layout.
    Decode,
}

lazy_static! {
    static ref BUILTIN_RULES: HashMap<&'static str, ReturnRule> = {
        let mut m = HashMap::new();
        // string functions
        m.insert("UPPER", ReturnRule::Text);
        m.insert("LOWER", ReturnRule::Text);
        m.insert("INITCAP", ReturnRule::Text);
        m.insert("SUBSTR", ReturnRule::Text);
        m.insert("TRIM", ReturnRule::Text);
        m.insert("LTRIM", ReturnRule::Text);
        m.insert("RTRIM", ReturnRule::Text);
        m.insert("LPAD", ReturnRule::Text);
        m.insert("RPAD", ReturnRule::Text);
        m.insert("REPLACE", ReturnRule::Text);
        m.insert("TRANSLATE", ReturnRule::Text);
        m.insert("CONCAT", ReturnRule::Text);
        m.insert("CHR", ReturnRule::Text);
        m.insert("SOUNDEX", ReturnRule::Text);
        m.insert("REGEXP_REPLACE", ReturnRule::Text);
        m.insert("REGEXP_SUBSTR", ReturnRule::Text);
        m.insert("SYS_CONNECT_BY_PATH", ReturnRule::Text);
        // numeric functions
        m.insert("ABS", ReturnRule::Numeric);
        m.insert("CEIL", ReturnRule::Numeric);
        m.insert("FLOOR", ReturnRule::Numeric);
        m.insert("SQRT", ReturnRule::Numeric);
        m.insert("POWER", ReturnRule::Numeric);
        m.insert("MOD", ReturnRule::Numeric);
        m.insert("SIGN", ReturnRule::Numeric);
        m.insert("EXP", ReturnRule::Numeric);
        m.insert("LN", ReturnRule::Numeric);
        m.insert("LOG", ReturnRule::Numeric);
        m.insert("SIN", ReturnRule::Numeric);
        m.insert("COS", ReturnRule::Numeric);
        m.insert("TAN", ReturnRule::Numeric);
        m.insert("LENGTH", ReturnRule::Numeric);
        m.insert("INSTR", ReturnRule::Numeric);
        m.insert("ASCII", ReturnRule::Numeric);
        m.insert("MONTHS_BETWEEN", ReturnRule::Numeric);
        m.insert("EXTRACT", ReturnRule::Numeric);
        m.insert("REGEXP_COUNT", ReturnRule::Numeric);
        // aggregates
        m.insert("COUNT", ReturnRule::Numeric);
        m.insert("SUM", ReturnRule::Numeric);
        m.insert("AVG", ReturnRule::Numeric);
        m.insert("STDDEV", ReturnRule::Numeric);
        m.insert("VARIANCE", ReturnRule::Numeric);
        m.insert("MEDIAN", ReturnRule::Numeric);
        m.insert("MIN", ReturnRule::Propagate(0));
        m.insert("MAX", ReturnRule::Propagate(0));
        // conversions
        m.insert("TO_CHAR", ReturnRule::Text);
        m.insert("TO_NUMBER", ReturnRule::Numeric);
        m.insert("TO_DATE", ReturnRule::Date);
        m.insert("TO_TIMESTAMP", ReturnRule::Timestamp);
        // date functions
        m.insert("ADD_MONTHS", ReturnRule::Date);
        m.insert("LAST_DAY", ReturnRule::Date);
        m.insert("NEXT_DAY", ReturnRule::Date);
        // polymorphic
        m.insert("ROUND", ReturnRule::DateOrNumeric(0));
        m.insert("TRUNC", ReturnRule::DateOrNumeric(0));
        m.insert("NULLIF", ReturnRule::Propagate(0));
        m.insert("NVL", ReturnRule::HighestOfAll);
        m.insert("COALESCE", ReturnRule::HighestOfAll);
        m.insert("LEAST", ReturnRule::HighestOfAll);
        m.insert("GREATEST", ReturnRule::HighestOfAll);
        m.insert("NVL2", ReturnRule::HighestOfArgs(&[1, 2]));
        m.insert("DECODE", ReturnRule::Decode);
        m
    };
}

/// Type a function call from its (already inferred) argument types.
pub fn resolve_function(
    name: &IdentPath<'_>,
    arg_types: &[ValueType],
    index: &MetadataIndex,
    current_schema: &str,
) -> ValueType {
    if name.segments.len() > 1 {
        return resolve_qualified(name, index, current_schema);
    }

    let upper = name.last().to_uppercase();
    let Some(rule) = BUILTIN_RULES.get(upper.as_str()) else {
        log::debug!("function resolver: no rule for '{}'", upper);
        return ValueType::unknown();
    };

    match rule {
        ReturnRule::Text => ValueType::text(),
        ReturnRule::Numeric => ValueType::numeric(),
        ReturnRule::Date => ValueType::date(),
        ReturnRule::Timestamp => ValueType::timestamp(),
        ReturnRule::Propagate(i) => arg_types.get(*i).cloned().unwrap_or_default(),
        ReturnRule::DateOrNumeric(i) => match arg_types.get(*i) {
            Some(t) if t.is_date_like() => t.clone(),
            Some(_) => ValueType::numeric(),
            None => ValueType::unknown(),
        },
        ReturnRule::HighestOfAll => highest_precedence(arg_types.iter()),
        ReturnRule::HighestOfArgs(indices) => {
            highest_precedence(indices.iter().filter_map(|i| arg_types.get(*i)))
        }
        ReturnRule::Decode => highest_precedence(decode_result_types(arg_types)),
    }
}

/// DECODE(expr, s1, r1 [, s2, r2 ...] [, default]): results sit at even
/// indices from 2 upward; a trailing default exists when the argument
/// count is even.
fn decode_result_types(arg_types: &[ValueType]) -> impl Iterator<Item = &ValueType> {
    let count = arg_types.len();
    arg_types.iter().enumerate().filter_map(move |(i, t)| {
        let is_result = i >= 2 && i % 2 == 0;
        let is_default = count % 2 == 0 && i == count - 1;
        (is_result || is_default).then_some(t)
    })
}

fn resolve_qualified(
    name: &IdentPath<'_>,
    index: &MetadataIndex,
    current_schema: &str,
) -> ValueType {
    let joined = name.joined_lower();
    let qualified = format!("{}.{}", current_schema.to_lowercase(), joined);

    for key in [joined.as_str(), qualified.as_str()] {
        if let Some(signature) = index.callable_signature(key) {
            return signature
                .return_type
                .as_deref()
                .map(ValueType::from_oracle)
                .unwrap_or_default();
        }
    }
    if index.is_package_function(&joined) || index.is_package_function(&qualified) {
        log::debug!(
            "function resolver: '{}' is a known package function without a signature",
            joined
        );
        return ValueType::unknown();
    }
    log::debug!("function resolver: unknown qualified call '{}'", joined);
    ValueType::unknown()
}
