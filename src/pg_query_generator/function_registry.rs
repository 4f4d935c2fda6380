//! Oracle to PostgreSQL function registry.
//!
//! Maps Oracle built-in names to PostgreSQL equivalents with optional
//! argument transformations. Entries whose rewrite depends on inferred
//! types (ROUND, TRUNC) or that do not stay function-shaped (DECODE,
//! NVL2, ADD_MONTHS, ...) are handled directly by the expression
//! renderer and are absent here on purpose.

use std::collections::HashMap;

use lazy_static::lazy_static;

/// Function mapping entry.
#[derive(Clone)]
pub struct FunctionMapping {
    /// Oracle function name (lowercase for lookup).
    #[allow(dead_code)]
    pub oracle_name: &'static str,
    /// PostgreSQL function name.
    pub pg_name: &'static str,
    /// Optional argument transformation. Takes the already-rendered SQL
    /// argument strings, returns the transformed list.
    pub arg_transform: Option<fn(&[String]) -> Vec<String>>,
}

/// Get the mapping for an Oracle function name.
pub fn get_function_mapping(oracle_fn: &str) -> Option<FunctionMapping> {
    let lowered = oracle_fn.to_lowercase();
    FUNCTION_MAPPINGS.get(lowered.as_str()).cloned()
}

macro_rules! passthrough {
    ($map:expr, $($name:literal),+ $(,)?) => {
        $(
            $map.insert($name, FunctionMapping {
                oracle_name: $name,
                pg_name: $name,
                arg_transform: None,
            });
        )+
    };
}

lazy_static! {
    static ref FUNCTION_MAPPINGS: HashMap<&'static str, FunctionMapping> = {
        let mut m = HashMap::new();

        // ===== identical names =====
        passthrough!(
            m, "upper", "lower", "initcap", "substr", "trim", "ltrim", "rtrim", "lpad",
            "rpad", "replace", "translate", "concat", "chr", "ascii", "length", "abs",
            "ceil", "floor", "sqrt", "power", "mod", "sign", "exp", "ln", "log", "sin",
            "cos", "tan", "asin", "acos", "atan", "coalesce", "nullif", "greatest",
            "least", "count", "sum", "avg", "min", "max", "stddev", "variance",
            "to_char", "to_date", "to_number", "to_timestamp", "regexp_replace",
            "regexp_count",
        );

        // ===== renamed =====

        // NVL(a, b) -> coalesce(a, b)
        m.insert("nvl", FunctionMapping {
            oracle_name: "nvl",
            pg_name: "coalesce",
            arg_transform: None,
        });

        // INSTR(str, sub) -> strpos(str, sub); the 3/4-argument forms have
        // no direct equivalent and fall back to the renderer's warning path
        m.insert("instr", FunctionMapping {
            oracle_name: "instr",
            pg_name: "strpos",
            arg_transform: None,
        });

        // SYSDATE()-style parameterless wrappers never reach the registry
        // (they are pseudo-columns), but a handful of Oracle spellings do:

        // USERENV('...') -> current_setting('...') is too context-dependent;
        // left unmapped deliberately so the passthrough warning fires.

        // MEDIAN(x) -> percentile_cont(0.5) WITHIN GROUP (ORDER BY x) is not
        // function-shaped; left unmapped, renderer warns.

        m
    };
}

/// Whether a function has any mapping (used by tests and callers that
/// want to distinguish "mapped" from "passthrough with warning").
pub fn is_function_mapped(oracle_fn: &str) -> bool {
    get_function_mapping(oracle_fn).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nvl_maps_to_coalesce() {
        let mapping = get_function_mapping("NVL").unwrap();
        assert_eq!(mapping.pg_name, "coalesce");
    }

    #[test]
    fn passthrough_names() {
        assert_eq!(get_function_mapping("upper").unwrap().pg_name, "upper");
        assert_eq!(get_function_mapping("TO_CHAR").unwrap().pg_name, "to_char");
        assert_eq!(get_function_mapping("instr").unwrap().pg_name, "strpos");
    }

    #[test]
    fn unmapped_functions_are_reported() {
        assert!(!is_function_mapped("months_between"));
        assert!(!is_function_mapped("frobnicate"));
    }
}
