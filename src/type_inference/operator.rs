//! Operator result typing.

use crate::oracle_sql_parser::ast::{BinaryOp, UnaryOp};

use super::types::{TypeCategory, ValueType};

/// Type a binary operator application.
///
/// Arithmetic follows Oracle's date arithmetic: date ± number stays a
/// date, date − date is a number of days. A NULL operand takes on the
/// other operand's category unless that one is UNKNOWN.
pub fn resolve_binary(op: BinaryOp, left: &ValueType, right: &ValueType) -> ValueType {
    if op.is_comparison() || op.is_logical() {
        return ValueType::boolean();
    }
    if op == BinaryOp::Concat {
        return ValueType::text();
    }
    debug_assert!(op.is_arithmetic());

    let left_cat = effective_category(left, right);
    let right_cat = effective_category(right, left);

    match (left_cat, op, right_cat) {
        (_, _, TypeCategory::Unknown) | (TypeCategory::Unknown, _, _) => ValueType::unknown(),
        // date - date counts days
        (TypeCategory::Date | TypeCategory::Timestamp, BinaryOp::Sub, TypeCategory::Date | TypeCategory::Timestamp) => {
            ValueType::numeric()
        }
        // date ± n shifts by days
        (TypeCategory::Date, BinaryOp::Add | BinaryOp::Sub, TypeCategory::Numeric) => {
            ValueType::date()
        }
        (TypeCategory::Timestamp, BinaryOp::Add | BinaryOp::Sub, TypeCategory::Numeric) => {
            ValueType::timestamp()
        }
        (TypeCategory::Numeric, BinaryOp::Add, TypeCategory::Date) => ValueType::date(),
        (TypeCategory::Numeric, BinaryOp::Add, TypeCategory::Timestamp) => ValueType::timestamp(),
        (TypeCategory::Numeric, _, TypeCategory::Numeric) => ValueType::numeric(),
        (TypeCategory::Null, _, TypeCategory::Null) => ValueType::null(),
        _ => ValueType::unknown(),
    }
}

/// A NULL operand inherits the other side's category when that side is
/// concrete.
fn effective_category(this: &ValueType, other: &ValueType) -> TypeCategory {
    if this.category == TypeCategory::Null && other.category != TypeCategory::Unknown {
        other.category
    } else {
        this.category
    }
}

pub fn resolve_unary(op: UnaryOp, operand: &ValueType) -> ValueType {
    match op {
        UnaryOp::Not => ValueType::boolean(),
        UnaryOp::Plus | UnaryOp::Minus => match operand.category {
            TypeCategory::Numeric => operand.clone(),
            TypeCategory::Null => ValueType::null(),
            _ => ValueType::unknown(),
        },
        // PRIOR reads the parent row's value of the same column
        UnaryOp::Prior => operand.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparisons_are_boolean() {
        assert_eq!(
            resolve_binary(BinaryOp::Eq, &ValueType::numeric(), &ValueType::numeric()),
            ValueType::boolean()
        );
        assert_eq!(
            resolve_binary(BinaryOp::And, &ValueType::boolean(), &ValueType::boolean()),
            ValueType::boolean()
        );
    }

    #[test]
    fn concat_is_text() {
        assert_eq!(
            resolve_binary(BinaryOp::Concat, &ValueType::numeric(), &ValueType::text()),
            ValueType::text()
        );
    }

    #[test]
    fn date_arithmetic() {
        assert_eq!(
            resolve_binary(BinaryOp::Add, &ValueType::date(), &ValueType::numeric()),
            ValueType::date()
        );
        assert_eq!(
            resolve_binary(BinaryOp::Sub, &ValueType::date(), &ValueType::date()),
            ValueType::numeric()
        );
        assert_eq!(
            resolve_binary(BinaryOp::Add, &ValueType::numeric(), &ValueType::timestamp()),
            ValueType::timestamp()
        );
    }

    #[test]
    fn null_takes_the_other_side() {
        assert_eq!(
            resolve_binary(BinaryOp::Add, &ValueType::null(), &ValueType::numeric()),
            ValueType::numeric()
        );
        assert_eq!(
            resolve_binary(BinaryOp::Add, &ValueType::null(), &ValueType::date()),
            ValueType::date()
        );
        // NULL + UNKNOWN stays UNKNOWN
        assert!(resolve_binary(BinaryOp::Add, &ValueType::null(), &ValueType::unknown()).is_unknown());
    }

    #[test]
    fn unary_rules() {
        assert_eq!(
            resolve_unary(UnaryOp::Minus, &ValueType::numeric()),
            ValueType::numeric()
        );
        assert!(resolve_unary(UnaryOp::Minus, &ValueType::text()).is_unknown());
        assert_eq!(resolve_unary(UnaryOp::Not, &ValueType::unknown()), ValueType::boolean());
        assert_eq!(resolve_unary(UnaryOp::Prior, &ValueType::date()), ValueType::date());
    }
}
