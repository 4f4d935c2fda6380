//! Expression grammar.
//!
//! Precedence, loosest to tightest: OR, AND, NOT, comparison (including
//! IS NULL / LIKE / IN / BETWEEN tails), additive (`+ - ||`),
//! multiplicative (`* /`), unary (`- + PRIOR`), postfix (`(+)` marker),
//! primary. Binary levels are left-associative loops in the usual style.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, multispace0},
    combinator::{map, opt, peek, recognize},
    error::{ErrorKind, ParseError},
    multi::separated_list0,
    sequence::preceded,
    Parser,
};

use super::ast::{
    BinaryOp, CaseExpr, Expr, ExprKind, FunctionCall, Literal, UnaryOp,
};
use super::common::{
    consumed_slice, keyword, parse_bare_identifier, parse_ident_path, parse_number,
    parse_string_literal, ws, PResult,
};
use super::errors::OracleParsingError;
use super::select::parse_select_statement;

pub fn parse_expression(input: &str) -> PResult<'_, Expr<'_>> {
    parse_or(input)
}

fn parse_or(input: &str) -> PResult<'_, Expr<'_>> {
    let start = input;
    let (mut rest, mut expr) = parse_and(input)?;
    loop {
        match preceded(ws(keyword("OR")), parse_and).parse(rest) {
            Ok((new_rest, rhs)) => {
                expr = Expr {
                    kind: ExprKind::Binary {
                        op: BinaryOp::Or,
                        left: Box::new(expr),
                        right: Box::new(rhs),
                    },
                    source: consumed_slice(start, new_rest),
                };
                rest = new_rest;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }
    Ok((rest, expr))
}

fn parse_and(input: &str) -> PResult<'_, Expr<'_>> {
    let start = input;
    let (mut rest, mut expr) = parse_not(input)?;
    loop {
        match preceded(ws(keyword("AND")), parse_not).parse(rest) {
            Ok((new_rest, rhs)) => {
                expr = Expr {
                    kind: ExprKind::Binary {
                        op: BinaryOp::And,
                        left: Box::new(expr),
                        right: Box::new(rhs),
                    },
                    source: consumed_slice(start, new_rest),
                };
                rest = new_rest;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }
    Ok((rest, expr))
}

fn parse_not(input: &str) -> PResult<'_, Expr<'_>> {
    if let Ok((rest, _)) = ws(keyword("NOT")).parse(input) {
        let (rest, operand) = parse_not(rest)?;
        return Ok((
            rest,
            Expr {
                kind: ExprKind::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                source: consumed_slice(input, rest),
            },
        ));
    }
    parse_comparison(input)
}

fn parse_comparison_op(input: &str) -> PResult<'_, BinaryOp> {
    alt((
        map(tag("<="), |_| BinaryOp::LtEq),
        map(tag(">="), |_| BinaryOp::GtEq),
        map(tag("<>"), |_| BinaryOp::NotEq),
        map(tag("!="), |_| BinaryOp::NotEq),
        // Oracle-only spelling, folded into the standard form
        map(tag("^="), |_| BinaryOp::NotEq),
        map(tag("="), |_| BinaryOp::Eq),
        map(tag("<"), |_| BinaryOp::Lt),
        map(tag(">"), |_| BinaryOp::Gt),
    ))
    .parse(input)
}

fn parse_comparison(input: &str) -> PResult<'_, Expr<'_>> {
    let start = input;
    let (rest, lhs) = parse_additive(input)?;

    // symbol comparison
    if let Ok((after_op, op)) = ws(parse_comparison_op).parse(rest) {
        let (after_rhs, rhs) = parse_additive(after_op)?;
        return Ok((
            after_rhs,
            Expr {
                kind: ExprKind::Binary {
                    op,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                },
                source: consumed_slice(start, after_rhs),
            },
        ));
    }

    // IS [NOT] NULL
    if let Ok((after_is, _)) = ws(keyword("IS")).parse(rest) {
        let (after_not, negation) = opt(ws(keyword("NOT"))).parse(after_is)?;
        let (after_null, _) = ws(keyword("NULL")).parse(after_not)?;
        return Ok((
            after_null,
            Expr {
                kind: ExprKind::NullTest {
                    operand: Box::new(lhs),
                    negated: negation.is_some(),
                },
                source: consumed_slice(start, after_null),
            },
        ));
    }

    // [NOT] LIKE / IN / BETWEEN
    let (after_not, negation) = opt(ws(keyword("NOT"))).parse(rest)?;
    let negated = negation.is_some();

    if let Ok((after_kw, _)) = ws(keyword("LIKE")).parse(after_not) {
        let (after_rhs, rhs) = parse_additive(after_kw)?;
        return Ok((
            after_rhs,
            Expr {
                kind: ExprKind::Binary {
                    op: if negated { BinaryOp::NotLike } else { BinaryOp::Like },
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                },
                source: consumed_slice(start, after_rhs),
            },
        ));
    }

    if let Ok((after_kw, _)) = ws(keyword("BETWEEN")).parse(after_not) {
        let (after_low, low) = parse_additive(after_kw)?;
        let (after_and, _) = ws(keyword("AND")).parse(after_low)?;
        let (after_high, high) = parse_additive(after_and)?;
        return Ok((
            after_high,
            Expr {
                kind: ExprKind::Between {
                    operand: Box::new(lhs),
                    low: Box::new(low),
                    high: Box::new(high),
                    negated,
                },
                source: consumed_slice(start, after_high),
            },
        ));
    }

    if let Ok((after_kw, _)) = ws(keyword("IN")).parse(after_not) {
        let (after_open, _) = ws(char('(')).parse(after_kw)?;
        if starts_select(after_open) {
            let (after_query, subquery) = parse_select_statement(after_open)?;
            let (after_close, _) = ws(char(')')).parse(after_query)?;
            return Ok((
                after_close,
                Expr {
                    kind: ExprKind::InSubquery {
                        operand: Box::new(lhs),
                        subquery: Box::new(subquery),
                        negated,
                    },
                    source: consumed_slice(start, after_close),
                },
            ));
        }
        let (after_items, items) =
            separated_list0(ws(char(',')), parse_expression).parse(after_open)?;
        let (after_close, _) = ws(char(')')).parse(after_items)?;
        return Ok((
            after_close,
            Expr {
                kind: ExprKind::InList {
                    operand: Box::new(lhs),
                    items,
                    negated,
                },
                source: consumed_slice(start, after_close),
            },
        ));
    }

    if negated {
        // a dangling NOT with no LIKE/BETWEEN/IN after it
        return Err(nom::Err::Error(OracleParsingError::from_error_kind(
            after_not,
            ErrorKind::Tag,
        )));
    }

    Ok((rest, lhs))
}

fn parse_additive_op(input: &str) -> PResult<'_, BinaryOp> {
    alt((
        map(tag("||"), |_| BinaryOp::Concat),
        map(tag("+"), |_| BinaryOp::Add),
        map(tag("-"), |_| BinaryOp::Sub),
    ))
    .parse(input)
}

fn parse_additive(input: &str) -> PResult<'_, Expr<'_>> {
    let start = input;
    let (mut rest, mut expr) = parse_multiplicative(input)?;
    loop {
        match (ws(parse_additive_op), parse_multiplicative).parse(rest) {
            Ok((new_rest, (op, rhs))) => {
                expr = Expr {
                    kind: ExprKind::Binary {
                        op,
                        left: Box::new(expr),
                        right: Box::new(rhs),
                    },
                    source: consumed_slice(start, new_rest),
                };
                rest = new_rest;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }
    Ok((rest, expr))
}

fn parse_multiplicative_op(input: &str) -> PResult<'_, BinaryOp> {
    alt((
        map(tag("*"), |_| BinaryOp::Mul),
        map(tag("/"), |_| BinaryOp::Div),
    ))
    .parse(input)
}

fn parse_multiplicative(input: &str) -> PResult<'_, Expr<'_>> {
    let start = input;
    let (mut rest, mut expr) = parse_unary(input)?;
    loop {
        match (ws(parse_multiplicative_op), parse_unary).parse(rest) {
            Ok((new_rest, (op, rhs))) => {
                expr = Expr {
                    kind: ExprKind::Binary {
                        op,
                        left: Box::new(expr),
                        right: Box::new(rhs),
                    },
                    source: consumed_slice(start, new_rest),
                };
                rest = new_rest;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }
    Ok((rest, expr))
}

fn parse_unary(input: &str) -> PResult<'_, Expr<'_>> {
    if let Ok((rest, _)) = ws(keyword("PRIOR")).parse(input) {
        let (rest, operand) = parse_unary(rest)?;
        return Ok((
            rest,
            Expr {
                kind: ExprKind::Unary {
                    op: UnaryOp::Prior,
                    operand: Box::new(operand),
                },
                source: consumed_slice(input, rest),
            },
        ));
    }
    if let Ok((rest, _)) = ws(char::<&str, OracleParsingError>('-')).parse(input) {
        let (rest, operand) = parse_unary(rest)?;
        return Ok((
            rest,
            Expr {
                kind: ExprKind::Unary {
                    op: UnaryOp::Minus,
                    operand: Box::new(operand),
                },
                source: consumed_slice(input, rest),
            },
        ));
    }
    if let Ok((rest, _)) = ws(char::<&str, OracleParsingError>('+')).parse(input) {
        let (rest, operand) = parse_unary(rest)?;
        return Ok((
            rest,
            Expr {
                kind: ExprKind::Unary {
                    op: UnaryOp::Plus,
                    operand: Box::new(operand),
                },
                source: consumed_slice(input, rest),
            },
        ));
    }
    parse_postfix(input)
}

fn parse_postfix(input: &str) -> PResult<'_, Expr<'_>> {
    let (rest, expr) = parse_primary(input)?;
    // legacy Oracle outer-join marker `col(+)`
    if let Ok((after_marker, _)) = ws(recognize((
        char::<&str, OracleParsingError>('('),
        multispace0,
        char('+'),
        multispace0,
        char(')'),
    )))
    .parse(rest)
    {
        return Ok((
            after_marker,
            Expr {
                kind: ExprKind::OuterJoinMarker(Box::new(expr)),
                source: consumed_slice(input, after_marker),
            },
        ));
    }
    Ok((rest, expr))
}

/// Attach the consumed (trimmed) fragment to a parsed node kind.
fn expr_node<'a, F>(mut inner: F) -> impl FnMut(&'a str) -> PResult<'a, Expr<'a>>
where
    F: FnMut(&'a str) -> PResult<'a, ExprKind<'a>>,
{
    move |input: &'a str| {
        let (input, _) = multispace0::<&str, OracleParsingError>(input)?;
        let (rest, kind) = inner(input)?;
        Ok((
            rest,
            Expr {
                kind,
                source: consumed_slice(input, rest),
            },
        ))
    }
}

fn starts_select(input: &str) -> bool {
    peek(ws(alt((keyword("SELECT"), keyword("WITH")))))
        .parse(input)
        .is_ok()
}

fn parse_primary(input: &str) -> PResult<'_, Expr<'_>> {
    alt((
        expr_node(parse_date_literal),
        expr_node(parse_timestamp_literal),
        expr_node(parse_interval_literal),
        expr_node(parse_case_expression),
        expr_node(parse_cast_expression),
        expr_node(parse_extract_expression),
        expr_node(parse_exists_expression),
        expr_node(parse_keyword_literal),
        expr_node(parse_number_literal),
        expr_node(parse_string_literal_expr),
        expr_node(parse_paren_or_subquery),
        expr_node(parse_function_call),
        expr_node(parse_column_expr),
    ))
    .parse(input)
}

fn parse_date_literal(input: &str) -> PResult<'_, ExprKind<'_>> {
    let (rest, _) = keyword("DATE").parse(input)?;
    let (rest, quoted) = preceded(multispace0, parse_string_literal).parse(rest)?;
    Ok((rest, ExprKind::Literal(Literal::Date(quoted))))
}

fn parse_timestamp_literal(input: &str) -> PResult<'_, ExprKind<'_>> {
    let (rest, _) = keyword("TIMESTAMP").parse(input)?;
    let (rest, quoted) = preceded(multispace0, parse_string_literal).parse(rest)?;
    Ok((rest, ExprKind::Literal(Literal::Timestamp(quoted))))
}

fn parse_interval_literal(input: &str) -> PResult<'_, ExprKind<'_>> {
    let (rest, _) = keyword("INTERVAL").parse(input)?;
    let (rest, value) = preceded(multispace0, parse_string_literal).parse(rest)?;
    let (rest, qualifier) = preceded(
        multispace0,
        recognize((
            parse_bare_identifier,
            opt(preceded(ws(keyword("TO")), parse_bare_identifier)),
        )),
    )
    .parse(rest)?;
    Ok((rest, ExprKind::IntervalLiteral { value, qualifier }))
}

fn parse_keyword_literal(input: &str) -> PResult<'_, ExprKind<'_>> {
    alt((
        map(keyword("NULL"), |_| ExprKind::Literal(Literal::Null)),
        map(keyword("TRUE"), |_| ExprKind::Literal(Literal::True)),
        map(keyword("FALSE"), |_| ExprKind::Literal(Literal::False)),
    ))
    .parse(input)
}

fn parse_number_literal(input: &str) -> PResult<'_, ExprKind<'_>> {
    map(parse_number, |n| ExprKind::Literal(Literal::Number(n))).parse(input)
}

fn parse_string_literal_expr(input: &str) -> PResult<'_, ExprKind<'_>> {
    map(parse_string_literal, |s| {
        ExprKind::Literal(Literal::String(s))
    })
    .parse(input)
}

fn parse_case_expression(input: &str) -> PResult<'_, ExprKind<'_>> {
    let (rest, _) = keyword("CASE").parse(input)?;

    let searched = peek(ws(keyword("WHEN"))).parse(rest).is_ok();
    let (mut rest, operand) = if searched {
        (rest, None)
    } else {
        let (rest, operand) = parse_expression(rest)?;
        (rest, Some(Box::new(operand)))
    };

    let mut when_then = Vec::new();
    loop {
        match preceded(ws(keyword("WHEN")), parse_expression).parse(rest) {
            Ok((after_when, condition)) => {
                let (after_then, _) = ws(keyword("THEN")).parse(after_when)?;
                let (after_result, result) = parse_expression(after_then)?;
                when_then.push((condition, result));
                rest = after_result;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }
    if when_then.is_empty() {
        return Err(nom::Err::Error(OracleParsingError::from_error_kind(
            rest,
            ErrorKind::Tag,
        )));
    }

    let (rest, else_expr) = opt(preceded(ws(keyword("ELSE")), parse_expression)).parse(rest)?;
    let (rest, _) = ws(keyword("END")).parse(rest)?;

    Ok((
        rest,
        ExprKind::Case(CaseExpr {
            operand,
            when_then,
            else_expr: else_expr.map(Box::new),
        }),
    ))
}

/// Scan the `CAST` target type up to the closing parenthesis, tracking
/// nesting so `NUMBER(10,2)` survives.
fn parse_cast_type(input: &str) -> PResult<'_, &str> {
    let mut depth = 0usize;
    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                if depth == 0 {
                    let token = input[..i].trim();
                    if token.is_empty() {
                        break;
                    }
                    return Ok((&input[i..], token));
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    Err(nom::Err::Error(OracleParsingError::from_error_kind(
        input,
        ErrorKind::TakeUntil,
    )))
}

fn parse_cast_expression(input: &str) -> PResult<'_, ExprKind<'_>> {
    let (rest, _) = keyword("CAST").parse(input)?;
    let (rest, _) = ws(char('(')).parse(rest)?;
    let (rest, expr) = parse_expression(rest)?;
    let (rest, _) = ws(keyword("AS")).parse(rest)?;
    let (rest, data_type) = parse_cast_type(rest)?;
    let (rest, _) = ws(char(')')).parse(rest)?;
    Ok((
        rest,
        ExprKind::Cast {
            expr: Box::new(expr),
            data_type,
        },
    ))
}

fn parse_extract_expression(input: &str) -> PResult<'_, ExprKind<'_>> {
    let (rest, _) = keyword("EXTRACT").parse(input)?;
    let (rest, _) = ws(char('(')).parse(rest)?;
    let (rest, field) = ws(parse_bare_identifier).parse(rest)?;
    let (rest, _) = ws(keyword("FROM")).parse(rest)?;
    let (rest, expr) = parse_expression(rest)?;
    let (rest, _) = ws(char(')')).parse(rest)?;
    Ok((
        rest,
        ExprKind::Extract {
            field,
            expr: Box::new(expr),
        },
    ))
}

fn parse_exists_expression(input: &str) -> PResult<'_, ExprKind<'_>> {
    let (rest, _) = keyword("EXISTS").parse(input)?;
    let (rest, _) = ws(char('(')).parse(rest)?;
    let (rest, subquery) = parse_select_statement(rest)?;
    let (rest, _) = ws(char(')')).parse(rest)?;
    Ok((
        rest,
        ExprKind::Exists {
            subquery: Box::new(subquery),
            negated: false,
        },
    ))
}

fn parse_paren_or_subquery(input: &str) -> PResult<'_, ExprKind<'_>> {
    let (rest, _) = char('(')(input)?;
    if starts_select(rest) {
        let (rest, statement) = parse_select_statement(rest)?;
        let (rest, _) = ws(char(')')).parse(rest)?;
        return Ok((rest, ExprKind::ScalarSubquery(Box::new(statement))));
    }
    let (rest, inner) = parse_expression(rest)?;
    let (rest, _) = ws(char(')')).parse(rest)?;
    Ok((rest, ExprKind::Paren(Box::new(inner))))
}

fn parse_function_call(input: &str) -> PResult<'_, ExprKind<'_>> {
    let (rest, name) = parse_ident_path(input)?;
    let (rest, _) = preceded(multispace0, char('(')).parse(rest)?;
    let (rest, distinct) = opt(ws(keyword("DISTINCT"))).parse(rest)?;

    // COUNT(*) and friends
    if let Ok((after_star, star_src)) = ws(recognize(char::<&str, OracleParsingError>('*'))).parse(rest)
    {
        if let Ok((after_close, _)) = char::<&str, OracleParsingError>(')')(after_star) {
            return Ok((
                after_close,
                ExprKind::FunctionCall(FunctionCall {
                    name,
                    args: vec![Expr {
                        kind: ExprKind::Star,
                        source: star_src,
                    }],
                    distinct: distinct.is_some(),
                }),
            ));
        }
    }

    let (rest, args) = separated_list0(ws(char(',')), parse_expression).parse(rest)?;
    let (rest, _) = ws(char(')')).parse(rest)?;
    Ok((
        rest,
        ExprKind::FunctionCall(FunctionCall {
            name,
            args,
            distinct: distinct.is_some(),
        }),
    ))
}

fn parse_column_expr(input: &str) -> PResult<'_, ExprKind<'_>> {
    map(parse_ident_path, ExprKind::Column).parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(input: &str) -> Expr<'_> {
        let (rest, expr) = parse_expression(input).expect("parse");
        assert_eq!(rest.trim(), "", "unconsumed input: {rest}");
        expr
    }

    #[test]
    fn arithmetic_is_left_associative() {
        let expr = parse_all("100 + 50 - 20");
        assert_eq!(expr.source, "100 + 50 - 20");
        let ExprKind::Binary { op, left, .. } = &expr.kind else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::Sub);
        assert_eq!(left.source, "100 + 50");
    }

    #[test]
    fn multiplication_binds_tighter() {
        let expr = parse_all("1 + 2 * 3");
        let ExprKind::Binary { op, right, .. } = &expr.kind else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert_eq!(right.source, "2 * 3");
    }

    #[test]
    fn concat_and_comparison() {
        let expr = parse_all("first_name || ' ' || last_name = 'X'");
        let ExprKind::Binary { op, left, .. } = &expr.kind else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::Eq);
        assert!(matches!(
            left.kind,
            ExprKind::Binary {
                op: BinaryOp::Concat,
                ..
            }
        ));
    }

    #[test]
    fn prior_unary() {
        let expr = parse_all("PRIOR emp_id = manager_id");
        let ExprKind::Binary { left, .. } = &expr.kind else {
            panic!("expected binary");
        };
        assert!(matches!(
            left.kind,
            ExprKind::Unary {
                op: UnaryOp::Prior,
                ..
            }
        ));
    }

    #[test]
    fn null_test_and_between() {
        assert!(matches!(
            parse_all("hire_date IS NOT NULL").kind,
            ExprKind::NullTest { negated: true, .. }
        ));
        assert!(matches!(
            parse_all("sal BETWEEN 100 AND 200").kind,
            ExprKind::Between { negated: false, .. }
        ));
        assert!(matches!(
            parse_all("deptno NOT IN (10, 20)").kind,
            ExprKind::InList { negated: true, .. }
        ));
    }

    #[test]
    fn function_calls() {
        let expr = parse_all("NVL(comm, 0)");
        let ExprKind::FunctionCall(call) = &expr.kind else {
            panic!("expected call");
        };
        assert_eq!(call.name.segments, vec!["NVL"]);
        assert_eq!(call.args.len(), 2);

        let expr = parse_all("COUNT(*)");
        let ExprKind::FunctionCall(call) = &expr.kind else {
            panic!("expected call");
        };
        assert!(matches!(call.args[0].kind, ExprKind::Star));
    }

    #[test]
    fn case_expressions() {
        let expr = parse_all("CASE WHEN sal > 100 THEN 'high' ELSE 'low' END");
        let ExprKind::Case(case) = &expr.kind else {
            panic!("expected case");
        };
        assert!(case.operand.is_none());
        assert_eq!(case.when_then.len(), 1);
        assert!(case.else_expr.is_some());

        let expr = parse_all("CASE grade WHEN 1 THEN 'a' WHEN 2 THEN 'b' END");
        let ExprKind::Case(case) = &expr.kind else {
            panic!("expected case");
        };
        assert!(case.operand.is_some());
        assert_eq!(case.when_then.len(), 2);
    }

    #[test]
    fn date_literal_and_cast() {
        assert!(matches!(
            parse_all("DATE '2024-01-31'").kind,
            ExprKind::Literal(Literal::Date("'2024-01-31'"))
        ));
        let expr = parse_all("CAST(x AS NUMBER(10,2))");
        let ExprKind::Cast { data_type, .. } = &expr.kind else {
            panic!("expected cast");
        };
        assert_eq!(*data_type, "NUMBER(10,2)");
    }

    #[test]
    fn scalar_subquery_and_paren() {
        let expr = parse_all("(SELECT 1 FROM dual)");
        assert!(matches!(expr.kind, ExprKind::ScalarSubquery(_)));
        let expr = parse_all("(1 + 2)");
        assert!(matches!(expr.kind, ExprKind::Paren(_)));
    }

    #[test]
    fn outer_join_marker() {
        let expr = parse_all("d.deptno (+)");
        assert!(matches!(expr.kind, ExprKind::OuterJoinMarker(_)));
    }

    #[test]
    fn interval_literal() {
        let expr = parse_all("INTERVAL '3' DAY");
        assert!(matches!(
            expr.kind,
            ExprKind::IntervalLiteral {
                value: "'3'",
                qualifier: "DAY"
            }
        ));
    }

    #[test]
    fn date_keyword_falls_back_to_identifier() {
        // a column named "date" is still a column
        let expr = parse_all("order_date");
        assert!(matches!(expr.kind, ExprKind::Column(_)));
    }

    #[test]
    fn spans_are_stable_across_reparses() {
        let source = "TRUNC(hire_date) + 1";
        let a = parse_all(source);
        let b = parse_all(source);
        assert_eq!(
            a.span(source),
            b.span(source)
        );
        assert_eq!(a, b);
    }
}
