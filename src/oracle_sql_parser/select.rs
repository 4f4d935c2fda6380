//! SELECT statement grammar: WITH, query blocks, FROM/JOIN, WHERE,
//! hierarchical clauses (START WITH / CONNECT BY), GROUP BY, ORDER BY,
//! UNION chains.

use nom::{
    branch::alt,
    character::complete::{char, multispace0},
    combinator::{map, opt, peek},
    multi::{many0, separated_list1},
    sequence::preceded,
    Parser,
};

use super::ast::{
    ConnectBy, CteDefinition, Expr, ExprKind, Join, JoinKind, NullsOrder, OrderItem, QueryBlock,
    SelectItem, SelectStatement, TableExpr, TableRef, UnionBranch,
};
use super::common::{consumed_slice, keyword, parse_ident_path, parse_identifier, ws, PResult};
use super::errors::OracleParsingError;
use super::expression::parse_expression;

pub fn parse_select_statement(input: &str) -> PResult<'_, SelectStatement<'_>> {
    let start = input;
    let (rest, ctes) = opt(parse_with_clause).parse(input)?;
    let (rest, body) = parse_query_block(rest)?;

    let mut unions = Vec::new();
    let mut rest = rest;
    loop {
        match (ws(keyword("UNION")), opt(ws(keyword("ALL")))).parse(rest) {
            Ok((after_kw, (_, all))) => {
                let (after_block, block) = parse_query_block(after_kw)?;
                unions.push(UnionBranch {
                    all: all.is_some(),
                    block,
                });
                rest = after_block;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }

    Ok((
        rest,
        SelectStatement {
            ctes: ctes.unwrap_or_default(),
            body,
            unions,
            source: consumed_slice(start, rest),
        },
    ))
}

fn parse_with_clause(input: &str) -> PResult<'_, Vec<CteDefinition<'_>>> {
    let (rest, _) = ws(keyword("WITH")).parse(input)?;
    separated_list1(ws(char(',')), parse_cte_definition).parse(rest)
}

fn parse_cte_definition(input: &str) -> PResult<'_, CteDefinition<'_>> {
    let start = input;
    let (rest, name) = ws(parse_identifier).parse(input)?;
    let (rest, columns) = opt(|i| {
        let (i, _) = ws(char('(')).parse(i)?;
        let (i, cols) = separated_list1(ws(char(',')), parse_identifier).parse(i)?;
        let (i, _) = ws(char(')')).parse(i)?;
        Ok((i, cols))
    })
    .parse(rest)?;
    let (rest, _) = ws(keyword("AS")).parse(rest)?;
    let (rest, _) = ws(char('(')).parse(rest)?;
    let (rest, query) = parse_select_statement(rest)?;
    let (rest, _) = ws(char(')')).parse(rest)?;
    Ok((
        rest,
        CteDefinition {
            name,
            columns,
            query,
            source: consumed_slice(start, rest),
        },
    ))
}

fn parse_query_block(input: &str) -> PResult<'_, QueryBlock<'_>> {
    let start = input;
    let (rest, _) = ws(keyword("SELECT")).parse(input)?;

    let (rest, modifier) = opt(ws(alt((
        keyword("DISTINCT"),
        keyword("UNIQUE"),
        keyword("ALL"),
    ))))
    .parse(rest)?;
    let distinct = matches!(modifier, Some(m) if !m.eq_ignore_ascii_case("ALL"));

    let (rest, select_list) =
        separated_list1(ws(char(',')), parse_select_item).parse(rest)?;

    let (rest, into) = opt(preceded(
        ws(keyword("INTO")),
        separated_list1(ws(char(',')), |i| preceded(multispace0, parse_ident_path).parse(i)),
    ))
    .parse(rest)?;

    let (rest, from) = preceded(
        ws(keyword("FROM")),
        separated_list1(ws(char(',')), parse_table_ref),
    )
    .parse(rest)?;

    let (rest, where_clause) =
        opt(preceded(ws(keyword("WHERE")), parse_expression)).parse(rest)?;

    // hierarchical clauses appear in either order
    let (rest, (start_with, connect_by)) = parse_hierarchical_clauses(rest)?;

    let (rest, group_by) = opt(preceded(
        (ws(keyword("GROUP")), ws(keyword("BY"))),
        separated_list1(ws(char(',')), parse_expression),
    ))
    .parse(rest)?;

    let (rest, having) = opt(preceded(ws(keyword("HAVING")), parse_expression)).parse(rest)?;

    let (rest, order_by) = opt(parse_order_by_clause).parse(rest)?;

    Ok((
        rest,
        QueryBlock {
            distinct,
            select_list,
            into,
            from,
            where_clause,
            start_with,
            connect_by,
            group_by: group_by.unwrap_or_default(),
            having,
            order_by: order_by.unwrap_or_default(),
            source: consumed_slice(start, rest),
        },
    ))
}

type HierarchicalClauses<'a> = (Option<Expr<'a>>, Option<ConnectBy<'a>>);

fn parse_start_with(input: &str) -> PResult<'_, Expr<'_>> {
    preceded((ws(keyword("START")), ws(keyword("WITH"))), parse_expression).parse(input)
}

fn parse_connect_by(input: &str) -> PResult<'_, ConnectBy<'_>> {
    let (rest, _) = (ws(keyword("CONNECT")), ws(keyword("BY"))).parse(input)?;
    let (rest, nocycle) = opt(ws(keyword("NOCYCLE"))).parse(rest)?;
    let (rest, condition) = parse_expression(rest)?;
    Ok((
        rest,
        ConnectBy {
            nocycle: nocycle.is_some(),
            condition,
        },
    ))
}

fn parse_hierarchical_clauses(input: &str) -> PResult<'_, HierarchicalClauses<'_>> {
    if let Ok((rest, start_with)) = parse_start_with(input) {
        let (rest, connect_by) = opt(parse_connect_by).parse(rest)?;
        return Ok((rest, (Some(start_with), connect_by)));
    }
    if let Ok((rest, connect_by)) = parse_connect_by(input) {
        let (rest, start_with) = opt(parse_start_with).parse(rest)?;
        return Ok((rest, (start_with, Some(connect_by))));
    }
    Ok((input, (None, None)))
}

fn parse_order_by_clause(input: &str) -> PResult<'_, Vec<OrderItem<'_>>> {
    preceded(
        (ws(keyword("ORDER")), ws(keyword("BY"))),
        separated_list1(ws(char(',')), parse_order_item),
    )
    .parse(input)
}

fn parse_order_item(input: &str) -> PResult<'_, OrderItem<'_>> {
    let (rest, expr) = parse_expression(input)?;
    let (rest, direction) = opt(ws(alt((keyword("ASC"), keyword("DESC"))))).parse(rest)?;
    let (rest, nulls) = opt(preceded(
        ws(keyword("NULLS")),
        ws(alt((
            map(keyword("FIRST"), |_| NullsOrder::First),
            map(keyword("LAST"), |_| NullsOrder::Last),
        ))),
    ))
    .parse(rest)?;
    Ok((
        rest,
        OrderItem {
            expr,
            descending: matches!(direction, Some(d) if d.eq_ignore_ascii_case("DESC")),
            nulls,
        },
    ))
}

fn parse_select_item(input: &str) -> PResult<'_, SelectItem<'_>> {
    let start = input;

    // bare `*`
    if let Ok((rest, star_src)) =
        ws(nom::combinator::recognize(char::<&str, OracleParsingError>('*'))).parse(input)
    {
        return Ok((
            rest,
            SelectItem {
                expr: Expr {
                    kind: ExprKind::Star,
                    source: star_src,
                },
                alias: None,
                source: consumed_slice(start, rest),
            },
        ));
    }

    // `t.*`
    if let Ok((rest, path)) = preceded(multispace0, parse_ident_path).parse(input) {
        if let Ok((rest, _)) = (
            ws(char::<&str, OracleParsingError>('.')),
            char::<&str, OracleParsingError>('*'),
        )
            .parse(rest)
        {
            return Ok((
                rest,
                SelectItem {
                    expr: Expr {
                        kind: ExprKind::QualifiedStar(path),
                        source: consumed_slice(start, rest),
                    },
                    alias: None,
                    source: consumed_slice(start, rest),
                },
            ));
        }
    }

    let (rest, expr) = parse_expression(input)?;
    let (rest, alias) = opt(preceded(
        opt(ws(keyword("AS"))),
        ws(parse_identifier),
    ))
    .parse(rest)?;
    Ok((
        rest,
        SelectItem {
            expr,
            alias,
            source: consumed_slice(start, rest),
        },
    ))
}

fn parse_table_primary(input: &str) -> PResult<'_, TableExpr<'_>> {
    if let Ok((rest, _)) = ws(char::<&str, OracleParsingError>('(')).parse(input) {
        if peek(ws(alt((keyword("SELECT"), keyword("WITH"))))).parse(rest).is_ok() {
            let (rest, statement) = parse_select_statement(rest)?;
            let (rest, _) = ws(char(')')).parse(rest)?;
            return Ok((rest, TableExpr::Subquery(Box::new(statement))));
        }
    }
    let (rest, path) = preceded(multispace0, parse_ident_path).parse(input)?;
    Ok((rest, TableExpr::Named(path)))
}

fn parse_table_alias(input: &str) -> PResult<'_, Option<&str>> {
    opt(preceded(opt(ws(keyword("AS"))), ws(parse_identifier))).parse(input)
}

fn parse_table_ref(input: &str) -> PResult<'_, TableRef<'_>> {
    let start = input;
    let (rest, table) = parse_table_primary(input)?;
    let (rest, alias) = parse_table_alias(rest)?;
    let (rest, joins) = many0(parse_join).parse(rest)?;
    Ok((
        rest,
        TableRef {
            table,
            alias,
            joins,
            source: consumed_slice(start, rest),
        },
    ))
}

fn parse_join_kind(input: &str) -> PResult<'_, JoinKind> {
    alt((
        map((ws(keyword("CROSS")), ws(keyword("JOIN"))), |_| JoinKind::Cross),
        map((ws(keyword("INNER")), ws(keyword("JOIN"))), |_| JoinKind::Inner),
        map(
            (ws(keyword("LEFT")), opt(ws(keyword("OUTER"))), ws(keyword("JOIN"))),
            |_| JoinKind::Left,
        ),
        map(
            (ws(keyword("RIGHT")), opt(ws(keyword("OUTER"))), ws(keyword("JOIN"))),
            |_| JoinKind::Right,
        ),
        map(
            (ws(keyword("FULL")), opt(ws(keyword("OUTER"))), ws(keyword("JOIN"))),
            |_| JoinKind::Full,
        ),
        map(ws(keyword("JOIN")), |_| JoinKind::Inner),
    ))
    .parse(input)
}

fn parse_join(input: &str) -> PResult<'_, Join<'_>> {
    let start = input;
    let (rest, kind) = parse_join_kind(input)?;
    let (rest, table) = parse_table_primary(rest)?;
    let (rest, alias) = parse_table_alias(rest)?;
    let (rest, on) = if matches!(kind, JoinKind::Cross) {
        (rest, None)
    } else {
        let (rest, on) = preceded(ws(keyword("ON")), parse_expression).parse(rest)?;
        (rest, Some(on))
    };
    Ok((
        rest,
        Join {
            kind,
            table,
            alias,
            on,
            source: consumed_slice(start, rest),
        },
    ))
}
