//! PL/SQL grammar: CREATE FUNCTION / PROCEDURE headers, declare
//! sections, and the statement subset (assignment, RETURN, IF, FOR,
//! nested blocks, SELECT INTO, bare calls, exception handlers).

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, multispace0},
    combinator::{map, opt, peek, recognize},
    multi::{many0, many1, separated_list0, separated_list1},
    sequence::preceded,
    Parser,
};

use super::ast::{
    Block, CallableKind, ExceptionHandler, ForQueryLoop, ForRangeLoop,
    FunctionCall, FunctionDecl, IfStatement, ParamDecl, ParamMode, Statement, TypeRef,
    TypeRefKind, VarDecl,
};
use super::common::{
    consumed_slice, keyword, parse_ident_path, parse_identifier, ws, PResult,
};
use super::errors::OracleParsingError;
use super::expression::parse_expression;
use super::select::parse_select_statement;

pub fn parse_callable(input: &str) -> PResult<'_, FunctionDecl<'_>> {
    let start = input;
    let (rest, _) = ws(keyword("CREATE")).parse(input)?;
    let (rest, or_replace) =
        opt((ws(keyword("OR")), ws(keyword("REPLACE")))).parse(rest)?;
    let (rest, kind) = ws(alt((
        map(keyword("FUNCTION"), |_| CallableKind::Function),
        map(keyword("PROCEDURE"), |_| CallableKind::Procedure),
    )))
    .parse(rest)?;
    let (rest, name) = preceded(multispace0, parse_ident_path).parse(rest)?;

    let (rest, params) = opt(|i| {
        let (i, _) = ws(char('(')).parse(i)?;
        let (i, params) = separated_list0(ws(char(',')), parse_param_decl).parse(i)?;
        let (i, _) = ws(char(')')).parse(i)?;
        Ok((i, params))
    })
    .parse(rest)?;

    let (rest, return_type) = if matches!(kind, CallableKind::Function) {
        let (rest, _) = ws(keyword("RETURN")).parse(rest)?;
        let (rest, type_ref) = parse_type_ref(rest)?;
        (rest, Some(type_ref))
    } else {
        (rest, None)
    };

    // properties with no PostgreSQL counterpart are consumed and dropped
    let (rest, _) = many0(ws(alt((
        keyword("DETERMINISTIC"),
        keyword("PIPELINED"),
        keyword("RESULT_CACHE"),
        recognize((
            keyword("AUTHID"),
            ws(alt((keyword("DEFINER"), keyword("CURRENT_USER")))),
        )),
    ))))
    .parse(rest)?;

    let (rest, _) = ws(alt((keyword("IS"), keyword("AS")))).parse(rest)?;

    let (rest, declarations) = many0(parse_var_decl).parse(rest)?;
    let (rest, body) = parse_block(rest)?;

    let (rest, _) = opt(ws(char(';'))).parse(rest)?;
    let (rest, _) = opt(ws(tag("/"))).parse(rest)?;

    Ok((
        rest,
        FunctionDecl {
            kind,
            or_replace: or_replace.is_some(),
            name,
            params: params.unwrap_or_default(),
            return_type,
            declarations,
            body,
            source: consumed_slice(start, rest),
        },
    ))
}

fn parse_param_mode(input: &str) -> PResult<'_, ParamMode> {
    alt((
        map((ws(keyword("IN")), ws(keyword("OUT"))), |_| ParamMode::InOut),
        map(ws(keyword("IN")), |_| ParamMode::In),
        map(ws(keyword("OUT")), |_| ParamMode::Out),
    ))
    .parse(input)
}

fn parse_param_decl(input: &str) -> PResult<'_, ParamDecl<'_>> {
    let (rest, name) = ws(parse_identifier).parse(input)?;
    let (rest, mode) = opt(parse_param_mode).parse(rest)?;
    let (rest, data_type) = parse_type_ref(rest)?;
    let (rest, default) = opt(preceded(
        ws(alt((recognize(keyword("DEFAULT")), tag(":=")))),
        parse_expression,
    ))
    .parse(rest)?;
    Ok((
        rest,
        ParamDecl {
            name,
            mode: mode.unwrap_or(ParamMode::In),
            data_type,
            default,
        },
    ))
}

/// A type reference: a scalar token (`VARCHAR2(100)`), `%TYPE`, or
/// `%ROWTYPE` anchor.
pub fn parse_type_ref(input: &str) -> PResult<'_, TypeRef<'_>> {
    let (input, _) = multispace0::<&str, OracleParsingError>(input)?;
    let start = input;
    let (rest, path) = parse_ident_path(input)?;

    if let Ok((after_pct, _)) = ws(char::<&str, OracleParsingError>('%')).parse(rest) {
        if let Ok((after_kw, _)) = keyword("ROWTYPE").parse(after_pct) {
            return Ok((
                after_kw,
                TypeRef {
                    source: consumed_slice(start, after_kw),
                    kind: TypeRefKind::RowType(path),
                },
            ));
        }
        let (after_kw, _) = keyword("TYPE").parse(after_pct)?;
        return Ok((
            after_kw,
            TypeRef {
                source: consumed_slice(start, after_kw),
                kind: TypeRefKind::ColumnType(path),
            },
        ));
    }

    // optional length/precision parameters
    let (rest, _) = opt(recognize((
        multispace0,
        char('('),
        take_while(|c| c != ')'),
        char(')'),
    )))
    .parse(rest)?;
    let source = consumed_slice(start, rest);
    Ok((
        rest,
        TypeRef {
            source,
            kind: TypeRefKind::Scalar(source),
        },
    ))
}

fn parse_var_decl(input: &str) -> PResult<'_, VarDecl<'_>> {
    let (input, _) = multispace0::<&str, OracleParsingError>(input)?;
    let start = input;
    let (rest, name) = parse_identifier(input)?;
    let (rest, constant) = opt(ws(keyword("CONSTANT"))).parse(rest)?;
    let (rest, data_type) = parse_type_ref(rest)?;
    let (rest, not_null) = opt((ws(keyword("NOT")), ws(keyword("NULL")))).parse(rest)?;
    let (rest, default) = opt(preceded(
        ws(alt((recognize(keyword("DEFAULT")), tag(":=")))),
        parse_expression,
    ))
    .parse(rest)?;
    let (rest, _) = ws(char(';')).parse(rest)?;
    Ok((
        rest,
        VarDecl {
            name,
            constant: constant.is_some(),
            data_type,
            not_null: not_null.is_some(),
            default,
            source: consumed_slice(start, rest),
        },
    ))
}

pub fn parse_block(input: &str) -> PResult<'_, Block<'_>> {
    let (input, _) = multispace0::<&str, OracleParsingError>(input)?;
    let start = input;
    let (rest, _) = keyword("BEGIN").parse(input)?;
    let (rest, statements) = many1(parse_statement).parse(rest)?;

    let (rest, exception_handlers) = opt(|i| {
        let (i, _) = ws(keyword("EXCEPTION")).parse(i)?;
        many1(parse_exception_handler).parse(i)
    })
    .parse(rest)?;

    let (rest, _) = ws(keyword("END")).parse(rest)?;
    // the optional repeated name after END
    let (rest, _) = opt(ws(parse_identifier)).parse(rest)?;
    let (rest, _) = opt(ws(char(';'))).parse(rest)?;
    Ok((
        rest,
        Block {
            statements,
            exception_handlers: exception_handlers.unwrap_or_default(),
            source: consumed_slice(start, rest),
        },
    ))
}

fn parse_exception_handler(input: &str) -> PResult<'_, ExceptionHandler<'_>> {
    let (rest, _) = ws(keyword("WHEN")).parse(input)?;
    let (rest, exceptions) = separated_list1(
        ws(keyword("OR")),
        ws(alt((parse_identifier, recognize(keyword("OTHERS"))))),
    )
    .parse(rest)?;
    let (rest, _) = ws(keyword("THEN")).parse(rest)?;
    let (rest, statements) = many1(parse_statement).parse(rest)?;
    Ok((
        rest,
        ExceptionHandler {
            exceptions,
            statements,
        },
    ))
}

pub fn parse_statement(input: &str) -> PResult<'_, Statement<'_>> {
    let (input, _) = multispace0::<&str, OracleParsingError>(input)?;
    let start = input;

    if peek(keyword("RETURN")).parse(input).is_ok() {
        let (rest, _) = keyword("RETURN").parse(input)?;
        let (rest, value) = opt(parse_expression).parse(rest)?;
        let (rest, _) = ws(char(';')).parse(rest)?;
        return Ok((
            rest,
            Statement::Return {
                value,
                source: consumed_slice(start, rest),
            },
        ));
    }

    if peek(keyword("IF")).parse(input).is_ok() {
        return parse_if_statement(input);
    }

    if peek(keyword("FOR")).parse(input).is_ok() {
        return parse_for_statement(input);
    }

    if peek(keyword("BEGIN")).parse(input).is_ok() {
        let (rest, block) = parse_block(input)?;
        return Ok((rest, Statement::Block(block)));
    }

    if peek(keyword("NULL")).parse(input).is_ok() {
        let (rest, _) = keyword("NULL").parse(input)?;
        let (rest, _) = ws(char(';')).parse(rest)?;
        return Ok((
            rest,
            Statement::Null {
                source: consumed_slice(start, rest),
            },
        ));
    }

    if peek(alt((keyword("SELECT"), keyword("WITH")))).parse(input).is_ok() {
        let (rest, statement) = parse_select_statement(input)?;
        let (rest, _) = ws(char(';')).parse(rest)?;
        return Ok((rest, Statement::Select(statement)));
    }

    // assignment or bare call
    let (rest, target) = parse_ident_path(input)?;
    if let Ok((after_assign, _)) = ws(tag::<&str, &str, OracleParsingError>(":=")).parse(rest) {
        let (rest, value) = parse_expression(after_assign)?;
        let (rest, _) = ws(char(';')).parse(rest)?;
        return Ok((
            rest,
            Statement::Assignment {
                target,
                value,
                source: consumed_slice(start, rest),
            },
        ));
    }

    let (rest, args) = opt(|i| {
        let (i, _) = ws(char('(')).parse(i)?;
        let (i, args) = separated_list0(ws(char(',')), parse_expression).parse(i)?;
        let (i, _) = ws(char(')')).parse(i)?;
        Ok((i, args))
    })
    .parse(rest)?;
    let (rest, _) = ws(char(';')).parse(rest)?;
    Ok((
        rest,
        Statement::Call {
            call: FunctionCall {
                name: target,
                args: args.unwrap_or_default(),
                distinct: false,
            },
            source: consumed_slice(start, rest),
        },
    ))
}

fn parse_if_statement(input: &str) -> PResult<'_, Statement<'_>> {
    let start = input;
    let (rest, _) = keyword("IF").parse(input)?;
    let (rest, condition) = parse_expression(rest)?;
    let (rest, _) = ws(keyword("THEN")).parse(rest)?;
    let (rest, statements) = many1(parse_statement).parse(rest)?;

    let mut branches = vec![(condition, statements)];
    let mut rest = rest;
    loop {
        match preceded(ws(keyword("ELSIF")), parse_expression).parse(rest) {
            Ok((after_cond, condition)) => {
                let (after_then, _) = ws(keyword("THEN")).parse(after_cond)?;
                let (after_stmts, statements) = many1(parse_statement).parse(after_then)?;
                branches.push((condition, statements));
                rest = after_stmts;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }

    let (rest, else_branch) =
        opt(preceded(ws(keyword("ELSE")), many1(parse_statement))).parse(rest)?;
    let (rest, _) = (ws(keyword("END")), ws(keyword("IF")), ws(char(';'))).parse(rest)?;

    Ok((
        rest,
        Statement::If(IfStatement {
            branches,
            else_branch,
            source: consumed_slice(start, rest),
        }),
    ))
}

fn parse_for_statement(input: &str) -> PResult<'_, Statement<'_>> {
    let start = input;
    let (rest, _) = keyword("FOR").parse(input)?;
    let (rest, variable) = ws(parse_identifier).parse(rest)?;
    let (rest, _) = ws(keyword("IN")).parse(rest)?;

    // cursor loop: FOR r IN (SELECT ...) LOOP
    if let Ok((after_open, _)) = ws(char::<&str, OracleParsingError>('(')).parse(rest) {
        if peek(ws(alt((keyword("SELECT"), keyword("WITH"))))).parse(after_open).is_ok() {
            let (after_query, query) = parse_select_statement(after_open)?;
            let (after_close, _) = ws(char(')')).parse(after_query)?;
            let (after_loop, body) = parse_loop_body(after_close)?;
            return Ok((
                after_loop,
                Statement::ForQuery(ForQueryLoop {
                    variable,
                    query,
                    body,
                    source: consumed_slice(start, after_loop),
                }),
            ));
        }
    }

    // numeric range loop: FOR i IN [REVERSE] 1 .. n LOOP
    let (rest, reverse) = opt(ws(keyword("REVERSE"))).parse(rest)?;
    let (rest, lower) = parse_expression(rest)?;
    let (rest, _) = ws(tag("..")).parse(rest)?;
    let (rest, upper) = parse_expression(rest)?;
    let (rest, body) = parse_loop_body(rest)?;
    Ok((
        rest,
        Statement::ForRange(ForRangeLoop {
            variable,
            reverse: reverse.is_some(),
            lower,
            upper,
            body,
            source: consumed_slice(start, rest),
        }),
    ))
}

fn parse_loop_body(input: &str) -> PResult<'_, Vec<Statement<'_>>> {
    let (rest, _) = ws(keyword("LOOP")).parse(input)?;
    let (rest, body) = many1(parse_statement).parse(rest)?;
    let (rest, _) = (ws(keyword("END")), ws(keyword("LOOP")), ws(char(';'))).parse(rest)?;
    Ok((rest, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(input: &str) -> FunctionDecl<'_> {
        let (rest, decl) = parse_callable(input).expect("parse");
        assert_eq!(rest.trim(), "", "unconsumed input: {rest}");
        decl
    }

    #[test]
    fn minimal_function() {
        let decl = parse_all(
            "CREATE OR REPLACE FUNCTION get_one RETURN NUMBER IS BEGIN RETURN 1; END;",
        );
        assert_eq!(decl.kind, CallableKind::Function);
        assert!(decl.or_replace);
        assert_eq!(decl.name.joined_lower(), "get_one");
        assert!(matches!(
            decl.return_type.as_ref().unwrap().kind,
            TypeRefKind::Scalar("NUMBER")
        ));
        assert_eq!(decl.body.statements.len(), 1);
    }

    #[test]
    fn params_and_modes() {
        let decl = parse_all(
            "CREATE FUNCTION add_tax(p_amount NUMBER, p_rate IN NUMBER DEFAULT 0.19, p_log OUT VARCHAR2) \
             RETURN NUMBER IS BEGIN RETURN p_amount * (1 + p_rate); END;",
        );
        assert_eq!(decl.params.len(), 3);
        assert_eq!(decl.params[0].mode, ParamMode::In);
        assert_eq!(decl.params[1].mode, ParamMode::In);
        assert!(decl.params[1].default.is_some());
        assert_eq!(decl.params[2].mode, ParamMode::Out);
    }

    #[test]
    fn declarations_and_assignment() {
        let decl = parse_all(
            "CREATE FUNCTION f RETURN NUMBER IS \
             v_total NUMBER(10,2) := 0; \
             c_rate CONSTANT NUMBER := 0.2; \
             BEGIN v_total := c_rate * 100; RETURN v_total; END f;",
        );
        assert_eq!(decl.declarations.len(), 2);
        assert!(decl.declarations[1].constant);
        assert!(matches!(decl.body.statements[0], Statement::Assignment { .. }));
    }

    #[test]
    fn percent_type_declaration() {
        let decl = parse_all(
            "CREATE FUNCTION f RETURN NUMBER IS v_sal emp.sal%TYPE; BEGIN RETURN v_sal; END;",
        );
        assert!(matches!(
            decl.declarations[0].data_type.kind,
            TypeRefKind::ColumnType(_)
        ));
    }

    #[test]
    fn if_elsif_else() {
        let decl = parse_all(
            "CREATE FUNCTION sign_of(n NUMBER) RETURN VARCHAR2 IS BEGIN \
             IF n > 0 THEN RETURN 'pos'; ELSIF n < 0 THEN RETURN 'neg'; ELSE RETURN 'zero'; END IF; \
             END;",
        );
        let Statement::If(if_statement) = &decl.body.statements[0] else {
            panic!("expected if");
        };
        assert_eq!(if_statement.branches.len(), 2);
        assert!(if_statement.else_branch.is_some());
    }

    #[test]
    fn for_loops() {
        let decl = parse_all(
            "CREATE PROCEDURE p IS BEGIN \
             FOR i IN 1 .. 10 LOOP NULL; END LOOP; \
             FOR r IN (SELECT emp_id FROM emp) LOOP NULL; END LOOP; \
             END;",
        );
        assert!(matches!(decl.body.statements[0], Statement::ForRange(_)));
        assert!(matches!(decl.body.statements[1], Statement::ForQuery(_)));
    }

    #[test]
    fn select_into_statement() {
        let decl = parse_all(
            "CREATE FUNCTION f RETURN NUMBER IS v_sal NUMBER; BEGIN \
             SELECT sal INTO v_sal FROM emp WHERE emp_id = 1; RETURN v_sal; END;",
        );
        assert!(matches!(decl.body.statements[0], Statement::Select(_)));
    }

    #[test]
    fn exception_handlers() {
        let decl = parse_all(
            "CREATE FUNCTION f RETURN NUMBER IS BEGIN RETURN 1; \
             EXCEPTION WHEN NO_DATA_FOUND THEN RETURN 0; WHEN OTHERS THEN RETURN -1; END;",
        );
        assert_eq!(decl.body.exception_handlers.len(), 2);
        assert_eq!(decl.body.exception_handlers[0].exceptions, vec!["NO_DATA_FOUND"]);
        assert_eq!(decl.body.exception_handlers[1].exceptions, vec!["OTHERS"]);
    }

    #[test]
    fn procedure_with_call() {
        let decl = parse_all(
            "CREATE OR REPLACE PROCEDURE log_it(p_msg VARCHAR2) IS BEGIN \
             dbms_output.put_line(p_msg); END log_it; /",
        );
        assert_eq!(decl.kind, CallableKind::Procedure);
        let Statement::Call { call, .. } = &decl.body.statements[0] else {
            panic!("expected call");
        };
        assert_eq!(call.name.joined_lower(), "dbms_output.put_line");
    }
}
