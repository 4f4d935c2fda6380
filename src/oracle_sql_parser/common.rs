//! Shared lexical helpers for the Oracle parser.

use nom::{
    bytes::complete::{tag_no_case, take_while, take_while1},
    character::complete::{char, multispace0, satisfy},
    combinator::{not, opt, recognize},
    error::{ErrorKind, ParseError},
    multi::many0,
    sequence::{delimited, pair, preceded},
    IResult, Parser,
};

use super::ast::IdentPath;
use super::errors::OracleParsingError;

pub type PResult<'a, O> = IResult<&'a str, O, OracleParsingError<'a>>;

/// Keywords that terminate an identifier position. Without this set the
/// expression parser would swallow clause keywords as column names or
/// aliases (`SELECT a FROM t` must stop at FROM). Kept sorted for the
/// binary search in `is_stop_keyword`.
static STOP_KEYWORDS: &[&str] = &[
    "ALL",
    "AND",
    "AS",
    "ASC",
    "BEGIN",
    "BETWEEN",
    "BY",
    "CASE",
    "CONNECT",
    "CREATE",
    "CROSS",
    "DECLARE",
    "DESC",
    "DISTINCT",
    "ELSE",
    "ELSIF",
    "END",
    "EXCEPTION",
    "EXISTS",
    "FALSE",
    "FOR",
    "FROM",
    "FULL",
    "GROUP",
    "HAVING",
    "IF",
    "IN",
    "INNER",
    "INTERSECT",
    "INTO",
    "IS",
    "JOIN",
    "LEFT",
    "LIKE",
    "LOOP",
    "MINUS",
    "NOCYCLE",
    "NOT",
    "NULL",
    "NULLS",
    "ON",
    "OR",
    "ORDER",
    "OUTER",
    "PRIOR",
    "RETURN",
    "RIGHT",
    "SELECT",
    "START",
    "THEN",
    "TRUE",
    "UNION",
    "UNIQUE",
    "WHEN",
    "WHERE",
    "WHILE",
    "WITH",
];

pub fn is_stop_keyword(word: &str) -> bool {
    let upper = word.to_uppercase();
    STOP_KEYWORDS.binary_search(&upper.as_str()).is_ok()
}

/// Whitespace-handling combinator.
pub fn ws<'a, O, E: ParseError<&'a str>, F>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
{
    delimited(multispace0, inner, multispace0)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '#'
}

/// Case-insensitive keyword with a word boundary, so `IN` does not match
/// the prefix of `INVOICE`.
pub fn keyword<'a>(
    kw: &'static str,
) -> impl Parser<&'a str, Output = &'a str, Error = OracleParsingError<'a>> {
    move |input: &'a str| {
        let (rest, matched) = tag_no_case(kw).parse(input)?;
        let (rest, ()) = not(satisfy(is_ident_char)).parse(rest)?;
        Ok((rest, matched))
    }
}

/// A bare identifier: letter followed by letters, digits, `_`, `$`, `#`.
/// Stop keywords are rejected so clause boundaries hold.
pub fn parse_bare_identifier(input: &str) -> PResult<'_, &str> {
    let (rest, ident) = recognize(pair(
        satisfy(|c: char| c.is_ascii_alphabetic()),
        take_while(is_ident_char),
    ))
    .parse(input)?;
    if is_stop_keyword(ident) {
        return Err(nom::Err::Error(OracleParsingError::from_error_kind(
            input,
            ErrorKind::Tag,
        )));
    }
    Ok((rest, ident))
}

/// A double-quoted identifier, returned with its quotes so downstream
/// normalization can tell it apart from a bare name.
pub fn parse_quoted_identifier(input: &str) -> PResult<'_, &str> {
    recognize(delimited(char('"'), take_while1(|c| c != '"'), char('"'))).parse(input)
}

pub fn parse_identifier(input: &str) -> PResult<'_, &str> {
    if input.starts_with('"') {
        parse_quoted_identifier(input)
    } else {
        parse_bare_identifier(input)
    }
}

/// A dotted identifier path: `col`, `t.col`, `hr.emp.col`.
pub fn parse_ident_path(input: &str) -> PResult<'_, IdentPath<'_>> {
    let (rest, first) = parse_identifier(input)?;
    let (rest, more) = many0(preceded(ws(char('.')), parse_identifier)).parse(rest)?;
    let mut segments = vec![first];
    segments.extend(more);
    Ok((rest, IdentPath { segments }))
}

/// A single-quoted string literal with `''` doubling, returned including
/// its quotes.
pub fn parse_string_literal(input: &str) -> PResult<'_, &str> {
    let bytes = input.as_bytes();
    if bytes.first() != Some(&b'\'') {
        return Err(nom::Err::Error(OracleParsingError::from_error_kind(
            input,
            ErrorKind::Char,
        )));
    }
    let mut i = 1;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            return Ok((&input[i + 1..], &input[..=i]));
        }
        i += 1;
    }
    // unterminated literal
    Err(nom::Err::Error(OracleParsingError::from_error_kind(
        input,
        ErrorKind::TakeUntil,
    )))
}

/// Unsigned numeric literal: `123`, `3.14`, `.5`, `1.5e10`. The sign is
/// handled at the unary-expression level. Written so `1..10` range bounds
/// parse as the integer `1`.
pub fn parse_number(input: &str) -> PResult<'_, &str> {
    let digit1 = take_while1(|c: char| c.is_ascii_digit());
    recognize(pair(
        nom::branch::alt((
            recognize((
                take_while1(|c: char| c.is_ascii_digit()),
                char('.'),
                take_while1(|c: char| c.is_ascii_digit()),
            )),
            recognize(pair(char('.'), take_while1(|c: char| c.is_ascii_digit()))),
            digit1,
        )),
        opt(recognize((
            nom::branch::alt((char('e'), char('E'))),
            opt(nom::branch::alt((char('+'), char('-')))),
            take_while1(|c: char| c.is_ascii_digit()),
        ))),
    ))
    .parse(input)
}

/// Slice of `from` consumed up to `rest`, trimmed. Used to attach source
/// fragments to nodes assembled across several sub-parsers.
pub fn consumed_slice<'a>(from: &'a str, rest: &'a str) -> &'a str {
    let len = from.len() - rest.len();
    from[..len].trim()
}

/// Strip `--` and `/* */` comments ahead of parsing. String literals and
/// quoted identifiers are respected; Oracle escapes quotes inside strings
/// by doubling them.
pub fn strip_comments(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string: Option<char> = None;

    while let Some(ch) = chars.next() {
        if let Some(quote) = in_string {
            result.push(ch);
            if ch == quote {
                // doubled quote stays inside the literal
                if quote == '\'' && chars.peek() == Some(&'\'') {
                    result.push(chars.next().expect("peeked"));
                } else {
                    in_string = None;
                }
            }
            continue;
        }

        if ch == '\'' || ch == '"' {
            in_string = Some(ch);
            result.push(ch);
            continue;
        }

        if ch == '-' && chars.peek() == Some(&'-') {
            chars.next();
            for c in chars.by_ref() {
                if c == '\n' {
                    result.push('\n');
                    break;
                }
            }
            continue;
        }

        if ch == '/' && chars.peek() == Some(&'*') {
            chars.next();
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    break;
                }
            }
            continue;
        }

        result.push(ch);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_keywords_are_sorted() {
        let mut sorted = STOP_KEYWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, STOP_KEYWORDS);
    }

    #[test]
    fn keyword_respects_word_boundary() {
        assert!(keyword("IN").parse("IN (1)").is_ok());
        assert!(keyword("IN").parse("INVOICE").is_err());
        assert!(keyword("from").parse("FROM dual").is_ok());
    }

    #[test]
    fn identifiers() {
        assert_eq!(parse_identifier("emp_id rest"), Ok((" rest", "emp_id")));
        assert_eq!(parse_identifier("x$1,"), Ok((",", "x$1")));
        assert_eq!(parse_identifier("\"Mixed Case\" x"), Ok((" x", "\"Mixed Case\"")));
        // stop keywords are not identifiers
        assert!(parse_identifier("FROM dual").is_err());
    }

    #[test]
    fn ident_paths() {
        let (rest, path) = parse_ident_path("hr.employees.emp_id rest").unwrap();
        assert_eq!(rest, " rest");
        assert_eq!(path.segments, vec!["hr", "employees", "emp_id"]);
        // the dot before a star is left for the caller
        let (rest, path) = parse_ident_path("t.* rest").unwrap();
        assert_eq!(rest, ".* rest");
        assert_eq!(path.segments, vec!["t"]);
    }

    #[test]
    fn string_literals() {
        assert_eq!(parse_string_literal("'abc' rest"), Ok((" rest", "'abc'")));
        assert_eq!(parse_string_literal("'it''s' x"), Ok((" x", "'it''s'")));
        assert!(parse_string_literal("'unterminated").is_err());
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_number("123 "), Ok((" ", "123")));
        assert_eq!(parse_number("3.14,"), Ok((",", "3.14")));
        assert_eq!(parse_number(".5)"), Ok((")", ".5")));
        assert_eq!(parse_number("1.5e10 "), Ok((" ", "1.5e10")));
        // range bounds stay integers
        assert_eq!(parse_number("1..10"), Ok(("..10", "1")));
    }

    #[test]
    fn comment_stripping() {
        assert_eq!(strip_comments("-- header\nSELECT 1"), "\nSELECT 1");
        assert_eq!(strip_comments("SELECT /* hint */ 1"), "SELECT  1");
        assert_eq!(
            strip_comments("SELECT '--not a comment' FROM dual"),
            "SELECT '--not a comment' FROM dual"
        );
        assert_eq!(
            strip_comments("SELECT 'it''s -- fine' FROM dual"),
            "SELECT 'it''s -- fine' FROM dual"
        );
    }
}
