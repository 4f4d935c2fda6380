use nom::error::{ContextError, ParseError};
use std::fmt;

/// Error type threaded through the nom parsers. Collects the failing
/// input slice together with the grammar context so the caller can point
/// at the offending token.
#[derive(Debug, PartialEq)]
pub struct OracleParsingError<'a> {
    pub errors: Vec<(&'a str, &'static str)>,
}

impl<'a> ParseError<&'a str> for OracleParsingError<'a> {
    fn from_error_kind(input: &'a str, _kind: nom::error::ErrorKind) -> Self {
        OracleParsingError {
            errors: vec![(input, "unexpected token")],
        }
    }

    fn append(input: &'a str, _kind: nom::error::ErrorKind, mut other: Self) -> Self {
        other.errors.push((input, "unexpected token"));
        other
    }
}

impl<'a> ContextError<&'a str> for OracleParsingError<'a> {
    fn add_context(input: &'a str, ctx: &'static str, mut other: Self) -> Self {
        other.errors.push((input, ctx));
        other
    }
}

impl fmt::Display for OracleParsingError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (input, ctx) in &self.errors {
            let snippet: String = input.chars().take(40).collect();
            writeln!(f, "{}: near '{}'", ctx, snippet)?;
        }
        Ok(())
    }
}

impl<'a> From<nom::error::Error<&'a str>> for OracleParsingError<'a> {
    fn from(err: nom::error::Error<&'a str>) -> Self {
        OracleParsingError {
            errors: vec![(err.input, "unable to parse")],
        }
    }
}
