//! S-expression reader: turns source text into [`Value`] trees.
//!
//! Tokenization and parsing are a single nom pass. The token inventory is
//! deliberately small: parentheses, the `'` quote shorthand, `"`-delimited
//! strings (verbatim, no escape sequences), and maximal runs of any other
//! non-whitespace characters (atoms). An atom is classified after the run is
//! taken: `#t`/`#f` become booleans, tokens that parse as a signed decimal
//! number become numbers, everything else is a symbol. Whitespace is a pure
//! separator and never carries meaning.

use nom::{
    IResult, Parser,
    bytes::complete::{take_till, take_while1},
    character::complete::{char, multispace0},
    combinator::cut,
    error::ErrorKind,
    multi::many0,
};

use crate::MAX_PARSE_DEPTH;
use crate::ast::{NumberType, Value};
use crate::{Error, SyntaxError, SyntaxErrorKind};

/// Characters that terminate an atom run.
fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '\'' | '"')
}

/// Whether a token is shaped like a number (before attempting the full
/// parse). Guards against `f64::from_str` accepting words such as "inf"
/// and "NaN", which must stay symbols.
fn looks_numeric(token: &str) -> bool {
    let unsigned = token.strip_prefix(['-', '+']).unwrap_or(token);
    let digits = unsigned.strip_prefix('.').unwrap_or(unsigned);
    digits.starts_with(|c: char| c.is_ascii_digit())
}

/// Classify a completed atom run into a boolean, number, or symbol.
fn classify_atom(token: &str) -> Value {
    match token {
        "#t" => Value::Bool(true),
        "#f" => Value::Bool(false),
        _ => {
            if looks_numeric(token)
                && let Ok(n) = token.parse::<NumberType>()
            {
                Value::Number(n)
            } else {
                Value::Symbol(token.into())
            }
        }
    }
}

/// Parse one atom: a maximal run of non-delimiter characters.
fn parse_atom(input: &str) -> IResult<&str, Value> {
    let (remaining, token) = take_while1(|c| !is_delimiter(c)).parse(input)?;
    Ok((remaining, classify_atom(token)))
}

/// Parse a string literal: everything between two `"` marks, verbatim.
///
/// There are no escape sequences; a string simply cannot contain the `"`
/// character. Once the opening quote is seen the closing quote is mandatory
/// (`cut`), so an unterminated string surfaces as an error at end of input
/// instead of being re-tried as some other token kind.
fn parse_string(input: &str) -> IResult<&str, Value> {
    let (input, _) = char('"').parse(input)?;
    let (input, contents) = take_till::<_, _, nom::error::Error<&str>>(|c| c == '"').parse(input)?;
    let (input, _) = cut(char('"')).parse(input)?;
    Ok((input, Value::String(contents.into())))
}

/// Parse a parenthesized list.
///
/// After the opening paren the closing paren is mandatory (`cut`), so an
/// unbalanced `(` at end of input propagates as a failure rather than
/// backtracking into the atom parser.
fn parse_list(input: &str, depth: usize) -> IResult<&str, Value> {
    let (input, _) = char('(').parse(input)?;
    let (input, elements) = many0(|input| parse_expr(input, depth + 1)).parse(input)?;
    let (input, _) = multispace0.parse(input)?;
    let (input, _) = cut(char(')')).parse(input)?;
    Ok((input, Value::List(elements)))
}

/// Parse the quote shorthand: `'expr` reads as `(quote expr)`.
fn parse_quote(input: &str, depth: usize) -> IResult<&str, Value> {
    let (input, _) = char('\'').parse(input)?;
    let (input, expr) = parse_expr(input, depth + 1)?;
    Ok((
        input,
        Value::List(vec![Value::Symbol("quote".into()), expr]),
    ))
}

/// Parse a single expression, skipping leading whitespace.
fn parse_expr(input: &str, depth: usize) -> IResult<&str, Value> {
    if depth >= MAX_PARSE_DEPTH {
        // Failure, not Error: the depth breach must propagate out of
        // enclosing many0/alt combinators instead of being backtracked over.
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            ErrorKind::TooLarge,
        )));
    }

    let (input, _) = multispace0::<_, nom::error::Error<&str>>.parse(input)?;

    match input.chars().next() {
        Some('\'') => parse_quote(input, depth),
        Some('(') => parse_list(input, depth),
        Some('"') => parse_string(input),
        _ => parse_atom(input),
    }
}

/// Convert a nom parsing error into the crate's structured [`SyntaxError`].
///
/// `input` must be the full original source so that the error offset and
/// context snippet are computed against what the caller actually passed in.
fn syntax_error(input: &str, error: nom::Err<nom::error::Error<&str>>) -> Error {
    match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let offset = input.len().saturating_sub(e.input.len());

            if e.code == ErrorKind::TooLarge {
                return Error::SyntaxError(SyntaxError::with_context(
                    SyntaxErrorKind::TooDeeplyNested,
                    format!("expression too deeply nested (max depth: {MAX_PARSE_DEPTH})"),
                    input,
                    offset,
                ));
            }

            if e.input.trim_start().is_empty() {
                // Failed at (effective) end of input: something was left open.
                Error::SyntaxError(SyntaxError::with_context(
                    SyntaxErrorKind::Incomplete,
                    "unexpected end of input",
                    input,
                    offset,
                ))
            } else {
                let found: String = e.input.trim_start().chars().take(10).collect();
                Error::SyntaxError(SyntaxError::with_context_and_found(
                    SyntaxErrorKind::InvalidSyntax,
                    format!("invalid syntax at position {offset}"),
                    input,
                    offset,
                    Some(found),
                ))
            }
        }
        nom::Err::Incomplete(_) => Error::SyntaxError(SyntaxError::from_message(
            SyntaxErrorKind::Incomplete,
            "unexpected end of input",
        )),
    }
}

/// Read exactly one expression from `input`.
///
/// Leading and trailing whitespace is permitted; any other trailing text is
/// a [`SyntaxErrorKind::TrailingContent`] error. Empty input is an
/// [`SyntaxErrorKind::Incomplete`] error.
pub fn read(input: &str) -> Result<Value, Error> {
    let (remaining, value) = parse_expr(input, 0).map_err(|e| syntax_error(input, e))?;

    let trailing = remaining.trim_start();
    if trailing.is_empty() {
        Ok(value)
    } else {
        let offset = input.len() - trailing.len();
        let found: String = trailing.chars().take(10).collect();
        Err(Error::SyntaxError(SyntaxError::with_context_and_found(
            SyntaxErrorKind::TrailingContent,
            "unexpected content after expression",
            input,
            offset,
            Some(found),
        )))
    }
}

/// Read every top-level expression from `input`, in order.
///
/// Returns an empty vector for blank input. Any unbalanced or malformed
/// text is an error, including a stray `)` after otherwise complete forms.
pub fn read_all(input: &str) -> Result<Vec<Value>, Error> {
    let mut forms = Vec::new();
    let mut remaining = input.trim_start();

    while !remaining.is_empty() {
        let (rest, value) = parse_expr(remaining, 0).map_err(|e| syntax_error(input, e))?;
        forms.push(value);
        remaining = rest.trim_start();
    }

    Ok(forms)
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::{nil, sym, val};

    /// Test result variants for comprehensive reader tests
    #[derive(Debug)]
    enum ReadTestResult {
        Success(Value),             // Reading should succeed with this value
        WithKind(SyntaxErrorKind),  // Reading should fail with this error kind
    }
    use ReadTestResult::*;

    /// Helper for successful read test cases
    fn success<T: Into<Value>>(value: T) -> ReadTestResult {
        Success(value.into())
    }

    /// Run comprehensive read tests with round-trip validation
    fn run_read_tests(test_cases: Vec<(&str, ReadTestResult)>) {
        for (i, (input, expected)) in test_cases.iter().enumerate() {
            let test_id = format!("Read test #{}", i + 1);
            let result = read(input);

            match (result, expected) {
                (Ok(actual), Success(expected_val)) => {
                    assert_eq!(actual, *expected_val, "{test_id}: value mismatch");

                    // Round-trip: display -> read -> display should be identical
                    let displayed = format!("{actual}");
                    let reread = read(&displayed).unwrap_or_else(|e| {
                        panic!("{test_id}: round-trip read failed for '{displayed}': {e:?}")
                    });
                    let redisplayed = format!("{reread}");
                    assert_eq!(
                        displayed, redisplayed,
                        "{test_id}: round-trip display mismatch for '{input}'"
                    );
                }

                (Err(Error::SyntaxError(e)), WithKind(expected_kind)) => {
                    assert_eq!(
                        e.kind, *expected_kind,
                        "{test_id}: error kind mismatch ({})",
                        e.message
                    );
                }

                (Ok(actual), WithKind(kind)) => {
                    panic!("{test_id}: expected {kind:?} error, got {actual:?}");
                }
                (Err(err), Success(_)) => {
                    panic!("{test_id}: expected success, got error {err:?}");
                }
                (Err(err), WithKind(_)) => {
                    panic!("{test_id}: expected SyntaxError, got {err:?}");
                }
            }
        }
    }

    #[test]
    #[expect(clippy::too_many_lines)] // Comprehensive test coverage is intentionally thorough
    fn test_reader_comprehensive() {
        use SyntaxErrorKind::*;

        let test_cases = vec![
            // ===== NUMBER CLASSIFICATION =====
            ("42", success(42)),
            ("-5", success(-5)),
            ("0", success(0)),
            ("-0", success(0)),
            ("3.14", success(3.14)),
            ("-2.5", success(-2.5)),
            (".5", success(0.5)),
            ("+7", success(7)),
            ("1e3", success(1000)),
            // Tokens that merely start with digits stay symbols
            ("123abc", success(sym("123abc"))),
            ("-42name", success(sym("-42name"))),
            // Words f64::from_str would accept must stay symbols
            ("inf", success(sym("inf"))),
            ("NaN", success(sym("NaN"))),
            // ===== SYMBOL CLASSIFICATION =====
            ("foo", success(sym("foo"))),
            ("+", success(sym("+"))),
            ("-", success(sym("-"))),
            (">=", success(sym(">="))),
            ("set!", success(sym("set!"))),
            ("null?", success(sym("null?"))),
            ("string-append", success(sym("string-append"))),
            ("var123", success(sym("var123"))),
            // Atoms are maximal runs: odd characters are still symbols
            ("test@home", success(sym("test@home"))),
            ("#true", success(sym("#true"))),
            // ===== BOOLEANS =====
            ("#t", success(true)),
            ("#f", success(false)),
            ("#T", success(sym("#T"))), // case sensitive
            // ===== STRINGS =====
            ("\"hello\"", success("hello")),
            ("\"hello world\"", success("hello world")),
            ("\"\"", success("")),
            // No escape processing: backslashes are ordinary characters
            (r#""a\nb""#, success(r"a\nb")),
            // Unterminated strings fail at end of input
            (r#""unterminated"#, WithKind(Incomplete)),
            // ===== NIL AND LISTS =====
            ("()", success(nil())),
            ("(   )", success(nil())),
            ("(\t\n)", success(nil())),
            ("(42)", success([42])),
            ("(1 2 3)", success([1, 2, 3])),
            (
                "(+ 1 2)",
                success(vec![sym("+"), val(1), val(2)]),
            ),
            (
                "(1 hello \"world\" #t)",
                success(vec![val(1), sym("hello"), val("world"), val(true)]),
            ),
            // Atoms end at delimiters even without whitespace
            ("(car(list))", success(vec![sym("car"), val(vec![sym("list")])])),
            // ===== NESTED LISTS =====
            ("((1 2) (3 4))", success([[1, 2], [3, 4]])),
            ("(((1)))", success([val([val([val(1)])])])),
            (
                "(if (< x 10) x y)",
                success(vec![
                    sym("if"),
                    val(vec![sym("<"), sym("x"), val(10)]),
                    sym("x"),
                    sym("y"),
                ]),
            ),
            // ===== QUOTE SHORTHAND =====
            ("'foo", success(vec![sym("quote"), sym("foo")])),
            ("'(1 2 3)", success(vec![sym("quote"), val([1, 2, 3])])),
            ("'()", success(vec![sym("quote"), nil()])),
            ("(quote foo)", success(vec![sym("quote"), sym("foo")])),
            // ===== WHITESPACE HANDLING =====
            ("  42  ", success(42)),
            ("\t#t\n", success(true)),
            ("\r\n  foo  \t", success(sym("foo"))),
            ("( 1   2\t\n3 )", success([1, 2, 3])),
            // ===== ERROR CASES =====
            ("(+ 1 2", WithKind(Incomplete)),
            ("((1 2)", WithKind(Incomplete)),
            ("(+ 1 (- 2", WithKind(Incomplete)),
            ("", WithKind(Incomplete)),
            ("   ", WithKind(Incomplete)),
            (")", WithKind(InvalidSyntax)),
            ("(1 2))", WithKind(TrailingContent)),
            ("1 2", WithKind(TrailingContent)),
            ("(+ 1 2) (+ 3 4)", WithKind(TrailingContent)),
        ];

        run_read_tests(test_cases);
    }

    #[test]
    fn test_read_all_multiple_forms() {
        let forms = read_all("(define x 5)\n(+ x 1)  42").unwrap();
        assert_eq!(
            forms,
            vec![
                val(vec![sym("define"), sym("x"), val(5)]),
                val(vec![sym("+"), sym("x"), val(1)]),
                val(42),
            ]
        );

        assert_eq!(read_all("").unwrap(), vec![]);
        assert_eq!(read_all("  \n\t ").unwrap(), vec![]);
    }

    #[test]
    fn test_read_all_rejects_unbalanced_input() {
        // Unclosed paren at end of input
        match read_all("(define x 5) (+ x") {
            Err(Error::SyntaxError(e)) => assert_eq!(e.kind, SyntaxErrorKind::Incomplete),
            other => panic!("expected Incomplete, got {other:?}"),
        }

        // A trailing ')' after complete forms is reported, never ignored
        match read_all("(+ 1 2))") {
            Err(Error::SyntaxError(e)) => assert_eq!(e.kind, SyntaxErrorKind::InvalidSyntax),
            other => panic!("expected InvalidSyntax, got {other:?}"),
        }
    }

    #[test]
    fn test_reader_depth_limits() {
        let parens_under_limit = format!(
            "{}x{}",
            "(".repeat(MAX_PARSE_DEPTH - 1),
            ")".repeat(MAX_PARSE_DEPTH - 1)
        );
        let parens_at_limit = format!(
            "{}x{}",
            "(".repeat(MAX_PARSE_DEPTH),
            ")".repeat(MAX_PARSE_DEPTH)
        );
        let quotes_at_limit = format!("{}a", "'".repeat(MAX_PARSE_DEPTH));

        assert!(
            read(&parens_under_limit).is_ok(),
            "nesting just under the depth limit should read successfully"
        );

        for too_deep in [parens_at_limit, quotes_at_limit] {
            match read(&too_deep) {
                Err(Error::SyntaxError(e)) => {
                    assert_eq!(e.kind, SyntaxErrorKind::TooDeeplyNested)
                }
                other => panic!("expected TooDeeplyNested, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_syntax_error_context() {
        // Errors carry a context snippet and the offending token
        match read("(list 1 2) trailing-junk") {
            Err(Error::SyntaxError(e)) => {
                assert_eq!(e.kind, SyntaxErrorKind::TrailingContent);
                assert!(e.context.is_some());
                assert_eq!(e.found.as_deref(), Some("trailing-j"));
            }
            other => panic!("expected TrailingContent, got {other:?}"),
        }
    }
}
