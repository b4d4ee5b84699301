//! TinyLisp - a minimal embeddable Lisp interpreter
//!
//! This crate provides a small S-expression language for embedded scripting:
//! a reader that turns source text into expression trees, and an evaluator
//! that interprets them against a lexically scoped environment.
//!
//! ```scheme
//! (define (fib n)
//!   (if (< n 2) n (+ (fib (- n 1)) (fib (- n 2)))))
//! (fib 10)                 ; => 55
//! ((lambda (x) (* x x)) 7) ; => 49
//! ```
//!
//! ## Design points
//!
//! - **Lexical scoping**: closures capture their defining environment by
//!   shared reference, so `set!` through a captured scope is visible to every
//!   closure sharing it, and procedures defined with `define` can call
//!   themselves by name.
//! - **Tail-call elimination**: the evaluator is an iterative loop over a
//!   (expression, environment) pair; tail-recursive loops run in constant
//!   native stack space regardless of iteration count.
//! - **Strict failure reporting**: syntax, unbound-symbol, arity, type, and
//!   arithmetic failures are distinct error variants, never bare strings, so
//!   an embedding host can report them and keep going.
//!
//! ## Modules
//!
//! - `reader`: S-expression parsing from text
//! - `ast`: the unified expression/value type
//! - `evaluator`: environments and the core evaluation loop
//! - `primitives`: built-in procedures installed into the global environment

use std::fmt;

/// Maximum parsing depth to prevent stack overflow on deeply nested input
pub const MAX_PARSE_DEPTH: usize = 64;

/// Maximum nesting depth for non-tail sub-evaluations.
///
/// Tail calls do not consume this budget; only genuinely nested evaluation
/// (argument expressions, `if` tests, non-tail recursion) does. Set high
/// enough for realistic recursive programs while still failing cleanly
/// before the native stack overflows.
pub const MAX_EVAL_DEPTH: usize = 512;

/// Categorizes the different kinds of reader failures.
#[derive(Debug, PartialEq, Clone)]
pub enum SyntaxErrorKind {
    /// Invalid or unexpected syntax (stray `)`, bad tokens, malformed expressions)
    InvalidSyntax,
    /// Input ended before the expression was complete (unclosed paren, unterminated string)
    Incomplete,
    /// Expression nesting exceeded the maximum parse depth
    TooDeeplyNested,
    /// Extra input found after a complete, valid expression
    TrailingContent,
}

/// A structured error providing detailed information about a reader failure.
#[derive(Debug, PartialEq, Clone)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub message: String,
    /// Context snippet from the input showing where the error occurred (max 100 chars)
    pub context: Option<String>,
    /// The problematic token or character encountered, if identifiable
    pub found: Option<String>,
}

impl SyntaxError {
    /// Create a SyntaxError with all fields
    pub fn new(
        kind: SyntaxErrorKind,
        message: impl Into<String>,
        context: Option<String>,
        found: Option<String>,
    ) -> Self {
        SyntaxError {
            kind,
            message: message.into(),
            context,
            found,
        }
    }

    /// Create a simple SyntaxError with a kind and message but no context
    pub fn from_message(kind: SyntaxErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind, message, None, None)
    }

    /// Create a SyntaxError with context extracted from input at a given offset
    pub fn with_context(
        kind: SyntaxErrorKind,
        message: impl Into<String>,
        input: &str,
        error_offset: usize,
    ) -> Self {
        Self::with_context_and_found(kind, message, input, error_offset, None)
    }

    /// Create a SyntaxError with context and found token
    pub fn with_context_and_found(
        kind: SyntaxErrorKind,
        message: impl Into<String>,
        input: &str,
        error_offset: usize,
        found: Option<String>,
    ) -> Self {
        const MAX_CONTEXT: usize = 100;

        // Show some context before the error position as well
        let context_start = error_offset.saturating_sub(20);

        let context_str: String = input
            .chars()
            .skip(context_start)
            .take(MAX_CONTEXT)
            .collect();

        let mut display_context = String::new();
        if context_start > 0 {
            display_context.push_str("[...]");
        }
        display_context.push_str(&context_str);
        if context_start + context_str.len() < input.len() {
            display_context.push_str("[...]");
        }

        // Replace newlines with visible markers for better error display
        let display_context = display_context.replace('\n', "\\n").replace('\r', "");

        Self::new(kind, message, Some(display_context), found)
    }
}

/// Error types for the interpreter
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed or unbalanced source text; produced by the reader only
    SyntaxError(SyntaxError),
    /// Lookup or `set!` of a symbol no environment frame defines
    UnboundSymbol(String),
    /// A procedure invoked with the wrong number of arguments
    ArityError {
        expected: usize,
        got: usize,
        expression: Option<String>, // Optional expression context
    },
    /// An operation applied to a value of the wrong kind
    TypeError(String),
    /// Division by zero
    ArithmeticError(String),
    /// Residual evaluation failures (empty-list application, user `error`, depth limit)
    EvalError(String),
}

impl Error {
    /// Create an ArityError without expression context
    pub fn arity_error(expected: usize, got: usize) -> Self {
        Error::ArityError {
            expected,
            got,
            expression: None,
        }
    }

    /// Create an ArityError with expression context
    pub fn arity_error_with_expr(expected: usize, got: usize, expression: String) -> Self {
        Error::ArityError {
            expected,
            got,
            expression: Some(expression),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::SyntaxError(e) => {
                write!(f, "SyntaxError: {}", e.message)?;
                if let Some(found) = &e.found {
                    write!(f, "\nFound: {found}")?;
                }
                if let Some(context) = &e.context {
                    write!(f, "\nContext: {context}")?;
                }
                Ok(())
            }
            Error::UnboundSymbol(name) => write!(f, "Unbound symbol: {name}"),
            Error::ArityError {
                expected,
                got,
                expression,
            } => match expression {
                Some(expr) => write!(
                    f,
                    "ArityError: expression {expr}: expected {expected} arguments, got {got}"
                ),
                None => write!(
                    f,
                    "ArityError: procedure expected {expected} arguments but got {got}"
                ),
            },
            Error::TypeError(msg) => write!(f, "Type error: {msg}"),
            Error::ArithmeticError(msg) => write!(f, "Arithmetic error: {msg}"),
            Error::EvalError(msg) => write!(f, "EvaluationError: {msg}"),
        }
    }
}

pub mod ast;
pub mod evaluator;
pub mod intoprimitive;
pub mod primitives;
pub mod reader;
