//! This module defines the core Abstract Syntax Tree (AST) type and helper
//! functions for representing both parsed expressions and runtime values.
//! The main enum, [`Value`], covers all data kinds of the language: numbers,
//! symbols, strings, booleans, lists, and procedures (native primitives and
//! user-defined closures). Because the same tagged union serves as the parsed
//! expression tree and as the runtime result type, `quote` is purely
//! structural. Ergonomic helper functions such as [`val`], [`sym`], and
//! [`nil`] are provided for convenient AST construction in tests, and
//! conversion traits make it easy to build Values from Rust literals, arrays,
//! slices, and vectors. Equality and display logic are customized to match
//! the language semantics.

use crate::Error;
use crate::evaluator::Environment;
use crate::intoprimitive::PrimitiveFn;
use std::sync::Arc;

/// Type alias for number values in the interpreter (floating-point semantics)
pub(crate) type NumberType = f64;

/// Core AST type of the interpreter, used both for parsed expressions and
/// for runtime values.
///
/// To build an AST in tests, use the ergonomic helper functions:
/// - `val(42)` for values, `sym("name")` for symbols, `nil()` for empty lists
/// - `val([1, 2, 3])` for homogeneous lists
/// - `val(vec![sym("op"), val(42)])` for mixed lists
#[derive(Clone)]
pub enum Value {
    /// Numbers (floating-point; integral values display without a fraction)
    Number(NumberType),
    /// Symbols (case-sensitive identifiers)
    Symbol(String),
    /// String literals (verbatim character runs, no escape sequences)
    String(String),
    /// Boolean values
    Bool(bool),
    /// Lists (the empty list represents nil)
    List(Vec<Value>),
    /// Native built-in procedures.
    /// Uses the id string for equality comparison instead of the function pointer.
    Primitive {
        id: String,
        // Stored as an Arc so that typed Rust functions/closures can be
        // wrapped into the canonical erased evaluator signature.
        func: Arc<PrimitiveFn>,
    },
    /// User-defined procedures: parameter names, body expression, and the
    /// environment captured at the definition site (lexical scope).
    Closure {
        params: Vec<String>,
        body: Box<Value>,
        env: Environment,
    },
    /// Unspecified values (e.g., return value of define and set!)
    /// These values never equal themselves or any other value
    Unspecified,
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Symbol(s) => write!(f, "Symbol({s})"),
            Value::String(s) => write!(f, "String(\"{s}\")"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::List(list) => {
                write!(f, "List(")?;
                for (i, v) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v:?}")?;
                }
                write!(f, ")")
            }
            Value::Primitive { id, .. } => write!(f, "Primitive({id})"),
            // The captured environment is deliberately not printed: a closure
            // stored inside the scope it captures would recurse forever.
            Value::Closure { params, body, .. } => {
                write!(f, "Closure(params={params:?}, body={body:?})")
            }
            Value::Unspecified => write!(f, "Unspecified"),
        }
    }
}

// From trait implementations for Value - enables .into() conversion
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! impl_from_number {
    ($num_type:ty) => {
        impl From<$num_type> for Value {
            fn from(n: $num_type) -> Self {
                Value::Number(n as NumberType)
            }
        }
    };
}

// Generate From implementations for the common numeric types
impl_from_number!(i8);
impl_from_number!(i16);
impl_from_number!(i32);
impl_from_number!(i64);
impl_from_number!(u8);
impl_from_number!(u16);
impl_from_number!(u32);
impl_from_number!(f32);
impl_from_number!(NumberType); // Special case - no precision change

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(|x| x.into()).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::List(arr.into_iter().map(|x| x.into()).collect())
    }
}

impl<T: Into<Value> + Clone> From<&[T]> for Value {
    fn from(slice: &[T]) -> Self {
        Value::List(slice.iter().cloned().map(|x| x.into()).collect())
    }
}

// Fallible conversions from `Value` back into primitive Rust types.

impl std::convert::TryInto<NumberType> for Value {
    type Error = Error;

    fn try_into(self) -> Result<NumberType, Error> {
        if let Value::Number(n) = self {
            Ok(n)
        } else {
            Err(Error::TypeError("expected number".into()))
        }
    }
}

impl std::convert::TryInto<bool> for Value {
    type Error = Error;

    fn try_into(self) -> Result<bool, Error> {
        if let Value::Bool(b) = self {
            Ok(b)
        } else {
            Err(Error::TypeError("expected boolean".into()))
        }
    }
}

/// Helper function for creating symbols - works great in mixed lists!
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn sym<S: AsRef<str>>(name: S) -> Value {
    Value::Symbol(name.as_ref().to_owned())
}

/// Helper function for creating Values - works great in mixed lists!
/// Accepts any type that can be converted to Value
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// Helper function for creating empty lists (nil) - follows Lisp conventions
/// where nil represents the empty list
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn nil() -> Value {
    Value::List(vec![])
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => {
                // Integral values print without a trailing ".0" so that the
                // textual form round-trips through the reader.
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            Value::Symbol(s) => write!(f, "{s}"),
            Value::String(s) => write!(f, "\"{s}\""),
            Value::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Value::List(elements) => {
                write!(f, "(")?;
                for (i, elem) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, ")")
            }
            Value::Primitive { id, .. } => write!(f, "#<primitive:{id}>"),
            Value::Closure { .. } => write!(f, "#<closure>"),
            Value::Unspecified => write!(f, "#<unspecified>"),
        }
    }
}

impl Value {
    /// Check if a value represents nil (empty list)
    pub(crate) fn is_nil(&self) -> bool {
        matches!(self, Value::List(list) if list.is_empty())
    }

    /// Truthiness: every value except `#f` counts as true.
    pub(crate) fn is_truthy(&self) -> bool {
        !matches!(self, Value::Bool(false))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Primitive { id: id1, .. }, Value::Primitive { id: id2, .. }) => {
                // Compare primitives by id string, not function pointer
                id1 == id2
            }
            (
                Value::Closure {
                    params: p1,
                    body: b1,
                    env: e1,
                },
                Value::Closure {
                    params: p2,
                    body: b2,
                    env: e2,
                },
            ) => p1 == p2 && b1 == b2 && e1 == e2,
            (Value::Unspecified, _) | (_, Value::Unspecified) => false, // Unspecified never equals anything
            _ => false, // Different variants are never equal
        }
    }
}
