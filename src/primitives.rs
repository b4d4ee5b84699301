//! Built-in procedure registry.
//!
//! Every native procedure of the language is defined once here, as a natural
//! Rust function wired through the typed adapter layer in
//! [`crate::intoprimitive`], and collected into a single registry table that
//! [`crate::evaluator::create_global_env`] installs into the global
//! environment. Special forms (`if`, `define`, `lambda`, ...) are syntax and
//! live in the evaluator, not in this registry.
//!
//! ## Semantics
//!
//! - Arithmetic follows floating-point rules; the only arithmetic error is
//!   division by zero.
//! - Comparisons chain over two or more arguments: `(< 1 2 3)` is true when
//!   every adjacent pair satisfies the comparison.
//! - `not` uses truthiness: every value except `#f` counts as true.
//! - `equal?` is structural equality across all types; `eq?` is atom
//!   equality and is always false for lists.
//!
//! ## Adding New Operations
//!
//! 1. Implement a natural Rust function (typed arguments, typed result).
//! 2. Add a `PrimitiveDef` entry to `PRIMITIVES` with its name and arity.
//! 3. Add test cases to the data-driven table below.

use crate::Error;
use crate::ast::{NumberType, Value};
use crate::intoprimitive::{
    IntoPrimitive, IntoVariadicPrimitive, NumIterator, NumRest, PrimitiveFn, StringIterator,
    StringRest, ValueListIterator, ValuesRest,
};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// Expected argument count for a procedure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arity {
    /// Exactly n arguments
    Exact(usize),
    /// At least n arguments
    AtLeast(usize),
    /// Between min and max arguments (inclusive)
    Range(usize, usize),
    /// Any number of arguments
    Any,
}

impl Arity {
    /// Check the given argument count against this arity.
    pub fn validate(&self, arg_count: usize) -> Result<(), Error> {
        match self {
            Arity::Exact(n) => {
                if arg_count == *n {
                    Ok(())
                } else {
                    Err(Error::arity_error(*n, arg_count))
                }
            }
            Arity::AtLeast(n) => {
                if arg_count >= *n {
                    Ok(())
                } else {
                    Err(Error::arity_error(*n, arg_count))
                }
            }
            Arity::Range(min, max) => {
                if arg_count >= *min && arg_count <= *max {
                    Ok(())
                } else if arg_count < *min {
                    Err(Error::arity_error(*min, arg_count))
                } else {
                    Err(Error::arity_error(*max, arg_count))
                }
            }
            Arity::Any => Ok(()),
        }
    }
}

/// Definition of one built-in procedure.
#[derive(Clone)]
pub struct PrimitiveDef {
    /// The identifier this procedure is bound to in the global environment
    pub name: &'static str,
    /// The implementation, already wrapped with arity validation
    pub func: Arc<PrimitiveFn>,
    /// Expected number of arguments
    pub arity: Arity,
}

impl std::fmt::Debug for PrimitiveDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimitiveDef")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

//
// Primitive Implementations
//

// Macro to generate chained numeric comparison functions
macro_rules! numeric_comparison {
    ($name:ident, $op:tt) => {
        fn $name(first: NumberType, rest: NumIterator<'_>) -> bool {
            // Chain comparisons: all adjacent pairs must satisfy the
            // comparison. The registry arity (AtLeast(2)) guarantees rest
            // is non-empty.
            let mut prev = first;
            for current in rest {
                if !(prev $op current) {
                    return false;
                }
                prev = current;
            }
            true
        }
    };
}

numeric_comparison!(prim_num_eq, ==);
numeric_comparison!(prim_lt, <);
numeric_comparison!(prim_gt, >);
numeric_comparison!(prim_le, <=);
numeric_comparison!(prim_ge, >=);

fn prim_add(args: NumIterator<'_>) -> NumberType {
    args.sum()
}

fn prim_sub(first: NumberType, rest: NumIterator<'_>) -> NumberType {
    let mut iter = rest.peekable();

    if iter.peek().is_none() {
        return -first;
    }

    let mut result = first;
    for n in iter {
        result -= n;
    }
    result
}

fn prim_mul(first: NumberType, rest: NumIterator<'_>) -> NumberType {
    let mut product = first;
    for n in rest {
        product *= n;
    }
    product
}

fn prim_div(first: NumberType, rest: NumIterator<'_>) -> Result<NumberType, Error> {
    let mut iter = rest.peekable();

    // Unary division is the reciprocal
    if iter.peek().is_none() {
        if first == 0.0 {
            return Err(Error::ArithmeticError("division by zero".into()));
        }
        return Ok(1.0 / first);
    }

    let mut result = first;
    for n in iter {
        if n == 0.0 {
            return Err(Error::ArithmeticError("division by zero".into()));
        }
        result /= n;
    }
    Ok(result)
}

fn prim_car(mut list: ValueListIterator<'_>) -> Result<Value, Error> {
    match list.next() {
        Some(first) => Ok(first.clone()),
        None => Err(Error::TypeError("car of empty list".into())),
    }
}

fn prim_cdr(mut list: ValueListIterator<'_>) -> Result<Value, Error> {
    let Some(_) = list.next() else {
        return Err(Error::TypeError("cdr of empty list".into()));
    };

    let rest: Vec<Value> = list.cloned().collect();
    Ok(Value::List(rest))
}

fn prim_cons(first: Value, rest: Value) -> Result<Value, Error> {
    match rest {
        Value::List(tail) => {
            let mut new_list = vec![first];
            new_list.extend_from_slice(&tail);
            Ok(Value::List(new_list))
        }
        _ => Err(Error::TypeError(
            "cons requires a list as second argument".to_owned(),
        )),
    }
}

fn prim_list(args: ValueListIterator<'_>) -> Value {
    Value::List(args.cloned().collect())
}

fn prim_null(value: Value) -> bool {
    value.is_nil()
}

fn prim_not(value: Value) -> bool {
    !value.is_truthy()
}

/// Structural equality across all types; mismatched types compare unequal
/// instead of erroring.
fn prim_equal(first: Value, second: Value) -> bool {
    first == second
}

/// Atom equality: true only for equal non-list values.
fn prim_eq(first: Value, second: Value) -> bool {
    !matches!(first, Value::List(_)) && first == second
}

fn prim_atom(value: Value) -> bool {
    !matches!(value, Value::List(_))
}

fn prim_string_append(args: StringIterator<'_>) -> String {
    let mut result = String::new();
    for s in args {
        result.push_str(s);
    }
    result
}

fn prim_max(first: NumberType, rest: NumIterator<'_>) -> NumberType {
    let mut result = first;
    for n in rest {
        result = result.max(n);
    }
    result
}

fn prim_min(first: NumberType, rest: NumIterator<'_>) -> NumberType {
    let mut result = first;
    for n in rest {
        result = result.min(n);
    }
    result
}

/// Render one value for `display`: strings print unquoted, everything
/// else uses its standard textual form.
fn display_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        _ => format!("{value}"),
    }
}

fn prim_display(args: ValueListIterator<'_>) -> Value {
    let parts: Vec<String> = args.map(display_form).collect();
    println!("{}", parts.join(" "));
    Value::Unspecified
}

fn prim_error(args: ValueListIterator<'_>) -> Result<Value, Error> {
    let parts: Vec<String> = args.map(|value| display_form(value)).collect();

    let message = if parts.is_empty() {
        "Error".to_string()
    } else {
        parts.join(" ")
    };

    Err(Error::EvalError(message))
}

/// Global registry of all built-in procedures.
///
/// The registry is a single contiguous collection of `PrimitiveDef` values
/// for ease of auditing. Each entry's function is wired through the typed
/// adapter layer and pre-wrapped with its arity validation, so the stored
/// `Arc<PrimitiveFn>` is complete and callable as-is. Built once at
/// initialization time via a `LazyLock`.
static PRIMITIVES: LazyLock<Vec<PrimitiveDef>> = LazyLock::new(|| {
    fn fixed<Args, R, F>(name: &'static str, arity: Arity, f: F) -> PrimitiveDef
    where
        F: IntoPrimitive<Args, R>,
    {
        // Fixed-arity adapters validate the count themselves when
        // destructuring the argument vector.
        PrimitiveDef {
            name,
            func: f.into_primitive(),
            arity,
        }
    }

    fn variadic<Args, R, F>(name: &'static str, arity: Arity, f: F) -> PrimitiveDef
    where
        F: IntoVariadicPrimitive<Args, R>,
    {
        let inner = f.into_variadic_primitive();
        let func: Arc<PrimitiveFn> = Arc::new(move |args: Vec<Value>| {
            arity.validate(args.len())?;
            inner(args)
        });
        PrimitiveDef { name, func, arity }
    }

    // The result type is always spelled out: for primitives returning
    // `Result<T, Error>` it cannot be inferred (both `T` and the `Result`
    // itself satisfy `IntoResult`).
    vec![
        // Arithmetic
        variadic::<(NumRest,), NumberType, _>("+", Arity::AtLeast(0), prim_add),
        variadic::<(NumberType, NumRest), NumberType, _>("-", Arity::AtLeast(1), prim_sub),
        variadic::<(NumberType, NumRest), NumberType, _>("*", Arity::AtLeast(1), prim_mul),
        variadic::<(NumberType, NumRest), NumberType, _>("/", Arity::AtLeast(1), prim_div),
        // Comparisons (chained)
        variadic::<(NumberType, NumRest), bool, _>("<", Arity::AtLeast(2), prim_lt),
        variadic::<(NumberType, NumRest), bool, _>(">", Arity::AtLeast(2), prim_gt),
        variadic::<(NumberType, NumRest), bool, _>("=", Arity::AtLeast(2), prim_num_eq),
        variadic::<(NumberType, NumRest), bool, _>("<=", Arity::AtLeast(2), prim_le),
        variadic::<(NumberType, NumRest), bool, _>(">=", Arity::AtLeast(2), prim_ge),
        // Lists
        fixed::<(ValueListIterator<'static>,), Value, _>("car", Arity::Exact(1), prim_car),
        fixed::<(ValueListIterator<'static>,), Value, _>("first", Arity::Exact(1), prim_car),
        fixed::<(ValueListIterator<'static>,), Value, _>("cdr", Arity::Exact(1), prim_cdr),
        fixed::<(ValueListIterator<'static>,), Value, _>("rest", Arity::Exact(1), prim_cdr),
        fixed::<(Value, Value), Value, _>("cons", Arity::Exact(2), prim_cons),
        variadic::<(ValuesRest,), Value, _>("list", Arity::Any, prim_list),
        fixed::<(Value,), bool, _>("null?", Arity::Exact(1), prim_null),
        // Equality and predicates
        fixed::<(Value, Value), bool, _>("equal?", Arity::Exact(2), prim_equal),
        fixed::<(Value, Value), bool, _>("eq?", Arity::Exact(2), prim_eq),
        fixed::<(Value,), bool, _>("atom?", Arity::Exact(1), prim_atom),
        fixed::<(Value,), bool, _>("not", Arity::Exact(1), prim_not),
        // Math
        variadic::<(NumberType, NumRest), NumberType, _>("max", Arity::AtLeast(1), prim_max),
        variadic::<(NumberType, NumRest), NumberType, _>("min", Arity::AtLeast(1), prim_min),
        // Strings
        variadic::<(StringRest,), String, _>("string-append", Arity::Any, prim_string_append),
        // Output and error signalling
        variadic::<(ValuesRest,), Value, _>("display", Arity::Any, prim_display),
        variadic::<(ValuesRest,), Value, _>("error", Arity::Any, prim_error),
    ]
});

/// Lazy static map from name to PrimitiveDef (private - use find_primitive)
static PRIMITIVES_BY_NAME: LazyLock<HashMap<&'static str, &'static PrimitiveDef>> =
    LazyLock::new(|| {
        let defs: &'static [PrimitiveDef] = PRIMITIVES.as_slice();
        defs.iter().map(|def| (def.name, def)).collect()
    });

/// Get all primitive definitions (for installation into the global environment)
pub fn all_primitives() -> &'static [PrimitiveDef] {
    PRIMITIVES.as_slice()
}

/// Find a primitive definition by name
pub fn find_primitive(name: &str) -> Option<&'static PrimitiveDef> {
    PRIMITIVES_BY_NAME.get(name).copied()
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::{nil, sym, val};

    /// Micro-helper for success cases in comprehensive tests
    fn success<T: Into<Value>>(value: T) -> Option<Value> {
        Some(val(value))
    }

    /// Helper to invoke a primitive through the registry using the
    /// canonical erased signature (Vec<Value> -> Result<Value, Error>).
    ///
    /// This keeps tests independent of the internal typed helper
    /// function signatures while still exercising the adapter layer
    /// and the arity wrapping.
    fn call_primitive(name: &str, args: &[Value]) -> Result<Value, Error> {
        let def = find_primitive(name).expect("primitive not found");
        (def.func)(args.to_vec())
    }

    #[test]
    fn test_primitive_registry() {
        let car = find_primitive("car").unwrap();
        assert_eq!(car.arity, Arity::Exact(1));

        let add = find_primitive("+").unwrap();
        assert_eq!(add.arity, Arity::AtLeast(0));
        let result = (add.func)(vec![val(1), val(2)]).unwrap();
        assert_eq!(result, val(3));

        // Aliases resolve to the same behavior as their canonical names
        for (alias, canonical) in [("first", "car"), ("rest", "cdr")] {
            let args = vec![val([1, 2, 3])];
            assert_eq!(
                call_primitive(alias, &args).unwrap(),
                call_primitive(canonical, &args).unwrap()
            );
        }

        assert!(find_primitive("unknown").is_none());

        // Special forms are syntax, not registry entries
        for keyword in ["if", "define", "lambda", "quote", "set!", "begin", "cond"] {
            assert!(
                find_primitive(keyword).is_none(),
                "{keyword} must not be a primitive"
            );
        }
    }

    /// Macro to create test cases, invoking primitives via the registry.
    macro_rules! test {
        ($name:expr, $args:expr, $expected:expr) => {
            ($name, call_primitive($name, $args), $expected)
        };
    }

    #[test]
    #[expect(clippy::too_many_lines)] // Comprehensive test coverage is intentionally thorough
    fn test_primitive_implementations() {
        type TestCase = (&'static str, Result<Value, Error>, Option<Value>);

        // Pre-declare list for tests that need variable reuse
        let int_list = val([1, 2, 3]);

        // Comparison edge case data
        let all_fives: Vec<Value> = (0..10).map(|_| val(5)).collect();
        let mut mostly_fives = all_fives.clone();
        mostly_fives.push(val(6));

        // List operations data
        let nested = val([val([val([1])])]);
        let mixed = val([val(1), val("hello"), val(true), nil()]);

        // Equality test data
        let complex1 = val([val(1), val("test"), val([val(2)])]);
        let complex2 = val([val(1), val("test"), val([val(2)])]);
        let complex3 = val([val(1), val("test"), val([val(3)])]);

        let test_cases: Vec<TestCase> = vec![
            // =================================================================
            // ARITHMETIC
            // =================================================================
            test!("+", &[], success(0)),
            test!("+", &[val(5)], success(5)),
            test!("+", &[val(1), val(2), val(3)], success(6)),
            test!("+", &[val(-5), val(10)], success(5)),
            test!("+", &[val(0.5), val(0.25)], success(0.75)),
            test!("+", &[val("not a number")], None),
            test!("+", &[val(1), val(true)], None),
            test!("-", &[val(5)], success(-5)), // Unary minus
            test!("-", &[val(-5)], success(5)),
            test!("-", &[val(10), val(3), val(2)], success(5)),
            test!("-", &[val(0), val(5)], success(-5)),
            test!("-", &[], None), // No arguments
            test!("-", &[val("not a number")], None),
            test!("*", &[], None), // Requires at least 1 argument
            test!("*", &[val(5)], success(5)),
            test!("*", &[val(2), val(3), val(4)], success(24)),
            test!("*", &[val(-2), val(3)], success(-6)),
            test!("*", &[val(0.5), val(10)], success(5)),
            test!("*", &[val(2), nil()], None),
            // Division follows float semantics; only zero divisors error
            test!("/", &[val(10), val(2)], success(5)),
            test!("/", &[val(1), val(3)], success(1.0 / 3.0)),
            test!("/", &[val(100), val(5), val(2)], success(10)),
            test!("/", &[val(2)], success(0.5)), // Unary reciprocal
            test!("/", &[val(7), val(0)], None), // Division by zero
            test!("/", &[val(0)], None),         // Reciprocal of zero
            test!("/", &[val(1), val(2), val(0)], None),
            test!("/", &[], None),
            test!("/", &[val("x"), val(2)], None),
            // =================================================================
            // COMPARISONS (CHAINED)
            // =================================================================
            test!(">", &[val(7), val(3)], success(true)),
            test!(">", &[val(3), val(8)], success(false)),
            test!(">", &[val(4), val(4)], success(false)),
            test!(">", &[val(9), val(6), val(2)], success(true)), // Chaining true
            test!(">", &[val(9), val(6), val(7)], success(false)), // Chaining false
            test!(">", &[val(5)], None),                          // Too few args
            test!(">", &[val("a"), val(3)], None),                // Wrong type
            test!(">=", &[val(8), val(3)], success(true)),
            test!(">=", &[val(7), val(7)], success(true)),
            test!("<", &[val(2), val(9)], success(true)),
            test!("<", &[val(2.5), val(2.6)], success(true)),
            test!("<", &[val(6), val(6)], success(false)),
            test!("<", &[val(1), val(2), val(3)], success(true)),
            test!("<", &[val(1), val(3), val(2)], success(false)),
            test!("<=", &[val(3), val(3)], success(true)),
            test!("=", &[val(12), val(12)], success(true)),
            test!("=", &[val(8), val(3)], success(false)),
            test!("=", &[val(7), val(7), val(7)], success(true)),
            test!("=", &[val(9), val(9), val(4)], success(false)),
            test!("=", &[val(5)], None),               // Too few args
            test!("=", &[val("a"), val("a")], None),   // Numbers only
            test!("=", &[val(true), val(true)], None), // Numbers only
            test!("=", &all_fives, success(true)),
            test!("=", &mostly_fives, success(false)),
            // =================================================================
            // EQUALITY PREDICATES
            // =================================================================
            // equal? is structural across all types, never a type error
            test!("equal?", &[val(11), val(11)], success(true)),
            test!("equal?", &[val(15), val(3)], success(false)),
            test!("equal?", &[val("hello"), val("hello")], success(true)),
            test!("equal?", &[val(true), val(false)], success(false)),
            test!("equal?", &[nil(), nil()], success(true)),
            test!("equal?", &[val([1]), val([1])], success(true)),
            test!("equal?", &[val(5), val("5")], success(false)), // Mismatched types
            test!("equal?", &[val(0), val(false)], success(false)),
            test!("equal?", &[complex1.clone(), complex2], success(true)),
            test!("equal?", &[complex1, complex3], success(false)),
            test!("equal?", &[val(5)], None), // Too few args
            test!("equal?", &[val(5), val(3), val(1)], None), // Too many args
            // eq? is atom equality: always false for lists
            test!("eq?", &[val(7), val(7)], success(true)),
            test!("eq?", &[sym("a"), sym("a")], success(true)),
            test!("eq?", &[val("x"), val("x")], success(true)),
            test!("eq?", &[val([1, 2]), val([1, 2])], success(false)),
            test!("eq?", &[nil(), nil()], success(false)),
            test!("eq?", &[val(1), val("1")], success(false)),
            // atom? is true for everything except lists
            test!("atom?", &[val(42)], success(true)),
            test!("atom?", &[sym("x")], success(true)),
            test!("atom?", &[val("str")], success(true)),
            test!("atom?", &[val(false)], success(true)),
            test!("atom?", &[nil()], success(false)),
            test!("atom?", &[val([1])], success(false)),
            // =================================================================
            // TRUTHINESS NEGATION
            // =================================================================
            test!("not", &[val(false)], success(true)),
            test!("not", &[val(true)], success(false)),
            // Everything except #f is true
            test!("not", &[val(0)], success(false)),
            test!("not", &[val("")], success(false)),
            test!("not", &[nil()], success(false)),
            test!("not", &[], None), // No args
            test!("not", &[val(true), val(false)], None), // Too many args
            // =================================================================
            // LIST OPERATIONS
            // =================================================================
            test!("car", &[val([1, 2, 3])], success(1)),
            test!("car", &[val(["only"])], success("only")),
            test!("car", &[val([val([1]), val(2)])], success([1])),
            test!("car", &[], None),
            test!("car", &[int_list.clone(), int_list.clone()], None),
            test!("car", &[nil()], None), // Empty list
            test!("car", &[val(42)], None),
            test!("cdr", &[val([1, 2, 3])], success([2, 3])),
            test!("cdr", &[val(["only"])], Some(nil())),
            test!("cdr", &[nil()], None), // Empty list
            test!("cdr", &[int_list.clone(), int_list], None),
            test!("cdr", &[val(true)], None),
            test!("first", &[val([1, 2, 3])], success(1)),
            test!("rest", &[val([1, 2, 3])], success([2, 3])),
            test!("cons", &[val(0), val([1, 2])], success([0, 1, 2])),
            test!("cons", &[val("first"), nil()], success(["first"])),
            test!("cons", &[val([1]), val([2])], success([val([1]), val(2)])),
            test!("cons", &[val(1)], None),
            test!("cons", &[val(1), val(2)], None), // Second arg not a list
            test!("list", &[], Some(nil())),
            test!("list", &[val(1)], success([1])),
            test!(
                "list",
                &[val(1), val("hello"), val(true)],
                success([val(1), val("hello"), val(true)])
            ),
            test!("null?", &[nil()], success(true)),
            test!("null?", &[val(42)], success(false)),
            test!("null?", &[val("")], success(false)),
            test!("null?", &[val(false)], success(false)),
            test!("null?", &[val([1])], success(false)),
            test!("null?", &[val(1), val(2)], None),
            // Deeply nested and mixed lists
            test!("car", &[nested], success([val([1])])),
            test!("car", std::slice::from_ref(&mixed), success(1)),
            test!(
                "cdr",
                std::slice::from_ref(&mixed),
                success([val("hello"), val(true), nil()])
            ),
            // =================================================================
            // MATH OPERATIONS - MAX/MIN
            // =================================================================
            test!("max", &[val(5)], success(5)),
            test!("max", &[val(1), val(2), val(3)], success(3)),
            test!("max", &[val(-5), val(-1), val(-10)], success(-1)),
            test!("min", &[val(5)], success(5)),
            test!("min", &[val(1), val(2), val(3)], success(1)),
            test!("min", &[val(-5), val(-1), val(-10)], success(-10)),
            test!("max", &[], None),
            test!("min", &[], None),
            test!("max", &[val(1), val("hello")], None),
            // =================================================================
            // STRING OPERATIONS
            // =================================================================
            test!("string-append", &[], success("")),
            test!("string-append", &[val("hello")], success("hello")),
            test!(
                "string-append",
                &[val("hello"), val(" "), val("world")],
                success("hello world")
            ),
            test!("string-append", &[val(42)], None),
            test!("string-append", &[val("hello"), val(123)], None),
            // =================================================================
            // ERROR SIGNALLING
            // =================================================================
            test!("error", &[], None),
            test!("error", &[val("test error")], None),
            test!("error", &[val(42)], None),
        ];

        for (test_expr, result, expected) in test_cases {
            match (result, expected) {
                (Ok(actual), Some(expected_val)) => {
                    assert_eq!(actual, expected_val, "Failed for test case: {test_expr}");
                }
                (Err(_), None) => {} // Expected error
                (actual, expected) => panic!(
                    "Unexpected result for test case: {}\nGot result: {:?}, Expected: {:?}",
                    test_expr,
                    actual.is_ok(),
                    expected.is_some()
                ),
            }
        }
    }

    #[test]
    fn test_display_returns_unspecified() {
        // Unspecified never compares equal, so display gets its own check
        assert!(matches!(
            call_primitive("display", &[val("hello"), val(42)]),
            Ok(Value::Unspecified)
        ));
        assert!(matches!(
            call_primitive("display", &[]),
            Ok(Value::Unspecified)
        ));
    }

    #[test]
    fn test_division_error_kind() {
        match call_primitive("/", &[val(1), val(0)]).unwrap_err() {
            Error::ArithmeticError(msg) => assert!(msg.contains("division by zero")),
            other => panic!("expected ArithmeticError, got {other:?}"),
        }
    }

    #[test]
    fn test_error_message_construction() {
        type ErrorTest = (Vec<Value>, &'static str);
        let test_cases: Vec<ErrorTest> = vec![
            (vec![val("Simple message")], "Simple message"),
            (
                vec![val("Code:"), val(404), val("Not Found")],
                "Code: 404 Not Found",
            ),
            (
                vec![val(true), val(42), val("mixed"), nil()],
                "#t 42 mixed ()",
            ),
        ];

        for (args, expected_msg) in test_cases {
            match call_primitive("error", &args).unwrap_err() {
                Error::EvalError(msg) => {
                    assert_eq!(msg, expected_msg, "Failed for args: {args:?}");
                }
                _ => panic!("Expected EvalError for args: {args:?}"),
            }
        }
    }

    #[test]
    fn test_arity_validation() {
        use Arity::*;

        Exact(2).validate(2).unwrap();
        Exact(2).validate(1).unwrap_err();
        Exact(2).validate(3).unwrap_err();

        AtLeast(1).validate(1).unwrap();
        AtLeast(1).validate(2).unwrap();
        AtLeast(1).validate(0).unwrap_err();

        Range(1, 3).validate(1).unwrap();
        Range(1, 3).validate(2).unwrap();
        Range(1, 3).validate(3).unwrap();
        Range(1, 3).validate(0).unwrap_err();
        Range(1, 3).validate(4).unwrap_err();

        Any.validate(0).unwrap();
        Any.validate(100).unwrap();

        match Exact(2).validate(1).unwrap_err() {
            Error::ArityError { expected, got, .. } => {
                assert_eq!(expected, 2);
                assert_eq!(got, 1);
            }
            _ => panic!("Expected ArityError"),
        }
    }
}
