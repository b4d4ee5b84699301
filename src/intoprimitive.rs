//! Adapter layer that turns strongly-typed Rust functions into primitives.
//!
//! Primitive procedures are stored in the environment under one canonical
//! erased signature, [`PrimitiveFn`]. The traits in this module convert
//! natural Rust functions (e.g. `fn(f64, f64) -> f64`, or variadic functions
//! taking typed argument iterators) into that signature, performing argument
//! extraction, type checking, and result conversion automatically.

use crate::Error;
use crate::ast::{NumberType, Value};
use std::iter::FusedIterator;
use std::sync::Arc;

/// Canonical erased primitive function type used by the evaluator.
///
/// Primitives receive ownership of their argument vector, enabling
/// implementations that consume or rearrange arguments if desired.
pub type PrimitiveFn = dyn Fn(Vec<Value>) -> Result<Value, Error> + Send + Sync;

// =====================================================================
// Internal machinery for fixed-arity argument conversion
// =====================================================================

/// Core trait used by the fixed-arity adapters to turn `Value` nodes
/// into strongly-typed parameters.
///
/// The associated `Param<'a>` type is the parameter type as seen by
/// the primitive for a given lifetime of the local `Value` slots used
/// during argument conversion.
pub(crate) trait FromParam {
    /// The parameter type as seen by the primitive for a given lifetime
    /// of the underlying AST values.
    type Param<'a>;

    /// Convert a single AST argument into this parameter type.
    ///
    /// Implementations may either borrow from the provided `Value`
    /// (for types such as `&str` and the borrowed iterators), or
    /// consume it by value (for `Value` itself).
    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error>;
}

impl FromParam for Value {
    type Param<'a> = Value;

    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error> {
        // Move the `Value` out so that primitive functions can consume
        // owned payloads (such as strings or lists) without cloning.
        Ok(std::mem::replace(value, Value::Unspecified))
    }
}

// Blanket implementation for by-value scalar parameters obtainable from a
// `Value` via the standard `TryInto` trait. This covers `f64` and `bool`,
// for which `impl TryInto<T> for Value` lives in `ast.rs`.
impl<T> FromParam for T
where
    Value: std::convert::TryInto<T, Error = Error>,
{
    type Param<'a> = T;

    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error> {
        let owned = std::mem::replace(value, Value::Unspecified);
        <Value as std::convert::TryInto<T>>::try_into(owned)
    }
}

impl FromParam for &str {
    type Param<'a> = &'a str;

    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error> {
        if let Value::String(s) = value {
            Ok(s.as_str())
        } else {
            Err(Error::TypeError("expected string".into()))
        }
    }
}

// =====================================================================
// FromParam support for iterator parameters (list arguments)
// =====================================================================

impl<'b> FromParam for ValueListIterator<'b> {
    type Param<'a> = ValueListIterator<'a>;

    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error> {
        if let Value::List(items) = value {
            Ok(ValueListIterator::new(items.as_slice()))
        } else {
            Err(Error::TypeError("expected list".into()))
        }
    }
}

impl<'b> FromParam for NumIterator<'b> {
    type Param<'a> = NumIterator<'a>;

    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error> {
        if let Value::List(items) = value {
            NumIterator::new(items.as_slice())
        } else {
            Err(Error::TypeError("expected list".into()))
        }
    }
}

impl<'b> FromParam for StringIterator<'b> {
    type Param<'a> = StringIterator<'a>;

    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error> {
        if let Value::List(items) = value {
            StringIterator::new(items.as_slice())
        } else {
            Err(Error::TypeError("expected list".into()))
        }
    }
}

/// Normalize both plain values and `Result`-returning functions into
/// `Result<T, Error>`.
///
/// Only `Result<T, Error>` is accepted on the fallible side so that typed
/// primitives can signal the precise error variant (TypeError,
/// ArithmeticError, ...) without it being flattened into a string.
pub trait IntoResult<T> {
    fn into_result(self) -> Result<T, Error>;
}

impl<T> IntoResult<T> for T {
    fn into_result(self) -> Result<T, Error> {
        Ok(self)
    }
}

impl<T> IntoResult<T> for Result<T, Error> {
    fn into_result(self) -> Result<T, Error> {
        self
    }
}

// =====================================================================
// Iterator-based parameter types
// =====================================================================

/// Borrowed iterator over a sequence of AST `Value` references.
///
/// This is the shared base type for all list/sequence-parameter
/// iterators. Typed iterators such as [`NumIterator`] and
/// [`StringIterator`] wrap this to provide element-level typing.
#[derive(Debug, Clone, Copy)]
pub struct ValueListIterator<'a> {
    values: &'a [Value],
    index: usize,
}

impl<'a> ValueListIterator<'a> {
    pub(crate) fn new(values: &'a [Value]) -> Self {
        ValueListIterator { values, index: 0 }
    }
}

impl<'a> Iterator for ValueListIterator<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        let v = self.values.get(self.index)?;
        self.index += 1;
        Some(v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.values.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl<'a> ExactSizeIterator for ValueListIterator<'a> {}
impl<'a> FusedIterator for ValueListIterator<'a> {}

/// Borrowed iterator over numeric arguments. Internally this wraps a
/// [`ValueListIterator`] and narrows each element to `f64`, with a single
/// upfront type check at construction.
#[derive(Debug, Clone, Copy)]
pub struct NumIterator<'a> {
    inner: ValueListIterator<'a>,
}

impl<'a> NumIterator<'a> {
    /// Build a numeric iterator over the provided values, performing a
    /// single upfront type check that all elements are numbers.
    pub(crate) fn new(values: &'a [Value]) -> Result<Self, Error> {
        for v in values {
            if !matches!(v, Value::Number(_)) {
                return Err(Error::TypeError(format!("expected number, got: {v}")));
            }
        }

        Ok(NumIterator {
            inner: ValueListIterator::new(values),
        })
    }
}

impl<'a> Iterator for NumIterator<'a> {
    type Item = NumberType;

    fn next(&mut self) -> Option<Self::Item> {
        let v = self.inner.next()?;

        if let Value::Number(n) = v {
            Some(*n)
        } else {
            // `new` guarantees all elements are numbers.
            debug_assert!(false, "NumIterator saw non-number after construction");
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a> ExactSizeIterator for NumIterator<'a> {}
impl<'a> FusedIterator for NumIterator<'a> {}

/// Borrowed iterator over string arguments. Internally this wraps a
/// [`ValueListIterator`] and narrows each element to `&str`, with a single
/// upfront type check at construction.
#[derive(Debug, Clone, Copy)]
pub struct StringIterator<'a> {
    inner: ValueListIterator<'a>,
}

impl<'a> StringIterator<'a> {
    /// Build a string iterator over the provided values, performing a
    /// single upfront type check that all elements are strings.
    pub(crate) fn new(values: &'a [Value]) -> Result<Self, Error> {
        for v in values {
            if !matches!(v, Value::String(_)) {
                return Err(Error::TypeError(format!("expected string, got: {v}")));
            }
        }

        Ok(StringIterator {
            inner: ValueListIterator::new(values),
        })
    }
}

impl<'a> Iterator for StringIterator<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let v = self.inner.next()?;

        if let Value::String(s) = v {
            Some(s.as_str())
        } else {
            // `new` guarantees all elements are strings.
            debug_assert!(false, "StringIterator saw non-string after construction");
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a> ExactSizeIterator for StringIterator<'a> {}
impl<'a> FusedIterator for StringIterator<'a> {}

// =====================================================================
// Rest-parameter support for variadic primitives
// =====================================================================

/// Core trait used to construct rest-parameter values from a slice of
/// AST arguments.
///
/// The associated `Param<'a>` is the type actually seen by the primitive
/// function for a given lifetime of the underlying value slice.
pub(crate) trait FromRest {
    type Param<'a>;

    fn from_rest<'a>(slice: &'a [Value]) -> Result<Self::Param<'a>, Error>;
}

impl FromRest for ValueListIterator<'static> {
    type Param<'a> = ValueListIterator<'a>;

    fn from_rest<'a>(slice: &'a [Value]) -> Result<Self::Param<'a>, Error> {
        Ok(ValueListIterator::new(slice))
    }
}

impl FromRest for NumIterator<'static> {
    type Param<'a> = NumIterator<'a>;

    fn from_rest<'a>(slice: &'a [Value]) -> Result<Self::Param<'a>, Error> {
        NumIterator::new(slice)
    }
}

impl FromRest for StringIterator<'static> {
    type Param<'a> = StringIterator<'a>;

    fn from_rest<'a>(slice: &'a [Value]) -> Result<Self::Param<'a>, Error> {
        StringIterator::new(slice)
    }
}

/// Marker type used in `Args` tuples to indicate that a parameter
/// position is populated from the variadic "rest" arguments using
/// [`FromRest`].
#[derive(Debug, Clone, Copy)]
pub struct Rest<I>(std::marker::PhantomData<I>);

// Convenience aliases for the rest-parameter iterator types. These are only
// used at the type level; the actual parameters seen by primitive functions
// are the lifetime-parameterised iterator types above.
pub type ValuesRest = Rest<ValueListIterator<'static>>;
pub type NumRest = Rest<NumIterator<'static>>;
pub type StringRest = Rest<StringIterator<'static>>;

/// Convert a strongly-typed Rust function or closure into the erased
/// [`PrimitiveFn`], parameterized by an argument tuple type.
pub trait IntoPrimitive<Args, R> {
    fn into_primitive(self) -> Arc<PrimitiveFn>;
}

/// Trait for primitives registered via the variadic API.
///
/// Implemented for functions whose Rust signature includes a variadic
/// "rest" parameter, expressed using the iterator types defined in
/// this module (`ValueListIterator<'a>`, `NumIterator<'a>`, or
/// `StringIterator<'a>`), optionally after a fixed prefix of
/// `FromParam` parameters.
pub trait IntoVariadicPrimitive<Args, R> {
    fn into_variadic_primitive(self) -> Arc<PrimitiveFn>;
}

// =====================================================================
// Variadic adapters using iterator-based rest parameters
// =====================================================================

/// Adapter for functions whose Rust signature consists only of a rest
/// parameter expressed via one of the iterator types in this module.
impl<F, FR, R, I> IntoVariadicPrimitive<(Rest<I>,), R> for F
where
    I: FromRest,
    F: for<'a> Fn(<I as FromRest>::Param<'a>) -> FR + Send + Sync + 'static,
    FR: IntoResult<R> + 'static,
    R: Into<Value> + 'static,
{
    fn into_variadic_primitive(self) -> Arc<PrimitiveFn> {
        Arc::new(move |args: Vec<Value>| {
            let rest_param: <I as FromRest>::Param<'_> = <I as FromRest>::from_rest(&args[..])?;
            let result: FR = (self)(rest_param);
            let value: R = result.into_result()?;
            Ok(value.into())
        })
    }
}

/// Helper macro to implement `IntoVariadicPrimitive` for functions with
/// a fixed prefix of `FromParam` parameters followed by a single rest
/// parameter expressed using one of the iterator types in this module.
macro_rules! impl_into_variadic_primitive_for_prefix_and_rest {
    ($prefix:expr, $( $v:ident, $p:ident : $A:ident ),+ ) => {
        impl<F, FR, R, I, $( $A ),+> IntoVariadicPrimitive<( $( $A, )+ Rest<I>, ), R> for F
        where
            I: FromRest,
            $( $A: FromParam, )+
            F: for<'a> Fn(
                    $( <$A as FromParam>::Param<'a> ),+,
                    <I as FromRest>::Param<'a>,
                ) -> FR
                + Send
                + Sync
                + 'static,
            FR: IntoResult<R> + 'static,
            R: Into<Value> + 'static,
        {
            fn into_variadic_primitive(self) -> Arc<PrimitiveFn> {
                Arc::new(move |mut args: Vec<Value>| {
                    let len = args.len();
                    match args.as_mut_slice() {
                        &mut [ $( ref mut $v ),+, ref mut rest @ .. ] => {
                            $(
                                let $p: <$A as FromParam>::Param<'_> =
                                    <$A as FromParam>::from_arg($v)?;
                            )+

                            let rest_param: <I as FromRest>::Param<'_> =
                                <I as FromRest>::from_rest(&*rest)?;

                            let result: FR = (self)( $( $p ),+, rest_param );
                            let value: R = result.into_result()?;
                            Ok(value.into())
                        }
                        _ => Err(Error::arity_error($prefix, len)),
                    }
                })
            }
        }
    };
}

impl_into_variadic_primitive_for_prefix_and_rest!(1, v0, p0: A1);
impl_into_variadic_primitive_for_prefix_and_rest!(2, v0, p0: A1, v1, p1: A2);

// =====================================================================
// Fixed-arity adapters
// =====================================================================

/// Helper macro to implement `IntoPrimitive` for functions of various
/// arities.
///
/// It performs arity checking up front, then destructures the owned
/// `Vec<Value>` into local `Value` slots so that `FromParam` can either
/// borrow from or consume each argument as needed before invoking the
/// primitive function.
macro_rules! impl_into_primitive_for_arity {
    ($arity:expr, $( $v:ident, $p:ident : $A:ident ),+ ) => {
        impl<F, FR, R, $( $A ),+> IntoPrimitive<( $( $A, )+ ), R> for F
        where
            F: for<'a> Fn( $( <$A as FromParam>::Param<'a> ),+ ) -> FR
                + Send
                + Sync
                + 'static,
            FR: IntoResult<R> + 'static,
            R: Into<Value> + 'static,
            $( $A: FromParam, )+
        {
            fn into_primitive(self) -> Arc<PrimitiveFn> {
                Arc::new(move |mut args: Vec<Value>| {
                    let len = args.len();
                    match args.as_mut_slice() {
                        &mut [ $( ref mut $v ),+ ] => {
                            $(
                                let $p: <$A as FromParam>::Param<'_> =
                                    <$A as FromParam>::from_arg($v)?;
                            )+

                            let result: FR = (self)( $( $p ),+ );
                            let value: R = result.into_result()?;
                            Ok(value.into())
                        }
                        _ => Err(Error::arity_error($arity, len)),
                    }
                })
            }
        }
    };
}

// 0-arg functions / closures
impl<F, FR, R> IntoPrimitive<(), R> for F
where
    F: Fn() -> FR + Send + Sync + 'static,
    FR: IntoResult<R> + 'static,
    R: Into<Value> + 'static,
{
    fn into_primitive(self) -> Arc<PrimitiveFn> {
        Arc::new(move |args: Vec<Value>| {
            if !args.is_empty() {
                return Err(Error::arity_error(0, args.len()));
            }

            let result: FR = (self)();
            let value: R = result.into_result()?;
            Ok(value.into())
        })
    }
}

impl_into_primitive_for_arity!(1, v0, p0: A1);
impl_into_primitive_for_arity!(2, v0, p0: A1, v1, p1: A2);
impl_into_primitive_for_arity!(3, v0, p0: A1, v1, p1: A2, v2, p2: A3);
impl_into_primitive_for_arity!(4, v0, p0: A1, v1, p1: A2, v2, p2: A3, v3, p3: A4);
