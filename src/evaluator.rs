//! Environments and the core evaluation loop.
//!
//! An [`Environment`] is a cheap-to-clone handle onto a shared, mutable
//! binding frame. Frames form a parent chain; closures hold a handle to
//! their defining frame, so a procedure defined with `define` can call
//! itself by name and `set!` through a captured scope is visible to every
//! closure sharing that scope.
//!
//! [`eval`] is an iterative loop over a mutable (expression, environment)
//! pair. Positions whose value becomes the value of the whole form (the
//! selected `if`/`cond` branch, the last form of `begin`/`and`/`or`, and a
//! closure body on application) rebind the pair and continue the loop
//! instead of recursing, so tail-recursive procedures run in constant
//! native stack space. Only genuinely nested work (operands, tests,
//! non-tail recursion) consumes the [`MAX_EVAL_DEPTH`] budget.

use crate::ast::Value;
use crate::intoprimitive::{IntoPrimitive, IntoVariadicPrimitive, PrimitiveFn};
use crate::primitives::{Arity, all_primitives};
use crate::{Error, MAX_EVAL_DEPTH};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

/// One binding frame: a name table plus an optional parent scope.
struct Frame {
    bindings: HashMap<String, Value>,
    parent: Option<Environment>,
}

/// Handle onto a shared binding frame.
///
/// Cloning an `Environment` clones the handle, not the frame: both handles
/// see and affect the same bindings. This shared ownership is what makes
/// lexical closures work. A closure stored inside the very scope it
/// captures forms a reference cycle and is leaked; acceptable for a
/// host-managed interpreter with no collector.
#[derive(Clone)]
pub struct Environment(Rc<RefCell<Frame>>);

impl PartialEq for Environment {
    fn eq(&self, other: &Self) -> bool {
        // Identity, not structure: two environments are equal when they are
        // the same frame. Structural comparison would recurse into closures
        // and cycle.
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let frame = self.0.borrow();
        write!(
            f,
            "Environment({} bindings{})",
            frame.bindings.len(),
            if frame.parent.is_some() {
                ", with parent"
            } else {
                ""
            }
        )
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// Create an empty top-level environment.
    pub fn new() -> Self {
        Environment(Rc::new(RefCell::new(Frame {
            bindings: HashMap::new(),
            parent: None,
        })))
    }

    /// Create an empty frame whose parent is this environment.
    pub fn child(&self) -> Self {
        Environment(Rc::new(RefCell::new(Frame {
            bindings: HashMap::new(),
            parent: Some(self.clone()),
        })))
    }

    /// Bind `name` to `value` in this frame, shadowing any outer binding.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.0.borrow_mut().bindings.insert(name.into(), value);
    }

    /// Look up `name`, searching from this frame outward.
    pub fn lookup(&self, name: &str) -> Result<Value, Error> {
        let mut current = self.clone();
        loop {
            let parent = {
                let frame = current.0.borrow();
                if let Some(value) = frame.bindings.get(name) {
                    return Ok(value.clone());
                }
                frame.parent.clone()
            };
            match parent {
                Some(p) => current = p,
                None => return Err(Error::UnboundSymbol(name.to_string())),
            }
        }
    }

    /// Rebind `name` in the nearest frame that already defines it.
    ///
    /// Unlike [`Environment::define`], this never creates a binding: if no
    /// frame in the chain defines `name`, the assignment fails.
    pub fn set(&self, name: &str, value: Value) -> Result<(), Error> {
        let mut current = self.clone();
        loop {
            let parent = {
                let mut frame = current.0.borrow_mut();
                if let Some(slot) = frame.bindings.get_mut(name) {
                    *slot = value;
                    return Ok(());
                }
                frame.parent.clone()
            };
            match parent {
                Some(p) => current = p,
                None => return Err(Error::UnboundSymbol(name.to_string())),
            }
        }
    }

    /// Register a raw primitive using the plain slice-based signature.
    pub fn register_primitive(&self, name: &str, func: fn(&[Value]) -> Result<Value, Error>) {
        // Wrap the raw slice-based function into the canonical
        // `PrimitiveFn` so it can be stored directly as a `Primitive`.
        let f = func;
        let wrapped: Arc<PrimitiveFn> = Arc::new(move |args: Vec<Value>| f(&args));

        self.define(
            name,
            Value::Primitive {
                id: name.to_string(),
                func: wrapped,
            },
        );
    }

    /// Register a strongly-typed Rust function as a primitive using
    /// automatic argument extraction and result conversion.
    ///
    /// This allows writing natural Rust functions like:
    ///
    /// ```rust,ignore
    /// fn add(a: f64, b: f64) -> f64 { a + b }
    /// let env = tinylisp::evaluator::create_global_env();
    /// env.register_typed_primitive::<_, (f64, f64), f64>("add2", add);
    /// // Now (add2 2 3) works
    /// ```
    ///
    /// Primitives can also return `Result<R, Error>` to signal failures
    /// with a specific error variant. Arity is enforced automatically;
    /// conversion failures yield `TypeError`.
    pub fn register_typed_primitive<F, Args, R>(&self, name: &str, func: F)
    where
        F: IntoPrimitive<Args, R> + 'static,
    {
        let wrapped = func.into_primitive();
        self.define(
            name,
            Value::Primitive {
                id: name.to_string(),
                func: wrapped,
            },
        );
    }

    /// Register a variadic primitive with explicit arity metadata.
    ///
    /// This is intended for functions whose Rust signature includes a
    /// "rest" parameter, expressed using iterator types from the
    /// [`crate::intoprimitive`] module:
    ///
    /// - rest of all arguments as values: `fn(ValueListIterator<'_>) -> R`
    /// - numeric tail: `fn(NumIterator<'_>) -> R`
    /// - fixed prefix plus numeric tail: `fn(f64, NumIterator<'_>) -> R`
    ///
    /// Fixed-arity functions should use
    /// [`Environment::register_typed_primitive`] instead.
    ///
    /// The provided [`Arity`] is validated against the total argument count
    /// at call time, since minimum argument counts for variadic operations
    /// are not derivable from the Rust type signature alone.
    pub fn register_variadic_primitive<F, Args, R>(&self, name: &str, arity: Arity, func: F)
    where
        F: IntoVariadicPrimitive<Args, R> + 'static,
    {
        let inner = func.into_variadic_primitive();
        let wrapped: Arc<PrimitiveFn> = Arc::new(move |args: Vec<Value>| {
            arity.validate(args.len())?;
            inner(args)
        });

        self.define(
            name,
            Value::Primitive {
                id: name.to_string(),
                func: wrapped,
            },
        );
    }

    /// Get all bindings visible from this environment, innermost winning.
    /// Returns a Vec of (name, value) pairs sorted by name.
    pub fn all_bindings(&self) -> Vec<(String, Value)> {
        fn collect(env: &Environment, out: &mut HashMap<String, Value>) {
            let frame = env.0.borrow();
            // Parent bindings first so local bindings override them
            if let Some(parent) = &frame.parent {
                collect(parent, out);
            }
            for (name, value) in &frame.bindings {
                out.insert(name.clone(), value.clone());
            }
        }

        let mut bindings = HashMap::new();
        collect(self, &mut bindings);

        let mut result: Vec<_> = bindings.into_iter().collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }
}

/// Outcome of one evaluation step on a compound form.
enum Step {
    /// The form's value is fully determined.
    Done(Value),
    /// The form's value is the value of this (expression, environment)
    /// pair; the main loop continues there without growing the stack.
    Tail(Value, Environment),
}

/// Evaluate an expression (public API).
pub fn eval(expr: &Value, env: &Environment) -> Result<Value, Error> {
    eval_with_depth(expr.clone(), env.clone(), 0)
}

/// Evaluate with a nesting-depth budget.
///
/// `depth` counts only non-tail nesting; the tail loop below never
/// increments it, so iteration count is unbounded while native stack
/// consumption stays fixed.
fn eval_with_depth(expr: Value, env: Environment, depth: usize) -> Result<Value, Error> {
    if depth >= MAX_EVAL_DEPTH {
        return Err(Error::EvalError(format!(
            "Evaluation depth limit exceeded (max: {MAX_EVAL_DEPTH})"
        )));
    }

    let mut expr = expr;
    let mut env = env;

    loop {
        match expr {
            // Self-evaluating forms
            Value::Number(_)
            | Value::String(_)
            | Value::Bool(_)
            | Value::Primitive { .. }
            | Value::Closure { .. }
            | Value::Unspecified => return Ok(expr),

            // Variable lookup
            Value::Symbol(name) => return env.lookup(&name),

            // Special forms and application
            Value::List(elements) => {
                let step =
                    eval_list(&elements, &env, depth).map_err(|err| add_context(err, &elements))?;
                match step {
                    Step::Done(value) => return Ok(value),
                    Step::Tail(next_expr, next_env) => {
                        expr = next_expr;
                        env = next_env;
                    }
                }
            }
        }
    }
}

/// Helper function to add expression context to errors
fn add_context(error: Error, elements: &[Value]) -> Error {
    match error {
        Error::EvalError(msg) => {
            Error::EvalError(format!("{msg}\n  Context: while evaluating: {}", render(elements)))
        }
        Error::TypeError(msg) => {
            Error::TypeError(format!("{msg}\n  Context: while evaluating: {}", render(elements)))
        }
        // Syntax errors, unbound symbols, and arity errors carry their own context
        other => other,
    }
}

fn render(elements: &[Value]) -> String {
    let parts: Vec<String> = elements.iter().map(|e| e.to_string()).collect();
    format!("({})", parts.join(" "))
}

/// Helper function to evaluate a list of argument expressions (non-tail)
fn eval_args(args: &[Value], env: &Environment, depth: usize) -> Result<Vec<Value>, Error> {
    args.iter()
        .map(|arg| eval_with_depth(arg.clone(), env.clone(), depth + 1))
        .collect()
}

/// Evaluate one compound form: keyword dispatch for special forms, then
/// procedure application.
///
/// Special-form keywords always take precedence over bindings: defining a
/// variable named `if` does not change how `(if ...)` evaluates.
fn eval_list(elements: &[Value], env: &Environment, depth: usize) -> Result<Step, Error> {
    if let [Value::Symbol(name), args @ ..] = elements {
        match name.as_str() {
            "quote" => return eval_quote(args),
            "if" => return eval_if(args, env, depth),
            "define" => return eval_define(args, env, depth),
            "set!" => return eval_set(args, env, depth),
            "lambda" => return eval_lambda(args, env),
            "begin" => return eval_begin(args, env, depth),
            "cond" => return eval_cond(args, env, depth),
            "and" => return eval_and(args, env, depth),
            "or" => return eval_or(args, env, depth),
            _ => {}
        }
    }

    match elements {
        [] => Err(Error::EvalError("Cannot evaluate empty list".to_owned())),

        // Application: evaluate the operator, then the operands
        // left-to-right, then apply.
        [func_expr, arg_exprs @ ..] => {
            let func = eval_with_depth(func_expr.clone(), env.clone(), depth + 1)?;
            let args = eval_args(arg_exprs, env, depth)?;
            apply(func, args)
        }
    }
}

/// Apply a procedure value to already-evaluated arguments.
fn apply(func: Value, args: Vec<Value>) -> Result<Step, Error> {
    match func {
        Value::Primitive { func, .. } => Ok(Step::Done(func(args)?)),

        Value::Closure {
            params,
            body,
            env: closure_env,
        } => {
            if params.len() != args.len() {
                return Err(Error::arity_error(params.len(), args.len()));
            }

            // New frame parented to the captured environment, not the
            // caller's: lexical scope.
            let call_env = closure_env.child();
            for (param, arg) in params.iter().zip(args) {
                call_env.define(param.clone(), arg);
            }

            // The body is the tail position of the call.
            Ok(Step::Tail(*body, call_env))
        }

        _ => Err(Error::TypeError(format!(
            "Cannot apply non-procedure: {func}"
        ))),
    }
}

/// Evaluate quote special form
fn eval_quote(args: &[Value]) -> Result<Step, Error> {
    match args {
        [expr] => Ok(Step::Done(expr.clone())),
        _ => Err(Error::arity_error(1, args.len())),
    }
}

/// Evaluate if special form: 2 or 3 arguments, truthiness test, selected
/// branch in tail position. A missing alternative yields Unspecified.
fn eval_if(args: &[Value], env: &Environment, depth: usize) -> Result<Step, Error> {
    match args {
        [test, consequent] => {
            let condition = eval_with_depth(test.clone(), env.clone(), depth + 1)?;
            if condition.is_truthy() {
                Ok(Step::Tail(consequent.clone(), env.clone()))
            } else {
                Ok(Step::Done(Value::Unspecified))
            }
        }
        [test, consequent, alternative] => {
            let condition = eval_with_depth(test.clone(), env.clone(), depth + 1)?;
            let branch = if condition.is_truthy() {
                consequent
            } else {
                alternative
            };
            Ok(Step::Tail(branch.clone(), env.clone()))
        }
        _ => Err(Error::arity_error(3, args.len())),
    }
}

/// Evaluate define special form.
///
/// Two shapes: `(define name expr)` and the procedure shorthand
/// `(define (name params...) body)`, which is equivalent to binding `name`
/// to `(lambda (params...) body)`.
fn eval_define(args: &[Value], env: &Environment, depth: usize) -> Result<Step, Error> {
    match args {
        [Value::Symbol(name), expr] => {
            let value = eval_with_depth(expr.clone(), env.clone(), depth + 1)?;
            env.define(name.clone(), value);
            Ok(Step::Done(Value::Unspecified))
        }
        [Value::List(signature), body] => {
            let [Value::Symbol(name), params @ ..] = signature.as_slice() else {
                return Err(Error::TypeError(
                    "define signature must start with a procedure name".to_owned(),
                ));
            };
            let closure = make_closure(params, body, env)?;
            env.define(name.clone(), closure);
            Ok(Step::Done(Value::Unspecified))
        }
        [_, _] => Err(Error::TypeError(
            "define requires a symbol or a signature list".to_owned(),
        )),
        _ => Err(Error::arity_error(2, args.len())),
    }
}

/// Evaluate set! special form
fn eval_set(args: &[Value], env: &Environment, depth: usize) -> Result<Step, Error> {
    match args {
        [Value::Symbol(name), expr] => {
            let value = eval_with_depth(expr.clone(), env.clone(), depth + 1)?;
            env.set(name, value)?;
            Ok(Step::Done(Value::Unspecified))
        }
        [_, _] => Err(Error::TypeError("set! requires a symbol".to_owned())),
        _ => Err(Error::arity_error(2, args.len())),
    }
}

/// Evaluate lambda special form
fn eval_lambda(args: &[Value], env: &Environment) -> Result<Step, Error> {
    match args {
        [Value::List(param_list), body] => Ok(Step::Done(make_closure(param_list, body, env)?)),
        [_, _] => Err(Error::TypeError(
            "lambda parameters must be a list".to_owned(),
        )),
        _ => Err(Error::arity_error(2, args.len())),
    }
}

/// Build a closure value from a parameter list, a single body expression,
/// and the defining environment.
///
/// Only fixed-arity parameter lists of distinct symbols are supported; no
/// variadic `(lambda args body)` or dotted-rest forms.
fn make_closure(param_list: &[Value], body: &Value, env: &Environment) -> Result<Value, Error> {
    let mut params = Vec::with_capacity(param_list.len());
    for param in param_list {
        match param {
            Value::Symbol(name) => {
                if params.contains(name) {
                    return Err(Error::EvalError(format!("Duplicate parameter name: {name}")));
                }
                params.push(name.clone());
            }
            _ => {
                return Err(Error::TypeError(
                    "lambda parameters must be symbols".to_owned(),
                ));
            }
        }
    }

    Ok(Value::Closure {
        params,
        body: Box::new(body.clone()),
        env: env.clone(),
    })
}

/// Evaluate begin special form: left-to-right for effect, last form in
/// tail position. `(begin)` yields Unspecified.
fn eval_begin(args: &[Value], env: &Environment, depth: usize) -> Result<Step, Error> {
    match args {
        [] => Ok(Step::Done(Value::Unspecified)),
        [leading @ .., last] => {
            for expr in leading {
                eval_with_depth(expr.clone(), env.clone(), depth + 1)?;
            }
            Ok(Step::Tail(last.clone(), env.clone()))
        }
    }
}

/// Evaluate cond special form: `(cond (test expr)...)`. The first clause
/// whose test is true continues into its expression in tail position; if
/// no clause matches the result is the empty list.
fn eval_cond(args: &[Value], env: &Environment, depth: usize) -> Result<Step, Error> {
    for clause in args {
        let Value::List(pair) = clause else {
            return Err(Error::TypeError(
                "cond clause must be a (test expression) pair".to_owned(),
            ));
        };
        let [test, expr] = pair.as_slice() else {
            return Err(Error::TypeError(
                "cond clause must be a (test expression) pair".to_owned(),
            ));
        };

        let condition = eval_with_depth(test.clone(), env.clone(), depth + 1)?;
        if condition.is_truthy() {
            return Ok(Step::Tail(expr.clone(), env.clone()));
        }
    }

    Ok(Step::Done(Value::List(vec![])))
}

macro_rules! short_circuit_op {
    ($name:ident, $doc:literal, $stop_when_truthy:literal) => {
        #[doc = $doc]
        fn $name(args: &[Value], env: &Environment, depth: usize) -> Result<Step, Error> {
            match args {
                [] => Err(Error::arity_error(1, 0)),
                [leading @ .., last] => {
                    for expr in leading {
                        let value = eval_with_depth(expr.clone(), env.clone(), depth + 1)?;
                        if value.is_truthy() == $stop_when_truthy {
                            return Ok(Step::Done(value));
                        }
                    }
                    // The last argument decides; it is in tail position.
                    Ok(Step::Tail(last.clone(), env.clone()))
                }
            }
        }
    };
}

short_circuit_op!(
    eval_and,
    "Evaluate and: stops at the first false value, otherwise yields the last.",
    false
);
short_circuit_op!(
    eval_or,
    "Evaluate or: stops at the first true value, otherwise yields the last.",
    true
);

/// Create a global environment with all built-in procedures installed,
/// plus the reserved boolean aliases `True` and `False`.
pub fn create_global_env() -> Environment {
    let env = Environment::new();

    for def in all_primitives() {
        env.define(
            def.name,
            Value::Primitive {
                id: def.name.to_owned(),
                func: Arc::clone(&def.func),
            },
        );
    }

    env.define("True", Value::Bool(true));
    env.define("False", Value::Bool(false));

    env
}
