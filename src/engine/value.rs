use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::error::EvalError;

/// A host callable usable inside expressions.
///
/// Wraps a reference-counted closure so that two handles to the same
/// underlying function compare equal by *identity*. Identity, not name, is
/// what the evaluator's security gate checks: a callable pulled out of the
/// evaluation context may only be invoked if it is reference-identical to an
/// entry in one of the operator or function tables.
#[derive(Clone)]
pub struct NativeFn(Rc<dyn Fn(&[Value]) -> Result<Value, EvalError>>);

impl NativeFn {
    /// Wraps a closure as a callable value.
    pub fn new(f: impl Fn(&[Value]) -> Result<Value, EvalError> + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invokes the callable with the given argument slice.
    ///
    /// # Errors
    /// Propagates whatever error the underlying function returns.
    pub fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        (self.0)(args)
    }

    /// Returns `true` if both handles point at the same underlying function.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NativeFn({:p})", Rc::as_ptr(&self.0))
    }
}

impl PartialEq for NativeFn {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// Represents a runtime value in the expression language.
///
/// This enum models all the types that can appear in literals, contexts,
/// operator results, and function arguments.
#[derive(Debug, Clone)]
pub enum Value {
    /// A numeric value (double precision floating-point).
    Number(f64),
    /// A boolean value, produced by comparisons and logical operators.
    Bool(bool),
    /// A string value.
    Str(String),
    /// An array of values.
    Array(Rc<Vec<Self>>),
    /// A nested name-to-value mapping, addressable with member access.
    Map(Rc<HashMap<String, Self>>),
    /// A callable; subject to the evaluator's trust gate.
    Function(NativeFn),
}

impl Value {
    /// A short noun for this value's type, used in error messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Number(..) => "number",
            Self::Bool(..) => "boolean",
            Self::Str(..) => "string",
            Self::Array(..) => "array",
            Self::Map(..) => "object",
            Self::Function(..) => "function",
        }
    }

    /// Converts the value to an `f64` for arithmetic.
    ///
    /// Numbers convert directly and booleans convert to `0`/`1`; anything
    /// else is a type mismatch.
    ///
    /// # Errors
    /// Returns `EvalError::TypeMismatch` for non-numeric values.
    pub fn as_number(&self) -> Result<f64, EvalError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            _ => Err(EvalError::TypeMismatch { details: format!("expected a number, found {}",
                                                                self.kind_name()), }),
        }
    }

    /// Whether the value counts as true in a condition.
    ///
    /// `false`, `0`, `NaN`, and the empty string are falsy; every array,
    /// object, and function is truthy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Str(s) => !s.is_empty(),
            Self::Array(..) | Self::Map(..) | Self::Function(..) => true,
        }
    }

    /// Returns `true` if the value is [`Number`].
    ///
    /// [`Number`]: Value::Number
    #[must_use]
    pub const fn is_number(&self) -> bool {
        matches!(self, Self::Number(..))
    }

    /// Returns `true` if the value is [`Function`].
    ///
    /// [`Function`]: Value::Function
    #[must_use]
    pub const fn is_function(&self) -> bool {
        matches!(self, Self::Function(..))
    }
}

impl PartialEq for Value {
    /// Numbers, booleans, strings, and arrays compare structurally; objects
    /// and functions compare by reference identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => Rc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<Self>> for Value {
    fn from(v: Vec<Self>) -> Self {
        Self::Array(Rc::new(v))
    }
}

impl From<HashMap<String, Self>> for Value {
    fn from(v: HashMap<String, Self>) -> Self {
        Self::Map(Rc::new(v))
    }
}

impl From<NativeFn> for Value {
    fn from(v: NativeFn) -> Self {
        Self::Function(v)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Array(a) => {
                write!(f, "[")?;

                for (index, value) in a.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }

                    write!(f, "{value}")?;
                }

                write!(f, "]")
            },
            Self::Map(m) => {
                let mut keys: Vec<&String> = m.keys().collect();
                keys.sort();

                write!(f, "{{")?;
                for (index, key) in keys.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {}", m[*key])?;
                }
                write!(f, "}}")
            },
            Self::Function(..) => write!(f, "<function>"),
        }
    }
}

/// The caller-owned evaluation context: a mutable name-to-value mapping.
///
/// Cloning a `Context` produces another handle to the *same* mapping, so a
/// lambda closing over its definition context observes later mutations, and
/// assignments performed inside an evaluation write through to the caller's
/// context. Use [`Context::flat_copy`] for an independent snapshot.
///
/// The context is single-threaded by design; callers evaluating against the
/// same context from multiple threads must serialize externally.
#[derive(Debug, Clone, Default)]
pub struct Context {
    vars: Rc<RefCell<HashMap<String, Value>>>,
}

impl Context {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a variable, cloning its value out of the mapping.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.vars.borrow().get(name).cloned()
    }

    /// Binds or overwrites a variable.
    pub fn set(&self, name: &str, value: Value) {
        self.vars.borrow_mut().insert(name.to_string(), value);
    }

    /// Returns `true` if the variable is bound.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.vars.borrow().contains_key(name)
    }

    /// Copies the current contents into a fresh, independent context.
    ///
    /// This is the scope a lambda call runs in: one flat copy of the outer
    /// mapping taken at call time, with the parameter names then overwritten.
    /// Mutations inside the copy do not leak back to the original.
    #[must_use]
    pub fn flat_copy(&self) -> Self {
        Self { vars: Rc::new(RefCell::new(self.vars.borrow().clone())), }
    }
}

impl FromIterator<(String, Value)> for Context {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self { vars: Rc::new(RefCell::new(iter.into_iter().collect())), }
    }
}

impl From<HashMap<String, Value>> for Context {
    fn from(vars: HashMap<String, Value>) -> Self {
        Self { vars: Rc::new(RefCell::new(vars)), }
    }
}
