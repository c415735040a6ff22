//! Dynamic values passed to and returned from dispatched callables

use std::fmt;

use crate::context::ExecutionContext;

use super::DynFunction;

// ─────────────────────────────────────────────────────────────────
// Value
// ─────────────────────────────────────────────────────────────────

/// A dynamically typed argument or return value
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent value; coerced to the zero value of the declared parameter
    Nil,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Context(ExecutionContext),
    Func(DynFunction),
    /// An error returned by a callable
    Error(String),
}

/// Kind tag of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Nil,
    Bool,
    Int,
    Uint,
    Float,
    Str,
    Bytes,
    Json,
    Context,
    Func,
    Error,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Nil => "nil",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Uint => "uint",
            ValueKind::Float => "float",
            ValueKind::Str => "string",
            ValueKind::Bytes => "bytes",
            ValueKind::Json => "json",
            ValueKind::Context => "context",
            ValueKind::Func => "func",
            ValueKind::Error => "error",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    /// Wrap a function so it can be dispatched
    pub fn func<F, Args>(f: F) -> Self
    where
        F: super::IntoDynFunction<Args>,
    {
        Value::Func(f.into_dyn())
    }

    /// Build an error value from anything displayable
    pub fn error(err: impl fmt::Display) -> Self {
        Value::Error(err.to_string())
    }

    /// Get the kind tag
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Nil => ValueKind::Nil,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Uint(_) => ValueKind::Uint,
            Value::Float(_) => ValueKind::Float,
            Value::Str(_) => ValueKind::Str,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Json(_) => ValueKind::Json,
            Value::Context(_) => ValueKind::Context,
            Value::Func(_) => ValueKind::Func,
            Value::Error(_) => ValueKind::Error,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Uint(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Json(j) => write!(f, "{}", j),
            Value::Context(ctx) => write!(f, "context({})", ctx.trace_id()),
            Value::Func(func) => write!(f, "func({})", func.name()),
            Value::Error(e) => write!(f, "error({})", e),
        }
    }
}

/// Render an argument list as `[a, b, c]`
pub(crate) fn render_args(args: &[Value]) -> String {
    let parts: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

// ─────────────────────────────────────────────────────────────────
// Conversions
// ─────────────────────────────────────────────────────────────────

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i64 => Int,
    i32 => Int,
    u64 => Uint,
    u32 => Uint,
    f64 => Float,
    f32 => Float,
    String => Str,
    &str => Str,
    Vec<u8> => Bytes,
    serde_json::Value => Json,
    ExecutionContext => Context,
    DynFunction => Func,
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Uint(v as u64)
    }
}

impl From<&ExecutionContext> for Value {
    fn from(ctx: &ExecutionContext) -> Self {
        Value::Context(ctx.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Nil)
    }
}

// ─────────────────────────────────────────────────────────────────
// Parameters
// ─────────────────────────────────────────────────────────────────

/// A type a dispatched callable can declare as a parameter
pub trait Param: Sized + Send + 'static {
    /// Kind of value accepted for this parameter
    const KIND: ValueKind;

    /// Value used when the argument is [`Value::Nil`]
    fn zero() -> Self;

    /// Convert a non-nil value, handing it back on a kind mismatch
    fn from_value(value: Value) -> std::result::Result<Self, Value>;
}

macro_rules! impl_param {
    ($ty:ty, $kind:ident, $zero:expr) => {
        impl Param for $ty {
            const KIND: ValueKind = ValueKind::$kind;

            fn zero() -> Self {
                $zero
            }

            fn from_value(value: Value) -> std::result::Result<Self, Value> {
                match value {
                    Value::$kind(v) => Ok(v),
                    other => Err(other),
                }
            }
        }
    };
}

impl_param!(bool, Bool, false);
impl_param!(i64, Int, 0);
impl_param!(u64, Uint, 0);
impl_param!(f64, Float, 0.0);
impl_param!(String, Str, String::new());
impl_param!(Vec<u8>, Bytes, Vec::new());
impl_param!(serde_json::Value, Json, serde_json::Value::Null);
impl_param!(ExecutionContext, Context, ExecutionContext::background());

/// Integer parameters narrower than the value they are carried in
macro_rules! impl_narrow_param {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Param for $ty {
                const KIND: ValueKind = ValueKind::$kind;

                fn zero() -> Self {
                    0
                }

                fn from_value(value: Value) -> std::result::Result<Self, Value> {
                    match value {
                        Value::$kind(n) => <$ty>::try_from(n).map_err(|_| Value::$kind(n)),
                        other => Err(other),
                    }
                }
            }
        )*
    };
}

impl_narrow_param! {
    i32 => Int,
    u32 => Uint,
    usize => Uint,
}

impl Param for f32 {
    const KIND: ValueKind = ValueKind::Float;

    fn zero() -> Self {
        0.0
    }

    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Float(f) => Ok(f as f32),
            other => Err(other),
        }
    }
}

impl<T: Param> Param for Option<T> {
    const KIND: ValueKind = T::KIND;

    fn zero() -> Self {
        None
    }

    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        T::from_value(value).map(Some)
    }
}

// ─────────────────────────────────────────────────────────────────
// Replies
// ─────────────────────────────────────────────────────────────────

/// A type a dispatched callable can return
///
/// The reply is flattened into a list of values; only the last one is
/// inspected, and only for [`Value::Error`].
pub trait Reply {
    fn into_reply(self) -> Vec<Value>;
}

impl Reply for () {
    fn into_reply(self) -> Vec<Value> {
        Vec::new()
    }
}

impl Reply for Value {
    fn into_reply(self) -> Vec<Value> {
        vec![self]
    }
}

impl Reply for Vec<Value> {
    fn into_reply(self) -> Vec<Value> {
        self
    }
}

macro_rules! impl_reply {
    ($($ty:ty),*) => {
        $(
            impl Reply for $ty {
                fn into_reply(self) -> Vec<Value> {
                    vec![self.into()]
                }
            }
        )*
    };
}

impl_reply!(bool, i64, i32, u64, u32, usize, f64, f32, String, Vec<u8>, serde_json::Value);

impl<T: Reply, E: fmt::Display> Reply for std::result::Result<T, E> {
    fn into_reply(self) -> Vec<Value> {
        match self {
            Ok(v) => {
                let mut out = v.into_reply();
                out.push(Value::Nil);
                out
            }
            Err(e) => vec![Value::error(e)],
        }
    }
}
