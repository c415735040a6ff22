//! Runtime-checked callables
//!
//! A [`DynFunction`] erases a typed Rust function into a body over
//! `Vec<Value>`. It remembers its declared parameter kinds so the dispatcher
//! can check the call shape before anything runs.

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

use super::{Param, Reply, Value, ValueKind};

type Body = dyn Fn(Vec<Value>) -> Result<Vec<Value>> + Send + Sync;

/// A type-erased function with a declared parameter list
#[derive(Clone)]
pub struct DynFunction {
    name: Arc<str>,
    params: Arc<[ValueKind]>,
    body: Arc<Body>,
}

impl DynFunction {
    /// Erase a typed function; its name is the Rust type name
    pub fn new<F, Args>(f: F) -> Self
    where
        F: IntoDynFunction<Args>,
    {
        f.into_dyn()
    }

    /// Erase a typed function under an explicit name
    pub fn named<F, Args>(name: impl Into<String>, f: F) -> Self
    where
        F: IntoDynFunction<Args>,
    {
        let mut function = f.into_dyn();
        function.name = Arc::from(name.into());
        function
    }

    /// Build from an untyped body and an explicit parameter list
    pub fn from_raw<B>(name: impl Into<String>, params: Vec<ValueKind>, body: B) -> Self
    where
        B: Fn(Vec<Value>) -> Result<Vec<Value>> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name.into()),
            params: Arc::from(params),
            body: Arc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of declared parameters
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn params(&self) -> &[ValueKind] {
        &self.params
    }

    /// Check the argument count and invoke the body
    pub fn call(&self, args: Vec<Value>) -> Result<Vec<Value>> {
        if args.len() != self.arity() {
            return Err(Error::ArityMismatch {
                function: self.name.to_string(),
                expected: self.arity(),
                actual: args.len(),
            });
        }
        (self.body)(args)
    }
}

impl fmt::Debug for DynFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynFunction")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

/// Convert one argument to a declared parameter type
fn coerce<T: Param>(function: &str, index: usize, value: Value) -> Result<T> {
    match value {
        Value::Nil => Ok(T::zero()),
        other => T::from_value(other).map_err(|rejected| Error::ArgumentType {
            function: function.to_string(),
            index,
            expected: T::KIND,
            actual: rejected.kind(),
        }),
    }
}

// ─────────────────────────────────────────────────────────────────
// Typed Erasure
// ─────────────────────────────────────────────────────────────────

/// Functions that can be erased into a [`DynFunction`]
///
/// Implemented for `Fn` closures and function items of up to six
/// [`Param`] arguments returning a [`Reply`].
pub trait IntoDynFunction<Args> {
    fn into_dyn(self) -> DynFunction;
}

macro_rules! impl_into_dyn_function {
    ($($arg:ident),*) => {
        impl<Func, Out, $($arg,)*> IntoDynFunction<($($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> Out + Send + Sync + 'static,
            Out: Reply,
            $($arg: Param,)*
        {
            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn into_dyn(self) -> DynFunction {
                let name: Arc<str> = Arc::from(std::any::type_name::<Func>());
                let params: Arc<[ValueKind]> = Arc::from(vec![$(<$arg as Param>::KIND),*]);
                let label = name.clone();

                let body = move |args: Vec<Value>| -> Result<Vec<Value>> {
                    let mut args = args.into_iter().enumerate();
                    $(
                        let $arg: $arg = match args.next() {
                            Some((index, value)) => coerce::<$arg>(&label, index, value)?,
                            None => return Err(Error::Internal(format!("{}: argument list exhausted", label))),
                        };
                    )*
                    Ok((self)($($arg),*).into_reply())
                };

                DynFunction {
                    name,
                    params,
                    body: Arc::new(body),
                }
            }
        }
    };
}

impl_into_dyn_function!();
impl_into_dyn_function!(A1);
impl_into_dyn_function!(A1, A2);
impl_into_dyn_function!(A1, A2, A3);
impl_into_dyn_function!(A1, A2, A3, A4);
impl_into_dyn_function!(A1, A2, A3, A4, A5);
impl_into_dyn_function!(A1, A2, A3, A4, A5, A6);
