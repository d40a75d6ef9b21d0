//! Deferred values for directive options.
//!
//! Lengths, predicates, discriminators, and offsets are expressed as an
//! [Expression]: a literal, a back-reference to an attribute decoded
//! earlier in the same record, or a computed function of the record.
//! Expressions are evaluated lazily, at the moment a directive needs the
//! value.

use std::fmt;
use std::sync::Arc;

use crate::errors::ReadError;
use crate::record::Record;
use crate::size::Size;
use crate::value::Value;

/// Computed-expression callback: reads the partially-decoded record.
pub type ComputeFn = dyn Fn(&dyn Record) -> Result<Value, ReadError> + Send + Sync;

/// A deferred value resolved against the record under construction.
#[derive(Clone)]
pub enum Expression {
    /// A constant.
    Literal(Value),
    /// Named back-reference to an already-decoded attribute. Fails with
    /// [ReadError::UnresolvedFieldRef] when the attribute is absent.
    FieldRef(String),
    /// Arbitrary function of the record.
    Computed(Arc<ComputeFn>),
}

impl Expression {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(value.into())
    }

    pub fn field(name: impl Into<String>) -> Self {
        Expression::FieldRef(name.into())
    }

    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&dyn Record) -> Result<Value, ReadError> + Send + Sync + 'static,
    {
        Expression::Computed(Arc::new(f))
    }

    /// Resolves the expression against the record.
    pub fn eval(&self, record: &dyn Record) -> Result<Value, ReadError> {
        match self {
            Expression::Literal(value) => Ok(value.clone()),
            Expression::FieldRef(name) => record
                .get_attr(name)
                .ok_or_else(|| ReadError::UnresolvedFieldRef(name.clone())),
            Expression::Computed(f) => f(record),
        }
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Expression::FieldRef(name) => f.debug_tuple("FieldRef").field(name).finish(),
            Expression::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<u64> for Expression {
    fn from(v: u64) -> Self {
        Expression::Literal(Value::Unsigned(v))
    }
}

impl From<u32> for Expression {
    fn from(v: u32) -> Self {
        Expression::Literal(Value::Unsigned(v as u64))
    }
}

impl From<i64> for Expression {
    fn from(v: i64) -> Self {
        Expression::Literal(Value::Signed(v))
    }
}

impl From<i32> for Expression {
    fn from(v: i32) -> Self {
        Expression::Literal(Value::Signed(v as i64))
    }
}

impl From<Size> for Expression {
    fn from(v: Size) -> Self {
        Expression::Literal(Value::Size(v))
    }
}

/// A bare string is a field reference, not a string literal.
impl From<&str> for Expression {
    fn from(name: &str) -> Self {
        Expression::FieldRef(name.to_string())
    }
}
