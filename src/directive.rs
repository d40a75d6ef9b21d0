//! Field directives: one step of a format.

use std::fmt;
use std::sync::Arc;

use crate::context::ByteOrder;
use crate::expr::Expression;
use crate::format::Format;
use crate::size::Size;
use crate::value::Value;

/// Inclusive numeric range restriction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NumRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumRange {
    pub fn new(min: f64, max: f64) -> Self {
        NumRange {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn at_least(min: f64) -> Self {
        NumRange {
            min: Some(min),
            max: None,
        }
    }

    pub fn at_most(max: f64) -> Self {
        NumRange {
            min: None,
            max: Some(max),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

/// Custom validation predicate applied to a decoded or encoded value.
#[derive(Clone)]
pub struct Validator(pub Arc<dyn Fn(&Value) -> bool + Send + Sync>);

impl Validator {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Validator(Arc::new(f))
    }

    pub fn accepts(&self, value: &Value) -> bool {
        (self.0)(value)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validator(..)")
    }
}

/// Expected literal of a signature check.
#[derive(Debug, Clone, PartialEq)]
pub enum MagicValue {
    Bytes(Vec<u8>),
    Uint { value: u64, width: Size },
}

/// Directive payload, one variant per serializer strategy.
#[derive(Debug, Clone)]
pub enum Kind {
    /// Fixed-width integer, 1/2/4/8 bytes, optionally signed.
    Integer {
        width: Size,
        signed: bool,
        range: Option<NumRange>,
        validator: Option<Validator>,
    },
    /// IEEE-754 float, 4 or 8 bytes wide.
    Float {
        width: Size,
        range: Option<NumRange>,
        validator: Option<Validator>,
    },
    /// Fixed-length or, when `length` is absent, null-terminated string.
    Str { length: Option<Expression> },
    /// Signature check; mismatch aborts the whole decode.
    Magic { expected: MagicValue },
    /// Repeated sub-format. Without a length expression, a u32 length
    /// prefix is read from the stream.
    Array {
        length: Option<Expression>,
        element: Format,
    },
    /// Predicate-guarded block, decoded in place when the predicate holds.
    Conditional {
        predicate: Expression,
        then_block: Format,
        otherwise: Option<Format>,
    },
    /// Nested sub-format decoded into a fresh record.
    Group { block: Format },
    /// Absolute-offset jump. The seek does not restore: directives after
    /// the block continue from wherever the block left the cursor.
    At { offset: Expression, block: Format },
    /// Discriminated-case dispatch. The first matching case's block runs
    /// in place; no match without a default aborts the decode.
    Dispatch {
        discriminator: Expression,
        cases: Vec<(Value, Format)>,
        default: Option<Format>,
    },
}

/// One step of a [Format]: a directive kind, the attribute it populates
/// (when any), and an optional byte-order override inherited by its
/// nested block.
#[derive(Debug, Clone)]
pub struct Directive {
    pub attribute: Option<String>,
    pub byte_order: Option<ByteOrder>,
    pub kind: Kind,
}

impl Directive {
    pub fn new(kind: Kind) -> Self {
        Directive {
            attribute: None,
            byte_order: None,
            kind,
        }
    }

    pub fn named(attribute: impl Into<String>, kind: Kind) -> Self {
        Directive {
            attribute: Some(attribute.into()),
            byte_order: None,
            kind,
        }
    }

    pub fn with_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = Some(byte_order);
        self
    }
}
