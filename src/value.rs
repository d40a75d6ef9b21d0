//! Decoded field values.

use crate::errors::ReadError;
use crate::record::GenericRecord;
use crate::size::Size;

/// A value produced by decoding one directive, or supplied to one when
/// encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Bytes(Vec<u8>),
    /// A size literal, usable wherever a byte length is expected.
    Size(Size),
    /// A nested sub-record (group or array element).
    Record(GenericRecord),
    Array(Vec<Value>),
}

impl Value {
    /// Short name of the variant, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Unsigned(_) => "unsigned integer",
            Value::Signed(_) => "signed integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Size(_) => "size",
            Value::Record(_) => "record",
            Value::Array(_) => "array",
        }
    }

    pub fn as_u64(&self) -> Result<u64, ReadError> {
        match self {
            Value::Unsigned(v) => Ok(*v),
            Value::Signed(v) if *v >= 0 => Ok(*v as u64),
            other => Err(ReadError::TypeMismatch {
                expected: "unsigned integer",
                found: other.kind_name().to_string(),
            }),
        }
    }

    pub fn as_i64(&self) -> Result<i64, ReadError> {
        match self {
            Value::Signed(v) => Ok(*v),
            Value::Unsigned(v) if *v <= i64::MAX as u64 => Ok(*v as i64),
            other => Err(ReadError::TypeMismatch {
                expected: "signed integer",
                found: other.kind_name().to_string(),
            }),
        }
    }

    pub fn as_f64(&self) -> Result<f64, ReadError> {
        match self {
            Value::Float(v) => Ok(*v),
            Value::Unsigned(v) => Ok(*v as f64),
            Value::Signed(v) => Ok(*v as f64),
            other => Err(ReadError::TypeMismatch {
                expected: "number",
                found: other.kind_name().to_string(),
            }),
        }
    }

    /// Boolean interpretation: `Bool` as-is, integers by nonzero truthiness.
    pub fn as_bool(&self) -> Result<bool, ReadError> {
        match self {
            Value::Bool(v) => Ok(*v),
            Value::Unsigned(v) => Ok(*v != 0),
            Value::Signed(v) => Ok(*v != 0),
            other => Err(ReadError::TypeMismatch {
                expected: "bool or integer",
                found: other.kind_name().to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> Result<&str, ReadError> {
        match self {
            Value::Str(v) => Ok(v),
            other => Err(ReadError::TypeMismatch {
                expected: "string",
                found: other.kind_name().to_string(),
            }),
        }
    }

    /// Interprets the value as a byte length: plain integers count bytes,
    /// [Size] values must be byte-aligned.
    pub fn byte_len(&self) -> Result<u64, ReadError> {
        match self {
            Value::Size(size) => size.whole_bytes().ok_or(ReadError::TypeMismatch {
                expected: "byte-aligned size",
                found: size.to_string(),
            }),
            other => other.as_u64(),
        }
    }

    /// Loose equality for discriminator matching: signed and unsigned
    /// integers compare by numeric value, everything else exactly.
    pub fn matches(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Unsigned(a), Value::Signed(b)) => *b >= 0 && *a == *b as u64,
            (Value::Signed(a), Value::Unsigned(b)) => *a >= 0 && *a as u64 == *b,
            (a, b) => a == b,
        }
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Unsigned(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Unsigned(v as u64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Signed(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Signed(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Size> for Value {
    fn from(v: Size) -> Self {
        Value::Size(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::size::SizeExt;

    #[test]
    fn test_numeric_coercions() {
        assert_eq!(Value::Unsigned(10).as_u64().unwrap(), 10);
        assert_eq!(Value::Signed(10).as_u64().unwrap(), 10);
        assert!(Value::Signed(-1).as_u64().is_err());
        assert_eq!(Value::Unsigned(10).as_f64().unwrap(), 10.0);
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::Unsigned(1).as_bool().unwrap());
        assert!(!Value::Unsigned(0).as_bool().unwrap());
        assert!(Value::Signed(-3).as_bool().unwrap());
        assert!(Value::Str("x".into()).as_bool().is_err());
    }

    #[test]
    fn test_byte_len() {
        assert_eq!(Value::Unsigned(6).byte_len().unwrap(), 6);
        assert_eq!(Value::Size(6u64.bytes()).byte_len().unwrap(), 6);
        assert_eq!(Value::Size(16u64.bits()).byte_len().unwrap(), 2);
        assert!(Value::Size(5u64.bits()).byte_len().is_err());
    }

    #[test]
    fn test_matches_across_signedness() {
        assert!(Value::Unsigned(3).matches(&Value::Signed(3)));
        assert!(Value::Signed(3).matches(&Value::Unsigned(3)));
        assert!(!Value::Unsigned(3).matches(&Value::Signed(-3)));
        assert!(Value::Str("a".into()).matches(&Value::Str("a".into())));
    }
}
