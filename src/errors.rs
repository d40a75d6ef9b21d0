//! Error types for format construction, decoding, and encoding.

use std::fmt;

/// Errors produced while building a [crate::format::Format].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Directive keyword has no entry in the registry.
    UnknownDirective(String),
    /// Two top-level directives target the same attribute.
    DuplicateAttribute(String),
    /// Numeric width is not one of the supported byte widths.
    InvalidWidth(u64),
    /// Width is not a whole number of bytes.
    UnalignedWidth(String),
    /// A required directive option was not supplied.
    MissingOption(&'static str),
    /// Magic literal is empty.
    EmptyMagic,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::UnknownDirective(kw) => {
                write!(f, "no serializer registered for directive '{}'", kw)
            }
            BuildError::DuplicateAttribute(name) => {
                write!(f, "duplicate attribute '{}' in format", name)
            }
            BuildError::InvalidWidth(bytes) => {
                write!(f, "invalid numeric width: {} bytes", bytes)
            }
            BuildError::UnalignedWidth(size) => {
                write!(f, "width {} is not a whole number of bytes", size)
            }
            BuildError::MissingOption(opt) => {
                write!(f, "directive option '{}' is required", opt)
            }
            BuildError::EmptyMagic => write!(f, "magic literal must not be empty"),
        }
    }
}

impl std::error::Error for BuildError {}

/// Errors produced while decoding a stream against a format.
///
/// Every variant aborts the in-progress decode; no partial record is
/// ever returned.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadError {
    /// Fewer bytes were available than a directive required.
    TruncatedStream { needed: usize, available: usize },
    /// An unterminated string never found its delimiter.
    DelimiterNotFound,
    /// A signature check failed.
    MagicMismatch { expected: String, found: String },
    /// A range or custom predicate rejected a decoded value.
    Validation { attribute: String },
    /// An expression named an attribute that has not been decoded yet.
    UnresolvedFieldRef(String),
    /// A discriminated-case dispatch matched no case and had no default.
    UnmatchedDiscriminator(String),
    /// An expression produced a value of the wrong type.
    TypeMismatch {
        expected: &'static str,
        found: String,
    },
    /// No format with this name was registered for the target type.
    UnknownFormat(String),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::TruncatedStream { needed, available } => write!(
                f,
                "stream truncated: needed {} bytes but only {} available",
                needed, available
            ),
            ReadError::DelimiterNotFound => {
                write!(f, "stream exhausted before string delimiter was found")
            }
            ReadError::MagicMismatch { expected, found } => write!(
                f,
                "magic mismatch: expected {} but found {}",
                expected, found
            ),
            ReadError::Validation { attribute } => {
                write!(f, "validation failed for attribute '{}'", attribute)
            }
            ReadError::UnresolvedFieldRef(name) => {
                write!(f, "attribute '{}' referenced before it was decoded", name)
            }
            ReadError::UnmatchedDiscriminator(value) => {
                write!(f, "no case matched discriminator value {}", value)
            }
            ReadError::TypeMismatch { expected, found } => {
                write!(f, "expected {} but found {}", expected, found)
            }
            ReadError::UnknownFormat(name) => {
                write!(f, "no format registered under the name '{}'", name)
            }
        }
    }
}

impl std::error::Error for ReadError {}

/// Errors produced while encoding a record back into a stream.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteError {
    /// The record has no value for an attribute the format requires.
    MissingAttribute(String),
    /// A range or custom predicate rejected the value being encoded.
    Validation { attribute: String },
    /// Actual string or array length disagrees with the declared length.
    LengthMismatch {
        attribute: String,
        expected: usize,
        actual: usize,
    },
    /// The record holds a value of the wrong type for this directive.
    TypeMismatch {
        expected: &'static str,
        found: String,
    },
    /// An expression failed to resolve during encoding.
    Read(ReadError),
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::MissingAttribute(name) => {
                write!(f, "record has no value for attribute '{}'", name)
            }
            WriteError::Validation { attribute } => {
                write!(f, "validation failed for attribute '{}'", attribute)
            }
            WriteError::LengthMismatch {
                attribute,
                expected,
                actual,
            } => write!(
                f,
                "length mismatch for '{}': declared {} but found {}",
                attribute, expected, actual
            ),
            WriteError::TypeMismatch { expected, found } => {
                write!(f, "expected {} but found {}", expected, found)
            }
            WriteError::Read(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for WriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WriteError::Read(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ReadError> for WriteError {
    fn from(err: ReadError) -> Self {
        WriteError::Read(err)
    }
}
