//! # byteform
//!
//! A library for decoding and encoding binary streams using declarative
//! formats.
//!
//! Describe a format as an ordered list of directives (integers, floats,
//! strings, magic literals, arrays, conditionals, dispatch), then run it
//! against a byte cursor to produce named attribute values. The same
//! format drives both directions: decoding a stream into a record and
//! encoding a record back into bytes.
//!
//! ## Example
//!
//! ```
//! use byteform::builder::FormatBuilder;
//! use byteform::cursor::MemCursor;
//! use byteform::value::Value;
//!
//! let mut builder = FormatBuilder::new();
//! builder
//!     .magic(b"BM")
//!     .uint("size")
//!     .ushort("count");
//! let format = builder.build().unwrap();
//!
//! let mut cursor = MemCursor::from_bytes([
//!     b'B', b'M',             // magic
//!     0x00, 0x00, 0x00, 0x0a, // size, big-endian
//!     0x00, 0x03,             // count
//! ]);
//! let record = format.decode(&mut cursor).unwrap();
//! assert_eq!(record.get("size"), Some(&Value::Unsigned(10)));
//! assert_eq!(record.get("count"), Some(&Value::Unsigned(3)));
//! ```

pub mod builder;
pub mod context;
pub mod cursor;
pub mod directive;
pub mod errors;
pub mod expr;
pub mod format;
pub mod record;
pub mod registry;
#[cfg(feature = "serde")]
pub mod serde;
pub mod serializable;
mod serializers;
pub mod size;
pub mod value;
