//! Registration layer: named formats attached to an application type.
//!
//! The core engine knows nothing about this module; [crate::format::Format]s
//! are plain values. This layer lets a type expose "construct an instance
//! by decoding this stream using format X (or a default)".

use crate::cursor::ByteCursor;
use crate::errors::ReadError;
use crate::format::Format;
use crate::record::{GenericRecord, Record};

/// A set of named formats with an optional default.
#[derive(Debug, Clone, Default)]
pub struct FormatSet {
    formats: Vec<(String, Format)>,
    default_name: Option<String>,
}

impl FormatSet {
    pub fn new() -> Self {
        FormatSet::default()
    }

    /// Registers a format under a name, replacing any previous entry.
    pub fn register(mut self, name: impl Into<String>, format: Format) -> Self {
        let name = name.into();
        self.formats.retain(|(existing, _)| *existing != name);
        self.formats.push((name, format));
        self
    }

    /// Registers a format and makes it the default.
    pub fn register_default(self, name: impl Into<String>, format: Format) -> Self {
        let name = name.into();
        self.register(name.clone(), format).with_default(name)
    }

    pub fn with_default(mut self, name: impl Into<String>) -> Self {
        self.default_name = Some(name.into());
        self
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default_name.as_deref()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.formats.iter().map(|(name, _)| name.as_str())
    }

    /// Looks up a format by name, falling back to the default when no
    /// name is given.
    pub fn get(&self, name: Option<&str>) -> Result<&Format, ReadError> {
        let wanted = name
            .or(self.default_name.as_deref())
            .ok_or_else(|| ReadError::UnknownFormat("<default>".to_string()))?;
        self.formats
            .iter()
            .find(|(existing, _)| existing == wanted)
            .map(|(_, format)| format)
            .ok_or_else(|| ReadError::UnknownFormat(wanted.to_string()))
    }
}

/// A type that can be constructed by decoding a stream with one of its
/// registered formats.
pub trait Serializable: Record + Default {
    /// The formats registered for this type.
    fn formats() -> FormatSet;

    /// Decodes an instance using the named format, or the default when
    /// `format` is `None`.
    fn load_from(
        cursor: &mut dyn ByteCursor,
        format: Option<&str>,
    ) -> Result<Self, ReadError> {
        let set = Self::formats();
        let format = set.get(format)?;
        let mut instance = Self::default();
        format.decode_into(cursor, &mut instance)?;
        Ok(instance)
    }
}

/// Typed reconstruction of a nested generic record (array element or
/// group) into a concrete type.
pub trait FromRecord: Sized {
    fn from_record(record: &GenericRecord) -> Result<Self, ReadError>;
}

/// Convenience for [FromRecord] impls: a required attribute.
pub fn required(record: &GenericRecord, name: &str) -> Result<crate::value::Value, ReadError> {
    record
        .get_attr(name)
        .ok_or_else(|| ReadError::UnresolvedFieldRef(name.to_string()))
}
