//! The directive keyword registry.
//!
//! A fixed table maps each directive keyword to a constructor that turns
//! an option set into a [Directive]. The table is consulted at
//! construction time by [crate::builder::FormatBuilder::declare] and by
//! the serde definition compiler; an unregistered keyword is a
//! [BuildError::UnknownDirective].

use crate::context::ByteOrder;
use crate::directive::{Directive, Kind, MagicValue, NumRange, Validator};
use crate::errors::BuildError;
use crate::expr::Expression;
use crate::size::Size;

/// Option set for a declared directive. Constructors read the options
/// they recognize; a missing required option is a build error.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Explicit width overriding the keyword's default.
    pub size: Option<Size>,
    /// Byte-order override, inherited into nested blocks.
    pub byte_order: Option<ByteOrder>,
    /// Inclusive numeric range restriction.
    pub range: Option<NumRange>,
    /// Custom validation predicate.
    pub validator: Option<Validator>,
    /// String length; absent means null-terminated.
    pub length: Option<Expression>,
    /// Magic literal.
    pub value: Option<MagicValue>,
}

type Constructor = fn(Option<String>, Options) -> Result<Directive, BuildError>;

/// The closed keyword table. Unprefixed integer keywords are signed, the
/// `u`-prefixed forms unsigned. Numeric defaults: byte/ubyte=1, short=2,
/// int/uint/float=4, long/ulong/double=8 bytes.
static KEYWORDS: &[(&str, Constructor)] = &[
    ("byte", |attr, opts| integer(attr, opts, 1, true)),
    ("ubyte", |attr, opts| integer(attr, opts, 1, false)),
    ("short", |attr, opts| integer(attr, opts, 2, true)),
    ("ushort", |attr, opts| integer(attr, opts, 2, false)),
    ("int", |attr, opts| integer(attr, opts, 4, true)),
    ("uint", |attr, opts| integer(attr, opts, 4, false)),
    ("long", |attr, opts| integer(attr, opts, 8, true)),
    ("ulong", |attr, opts| integer(attr, opts, 8, false)),
    ("float", |attr, opts| float(attr, opts, 4)),
    ("double", |attr, opts| float(attr, opts, 8)),
    ("string", string),
    ("magic", magic),
];

/// Builds a directive from a keyword and options.
pub fn build(
    keyword: &str,
    attribute: Option<String>,
    options: Options,
) -> Result<Directive, BuildError> {
    let constructor = KEYWORDS
        .iter()
        .find(|(kw, _)| *kw == keyword)
        .map(|(_, ctor)| ctor)
        .ok_or_else(|| BuildError::UnknownDirective(keyword.to_string()))?;
    constructor(attribute, options)
}

/// True when the keyword is registered.
pub fn is_registered(keyword: &str) -> bool {
    KEYWORDS.iter().any(|(kw, _)| *kw == keyword)
}

pub(crate) fn integer_width(size: &Size) -> Result<Size, BuildError> {
    let bytes = size
        .whole_bytes()
        .ok_or_else(|| BuildError::UnalignedWidth(size.to_string()))?;
    match bytes {
        1 | 2 | 4 | 8 => Ok(*size),
        other => Err(BuildError::InvalidWidth(other)),
    }
}

pub(crate) fn float_width(size: &Size) -> Result<Size, BuildError> {
    let bytes = size
        .whole_bytes()
        .ok_or_else(|| BuildError::UnalignedWidth(size.to_string()))?;
    match bytes {
        4 | 8 => Ok(*size),
        other => Err(BuildError::InvalidWidth(other)),
    }
}

fn integer(
    attribute: Option<String>,
    options: Options,
    default_bytes: u64,
    signed: bool,
) -> Result<Directive, BuildError> {
    let attribute = attribute.ok_or(BuildError::MissingOption("attribute"))?;
    let width = integer_width(&options.size.unwrap_or(Size::bytes(default_bytes)))?;

    Ok(Directive {
        attribute: Some(attribute),
        byte_order: options.byte_order,
        kind: Kind::Integer {
            width,
            signed,
            range: options.range,
            validator: options.validator,
        },
    })
}

fn float(
    attribute: Option<String>,
    options: Options,
    default_bytes: u64,
) -> Result<Directive, BuildError> {
    let attribute = attribute.ok_or(BuildError::MissingOption("attribute"))?;
    let width = float_width(&options.size.unwrap_or(Size::bytes(default_bytes)))?;

    Ok(Directive {
        attribute: Some(attribute),
        byte_order: options.byte_order,
        kind: Kind::Float {
            width,
            range: options.range,
            validator: options.validator,
        },
    })
}

fn string(attribute: Option<String>, options: Options) -> Result<Directive, BuildError> {
    let attribute = attribute.ok_or(BuildError::MissingOption("attribute"))?;

    Ok(Directive {
        attribute: Some(attribute),
        byte_order: options.byte_order,
        kind: Kind::Str {
            length: options.length,
        },
    })
}

fn magic(_attribute: Option<String>, options: Options) -> Result<Directive, BuildError> {
    let expected = options.value.ok_or(BuildError::MissingOption("value"))?;

    match &expected {
        MagicValue::Bytes(bytes) if bytes.is_empty() => return Err(BuildError::EmptyMagic),
        MagicValue::Uint { width, .. } => {
            integer_width(width)?;
        }
        _ => {}
    }

    Ok(Directive {
        attribute: None,
        byte_order: options.byte_order,
        kind: Kind::Magic { expected },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::size::SizeExt;

    #[test]
    fn test_every_keyword_constructs() {
        for (keyword, _) in KEYWORDS {
            let mut options = Options::default();
            if *keyword == "magic" {
                options.value = Some(MagicValue::Bytes(b"OK".to_vec()));
            }
            let attribute = Some("attr".to_string());
            assert!(
                build(keyword, attribute, options).is_ok(),
                "keyword '{}' failed to construct",
                keyword
            );
        }
    }

    #[test]
    fn test_unknown_keyword() {
        assert_eq!(
            build("blob", Some("x".to_string()), Options::default()).unwrap_err(),
            BuildError::UnknownDirective("blob".to_string())
        );
    }

    #[test]
    fn test_width_defaults() {
        let directive = build("short", Some("v".to_string()), Options::default()).unwrap();
        match directive.kind {
            Kind::Integer { width, signed, .. } => {
                assert_eq!(width, 2u64.bytes());
                assert!(signed);
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn test_unsigned_prefix_convention() {
        for (keyword, want_signed) in [
            ("byte", true),
            ("ubyte", false),
            ("long", true),
            ("ulong", false),
        ] {
            let directive = build(keyword, Some("v".to_string()), Options::default()).unwrap();
            match directive.kind {
                Kind::Integer { signed, .. } => assert_eq!(signed, want_signed, "{}", keyword),
                other => panic!("unexpected kind: {:?}", other),
            }
        }
    }

    #[test]
    fn test_size_override_and_invalid_width() {
        let options = Options {
            size: Some(3u64.bytes()),
            ..Default::default()
        };
        assert_eq!(
            build("uint", Some("v".to_string()), options).unwrap_err(),
            BuildError::InvalidWidth(3)
        );

        let options = Options {
            size: Some(5u64.bits()),
            ..Default::default()
        };
        assert_eq!(
            build("uint", Some("v".to_string()), options).unwrap_err(),
            BuildError::UnalignedWidth("5 bit".to_string())
        );
    }

    #[test]
    fn test_missing_magic_value() {
        assert_eq!(
            build("magic", None, Options::default()).unwrap_err(),
            BuildError::MissingOption("value")
        );
    }
}
