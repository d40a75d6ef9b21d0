//! JSON-deserializable format description.
//!
//! These types describe the *layout* of a binary format. They are
//! intended to be constructed from JSON (for example a format file
//! shipped with your application) and then compiled into a
//! [crate::format::Format] via `TryFrom`.
//!
//! Keywords and options mirror [crate::builder::FormatBuilder]; custom
//! validators cannot be expressed in a definition file and must be
//! attached through the builder.

use serde::{Deserialize, Serialize};

use crate::context::ByteOrder;
use crate::directive::{Directive, Kind, MagicValue, NumRange};
use crate::errors::BuildError;
use crate::expr::Expression;
use crate::format::Format;
use crate::registry::{self, Options};
use crate::size::Size;
use crate::value::Value;

/// Top-level format definition consisting of a list of directives.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FormatDef {
    /// Optional format name, reported in diagnostics.
    #[serde(default)]
    pub name: Option<String>,
    /// Directives executed in order against the stream.
    pub directives: Vec<DirectiveDef>,
}

/// Description of a single directive.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DirectiveDef {
    /// Attribute name the decoded value is stored under; structural
    /// directives may omit it.
    #[serde(default)]
    pub attribute: Option<String>,
    /// Byte-order override for this directive and any nested block.
    #[serde(default)]
    pub byte_order: Option<ByteOrderDef>,
    /// What to read or write.
    #[serde(flatten)]
    pub kind: DirectiveKindDef,
}

/// Kind of directive, tagged by keyword.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "keyword", rename_all = "snake_case")]
pub enum DirectiveKindDef {
    /// Signed 8-bit integer.
    Byte(ScalarDef),
    /// Unsigned 8-bit integer.
    Ubyte(ScalarDef),
    /// Signed 16-bit integer.
    Short(ScalarDef),
    /// Unsigned 16-bit integer.
    Ushort(ScalarDef),
    /// Signed 32-bit integer.
    Int(ScalarDef),
    /// Unsigned 32-bit integer.
    Uint(ScalarDef),
    /// Signed 64-bit integer.
    Long(ScalarDef),
    /// Unsigned 64-bit integer.
    Ulong(ScalarDef),
    /// 32-bit float.
    Float(ScalarDef),
    /// 64-bit float.
    Double(ScalarDef),
    /// String; null-terminated unless a length is given.
    String {
        #[serde(default)]
        length: Option<ExprDef>,
    },
    /// Fixed literal that must match the stream.
    Magic { value: MagicDef },
    /// Repeated block, each element decoded into a nested record.
    Array {
        #[serde(default)]
        length: Option<ExprDef>,
        element: Vec<DirectiveDef>,
    },
    /// Block executed only when a previously decoded field is truthy.
    Conditional {
        predicate: ExprDef,
        then: Vec<DirectiveDef>,
        #[serde(default)]
        otherwise: Option<Vec<DirectiveDef>>,
    },
    /// Block decoded into a single nested record attribute.
    Group { block: Vec<DirectiveDef> },
    /// Block executed at an absolute stream offset.
    At {
        offset: ExprDef,
        block: Vec<DirectiveDef>,
    },
    /// Selects one block by comparing a discriminator against cases.
    Dispatch {
        discriminator: ExprDef,
        cases: Vec<CaseDef>,
        #[serde(default)]
        default: Option<Vec<DirectiveDef>>,
    },
}

/// Options shared by the numeric keywords.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ScalarDef {
    /// Explicit width in bytes overriding the keyword default.
    #[serde(default)]
    pub width_bytes: Option<u64>,
    /// Inclusive range the decoded value must fall into.
    #[serde(default)]
    pub range: Option<RangeDef>,
}

/// Inclusive numeric range; an open bound is omitted.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RangeDef {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

/// Byte order of multi-byte values.
#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrderDef {
    BigEndian,
    LittleEndian,
}

/// Expression: either a constant count or the name of a previously
/// decoded field.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(untagged)]
pub enum ExprDef {
    /// Constant value.
    Count(u64),
    /// Reference to a previously decoded attribute.
    Field(String),
}

/// Magic literal: raw text matched byte-for-byte, or an unsigned
/// integer with an explicit width.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(untagged)]
pub enum MagicDef {
    Text(String),
    Uint { value: u64, width_bytes: u64 },
}

/// One arm of a dispatch directive.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CaseDef {
    /// Discriminator value selecting this arm.
    pub value: CaseValueDef,
    /// Block executed when the arm is selected.
    pub block: Vec<DirectiveDef>,
}

/// Discriminator value of a dispatch case.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(untagged)]
pub enum CaseValueDef {
    Uint(u64),
    Int(i64),
    Text(String),
    Bool(bool),
}

impl From<ByteOrderDef> for ByteOrder {
    fn from(def: ByteOrderDef) -> Self {
        match def {
            ByteOrderDef::BigEndian => ByteOrder::BigEndian,
            ByteOrderDef::LittleEndian => ByteOrder::LittleEndian,
        }
    }
}

impl From<&ExprDef> for Expression {
    fn from(def: &ExprDef) -> Self {
        match def {
            ExprDef::Count(count) => Expression::literal(*count),
            ExprDef::Field(name) => Expression::field(name.clone()),
        }
    }
}

impl From<&RangeDef> for NumRange {
    fn from(def: &RangeDef) -> Self {
        NumRange {
            min: def.min,
            max: def.max,
        }
    }
}

impl From<&CaseValueDef> for Value {
    fn from(def: &CaseValueDef) -> Self {
        match def {
            CaseValueDef::Uint(v) => Value::Unsigned(*v),
            CaseValueDef::Int(v) => Value::Signed(*v),
            CaseValueDef::Text(v) => Value::Str(v.clone()),
            CaseValueDef::Bool(v) => Value::Bool(*v),
        }
    }
}

impl TryFrom<&MagicDef> for MagicValue {
    type Error = BuildError;

    fn try_from(def: &MagicDef) -> Result<Self, BuildError> {
        match def {
            MagicDef::Text(text) => {
                if text.is_empty() {
                    return Err(BuildError::EmptyMagic);
                }
                Ok(MagicValue::Bytes(text.as_bytes().to_vec()))
            }
            MagicDef::Uint { value, width_bytes } => {
                let width = registry::integer_width(&Size::bytes(*width_bytes))?;
                Ok(MagicValue::Uint {
                    value: *value,
                    width,
                })
            }
        }
    }
}

impl TryFrom<&FormatDef> for Format {
    type Error = BuildError;

    fn try_from(def: &FormatDef) -> Result<Self, BuildError> {
        let directives = compile_block(&def.directives)?;
        Ok(Format::new(def.name.clone(), directives))
    }
}

fn compile_block(defs: &[DirectiveDef]) -> Result<Vec<Directive>, BuildError> {
    let directives = defs
        .iter()
        .map(compile_directive)
        .collect::<Result<Vec<_>, _>>()?;
    crate::format::check_attributes(&directives)?;
    Ok(directives)
}

fn compile_directive(def: &DirectiveDef) -> Result<Directive, BuildError> {
    let attribute = def.attribute.clone();
    let byte_order = def.byte_order.map(ByteOrder::from);

    let directive = match &def.kind {
        DirectiveKindDef::Byte(opts) => scalar("byte", attribute, opts)?,
        DirectiveKindDef::Ubyte(opts) => scalar("ubyte", attribute, opts)?,
        DirectiveKindDef::Short(opts) => scalar("short", attribute, opts)?,
        DirectiveKindDef::Ushort(opts) => scalar("ushort", attribute, opts)?,
        DirectiveKindDef::Int(opts) => scalar("int", attribute, opts)?,
        DirectiveKindDef::Uint(opts) => scalar("uint", attribute, opts)?,
        DirectiveKindDef::Long(opts) => scalar("long", attribute, opts)?,
        DirectiveKindDef::Ulong(opts) => scalar("ulong", attribute, opts)?,
        DirectiveKindDef::Float(opts) => scalar("float", attribute, opts)?,
        DirectiveKindDef::Double(opts) => scalar("double", attribute, opts)?,
        DirectiveKindDef::String { length } => registry::build(
            "string",
            attribute,
            Options {
                length: length.as_ref().map(Expression::from),
                ..Options::default()
            },
        )?,
        DirectiveKindDef::Magic { value } => registry::build(
            "magic",
            attribute,
            Options {
                value: Some(MagicValue::try_from(value)?),
                ..Options::default()
            },
        )?,
        DirectiveKindDef::Array { length, element } => structural(
            attribute,
            Kind::Array {
                length: length.as_ref().map(Expression::from),
                element: Format::new(None, compile_block(element)?),
            },
        ),
        DirectiveKindDef::Conditional {
            predicate,
            then,
            otherwise,
        } => structural(
            attribute,
            Kind::Conditional {
                predicate: predicate.into(),
                then_block: Format::new(None, compile_block(then)?),
                otherwise: otherwise
                    .as_deref()
                    .map(|block| Ok(Format::new(None, compile_block(block)?)))
                    .transpose()?,
            },
        ),
        DirectiveKindDef::Group { block } => structural(
            attribute,
            Kind::Group {
                block: Format::new(None, compile_block(block)?),
            },
        ),
        DirectiveKindDef::At { offset, block } => structural(
            attribute,
            Kind::At {
                offset: offset.into(),
                block: Format::new(None, compile_block(block)?),
            },
        ),
        DirectiveKindDef::Dispatch {
            discriminator,
            cases,
            default,
        } => structural(
            attribute,
            Kind::Dispatch {
                discriminator: discriminator.into(),
                cases: cases
                    .iter()
                    .map(|case| {
                        Ok((
                            Value::from(&case.value),
                            Format::new(None, compile_block(&case.block)?),
                        ))
                    })
                    .collect::<Result<Vec<_>, BuildError>>()?,
                default: default
                    .as_deref()
                    .map(|block| Ok(Format::new(None, compile_block(block)?)))
                    .transpose()?,
            },
        ),
    };

    Ok(match byte_order {
        Some(order) => directive.with_order(order),
        None => directive,
    })
}

fn structural(attribute: Option<String>, kind: Kind) -> Directive {
    match attribute {
        Some(attribute) => Directive::named(attribute, kind),
        None => Directive::new(kind),
    }
}

fn scalar(
    keyword: &str,
    attribute: Option<String>,
    opts: &ScalarDef,
) -> Result<Directive, BuildError> {
    registry::build(
        keyword,
        attribute,
        Options {
            size: opts.width_bytes.map(Size::bytes),
            range: opts.range.as_ref().map(NumRange::from),
            ..Options::default()
        },
    )
}
