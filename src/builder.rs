//! Declarative construction of [Format]s.
//!
//! Directives are appended in order through typed methods (or through
//! [FormatBuilder::declare] by registry keyword); nested blocks take
//! closures over a fresh builder. Errors are deferred and surfaced by
//! [FormatBuilder::build], so chains stay uninterrupted.

use crate::context::ByteOrder;
use crate::directive::{Directive, Kind, MagicValue, NumRange, Validator};
use crate::errors::BuildError;
use crate::expr::Expression;
use crate::format::Format;
use crate::registry::{self, Options};
use crate::size::Size;
use crate::value::Value;

/// Typed options for numeric directives.
#[derive(Debug, Clone, Default)]
pub struct NumOptions {
    /// Explicit width overriding the kind's default.
    pub size: Option<Size>,
    pub byte_order: Option<ByteOrder>,
    pub range: Option<NumRange>,
    pub validator: Option<Validator>,
}

impl From<NumOptions> for Options {
    fn from(opts: NumOptions) -> Self {
        Options {
            size: opts.size,
            byte_order: opts.byte_order,
            range: opts.range,
            validator: opts.validator,
            ..Default::default()
        }
    }
}

/// Ordered builder for a [Format].
#[derive(Debug, Default)]
pub struct FormatBuilder {
    name: Option<String>,
    directives: Vec<Directive>,
    deferred: Vec<BuildError>,
}

impl FormatBuilder {
    pub fn new() -> Self {
        FormatBuilder::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        FormatBuilder {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    fn push(&mut self, directive: Directive) -> &mut Self {
        self.directives.push(directive);
        self
    }

    fn push_result(&mut self, result: Result<Directive, BuildError>) -> &mut Self {
        match result {
            Ok(directive) => self.directives.push(directive),
            Err(err) => self.deferred.push(err),
        }
        self
    }

    fn block(&mut self, build_fn: impl FnOnce(&mut FormatBuilder)) -> Format {
        let mut sub = FormatBuilder::new();
        build_fn(&mut sub);
        self.deferred.append(&mut sub.deferred);
        if let Err(err) = crate::format::check_attributes(&sub.directives) {
            self.deferred.push(err);
        }
        Format::new(None, sub.directives)
    }

    /// Appends a directive by registry keyword. Unknown keywords and
    /// invalid options surface from [FormatBuilder::build].
    pub fn declare(
        &mut self,
        keyword: &str,
        attribute: Option<&str>,
        options: Options,
    ) -> &mut Self {
        self.push_result(registry::build(
            keyword,
            attribute.map(str::to_string),
            options,
        ))
    }

    /// Byte-order override for the most recently appended directive,
    /// inherited by its nested block.
    pub fn with_byte_order(&mut self, byte_order: ByteOrder) -> &mut Self {
        if let Some(directive) = self.directives.last_mut() {
            directive.byte_order = Some(byte_order);
        }
        self
    }

    pub fn byte(&mut self, attribute: &str) -> &mut Self {
        self.integer(attribute, Size::bytes(1), true)
    }

    pub fn ubyte(&mut self, attribute: &str) -> &mut Self {
        self.integer(attribute, Size::bytes(1), false)
    }

    pub fn short(&mut self, attribute: &str) -> &mut Self {
        self.integer(attribute, Size::bytes(2), true)
    }

    pub fn ushort(&mut self, attribute: &str) -> &mut Self {
        self.integer(attribute, Size::bytes(2), false)
    }

    pub fn int(&mut self, attribute: &str) -> &mut Self {
        self.integer(attribute, Size::bytes(4), true)
    }

    pub fn uint(&mut self, attribute: &str) -> &mut Self {
        self.integer(attribute, Size::bytes(4), false)
    }

    pub fn long(&mut self, attribute: &str) -> &mut Self {
        self.integer(attribute, Size::bytes(8), true)
    }

    pub fn ulong(&mut self, attribute: &str) -> &mut Self {
        self.integer(attribute, Size::bytes(8), false)
    }

    /// Integer with explicit width and signedness.
    pub fn integer(&mut self, attribute: &str, width: Size, signed: bool) -> &mut Self {
        let width = match registry::integer_width(&width) {
            Ok(width) => width,
            Err(err) => {
                self.deferred.push(err);
                return self;
            }
        };
        self.push(Directive::named(
            attribute,
            Kind::Integer {
                width,
                signed,
                range: None,
                validator: None,
            },
        ))
    }

    pub fn int_with(&mut self, attribute: &str, options: NumOptions) -> &mut Self {
        self.declare("int", Some(attribute), options.into())
    }

    pub fn uint_with(&mut self, attribute: &str, options: NumOptions) -> &mut Self {
        self.declare("uint", Some(attribute), options.into())
    }

    pub fn float(&mut self, attribute: &str) -> &mut Self {
        self.push(Directive::named(
            attribute,
            Kind::Float {
                width: Size::bytes(4),
                range: None,
                validator: None,
            },
        ))
    }

    pub fn double(&mut self, attribute: &str) -> &mut Self {
        self.push(Directive::named(
            attribute,
            Kind::Float {
                width: Size::bytes(8),
                range: None,
                validator: None,
            },
        ))
    }

    pub fn float_with(&mut self, attribute: &str, options: NumOptions) -> &mut Self {
        self.declare("float", Some(attribute), options.into())
    }

    /// Null-terminated string.
    pub fn string(&mut self, attribute: &str) -> &mut Self {
        self.push(Directive::named(attribute, Kind::Str { length: None }))
    }

    /// Fixed-length string; the length expression may be a literal, a
    /// [Size], or a field reference.
    pub fn string_fixed(
        &mut self,
        attribute: &str,
        length: impl Into<Expression>,
    ) -> &mut Self {
        self.push(Directive::named(
            attribute,
            Kind::Str {
                length: Some(length.into()),
            },
        ))
    }

    /// Byte-sequence signature check.
    pub fn magic(&mut self, expected: impl AsRef<[u8]>) -> &mut Self {
        let bytes = expected.as_ref().to_vec();
        if bytes.is_empty() {
            self.deferred.push(BuildError::EmptyMagic);
            return self;
        }
        self.push(Directive::new(Kind::Magic {
            expected: MagicValue::Bytes(bytes),
        }))
    }

    /// Integer signature check, 4 bytes wide.
    pub fn magic_uint(&mut self, expected: u64) -> &mut Self {
        self.push(Directive::new(Kind::Magic {
            expected: MagicValue::Uint {
                value: expected,
                width: Size::bytes(4),
            },
        }))
    }

    /// Array with an explicit length expression.
    pub fn array(
        &mut self,
        attribute: &str,
        length: impl Into<Expression>,
        element: impl FnOnce(&mut FormatBuilder),
    ) -> &mut Self {
        let element = self.block(element);
        self.push(Directive::named(
            attribute,
            Kind::Array {
                length: Some(length.into()),
                element,
            },
        ))
    }

    /// Array whose u32 length prefix is read from the stream.
    pub fn array_prefixed(
        &mut self,
        attribute: &str,
        element: impl FnOnce(&mut FormatBuilder),
    ) -> &mut Self {
        let element = self.block(element);
        self.push(Directive::named(
            attribute,
            Kind::Array {
                length: None,
                element,
            },
        ))
    }

    /// Nested sub-format decoded into a fresh record under `attribute`.
    pub fn group(
        &mut self,
        attribute: &str,
        block: impl FnOnce(&mut FormatBuilder),
    ) -> &mut Self {
        let block = self.block(block);
        self.push(Directive::named(attribute, Kind::Group { block }))
    }

    /// Block decoded in place when the predicate holds; otherwise the
    /// block's bytes are not consumed and its attributes stay unset.
    pub fn conditional(
        &mut self,
        predicate: impl Into<Expression>,
        then_block: impl FnOnce(&mut FormatBuilder),
    ) -> &mut Self {
        let then_block = self.block(then_block);
        self.push(Directive::new(Kind::Conditional {
            predicate: predicate.into(),
            then_block,
            otherwise: None,
        }))
    }

    pub fn conditional_else(
        &mut self,
        predicate: impl Into<Expression>,
        then_block: impl FnOnce(&mut FormatBuilder),
        otherwise: impl FnOnce(&mut FormatBuilder),
    ) -> &mut Self {
        let then_block = self.block(then_block);
        let otherwise = self.block(otherwise);
        self.push(Directive::new(Kind::Conditional {
            predicate: predicate.into(),
            then_block,
            otherwise: Some(otherwise),
        }))
    }

    /// Absolute-offset jump: seeks before evaluating the block and does
    /// not seek back, so later directives continue from wherever the
    /// block left the cursor.
    pub fn at(
        &mut self,
        offset: impl Into<Expression>,
        block: impl FnOnce(&mut FormatBuilder),
    ) -> &mut Self {
        let block = self.block(block);
        self.push(Directive::new(Kind::At {
            offset: offset.into(),
            block,
        }))
    }

    /// Discriminated-case dispatch: the first case whose value matches
    /// the discriminator runs in place. Without a default, an unmatched
    /// discriminator aborts the decode.
    pub fn dispatch(
        &mut self,
        discriminator: impl Into<Expression>,
        cases: impl FnOnce(&mut DispatchBuilder),
    ) -> &mut Self {
        let mut dispatch = DispatchBuilder {
            cases: Vec::new(),
            default: None,
            deferred: Vec::new(),
        };
        cases(&mut dispatch);
        self.deferred.append(&mut dispatch.deferred);
        self.push(Directive::new(Kind::Dispatch {
            discriminator: discriminator.into(),
            cases: dispatch.cases,
            default: dispatch.default,
        }))
    }

    /// Finalizes the format. Surfaces the first deferred error, then
    /// rejects duplicate attribute names in the top-level scope.
    pub fn build(mut self) -> Result<Format, BuildError> {
        if !self.deferred.is_empty() {
            return Err(self.deferred.remove(0));
        }

        crate::format::check_attributes(&self.directives)?;
        Ok(Format::new(self.name, self.directives))
    }
}

/// Builds the case list of a dispatch directive.
#[derive(Debug)]
pub struct DispatchBuilder {
    cases: Vec<(Value, Format)>,
    default: Option<Format>,
    deferred: Vec<BuildError>,
}

impl DispatchBuilder {
    fn block(&mut self, build_fn: impl FnOnce(&mut FormatBuilder)) -> Format {
        let mut sub = FormatBuilder::new();
        build_fn(&mut sub);
        self.deferred.append(&mut sub.deferred);
        if let Err(err) = crate::format::check_attributes(&sub.directives) {
            self.deferred.push(err);
        }
        Format::new(None, sub.directives)
    }

    pub fn case(
        &mut self,
        value: impl Into<Value>,
        block: impl FnOnce(&mut FormatBuilder),
    ) -> &mut Self {
        let block = self.block(block);
        self.cases.push((value.into(), block));
        self
    }

    pub fn default(&mut self, block: impl FnOnce(&mut FormatBuilder)) -> &mut Self {
        let block = self.block(block);
        self.default = Some(block);
        self
    }
}
