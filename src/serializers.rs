//! One read and one write strategy per directive kind.
//!
//! Every strategy consumes the stream purely through the context's
//! [crate::cursor::ByteCursor], resolves its option expressions against
//! the record under construction, and (when the directive is named)
//! assigns the result onto the target record, updating what later
//! directives can reference.

use crate::context::{ByteOrder, Context};
use crate::directive::{Directive, Kind, MagicValue, NumRange, Validator};
use crate::errors::{ReadError, WriteError};
use crate::expr::Expression;
use crate::format::Format;
use crate::record::GenericRecord;
use crate::size::Size;
use crate::value::Value;

/// Evaluates every directive of a block in order.
pub(crate) fn read_block(directives: &[Directive], ctx: &mut Context<'_>) -> Result<(), ReadError> {
    for directive in directives {
        read_directive(directive, ctx)?;
    }
    Ok(())
}

/// Reads one logical field, assigns it when named, and returns the value
/// for use by enclosing expressions.
pub(crate) fn read_directive(
    directive: &Directive,
    ctx: &mut Context<'_>,
) -> Result<Option<Value>, ReadError> {
    let order = ctx.order_for(directive.byte_order);
    let attr = directive.attribute.as_deref();

    let value = match &directive.kind {
        Kind::Integer {
            width,
            signed,
            range,
            validator,
        } => Some(read_integer(width, *signed, range, validator, attr, order, ctx)?),
        Kind::Float {
            width,
            range,
            validator,
        } => Some(read_float(width, range, validator, attr, order, ctx)?),
        Kind::Str { length } => Some(read_string(length, attr, ctx)?),
        Kind::Magic { expected } => {
            read_magic(expected, order, ctx)?;
            None
        }
        Kind::Array { length, element } => Some(read_array(length, element, order, ctx)?),
        Kind::Conditional {
            predicate,
            then_block,
            otherwise,
        } => {
            read_conditional(predicate, then_block, otherwise.as_ref(), order, ctx)?;
            None
        }
        Kind::Group { block } => Some(read_group(block, order, ctx)?),
        Kind::At { offset, block } => {
            let position = ctx.resolve(offset)?.as_u64()? as usize;
            ctx.cursor.seek(position);
            let mut sub = ctx.in_place(order);
            read_block(block.directives(), &mut sub)?;
            None
        }
        Kind::Dispatch {
            discriminator,
            cases,
            default,
        } => {
            read_dispatch(discriminator, cases, default.as_ref(), order, ctx)?;
            None
        }
    };

    if let (Some(name), Some(value)) = (attr, &value) {
        ctx.record.set_attr(name, value.clone())?;
    }

    Ok(value)
}

fn read_integer(
    width: &Size,
    signed: bool,
    range: &Option<NumRange>,
    validator: &Option<Validator>,
    attr: Option<&str>,
    order: ByteOrder,
    ctx: &mut Context<'_>,
) -> Result<Value, ReadError> {
    let n = byte_width(width)?;
    let mut bytes = ctx.cursor.read_exact(n)?;

    // Work in little-endian byte order: byte[i] contributes bits 8*i.
    if order == ByteOrder::BigEndian {
        bytes.reverse();
    }

    let mut raw = 0u64;
    for (i, byte) in bytes.iter().enumerate() {
        raw |= (*byte as u64) << (8 * i);
    }

    let value = if signed {
        Value::Signed(sign_extend(raw, n * 8))
    } else {
        Value::Unsigned(raw)
    };

    check_value(&value, range, validator, attr)?;
    Ok(value)
}

fn read_float(
    width: &Size,
    range: &Option<NumRange>,
    validator: &Option<Validator>,
    attr: Option<&str>,
    order: ByteOrder,
    ctx: &mut Context<'_>,
) -> Result<Value, ReadError> {
    let n = byte_width(width)?;
    let mut bytes = ctx.cursor.read_exact(n)?;

    if order == ByteOrder::BigEndian {
        bytes.reverse();
    }

    let value = match n {
        4 => {
            let raw = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            Value::Float(f32::from_bits(raw) as f64)
        }
        8 => {
            let raw = u64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]);
            Value::Float(f64::from_bits(raw))
        }
        other => {
            return Err(ReadError::TypeMismatch {
                expected: "4 or 8 byte float width",
                found: format!("{} bytes", other),
            });
        }
    };

    check_value(&value, range, validator, attr)?;
    Ok(value)
}

fn read_string(
    length: &Option<Expression>,
    attr: Option<&str>,
    ctx: &mut Context<'_>,
) -> Result<Value, ReadError> {
    let bytes = match length {
        Some(expr) => {
            let len = ctx.resolve(expr)?.byte_len()? as usize;
            ctx.cursor.read_exact(len)?
        }
        None => ctx.cursor.read_until(0)?,
    };

    match String::from_utf8(bytes) {
        Ok(s) => Ok(Value::Str(s)),
        Err(_) => Err(validation(attr)),
    }
}

fn read_magic(
    expected: &MagicValue,
    order: ByteOrder,
    ctx: &mut Context<'_>,
) -> Result<(), ReadError> {
    match expected {
        MagicValue::Bytes(want) => {
            let found = ctx.cursor.read_exact(want.len())?;
            if &found != want {
                return Err(ReadError::MagicMismatch {
                    expected: show_bytes(want),
                    found: show_bytes(&found),
                });
            }
        }
        MagicValue::Uint { value: want, width } => {
            let found = read_integer(width, false, &None, &None, None, order, ctx)?;
            if found.as_u64()? != *want {
                return Err(ReadError::MagicMismatch {
                    expected: want.to_string(),
                    found: format!("{:?}", found),
                });
            }
        }
    }
    Ok(())
}

fn read_array(
    length: &Option<Expression>,
    element: &Format,
    order: ByteOrder,
    ctx: &mut Context<'_>,
) -> Result<Value, ReadError> {
    let count = match length {
        Some(expr) => ctx.resolve(expr)?.as_u64()? as usize,
        // No length expression: a u32 length prefix precedes the elements.
        None => {
            let prefix = read_integer(&Size::bytes(4), false, &None, &None, None, order, ctx)?;
            prefix.as_u64()? as usize
        }
    };

    // Capacity is only a hint; the count comes from the wire.
    let mut items = Vec::with_capacity(count.min(1024));

    for _ in 0..count {
        let mut element_record = GenericRecord::new();
        {
            let mut sub = ctx.nested(&mut element_record, order);
            read_block(element.directives(), &mut sub)?;
        }
        items.push(Value::Record(element_record));
    }

    Ok(Value::Array(items))
}

fn read_conditional(
    predicate: &Expression,
    then_block: &Format,
    otherwise: Option<&Format>,
    order: ByteOrder,
    ctx: &mut Context<'_>,
) -> Result<(), ReadError> {
    if ctx.resolve(predicate)?.as_bool()? {
        let mut sub = ctx.in_place(order);
        read_block(then_block.directives(), &mut sub)?;
    } else if let Some(block) = otherwise {
        let mut sub = ctx.in_place(order);
        read_block(block.directives(), &mut sub)?;
    }
    Ok(())
}

fn read_group(block: &Format, order: ByteOrder, ctx: &mut Context<'_>) -> Result<Value, ReadError> {
    let mut record = GenericRecord::new();
    {
        let mut sub = ctx.nested(&mut record, order);
        read_block(block.directives(), &mut sub)?;
    }
    Ok(Value::Record(record))
}

fn read_dispatch(
    discriminator: &Expression,
    cases: &[(Value, Format)],
    default: Option<&Format>,
    order: ByteOrder,
    ctx: &mut Context<'_>,
) -> Result<(), ReadError> {
    let disc = ctx.resolve(discriminator)?;

    let block = cases
        .iter()
        .find(|(case, _)| case.matches(&disc))
        .map(|(_, block)| block)
        .or(default);

    match block {
        Some(block) => {
            let mut sub = ctx.in_place(order);
            read_block(block.directives(), &mut sub)
        }
        None => Err(ReadError::UnmatchedDiscriminator(format!("{:?}", disc))),
    }
}

/// Encodes every directive of a block in order.
pub(crate) fn write_block(
    directives: &[Directive],
    ctx: &mut Context<'_>,
) -> Result<(), WriteError> {
    for directive in directives {
        write_directive(directive, ctx)?;
    }
    Ok(())
}

pub(crate) fn write_directive(
    directive: &Directive,
    ctx: &mut Context<'_>,
) -> Result<(), WriteError> {
    let order = ctx.order_for(directive.byte_order);
    let attr = directive.attribute.as_deref();

    match &directive.kind {
        Kind::Integer {
            width,
            signed,
            range,
            validator,
        } => write_integer(width, *signed, range, validator, attr, order, ctx),
        Kind::Float {
            width,
            range,
            validator,
        } => write_float(width, range, validator, attr, order, ctx),
        Kind::Str { length } => write_string(length, attr, ctx),
        Kind::Magic { expected } => write_magic(expected, order, ctx),
        Kind::Array { length, element } => write_array(length, element, attr, order, ctx),
        Kind::Conditional {
            predicate,
            then_block,
            otherwise,
        } => {
            if ctx.resolve(predicate)?.as_bool()? {
                let mut sub = ctx.in_place(order);
                write_block(then_block.directives(), &mut sub)
            } else if let Some(block) = otherwise {
                let mut sub = ctx.in_place(order);
                write_block(block.directives(), &mut sub)
            } else {
                Ok(())
            }
        }
        Kind::Group { block } => {
            let value = require_attr(ctx, attr)?;
            let record = match value {
                Value::Record(record) => record,
                other => return Err(type_mismatch("record", &other)),
            };
            let mut work = record.clone();
            let mut sub = ctx.nested(&mut work, order);
            write_block(block.directives(), &mut sub)
        }
        Kind::At { offset, block } => {
            let position = ctx.resolve(offset)?.as_u64()? as usize;
            ctx.cursor.seek(position);
            let mut sub = ctx.in_place(order);
            write_block(block.directives(), &mut sub)
        }
        Kind::Dispatch {
            discriminator,
            cases,
            default,
        } => {
            let disc = ctx.resolve(discriminator)?;
            let block = cases
                .iter()
                .find(|(case, _)| case.matches(&disc))
                .map(|(_, block)| block)
                .or(default.as_ref());
            match block {
                Some(block) => {
                    let mut sub = ctx.in_place(order);
                    write_block(block.directives(), &mut sub)
                }
                None => Err(WriteError::Read(ReadError::UnmatchedDiscriminator(
                    format!("{:?}", disc),
                ))),
            }
        }
    }
}

fn write_integer(
    width: &Size,
    signed: bool,
    range: &Option<NumRange>,
    validator: &Option<Validator>,
    attr: Option<&str>,
    order: ByteOrder,
    ctx: &mut Context<'_>,
) -> Result<(), WriteError> {
    let value = require_attr(ctx, attr)?;
    check_for_write(&value, range, validator, attr)?;

    let n = byte_width(width)?;
    let raw = match value {
        Value::Unsigned(v) => {
            if !fits_unsigned(v, signed, n) {
                return Err(write_validation(attr));
            }
            v
        }
        // Two's complement representation of the signed value.
        Value::Signed(v) => {
            if !fits_signed(v, signed, n) {
                return Err(write_validation(attr));
            }
            v as u64
        }
        other => return Err(type_mismatch("integer", &other)),
    };

    let mut bytes: Vec<u8> = (0..n).map(|i| (raw >> (8 * i)) as u8).collect();
    if order == ByteOrder::BigEndian {
        bytes.reverse();
    }
    ctx.cursor.write(&bytes)
}

fn write_float(
    width: &Size,
    range: &Option<NumRange>,
    validator: &Option<Validator>,
    attr: Option<&str>,
    order: ByteOrder,
    ctx: &mut Context<'_>,
) -> Result<(), WriteError> {
    let value = require_attr(ctx, attr)?;
    check_for_write(&value, range, validator, attr)?;

    let float = match value {
        Value::Float(v) => v,
        other => return Err(type_mismatch("float", &other)),
    };

    let n = byte_width(width)?;
    let mut bytes = match n {
        4 => (float as f32).to_bits().to_le_bytes().to_vec(),
        8 => float.to_bits().to_le_bytes().to_vec(),
        other => {
            return Err(WriteError::TypeMismatch {
                expected: "4 or 8 byte float width",
                found: format!("{} bytes", other),
            });
        }
    };
    if order == ByteOrder::BigEndian {
        bytes.reverse();
    }
    ctx.cursor.write(&bytes)
}

fn write_string(
    length: &Option<Expression>,
    attr: Option<&str>,
    ctx: &mut Context<'_>,
) -> Result<(), WriteError> {
    let value = require_attr(ctx, attr)?;
    let s = match &value {
        Value::Str(s) => s.clone(),
        other => return Err(type_mismatch("string", other)),
    };

    match length {
        Some(expr) => {
            let expected = ctx.resolve(expr)?.byte_len()? as usize;
            if s.len() != expected {
                return Err(WriteError::LengthMismatch {
                    attribute: attr.unwrap_or("<unnamed>").to_string(),
                    expected,
                    actual: s.len(),
                });
            }
            ctx.cursor.write(s.as_bytes())
        }
        None => {
            ctx.cursor.write(s.as_bytes())?;
            ctx.cursor.write(&[0])
        }
    }
}

fn write_magic(
    expected: &MagicValue,
    order: ByteOrder,
    ctx: &mut Context<'_>,
) -> Result<(), WriteError> {
    match expected {
        MagicValue::Bytes(bytes) => ctx.cursor.write(bytes),
        MagicValue::Uint { value, width } => {
            let n = byte_width(width)?;
            let mut bytes: Vec<u8> = (0..n).map(|i| (value >> (8 * i)) as u8).collect();
            if order == ByteOrder::BigEndian {
                bytes.reverse();
            }
            ctx.cursor.write(&bytes)
        }
    }
}

fn write_array(
    length: &Option<Expression>,
    element: &Format,
    attr: Option<&str>,
    order: ByteOrder,
    ctx: &mut Context<'_>,
) -> Result<(), WriteError> {
    let value = require_attr(ctx, attr)?;
    let items = match value {
        Value::Array(items) => items,
        other => return Err(type_mismatch("array", &other)),
    };

    match length {
        Some(expr) => {
            let declared = ctx.resolve(expr)?.as_u64()? as usize;
            if declared != items.len() {
                return Err(WriteError::LengthMismatch {
                    attribute: attr.unwrap_or("<unnamed>").to_string(),
                    expected: declared,
                    actual: items.len(),
                });
            }
        }
        None => {
            let prefix = items.len() as u64;
            let mut bytes: Vec<u8> = (0..4).map(|i| (prefix >> (8 * i)) as u8).collect();
            if order == ByteOrder::BigEndian {
                bytes.reverse();
            }
            ctx.cursor.write(&bytes)?;
        }
    }

    for item in &items {
        let record = match item {
            Value::Record(record) => record,
            other => return Err(type_mismatch("record", other)),
        };
        let mut work = record.clone();
        let mut sub = ctx.nested(&mut work, order);
        write_block(element.directives(), &mut sub)?;
    }

    Ok(())
}

fn byte_width(width: &Size) -> Result<usize, ReadError> {
    match width.whole_bytes() {
        Some(n) => Ok(n as usize),
        None => Err(ReadError::TypeMismatch {
            expected: "byte-aligned width",
            found: width.to_string(),
        }),
    }
}

/// Sign-extends the low `bits` of `raw` to a full `i64`.
fn sign_extend(raw: u64, bits: usize) -> i64 {
    let shift = 64 - bits;
    ((raw << shift) as i64) >> shift
}

fn check_value(
    value: &Value,
    range: &Option<NumRange>,
    validator: &Option<Validator>,
    attr: Option<&str>,
) -> Result<(), ReadError> {
    if let Some(range) = range {
        if !range.contains(value.as_f64()?) {
            return Err(validation(attr));
        }
    }
    if let Some(validator) = validator {
        if !validator.accepts(value) {
            return Err(validation(attr));
        }
    }
    Ok(())
}

fn check_for_write(
    value: &Value,
    range: &Option<NumRange>,
    validator: &Option<Validator>,
    attr: Option<&str>,
) -> Result<(), WriteError> {
    check_value(value, range, validator, attr).map_err(|err| match err {
        ReadError::Validation { attribute } => WriteError::Validation { attribute },
        other => WriteError::Read(other),
    })
}

/// True when an unsigned value is representable in `n` bytes under the
/// directive's signedness.
fn fits_unsigned(v: u64, signed: bool, n: usize) -> bool {
    let value_bits = if signed { 8 * n - 1 } else { 8 * n };
    value_bits >= 64 || v < 1u64 << value_bits
}

fn fits_signed(v: i64, signed: bool, n: usize) -> bool {
    if signed {
        n >= 8 || (-(1i64 << (8 * n - 1)) <= v && v < 1i64 << (8 * n - 1))
    } else {
        v >= 0 && fits_unsigned(v as u64, false, n)
    }
}

fn write_validation(attr: Option<&str>) -> WriteError {
    WriteError::Validation {
        attribute: attr.unwrap_or("<unnamed>").to_string(),
    }
}

fn validation(attr: Option<&str>) -> ReadError {
    ReadError::Validation {
        attribute: attr.unwrap_or("<unnamed>").to_string(),
    }
}

fn type_mismatch(expected: &'static str, found: &Value) -> WriteError {
    WriteError::TypeMismatch {
        expected,
        found: found.kind_name().to_string(),
    }
}

fn require_attr(ctx: &Context<'_>, attr: Option<&str>) -> Result<Value, WriteError> {
    let name = attr.unwrap_or("<unnamed>");
    ctx.record
        .get_attr(name)
        .ok_or_else(|| WriteError::MissingAttribute(name.to_string()))
}

/// Render a magic literal for error messages: printable ASCII as text,
/// anything else as hex.
fn show_bytes(bytes: &[u8]) -> String {
    if bytes.iter().all(|b| (0x20..0x7f).contains(b)) {
        format!("'{}'", String::from_utf8_lossy(bytes))
    } else {
        let hex: Vec<String> = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        format!("0x{}", hex.join(""))
    }
}
