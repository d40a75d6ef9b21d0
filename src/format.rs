//! Format: an immutable, ordered, reusable description of one record.

use crate::context::{ByteOrder, Context, Mode};
use crate::cursor::ByteCursor;
use crate::directive::Directive;
use crate::errors::{BuildError, ReadError, WriteError};
use crate::record::{GenericRecord, Record};
use crate::serializers;

/// Per-call decode/encode settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    /// Byte order for the top-level scope; nested directives inherit it
    /// unless they carry their own override. Defaults to big-endian.
    pub byte_order: ByteOrder,
}

impl DecodeOptions {
    pub fn little_endian() -> Self {
        DecodeOptions {
            byte_order: ByteOrder::LittleEndian,
        }
    }
}

/// An ordered, immutable list of field directives. Built once via
/// [crate::builder::FormatBuilder], then reused across arbitrarily many
/// decode calls; each call owns its own context and target record.
#[derive(Debug, Clone)]
pub struct Format {
    name: Option<String>,
    directives: Vec<Directive>,
}

impl Format {
    pub(crate) fn new(name: Option<String>, directives: Vec<Directive>) -> Self {
        Format { name, directives }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// Decodes one record from the cursor into a fresh [GenericRecord],
    /// big-endian.
    pub fn decode(&self, cursor: &mut dyn ByteCursor) -> Result<GenericRecord, ReadError> {
        self.decode_with(cursor, DecodeOptions::default())
    }

    /// Decodes one record with explicit options.
    pub fn decode_with(
        &self,
        cursor: &mut dyn ByteCursor,
        options: DecodeOptions,
    ) -> Result<GenericRecord, ReadError> {
        let mut record = GenericRecord::new();
        self.decode_into_with(cursor, &mut record, options)?;
        Ok(record)
    }

    /// Decodes into a caller-supplied target record, big-endian.
    pub fn decode_into(
        &self,
        cursor: &mut dyn ByteCursor,
        target: &mut dyn Record,
    ) -> Result<(), ReadError> {
        self.decode_into_with(cursor, target, DecodeOptions::default())
    }

    /// Decodes into a caller-supplied target record with explicit options.
    pub fn decode_into_with(
        &self,
        cursor: &mut dyn ByteCursor,
        target: &mut dyn Record,
        options: DecodeOptions,
    ) -> Result<(), ReadError> {
        let mut ctx = Context::new(target, cursor, options.byte_order, Mode::Decode);
        serializers::read_block(&self.directives, &mut ctx)
    }

    /// Encodes a record onto the cursor, big-endian.
    pub fn encode(
        &self,
        record: &dyn Record,
        cursor: &mut dyn ByteCursor,
    ) -> Result<(), WriteError> {
        self.encode_with(record, cursor, DecodeOptions::default())
    }

    /// Encodes a record with explicit options.
    ///
    /// The record is not mutated; it is cloned into a working copy so the
    /// encode pass can share the decode pass's context shape.
    pub fn encode_with(
        &self,
        record: &dyn Record,
        cursor: &mut dyn ByteCursor,
        options: DecodeOptions,
    ) -> Result<(), WriteError> {
        let mut snapshot = snapshot_record(record, &self.directives)?;
        let mut ctx = Context::new(&mut snapshot, cursor, options.byte_order, Mode::Encode);
        serializers::write_block(&self.directives, &mut ctx)
    }
}

/// Rejects duplicate attribute names within one block's scope. Every
/// block (a format's top level, an array element, a conditional branch,
/// a dispatch case) is its own scope.
pub(crate) fn check_attributes(directives: &[Directive]) -> Result<(), BuildError> {
    let mut seen: Vec<&str> = Vec::new();
    for directive in directives {
        if let Some(name) = directive.attribute.as_deref() {
            if seen.contains(&name) {
                return Err(BuildError::DuplicateAttribute(name.to_string()));
            }
            seen.push(name);
        }
    }
    Ok(())
}

/// Copies the attributes a format's directives may touch into a
/// [GenericRecord] working copy for encoding.
fn snapshot_record(
    record: &dyn Record,
    directives: &[Directive],
) -> Result<GenericRecord, ReadError> {
    let mut snapshot = GenericRecord::new();
    collect_attrs(record, directives, &mut snapshot)?;
    Ok(snapshot)
}

fn collect_attrs(
    record: &dyn Record,
    directives: &[Directive],
    out: &mut GenericRecord,
) -> Result<(), ReadError> {
    use crate::directive::Kind;
    use crate::expr::Expression;

    fn copy(record: &dyn Record, name: &str, out: &mut GenericRecord) -> Result<(), ReadError> {
        if let Some(value) = record.get_attr(name) {
            out.set_attr(name, value)?;
        }
        Ok(())
    }

    fn copy_ref(
        record: &dyn Record,
        expr: Option<&Expression>,
        out: &mut GenericRecord,
    ) -> Result<(), ReadError> {
        if let Some(Expression::FieldRef(name)) = expr {
            copy(record, name, out)?;
        }
        Ok(())
    }

    for directive in directives {
        if let Some(name) = &directive.attribute {
            copy(record, name, out)?;
        }

        match &directive.kind {
            Kind::Str { length } => copy_ref(record, length.as_ref(), out)?,
            Kind::Array { length, .. } => copy_ref(record, length.as_ref(), out)?,
            Kind::At { offset, .. } => copy_ref(record, Some(offset), out)?,
            Kind::Conditional { predicate, .. } => copy_ref(record, Some(predicate), out)?,
            Kind::Dispatch { discriminator, .. } => copy_ref(record, Some(discriminator), out)?,
            _ => {}
        }

        match &directive.kind {
            Kind::Conditional {
                then_block,
                otherwise,
                ..
            } => {
                collect_attrs(record, then_block.directives(), out)?;
                if let Some(block) = otherwise {
                    collect_attrs(record, block.directives(), out)?;
                }
            }
            Kind::At { block, .. } => collect_attrs(record, block.directives(), out)?,
            Kind::Dispatch { cases, default, .. } => {
                for (_, block) in cases {
                    collect_attrs(record, block.directives(), out)?;
                }
                if let Some(block) = default {
                    collect_attrs(record, block.directives(), out)?;
                }
            }
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FormatBuilder;
    use crate::cursor::MemCursor;
    use crate::value::Value;

    fn be32(v: u32) -> [u8; 4] {
        v.to_be_bytes()
    }

    fn le32(v: u32) -> [u8; 4] {
        v.to_le_bytes()
    }

    #[test]
    fn test_decode_primitives_big_endian() {
        let mut b = FormatBuilder::new();
        b.ubyte("version").ushort("count").uint("size").int("offset");
        let format = b.build().unwrap();

        let mut stream = vec![0x02];
        stream.extend_from_slice(&3u16.to_be_bytes());
        stream.extend_from_slice(&be32(70_000));
        stream.extend_from_slice(&(-5i32).to_be_bytes());

        let mut cursor = MemCursor::from_bytes(stream);
        let record = format.decode(&mut cursor).unwrap();

        assert_eq!(record.get("version"), Some(&Value::Unsigned(2)));
        assert_eq!(record.get("count"), Some(&Value::Unsigned(3)));
        assert_eq!(record.get("size"), Some(&Value::Unsigned(70_000)));
        assert_eq!(record.get("offset"), Some(&Value::Signed(-5)));
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_byte_is_signed_ubyte_is_unsigned() {
        let mut b = FormatBuilder::new();
        b.byte("delta").ubyte("level");
        let format = b.build().unwrap();

        let mut cursor = MemCursor::from_bytes(vec![0xFF, 0xFF]);
        let record = format.decode(&mut cursor).unwrap();

        assert_eq!(record.get("delta"), Some(&Value::Signed(-1)));
        assert_eq!(record.get("level"), Some(&Value::Unsigned(255)));
    }

    #[test]
    fn test_decode_little_endian_options() {
        let mut b = FormatBuilder::new();
        b.uint("size");
        let format = b.build().unwrap();

        let mut cursor = MemCursor::from_bytes(le32(10).to_vec());
        let record = format
            .decode_with(&mut cursor, DecodeOptions::little_endian())
            .unwrap();
        assert_eq!(record.get("size"), Some(&Value::Unsigned(10)));
    }

    #[test]
    fn test_per_directive_order_override() {
        let mut b = FormatBuilder::new();
        b.uint("big");
        b.uint("little").with_byte_order(ByteOrder::LittleEndian);
        let format = b.build().unwrap();

        let mut stream = be32(1).to_vec();
        stream.extend_from_slice(&le32(2));
        let mut cursor = MemCursor::from_bytes(stream);
        let record = format.decode(&mut cursor).unwrap();

        assert_eq!(record.get("big"), Some(&Value::Unsigned(1)));
        assert_eq!(record.get("little"), Some(&Value::Unsigned(2)));
    }

    #[test]
    fn test_decode_strings() {
        let mut b = FormatBuilder::new();
        b.string("title").ubyte("len").string_fixed("body", "len");
        let format = b.build().unwrap();

        let mut stream = b"hello\0".to_vec();
        stream.push(3);
        stream.extend_from_slice(b"abc");
        let mut cursor = MemCursor::from_bytes(stream);
        let record = format.decode(&mut cursor).unwrap();

        assert_eq!(record.get("title"), Some(&Value::Str("hello".into())));
        assert_eq!(record.get("body"), Some(&Value::Str("abc".into())));
    }

    #[test]
    fn test_array_length_from_field() {
        let mut b = FormatBuilder::new();
        b.ubyte("count").array("entries", "count", |b| {
            b.ubyte("id").ubyte("flags");
        });
        let format = b.build().unwrap();

        let mut cursor = MemCursor::from_bytes(vec![2, 10, 1, 20, 0]);
        let record = format.decode(&mut cursor).unwrap();

        let entries = match record.get("entries") {
            Some(Value::Array(items)) => items,
            other => panic!("expected array, got {:?}", other),
        };
        assert_eq!(entries.len(), 2);
        match &entries[1] {
            Value::Record(entry) => {
                assert_eq!(entry.get("id"), Some(&Value::Unsigned(20)));
                assert_eq!(entry.get("flags"), Some(&Value::Unsigned(0)));
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_array_of_mixed_numeric_elements() {
        let mut b = FormatBuilder::new();
        b.uint("count").array("pairs", "count", |b| {
            b.int("id").float("value");
        });
        let format = b.build().unwrap();

        let mut stream = be32(2).to_vec();
        stream.extend_from_slice(&7i32.to_be_bytes());
        stream.extend_from_slice(&1.5f32.to_be_bytes());
        stream.extend_from_slice(&(-7i32).to_be_bytes());
        stream.extend_from_slice(&0.25f32.to_be_bytes());

        let record = format.decode(&mut MemCursor::from_bytes(stream)).unwrap();
        let pairs = match record.get("pairs") {
            Some(Value::Array(items)) => items,
            other => panic!("expected array, got {:?}", other),
        };
        match &pairs[1] {
            Value::Record(pair) => {
                assert_eq!(pair.get("id"), Some(&Value::Signed(-7)));
                assert_eq!(pair.get("value"), Some(&Value::Float(0.25)));
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_array_with_length_prefix() {
        let mut b = FormatBuilder::new();
        b.array_prefixed("items", |b| {
            b.ubyte("v");
        });
        let format = b.build().unwrap();

        let mut stream = be32(3).to_vec();
        stream.extend_from_slice(&[7, 8, 9]);
        let mut cursor = MemCursor::from_bytes(stream);
        let record = format.decode(&mut cursor).unwrap();

        match record.get("items") {
            Some(Value::Array(items)) => assert_eq!(items.len(), 3),
            other => panic!("expected array, got {:?}", other),
        }
    }

    #[test]
    fn test_conditional_skips_bytes_when_false() {
        let mut b = FormatBuilder::new();
        b.ubyte("flag")
            .conditional("flag", |b| {
                b.uint("extra");
            })
            .ubyte("tail");
        let format = b.build().unwrap();

        // Flag set: the conditional block consumes four bytes.
        let mut on = vec![1];
        on.extend_from_slice(&be32(9));
        on.push(0xAA);
        let record = format.decode(&mut MemCursor::from_bytes(on)).unwrap();
        assert_eq!(record.get("extra"), Some(&Value::Unsigned(9)));
        assert_eq!(record.get("tail"), Some(&Value::Unsigned(0xAA)));

        // Flag clear: the block consumes nothing and assigns nothing.
        let record = format
            .decode(&mut MemCursor::from_bytes(vec![0, 0xAA]))
            .unwrap();
        assert_eq!(record.get("extra"), None);
        assert_eq!(record.get("tail"), Some(&Value::Unsigned(0xAA)));
    }

    #[test]
    fn test_group_nests_record() {
        let mut b = FormatBuilder::new();
        b.group("header", |b| {
            b.ushort("width").ushort("height");
        })
        .ubyte("depth");
        let format = b.build().unwrap();

        let mut stream = 640u16.to_be_bytes().to_vec();
        stream.extend_from_slice(&480u16.to_be_bytes());
        stream.push(24);
        let record = format.decode(&mut MemCursor::from_bytes(stream)).unwrap();

        match record.get("header") {
            Some(Value::Record(header)) => {
                assert_eq!(header.get("width"), Some(&Value::Unsigned(640)));
                assert_eq!(header.get("height"), Some(&Value::Unsigned(480)));
            }
            other => panic!("expected record, got {:?}", other),
        }
        assert_eq!(record.get("depth"), Some(&Value::Unsigned(24)));
    }

    #[test]
    fn test_at_jumps_to_absolute_offset() {
        let mut b = FormatBuilder::new();
        b.ubyte("offset").at("offset", |b| {
            b.ubyte("target");
        });
        let format = b.build().unwrap();

        let mut cursor = MemCursor::from_bytes(vec![3, 0xFF, 0xFF, 0x42]);
        let record = format.decode(&mut cursor).unwrap();
        assert_eq!(record.get("target"), Some(&Value::Unsigned(0x42)));
        assert_eq!(cursor.position(), 4);
    }

    #[test]
    fn test_dispatch_selects_case() {
        let mut b = FormatBuilder::new();
        b.ubyte("tag").dispatch("tag", |d| {
            d.case(1u64, |b| {
                b.ubyte("small");
            })
            .case(2u64, |b| {
                b.uint("large");
            })
            .default(|b| {
                b.ubyte("fallback");
            });
        });
        let format = b.build().unwrap();

        let record = format
            .decode(&mut MemCursor::from_bytes(vec![1, 5]))
            .unwrap();
        assert_eq!(record.get("small"), Some(&Value::Unsigned(5)));

        let record = format
            .decode(&mut MemCursor::from_bytes(vec![9, 7]))
            .unwrap();
        assert_eq!(record.get("fallback"), Some(&Value::Unsigned(7)));
    }

    #[test]
    fn test_dispatch_without_default_aborts() {
        let mut b = FormatBuilder::new();
        b.ubyte("tag").dispatch("tag", |d| {
            d.case(1u64, |b| {
                b.ubyte("x");
            });
        });
        let format = b.build().unwrap();

        let err = format
            .decode(&mut MemCursor::from_bytes(vec![9]))
            .unwrap_err();
        assert!(matches!(err, ReadError::UnmatchedDiscriminator(_)));
    }

    #[test]
    fn test_magic_match_leaves_cursor_past_literal() {
        let mut b = FormatBuilder::new();
        b.magic("BM");
        let format = b.build().unwrap();

        let mut cursor = MemCursor::from_bytes(b"BMrest".to_vec());
        format.decode(&mut cursor).unwrap();
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn test_magic_mismatch_aborts_decode() {
        let mut b = FormatBuilder::new();
        b.magic("BM").uint("size");
        let format = b.build().unwrap();

        let err = format
            .decode(&mut MemCursor::from_bytes(b"XY\x00\x00\x00\x01".to_vec()))
            .unwrap_err();
        assert!(matches!(err, ReadError::MagicMismatch { .. }));
    }

    #[test]
    fn test_validation_aborts_mid_decode() {
        use crate::builder::NumOptions;
        use crate::directive::NumRange;

        let mut b = FormatBuilder::new();
        b.uint_with(
            "count",
            NumOptions {
                range: Some(NumRange::new(1.0, 100.0)),
                ..Default::default()
            },
        )
        .ubyte("tail");
        let format = b.build().unwrap();

        let mut ok = be32(50).to_vec();
        ok.push(1);
        assert!(format.decode(&mut MemCursor::from_bytes(ok)).is_ok());

        let mut bad = be32(0).to_vec();
        bad.push(1);
        let err = format.decode(&mut MemCursor::from_bytes(bad)).unwrap_err();
        assert_eq!(
            err,
            ReadError::Validation {
                attribute: "count".to_string()
            }
        );
    }

    const BI_RGB: u64 = 0;
    const BI_BITFIELDS: u64 = 3;

    fn attr_u64(record: &dyn Record, name: &str) -> Result<u64, ReadError> {
        record
            .get_attr(name)
            .ok_or_else(|| ReadError::UnresolvedFieldRef(name.to_string()))?
            .as_u64()
    }

    fn color_entry(b: &mut FormatBuilder) {
        b.ubyte("blue").ubyte("green").ubyte("red").ubyte("zero");
    }

    /// Windows bitmap file header plus DIB info header: eleven numeric
    /// header fields, an optional bitfields block, a color table whose
    /// presence and length depend on the palette fields, and a jump to
    /// the pixel data.
    fn bitmap_format() -> Format {
        use crate::builder::NumOptions;
        use crate::directive::NumRange;
        use crate::expr::Expression;

        let mut b = FormatBuilder::named("bitmap");
        b.magic("BM")
            .uint("file_size")
            .uint("reserved")
            .uint("data_offset")
            .uint("header_size")
            .uint("width")
            .int("height")
            .short("planes")
            .short("bit_count")
            .uint_with(
                "compression",
                NumOptions {
                    range: Some(NumRange::new(0.0, 3.0)),
                    ..Default::default()
                },
            )
            .uint("image_size")
            .uint("x_resolution")
            .uint("y_resolution")
            .uint("colors_used")
            .uint("colors_important")
            .conditional(
                Expression::computed(|r| {
                    Ok(Value::Bool(attr_u64(r, "compression")? == BI_BITFIELDS))
                }),
                |b| {
                    b.uint("red_mask").uint("green_mask").uint("blue_mask");
                },
            )
            .conditional_else(
                Expression::computed(|r| Ok(Value::Bool(attr_u64(r, "colors_used")? == 0))),
                |b| {
                    // Without an explicit palette size, low bit depths
                    // imply a full table of 2^bit_count entries.
                    b.conditional(
                        Expression::computed(|r| {
                            Ok(Value::Bool(matches!(attr_u64(r, "bit_count")?, 1 | 4 | 8)))
                        }),
                        |b| {
                            b.array(
                                "color_table",
                                Expression::computed(|r| {
                                    Ok(Value::Unsigned(1 << attr_u64(r, "bit_count")?))
                                }),
                                color_entry,
                            );
                        },
                    );
                },
                |b| {
                    b.array("color_table", "colors_used", color_entry);
                },
            )
            .at("data_offset", |b| {
                b.dispatch("compression", |d| {
                    d.case(BI_RGB, |b| {
                        b.array(
                            "pixels",
                            Expression::computed(|r| {
                                let bits = attr_u64(r, "width")?
                                    * attr_u64(r, "height")?
                                    * attr_u64(r, "bit_count")?;
                                Ok(Value::Unsigned(bits / 8))
                            }),
                            |b| {
                                b.ubyte("value");
                            },
                        );
                    })
                    .default(|b| {
                        b.array("pixels", "image_size", |b| {
                            b.ubyte("value");
                        });
                    });
                });
            });
        b.build().unwrap()
    }

    fn bitmap_header(
        file_size: u32,
        data_offset: u32,
        bit_count: u16,
        compression: u32,
        image_size: u32,
        colors_used: u32,
    ) -> Vec<u8> {
        let mut stream = b"BM".to_vec();
        stream.extend_from_slice(&le32(file_size));
        stream.extend_from_slice(&le32(0)); // reserved
        stream.extend_from_slice(&le32(data_offset));
        stream.extend_from_slice(&le32(40)); // header_size
        stream.extend_from_slice(&le32(2)); // width
        stream.extend_from_slice(&2i32.to_le_bytes()); // height
        stream.extend_from_slice(&1u16.to_le_bytes()); // planes
        stream.extend_from_slice(&bit_count.to_le_bytes());
        stream.extend_from_slice(&le32(compression));
        stream.extend_from_slice(&le32(image_size));
        stream.extend_from_slice(&le32(2835)); // x_resolution
        stream.extend_from_slice(&le32(2835)); // y_resolution
        stream.extend_from_slice(&le32(colors_used));
        stream.extend_from_slice(&le32(0)); // colors_important
        stream
    }

    #[test]
    fn test_bitmap_uncompressed_truecolor() {
        // 2x2, 24-bit, BI_RGB: no bitfields, no color table, pixel
        // data directly at data_offset.
        let mut stream = bitmap_header(66, 54, 24, BI_RGB as u32, 12, 0);
        assert_eq!(stream.len(), 54);
        stream.extend_from_slice(&[0x10; 12]);

        let record = bitmap_format()
            .decode_with(
                &mut MemCursor::from_bytes(stream),
                DecodeOptions::little_endian(),
            )
            .unwrap();

        assert_eq!(record.get("file_size"), Some(&Value::Unsigned(66)));
        assert_eq!(record.get("height"), Some(&Value::Signed(2)));
        assert_eq!(record.get("bit_count"), Some(&Value::Signed(24)));
        assert_eq!(record.get("red_mask"), None);
        assert_eq!(record.get("color_table"), None);
        match record.get("pixels") {
            Some(Value::Array(items)) => assert_eq!(items.len(), 12),
            other => panic!("expected pixel array, got {:?}", other),
        }
    }

    #[test]
    fn test_bitmap_bitfields_with_explicit_palette() {
        // BI_BITFIELDS adds three channel masks; colors_used != 0
        // sizes the color table explicitly; the dispatch falls through
        // to the image_size-length pixel array.
        let mut stream = bitmap_header(0, 74, 8, BI_BITFIELDS as u32, 3, 2);
        stream.extend_from_slice(&le32(0x00FF_0000)); // red_mask
        stream.extend_from_slice(&le32(0x0000_FF00)); // green_mask
        stream.extend_from_slice(&le32(0x0000_00FF)); // blue_mask
        stream.extend_from_slice(&[1, 2, 3, 0]); // color_table[0]
        stream.extend_from_slice(&[4, 5, 6, 0]); // color_table[1]
        assert_eq!(stream.len(), 74);
        stream.extend_from_slice(&[0xAA, 0xBB, 0xCC]);

        let record = bitmap_format()
            .decode_with(
                &mut MemCursor::from_bytes(stream),
                DecodeOptions::little_endian(),
            )
            .unwrap();

        assert_eq!(record.get("red_mask"), Some(&Value::Unsigned(0x00FF_0000)));
        assert_eq!(record.get("blue_mask"), Some(&Value::Unsigned(0x0000_00FF)));
        let table = match record.get("color_table") {
            Some(Value::Array(items)) => items,
            other => panic!("expected color table, got {:?}", other),
        };
        assert_eq!(table.len(), 2);
        match &table[1] {
            Value::Record(entry) => {
                assert_eq!(entry.get("blue"), Some(&Value::Unsigned(4)));
                assert_eq!(entry.get("red"), Some(&Value::Unsigned(6)));
            }
            other => panic!("expected record, got {:?}", other),
        }
        match record.get("pixels") {
            Some(Value::Array(items)) => assert_eq!(items.len(), 3),
            other => panic!("expected pixel array, got {:?}", other),
        }
    }

    #[test]
    fn test_bitmap_implied_palette_from_bit_depth() {
        // 1-bit image with colors_used == 0: the palette length comes
        // from 2^bit_count.
        let mut stream = bitmap_header(0, 62, 1, BI_RGB as u32, 0, 0);
        stream.extend_from_slice(&[0, 0, 0, 0]); // color_table[0]
        stream.extend_from_slice(&[255, 255, 255, 0]); // color_table[1]
        assert_eq!(stream.len(), 62);
        // width * height * bit_count / 8 rounds down to zero bytes.

        let record = bitmap_format()
            .decode_with(
                &mut MemCursor::from_bytes(stream),
                DecodeOptions::little_endian(),
            )
            .unwrap();

        let table = match record.get("color_table") {
            Some(Value::Array(items)) => items,
            other => panic!("expected color table, got {:?}", other),
        };
        assert_eq!(table.len(), 2);
        match record.get("pixels") {
            Some(Value::Array(items)) => assert!(items.is_empty()),
            other => panic!("expected pixel array, got {:?}", other),
        }
    }

    #[test]
    fn test_bitmap_rejects_unknown_compression() {
        let stream = bitmap_header(0, 54, 24, 7, 0, 0);
        let err = bitmap_format()
            .decode_with(
                &mut MemCursor::from_bytes(stream),
                DecodeOptions::little_endian(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            ReadError::Validation {
                attribute: "compression".to_string()
            }
        );
    }

    #[test]
    fn test_roundtrip_decode_encode() {
        let mut b = FormatBuilder::new();
        b.magic("BM")
            .ubyte("count")
            .array("entries", "count", |b| {
                b.ushort("id");
            })
            .string("name");
        let format = b.build().unwrap();

        let mut stream = b"BM".to_vec();
        stream.push(2);
        stream.extend_from_slice(&10u16.to_be_bytes());
        stream.extend_from_slice(&20u16.to_be_bytes());
        stream.extend_from_slice(b"disk\0");

        let record = format
            .decode(&mut MemCursor::from_bytes(stream.clone()))
            .unwrap();

        let mut out = MemCursor::new();
        format.encode(&record, &mut out).unwrap();
        assert_eq!(out.as_bytes(), stream.as_slice());
    }

    #[test]
    fn test_encode_rejects_length_mismatch() {
        use crate::record::Record;

        let mut b = FormatBuilder::new();
        b.ubyte("count").array("entries", "count", |b| {
            b.ubyte("id");
        });
        let format = b.build().unwrap();

        let mut record = GenericRecord::new();
        record.set_attr("count", Value::Unsigned(3)).unwrap();
        record.set_attr("entries", Value::Array(vec![])).unwrap();

        let err = format.encode(&record, &mut MemCursor::new()).unwrap_err();
        assert_eq!(
            err,
            WriteError::LengthMismatch {
                attribute: "entries".to_string(),
                expected: 3,
                actual: 0
            }
        );
    }

    #[test]
    fn test_snapshot_copies_directive_and_reference_attrs() {
        use crate::record::Record;

        let mut b = FormatBuilder::new();
        b.string_fixed("body", "len");
        let format = b.build().unwrap();

        let mut record = GenericRecord::new();
        record.set_attr("len", Value::Unsigned(4)).unwrap();
        record.set_attr("body", Value::Str("disk".into())).unwrap();
        record.set_attr("unrelated", Value::Unsigned(9)).unwrap();

        let snapshot = snapshot_record(&record, format.directives()).unwrap();
        assert_eq!(snapshot.get("len"), Some(&Value::Unsigned(4)));
        assert_eq!(snapshot.get("body"), Some(&Value::Str("disk".into())));
        assert_eq!(snapshot.get("unrelated"), None);
    }

    #[test]
    fn test_encode_rejects_oversized_integer() {
        use crate::record::Record;

        let mut b = FormatBuilder::new();
        b.ushort("port");
        let format = b.build().unwrap();

        let mut record = GenericRecord::new();
        record.set_attr("port", Value::Unsigned(0x1_FFFF)).unwrap();

        let mut cursor = MemCursor::new();
        let err = format.encode(&record, &mut cursor).unwrap_err();
        assert_eq!(
            err,
            WriteError::Validation {
                attribute: "port".to_string()
            }
        );
        assert!(cursor.as_bytes().is_empty());
    }
}
