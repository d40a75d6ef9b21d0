//! Per-decode execution state.

use crate::cursor::ByteCursor;
use crate::errors::ReadError;
use crate::expr::Expression;
use crate::record::Record;
use crate::value::Value;

/// Byte order for multi-byte numeric fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    BigEndian,
    LittleEndian,
}

/// Direction of the current pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Decode,
    Encode,
}

/// Execution state for one decode or encode pass: the target record, the
/// stream cursor, and the inherited byte order.
///
/// Nested decoding (array elements, groups) builds a child context that
/// shares the cursor but targets a fresh record, so a sub-structure's
/// fields are not visible to its siblings.
pub struct Context<'a> {
    pub record: &'a mut dyn Record,
    pub cursor: &'a mut dyn ByteCursor,
    pub byte_order: ByteOrder,
    pub mode: Mode,
}

impl<'a> Context<'a> {
    pub fn new(
        record: &'a mut dyn Record,
        cursor: &'a mut dyn ByteCursor,
        byte_order: ByteOrder,
        mode: Mode,
    ) -> Self {
        Context {
            record,
            cursor,
            byte_order,
            mode,
        }
    }

    /// Resolves an expression against the record under construction.
    pub fn resolve(&self, expr: &Expression) -> Result<Value, ReadError> {
        expr.eval(&*self.record)
    }

    /// Byte order for a directive: its own override, or the inherited one.
    pub fn order_for(&self, byte_order: Option<ByteOrder>) -> ByteOrder {
        byte_order.unwrap_or(self.byte_order)
    }

    /// Child context over the same cursor with a fresh target record.
    pub fn nested<'b>(
        &'b mut self,
        record: &'b mut dyn Record,
        byte_order: ByteOrder,
    ) -> Context<'b> {
        Context {
            record,
            cursor: &mut *self.cursor,
            byte_order,
            mode: self.mode,
        }
    }

    /// Child context over the same cursor and the same record, used for
    /// blocks that decode in place (conditionals, dispatch cases, `at`).
    pub fn in_place<'b>(&'b mut self, byte_order: ByteOrder) -> Context<'b> {
        Context {
            record: &mut *self.record,
            cursor: &mut *self.cursor,
            byte_order,
            mode: self.mode,
        }
    }
}
