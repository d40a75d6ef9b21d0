//! Sizes with an explicit unit, used for field widths and lengths.
//!
//! A [Size] is a non-negative magnitude plus a unit. Arithmetic and
//! comparison normalize to bits, so `8u64.bits() == 1u64.bytes()` holds and
//! adding two sizes always produces a bit-unit result.

use std::fmt;
use std::ops::Add;

/// Unit of a [Size]. Conversion factors to bits are 1, 8, 8·1024,
/// 8·1024², 8·1024³, and 8·1024⁴ respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Bit,
    Byte,
    Kb,
    Mb,
    Gb,
    Tb,
}

impl Unit {
    /// Number of bits in one of this unit.
    pub fn factor(self) -> u64 {
        match self {
            Unit::Bit => 1,
            Unit::Byte => 8,
            Unit::Kb => 8 * 1024,
            Unit::Mb => 8 * 1024 * 1024,
            Unit::Gb => 8 * 1024 * 1024 * 1024,
            Unit::Tb => 8 * 1024 * 1024 * 1024 * 1024,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Unit::Bit => "bit",
            Unit::Byte => "byte",
            Unit::Kb => "kb",
            Unit::Mb => "mb",
            Unit::Gb => "gb",
            Unit::Tb => "tb",
        }
    }
}

/// An immutable magnitude-plus-unit value.
#[derive(Debug, Clone, Copy)]
pub struct Size {
    magnitude: u64,
    unit: Unit,
}

impl Size {
    pub fn new(magnitude: u64, unit: Unit) -> Self {
        Size { magnitude, unit }
    }

    pub fn bits(magnitude: u64) -> Self {
        Size::new(magnitude, Unit::Bit)
    }

    pub fn bytes(magnitude: u64) -> Self {
        Size::new(magnitude, Unit::Byte)
    }

    pub fn magnitude(&self) -> u64 {
        self.magnitude
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// Total number of bits this size spans, saturating at `u64::MAX`.
    pub fn to_bits(&self) -> u64 {
        self.magnitude.saturating_mul(self.unit.factor())
    }

    /// Converts to the given unit as a floating value: bits / factor.
    pub fn to_unit(&self, unit: Unit) -> f64 {
        self.to_bits() as f64 / unit.factor() as f64
    }

    /// Byte count when the bit total is byte-aligned, `None` otherwise.
    pub fn whole_bytes(&self) -> Option<u64> {
        let bits = self.to_bits();
        if bits % 8 == 0 { Some(bits / 8) } else { None }
    }
}

impl PartialEq for Size {
    fn eq(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl Eq for Size {}

impl Add for Size {
    type Output = Size;

    /// Addition always normalizes to bits, saturating at `u64::MAX`.
    fn add(self, other: Size) -> Size {
        Size::bits(self.to_bits().saturating_add(other.to_bits()))
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.magnitude, self.unit.label())
    }
}

/// Size constructors on unsigned integers: `4u64.bytes()`, `5u64.bits()`, `1u64.kb()`.
pub trait SizeExt {
    fn bits(self) -> Size;
    fn bytes(self) -> Size;
    fn kb(self) -> Size;
    fn mb(self) -> Size;
    fn gb(self) -> Size;
    fn tb(self) -> Size;
}

impl SizeExt for u64 {
    fn bits(self) -> Size {
        Size::new(self, Unit::Bit)
    }

    fn bytes(self) -> Size {
        Size::new(self, Unit::Byte)
    }

    fn kb(self) -> Size {
        Size::new(self, Unit::Kb)
    }

    fn mb(self) -> Size {
        Size::new(self, Unit::Mb)
    }

    fn gb(self) -> Size {
        Size::new(self, Unit::Gb)
    }

    fn tb(self) -> Size {
        Size::new(self, Unit::Tb)
    }
}
