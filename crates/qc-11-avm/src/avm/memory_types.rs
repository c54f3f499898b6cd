//! # Tagged Values
//!
//! Every memory cell carries a [`TypeTag`]. Integer values are always kept
//! reduced modulo `2^bits` of their tag; field values are elements of the
//! BN254 scalar field.

use crate::domain::value_objects::{fr_low_u128, fr_to_hex, Fr};
use crate::errors::AvmError;
use ark_ff::{Field, Zero};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

// =============================================================================
// TYPE TAG
// =============================================================================

/// Type marker attached to every memory value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum TypeTag {
    /// 1-bit unsigned integer.
    U1 = 0,
    /// 8-bit unsigned integer.
    U8 = 1,
    /// 16-bit unsigned integer.
    U16 = 2,
    /// 32-bit unsigned integer.
    U32 = 3,
    /// 64-bit unsigned integer.
    U64 = 4,
    /// 128-bit unsigned integer.
    U128 = 5,
    /// Native field element.
    Field = 6,
}

impl TypeTag {
    /// All tags in wire order.
    pub const ALL: [Self; 7] = [
        Self::U1,
        Self::U8,
        Self::U16,
        Self::U32,
        Self::U64,
        Self::U128,
        Self::Field,
    ];

    /// Decodes a wire tag byte.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::U1),
            1 => Some(Self::U8),
            2 => Some(Self::U16),
            3 => Some(Self::U32),
            4 => Some(Self::U64),
            5 => Some(Self::U128),
            6 => Some(Self::Field),
            _ => None,
        }
    }

    /// Bit width (254 for the field).
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::U1 => 1,
            Self::U8 => 8,
            Self::U16 => 16,
            Self::U32 => 32,
            Self::U64 => 64,
            Self::U128 => 128,
            Self::Field => 254,
        }
    }

    /// True for the unsigned integer tags.
    #[must_use]
    pub const fn is_integral(self) -> bool {
        !matches!(self, Self::Field)
    }

    /// Bit mask of an integral tag. The field tag yields `u128::MAX`.
    #[must_use]
    pub const fn mask(self) -> u128 {
        match self {
            Self::U128 | Self::Field => u128::MAX,
            other => (1u128 << other.bits()) - 1,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::U1 => "UINT1",
            Self::U8 => "UINT8",
            Self::U16 => "UINT16",
            Self::U32 => "UINT32",
            Self::U64 => "UINT64",
            Self::U128 => "UINT128",
            Self::Field => "FIELD",
        })
    }
}

// =============================================================================
// TAGGED VALUE
// =============================================================================

/// An unsigned integer cell.
///
/// Only built through [`TaggedValue::from_u128`] and [`TaggedValue::build`],
/// so `tag` is never `Field` and `value` always fits in `tag`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UintValue {
    tag: TypeTag,
    value: u128,
}

impl UintValue {
    /// Integer tag.
    #[must_use]
    pub const fn tag(&self) -> TypeTag {
        self.tag
    }

    /// Value, bounded by the tag modulus.
    #[must_use]
    pub const fn value(&self) -> u128 {
        self.value
    }
}

/// A memory cell's content.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaggedValue {
    /// Unsigned integer.
    Uint(UintValue),
    /// Native field element.
    Field(Fr),
}

impl Default for TaggedValue {
    fn default() -> Self {
        Self::Field(Fr::zero())
    }
}

impl TaggedValue {
    /// Builds a value of `tag` from an integer, truncating to the tag width.
    #[must_use]
    pub fn from_u128(tag: TypeTag, value: u128) -> Self {
        match tag {
            TypeTag::Field => Self::Field(Fr::from(value)),
            tag => Self::Uint(UintValue {
                tag,
                value: value & tag.mask(),
            }),
        }
    }

    /// Builds a value of `tag` from a field element, truncating integers to
    /// the low bits of the canonical representative.
    #[must_use]
    pub fn build(tag: TypeTag, value: Fr) -> Self {
        match tag {
            TypeTag::Field => Self::Field(value),
            tag => Self::from_u128(tag, fr_low_u128(&value)),
        }
    }

    /// A U1 value from a boolean.
    #[must_use]
    pub fn from_bool(value: bool) -> Self {
        Self::from_u128(TypeTag::U1, u128::from(value))
    }

    /// A U32 value.
    #[must_use]
    pub fn u32(value: u32) -> Self {
        Self::from_u128(TypeTag::U32, u128::from(value))
    }

    /// Returns the tag.
    #[must_use]
    pub const fn tag(&self) -> TypeTag {
        match self {
            Self::Uint(UintValue { tag, .. }) => *tag,
            Self::Field(_) => TypeTag::Field,
        }
    }

    /// Lifts the value into the field.
    #[must_use]
    pub fn to_field(&self) -> Fr {
        match self {
            Self::Uint(UintValue { value, .. }) => Fr::from(*value),
            Self::Field(f) => *f,
        }
    }

    /// Integer value (low 128 bits of a field element).
    #[must_use]
    pub fn to_u128(&self) -> u128 {
        match self {
            Self::Uint(UintValue { value, .. }) => *value,
            Self::Field(f) => fr_low_u128(f),
        }
    }

    /// Low 32 bits of the value, used for offsets and sizes.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_u32(&self) -> u32 {
        self.to_u128() as u32
    }

    /// True if the value is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Uint(UintValue { value, .. }) => *value == 0,
            Self::Field(f) => f.is_zero(),
        }
    }

    /// Truncating conversion to another tag.
    #[must_use]
    pub fn cast(&self, tag: TypeTag) -> Self {
        match self {
            Self::Uint(UintValue { value, .. }) => Self::from_u128(tag, *value),
            Self::Field(f) => Self::build(tag, *f),
        }
    }

    // -------------------------------------------------------------------------
    // Arithmetic
    // -------------------------------------------------------------------------

    /// Addition, wrapping for integers.
    #[must_use]
    pub fn add(&self, rhs: &Self) -> Self {
        match self {
            Self::Uint(UintValue { tag, value }) => {
                Self::from_u128(*tag, value.wrapping_add(rhs.to_u128()))
            }
            Self::Field(a) => Self::Field(*a + rhs.to_field()),
        }
    }

    /// Subtraction, wrapping for integers.
    #[must_use]
    pub fn sub(&self, rhs: &Self) -> Self {
        match self {
            Self::Uint(UintValue { tag, value }) => {
                Self::from_u128(*tag, value.wrapping_sub(rhs.to_u128()))
            }
            Self::Field(a) => Self::Field(*a - rhs.to_field()),
        }
    }

    /// Multiplication, wrapping for integers.
    #[must_use]
    pub fn mul(&self, rhs: &Self) -> Self {
        match self {
            Self::Uint(UintValue { tag, value }) => {
                Self::from_u128(*tag, value.wrapping_mul(rhs.to_u128()))
            }
            Self::Field(a) => Self::Field(*a * rhs.to_field()),
        }
    }

    /// Integer division, rounding toward zero.
    ///
    /// # Errors
    ///
    /// `DivisionByZero` on a zero divisor, `InvalidTag` for field operands.
    pub fn div(&self, rhs: &Self) -> Result<Self, AvmError> {
        match self {
            Self::Uint(UintValue { tag, value }) => {
                let divisor = rhs.to_u128();
                if divisor == 0 {
                    return Err(AvmError::DivisionByZero);
                }
                Ok(Self::from_u128(*tag, value / divisor))
            }
            Self::Field(_) => Err(AvmError::InvalidTag {
                tag: TypeTag::Field,
            }),
        }
    }

    /// Field division (multiplication by the inverse).
    ///
    /// # Errors
    ///
    /// `DivisionByZero` on a zero divisor, `InvalidTag` for integer operands.
    pub fn fdiv(&self, rhs: &Self) -> Result<Self, AvmError> {
        match self {
            Self::Field(a) => {
                let inverse = rhs.to_field().inverse().ok_or(AvmError::DivisionByZero)?;
                Ok(Self::Field(*a * inverse))
            }
            Self::Uint(UintValue { tag, .. }) => Err(AvmError::InvalidTag { tag: *tag }),
        }
    }

    // -------------------------------------------------------------------------
    // Comparison
    // -------------------------------------------------------------------------

    /// Equality of values.
    #[must_use]
    pub fn equals(&self, rhs: &Self) -> bool {
        match self {
            Self::Uint(UintValue { value, .. }) => *value == rhs.to_u128(),
            Self::Field(a) => *a == rhs.to_field(),
        }
    }

    /// Strict less-than on canonical representatives.
    #[must_use]
    pub fn lt(&self, rhs: &Self) -> bool {
        match self {
            Self::Uint(UintValue { value, .. }) => *value < rhs.to_u128(),
            Self::Field(a) => *a < rhs.to_field(),
        }
    }

    /// Less-than-or-equal on canonical representatives.
    #[must_use]
    pub fn lte(&self, rhs: &Self) -> bool {
        match self {
            Self::Uint(UintValue { value, .. }) => *value <= rhs.to_u128(),
            Self::Field(a) => *a <= rhs.to_field(),
        }
    }

    // -------------------------------------------------------------------------
    // Bitwise
    // -------------------------------------------------------------------------

    fn integral(&self) -> Result<(TypeTag, u128), AvmError> {
        match self {
            Self::Uint(UintValue { tag, value }) => Ok((*tag, *value)),
            Self::Field(_) => Err(AvmError::InvalidTag {
                tag: TypeTag::Field,
            }),
        }
    }

    /// Bitwise AND.
    ///
    /// # Errors
    ///
    /// `InvalidTag` for field operands.
    pub fn and(&self, rhs: &Self) -> Result<Self, AvmError> {
        let (tag, a) = self.integral()?;
        Ok(Self::from_u128(tag, a & rhs.to_u128()))
    }

    /// Bitwise OR.
    ///
    /// # Errors
    ///
    /// `InvalidTag` for field operands.
    pub fn or(&self, rhs: &Self) -> Result<Self, AvmError> {
        let (tag, a) = self.integral()?;
        Ok(Self::from_u128(tag, a | rhs.to_u128()))
    }

    /// Bitwise XOR.
    ///
    /// # Errors
    ///
    /// `InvalidTag` for field operands.
    pub fn xor(&self, rhs: &Self) -> Result<Self, AvmError> {
        let (tag, a) = self.integral()?;
        Ok(Self::from_u128(tag, a ^ rhs.to_u128()))
    }

    /// Bitwise complement within the tag width.
    ///
    /// # Errors
    ///
    /// `InvalidTag` for field operands.
    pub fn not(&self) -> Result<Self, AvmError> {
        let (tag, a) = self.integral()?;
        Ok(Self::from_u128(tag, !a))
    }

    /// Left shift; shifting by the bit width or more yields zero.
    ///
    /// # Errors
    ///
    /// `InvalidTag` for field operands.
    pub fn shl(&self, rhs: &Self) -> Result<Self, AvmError> {
        let (tag, a) = self.integral()?;
        let shift = rhs.to_u128();
        if shift >= u128::from(tag.bits()) {
            return Ok(Self::from_u128(tag, 0));
        }
        // shift < 128 here
        #[allow(clippy::cast_possible_truncation)]
        let shifted = a << (shift as u32);
        Ok(Self::from_u128(tag, shifted))
    }

    /// Logical right shift; shifting by the bit width or more yields zero.
    ///
    /// # Errors
    ///
    /// `InvalidTag` for field operands.
    pub fn shr(&self, rhs: &Self) -> Result<Self, AvmError> {
        let (tag, a) = self.integral()?;
        let shift = rhs.to_u128();
        if shift >= u128::from(tag.bits()) {
            return Ok(Self::from_u128(tag, 0));
        }
        #[allow(clippy::cast_possible_truncation)]
        let shifted = a >> (shift as u32);
        Ok(Self::from_u128(tag, shifted))
    }
}

impl fmt::Debug for TaggedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uint(UintValue { tag, value }) => write!(f, "{tag}({value})"),
            Self::Field(v) => write!(f, "FIELD({})", fr_to_hex(v)),
        }
    }
}

impl fmt::Display for TaggedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Serialize for TaggedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TaggedValue", 2)?;
        state.serialize_field("tag", &self.tag())?;
        state.serialize_field("value", &fr_to_hex(&self.to_field()))?;
        state.end()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn u8v(v: u128) -> TaggedValue {
        TaggedValue::from_u128(TypeTag::U8, v)
    }

    #[test]
    fn test_integer_cells_stay_within_tag() {
        match TaggedValue::from_u128(TypeTag::U8, 300) {
            TaggedValue::Uint(uint) => {
                assert_eq!(uint.tag(), TypeTag::U8);
                assert_eq!(uint.value(), 44);
            }
            TaggedValue::Field(_) => panic!("U8 built a field cell"),
        }
        assert!(matches!(
            TaggedValue::from_u128(TypeTag::Field, 300),
            TaggedValue::Field(_)
        ));
        match TaggedValue::build(TypeTag::U16, Fr::from(0x1_2345u64)) {
            TaggedValue::Uint(uint) => assert_eq!(uint.value(), 0x2345),
            TaggedValue::Field(_) => panic!("U16 built a field cell"),
        }
    }

    #[test]
    fn test_from_u128_masks() {
        assert_eq!(u8v(0x1ff), u8v(0xff));
        assert_eq!(TaggedValue::from_u128(TypeTag::U1, 3).to_u128(), 1);
        assert_eq!(
            TaggedValue::from_u128(TypeTag::U128, u128::MAX).to_u128(),
            u128::MAX
        );
    }

    #[test]
    fn test_uninitialized_is_field_zero() {
        let value = TaggedValue::default();
        assert_eq!(value.tag(), TypeTag::Field);
        assert!(value.is_zero());
    }

    #[test]
    fn test_integer_arithmetic_wraps() {
        assert_eq!(u8v(200).add(&u8v(100)), u8v(44));
        assert_eq!(u8v(1).sub(&u8v(2)), u8v(255));
        assert_eq!(u8v(16).mul(&u8v(17)), u8v(16));
        let big = TaggedValue::from_u128(TypeTag::U128, u128::MAX);
        assert_eq!(
            big.add(&TaggedValue::from_u128(TypeTag::U128, 2)).to_u128(),
            1
        );
    }

    #[test]
    fn test_field_arithmetic() {
        let a = TaggedValue::Field(Fr::from(5u64));
        let b = TaggedValue::Field(Fr::from(7u64));
        assert_eq!(a.add(&b), TaggedValue::Field(Fr::from(12u64)));
        assert_eq!(b.sub(&a), TaggedValue::Field(Fr::from(2u64)));
        // 5 - 7 wraps around the field modulus
        assert_eq!(a.sub(&b), TaggedValue::Field(-Fr::from(2u64)));
    }

    #[test]
    fn test_div_rounds_down_and_rejects_zero() {
        assert_eq!(u8v(7).div(&u8v(2)).unwrap(), u8v(3));
        assert_eq!(u8v(7).div(&u8v(0)), Err(AvmError::DivisionByZero));
    }

    #[test]
    fn test_div_rejects_field() {
        let a = TaggedValue::Field(Fr::from(6u64));
        assert_eq!(
            a.div(&a),
            Err(AvmError::InvalidTag {
                tag: TypeTag::Field
            })
        );
    }

    #[test]
    fn test_fdiv_is_exact_inverse() {
        let a = TaggedValue::Field(Fr::from(10u64));
        let b = TaggedValue::Field(Fr::from(4u64));
        let q = a.fdiv(&b).unwrap();
        assert_eq!(q.mul(&b), a);
        assert_eq!(
            a.fdiv(&TaggedValue::Field(Fr::zero())),
            Err(AvmError::DivisionByZero)
        );
        assert!(u8v(1).fdiv(&u8v(1)).is_err());
    }

    #[test]
    fn test_comparisons() {
        assert!(u8v(1).lt(&u8v(2)));
        assert!(!u8v(2).lt(&u8v(2)));
        assert!(u8v(2).lte(&u8v(2)));
        let minus_one = TaggedValue::Field(-Fr::from(1u64));
        let one = TaggedValue::Field(Fr::from(1u64));
        // p - 1 is the largest representative
        assert!(one.lt(&minus_one));
        assert!(one.equals(&one));
    }

    #[test]
    fn test_bitwise_and_shifts() {
        assert_eq!(u8v(0b1100).and(&u8v(0b1010)).unwrap(), u8v(0b1000));
        assert_eq!(u8v(0b1100).or(&u8v(0b1010)).unwrap(), u8v(0b1110));
        assert_eq!(u8v(0b1100).xor(&u8v(0b1010)).unwrap(), u8v(0b0110));
        assert_eq!(u8v(0).not().unwrap(), u8v(255));
        assert_eq!(u8v(0x81).shl(&u8v(1)).unwrap(), u8v(0x02));
        assert_eq!(u8v(0x81).shr(&u8v(7)).unwrap(), u8v(1));
        assert_eq!(u8v(0xff).shl(&u8v(8)).unwrap(), u8v(0));
        assert_eq!(u8v(0xff).shr(&u8v(200)).unwrap(), u8v(0));
    }

    #[test]
    fn test_bitwise_rejects_field() {
        let f = TaggedValue::Field(Fr::from(1u64));
        assert!(f.and(&f).is_err());
        assert!(f.not().is_err());
        assert!(f.shl(&f).is_err());
    }

    #[test]
    fn test_cast_truncates() {
        let wide = TaggedValue::from_u128(TypeTag::U32, 0x1234_5678);
        assert_eq!(wide.cast(TypeTag::U8), u8v(0x78));
        assert_eq!(
            wide.cast(TypeTag::Field),
            TaggedValue::Field(Fr::from(0x1234_5678u64))
        );
        let minus_one = TaggedValue::Field(-Fr::from(1u64));
        // p - 1 is even, so its low bit is zero
        assert_eq!(minus_one.cast(TypeTag::U1).to_u128(), 0);
    }

    #[test]
    fn test_tag_wire_values() {
        for (i, tag) in TypeTag::ALL.iter().enumerate() {
            assert_eq!(TypeTag::from_u8(u8::try_from(i).unwrap()), Some(*tag));
        }
        assert_eq!(TypeTag::from_u8(7), None);
    }

    #[test]
    fn test_serialize_tagged_value() {
        let json = serde_json::to_value(u8v(3)).unwrap();
        assert_eq!(json["tag"], "U8");
        assert!(json["value"].as_str().unwrap().ends_with("03"));
    }
}
