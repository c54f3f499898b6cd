//! # Value Objects
//!
//! Immutable identifiers and quantities shared by the engine, the ports and
//! the adapters. Every public identifier of the AVM is an element of the
//! BN254 scalar field (`Fr`).

pub use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// FIELD HELPERS
// =============================================================================

/// Returns the canonical 32-byte big-endian encoding of a field element.
#[must_use]
pub fn fr_to_be_bytes(value: &Fr) -> [u8; 32] {
    let bytes = value.into_bigint().to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}

/// Builds a field element from big-endian bytes, reducing modulo the field order.
#[must_use]
pub fn fr_from_be_bytes(bytes: &[u8]) -> Fr {
    Fr::from_be_bytes_mod_order(bytes)
}

/// Renders a field element as `0x`-prefixed, zero-padded hex.
#[must_use]
pub fn fr_to_hex(value: &Fr) -> String {
    format!("0x{}", hex::encode(fr_to_be_bytes(value)))
}

/// Parses a `0x`-prefixed (or bare) hex string of at most 32 bytes.
///
/// # Errors
///
/// Returns an error on invalid hex or when the input exceeds 32 bytes.
pub fn fr_from_hex(s: &str) -> Result<Fr, hex::FromHexError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    let padded = if digits.len() % 2 == 1 {
        format!("0{digits}")
    } else {
        digits.to_string()
    };
    let bytes = hex::decode(padded)?;
    if bytes.len() > 32 {
        return Err(hex::FromHexError::InvalidStringLength);
    }
    Ok(fr_from_be_bytes(&bytes))
}

/// Returns the low 128 bits of the canonical representative.
#[must_use]
pub fn fr_low_u128(value: &Fr) -> u128 {
    let bytes = fr_to_be_bytes(value);
    let mut low = [0u8; 16];
    low.copy_from_slice(&bytes[16..]);
    u128::from_be_bytes(low)
}

/// Serde adapter encoding a field element as a hex string.
pub mod serde_fr {
    use super::{fr_from_hex, fr_to_hex, Fr};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    /// Serialize as hex.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(value: &Fr, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&fr_to_hex(value))
    }

    /// Deserialize from hex.
    ///
    /// # Errors
    ///
    /// Fails on malformed hex.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fr, D::Error> {
        let s = String::deserialize(deserializer)?;
        fr_from_hex(&s).map_err(D::Error::custom)
    }
}

/// Serde adapter for vectors of field elements.
pub mod serde_fr_vec {
    use super::{fr_from_hex, fr_to_hex, Fr};
    use serde::{de::Error, ser::SerializeSeq, Deserialize, Deserializer, Serializer};

    /// Serialize as a list of hex strings.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(values: &[Fr], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&fr_to_hex(value))?;
        }
        seq.end()
    }

    /// Deserialize from a list of hex strings.
    ///
    /// # Errors
    ///
    /// Fails on malformed hex.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Fr>, D::Error> {
        let strings = Vec::<String>::deserialize(deserializer)?;
        strings
            .iter()
            .map(|s| fr_from_hex(s).map_err(D::Error::custom))
            .collect()
    }
}

// =============================================================================
// ADDRESS
// =============================================================================

/// Contract address (a field element).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(#[serde(with = "serde_fr")] Fr);

impl Address {
    /// Wraps a field element.
    #[must_use]
    pub const fn new(value: Fr) -> Self {
        Self(value)
    }

    /// Convenience constructor for small test addresses.
    #[must_use]
    pub fn from_u64(value: u64) -> Self {
        Self(Fr::from(value))
    }

    /// The zero address.
    #[must_use]
    pub fn zero() -> Self {
        Self(Fr::zero())
    }

    /// Returns the underlying field element.
    #[must_use]
    pub const fn to_field(&self) -> Fr {
        self.0
    }
}

impl From<Fr> for Address {
    fn from(value: Fr) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", fr_to_hex(&self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&fr_to_hex(&self.0))
    }
}

// =============================================================================
// FUNCTION SELECTOR
// =============================================================================

/// Four-byte function selector used for debug name resolution.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FunctionSelector(pub u32);

impl FunctionSelector {
    /// Truncates a field element to its low 32 bits.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_field(value: &Fr) -> Self {
        Self(fr_low_u128(value) as u32)
    }

    /// Returns the selector as a field element.
    #[must_use]
    pub fn to_field(self) -> Fr {
        Fr::from(u64::from(self.0))
    }
}

impl fmt::Debug for FunctionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FunctionSelector(0x{:08x})", self.0)
    }
}

impl fmt::Display for FunctionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

// =============================================================================
// GAS
// =============================================================================

/// One of the three independent gas budgets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GasDimension {
    /// Compute.
    L2,
    /// Data availability.
    Da,
    /// Legacy L1 budget.
    L1,
}

impl GasDimension {
    /// Name used in out-of-gas messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::L2 => "L2GAS",
            Self::Da => "DAGAS",
            Self::L1 => "L1GAS",
        }
    }
}

/// Amounts in the three gas budgets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Gas {
    /// L2 (compute) gas.
    pub l2: u64,
    /// Data-availability gas.
    pub da: u64,
    /// Legacy L1 gas.
    pub l1: u64,
}

impl Gas {
    /// Creates a gas triple.
    #[must_use]
    pub const fn new(l2: u64, da: u64, l1: u64) -> Self {
        Self { l2, da, l1 }
    }

    /// All budgets empty.
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0, 0, 0)
    }

    /// Only L2 gas.
    #[must_use]
    pub const fn l2_only(l2: u64) -> Self {
        Self::new(l2, 0, 0)
    }

    /// Returns the amount in one dimension.
    #[must_use]
    pub const fn get(&self, dimension: GasDimension) -> u64 {
        match dimension {
            GasDimension::L2 => self.l2,
            GasDimension::Da => self.da,
            GasDimension::L1 => self.l1,
        }
    }

    /// Component-wise minimum.
    #[must_use]
    pub fn min(&self, other: &Self) -> Self {
        Self::new(
            self.l2.min(other.l2),
            self.da.min(other.da),
            self.l1.min(other.l1),
        )
    }

    /// Component-wise saturating addition.
    #[must_use]
    pub const fn saturating_add(&self, other: &Self) -> Self {
        Self::new(
            self.l2.saturating_add(other.l2),
            self.da.saturating_add(other.da),
            self.l1.saturating_add(other.l1),
        )
    }

    /// Component-wise saturating subtraction (never negative).
    #[must_use]
    pub const fn saturating_sub(&self, other: &Self) -> Self {
        Self::new(
            self.l2.saturating_sub(other.l2),
            self.da.saturating_sub(other.da),
            self.l1.saturating_sub(other.l1),
        )
    }

    /// Component-wise subtraction, `None` if any budget would go negative.
    #[must_use]
    pub fn checked_sub(&self, other: &Self) -> Option<Self> {
        Some(Self::new(
            self.l2.checked_sub(other.l2)?,
            self.da.checked_sub(other.da)?,
            self.l1.checked_sub(other.l1)?,
        ))
    }

    /// First dimension in which `cost` exceeds `self`, if any.
    #[must_use]
    pub fn first_shortfall(&self, cost: &Self) -> Option<GasDimension> {
        [GasDimension::L2, GasDimension::Da, GasDimension::L1]
            .into_iter()
            .find(|d| cost.get(*d) > self.get(*d))
    }

    /// True if every budget is at least as large as in `other`.
    #[must_use]
    pub const fn covers(&self, other: &Self) -> bool {
        self.l2 >= other.l2 && self.da >= other.da && self.l1 >= other.l1
    }
}

impl fmt::Display for Gas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "l2={} da={} l1={}", self.l2, self.da, self.l1)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fr_hex_roundtrip() {
        let value = Fr::from(0xdead_beef_u64);
        let hex = fr_to_hex(&value);
        assert!(hex.starts_with("0x"));
        assert_eq!(hex.len(), 66);
        assert_eq!(fr_from_hex(&hex).unwrap(), value);
        assert_eq!(fr_from_hex("0x1").unwrap(), Fr::from(1u64));
    }

    #[test]
    fn test_fr_from_hex_rejects_oversized() {
        let too_long = format!("0x{}", "11".repeat(33));
        assert!(fr_from_hex(&too_long).is_err());
    }

    #[test]
    fn test_fr_low_u128() {
        let value = Fr::from(u128::MAX);
        assert_eq!(fr_low_u128(&value), u128::MAX);
        assert_eq!(fr_low_u128(&Fr::from(7u64)), 7);
    }

    #[test]
    fn test_address_serde_as_hex() {
        let address = Address::from_u64(42);
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"{}\"", fr_to_hex(&Fr::from(42u64))));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
    }

    #[test]
    fn test_function_selector_truncates() {
        let selector = FunctionSelector::from_field(&Fr::from(0x1_0000_0002_u64));
        assert_eq!(selector, FunctionSelector(2));
        assert_eq!(selector.to_string(), "0x00000002");
    }

    #[test]
    fn test_gas_shortfall() {
        let left = Gas::new(10, 5, 0);
        assert_eq!(left.first_shortfall(&Gas::new(10, 5, 0)), None);
        assert_eq!(
            left.first_shortfall(&Gas::new(11, 0, 0)),
            Some(GasDimension::L2)
        );
        assert_eq!(
            left.first_shortfall(&Gas::new(0, 6, 0)),
            Some(GasDimension::Da)
        );
        assert_eq!(
            left.saturating_sub(&Gas::new(20, 1, 1)),
            Gas::new(0, 4, 0)
        );
    }

    #[test]
    fn test_gas_min_and_covers() {
        let a = Gas::new(10, 2, 3);
        let b = Gas::new(4, 8, 3);
        assert_eq!(a.min(&b), Gas::new(4, 2, 3));
        assert!(a.covers(&Gas::new(10, 2, 3)));
        assert!(!a.covers(&b));
        assert_eq!(a.checked_sub(&Gas::new(1, 1, 1)), Some(Gas::new(9, 1, 2)));
        assert_eq!(a.checked_sub(&b), None);
    }
}
