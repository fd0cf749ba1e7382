use ark_ff::{BigInteger, Field, PrimeField};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// An element of the prime field selected by the crate features.
///
/// The wrapper keeps the rest of the workspace independent of the concrete
/// ark curve: everything downstream talks in terms of this type and the
/// operations below.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct FieldElement<F: PrimeField>(F);

impl<F: PrimeField> Default for FieldElement<F> {
    fn default() -> Self {
        FieldElement::zero()
    }
}

impl<F: PrimeField> std::fmt::Display for FieldElement<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        // Canonical decimal of the reduced representative. This is what
        // `try_from_str` accepts, so printing and parsing round-trip.
        write!(f, "{}", self.to_big_uint())
    }
}

impl<F: PrimeField> std::fmt::Debug for FieldElement<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl<F: PrimeField> Hash for FieldElement<F> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write(&self.to_be_bytes());
    }
}

impl<F: PrimeField> PartialOrd for FieldElement<F> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<F: PrimeField> Ord for FieldElement<F> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Fixed-width big-endian bytes compare like the integers they encode.
        self.to_be_bytes().cmp(&other.to_be_bytes())
    }
}

impl<F: PrimeField> Serialize for FieldElement<F> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de, F: PrimeField> Deserialize<'de> for FieldElement<F> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s: std::borrow::Cow<'de, str> = Deserialize::deserialize(deserializer)?;
        FieldElement::from_hex(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid hex for field element: {s}")))
    }
}

impl<F: PrimeField> From<u128> for FieldElement<F> {
    fn from(a: u128) -> FieldElement<F> {
        FieldElement(F::from(a))
    }
}

impl<F: PrimeField> From<usize> for FieldElement<F> {
    fn from(a: usize) -> FieldElement<F> {
        FieldElement::from(a as u128)
    }
}

impl<F: PrimeField> From<u32> for FieldElement<F> {
    fn from(a: u32) -> FieldElement<F> {
        FieldElement::from(a as u128)
    }
}

impl<F: PrimeField> From<i128> for FieldElement<F> {
    fn from(a: i128) -> FieldElement<F> {
        let abs = FieldElement::from(a.unsigned_abs());
        if a < 0 {
            -abs
        } else {
            abs
        }
    }
}

impl<F: PrimeField> From<bool> for FieldElement<F> {
    fn from(boolean: bool) -> FieldElement<F> {
        if boolean {
            FieldElement::one()
        } else {
            FieldElement::zero()
        }
    }
}

impl<F: PrimeField> FieldElement<F> {
    pub fn zero() -> FieldElement<F> {
        FieldElement(F::zero())
    }

    pub fn one() -> FieldElement<F> {
        FieldElement(F::one())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.0.is_one()
    }

    /// Parses a decimal or `0x`-prefixed hex literal, reducing modulo the
    /// field order. Returns `None` for anything else.
    pub fn try_from_str(input: &str) -> Option<FieldElement<F>> {
        if input.is_empty() {
            return None;
        }
        if input.starts_with("0x") {
            return FieldElement::from_hex(input);
        }
        let value = BigUint::parse_bytes(input.as_bytes(), 10)?;
        Some(FieldElement::from_be_bytes_reduce(&value.to_bytes_be()))
    }

    pub fn from_hex(hex_str: &str) -> Option<FieldElement<F>> {
        let value = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        // Pad to an even number of nibbles so `hex::decode` accepts it.
        let padded = if value.len() % 2 == 0 {
            value.to_owned()
        } else {
            format!("0{value}")
        };
        let decoded = hex::decode(padded).ok()?;
        Some(FieldElement::from_be_bytes_reduce(&decoded))
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.to_be_bytes())
    }

    /// Converts bytes into a field element, reducing modulo the field order.
    pub fn from_be_bytes_reduce(bytes: &[u8]) -> FieldElement<F> {
        FieldElement(F::from_be_bytes_mod_order(bytes))
    }

    /// Fixed-width big-endian bytes of the reduced representative.
    pub fn to_be_bytes(self) -> Vec<u8> {
        self.0.into_bigint().to_bytes_be()
    }

    pub fn to_big_uint(self) -> BigUint {
        BigUint::from_bytes_be(&self.to_be_bytes())
    }

    /// The field modulus as a big integer.
    pub fn modulus() -> BigUint {
        BigUint::from_bytes_be(&F::MODULUS.to_bytes_be())
    }

    /// The number of bits needed to represent an arbitrary field element.
    pub fn max_num_bits() -> u32 {
        F::MODULUS_BIT_SIZE
    }

    /// The number of bits needed to represent this particular element.
    pub fn num_bits(&self) -> u32 {
        self.to_big_uint().bits() as u32
    }

    /// `2^exponent` as a field element; the scalar ladder for bit
    /// decompositions.
    pub fn pow2(exponent: u32) -> FieldElement<F> {
        let shifted = BigUint::one() << exponent;
        FieldElement::from_be_bytes_reduce(&shifted.to_bytes_be())
    }

    /// The multiplicative inverse, or `None` for zero.
    pub fn inverse(&self) -> Option<FieldElement<F>> {
        self.0.inverse().map(FieldElement)
    }

    pub fn fits_in_u128(&self) -> bool {
        self.num_bits() <= 128
    }

    pub fn to_u128(self) -> u128 {
        let bytes = self.to_be_bytes();
        let mut limb = [0u8; 16];
        let tail = &bytes[bytes.len().saturating_sub(16)..];
        limb[16 - tail.len()..].copy_from_slice(tail);
        u128::from_be_bytes(limb)
    }

    pub fn try_to_u64(&self) -> Option<u64> {
        (self.num_bits() <= 64).then(|| self.to_u128() as u64)
    }
}

impl<F: PrimeField> Neg for FieldElement<F> {
    type Output = FieldElement<F>;

    fn neg(self) -> Self::Output {
        FieldElement(-self.0)
    }
}

impl<F: PrimeField> Add for FieldElement<F> {
    type Output = FieldElement<F>;
    fn add(self, rhs: FieldElement<F>) -> Self::Output {
        FieldElement(self.0 + rhs.0)
    }
}

impl<F: PrimeField> AddAssign for FieldElement<F> {
    fn add_assign(&mut self, rhs: FieldElement<F>) {
        self.0 += rhs.0;
    }
}

impl<F: PrimeField> Sub for FieldElement<F> {
    type Output = FieldElement<F>;
    fn sub(self, rhs: FieldElement<F>) -> Self::Output {
        FieldElement(self.0 - rhs.0)
    }
}

impl<F: PrimeField> SubAssign for FieldElement<F> {
    fn sub_assign(&mut self, rhs: FieldElement<F>) {
        self.0 -= rhs.0;
    }
}

impl<F: PrimeField> Mul for FieldElement<F> {
    type Output = FieldElement<F>;
    fn mul(self, rhs: FieldElement<F>) -> Self::Output {
        FieldElement(self.0 * rhs.0)
    }
}

impl<F: PrimeField> Div for FieldElement<F> {
    type Output = FieldElement<F>;
    fn div(self, rhs: FieldElement<F>) -> Self::Output {
        // Division by zero yields zero; callers that care check first.
        match rhs.inverse() {
            Some(inv) => self * inv,
            None => FieldElement::zero(),
        }
    }
}

#[cfg(all(test, feature = "bn254"))]
mod tests {
    use super::FieldElement;

    type Fe = FieldElement<ark_bn254::Fr>;

    #[test]
    fn parses_decimal_and_hex() {
        let a = Fe::try_from_str("255").unwrap();
        let b = Fe::try_from_str("0xff").unwrap();
        assert_eq!(a, b);
        assert!(Fe::try_from_str("").is_none());
        assert!(Fe::try_from_str("12abc").is_none());
    }

    #[test]
    fn display_round_trips_through_parsing() {
        let a = Fe::from(123456789u128);
        assert_eq!(Fe::try_from_str(&a.to_string()).unwrap(), a);
    }

    #[test]
    fn negative_values_reduce() {
        let minus_two = Fe::from(-2i128);
        assert_eq!(minus_two + Fe::from(2u128), Fe::zero());
    }

    #[test]
    fn inverse_of_zero_is_none() {
        assert!(Fe::zero().inverse().is_none());
        let a = Fe::from(7u128);
        assert_eq!(a * a.inverse().unwrap(), Fe::one());
    }

    #[test]
    fn pow2_ladder_doubles() {
        let mut acc = Fe::one();
        for i in 0..10 {
            assert_eq!(Fe::pow2(i), acc);
            acc = acc + acc;
        }
    }

    #[test]
    fn order_matches_integer_order() {
        assert!(Fe::from(3u128) < Fe::from(10u128));
        assert!(Fe::from(-1i128) > Fe::from(10u128));
    }

    #[test]
    fn max_num_bits_is_modulus_bit_length() {
        assert_eq!(Fe::max_num_bits(), 254);
    }

    #[test]
    fn u64_conversion_guards_width() {
        assert_eq!(Fe::from(42u128).try_to_u64(), Some(42));
        assert_eq!(Fe::from(-1i128).try_to_u64(), None);
    }
}
