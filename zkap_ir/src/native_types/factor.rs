use crate::token::Token;
use crate::FieldElement;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// One summand of a linear combination: `coefficient · token`.
///
/// A `Number` token makes the factor a pure constant; the constant's value
/// lives in `coefficient` and the identifier mirrors it for display. Any
/// other token is a scaled reference to a signal (an argument, a gate
/// output, or the constant wire).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Factor {
    pub token: Token,
    pub coefficient: FieldElement,
}

impl Factor {
    pub fn constant(value: FieldElement) -> Factor {
        Factor { token: Token::number(value.to_string()), coefficient: value }
    }

    pub fn signal(token: Token, coefficient: FieldElement) -> Factor {
        Factor { token, coefficient }
    }

    /// A signal with coefficient one.
    pub fn unit(token: Token) -> Factor {
        Factor::signal(token, FieldElement::one())
    }

    pub fn is_constant(&self) -> bool {
        self.token.is_number()
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_constant() {
            write!(f, "{}", self.coefficient)
        } else {
            write!(f, "{}*{}", self.coefficient, self.token.identifier)
        }
    }
}

/// Merge key: every constant shares one slot, signals merge per identifier.
#[derive(Clone, PartialEq, Eq, Hash)]
enum TermKey {
    Constant,
    Signal(String),
}

impl TermKey {
    fn of(factor: &Factor) -> TermKey {
        if factor.is_constant() {
            TermKey::Constant
        } else {
            TermKey::Signal(factor.token.identifier.clone())
        }
    }
}

/// An affine combination of signals plus a constant — the currency of the
/// compiler. Its meaning is the field sum of its entries. The constructors
/// keep it collapsed: at most one constant entry, no two signal entries
/// with the same identifier, no zero coefficients.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearCombination(Vec<Factor>);

impl LinearCombination {
    pub fn empty() -> LinearCombination {
        LinearCombination(Vec::new())
    }

    pub fn single(factor: Factor) -> LinearCombination {
        LinearCombination::from_terms(vec![factor])
    }

    pub fn constant(value: FieldElement) -> LinearCombination {
        LinearCombination::single(Factor::constant(value))
    }

    pub fn unit(token: Token) -> LinearCombination {
        LinearCombination::single(Factor::unit(token))
    }

    /// Collapses an arbitrary term list into canonical form.
    pub fn from_terms(terms: Vec<Factor>) -> LinearCombination {
        let mut merged: IndexMap<TermKey, Factor> = IndexMap::new();
        for factor in terms {
            match merged.entry(TermKey::of(&factor)) {
                indexmap::map::Entry::Occupied(mut slot) => {
                    slot.get_mut().coefficient += factor.coefficient;
                }
                indexmap::map::Entry::Vacant(slot) => {
                    slot.insert(factor);
                }
            }
        }
        let collapsed = merged
            .into_iter()
            .filter(|(_, factor)| !factor.coefficient.is_zero())
            .map(|(key, factor)| match key {
                // Re-label the constant so its identifier mirrors the sum.
                TermKey::Constant => Factor::constant(factor.coefficient),
                TermKey::Signal(_) => factor,
            })
            .collect();
        LinearCombination(collapsed)
    }

    pub fn terms(&self) -> &[Factor] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `true` when no entry references a signal. The empty combination is
    /// the constant zero.
    pub fn is_const(&self) -> bool {
        self.0.iter().all(Factor::is_constant)
    }

    /// The represented value, if the combination is a pure constant.
    pub fn constant_value(&self) -> Option<FieldElement> {
        self.is_const().then(|| {
            self.0
                .iter()
                .fold(FieldElement::zero(), |acc, factor| acc + factor.coefficient)
        })
    }

    pub fn as_single(&self) -> Option<&Factor> {
        match self.0.as_slice() {
            [factor] => Some(factor),
            _ => None,
        }
    }

    /// `true` for exactly one entry with coefficient one — the shape that
    /// needs no gate of its own.
    pub fn is_unit(&self) -> bool {
        matches!(self.as_single(), Some(factor) if factor.coefficient.is_one())
    }

    /// Scales every coefficient by `scalar`.
    pub fn scale(&self, scalar: FieldElement) -> LinearCombination {
        LinearCombination::from_terms(
            self.0
                .iter()
                .map(|factor| Factor::signal(factor.token.clone(), factor.coefficient * scalar))
                .collect(),
        )
    }

    /// Distributive product. Only defined when at least one side is a pure
    /// constant; the caller materialises a multiplication gate otherwise.
    pub fn mul(&self, rhs: &LinearCombination) -> Option<LinearCombination> {
        if let Some(value) = self.constant_value() {
            Some(rhs.scale(value))
        } else {
            rhs.constant_value().map(|value| self.scale(value))
        }
    }

    /// The field inverse of a single pure-constant entry. `None` for the
    /// zero constant or anything that references a signal.
    pub fn invert(&self) -> Option<LinearCombination> {
        let value = self.constant_value()?;
        value.inverse().map(LinearCombination::constant)
    }

    /// Splits off a scalar so the remaining combination has a canonical
    /// leading coefficient of one: `self = scalar · normalized`. Signal
    /// terms sort by identifier with the constant last, and the first term's
    /// coefficient is extracted. Pure-constant combinations are returned
    /// unchanged with scalar one — the constant wire makes extraction
    /// pointless there.
    pub fn normalize(&self) -> (FieldElement, LinearCombination) {
        let mut sorted = self.0.clone();
        sorted.sort_by(|a, b| {
            (a.is_constant(), &a.token.identifier).cmp(&(b.is_constant(), &b.token.identifier))
        });
        let scalar = match sorted.first() {
            Some(leading) if !leading.is_constant() => leading.coefficient,
            _ => return (FieldElement::one(), LinearCombination(sorted)),
        };
        let inverse = match scalar.inverse() {
            Some(inverse) => inverse,
            // Zero coefficients cannot survive collapsing.
            None => FieldElement::one(),
        };
        (scalar, LinearCombination(sorted).scale(inverse))
    }

    /// Factors a common scalar out of both sides of a product:
    /// `l · r = g · l′ · r′` with `g = g_l · g_r`.
    pub fn extract_constant(
        l: &LinearCombination,
        r: &LinearCombination,
    ) -> (FieldElement, LinearCombination, LinearCombination) {
        let (g_l, l_reduced) = l.normalize();
        let (g_r, r_reduced) = r.normalize();
        (g_l * g_r, l_reduced, r_reduced)
    }

    /// A canonical digest of the term multiset: equal combinations (up to
    /// term reordering) get equal signatures. Gate identifiers and the
    /// dedup set are built from this.
    pub fn signature(&self) -> String {
        let mut sorted = self.0.clone();
        sorted.sort_by(|a, b| {
            (a.is_constant(), &a.token.identifier).cmp(&(b.is_constant(), &b.token.identifier))
        });
        let mut hasher = Sha256::new();
        for factor in &sorted {
            if factor.is_constant() {
                hasher.update([0u8]);
            } else {
                hasher.update([1u8]);
                hasher.update((factor.token.identifier.len() as u64).to_le_bytes());
                hasher.update(factor.token.identifier.as_bytes());
            }
            hasher.update(factor.coefficient.to_be_bytes());
        }
        hex::encode(hasher.finalize())[..16].to_owned()
    }
}

impl Add<&LinearCombination> for &LinearCombination {
    type Output = LinearCombination;
    fn add(self, rhs: &LinearCombination) -> LinearCombination {
        LinearCombination::from_terms(
            self.0.iter().cloned().chain(rhs.0.iter().cloned()).collect(),
        )
    }
}

impl Neg for &LinearCombination {
    type Output = LinearCombination;
    fn neg(self) -> LinearCombination {
        LinearCombination::from_terms(
            self.0
                .iter()
                .map(|factor| Factor::signal(factor.token.clone(), -factor.coefficient))
                .collect(),
        )
    }
}

impl Sub<&LinearCombination> for &LinearCombination {
    type Output = LinearCombination;
    fn sub(self, rhs: &LinearCombination) -> LinearCombination {
        self + &-rhs
    }
}

impl fmt::Display for LinearCombination {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "0");
        }
        let rendered: Vec<String> = self.0.iter().map(Factor::to_string).collect();
        write!(f, "{}", rendered.join(" + "))
    }
}

#[cfg(test)]
mod tests {
    use super::{Factor, LinearCombination};
    use crate::token::Token;
    use crate::FieldElement;
    use proptest::prelude::*;

    fn x(coefficient: u64) -> Factor {
        Factor::signal(Token::argument("x"), FieldElement::from(coefficient as u128))
    }

    fn y(coefficient: u64) -> Factor {
        Factor::signal(Token::argument("y"), FieldElement::from(coefficient as u128))
    }

    #[test]
    fn collapsing_merges_constants_and_signals() {
        let lc = LinearCombination::from_terms(vec![
            Factor::constant(FieldElement::from(5u128)),
            x(2),
            Factor::constant(FieldElement::from(7u128)),
            x(3),
        ]);
        assert_eq!(lc.len(), 2);
        let constant = lc.terms().iter().find(|f| f.is_constant()).unwrap();
        assert_eq!(constant.coefficient, FieldElement::from(12u128));
        assert_eq!(constant.token.identifier, "12");
    }

    #[test]
    fn adding_the_negation_cancels() {
        let lc = LinearCombination::from_terms(vec![x(2), y(3)]);
        assert!((&lc + &-&lc).is_empty());
    }

    #[test]
    fn mul_folds_against_constants_only() {
        let five = LinearCombination::constant(FieldElement::from(5u128));
        let affine = LinearCombination::from_terms(vec![x(2), Factor::constant(FieldElement::one())]);
        let scaled = affine.mul(&five).unwrap();
        assert_eq!(scaled.constant_value(), None);
        assert_eq!(scaled.terms()[0].coefficient, FieldElement::from(10u128));
        assert!(affine.mul(&affine).is_none());
    }

    #[test]
    fn mul_by_zero_is_empty() {
        let zero = LinearCombination::constant(FieldElement::zero());
        let affine = LinearCombination::from_terms(vec![x(2), y(3)]);
        assert!(affine.mul(&zero).unwrap().is_empty());
    }

    #[test]
    fn invert_requires_a_nonzero_constant() {
        let five = LinearCombination::constant(FieldElement::from(5u128));
        let inverse = five.invert().unwrap();
        assert_eq!(
            five.mul(&inverse).unwrap().constant_value(),
            Some(FieldElement::one())
        );
        assert!(LinearCombination::constant(FieldElement::zero()).invert().is_none());
        assert!(LinearCombination::single(x(1)).invert().is_none());
    }

    #[test]
    fn normalize_makes_the_leading_signal_monic() {
        let lc = LinearCombination::from_terms(vec![
            y(6),
            x(2),
            Factor::constant(FieldElement::from(4u128)),
        ]);
        let (scalar, reduced) = lc.normalize();
        assert_eq!(scalar, FieldElement::from(2u128));
        assert_eq!(reduced.terms()[0].token.identifier, "x");
        assert!(reduced.terms()[0].coefficient.is_one());
        assert_eq!(reduced.scale(scalar).signature(), lc.signature());
    }

    #[test]
    fn normalize_leaves_pure_constants_alone() {
        let lc = LinearCombination::constant(FieldElement::from(12u128));
        let (scalar, reduced) = lc.normalize();
        assert!(scalar.is_one());
        assert_eq!(reduced.constant_value(), Some(FieldElement::from(12u128)));
    }

    fn arb_combination() -> impl Strategy<Value = LinearCombination> {
        let term = (0usize..4, 0u64..50).prop_map(|(slot, coefficient)| {
            let names = ["x", "y", "z", "w"];
            Factor::signal(
                Token::argument(names[slot]),
                FieldElement::from(coefficient as u128),
            )
        });
        prop::collection::vec(term, 0..6).prop_map(LinearCombination::from_terms)
    }

    proptest! {
        #[test]
        fn add_commutes(a in arb_combination(), b in arb_combination()) {
            prop_assert_eq!((&a + &b).signature(), (&b + &a).signature());
        }

        #[test]
        fn add_associates(a in arb_combination(), b in arb_combination(), c in arb_combination()) {
            prop_assert_eq!((&(&a + &b) + &c).signature(), (&a + &(&b + &c)).signature());
        }

        #[test]
        fn signature_ignores_term_order(a in arb_combination(), rotation in 0usize..6) {
            let mut terms = a.terms().to_vec();
            if !terms.is_empty() {
                let len = terms.len();
                terms.rotate_left(rotation % len);
            }
            prop_assert_eq!(LinearCombination::from_terms(terms).signature(), a.signature());
        }

        #[test]
        fn distinct_combinations_get_distinct_signatures(a in arb_combination(), b in arb_combination()) {
            if a != b && !(&a - &b).is_empty() {
                prop_assert_ne!(a.signature(), b.signature());
            }
        }
    }
}
