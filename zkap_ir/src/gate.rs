use crate::native_types::LinearCombination;
use crate::token::Token;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// The compiler's unit of nonlinearity; each gate becomes exactly one row
/// of the emitted constraint matrices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateKind {
    Multiplication,
    Addition,
    Equality,
    ZeroOrOne,
    SumCheck,
    ScalarBaseMultiply,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    pub kind: GateKind,
    /// Content-derived name; doubles as the dedup key and, for gates that
    /// produce one, the name of the output signal.
    pub identifier: String,
    pub left: LinearCombination,
    pub right: LinearCombination,
    pub output: LinearCombination,
    pub exponent: LinearCombination,
    /// The signal a bit-decomposition gate talks about.
    pub representative: Option<Token>,
    /// Set for gates that assert without extending the witness.
    pub no_new_output: bool,
}

impl Gate {
    fn blank(kind: GateKind, identifier: String) -> Gate {
        Gate {
            kind,
            identifier,
            left: LinearCombination::empty(),
            right: LinearCombination::empty(),
            output: LinearCombination::empty(),
            exponent: LinearCombination::empty(),
            representative: None,
            no_new_output: false,
        }
    }

    /// `⟨left,w⟩ · ⟨right,w⟩ = output`. The identifier hashes the *sorted*
    /// pair of side signatures, so the two orders of the same product
    /// collapse onto one gate.
    pub fn multiplication(left: LinearCombination, right: LinearCombination) -> Gate {
        let mut sides = [left.signature(), right.signature()];
        sides.sort();
        let identifier = tagged_digest("mul", &sides);
        let mut gate = Gate::blank(GateKind::Multiplication, identifier.clone());
        gate.output = LinearCombination::unit(Token::argument(identifier));
        gate.left = left;
        gate.right = right;
        gate
    }

    /// The division form of a multiplication gate:
    /// `quotient · divisor = dividend`, with the quotient as the fresh
    /// output riding on the left wire. Dividend and divisor hash in order —
    /// `a/b` and `b/a` are different gates.
    pub fn division(dividend: LinearCombination, divisor: LinearCombination) -> Gate {
        let identifier = tagged_digest("div", &[dividend.signature(), divisor.signature()]);
        let mut gate = Gate::blank(GateKind::Multiplication, identifier.clone());
        gate.left = LinearCombination::unit(Token::argument(identifier));
        gate.right = divisor;
        gate.output = dividend;
        gate
    }

    /// Materialises a multi-term combination as a named signal:
    /// `⟨summands,w⟩ = output`.
    pub fn addition(summands: LinearCombination) -> Gate {
        let identifier = summands.signature();
        let mut gate = Gate::blank(GateKind::Addition, identifier.clone());
        gate.output = LinearCombination::unit(Token::argument(identifier));
        gate.left = summands;
        gate
    }

    /// Asserts two combinations are equal; extends nothing.
    pub fn equality(left: LinearCombination, right: LinearCombination) -> Gate {
        let mut sides = [left.signature(), right.signature()];
        sides.sort();
        let identifier = tagged_digest("eq", &sides);
        let mut gate = Gate::blank(GateKind::Equality, identifier);
        gate.left = left;
        gate.right = right;
        gate.no_new_output = true;
        gate
    }

    /// `(o − 1) · o = 0` for bit `bit_index` of the signal `of`. Named
    /// index-first to keep bit names collision-free.
    pub fn zero_or_one(bit_index: usize, of: Token) -> Gate {
        let identifier = format!("{bit_index}{}", of.identifier);
        let mut gate = Gate::blank(GateKind::ZeroOrOne, identifier);
        gate.representative = Some(of);
        gate
    }

    /// Asserts `Σ 2^i · bit_i = of`; extends nothing.
    pub fn sum_check(sum: LinearCombination, of: Token) -> Gate {
        let identifier = tagged_digest("sum", &[of.identifier.clone()]);
        let mut gate = Gate::blank(GateKind::SumCheck, identifier);
        gate.left = sum;
        gate.representative = Some(of);
        gate.no_new_output = true;
        gate
    }

    /// Pins the fresh output signal to a group exponentiation of the
    /// combination on the exponent wire.
    pub fn scalar_base_multiply(exponent: LinearCombination) -> Gate {
        let identifier = tagged_digest("exp", &[exponent.signature()]);
        let mut gate = Gate::blank(GateKind::ScalarBaseMultiply, identifier.clone());
        gate.output = LinearCombination::unit(Token::argument(identifier));
        gate.exponent = exponent;
        gate
    }

    /// The token other combinations use to reference this gate's output.
    pub fn output_token(&self) -> Option<Token> {
        (!self.no_new_output).then(|| Token::argument(self.identifier.clone()))
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:?} {} (L: {}, R: {}, E: {}, O: {})",
            self.kind, self.identifier, self.left, self.right, self.exponent, self.output
        )
    }
}

fn tagged_digest(tag: &str, parts: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tag.as_bytes());
    for part in parts {
        hasher.update([0u8]);
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())[..16].to_owned()
}
