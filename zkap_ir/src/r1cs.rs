use crate::FieldElement;
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};

/// The dense extended R1CS: one row per gate across four matrices, so that
/// a witness `w` satisfies `⟨L_i,w⟩ · ⟨R_i,w⟩ = ⟨O_i,w⟩` for the
/// multiplicative rows, with `E` carrying the exponent column of
/// scalar-base-multiplication rows.
///
/// Column positions are part of the contract: `index_map["1"] == 0` and
/// every other signal keeps the column assigned at emission time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConstraintSystem {
    pub left: Vec<Vec<FieldElement>>,
    pub right: Vec<Vec<FieldElement>>,
    pub exponent: Vec<Vec<FieldElement>>,
    pub output: Vec<Vec<FieldElement>>,
    /// Signal identifier → witness column, in insertion order.
    pub index_map: IndexMap<String, usize>,
    /// Bit-decomposed signal → its bit columns, LSB first.
    pub split_map: HashMap<String, Vec<usize>>,
    pub num_gates: usize,
    pub witness_length: usize,
}

/// The same system with each row stored as a sorted column → coefficient
/// map; identical semantics, sparse storage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SparseConstraintSystem {
    pub left: Vec<BTreeMap<usize, FieldElement>>,
    pub right: Vec<BTreeMap<usize, FieldElement>>,
    pub exponent: Vec<BTreeMap<usize, FieldElement>>,
    pub output: Vec<BTreeMap<usize, FieldElement>>,
    pub index_map: IndexMap<String, usize>,
    pub split_map: HashMap<String, Vec<usize>>,
    pub num_gates: usize,
    pub witness_length: usize,
}

impl SparseConstraintSystem {
    /// Expands every row to the dense form.
    pub fn expand(&self) -> ConstraintSystem {
        ConstraintSystem {
            left: expand_rows(&self.left, self.witness_length),
            right: expand_rows(&self.right, self.witness_length),
            exponent: expand_rows(&self.exponent, self.witness_length),
            output: expand_rows(&self.output, self.witness_length),
            index_map: self.index_map.clone(),
            split_map: self.split_map.clone(),
            num_gates: self.num_gates,
            witness_length: self.witness_length,
        }
    }
}

fn expand_rows(rows: &[BTreeMap<usize, FieldElement>], width: usize) -> Vec<Vec<FieldElement>> {
    rows.iter()
        .map(|row| {
            let mut dense = vec![FieldElement::zero(); width];
            for (&column, &value) in row {
                dense[column] = value;
            }
            dense
        })
        .collect()
}
