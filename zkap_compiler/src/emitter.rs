use crate::errors::CompileError;
use crate::program::Program;
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};
use zkap_ir::gate::{Gate, GateKind};
use zkap_ir::native_types::{Factor, LinearCombination};
use zkap_ir::r1cs::{ConstraintSystem, SparseConstraintSystem};
use zkap_ir::token::Token;
use zkap_ir::FieldElement;

/// Synthetic signals appended when the emitter randomises the trace.
const RAND_INPUT: &str = "randInput";
const RAND_OUTPUT: &str = "randOutput";

type IndexAssignment = (IndexMap<String, usize>, HashMap<String, Vec<usize>>);

impl Program {
    /// Assigns every signal its witness column: the public inputs in
    /// order (the constant wire first), then the main circuit's
    /// parameters, then each gate output in emission order. Collects the
    /// bit columns of split signals along the way.
    fn assign_indices(
        &self,
        gates: &[Gate],
        randomize: bool,
    ) -> Result<IndexAssignment, CompileError> {
        let mut index_map: IndexMap<String, usize> = IndexMap::new();
        let mut split_map: HashMap<String, Vec<usize>> = HashMap::new();

        for name in &self.public_inputs {
            let next = index_map.len();
            index_map.entry(name.clone()).or_insert(next);
        }
        let main_inputs = self.main_circuit()?.borrow().inputs.clone();
        for name in main_inputs {
            let next = index_map.len();
            index_map.entry(name).or_insert(next);
        }

        for gate in gates {
            // Assertion-only gates leave the witness alone.
            if gate.no_new_output {
                continue;
            }
            if index_map.contains_key(&gate.identifier) {
                return Err(CompileError::RewriteCollision(gate.identifier.clone()));
            }
            let index = index_map.len();
            index_map.insert(gate.identifier.clone(), index);
            if gate.kind == GateKind::ZeroOrOne {
                if let Some(of) = &gate.representative {
                    split_map.entry(of.identifier.clone()).or_default().push(index);
                }
            }
        }

        if randomize {
            let next = index_map.len();
            index_map.insert(RAND_INPUT.to_owned(), next);
            index_map.insert(RAND_OUTPUT.to_owned(), next + 1);
        }
        Ok((index_map, split_map))
    }

    /// Lowers an ordered gate list into the dense extended R1CS.
    pub fn gates_to_r1cs(
        &self,
        gates: &[Gate],
        randomize: bool,
    ) -> Result<ConstraintSystem, CompileError> {
        let (index_map, split_map) = self.assign_indices(gates, randomize)?;
        let size = index_map.len();
        let mut system = ConstraintSystem {
            index_map,
            split_map,
            witness_length: size,
            ..Default::default()
        };

        for gate in gates {
            let (first, second) = ordered_sides(gate);
            let mut left = vec![FieldElement::zero(); size];
            let mut right = vec![FieldElement::zero(); size];
            let mut exponent = vec![FieldElement::zero(); size];
            let mut output = vec![FieldElement::zero(); size];

            match gate.kind {
                GateKind::Multiplication => {
                    insert_dense(&mut left, &system.index_map, first)?;
                    insert_dense(&mut right, &system.index_map, second)?;
                    insert_dense(&mut output, &system.index_map, &gate.output)?;
                }
                GateKind::Addition => {
                    insert_dense(&mut left, &system.index_map, first)?;
                    right[0] = FieldElement::one();
                    insert_dense(&mut output, &system.index_map, &gate.output)?;
                }
                GateKind::Equality => {
                    insert_dense(&mut left, &system.index_map, first)?;
                    insert_dense(&mut output, &system.index_map, second)?;
                    right[0] = FieldElement::one();
                }
                GateKind::ZeroOrOne => {
                    let index = own_column(&system.index_map, gate)?;
                    left[0] = -FieldElement::one();
                    left[index] = FieldElement::one();
                    right[index] = FieldElement::one();
                }
                GateKind::SumCheck => {
                    insert_dense(&mut left, &system.index_map, first)?;
                    right[0] = FieldElement::one();
                    output[representative_column(&system.index_map, gate)?] =
                        FieldElement::one();
                }
                GateKind::ScalarBaseMultiply => {
                    insert_dense(&mut exponent, &system.index_map, &gate.exponent)?;
                    output[own_column(&system.index_map, gate)?] = FieldElement::one();
                }
            }

            system.left.push(left);
            system.right.push(right);
            system.exponent.push(exponent);
            system.output.push(output);
        }

        if randomize {
            let mut left = vec![FieldElement::zero(); size];
            let mut right = vec![FieldElement::zero(); size];
            let mut exponent = vec![FieldElement::zero(); size];
            let mut output = vec![FieldElement::zero(); size];
            let rand_in = LinearCombination::unit(Token::argument(RAND_INPUT));
            let rand_out = LinearCombination::unit(Token::argument(RAND_OUTPUT));
            insert_dense(&mut left, &system.index_map, &rand_in)?;
            insert_dense(&mut right, &system.index_map, &rand_in)?;
            insert_dense(&mut exponent, &system.index_map, &rand_in)?;
            insert_dense(&mut output, &system.index_map, &rand_out)?;
            system.left.push(left);
            system.right.push(right);
            system.exponent.push(exponent);
            system.output.push(output);
        }

        system.num_gates = system.left.len();
        Ok(system)
    }

    /// The sparse twin of [`Program::gates_to_r1cs`]: identical rows,
    /// stored as sorted column → coefficient maps.
    pub fn gates_to_sparse_r1cs(
        &self,
        gates: &[Gate],
        randomize: bool,
    ) -> Result<SparseConstraintSystem, CompileError> {
        let (index_map, split_map) = self.assign_indices(gates, randomize)?;
        let size = index_map.len();
        let mut system = SparseConstraintSystem {
            index_map,
            split_map,
            witness_length: size,
            ..Default::default()
        };

        for gate in gates {
            let (first, second) = ordered_sides(gate);
            let mut left = BTreeMap::new();
            let mut right = BTreeMap::new();
            let mut exponent = BTreeMap::new();
            let mut output = BTreeMap::new();

            match gate.kind {
                GateKind::Multiplication => {
                    insert_sparse(&mut left, &system.index_map, first)?;
                    insert_sparse(&mut right, &system.index_map, second)?;
                    insert_sparse(&mut output, &system.index_map, &gate.output)?;
                }
                GateKind::Addition => {
                    insert_sparse(&mut left, &system.index_map, first)?;
                    right.insert(0, FieldElement::one());
                    insert_sparse(&mut output, &system.index_map, &gate.output)?;
                }
                GateKind::Equality => {
                    insert_sparse(&mut left, &system.index_map, first)?;
                    insert_sparse(&mut output, &system.index_map, second)?;
                    right.insert(0, FieldElement::one());
                }
                GateKind::ZeroOrOne => {
                    let index = own_column(&system.index_map, gate)?;
                    left.insert(0, -FieldElement::one());
                    left.insert(index, FieldElement::one());
                    right.insert(index, FieldElement::one());
                }
                GateKind::SumCheck => {
                    insert_sparse(&mut left, &system.index_map, first)?;
                    right.insert(0, FieldElement::one());
                    output.insert(
                        representative_column(&system.index_map, gate)?,
                        FieldElement::one(),
                    );
                }
                GateKind::ScalarBaseMultiply => {
                    insert_sparse(&mut exponent, &system.index_map, &gate.exponent)?;
                    output.insert(own_column(&system.index_map, gate)?, FieldElement::one());
                }
            }

            system.left.push(left);
            system.right.push(right);
            system.exponent.push(exponent);
            system.output.push(output);
        }

        if randomize {
            let mut left = BTreeMap::new();
            let mut right = BTreeMap::new();
            let mut exponent = BTreeMap::new();
            let mut output = BTreeMap::new();
            let rand_in = LinearCombination::unit(Token::argument(RAND_INPUT));
            let rand_out = LinearCombination::unit(Token::argument(RAND_OUTPUT));
            insert_sparse(&mut left, &system.index_map, &rand_in)?;
            insert_sparse(&mut right, &system.index_map, &rand_in)?;
            insert_sparse(&mut exponent, &system.index_map, &rand_in)?;
            insert_sparse(&mut output, &system.index_map, &rand_out)?;
            system.left.push(left);
            system.right.push(right);
            system.exponent.push(exponent);
            system.output.push(output);
        }

        system.num_gates = system.left.len();
        Ok(system)
    }
}

/// The pairing-cost heuristic: the heavier combination goes into the
/// cheaper group, so the sides swap when the right one carries more terms.
/// Operates on borrows — the stored gate list is never mutated.
fn ordered_sides(gate: &Gate) -> (&LinearCombination, &LinearCombination) {
    if gate.right.len() > gate.left.len() {
        (&gate.right, &gate.left)
    } else {
        (&gate.left, &gate.right)
    }
}

fn column(index_map: &IndexMap<String, usize>, factor: &Factor) -> Result<usize, CompileError> {
    if factor.is_constant() {
        return Ok(0);
    }
    index_map
        .get(&factor.token.identifier)
        .copied()
        .ok_or_else(|| CompileError::UnindexedSignal(factor.token.identifier.clone()))
}

/// The column of the gate's own output signal.
fn own_column(index_map: &IndexMap<String, usize>, gate: &Gate) -> Result<usize, CompileError> {
    index_map
        .get(&gate.identifier)
        .copied()
        .ok_or_else(|| CompileError::UnindexedSignal(gate.identifier.clone()))
}

/// The column of the signal a decomposition gate talks about. A constant
/// representative lands on the constant wire.
fn representative_column(
    index_map: &IndexMap<String, usize>,
    gate: &Gate,
) -> Result<usize, CompileError> {
    match &gate.representative {
        Some(token) if !token.is_number() => index_map
            .get(&token.identifier)
            .copied()
            .ok_or_else(|| CompileError::UnindexedSignal(token.identifier.clone())),
        _ => Ok(0),
    }
}

fn insert_dense(
    row: &mut [FieldElement],
    index_map: &IndexMap<String, usize>,
    lc: &LinearCombination,
) -> Result<(), CompileError> {
    for factor in lc.terms() {
        row[column(index_map, factor)?] += factor.coefficient;
    }
    Ok(())
}

fn insert_sparse(
    row: &mut BTreeMap<usize, FieldElement>,
    index_map: &IndexMap<String, usize>,
    lc: &LinearCombination,
) -> Result<(), CompileError> {
    for factor in lc.terms() {
        *row.entry(column(index_map, factor)?)
            .or_insert_with(FieldElement::zero) += factor.coefficient;
    }
    Ok(())
}
