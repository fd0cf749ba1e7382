use crate::collector::GateContainer;
use crate::compile::compile;
use crate::errors::CompileError;
use crate::scope::{Circuit, CircuitRef};
use std::fmt;
use zkap_ir::gate::Gate;
use zkap_ir::FieldElement;

/// A fully-linked program: the global scope holding every top-level
/// function, plus the ordered public input names. The first public input is
/// always the literal `"1"` — the constant wire at witness column 0.
pub struct Program {
    pub global: CircuitRef,
    pub public_inputs: Vec<String>,
}

impl Program {
    pub fn new() -> Program {
        Program {
            global: Circuit::new("global"),
            public_inputs: vec!["1".to_owned()],
        }
    }

    /// The `main` entry scope.
    pub fn main_circuit(&self) -> Result<CircuitRef, CompileError> {
        self.global
            .borrow()
            .functions
            .get("main")
            .cloned()
            .ok_or(CompileError::MissingMainFunction)
    }

    /// The cardinality of the public inputs, the constant wire included.
    pub fn global_input_count(&self) -> usize {
        self.public_inputs.len()
    }

    /// Runs the first lowering pass: walks `main` top to bottom and
    /// returns the ordered gate list the R1CS is built from.
    pub fn execute(&self) -> Result<Vec<Gate>, CompileError> {
        let mut container = GateContainer::new();
        let main = self.main_circuit()?;
        let tasks = main.borrow().task_stack.clone();
        for task in &tasks {
            let compiled = compile(&main, task, &mut container)?;
            container.complete_function(&compiled.lc);
            if compiled.returned {
                break;
            }
        }
        Ok(container.into_gates())
    }
}

impl Default for Program {
    fn default() -> Program {
        Program::new()
    }
}

/// A public input paired with the concrete value a witness supplies for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputArgument {
    pub identifier: String,
    pub value: FieldElement,
}

impl fmt::Display for InputArgument {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({},{})", self.identifier, self.value)
    }
}

/// Pairs the program's abstract input names with concrete values, checking
/// that the counts agree.
pub fn combine_inputs(
    names: &[String],
    concrete: &[FieldElement],
) -> Result<Vec<InputArgument>, CompileError> {
    if names.len() != concrete.len() {
        return Err(CompileError::ArityMismatch {
            name: "public inputs".to_owned(),
            expected: names.len(),
            got: concrete.len(),
        });
    }
    Ok(names
        .iter()
        .zip(concrete)
        .map(|(identifier, &value)| InputArgument { identifier: identifier.clone(), value })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{combine_inputs, Program};
    use crate::errors::CompileError;
    use zkap_ir::FieldElement;

    #[test]
    fn programs_without_main_refuse_to_execute() {
        let program = Program::new();
        assert_eq!(program.execute().unwrap_err(), CompileError::MissingMainFunction);
    }

    #[test]
    fn combine_inputs_pairs_names_with_values() {
        let names = vec!["1".to_owned(), "x".to_owned()];
        let values = [FieldElement::one(), FieldElement::from(9u128)];
        let combined = combine_inputs(&names, &values).unwrap();
        assert_eq!(combined.len(), 2);
        assert_eq!(combined[1].identifier, "x");
        assert_eq!(combined[1].value, FieldElement::from(9u128));
    }

    #[test]
    fn combine_inputs_rejects_count_mismatch() {
        let names = vec!["1".to_owned()];
        assert!(matches!(
            combine_inputs(&names, &[]).unwrap_err(),
            CompileError::ArityMismatch { expected: 1, got: 0, .. }
        ));
    }
}
