use std::collections::HashSet;
use zkap_ir::gate::Gate;
use zkap_ir::native_types::LinearCombination;

/// The ordered gate list under construction, with content-addressed dedup:
/// at most one gate per identifier ever enters the list.
#[derive(Debug, Default)]
pub struct GateContainer {
    gates: Vec<Gate>,
    seen: HashSet<String>,
}

impl GateContainer {
    pub fn new() -> GateContainer {
        GateContainer::default()
    }

    /// Appends `gate` unless a gate with the same identifier was already
    /// collected.
    pub fn add(&mut self, gate: Gate) {
        if self.seen.insert(gate.identifier.clone()) {
            self.gates.push(gate);
        } else {
            log::trace!("reusing gate {}", gate.identifier);
        }
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.seen.contains(identifier)
    }

    /// Materialises a function's final combination as a named signal.
    ///
    /// Nothing happens for an empty combination, a bare `1·x` (a proof of
    /// multiplication by one is trivial), or a pure constant (a fully
    /// folded value needs no witness entry). Anything else — several terms,
    /// or one term carrying an extracted scalar — becomes an addition gate
    /// named by the combination's signature.
    pub fn complete_function(&mut self, lc: &LinearCombination) {
        if lc.is_empty() || lc.is_unit() || lc.is_const() {
            return;
        }
        self.add(Gate::addition(lc.clone()));
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    pub fn into_gates(self) -> Vec<Gate> {
        self.gates
    }
}
