use crate::errors::CompileError;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use zkap_ir::ast::Constraint;
use zkap_ir::native_types::LinearCombination;
use zkap_ir::FieldElement;

pub type CircuitRef = Rc<RefCell<Circuit>>;

/// A lexical scope: a function, an if/loop body, or the closure standing in
/// for a variable. Parameters, nested functions and locals all live in the
/// one `functions` namespace; name resolution walks `parent` links (the
/// "bloodline"). The parent reference is `Weak` — parents own their
/// children, never the other way around.
#[derive(Debug)]
pub struct Circuit {
    pub name: String,
    /// Parameter names, in declaration order.
    pub inputs: Vec<String>,
    pub functions: HashMap<String, CircuitRef>,
    /// Raw right-hand sides of local declarations, by name.
    pub constraint_map: HashMap<String, Constraint>,
    /// The statement list of the body.
    pub task_stack: Vec<Constraint>,
    /// Set when the scope is a resolved number.
    pub value: Option<FieldElement>,
    pub parent: Weak<RefCell<Circuit>>,
}

impl Circuit {
    pub fn new(name: impl Into<String>) -> CircuitRef {
        Rc::new(RefCell::new(Circuit {
            name: name.into(),
            inputs: Vec::new(),
            functions: HashMap::new(),
            constraint_map: HashMap::new(),
            task_stack: Vec::new(),
            value: None,
            parent: Weak::new(),
        }))
    }

    /// Creates a scope registered under `name` inside `parent`, seeding one
    /// placeholder closure per parameter. A placeholder's body returns the
    /// abstract signal of the same name, so an unbound parameter reads as a
    /// circuit input.
    pub fn child(parent: &CircuitRef, name: &str, inputs: Vec<String>) -> CircuitRef {
        let circuit = Circuit::new(name);
        {
            let mut inner = circuit.borrow_mut();
            inner.inputs = inputs.clone();
            inner.parent = Rc::downgrade(parent);
        }
        for input in &inputs {
            let placeholder = Circuit::new(input.as_str());
            {
                let mut inner = placeholder.borrow_mut();
                inner.parent = Rc::downgrade(&circuit);
                inner.task_stack = vec![Constraint::returning(Constraint::argument(input.as_str()))];
            }
            circuit.borrow_mut().functions.insert(input.clone(), placeholder);
        }
        parent.borrow_mut().functions.insert(name.to_owned(), circuit.clone());
        circuit
    }

    /// Lifts a computed combination into a nullary closure returning it;
    /// how values bind to names at call sites and overloads.
    pub fn primitive_return(lc: &LinearCombination) -> CircuitRef {
        let circuit = Circuit::new(lc.signature());
        circuit.borrow_mut().task_stack =
            vec![Constraint::returning(Constraint::from_linear_combination(lc))];
        circuit
    }

    /// Declares `name = rhs` in `scope`: the raw tree goes into the
    /// constraint map and the name gets a nullary closure binding.
    pub fn declare_local(scope: &CircuitRef, name: &str, rhs: Constraint) {
        scope.borrow_mut().constraint_map.insert(name.to_owned(), rhs);
        let closure = Circuit::new(name);
        closure.borrow_mut().parent = Rc::downgrade(scope);
        scope.borrow_mut().functions.insert(name.to_owned(), closure);
    }

    /// Binds `name` to a resolved number.
    pub fn declare_number(scope: &CircuitRef, name: &str, value: FieldElement) {
        let number = Circuit::new(name);
        number.borrow_mut().value = Some(value);
        number.borrow_mut().parent = Rc::downgrade(scope);
        scope.borrow_mut().functions.insert(name.to_owned(), number);
    }

    pub fn push_task(scope: &CircuitRef, task: Constraint) {
        scope.borrow_mut().task_stack.push(task);
    }

    /// Walks the bloodline for a binding of `name`.
    pub fn find_function_in_bloodline(start: &CircuitRef, name: &str) -> Option<CircuitRef> {
        let mut cursor = Some(start.clone());
        while let Some(scope) = cursor {
            if let Some(found) = scope.borrow().functions.get(name) {
                return Some(found.clone());
            }
            cursor = scope.borrow().parent.upgrade();
        }
        None
    }

    /// Walks the bloodline for a declared right-hand side of `name`.
    pub fn find_constraint_in_bloodline(start: &CircuitRef, name: &str) -> Option<Constraint> {
        let mut cursor = Some(start.clone());
        while let Some(scope) = cursor {
            if let Some(found) = scope.borrow().constraint_map.get(name) {
                return Some(found.clone());
            }
            cursor = scope.borrow().parent.upgrade();
        }
        None
    }

    /// The nearest enclosing scope that already binds `name`; where an
    /// overload writes its replacement.
    pub fn scope_containing_binding(start: &CircuitRef, name: &str) -> Option<CircuitRef> {
        let mut cursor = Some(start.clone());
        while let Some(scope) = cursor {
            if scope.borrow().functions.contains_key(name) {
                return Some(scope);
            }
            cursor = scope.borrow().parent.upgrade();
        }
        None
    }

    /// Deep-copies a scope subtree. The copy keeps the source's lexical
    /// parent; nested scopes are re-parented onto their new owners.
    pub fn clone_tree(source: &CircuitRef) -> CircuitRef {
        let parent = source.borrow().parent.clone();
        Circuit::clone_tree_onto(source, parent)
    }

    fn clone_tree_onto(source: &CircuitRef, parent: Weak<RefCell<Circuit>>) -> CircuitRef {
        let (shallow, children) = {
            let inner = source.borrow();
            let shallow = Circuit {
                name: inner.name.clone(),
                inputs: inner.inputs.clone(),
                functions: HashMap::new(),
                constraint_map: inner.constraint_map.clone(),
                task_stack: inner.task_stack.clone(),
                value: inner.value,
                parent,
            };
            let children: Vec<(String, CircuitRef)> = inner
                .functions
                .iter()
                .map(|(name, child)| (name.clone(), child.clone()))
                .collect();
            (shallow, children)
        };
        let cloned = Rc::new(RefCell::new(shallow));
        for (name, child) in children {
            let child_clone = Circuit::clone_tree_onto(&child, Rc::downgrade(&cloned));
            cloned.borrow_mut().functions.insert(name, child_clone);
        }
        cloned
    }
}

/// Restores the displaced parameter bindings of a call site when dropped,
/// so the callee's scope is never observably perturbed after a call —
/// including along error paths.
#[derive(Debug)]
pub(crate) struct RebindGuard {
    target: CircuitRef,
    saved: Vec<(String, CircuitRef)>,
}

impl Drop for RebindGuard {
    fn drop(&mut self) {
        let mut scope = self.target.borrow_mut();
        for (name, old) in self.saved.drain(..) {
            scope.functions.insert(name, old);
        }
    }
}

/// Rebinds the callee's parameter slots to `bound`, returning the guard
/// that undoes it. Fails without touching anything on an arity mismatch or
/// a missing parameter slot.
pub(crate) fn rebind_inputs(
    callee: &CircuitRef,
    bound: Vec<CircuitRef>,
) -> Result<RebindGuard, CompileError> {
    let mut scope = callee.borrow_mut();
    if scope.inputs.len() != bound.len() {
        return Err(CompileError::ArityMismatch {
            name: scope.name.clone(),
            expected: scope.inputs.len(),
            got: bound.len(),
        });
    }
    let names = scope.inputs.clone();
    for name in &names {
        if !scope.functions.contains_key(name) {
            return Err(CompileError::UnresolvedIdentifier(name.clone()));
        }
    }
    let mut saved = Vec::with_capacity(names.len());
    for (name, binding) in names.into_iter().zip(bound) {
        if let Some(old) = scope.functions.insert(name.clone(), binding) {
            saved.push((name, old));
        }
    }
    drop(scope);
    Ok(RebindGuard { target: callee.clone(), saved })
}
