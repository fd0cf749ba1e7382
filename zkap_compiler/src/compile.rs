use crate::collector::GateContainer;
use crate::errors::CompileError;
use crate::scope::{rebind_inputs, Circuit, CircuitRef};
use zkap_ir::ast::Constraint;
use zkap_ir::gate::Gate;
use zkap_ir::native_types::{Factor, LinearCombination};
use zkap_ir::token::{Token, TokenKind};
use zkap_ir::FieldElement;

/// What lowering one node produced.
#[derive(Debug)]
pub(crate) struct Compiled {
    pub lc: LinearCombination,
    /// Whether the combination references at least one signal.
    pub references_signal: bool,
    /// Whether a RETURN was reached.
    pub returned: bool,
}

impl Compiled {
    fn empty() -> Compiled {
        Compiled {
            lc: LinearCombination::empty(),
            references_signal: false,
            returned: false,
        }
    }

    fn value(lc: LinearCombination, references_signal: bool) -> Compiled {
        Compiled { lc, references_signal, returned: false }
    }
}

fn malformed(node: &Constraint) -> CompileError {
    CompileError::MalformedConstraint(node.to_string())
}

fn arity(name: &str, expected: usize, got: usize) -> CompileError {
    CompileError::ArityMismatch { name: name.to_owned(), expected, got }
}

/// Recursively lowers one parse-tree node inside `current`, appending every
/// gate the node forces onto `gates`. Additions, subtractions and scalar
/// multiplications stay symbolic; only genuine nonlinearity (and function
/// return boundaries) reaches the gate list.
pub(crate) fn compile(
    current: &CircuitRef,
    node: &Constraint,
    gates: &mut GateContainer,
) -> Result<Compiled, CompileError> {
    match node.output.kind {
        TokenKind::Number => {
            let value = FieldElement::try_from_str(&node.output.identifier)
                .ok_or_else(|| CompileError::NotAConstant(node.output.identifier.clone()))?;
            Ok(Compiled::value(LinearCombination::constant(value), false))
        }
        TokenKind::Argument => Ok(Compiled::value(
            LinearCombination::unit(Token::argument(node.output.identifier.clone())),
            true,
        )),
        TokenKind::Variable => compile_variable(current, node, gates),
        TokenKind::UnassignedVar => match node.inputs.len() {
            0 => {
                let rhs = Circuit::find_constraint_in_bloodline(current, &node.output.identifier)
                    .ok_or_else(|| {
                        CompileError::UnresolvedIdentifier(node.output.identifier.clone())
                    })?;
                compile(current, &rhs, gates)
            }
            1 => compile(current, &node.inputs[0], gates),
            _ => Err(malformed(node)),
        },
        TokenKind::Return => match node.inputs.len() {
            0 => Ok(Compiled {
                lc: LinearCombination::constant(FieldElement::one()),
                references_signal: false,
                returned: true,
            }),
            1 => {
                let mut compiled = compile(current, &node.inputs[0], gates)?;
                compiled.returned = true;
                Ok(compiled)
            }
            // `return <left op right>` keeps the operator triple directly
            // under the Return token.
            3 => compile_operation(current, node, gates),
            _ => Err(malformed(node)),
        },
        TokenKind::VariableOverload => compile_overload(current, node, gates),
        TokenKind::ArrayCall => {
            let name = resolve_array_name(current, node)?;
            let rhs = Circuit::find_constraint_in_bloodline(current, &name)
                .ok_or(CompileError::UnresolvedIdentifier(name))?;
            let mut compiled = compile(current, &rhs, gates)?;
            compiled.returned = false;
            Ok(compiled)
        }
        TokenKind::For => compile_for(current, node, gates),
        TokenKind::If => {
            let enter = match node.inputs.first() {
                None => true,
                Some(condition) => check_static_condition(current, condition)?,
            };
            if enter {
                compile_block(current, &node.output.identifier, gates)
            } else {
                Ok(Compiled::empty())
            }
        }
        TokenKind::IfFunctionCall => compile_block(current, &node.output.identifier, gates),
        TokenKind::FunctionCall => compile_call(current, node, gates),
        _ => compile_operation(current, node, gates),
    }
}

/// Resolves a lone identifier: a number binding yields its value, a nullary
/// closure executes its body (falling back to the declared right-hand side
/// when the body is empty), and a parameterized function is a reference
/// with no value of its own.
fn compile_variable(
    current: &CircuitRef,
    node: &Constraint,
    gates: &mut GateContainer,
) -> Result<Compiled, CompileError> {
    let name = &node.output.identifier;
    let binding = Circuit::find_function_in_bloodline(current, name)
        .ok_or_else(|| CompileError::UnresolvedIdentifier(name.clone()))?;
    let (value, takes_inputs, has_body) = {
        let inner = binding.borrow();
        (inner.value, !inner.inputs.is_empty(), !inner.task_stack.is_empty())
    };
    if let Some(value) = value {
        return Ok(Compiled::value(LinearCombination::constant(value), false));
    }
    if takes_inputs {
        return Ok(Compiled::empty());
    }
    if has_body {
        let compiled = run_statements(&binding, gates)?;
        return Ok(Compiled { returned: false, ..compiled });
    }
    let rhs = Circuit::find_constraint_in_bloodline(current, name)
        .ok_or_else(|| CompileError::UnresolvedIdentifier(name.clone()))?;
    compile(current, &rhs, gates)
}

/// Walks a statement list, completing every non-returning statement through
/// the gate container. A RETURN short-circuits the remaining statements.
fn run_statements(
    block: &CircuitRef,
    gates: &mut GateContainer,
) -> Result<Compiled, CompileError> {
    let tasks = block.borrow().task_stack.clone();
    for task in &tasks {
        let compiled = compile(block, task, gates)?;
        if compiled.returned {
            return Ok(compiled);
        }
        gates.complete_function(&compiled.lc);
    }
    Ok(Compiled::empty())
}

/// An if- or loop-body: a nested statement block whose RETURN belongs to
/// the enclosing function.
fn compile_block(
    current: &CircuitRef,
    name: &str,
    gates: &mut GateContainer,
) -> Result<Compiled, CompileError> {
    let block = Circuit::find_function_in_bloodline(current, name)
        .ok_or_else(|| CompileError::UnresolvedIdentifier(name.to_owned()))?;
    run_statements(&block, gates)
}

fn compile_overload(
    current: &CircuitRef,
    node: &Constraint,
    gates: &mut GateContainer,
) -> Result<Compiled, CompileError> {
    let [target, expr] = node.inputs.as_slice() else {
        return Err(malformed(node));
    };
    let name = if target.output.kind == TokenKind::ArrayCall {
        resolve_array_name(current, target)?
    } else {
        target.output.identifier.clone()
    };
    let compiled = compile(current, expr, gates)?;
    let context = Circuit::scope_containing_binding(current, &name)
        .ok_or_else(|| CompileError::UnresolvedIdentifier(name.clone()))?;
    context
        .borrow_mut()
        .functions
        .insert(name, Circuit::primitive_return(&compiled.lc));
    Ok(Compiled::empty())
}

fn compile_for(
    current: &CircuitRef,
    node: &Constraint,
    gates: &mut GateContainer,
) -> Result<Compiled, CompileError> {
    let [condition, post] = node.inputs.as_slice() else {
        return Err(malformed(node));
    };
    while check_static_condition(current, condition)? {
        let compiled = compile_block(current, &node.output.identifier, gates)?;
        if compiled.returned {
            return Ok(compiled);
        }
        compile(current, post, gates)?;
    }
    Ok(Compiled::empty())
}

/// Evaluates a comparator whose operands must fold to constants at compile
/// time; the only condition form an arithmetic circuit can branch on.
fn check_static_condition(
    current: &CircuitRef,
    condition: &Constraint,
) -> Result<bool, CompileError> {
    let (op, left, right) = condition
        .as_operator_triple()
        .ok_or_else(|| malformed(condition))?;
    if op.kind != TokenKind::BinaryComparator {
        return Err(malformed(condition));
    }
    // A static condition may not emit; give it a container of its own.
    let mut throwaway = GateContainer::new();
    let left = compile(current, left, &mut throwaway)?;
    let right = compile(current, right, &mut throwaway)?;
    let (Some(l), Some(r)) = (left.lc.constant_value(), right.lc.constant_value()) else {
        return Err(CompileError::NonStaticCondition);
    };
    match op.identifier.as_str() {
        "==" => Ok(l == r),
        "!=" => Ok(l != r),
        "<" => Ok(l < r),
        "<=" => Ok(l <= r),
        ">" => Ok(l > r),
        ">=" => Ok(l >= r),
        _ => Err(malformed(condition)),
    }
}

/// Rebuilds the canonical `name[i][j]` identifier; every subscript must
/// fold to a constant.
fn resolve_array_name(current: &CircuitRef, node: &Constraint) -> Result<String, CompileError> {
    let mut identifier = node.output.identifier.clone();
    for index in &node.inputs {
        let mut throwaway = GateContainer::new();
        let compiled = compile(current, index, &mut throwaway)?;
        let position = compiled
            .lc
            .as_single()
            .filter(|factor| factor.is_constant())
            .and_then(|factor| factor.coefficient.try_to_u64())
            .ok_or_else(|| CompileError::NonStaticArrayIndex(node.output.identifier.clone()))?;
        identifier.push_str(&format!("[{position}]"));
    }
    Ok(identifier)
}

fn compile_call(
    current: &CircuitRef,
    node: &Constraint,
    gates: &mut GateContainer,
) -> Result<Compiled, CompileError> {
    match node.output.identifier.as_str() {
        "BREAK" => {
            // Debug builtin: show what every argument lowers to.
            for argument in &node.inputs {
                let compiled = compile(current, argument, gates)?;
                log::debug!("BREAK {argument} = {}", compiled.lc);
            }
            Ok(Compiled::empty())
        }
        "SPLIT" => compile_split(current, node, gates),
        "equal" => {
            let [left, right] = node.inputs.as_slice() else {
                return Err(arity("equal", 2, node.inputs.len()));
            };
            let left = compile(current, left, gates)?;
            let right = compile(current, right, gates)?;
            gates.add(Gate::equality(left.lc, right.lc));
            Ok(Compiled::empty())
        }
        "addGateConstraint" => {
            // A forced, named addition — even where folding could collapse
            // it. The common scalar rides on the returned factor.
            let [left, right] = node.inputs.as_slice() else {
                return Err(arity("addGateConstraint", 2, node.inputs.len()));
            };
            let left = compile(current, left, gates)?;
            let right = compile(current, right, gates)?;
            let (common, l_reduced, r_reduced) =
                LinearCombination::extract_constant(&left.lc, &right.lc);
            let gate = Gate::addition(&l_reduced + &r_reduced);
            let token = gate.output_token().ok_or_else(|| malformed(node))?;
            gates.add(gate);
            Ok(Compiled::value(
                LinearCombination::single(Factor::signal(token, common)),
                true,
            ))
        }
        "scalarBaseMultiply" => {
            let [exponent] = node.inputs.as_slice() else {
                return Err(arity("scalarBaseMultiply", 1, node.inputs.len()));
            };
            let compiled = compile(current, exponent, gates)?;
            let gate = Gate::scalar_base_multiply(compiled.lc);
            let token = gate.output_token().ok_or_else(|| malformed(node))?;
            gates.add(gate);
            Ok(Compiled::value(LinearCombination::unit(token), true))
        }
        // Reserved boolean builtins: recognised and arity-checked, no
        // lowering defined yet.
        "AND" | "NAND" | "OR" => {
            if node.inputs.len() != 2 {
                return Err(arity(&node.output.identifier, 2, node.inputs.len()));
            }
            Ok(Compiled::empty())
        }
        "NOT" => {
            if node.inputs.len() != 1 {
                return Err(arity("NOT", 1, node.inputs.len()));
            }
            Ok(Compiled::empty())
        }
        _ => compile_user_call(current, node, gates),
    }
}

/// Lowers `SPLIT(x)`: one zero-or-one gate per bit of the field, LSB
/// first, plus the sum check tying the bits back to `x`.
fn compile_split(
    current: &CircuitRef,
    node: &Constraint,
    gates: &mut GateContainer,
) -> Result<Compiled, CompileError> {
    let [argument] = node.inputs.as_slice() else {
        return Err(arity("SPLIT", 1, node.inputs.len()));
    };
    let compiled = compile(current, argument, gates)?;
    let of = compiled
        .lc
        .as_single()
        .map(|factor| factor.token.clone())
        .ok_or(CompileError::SplitRequiresSingleTerm)?;
    let bits = FieldElement::max_num_bits() as usize;
    let mut sum = Vec::with_capacity(bits);
    for i in 0..bits {
        let bit = Token::argument(format!("{i}{}", of.identifier));
        gates.add(Gate::zero_or_one(i, of.clone()));
        sum.push(Factor::signal(bit, FieldElement::pow2(i as u32)));
    }
    gates.add(Gate::sum_check(LinearCombination::from_terms(sum), of));
    Ok(Compiled::empty())
}

/// Inlines a user-defined call: arguments compile in the caller's scope
/// and rebind the callee's parameter slots for the duration of the walk.
/// The callee's RETURN ends the callee, not the caller.
fn compile_user_call(
    current: &CircuitRef,
    node: &Constraint,
    gates: &mut GateContainer,
) -> Result<Compiled, CompileError> {
    let callee = Circuit::find_function_in_bloodline(current, &node.output.identifier)
        .ok_or_else(|| CompileError::UnresolvedIdentifier(node.output.identifier.clone()))?;
    let mut bound = Vec::with_capacity(node.inputs.len());
    for argument in &node.inputs {
        let compiled = compile(current, argument, gates)?;
        if compiled.lc.is_empty() {
            // A function passed by name rather than a computed value.
            let referenced =
                Circuit::find_function_in_bloodline(current, &argument.output.identifier)
                    .ok_or_else(|| {
                        CompileError::UnresolvedIdentifier(argument.output.identifier.clone())
                    })?;
            bound.push(Circuit::clone_tree(&referenced));
        } else {
            bound.push(Circuit::primitive_return(&compiled.lc));
        }
    }
    let _guard = rebind_inputs(&callee, bound)?;
    let compiled = run_statements(&callee, gates)?;
    Ok(Compiled { returned: false, ..compiled })
}

/// The three-input operator tail shared by plain expression nodes and the
/// collapsed `return <binop>` form.
fn compile_operation(
    current: &CircuitRef,
    node: &Constraint,
    gates: &mut GateContainer,
) -> Result<Compiled, CompileError> {
    let Some((op, left, right)) = node.as_operator_triple() else {
        return Err(malformed(node));
    };
    let is_return = node.output.kind == TokenKind::Return;
    if op.kind != TokenKind::ArithmeticOperator {
        // Comparators outside static conditions, bit, boolean and
        // assignment operators have no gate lowering.
        return Err(malformed(node));
    }
    match op.identifier.as_str() {
        "+" | "-" => {
            let l = compile(current, left, gates)?;
            let r = compile(current, right, gates)?;
            let rhs = if op.identifier == "-" { -&r.lc } else { r.lc };
            Ok(Compiled {
                lc: &l.lc + &rhs,
                references_signal: l.references_signal || r.references_signal,
                returned: is_return,
            })
        }
        "*" => {
            let l = compile(current, left, gates)?;
            let r = compile(current, right, gates)?;
            // Folding is free whenever a side is constant — except directly
            // under a RETURN, where the product must stay visible as a row.
            if !is_return && (!l.references_signal || !r.references_signal) {
                let lc = l.lc.mul(&r.lc).ok_or_else(|| malformed(node))?;
                return Ok(Compiled {
                    lc,
                    references_signal: l.references_signal || r.references_signal,
                    returned: false,
                });
            }
            let (common, l_reduced, r_reduced) =
                LinearCombination::extract_constant(&l.lc, &r.lc);
            let gate = Gate::multiplication(l_reduced, r_reduced);
            let token = gate.output_token().ok_or_else(|| malformed(node))?;
            gates.add(gate);
            Ok(Compiled {
                lc: LinearCombination::single(Factor::signal(token, common)),
                references_signal: true,
                returned: is_return,
            })
        }
        "/" => {
            let l = compile(current, left, gates)?;
            let r = compile(current, right, gates)?;
            if !r.references_signal {
                let divisor = r.lc.constant_value().ok_or_else(|| malformed(node))?;
                if divisor.is_zero() {
                    return Err(CompileError::DivisionByZero);
                }
                let inverse = r.lc.invert().ok_or(CompileError::InvertNonConstant)?;
                let lc = l.lc.mul(&inverse).ok_or_else(|| malformed(node))?;
                return Ok(Compiled {
                    lc,
                    references_signal: l.references_signal,
                    returned: is_return,
                });
            }
            // quotient · divisor = dividend; the quotient is the fresh
            // signal and the scalar ratio rides on the returned factor.
            let (g_l, dividend) = l.lc.normalize();
            let (g_r, divisor) = r.lc.normalize();
            let common = g_l / g_r;
            let gate = Gate::division(dividend, divisor);
            let token = gate.output_token().ok_or_else(|| malformed(node))?;
            gates.add(gate);
            Ok(Compiled {
                lc: LinearCombination::single(Factor::signal(token, common)),
                references_signal: true,
                returned: is_return,
            })
        }
        _ => Err(malformed(node)),
    }
}
