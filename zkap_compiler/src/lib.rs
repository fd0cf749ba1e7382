#![warn(unused_crate_dependencies)]

// Lowers an algebraic program to an ordered gate list, then to the four
// constraint matrices of an extended R1CS. Additions and scalar
// multiplications are folded into symbolic linear combinations; a gate is
// emitted only where nonlinearity forces one.

mod collector;
mod compile;
mod emitter;
mod errors;
mod program;
mod scope;

pub use collector::GateContainer;
pub use errors::CompileError;
pub use program::{combine_inputs, InputArgument, Program};
pub use scope::{Circuit, CircuitRef};

pub use zkap_ir;
pub use zkap_ir::FieldElement;
