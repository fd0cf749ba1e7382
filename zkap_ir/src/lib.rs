#![warn(unused_crate_dependencies)]

// The intermediate representation shared by the parser front-end and the
// gate compiler: token and constraint-tree shapes, the linear-combination
// algebra, the gate model and the emitted extended R1CS records.

pub mod ast;
pub mod gate;
pub mod native_types;
pub mod r1cs;
pub mod token;

pub use zkap_field;
pub use zkap_field::FieldElement;
