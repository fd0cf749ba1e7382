use thiserror::Error;

/// Everything that can go wrong while lowering a program. All of these are
/// programmer errors in the input; there is no recovery path and no partial
/// result is produced.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("variable {0} not declared")]
    UnresolvedIdentifier(String),
    #[error("{name} takes {expected} arguments, got {got}")]
    ArityMismatch { name: String, expected: usize, got: usize },
    #[error("cannot access array {0} dynamically in an arithmetic circuit")]
    NonStaticArrayIndex(String),
    #[error("condition does not reduce to a static value")]
    NonStaticCondition,
    #[error("the argument of SPLIT must reduce to a single term")]
    SplitRequiresSingleTerm,
    #[error("cannot invert a combination that references signals")]
    InvertNonConstant,
    #[error("division by zero")]
    DivisionByZero,
    #[error("rewriting witness index for {0}")]
    RewriteCollision(String),
    #[error("malformed constraint: {0}")]
    MalformedConstraint(String),
    #[error("no witness index assigned to {0}")]
    UnindexedSignal(String),
    #[error("{0} is not a constant")]
    NotAConstant(String),
    #[error("program has no main function")]
    MissingMainFunction,
}
