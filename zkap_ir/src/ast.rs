use crate::native_types::LinearCombination;
use crate::token::{Token, TokenKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A node of the parse tree handed to the compiler.
///
/// Operator nodes carry the fixed three-input shape
/// `inputs = [operator, left, right]`; everything else dispatches on
/// `output.kind`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub output: Token,
    pub inputs: Vec<Constraint>,
}

impl Constraint {
    pub fn new(output: Token, inputs: Vec<Constraint>) -> Constraint {
        Constraint { output, inputs }
    }

    pub fn leaf(output: Token) -> Constraint {
        Constraint::new(output, Vec::new())
    }

    /// A numeric literal.
    pub fn number(lexeme: impl Into<String>) -> Constraint {
        Constraint::leaf(Token::number(lexeme))
    }

    /// A reference to a name resolved against the enclosing scopes.
    pub fn variable(name: impl Into<String>) -> Constraint {
        Constraint::leaf(Token::variable(name))
    }

    /// A direct reference to an abstract input signal.
    pub fn argument(name: impl Into<String>) -> Constraint {
        Constraint::leaf(Token::argument(name))
    }

    /// An operator triple. `op` is typically built with
    /// [`Token::arithmetic_op`] or [`Token::comparator`].
    pub fn binary(op: Token, left: Constraint, right: Constraint) -> Constraint {
        Constraint::new(op.clone(), vec![Constraint::leaf(op), left, right])
    }

    /// `return <expr>`.
    pub fn returning(expr: Constraint) -> Constraint {
        Constraint::new(Token::new(TokenKind::Return, ""), vec![expr])
    }

    /// `return <left op right>` in the collapsed form the parser produces:
    /// the operator triple sits directly under a `Return`-tagged output.
    pub fn return_binary(op: Token, left: Constraint, right: Constraint) -> Constraint {
        Constraint::new(
            Token::new(TokenKind::Return, ""),
            vec![Constraint::leaf(op), left, right],
        )
    }

    /// `return` with no value.
    pub fn return_empty() -> Constraint {
        Constraint::leaf(Token::new(TokenKind::Return, ""))
    }

    pub fn call(name: impl Into<String>, arguments: Vec<Constraint>) -> Constraint {
        Constraint::new(Token::new(TokenKind::FunctionCall, name), arguments)
    }

    /// `<target> = <expr>` where the target already binds in some enclosing
    /// scope. The target is a variable leaf or an array call.
    pub fn overload(target: Constraint, expr: Constraint) -> Constraint {
        Constraint::new(Token::new(TokenKind::VariableOverload, ""), vec![target, expr])
    }

    pub fn array_call(name: impl Into<String>, indices: Vec<Constraint>) -> Constraint {
        Constraint::new(Token::new(TokenKind::ArrayCall, name), indices)
    }

    /// An `if` guarding the statement block registered under `body_name`.
    /// `condition = None` is the unconditional (else) form.
    pub fn if_block(body_name: impl Into<String>, condition: Option<Constraint>) -> Constraint {
        Constraint::new(
            Token::new(TokenKind::If, body_name),
            condition.into_iter().collect(),
        )
    }

    /// A `for` loop over the statement block registered under `body_name`,
    /// rechecking `condition` and compiling `post` after every pass.
    pub fn for_loop(
        body_name: impl Into<String>,
        condition: Constraint,
        post: Constraint,
    ) -> Constraint {
        Constraint::new(Token::new(TokenKind::For, body_name), vec![condition, post])
    }

    /// Re-embeds a computed combination as a tree the compiler folds right
    /// back into the same combination; the body of value closures.
    pub fn from_linear_combination(lc: &LinearCombination) -> Constraint {
        let mut terms = lc.terms().iter().map(|factor| {
            if factor.is_constant() {
                Constraint::number(factor.coefficient.to_string())
            } else if factor.coefficient.is_one() {
                Constraint::leaf(factor.token.clone())
            } else {
                Constraint::binary(
                    Token::arithmetic_op("*"),
                    Constraint::number(factor.coefficient.to_string()),
                    Constraint::leaf(factor.token.clone()),
                )
            }
        });
        let first = match terms.next() {
            Some(first) => first,
            None => Constraint::number("0"),
        };
        terms.fold(first, |sum, term| {
            Constraint::binary(Token::arithmetic_op("+"), sum, term)
        })
    }

    /// The `[op, left, right]` view of an operator triple, if this node has
    /// that shape.
    pub fn as_operator_triple(&self) -> Option<(&Token, &Constraint, &Constraint)> {
        match self.inputs.as_slice() {
            [op, left, right] => Some((&op.output, left, right)),
            _ => None,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.inputs.is_empty() {
            return write!(f, "{}", self.output);
        }
        let children: Vec<String> = self.inputs.iter().map(Constraint::to_string).collect();
        write!(f, "{}[{}]", self.output, children.join(", "))
    }
}
