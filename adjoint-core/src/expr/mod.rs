//! Postfix Expression Builder
//!
//! Parses a postfix (reverse-Polish) token string into a computation graph.
//! This is the graph-construction driver: it wires nodes, it does not run
//! the passes (the returned [`Expression`] exposes them).
//!
//! # Grammar
//!
//! Tokens are separated by arbitrary whitespace:
//!
//! - `a`–`z`: a variable; every occurrence of the same letter refers to the
//!   same input node
//! - `+ - * /`: binary operators consuming the two most recently produced
//!   values, in produce order, as first/second operand
//! - `E L S C`: unary exp / log / sin / cos
//!
//! Anything else is rejected. Initial variable values are supplied as an
//! array indexed by letter (`values[0]` is `a`).

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::error::AdjointError;
use crate::graph::{Graph, NodeId, Op};

/// A parsed postfix expression: the built graph, the node holding the final
/// result, and the variable bindings.
#[derive(Debug)]
pub struct Expression {
    graph: Graph,
    root: NodeId,
    variables: IndexMap<char, NodeId>,
}

impl Expression {
    /// The underlying graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Mutable access to the underlying graph, e.g. to assign new variable
    /// values before re-evaluating.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// The node holding the expression's result.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The node bound to `letter`, if the expression references it.
    pub fn variable(&self, letter: char) -> Option<NodeId> {
        self.variables.get(&letter).copied()
    }

    /// Run a forward pass and return the result value.
    pub fn evaluate(&mut self) -> Result<f64, AdjointError> {
        self.graph.forward()?;
        Ok(self.graph.value(self.root))
    }

    /// Run a backward pass from the result node.
    ///
    /// Adjoints accumulate across calls; use
    /// [`Graph::reset_adjoints`](crate::graph::Graph::reset_adjoints)
    /// through [`Expression::graph_mut`] between independent runs.
    pub fn differentiate(&mut self) -> Result<(), AdjointError> {
        self.graph.backward(self.root)
    }

    /// The accumulated partial derivative of the result with respect to
    /// `letter`, if the expression references it.
    pub fn gradient(&self, letter: char) -> Option<f64> {
        self.variable(letter).map(|id| self.graph.adjoint(id))
    }
}

/// Map an operator/function token to its operation.
fn token_op(token: &str) -> Option<Op> {
    match token {
        "+" => Some(Op::Add),
        "-" => Some(Op::Sub),
        "*" => Some(Op::Mul),
        "/" => Some(Op::Div),
        "E" => Some(Op::Exp),
        "L" => Some(Op::Log),
        "S" => Some(Op::Sin),
        "C" => Some(Op::Cos),
        _ => None,
    }
}

/// Parse a postfix token string into an [`Expression`].
///
/// `values` holds the initial value of each variable, indexed by letter.
/// Referenced variables become the graph's inputs in first-occurrence
/// order. Malformed streams (an unknown token, an operator with too few
/// values on the stack, or leftover values once the tokens run out) are
/// returned as errors.
pub fn parse(source: &str, values: &[f64; 26]) -> Result<Expression, AdjointError> {
    let mut graph = Graph::new();
    let mut variables: IndexMap<char, NodeId> = IndexMap::new();
    let mut stack: Vec<NodeId> = Vec::new();

    for token in source.split_whitespace() {
        if let Some(op) = token_op(token) {
            // Pop the operands in produce order: for a binary operator the
            // earlier-produced value is the first operand.
            let second = stack.pop().ok_or_else(|| AdjointError::MissingOperand {
                token: token.to_string(),
            })?;
            let first = if op.arity() == 2 {
                let first = stack.pop().ok_or_else(|| AdjointError::MissingOperand {
                    token: token.to_string(),
                })?;
                Some(first)
            } else {
                None
            };

            let node = graph.add_node(op);
            match first {
                Some(first) => {
                    graph.add_edge(first, node);
                    graph.add_edge(second, node);
                }
                None => graph.add_edge(second, node),
            }
            trace!(token = token, node = node.raw(), "applied operator");
            stack.push(node);
        } else {
            let mut chars = token.chars();
            match (chars.next(), chars.next()) {
                (Some(letter @ 'a'..='z'), None) => {
                    let id = *variables.entry(letter).or_insert_with(|| {
                        graph.add_input(values[(letter as u8 - b'a') as usize])
                    });
                    trace!(token = token, node = id.raw(), "referenced variable");
                    stack.push(id);
                }
                _ => {
                    return Err(AdjointError::UnknownToken {
                        token: token.to_string(),
                    })
                }
            }
        }
    }

    let root = stack.pop().ok_or(AdjointError::EmptyExpression)?;
    if !stack.is_empty() {
        return Err(AdjointError::UnconsumedValues { count: stack.len() });
    }

    debug!(
        nodes = graph.node_count(),
        variables = variables.len(),
        "parsed expression"
    );
    Ok(Expression {
        graph,
        root,
        variables,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn values(assignments: &[(char, f64)]) -> [f64; 26] {
        let mut values = [0.0; 26];
        for &(letter, value) in assignments {
            values[(letter as u8 - b'a') as usize] = value;
        }
        values
    }

    #[test]
    fn single_variable() {
        let mut expression = parse("a", &values(&[('a', 3.0)])).unwrap();
        assert_eq!(expression.evaluate().unwrap(), 3.0);
        assert_eq!(expression.graph().inputs().len(), 1);
        assert_eq!(expression.variable('a'), Some(expression.root()));
    }

    #[test]
    fn addition() {
        let mut expression = parse("a b +", &values(&[('a', 1.0), ('b', 2.0)])).unwrap();
        assert_eq!(expression.evaluate().unwrap(), 3.0);

        expression.differentiate().unwrap();
        assert_eq!(expression.gradient('a'), Some(1.0));
        assert_eq!(expression.gradient('b'), Some(1.0));
    }

    #[test]
    fn binary_operands_keep_produce_order() {
        // "a b -" is a - b, not b - a.
        let mut expression = parse("a b -", &values(&[('a', 6.0), ('b', 2.0)])).unwrap();
        assert_eq!(expression.evaluate().unwrap(), 4.0);

        let mut quotient = parse("a b /", &values(&[('a', 6.0), ('b', 2.0)])).unwrap();
        assert_eq!(quotient.evaluate().unwrap(), 3.0);
    }

    #[test]
    fn repeated_letter_reuses_one_node() {
        let mut expression = parse("a a *", &values(&[('a', 3.0)])).unwrap();
        assert_eq!(expression.graph().inputs().len(), 1);
        assert_eq!(expression.evaluate().unwrap(), 9.0);

        expression.differentiate().unwrap();
        // d(a^2)/da = 2a
        assert_eq!(expression.gradient('a'), Some(6.0));
    }

    #[test]
    fn unary_functions() {
        let mut expression = parse("a S", &values(&[('a', 0.0)])).unwrap();
        assert_eq!(expression.evaluate().unwrap(), 0.0);
        expression.differentiate().unwrap();
        assert_eq!(expression.gradient('a'), Some(1.0));

        let mut log = parse("a L", &values(&[('a', 1.0)])).unwrap();
        assert_eq!(log.evaluate().unwrap(), 0.0);

        let mut exp = parse("a E", &values(&[('a', 1.0)])).unwrap();
        assert_relative_eq!(exp.evaluate().unwrap(), std::f64::consts::E);

        let mut cos = parse("a C", &values(&[('a', 0.0)])).unwrap();
        assert_eq!(cos.evaluate().unwrap(), 1.0);
    }

    #[test]
    fn arbitrary_whitespace_separates_tokens() {
        let mut expression =
            parse("  a \t b\n +  ", &values(&[('a', 1.0), ('b', 2.0)])).unwrap();
        assert_eq!(expression.evaluate().unwrap(), 3.0);
    }

    #[test]
    fn variables_register_in_first_occurrence_order() {
        let expression = parse("b a + b *", &values(&[('a', 1.0), ('b', 2.0)])).unwrap();
        let b = expression.variable('b').unwrap();
        let a = expression.variable('a').unwrap();
        assert_eq!(expression.graph().inputs(), &[b, a]);
    }

    #[test]
    fn unknown_token_is_rejected() {
        let err = parse("a Z +", &values(&[])).unwrap_err();
        assert_eq!(
            err,
            AdjointError::UnknownToken {
                token: "Z".to_string()
            }
        );

        let err = parse("ab", &values(&[])).unwrap_err();
        assert_eq!(
            err,
            AdjointError::UnknownToken {
                token: "ab".to_string()
            }
        );
    }

    #[test]
    fn operator_without_operands_is_rejected() {
        let err = parse("a +", &values(&[])).unwrap_err();
        assert_eq!(
            err,
            AdjointError::MissingOperand {
                token: "+".to_string()
            }
        );

        let err = parse("S", &values(&[])).unwrap_err();
        assert_eq!(
            err,
            AdjointError::MissingOperand {
                token: "S".to_string()
            }
        );
    }

    #[test]
    fn leftover_values_are_rejected() {
        let err = parse("a b", &values(&[])).unwrap_err();
        assert_eq!(err, AdjointError::UnconsumedValues { count: 1 });
    }

    #[test]
    fn empty_source_is_rejected() {
        assert_eq!(parse("", &values(&[])).unwrap_err(), AdjointError::EmptyExpression);
        assert_eq!(
            parse("   \n ", &values(&[])).unwrap_err(),
            AdjointError::EmptyExpression
        );
    }
}
