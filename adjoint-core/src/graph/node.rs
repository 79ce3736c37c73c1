//! Graph Nodes
//!
//! This module defines the nodes that live in the computation graph: the
//! operation vocabulary, the per-operation value and derivative rules, and
//! the node record itself.

use smallvec::SmallVec;

/// Unique identifier for a node in the computation graph.
///
/// Ids are dense indices into the owning graph's node arena. Nodes are never
/// removed, so an id stays valid for the life of its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Get the raw index value.
    pub fn raw(&self) -> usize {
        self.0
    }
}

/// The operation a node applies to its operands.
///
/// `Identity` marks an externally supplied value (a graph input / free
/// variable); it has no operands. The binary operations read exactly two
/// operands, in order; the elementary functions read one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Externally assigned value, passed through unchanged.
    Identity,

    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,

    // Elementary functions
    Exp,
    Log,
    Sin,
    Cos,
}

impl Op {
    /// Number of operands this operation reads.
    pub fn arity(self) -> usize {
        match self {
            Op::Identity => 0,
            Op::Add | Op::Sub | Op::Mul | Op::Div => 2,
            Op::Exp | Op::Log | Op::Sin | Op::Cos => 1,
        }
    }

    /// The forward value rule.
    ///
    /// `x` is the first operand's value and `y` the second's; unary
    /// operations ignore `y`. For `Identity`, `x` is the node's own
    /// externally assigned value, which passes through unchanged, so the
    /// forward pass never recomputes an input.
    ///
    /// Division by zero and the log of a non-positive value are not
    /// intercepted; they yield the usual IEEE-754 infinities/NaNs.
    pub fn evaluate(self, x: f64, y: f64) -> f64 {
        match self {
            Op::Identity => x,
            Op::Add => x + y,
            Op::Sub => x - y,
            Op::Mul => x * y,
            Op::Div => x / y,
            Op::Exp => x.exp(),
            Op::Log => x.ln(),
            Op::Sin => x.sin(),
            Op::Cos => x.cos(),
        }
    }

    /// The local partial derivative with respect to the operand at
    /// `position`, evaluated at operand values `x` (position 0) and `y`
    /// (position 1).
    ///
    /// Kept next to [`Op::evaluate`] so the value rule and its derivative
    /// can be reviewed together.
    pub fn local_derivative(self, x: f64, y: f64, position: usize) -> f64 {
        match (self, position) {
            (Op::Identity, _) => 1.0,
            (Op::Add, _) => 1.0,
            (Op::Sub, 0) => 1.0,
            (Op::Sub, _) => -1.0,
            (Op::Mul, 0) => y,
            (Op::Mul, _) => x,
            (Op::Div, 0) => 1.0 / y,
            (Op::Div, _) => -x / (y * y),
            (Op::Exp, _) => x.exp(),
            (Op::Log, _) => 1.0 / x,
            (Op::Sin, _) => x.cos(),
            (Op::Cos, _) => -x.sin(),
        }
    }
}

/// A node in the computation graph.
///
/// Holds the operation tag, the forward value, the accumulated adjoint, and
/// both edge directions. Edge lists are ordered and may contain duplicates:
/// a node consumed twice by the same operation appears twice as an operand
/// and records two consumer entries, one per edge. Operand order is
/// semantically significant for `Sub`/`Div` and for the per-position
/// derivative rule.
#[derive(Debug)]
pub struct Node {
    /// The operation this node applies.
    op: Op,

    /// Forward result; meaningful once a forward pass has visited the node
    /// (or assigned directly for `Identity` inputs).
    value: f64,

    /// Accumulated partial derivative of the differentiation root with
    /// respect to this node. Zero until a backward pass contributes to it.
    adjoint: f64,

    /// Nodes this node reads values from, in operand order.
    operands: SmallVec<[NodeId; 2]>,

    /// Nodes that read this node's value. Used only for scheduling; order
    /// among consumers does not affect results.
    consumers: SmallVec<[NodeId; 2]>,
}

impl Node {
    /// Create an unwired node applying `op`.
    pub(crate) fn new(op: Op) -> Self {
        Self {
            op,
            value: 0.0,
            adjoint: 0.0,
            operands: SmallVec::new(),
            consumers: SmallVec::new(),
        }
    }

    /// Get the node's operation.
    pub fn op(&self) -> Op {
        self.op
    }

    /// Get the forward value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Get the accumulated adjoint.
    pub fn adjoint(&self) -> f64 {
        self.adjoint
    }

    /// Get the operand list, in operand order.
    pub fn operands(&self) -> &[NodeId] {
        &self.operands
    }

    /// Get the consumer list.
    pub fn consumers(&self) -> &[NodeId] {
        &self.consumers
    }

    pub(crate) fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    pub(crate) fn set_adjoint(&mut self, adjoint: f64) {
        self.adjoint = adjoint;
    }

    pub(crate) fn add_adjoint(&mut self, contribution: f64) {
        self.adjoint += contribution;
    }

    pub(crate) fn add_operand(&mut self, node_id: NodeId) {
        self.operands.push(node_id);
    }

    pub(crate) fn add_consumer(&mut self, node_id: NodeId) {
        self.consumers.push(node_id);
    }
}
