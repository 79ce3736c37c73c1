//! Graph Engine
//!
//! The engine owns the node arena and runs the two passes over it:
//!
//! 1. `forward` seeds a FIFO with the graph inputs and evaluates each node
//!    once all of its operands are ready (Kahn's algorithm over the
//!    operand/consumer edges), discovering the graph's sinks along the way.
//! 2. `backward` seeds the root's adjoint with 1 and propagates adjoints
//!    to operands once all of a node's consumers have contributed,
//!    accumulating the multivariate chain rule.
//!
//! Scheduling state (the per-node "how many edges are still pending"
//! counter) is owned by each pass, not by the nodes, so the two passes can
//! never leak counter state into each other even when re-run back to back.

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::error::AdjointError;

use super::node::{Node, NodeId, Op};
use super::queue::Queue;

/// A scalar computation graph.
///
/// Nodes live in an arena owned by the graph and are addressed by [`NodeId`]
/// indices; operand/consumer lists store ids, so the graph has no interior
/// reference cycles to manage. Nodes are wired once and never removed.
#[derive(Debug)]
pub struct Graph {
    /// All nodes, indexed by [`NodeId`].
    nodes: Vec<Node>,

    /// Source nodes (`Identity` with externally assigned values), in
    /// registration order. Seeds the forward pass.
    inputs: Vec<NodeId>,

    /// Sink nodes (no consumers) in forward-pass visitation order.
    /// Rebuilt by each forward pass.
    outputs: Vec<NodeId>,
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Add an unwired node applying `op`.
    pub fn add_node(&mut self, op: Op) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Node::new(op));
        id
    }

    /// Add an `Identity` node carrying `value` and register it as a graph
    /// input.
    pub fn add_input(&mut self, value: f64) -> NodeId {
        let id = self.add_node(Op::Identity);
        self.nodes[id.raw()].set_value(value);
        self.inputs.push(id);
        id
    }

    /// Wire `operand` as the next operand of `consumer`.
    ///
    /// Appends the operand edge and its reciprocal consumer edge in one
    /// call, keeping the two directions in sync. Call order defines operand
    /// positions, which matter for `Sub`/`Div` and for the per-position
    /// derivative rule. Wiring the same pair twice records two edge pairs;
    /// both passes rely on that per-occurrence bookkeeping when a value is
    /// consumed more than once by the same operation.
    ///
    /// # Panics
    ///
    /// Panics if either id does not belong to this graph.
    pub fn add_edge(&mut self, operand: NodeId, consumer: NodeId) {
        self.nodes[consumer.raw()].add_operand(operand);
        self.nodes[operand.raw()].add_consumer(consumer);
    }

    /// Get a reference to a node.
    ///
    /// # Panics
    ///
    /// Panics if the id does not belong to this graph.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.raw()]
    }

    /// Get a node's forward value.
    pub fn value(&self, id: NodeId) -> f64 {
        self.nodes[id.raw()].value()
    }

    /// Get a node's accumulated adjoint.
    pub fn adjoint(&self, id: NodeId) -> f64 {
        self.nodes[id.raw()].adjoint()
    }

    /// Assign an externally supplied value, e.g. to re-run a forward pass
    /// with new inputs.
    pub fn set_value(&mut self, id: NodeId, value: f64) {
        self.nodes[id.raw()].set_value(value);
    }

    /// Zero every adjoint.
    ///
    /// The backward pass accumulates and never resets on its own (so
    /// intermediate adjoints stay inspectable afterwards); call this before
    /// re-running `backward`, or the contributions sum on top of the old
    /// ones.
    pub fn reset_adjoints(&mut self) {
        for node in &mut self.nodes {
            node.set_adjoint(0.0);
        }
    }

    /// The registered input nodes, in registration order.
    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    /// The sinks discovered by the last forward pass.
    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    /// Total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Evaluate every node reachable from the inputs, in topological order.
    ///
    /// Input values must have been assigned beforehand; they are passed
    /// through unchanged, never recomputed. Each reachable node is
    /// evaluated exactly once, strictly after all of its operands. Sinks
    /// (nodes with no consumers) are recorded into `outputs` in visitation
    /// order.
    ///
    /// Nodes not transitively fed by the inputs (including any cyclic
    /// region, which can never become ready) are left unvisited and keep
    /// their current value.
    pub fn forward(&mut self) -> Result<(), AdjointError> {
        self.outputs.clear();

        // Pass-local scheduling state: operands still pending per node,
        // initialized lazily on first touch.
        let mut pending: Vec<Option<usize>> = vec![None; self.nodes.len()];
        let mut queue = Queue::new();

        for &input in &self.inputs {
            queue.push_back(input);
        }

        while !queue.is_empty() {
            let id = queue.pop_front()?;
            let (x, y) = self.operand_values(id)?;
            let value = self.nodes[id.raw()].op().evaluate(x, y);
            self.nodes[id.raw()].set_value(value);
            trace!(node = id.raw(), value, "evaluated node");

            let node = &self.nodes[id.raw()];
            for &consumer in node.consumers() {
                let remaining = pending[consumer.raw()]
                    .get_or_insert_with(|| self.nodes[consumer.raw()].operands().len());
                *remaining -= 1;
                if *remaining == 0 {
                    queue.push_back(consumer);
                }
            }

            if node.consumers().is_empty() {
                self.outputs.push(id);
            }
        }

        debug!(outputs = self.outputs.len(), "forward pass complete");
        Ok(())
    }

    /// Accumulate the partial derivatives of `root` into the adjoints of
    /// every node on a path to it, in reverse topological order.
    ///
    /// Requires a completed forward pass, so every operand value the
    /// derivative rules read is defined. Seeds `root`'s adjoint to 1 by
    /// assignment, then adds each consumer's contribution into its operands;
    /// a node reached through multiple paths sums them, which is the
    /// multivariate chain rule. Nodes on no path to `root` are never visited
    /// and keep their current adjoint.
    ///
    /// A node is scheduled only once *all* of its consumers have
    /// contributed, so adjoints are exact when every consumer chain leads
    /// back to `root`: pick a sink, typically one found in `outputs`.
    pub fn backward(&mut self, root: NodeId) -> Result<(), AdjointError> {
        // Pass-local scheduling state: consumers still pending per node.
        let mut pending: Vec<Option<usize>> = vec![None; self.nodes.len()];
        let mut queue = Queue::new();

        self.nodes[root.raw()].set_adjoint(1.0);
        queue.push_back(root);

        while !queue.is_empty() {
            let id = queue.pop_front()?;
            let (x, y) = self.operand_values(id)?;

            let node = &self.nodes[id.raw()];
            let op = node.op();
            let adjoint = node.adjoint();
            let operands: SmallVec<[NodeId; 2]> = SmallVec::from_slice(node.operands());

            for (position, &operand) in operands.iter().enumerate() {
                let contribution = adjoint * op.local_derivative(x, y, position);
                let consumer_count = self.nodes[operand.raw()].consumers().len();
                self.nodes[operand.raw()].add_adjoint(contribution);
                trace!(node = operand.raw(), contribution, "accumulated adjoint");

                let remaining = pending[operand.raw()].get_or_insert(consumer_count);
                *remaining -= 1;
                if *remaining == 0 {
                    queue.push_back(operand);
                }
            }
        }

        debug!(root = root.raw(), "backward pass complete");
        Ok(())
    }

    /// Read the operand values of `id` as the `(x, y)` pair the rule tables
    /// are written over, checking arity on the way.
    ///
    /// For `Identity` (no operands) `x` is the node's own value, so
    /// [`Op::evaluate`] passes it through; a missing second operand reads
    /// as 0, which every unary derivative rule ignores.
    fn operand_values(&self, id: NodeId) -> Result<(f64, f64), AdjointError> {
        let node = &self.nodes[id.raw()];
        let op = node.op();
        let operands = node.operands();
        if operands.len() != op.arity() {
            return Err(AdjointError::OperandArity {
                op,
                expected: op.arity(),
                actual: operands.len(),
            });
        }

        let x = match operands.first() {
            Some(&first) => self.nodes[first.raw()].value(),
            None => node.value(),
        };
        let y = match operands.get(1) {
            Some(&second) => self.nodes[second.raw()].value(),
            None => 0.0,
        };
        Ok((x, y))
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
