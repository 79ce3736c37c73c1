//! Computation Graph
//!
//! This module implements the scalar computation graph: a directed acyclic
//! graph (DAG) where nodes apply arithmetic or elementary-function
//! operations to the values of their operands.
//!
//! # Overview
//!
//! - Nodes represent one scalar each: either an externally supplied input
//!   (`Identity`) or an operation over other nodes' values
//! - Edges run in both directions: a node lists the operands it reads from
//!   and the consumers that read it
//!
//! A forward pass evaluates every node reachable from the inputs in
//! topological order; a backward pass propagates adjoints (accumulated
//! partial derivatives of one chosen output) in reverse topological order.
//!
//! # Design Decisions
//!
//! 1. Nodes live in an arena owned by the graph and are addressed by dense
//!    integer ids. Edge lists store ids, not references, so the mutual
//!    operand/consumer bookkeeping creates no ownership cycles.
//!
//! 2. We maintain both forward (operand) and reverse (consumer) edges
//!    because the two passes traverse the graph in opposite directions.
//!
//! 3. Scheduling counters are owned by the running pass rather than stored
//!    on the nodes: forward counts pending operands, backward counts
//!    pending consumers, and neither can see the other's state.

mod engine;
mod node;
mod queue;

pub use engine::Graph;
pub use node::{Node, NodeId, Op};
pub use queue::Queue;
