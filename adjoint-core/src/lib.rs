//! Adjoint Core
//!
//! This crate provides the core engine for the Adjoint scalar automatic
//! differentiation library. It implements:
//!
//! - A computation-graph arena of scalar arithmetic and elementary-function
//!   nodes
//! - Forward evaluation by topological (Kahn's-algorithm) scheduling over a
//!   FIFO queue
//! - Reverse-mode differentiation: adjoints of one chosen output with
//!   respect to every node, accumulated in reverse topological order
//! - A postfix (reverse-Polish) expression builder as the
//!   graph-construction driver
//!
//! # Architecture
//!
//! The crate is organized into a few modules:
//!
//! - `graph`: the node arena, the scheduling queue, and both passes
//! - `expr`: postfix parsing into a graph
//! - `error`: the crate-wide error type
//!
//! # Example
//!
//! ```rust
//! use adjoint_core::expr;
//!
//! let mut values = [0.0; 26];
//! values[0] = 1.0; // a
//! values[1] = 2.0; // b
//!
//! let mut expression = expr::parse("a b +", &values).unwrap();
//! assert_eq!(expression.evaluate().unwrap(), 3.0);
//!
//! expression.differentiate().unwrap();
//! assert_eq!(expression.gradient('a'), Some(1.0));
//! assert_eq!(expression.gradient('b'), Some(1.0));
//! ```

pub mod error;
pub mod expr;
pub mod graph;

pub use error::AdjointError;
pub use expr::Expression;
pub use graph::{Graph, Node, NodeId, Op};
