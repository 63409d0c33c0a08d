//! Partitioning of and-inverter graphs for divide-and-conquer processing.
//!
//! And-inverter graphs represent boolean logic as two-input AND gates whose fan-ins and outputs
//! can carry inverters (NOT gates). These two primitives are universal, and because the gates are
//! so uniform, large networks can be hashed structurally and manipulated cheaply.
//!
//! That uniformity also makes and-inverter graphs good candidates for divide-and-conquer: rather
//! than run an expensive algorithm over a million-gate network, cut the network into a handful of
//! blocks, run the algorithm on each block in isolation, and splice the results back together.
//! The quality of the cut matters, since every signal crossing it becomes part of a block's
//! interface; finding a cut with few crossings is exactly the hypergraph partitioning problem, for
//! which mature external solvers exist.
//!
//! This crate implements the plumbing around such a solver:
//! - [`hypergraph`] exports a network as an hMetis-format hypergraph, one hyperedge per driver
//!   spanning the driver and its fanout;
//! - [`partition`] ingests the solver's vertex-to-block map, finds the hyperedges that cross the
//!   cut, and turns them into per-block interface sets;
//! - [`extract`] clones each block into a standalone sub-network that can be processed without
//!   touching the original;
//! - [`insert`] splices a (possibly restructured) sub-network back in, substituting the old cut
//!   outputs by the new ones;
//! - [`round`] chains the steps into one checked round, and [`cec`] verifies that the round
//!   preserved the network's function.
//!
//! The constant node never participates in a cut: constant fan-ins fold away when gates are
//! created, so the constant has no fanout and belongs to no block.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod aig;
pub mod cec;
pub mod error;
pub mod extract;
pub mod hypergraph;
pub mod insert;
pub mod partition;
pub mod round;
