use thiserror::Error;

/// Everything that can abort a partition round.
///
/// Apart from I/O and parse failures, every variant is a consistency error:
/// it indicates a logic bug in boundary computation rather than a transient
/// condition, so there is no retry path.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading or writing a file failed.
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
    /// An AIGER file could not be parsed. The one recoverable error class:
    /// callers may skip the benchmark.
    #[error("failed to parse aiger file: {0}")]
    Parse(String),
    /// The external partition engine reported a failure.
    #[error("partition engine: {0}")]
    Engine(String),
    /// A network feature the pipeline does not model.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
    /// The engine result does not cover the vertex set.
    #[error("block assignment covers {found} vertices, expected {expected}")]
    AssignmentSize {
        /// Entries in the ingested map.
        found: usize,
        /// Entries the network requires.
        expected: usize,
    },
    /// A vertex id with no entry in the block map.
    #[error("vertex {0} has no block assignment")]
    MissingVertex(usize),
    /// The engine assigned a vertex outside `0..num_blocks`.
    #[error("vertex {vertex} assigned to out-of-range block {block}")]
    BlockRange {
        /// One-based vertex id.
        vertex: usize,
        /// The offending block id.
        block: i32,
    },
    /// A node index beyond the dense vertex range; the network must be
    /// swept before it can be exported.
    #[error("node index {0} exceeds the dense vertex range; sweep the network first")]
    SparseIndex(usize),
    /// A primary output driven by the constant node.
    #[error("primary output {0} is driven by the constant node")]
    ConstantOutput(usize),
    /// A block that consumes nothing; every block needs at least one input.
    #[error("block {0} has an empty cut-input set")]
    EmptyInputs(u32),
    /// A block that produces nothing; every block needs at least one output.
    #[error("block {0} has an empty cut-output set")]
    EmptyOutputs(u32),
    /// The blocks' owned gate sets do not add up to the network.
    #[error("blocks own {found} gates in total, network has {expected}")]
    GateConservation {
        /// Sum of owned-gate counts.
        found: usize,
        /// Gates in the original network.
        expected: usize,
    },
    /// A gate fan-in that is neither a cut input nor an owned gate.
    #[error("node {0} is outside the window of block {1}")]
    OutsideWindow(usize, u32),
    /// A substitution endpoint that was already replaced; boundary sets
    /// overlapped or were applied out of order.
    #[error("substitution target {0} is dead")]
    DeadNode(usize),
    /// A sub-network whose declared outputs do not match its record.
    #[error("sub-network has {found} outputs, reinsertion record has {expected}")]
    OutputArity {
        /// Outputs declared by the sub-network.
        found: usize,
        /// Entries in the reinsertion record.
        expected: usize,
    },
    /// A sub-network whose inputs do not match its record.
    #[error("sub-network has {found} inputs, cut-input record has {expected}")]
    InputArity {
        /// Inputs declared by the sub-network.
        found: usize,
        /// Entries in the cut-input record.
        expected: usize,
    },
    /// The network contains a cycle after reinsertion.
    #[error("network contains a cycle after reinsertion")]
    Cyclic,
    /// Dead nodes still reachable from a primary output after reinsertion.
    #[error("{0} reachable dead nodes after reinsertion")]
    ReachableDead(usize),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
