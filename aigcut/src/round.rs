use std::path::PathBuf;

use tracing::info;

use crate::aig::Aig;
use crate::error::{Error, Result};
use crate::extract::extract_blocks;
use crate::hypergraph::{Hypergraph, HypergraphParams};
use crate::insert::insert_back;
use crate::partition::{resolve, PartitionAssignment, Partitioner};

/// Options for one partition round.
#[derive(Clone, Debug)]
pub struct RoundParams {
    /// How many blocks to cut the network into.
    pub num_blocks: u32,
    /// Where to write the hMetis file handed to the engine.
    pub file_name: PathBuf,
    /// Export options.
    pub hypergraph: HypergraphParams,
}

impl Default for RoundParams {
    fn default() -> Self {
        Self {
            num_blocks: 2,
            file_name: PathBuf::from("tmp.hmetis"),
            hypergraph: HypergraphParams::default(),
        }
    }
}

/// What one round did.
#[derive(Clone, Debug)]
pub struct RoundReport {
    /// Live gates before the round.
    pub gates_before: usize,
    /// Live gates after reinsertion and sweeping.
    pub gates_after: usize,
    /// Hyperedges that crossed the cut.
    pub boundary_edges: usize,
    /// Gates owned by each block.
    pub block_gates: Vec<usize>,
}

/// Run one export / partition / extract / transform / reinsert round.
///
/// `transform` is applied to each block's window in isolation; the identity
/// closure makes the round a structural no-op. The returned network is
/// swept, so its indices are dense and it can be exported again. Any
/// inconsistency aborts the round; the incoming network is consumed either
/// way, so callers keep a copy if they need to retry.
pub fn partition_round<P, F>(
    aig: Aig,
    engine: &P,
    params: &RoundParams,
    mut transform: F,
) -> Result<(Aig, RoundReport)>
where
    P: Partitioner + ?Sized,
    F: FnMut(Aig) -> Aig,
{
    let mut aig = aig;
    let gates_before = aig.num_gates();

    let hypergraph = Hypergraph::from_aig(&aig, &params.hypergraph)?;
    hypergraph.write_to_file(&params.file_name)?;
    info!(
        edges = hypergraph.num_edges(),
        vertices = hypergraph.num_vertices(),
        file = %params.file_name.display(),
        "exported hypergraph"
    );

    let raw = engine.partition(&hypergraph, &params.file_name, params.num_blocks)?;
    let assignment = PartitionAssignment::new(&hypergraph, &raw, params.num_blocks)?;
    let boundaries = resolve(&aig, &assignment)?;
    let parts = extract_blocks(&aig, &assignment, &boundaries)?;
    info!(
        blocks = parts.len(),
        boundary_edges = assignment.boundary_edges().len(),
        "partitioned network"
    );

    let block_gates: Vec<usize> = parts.iter().map(|part| part.gates.len()).collect();
    for mut part in parts {
        part.aig = transform(std::mem::take(&mut part.aig));
        insert_back(&mut aig, &part)?;
    }

    if petgraph::algo::is_cyclic_directed(aig.graph()) {
        return Err(Error::Cyclic);
    }
    let stale = aig.count_reachable_dead_nodes();
    if stale != 0 {
        return Err(Error::ReachableDead(stale));
    }

    let swept = aig.sweep();
    let report = RoundReport {
        gates_before,
        gates_after: swept.num_gates(),
        boundary_edges: assignment.boundary_edges().len(),
        block_gates,
    };
    info!(
        gates_before = report.gates_before,
        gates_after = report.gates_after,
        "finished partition round"
    );
    Ok((swept, report))
}
