use std::collections::HashMap;

use itertools::Itertools;
use petgraph::prelude::*;
use tracing::debug;

use crate::aig::{Aig, Signal};
use crate::error::{Error, Result};
use crate::partition::{BlockBoundary, PartitionAssignment};

/// A standalone window over one block: a fresh network whose primary inputs
/// are the block's cut inputs and whose primary outputs are its cut
/// outputs, plus the original node indices they correspond to.
#[derive(Clone, Debug)]
pub struct Subnetwork {
    /// The cloned window, independent of the source network.
    pub aig: Aig,
    /// Cut-input nodes in the source network, ascending; position `i` here
    /// is primary input `i` of the window.
    pub inputs: Vec<NodeIndex>,
    /// Cut-output signals in the source network, in boundary order;
    /// position `i` here is primary output `i` of the window.
    pub outputs: Vec<Signal>,
    /// The gates the block owns in the source network, ascending.
    pub gates: Vec<NodeIndex>,
}

/// Carve the network into one sub-network per block.
///
/// A block owns the gates assigned to it, minus any that double as its own
/// cut inputs (a gate another block computes for it). Cloning walks the
/// owned gates in ascending index order, which is a valid topological order
/// on a dense network, mapping fan-ins through the cut; a fan-in that is
/// neither a cut input nor an owned gate means the boundary sets are
/// inconsistent.
pub fn extract_blocks(
    aig: &Aig,
    assignment: &PartitionAssignment,
    boundaries: &[BlockBoundary],
) -> Result<Vec<Subnetwork>> {
    let mut owned: Vec<Vec<NodeIndex>> = vec![Vec::new(); boundaries.len()];
    for gate in aig.gates() {
        let assigned = assignment.block_of(gate.index())?;
        let block = usize::try_from(assigned)
            .map_err(|_| Error::BlockRange { vertex: gate.index(), block: assigned })?;
        if !boundaries[block].inputs.contains(&gate) {
            owned[block].push(gate);
        }
    }

    let mut parts = Vec::with_capacity(boundaries.len());
    for (block, boundary) in boundaries.iter().enumerate() {
        let inputs: Vec<NodeIndex> = boundary.inputs.iter().copied().sorted().collect();
        let gates: Vec<NodeIndex> = owned[block].iter().copied().sorted().collect();
        let block_id = block as u32;
        if inputs.is_empty() {
            return Err(Error::EmptyInputs(block_id));
        }
        if boundary.outputs.is_empty() {
            return Err(Error::EmptyOutputs(block_id));
        }
        let outputs: Vec<Signal> = boundary
            .outputs
            .iter()
            .map(|&node| Signal::new(node, false))
            .collect();

        let part = clone_subnetwork(aig, block_id, inputs, outputs, gates)?;
        debug!(
            block = block_id,
            inputs = part.inputs.len(),
            outputs = part.outputs.len(),
            gates = part.gates.len(),
            "extracted sub-network"
        );
        parts.push(part);
    }

    let found: usize = parts.iter().map(|part| part.gates.len()).sum();
    if found != aig.num_gates() {
        return Err(Error::GateConservation { found, expected: aig.num_gates() });
    }
    Ok(parts)
}

fn clone_subnetwork(
    aig: &Aig,
    block: u32,
    inputs: Vec<NodeIndex>,
    outputs: Vec<Signal>,
    gates: Vec<NodeIndex>,
) -> Result<Subnetwork> {
    let mut clone = Aig::new();
    let mut map: HashMap<NodeIndex, Signal> = HashMap::new();
    for &input in &inputs {
        let cloned = clone.create_pi();
        map.insert(input, cloned);
    }
    let lookup = |map: &HashMap<NodeIndex, Signal>, signal: Signal| -> Result<Signal> {
        map.get(&signal.node())
            .copied()
            .map(|cloned| cloned ^ signal.is_complement())
            .ok_or(Error::OutsideWindow(signal.node().index(), block))
    };
    for &gate in &gates {
        let (a, b) = aig
            .try_unwrap_and(gate)
            .ok_or(Error::OutsideWindow(gate.index(), block))?;
        let a = lookup(&map, a)?;
        let b = lookup(&map, b)?;
        let cloned = clone.create_and(a, b);
        map.insert(gate, cloned);
    }
    for &output in &outputs {
        let cloned = lookup(&map, output)?;
        let _ = clone.create_po(cloned);
    }
    Ok(Subnetwork { aig: clone, inputs, outputs, gates })
}

#[cfg(test)]
mod tests {
    use super::extract_blocks;
    use crate::hypergraph::tests::scenario_aig;
    use crate::hypergraph::{Hypergraph, HypergraphParams};
    use crate::partition::{resolve, BlockId, PartitionAssignment};
    use petgraph::prelude::*;

    fn nodes(indices: &[usize]) -> Vec<NodeIndex> {
        indices.iter().map(|&index| NodeIndex::new(index)).collect()
    }

    const SCENARIO_BLOCKS: [BlockId; 9] = [0, 0, 0, 0, 0, 0, 0, 1, 1];

    #[test]
    fn scenario_extraction() {
        let aig = scenario_aig();
        let hypergraph = Hypergraph::from_aig(&aig, &HypergraphParams::default()).unwrap();
        let assignment = PartitionAssignment::new(&hypergraph, &SCENARIO_BLOCKS, 2).unwrap();
        let boundaries = resolve(&aig, &assignment).unwrap();
        let parts = extract_blocks(&aig, &assignment, &boundaries).unwrap();

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].inputs, nodes(&[1, 2, 3, 4]));
        assert_eq!(parts[0].gates, nodes(&[5, 6, 7]));
        assert_eq!(parts[0].aig.num_pos(), 3);
        assert_eq!(parts[1].inputs, nodes(&[5, 6, 7]));
        assert_eq!(parts[1].gates, nodes(&[8, 9]));
        assert_eq!(parts[1].aig.num_pos(), 1);
        assert_eq!(parts[0].gates.len() + parts[1].gates.len(), aig.num_gates());
    }

    #[test]
    fn windows_compute_their_cones() {
        let aig = scenario_aig();
        let hypergraph = Hypergraph::from_aig(&aig, &HypergraphParams::default()).unwrap();
        let assignment = PartitionAssignment::new(&hypergraph, &SCENARIO_BLOCKS, 2).unwrap();
        let boundaries = resolve(&aig, &assignment).unwrap();
        let parts = extract_blocks(&aig, &assignment, &boundaries).unwrap();

        // Block 0 over (x1, x2, x3, x4) computes f1, f2, f3.
        let values = parts[0].aig.evaluate(&[true, true, true, false]);
        assert_eq!(values, vec![true, false, true]);
        // Block 1 over (f1, f2, f3) computes f5 = f3 & (f1 & f2).
        let values = parts[1].aig.evaluate(&[true, true, true]);
        assert_eq!(values, vec![true]);
        let values = parts[1].aig.evaluate(&[true, false, true]);
        assert_eq!(values, vec![false]);
    }

    #[test]
    fn lopsided_assignments_are_rejected() {
        let aig = scenario_aig();
        let hypergraph = Hypergraph::from_aig(&aig, &HypergraphParams::default()).unwrap();
        // Everything in block 0 leaves block 1 with no inputs at all.
        let assignment = PartitionAssignment::new(&hypergraph, &[0; 9], 2).unwrap();
        let boundaries = resolve(&aig, &assignment).unwrap();
        assert!(matches!(
            extract_blocks(&aig, &assignment, &boundaries),
            Err(crate::error::Error::EmptyInputs(1))
        ));
    }
}
