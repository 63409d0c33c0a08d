use std::convert::TryFrom;
use std::path::Path;

use itertools::Itertools;
use petgraph::prelude::*;
use tracing::debug;

use crate::aig::Aig;
use crate::error::{Error, Result};
use crate::hypergraph::Hypergraph;

/// Identifier of a partition block.
pub type BlockId = i32;

/// Block id reserved for the constant node, which belongs to no block.
pub const CONSTANT_BLOCK: BlockId = -1;

/// The external engine that assigns every hypergraph vertex to a block.
///
/// Real engines read the exported file; stand-ins may use the in-memory
/// hypergraph directly. Whatever resources an implementation acquires live
/// only for the duration of one call, so nothing leaks across rounds.
pub trait Partitioner {
    /// Return one block id per zero-based vertex.
    fn partition(&self, hypergraph: &Hypergraph, file: &Path, num_blocks: u32) -> Result<Vec<BlockId>>;
}

/// A stand-in engine that splits the vertex range into contiguous stripes
/// of near-equal size. Deterministic and oblivious to connectivity; useful
/// as a baseline and in tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContiguousSplit;

impl Partitioner for ContiguousSplit {
    fn partition(&self, hypergraph: &Hypergraph, _file: &Path, num_blocks: u32) -> Result<Vec<BlockId>> {
        let vertices = hypergraph.num_vertices();
        if num_blocks < 2 {
            return Err(Error::Engine("need at least two blocks".into()));
        }
        let stripes = num_blocks as usize;
        if vertices < stripes {
            return Err(Error::Engine(format!(
                "cannot split {vertices} vertices into {stripes} blocks"
            )));
        }
        let stripe = (vertices + stripes - 1) / stripes;
        Ok((0..vertices).map(|vertex| (vertex / stripe) as BlockId).collect())
    }
}

/// A hyperedge whose vertices span more than one block.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BoundaryEdge {
    /// Index of the hyperedge in the exported hypergraph.
    pub edge: usize,
    /// The touched vertices, source first, in construction order.
    pub vertices: Vec<usize>,
}

/// The ingested result of an external partitioning run: a dense
/// vertex-to-block map, with a sentinel entry for the constant at vertex 0,
/// plus the boundary hyperedges.
#[derive(Clone, Debug)]
pub struct PartitionAssignment {
    blocks: Vec<BlockId>,
    num_blocks: u32,
    boundary: Vec<BoundaryEdge>,
}

impl PartitionAssignment {
    /// Ingest a raw engine result, one block id per zero-based vertex.
    ///
    /// Rejects a result whose length differs from the vertex count and any
    /// out-of-range block id; derives the boundary hyperedges by counting
    /// the distinct blocks each hyperedge touches.
    pub fn new(hypergraph: &Hypergraph, raw: &[BlockId], num_blocks: u32) -> Result<Self> {
        if raw.len() != hypergraph.num_vertices() {
            return Err(Error::AssignmentSize {
                found: raw.len(),
                expected: hypergraph.num_vertices(),
            });
        }
        let limit = BlockId::try_from(num_blocks)
            .map_err(|_| Error::Engine(format!("block count {num_blocks} out of id range")))?;

        let mut blocks = Vec::with_capacity(raw.len() + 1);
        blocks.push(CONSTANT_BLOCK);
        for (position, &block) in raw.iter().enumerate() {
            if block < 0 || block >= limit {
                return Err(Error::BlockRange { vertex: position + 1, block });
            }
            blocks.push(block);
        }

        let boundary = hypergraph
            .edges()
            .iter()
            .enumerate()
            .filter_map(|(edge, hyperedge)| {
                let vertices: Vec<usize> = std::iter::once(hyperedge.source)
                    .chain(hyperedge.sinks.iter().copied())
                    .collect();
                let connectivity = vertices.iter().map(|&v| blocks[v]).sorted().dedup().count();
                (connectivity > 1).then(|| BoundaryEdge { edge, vertices })
            })
            .collect::<Vec<_>>();
        debug!(boundary_edges = boundary.len(), "ingested partition result");

        Ok(Self { blocks, num_blocks, boundary })
    }

    /// Block of a vertex. Vertex 0 is the constant sentinel.
    pub fn block_of(&self, vertex: usize) -> Result<BlockId> {
        self.blocks.get(vertex).copied().ok_or(Error::MissingVertex(vertex))
    }

    #[must_use]
    pub fn num_blocks(&self) -> u32 {
        self.num_blocks
    }

    /// Hyperedges spanning more than one block.
    #[must_use]
    pub fn boundary_edges(&self) -> &[BoundaryEdge] {
        &self.boundary
    }

    /// The map must cover every gate and primary input plus the constant
    /// sentinel; anything else means the hypergraph and the network
    /// disagree and resolution cannot proceed.
    pub fn verify_coverage(&self, aig: &Aig) -> Result<()> {
        let expected = aig.num_gates() + aig.num_pis() + 1;
        if self.blocks.len() == expected {
            Ok(())
        } else {
            Err(Error::AssignmentSize { found: self.blocks.len(), expected })
        }
    }
}

/// The cut-induced interface of one block.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BlockBoundary {
    /// Cut inputs: the block's own primary inputs plus every cross-block
    /// source it consumes.
    pub inputs: Vec<NodeIndex>,
    /// Cut outputs: the block's own primary output nodes plus every source
    /// it must expose to other blocks.
    pub outputs: Vec<NodeIndex>,
}

impl BlockBoundary {
    fn add_input(&mut self, node: NodeIndex) {
        if !self.inputs.contains(&node) {
            self.inputs.push(node);
        }
    }

    fn add_output(&mut self, node: NodeIndex) {
        if !self.outputs.contains(&node) {
            self.outputs.push(node);
        }
    }
}

/// Pick the source of a boundary hyperedge: the vertex with the minimum
/// topological level, the first occurrence winning ties.
fn select_source(levels: &[u32], vertices: &[usize]) -> usize {
    let mut source = vertices[0];
    for &vertex in &vertices[1..] {
        if levels[vertex] < levels[source] {
            source = vertex;
        }
    }
    source
}

/// Turn boundary hyperedges into per-block cut-input/cut-output sets.
///
/// Every primary input seeds its block's cut inputs and every primary
/// output node seeds its block's cut outputs. Each boundary hyperedge then
/// adds its source to the source block's cut outputs (unless the source is
/// a primary input, which is globally visible already) and to the cut
/// inputs of every other block the hyperedge touches. Insertion is
/// idempotent, so hyperedge processing order does not affect the final
/// sets.
pub fn resolve(aig: &Aig, assignment: &PartitionAssignment) -> Result<Vec<BlockBoundary>> {
    assignment.verify_coverage(aig)?;
    let mut boundaries = vec![BlockBoundary::default(); assignment.num_blocks() as usize];

    for &input in aig.inputs() {
        let block = assignment.block_of(input.index())?;
        boundaries[block as usize].add_input(input);
    }
    for (position, output) in aig.outputs().iter().enumerate() {
        if aig.is_constant(output.node()) {
            // A constant-driven output has no producing block to extract.
            return Err(Error::ConstantOutput(position));
        }
        let block = assignment.block_of(output.node().index())?;
        boundaries[block as usize].add_output(output.node());
    }

    let levels = aig.levels();
    for edge in assignment.boundary_edges() {
        let source = select_source(&levels, &edge.vertices);
        let source_node = NodeIndex::new(source);
        let source_block = assignment.block_of(source)?;
        if !aig.is_pi(source_node) {
            boundaries[source_block as usize].add_output(source_node);
        }
        for &vertex in &edge.vertices {
            let block = assignment.block_of(vertex)?;
            if block != source_block {
                boundaries[block as usize].add_input(source_node);
            }
        }
    }
    Ok(boundaries)
}

#[cfg(test)]
mod tests {
    use super::{resolve, select_source, BlockId, ContiguousSplit, PartitionAssignment, Partitioner};
    use crate::hypergraph::tests::scenario_aig;
    use crate::hypergraph::{Hypergraph, HypergraphParams};
    use petgraph::prelude::*;
    use std::path::Path;

    fn nodes(indices: &[usize]) -> Vec<NodeIndex> {
        indices.iter().map(|&index| NodeIndex::new(index)).collect()
    }

    // Vertices 1..=4 are x1..x4, 5..=9 are f1..f5.
    const SCENARIO_BLOCKS: [BlockId; 9] = [0, 0, 0, 0, 0, 0, 0, 1, 1];

    #[test]
    fn ingest_rejects_wrong_sizes() {
        let aig = scenario_aig();
        let hypergraph = Hypergraph::from_aig(&aig, &HypergraphParams::default()).unwrap();
        assert!(PartitionAssignment::new(&hypergraph, &[0, 1], 2).is_err());
        assert!(PartitionAssignment::new(&hypergraph, &[0; 9], 2).is_ok());
        assert!(PartitionAssignment::new(&hypergraph, &[2; 9], 2).is_err());
        assert!(PartitionAssignment::new(&hypergraph, &[-1; 9], 2).is_err());
    }

    #[test]
    fn constant_maps_to_the_sentinel_block() {
        let aig = scenario_aig();
        let hypergraph = Hypergraph::from_aig(&aig, &HypergraphParams::default()).unwrap();
        let assignment = PartitionAssignment::new(&hypergraph, &SCENARIO_BLOCKS, 2).unwrap();
        assert_eq!(assignment.block_of(0).unwrap(), super::CONSTANT_BLOCK);
        assert_eq!(assignment.block_of(9).unwrap(), 1);
        assert!(assignment.block_of(10).is_err());
        assert!(assignment.verify_coverage(&aig).is_ok());
    }

    #[test]
    fn boundary_edges_span_blocks() {
        let aig = scenario_aig();
        let hypergraph = Hypergraph::from_aig(&aig, &HypergraphParams::default()).unwrap();
        let assignment = PartitionAssignment::new(&hypergraph, &SCENARIO_BLOCKS, 2).unwrap();

        // f1 -> f4, f2 -> f4 and f3 -> f5 cross the cut; f4 -> f5 does not.
        let crossing: Vec<&[usize]> = assignment
            .boundary_edges()
            .iter()
            .map(|edge| edge.vertices.as_slice())
            .collect();
        assert_eq!(crossing, vec![&[5, 8][..], &[6, 8][..], &[7, 9][..]]);
    }

    #[test]
    fn resolve_scenario_boundaries() {
        let aig = scenario_aig();
        let hypergraph = Hypergraph::from_aig(&aig, &HypergraphParams::default()).unwrap();
        let assignment = PartitionAssignment::new(&hypergraph, &SCENARIO_BLOCKS, 2).unwrap();
        let boundaries = resolve(&aig, &assignment).unwrap();

        assert_eq!(boundaries[0].inputs, nodes(&[1, 2, 3, 4]));
        assert_eq!(boundaries[0].outputs, nodes(&[5, 6, 7]));
        assert_eq!(boundaries[1].inputs, nodes(&[5, 6, 7]));
        assert_eq!(boundaries[1].outputs, nodes(&[9]));
    }

    #[test]
    fn source_selection_is_deterministic() {
        // Levels indexed by vertex id; vertices at levels [3, 1, 1, 5].
        let levels = [0, 3, 1, 1, 5];
        assert_eq!(select_source(&levels, &[1, 2, 3, 4]), 2);
        assert_eq!(select_source(&levels, &[1, 3, 2, 4]), 3);
        assert_eq!(select_source(&levels, &[4, 2, 1, 3]), 2);
    }

    #[test]
    fn pi_sources_stay_out_of_cut_outputs() {
        let aig = scenario_aig();
        let hypergraph = Hypergraph::from_aig(&aig, &HypergraphParams::default()).unwrap();
        // Split x3 away from its consumers: its hyperedge crosses, but as a
        // primary input it must not become a cut output.
        let blocks: [BlockId; 9] = [0, 0, 1, 0, 0, 0, 0, 0, 0];
        let assignment = PartitionAssignment::new(&hypergraph, &blocks, 2).unwrap();
        let boundaries = resolve(&aig, &assignment).unwrap();

        assert_eq!(boundaries[1].inputs, nodes(&[3]));
        assert!(boundaries[1].outputs.is_empty());
        assert!(boundaries[0].inputs.contains(&NodeIndex::new(3)));
        assert!(!boundaries[0].outputs.contains(&NodeIndex::new(3)));
    }

    #[test]
    fn constant_output_is_rejected() {
        let mut aig = crate::aig::Aig::new();
        let a = aig.create_pi();
        let constant = aig.constant(true);
        let _ = aig.create_po(constant);
        let f = aig.create_and(a, a); // folds to a; keep one real vertex
        let _ = aig.create_po(f);

        let hypergraph = Hypergraph::from_aig(&aig, &HypergraphParams::default()).unwrap();
        let assignment = PartitionAssignment::new(&hypergraph, &[0], 2).unwrap();
        assert!(matches!(
            resolve(&aig, &assignment),
            Err(crate::error::Error::ConstantOutput(0))
        ));
    }

    #[test]
    fn contiguous_split_stripes_the_vertex_range() {
        let aig = scenario_aig();
        let hypergraph = Hypergraph::from_aig(&aig, &HypergraphParams::default()).unwrap();
        let raw = ContiguousSplit.partition(&hypergraph, Path::new("unused"), 2).unwrap();
        assert_eq!(raw, vec![0, 0, 0, 0, 0, 1, 1, 1, 1]);
        assert!(ContiguousSplit.partition(&hypergraph, Path::new("unused"), 1).is_err());
    }
}
