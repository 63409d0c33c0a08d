use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use itertools::Itertools;
use petgraph::prelude::*;

use crate::aig::Aig;
use crate::error::{Error, Result};

/// Options for exporting a network as a hypergraph.
#[derive(Clone, Debug)]
pub struct HypergraphParams {
    /// Leave primary outputs out of the sink lists. Only `true` is
    /// supported: outputs are signal references rather than nodes, so there
    /// is no vertex to stand in for them.
    pub skip_po_as_sink: bool,
    /// Emit a weight per hyperedge (the fanout count of its source).
    pub edge_weights: bool,
    /// Emit a unit weight per hyperedge-bearing vertex.
    pub vertex_weights: bool,
}

impl Default for HypergraphParams {
    fn default() -> Self {
        Self { skip_po_as_sink: true, edge_weights: false, vertex_weights: false }
    }
}

/// One source vertex together with its fanout sinks.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Hyperedge {
    /// The driving vertex (one-based node index).
    pub source: usize,
    /// The consumers of the source, ascending.
    pub sinks: Vec<usize>,
}

/// A hypergraph over the vertices of a network: one hyperedge per driver,
/// spanning the driver and its fanout.
///
/// Built as an explicit ordered sequence in a single pass over the network,
/// so the emitted file never depends on container iteration order. The
/// constant node is a block-less singleton and never becomes a vertex;
/// constant fan-ins fold away at gate creation, so its fanout is always
/// empty.
#[derive(Clone, Debug)]
pub struct Hypergraph {
    edges: Vec<Hyperedge>,
    num_vertices: usize,
    edge_weights: bool,
    vertex_weights: bool,
}

impl Hypergraph {
    /// Collect one hyperedge per primary input and per gate, in index
    /// order, omitting empty-fanout hyperedges.
    ///
    /// Vertex ids are node indices, which are dense `1..=V` only on a
    /// freshly built or swept network; sparse indices are rejected.
    pub fn from_aig(aig: &Aig, params: &HypergraphParams) -> Result<Self> {
        if !params.skip_po_as_sink {
            return Err(Error::Unsupported("primary outputs as hyperedge sinks"));
        }
        let num_vertices = aig.num_pis() + aig.num_gates();
        let mut edges = Vec::new();
        for node in aig.inputs().iter().copied().chain(aig.gates()) {
            let source = node.index();
            if source == 0 || source > num_vertices {
                return Err(Error::SparseIndex(source));
            }
            let sinks: Vec<usize> = aig.fanouts(node).into_iter().map(NodeIndex::index).collect();
            if sinks.is_empty() {
                continue;
            }
            if let Some(&sink) = sinks.iter().find(|sink| **sink > num_vertices) {
                return Err(Error::SparseIndex(sink));
            }
            edges.push(Hyperedge { source, sinks });
        }
        Ok(Self {
            edges,
            num_vertices,
            edge_weights: params.edge_weights,
            vertex_weights: params.vertex_weights,
        })
    }

    #[must_use]
    pub fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    #[must_use]
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// The hyperedges, in emission order.
    #[must_use]
    pub fn edges(&self) -> &[Hyperedge] {
        &self.edges
    }

    /// Write in hMetis format.
    ///
    /// Header `<edges> <vertices> [11|1|10]`, one line per hyperedge
    /// (optional edge weight, then the source, then the sinks), an optional
    /// block of unit vertex weights in emission order, and a trailing
    /// comment line marking end-of-file.
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        write!(writer, "{} {}", self.num_edges(), self.num_vertices())?;
        match (self.edge_weights, self.vertex_weights) {
            (true, true) => writeln!(writer, " 11")?,
            (true, false) => writeln!(writer, " 1")?,
            (false, true) => writeln!(writer, " 10")?,
            (false, false) => writeln!(writer)?,
        }
        for edge in &self.edges {
            if self.edge_weights {
                write!(writer, "{} ", edge.sinks.len())?;
            }
            writeln!(writer, "{} {}", edge.source, edge.sinks.iter().join(" "))?;
        }
        if self.vertex_weights {
            for _ in &self.edges {
                writeln!(writer, "1")?;
            }
        }
        writeln!(writer, "%% aigcut finished writing the hMetis file.")
    }

    /// Write to `path`; a failure here must abort before the partitioner is
    /// invoked.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write(&mut writer)
    }
}
