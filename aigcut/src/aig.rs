use std::collections::{HashMap, HashSet};
use std::convert::TryFrom;
use std::ops::{BitXor, Not};
use std::path::Path;

use petgraph::visit::NodeIndexable;
use petgraph::{prelude::*, visit::EdgeRef};

use crate::error::{Error, Result};

/// An and-inverter graph node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AigNode {
    /// The constant-false node, always at index 0.
    Zero,
    /// A primary input, carrying its position in the input list.
    Input(u32),
    /// A two-input AND gate; its fan-in edges carry the inversion flags.
    And,
}

/// A node reference with an optional inversion.
///
/// `!signal` complements the reference; `signal ^ flag` complements it
/// conditionally.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Signal {
    node: NodeIndex,
    complement: bool,
}

impl Signal {
    #[must_use]
    pub fn new(node: NodeIndex, complement: bool) -> Self {
        Self { node, complement }
    }

    /// The referenced node.
    #[must_use]
    pub fn node(self) -> NodeIndex {
        self.node
    }

    /// True if the reference is inverted.
    #[must_use]
    pub fn is_complement(self) -> bool {
        self.complement
    }
}

impl Not for Signal {
    type Output = Self;

    fn not(self) -> Self {
        Self { node: self.node, complement: !self.complement }
    }
}

impl BitXor<bool> for Signal {
    type Output = Self;

    fn bitxor(self, rhs: bool) -> Self {
        Self { node: self.node, complement: self.complement ^ rhs }
    }
}

/// An and-inverter graph.
///
/// Gates are structurally hashed: creating an AND over a fan-in pair that
/// already drives a gate returns the existing gate, and trivial gates
/// (`a·a`, `a·a'`, constant fan-ins) fold away instead of being created.
/// Primary outputs are signal references into the graph, not nodes.
#[derive(Clone, Debug)]
pub struct Aig {
    graph: StableGraph<AigNode, bool, Directed>,
    inputs: Vec<NodeIndex>,
    outputs: Vec<Signal>,
    strash: HashMap<(Signal, Signal), NodeIndex>,
    dead: HashMap<NodeIndex, Signal>,
    zero: NodeIndex,
}

impl Default for Aig {
    fn default() -> Self {
        Self::new()
    }
}

impl Aig {
    /// Create an empty network containing only the constant node.
    #[must_use]
    pub fn new() -> Self {
        let mut graph = StableGraph::default();
        let zero = graph.add_node(AigNode::Zero);
        assert_eq!(zero.index(), 0);
        Self {
            graph,
            inputs: Vec::new(),
            outputs: Vec::new(),
            strash: HashMap::new(),
            dead: HashMap::new(),
            zero,
        }
    }

    /// Read a combinational AIGER file.
    ///
    /// Latches are unsupported and reported as such; malformed files yield a
    /// parse error, which callers may treat as "skip this benchmark".
    pub fn from_aiger(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = aiger::Reader::from_reader(file).map_err(|e| Error::Parse(format!("{e:?}")))?;
        let mut aig = Self::new();

        let mut var_map: HashMap<usize, Signal> = HashMap::new();
        let mut and_defs: HashMap<usize, (usize, usize)> = HashMap::new();
        let mut output_literals = Vec::new();

        for record in reader.records() {
            match record.map_err(|e| Error::Parse(format!("{e:?}")))? {
                aiger::Aiger::Input(literal) => {
                    let signal = aig.create_pi();
                    var_map.insert(literal.variable(), signal);
                }
                aiger::Aiger::Latch { output: _, input: _ } => {
                    return Err(Error::Unsupported("latches"));
                }
                aiger::Aiger::Output(aiger::Literal(literal)) => {
                    output_literals.push(literal);
                }
                aiger::Aiger::AndGate { output, inputs } => {
                    and_defs.insert(output.variable(), (inputs[0].0, inputs[1].0));
                }
                aiger::Aiger::Symbol { .. } => {}
            }
        }

        // Gate definitions may reference variables defined later in the
        // file, so build each cone with an explicit stack.
        let mut variables: Vec<usize> = and_defs.keys().copied().collect();
        variables.sort_unstable();
        for variable in variables {
            if var_map.contains_key(&variable) {
                continue;
            }
            let mut stack = vec![variable];
            while let Some(&v) = stack.last() {
                if var_map.contains_key(&v) {
                    stack.pop();
                    continue;
                }
                let (lit0, lit1) = *and_defs
                    .get(&v)
                    .ok_or_else(|| Error::Parse(format!("variable {v} is undefined")))?;
                let mut blocked = false;
                for dependency in [lit0 >> 1, lit1 >> 1] {
                    if dependency != 0 && !var_map.contains_key(&dependency) {
                        if stack.contains(&dependency) {
                            return Err(Error::Parse(format!(
                                "combinational cycle through variable {dependency}"
                            )));
                        }
                        stack.push(dependency);
                        blocked = true;
                    }
                }
                if !blocked {
                    let a = Self::literal_signal(&aig, &var_map, lit0)?;
                    let b = Self::literal_signal(&aig, &var_map, lit1)?;
                    let signal = aig.create_and(a, b);
                    var_map.insert(v, signal);
                    stack.pop();
                }
            }
        }

        for literal in output_literals {
            let signal = Self::literal_signal(&aig, &var_map, literal)?;
            let _ = aig.create_po(signal);
        }

        Ok(aig)
    }

    fn literal_signal(aig: &Self, var_map: &HashMap<usize, Signal>, literal: usize) -> Result<Signal> {
        let variable = literal >> 1;
        let complement = literal & 1 == 1;
        if variable == 0 {
            return Ok(aig.constant(complement));
        }
        var_map
            .get(&variable)
            .copied()
            .map(|signal| signal ^ complement)
            .ok_or_else(|| Error::Parse(format!("literal {literal} references an undefined variable")))
    }

    /// The constant signal: `false` plain, `true` complemented.
    #[must_use]
    pub fn constant(&self, value: bool) -> Signal {
        Signal::new(self.zero, value)
    }

    /// Append a primary input.
    pub fn create_pi(&mut self) -> Signal {
        let index = u32::try_from(self.inputs.len()).expect("input count exceeds u32");
        let node = self.graph.add_node(AigNode::Input(index));
        self.inputs.push(node);
        Signal::new(node, false)
    }

    /// Declare `signal` as a primary output, returning its position.
    pub fn create_po(&mut self, signal: Signal) -> usize {
        self.outputs.push(signal);
        self.outputs.len() - 1
    }

    /// Create (or find) the AND gate of two signals.
    pub fn create_and(&mut self, a: Signal, b: Signal) -> Signal {
        if a == b {
            return a;
        }
        if a == !b || a == self.constant(false) || b == self.constant(false) {
            return self.constant(false);
        }
        if a == self.constant(true) {
            return b;
        }
        if b == self.constant(true) {
            return a;
        }
        let key = Self::strash_key(a, b);
        if let Some(&node) = self.strash.get(&key) {
            return Signal::new(node, false);
        }
        let node = self.graph.add_node(AigNode::And);
        self.graph.add_edge(key.0.node(), node, key.0.is_complement());
        self.graph.add_edge(key.1.node(), node, key.1.is_complement());
        self.strash.insert(key, node);
        Signal::new(node, false)
    }

    fn strash_key(a: Signal, b: Signal) -> (Signal, Signal) {
        if (a.node.index(), a.complement) <= (b.node.index(), b.complement) {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// The underlying graph, for read-only traversal.
    #[must_use]
    pub fn graph(&self) -> &StableGraph<AigNode, bool> {
        &self.graph
    }

    #[must_use]
    pub fn num_pis(&self) -> usize {
        self.inputs.len()
    }

    #[must_use]
    pub fn num_pos(&self) -> usize {
        self.outputs.len()
    }

    /// Number of live AND gates.
    #[must_use]
    pub fn num_gates(&self) -> usize {
        self.gates().count()
    }

    /// Primary input nodes, in creation order.
    #[must_use]
    pub fn inputs(&self) -> &[NodeIndex] {
        &self.inputs
    }

    /// Primary output signals, in declaration order.
    #[must_use]
    pub fn outputs(&self) -> &[Signal] {
        &self.outputs
    }

    /// Live AND gates, in ascending index order.
    pub fn gates(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph
            .node_indices()
            .filter(move |node| self.is_and(*node) && !self.is_dead(*node))
    }

    #[must_use]
    pub fn is_and(&self, node: NodeIndex) -> bool {
        matches!(self.graph[node], AigNode::And)
    }

    #[must_use]
    pub fn is_pi(&self, node: NodeIndex) -> bool {
        matches!(self.graph[node], AigNode::Input(_))
    }

    #[must_use]
    pub fn is_constant(&self, node: NodeIndex) -> bool {
        node == self.zero
    }

    /// True if the node has been replaced by a substitution and awaits
    /// sweeping.
    #[must_use]
    pub fn is_dead(&self, node: NodeIndex) -> bool {
        self.dead.contains_key(&node)
    }

    /// The signal that now stands for `node`: the node itself,
    /// uncomplemented, if it is live, otherwise the end of the replacement
    /// chain recorded by substitutions.
    #[must_use]
    pub fn live_signal(&self, node: NodeIndex) -> Signal {
        let mut signal = Signal::new(node, false);
        while let Some(&forward) = self.dead.get(&signal.node()) {
            signal = forward ^ signal.is_complement();
        }
        signal
    }

    /// Returns the fan-in signals of `node`, if it is an AND gate.
    #[must_use]
    pub fn try_unwrap_and(&self, node: NodeIndex) -> Option<(Signal, Signal)> {
        match self.graph[node] {
            AigNode::Zero | AigNode::Input(_) => None,
            AigNode::And => {
                let mut iter = self.graph.edges_directed(node, Incoming);
                match (iter.next(), iter.next()) {
                    (Some(x), Some(y)) => {
                        assert!(iter.next().is_none(), "and gate with more than two fan-ins");
                        // edges_directed yields the most recently added edge
                        // first; swap back to creation order.
                        Some((
                            Signal::new(y.source(), *y.weight()),
                            Signal::new(x.source(), *x.weight()),
                        ))
                    }
                    _ => panic!("and gate {} has fewer than two fan-ins", node.index()),
                }
            }
        }
    }

    /// The gate consumers of `node`, ascending.
    #[must_use]
    pub fn fanouts(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut sinks: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(node, Outgoing)
            .filter(|sink| !self.is_dead(*sink))
            .collect();
        sinks.sort_unstable();
        sinks.dedup();
        sinks
    }

    /// Topological level of every node, indexed by node index: zero for the
    /// constant and the primary inputs, one plus the maximum fan-in level
    /// for a gate.
    #[must_use]
    pub fn levels(&self) -> Vec<u32> {
        let mut level = vec![0_u32; self.graph.node_bound()];
        let mut topo = petgraph::visit::Topo::new(&self.graph);
        while let Some(node) = topo.next(&self.graph) {
            if self.is_and(node) && !self.is_dead(node) {
                level[node.index()] = 1 + self
                    .graph
                    .edges_directed(node, Incoming)
                    .map(|edge| level[edge.source().index()])
                    .max()
                    .expect("and gate with no fan-ins");
            }
        }
        level
    }

    /// Redirect every consumer of `old` (gate fan-ins and primary outputs)
    /// to `new`, respecting each consumer's own inversion flag.
    ///
    /// A consumer that becomes structurally identical to an existing gate is
    /// merged into it and substituted in turn. Replaced nodes are marked
    /// dead and unregistered from the hash table; `sweep` removes them.
    ///
    /// A replacement whose cone contains the replaced node keeps that node
    /// alive: only consumers outside the cone move over, since redirecting
    /// a consumer the replacement depends on would close a cycle.
    pub fn substitute_node(&mut self, old: NodeIndex, new: Signal) -> Result<()> {
        if self.is_dead(old) {
            return Err(Error::DeadNode(old.index()));
        }
        if self.is_dead(new.node()) {
            return Err(Error::DeadNode(new.node().index()));
        }

        let mut pending = vec![(old, new)];
        while let Some((old, mut new)) = pending.pop() {
            // A queued consumer may already have been merged away.
            if self.is_dead(old) {
                continue;
            }
            // Follow replacements of the replacement.
            new = self.live_signal(new.node()) ^ new.is_complement();
            if old == new.node() {
                continue;
            }

            let cone = self.transitive_fanin(new.node());
            let keep_alive = cone.contains(&old);
            if !keep_alive {
                self.unregister(old);
            }

            let consumers: Vec<(EdgeIndex, NodeIndex, bool)> = self
                .graph
                .edges_directed(old, Outgoing)
                .filter(|edge| !cone.contains(&edge.target()))
                .map(|edge| (edge.id(), edge.target(), *edge.weight()))
                .collect();
            for (edge, consumer, inverted) in consumers {
                self.unregister(consumer);
                self.graph.remove_edge(edge);
                self.graph.add_edge(new.node(), consumer, inverted ^ new.is_complement());

                let (a, b) = self
                    .try_unwrap_and(consumer)
                    .expect("fan-out edge into a non-gate");
                let folded = if a == b {
                    Some(a)
                } else if a == !b || a == self.constant(false) || b == self.constant(false) {
                    Some(self.constant(false))
                } else if a == self.constant(true) {
                    Some(b)
                } else if b == self.constant(true) {
                    Some(a)
                } else {
                    None
                };
                if let Some(value) = folded {
                    pending.push((consumer, value));
                    continue;
                }
                let key = Self::strash_key(a, b);
                match self.strash.get(&key) {
                    Some(&existing) if existing != consumer => {
                        pending.push((consumer, Signal::new(existing, false)));
                    }
                    _ => {
                        self.strash.insert(key, consumer);
                    }
                }
            }

            for position in 0..self.outputs.len() {
                if self.outputs[position].node == old {
                    self.outputs[position] = new ^ self.outputs[position].complement;
                }
            }

            if keep_alive {
                continue;
            }
            // Detach the dead node so it no longer counts as a fanout of
            // its fan-ins.
            let fanin_edges: Vec<EdgeIndex> = self
                .graph
                .edges_directed(old, Incoming)
                .map(|edge| edge.id())
                .collect();
            for edge in fanin_edges {
                self.graph.remove_edge(edge);
            }
            self.dead.insert(old, new);
        }
        Ok(())
    }

    fn unregister(&mut self, node: NodeIndex) {
        if let Some((a, b)) = self.try_unwrap_and(node) {
            let key = Self::strash_key(a, b);
            if self.strash.get(&key) == Some(&node) {
                self.strash.remove(&key);
            }
        }
    }

    fn transitive_fanin(&self, node: NodeIndex) -> HashSet<NodeIndex> {
        let mut seen = HashSet::new();
        let mut stack = vec![node];
        while let Some(node) = stack.pop() {
            if seen.insert(node) {
                stack.extend(self.graph.neighbors_directed(node, Incoming));
            }
        }
        seen
    }

    fn reachable(&self) -> HashSet<NodeIndex> {
        let mut seen = HashSet::new();
        let mut stack: Vec<NodeIndex> = self.outputs.iter().map(|output| output.node()).collect();
        while let Some(node) = stack.pop() {
            if seen.insert(node) {
                stack.extend(self.graph.neighbors_directed(node, Incoming));
            }
        }
        seen
    }

    /// Nodes that are marked dead yet still reachable from a primary
    /// output. Anything nonzero means a substitution left a stale
    /// reference behind.
    #[must_use]
    pub fn count_reachable_dead_nodes(&self) -> usize {
        self.reachable()
            .iter()
            .filter(|node| self.is_dead(**node))
            .count()
    }

    /// Rebuild the network without nodes unreachable from any primary
    /// output. Primary inputs are preserved in order even when
    /// unreferenced, and node indices are re-compacted.
    #[must_use]
    pub fn sweep(&self) -> Self {
        let reachable = self.reachable();
        let mut swept = Self::new();
        let mut map: HashMap<NodeIndex, Signal> = HashMap::new();
        map.insert(self.zero, swept.constant(false));
        for &input in &self.inputs {
            let cloned = swept.create_pi();
            map.insert(input, cloned);
        }
        let mut topo = petgraph::visit::Topo::new(&self.graph);
        while let Some(node) = topo.next(&self.graph) {
            if !self.is_and(node) || !reachable.contains(&node) || self.is_dead(node) {
                continue;
            }
            let (a, b) = self.try_unwrap_and(node).expect("gate without two fan-ins");
            let a = map.get(&a.node()).copied().expect("reachable gate references a swept node")
                ^ a.is_complement();
            let b = map.get(&b.node()).copied().expect("reachable gate references a swept node")
                ^ b.is_complement();
            let cloned = swept.create_and(a, b);
            map.insert(node, cloned);
        }
        for output in &self.outputs {
            let cloned = map
                .get(&output.node())
                .copied()
                .expect("primary output cone was not cloned");
            let _ = swept.create_po(cloned ^ output.is_complement());
        }
        swept
    }

    /// Evaluate every primary output under one input assignment.
    #[must_use]
    pub fn evaluate(&self, inputs: &[bool]) -> Vec<bool> {
        assert_eq!(inputs.len(), self.num_pis(), "one value per primary input");
        let mut value = vec![false; self.graph.node_bound()];
        let mut topo = petgraph::visit::Topo::new(&self.graph);
        while let Some(node) = topo.next(&self.graph) {
            if self.is_dead(node) {
                continue;
            }
            value[node.index()] = match self.graph[node] {
                AigNode::Zero => false,
                AigNode::Input(index) => inputs[index as usize],
                AigNode::And => {
                    let (a, b) = self.try_unwrap_and(node).expect("gate without two fan-ins");
                    (value[a.node().index()] ^ a.is_complement())
                        && (value[b.node().index()] ^ b.is_complement())
                }
            };
        }
        self.outputs
            .iter()
            .map(|output| value[output.node().index()] ^ output.is_complement())
            .collect()
    }
}
