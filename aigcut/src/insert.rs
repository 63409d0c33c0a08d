use std::collections::HashMap;

use petgraph::prelude::*;
use tracing::debug;

use crate::aig::{Aig, AigNode, Signal};
use crate::error::{Error, Result};
use crate::extract::Subnetwork;

/// Splice a (possibly restructured) sub-network back into `aig`.
///
/// The window's primary inputs are bound to the live signals now standing
/// for the block's cut-input nodes: reinsertion runs in block order, so an
/// earlier block's substitutions may already have retargeted a shared
/// source, and the replacement chain is followed to wherever it ends. The
/// window's gates are then rebuilt through the host's hash table, so a
/// window that still computes its cut outputs the same way hashes onto the
/// original nodes and nothing changes. Reconciliation then substitutes each
/// original cut output by the rebuilt one, honouring the recorded polarity.
/// Substitutions are collected first and applied afterwards, so a cascade
/// from one record cannot invalidate the next mid-flight.
pub fn insert_back(aig: &mut Aig, part: &Subnetwork) -> Result<()> {
    if part.aig.num_pos() != part.outputs.len() {
        return Err(Error::OutputArity {
            found: part.aig.num_pos(),
            expected: part.outputs.len(),
        });
    }
    if part.aig.num_pis() != part.inputs.len() {
        return Err(Error::InputArity {
            found: part.aig.num_pis(),
            expected: part.inputs.len(),
        });
    }

    let mut map: HashMap<NodeIndex, Signal> = HashMap::new();
    let mut topo = petgraph::visit::Topo::new(part.aig.graph());
    while let Some(node) = topo.next(part.aig.graph()) {
        let signal = match part.aig.graph()[node] {
            AigNode::Zero => aig.constant(false),
            AigNode::Input(position) => aig.live_signal(part.inputs[position as usize]),
            AigNode::And => {
                let (a, b) = part
                    .aig
                    .try_unwrap_and(node)
                    .expect("gate without two fan-ins");
                let a = map[&a.node()] ^ a.is_complement();
                let b = map[&b.node()] ^ b.is_complement();
                aig.create_and(a, b)
            }
        };
        map.insert(node, signal);
    }

    let records: Vec<(Signal, Signal)> = part
        .outputs
        .iter()
        .zip(part.aig.outputs())
        .map(|(&old, sub)| (old, map[&sub.node()] ^ sub.is_complement()))
        .collect();

    let mut substituted = 0_usize;
    for (old, new) in records {
        if old == new {
            continue;
        }
        // A dead cut output means this window is stale; substitute_node
        // reports it.
        let replacement = if old.is_complement() { !new } else { new };
        aig.substitute_node(old.node(), replacement)?;
        substituted += 1;
    }
    debug!(outputs = part.outputs.len(), substituted, "reinserted sub-network");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::insert_back;
    use crate::aig::{Aig, Signal};
    use crate::extract::{extract_blocks, Subnetwork};
    use crate::hypergraph::tests::scenario_aig;
    use crate::hypergraph::{Hypergraph, HypergraphParams};
    use crate::partition::{resolve, BlockId, PartitionAssignment};
    use petgraph::prelude::*;

    const SCENARIO_BLOCKS: [BlockId; 9] = [0, 0, 0, 0, 0, 0, 0, 1, 1];

    fn nodes(indices: &[usize]) -> Vec<NodeIndex> {
        indices.iter().map(|&index| NodeIndex::new(index)).collect()
    }

    fn scenario_parts(aig: &Aig) -> Vec<Subnetwork> {
        let hypergraph = Hypergraph::from_aig(aig, &HypergraphParams::default()).unwrap();
        let assignment = PartitionAssignment::new(&hypergraph, &SCENARIO_BLOCKS, 2).unwrap();
        let boundaries = resolve(aig, &assignment).unwrap();
        extract_blocks(aig, &assignment, &boundaries).unwrap()
    }

    #[test]
    fn identity_round_trip_changes_nothing() {
        let mut aig = scenario_aig();
        let parts = scenario_parts(&aig);
        for part in &parts {
            insert_back(&mut aig, part).unwrap();
        }
        // Unchanged windows hash onto the original nodes.
        assert_eq!(aig.num_gates(), 5);
        assert_eq!(aig.count_reachable_dead_nodes(), 0);
        assert_eq!(aig.outputs()[0], Signal::new(NodeIndex::new(9), false));
    }

    // Replace block 1 (f4 = f1·f2, f5 = f3·f4) by the re-associated
    // t1 = f3·f1, t2 = f3·f2, t3 = t1·t2, which computes the same
    // conjunction f1·f2·f3.
    fn restructured_block(original: &Subnetwork) -> Subnetwork {
        let mut aig = Aig::new();
        let p0 = aig.create_pi();
        let p1 = aig.create_pi();
        let p2 = aig.create_pi();
        let t1 = aig.create_and(p2, p0);
        let t2 = aig.create_and(p2, p1);
        let t3 = aig.create_and(t1, t2);
        let _ = aig.create_po(t3);
        Subnetwork { aig, ..original.clone() }
    }

    #[test]
    fn restructured_window_replaces_the_cone() {
        let mut aig = scenario_aig();
        let parts = scenario_parts(&aig);
        insert_back(&mut aig, &parts[0]).unwrap();
        let replacement = restructured_block(&parts[1]);
        insert_back(&mut aig, &replacement).unwrap();

        assert!(aig.is_dead(NodeIndex::new(9)));
        assert_eq!(aig.count_reachable_dead_nodes(), 0);
        let swept = aig.sweep();
        assert_eq!(swept.num_gates(), 6);
        let original = scenario_aig();
        for pattern in 0..16_u32 {
            let inputs: Vec<bool> = (0..4).map(|bit| pattern >> bit & 1 == 1).collect();
            assert_eq!(original.evaluate(&inputs), swept.evaluate(&inputs));
        }
    }

    #[test]
    fn inputs_follow_earlier_replacements() {
        // Scenario network extended by f6 = f5·x1, with f6 as the only
        // primary output, cut so that f6's block consumes f5 across the
        // boundary.
        let mut aig = Aig::new();
        let x1 = aig.create_pi();
        let x2 = aig.create_pi();
        let x3 = aig.create_pi();
        let x4 = aig.create_pi();
        let f1 = aig.create_and(x1, x2);
        let f2 = aig.create_and(x3, x4);
        let f3 = aig.create_and(x1, x3);
        let f4 = aig.create_and(f1, f2);
        let f5 = aig.create_and(f3, f4);
        let f6 = aig.create_and(f5, x1);
        let _ = aig.create_po(f6);
        let reference = aig.clone();

        let upstream = {
            let mut window = Aig::new();
            let p0 = window.create_pi();
            let p1 = window.create_pi();
            let p2 = window.create_pi();
            let t1 = window.create_and(p2, p0);
            let t2 = window.create_and(p2, p1);
            let t3 = window.create_and(t1, t2);
            let _ = window.create_po(t3);
            Subnetwork {
                aig: window,
                inputs: nodes(&[5, 6, 7]),
                outputs: vec![Signal::new(NodeIndex::new(9), false)],
                gates: nodes(&[8, 9]),
            }
        };
        let downstream = {
            let mut window = Aig::new();
            let p0 = window.create_pi();
            let p1 = window.create_pi();
            let t = window.create_and(p1, p0);
            let _ = window.create_po(t);
            Subnetwork {
                aig: window,
                inputs: nodes(&[1, 9]),
                outputs: vec![Signal::new(NodeIndex::new(10), false)],
                gates: nodes(&[10]),
            }
        };

        // The upstream insertion retargets f5; the downstream block's
        // cut input must follow the replacement instead of failing.
        insert_back(&mut aig, &upstream).unwrap();
        assert!(aig.is_dead(f5.node()));
        insert_back(&mut aig, &downstream).unwrap();

        assert_eq!(aig.count_reachable_dead_nodes(), 0);
        let swept = aig.sweep();
        for pattern in 0..16_u32 {
            let inputs: Vec<bool> = (0..4).map(|bit| pattern >> bit & 1 == 1).collect();
            assert_eq!(reference.evaluate(&inputs), swept.evaluate(&inputs));
        }
    }

    #[test]
    fn stale_window_is_rejected() {
        let mut aig = scenario_aig();
        let parts = scenario_parts(&aig);
        let replacement = restructured_block(&parts[1]);
        insert_back(&mut aig, &replacement).unwrap();

        // The first insertion killed the original cut output, so applying
        // the same window again has nothing valid to substitute.
        assert!(matches!(
            insert_back(&mut aig, &replacement),
            Err(crate::error::Error::DeadNode(9))
        ));
    }

    #[test]
    fn arity_mismatches_are_rejected() {
        let mut aig = scenario_aig();
        let parts = scenario_parts(&aig);

        let mut missing_output = parts[1].clone();
        missing_output.outputs.clear();
        assert!(matches!(
            insert_back(&mut aig, &missing_output),
            Err(crate::error::Error::OutputArity { .. })
        ));

        let mut missing_input = parts[1].clone();
        missing_input.inputs.pop();
        assert!(matches!(
            insert_back(&mut aig, &missing_input),
            Err(crate::error::Error::InputArity { .. })
        ));
    }
}
