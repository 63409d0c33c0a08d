use std::path::PathBuf;
use std::process::exit;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use aigcut::aig::Aig;
use aigcut::cec::{EquivalenceChecker, ExhaustiveChecker};
use aigcut::partition::ContiguousSplit;
use aigcut::round::{partition_round, RoundParams};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: part <benchmark.aag> [num_blocks]");
        exit(2);
    };
    let num_blocks: u32 = match args.next() {
        Some(blocks) => match blocks.parse() {
            Ok(blocks) => blocks,
            Err(_) => {
                eprintln!("usage: part <benchmark.aag> [num_blocks]");
                exit(2);
            }
        },
        None => 2,
    };

    let aig = match Aig::from_aiger(&path) {
        Ok(aig) => aig,
        Err(err) => {
            // A malformed benchmark is skippable, not fatal.
            warn!(%path, %err, "skipping unreadable benchmark");
            return;
        }
    };
    info!(
        %path,
        pis = aig.num_pis(),
        pos = aig.num_pos(),
        gates = aig.num_gates(),
        "loaded benchmark"
    );

    let reference = aig.clone();
    let params = RoundParams {
        num_blocks,
        file_name: PathBuf::from(format!("{path}.hmetis")),
        ..RoundParams::default()
    };
    let (result, report) = match partition_round(aig, &ContiguousSplit, &params, |part| part) {
        Ok(round) => round,
        Err(err) => {
            error!(%err, "partition round failed");
            exit(1);
        }
    };
    info!(
        boundary_edges = report.boundary_edges,
        block_gates = ?report.block_gates,
        gates_before = report.gates_before,
        gates_after = report.gates_after,
        "round finished"
    );

    let checker = ExhaustiveChecker::default();
    if reference.num_pis() <= checker.max_inputs {
        match checker.check(&reference, &result) {
            Ok(true) => info!("round preserved the network's function"),
            Ok(false) => {
                error!("round changed the network's function");
                exit(1);
            }
            Err(err) => {
                error!(%err, "equivalence check failed");
                exit(1);
            }
        }
    } else {
        warn!("network too wide for exhaustive checking; skipping verification");
    }
}
