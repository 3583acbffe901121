//! `gyre-sim` — rebalancing simulator for the consistent hash ring.
//!
//! Builds two ring snapshots, before and after a membership change,
//! resolves a sample of keys against both, and reports how many changed
//! owner. Useful for eyeballing how disruptive a topology change will
//! be before rolling it out.
//!
//! # Usage
//!
//! ```text
//! gyre-sim                                    # shard-a/shard-b, then +shard-c
//! gyre-sim -n shard-a -n shard-b -a shard-c   # the same, spelled out
//! gyre-sim -n a -n b -n c --remove c          # shrink instead of grow
//! gyre-sim --keys 1000 --json                 # machine-readable report
//! ```

use anyhow::Result;
use clap::Parser;
use gyre_ring::{RebalanceReport, Ring, compare};
use gyre_types::{DEFAULT_REPLICAS, NodeId};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "gyre-sim",
    version,
    about = "Consistent-hash-ring rebalancing simulator"
)]
struct Cli {
    /// Node in the starting topology. Repeat per node.
    #[arg(
        short,
        long = "node",
        default_values_t = [String::from("shard-a"), String::from("shard-b")]
    )]
    nodes: Vec<String>,

    /// Node to add for the second snapshot. Repeatable. When neither
    /// --add nor --remove is given, "shard-c" is added.
    #[arg(short, long = "add")]
    add: Vec<String>,

    /// Node to remove for the second snapshot. Repeatable.
    #[arg(long = "remove")]
    remove: Vec<String>,

    /// Virtual points per node.
    #[arg(long, default_value_t = DEFAULT_REPLICAS)]
    replicas: u32,

    /// Number of sample keys ("user:0" through "user:N-1").
    #[arg(short, long, default_value_t = 100)]
    keys: usize,

    /// Ring preview length per snapshot; 0 hides previews.
    #[arg(long, default_value_t = 20)]
    show: usize,

    /// Emit the report as JSON instead of text.
    #[arg(long)]
    json: bool,
}

struct Outcome {
    before: Ring,
    after: Ring,
    report: RebalanceReport,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let outcome = run(&cli)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome.report)?);
    } else {
        render(&cli, &outcome);
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<Outcome> {
    let nodes: Vec<NodeId> = cli.nodes.iter().map(|n| NodeId::from(n.as_str())).collect();
    let mut add: Vec<NodeId> = cli.add.iter().map(|n| NodeId::from(n.as_str())).collect();
    let remove: Vec<NodeId> = cli.remove.iter().map(|n| NodeId::from(n.as_str())).collect();
    if add.is_empty() && remove.is_empty() {
        add.push(NodeId::from("shard-c"));
    }

    let before = Ring::build(nodes, cli.replicas)?;
    let mut after = before.clone();
    for node in add {
        after.add_node(node);
    }
    for node in &remove {
        if !after.nodes().contains(node) {
            warn!(%node, "remove target not in topology, ignoring");
        }
        after.remove_node(node)?;
    }

    let keys: Vec<String> = (0..cli.keys).map(|i| format!("user:{i}")).collect();
    let report = compare(&before, &after, &keys)?;
    info!(
        moved = report.moved(),
        total = report.total,
        "simulation complete"
    );

    Ok(Outcome {
        before,
        after,
        report,
    })
}

fn render(cli: &Cli, outcome: &Outcome) {
    if cli.show > 0 {
        println!("Ring before ({} points, position -> node):", outcome.before.len());
        preview(&outcome.before, cli.show);
        println!();
        println!("Ring after ({} points, position -> node):", outcome.after.len());
        preview(&outcome.after, cli.show);
        println!();
    }

    println!("Key reassignments:");
    for mv in &outcome.report.moves {
        println!(
            "  {} moved from {} (at {}) to {} (at {})",
            mv.key, mv.from, mv.from_position, mv.to, mv.to_position
        );
    }

    let pct = outcome.report.moved_fraction() * 100.0;
    println!(
        "\nMoved {} out of {} keys ({pct:.2}%)",
        outcome.report.moved(),
        outcome.report.total
    );
}

fn preview(ring: &Ring, limit: usize) {
    for (pos, node) in ring.points().take(limit) {
        println!("  {pos} -> {node}");
    }
    if ring.len() > limit {
        println!("  ... {} more", ring.len() - limit);
    }
}
