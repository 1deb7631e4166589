use anyhow::{bail, Context, Result};
use occtree_core::persistence::GraphDump;
use occtree_core::service::ExportService;
use occtree_core::{AmbiguityPolicy, ExportConfig, MissingPolicy};
use std::env;
use std::path::Path;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: occtree <graph.json|namespace> <occId> [endItem] [--strict-missing] [--strict-ambiguity] [--pretty]";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let pretty = args.iter().any(|a| a == "--pretty");
    let mut config = ExportConfig::from_env();
    if args.iter().any(|a| a == "--strict-missing") {
        config.missing = MissingPolicy::Strict;
    }
    if args.iter().any(|a| a == "--strict-ambiguity") {
        config.ambiguity = AmbiguityPolicy::Strict;
    }

    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();
    let (source, occ_id, end_item) = match positional.as_slice() {
        [source, occ_id] => (source.as_str(), occ_id.as_str(), None),
        [source, occ_id, end_item] => (source.as_str(), occ_id.as_str(), Some(end_item.as_str())),
        _ => bail!(USAGE),
    };

    // Storage path from env or default
    let storage_path = env::var("OCCTREE_GRAPH_PATH").unwrap_or_else(|_| "data/graphs".to_string());
    let service = ExportService::new(storage_path, config);

    // A file argument is loaded directly, anything else names a namespace
    // stored as <OCCTREE_GRAPH_PATH>/<namespace>.json.
    let namespace = if Path::new(source).is_file() {
        let graph = GraphDump::load_from_file(source)
            .and_then(GraphDump::into_graph)
            .with_context(|| format!("Failed to load graph from {}", source))?;
        service.register("cli", graph);
        "cli"
    } else {
        source
    };

    let tree = service.export_tree(namespace, occ_id, end_item).await?;
    let json = if pretty {
        serde_json::to_string_pretty(&tree)?
    } else {
        serde_json::to_string(&tree)?
    };
    println!("{}", json);

    Ok(())
}
