use crate::config::ExportConfig;
use crate::entity::ResultEntity;
use crate::error::ExportError;
use crate::export::Exporter;
use crate::persistence::GraphDump;
use crate::store::MemoryGraph;
use anyhow::{Context, Result};
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Namespace registry of read-only graphs. Each export runs on a blocking
/// worker against a shared `Arc<MemoryGraph>`.
#[derive(Clone)]
pub struct ExportService {
    pub namespaces: Arc<DashMap<String, Arc<MemoryGraph>>>,
    pub storage_path: Arc<PathBuf>,
    pub config: Arc<ExportConfig>,
}

impl ExportService {
    pub fn new(storage_path: impl Into<PathBuf>, config: ExportConfig) -> Self {
        Self {
            namespaces: Arc::new(DashMap::new()),
            storage_path: Arc::new(storage_path.into()),
            config: Arc::new(config),
        }
    }

    /// Registers `graph` under `namespace`, replacing any previous graph.
    pub fn register(&self, namespace: &str, graph: MemoryGraph) -> Arc<MemoryGraph> {
        let graph = Arc::new(graph);
        self.namespaces
            .insert(namespace_key(namespace).to_string(), Arc::clone(&graph));
        graph
    }

    pub fn remove_namespace(&self, namespace: &str) -> bool {
        self.namespaces.remove(namespace_key(namespace)).is_some()
    }

    /// The graph for `namespace`, loading `<storage_path>/<namespace>.json` on first use.
    pub fn get_namespace_graph(&self, namespace: &str) -> Result<Arc<MemoryGraph>> {
        let ns = namespace_key(namespace);

        if let Some(graph) = self.namespaces.get(ns) {
            return Ok(Arc::clone(graph.value()));
        }

        let path = self.dump_path(ns);
        let graph = GraphDump::load_from_file(&path)
            .and_then(GraphDump::into_graph)
            .with_context(|| format!("Failed to open namespace {}", ns))?;

        let entry = self
            .namespaces
            .entry(ns.to_string())
            .or_insert_with(|| Arc::new(graph));
        Ok(Arc::clone(entry.value()))
    }

    /// Builds the tree rooted at the node with `occ_id`. `end_item` falls
    /// back to the configured default.
    pub async fn export_tree(
        &self,
        namespace: &str,
        occ_id: &str,
        end_item: Option<&str>,
    ) -> Result<ResultEntity> {
        let graph = self.get_namespace_graph(namespace)?;
        let root = graph.find_by_occ_id(occ_id).ok_or_else(|| {
            ExportError::InvalidArgument(format!("no node with occId = {}", occ_id))
        })?;

        let config = match end_item {
            Some(end_item) => (*self.config).clone().with_end_item(end_item),
            None => (*self.config).clone(),
        };
        debug!(namespace, occ_id, end_item = %config.end_item, "dispatching export");

        let tree = tokio::task::spawn_blocking(move || Exporter::new(&*graph, config).export(root))
            .await
            .context("export worker panicked")??;

        Ok(tree)
    }

    /// Compact JSON form of `export_tree`.
    pub async fn export(
        &self,
        namespace: &str,
        occ_id: &str,
        end_item: Option<&str>,
    ) -> Result<String> {
        let tree = self.export_tree(namespace, occ_id, end_item).await?;
        Ok(serde_json::to_string(&tree)?)
    }

    fn dump_path(&self, namespace: &str) -> PathBuf {
        self.storage_path.join(format!("{}.json", namespace))
    }
}

fn namespace_key(namespace: &str) -> &str {
    if namespace.is_empty() {
        "default"
    } else {
        namespace
    }
}
