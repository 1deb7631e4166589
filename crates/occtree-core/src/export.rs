use crate::builder::TreeBuilder;
use crate::config::ExportConfig;
use crate::entity::ResultEntity;
use crate::error::ExportError;
use crate::store::{GraphRead, NodeId};
use tracing::info;

/// Entry point of an export: validates the arguments, builds the tree and encodes it.
pub struct Exporter<'g, G: ?Sized> {
    graph: &'g G,
    config: ExportConfig,
}

impl<'g, G: GraphRead + ?Sized> Exporter<'g, G> {
    pub fn new(graph: &'g G, config: ExportConfig) -> Self {
        Self { graph, config }
    }

    /// Builds the tree for `root` under the configured `endItem`.
    pub fn export(&self, root: NodeId) -> Result<ResultEntity, ExportError> {
        self.export_tagged(root, &self.config.end_item)
    }

    pub fn export_tagged(&self, root: NodeId, end_item: &str) -> Result<ResultEntity, ExportError> {
        if end_item.is_empty() {
            return Err(ExportError::InvalidArgument("endItem must not be empty".into()));
        }
        if !self.graph.contains_node(root) {
            return Err(ExportError::InvalidArgument(format!(
                "root node {} does not exist",
                root
            )));
        }

        let mut builder = TreeBuilder::new(self.graph, &self.config);
        let tree = builder.build(root, end_item, None)?;
        info!(
            occ_id = tree.occ_id(),
            end_item,
            shape = %tree.shape(),
            entities = tree.node_count(),
            visited = builder.visited(),
            "export complete"
        );
        Ok(tree)
    }

    pub fn to_json(&self, root: NodeId) -> Result<String, ExportError> {
        Ok(serde_json::to_string(&self.export(root)?)?)
    }
}

/// Exports the tree rooted at `root` for `end_item` as compact JSON.
pub fn to_json<G: GraphRead + ?Sized>(
    graph: &G,
    root: NodeId,
    end_item: &str,
) -> Result<String, ExportError> {
    Exporter::new(graph, ExportConfig::default().with_end_item(end_item)).to_json(root)
}
