//! Recursive construction of the export tree.
//!
//! A call without a parent classifies its node: a true `isMeta` flag makes it
//! a snapshot, anything else an occurrence. Every node reached through a
//! `HAS_Parent` edge is an occurrence. Children are the far ends of incoming
//! `HAS_Parent` edges tagged with the requested `endItem`, in store order.
//!
//! The store is expected to hold an out-tree per tag. A cycle is detected by
//! tracking the nodes on the current root-to-node path and fails the call, as
//! does nesting deeper than `ExportConfig::max_depth`.

use crate::config::{ExportConfig, MissingPolicy};
use crate::entity::{AttributeBag, OccurrenceEntity, ResultEntity, Shape, SnapshotEntity};
use crate::error::ExportError;
use crate::extract::{edge_tagged, AttributeExtractor, ExtractError};
use crate::properties::Value;
use crate::store::{Direction, EdgeKind, GraphRead, NodeId, OCC_ID};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Node property marking a snapshot root.
pub const SNAPSHOT_FLAG: &str = "isMeta";

/// The entity a recursive call is building children for.
#[derive(Debug, Clone, Copy)]
pub struct ParentContext<'p> {
    pub node: NodeId,
    pub occ_id: &'p str,
    pub depth: usize,
}

pub struct TreeBuilder<'a, G: ?Sized> {
    graph: &'a G,
    config: &'a ExportConfig,
    path: HashSet<NodeId>,
    visited: usize,
}

impl<'a, G: GraphRead + ?Sized> TreeBuilder<'a, G> {
    pub fn new(graph: &'a G, config: &'a ExportConfig) -> Self {
        Self {
            graph,
            config,
            path: HashSet::new(),
            visited: 0,
        }
    }

    /// Nodes visited since the last top-level call.
    pub fn visited(&self) -> usize {
        self.visited
    }

    pub fn build(
        &mut self,
        node: NodeId,
        tag: &str,
        parent: Option<&ParentContext<'_>>,
    ) -> Result<ResultEntity, ExportError> {
        if parent.is_none() {
            self.path.clear();
            self.visited = 0;
        }

        let result = self.build_entity(node, tag, parent);
        if result.is_err() {
            self.path.clear();
        }
        result
    }

    fn build_entity(
        &mut self,
        node: NodeId,
        tag: &str,
        parent: Option<&ParentContext<'_>>,
    ) -> Result<ResultEntity, ExportError> {
        let occ_id = self.occ_id(node)?;
        self.enter(node, &occ_id, tag)?;
        let entity = if parent.is_none() && self.snapshot_flag(node, &occ_id)? {
            ResultEntity::Snapshot(self.snapshot(node, occ_id, tag)?)
        } else {
            ResultEntity::Occurrence(self.occurrence(node, occ_id, tag, parent)?)
        };
        self.path.remove(&node);
        Ok(entity)
    }

    fn build_child(
        &mut self,
        node: NodeId,
        tag: &str,
        parent: &ParentContext<'_>,
    ) -> Result<OccurrenceEntity, ExportError> {
        let occ_id = self.occ_id(node)?;
        self.enter(node, &occ_id, tag)?;
        let entity = self.occurrence(node, occ_id, tag, Some(parent))?;
        self.path.remove(&node);
        Ok(entity)
    }

    fn snapshot(
        &mut self,
        node: NodeId,
        occ_id: String,
        tag: &str,
    ) -> Result<SnapshotEntity, ExportError> {
        debug!(%node, occ_id = %occ_id, "building snapshot");
        let (details_attributes, input_parameters) =
            self.satellites(node, &occ_id, tag, Shape::Snapshot)?;
        let context = ParentContext {
            node,
            occ_id: &occ_id,
            depth: 0,
        };
        let children = self.children(node, tag, &context)?;
        Ok(SnapshotEntity {
            occ_id,
            details_attributes,
            input_parameters,
            children,
        })
    }

    fn occurrence(
        &mut self,
        node: NodeId,
        occ_id: String,
        tag: &str,
        parent: Option<&ParentContext<'_>>,
    ) -> Result<OccurrenceEntity, ExportError> {
        let depth = parent.map_or(0, |p| p.depth + 1);
        if depth > self.config.max_depth {
            return Err(ExportError::DepthExceeded {
                occ_id,
                depth,
                max_depth: self.config.max_depth,
            });
        }
        debug!(%node, occ_id = %occ_id, depth, "building occurrence");
        let (object, relation) = self.satellites(node, &occ_id, tag, Shape::Occurrence)?;
        let context = ParentContext {
            node,
            occ_id: &occ_id,
            depth,
        };
        let children = self.children(node, tag, &context)?;
        Ok(OccurrenceEntity {
            occ_id,
            object,
            relation,
            parent: parent.map(|p| p.occ_id.to_string()),
            children,
        })
    }

    fn children(
        &mut self,
        node: NodeId,
        tag: &str,
        context: &ParentContext<'_>,
    ) -> Result<Vec<OccurrenceEntity>, ExportError> {
        let graph = self.graph;
        let mut children = Vec::new();
        let cursor = graph.edges(node, Direction::Incoming, EdgeKind::Parent)?;
        for edge in cursor {
            let edge = edge?;
            if !edge_tagged(graph, &edge, tag)? {
                continue;
            }
            let child = edge.other_node(node);
            children.push(self.build_child(child, tag, context)?);
        }
        Ok(children)
    }

    fn satellites(
        &self,
        node: NodeId,
        occ_id: &str,
        tag: &str,
        shape: Shape,
    ) -> Result<(AttributeBag, AttributeBag), ExportError> {
        let [first, second] = shape.satellite_kinds();
        let extractor = AttributeExtractor::new(self.graph, self.config.ambiguity);
        let pair = extractor
            .extract(node, Direction::Outgoing, first, tag)
            .and_then(|a| Ok((a, extractor.extract(node, Direction::Outgoing, second, tag)?)));

        let (a, b) = match pair {
            Ok(pair) => pair,
            Err(ExtractError::Store(source)) => {
                return Err(ExportError::MissingRelatedData {
                    occ_id: occ_id.to_string(),
                    shape,
                    kinds: [first, second],
                    source,
                })
            }
            Err(ExtractError::Ambiguous {
                kind, tag, count, ..
            }) => {
                return Err(ExportError::AmbiguousMatch {
                    occ_id: occ_id.to_string(),
                    kind,
                    tag,
                    count,
                })
            }
        };

        Ok((
            self.require(a, occ_id, first, tag)?,
            self.require(b, occ_id, second, tag)?,
        ))
    }

    fn require(
        &self,
        bag: Option<AttributeBag>,
        occ_id: &str,
        kind: EdgeKind,
        tag: &str,
    ) -> Result<AttributeBag, ExportError> {
        match (bag, self.config.missing) {
            (Some(bag), _) => Ok(bag),
            (None, MissingPolicy::Lenient) => Ok(AttributeBag::new()),
            (None, MissingPolicy::Strict) => Err(ExportError::MissingNeighbor {
                occ_id: occ_id.to_string(),
                kind,
                tag: tag.to_string(),
            }),
        }
    }

    fn enter(&mut self, node: NodeId, occ_id: &str, tag: &str) -> Result<(), ExportError> {
        if !self.path.insert(node) {
            return Err(ExportError::CycleDetected {
                occ_id: occ_id.to_string(),
                tag: tag.to_string(),
            });
        }
        self.visited += 1;
        Ok(())
    }

    fn occ_id(&self, node: NodeId) -> Result<String, ExportError> {
        match self.graph.node_property(node, OCC_ID)? {
            Some(Value::String(occ_id)) => Ok(occ_id),
            _ => Err(ExportError::MissingIdentifier { node }),
        }
    }

    fn snapshot_flag(&self, node: NodeId, occ_id: &str) -> Result<bool, ExportError> {
        match self.graph.node_property(node, SNAPSHOT_FLAG)? {
            Some(Value::Bool(flag)) => Ok(flag),
            Some(other) => {
                warn!(
                    occ_id,
                    value_type = other.type_name(),
                    "isMeta is not a boolean, treating node as occurrence"
                );
                Ok(false)
            }
            None => Ok(false),
        }
    }
}
