//! Graph-store read interface consumed by the export, plus an in-memory
//! implementation used by the CLI, the service layer and the tests.

use crate::properties::{PropertyMap, PropertyStore, Value};
use crate::topology::GraphTopology;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// Property holding the occurrence identifier.
pub const OCC_ID: &str = "occId";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// Relationship kinds known to the occurrence model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Legacy upper-case details link. Stored by older loaders, never followed by the export.
    #[serde(rename = "HAS_DETAILS")]
    LegacyDetails,
    #[serde(rename = "HAS_Details")]
    Details,
    #[serde(rename = "HAS_Input")]
    Input,
    #[serde(rename = "HAS_Object")]
    Object,
    #[serde(rename = "HAS_Relation")]
    Relation,
    #[serde(rename = "HAS_Parent")]
    Parent,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 6] = [
        EdgeKind::LegacyDetails,
        EdgeKind::Details,
        EdgeKind::Input,
        EdgeKind::Object,
        EdgeKind::Relation,
        EdgeKind::Parent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::LegacyDetails => "HAS_DETAILS",
            EdgeKind::Details => "HAS_Details",
            EdgeKind::Input => "HAS_Input",
            EdgeKind::Object => "HAS_Object",
            EdgeKind::Relation => "HAS_Relation",
            EdgeKind::Parent => "HAS_Parent",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed edge handle as returned by an edge cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub id: EdgeId,
    pub start: NodeId,
    pub end: NodeId,
    pub kind: EdgeKind,
}

impl Edge {
    /// The node on the far side of `node`.
    pub fn other_node(&self, node: NodeId) -> NodeId {
        if self.start == node {
            self.end
        } else {
            self.start
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
    #[error("edge {0} not found")]
    EdgeNotFound(EdgeId),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Counts cursors that have been opened and not yet dropped.
#[derive(Debug, Default)]
pub struct CursorTracker {
    open: AtomicUsize,
}

impl CursorTracker {
    pub fn open_count(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    fn acquire(&self) {
        self.open.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Scoped iteration over a node's edges. Dropping the cursor releases it,
/// whether or not it was drained.
pub struct EdgeCursor<'a> {
    edges: Box<dyn Iterator<Item = Result<Edge, StoreError>> + 'a>,
    tracker: Option<&'a CursorTracker>,
}

impl<'a> EdgeCursor<'a> {
    pub fn new(edges: impl Iterator<Item = Result<Edge, StoreError>> + 'a) -> Self {
        Self {
            edges: Box::new(edges),
            tracker: None,
        }
    }

    pub fn tracked(
        edges: impl Iterator<Item = Result<Edge, StoreError>> + 'a,
        tracker: &'a CursorTracker,
    ) -> Self {
        tracker.acquire();
        Self {
            edges: Box::new(edges),
            tracker: Some(tracker),
        }
    }
}

impl Iterator for EdgeCursor<'_> {
    type Item = Result<Edge, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.edges.next()
    }
}

impl Drop for EdgeCursor<'_> {
    fn drop(&mut self) {
        if let Some(tracker) = self.tracker {
            tracker.release();
        }
    }
}

/// Read API of the property graph. Implementations must present a
/// consistent view for the duration of one export.
pub trait GraphRead {
    fn contains_node(&self, node: NodeId) -> bool;

    fn node_property(&self, node: NodeId, key: &str) -> Result<Option<Value>, StoreError>;

    fn node_properties(&self, node: NodeId) -> Result<PropertyMap, StoreError>;

    /// Edges of `kind` on `node` in `direction`, in store order.
    fn edges(
        &self,
        node: NodeId,
        direction: Direction,
        kind: EdgeKind,
    ) -> Result<EdgeCursor<'_>, StoreError>;

    fn edge_property(&self, edge: EdgeId, key: &str) -> Result<Option<Value>, StoreError>;
}

#[derive(Debug, Clone, Copy)]
struct EdgeEnds {
    start: u32,
    end: u32,
    kind: EdgeKind,
}

/// In-memory property graph: adjacency-list topology plus row-per-element properties.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    topology: GraphTopology,
    node_props: PropertyStore,
    edge_ends: Vec<EdgeEnds>,
    edge_props: PropertyStore,
    cursors: CursorTracker,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, props: PropertyMap) -> NodeId {
        let id = self.topology.add_node();
        self.node_props.push(props);
        NodeId(id)
    }

    pub fn add_edge(
        &mut self,
        from: NodeId,
        to: NodeId,
        kind: EdgeKind,
        props: PropertyMap,
    ) -> Result<EdgeId, StoreError> {
        for node in [from, to] {
            if !self.topology.contains(node.0) {
                return Err(StoreError::NodeNotFound(node));
            }
        }
        let id = self.edge_ends.len() as u32;
        self.topology.add_edge(from.0, to.0, kind, id);
        self.edge_ends.push(EdgeEnds {
            start: from.0,
            end: to.0,
            kind,
        });
        self.edge_props.push(props);
        Ok(EdgeId(id))
    }

    pub fn node_count(&self) -> usize {
        self.topology.num_nodes()
    }

    pub fn edge_count(&self) -> usize {
        self.topology.num_edges()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> {
        (0..self.node_count() as u32).map(NodeId)
    }

    /// All edges in insertion order.
    pub fn all_edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.edge_ends.iter().enumerate().map(|(id, ends)| Edge {
            id: EdgeId(id as u32),
            start: NodeId(ends.start),
            end: NodeId(ends.end),
            kind: ends.kind,
        })
    }

    pub fn edge_properties(&self, edge: EdgeId) -> Option<&PropertyMap> {
        self.edge_props.get_all(edge.0)
    }

    /// First node whose `occId` equals `occ_id`.
    pub fn find_by_occ_id(&self, occ_id: &str) -> Option<NodeId> {
        self.nodes().find(|node| {
            self.node_props
                .get_property(node.0, OCC_ID)
                .and_then(Value::as_str)
                == Some(occ_id)
        })
    }

    /// Number of edge cursors currently open on this graph.
    pub fn open_cursors(&self) -> usize {
        self.cursors.open_count()
    }
}

impl GraphRead for MemoryGraph {
    fn contains_node(&self, node: NodeId) -> bool {
        self.topology.contains(node.0)
    }

    fn node_property(&self, node: NodeId, key: &str) -> Result<Option<Value>, StoreError> {
        self.node_props
            .get_all(node.0)
            .map(|props| props.get(key).cloned())
            .ok_or(StoreError::NodeNotFound(node))
    }

    fn node_properties(&self, node: NodeId) -> Result<PropertyMap, StoreError> {
        self.node_props
            .get_all(node.0)
            .cloned()
            .ok_or(StoreError::NodeNotFound(node))
    }

    fn edges(
        &self,
        node: NodeId,
        direction: Direction,
        kind: EdgeKind,
    ) -> Result<EdgeCursor<'_>, StoreError> {
        if !self.topology.contains(node.0) {
            return Err(StoreError::NodeNotFound(node));
        }
        let edges = self
            .topology
            .neighbors(node.0, direction)
            .filter(move |(_, k, _)| *k == kind)
            .map(move |(neighbor, kind, edge_id)| {
                let (start, end) = match direction {
                    Direction::Outgoing => (node, NodeId(neighbor)),
                    Direction::Incoming => (NodeId(neighbor), node),
                };
                Ok(Edge {
                    id: EdgeId(edge_id),
                    start,
                    end,
                    kind,
                })
            });
        Ok(EdgeCursor::tracked(edges, &self.cursors))
    }

    fn edge_property(&self, edge: EdgeId, key: &str) -> Result<Option<Value>, StoreError> {
        self.edge_props
            .get_all(edge.0)
            .map(|props| props.get(key).cloned())
            .ok_or(StoreError::EdgeNotFound(edge))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::property_map;

    fn occ(id: &str) -> PropertyMap {
        property_map([(OCC_ID, id)])
    }

    #[test]
    fn edges_follow_insertion_order_per_direction() {
        let mut g = MemoryGraph::new();
        let root = g.add_node(occ("R"));
        let a = g.add_node(occ("A"));
        let b = g.add_node(occ("B"));
        g.add_edge(b, root, EdgeKind::Parent, PropertyMap::new()).unwrap();
        g.add_edge(a, root, EdgeKind::Parent, PropertyMap::new()).unwrap();
        g.add_edge(root, a, EdgeKind::Object, PropertyMap::new()).unwrap();

        let incoming: Vec<NodeId> = g
            .edges(root, Direction::Incoming, EdgeKind::Parent)
            .unwrap()
            .map(|e| e.unwrap().other_node(root))
            .collect();
        assert_eq!(incoming, vec![b, a]);

        let outgoing_parent = g
            .edges(root, Direction::Outgoing, EdgeKind::Parent)
            .unwrap()
            .count();
        assert_eq!(outgoing_parent, 0);
    }

    #[test]
    fn cursor_released_on_drop_without_draining() {
        let mut g = MemoryGraph::new();
        let root = g.add_node(occ("R"));
        let child = g.add_node(occ("C"));
        g.add_edge(child, root, EdgeKind::Parent, PropertyMap::new()).unwrap();

        {
            let mut cursor = g.edges(root, Direction::Incoming, EdgeKind::Parent).unwrap();
            assert!(cursor.next().is_some());
            assert_eq!(g.open_cursors(), 1);
        }
        assert_eq!(g.open_cursors(), 0);
    }

    #[test]
    fn add_edge_rejects_unknown_endpoint() {
        let mut g = MemoryGraph::new();
        let root = g.add_node(occ("R"));
        let err = g
            .add_edge(root, NodeId(7), EdgeKind::Object, PropertyMap::new())
            .unwrap_err();
        assert!(matches!(err, StoreError::NodeNotFound(NodeId(7))));
    }

    #[test]
    fn find_by_occ_id_and_kind_names() {
        let mut g = MemoryGraph::new();
        g.add_node(occ("R"));
        let c = g.add_node(occ("C"));
        assert_eq!(g.find_by_occ_id("C"), Some(c));
        assert_eq!(g.find_by_occ_id("missing"), None);
        assert_eq!(EdgeKind::parse("HAS_Relation"), Some(EdgeKind::Relation));
        assert_eq!(EdgeKind::parse("HAS_relation"), None);
    }
}
