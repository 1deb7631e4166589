#![allow(dead_code)]

use occtree_core::properties::{property_map, PropertyMap, Value};
use occtree_core::store::{
    Direction, EdgeCursor, EdgeId, EdgeKind, GraphRead, MemoryGraph, NodeId, StoreError,
};
use std::collections::HashSet;

/// Small fluent wrapper for assembling occurrence graphs in tests.
#[derive(Default)]
pub struct Fixture {
    pub graph: MemoryGraph,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn occurrence(&mut self, occ_id: &str) -> NodeId {
        self.graph.add_node(property_map([("occId", occ_id)]))
    }

    pub fn snapshot(&mut self, occ_id: &str) -> NodeId {
        self.graph.add_node(property_map([
            ("occId", Value::from(occ_id)),
            ("isMeta", Value::from(true)),
        ]))
    }

    /// Adds a satellite node with `props` linked from `owner` by a `kind` edge tagged `tags`.
    pub fn satellite(
        &mut self,
        owner: NodeId,
        kind: EdgeKind,
        tags: &[&str],
        props: PropertyMap,
    ) -> NodeId {
        let node = self.graph.add_node(props);
        self.graph
            .add_edge(owner, node, kind, tag_props(tags))
            .expect("owner exists");
        node
    }

    /// Links `child` under `parent` with a `HAS_Parent` edge tagged `tags`.
    pub fn parent(&mut self, child: NodeId, parent: NodeId, tags: &[&str]) -> EdgeId {
        self.graph
            .add_edge(child, parent, EdgeKind::Parent, tag_props(tags))
            .expect("endpoints exist")
    }
}

pub fn tag_props(tags: &[&str]) -> PropertyMap {
    property_map([("endItem", tags.to_vec())])
}

/// Delegates to a `MemoryGraph` but fails reads of selected nodes and edge kinds.
pub struct FaultyGraph<'a> {
    pub inner: &'a MemoryGraph,
    pub failing_nodes: HashSet<NodeId>,
    pub failing_kinds: HashSet<EdgeKind>,
}

impl<'a> FaultyGraph<'a> {
    pub fn new(inner: &'a MemoryGraph) -> Self {
        Self {
            inner,
            failing_nodes: HashSet::new(),
            failing_kinds: HashSet::new(),
        }
    }

    pub fn fail_node(mut self, node: NodeId) -> Self {
        self.failing_nodes.insert(node);
        self
    }

    pub fn fail_kind(mut self, kind: EdgeKind) -> Self {
        self.failing_kinds.insert(kind);
        self
    }
}

impl GraphRead for FaultyGraph<'_> {
    fn contains_node(&self, node: NodeId) -> bool {
        self.inner.contains_node(node)
    }

    fn node_property(&self, node: NodeId, key: &str) -> Result<Option<Value>, StoreError> {
        self.inner.node_property(node, key)
    }

    fn node_properties(&self, node: NodeId) -> Result<PropertyMap, StoreError> {
        if self.failing_nodes.contains(&node) {
            return Err(StoreError::Unavailable(format!("read of {} timed out", node)));
        }
        self.inner.node_properties(node)
    }

    fn edges(
        &self,
        node: NodeId,
        direction: Direction,
        kind: EdgeKind,
    ) -> Result<EdgeCursor<'_>, StoreError> {
        if self.failing_kinds.contains(&kind) {
            return Err(StoreError::Unavailable(format!("{} index offline", kind)));
        }
        self.inner.edges(node, direction, kind)
    }

    fn edge_property(&self, edge: EdgeId, key: &str) -> Result<Option<Value>, StoreError> {
        self.inner.edge_property(edge, key)
    }
}
