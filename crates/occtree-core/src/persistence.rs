use crate::properties::{PropertyMap, Value};
use crate::store::{EdgeKind, GraphRead, MemoryGraph, NodeId, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

type JsonMap = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("failed to access graph dump {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed graph dump: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate node key {0:?}")]
    DuplicateKey(String),
    #[error("edge references unknown node key {0:?}")]
    UnknownNode(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub key: String,
    #[serde(default)]
    pub properties: JsonMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
    #[serde(default)]
    pub properties: JsonMap,
}

/// JSON dump of a `MemoryGraph`. Edge order in the dump is the store order after loading.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDump {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

impl GraphDump {
    pub fn from_json(text: &str) -> Result<Self, DumpError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, DumpError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| DumpError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let dump = Self::from_json(&text)?;
        info!(
            path = %path.display(),
            nodes = dump.nodes.len(),
            edges = dump.edges.len(),
            "graph dump loaded"
        );
        Ok(dump)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), DumpError> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).map_err(|source| DumpError::Io {
            path: path.display().to_string(),
            source,
        })?;
        info!(path = %path.display(), "graph dump saved");
        Ok(())
    }

    pub fn into_graph(self) -> Result<MemoryGraph, DumpError> {
        let mut graph = MemoryGraph::new();
        let mut keys: HashMap<String, NodeId> = HashMap::with_capacity(self.nodes.len());

        for record in self.nodes {
            let id = graph.add_node(to_properties(record.properties));
            if keys.insert(record.key.clone(), id).is_some() {
                return Err(DumpError::DuplicateKey(record.key));
            }
        }

        for record in self.edges {
            let from = *keys
                .get(&record.from)
                .ok_or_else(|| DumpError::UnknownNode(record.from.clone()))?;
            let to = *keys
                .get(&record.to)
                .ok_or_else(|| DumpError::UnknownNode(record.to.clone()))?;
            graph.add_edge(from, to, record.kind, to_properties(record.properties))?;
        }

        Ok(graph)
    }

    /// Dumps every node (keyed by its store id) and edge of `graph`.
    pub fn from_graph(graph: &MemoryGraph) -> Result<Self, DumpError> {
        let mut nodes = Vec::with_capacity(graph.node_count());
        for node in graph.nodes() {
            nodes.push(NodeRecord {
                key: node.to_string(),
                properties: to_json_map(graph.node_properties(node)?),
            });
        }

        let mut edges = Vec::with_capacity(graph.edge_count());
        for edge in graph.all_edges() {
            let properties = graph
                .edge_properties(edge.id)
                .cloned()
                .map(to_json_map)
                .ok_or(StoreError::EdgeNotFound(edge.id))?;
            edges.push(EdgeRecord {
                from: edge.start.to_string(),
                to: edge.end.to_string(),
                kind: edge.kind,
                properties,
            });
        }

        Ok(Self { nodes, edges })
    }
}

/// Nulls are dropped; nested objects are kept as their JSON text.
fn to_properties(map: JsonMap) -> PropertyMap {
    map.into_iter()
        .filter_map(|(key, value)| from_json(value).map(|v| (key, v)))
        .collect()
}

fn from_json(value: serde_json::Value) -> Option<Value> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(b) => Some(Value::Bool(b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Value::Int(i)),
            None => n.as_f64().map(Value::Float),
        },
        serde_json::Value::String(s) => Some(Value::String(s)),
        serde_json::Value::Array(items) => Some(Value::List(
            items.into_iter().filter_map(from_json).collect(),
        )),
        object @ serde_json::Value::Object(_) => Some(Value::String(object.to_string())),
    }
}

fn to_json_map(props: PropertyMap) -> JsonMap {
    props
        .into_iter()
        .map(|(key, value)| (key, to_json(&value)))
        .collect()
}

fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Int(i) => serde_json::Value::from(*i),
        Value::Float(x) => serde_json::Value::from(*x),
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::DateTime(dt) => serde_json::Value::String(dt.to_rfc3339()),
        Value::List(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
    }
}
