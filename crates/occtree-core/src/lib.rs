pub mod topology {
    use crate::store::{Direction, EdgeKind};
    use serde::{Deserialize, Serialize};

    /// A Dynamic Graph Topology represented as adjacency lists in both directions.
    /// Lists keep insertion order, which is the enumeration order the export relies on.
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct GraphTopology {
        /// Outgoing adjacency: NodeID -> Vec<(NeighborID, EdgeKind, EdgeID)>
        pub outgoing: Vec<Vec<(u32, EdgeKind, u32)>>,
        /// Incoming adjacency: NodeID -> Vec<(NeighborID, EdgeKind, EdgeID)>
        pub incoming: Vec<Vec<(u32, EdgeKind, u32)>>,
    }

    impl GraphTopology {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn num_nodes(&self) -> usize {
            self.outgoing.len()
        }

        pub fn num_edges(&self) -> usize {
            self.outgoing.iter().map(|neighbors| neighbors.len()).sum()
        }

        pub fn contains(&self, node_id: u32) -> bool {
            (node_id as usize) < self.outgoing.len()
        }

        pub fn neighbors(
            &self,
            node_id: u32,
            direction: Direction,
        ) -> impl Iterator<Item = (u32, EdgeKind, u32)> + '_ {
            let lists = match direction {
                Direction::Outgoing => &self.outgoing,
                Direction::Incoming => &self.incoming,
            };
            lists.get(node_id as usize).into_iter().flatten().copied()
        }

        pub fn add_node(&mut self) -> u32 {
            let id = self.outgoing.len() as u32;
            self.outgoing.push(Vec::new());
            self.incoming.push(Vec::new());
            id
        }

        /// Returns false when either endpoint is unknown.
        pub fn add_edge(&mut self, src: u32, dst: u32, kind: EdgeKind, edge_id: u32) -> bool {
            if !self.contains(src) || !self.contains(dst) {
                return false;
            }
            self.outgoing[src as usize].push((dst, kind, edge_id));
            self.incoming[dst as usize].push((src, kind, edge_id));
            true
        }
    }
}

pub mod properties {
    use chrono::{DateTime, FixedOffset};
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;
    use std::fmt;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum Value {
        String(String),
        Int(i64),
        Float(f64),
        Bool(bool),
        DateTime(DateTime<FixedOffset>),
        List(Vec<Value>),
    }

    impl Value {
        pub fn as_str(&self) -> Option<&str> {
            match self {
                Value::String(s) => Some(s),
                _ => None,
            }
        }

        pub fn as_bool(&self) -> Option<bool> {
            match self {
                Value::Bool(b) => Some(*b),
                _ => None,
            }
        }

        pub fn type_name(&self) -> &'static str {
            match self {
                Value::String(_) => "string",
                Value::Int(_) => "int",
                Value::Float(_) => "float",
                Value::Bool(_) => "bool",
                Value::DateTime(_) => "datetime",
                Value::List(_) => "list",
            }
        }
    }

    /// String form used in attribute bags.
    impl fmt::Display for Value {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Value::String(s) => f.write_str(s),
                Value::Int(i) => write!(f, "{}", i),
                Value::Float(x) => f.write_str(&float_text(*x)),
                Value::Bool(b) => write!(f, "{}", b),
                Value::DateTime(dt) => f.write_str(&dt.to_rfc3339()),
                Value::List(items) => {
                    f.write_str("[")?;
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}", item)?;
                    }
                    f.write_str("]")
                }
            }
        }
    }

    /// Decimal notation with at least one fractional digit for magnitudes in
    /// `[1e-3, 1e7)`, otherwise `d.dddE<n>` scientific notation.
    fn float_text(x: f64) -> String {
        if x.is_nan() {
            return "NaN".to_string();
        }
        if x.is_infinite() {
            return if x > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
        }
        let magnitude = x.abs();
        if magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
            // Debug keeps the trailing ".0" and stays decimal in this range.
            return format!("{:?}", x);
        }
        let sci = format!("{:e}", x);
        match sci.split_once('e') {
            Some((mantissa, exponent)) if mantissa.contains('.') => {
                format!("{}E{}", mantissa, exponent)
            }
            Some((mantissa, exponent)) => format!("{}.0E{}", mantissa, exponent),
            None => sci,
        }
    }

    impl From<&str> for Value {
        fn from(s: &str) -> Self {
            Value::String(s.to_string())
        }
    }

    impl From<String> for Value {
        fn from(s: String) -> Self {
            Value::String(s)
        }
    }

    impl From<i64> for Value {
        fn from(i: i64) -> Self {
            Value::Int(i)
        }
    }

    impl From<f64> for Value {
        fn from(x: f64) -> Self {
            Value::Float(x)
        }
    }

    impl From<bool> for Value {
        fn from(b: bool) -> Self {
            Value::Bool(b)
        }
    }

    impl From<DateTime<FixedOffset>> for Value {
        fn from(dt: DateTime<FixedOffset>) -> Self {
            Value::DateTime(dt)
        }
    }

    impl<T: Into<Value>> From<Vec<T>> for Value {
        fn from(items: Vec<T>) -> Self {
            Value::List(items.into_iter().map(Into::into).collect())
        }
    }

    pub type PropertyMap = BTreeMap<String, Value>;

    /// Builds a property map from `(key, value)` pairs.
    pub fn property_map<K, V, I>(pairs: I) -> PropertyMap
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect()
    }

    /// Sparse property storage: ElementID -> key -> Value.
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct PropertyStore {
        pub rows: Vec<PropertyMap>,
    }

    impl PropertyStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn len(&self) -> usize {
            self.rows.len()
        }

        pub fn is_empty(&self) -> bool {
            self.rows.is_empty()
        }

        pub fn push(&mut self, props: PropertyMap) -> u32 {
            let id = self.rows.len() as u32;
            self.rows.push(props);
            id
        }

        pub fn get_property(&self, element_id: u32, key: &str) -> Option<&Value> {
            self.rows
                .get(element_id as usize)
                .and_then(|props| props.get(key))
        }

        pub fn get_all(&self, element_id: u32) -> Option<&PropertyMap> {
            self.rows.get(element_id as usize)
        }
    }

}

pub mod builder;
pub mod config;
pub mod entity;
pub mod error;
pub mod export;
pub mod extract;
pub mod persistence;
pub mod service;
pub mod store;

pub use config::{AmbiguityPolicy, ExportConfig, MissingPolicy, DEFAULT_END_ITEM, DEFAULT_MAX_DEPTH};
pub use entity::{AttributeBag, OccurrenceEntity, ResultEntity, Shape, SnapshotEntity};
pub use error::ExportError;
pub use export::{to_json, Exporter};
pub use store::{Direction, Edge, EdgeId, EdgeKind, GraphRead, MemoryGraph, NodeId, StoreError};
