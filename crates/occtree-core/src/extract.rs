//! Attribute extraction: the properties of the single tagged neighbor reached
//! over one relationship kind, flattened to strings.

use crate::config::AmbiguityPolicy;
use crate::entity::AttributeBag;
use crate::properties::{PropertyMap, Value};
use crate::store::{Direction, Edge, EdgeKind, GraphRead, NodeId, StoreError};
use thiserror::Error;
use tracing::{debug, warn};

/// Edge property listing the views an edge takes part in.
pub const END_ITEM: &str = "endItem";

/// Bookkeeping keys never exported.
pub const DENYLIST: [&str; 5] = ["occID", "createdAt", "endItem", "isMeta", "updateddAt"];

/// Dropped only while it holds `SENTINEL_VALUE`.
pub const SENTINEL_KEY: &str = "OBID";
pub const SENTINEL_VALUE: &str = "no_OBID";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{count} {kind} edges tagged {tag:?} leave node {node}")]
    Ambiguous {
        node: NodeId,
        kind: EdgeKind,
        tag: String,
        count: usize,
    },
}

/// True when a tag-list value names `tag`. A bare string counts as a one-element list.
pub fn tag_matches(value: &Value, tag: &str) -> bool {
    match value {
        Value::List(items) => items.iter().any(|item| item.as_str() == Some(tag)),
        Value::String(s) => s == tag,
        _ => false,
    }
}

/// Whether `edge` carries `tag` in its `endItem` list. Untagged edges never match.
pub fn edge_tagged<G: GraphRead + ?Sized>(
    graph: &G,
    edge: &Edge,
    tag: &str,
) -> Result<bool, StoreError> {
    match graph.edge_property(edge.id, END_ITEM)? {
        Some(value @ (Value::List(_) | Value::String(_))) => Ok(tag_matches(&value, tag)),
        Some(other) => {
            warn!(
                edge = %edge.id,
                kind = %edge.kind,
                value_type = other.type_name(),
                "ignoring endItem that is not a list"
            );
            Ok(false)
        }
        None => Ok(false),
    }
}

/// Drops bookkeeping keys and stringifies the rest.
pub fn strip_bookkeeping(props: PropertyMap) -> AttributeBag {
    props
        .into_iter()
        .filter(|(key, value)| {
            if DENYLIST.contains(&key.as_str()) {
                return false;
            }
            !(key == SENTINEL_KEY && value.as_str() == Some(SENTINEL_VALUE))
        })
        .map(|(key, value)| (key, value.to_string()))
        .collect()
}

pub struct AttributeExtractor<'g, G: ?Sized> {
    graph: &'g G,
    ambiguity: AmbiguityPolicy,
}

impl<'g, G: GraphRead + ?Sized> AttributeExtractor<'g, G> {
    pub fn new(graph: &'g G, ambiguity: AmbiguityPolicy) -> Self {
        Self { graph, ambiguity }
    }

    /// Attributes of the first neighbor reached over a `kind` edge tagged with
    /// `tag`, or `None` when no edge qualifies.
    pub fn extract(
        &self,
        node: NodeId,
        direction: Direction,
        kind: EdgeKind,
        tag: &str,
    ) -> Result<Option<AttributeBag>, ExtractError> {
        let cursor = self.graph.edges(node, direction, kind)?;
        let mut found: Option<Edge> = None;
        let mut count = 0;

        for edge in cursor {
            let edge = edge?;
            if !edge_tagged(self.graph, &edge, tag)? {
                continue;
            }
            count += 1;
            if found.is_none() {
                found = Some(edge);
                if self.ambiguity == AmbiguityPolicy::FirstMatch {
                    break;
                }
            }
        }

        if count > 1 {
            return Err(ExtractError::Ambiguous {
                node,
                kind,
                tag: tag.to_string(),
                count,
            });
        }

        let Some(edge) = found else {
            debug!(%node, %kind, tag, "no tagged neighbor");
            return Ok(None);
        };

        let neighbor = edge.other_node(node);
        let bag = strip_bookkeeping(self.graph.node_properties(neighbor)?);
        debug!(%node, %kind, %neighbor, attributes = bag.len(), "extracted attributes");
        Ok(Some(bag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::property_map;
    use crate::store::MemoryGraph;

    #[test]
    fn denylisted_keys_are_stripped() {
        let props = property_map([
            ("occID", Value::from("dup")),
            ("createdAt", Value::from("2023-01-01")),
            ("endItem", Value::from(vec!["T"])),
            ("isMeta", Value::from(true)),
            ("updateddAt", Value::from("2023-01-02")),
            ("color", Value::from("red")),
            ("count", Value::from(3i64)),
        ]);
        let bag = strip_bookkeeping(props);
        assert_eq!(
            bag,
            AttributeBag::from([
                ("color".to_string(), "red".to_string()),
                ("count".to_string(), "3".to_string()),
            ])
        );
    }

    #[test]
    fn sentinel_key_dropped_only_with_sentinel_value() {
        let bag = strip_bookkeeping(property_map([("OBID", "no_OBID")]));
        assert!(bag.is_empty());

        let bag = strip_bookkeeping(property_map([("OBID", "X42")]));
        assert_eq!(bag.get("OBID").map(String::as_str), Some("X42"));
    }

    #[test]
    fn tag_matching_is_exact() {
        let tags = Value::from(vec!["C205", "AS_C205"]);
        assert!(tag_matches(&tags, "C205"));
        assert!(tag_matches(&tags, "AS_C205"));
        assert!(!tag_matches(&tags, "C20"));
        assert!(tag_matches(&Value::from("C205"), "C205"));
        assert!(!tag_matches(&Value::from(1i64), "1"));
    }

    #[test]
    fn early_return_releases_cursor() {
        let mut g = MemoryGraph::new();
        let root = g.add_node(property_map([("occId", "R")]));
        for color in ["red", "blue"] {
            let obj = g.add_node(property_map([("color", color)]));
            g.add_edge(root, obj, EdgeKind::Object, property_map([("endItem", vec!["T"])]))
                .unwrap();
        }

        let extractor = AttributeExtractor::new(&g, AmbiguityPolicy::FirstMatch);
        let bag = extractor
            .extract(root, Direction::Outgoing, EdgeKind::Object, "T")
            .unwrap()
            .unwrap();
        assert_eq!(bag.get("color").map(String::as_str), Some("red"));
        assert_eq!(g.open_cursors(), 0);

        let strict = AttributeExtractor::new(&g, AmbiguityPolicy::Strict);
        let err = strict
            .extract(root, Direction::Outgoing, EdgeKind::Object, "T")
            .unwrap_err();
        assert!(matches!(err, ExtractError::Ambiguous { count: 2, .. }));
        assert_eq!(g.open_cursors(), 0);
    }
}
