use crate::store::EdgeKind;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Flattened string properties of a satellite node. Ordered so output is stable.
pub type AttributeBag = BTreeMap<String, String>;

/// The two entity shapes of an export tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Snapshot,
    Occurrence,
}

impl Shape {
    /// Relationship kinds whose neighbors supply the two attribute bags.
    pub fn satellite_kinds(&self) -> [EdgeKind; 2] {
        match self {
            Shape::Snapshot => [EdgeKind::Details, EdgeKind::Input],
            Shape::Occurrence => [EdgeKind::Object, EdgeKind::Relation],
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Snapshot => f.write_str("snapshot"),
            Shape::Occurrence => f.write_str("occurrence"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntity {
    pub occ_id: String,
    pub details_attributes: AttributeBag,
    pub input_parameters: AttributeBag,
    pub children: Vec<OccurrenceEntity>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceEntity {
    pub occ_id: String,
    pub object: AttributeBag,
    pub relation: AttributeBag,
    /// `occId` of the entity this one was built under. Never serialized.
    #[serde(skip)]
    pub parent: Option<String>,
    pub children: Vec<OccurrenceEntity>,
}

impl OccurrenceEntity {
    fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(OccurrenceEntity::node_count)
            .sum::<usize>()
    }
}

/// Root of an export. Only a root can be a snapshot; children are always occurrences.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultEntity {
    Snapshot(SnapshotEntity),
    Occurrence(OccurrenceEntity),
}

impl ResultEntity {
    pub fn shape(&self) -> Shape {
        match self {
            ResultEntity::Snapshot(_) => Shape::Snapshot,
            ResultEntity::Occurrence(_) => Shape::Occurrence,
        }
    }

    pub fn occ_id(&self) -> &str {
        match self {
            ResultEntity::Snapshot(s) => &s.occ_id,
            ResultEntity::Occurrence(o) => &o.occ_id,
        }
    }

    pub fn children(&self) -> &[OccurrenceEntity] {
        match self {
            ResultEntity::Snapshot(s) => &s.children,
            ResultEntity::Occurrence(o) => &o.children,
        }
    }

    /// Entities in the whole tree, root included.
    pub fn node_count(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(OccurrenceEntity::node_count)
            .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf(id: &str, parent: Option<&str>) -> OccurrenceEntity {
        OccurrenceEntity {
            occ_id: id.to_string(),
            object: AttributeBag::from([("color".to_string(), "red".to_string())]),
            relation: AttributeBag::new(),
            parent: parent.map(str::to_string),
            children: Vec::new(),
        }
    }

    #[test]
    fn occurrence_serializes_without_parent() {
        let entity = ResultEntity::Occurrence(leaf("C1", Some("R1")));
        let json = serde_json::to_string(&entity).unwrap();
        assert_eq!(
            json,
            r#"{"occId":"C1","object":{"color":"red"},"relation":{},"children":[]}"#
        );
    }

    #[test]
    fn snapshot_uses_details_and_input_keys() {
        let entity = ResultEntity::Snapshot(SnapshotEntity {
            occ_id: "R1".to_string(),
            details_attributes: AttributeBag::new(),
            input_parameters: AttributeBag::from([("k".to_string(), "v".to_string())]),
            children: vec![leaf("C1", Some("R1"))],
        });
        assert_eq!(
            serde_json::to_value(&entity).unwrap(),
            json!({
                "occId": "R1",
                "detailsAttributes": {},
                "inputParameters": {"k": "v"},
                "children": [
                    {"occId": "C1", "object": {"color": "red"}, "relation": {}, "children": []}
                ]
            })
        );
        assert_eq!(entity.node_count(), 2);
        assert_eq!(entity.shape(), Shape::Snapshot);
    }
}
