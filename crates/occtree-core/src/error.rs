use crate::entity::Shape;
use crate::store::{EdgeKind, NodeId, StoreError};
use thiserror::Error;

/// Failure of a whole export call. No partial tree is ever returned.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A store fault while reading the satellite data of a classified node.
    #[error("Missing related object to {shape} with occId = {occ_id}")]
    MissingRelatedData {
        occ_id: String,
        shape: Shape,
        kinds: [EdgeKind; 2],
        #[source]
        source: StoreError,
    },

    #[error("node {node} has no string occId property")]
    MissingIdentifier { node: NodeId },

    #[error("HAS_Parent cycle tagged {tag:?} re-enters occId = {occ_id}")]
    CycleDetected { occ_id: String, tag: String },

    #[error("HAS_Parent nesting at occId = {occ_id} reaches depth {depth}, above the limit of {max_depth}")]
    DepthExceeded {
        occ_id: String,
        depth: usize,
        max_depth: usize,
    },

    #[error("missing OUTGOING relationship with type: {kind} and endItem {tag} on occId = {occ_id}")]
    MissingNeighbor {
        occ_id: String,
        kind: EdgeKind,
        tag: String,
    },

    #[error("{count} OUTGOING relationships with type: {kind} and endItem {tag} on occId = {occ_id}")]
    AmbiguousMatch {
        occ_id: String,
        kind: EdgeKind,
        tag: String,
        count: usize,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to encode export: {0}")]
    Serialize(#[from] serde_json::Error),
}
