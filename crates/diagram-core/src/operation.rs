//! Structural edit operations and the per-operation error they can raise.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One structural edit targeting a node by id.
///
/// Wire shape: `{"type": "update" | "add" | "delete", "id": "...", "payload": "..."}`.
/// A `payload` sent with `delete` is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Operation {
    /// Replace the body of an existing node.
    Update { id: String, payload: String },
    /// Append a new node whose id is `id`.
    Add { id: String, payload: String },
    /// Remove the node.
    Delete { id: String },
}

impl Operation {
    pub fn update(id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::Update {
            id: id.into(),
            payload: payload.into(),
        }
    }

    pub fn add(id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::Add {
            id: id.into(),
            payload: payload.into(),
        }
    }

    pub fn delete(id: impl Into<String>) -> Self {
        Self::Delete { id: id.into() }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Update { .. } => OperationKind::Update,
            Self::Add { .. } => OperationKind::Add,
            Self::Delete { .. } => OperationKind::Delete,
        }
    }

    pub fn target_id(&self) -> &str {
        match self {
            Self::Update { id, .. } | Self::Add { id, .. } | Self::Delete { id } => id,
        }
    }

    pub fn payload(&self) -> Option<&str> {
        match self {
            Self::Update { payload, .. } | Self::Add { payload, .. } => Some(payload),
            Self::Delete { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Update,
    Add,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Update => "update",
            Self::Add => "add",
            Self::Delete => "delete",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OperationErrorReason {
    #[error("not found")]
    NotFound,
    #[error("duplicate id")]
    DuplicateId,
    #[error("empty id")]
    EmptyId,
}

/// A skipped operation. The rest of the batch still applies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} {target_id:?}: {reason}")]
pub struct OperationError {
    pub kind: OperationKind,
    pub target_id: String,
    pub reason: OperationErrorReason,
}

impl OperationError {
    pub(crate) fn new(op: &Operation, reason: OperationErrorReason) -> Self {
        Self {
            kind: op.kind(),
            target_id: op.target_id().to_string(),
            reason,
        }
    }

    pub fn message(&self) -> String {
        self.reason.to_string()
    }
}
