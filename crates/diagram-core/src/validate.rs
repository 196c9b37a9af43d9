//! Whole-document structural checks run after operations apply cleanly.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::document::{Document, ROOT_PARENT};

/// Document-level rejection, reported separately from per-operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("node {id:?} is its own parent")]
    SelfParent { id: String },
    #[error("node {id:?} references missing parent {parent:?}")]
    MissingParent { id: String, parent: String },
    #[error("parent chain of node {id:?} forms a cycle")]
    Cycle { id: String },
}

/// Validates a complete document before it is accepted.
pub trait DocumentValidator: Send + Sync {
    fn validate(&self, document: &Document) -> Result<(), ValidationError>;
}

/// Checks that every parent reference resolves and that no node is its own ancestor.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

impl DocumentValidator for StructuralValidator {
    fn validate(&self, document: &Document) -> Result<(), ValidationError> {
        let parents: HashMap<&str, &str> = document
            .nodes()
            .iter()
            .filter_map(|node| Some((node.id.as_str(), node.parent_id.as_deref()?)))
            .collect();

        for node in document.nodes() {
            let id = node.id.as_str();
            let Some(parent) = node.parent_id.as_deref() else {
                continue;
            };
            if parent == id {
                return Err(ValidationError::SelfParent { id: id.to_string() });
            }
            if parent != ROOT_PARENT && !document.contains(parent) {
                return Err(ValidationError::MissingParent {
                    id: id.to_string(),
                    parent: parent.to_string(),
                });
            }
        }

        for node in document.nodes() {
            let mut seen = HashSet::new();
            let mut current = node.id.as_str();
            while let Some(&parent) = parents.get(current) {
                if !seen.insert(current) {
                    return Err(ValidationError::Cycle {
                        id: node.id.clone(),
                    });
                }
                current = parent;
            }
        }
        Ok(())
    }
}
