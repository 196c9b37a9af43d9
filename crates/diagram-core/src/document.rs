//! Diagram document model: an ordered forest of uniquely identified cells.
//!
//! Cell bodies are opaque markup. The only structure read out of a body is
//! its `id` and `parent` attribute, and only when the body carries them.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parent id that root-level cells hang off.
pub const ROOT_PARENT: &str = "0";

static CELL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<mxCell\b[^>]*?/>|<mxCell\b.*?</mxCell>").expect("valid cell pattern")
});

static CELL_OPEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<mxCell\b").expect("valid cell opener pattern"));

static ID_ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\sid\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid id pattern")
});

static PARENT_ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\sparent\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid parent pattern")
});

/// Errors raised while building a document from nodes or markup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// A cell carried no usable `id`.
    #[error("cell {index} has no id")]
    MissingId { index: usize },
    /// Two cells share the same id.
    #[error("duplicate id: {0}")]
    DuplicateId(String),
    /// A cell element was opened but never closed, as in a truncated snapshot.
    #[error("{opened} cells opened but only {complete} complete")]
    UnclosedCell { opened: usize, complete: usize },
}

/// A single structural unit of a diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    /// `None` means the node hangs off [`ROOT_PARENT`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Serialized cell markup.
    pub body: String,
}

impl Node {
    /// Creates a node, taking the parent from the body's `parent` attribute when present.
    pub fn new(id: impl Into<String>, body: impl Into<String>) -> Self {
        let body = body.into();
        Self {
            id: id.into(),
            parent_id: parent_attribute(&body),
            body,
        }
    }

    /// Builds a node from cell markup alone. Returns `None` when the body has no id.
    pub fn from_body(body: impl Into<String>) -> Option<Self> {
        let body = body.into();
        let id = id_attribute(&body).filter(|id| !id.is_empty())?;
        Some(Self::new(id, body))
    }

    /// Parent id, with root-level nodes reporting [`ROOT_PARENT`].
    pub fn parent(&self) -> &str {
        self.parent_id.as_deref().unwrap_or(ROOT_PARENT)
    }
}

/// Reads the `id` attribute from the opening tag of a cell body.
pub fn id_attribute(body: &str) -> Option<String> {
    opening_tag_attribute(&ID_ATTR_RE, body)
}

/// Reads the `parent` attribute from the opening tag of a cell body.
pub fn parent_attribute(body: &str) -> Option<String> {
    opening_tag_attribute(&PARENT_ATTR_RE, body)
}

fn opening_tag_attribute(re: &Regex, body: &str) -> Option<String> {
    let tag_end = body.find('>').map_or(body.len(), |idx| idx + 1);
    let caps = re.captures(&body[..tag_end])?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Ordered collection of nodes with ids unique across the whole document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Node>", into = "Vec<Node>")]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a document, rejecting empty or duplicate ids.
    pub fn from_nodes(nodes: Vec<Node>) -> Result<Self, DocumentError> {
        let mut seen = HashSet::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate() {
            if node.id.is_empty() {
                return Err(DocumentError::MissingId { index });
            }
            if !seen.insert(node.id.as_str()) {
                return Err(DocumentError::DuplicateId(node.id.clone()));
            }
        }
        Ok(Self { nodes })
    }

    /// Loads a snapshot from diagram markup, one node per `mxCell` element.
    ///
    /// Fails with [`DocumentError::UnclosedCell`] when any `<mxCell` opener is
    /// not part of a complete element.
    pub fn from_markup(markup: &str) -> Result<Self, DocumentError> {
        let nodes = CELL_RE
            .find_iter(markup)
            .enumerate()
            .map(|(index, m)| Node::from_body(m.as_str()).ok_or(DocumentError::MissingId { index }))
            .collect::<Result<Vec<_>, _>>()?;
        let opened = CELL_OPEN_RE.find_iter(markup).count();
        if opened != nodes.len() {
            return Err(DocumentError::UnclosedCell {
                opened,
                complete: nodes.len(),
            });
        }
        Self::from_nodes(nodes)
    }

    /// Serializes the document back into diagram markup.
    pub fn to_markup(&self) -> String {
        let mut out = String::from("<mxGraphModel><root>");
        for node in &self.nodes {
            out.push_str(&node.body);
        }
        out.push_str("</root></mxGraphModel>");
        out
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|node| node.id.as_str())
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }

    pub(crate) fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }

    /// Removes every node with `id`, returning how many were removed.
    pub(crate) fn remove_all(&mut self, id: &str) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|node| node.id != id);
        before - self.nodes.len()
    }
}

impl TryFrom<Vec<Node>> for Document {
    type Error = DocumentError;

    fn try_from(nodes: Vec<Node>) -> Result<Self, Self::Error> {
        Self::from_nodes(nodes)
    }
}

impl From<Document> for Vec<Node> {
    fn from(document: Document) -> Self {
        document.nodes
    }
}
