//! Known diagram tools and their resolved calls.
//!
//! The model writes a tool call inline in its text as a JSON object whose
//! first field is the `tool` discriminator:
//!
//! ```text
//! {"tool":"render","payload":"<mxGraphModel>...</mxGraphModel>"}
//! {"tool":"edit","operations":[{"type":"update","id":"2","payload":"<mxCell .../>"}]}
//! ```

use std::fmt;

use diagram_core::{
    Document, DocumentError, DocumentValidator, EditRejection, Operation, apply_validated,
};

/// Text that opens every tool call payload.
pub const TOOL_MARKER: &str = "{\"tool\"";

/// Closed set of tools the model can call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    /// Replace the whole document with a markup payload.
    Render,
    /// Apply structural operations to the current document.
    Edit,
}

impl ToolKind {
    pub const ALL: [ToolKind; 2] = [ToolKind::Render, ToolKind::Edit];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Render => "render",
            Self::Edit => "edit",
        }
    }

    /// Name of the field carrying the tool's input.
    pub fn input_field(self) -> &'static str {
        match self {
            Self::Render => "payload",
            Self::Edit => "operations",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// The fail-soft call substituted when nothing can be recovered.
    pub fn empty_call(self) -> ToolCall {
        match self {
            Self::Render => ToolCall::Render {
                payload: String::new(),
            },
            Self::Edit => ToolCall::Edit {
                operations: Vec::new(),
            },
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved tool call. Serializes as the tool input: `{payload}` or `{operations}`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum ToolCall {
    Render { payload: String },
    Edit { operations: Vec<Operation> },
}

/// Why a tool call could not be applied to a document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolApplyError {
    #[error("invalid diagram markup: {0}")]
    Markup(#[from] DocumentError),
    /// The payload held text but not a single diagram cell.
    #[error("render payload contains no diagram cells")]
    NoCells,
    #[error(transparent)]
    Rejected(#[from] EditRejection),
}

impl ToolCall {
    pub fn kind(&self) -> ToolKind {
        match self {
            Self::Render { .. } => ToolKind::Render,
            Self::Edit { .. } => ToolKind::Edit,
        }
    }

    /// True for the fail-soft result: blank payload or no operations.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Render { payload } => payload.trim().is_empty(),
            Self::Edit { operations } => operations.is_empty(),
        }
    }

    /// Produces the next document. Render replaces the whole document, edit
    /// runs the operation engine; either result must pass `validator`. An
    /// empty call is a no-op, and a render that would leave no cells or drop
    /// a truncated one is rejected.
    pub fn apply(
        &self,
        document: &Document,
        validator: &dyn DocumentValidator,
    ) -> Result<Document, ToolApplyError> {
        if self.is_empty() {
            return Ok(document.clone());
        }
        match self {
            Self::Render { payload } => {
                let next = Document::from_markup(payload)?;
                if next.is_empty() {
                    return Err(ToolApplyError::NoCells);
                }
                validator
                    .validate(&next)
                    .map_err(EditRejection::Invalid)?;
                Ok(next)
            }
            Self::Edit { operations } => Ok(apply_validated(document, operations, validator)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diagram_core::{StructuralValidator, ValidationError};

    fn base() -> Document {
        Document::from_markup(r#"<root><mxCell id="0"/><mxCell id="1" parent="0"/></root>"#)
            .expect("base")
    }

    #[test]
    fn kinds_round_trip_through_names() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("draw"), None);
    }

    #[test]
    fn serializes_as_tool_input() {
        let render = serde_json::to_value(ToolCall::Render {
            payload: "<x/>".into(),
        })
        .expect("render");
        assert_eq!(render, serde_json::json!({"payload": "<x/>"}));
        let edit = serde_json::to_value(ToolCall::Edit {
            operations: vec![Operation::delete("a")],
        })
        .expect("edit");
        assert_eq!(
            edit,
            serde_json::json!({"operations": [{"type": "delete", "id": "a"}]})
        );
    }

    #[test]
    fn empty_call_is_a_no_op() {
        let doc = base();
        for kind in ToolKind::ALL {
            let next = kind
                .empty_call()
                .apply(&doc, &StructuralValidator)
                .expect("no-op");
            assert_eq!(next, doc);
        }
    }

    #[test]
    fn render_replaces_document() {
        let call = ToolCall::Render {
            payload: r#"<mxGraphModel><root><mxCell id="0"/><mxCell id="1" parent="0"/><mxCell id="box" vertex="1" parent="1"/></root></mxGraphModel>"#.into(),
        };
        let next = call.apply(&Document::new(), &StructuralValidator).expect("render");
        assert_eq!(next.ids().collect::<Vec<_>>(), vec!["0", "1", "box"]);
    }

    #[test]
    fn render_without_cells_is_rejected() {
        let call = ToolCall::Render {
            payload: "<node/>".into(),
        };
        assert_eq!(
            call.apply(&base(), &StructuralValidator),
            Err(ToolApplyError::NoCells)
        );
    }

    #[test]
    fn truncated_render_payload_is_rejected() {
        let call = ToolCall::Render {
            payload: r#"<root><mxCell id="0"/><mxCell id="1" parent="0"/><mxCell id="a" vertex="1" parent="1"><mxGeometry x="1"#.into(),
        };
        assert!(matches!(
            call.apply(&base(), &StructuralValidator),
            Err(ToolApplyError::Markup(DocumentError::UnclosedCell {
                opened: 3,
                complete: 2
            }))
        ));
    }

    #[test]
    fn render_with_dangling_parent_is_rejected() {
        let call = ToolCall::Render {
            payload: r#"<root><mxCell id="a" parent="nope"/></root>"#.into(),
        };
        let err = call.apply(&base(), &StructuralValidator).expect_err("invalid");
        assert!(matches!(
            err,
            ToolApplyError::Rejected(EditRejection::Invalid(ValidationError::MissingParent { .. }))
        ));
    }

    #[test]
    fn edit_runs_operation_engine() {
        let call = ToolCall::Edit {
            operations: vec![Operation::add("n", r#"<mxCell id="n" parent="1"/>"#)],
        };
        let next = call.apply(&base(), &StructuralValidator).expect("edit");
        assert!(next.contains("n"));

        let failing = ToolCall::Edit {
            operations: vec![Operation::delete("missing")],
        };
        assert!(matches!(
            failing.apply(&base(), &StructuralValidator),
            Err(ToolApplyError::Rejected(EditRejection::Operations(_)))
        ));
    }
}
