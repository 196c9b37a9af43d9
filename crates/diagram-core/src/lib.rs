//! Diagram document model and the structural edit engine.
//!
//! A [`Document`] is an ordered forest of uniquely identified cells. Edits
//! arrive as [`Operation`]s and are applied by [`apply`], which never mutates
//! its input and collects per-operation errors instead of aborting.
//!
//! ```
//! use diagram_core::{Document, Operation, apply};
//!
//! let doc = Document::from_markup(r#"<root><mxCell id="0"/><mxCell id="1" parent="0"/></root>"#)
//!     .expect("valid markup");
//! let outcome = apply(&doc, &[Operation::add("box", r#"<mxCell id="box" vertex="1" parent="1"/>"#)]);
//! assert!(outcome.is_clean());
//! assert!(outcome.document.contains("box"));
//! ```

/// Document, node, and markup snapshot types.
pub mod document;
/// Operation engine.
pub mod engine;
/// Logging setup.
pub mod observability;
/// Edit operations and per-operation errors.
pub mod operation;
/// Whole-document structural validation.
pub mod validate;

pub use document::{Document, DocumentError, Node, ROOT_PARENT};
pub use engine::{ApplyOutcome, EditRejection, apply, apply_validated, format_operation_errors};
pub use operation::{Operation, OperationError, OperationErrorReason, OperationKind};
pub use validate::{DocumentValidator, StructuralValidator, ValidationError};
