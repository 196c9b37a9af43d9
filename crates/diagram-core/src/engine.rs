//! Document operation engine.
//!
//! Operations apply left to right against a working copy. A failing
//! operation is recorded and skipped; the rest of the batch still applies.
//! Callers that need all-or-nothing acceptance use [`apply_validated`].

use thiserror::Error;
use tracing::{debug, warn};

use crate::document::{Document, Node, id_attribute, parent_attribute};
use crate::operation::{Operation, OperationError, OperationErrorReason};
use crate::validate::{DocumentValidator, ValidationError};

/// Result of applying a batch: the resulting document and every skipped operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub document: Document,
    pub errors: Vec<OperationError>,
}

impl ApplyOutcome {
    /// True when every operation applied.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Why an edit batch was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditRejection {
    /// One or more operations were skipped.
    #[error("{} operation(s) failed: {}", .0.len(), format_operation_errors(.0))]
    Operations(Vec<OperationError>),
    /// Operations applied but the resulting document is structurally invalid.
    #[error("document rejected: {0}")]
    Invalid(#[from] ValidationError),
}

/// Applies `operations` to a copy of `document`. The input is never mutated.
pub fn apply(document: &Document, operations: &[Operation]) -> ApplyOutcome {
    let mut working = document.clone();
    let mut errors = Vec::new();

    for op in operations {
        if let Err(reason) = apply_one(&mut working, op) {
            debug!(kind = %op.kind(), target_id = op.target_id(), %reason, "skipping document operation");
            errors.push(OperationError::new(op, reason));
        }
    }

    debug!(
        operations = operations.len(),
        failed = errors.len(),
        nodes = working.len(),
        "applied document operations"
    );
    ApplyOutcome {
        document: working,
        errors,
    }
}

/// Applies `operations` and accepts the result only when every operation
/// applied and `validator` accepts the whole document.
pub fn apply_validated(
    document: &Document,
    operations: &[Operation],
    validator: &dyn DocumentValidator,
) -> Result<Document, EditRejection> {
    let outcome = apply(document, operations);
    if !outcome.is_clean() {
        return Err(EditRejection::Operations(outcome.errors));
    }
    validator.validate(&outcome.document)?;
    Ok(outcome.document)
}

fn apply_one(document: &mut Document, op: &Operation) -> Result<(), OperationErrorReason> {
    if op.target_id().is_empty() {
        return Err(OperationErrorReason::EmptyId);
    }
    match op {
        Operation::Update { id, payload } => {
            let node = document.get_mut(id).ok_or(OperationErrorReason::NotFound)?;
            warn_on_id_mismatch(op, payload);
            if let Some(parent) = parent_attribute(payload) {
                node.parent_id = Some(parent);
            }
            node.body = payload.clone();
        }
        Operation::Add { id, payload } => {
            if document.contains(id) {
                return Err(OperationErrorReason::DuplicateId);
            }
            warn_on_id_mismatch(op, payload);
            document.push(Node::new(id.clone(), payload.clone()));
        }
        Operation::Delete { id } => {
            if document.remove_all(id) == 0 {
                return Err(OperationErrorReason::NotFound);
            }
        }
    }
    Ok(())
}

/// The node keeps the operation's id; a body carrying another id will not
/// reload to the same document.
fn warn_on_id_mismatch(op: &Operation, payload: &str) {
    if let Some(body_id) = id_attribute(payload)
        && body_id != op.target_id()
    {
        warn!(
            kind = %op.kind(),
            target_id = op.target_id(),
            %body_id,
            "payload id differs from operation id"
        );
    }
}

/// Renders skipped operations one per line, suitable for feeding back to the model.
pub fn format_operation_errors(errors: &[OperationError]) -> String {
    errors
        .iter()
        .map(|err| format!("- {err}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OperationKind;
    use crate::validate::StructuralValidator;

    fn base() -> Document {
        Document::from_markup(
            r#"<root>
                <mxCell id="0"/>
                <mxCell id="1" parent="0"/>
                <mxCell id="a" value="A" vertex="1" parent="1"/>
                <mxCell id="b" value="B" vertex="1" parent="1"/>
            </root>"#,
        )
        .expect("base document")
    }

    #[test]
    fn failed_operation_does_not_stop_the_batch() {
        let outcome = apply(
            &base(),
            &[
                Operation::update("missing-id", "x"),
                Operation::add("new-id", r#"<mxCell id="new-id" parent="1"/>"#),
            ],
        );
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].kind, OperationKind::Update);
        assert_eq!(outcome.errors[0].target_id, "missing-id");
        assert_eq!(outcome.errors[0].message(), "not found");
        assert!(outcome.document.contains("new-id"));
        assert_eq!(outcome.document.get("new-id").expect("added").parent(), "1");
    }

    #[test]
    fn repeated_update_is_idempotent() {
        let op = Operation::update("a", r#"<mxCell id="a" value="A2" vertex="1" parent="1"/>"#);
        let once = apply(&base(), std::slice::from_ref(&op));
        let twice = apply(&once.document, std::slice::from_ref(&op));
        assert!(once.is_clean());
        assert!(twice.is_clean());
        assert_eq!(once.document, twice.document);
        assert_eq!(twice.document.len(), base().len());
    }

    #[test]
    fn second_delete_of_same_node_reports_not_found() {
        let outcome = apply(&base(), &[Operation::delete("a"), Operation::delete("a")]);
        assert!(!outcome.document.contains("a"));
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].kind, OperationKind::Delete);
        assert_eq!(outcome.errors[0].message(), "not found");
    }

    #[test]
    fn add_with_existing_id_is_rejected() {
        let outcome = apply(&base(), &[Operation::add("a", "<mxCell id=\"a\"/>")]);
        assert_eq!(outcome.errors[0].reason, OperationErrorReason::DuplicateId);
        assert_eq!(outcome.document, base());
    }

    #[test]
    fn empty_target_id_is_rejected() {
        let outcome = apply(&base(), &[Operation::delete("")]);
        assert_eq!(outcome.errors[0].reason, OperationErrorReason::EmptyId);
    }

    #[test]
    fn update_keeps_position_and_rereads_parent() {
        let outcome = apply(
            &base(),
            &[Operation::update("a", r#"<mxCell id="a" vertex="1" parent="b"/>"#)],
        );
        assert!(outcome.is_clean());
        let ids: Vec<_> = outcome.document.ids().collect();
        assert_eq!(ids, vec!["0", "1", "a", "b"]);
        assert_eq!(outcome.document.get("a").expect("a").parent(), "b");
    }

    #[test]
    fn update_with_mismatched_payload_id_stays_under_target_id() {
        let outcome = apply(
            &base(),
            &[Operation::update("a", r#"<mxCell id="z" vertex="1" parent="1"/>"#)],
        );
        assert!(outcome.is_clean());
        assert!(outcome.document.contains("a"));
        assert!(!outcome.document.contains("z"));
        assert_eq!(outcome.document.len(), base().len());
    }

    #[test]
    fn delete_does_not_cascade_to_children() {
        let outcome = apply(&base(), &[Operation::delete("1")]);
        assert!(outcome.is_clean());
        assert!(outcome.document.contains("a"));
        assert!(outcome.document.contains("b"));
    }

    #[test]
    fn input_document_is_left_untouched() {
        let original = base();
        let _ = apply(&original, &[Operation::delete("a")]);
        assert!(original.contains("a"));
    }

    #[test]
    fn apply_validated_separates_operation_and_document_errors() {
        let rejected = apply_validated(&base(), &[Operation::delete("zzz")], &StructuralValidator);
        assert!(matches!(rejected, Err(EditRejection::Operations(errors)) if errors.len() == 1));

        let orphaning = apply_validated(&base(), &[Operation::delete("1")], &StructuralValidator);
        assert!(matches!(
            orphaning,
            Err(EditRejection::Invalid(ValidationError::MissingParent { .. }))
        ));

        let accepted = apply_validated(
            &base(),
            &[Operation::add("c", r#"<mxCell id="c" parent="a"/>"#)],
            &StructuralValidator,
        )
        .expect("valid edit");
        assert_eq!(accepted.len(), base().len() + 1);
    }

    #[test]
    fn formats_errors_for_retry_feedback() {
        let outcome = apply(&base(), &[Operation::delete("x"), Operation::add("a", "")]);
        assert_eq!(
            format_operation_errors(&outcome.errors),
            "- delete \"x\": not found\n- add \"a\": duplicate id"
        );
    }
}
