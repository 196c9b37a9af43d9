//! System prompt describing the inline tool-call format to the model.

use diagram_core::Document;

/// Builds the system prompt for a turn over `document`.
pub fn system_prompt(document: &Document, extra: Option<&str>) -> String {
    let mut prompt = String::from(
        "You are a diagram assistant. You edit draw.io diagrams made of mxCell elements.

When the diagram should change, first write a short explanation, then write exactly one \
tool call as a single JSON object on its own, with no code fence:

  {\"tool\":\"render\",\"payload\":\"<mxGraphModel>...</mxGraphModel>\"}
    Replaces the whole diagram. Use it for new diagrams or large rewrites.

  {\"tool\":\"edit\",\"operations\":[{\"type\":\"update\",\"id\":\"2\",\"payload\":\"<mxCell id=\\\"2\\\" .../>\"}]}
    Changes individual cells. Operation types: update (replace a cell), add (new cell, the \
id must be unused), delete (remove a cell; children are not removed).

Escape double quotes inside payloads as \\\". Every cell needs a unique id and a parent \
attribute naming an existing cell. Write nothing after the tool call.",
    );

    prompt.push_str("\n\nCurrent diagram:\n");
    if document.is_empty() {
        prompt.push_str("(empty)");
    } else {
        prompt.push_str(&document.to_markup());
    }

    if let Some(extra) = extra.map(str::trim).filter(|s| !s.is_empty()) {
        prompt.push_str("\n\n");
        prompt.push_str(extra);
    }
    prompt
}
