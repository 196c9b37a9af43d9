//! Replays a canned delta sequence through the boundary detector and prints
//! the resulting UI events. Needs no network access.

use diagram_ai_harness::{DeltaEvent, transform};
use diagram_core::{Document, StructuralValidator};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let deltas = [
        DeltaEvent::Reasoning("The user wants a second box.".into()),
        DeltaEvent::Text("Adding a box next to the first one.\n{\"to".into()),
        DeltaEvent::Text("ol\":\"edit\",\"operations\":[{\"type\":\"add\",\"id\":\"b\",".into()),
        DeltaEvent::Text(
            r#""payload":"<mxCell id=\"b\" vertex=\"1\" parent=\"1\"/>"}]}"#.into(),
        ),
    ];
    let (events, outcome) = transform(deltas);
    for event in &events {
        print!("{}", event.to_json_line()?);
    }

    let document = Document::from_markup(
        r#"<root><mxCell id="0"/><mxCell id="1" parent="0"/><mxCell id="a" vertex="1" parent="1"/></root>"#,
    )?;
    if let Some(call) = outcome.tool_call {
        let next = call.apply(&document, &StructuralValidator)?;
        eprintln!("{}", next.to_markup());
    }
    Ok(())
}
