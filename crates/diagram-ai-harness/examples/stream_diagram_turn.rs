use std::io::Write as _;
use std::sync::Arc;

use diagram_ai_harness::prelude::*;
use diagram_ai_harness::vendors::openai::{
    OpenAiProvider, OpenAiRequestOptions, OpenAiTurnBuilderExt,
};
use diagram_core::{Document, StructuralValidator, observability::init_observability};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_observability();

    let request = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Draw a client, an API server and a database, connected left to right.".into());
    let model: ModelRef = std::env::var("DIAGRAM_MODEL")
        .unwrap_or_else(|_| "openai/gpt-4o-mini".into())
        .parse()?;

    let harness = Harness::builder()
        .register_provider(Arc::new(OpenAiProvider::from_env()?))
        .build()?;

    let document = Document::from_markup(r#"<root><mxCell id="0"/><mxCell id="1" parent="0"/></root>"#)?;
    let mut turn = harness
        .session(SessionConfig::named("example"))
        .turn(model)
        .system_prompt(system_prompt(&document, None))
        .user_text(request)
        .timeout(std::time::Duration::from_secs(120))
        .openai_options(OpenAiRequestOptions::default().temperature(0.2))
        .start_stream()
        .await?;

    let mut stdout = std::io::stdout().lock();
    while let Some(event) = turn.next_event().await {
        stdout.write_all(event.to_json_line()?.as_bytes())?;
    }
    drop(stdout);

    let outcome = turn.finish().await?;
    match outcome.tool_call {
        Some(call) => {
            let next = call.apply(&document, &StructuralValidator)?;
            eprintln!("{} call applied; diagram now has {} cells", call.kind(), next.len());
            eprintln!("{}", next.to_markup());
        }
        None => eprintln!("no diagram change requested"),
    }
    Ok(())
}
