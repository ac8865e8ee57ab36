//! Streaming example against the Agentica endpoint.
//!
//! Run with: AGENTICA_API_KEY=... RUST_LOG=agentica_client=debug cargo run --example stream

use agentica_client::{CompletionAdapter, Message, MessageMetadata, StreamEvent, Usage};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let adapter = CompletionAdapter::from_env()?;
    let model = adapter.model()?;
    println!("Streaming from {} (max {} tokens)...\n", model.id, model.max_tokens);

    let messages = vec![Message::user("Write a haiku about Rust programming.")];

    // Ctrl-C stops the stream without waiting for the rest of the reply.
    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let metadata = MessageMetadata::new()
        .task_id("demo")
        .cancellation(cancel);
    let mut stream = adapter
        .create_message("You are a helpful assistant. Be concise.", &messages, metadata)
        .await?;

    let mut usage = Usage::default();
    while let Some(event) = stream.next().await {
        match event? {
            StreamEvent::Text { content } => print!("{content}"),
            StreamEvent::Usage(u) => usage = u,
        }
    }

    println!("\n\n--- Stats ---");
    println!("Input tokens: {}", usage.input_tokens);
    println!("Output tokens: {}", usage.output_tokens);
    println!("Cost: ${:.6}", adapter.calculate_cost(&usage));

    let summary = adapter.complete_prompt("Summarize Rust in five words.").await?;
    println!("One-shot: {summary}");

    Ok(())
}
