//! Streaming completion adapter for OpenAI-compatible chat endpoints.
//!
//! # Example
//! ```no_run
//! use agentica_client::{CompletionAdapter, Message, MessageMetadata, StreamEvent};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), agentica_client::Error> {
//!     let adapter = CompletionAdapter::from_env()?;
//!     let messages = vec![Message::user("Hello!")];
//!
//!     let mut stream = adapter
//!         .create_message("You are a helpful assistant.", &messages, MessageMetadata::new())
//!         .await?;
//!
//!     while let Some(event) = stream.next().await {
//!         match event? {
//!             StreamEvent::Text { content } => print!("{content}"),
//!             StreamEvent::Usage(usage) => {
//!                 println!("\nTokens: {} in, {} out", usage.input_tokens, usage.output_tokens);
//!                 println!("Cost: ${:.6}", adapter.calculate_cost(&usage));
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod catalog;
pub mod config;
pub mod cost;
pub mod error;
pub mod protocol;
pub mod sse;
pub mod stream;
pub mod transport;
pub mod types;

pub use adapter::{AdapterState, CompletionAdapter, ConversationStream};
pub use catalog::{ModelCatalog, ModelDescriptor, ResolvedModel};
pub use config::{AdapterConfig, AdapterConfigBuilder};
pub use cost::Cost;
pub use error::Error;
pub use stream::EventStream;
pub use transport::{ByteStream, HttpTransport, Transport};
pub use types::*;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;
