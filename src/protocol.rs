//! OpenAI-compatible chat-completions wire format.
//!
//! Streaming uses SSE with a `[DONE]` marker. Usage arrives on a trailing
//! chunk when `stream_options.include_usage` is set.

use crate::catalog::ResolvedModel;
use crate::error::Error;
use crate::types::*;
use serde::Deserialize;
use serde_json::Value;
use smallvec::SmallVec;

/// Path appended to the base URL for every request.
pub const CHAT_ENDPOINT: &str = "/chat/completions";

/// Events decoded from a single stream chunk: at most one text and one usage.
pub type ChunkEvents = SmallVec<[StreamEvent; 2]>;

/// Build the body of a streaming request: `[system] + messages`.
pub fn build_stream_body(
    model: &ResolvedModel,
    system_prompt: &str,
    messages: &[Message],
) -> Result<Value, Error> {
    let mut msgs = Vec::with_capacity(messages.len() + 1);
    msgs.push(Message::system(system_prompt));
    msgs.extend_from_slice(messages);

    Ok(serde_json::json!({
        "model": model.id,
        "max_tokens": model.max_tokens,
        "temperature": model.temperature,
        "messages": encode_messages(&msgs)?,
        "stream": true,
        "stream_options": { "include_usage": true },
    }))
}

/// Build the body of a single-prompt, non-streaming request.
pub fn build_complete_body(model_id: &str, prompt: &str) -> Result<Value, Error> {
    Ok(serde_json::json!({
        "model": model_id,
        "messages": encode_messages(&[Message::user(prompt)])?,
        "stream": false,
    }))
}

fn encode_messages(messages: &[Message]) -> Result<Value, Error> {
    serde_json::to_value(messages).map_err(|e| Error::parse(e.to_string()))
}

/// Extract the first choice's text from a non-streaming response.
///
/// A response without choices or content yields an empty string.
pub fn parse_completion(body: &str) -> Result<String, Error> {
    let resp: CompletionResponse =
        serde_json::from_str(body).map_err(|e| Error::parse(e.to_string()))?;

    if let Some(error) = resp.error {
        return Err(Error::api(0, error.message));
    }

    Ok(resp
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .unwrap_or_default())
}

/// Decode one SSE data payload into normalized events, text first.
pub fn parse_chunk(data: &str) -> Result<ChunkEvents, Error> {
    #[cfg(feature = "simd-json")]
    let chunk: StreamChunk = {
        let mut data_bytes = data.as_bytes().to_vec();
        simd_json::from_slice(&mut data_bytes).map_err(|e| Error::parse(e.to_string()))?
    };

    #[cfg(not(feature = "simd-json"))]
    let chunk: StreamChunk =
        serde_json::from_str(data).map_err(|e| Error::parse(e.to_string()))?;

    if let Some(error) = chunk.error {
        return Err(Error::api(0, error.message));
    }

    let mut events = ChunkEvents::new();

    let content = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content)
        .filter(|content| !content.is_empty());
    if let Some(content) = content {
        events.push(StreamEvent::Text { content });
    }

    if let Some(usage) = chunk.usage {
        events.push(StreamEvent::Usage(usage.into()));
    }

    Ok(events)
}

// --- Serde types for the chat-completions API ---

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: Option<CompletionMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    usage: Option<ChunkUsage>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Option<StreamDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkUsage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    cache_write_input_tokens: Option<u32>,
    cache_read_input_tokens: Option<u32>,
    prompt_tokens_details: Option<PromptTokensDetails>,
}

#[derive(Debug, Deserialize)]
struct PromptTokensDetails {
    cached_tokens: Option<u32>,
}

impl From<ChunkUsage> for Usage {
    fn from(u: ChunkUsage) -> Self {
        // Counters may be absent or explicitly null.
        let cached = u
            .prompt_tokens_details
            .and_then(|d| d.cached_tokens)
            .unwrap_or(0);
        Usage {
            input_tokens: u.prompt_tokens.unwrap_or(0),
            output_tokens: u.completion_tokens.unwrap_or(0),
            cache_write_tokens: u.cache_write_input_tokens.unwrap_or(0),
            cache_read_tokens: u.cache_read_input_tokens.unwrap_or(cached),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModelDescriptor;

    fn model() -> ResolvedModel {
        ResolvedModel {
            id: "m1".into(),
            info: ModelDescriptor::new(10, 100, 1.0, 2.0),
            max_tokens: 10,
            temperature: 0.7,
        }
    }

    #[test]
    fn test_parse_text_chunk() {
        let data = r#"{"id":"123","choices":[{"index":0,"delta":{"content":"Hello"},"finish_reason":null}]}"#;
        let events = parse_chunk(data).unwrap();
        assert_eq!(events.as_slice(), &[StreamEvent::text("Hello")]);
    }

    #[test]
    fn test_parse_empty_delta() {
        let data = r#"{"id":"123","choices":[{"index":0,"delta":{"role":"assistant","content":""}}]}"#;
        assert!(parse_chunk(data).unwrap().is_empty());

        let data = r#"{"id":"123","choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#;
        assert!(parse_chunk(data).unwrap().is_empty());
    }

    #[test]
    fn test_parse_usage_chunk() {
        let data =
            r#"{"id":"123","choices":[],"usage":{"prompt_tokens":10,"completion_tokens":20}}"#;
        let events = parse_chunk(data).unwrap();
        assert_eq!(events.as_slice(), &[StreamEvent::Usage(Usage::new(10, 20))]);
    }

    #[test]
    fn test_parse_text_and_usage_chunk() {
        let data = r#"{"choices":[{"delta":{"content":"Hi"}}],"usage":{"prompt_tokens":3,"completion_tokens":4,"cache_write_input_tokens":5,"cache_read_input_tokens":6}}"#;
        let events = parse_chunk(data).unwrap();
        assert_eq!(
            events.as_slice(),
            &[
                StreamEvent::text("Hi"),
                StreamEvent::Usage(Usage {
                    input_tokens: 3,
                    output_tokens: 4,
                    cache_write_tokens: 5,
                    cache_read_tokens: 6,
                }),
            ]
        );
    }

    #[test]
    fn test_cached_tokens_fallback() {
        let data = r#"{"choices":[],"usage":{"prompt_tokens":100,"completion_tokens":1,"prompt_tokens_details":{"cached_tokens":80}}}"#;
        let events = parse_chunk(data).unwrap();
        assert_eq!(events[0].as_usage().unwrap().cache_read_tokens, 80);
    }

    #[test]
    fn test_null_usage_counters() {
        let data = r#"{"choices":[],"usage":{"prompt_tokens":3,"completion_tokens":null,"cache_read_input_tokens":null,"prompt_tokens_details":{"cached_tokens":null}}}"#;
        let events = parse_chunk(data).unwrap();
        assert_eq!(events.as_slice(), &[StreamEvent::Usage(Usage::new(3, 0))]);

        let data = r#"{"choices":[],"usage":{"prompt_tokens":null,"completion_tokens":4,"prompt_tokens_details":null}}"#;
        let events = parse_chunk(data).unwrap();
        assert_eq!(events.as_slice(), &[StreamEvent::Usage(Usage::new(0, 4))]);
    }

    #[test]
    fn test_parse_error_chunk() {
        let data = r#"{"error":{"message":"model overloaded","type":"server_error"}}"#;
        match parse_chunk(data) {
            Err(Error::Api { message, .. }) => assert_eq!(message, "model overloaded"),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_malformed_chunk() {
        assert!(matches!(parse_chunk("{not json"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{"id":"x","model":"m1","choices":[{"index":0,"message":{"role":"assistant","content":"Hello!"},"finish_reason":"stop"}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "Hello!");
    }

    #[test]
    fn test_parse_completion_without_choices() {
        assert_eq!(parse_completion(r#"{"choices":[]}"#).unwrap(), "");
        assert_eq!(parse_completion("{}").unwrap(), "");
        assert_eq!(
            parse_completion(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#)
                .unwrap(),
            ""
        );
    }

    #[test]
    fn test_build_stream_body() {
        let messages = vec![Message::user("Hello"), Message::assistant("Hi!")];
        let body = build_stream_body(&model(), "be brief", &messages).unwrap();

        assert_eq!(body["model"], "m1");
        assert_eq!(body["max_tokens"], 10);
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert!(body["stream"].as_bool().unwrap());
        assert!(body["stream_options"]["include_usage"].as_bool().unwrap());

        let msgs = body["messages"].as_array().unwrap();
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[0], serde_json::json!({"role": "system", "content": "be brief"}));
        assert_eq!(msgs[1]["role"], "user");
        assert_eq!(msgs[2]["role"], "assistant");
    }

    #[test]
    fn test_build_complete_body() {
        let body = build_complete_body("deca-2.5-pro", "Say hi").unwrap();
        assert_eq!(body["model"], "deca-2.5-pro");
        assert_eq!(body["stream"], false);
        assert_eq!(
            body["messages"],
            serde_json::json!([{"role": "user", "content": "Say hi"}])
        );
        assert!(body.get("max_tokens").is_none());
    }
}
