//! OpenAI-compatible response bodies

use serde::Deserialize;
use serde_json::Value;

/// Text recorded when a single-shot response carries no message content.
pub const MISSING_CONTENT_TEXT: &str = "Response received but no message content was found.";

/// One streamed frame
#[derive(Debug, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<Delta>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

impl ChatChunk {
    /// `choices[0].delta.content`, if present
    pub fn delta_content(&self) -> Option<&str> {
        self.choices
            .first()?
            .delta
            .as_ref()?
            .content
            .as_deref()
    }
}

/// Body of `GET /v1/models`
#[derive(Debug, Deserialize)]
pub struct ModelList {
    /// Listed models
    pub data: Vec<ModelEntry>,
}

/// One listed model
#[derive(Debug, Deserialize)]
pub struct ModelEntry {
    /// Model identifier
    pub id: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Message for a non-2xx response: `error.message` from a JSON body, else the raw body
pub fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => body.trim().to_string(),
    }
}

/// Outcome of reading a single-shot completion body
#[derive(Debug, PartialEq, Eq)]
pub enum Completion {
    /// `choices[0].message.content` was a string
    Content(String),
    /// Anything else, with the diagnostic text to record instead
    Missing(String),
}

/// Extract `choices[0].message.content` from a single-shot body
pub fn parse_completion(body: &str) -> Completion {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return Completion::Missing(format!("{MISSING_CONTENT_TEXT}\nRaw response: {}", body.trim()));
    };

    match value.pointer("/choices/0/message/content").and_then(Value::as_str) {
        Some(content) => Completion::Content(content.to_string()),
        None => {
            let raw = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
            Completion::Missing(format!("{MISSING_CONTENT_TEXT}\nRaw response: {raw}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_content() {
        let chunk: ChatChunk =
            serde_json::from_str(r#"{"id":"x","choices":[{"index":0,"delta":{"content":"Hi"}}]}"#)
                .unwrap();
        assert_eq!(chunk.delta_content(), Some("Hi"));

        let chunk: ChatChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":null},"finish_reason":"stop"}]}"#)
                .unwrap();
        assert_eq!(chunk.delta_content(), None);

        let chunk: ChatChunk = serde_json::from_str(r#"{"object":"ping"}"#).unwrap();
        assert_eq!(chunk.delta_content(), None);
    }

    #[test]
    fn test_error_message_prefers_structured_error() {
        assert_eq!(
            error_message(r#"{"error":{"message":"Invalid API key","type":"auth"}}"#),
            "Invalid API key"
        );
        assert_eq!(error_message("upstream exploded\n"), "upstream exploded");
        assert_eq!(error_message(r#"{"detail":"nope"}"#), r#"{"detail":"nope"}"#);
    }

    #[test]
    fn test_parse_completion() {
        assert_eq!(
            parse_completion(r#"{"choices":[{"message":{"role":"assistant","content":"Hello!"}}]}"#),
            Completion::Content("Hello!".into())
        );
        assert_eq!(
            parse_completion(r#"{"choices":[{"message":{"content":""}}]}"#),
            Completion::Content(String::new())
        );

        let Completion::Missing(text) = parse_completion(r#"{"choices":[]}"#) else {
            panic!("expected missing content");
        };
        assert!(text.starts_with(MISSING_CONTENT_TEXT));
        assert!(text.contains("\"choices\": []"));

        let Completion::Missing(text) = parse_completion("<html>ok</html>") else {
            panic!("expected missing content");
        };
        assert!(text.ends_with("Raw response: <html>ok</html>"));
    }
}
