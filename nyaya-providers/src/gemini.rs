//! Google Generative Language API client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::base::{
    Attachment, CounselEvent, CounselEventStream, CounselProvider, CounselReply, CounselRequest,
    HistoryTurn, ProviderError, ProviderResult, TurnRole,
};
use crate::reply::decode_reply;
use nyaya_core::config::ProviderConfig;

/// Models selectable in the product
pub const AVAILABLE_MODELS: &[&str] = &[
    "gemini-2.5-flash",
    "gemini-2.5-pro",
    "gemini-2.5-flash-lite",
    "gemini-2.0-flash",
    "gemini-2.0-flash-lite",
    "gemini-flash-latest",
    "gemini-pro-latest",
];

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Turns of context sent with each query
const MAX_HISTORY_TURNS: usize = 20;

/// Generation parameters sent with every request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    pub temperature: f64,
    pub top_k: u32,
    pub top_p: f64,
    pub max_output_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.09,
            top_k: 30,
            top_p: 0.7,
            max_output_tokens: 2048,
        }
    }
}

/// Gemini API request format
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    fn inline(attachment: &Attachment) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: attachment.mime_type.clone(),
                data: attachment.data.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

/// Gemini API response format; streaming chunks share the same shape
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

/// Gemini provider client
pub struct GeminiClient {
    client: Client,
    api_base: String,
    api_key: String,
    default_model: String,
    system_prompt: Option<String>,
    generation: GenerationSettings,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(
        api_key: String,
        api_base: Option<String>,
        default_model: String,
        system_prompt: Option<String>,
        generation: GenerationSettings,
    ) -> Self {
        let api_base = api_base
            .filter(|base| !base.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Self {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            default_model,
            system_prompt,
            generation,
        }
    }

    /// Create a client from configuration
    pub fn from_config(config: &ProviderConfig) -> ProviderResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderError::ConfigError(
                "provider.api_key is not set".to_string(),
            ));
        }

        let generation = GenerationSettings {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            ..GenerationSettings::default()
        };
        let system_prompt = if config.system_prompt.trim().is_empty() {
            None
        } else {
            Some(config.system_prompt.clone())
        };

        Ok(Self::new(
            config.api_key.clone(),
            config.api_base.clone(),
            config.model.clone(),
            system_prompt,
            generation,
        ))
    }

    /// Resolve the model to use, falling back when the request is unknown
    pub fn resolve_model(&self, requested: Option<&str>) -> String {
        let model = requested.unwrap_or(&self.default_model);
        if AVAILABLE_MODELS.contains(&model) {
            return model.to_string();
        }
        warn!("Unknown model '{}', falling back to {}", model, DEFAULT_MODEL);
        DEFAULT_MODEL.to_string()
    }

    fn build_request(&self, request: &CounselRequest) -> GenerateRequest {
        let mut contents = Vec::new();

        // Cap the context window, then drop leading model turns so the
        // conversation sent to the API starts with a user turn.
        let start = request.turns.len().saturating_sub(MAX_HISTORY_TURNS);
        let context: Vec<&HistoryTurn> = request.turns[start..]
            .iter()
            .skip_while(|turn| turn.role == TurnRole::Model)
            .collect();
        for turn in context {
            contents.push(Content {
                role: Some(turn.role.as_str().to_string()),
                parts: vec![Part::text(&turn.content)],
            });
        }

        let mut parts = vec![Part::text(&request.query)];
        if let Some(attachment) = &request.attachment {
            parts.push(Part::inline(attachment));
        }
        contents.push(Content {
            role: Some("user".to_string()),
            parts,
        });

        GenerateRequest {
            system_instruction: self.system_prompt.as_ref().map(|text| Content {
                role: None,
                parts: vec![Part::text(text)],
            }),
            contents,
            generation_config: self.generation.clone(),
        }
    }

    fn extract_text(response: &GenerateResponse) -> ProviderResult<String> {
        let candidate = response
            .candidates
            .first()
            .ok_or_else(|| ProviderError::InvalidResponse("No candidates in response".to_string()))?;
        let content = candidate
            .content
            .as_ref()
            .ok_or_else(|| ProviderError::InvalidResponse("Candidate has no content".to_string()))?;

        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        if text.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "Candidate has no text".to_string(),
            ));
        }
        Ok(text)
    }

    /// Text carried by a streaming chunk, if any
    fn chunk_text(chunk: &GenerateResponse) -> Option<String> {
        let content = chunk.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    fn parse_sse_events(buffer: &mut String) -> Vec<String> {
        let mut events = Vec::new();
        while let Some(pos) = buffer.find("\n\n") {
            let raw = buffer[..pos].to_string();
            buffer.drain(..pos + 2);

            let mut data_lines = Vec::new();
            for line in raw.lines() {
                if let Some(rest) = line.strip_prefix("data:") {
                    data_lines.push(rest.trim().to_string());
                }
            }

            if !data_lines.is_empty() {
                events.push(data_lines.join("\n"));
            }
        }
        events
    }
}

#[async_trait]
impl CounselProvider for GeminiClient {
    async fn counsel(&self, request: CounselRequest) -> ProviderResult<CounselReply> {
        let model = self.resolve_model(request.model.as_deref());
        let body = self.build_request(&request);

        debug!("Sending counsel request with model {}", model);

        let url = format!("{}/v1beta/models/{}:generateContent", self.api_base, model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::ApiError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let response_data: GenerateResponse = response.json().await?;
        let text = Self::extract_text(&response_data)?;
        Ok(decode_reply(&text))
    }

    async fn counsel_stream(&self, request: CounselRequest) -> ProviderResult<CounselEventStream> {
        let model = self.resolve_model(request.model.as_deref());
        let body = self.build_request(&request);

        debug!("Sending streaming counsel request with model {}", model);

        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.api_base, model
        );
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::ApiError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut response = response;
            let mut buffer = String::new();
            let mut full_text = String::new();

            loop {
                let chunk = match response.chunk().await {
                    Ok(Some(bytes)) => bytes,
                    Ok(None) => break,
                    Err(err) => {
                        let _ = tx.send(Err(ProviderError::HttpError(err)));
                        return;
                    }
                };

                let text = String::from_utf8_lossy(&chunk);
                buffer.push_str(&text);

                for payload in Self::parse_sse_events(&mut buffer) {
                    let parsed = match serde_json::from_str::<GenerateResponse>(&payload) {
                        Ok(parsed) => parsed,
                        Err(err) => {
                            let _ = tx.send(Err(ProviderError::JsonError(err)));
                            return;
                        }
                    };

                    if let Some(delta) = Self::chunk_text(&parsed) {
                        full_text.push_str(&delta);
                        let _ = tx.send(Ok(CounselEvent::Delta(delta)));
                    }
                }
            }

            if full_text.is_empty() {
                let _ = tx.send(Err(ProviderError::InvalidResponse(
                    "Stream ended without content".to_string(),
                )));
                return;
            }

            let _ = tx.send(Ok(CounselEvent::Completed(decode_reply(&full_text))));
        });

        Ok(Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })))
    }

    fn default_model(&self) -> String {
        self.default_model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;

    fn client_for(base: String) -> GeminiClient {
        GeminiClient::new(
            "test-key".to_string(),
            Some(base),
            DEFAULT_MODEL.to_string(),
            Some("answer briefly".to_string()),
            GenerationSettings::default(),
        )
    }

    #[test]
    fn test_resolve_model() {
        let client = client_for("http://localhost".to_string());

        assert_eq!(client.resolve_model(None), "gemini-2.5-flash");
        assert_eq!(client.resolve_model(Some("gemini-2.5-pro")), "gemini-2.5-pro");
        assert_eq!(client.resolve_model(Some("gpt-4o")), DEFAULT_MODEL);
    }

    #[test]
    fn test_build_request_serializes_camel_case() {
        let client = client_for("http://localhost".to_string());
        let request = CounselRequest::new("is bail possible?")
            .with_turns(vec![
                HistoryTurn::model("Namaste!"),
                HistoryTurn::user("hello"),
                HistoryTurn::model("how can I help?"),
            ])
            .with_attachment(Attachment {
                mime_type: "image/png".to_string(),
                data: "aGk=".to_string(),
            });

        let body = client.build_request(&request);
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["generationConfig"]["maxOutputTokens"], 2048);
        assert_eq!(value["generationConfig"]["topK"], 30);
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "answer briefly");

        // Leading model turn dropped, so context starts with the user
        let contents = value["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");

        let last_parts = contents[2]["parts"].as_array().unwrap();
        assert_eq!(last_parts[0]["text"], "is bail possible?");
        assert_eq!(last_parts[1]["inlineData"]["mimeType"], "image/png");
    }

    #[test]
    fn test_build_request_caps_history() {
        let client = client_for("http://localhost".to_string());
        let turns: Vec<HistoryTurn> = (0..30).map(|i| HistoryTurn::user(format!("q{}", i))).collect();
        let request = CounselRequest::new("latest").with_turns(turns);

        let body = client.build_request(&request);
        // 20 history turns plus the query itself
        assert_eq!(body.contents.len(), 21);
    }

    #[test]
    fn test_parse_sse_events() {
        let mut buffer =
            "data: {\"a\":1}\n\ndata: {\"b\":2}\n\ntrailing".to_string();
        let events = GeminiClient::parse_sse_events(&mut buffer);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], "{\"a\":1}");
        assert_eq!(events[1], "{\"b\":2}");
        assert_eq!(buffer, "trailing");
    }

    #[tokio::test]
    async fn test_counsel_decodes_structured_reply() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-2.5-flash:generateContent")
            .match_header("x-goog-api-key", "test-key")
            .match_body(mockito::Matcher::PartialJson(json!({
                "generationConfig": { "temperature": 0.09, "topP": 0.7 }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "candidates": [{
                        "content": {
                            "role": "model",
                            "parts": [{
                                "text": "File an FIR first.\n\n###REFERENCES###\nSection 154 CrPC: Information in cognizable cases\n###ENDREFERENCES###"
                            }]
                        }
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = client_for(server.url());
        let reply = client
            .counsel(CounselRequest::new("how do I report a theft?"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(reply.content, "File an FIR first.");
        assert_eq!(reply.legal_references.len(), 1);
        assert_eq!(reply.legal_references[0].section, "Section 154 CrPC");
    }

    #[tokio::test]
    async fn test_counsel_surfaces_api_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1beta/models/gemini-2.5-flash:generateContent")
            .with_status(429)
            .with_body("quota exceeded")
            .create_async()
            .await;

        let client = client_for(server.url());
        let err = client.counsel(CounselRequest::new("q")).await.unwrap_err();

        match err {
            ProviderError::ApiError(message) => {
                assert!(message.contains("429"));
                assert!(message.contains("quota exceeded"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_counsel_rejects_empty_candidates() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1beta/models/gemini-2.5-flash:generateContent")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "candidates": [] }).to_string())
            .create_async()
            .await;

        let client = client_for(server.url());
        let err = client.counsel(CounselRequest::new("q")).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_counsel_stream_emits_deltas_then_completed() {
        let mut server = mockito::Server::new_async().await;
        let body = concat!(
            "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"An FIR\"}]}}]}\n\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\" is the first step.\"}]}}]}\n\n",
        );
        server
            .mock("POST", "/v1beta/models/gemini-2.5-flash:streamGenerateContent")
            .match_query(mockito::Matcher::UrlEncoded("alt".into(), "sse".into()))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let client = client_for(server.url());
        let mut stream = client
            .counsel_stream(CounselRequest::new("what is an FIR?"))
            .await
            .unwrap();

        let mut deltas = Vec::new();
        let mut completed = None;
        while let Some(event) = stream.next().await {
            match event.unwrap() {
                CounselEvent::Delta(text) => deltas.push(text),
                CounselEvent::Completed(reply) => completed = Some(reply),
            }
        }

        assert_eq!(deltas, vec!["An FIR", " is the first step."]);
        let reply = completed.expect("stream should complete");
        assert_eq!(reply.content, "An FIR is the first step.");
    }
}
