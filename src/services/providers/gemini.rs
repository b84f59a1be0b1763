/// Generative Language API (Gemini) client
///
/// API Flow:
/// 1. Once-off generation: POST /v1beta/models/{model}:generateContent
/// 2. Streaming chat: POST /v1beta/models/{model}:streamGenerateContent?alt=sse,
///    which answers with SSE `data:` lines, each holding a partial response
use async_stream::stream;
use futures::{Stream, StreamExt};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{
    error::{AppError, AppResult},
    models::ChatMessage,
    services::providers::{
        ChatRequest, FragmentStream, GenerationOptions, LanguageModel, ResponseFormat,
    },
};

const CONNECT_TIMEOUT_SECS: u64 = 10;
const JSON_MIME_TYPE: &str = "application/json";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's parts
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    fn finish_reason(&self) -> Option<&str> {
        self.candidates.first()?.finish_reason.as_deref()
    }

    fn into_api_error(self) -> Option<AppError> {
        self.error.map(|e| {
            AppError::ExternalApi(format!(
                "Gemini API error {}: {}",
                e.code.map(|c| c.to_string()).unwrap_or_default(),
                e.message
            ))
        })
    }
}

fn build_request<'a>(
    messages: &'a [ChatMessage],
    system_instruction: Option<&'a str>,
    options: Option<&GenerationOptions>,
) -> GenerateContentRequest<'a> {
    GenerateContentRequest {
        contents: messages
            .iter()
            .map(|m| Content {
                role: m.role.as_str(),
                parts: vec![Part { text: &m.text }],
            })
            .collect(),
        system_instruction: system_instruction.map(|text| SystemInstruction {
            parts: vec![Part { text }],
        }),
        generation_config: options.map(|o| GenerationConfig {
            temperature: o.temperature,
            response_mime_type: match o.response_format {
                ResponseFormat::Json => Some(JSON_MIME_TYPE),
                ResponseFormat::Text => None,
            },
        }),
    }
}

/// Extracts the text fragment carried by one SSE line, if any
///
/// Non-data lines, keep-alives and text-less events yield `None`.
fn parse_sse_line(line: &str) -> AppResult<Option<String>> {
    let Some(payload) = line.trim().strip_prefix("data:") else {
        return Ok(None);
    };
    let payload = payload.trim();
    if payload.is_empty() || payload == "[DONE]" {
        return Ok(None);
    }

    let event: GenerateContentResponse = serde_json::from_str(payload).map_err(|e| {
        AppError::ExternalApi(format!("Malformed Gemini stream event: {}", e))
    })?;

    let text = event.text();
    match event.into_api_error() {
        Some(err) => Err(err),
        None => Ok(text),
    }
}

/// Removes the first complete line from `buffer` and decodes it
///
/// Bytes after the last newline stay buffered, so a character split across
/// chunks is decoded only once both halves have arrived.
fn take_line(buffer: &mut Vec<u8>) -> Option<AppResult<String>> {
    let line_end = buffer.iter().position(|b| *b == b'\n')?;
    let line: Vec<u8> = buffer.drain(..=line_end).collect();
    Some(decode_line(line))
}

fn decode_line(line: Vec<u8>) -> AppResult<String> {
    String::from_utf8(line)
        .map_err(|e| AppError::ExternalApi(format!("Gemini stream sent invalid UTF-8: {}", e)))
}

/// Turns a raw SSE byte stream into text fragments
///
/// Each read must complete within `idle_timeout`; a stalled stream ends
/// with an `ExternalApi` error.
fn sse_fragments<S, B, E>(bytes: S, idle_timeout: Duration) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<AppError> + Send + 'static,
{
    let fragments = stream! {
        let mut bytes = Box::pin(bytes);
        let mut buffer: Vec<u8> = Vec::new();

        loop {
            let chunk = match tokio::time::timeout(idle_timeout, bytes.next()).await {
                Ok(Some(Ok(chunk))) => chunk,
                Ok(Some(Err(e))) => {
                    let error: AppError = e.into();
                    yield Err(error);
                    return;
                }
                Ok(None) => break,
                Err(_) => {
                    yield Err(AppError::ExternalApi(format!(
                        "Gemini stream stalled for more than {}s",
                        idle_timeout.as_secs()
                    )));
                    return;
                }
            };
            buffer.extend_from_slice(chunk.as_ref());

            while let Some(line) = take_line(&mut buffer) {
                match line.and_then(|line| parse_sse_line(&line)) {
                    Ok(Some(text)) => yield Ok(text),
                    Ok(None) => {}
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }

        match decode_line(buffer).and_then(|rest| parse_sse_line(&rest)) {
            Ok(Some(text)) => yield Ok(text),
            Ok(None) => {}
            Err(e) => yield Err(e),
        }
    };

    Box::pin(fragments)
}

#[derive(Clone)]
pub struct GeminiClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
    request_timeout: Duration,
}

impl GeminiClient {
    /// Creates a client for one model; constructed once and shared
    pub fn new(
        api_key: String,
        api_url: String,
        model: String,
        request_timeout: Duration,
    ) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            model,
            request_timeout,
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.api_url, self.model, method)
    }

    async fn error_from_status(response: reqwest::Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        AppError::ExternalApi(format!("Gemini API returned status {}: {}", status, body))
    }
}

#[async_trait::async_trait]
impl LanguageModel for GeminiClient {
    async fn generate_once(&self, prompt: &str, options: &GenerationOptions) -> AppResult<String> {
        let messages = [ChatMessage::user(prompt)];
        let body = build_request(&messages, None, Some(options));

        let response = self
            .http_client
            .post(self.endpoint("generateContent"))
            .header("x-goog-api-key", &self.api_key)
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_status(response).await);
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let finish_reason = parsed.finish_reason().map(str::to_string);

        if let Some(text) = parsed.text() {
            tracing::debug!(
                model = %self.model,
                response_len = text.len(),
                "Gemini generation completed"
            );
            return Ok(text);
        }

        Err(parsed.into_api_error().unwrap_or_else(|| {
            AppError::ExternalApi(format!(
                "Gemini response contained no text (finish reason: {})",
                finish_reason.as_deref().unwrap_or("unknown")
            ))
        }))
    }

    async fn generate_stream(&self, request: ChatRequest) -> AppResult<FragmentStream> {
        let body = build_request(
            &request.messages,
            request.system_instruction.as_deref(),
            None,
        );

        let pending = self
            .http_client
            .post(self.endpoint("streamGenerateContent"))
            .query(&[("alt", "sse")])
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send();
        let response = tokio::time::timeout(self.request_timeout, pending)
            .await
            .map_err(|_| {
                AppError::ExternalApi("Timed out waiting for Gemini stream to open".to_string())
            })??;

        if !response.status().is_success() {
            return Err(Self::error_from_status(response).await);
        }

        tracing::debug!(
            model = %self.model,
            turns = request.messages.len(),
            "Gemini stream opened"
        );

        Ok(sse_fragments(response.bytes_stream(), self.request_timeout))
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
