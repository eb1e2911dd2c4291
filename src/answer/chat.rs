//! Chat completions over an OpenAI-compatible endpoint.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::answer::{AnswerGenerator, Prompt};
use crate::config::GenerationConfig;
use crate::error::{RagError, RagResult};
use crate::remote::{self, RemoteEndpoint};

const OPERATION: &str = "chat";

pub struct ChatGenerator {
    client: Client,
    endpoint: RemoteEndpoint,
    url: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl ChatGenerator {
    pub fn new(endpoint: RemoteEndpoint) -> RagResult<Self> {
        if endpoint.model.trim().is_empty() {
            return Err(RagError::config("generation model is not configured"));
        }
        let client = endpoint.client()?;
        let url = endpoint.url("chat/completions");
        Ok(Self {
            client,
            endpoint,
            url,
            temperature: 0.0,
            max_tokens: None,
        })
    }

    pub fn from_config(config: &GenerationConfig) -> RagResult<Self> {
        let mut generator = Self::new(config.remote_endpoint()?)?;
        generator.temperature = config.temperature;
        generator.max_tokens = config.max_tokens;
        Ok(generator)
    }

    fn complete(&self, messages: &[ChatMessage<'_>]) -> RagResult<String> {
        let request = ChatRequest {
            model: self.endpoint.body_model(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages,
        };
        let response = remote::send(
            OPERATION,
            self.endpoint.timeout,
            self.client.post(&self.url).json(&request),
        )?;
        let parsed: ChatResponse = response
            .json()
            .map_err(|e| remote::transport_error(OPERATION, self.endpoint.timeout, e))?;
        first_content(parsed)
    }
}

impl AnswerGenerator for ChatGenerator {
    fn generate(&self, prompt: &Prompt) -> RagResult<String> {
        self.complete(&[
            ChatMessage {
                role: "system",
                content: &prompt.system,
            },
            ChatMessage {
                role: "user",
                content: &prompt.user,
            },
        ])
    }

    fn ping(&self) -> RagResult<String> {
        self.complete(&[ChatMessage {
            role: "user",
            content: "Reply with exactly: OK",
        }])
    }

    fn model(&self) -> &str {
        &self.endpoint.model
    }
}

fn first_content(parsed: ChatResponse) -> RagResult<String> {
    parsed
        .choices
        .into_iter()
        .find_map(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| RagError::RemoteCall {
            operation: OPERATION,
            status: None,
            message: "model returned an empty reply".to_string(),
        })
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    messages: &'a [ChatMessage<'a>],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}
