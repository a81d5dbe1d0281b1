//! LLM 모듈 - 채팅 완성 API 호출
//!
//! 답변 단계에서 프롬프트를 한 번 보내고 텍스트만 돌려받습니다.
//! source: https://platform.openai.com/docs/api-reference/chat/create

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::RagConfig;
use crate::embedding::OpenAiError;

// ============================================================================
// Messages
// ============================================================================

/// 메시지 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// 채팅 메시지
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ============================================================================
// LlmProvider Trait
// ============================================================================

/// 언어 모델 프로바이더 트레이트
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// 대화 전체를 보내고 어시스턴트 응답 텍스트 반환
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    /// 단일 사용자 프롬프트
    async fn invoke(&self, prompt: &str) -> Result<String> {
        self.complete(&[ChatMessage::user(prompt)]).await
    }

    /// 모델 이름
    fn model(&self) -> &str;
}

// ============================================================================
// OpenAI Chat
// ============================================================================

/// OpenAI 채팅 완성 클라이언트
#[derive(Debug)]
pub struct OpenAiChat {
    api_key: String,
    endpoint: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiChat {
    pub fn new(api_key: String, api_base: &str, model: &str) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing OpenAI API key");
        anyhow::ensure!(!model.trim().is_empty(), "missing chat model name");

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            model: model.to_string(),
            client,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
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
    #[serde(default)]
    content: Option<String>,
}

/// 응답 본문에서 첫 번째 선택지의 텍스트 추출
fn parse_chat_response(body: &str) -> Result<String> {
    let parsed: ChatResponse =
        serde_json::from_str(body).context("Failed to parse chat completion response")?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Chat completion returned no choices"))?;

    Ok(choice.message.content.unwrap_or_default())
}

#[async_trait]
impl LlmProvider for OpenAiChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages,
        };

        tracing::debug!("Chat completion: model={}, messages={}", self.model, messages.len());

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.trim())
            .json(&request)
            .send()
            .await
            .context("Failed to call OpenAI chat completions")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<OpenAiError>(&body) {
                anyhow::bail!("OpenAI chat error ({}): {}", status, error.error.message);
            }
            anyhow::bail!("OpenAI chat error ({}): {}", status, body);
        }

        parse_chat_response(&body)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Factory Function
// ============================================================================

/// 설정으로 LLM 프로바이더 생성
pub fn create_llm(config: &RagConfig) -> crate::Result<Arc<dyn LlmProvider>> {
    let model = config.chat_model()?;
    let api_key = config.require_api_key()?.to_string();
    let llm = OpenAiChat::new(api_key, &config.api_base, model)?;
    tracing::info!("Using chat model: {}", model);
    Ok(Arc::new(llm))
}

// ============================================================================
// Tests
// ============================================================================
