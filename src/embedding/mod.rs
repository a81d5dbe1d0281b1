//! 임베딩 모듈 - 텍스트 벡터화
//!
//! 청크와 질문을 같은 함수로 벡터화해야 검색이 의미를 가집니다.
//! - `OpenAiEmbedding`: OpenAI embeddings API
//! - `HashEmbedding`: 네트워크 없이 동작하는 결정적 해싱 임베딩
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = OpenAiEmbedding::new(api_key, DEFAULT_API_BASE, "text-embedding-3-small")?;
//! let embedding = embedder.embed("Hello, world!").await?;
//! ```

mod hash;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{EmbedderKind, RagConfig};

pub use hash::{HashEmbedding, DEFAULT_HASH_DIMENSION};

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 단일 텍스트 임베딩
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// 배치 임베딩 (기본 구현: 순차 호출)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// 임베딩 차원 수
    fn dimension(&self) -> usize;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// OpenAI Embedding
// ============================================================================

/// 요청당 최대 입력 수
const MAX_BATCH_INPUTS: usize = 96;

/// 모델별 기본 차원
/// source: https://platform.openai.com/docs/guides/embeddings
pub fn dimension_for_model(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}

/// OpenAI 임베딩 구현체
///
/// 재시도 없이 요청당 한 번만 호출합니다. 실패는 호출자에게 그대로 전달됩니다.
#[derive(Debug)]
pub struct OpenAiEmbedding {
    api_key: String,
    endpoint: String,
    model: String,
    dimension: usize,
    client: reqwest::Client,
}

impl OpenAiEmbedding {
    /// 새 인스턴스 생성
    ///
    /// # Arguments
    /// * `api_key` - OpenAI API 키
    /// * `api_base` - API 베이스 URL (예: `https://api.openai.com/v1`)
    /// * `model` - 임베딩 모델 이름
    pub fn new(api_key: String, api_base: &str, model: &str) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing OpenAI API key");
        anyhow::ensure!(!model.trim().is_empty(), "missing embedding model name");

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            endpoint: format!("{}/embeddings", api_base.trim_end_matches('/')),
            model: model.to_string(),
            dimension: dimension_for_model(model),
            client,
        })
    }

    /// 한 번의 API 호출로 여러 입력 임베딩
    async fn request(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.model,
            input: inputs,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.trim())
            .json(&request)
            .send()
            .await
            .context("Failed to send embedding request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<OpenAiError>(&body) {
                anyhow::bail!("OpenAI embeddings error ({}): {}", status, error.error.message);
            }
            anyhow::bail!("OpenAI embeddings error ({}): {}", status, body);
        }

        let mut parsed: EmbedResponse =
            serde_json::from_str(&body).context("Failed to parse embedding response")?;
        parsed.data.sort_by_key(|entry| entry.index);

        anyhow::ensure!(
            parsed.data.len() == inputs.len(),
            "OpenAI returned {} embeddings for {} inputs",
            parsed.data.len(),
            inputs.len()
        );

        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }
}

/// OpenAI API 요청 본문
/// source: https://platform.openai.com/docs/api-reference/embeddings/create
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Debug, Deserialize)]
struct EmbedData {
    index: usize,
    embedding: Vec<f32>,
}

/// OpenAI 에러 응답
#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiError {
    pub(crate) error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiErrorDetail {
    pub(crate) message: String,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        // 빈 텍스트는 API가 거부하므로 영벡터
        if text.trim().is_empty() {
            return Ok(vec![0.0; self.dimension]);
        }

        self.request(&[text])
            .await?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("OpenAI returned no embedding"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        let total_batches = texts.len().div_ceil(MAX_BATCH_INPUTS);

        for (i, batch) in texts.chunks(MAX_BATCH_INPUTS).enumerate() {
            tracing::debug!("Embedding batch {}/{}", i + 1, total_batches);
            let inputs: Vec<&str> = batch.iter().map(String::as_str).collect();
            results.extend(self.request(&inputs).await?);
        }

        Ok(results)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Factory Function
// ============================================================================

/// 설정에 맞는 임베딩 프로바이더 생성
pub fn create_embedder(config: &RagConfig) -> crate::Result<Arc<dyn EmbeddingProvider>> {
    let embedder: Arc<dyn EmbeddingProvider> = match config.embedder {
        EmbedderKind::OpenAi => {
            let api_key = config.require_api_key()?.to_string();
            Arc::new(OpenAiEmbedding::new(
                api_key,
                &config.api_base,
                &config.embedding_model,
            )?)
        }
        EmbedderKind::Hash => Arc::new(HashEmbedding::default()),
    };

    tracing::info!(
        "Using {} embedding (dimension: {})",
        embedder.name(),
        embedder.dimension()
    );
    Ok(embedder)
}

// ============================================================================
// Tests
// ============================================================================
