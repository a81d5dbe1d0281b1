//! 에이전트 도구
//!
//! - `document_retriever`: 로컬 벡터 색인 검색
//! - `wikipedia`: MediaWiki 검색 API (영문, 상위 3개 문서 요약)

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::index::VectorIndex;

/// 문서 검색 도구가 돌려주는 최대 청크 수
pub const RETRIEVER_MAX_DOCS: usize = 8;

/// 위키백과 검색 결과 수
pub const WIKIPEDIA_TOP_K: usize = 3;

/// 위키백과 관찰 결과 최대 길이 (문자)
pub const WIKIPEDIA_MAX_CHARS: usize = 4000;

const WIKIPEDIA_API: &str = "https://en.wikipedia.org/w/api.php";
const NO_DOCUMENTS: &str = "No relevant documents found.";
const NO_WIKIPEDIA_RESULT: &str = "No good Wikipedia Search Result was found";

// ============================================================================
// Tool Trait
// ============================================================================

/// 에이전트가 호출할 수 있는 도구
#[async_trait]
pub trait Tool: Send + Sync {
    /// 프롬프트의 `Action:` 줄에 쓰는 이름
    fn name(&self) -> &str;

    /// 프롬프트에 노출되는 설명
    fn description(&self) -> &str;

    /// 입력 문자열로 실행하고 관찰 결과 반환
    async fn call(&self, input: &str) -> Result<String>;
}

// ============================================================================
// Document Retriever
// ============================================================================

/// 벡터 색인 검색 도구
pub struct DocumentRetrieverTool {
    index: Arc<VectorIndex>,
}

impl DocumentRetrieverTool {
    pub fn new(index: Arc<VectorIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Tool for DocumentRetrieverTool {
    fn name(&self) -> &str {
        "document_retriever"
    }

    fn description(&self) -> &str {
        "Use this tool to retrieve documents relevant to the user's question."
    }

    async fn call(&self, input: &str) -> Result<String> {
        let chunks = self.index.retrieve(input, RETRIEVER_MAX_DOCS).await?;
        if chunks.is_empty() {
            return Ok(NO_DOCUMENTS.to_string());
        }

        Ok(chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| format!("[{}] {}:\n{}\n", i + 1, chunk.label(), chunk.text))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

// ============================================================================
// Wikipedia
// ============================================================================

#[derive(Debug, Deserialize)]
struct WikiResponse {
    query: Option<WikiQuery>,
}

#[derive(Debug, Deserialize)]
struct WikiQuery {
    #[serde(default)]
    pages: Vec<WikiPage>,
}

#[derive(Debug, Deserialize)]
struct WikiPage {
    title: String,
    /// 검색 순위
    #[serde(default)]
    index: usize,
    #[serde(default)]
    extract: Option<String>,
}

/// 위키백과 검색 도구
pub struct WikipediaTool {
    client: reqwest::Client,
    endpoint: String,
}

impl WikipediaTool {
    pub fn new() -> Result<Self> {
        Self::with_endpoint(WIKIPEDIA_API)
    }

    /// MediaWiki API 엔드포인트 지정
    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("docrag/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Tool for WikipediaTool {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn description(&self) -> &str {
        "Useful for answering questions about general knowledge using Wikipedia."
    }

    async fn call(&self, input: &str) -> Result<String> {
        let limit = WIKIPEDIA_TOP_K.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("formatversion", "2"),
                ("generator", "search"),
                ("gsrsearch", input),
                ("gsrlimit", limit.as_str()),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("exlimit", limit.as_str()),
            ])
            .send()
            .await
            .context("Failed to send Wikipedia request")?
            .error_for_status()
            .context("Wikipedia API error")?;

        let body = response
            .text()
            .await
            .context("Failed to read Wikipedia response")?;

        parse_wikipedia_response(&body)
    }
}

/// MediaWiki 응답을 관찰 문자열로 변환
fn parse_wikipedia_response(body: &str) -> Result<String> {
    let response: WikiResponse =
        serde_json::from_str(body).context("Failed to parse Wikipedia response")?;

    let mut pages = response.query.map(|q| q.pages).unwrap_or_default();
    pages.sort_by_key(|page| page.index);

    let summaries: Vec<String> = pages
        .into_iter()
        .filter_map(|page| {
            let extract = page.extract?;
            let extract = extract.trim();
            (!extract.is_empty()).then(|| format!("Page: {}\nSummary: {}", page.title, extract))
        })
        .collect();

    if summaries.is_empty() {
        return Ok(NO_WIKIPEDIA_RESULT.to_string());
    }

    Ok(summaries
        .join("\n\n")
        .chars()
        .take(WIKIPEDIA_MAX_CHARS)
        .collect())
}

// ============================================================================
// Tests
// ============================================================================
