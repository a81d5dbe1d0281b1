//! 설정 모듈
//!
//! 기본값 → 환경변수 → CLI 플래그 순서로 덮어씁니다.
//! API 키는 원격 프로바이더를 만들 때 확인합니다 (로드 시점에는 비어 있어도 됨).

use std::path::PathBuf;
use std::str::FromStr;

use clap::ValueEnum;

use crate::error::{RagError, Result};

// ============================================================================
// Defaults
// ============================================================================

/// API 키 환경변수
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "openai:gpt-4o";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;
pub const DEFAULT_TOP_K: usize = 4;
pub const DEFAULT_PDF_DIR: &str = "data";

/// 기본 수집 URL
pub const DEFAULT_URLS: [&str; 2] = [
    "https://en.wikipedia.org/wiki/Artificial_intelligence",
    "https://en.wikipedia.org/wiki/Machine_learning",
];

// ============================================================================
// Kinds
// ============================================================================

/// 임베딩 백엔드
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbedderKind {
    /// OpenAI embeddings API
    #[value(name = "openai")]
    OpenAi,
    /// 로컬 해싱 임베딩 (네트워크 없음)
    Hash,
}

impl FromStr for EmbedderKind {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "hash" => Ok(Self::Hash),
            other => Err(RagError::invalid(format!(
                "unknown embedder '{}' (expected openai or hash)",
                other
            ))),
        }
    }
}

/// 답변 생성 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResponderKind {
    /// 고정 프롬프트로 LLM 1회 호출
    Direct,
    /// 도구(문서 검색, Wikipedia)를 쓰는 에이전트
    Agent,
}

impl FromStr for ResponderKind {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "agent" => Ok(Self::Agent),
            other => Err(RagError::invalid(format!(
                "unknown responder '{}' (expected direct or agent)",
                other
            ))),
        }
    }
}

// ============================================================================
// RagConfig
// ============================================================================

/// 파이프라인 설정
#[derive(Debug, Clone)]
pub struct RagConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    /// `provider:model` 또는 `model`
    pub llm_model: String,
    pub embedding_model: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub sources: Vec<String>,
    /// 존재하면 항상 함께 수집하는 PDF 디렉토리
    pub pdf_dir: Option<PathBuf>,
    pub top_k: usize,
    pub embedder: EmbedderKind,
    pub responder: ResponderKind,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            sources: DEFAULT_URLS.iter().map(|s| s.to_string()).collect(),
            pdf_dir: Some(PathBuf::from(DEFAULT_PDF_DIR)),
            top_k: DEFAULT_TOP_K,
            embedder: EmbedderKind::OpenAi,
            responder: ResponderKind::Direct,
        }
    }
}

impl RagConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 키 조회 함수로 설정 로드 (빈 값은 미설정으로 취급)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.api_key = get(API_KEY_VAR);
        if let Some(base) = get("OPENAI_BASE_URL") {
            config.api_base = base;
        }
        if let Some(model) = get("DOCRAG_LLM_MODEL") {
            config.llm_model = model;
        }
        if let Some(model) = get("DOCRAG_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Some(size) = get("DOCRAG_CHUNK_SIZE") {
            config.chunk_size = parse_usize("DOCRAG_CHUNK_SIZE", &size)?;
        }
        if let Some(overlap) = get("DOCRAG_CHUNK_OVERLAP") {
            config.chunk_overlap = parse_usize("DOCRAG_CHUNK_OVERLAP", &overlap)?;
        }
        if let Some(top_k) = get("DOCRAG_TOP_K") {
            config.top_k = parse_usize("DOCRAG_TOP_K", &top_k)?;
        }
        if let Some(sources) = get("DOCRAG_SOURCES") {
            config.sources = sources
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        // 빈 문자열이면 고정 PDF 디렉토리 비활성화
        if let Some(dir) = lookup("DOCRAG_PDF_DIR") {
            let dir = dir.trim();
            config.pdf_dir = (!dir.is_empty()).then(|| PathBuf::from(dir));
        }
        if let Some(kind) = get("DOCRAG_EMBEDDER") {
            config.embedder = kind.parse()?;
        }
        if let Some(kind) = get("DOCRAG_RESPONDER") {
            config.responder = kind.parse()?;
        }

        Ok(config)
    }

    /// 값 검증
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::invalid("chunk size must be greater than 0"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::invalid(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::invalid("top_k must be greater than 0"));
        }
        self.chat_model()?;
        Ok(())
    }

    /// `openai:gpt-4o` → `gpt-4o`
    pub fn chat_model(&self) -> Result<&str> {
        match self.llm_model.split_once(':') {
            Some(("openai", model)) if !model.is_empty() => Ok(model),
            Some((provider, _)) => Err(RagError::invalid(format!(
                "unsupported model provider '{}' in '{}'",
                provider, self.llm_model
            ))),
            None if !self.llm_model.trim().is_empty() => Ok(self.llm_model.trim()),
            None => Err(RagError::invalid("model identifier is empty")),
        }
    }

    /// API 키 (없으면 MissingCredential)
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or(RagError::MissingCredential { var: API_KEY_VAR })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| RagError::invalid(format!("{} must be a non-negative integer, got '{}'", key, value)))
}

// ============================================================================
// Tests
// ============================================================================
