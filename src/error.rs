//! 에러 타입
//!
//! 파이프라인 공개 API가 반환하는 에러 분류입니다.
//! 로더/프로바이더 내부는 anyhow로 컨텍스트를 쌓고, 경계에서 `RagError::Upstream`으로 감쌉니다.

use thiserror::Error;

/// RAG 파이프라인 에러
#[derive(Debug, Error)]
pub enum RagError {
    /// URL, PDF 디렉토리, .txt 파일 어디에도 해당하지 않는 소스
    #[error("Unsupported source type: {location}. Use a URL, a PDF directory, or a .txt file.")]
    UnsupportedSourceKind { location: String },

    /// build() 이전에 검색 시도
    #[error("Vector index has not been built. Call build() first.")]
    NotBuilt,

    /// 세션이 초기화되지 않은 상태에서 질문
    #[error("RAG system is not initialized")]
    NotInitialized,

    /// 자격 증명 누락
    #[error("{var} is not set")]
    MissingCredential { var: &'static str },

    /// 잘못된 설정값
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// 네트워크, 프로바이더, 파싱 등 외부 실패
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

impl RagError {
    pub(crate) fn unsupported(location: impl Into<String>) -> Self {
        Self::UnsupportedSourceKind {
            location: location.into(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

/// 크레이트 공통 Result
pub type Result<T> = std::result::Result<T, RagError>;
