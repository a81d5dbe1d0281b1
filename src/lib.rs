//! docrag - 문서 기반 질의응답 RAG 파이프라인
//!
//! 웹 페이지, PDF, 텍스트 파일을 수집해 청크로 나누고,
//! 임베딩 색인에서 가까운 청크를 찾아 LLM 답변을 생성합니다.
//!
//! 수집 → 임베딩/색인 → 검색 → 답변 생성의 2단계 파이프라인과
//! 대화형 셸로 구성됩니다.

pub mod agent;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod ingestion;
pub mod llm;
pub mod pipeline;
pub mod shell;

// Re-exports
pub use agent::{AgentResponder, DocumentRetrieverTool, Tool, WikipediaTool};
pub use config::{EmbedderKind, RagConfig, ResponderKind};
pub use embedding::{create_embedder, EmbeddingProvider, HashEmbedding, OpenAiEmbedding};
pub use error::{RagError, Result};
pub use index::{ScoredChunk, VectorIndex};
pub use ingestion::{Chunk, Document, DocumentProcessor, RecursiveSplitter, SourceKind};
pub use llm::{create_llm, ChatMessage, LlmProvider, OpenAiChat};
pub use pipeline::{DirectResponder, QueryState, RagPipeline, Responder, Retrieval};
pub use shell::{ConversationEntry, ConversationHistory, Session, Turn};
