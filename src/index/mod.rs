//! Vector Index - 청크 임베딩 색인과 top-k 검색
//!
//! build-once, query-many 구조입니다.
//! - `build`: 모든 청크를 임베딩해 저장 (기존 색인은 통째로 교체)
//! - `retrieve`: 같은 임베딩 함수로 질문을 벡터화해 가까운 순으로 k개
//!
//! build 이후에는 `Arc<VectorIndex>`로 공유하며 변경하지 않습니다.

mod store;

use std::sync::Arc;

use anyhow::Context;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::ingestion::Chunk;

pub use store::{cosine_similarity, FlatVectorStore, ScoredChunk, VectorRecord, VectorStore};

/// 기본 검색 개수
pub const DEFAULT_K: usize = crate::config::DEFAULT_TOP_K;

/// 벡터 색인
pub struct VectorIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Option<FlatVectorStore>,
}

impl VectorIndex {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            store: None,
        }
    }

    /// 청크 목록으로 색인 생성
    ///
    /// 임베딩이 모두 성공한 뒤에만 기존 색인을 교체합니다.
    pub async fn build(&mut self, chunks: Vec<Chunk>) -> Result<usize> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();

        let embeddings = self
            .embedder
            .embed_batch(&texts)
            .await
            .context("Failed to embed chunks")?;

        if embeddings.len() != chunks.len() {
            return Err(anyhow::anyhow!(
                "Embedding provider returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )
            .into());
        }

        let records: Vec<VectorRecord> = embeddings
            .into_iter()
            .zip(chunks)
            .map(|(embedding, chunk)| VectorRecord { embedding, chunk })
            .collect();

        let mut store = FlatVectorStore::new();
        let inserted = store.insert_batch(records)?;
        self.store = Some(store);

        tracing::info!(
            "Built vector index: {} chunks ({} embedding)",
            inserted,
            self.embedder.name()
        );
        Ok(inserted)
    }

    /// 질문과 가까운 청크 k개 (가까운 순)
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Chunk>> {
        Ok(self
            .retrieve_scored(query, k)
            .await?
            .into_iter()
            .map(|scored| scored.chunk)
            .collect())
    }

    /// 유사도 포함 검색
    pub async fn retrieve_scored(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let store = self.store.as_ref().ok_or(RagError::NotBuilt)?;

        let query_embedding = self
            .embedder
            .embed(query)
            .await
            .context("Failed to embed query")?;

        let results = store.search(&query_embedding, k)?;
        tracing::debug!("Retrieved {} chunks for query: {}", results.len(), query);
        Ok(results)
    }

    pub fn is_built(&self) -> bool {
        self.store.is_some()
    }

    /// 색인된 청크 수 (build 전이면 0)
    pub fn len(&self) -> usize {
        self.store.as_ref().map(|s| s.count()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }
}

// ============================================================================
// Tests
// ============================================================================
