//! Vector Store - 벡터 저장 트레이트 및 유틸리티
//!
//! 메모리 내 전수 비교(flat) 저장소입니다. 코사인 유사도로 정렬합니다.

use anyhow::Result;

use crate::ingestion::Chunk;

// ============================================================================
// Types
// ============================================================================

/// 벡터 레코드 (저장용)
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub embedding: Vec<f32>,
    pub chunk: Chunk,
}

/// 검색 결과
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// 코사인 유사도 (-1.0 ~ 1.0)
    pub similarity: f32,
}

// ============================================================================
// VectorStore Trait
// ============================================================================

/// 벡터 저장소 공통 인터페이스
pub trait VectorStore: Send + Sync {
    /// 레코드 배치 삽입
    fn insert_batch(&mut self, records: Vec<VectorRecord>) -> Result<usize>;

    /// 가까운 순으로 최대 limit개
    fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<ScoredChunk>>;

    /// 레코드 수
    fn count(&self) -> usize;
}

// ============================================================================
// FlatVectorStore
// ============================================================================

/// 전수 비교 저장소
#[derive(Debug, Default)]
pub struct FlatVectorStore {
    records: Vec<VectorRecord>,
    dimension: Option<usize>,
}

impl FlatVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}

impl VectorStore for FlatVectorStore {
    fn insert_batch(&mut self, records: Vec<VectorRecord>) -> Result<usize> {
        for record in &records {
            let dim = *self.dimension.get_or_insert(record.embedding.len());
            anyhow::ensure!(
                record.embedding.len() == dim,
                "Embedding dimension mismatch: expected {}, got {}",
                dim,
                record.embedding.len()
            );
        }

        let inserted = records.len();
        self.records.extend(records);
        Ok(inserted)
    }

    fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<ScoredChunk>> {
        if let Some(dim) = self.dimension {
            anyhow::ensure!(
                query_embedding.len() == dim,
                "Query dimension mismatch: expected {}, got {}",
                dim,
                query_embedding.len()
            );
        }

        let mut scored: Vec<(usize, f32)> = self
            .records
            .iter()
            .enumerate()
            .map(|(i, record)| (i, cosine_similarity(query_embedding, &record.embedding)))
            .collect();

        // 안정 정렬: 동점이면 삽입 순서 유지
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(i, similarity)| ScoredChunk {
                chunk: self.records[i].chunk.clone(),
                similarity,
            })
            .collect())
    }

    fn count(&self) -> usize {
        self.records.len()
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 코사인 유사도 계산
///
/// 길이가 다르거나 영벡터면 0.0을 반환합니다.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str, embedding: Vec<f32>) -> VectorRecord {
        VectorRecord {
            embedding,
            chunk: Chunk {
                text: text.to_string(),
                source: "test".to_string(),
                title: None,
                page: None,
                chunk_index: 0,
            },
        }
    }

    #[test]
    fn test_cosine_similarity_same() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal_and_opposite() {
        let a = vec![1.0, 0.0, 0.0];
        assert!(cosine_similarity(&a, &[0.0, 1.0, 0.0]).abs() < 0.0001);
        assert!((cosine_similarity(&a, &[-1.0, 0.0, 0.0]) + 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_degenerate() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_search_orders_nearest_first() {
        let mut store = FlatVectorStore::new();
        store
            .insert_batch(vec![
                record("far", vec![0.0, 1.0]),
                record("near", vec![1.0, 0.1]),
                record("middle", vec![1.0, 1.0]),
            ])
            .unwrap();

        let results = store.search(&[1.0, 0.0], 3).unwrap();
        let texts: Vec<_> = results.iter().map(|r| r.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["near", "middle", "far"]);
        assert!(results[0].similarity >= results[1].similarity);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut store = FlatVectorStore::new();
        store
            .insert_batch(vec![
                record("first", vec![1.0, 0.0]),
                record("second", vec![1.0, 0.0]),
            ])
            .unwrap();

        let results = store.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(results[0].chunk.text, "first");
        assert_eq!(results[1].chunk.text, "second");
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mut store = FlatVectorStore::new();
        let result = store.insert_batch(vec![record("a", vec![1.0, 0.0]), record("b", vec![1.0])]);
        assert!(result.is_err());

        let mut store = FlatVectorStore::new();
        store.insert_batch(vec![record("a", vec![1.0, 0.0])]).unwrap();
        assert!(store.search(&[1.0, 0.0, 0.0], 1).is_err());
    }
}
