//! 해싱 임베딩
//!
//! 토큰을 SHA-256으로 버킷에 투영하는 feature hashing 방식입니다.
//! 같은 입력은 플랫폼과 무관하게 항상 같은 벡터가 됩니다.

use anyhow::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::EmbeddingProvider;

/// 기본 차원
pub const DEFAULT_HASH_DIMENSION: usize = 384;

/// 결정적 로컬 임베딩
#[derive(Debug, Clone)]
pub struct HashEmbedding {
    dimension: usize,
}

impl HashEmbedding {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// 소문자 영숫자 토큰
    fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in Self::tokens(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        // L2 정규화
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }

        vector
    }
}

impl Default for HashEmbedding {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_DIMENSION)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hash"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::cosine_similarity;

    #[tokio::test]
    async fn test_deterministic() {
        let embedder = HashEmbedding::default();
        let a = embedder.embed("The sky is blue.").await.unwrap();
        let b = embedder.embed("The sky is blue.").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), DEFAULT_HASH_DIMENSION);
    }

    #[tokio::test]
    async fn test_normalized() {
        let embedder = HashEmbedding::new(64);
        let v = embedder.embed("alpha beta gamma").await.unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_case_and_punctuation_insensitive() {
        let embedder = HashEmbedding::default();
        let a = embedder.embed("Sky, BLUE!").await.unwrap();
        let b = embedder.embed("sky blue").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_shared_terms_score_higher() {
        let embedder = HashEmbedding::default();
        let query = embedder.embed("what color is the sky").await.unwrap();
        let sky = embedder.embed("the sky is blue").await.unwrap();
        let rust = embedder.embed("ownership borrow checker lifetimes").await.unwrap();
        assert!(cosine_similarity(&query, &sky) > cosine_similarity(&query, &rust));
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let embedder = HashEmbedding::new(8);
        let v = embedder.embed("").await.unwrap();
        assert_eq!(v, vec![0.0; 8]);
    }
}
