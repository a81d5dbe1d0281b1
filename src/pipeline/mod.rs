//! 답변 파이프라인 - RETRIEVE → RESPOND
//!
//! 두 단계가 고정된 직선 파이프라인입니다. 분기, 재시도, 루프가 없습니다.
//! 각 단계는 이전 단계 결과를 값으로 받아 새 값을 돌려줍니다.
//!
//! ```rust,ignore
//! let retrieval = pipeline.retrieve("What color is the sky?").await?;
//! let state = pipeline.respond(retrieval).await?;
//! println!("{}", state.answer);
//! ```

pub mod prompt;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::index::VectorIndex;
use crate::ingestion::Chunk;
use crate::llm::LlmProvider;

pub use prompt::{build_context, build_prompt};

// ============================================================================
// Query State
// ============================================================================

/// RETRIEVE 결과 (RESPOND 입력)
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    pub question: String,
    pub chunks: Vec<Chunk>,
}

/// 완료된 질의 상태
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    pub question: String,
    pub chunks: Vec<Chunk>,
    pub answer: String,
}

// ============================================================================
// Responder
// ============================================================================

/// RESPOND 단계 전략
#[async_trait]
pub trait Responder: Send + Sync {
    /// 검색 결과로 답변 생성
    async fn respond(&self, retrieval: &Retrieval) -> Result<String>;

    fn name(&self) -> &'static str;
}

/// 고정 프롬프트로 LLM을 한 번 호출
pub struct DirectResponder {
    llm: Arc<dyn LlmProvider>,
}

impl DirectResponder {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Responder for DirectResponder {
    async fn respond(&self, retrieval: &Retrieval) -> Result<String> {
        let prompt = build_prompt(&retrieval.question, &retrieval.chunks);
        Ok(self.llm.invoke(&prompt).await?)
    }

    fn name(&self) -> &'static str {
        "direct"
    }
}

// ============================================================================
// RagPipeline
// ============================================================================

/// 2단계 RAG 파이프라인
pub struct RagPipeline {
    index: Arc<VectorIndex>,
    responder: Box<dyn Responder>,
    top_k: usize,
}

impl RagPipeline {
    /// 기본 응답기(DirectResponder)로 생성
    pub fn new(index: Arc<VectorIndex>, llm: Arc<dyn LlmProvider>, top_k: usize) -> Self {
        Self::with_responder(index, Box::new(DirectResponder::new(llm)), top_k)
    }

    pub fn with_responder(
        index: Arc<VectorIndex>,
        responder: Box<dyn Responder>,
        top_k: usize,
    ) -> Self {
        Self {
            index,
            responder,
            top_k,
        }
    }

    /// RETRIEVE
    pub async fn retrieve(&self, question: impl Into<String>) -> Result<Retrieval> {
        let question = question.into();
        let chunks = self.index.retrieve(&question, self.top_k).await?;
        Ok(Retrieval { question, chunks })
    }

    /// RESPOND
    pub async fn respond(&self, retrieval: Retrieval) -> Result<QueryState> {
        let answer = self.responder.respond(&retrieval).await?;
        Ok(QueryState {
            question: retrieval.question,
            chunks: retrieval.chunks,
            answer,
        })
    }

    /// 전체 실행
    pub async fn run(&self, question: impl Into<String>) -> Result<QueryState> {
        let retrieval = self.retrieve(question).await?;
        tracing::debug!(
            "Retrieved {} chunks, responding with {}",
            retrieval.chunks.len(),
            self.responder.name()
        );
        self.respond(retrieval).await
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn responder_name(&self) -> &'static str {
        self.responder.name()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::embedding::HashEmbedding;
    use crate::error::RagError;
    use crate::ingestion::DocumentProcessor;
    use crate::llm::ChatMessage;

    /// 프롬프트의 Context 중 질문 단어가 들어간 문장을 그대로 답하는 LLM
    #[derive(Default)]
    pub(crate) struct ContextEchoLlm {
        pub(crate) prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmProvider for ContextEchoLlm {
        async fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
            let prompt = messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            self.prompts.lock().unwrap().push(prompt.clone());

            let (context, question) = prompt
                .split_once("\n\nQuestion: ")
                .ok_or_else(|| anyhow::anyhow!("unexpected prompt"))?;
            let subject = question
                .trim_end_matches('?')
                .rsplit(' ')
                .next()
                .unwrap_or_default()
                .to_lowercase();

            Ok(context
                .split(". ")
                .find(|sentence| sentence.to_lowercase().contains(&subject))
                .unwrap_or("I don't know")
                .trim()
                .to_string())
        }

        fn model(&self) -> &str {
            "context-echo"
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl LlmProvider for FailingLlm {
        async fn complete(&self, _messages: &[ChatMessage]) -> anyhow::Result<String> {
            anyhow::bail!("provider unavailable")
        }

        fn model(&self) -> &str {
            "failing"
        }
    }

    async fn index_from_text(text: &str) -> Arc<VectorIndex> {
        let processor = DocumentProcessor::new(500, 50).unwrap();
        let chunks = processor.split_documents(&[crate::ingestion::Document::new(text, "colors.txt")]);
        let mut index = VectorIndex::new(Arc::new(HashEmbedding::default()));
        index.build(chunks).await.unwrap();
        Arc::new(index)
    }

    #[tokio::test]
    async fn test_sky_is_blue_end_to_end() {
        let index = index_from_text("The sky is blue. Grass is green.").await;
        let llm = Arc::new(ContextEchoLlm::default());
        let pipeline = RagPipeline::new(index, llm.clone(), 4);

        let state = pipeline.run("What color is the sky?").await.unwrap();

        assert_eq!(state.question, "What color is the sky?");
        assert_eq!(state.chunks.len(), 1);
        assert_eq!(state.chunks[0].text, "The sky is blue. Grass is green.");
        assert!(state.answer.contains("blue"));

        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(
            prompts[0],
            build_prompt("What color is the sky?", &state.chunks)
        );
    }

    #[tokio::test]
    async fn test_steps_compose() {
        let index = index_from_text("The sky is blue. Grass is green.").await;
        let pipeline = RagPipeline::new(index, Arc::new(ContextEchoLlm::default()), 4);

        let retrieval = pipeline.retrieve("What color is grass?").await.unwrap();
        assert_eq!(retrieval.chunks.len(), 1);

        let state = pipeline.respond(retrieval.clone()).await.unwrap();
        assert_eq!(state.chunks, retrieval.chunks);
        assert!(state.answer.contains("green"));
    }

    #[tokio::test]
    async fn test_unbuilt_index_fails_pipeline() {
        let index = Arc::new(VectorIndex::new(Arc::new(HashEmbedding::default())));
        let pipeline = RagPipeline::new(index, Arc::new(ContextEchoLlm::default()), 4);
        assert!(matches!(
            pipeline.run("anything").await,
            Err(RagError::NotBuilt)
        ));
    }

    #[tokio::test]
    async fn test_llm_failure_propagates() {
        let index = index_from_text("The sky is blue.").await;
        let pipeline = RagPipeline::new(index, Arc::new(FailingLlm), 4);
        match pipeline.run("sky?").await {
            Err(RagError::Upstream(err)) => assert!(err.to_string().contains("unavailable")),
            other => panic!("expected upstream error, got {:?}", other),
        }
    }
}
