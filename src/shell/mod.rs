//! 대화형 셸 세션
//!
//! 세션마다 파이프라인을 한 번만 구성하고, 질문을 하나씩 처리하며
//! 대화 기록을 쌓습니다. 출력 포맷팅도 여기서 담당합니다.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::agent::AgentResponder;
use crate::config::{RagConfig, ResponderKind};
use crate::embedding::create_embedder;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::ingestion::DocumentProcessor;
use crate::llm::create_llm;
use crate::pipeline::{QueryState, RagPipeline};

/// 화면에 보여줄 최근 대화 수
pub const HISTORY_DISPLAY_LIMIT: usize = 3;

/// 검색 청크 미리보기 길이 (문자)
pub const PREVIEW_CHARS: usize = 300;

/// 대화 기록의 답변 미리보기 길이 (문자)
pub const HISTORY_ANSWER_CHARS: usize = 200;

// ============================================================================
// Conversation History
// ============================================================================

/// 대화 기록 항목
#[derive(Debug, Clone)]
pub struct ConversationEntry {
    pub question: String,
    pub answer: String,
    pub elapsed: Duration,
    pub asked_at: DateTime<Utc>,
}

/// 세션 동안 유지되는 대화 기록 (추가만 가능)
///
/// 보관 개수는 제한하지 않습니다. 표시할 때만 최근 항목으로 자릅니다.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    entries: Vec<ConversationEntry>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ConversationEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 최근 n개 (최신순)
    pub fn recent(&self, n: usize) -> Vec<&ConversationEntry> {
        self.entries.iter().rev().take(n).collect()
    }

    pub fn last(&self) -> Option<&ConversationEntry> {
        self.entries.last()
    }
}

// ============================================================================
// Session
// ============================================================================

/// 질문 한 건의 결과
#[derive(Debug, Clone)]
pub struct Turn {
    pub state: QueryState,
    pub elapsed: Duration,
}

/// 대화형 세션
///
/// 호출자가 소유하는 명시적 핸들입니다. 초기화 전에는 질문을 거부합니다.
pub struct Session {
    id: Uuid,
    pipeline: Option<RagPipeline>,
    chunk_count: usize,
    history: ConversationHistory,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            pipeline: None,
            chunk_count: 0,
            history: ConversationHistory::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 파이프라인 구성 (이미 초기화되었으면 그대로 재사용)
    ///
    /// 실패하면 세션은 초기화되지 않은 상태로 남고, 다시 호출할 수 있습니다.
    pub async fn initialize(&mut self, config: &RagConfig) -> Result<usize> {
        if self.pipeline.is_some() {
            return Ok(self.chunk_count);
        }

        let (pipeline, chunk_count) = build_pipeline(config).await?;
        tracing::info!("Session {} initialized with {} chunks", self.id, chunk_count);
        Ok(self.initialize_with(pipeline, chunk_count))
    }

    /// 이미 구성된 파이프라인으로 초기화
    pub fn initialize_with(&mut self, pipeline: RagPipeline, chunk_count: usize) -> usize {
        self.pipeline = Some(pipeline);
        self.chunk_count = chunk_count;
        chunk_count
    }

    pub fn is_initialized(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// 질문 처리 + 기록 추가
    pub async fn ask(&mut self, question: &str) -> Result<Turn> {
        let pipeline = self.pipeline.as_ref().ok_or(RagError::NotInitialized)?;

        let start = Instant::now();
        let state = pipeline.run(question).await?;
        let elapsed = start.elapsed();

        self.history.push(ConversationEntry {
            question: state.question.clone(),
            answer: state.answer.clone(),
            elapsed,
            asked_at: Utc::now(),
        });

        Ok(Turn { state, elapsed })
    }

    /// 최근 대화 (최신순, 최대 3개)
    pub fn recent_history(&self) -> Vec<&ConversationEntry> {
        self.history.recent(HISTORY_DISPLAY_LIMIT)
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }
}

/// 설정으로 파이프라인 전체 구성 (수집 → 색인 → 응답기)
pub async fn build_pipeline(config: &RagConfig) -> Result<(RagPipeline, usize)> {
    config.validate()?;

    let llm = create_llm(config)?;
    let embedder = create_embedder(config)?;

    let processor = DocumentProcessor::from_config(config)?;
    let chunks = processor.process(&config.sources).await?;

    let mut index = VectorIndex::new(embedder);
    let chunk_count = index.build(chunks).await?;
    let index = Arc::new(index);

    let pipeline = match config.responder {
        ResponderKind::Direct => RagPipeline::new(index, llm, config.top_k),
        ResponderKind::Agent => {
            let responder = AgentResponder::with_default_tools(llm, index.clone())?;
            RagPipeline::with_responder(index, Box::new(responder), config.top_k)
        }
    };

    Ok((pipeline, chunk_count))
}

// ============================================================================
// Rendering
// ============================================================================

/// 앞에서 max_chars 문자만 남기고, 잘렸으면 `...` 추가
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// 답변, 검색 청크 미리보기, 소요 시간
pub fn render_turn(turn: &Turn) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Answer:\n{}\n", turn.state.answer);

    if !turn.state.chunks.is_empty() {
        let _ = writeln!(out, "Retrieved Documents:");
        for (i, chunk) in turn.state.chunks.iter().enumerate() {
            let _ = writeln!(
                out,
                "--- Document {} ({}) ---\n{}",
                i + 1,
                chunk.label(),
                truncate_chars(&chunk.text, PREVIEW_CHARS)
            );
        }
        out.push('\n');
    }

    let _ = write!(
        out,
        "Answer generated in {:.2} seconds.",
        turn.elapsed.as_secs_f64()
    );
    out
}

/// 최근 대화 기록 (최신순)
pub fn render_history(entries: &[&ConversationEntry]) -> String {
    let mut out = String::from("Conversation History\n");
    for entry in entries {
        let answer: String = entry.answer.chars().take(HISTORY_ANSWER_CHARS).collect();
        let _ = writeln!(out, "----");
        let _ = writeln!(out, "Q: {}", entry.question);
        let _ = writeln!(out, "A: {}...", answer);
        let _ = writeln!(
            out,
            "Answered in {:.2} seconds.",
            entry.elapsed.as_secs_f64()
        );
    }
    out.push_str("----");
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbedderKind;
    use crate::embedding::HashEmbedding;
    use crate::ingestion::{Chunk, Document};
    use crate::pipeline::tests::ContextEchoLlm;

    fn entry(question: &str, answer: &str, millis: u64) -> ConversationEntry {
        ConversationEntry {
            question: question.to_string(),
            answer: answer.to_string(),
            elapsed: Duration::from_millis(millis),
            asked_at: Utc::now(),
        }
    }

    async fn ready_session(text: &str) -> Session {
        let processor = DocumentProcessor::new(500, 50).unwrap();
        let chunks = processor.split_documents(&[Document::new(text, "colors.txt")]);
        let mut index = VectorIndex::new(Arc::new(HashEmbedding::default()));
        let count = index.build(chunks).await.unwrap();

        let pipeline =
            RagPipeline::new(Arc::new(index), Arc::new(ContextEchoLlm::default()), 4);
        let mut session = Session::new();
        session.initialize_with(pipeline, count);
        session
    }

    fn offline_config(source: &std::path::Path) -> RagConfig {
        RagConfig {
            api_key: Some("sk-test".to_string()),
            sources: vec![source.to_string_lossy().to_string()],
            pdf_dir: None,
            embedder: EmbedderKind::Hash,
            ..RagConfig::default()
        }
    }

    #[test]
    fn test_history_recent_most_recent_first() {
        let mut history = ConversationHistory::new();
        for i in 1..=5 {
            history.push(entry(&format!("q{}", i), "a", 10));
        }

        assert_eq!(history.len(), 5);
        let recent: Vec<_> = history
            .recent(HISTORY_DISPLAY_LIMIT)
            .iter()
            .map(|e| e.question.as_str())
            .collect();
        assert_eq!(recent, vec!["q5", "q4", "q3"]);
    }

    #[tokio::test]
    async fn test_ask_before_initialize_refused() {
        let mut session = Session::new();
        assert!(!session.is_initialized());
        assert!(matches!(
            session.ask("What color is the sky?").await,
            Err(RagError::NotInitialized)
        ));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_initialize_without_key_stays_uninitialized() {
        let config = RagConfig {
            api_key: None,
            ..RagConfig::default()
        };

        let mut session = Session::new();
        match session.initialize(&config).await {
            Err(RagError::MissingCredential { var }) => assert_eq!(var, "OPENAI_API_KEY"),
            other => panic!("expected missing credential, got {:?}", other.map(|_| ())),
        }
        assert!(!session.is_initialized());
        assert!(matches!(
            session.ask("anything").await,
            Err(RagError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("colors.txt");
        std::fs::write(&path, "The sky is blue. Grass is green.").unwrap();

        let mut session = Session::new();
        let config = offline_config(&path);
        assert_eq!(session.initialize(&config).await.unwrap(), 1);
        assert!(session.is_initialized());

        // 두 번째 호출은 다시 수집하지 않음
        std::fs::remove_file(&path).unwrap();
        assert_eq!(session.initialize(&config).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_initialize_unsupported_source() {
        let mut config = offline_config(std::path::Path::new("notes.docx"));
        config.sources.push("ftp://example.com/file".to_string());

        let mut session = Session::new();
        assert!(matches!(
            session.initialize(&config).await,
            Err(RagError::UnsupportedSourceKind { .. })
        ));
        assert!(!session.is_initialized());
    }

    #[tokio::test]
    async fn test_ask_appends_history() {
        let mut session = ready_session("The sky is blue. Grass is green.").await;

        let turn = session.ask("What color is the sky?").await.unwrap();
        assert!(turn.state.answer.contains("blue"));
        assert_eq!(turn.state.chunks.len(), 1);

        session.ask("What color is grass?").await.unwrap();
        assert_eq!(session.history().len(), 2);

        let recent = session.recent_history();
        assert_eq!(recent[0].question, "What color is grass?");
        assert_eq!(recent[1].question, "What color is the sky?");
        assert_eq!(recent[0].elapsed, session.history().last().unwrap().elapsed);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 5), "hello");
        assert_eq!(truncate_chars("hello world", 5), "hello...");
        assert_eq!(truncate_chars("안녕하세요 세계", 5), "안녕하세요...");
    }

    #[test]
    fn test_render_turn() {
        let long = "x".repeat(PREVIEW_CHARS + 50);
        let turn = Turn {
            state: QueryState {
                question: "q".to_string(),
                chunks: vec![Chunk {
                    text: long,
                    source: "a.txt".to_string(),
                    title: None,
                    page: None,
                    chunk_index: 0,
                }],
                answer: "The sky is blue.".to_string(),
            },
            elapsed: Duration::from_millis(1234),
        };

        let rendered = render_turn(&turn);
        assert!(rendered.starts_with("Answer:\nThe sky is blue.\n"));
        assert!(rendered.contains(&format!("{}...", "x".repeat(PREVIEW_CHARS))));
        assert!(!rendered.contains(&"x".repeat(PREVIEW_CHARS + 1)));
        assert!(rendered.ends_with("Answer generated in 1.23 seconds."));
    }

    #[test]
    fn test_render_history() {
        let long_answer = "y".repeat(250);
        let first = entry("first?", "short", 500);
        let second = entry("second?", &long_answer, 2000);
        let rendered = render_history(&[&second, &first]);

        assert!(rendered.contains(&format!("Q: second?\nA: {}...\n", "y".repeat(200))));
        assert!(rendered.contains("A: short...\n"));
        assert!(rendered.contains("Answered in 2.00 seconds."));
        assert!(rendered.contains("Answered in 0.50 seconds."));
        assert!(rendered.find("second?").unwrap() < rendered.find("first?").unwrap());
    }
}
