//! CLI 모듈
//!
//! docrag CLI 명령어 정의 및 구현

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::config::{EmbedderKind, RagConfig, ResponderKind, API_KEY_VAR};
use crate::embedding::create_embedder;
use crate::index::VectorIndex;
use crate::ingestion::DocumentProcessor;
use crate::shell::{render_history, render_turn, Session};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "docrag")]
#[command(version, about = "문서 기반 질의응답 RAG 파이프라인", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// 생략하면 chat
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// 환경변수 설정을 덮어쓰는 공통 옵션
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// 수집 소스 (URL, PDF 폴더, .txt 파일). 여러 번 지정 가능
    #[arg(short, long = "source", global = true)]
    pub sources: Vec<String>,

    /// 항상 함께 수집할 PDF 폴더
    #[arg(long, global = true)]
    pub pdf_dir: Option<PathBuf>,

    /// 청크 최대 길이 (문자)
    #[arg(long, global = true)]
    pub chunk_size: Option<usize>,

    /// 청크 간 중첩 (문자)
    #[arg(long, global = true)]
    pub chunk_overlap: Option<usize>,

    /// 채팅 모델 (예: openai:gpt-4o)
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// 검색 청크 수
    #[arg(short = 'k', long, global = true)]
    pub top_k: Option<usize>,

    /// 임베딩 방식
    #[arg(long, value_enum, global = true)]
    pub embedder: Option<EmbedderKind>,

    /// 응답 방식
    #[arg(long, value_enum, global = true)]
    pub responder: Option<ResponderKind>,
}

impl ConfigArgs {
    /// 지정된 옵션만 설정에 반영
    pub fn apply(&self, config: &mut RagConfig) {
        if !self.sources.is_empty() {
            config.sources = self.sources.clone();
        }
        if let Some(ref dir) = self.pdf_dir {
            config.pdf_dir = Some(dir.clone());
        }
        if let Some(size) = self.chunk_size {
            config.chunk_size = size;
        }
        if let Some(overlap) = self.chunk_overlap {
            config.chunk_overlap = overlap;
        }
        if let Some(ref model) = self.model {
            config.llm_model = model.clone();
        }
        if let Some(top_k) = self.top_k {
            config.top_k = top_k;
        }
        if let Some(embedder) = self.embedder {
            config.embedder = embedder;
        }
        if let Some(responder) = self.responder {
            config.responder = responder;
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// 대화형 질의응답 (기본)
    Chat,

    /// 질문 하나에 답하고 종료
    Ask {
        /// 질문
        question: String,
    },

    /// 문서 수집 + 분할만 수행 (API 호출 없음)
    Ingest,

    /// 검색만 수행
    Search {
        /// 검색 쿼리
        query: String,

        /// 결과 개수 제한
        #[arg(short, long, default_value = "4")]
        limit: usize,
    },

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    let mut config = RagConfig::from_env().context("설정 로드 실패")?;
    cli.config.apply(&mut config);

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => cmd_chat(&config).await,
        Commands::Ask { question } => cmd_ask(&config, &question).await,
        Commands::Ingest => cmd_ingest(&config).await,
        Commands::Search { query, limit } => cmd_search(&config, &query, limit).await,
        Commands::Status => cmd_status(&config),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 세션 초기화 (실패해도 세션은 그대로 반환)
async fn initialize_session(session: &mut Session, config: &RagConfig) -> bool {
    println!("[*] RAG 시스템 초기화 중...");
    match session.initialize(config).await {
        Ok(count) => {
            println!("[OK] RAG system initialized with {} documents.", count);
            true
        }
        Err(e) => {
            println!("[!] Failed to initialize RAG system: {}", e);
            false
        }
    }
}

/// 대화형 명령어 (chat)
///
/// `:history`, `:retry`, `:quit` 명령을 지원합니다.
async fn cmd_chat(config: &RagConfig) -> Result<()> {
    let mut session = Session::new();
    initialize_session(&mut session, config).await;

    println!();
    println!("질문을 입력하세요. (:history 기록, :retry 재초기화, :quit 종료)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await.context("입력 읽기 실패")? else {
            break;
        };
        let input = line.trim();

        match input {
            "" => continue,
            ":quit" | ":q" | ":exit" => break,
            ":history" => {
                let recent = session.recent_history();
                if recent.is_empty() {
                    println!("[!] 대화 기록이 없습니다.");
                } else {
                    println!("{}", render_history(&recent));
                }
            }
            ":retry" => {
                if session.is_initialized() {
                    println!("[OK] 이미 초기화되었습니다 ({} chunks).", session.chunk_count());
                } else {
                    initialize_session(&mut session, config).await;
                }
            }
            question => match session.ask(question).await {
                Ok(turn) => println!("\n{}", render_turn(&turn)),
                Err(e) => println!("[!] {}", e),
            },
        }
    }

    println!("[*] 종료합니다.");
    Ok(())
}

/// 단일 질문 명령어 (ask)
async fn cmd_ask(config: &RagConfig, question: &str) -> Result<()> {
    let mut session = Session::new();
    let count = session
        .initialize(config)
        .await
        .context("RAG 시스템 초기화 실패")?;
    tracing::debug!("Initialized with {} chunks", count);

    let turn = session.ask(question).await.context("답변 생성 실패")?;
    println!("{}", render_turn(&turn));
    Ok(())
}

/// 수집 명령어 (ingest)
///
/// 소스를 로드하고 분할한 뒤 청크 통계를 출력합니다.
async fn cmd_ingest(config: &RagConfig) -> Result<()> {
    config.validate()?;
    let processor = DocumentProcessor::from_config(config)?;

    println!("[*] 수집 대상: {} 소스", config.sources.len());
    for source in &config.sources {
        println!("    {}", source);
    }

    let chunks = processor.process(&config.sources).await.context("문서 수집 실패")?;

    if chunks.is_empty() {
        println!("[!] 생성된 청크가 없습니다.");
        return Ok(());
    }

    let total_chars: usize = chunks.iter().map(|c| c.text.chars().count()).sum();
    let total_bytes: usize = chunks.iter().map(|c| c.text.len()).sum();
    let max_chars = chunks
        .iter()
        .map(|c| c.text.chars().count())
        .max()
        .unwrap_or(0);
    let mut sources: Vec<&str> = chunks.iter().map(|c| c.source.as_str()).collect();
    sources.dedup();

    println!();
    println!("[OK] 청크 {} 개 ({} 소스)", chunks.len(), sources.len());
    println!(
        "     청크 크기 {} / 중첩 {}",
        config.chunk_size, config.chunk_overlap
    );
    println!(
        "     평균 {} 자, 최대 {} 자, 총 {}",
        total_chars / chunks.len(),
        max_chars,
        format_bytes(total_bytes)
    );

    for source in sources {
        let count = chunks.iter().filter(|c| c.source == source).count();
        println!("     - {} ({} chunks)", source, count);
    }

    Ok(())
}

/// 검색 명령어 (search)
///
/// 색인을 만들고 답변 생성 없이 가까운 청크만 출력합니다.
async fn cmd_search(config: &RagConfig, query: &str, limit: usize) -> Result<()> {
    config.validate()?;
    let embedder = create_embedder(config)?;
    let processor = DocumentProcessor::from_config(config)?;

    println!("[*] 색인 생성 중...");
    let chunks = processor.process(&config.sources).await.context("문서 수집 실패")?;

    let mut index = VectorIndex::new(embedder);
    index.build(chunks).await.context("색인 생성 실패")?;

    println!("[*] 검색 중: \"{}\"", query);
    let results = index
        .retrieve_scored(query, limit)
        .await
        .context("검색 실패")?;

    if results.is_empty() {
        println!("\n[!] 검색 결과가 없습니다.");
        return Ok(());
    }

    println!("\n[OK] 검색 결과 ({} 건):\n", results.len());

    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. [유사도: {:.4}] {}",
            i + 1,
            result.similarity,
            result.chunk.label()
        );
        println!("   소스: {}", result.chunk.source);
        if let Some(page) = result.chunk.page {
            println!("   페이지: {}", page);
        }
        println!("   내용: {}", truncate_text(&result.chunk.text, 200));
        println!();
    }

    Ok(())
}

/// 상태 명령어 (status)
///
/// 설정과 자격 증명 상태를 확인합니다.
fn cmd_status(config: &RagConfig) -> Result<()> {
    println!("docrag v{}", env!("CARGO_PKG_VERSION"));
    println!();

    if config.has_api_key() {
        println!("[OK] API 키: 설정됨");
    } else {
        println!("[!] API 키: 미설정");
        println!("    설정: export {}=your-key", API_KEY_VAR);
    }

    match config.validate() {
        Ok(()) => println!("[OK] 설정: 유효"),
        Err(e) => println!("[!] 설정 오류: {}", e),
    }

    println!("[*] API: {}", config.api_base);
    println!("[*] 모델: {}", config.llm_model);
    println!(
        "[*] 임베딩: {:?} ({})",
        config.embedder, config.embedding_model
    );
    println!("[*] 응답 방식: {:?}", config.responder);
    println!(
        "[*] 청크: {} / 중첩 {}, top-k {}",
        config.chunk_size, config.chunk_overlap, config.top_k
    );

    println!("[*] 소스 ({} 개):", config.sources.len());
    for source in &config.sources {
        println!("    {}", source);
    }

    match config.pdf_dir {
        Some(ref dir) if dir.is_dir() => println!("[OK] PDF 폴더: {}", dir.display()),
        Some(ref dir) => println!("[*] PDF 폴더: {} (없음, 건너뜀)", dir.display()),
        None => println!("[*] PDF 폴더: 사용 안 함"),
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 텍스트 자르기 (UTF-8 안전, 한 줄로)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// 바이트 크기 포맷팅
fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

// ============================================================================
// Tests
// ============================================================================
