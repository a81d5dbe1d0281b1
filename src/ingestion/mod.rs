//! 문서 수집 모듈
//!
//! 소스 문자열을 분류해 로드하고, 재귀 분할기로 청크를 만듭니다.
//! - URL (`http://`, `https://`): 웹 페이지 본문
//! - 디렉토리: 안의 모든 PDF (페이지 단위)
//! - `.txt` 파일: UTF-8 텍스트
//!
//! 그 외 소스는 건너뛰지 않고 `UnsupportedSourceKind`로 실패합니다.

pub mod pdf;
pub mod splitter;
pub mod web;

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use url::Url;

use crate::config::RagConfig;
use crate::error::{RagError, Result};

pub use splitter::{RecursiveSplitter, SplitConfig, TextSplitter, DEFAULT_SEPARATORS};
pub use web::{WebLoader, WebPage};

// ============================================================================
// Types
// ============================================================================

/// 분할 전 로드된 문서
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub content: String,
    /// URL 또는 파일 경로
    pub source: String,
    pub title: Option<String>,
    /// PDF 페이지 번호 (1부터)
    pub page: Option<usize>,
}

impl Document {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
            title: None,
            page: None,
        }
    }
}

/// 검색 단위 청크 (생성 후 변경하지 않음)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    pub text: String,
    pub source: String,
    pub title: Option<String>,
    pub page: Option<usize>,
    /// 문서 내 순번 (0부터)
    pub chunk_index: usize,
}

impl Chunk {
    /// 표시용 이름 (제목 → 소스)
    pub fn label(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.source)
    }
}

/// 소스 종류
#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    Url(Url),
    PdfDirectory(PathBuf),
    TextFile(PathBuf),
}

impl SourceKind {
    /// 소스 문자열 분류
    pub fn classify(source: &str) -> Result<Self> {
        let trimmed = source.trim();

        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return Url::parse(trimmed)
                .map(SourceKind::Url)
                .map_err(|_| RagError::unsupported(source));
        }

        let path = Path::new(trimmed);
        if path.is_dir() {
            return Ok(SourceKind::PdfDirectory(path.to_path_buf()));
        }

        let is_txt = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("txt"))
            .unwrap_or(false);
        if is_txt {
            return Ok(SourceKind::TextFile(path.to_path_buf()));
        }

        Err(RagError::unsupported(source))
    }
}

// ============================================================================
// DocumentProcessor
// ============================================================================

/// 문서 로드 + 분할
pub struct DocumentProcessor {
    splitter: RecursiveSplitter,
    web: WebLoader,
    /// 존재하면 항상 함께 로드하는 PDF 디렉토리
    pdf_dir: Option<PathBuf>,
}

impl DocumentProcessor {
    /// 청크 크기/중첩으로 생성 (overlap < size)
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        let config = SplitConfig::new(chunk_size, chunk_overlap)?;
        Ok(Self {
            splitter: RecursiveSplitter::new(config),
            web: WebLoader::new()?,
            pdf_dir: None,
        })
    }

    /// 설정으로 생성
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Ok(Self::new(config.chunk_size, config.chunk_overlap)?.with_pdf_dir(config.pdf_dir.clone()))
    }

    pub fn with_pdf_dir(mut self, pdf_dir: Option<PathBuf>) -> Self {
        self.pdf_dir = pdf_dir;
        self
    }

    pub fn split_config(&self) -> SplitConfig {
        self.splitter.config()
    }

    /// URL 로드
    pub async fn load_from_url(&self, url: &Url) -> Result<Vec<Document>> {
        let page = self.web.fetch(url).await?;
        if page.content.is_empty() {
            tracing::warn!("No text extracted from {}", url);
        }

        Ok(vec![Document {
            content: page.content,
            source: page.url,
            title: page.title,
            page: None,
        }])
    }

    /// 디렉토리 안의 PDF 전부 로드 (페이지당 문서 1개)
    pub async fn load_from_pdf_dir(&self, dir: &Path) -> Result<Vec<Document>> {
        let dir = dir.to_path_buf();

        // PDF 추출은 CPU 바운드이므로 spawn_blocking 사용
        let documents = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<Document>> {
            let mut documents = Vec::new();
            for path in pdf::list_pdf_files(&dir)? {
                let source = path.display().to_string();
                let title = path
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string());

                for page in pdf::extract_pages(&path)? {
                    documents.push(Document {
                        content: page.text,
                        source: source.clone(),
                        title: title.clone(),
                        page: Some(page.number),
                    });
                }
            }
            Ok(documents)
        })
        .await
        .context("PDF extraction task failed")??;

        Ok(documents)
    }

    /// 텍스트 파일 로드
    pub async fn load_from_txt(&self, path: &Path) -> Result<Vec<Document>> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read text file: {:?}", path))?;

        Ok(vec![Document {
            content,
            source: path.display().to_string(),
            title: path
                .file_name()
                .map(|name| name.to_string_lossy().to_string()),
            page: None,
        }])
    }

    /// 소스 목록 로드
    ///
    /// 모든 소스를 먼저 분류하므로, 지원하지 않는 소스가 있으면 네트워크 호출 전에 실패합니다.
    /// 고정 PDF 디렉토리는 목록에 없고 실제로 존재할 때만 마지막에 한 번 로드합니다.
    pub async fn load_documents(&self, sources: &[String]) -> Result<Vec<Document>> {
        let kinds = sources
            .iter()
            .map(|source| SourceKind::classify(source))
            .collect::<Result<Vec<_>>>()?;

        let mut documents = Vec::new();
        for kind in &kinds {
            let loaded = match kind {
                SourceKind::Url(url) => self.load_from_url(url).await?,
                SourceKind::PdfDirectory(dir) => self.load_from_pdf_dir(dir).await?,
                SourceKind::TextFile(path) => self.load_from_txt(path).await?,
            };
            documents.extend(loaded);
        }

        if let Some(ref pdf_dir) = self.pdf_dir {
            let already_listed = kinds
                .iter()
                .any(|kind| matches!(kind, SourceKind::PdfDirectory(dir) if dir == pdf_dir));
            if pdf_dir.is_dir() && !already_listed {
                tracing::info!("Loading PDFs from {:?}", pdf_dir);
                documents.extend(self.load_from_pdf_dir(pdf_dir).await?);
            }
        }

        tracing::info!("Loaded {} documents from {} sources", documents.len(), sources.len());
        Ok(documents)
    }

    /// 문서를 청크로 분할 (순서 유지)
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|doc| {
                self.splitter
                    .split(&doc.content)
                    .into_iter()
                    .enumerate()
                    .map(move |(chunk_index, text)| Chunk {
                        text,
                        source: doc.source.clone(),
                        title: doc.title.clone(),
                        page: doc.page,
                        chunk_index,
                    })
            })
            .collect()
    }

    /// 로드 + 분할
    pub async fn process(&self, sources: &[String]) -> Result<Vec<Chunk>> {
        let documents = self.load_documents(sources).await?;
        let chunks = self.split_documents(&documents);
        tracing::info!(
            "Split {} documents into {} chunks (size={}, overlap={})",
            documents.len(),
            chunks.len(),
            self.splitter.config().chunk_size,
            self.splitter.config().chunk_overlap
        );
        Ok(chunks)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn processor() -> DocumentProcessor {
        DocumentProcessor::new(500, 50).expect("processor creation failed")
    }

    #[test]
    fn test_classify_url() {
        let kind = SourceKind::classify("https://en.wikipedia.org/wiki/Rust").unwrap();
        assert!(matches!(kind, SourceKind::Url(_)));
    }

    #[test]
    fn test_classify_directory_and_txt() {
        let dir = TempDir::new().unwrap();
        let dir_str = dir.path().to_string_lossy().to_string();
        assert!(matches!(
            SourceKind::classify(&dir_str).unwrap(),
            SourceKind::PdfDirectory(_)
        ));
        assert!(matches!(
            SourceKind::classify("notes.TXT").unwrap(),
            SourceKind::TextFile(_)
        ));
    }

    #[test]
    fn test_classify_unsupported_names_source() {
        for source in ["notes.docx", "ftp://example.com/file", "plain words"] {
            match SourceKind::classify(source) {
                Err(RagError::UnsupportedSourceKind { location }) => assert_eq!(location, source),
                other => panic!("expected UnsupportedSourceKind for {}, got {:?}", source, other),
            }
        }
    }

    #[test]
    fn test_new_rejects_bad_overlap() {
        assert!(matches!(
            DocumentProcessor::new(50, 50),
            Err(RagError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_load_txt_and_split() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("colors.txt");
        std::fs::write(&path, "The sky is blue. Grass is green.").unwrap();

        let chunks = processor()
            .process(&[path.to_string_lossy().to_string()])
            .await
            .unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "The sky is blue. Grass is green.");
        assert_eq!(chunks[0].title.as_deref(), Some("colors.txt"));
        assert_eq!(chunks[0].chunk_index, 0);
        assert!(chunks[0].source.ends_with("colors.txt"));
    }

    #[tokio::test]
    async fn test_unsupported_source_fails_without_skipping() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ok.txt");
        std::fs::write(&path, "fine").unwrap();

        let sources = vec![path.to_string_lossy().to_string(), "report.docx".to_string()];
        let result = processor().load_documents(&sources).await;

        match result {
            Err(RagError::UnsupportedSourceKind { location }) => assert_eq!(location, "report.docx"),
            other => panic!("expected UnsupportedSourceKind, got {:?}", other.map(|d| d.len())),
        }
    }

    #[tokio::test]
    async fn test_missing_txt_propagates() {
        let result = processor()
            .load_documents(&["/definitely/not/here.txt".to_string()])
            .await;
        assert!(matches!(result, Err(RagError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_pdf_dir_without_pdfs_adds_nothing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("readme.md"), "ignored").unwrap();

        let docs = processor()
            .with_pdf_dir(Some(dir.path().to_path_buf()))
            .load_documents(&[])
            .await
            .unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_missing_pdf_dir_is_skipped() {
        let docs = processor()
            .with_pdf_dir(Some(PathBuf::from("/definitely/not/a/dir")))
            .load_documents(&[])
            .await
            .unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn test_split_documents_keeps_provenance() {
        let processor = DocumentProcessor::new(20, 0).unwrap();
        let mut doc = Document::new("First part here.\n\nSecond part here.", "manual.txt");
        doc.page = Some(3);

        let chunks = processor.split_documents(&[doc, Document::new("Other doc.", "b.txt")]);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "First part here.");
        assert_eq!(chunks[1].chunk_index, 1);
        assert_eq!(chunks[1].page, Some(3));
        assert_eq!(chunks[2].source, "b.txt");
        assert_eq!(chunks[2].chunk_index, 0);
        assert_eq!(chunks[2].label(), "b.txt");
    }
}
