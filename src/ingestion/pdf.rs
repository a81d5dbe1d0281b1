//! PDF 텍스트 추출 모듈
//!
//! pdf-extract로 텍스트를 뽑고 폼피드(\x0c) 기준으로 페이지를 나눕니다.
//! 디렉토리 로드는 하위 폴더로 내려가지 않습니다.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

/// PDF 한 페이지
#[derive(Debug, Clone, PartialEq)]
pub struct PdfPage {
    /// 1부터 시작
    pub number: usize,
    pub text: String,
}

/// PDF 파일에서 페이지별 텍스트 추출
pub fn extract_pages(path: &Path) -> Result<Vec<PdfPage>> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read PDF: {:?}", path))?;

    let text = pdf_extract::extract_text_from_mem(&bytes)
        .with_context(|| format!("Failed to extract text from PDF: {:?}", path))?;

    if text.trim().is_empty() {
        tracing::warn!(
            "No text extracted from PDF: {:?}. It might be a scanned document.",
            path
        );
        return Ok(vec![]);
    }

    Ok(split_pages(&text))
}

/// 폼피드로 페이지 분리, 빈 페이지는 번호만 소비하고 버림
fn split_pages(text: &str) -> Vec<PdfPage> {
    text.split('\x0c')
        .enumerate()
        .map(|(i, page)| PdfPage {
            number: i + 1,
            text: page.trim().to_string(),
        })
        .filter(|page| !page.text.is_empty())
        .collect()
}

/// 디렉토리 바로 아래의 .pdf 파일 목록 (경로순)
pub fn list_pdf_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to read directory: {:?}", dir))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if is_pdf {
            files.push(entry.into_path());
        }
    }

    tracing::debug!("Found {} PDF files in {:?}", files.len(), dir);
    Ok(files)
}
