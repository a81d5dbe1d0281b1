//! Text Splitting Module
//!
//! 재귀적 문자 분할기입니다.
//! 문단 → 줄 → 문장 → 단어 경계 순으로 시도하고, 그래도 크면 문자 단위로 자릅니다.
//! 길이는 모두 문자(char) 수 기준입니다.

use std::collections::VecDeque;

use crate::error::{RagError, Result};

/// 기본 구분자 (우선순위 순)
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

// ============================================================================
// Split Configuration
// ============================================================================

/// 분할 설정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitConfig {
    /// 최대 청크 크기 (문자 수)
    pub chunk_size: usize,
    /// 인접 청크 간 최대 중첩 (문자 수)
    pub chunk_overlap: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            chunk_size: crate::config::DEFAULT_CHUNK_SIZE,
            chunk_overlap: crate::config::DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl SplitConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::invalid("chunk size must be greater than 0"));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::invalid(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }
}

// ============================================================================
// TextSplitter Trait
// ============================================================================

/// 텍스트 분할 전략 트레이트
pub trait TextSplitter: Send + Sync {
    /// 텍스트를 청크로 분할
    fn split(&self, text: &str) -> Vec<String>;

    /// 분할기 이름
    fn name(&self) -> &'static str;
}

// ============================================================================
// RecursiveSplitter
// ============================================================================

/// 재귀적 문자 분할기
///
/// - 구분자는 앞 조각 끝에 붙여 보존
/// - 청크는 앞뒤 공백 제거, 빈 청크는 버림
/// - 다음 청크는 이전 청크 끝 조각을 `chunk_overlap` 이내로 이어받음
pub struct RecursiveSplitter {
    config: SplitConfig,
    separators: Vec<String>,
}

impl RecursiveSplitter {
    pub fn new(config: SplitConfig) -> Self {
        Self {
            config,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// 구분자 목록 교체 (마지막이 ""가 아니면 문자 단위 폴백이 없음)
    pub fn with_separators(mut self, separators: &[&str]) -> Self {
        self.separators = separators.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn config(&self) -> SplitConfig {
        self.config
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut chunks = Vec::new();

        // 텍스트에 실제로 등장하는 첫 구분자 선택
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = "";
                break;
            }
            if text.contains(sep.as_str()) {
                separator = sep;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut fitting: Vec<String> = Vec::new();
        for piece in split_keep_separator(text, separator) {
            if char_len(&piece) < self.config.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting));
                fitting.clear();
            }

            if remaining.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(&piece, remaining));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting));
        }

        chunks
    }

    /// 작은 조각들을 chunk_size 이내 창으로 병합
    fn merge(&self, pieces: &[String]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);

            if total + len > self.config.chunk_size && !window.is_empty() {
                push_window(&window, &mut chunks);

                // 중첩 크기 이하가 될 때까지 앞에서 제거
                while total > self.config.chunk_overlap
                    || (total > 0 && total + len > self.config.chunk_size)
                {
                    match window.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }

            window.push_back(piece);
            total += len;
        }

        push_window(&window, &mut chunks);
        chunks
    }
}

impl TextSplitter for RecursiveSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return vec![];
        }
        self.split_recursive(text, &self.separators)
    }

    fn name(&self) -> &'static str {
        "RecursiveSplitter"
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

#[inline]
fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// 구분자를 앞 조각 끝에 붙인 채로 분할 ("" → 문자 단위)
fn split_keep_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }
    text.split_inclusive(separator)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn push_window(window: &VecDeque<&str>, chunks: &mut Vec<String>) {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(size: usize, overlap: usize) -> RecursiveSplitter {
        RecursiveSplitter::new(SplitConfig::new(size, overlap).unwrap())
    }

    fn numbered_words(n: usize) -> String {
        (0..n)
            .map(|i| format!("word{:02}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_split_empty() {
        assert!(splitter(100, 10).split("").is_empty());
        assert!(splitter(100, 10).split(" \n\n ").is_empty());
    }

    #[test]
    fn test_small_text_single_chunk() {
        let text = "The sky is blue. Grass is green.";
        let chunks = splitter(500, 50).split(text);
        assert_eq!(chunks, vec![text.to_string()]);
    }

    #[test]
    fn test_config_rejects_overlap_not_smaller() {
        assert!(SplitConfig::new(100, 100).is_err());
        assert!(SplitConfig::new(100, 150).is_err());
        assert!(SplitConfig::new(0, 0).is_err());
        assert!(SplitConfig::new(100, 99).is_ok());
    }

    #[test]
    fn test_paragraph_boundary_preferred() {
        let text = "Alpha beta gamma.\n\nDelta epsilon zeta.";
        let chunks = splitter(25, 0).split(text);
        assert_eq!(chunks, vec!["Alpha beta gamma.", "Delta epsilon zeta."]);
    }

    #[test]
    fn test_hard_character_cut() {
        let chunks = splitter(4, 0).split("abcdefghij");
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_chunks_respect_size() {
        let text = numbered_words(100);
        for chunk in splitter(50, 10).split(&text) {
            assert!(chunk.chars().count() <= 50, "chunk too long: {}", chunk);
        }
    }

    #[test]
    fn test_chunks_cover_text() {
        let text = numbered_words(100);
        let chunks = splitter(50, 10).split(&text);
        for word in text.split(' ') {
            assert!(
                chunks.iter().any(|c| c.split(' ').any(|w| w == word)),
                "missing word: {}",
                word
            );
        }
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let text = numbered_words(100);
        let chunks = splitter(50, 10).split(&text);
        assert!(chunks.len() > 2);

        for pair in chunks.windows(2) {
            let last_word = pair[0].rsplit(' ').next().unwrap();
            assert!(
                pair[1].starts_with(last_word),
                "'{}' should start with '{}'",
                pair[1],
                last_word
            );
        }
    }

    #[test]
    fn test_no_overlap_is_disjoint() {
        let text = numbered_words(30);
        let chunks = splitter(20, 0).split(&text);
        let rejoined = chunks.join(" ");
        assert_eq!(rejoined, text);
    }

    #[test]
    fn test_sentence_boundary_before_word() {
        let text = "First sentence is here. Second sentence is here.";
        let chunks = splitter(30, 0).split(text);
        assert_eq!(
            chunks,
            vec!["First sentence is here.", "Second sentence is here."]
        );
    }

    #[test]
    fn test_multibyte_text() {
        let text = "안녕하세요 세계 ".repeat(20);
        let chunks = splitter(15, 3).split(&text);
        assert!(!chunks.is_empty());
        for chunk in chunks {
            assert!(chunk.chars().count() <= 15);
        }
    }

    #[test]
    fn test_custom_separators() {
        let chunks = splitter(10, 0)
            .with_separators(&["|", ""])
            .split("aaaa|bbbb|cccc");
        assert_eq!(chunks, vec!["aaaa|bbbb|", "cccc"]);
    }
}
