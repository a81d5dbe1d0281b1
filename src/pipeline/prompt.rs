//! 답변 프롬프트

use crate::ingestion::Chunk;

/// 청크 텍스트를 순서대로 빈 줄로 연결
pub fn build_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// 질문 + 컨텍스트 프롬프트 (고정 템플릿)
pub fn build_prompt(question: &str, chunks: &[Chunk]) -> String {
    format!(
        "Answer the question based on the context below:\n\nContext:\n{context}\n\nQuestion: {question}",
        context = build_context(chunks),
        question = question
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            source: "s".to_string(),
            title: None,
            page: None,
            chunk_index: 0,
        }
    }

    #[test]
    fn test_build_prompt_exact() {
        let prompt = build_prompt(
            "What color is the sky?",
            &[chunk("The sky is blue."), chunk("Grass is green.")],
        );
        assert_eq!(
            prompt,
            "Answer the question based on the context below:\n\nContext:\nThe sky is blue.\n\nGrass is green.\n\nQuestion: What color is the sky?"
        );
    }

    #[test]
    fn test_placeholder_text_in_chunk_is_not_expanded() {
        let prompt = build_prompt("q", &[chunk("literal {question} marker")]);
        assert!(prompt.contains("literal {question} marker"));
        assert!(prompt.ends_with("Question: q"));
    }

    #[test]
    fn test_empty_context() {
        let prompt = build_prompt("q", &[]);
        assert!(prompt.contains("Context:\n\n\nQuestion: q"));
    }
}
