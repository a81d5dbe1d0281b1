//! 웹 로더 - URL 콘텐츠 추출
//!
//! 페이지를 한 번 가져와 제목과 본문 텍스트만 남깁니다.
//! 블록 요소 단위로 줄을 나눠 두어야 분할기가 문단 경계를 쓸 수 있습니다.

use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// 본문 후보 (우선순위 순)
const CONTENT_SELECTORS: [&str; 6] = [
    "article",
    "main",
    "[role=main]",
    "#mw-content-text",
    "#content",
    "body",
];

/// 블록 단위 텍스트 요소
const BLOCK_SELECTOR: &str = "p, h1, h2, h3, h4, h5, h6, li, pre, blockquote, dt, dd";

/// 본문으로 인정할 최소 길이
const MIN_CONTENT_CHARS: usize = 100;

/// 가져온 페이지
#[derive(Debug, Clone)]
pub struct WebPage {
    /// 페이지 제목
    pub title: Option<String>,
    /// 본문 텍스트 (문단은 빈 줄로 구분)
    pub content: String,
    /// 요청 URL
    pub url: String,
}

/// 웹 로더
pub struct WebLoader {
    client: reqwest::Client,
    whitespace: Regex,
}

impl WebLoader {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("docrag/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            whitespace: Regex::new(r"\s+").context("Invalid whitespace pattern")?,
        })
    }

    /// URL에서 콘텐츠 추출 (재시도 없음)
    pub async fn fetch(&self, url: &Url) -> Result<WebPage> {
        tracing::info!("Fetching: {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?
            .error_for_status()
            .with_context(|| format!("Request to {} failed", url))?;

        let html = response
            .text()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;

        Ok(self.parse(&html, url.as_str()))
    }

    /// HTML 문자열 파싱
    pub fn parse(&self, html: &str, url: &str) -> WebPage {
        let document = Html::parse_document(html);

        WebPage {
            title: self.extract_title(&document),
            content: self.extract_content(&document),
            url: url.to_string(),
        }
    }

    /// 제목 추출 (<title> → <h1>)
    fn extract_title(&self, document: &Html) -> Option<String> {
        ["title", "h1"].iter().find_map(|tag| {
            let selector = Selector::parse(tag).ok()?;
            let element = document.select(&selector).next()?;
            let title = self.collapse(&element.text().collect::<String>());
            (!title.is_empty()).then_some(title)
        })
    }

    /// 본문 추출
    fn extract_content(&self, document: &Html) -> String {
        for selector_str in CONTENT_SELECTORS {
            let Ok(selector) = Selector::parse(selector_str) else {
                continue;
            };
            if let Some(element) = document.select(&selector).next() {
                let text = self.element_text(&element);
                if text.chars().count() > MIN_CONTENT_CHARS {
                    return text;
                }
            }
        }

        // 폴백: 짧더라도 body 전체
        Selector::parse("body")
            .ok()
            .and_then(|selector| document.select(&selector).next())
            .map(|element| self.element_text(&element))
            .unwrap_or_default()
    }

    /// 블록 요소가 있으면 문단 단위, 없으면 전체 텍스트 한 덩어리
    fn element_text(&self, element: &ElementRef) -> String {
        let blocks: Vec<String> = Selector::parse(BLOCK_SELECTOR)
            .map(|selector| {
                element
                    .select(&selector)
                    // 중첩 블록(li 안의 p 등) 중복 방지
                    .filter(|block| !has_block_ancestor(block, element))
                    .map(|block| self.collapse(&block.text().collect::<String>()))
                    .filter(|text| !text.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        if blocks.is_empty() {
            self.collapse(&element.text().collect::<Vec<_>>().join(" "))
        } else {
            blocks.join("\n\n")
        }
    }

    /// 연속 공백 정리
    fn collapse(&self, text: &str) -> String {
        self.whitespace.replace_all(text, " ").trim().to_string()
    }
}

fn is_block(name: &str) -> bool {
    matches!(
        name,
        "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "li" | "pre" | "blockquote" | "dt" | "dd"
    )
}

/// root 아래에서 block의 조상 중 다른 블록 요소가 있는지
fn has_block_ancestor(block: &ElementRef, root: &ElementRef) -> bool {
    block
        .ancestors()
        .take_while(|node| node.id() != root.id())
        .filter_map(ElementRef::wrap)
        .any(|ancestor| is_block(ancestor.value().name()))
}
