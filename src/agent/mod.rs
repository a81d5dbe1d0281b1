//! ReAct 에이전트 응답기
//!
//! RESPOND 단계를 도구 호출 루프로 대체합니다.
//! LLM 출력은 `Thought / Action / Action Input / Final Answer` 형식을 따르며,
//! 도구 결과는 `Observation:`으로 다시 전달됩니다.
//!
//! 최대 턴 수 안에 `Final Answer`가 나오지 않으면 고정 문구로 답합니다.

pub mod tools;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;

use crate::error::Result;
use crate::index::VectorIndex;
use crate::llm::{ChatMessage, LlmProvider};
use crate::pipeline::{Responder, Retrieval};

pub use tools::{DocumentRetrieverTool, Tool, WikipediaTool};

/// 최대 LLM 호출 수
pub const DEFAULT_MAX_TURNS: usize = 5;

/// 답을 만들지 못했을 때의 답변
pub const FALLBACK_ANSWER: &str = "Could not generate an answer.";

const SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant for answering questions based on retrieved documents.";

// ============================================================================
// Step Parsing
// ============================================================================

/// LLM 출력 한 턴의 해석 결과
#[derive(Debug, Clone, PartialEq)]
enum Step {
    Final(String),
    Action { tool: String, input: String },
    /// 형식 없는 출력
    Plain(String),
}

struct StepParser {
    final_answer: Regex,
    action: Regex,
    action_input: Regex,
}

impl StepParser {
    fn new() -> anyhow::Result<Self> {
        Ok(Self {
            final_answer: Regex::new(r"(?s)Final Answer\s*:\s*(.*)")
                .context("Invalid final answer pattern")?,
            action: Regex::new(r"(?m)^\s*Action\s*:\s*(.+?)\s*$")
                .context("Invalid action pattern")?,
            action_input: Regex::new(r"(?s)Action Input\s*:\s*(.*)")
                .context("Invalid action input pattern")?,
        })
    }

    fn parse(&self, output: &str) -> Step {
        // 모델이 관찰 결과까지 지어내면 그 앞에서 자름
        let output = match output.find("\nObservation:") {
            Some(pos) => &output[..pos],
            None => output,
        };

        if let Some(caps) = self.final_answer.captures(output) {
            return Step::Final(caps[1].trim().to_string());
        }

        if let Some(caps) = self.action.captures(output) {
            let input = self
                .action_input
                .captures(output)
                .map(|c| c[1].trim().trim_matches('"').to_string())
                .unwrap_or_default();
            return Step::Action {
                tool: caps[1].to_string(),
                input,
            };
        }

        Step::Plain(output.trim().to_string())
    }
}

/// `Document Retriever` 같은 표기도 `document_retriever`로 맞춤
fn normalize_tool_name(name: &str) -> String {
    name.trim()
        .trim_matches(|c| c == '[' || c == ']' || c == '`')
        .to_lowercase()
        .replace(' ', "_")
}

// ============================================================================
// AgentResponder
// ============================================================================

/// 도구를 쓰는 ReAct 응답기
pub struct AgentResponder {
    llm: Arc<dyn LlmProvider>,
    tools: Vec<Box<dyn Tool>>,
    max_turns: usize,
    parser: StepParser,
}

impl AgentResponder {
    pub fn new(llm: Arc<dyn LlmProvider>, tools: Vec<Box<dyn Tool>>) -> Result<Self> {
        Ok(Self {
            llm,
            tools,
            max_turns: DEFAULT_MAX_TURNS,
            parser: StepParser::new()?,
        })
    }

    /// 문서 검색 + 위키백과 도구 구성
    pub fn with_default_tools(llm: Arc<dyn LlmProvider>, index: Arc<VectorIndex>) -> Result<Self> {
        let tools: Vec<Box<dyn Tool>> = vec![
            Box::new(DocumentRetrieverTool::new(index)),
            Box::new(WikipediaTool::new()?),
        ];
        Self::new(llm, tools)
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    fn system_prompt(&self) -> String {
        let descriptions = self
            .tools
            .iter()
            .map(|tool| format!("{}: {}", tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n");
        let names = self
            .tools
            .iter()
            .map(|tool| tool.name())
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "{SYSTEM_PROMPT}\n\n\
             You have access to the following tools:\n\n\
             {descriptions}\n\n\
             Use the following format:\n\n\
             Question: the input question you must answer\n\
             Thought: you should always think about what to do\n\
             Action: the action to take, should be one of [{names}]\n\
             Action Input: the input to the action\n\
             Observation: the result of the action\n\
             ... (this Thought/Action/Action Input/Observation can repeat N times)\n\
             Thought: I now know the final answer\n\
             Final Answer: the final answer to the original input question"
        )
    }

    async fn run_tool(&self, name: &str, input: &str) -> String {
        let wanted = normalize_tool_name(name);
        let Some(tool) = self.tools.iter().find(|t| t.name() == wanted) else {
            tracing::warn!("Agent requested unknown tool: {}", name);
            return format!(
                "{} is not a valid tool, try one of [{}].",
                name,
                self.tools
                    .iter()
                    .map(|t| t.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        };

        tracing::debug!("Agent calling {} with: {}", tool.name(), input);
        match tool.call(input).await {
            Ok(observation) => observation,
            Err(e) => {
                tracing::warn!("Tool {} failed: {:#}", tool.name(), e);
                format!("Tool {} failed: {}", tool.name(), e)
            }
        }
    }
}

#[async_trait]
impl Responder for AgentResponder {
    async fn respond(&self, retrieval: &Retrieval) -> Result<String> {
        let mut messages = vec![
            ChatMessage::system(self.system_prompt()),
            ChatMessage::user(format!("Question: {}", retrieval.question)),
        ];

        for turn in 1..=self.max_turns {
            let output = self.llm.complete(&messages).await?;

            match self.parser.parse(&output) {
                Step::Final(answer) if !answer.is_empty() => {
                    tracing::debug!("Agent finished after {} turns", turn);
                    return Ok(answer);
                }
                Step::Final(_) => {}
                Step::Action { tool, input } => {
                    let observation = self.run_tool(&tool, &input).await;
                    messages.push(ChatMessage::assistant(output));
                    messages.push(ChatMessage::user(format!("Observation: {}", observation)));
                }
                Step::Plain(text) if !text.is_empty() => return Ok(text),
                Step::Plain(_) => {}
            }
        }

        tracing::warn!("Agent hit {} turns without a final answer", self.max_turns);
        Ok(FALLBACK_ANSWER.to_string())
    }

    fn name(&self) -> &'static str {
        "agent"
    }
}

// ============================================================================
// Tests
// ============================================================================
