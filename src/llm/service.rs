//! 模型服务层 - 管线节点依赖的统一模型契约
//!
//! 节点不直接持有provider客户端，而是通过ModelService访问四类能力：
//! 搜索接地问答、前端动作选择、结构化工具调用、以及普通单轮对话。
//! 这样管线可以用测试替身驱动，不需要任何真实网络。

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};

use crate::config::{LLMConfig, LLMProvider};
use crate::llm::client::LLMClient;
use crate::llm::gemini::GeminiHttpClient;
use crate::types::analysis::StackAnalysis;
use crate::types::message::{FrontendAction, Message, Role, ToolCall};

/// 接地问答的系统提示词，要求模型对每个问题都先搜索
const GROUNDED_SYSTEM_PROMPT: &str = r#"You have access to a google_search tool that can help you find current and accurate information.
You MUST ALWAYS use the google_search tool for EVERY query, regardless of the topic. This is a requirement.

For ANY question you receive, you should:
1. ALWAYS perform a Google Search first
2. Use the search results to provide accurate and up-to-date information
3. Never rely solely on your training data
4. Always search for the most current information available

This applies to ALL types of queries including:
- Technical questions
- Current events
- How-to guides
- Definitions
- Best practices
- Recent developments
- Any information that might have changed

You are REQUIRED to use the google_search tool for every single response. Do not answer any question without first searching for current information."#;

/// 模型对系统约定的确认语，作为对话前缀的一部分发送
const GROUNDED_ACK: &str =
    "I understand. I will use the google_search tool when needed to provide current and accurate information.";

/// 搜索接地问答的结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroundedAnswer {
    pub text: String,
    /// 模型实际发出的搜索查询，用于逐条生成进度日志
    pub web_search_queries: Vec<String>,
}

/// 前端动作选择的结果
#[derive(Debug, Clone, Default)]
pub struct ActionSelection {
    pub content: String,
    pub calls: Vec<ToolCall>,
}

/// 管线节点看到的模型能力集合
#[async_trait]
pub trait ModelService: Send + Sync {
    /// 启动前的连接自检；测试替身保持默认的空实现
    async fn check_connection(&self) -> Result<()> {
        Ok(())
    }

    /// 带搜索接地的问答
    async fn grounded_answer(&self, question: &str) -> Result<GroundedAnswer>;

    /// 让模型从调用方提供的前端动作中选择，动作本身在系统外执行
    async fn choose_frontend_action(
        &self,
        messages: &[Message],
        actions: &[FrontendAction],
    ) -> Result<ActionSelection>;

    /// 约束模型通过指定的函数声明返回结构化载荷
    ///
    /// 返回Ok(None)表示模型没有发起匹配的调用（或provider不支持该路径），
    /// 调用方应落入下一级提取策略。
    async fn analysis_tool_call(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        declaration: &Value,
    ) -> Result<Option<Value>>;

    /// 模型原生结构化输出，按StackAnalysis的JSON Schema约束
    async fn extract_stack_analysis(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<StackAnalysis>;

    /// 普通单轮对话
    async fn prompt(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// 基于rig的默认实现
///
/// Gemini时额外持有REST客户端：rig不暴露搜索接地元数据与动态函数声明，
/// 这两条路径直接走generateContent端点；其余provider降级为无接地的普通对话。
pub struct RigModelService {
    llm: LLMClient,
    gemini: Option<GeminiHttpClient>,
}

impl RigModelService {
    pub fn new(config: &LLMConfig) -> Result<Self> {
        let llm = LLMClient::new(config.clone())?;
        let gemini = match config.provider {
            LLMProvider::Gemini => Some(GeminiHttpClient::new(config)?),
            _ => None,
        };
        Ok(Self { llm, gemini })
    }

    /// 把会话消息转为Gemini的role-tagged内容；tool结果按user角色携带
    fn contents_from_messages(messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|message| {
                let role = match message.role {
                    Role::Assistant => "model",
                    Role::System | Role::User | Role::Tool => "user",
                };
                GeminiHttpClient::content(role, &message.content)
            })
            .collect()
    }
}

#[async_trait]
impl ModelService for RigModelService {
    async fn check_connection(&self) -> Result<()> {
        self.llm.check_connection().await
    }

    async fn grounded_answer(&self, question: &str) -> Result<GroundedAnswer> {
        let Some(gemini) = &self.gemini else {
            // 无接地能力的provider仍然回答问题，只是没有搜索查询可报告
            let text = self.llm.prompt(GROUNDED_SYSTEM_PROMPT, question).await?;
            return Ok(GroundedAnswer {
                text,
                web_search_queries: Vec::new(),
            });
        };

        let contents = json!([
            GeminiHttpClient::content("user", GROUNDED_SYSTEM_PROMPT),
            GeminiHttpClient::content("model", GROUNDED_ACK),
            GeminiHttpClient::content("user", question),
        ]);
        let tools = json!([{"google_search": {}}]);

        let reply = gemini.generate(contents, Some(tools)).await?;
        Ok(GroundedAnswer {
            text: reply.text,
            web_search_queries: reply.web_search_queries,
        })
    }

    async fn choose_frontend_action(
        &self,
        messages: &[Message],
        actions: &[FrontendAction],
    ) -> Result<ActionSelection> {
        let Some(gemini) = &self.gemini else {
            let user_prompt = messages
                .last()
                .map(|message| message.content.clone())
                .unwrap_or_default();
            let content = self.llm.prompt(GROUNDED_SYSTEM_PROMPT, &user_prompt).await?;
            return Ok(ActionSelection {
                content,
                calls: Vec::new(),
            });
        };

        let mut contents = vec![GeminiHttpClient::content("user", GROUNDED_SYSTEM_PROMPT)];
        contents.extend(Self::contents_from_messages(messages));

        let declarations: Vec<Value> = actions
            .iter()
            .map(|action| {
                json!({
                    "name": action.name,
                    "description": action.description,
                    "parameters": action.parameters,
                })
            })
            .collect();
        let tools = (!declarations.is_empty())
            .then(|| json!([{"functionDeclarations": declarations}]));

        let reply = gemini.generate(Value::Array(contents), tools).await?;
        let calls = reply
            .function_calls
            .into_iter()
            .map(|call| ToolCall {
                name: call.name,
                args: call.args,
            })
            .collect();
        Ok(ActionSelection {
            content: reply.text,
            calls,
        })
    }

    async fn analysis_tool_call(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        declaration: &Value,
    ) -> Result<Option<Value>> {
        let Some(gemini) = &self.gemini else {
            return Ok(None);
        };

        let contents = json!([
            GeminiHttpClient::content("user", system_prompt),
            GeminiHttpClient::content("user", user_prompt),
        ]);
        let tools = json!([{"functionDeclarations": [declaration]}]);

        let reply = gemini.generate(contents, Some(tools)).await?;
        let expected = declaration.get("name").and_then(Value::as_str);
        let matched = reply
            .function_calls
            .into_iter()
            .find(|call| expected.is_none_or(|name| call.name == name));
        Ok(matched.map(|call| call.args))
    }

    async fn extract_stack_analysis(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<StackAnalysis> {
        self.llm
            .extract::<StackAnalysis>(system_prompt, user_prompt)
            .await
    }

    async fn prompt(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.llm.prompt(system_prompt, user_prompt).await
    }
}
