//! 仓库分析管线节点 - 收集GitHub上下文并生成结构化技术栈分析

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};

use crate::agent::context::AgentContext;
use crate::agent::workflow::{NodeScope, Transition, WorkflowNode};
use crate::config::AgentConfig;
use crate::github::{RepoContext, gather_repo_context, parse_github_url};
use crate::llm::ModelService;
use crate::types::analysis::StackAnalysis;
use crate::types::message::Message;

/// 消息里找不到仓库URL时写入analysis的错误文案
pub const NO_URL_ERROR: &str =
    "Could not parse GitHub URL from input. Provide a URL like https://github.com/owner/repo";

const ANALYSIS_SYSTEM_PROMPT: &str = "You are a senior software architect. Analyze the repository \
information provided by the user and report your findings by calling the return_stack_analysis \
function exactly once.";

const EXTRACT_SYSTEM_PROMPT: &str = "You are a senior software architect. Extract a structured \
technology stack analysis from the repository information provided by the user.";

const RAW_JSON_SYSTEM_PROMPT: &str = "You are a senior software architect. Analyze the repository \
information provided by the user and respond with a single JSON object with keys: purpose, \
frontend, backend, database, infrastructure, ci_cd, key_root_files, how_to_run, risks_notes. \
Respond with JSON only.";

const SUMMARY_SYSTEM_PROMPT: &str = "You are a senior software architect. Write a concise, \
readable summary of the repository's purpose and technology stack for a developer audience. \
Respond with plain prose, not JSON.";

/// 入口节点：从最新消息提取仓库URL并收集仓库上下文
pub struct GatherContextNode;

#[async_trait]
impl WorkflowNode for GatherContextNode {
    async fn run(&self, ctx: &AgentContext, scope: &mut NodeScope) -> Result<Transition> {
        let input = scope
            .state()
            .latest_user_content()
            .or_else(|| scope.state().latest_content())
            .unwrap_or_default()
            .to_string();

        let parse_log = scope.begin_log("Parsing GitHub URL");
        scope.emit().await;

        let Some((owner, repo)) = parse_github_url(&input) else {
            scope.fail_log(&parse_log);
            scope.emit().await;
            scope.set_analysis(json!({"error": NO_URL_ERROR}));
            return Ok(Transition::Continue);
        };

        scope.complete_log(&parse_log);
        let fetch_log = scope.begin_log("Fetching repository metadata");
        scope.emit().await;

        let context = gather_repo_context(ctx.github.as_ref(), &owner, &repo).await;

        scope.complete_log(&fetch_log);
        scope.emit().await;
        scope.set_analysis(json!({"context": context}));

        Ok(Transition::Continue)
    }
}

/// 分析节点：构建提示词，走三级提取，再生成叙述性总结
pub struct AnalyzeNode;

#[async_trait]
impl WorkflowNode for AnalyzeNode {
    async fn run(&self, ctx: &AgentContext, scope: &mut NodeScope) -> Result<Transition> {
        // 上游已写入错误时不再调用模型，把错误作为响应透出
        let analysis_error = scope.state().analysis_error().map(str::to_string);
        if let Some(error) = analysis_error {
            scope.set_response(&error);
            return Ok(Transition::Continue);
        }

        let context: RepoContext = scope
            .state()
            .analysis
            .get("context")
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default();

        let analyze_log = scope.begin_log("Analyzing technology stack");
        scope.emit().await;

        let prompt = build_analysis_prompt(&context, &ctx.config.agent);
        let extraction = extract_stack_payload(ctx.model.as_ref(), &prompt).await;

        let stack_value = match extraction {
            Extraction::Structured(stack) => {
                serde_json::to_value(stack).unwrap_or_else(|_| Value::Object(Default::default()))
            }
            Extraction::Unvalidated(value) => value,
            Extraction::Failed(reason) => {
                scope.fail_log(&analyze_log);
                scope.emit().await;
                let message = format!("Stack analysis failed: {}", reason);
                scope.set_analysis(json!({"error": message}));
                scope.set_response(&message);
                return Ok(Transition::Continue);
            }
        };

        scope.complete_log(&analyze_log);
        scope.emit().await;

        scope.set_analysis(json!({"context": &context, "stack": &stack_value}));
        scope.set_show_cards(true);

        // 二次调用生成叙述性总结；失败时退化为结构化结果的JSON文本
        let narrative = match ctx.model.prompt(SUMMARY_SYSTEM_PROMPT, &prompt).await {
            Ok(text) => text,
            Err(e) => {
                eprintln!("⚠️ 总结生成失败，回退为JSON输出: {}", e);
                serde_json::to_string_pretty(&stack_value).unwrap_or_default()
            }
        };

        let response = format!(
            "High-level stack analysis for {}/{}:\n\n{}",
            context.owner, context.repo, narrative
        );
        scope.set_response(&response);
        scope.push_message(Message::assistant(&response));

        Ok(Transition::Continue)
    }
}

/// 终止节点：清空工具日志并发布最终快照，让前端收起进度指示
pub struct AnalysisFinishNode;

#[async_trait]
impl WorkflowNode for AnalysisFinishNode {
    async fn run(&self, _ctx: &AgentContext, scope: &mut NodeScope) -> Result<Transition> {
        scope.clear_tool_logs();
        scope.emit().await;
        Ok(Transition::Continue)
    }
}

/// 结构化提取的穷尽结果
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// 通过了StackAnalysis校验
    Structured(StackAnalysis),
    /// 拿到了JSON载荷但不符合预期形状，按原样传递
    Unvalidated(Value),
    /// 三级策略全部失败
    Failed(String),
}

/// 三级提取：函数调用 → 模型原生结构化输出 → 原始文本JSON解析
///
/// 每一级失败只记录原因并落入下一级；全部失败才返回Failed。
pub async fn extract_stack_payload(model: &dyn ModelService, prompt: &str) -> Extraction {
    let declaration = return_analysis_declaration();
    match model
        .analysis_tool_call(ANALYSIS_SYSTEM_PROMPT, prompt, &declaration)
        .await
    {
        Ok(Some(args)) => {
            return match serde_json::from_value::<StackAnalysis>(args.clone()) {
                Ok(stack) => Extraction::Structured(stack),
                Err(_) => Extraction::Unvalidated(args),
            };
        }
        Ok(None) => {}
        Err(e) => eprintln!("⚠️ 函数调用提取失败，尝试结构化输出: {}", e),
    }

    match model
        .extract_stack_analysis(EXTRACT_SYSTEM_PROMPT, prompt)
        .await
    {
        Ok(stack) => return Extraction::Structured(stack),
        Err(e) => eprintln!("⚠️ 结构化输出提取失败，尝试解析原始文本: {}", e),
    }

    match model.prompt(RAW_JSON_SYSTEM_PROMPT, prompt).await {
        Ok(text) => match parse_json_block(&text) {
            Some(value) => match serde_json::from_value::<StackAnalysis>(value.clone()) {
                Ok(stack) => Extraction::Structured(stack),
                Err(_) => Extraction::Unvalidated(value),
            },
            None => Extraction::Failed("model output was not valid JSON".to_string()),
        },
        Err(e) => Extraction::Failed(e.to_string()),
    }
}

/// return_stack_analysis的函数声明，参数即StackAnalysis的JSON Schema
pub fn return_analysis_declaration() -> Value {
    let schema = serde_json::to_value(schemars::schema_for!(StackAnalysis))
        .unwrap_or_else(|_| json!({}));
    json!({
        "name": "return_stack_analysis",
        "description": "Report the structured technology stack analysis of the repository.",
        "parameters": schema,
    })
}

/// 把收集到的仓库上下文嵌入分析提示词
///
/// README与各manifest按配置的字符预算截断以约束提示词长度；
/// manifest按文件名排序，提示词内容是确定性的。
pub fn build_analysis_prompt(context: &RepoContext, agent: &AgentConfig) -> String {
    let repo_info = serde_json::to_string_pretty(&context.repo_info).unwrap_or_default();
    let languages = serde_json::to_string_pretty(&context.languages).unwrap_or_default();

    let root_files: Vec<String> = context
        .root_files
        .iter()
        .map(|entry| format!("{} ({})", entry.name, entry.entry_type))
        .collect();
    let root_files = serde_json::to_string_pretty(&root_files).unwrap_or_default();

    let truncated_manifests: std::collections::BTreeMap<&str, String> = context
        .manifests
        .iter()
        .map(|(name, text)| {
            (
                name.as_str(),
                truncate_chars(text, agent.manifest_truncate_chars),
            )
        })
        .collect();
    let manifests = serde_json::to_string_pretty(&truncated_manifests).unwrap_or_default();

    format!(
        "You are a senior software architect. Analyze the following GitHub repository at a high level.\n\
        Goals: Provide a concise, structured overview of what the project does and the tech stack.\n\n\
        Return JSON with keys: purpose, frontend, backend, database, infrastructure, ci_cd, key_root_files, how_to_run, risks_notes.\n\n\
        Repository metadata:\n{}\n\n\
        Languages (bytes of code):\n{}\n\n\
        Root items:\n{}\n\n\
        Manifests (truncated to first {} chars each):\n{}\n\n\
        README content (truncated to first {} chars):\n{}\n\n\
        Infer the stack with specific frameworks and libraries when possible (e.g., Next.js, Express, FastAPI, Prisma, Postgres).",
        repo_info,
        languages,
        root_files,
        agent.manifest_truncate_chars,
        manifests,
        agent.readme_truncate_chars,
        truncate_chars(&context.readme, agent.readme_truncate_chars),
    )
}

/// 按字符数截断，多字节内容也不会切在编码边界上
pub fn truncate_chars(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        text.to_string()
    } else {
        text.chars().take(budget).collect()
    }
}

/// 尽力把模型的原始文本解析为JSON
///
/// 依次尝试：整段解析、```json围栏块、首个'{'到末个'}'的子串。
pub fn parse_json_block(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        if let Some(end) = body.find("```") {
            if let Ok(value) = serde_json::from_str::<Value>(body[..end].trim()) {
                return Some(value);
            }
        }
    }

    let first = trimmed.find('{')?;
    let last = trimmed.rfind('}')?;
    if last <= first {
        return None;
    }
    serde_json::from_str::<Value>(&trimmed[first..=last]).ok()
}
