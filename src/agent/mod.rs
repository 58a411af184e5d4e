//! 会话编排层 - 两条管线的装配与运行入口

pub mod checkpoint;
pub mod context;
pub mod emitter;
pub mod nodes;
pub mod workflow;

use anyhow::Result;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::Config;
use crate::types::message::{FrontendAction, Message};
use crate::types::state::ConversationState;

pub use context::AgentContext;
use nodes::{chat, stack};
use workflow::Workflow;

/// 问答管线：analyze_and_search → (路由) → frontend_actions | finish
pub fn chat_workflow() -> Workflow {
    Workflow::new()
        .add_node(nodes::ANALYZE_AND_SEARCH, Arc::new(chat::SearchNode))
        .add_node(nodes::FRONTEND_ACTIONS, Arc::new(chat::FeActionsNode))
        .add_node(nodes::FINISH, Arc::new(chat::ChatFinishNode))
        .add_conditional_edge(nodes::ANALYZE_AND_SEARCH, chat::route_after_search)
        .add_edge(nodes::FRONTEND_ACTIONS, nodes::FINISH)
        .set_entry(nodes::ANALYZE_AND_SEARCH)
        .set_finish(nodes::FINISH)
}

/// 仓库分析管线：gather_context → analyze → finish，严格线性
pub fn analysis_workflow() -> Workflow {
    Workflow::new()
        .add_node(nodes::GATHER_CONTEXT, Arc::new(stack::GatherContextNode))
        .add_node(nodes::ANALYZE, Arc::new(stack::AnalyzeNode))
        .add_node(nodes::FINISH, Arc::new(stack::AnalysisFinishNode))
        .add_edge(nodes::GATHER_CONTEXT, nodes::ANALYZE)
        .add_edge(nodes::ANALYZE, nodes::FINISH)
        .set_entry(nodes::GATHER_CONTEXT)
        .set_finish(nodes::FINISH)
}

/// 可选择的管线种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    Chat,
    StackAnalysis,
}

impl FromStr for PipelineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chat" => Ok(PipelineKind::Chat),
            "stack" | "stack-analysis" | "analysis" => Ok(PipelineKind::StackAnalysis),
            other => Err(format!(
                "未知管线: {}（可选: chat, stack-analysis）",
                other
            )),
        }
    }
}

impl std::fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineKind::Chat => write!(f, "chat"),
            PipelineKind::StackAnalysis => write!(f, "stack-analysis"),
        }
    }
}

/// 按线程续聊的运行时：恢复检查点、跑管线、写回检查点
pub struct AgentRuntime {
    ctx: AgentContext,
}

impl AgentRuntime {
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            ctx: AgentContext::new(config)?,
        })
    }

    /// 用现成的上下文组装运行时，测试与嵌入方使用
    pub fn with_context(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &AgentContext {
        &self.ctx
    }

    /// 处理一条用户消息并返回终态
    pub async fn handle_message(
        &self,
        pipeline: PipelineKind,
        thread_id: &str,
        text: &str,
        actions: Vec<FrontendAction>,
    ) -> Result<ConversationState> {
        let mut state = self
            .ctx
            .checkpointer
            .read()
            .await
            .restore(thread_id)
            .unwrap_or_default();

        // 瞬态字段只属于单次运行，续聊前清空
        state.tool_logs.clear();
        state.response = None;
        state.error = None;
        state.show_cards = false;
        state.analysis = Value::Null;
        state.frontend_actions = actions;

        state.messages.push(Message::user(text));

        let workflow = match pipeline {
            PipelineKind::Chat => chat_workflow(),
            PipelineKind::StackAnalysis => analysis_workflow(),
        };
        let final_state = workflow.run(&self.ctx, state).await?;

        self.ctx
            .checkpointer
            .write()
            .await
            .save(thread_id, final_state.clone());

        Ok(final_state)
    }
}

/// 运行一条消息并把结果打印到控制台
pub async fn launch(
    config: &Config,
    pipeline: PipelineKind,
    thread_id: &str,
    message: &str,
) -> Result<()> {
    let runtime = AgentRuntime::new(config.clone())?;

    // 启动时检查模型连接
    runtime.context().model.check_connection().await?;

    let state = runtime
        .handle_message(pipeline, thread_id, message, Vec::new())
        .await?;

    if let Some(error) = &state.error {
        eprintln!("❌ 运行失败: {}", error);
    }
    if let Some(response) = &state.response {
        println!("{}", response);
    }
    if state.show_cards {
        if let Some(stack_value) = state.analysis.get("stack") {
            println!("\n{}", serde_json::to_string_pretty(stack_value)?);
        }
    }

    Ok(())
}
