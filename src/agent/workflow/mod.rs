//! 工作流引擎 - 以命名节点构成的有向图驱动一次会话运行
//!
//! 节点不直接改写共享状态：每个节点拿到当前状态的快照和一个NodeScope，
//! 把改动记录为StateOp序列；节点返回后由引擎把补丁合并进规范状态。
//! 这样状态的演进只有一个写入方，节点之间不存在隐式的可变引用传递。

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::agent::context::AgentContext;
use crate::agent::emitter::StateEmitter;
use crate::types::message::{Message, ToolLogEntry, ToolLogStatus};
use crate::types::state::ConversationState;

/// 引擎层面的错误；节点内部的失败不会变成这里的错误，而是落入state.error
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("工作流中不存在节点: {0}")]
    UnknownNode(String),

    #[error("节点 {0} 没有出边且不是终止节点")]
    MissingEdge(String),

    #[error("超过步数上限 {0}，疑似路由成环")]
    StepLimitExceeded(usize),
}

/// 对共享状态的一次原子改动
#[derive(Debug, Clone)]
pub enum StateOp {
    PushMessage(Message),
    BeginLog(ToolLogEntry),
    EndLog { id: String, status: ToolLogStatus },
    SetResponse(String),
    SetAnalysis(serde_json::Value),
    SetShowCards(bool),
    SetError(String),
    ClearToolLogs,
}

/// 节点产出的改动序列，按插入顺序应用
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    ops: Vec<StateOp>,
}

impl StatePatch {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    fn push(&mut self, op: StateOp) {
        self.ops.push(op);
    }

    /// 按顺序把全部改动合并进状态
    ///
    /// 日志的终态迁移只在条目仍为processing时生效，之后的迁移被忽略，
    /// 保证每个条目恰好经历一次processing到终态的变化。
    pub fn apply(&self, state: &mut ConversationState) {
        for op in &self.ops {
            match op {
                StateOp::PushMessage(message) => state.messages.push(message.clone()),
                StateOp::BeginLog(entry) => state.tool_logs.push(entry.clone()),
                StateOp::EndLog { id, status } => {
                    if let Some(entry) = state.tool_logs.iter_mut().find(|entry| entry.id == *id) {
                        if entry.status == ToolLogStatus::Processing {
                            entry.status = *status;
                        }
                    }
                }
                StateOp::SetResponse(text) => state.response = Some(text.clone()),
                StateOp::SetAnalysis(value) => state.analysis = value.clone(),
                StateOp::SetShowCards(flag) => state.show_cards = *flag,
                StateOp::SetError(message) => state.error = Some(message.clone()),
                StateOp::ClearToolLogs => state.tool_logs.clear(),
            }
        }
    }
}

/// 节点工作时的状态视图与改动记录器
pub struct NodeScope {
    base: ConversationState,
    patch: StatePatch,
    emitter: Arc<dyn StateEmitter>,
}

impl NodeScope {
    pub fn new(base: ConversationState, emitter: Arc<dyn StateEmitter>) -> Self {
        Self {
            base,
            patch: StatePatch::default(),
            emitter,
        }
    }

    /// 节点入口处的只读快照
    pub fn state(&self) -> &ConversationState {
        &self.base
    }

    /// 快照加上已记录改动后的当前视图
    pub fn current(&self) -> ConversationState {
        let mut state = self.base.clone();
        self.patch.apply(&mut state);
        state
    }

    /// 向观察方发布当前视图
    pub async fn emit(&self) {
        self.emitter.emit(&self.current()).await;
    }

    /// 追加一条processing日志，返回其id以便之后迁移到终态
    pub fn begin_log(&mut self, message: &str) -> String {
        let entry = ToolLogEntry::processing(Uuid::new_v4().to_string(), message);
        let id = entry.id.clone();
        self.patch.push(StateOp::BeginLog(entry));
        id
    }

    pub fn complete_log(&mut self, id: &str) {
        self.patch.push(StateOp::EndLog {
            id: id.to_string(),
            status: ToolLogStatus::Completed,
        });
    }

    pub fn fail_log(&mut self, id: &str) {
        self.patch.push(StateOp::EndLog {
            id: id.to_string(),
            status: ToolLogStatus::Failed,
        });
    }

    pub fn push_message(&mut self, message: Message) {
        self.patch.push(StateOp::PushMessage(message));
    }

    pub fn set_response(&mut self, text: &str) {
        self.patch.push(StateOp::SetResponse(text.to_string()));
    }

    pub fn set_analysis(&mut self, value: serde_json::Value) {
        self.patch.push(StateOp::SetAnalysis(value));
    }

    pub fn set_show_cards(&mut self, flag: bool) {
        self.patch.push(StateOp::SetShowCards(flag));
    }

    pub fn set_error(&mut self, message: &str) {
        self.patch.push(StateOp::SetError(message.to_string()));
    }

    pub fn clear_tool_logs(&mut self) {
        self.patch.push(StateOp::ClearToolLogs);
    }

    pub fn into_patch(self) -> StatePatch {
        self.patch
    }
}

/// 节点返回的走向
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// 沿静态接线的出边继续
    Continue,
    /// 显式跳转到指定节点
    Goto(String),
}

/// 工作流中的一个命名工作单元
#[async_trait]
pub trait WorkflowNode: Send + Sync {
    async fn run(&self, ctx: &AgentContext, scope: &mut NodeScope) -> Result<Transition>;
}

/// 节点的出边：固定接线或基于状态的路由函数
pub enum Edge {
    To(String),
    Conditional(Box<dyn Fn(&ConversationState) -> String + Send + Sync>),
}

/// 有向图本体
pub struct Workflow {
    nodes: HashMap<String, Arc<dyn WorkflowNode>>,
    edges: HashMap<String, Edge>,
    entry: String,
    finish: String,
}

impl Workflow {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            entry: String::new(),
            finish: String::new(),
        }
    }

    pub fn add_node(mut self, name: &str, node: Arc<dyn WorkflowNode>) -> Self {
        self.nodes.insert(name.to_string(), node);
        self
    }

    pub fn add_edge(mut self, from: &str, to: &str) -> Self {
        self.edges.insert(from.to_string(), Edge::To(to.to_string()));
        self
    }

    pub fn add_conditional_edge(
        mut self,
        from: &str,
        router: impl Fn(&ConversationState) -> String + Send + Sync + 'static,
    ) -> Self {
        self.edges
            .insert(from.to_string(), Edge::Conditional(Box::new(router)));
        self
    }

    pub fn set_entry(mut self, name: &str) -> Self {
        self.entry = name.to_string();
        self
    }

    pub fn set_finish(mut self, name: &str) -> Self {
        self.finish = name.to_string();
        self
    }

    /// 从入口节点执行到终止节点
    ///
    /// 节点返回Err时运行不中断：已记录的部分补丁照常合并，错误落入
    /// state.error，尚在processing的日志统一翻为failed，然后直接走终止节点，
    /// 保证每次运行都到达终态。
    pub async fn run(
        &self,
        ctx: &AgentContext,
        initial: ConversationState,
    ) -> Result<ConversationState, WorkflowError> {
        let step_limit = ctx.config.agent.step_limit;
        let mut state = initial;
        let mut current = self.entry.clone();
        let mut steps = 0usize;

        loop {
            steps += 1;
            if steps > step_limit {
                return Err(WorkflowError::StepLimitExceeded(step_limit));
            }

            let node = self
                .nodes
                .get(&current)
                .ok_or_else(|| WorkflowError::UnknownNode(current.clone()))?;

            let mut scope = NodeScope::new(state.clone(), ctx.emitter.clone());
            let outcome = node.run(ctx, &mut scope).await;
            scope.into_patch().apply(&mut state);

            match outcome {
                Ok(transition) => {
                    ctx.emitter.emit(&state).await;
                    if current == self.finish {
                        return Ok(state);
                    }
                    current = match transition {
                        Transition::Goto(next) => next,
                        Transition::Continue => match self.edges.get(&current) {
                            Some(Edge::To(next)) => next.clone(),
                            Some(Edge::Conditional(router)) => router(&state),
                            None => return Err(WorkflowError::MissingEdge(current)),
                        },
                    };
                }
                Err(e) => {
                    eprintln!("❌ 节点 {} 执行失败: {}", current, e);
                    state.error = Some(e.to_string());
                    fail_open_logs(&mut state);
                    ctx.emitter.emit(&state).await;
                    if current == self.finish {
                        return Ok(state);
                    }
                    current = self.finish.clone();
                }
            }
        }
    }
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new()
    }
}

/// 把所有仍在processing的日志翻为failed
fn fail_open_logs(state: &mut ConversationState) {
    for entry in &mut state.tool_logs {
        if entry.status == ToolLogStatus::Processing {
            entry.status = ToolLogStatus::Failed;
        }
    }
}

// Include tests
#[cfg(test)]
mod tests;
