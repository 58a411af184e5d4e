use super::*;
use crate::agent::emitter::MemoryEmitter;
use crate::config::Config;
use crate::github::{Fetch, RepoDataSource, RootItem};
use crate::llm::ModelService;
use crate::llm::service::{ActionSelection, GroundedAnswer};
use crate::types::analysis::StackAnalysis;
use crate::types::message::{FrontendAction, Role};
use serde_json::Value;
use std::collections::BTreeMap;

struct StubModel;

#[async_trait]
impl ModelService for StubModel {
    async fn grounded_answer(&self, _question: &str) -> Result<GroundedAnswer> {
        Ok(GroundedAnswer::default())
    }

    async fn choose_frontend_action(
        &self,
        _messages: &[Message],
        _actions: &[FrontendAction],
    ) -> Result<ActionSelection> {
        Ok(ActionSelection::default())
    }

    async fn analysis_tool_call(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        _declaration: &Value,
    ) -> Result<Option<Value>> {
        Ok(None)
    }

    async fn extract_stack_analysis(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
    ) -> Result<StackAnalysis> {
        Ok(StackAnalysis::default())
    }

    async fn prompt(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        Ok(String::new())
    }
}

struct StubSource;

#[async_trait]
impl RepoDataSource for StubSource {
    async fn repo_info(&self, _owner: &str, _repo: &str) -> Fetch<Value> {
        Fetch::Absent
    }

    async fn languages(&self, _owner: &str, _repo: &str) -> Fetch<BTreeMap<String, u64>> {
        Fetch::Absent
    }

    async fn readme(&self, _owner: &str, _repo: &str) -> Fetch<String> {
        Fetch::Absent
    }

    async fn list_root(&self, _owner: &str, _repo: &str) -> Fetch<Vec<RootItem>> {
        Fetch::Absent
    }

    async fn file_content(
        &self,
        _owner: &str,
        _repo: &str,
        _default_branch: Option<&str>,
        _item: &RootItem,
    ) -> Fetch<String> {
        Fetch::Absent
    }
}

fn test_context(emitter: Arc<MemoryEmitter>) -> AgentContext {
    AgentContext::with_components(
        Arc::new(StubModel),
        Arc::new(StubSource),
        emitter,
        Config::default(),
    )
}

/// 记录一条日志并追加一条消息的简单节点
struct RecordingNode {
    content: &'static str,
}

#[async_trait]
impl WorkflowNode for RecordingNode {
    async fn run(&self, _ctx: &AgentContext, scope: &mut NodeScope) -> Result<Transition> {
        let log_id = scope.begin_log(self.content);
        scope.emit().await;
        scope.push_message(Message::assistant(self.content));
        scope.complete_log(&log_id);
        Ok(Transition::Continue)
    }
}

struct PassthroughNode;

#[async_trait]
impl WorkflowNode for PassthroughNode {
    async fn run(&self, _ctx: &AgentContext, _scope: &mut NodeScope) -> Result<Transition> {
        Ok(Transition::Continue)
    }
}

struct FailingNode;

#[async_trait]
impl WorkflowNode for FailingNode {
    async fn run(&self, _ctx: &AgentContext, scope: &mut NodeScope) -> Result<Transition> {
        scope.begin_log("doomed step");
        scope.push_message(Message::assistant("partial work"));
        anyhow::bail!("upstream exploded")
    }
}

struct LoopNode;

#[async_trait]
impl WorkflowNode for LoopNode {
    async fn run(&self, _ctx: &AgentContext, _scope: &mut NodeScope) -> Result<Transition> {
        Ok(Transition::Goto("loop".to_string()))
    }
}

#[test]
fn test_patch_applies_ops_in_order() {
    let mut patch = StatePatch::default();
    let entry = ToolLogEntry::processing("log-1", "working");
    patch.push(StateOp::BeginLog(entry));
    patch.push(StateOp::PushMessage(Message::user("hi")));
    patch.push(StateOp::EndLog {
        id: "log-1".to_string(),
        status: ToolLogStatus::Completed,
    });
    patch.push(StateOp::SetResponse("done".to_string()));

    let mut state = ConversationState::default();
    patch.apply(&mut state);

    assert_eq!(state.messages.len(), 1);
    assert_eq!(state.tool_logs.len(), 1);
    assert_eq!(state.tool_logs[0].status, ToolLogStatus::Completed);
    assert_eq!(state.response.as_deref(), Some("done"));
}

#[test]
fn test_log_transitions_exactly_once() {
    let mut patch = StatePatch::default();
    patch.push(StateOp::BeginLog(ToolLogEntry::processing("log-1", "step")));
    patch.push(StateOp::EndLog {
        id: "log-1".to_string(),
        status: ToolLogStatus::Completed,
    });
    // 第二次迁移必须被忽略
    patch.push(StateOp::EndLog {
        id: "log-1".to_string(),
        status: ToolLogStatus::Failed,
    });

    let mut state = ConversationState::default();
    patch.apply(&mut state);
    assert_eq!(state.tool_logs[0].status, ToolLogStatus::Completed);
}

#[test]
fn test_clear_tool_logs() {
    let mut state = ConversationState::default();
    state
        .tool_logs
        .push(ToolLogEntry::processing("log-1", "old"));

    let mut patch = StatePatch::default();
    patch.push(StateOp::ClearToolLogs);
    patch.apply(&mut state);
    assert!(state.tool_logs.is_empty());
}

#[test]
fn test_scope_current_includes_pending_ops() {
    let emitter = Arc::new(MemoryEmitter::new());
    let mut scope = NodeScope::new(ConversationState::default(), emitter);
    let log_id = scope.begin_log("in flight");

    let current = scope.current();
    assert_eq!(current.tool_logs.len(), 1);
    assert_eq!(current.tool_logs[0].id, log_id);
    assert_eq!(current.tool_logs[0].status, ToolLogStatus::Processing);
    // 基态不受影响
    assert!(scope.state().tool_logs.is_empty());
}

#[tokio::test]
async fn test_linear_run_reaches_finish() {
    let emitter = Arc::new(MemoryEmitter::new());
    let ctx = test_context(emitter.clone());

    let workflow = Workflow::new()
        .add_node("first", Arc::new(RecordingNode { content: "step one" }))
        .add_node("second", Arc::new(RecordingNode { content: "step two" }))
        .add_node("finish", Arc::new(PassthroughNode))
        .add_edge("first", "second")
        .add_edge("second", "finish")
        .set_entry("first")
        .set_finish("finish");

    let final_state = workflow.run(&ctx, ConversationState::default()).await.unwrap();

    assert_eq!(final_state.messages.len(), 2);
    assert_eq!(final_state.messages[0].content, "step one");
    assert_eq!(final_state.messages[1].content, "step two");
    assert!(final_state.error.is_none());
    assert!(
        final_state
            .tool_logs
            .iter()
            .all(|entry| entry.status == ToolLogStatus::Completed)
    );

    // 节点内emit两次 + 引擎每节点一次
    let snapshots = emitter.snapshots().await;
    assert_eq!(snapshots.len(), 5);
}

#[tokio::test]
async fn test_conditional_edge_routes_on_state() {
    let emitter = Arc::new(MemoryEmitter::new());
    let ctx = test_context(emitter);

    let workflow = Workflow::new()
        .add_node("entry", Arc::new(PassthroughNode))
        .add_node("tool_branch", Arc::new(RecordingNode { content: "tool path" }))
        .add_node("finish", Arc::new(PassthroughNode))
        .add_conditional_edge("entry", |state: &ConversationState| {
            if state.second_to_last_role() == Some(Role::Tool) {
                "finish".to_string()
            } else {
                "tool_branch".to_string()
            }
        })
        .add_edge("tool_branch", "finish")
        .set_entry("entry")
        .set_finish("finish");

    let mut with_tool = ConversationState::default();
    with_tool.messages.push(Message::tool("tool result"));
    with_tool.messages.push(Message::user("follow-up"));
    let final_state = workflow.run(&ctx, with_tool).await.unwrap();
    assert!(final_state.messages.iter().all(|m| m.content != "tool path"));

    let mut without_tool = ConversationState::default();
    without_tool.messages.push(Message::user("hello"));
    let final_state = workflow.run(&ctx, without_tool).await.unwrap();
    assert!(final_state.messages.iter().any(|m| m.content == "tool path"));
}

#[tokio::test]
async fn test_node_error_reaches_terminal_state() {
    let emitter = Arc::new(MemoryEmitter::new());
    let ctx = test_context(emitter);

    let workflow = Workflow::new()
        .add_node("boom", Arc::new(FailingNode))
        .add_node("never", Arc::new(RecordingNode { content: "unreachable" }))
        .add_node("finish", Arc::new(PassthroughNode))
        .add_edge("boom", "never")
        .add_edge("never", "finish")
        .set_entry("boom")
        .set_finish("finish");

    let final_state = workflow.run(&ctx, ConversationState::default()).await.unwrap();

    assert_eq!(final_state.error.as_deref(), Some("upstream exploded"));
    // 部分补丁照常合并
    assert_eq!(final_state.messages.len(), 1);
    assert_eq!(final_state.messages[0].content, "partial work");
    // 没有日志停留在processing
    assert!(
        final_state
            .tool_logs
            .iter()
            .all(|entry| entry.status == ToolLogStatus::Failed)
    );
    // 失败后直奔终止节点，跳过了中间节点
    assert!(final_state.messages.iter().all(|m| m.content != "unreachable"));
}

#[tokio::test]
async fn test_step_limit_breaks_routing_cycle() {
    let emitter = Arc::new(MemoryEmitter::new());
    let ctx = test_context(emitter);

    let workflow = Workflow::new()
        .add_node("loop", Arc::new(LoopNode))
        .add_node("finish", Arc::new(PassthroughNode))
        .set_entry("loop")
        .set_finish("finish");

    let result = workflow.run(&ctx, ConversationState::default()).await;
    assert!(matches!(result, Err(WorkflowError::StepLimitExceeded(_))));
}

#[tokio::test]
async fn test_unknown_entry_node_is_engine_error() {
    let emitter = Arc::new(MemoryEmitter::new());
    let ctx = test_context(emitter);

    let workflow = Workflow::new()
        .add_node("finish", Arc::new(PassthroughNode))
        .set_entry("missing")
        .set_finish("finish");

    let result = workflow.run(&ctx, ConversationState::default()).await;
    assert!(matches!(result, Err(WorkflowError::UnknownNode(name)) if name == "missing"));
}

#[tokio::test]
async fn test_missing_edge_is_engine_error() {
    let emitter = Arc::new(MemoryEmitter::new());
    let ctx = test_context(emitter);

    let workflow = Workflow::new()
        .add_node("lonely", Arc::new(PassthroughNode))
        .add_node("finish", Arc::new(PassthroughNode))
        .set_entry("lonely")
        .set_finish("finish");

    let result = workflow.run(&ctx, ConversationState::default()).await;
    assert!(matches!(result, Err(WorkflowError::MissingEdge(name)) if name == "lonely"));
}
