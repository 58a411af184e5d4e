//! 问答管线节点 - 搜索接地问答与前端动作选择

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::agent::context::AgentContext;
use crate::agent::nodes::{FINISH, FRONTEND_ACTIONS};
use crate::agent::workflow::{NodeScope, Transition, WorkflowNode};
use crate::types::message::{Message, Role};
use crate::types::state::ConversationState;

/// 入口节点：带搜索接地回答最新的用户消息
///
/// 模型报告的每个搜索查询各生成一条进度日志，日志翻转之间留出固定
/// 延迟，让前端有机会渲染中间状态。
pub struct SearchNode;

#[async_trait]
impl WorkflowNode for SearchNode {
    async fn run(&self, ctx: &AgentContext, scope: &mut NodeScope) -> Result<Transition> {
        let question = scope
            .state()
            .latest_user_content()
            .or_else(|| scope.state().latest_content())
            .unwrap_or_default()
            .to_string();

        let log_id = scope.begin_log("Analyzing the user's query");
        scope.emit().await;

        let answer = ctx.model.grounded_answer(&question).await?;

        scope.complete_log(&log_id);
        scope.emit().await;

        // 回答只写入response，不追加消息；路由依赖的历史形状保持不变
        scope.set_response(&answer.text);

        let delay = ctx.config.agent.search_log_delay_ms;
        for query in &answer.web_search_queries {
            let query_log = scope.begin_log(&format!("Performing Web Search for '{}'", query));
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            scope.emit().await;
            scope.complete_log(&query_log);
            scope.emit().await;
        }

        Ok(Transition::Continue)
    }
}

/// 让模型从调用方声明的前端动作中选择；动作本身在系统外执行
pub struct FeActionsNode;

#[async_trait]
impl WorkflowNode for FeActionsNode {
    async fn run(&self, ctx: &AgentContext, scope: &mut NodeScope) -> Result<Transition> {
        let state = scope.state();
        let selection = ctx
            .model
            .choose_frontend_action(&state.messages, &state.frontend_actions)
            .await?;

        scope.push_message(
            Message::assistant(&selection.content).with_tool_calls(selection.calls),
        );
        scope.emit().await;

        Ok(Transition::Continue)
    }
}

/// 终止节点，状态原样通过
pub struct ChatFinishNode;

#[async_trait]
impl WorkflowNode for ChatFinishNode {
    async fn run(&self, _ctx: &AgentContext, _scope: &mut NodeScope) -> Result<Transition> {
        Ok(Transition::Continue)
    }
}

/// 搜索节点之后的路由
///
/// 搜索节点不追加消息，历史仍以本轮用户消息结尾：倒数第二条来自
/// tool角色说明上一轮动作刚被执行，跳过动作选择直达终止；
/// 消息不足两条时按非tool分支处理。
pub fn route_after_search(state: &ConversationState) -> String {
    match state.second_to_last_role() {
        Some(Role::Tool) => FINISH.to_string(),
        _ => FRONTEND_ACTIONS.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_sends_tool_history_to_finish() {
        let mut state = ConversationState::default();
        state.messages.push(Message::tool("tool output"));
        state.messages.push(Message::user("next question"));
        assert_eq!(route_after_search(&state), FINISH);
    }

    #[test]
    fn test_router_sends_other_roles_to_fe_actions() {
        let mut state = ConversationState::default();
        state.messages.push(Message::user("one"));
        state.messages.push(Message::assistant("two"));
        assert_eq!(route_after_search(&state), FRONTEND_ACTIONS);
    }

    #[test]
    fn test_router_guards_short_histories() {
        let empty = ConversationState::default();
        assert_eq!(route_after_search(&empty), FRONTEND_ACTIONS);

        let mut single = ConversationState::default();
        single.messages.push(Message::user("only one"));
        assert_eq!(route_after_search(&single), FRONTEND_ACTIONS);
    }
}
