use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::message::{FrontendAction, Message, Role, ToolLogEntry};

/// 一次工作流运行内各节点共享的对话状态
///
/// 运行开始时由最新消息与检查点恢复的状态构建，节点通过补丁更新，
/// 运行结束时写回检查点。
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ConversationState {
    /// 有序的消息列表
    #[serde(default)]
    pub messages: Vec<Message>,
    /// 工具日志列表，追加写、按插入顺序渲染
    #[serde(default)]
    pub tool_logs: Vec<ToolLogEntry>,
    /// 问答管线的响应文本（仓库分析管线中为叙述性总结）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// 仓库分析管线的载荷：{"context": ...}、{"context": ..., "stack": ...} 或 {"error": ...}
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub analysis: Value,
    /// 是否提示前端展示结构化分析卡片
    #[serde(default)]
    pub show_cards: bool,
    /// 调用方提供的前端动作声明
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frontend_actions: Vec<FrontendAction>,
    /// 工作流级失败信息，终态时供前端渲染
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConversationState {
    /// 最近一条用户消息的内容
    pub fn latest_user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    /// 最近一条消息的内容
    pub fn latest_content(&self) -> Option<&str> {
        self.messages.last().map(|m| m.content.as_str())
    }

    /// 倒数第二条消息的角色，消息不足两条时为None
    pub fn second_to_last_role(&self) -> Option<Role> {
        if self.messages.len() < 2 {
            return None;
        }
        Some(self.messages[self.messages.len() - 2].role)
    }

    /// analysis载荷中是否携带错误
    pub fn analysis_error(&self) -> Option<&str> {
        self.analysis.get("error").and_then(Value::as_str)
    }
}
