use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// 消息角色枚举
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// 模型返回的工具调用描述符
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ToolCall {
    /// 工具名称
    pub name: String,
    /// 参数映射
    pub args: Value,
}

/// 对话消息条目，插入顺序即对话顺序
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// 模型选择的前端动作调用（仅assistant消息可能携带）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            tool_calls: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self::new(Role::Tool, content)
    }

    /// 附加模型选择的工具调用
    pub fn with_tool_calls(mut self, calls: Vec<ToolCall>) -> Self {
        if !calls.is_empty() {
            self.tool_calls = Some(calls);
        }
        self
    }
}

/// 工具日志状态
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolLogStatus {
    Processing,
    Completed,
    Failed,
}

impl ToolLogStatus {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ToolLogStatus::Processing)
    }
}

/// 工具日志条目 - 节点执行期间展示给终端用户的进度记录
///
/// 追加时状态为processing，之后恰好发生一次到终态的迁移，
/// 除运行结束时的整体清空外不会被移除。
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ToolLogEntry {
    pub id: String,
    pub message: String,
    pub status: ToolLogStatus,
}

impl ToolLogEntry {
    pub fn processing(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
            status: ToolLogStatus::Processing,
        }
    }
}

/// 调用方提供的前端动作声明，动作的真正执行发生在本系统之外
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FrontendAction {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON Schema形式的参数描述
    #[serde(default = "default_parameters")]
    pub parameters: Value,
}

fn default_parameters() -> Value {
    serde_json::json!({"type": "object", "properties": {}})
}
