//! 状态发布 - 向观察方单向推送状态快照
//!
//! 发布是fire-and-forget：观察方不回执，也不会反压运行本身。

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{Mutex, mpsc};

use crate::types::message::ToolLogStatus;
use crate::types::state::ConversationState;

/// 状态快照的单向发布通道
#[async_trait]
pub trait StateEmitter: Send + Sync {
    async fn emit(&self, state: &ConversationState);
}

/// 不做任何事的发布器
pub struct NullEmitter;

#[async_trait]
impl StateEmitter for NullEmitter {
    async fn emit(&self, _state: &ConversationState) {}
}

/// 把工具日志的状态变化打印到控制台
///
/// 同一(id, status)组合只打印一次，重复快照不会刷屏。
pub struct ConsoleEmitter {
    reported: Mutex<HashMap<String, ToolLogStatus>>,
}

impl ConsoleEmitter {
    pub fn new() -> Self {
        Self {
            reported: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for ConsoleEmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateEmitter for ConsoleEmitter {
    async fn emit(&self, state: &ConversationState) {
        let mut reported = self.reported.lock().await;
        for entry in &state.tool_logs {
            let seen = reported.get(&entry.id).copied();
            if seen == Some(entry.status) {
                continue;
            }
            match entry.status {
                ToolLogStatus::Processing => println!("🔄 {}", entry.message),
                ToolLogStatus::Completed => println!("✅ {}", entry.message),
                ToolLogStatus::Failed => println!("❌ {}", entry.message),
            }
            reported.insert(entry.id.clone(), entry.status);
        }
    }
}

/// 通过tokio通道转发快照，用于接入外部前端桥
pub struct ChannelEmitter {
    sender: mpsc::UnboundedSender<ConversationState>,
}

impl ChannelEmitter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ConversationState>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl StateEmitter for ChannelEmitter {
    async fn emit(&self, state: &ConversationState) {
        // 接收端关闭时静默丢弃，发布不影响运行
        let _ = self.sender.send(state.clone());
    }
}

/// 收集全部快照，供测试断言中间进度
pub struct MemoryEmitter {
    snapshots: Mutex<Vec<ConversationState>>,
}

impl MemoryEmitter {
    pub fn new() -> Self {
        Self {
            snapshots: Mutex::new(Vec::new()),
        }
    }

    pub async fn snapshots(&self) -> Vec<ConversationState> {
        self.snapshots.lock().await.clone()
    }
}

impl Default for MemoryEmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateEmitter for MemoryEmitter {
    async fn emit(&self, state: &ConversationState) {
        self.snapshots.lock().await.push(state.clone());
    }
}
