//! 内存检查点 - 按会话线程保存最新状态，支持跨轮续聊
//!
//! 仅进程内存储，不落盘；跨运行的状态隔离由这里负责。

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::types::state::ConversationState;

/// 单个检查点的元数据
#[derive(Debug, Clone)]
pub struct CheckpointMeta {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub save_count: u64,
}

#[derive(Debug, Clone)]
struct Checkpoint {
    state: ConversationState,
    meta: CheckpointMeta,
}

/// 检查点存储的整体使用情况
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckpointStats {
    pub thread_count: usize,
    pub total_messages: usize,
    pub total_saves: u64,
}

/// 按线程id保存最新会话状态的内存存储
#[derive(Debug, Default)]
pub struct MemoryCheckpointer {
    entries: HashMap<String, Checkpoint>,
}

impl MemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存线程的最新状态，重复保存时累计计数并更新时间
    pub fn save(&mut self, thread_id: &str, state: ConversationState) {
        let now = Utc::now();
        match self.entries.get_mut(thread_id) {
            Some(checkpoint) => {
                checkpoint.state = state;
                checkpoint.meta.updated_at = now;
                checkpoint.meta.save_count += 1;
            }
            None => {
                self.entries.insert(
                    thread_id.to_string(),
                    Checkpoint {
                        state,
                        meta: CheckpointMeta {
                            created_at: now,
                            updated_at: now,
                            save_count: 1,
                        },
                    },
                );
            }
        }
    }

    /// 恢复线程的最新状态
    pub fn restore(&self, thread_id: &str) -> Option<ConversationState> {
        self.entries
            .get(thread_id)
            .map(|checkpoint| checkpoint.state.clone())
    }

    pub fn has(&self, thread_id: &str) -> bool {
        self.entries.contains_key(thread_id)
    }

    pub fn meta(&self, thread_id: &str) -> Option<CheckpointMeta> {
        self.entries
            .get(thread_id)
            .map(|checkpoint| checkpoint.meta.clone())
    }

    pub fn list_threads(&self) -> Vec<String> {
        let mut threads: Vec<String> = self.entries.keys().cloned().collect();
        threads.sort();
        threads
    }

    pub fn remove(&mut self, thread_id: &str) -> bool {
        self.entries.remove(thread_id).is_some()
    }

    /// 存储整体的使用统计
    pub fn usage_stats(&self) -> CheckpointStats {
        CheckpointStats {
            thread_count: self.entries.len(),
            total_messages: self
                .entries
                .values()
                .map(|checkpoint| checkpoint.state.messages.len())
                .sum(),
            total_saves: self
                .entries
                .values()
                .map(|checkpoint| checkpoint.meta.save_count)
                .sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::message::Message;

    fn state_with(messages: &[&str]) -> ConversationState {
        let mut state = ConversationState::default();
        for content in messages {
            state.messages.push(Message::user(*content));
        }
        state
    }

    #[test]
    fn test_save_restore_roundtrip() {
        let mut checkpointer = MemoryCheckpointer::new();
        assert!(checkpointer.restore("t1").is_none());

        let state = state_with(&["hello"]);
        checkpointer.save("t1", state.clone());
        assert_eq!(checkpointer.restore("t1"), Some(state));
        assert!(checkpointer.has("t1"));
    }

    #[test]
    fn test_threads_are_isolated() {
        let mut checkpointer = MemoryCheckpointer::new();
        checkpointer.save("a", state_with(&["one"]));
        checkpointer.save("b", state_with(&["two", "three"]));

        assert_eq!(checkpointer.restore("a").unwrap().messages.len(), 1);
        assert_eq!(checkpointer.restore("b").unwrap().messages.len(), 2);
        assert_eq!(checkpointer.list_threads(), vec!["a", "b"]);
    }

    #[test]
    fn test_repeated_save_updates_meta() {
        let mut checkpointer = MemoryCheckpointer::new();
        checkpointer.save("t", state_with(&["v1"]));
        checkpointer.save("t", state_with(&["v1", "v2"]));

        let meta = checkpointer.meta("t").unwrap();
        assert_eq!(meta.save_count, 2);
        assert!(meta.updated_at >= meta.created_at);

        let stats = checkpointer.usage_stats();
        assert_eq!(stats.thread_count, 1);
        assert_eq!(stats.total_messages, 2);
        assert_eq!(stats.total_saves, 2);
    }

    #[test]
    fn test_remove() {
        let mut checkpointer = MemoryCheckpointer::new();
        checkpointer.save("t", state_with(&["x"]));
        assert!(checkpointer.remove("t"));
        assert!(!checkpointer.remove("t"));
        assert!(!checkpointer.has("t"));
    }
}
