//! StackLens - 会话编排层
//!
//! 把一条用户消息路由进两条管线之一：带搜索接地的问答，
//! 或GitHub仓库的技术栈分析；两条管线都通过状态发布器向
//! 前端流式推送工具日志进度。

pub mod agent;
pub mod cli;
pub mod config;
pub mod github;
pub mod llm;
pub mod types;

pub use agent::{AgentContext, AgentRuntime, PipelineKind};
pub use config::Config;
