//! 运行上下文 - 一次运行可见的全部外部协作方
//!
//! 所有协作方都在构造时显式注入，不读取任何进程级隐藏状态，
//! 测试可以用替身整体替换模型、数据源与发布器。

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::agent::checkpoint::MemoryCheckpointer;
use crate::agent::emitter::{ConsoleEmitter, NullEmitter, StateEmitter};
use crate::config::Config;
use crate::github::{GithubClient, RepoDataSource};
use crate::llm::{ModelService, RigModelService};

/// 工作流节点可见的协作方集合
#[derive(Clone)]
pub struct AgentContext {
    pub model: Arc<dyn ModelService>,
    pub github: Arc<dyn RepoDataSource>,
    pub emitter: Arc<dyn StateEmitter>,
    pub checkpointer: Arc<RwLock<MemoryCheckpointer>>,
    pub config: Config,
}

impl AgentContext {
    /// 按配置构建生产协作方
    pub fn new(config: Config) -> Result<Self> {
        let model: Arc<dyn ModelService> = Arc::new(RigModelService::new(&config.llm)?);
        let github: Arc<dyn RepoDataSource> = Arc::new(GithubClient::new(config.github.clone())?);
        let emitter: Arc<dyn StateEmitter> = if config.verbose {
            Arc::new(ConsoleEmitter::new())
        } else {
            Arc::new(NullEmitter)
        };
        Ok(Self {
            model,
            github,
            emitter,
            checkpointer: Arc::new(RwLock::new(MemoryCheckpointer::new())),
            config,
        })
    }

    /// 用显式组件组装上下文，测试与嵌入方使用
    pub fn with_components(
        model: Arc<dyn ModelService>,
        github: Arc<dyn RepoDataSource>,
        emitter: Arc<dyn StateEmitter>,
        config: Config,
    ) -> Self {
        Self {
            model,
            github,
            emitter,
            checkpointer: Arc::new(RwLock::new(MemoryCheckpointer::new())),
            config,
        }
    }
}
