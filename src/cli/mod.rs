use crate::config::{Config, LLMProvider};
use clap::Parser;
use std::path::PathBuf;

/// StackLens - 搜索接地问答与GitHub技术栈分析的会话编排器
#[derive(Parser, Debug)]
#[command(name = "stacklens-rs")]
#[command(
    about = "Conversational orchestrator that answers questions with live web-search grounding or analyzes the technology stack of a GitHub repository."
)]
#[command(version)]
pub struct Args {
    /// 发送给管线的用户消息
    pub message: String,

    /// 管线种类 (chat, stack-analysis)
    #[arg(short, long, default_value = "chat")]
    pub pipeline: String,

    /// 会话线程id，相同id的多次调用会续聊
    #[arg(short, long, default_value = "default")]
    pub thread: String,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// LLM Provider (gemini, openai, deepseek, anthropic, ollama)
    #[arg(long)]
    pub llm_provider: Option<String>,

    /// LLM API基地址
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// LLM API KEY
    #[arg(long)]
    pub llm_api_key: Option<String>,

    /// 推理模型
    #[arg(long)]
    pub model: Option<String>,

    /// 最大tokens数
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// 温度参数
    #[arg(long)]
    pub temperature: Option<f64>,

    /// GitHub访问token，未提供时匿名访问
    #[arg(long)]
    pub github_token: Option<String>,

    /// 搜索日志翻转之间的延迟（毫秒）
    #[arg(long)]
    pub search_log_delay_ms: Option<u64>,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// 将CLI参数转换为配置：配置文件打底，CLI参数覆盖
    pub fn to_config(&self) -> Config {
        let mut config = if let Some(config_path) = &self.config {
            Config::from_file(config_path).unwrap_or_else(|e| {
                eprintln!("⚠️ 警告: 无法读取配置文件 {:?}，使用默认配置: {}", config_path, e);
                Config::default()
            })
        } else {
            // 没有显式指定时尝试工作目录下的默认配置文件
            let default_config_path = std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("stacklens.toml");

            if default_config_path.exists() {
                Config::from_file(&default_config_path).unwrap_or_else(|e| {
                    eprintln!(
                        "⚠️ 警告: 无法读取默认配置文件 {:?}，使用默认配置: {}",
                        default_config_path, e
                    );
                    Config::default()
                })
            } else {
                Config::default()
            }
        };

        // 覆盖LLM配置
        if let Some(provider_str) = &self.llm_provider {
            if let Ok(provider) = provider_str.parse::<LLMProvider>() {
                config.llm.provider = provider;
            } else {
                eprintln!(
                    "⚠️ 警告: 未知的provider: {}，使用默认provider",
                    provider_str
                );
            }
        }
        if let Some(llm_api_base_url) = &self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url.clone();
        }
        if let Some(llm_api_key) = &self.llm_api_key {
            config.llm.api_key = llm_api_key.clone();
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(max_tokens) = self.max_tokens {
            config.llm.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = temperature;
        }

        // 覆盖GitHub配置
        if let Some(github_token) = &self.github_token {
            config.github.token = Some(github_token.clone());
        }

        // 覆盖管线行为
        if let Some(delay) = self.search_log_delay_ms {
            config.agent.search_log_delay_ms = delay;
        }
        config.verbose = self.verbose;

        config
    }
}

// Include tests
#[cfg(test)]
mod tests;
