use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProvider {
    #[serde(rename = "gemini")]
    #[default]
    Gemini,
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "ollama")]
    Ollama,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::Gemini => write!(f, "gemini"),
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::DeepSeek => write!(f, "deepseek"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(LLMProvider::Gemini),
            "openai" => Ok(LLMProvider::OpenAI),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "anthropic" => Ok(LLMProvider::Anthropic),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    /// LLM模型配置
    #[serde(default)]
    pub llm: LLMConfig,

    /// GitHub数据源配置
    #[serde(default)]
    pub github: GithubConfig,

    /// 管线行为配置
    #[serde(default)]
    pub agent: AgentConfig,

    /// 是否启用详细日志
    #[serde(default)]
    pub verbose: bool,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址
    pub api_base_url: String,

    /// 推理模型
    pub model: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// 重试次数
    pub retry_attempts: u32,

    /// 重试间隔（毫秒）
    pub retry_delay_ms: u64,

    /// 超时时间（秒）
    pub timeout_seconds: u64,
}

/// GitHub数据源配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct GithubConfig {
    /// REST API基地址
    pub api_base_url: String,

    /// 原始文件内容基地址
    pub raw_content_base_url: String,

    /// 可选的bearer token，未配置时匿名访问
    pub token: Option<String>,

    /// 固定的连接/读取超时（秒）
    pub timeout_seconds: u64,
}

/// 管线行为配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AgentConfig {
    /// README截断预算（字符）
    pub readme_truncate_chars: usize,

    /// 单个manifest截断预算（字符）
    pub manifest_truncate_chars: usize,

    /// 搜索日志状态翻转之间的固定延迟（毫秒），给前端留出渲染时间
    pub search_log_delay_ms: u64,

    /// 单次运行的节点步数上限，防止路由成环
    pub step_limit: usize,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_key: std::env::var("STACKLENS_LLM_API_KEY")
                .or_else(|_| std::env::var("GOOGLE_API_KEY"))
                .unwrap_or_default(),
            api_base_url: String::from("https://generativelanguage.googleapis.com"),
            model: String::from("gemini-2.5-pro"),
            max_tokens: 16384,
            temperature: 0.4,
            retry_attempts: 2,
            retry_delay_ms: 2000,
            timeout_seconds: 300,
        }
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::from("https://api.github.com"),
            raw_content_base_url: String::from("https://raw.githubusercontent.com"),
            token: std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
            timeout_seconds: 30,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            readme_truncate_chars: 8000,
            manifest_truncate_chars: 2000,
            search_log_delay_ms: 1000,
            step_limit: 25,
        }
    }
}

// Include tests
#[cfg(test)]
mod tests;
