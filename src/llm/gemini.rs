//! Gemini REST访问 - 覆盖rig未暴露的能力（搜索接地元数据、动态函数声明）

use anyhow::{Result, bail};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

use crate::config::LLMConfig;

/// 直接访问generateContent端点的轻量客户端
#[derive(Clone)]
pub struct GeminiHttpClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl GeminiHttpClient {
    pub fn new(config: &LLMConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// 发起一次generateContent调用
    ///
    /// contents为role-tagged内容数组，tools可携带google_search或function_declarations。
    pub async fn generate(&self, contents: Value, tools: Option<Value>) -> Result<GenerateReply> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_tokens,
            }
        });
        if let Some(tools) = tools {
            body["tools"] = tools;
        }

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            bail!("Gemini API返回 {}: {}", status, detail);
        }

        let parsed: GenerateResponse = response.json().await?;
        Ok(parsed.into_reply())
    }

    /// 构造一个role-tagged内容条目
    pub fn content(role: &str, text: &str) -> Value {
        json!({"role": role, "parts": [{"text": text}]})
    }
}

/// 解析后的模型应答
#[derive(Debug, Clone, Default)]
pub struct GenerateReply {
    /// 合并后的文本部分
    pub text: String,
    /// 模型发起的函数调用
    pub function_calls: Vec<FunctionCall>,
    /// 搜索接地时模型实际发出的查询，仅完整响应返回后可用
    pub web_search_queries: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    web_search_queries: Vec<String>,
}

impl GenerateResponse {
    fn into_reply(self) -> GenerateReply {
        let mut reply = GenerateReply::default();
        for candidate in self.candidates {
            if let Some(content) = candidate.content {
                for part in content.parts {
                    if let Some(text) = part.text {
                        reply.text.push_str(&text);
                    }
                    if let Some(call) = part.function_call {
                        reply.function_calls.push(call);
                    }
                }
            }
            if let Some(grounding) = candidate.grounding_metadata {
                reply.web_search_queries.extend(grounding.web_search_queries);
            }
        }
        reply
    }
}
