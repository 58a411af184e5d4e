use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 结构化技术栈分析结果
///
/// 所有字段均为可选，缺失的部分在输出中直接省略，不填充占位值。
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, JsonSchema)]
pub struct StackAnalysis {
    /// 项目用途概述
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    /// 前端技术栈
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontend: Option<LayerSpec>,
    /// 后端技术栈
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<LayerSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infrastructure: Option<InfrastructureSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ci_cd: Option<CiCdSpec>,
    /// 关键根目录文件及说明
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_root_files: Option<Vec<RootFileNote>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub how_to_run: Option<HowToRun>,
    /// 风险提示清单
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risks_notes: Option<Vec<RiskNote>>,
}

/// 前端或后端的分层技术栈描述
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, JsonSchema)]
pub struct LayerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_manager: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_libraries: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, JsonSchema)]
pub struct DatabaseSpec {
    /// 数据库系统，如 Postgres、MySQL、SQLite
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// ORM或数据访问层，如 Prisma、Diesel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, JsonSchema)]
pub struct InfrastructureSpec {
    /// 部署/托管方式，如 Vercel、Docker、Kubernetes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosting: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub containerized: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, JsonSchema)]
pub struct CiCdSpec {
    /// CI/CD提供方，如 GitHub Actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_files: Option<Vec<String>>,
}

/// 关键根目录文件说明
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, JsonSchema)]
pub struct RootFileNote {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// 运行方式摘要
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, JsonSchema)]
pub struct HowToRun {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// 有序的执行步骤
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<String>>,
}

/// 风险提示
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, JsonSchema)]
pub struct RiskNote {
    pub area: String,
    pub note: String,
}
