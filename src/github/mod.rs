//! GitHub数据源 - 按owner/repo拉取仓库元数据、README与manifest内容

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::GithubConfig;

pub mod url;

pub use url::parse_github_url;

/// 根目录下识别的manifest文件白名单，覆盖常见生态的依赖/构建/部署描述文件
pub const ROOT_MANIFEST_CANDIDATES: &[&str] = &[
    "package.json",
    "pnpm-lock.yaml",
    "yarn.lock",
    "bun.lockb",
    "requirements.txt",
    "pyproject.toml",
    "Pipfile",
    "Pipfile.lock",
    "setup.py",
    "go.mod",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "Cargo.toml",
    "Gemfile",
    "composer.json",
    "Dockerfile",
    "docker-compose.yml",
    "Procfile",
    "serverless.yml",
    "vercel.json",
    "netlify.toml",
    "next.config.js",
    "next.config.mjs",
    "nuxt.config.js",
    "nuxt.config.ts",
    "angular.json",
    "vite.config.ts",
    "vite.config.js",
];

/// 专用README端点不可用时，在根目录里按惯例名回退查找
const README_CANDIDATES: &[&str] = &["readme.md", "readme", "readme.txt", "readme.rst"];

/// 单次外部获取的结果
///
/// 区分"成功但为空"与"获取失败"两种情况；分析管线对两者同样降级为空值，
/// 但Failed会在控制台留下痕迹，避免掩盖真实的上游故障。
#[derive(Debug, Clone, PartialEq)]
pub enum Fetch<T> {
    Hit(T),
    Absent,
    Failed(String),
}

impl<T> Default for Fetch<T> {
    fn default() -> Self {
        Fetch::Absent
    }
}

impl<T> Fetch<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Fetch::Hit(value) => Some(value),
            Fetch::Absent | Fetch::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Fetch::Failed(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetch<U> {
        match self {
            Fetch::Hit(value) => Fetch::Hit(f(value)),
            Fetch::Absent => Fetch::Absent,
            Fetch::Failed(reason) => Fetch::Failed(reason),
        }
    }
}

/// 仓库根目录的一个条目
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RootItem {
    pub name: String,
    #[serde(rename = "type", default)]
    pub entry_type: String,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// 根目录条目的名称+类型描述，进入分析提示词
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RootFileEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: String,
}

/// 一次运行内收集到的仓库上下文，构建后只读
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct RepoContext {
    pub owner: String,
    pub repo: String,
    pub repo_info: Value,
    pub languages: BTreeMap<String, u64>,
    pub readme: String,
    pub root_files: Vec<RootFileEntry>,
    pub manifests: BTreeMap<String, String>,
}

/// 仓库数据源契约 - 四个只读端点加原始文件内容获取
#[async_trait]
pub trait RepoDataSource: Send + Sync {
    /// 仓库元数据
    async fn repo_info(&self, owner: &str, repo: &str) -> Fetch<Value>;

    /// 语言字节数分布
    async fn languages(&self, owner: &str, repo: &str) -> Fetch<BTreeMap<String, u64>>;

    /// 默认README内容（已解码为文本）
    async fn readme(&self, owner: &str, repo: &str) -> Fetch<String>;

    /// 根目录列表
    async fn list_root(&self, owner: &str, repo: &str) -> Fetch<Vec<RootItem>>;

    /// 根目录条目的文本内容，优先download_url，否则按默认分支构造原始地址
    async fn file_content(
        &self,
        owner: &str,
        repo: &str,
        default_branch: Option<&str>,
        item: &RootItem,
    ) -> Fetch<String>;
}

/// GitHub REST客户端
pub struct GithubClient {
    http: reqwest::Client,
    config: GithubConfig,
}

impl GithubClient {
    pub fn new(config: GithubConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent("stacklens-rs")
            .build()?;
        Ok(Self { http, config })
    }

    /// 发起GET请求；404视为Absent，其余非200与网络错误视为Failed
    async fn get(&self, url: &str) -> Fetch<reqwest::Response> {
        let mut request = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(resp) if resp.status().is_success() => Fetch::Hit(resp),
            Ok(resp) if resp.status() == reqwest::StatusCode::NOT_FOUND => Fetch::Absent,
            Ok(resp) => Fetch::Failed(format!("HTTP {} for {}", resp.status(), url)),
            Err(e) => Fetch::Failed(e.to_string()),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Fetch<T> {
        match self.get(url).await {
            Fetch::Hit(resp) => match resp.json::<T>().await {
                Ok(value) => Fetch::Hit(value),
                Err(e) => Fetch::Failed(e.to_string()),
            },
            Fetch::Absent => Fetch::Absent,
            Fetch::Failed(reason) => Fetch::Failed(reason),
        }
    }

    async fn get_text(&self, url: &str) -> Fetch<String> {
        match self.get(url).await {
            Fetch::Hit(resp) => match resp.text().await {
                Ok(text) => Fetch::Hit(text),
                Err(e) => Fetch::Failed(e.to_string()),
            },
            Fetch::Absent => Fetch::Absent,
            Fetch::Failed(reason) => Fetch::Failed(reason),
        }
    }

    fn repos_url(&self, owner: &str, repo: &str, suffix: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.config.api_base_url, owner, repo, suffix
        )
    }
}

#[async_trait]
impl RepoDataSource for GithubClient {
    async fn repo_info(&self, owner: &str, repo: &str) -> Fetch<Value> {
        self.get_json(&self.repos_url(owner, repo, "")).await
    }

    async fn languages(&self, owner: &str, repo: &str) -> Fetch<BTreeMap<String, u64>> {
        self.get_json(&self.repos_url(owner, repo, "/languages"))
            .await
    }

    async fn readme(&self, owner: &str, repo: &str) -> Fetch<String> {
        match self
            .get_json::<Value>(&self.repos_url(owner, repo, "/readme"))
            .await
        {
            Fetch::Hit(data) => match data.get("content").and_then(Value::as_str) {
                Some(encoded) if !encoded.is_empty() => match decode_readme(encoded) {
                    Some(text) => Fetch::Hit(text),
                    None => Fetch::Failed("README content is not valid base64".to_string()),
                },
                _ => Fetch::Absent,
            },
            Fetch::Absent => Fetch::Absent,
            Fetch::Failed(reason) => Fetch::Failed(reason),
        }
    }

    async fn list_root(&self, owner: &str, repo: &str) -> Fetch<Vec<RootItem>> {
        self.get_json(&self.repos_url(owner, repo, "/contents/"))
            .await
    }

    async fn file_content(
        &self,
        owner: &str,
        repo: &str,
        default_branch: Option<&str>,
        item: &RootItem,
    ) -> Fetch<String> {
        if let Some(url) = &item.download_url {
            return self.get_text(url).await;
        }
        match default_branch {
            Some(branch) => {
                let url = format!(
                    "{}/{}/{}/{}/{}",
                    self.config.raw_content_base_url, owner, repo, branch, item.name
                );
                self.get_text(&url).await
            }
            None => Fetch::Absent,
        }
    }
}

/// GitHub的README端点返回带换行的base64内容
fn decode_readme(encoded: &str) -> Option<String> {
    let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(cleaned).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// 把四类端点的结果组合为只读的仓库上下文
///
/// 每一项都尽力而为：缺失或失败的部分降级为空值，绝不让错误越过本函数。
pub async fn gather_repo_context(
    source: &dyn RepoDataSource,
    owner: &str,
    repo: &str,
) -> RepoContext {
    let repo_info_fetch = source.repo_info(owner, repo).await;
    note_failure("repository metadata", &repo_info_fetch);
    let repo_info = repo_info_fetch
        .into_option()
        .unwrap_or_else(|| Value::Object(Default::default()));

    let default_branch = repo_info
        .get("default_branch")
        .and_then(Value::as_str)
        .map(str::to_string);

    let languages_fetch = source.languages(owner, repo).await;
    note_failure("languages", &languages_fetch);
    let languages = languages_fetch.into_option().unwrap_or_default();

    let root_fetch = source.list_root(owner, repo).await;
    note_failure("root listing", &root_fetch);
    let root_items = root_fetch.into_option().unwrap_or_default();

    let readme = fetch_readme(source, owner, repo, default_branch.as_deref(), &root_items).await;
    let manifests =
        fetch_manifests(source, owner, repo, default_branch.as_deref(), &root_items).await;

    let root_files = root_items
        .iter()
        .map(|item| RootFileEntry {
            name: item.name.clone(),
            entry_type: item.entry_type.clone(),
        })
        .collect();

    RepoContext {
        owner: owner.to_string(),
        repo: repo.to_string(),
        repo_info,
        languages,
        readme,
        root_files,
        manifests,
    }
}

/// 优先专用README端点，失败时回退到根目录的惯例文件名
async fn fetch_readme(
    source: &dyn RepoDataSource,
    owner: &str,
    repo: &str,
    default_branch: Option<&str>,
    root_items: &[RootItem],
) -> String {
    let direct = source.readme(owner, repo).await;
    note_failure("readme", &direct);
    if let Fetch::Hit(text) = direct {
        return text;
    }

    for item in root_items {
        if README_CANDIDATES.contains(&item.name.to_lowercase().as_str()) {
            let fallback = source
                .file_content(owner, repo, default_branch, item)
                .await;
            note_failure("readme fallback", &fallback);
            if let Fetch::Hit(text) = fallback {
                return text;
            }
        }
    }
    String::new()
}

/// 只收集白名单内且真实存在于根目录的manifest文件
async fn fetch_manifests(
    source: &dyn RepoDataSource,
    owner: &str,
    repo: &str,
    default_branch: Option<&str>,
    root_items: &[RootItem],
) -> BTreeMap<String, String> {
    let mut manifests = BTreeMap::new();
    for name in ROOT_MANIFEST_CANDIDATES {
        let Some(item) = root_items.iter().find(|item| item.name == *name) else {
            continue;
        };
        let fetched = source.file_content(owner, repo, default_branch, item).await;
        note_failure(name, &fetched);
        if let Fetch::Hit(text) = fetched {
            manifests.insert((*name).to_string(), text);
        }
    }
    manifests
}

fn note_failure<T>(what: &str, fetch: &Fetch<T>) {
    if let Fetch::Failed(reason) = fetch {
        eprintln!("⚠️ GitHub获取失败（{}），按空值降级: {}", what, reason);
    }
}
