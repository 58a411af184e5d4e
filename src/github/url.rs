use regex::Regex;
use std::sync::LazyLock;

static GITHUB_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://github\.com/([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+)")
        .expect("github url pattern is valid")
});

/// 从任意文本中提取GitHub仓库的owner/repo，大小写原样保留
///
/// 匹配失败返回None，由调用方转换为结构化错误。
pub fn parse_github_url(text: &str) -> Option<(String, String)> {
    let captures = GITHUB_URL_RE.captures(text)?;
    Some((captures[1].to_string(), captures[2].to_string()))
}
