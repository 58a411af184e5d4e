use crate::config::{AgentConfig, Config, LLMProvider};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_default_config_values() {
    let config = Config::default();

    assert_eq!(config.llm.provider, LLMProvider::Gemini);
    assert!(!config.llm.api_base_url.is_empty());
    assert!(!config.llm.model.is_empty());
    assert_eq!(config.llm.max_tokens, 16384);
    assert_eq!(config.llm.temperature, 0.4);
    assert_eq!(config.llm.retry_attempts, 2);

    assert_eq!(config.github.api_base_url, "https://api.github.com");
    assert_eq!(
        config.github.raw_content_base_url,
        "https://raw.githubusercontent.com"
    );
    assert_eq!(config.github.timeout_seconds, 30);

    assert_eq!(config.agent.readme_truncate_chars, 8000);
    assert_eq!(config.agent.manifest_truncate_chars, 2000);
    assert_eq!(config.agent.search_log_delay_ms, 1000);
    assert_eq!(config.agent.step_limit, 25);

    assert!(!config.verbose);
}

#[test]
fn test_provider_from_str() {
    assert_eq!("gemini".parse::<LLMProvider>(), Ok(LLMProvider::Gemini));
    assert_eq!("OpenAI".parse::<LLMProvider>(), Ok(LLMProvider::OpenAI));
    assert_eq!("DEEPSEEK".parse::<LLMProvider>(), Ok(LLMProvider::DeepSeek));
    assert!("mystery".parse::<LLMProvider>().is_err());
}

#[test]
fn test_provider_display_roundtrip() {
    for provider in [
        LLMProvider::Gemini,
        LLMProvider::OpenAI,
        LLMProvider::DeepSeek,
        LLMProvider::Anthropic,
        LLMProvider::Ollama,
    ] {
        let rendered = provider.to_string();
        assert_eq!(rendered.parse::<LLMProvider>(), Ok(provider));
    }
}

#[test]
fn test_from_file_partial_overrides() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
verbose = true

[llm]
provider = "openai"
model = "gpt-4o"
temperature = 0.9

[github]
timeout_seconds = 5

[agent]
readme_truncate_chars = 100
search_log_delay_ms = 0
"#
    )
    .unwrap();

    let config = Config::from_file(&file.path().to_path_buf()).unwrap();
    assert!(config.verbose);
    assert_eq!(config.llm.provider, LLMProvider::OpenAI);
    assert_eq!(config.llm.model, "gpt-4o");
    assert_eq!(config.llm.temperature, 0.9);
    // 未覆盖的字段保持默认值
    assert_eq!(config.llm.retry_attempts, 2);
    assert_eq!(config.github.timeout_seconds, 5);
    assert_eq!(config.agent.readme_truncate_chars, 100);
    assert_eq!(config.agent.search_log_delay_ms, 0);
    assert_eq!(config.agent.manifest_truncate_chars, 2000);
}

#[test]
fn test_from_file_missing_path() {
    let path = std::path::PathBuf::from("/nonexistent/stacklens.toml");
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_from_file_invalid_toml() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "not [valid toml").unwrap();
    assert!(Config::from_file(&file.path().to_path_buf()).is_err());
}

#[test]
fn test_agent_config_serializes_roundtrip() {
    let agent = AgentConfig {
        readme_truncate_chars: 42,
        manifest_truncate_chars: 7,
        search_log_delay_ms: 0,
        step_limit: 3,
    };
    let text = toml::to_string(&agent).unwrap();
    let back: AgentConfig = toml::from_str(&text).unwrap();
    assert_eq!(back.readme_truncate_chars, 42);
    assert_eq!(back.manifest_truncate_chars, 7);
    assert_eq!(back.step_limit, 3);
}
