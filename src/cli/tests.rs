use super::*;
use crate::config::LLMProvider;
use clap::Parser;

#[test]
fn test_parse_defaults() {
    let args = Args::try_parse_from(["stacklens-rs", "hello world"]).unwrap();
    assert_eq!(args.message, "hello world");
    assert_eq!(args.pipeline, "chat");
    assert_eq!(args.thread, "default");
    assert!(args.config.is_none());
    assert!(!args.verbose);
}

#[test]
fn test_message_is_required() {
    assert!(Args::try_parse_from(["stacklens-rs"]).is_err());
}

#[test]
fn test_parse_pipeline_and_thread() {
    let args = Args::try_parse_from([
        "stacklens-rs",
        "analyze https://github.com/acme/widgets",
        "--pipeline",
        "stack-analysis",
        "--thread",
        "session-42",
    ])
    .unwrap();
    assert_eq!(args.pipeline, "stack-analysis");
    assert_eq!(args.thread, "session-42");
}

#[test]
fn test_cli_flags_override_config() {
    let args = Args::try_parse_from([
        "stacklens-rs",
        "hi",
        "--llm-provider",
        "openai",
        "--model",
        "gpt-4o",
        "--temperature",
        "0.9",
        "--max-tokens",
        "2048",
        "--github-token",
        "ghp_test",
        "--search-log-delay-ms",
        "0",
        "--verbose",
    ])
    .unwrap();

    let config = args.to_config();
    assert_eq!(config.llm.provider, LLMProvider::OpenAI);
    assert_eq!(config.llm.model, "gpt-4o");
    assert_eq!(config.llm.temperature, 0.9);
    assert_eq!(config.llm.max_tokens, 2048);
    assert_eq!(config.github.token.as_deref(), Some("ghp_test"));
    assert_eq!(config.agent.search_log_delay_ms, 0);
    assert!(config.verbose);
}

#[test]
fn test_unknown_provider_keeps_default() {
    let args = Args::try_parse_from(["stacklens-rs", "hi", "--llm-provider", "banana"]).unwrap();
    let config = args.to_config();
    assert_eq!(config.llm.provider, LLMProvider::default());
}
