use crate::agent::{PipelineKind, launch};
use anyhow::Result;
use clap::Parser;

mod agent;
mod cli;
mod config;
mod github;
mod llm;
mod types;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    let pipeline = args.pipeline.parse::<PipelineKind>().unwrap_or_else(|e| {
        eprintln!("⚠️ {}", e);
        PipelineKind::Chat
    });
    let config = args.to_config();

    launch(&config, pipeline, &args.thread, &args.message).await
}
