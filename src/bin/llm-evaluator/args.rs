use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "llm-evaluator",
    about = "HTTP server that fans prompts out to LLM providers and scores their answers"
)]
pub struct CliArgs {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
    /// Address to listen on, overriding `server.addr`
    #[arg(long)]
    pub addr: Option<String>,
    /// JSON Lines file for evaluation metrics
    #[arg(long)]
    pub metrics_file: Option<PathBuf>,
    /// Global deadline for provider streams, in seconds
    #[arg(long)]
    pub deadline: Option<u64>,
    /// Log filter, overriding `logging.level` (RUST_LOG still wins)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl CliArgs {
    pub fn apply(&self, config: &mut llm_evaluator::config::AppConfig) {
        if let Some(addr) = &self.addr {
            config.server.addr = addr.clone();
        }
        if let Some(path) = &self.metrics_file {
            config.storage.metrics_file = Some(path.clone());
        }
        if let Some(deadline) = self.deadline {
            config.pipeline.deadline_seconds = deadline;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}
