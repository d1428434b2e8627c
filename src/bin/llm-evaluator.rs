#[path = "llm-evaluator/args.rs"]
mod args;
#[path = "llm-evaluator/logging.rs"]
mod logging;

use anyhow::Context;
use clap::Parser;

use llm_evaluator::api::Server;
use llm_evaluator::config::{build_pipeline, load_config, Secrets};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = args::CliArgs::parse();
    let mut config = load_config(args.config.as_deref()).context("loading configuration")?;
    args.apply(&mut config);
    logging::init_logging(&config.logging);

    let secrets = Secrets::from_env();
    log::debug!("Secrets: {secrets:?}");
    let pipeline = build_pipeline(&config, &secrets).context("building pipeline")?;

    Server::new(pipeline)
        .with_auth_key(secrets.server_api_key.clone())
        .with_cors_origins(config.server.cors_origins.clone())
        .with_channel_capacity(config.pipeline.channel_capacity)
        .run(&config.server.addr)
        .await
        .with_context(|| format!("serving on {}", config.server.addr))
}
