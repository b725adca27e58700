use anyhow::Context;
use clap::Parser;
use loan_pipeline::config::load_config;
use loan_pipeline::services::serve;
use loan_pipeline::utils::logger;
use loan_pipeline::ServeConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = ServeConfig::parse();
    logger::init_json_logger();

    let mut config = load_config(args.config.as_deref()).context("loading configuration")?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    tracing::info!("Starting loan-services on {}", config.server.bind);
    serve(&config).await.context("serving decision services")?;
    Ok(())
}
