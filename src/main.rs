use clap::Parser;
use loan_pipeline::config::load_config;
use loan_pipeline::core::document::read_document_text;
use loan_pipeline::core::pipeline::new_request_id;
use loan_pipeline::utils::error::{ErrorSeverity, LoanError};
use loan_pipeline::utils::{logger, validation::Validate};
use loan_pipeline::{CliConfig, LoanConfig, LoanPipeline};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine.
    dotenvy::dotenv().ok();

    let cli = CliConfig::parse();
    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting loan-pipeline");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = match load_config(cli.config.as_deref()).and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => exit_with(&e, "Configuration validation failed"),
    };

    let document_text = match read_document_text(&cli.document).await {
        Ok(text) => text,
        Err(e) => exit_with(&e, "Could not read the application document"),
    };

    let request_id = cli.request_id.clone().unwrap_or_else(new_request_id);
    let pipeline = build_pipeline(&config);

    match pipeline.run(&request_id, document_text).await {
        Ok(outcome) => {
            tracing::info!(
                "✅ Request {} finished: {}",
                outcome.request_id,
                if outcome.verdict.approved { "approved" } else { "rejected" }
            );
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!("{}", outcome.verdict.message);
            }
        }
        Err(failure) => {
            let e = &failure.error;
            tracing::error!(
                "❌ Request {} failed: {} (Category: {:?}, Severity: {:?})",
                request_id,
                failure,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", failure.user_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(exit_code(e.severity()));
        }
    }

    Ok(())
}

fn build_pipeline(config: &LoanConfig) -> LoanPipeline<loan_pipeline::SoapClient> {
    tracing::info!(
        "🔧 Services: extraction={}, solvency={}, property={} (timeout {:?})",
        config.services.extraction_endpoint,
        config.services.solvency_endpoint,
        config.services.property_endpoint,
        config.timeout()
    );
    LoanPipeline::new(config.client(), config.endpoints(), config.codec())
}

fn exit_with(e: &LoanError, context: &str) -> ! {
    tracing::error!("❌ {}: {}", context, e);
    tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
    std::process::exit(exit_code(e.severity()));
}

fn exit_code(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}
