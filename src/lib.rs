pub mod config;
pub mod core;
pub mod domain;
pub mod services;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, ServeConfig};
pub use config::LoanConfig;

pub use core::client::SoapClient;
pub use core::envelope::EnvelopeCodec;
pub use core::pipeline::{LoanPipeline, ServiceEndpoints, StageFailure};
pub use domain::model::{PipelineOutcome, Verdict};
pub use utils::error::{LoanError, Result};
