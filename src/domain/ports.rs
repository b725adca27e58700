use crate::utils::error::Result;
use async_trait::async_trait;

/// Transport seam between the pipeline and the remote decision services.
///
/// Implementations return the raw response body on success and a
/// `LoanError::Transport` for anything else; they never retry.
#[async_trait]
pub trait RemoteCaller: Send + Sync {
    async fn call(&self, endpoint: &str, envelope: &str) -> Result<String>;
}

/// Turns free application text into the fixed-schema JSON object.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    async fn extract_fields(&self, letter: &str) -> Result<String>;
}
