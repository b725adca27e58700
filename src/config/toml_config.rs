use crate::core::client::SoapClient;
use crate::core::envelope::{EnvelopeCodec, DEFAULT_SERVICE_NS};
use crate::core::pipeline::ServiceEndpoints;
use crate::services::extraction::{ChatCompletionExtractor, DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::services::reference::{ReferenceData, DEFAULT_PRICE_PER_AREA};
use crate::utils::error::{LoanError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const EXTRACTION_PATH: &str = "/extractInformationsService";
pub const SOLVENCY_PATH: &str = "/solvabiliteService";
pub const PROPERTY_PATH: &str = "/evaluationProprieteService";
pub const APPROVAL_PATH: &str = "/approvalDecisionService";

/// Complete runtime configuration shared by both binaries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoanConfig {
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub reference: ReferenceConfig,
}

/// Where the pipeline sends each stage's request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    #[serde(default = "default_extraction_endpoint")]
    pub extraction_endpoint: String,
    #[serde(default = "default_solvency_endpoint")]
    pub solvency_endpoint: String,
    #[serde(default = "default_property_endpoint")]
    pub property_endpoint: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

/// The services binary's listener and route table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_extraction_path")]
    pub extraction_path: String,
    #[serde(default = "default_solvency_path")]
    pub solvency_path: String,
    #[serde(default = "default_property_path")]
    pub property_path: String,
    #[serde(default = "default_approval_path")]
    pub approval_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_price_per_area")]
    pub default_price_per_area: f64,
}

fn endpoint_for(path: &str) -> String {
    format!("http://{}{}", DEFAULT_BIND, path)
}

fn default_extraction_endpoint() -> String {
    endpoint_for(EXTRACTION_PATH)
}

fn default_solvency_endpoint() -> String {
    endpoint_for(SOLVENCY_PATH)
}

fn default_property_endpoint() -> String {
    endpoint_for(PROPERTY_PATH)
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_namespace() -> String {
    DEFAULT_SERVICE_NS.to_string()
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_extraction_path() -> String {
    EXTRACTION_PATH.to_string()
}

fn default_solvency_path() -> String {
    SOLVENCY_PATH.to_string()
}

fn default_property_path() -> String {
    PROPERTY_PATH.to_string()
}

fn default_approval_path() -> String {
    APPROVAL_PATH.to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_price_per_area() -> f64 {
    DEFAULT_PRICE_PER_AREA
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            extraction_endpoint: default_extraction_endpoint(),
            solvency_endpoint: default_solvency_endpoint(),
            property_endpoint: default_property_endpoint(),
            timeout_seconds: default_timeout_seconds(),
            namespace: default_namespace(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            extraction_path: default_extraction_path(),
            solvency_path: default_solvency_path(),
            property_path: default_property_path(),
            approval_path: default_approval_path(),
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            api_key: None,
        }
    }
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            default_price_per_area: default_price_per_area(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        validation::validate_bind_address("server.bind", &self.bind)
    }
}

impl ExtractorConfig {
    /// The API key, unless it is absent or an unresolved `${VAR}` placeholder.
    pub fn resolved_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && !key.starts_with("${"))
    }
}

impl LoanConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(LoanError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| LoanError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unset variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| LoanError::ConfigValidationError {
            field: "environment".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_endpoint("services.extraction_endpoint", &self.services.extraction_endpoint)?;
        validation::validate_endpoint("services.solvency_endpoint", &self.services.solvency_endpoint)?;
        validation::validate_endpoint("services.property_endpoint", &self.services.property_endpoint)?;
        validation::validate_positive_number("services.timeout_seconds", self.services.timeout_seconds, 1)?;
        validation::validate_non_empty_string("services.namespace", &self.services.namespace)?;

        self.server.socket_addr()?;
        validation::validate_service_path("server.extraction_path", &self.server.extraction_path)?;
        validation::validate_service_path("server.solvency_path", &self.server.solvency_path)?;
        validation::validate_service_path("server.property_path", &self.server.property_path)?;
        validation::validate_service_path("server.approval_path", &self.server.approval_path)?;

        let paths = [
            &self.server.extraction_path,
            &self.server.solvency_path,
            &self.server.property_path,
            &self.server.approval_path,
        ];
        for (i, path) in paths.iter().enumerate() {
            if paths[..i].contains(path) {
                return Err(LoanError::InvalidConfigValueError {
                    field: "server".to_string(),
                    value: path.to_string(),
                    reason: "Each service needs its own path".to_string(),
                });
            }
        }

        validation::validate_endpoint("extractor.api_base", &self.extractor.api_base)?;
        validation::validate_non_empty_string("extractor.model", &self.extractor.model)?;

        let price = self.reference.default_price_per_area;
        if price.is_nan() || price <= 0.0 {
            return Err(LoanError::InvalidConfigValueError {
                field: "reference.default_price_per_area".to_string(),
                value: self.reference.default_price_per_area.to_string(),
                reason: "Price per area must be positive".to_string(),
            });
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.services.timeout_seconds)
    }

    pub fn endpoints(&self) -> ServiceEndpoints {
        ServiceEndpoints {
            extraction: self.services.extraction_endpoint.clone(),
            solvency: self.services.solvency_endpoint.clone(),
            property_evaluation: self.services.property_endpoint.clone(),
        }
    }

    pub fn codec(&self) -> EnvelopeCodec {
        EnvelopeCodec::new(self.services.namespace.clone())
    }

    pub fn client(&self) -> SoapClient {
        SoapClient::new(self.timeout())
    }

    /// Built-in reference tables, overridden by CSV files from `data_dir`.
    pub fn reference_data(&self) -> Result<ReferenceData> {
        let data = match &self.reference.data_dir {
            Some(dir) => ReferenceData::from_dir(dir)?,
            None => ReferenceData::default(),
        };
        Ok(data.with_default_price_per_area(self.reference.default_price_per_area))
    }

    /// `None` when no API key is configured; the extraction service then answers with a fault.
    pub fn extractor(&self) -> Option<ChatCompletionExtractor> {
        self.extractor.resolved_api_key().map(|key| {
            ChatCompletionExtractor::new(
                self.extractor.api_base.clone(),
                self.extractor.model.clone(),
                key,
                self.timeout(),
            )
        })
    }
}

impl Validate for LoanConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_point_at_local_services() {
        let config = LoanConfig::default();
        assert!(config.validate().is_ok());

        let endpoints = config.endpoints();
        assert_eq!(endpoints.extraction, "http://127.0.0.1:8000/extractInformationsService");
        assert_eq!(endpoints.solvency, "http://127.0.0.1:8000/solvabiliteService");
        assert_eq!(
            endpoints.property_evaluation,
            "http://127.0.0.1:8000/evaluationProprieteService"
        );
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.codec().namespace(), "spyne.examples.hello");
        assert!(config.extractor().is_none());
    }

    #[test]
    fn test_parse_partial_toml_config() {
        let toml_content = r#"
[services]
solvency_endpoint = "http://scoring.internal:8003/solvabiliteService"
timeout_seconds = 3

[server]
bind = "0.0.0.0:9000"
"#;

        let config = LoanConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.services.solvency_endpoint,
            "http://scoring.internal:8003/solvabiliteService"
        );
        assert_eq!(config.services.extraction_endpoint, default_extraction_endpoint());
        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert_eq!(config.server.socket_addr().unwrap().port(), 9000);
        assert_eq!(config.server.approval_path, APPROVAL_PATH);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("LOAN_TEST_EXTRACTOR_KEY", "sk-from-env");

        let toml_content = r#"
[extractor]
api_key = "${LOAN_TEST_EXTRACTOR_KEY}"
"#;

        let config = LoanConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.extractor.resolved_api_key(), Some("sk-from-env"));
        assert!(config.extractor().is_some());

        std::env::remove_var("LOAN_TEST_EXTRACTOR_KEY");
    }

    #[test]
    fn test_unresolved_placeholder_is_not_a_key() {
        let toml_content = r#"
[extractor]
api_key = "${LOAN_TEST_SURELY_UNSET_VARIABLE}"
"#;

        let config = LoanConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.extractor.api_key.as_deref(),
            Some("${LOAN_TEST_SURELY_UNSET_VARIABLE}")
        );
        assert!(config.extractor.resolved_api_key().is_none());
    }

    #[test]
    fn test_config_validation() {
        let bad_endpoint = LoanConfig::from_toml_str(
            r#"
[services]
property_endpoint = "not-a-url"
"#,
        )
        .unwrap();
        assert!(bad_endpoint.validate().is_err());

        let no_path = LoanConfig::from_toml_str(
            r#"
[services]
property_endpoint = "http://localhost:8004"
"#,
        )
        .unwrap();
        assert!(no_path.validate().is_err());

        let zero_timeout = LoanConfig::from_toml_str("[services]\ntimeout_seconds = 0\n").unwrap();
        assert!(zero_timeout.validate().is_err());

        let shared_path = LoanConfig::from_toml_str(
            r#"
[server]
approval_path = "/solvabiliteService"
"#,
        )
        .unwrap();
        assert!(shared_path.validate().is_err());

        let bad_bind = LoanConfig::from_toml_str("[server]\nbind = \"localhost\"\n").unwrap();
        assert!(bad_bind.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_a_config_error() {
        let err = LoanConfig::from_toml_str("[services\n").unwrap_err();
        assert!(matches!(err, LoanError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file_with_reference_dir() {
        let data_dir = tempfile::tempdir().unwrap();
        std::fs::write(
            data_dir.path().join("price_per_area.csv"),
            "town,price_per_area\nLyon,275\n",
        )
        .unwrap();

        let mut temp_file = NamedTempFile::new().unwrap();
        let toml_content = format!(
            "[reference]\ndata_dir = {:?}\ndefault_price_per_area = 120.0\n",
            data_dir.path().display().to_string()
        );
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = LoanConfig::from_file(temp_file.path()).unwrap();
        let reference = config.reference_data().unwrap();
        assert_eq!(reference.price_per_area("Lyon"), 275.0);
        assert_eq!(reference.price_per_area("Nantes"), 120.0);
    }
}
