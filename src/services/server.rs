//! HTTP front exposing the decision services as envelope RPC endpoints.

use crate::config::toml_config::{LoanConfig, ServerConfig};
use crate::core::envelope::EnvelopeCodec;
use crate::core::pipeline::{EXTRACTION_OPERATION, PROPERTY_OPERATION, SOLVENCY_OPERATION};
use crate::domain::model::RemoteEnvelope;
use crate::domain::ports::FieldExtractor;
use crate::services::approval::{self, ApprovalRequest};
use crate::services::reference::ReferenceData;
use crate::services::{extraction, property, solvency};
use crate::utils::error::{ErrorCategory, LoanError, Result};
use crate::utils::validation::Validate;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

pub const APPROVAL_OPERATION: &str = "make_decision";
const XML_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// Read-only state shared by every handler.
#[derive(Clone)]
pub struct ServiceState {
    pub codec: EnvelopeCodec,
    pub reference: Arc<ReferenceData>,
    pub extractor: Option<Arc<dyn FieldExtractor>>,
}

impl ServiceState {
    pub fn new(
        codec: EnvelopeCodec,
        reference: ReferenceData,
        extractor: Option<Arc<dyn FieldExtractor>>,
    ) -> Self {
        Self {
            codec,
            reference: Arc::new(reference),
            extractor,
        }
    }

    pub fn from_config(config: &LoanConfig) -> Result<Self> {
        let extractor = config
            .extractor()
            .map(|extractor| Arc::new(extractor) as Arc<dyn FieldExtractor>);
        if extractor.is_none() {
            tracing::warn!("⚠️ No extractor API key configured; extraction requests will fault");
        }
        Ok(Self::new(config.codec(), config.reference_data()?, extractor))
    }
}

pub fn router(state: ServiceState, paths: &ServerConfig) -> Router {
    Router::new()
        .route(&paths.extraction_path, post(extraction_handler))
        .route(&paths.solvency_path, post(solvency_handler))
        .route(&paths.property_path, post(property_handler))
        .route(&paths.approval_path, post(approval_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Binds `server.bind` and serves until the process is stopped.
pub async fn serve(config: &LoanConfig) -> Result<()> {
    config.validate()?;
    let addr = config.server.socket_addr()?;
    let state = ServiceState::from_config(config)?;
    let app = router(state, &config.server);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        "🌐 Decision services listening on {} ({}, {}, {}, {})",
        addr,
        config.server.extraction_path,
        config.server.solvency_path,
        config.server.property_path,
        config.server.approval_path
    );

    axum::serve(listener, app).await?;
    Ok(())
}

pub(crate) async fn health_handler() -> &'static str {
    "ok"
}

pub(crate) async fn extraction_handler(State(state): State<ServiceState>, body: String) -> Response {
    let result = async {
        let request = expect_operation(&state.codec, &body, EXTRACTION_OPERATION)?;
        let letter = required(&request, "demande")?;
        let extractor = state.extractor.as_deref().ok_or_else(|| LoanError::ExtractorError {
            message: "no extractor is configured".to_string(),
        })?;
        extraction::extract_information(extractor, letter).await
    }
    .await;
    respond(&state.codec, EXTRACTION_OPERATION, result)
}

pub(crate) async fn solvency_handler(State(state): State<ServiceState>, body: String) -> Response {
    let result = expect_operation(&state.codec, &body, SOLVENCY_OPERATION).and_then(|request| {
        let client_id = required(&request, "clientId")?;
        let result = solvency::assess(&state.reference, client_id);
        Ok(solvency::to_mapping_literal(&result))
    });
    respond(&state.codec, SOLVENCY_OPERATION, result)
}

pub(crate) async fn property_handler(State(state): State<ServiceState>, body: String) -> Response {
    let result = expect_operation(&state.codec, &body, PROPERTY_OPERATION).and_then(|request| {
        let town = required(&request, "ville")?;
        let raw_area = required(&request, "taille_logement")?;
        let surface_area = raw_area.trim().parse::<u32>().map_err(|e| {
            LoanError::format_error("taille_logement", raw_area, e.to_string())
        })?;
        let address = required(&request, "adresse")?;
        let result = property::evaluate(&state.reference, town, surface_area, address);
        Ok(property::to_mapping_literal(&result))
    });
    respond(&state.codec, PROPERTY_OPERATION, result)
}

pub(crate) async fn approval_handler(State(state): State<ServiceState>, body: String) -> Response {
    let result = expect_operation(&state.codec, &body, APPROVAL_OPERATION).and_then(|request| {
        let approval_request = ApprovalRequest {
            client_name: required(&request, "client_name")?.to_string(),
            credit_score: number(&request, "credit_score")?,
            debt_to_income_ratio: number(&request, "debt_to_income_ratio")?,
            property_value: number(&request, "property_value")?,
            loan_amount: number(&request, "loan_amount")?,
        };
        let decision = approval::make_decision(&approval_request)?;
        tracing::info!(
            "⚖️ Approval decision for {}: {} ({})",
            decision.client_name,
            decision.approved,
            decision.reason
        );
        Ok(serde_json::to_string(&decision)?)
    });
    respond(&state.codec, APPROVAL_OPERATION, result)
}

fn expect_operation(codec: &EnvelopeCodec, body: &str, operation: &str) -> Result<RemoteEnvelope> {
    let request = codec.decode_request(body)?;
    if request.operation_name != operation {
        return Err(LoanError::MalformedEnvelope {
            reason: format!(
                "unknown operation '{}', expected '{}'",
                request.operation_name, operation
            ),
        });
    }
    tracing::debug!("📨 {} request with {} parameters", operation, request.parameters.len());
    Ok(request)
}

fn required<'a>(request: &'a RemoteEnvelope, name: &str) -> Result<&'a str> {
    request
        .parameter(name)
        .ok_or_else(|| LoanError::field_missing(name))
}

fn number(request: &RemoteEnvelope, name: &str) -> Result<f64> {
    let raw = required(request, name)?;
    raw.trim()
        .parse::<f64>()
        .map_err(|e| LoanError::format_error(name, raw, e.to_string()))
}

/// Request problems are the caller's fault; everything else is ours.
fn fault_code(error: &LoanError) -> &'static str {
    match error.category() {
        ErrorCategory::Envelope | ErrorCategory::Payload => "Client",
        _ => "Server",
    }
}

fn respond(codec: &EnvelopeCodec, operation: &str, result: Result<String>) -> Response {
    match result {
        Ok(payload) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, XML_CONTENT_TYPE)],
            codec.encode_response(operation, &payload),
        )
            .into_response(),
        Err(error) => {
            tracing::error!("❌ {} failed: {}", operation, error);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, XML_CONTENT_TYPE)],
                codec.encode_fault(fault_code(&error), &error.to_string()),
            )
                .into_response()
        }
    }
}
