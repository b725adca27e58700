use crate::core::decision::decide_from_results;
use crate::core::decoders::{
    decode_information_extraction, decode_property_evaluation, decode_solvency,
};
use crate::core::envelope::EnvelopeCodec;
use crate::domain::model::{
    LoanApplicationContext, PipelineOutcome, PropertyEvaluationResult, SolvencyResult, Stage,
    Verdict,
};
use crate::domain::ports::RemoteCaller;
use crate::utils::error::{LoanError, Result};
use std::time::Instant;
use thiserror::Error;
use tracing::Instrument;

pub const EXTRACTION_OPERATION: &str = "extraire_information";
pub const SOLVENCY_OPERATION: &str = "etudier_solvabilite";
pub const PROPERTY_OPERATION: &str = "evaluer_propriete";

/// `loan_<UTC timestamp>`, used when the caller does not supply an id.
pub fn new_request_id() -> String {
    format!("loan_{}", chrono::Utc::now().format("%Y%m%d_%H%M%S"))
}

/// Where each stage's remote service lives. Passed in at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    pub extraction: String,
    pub solvency: String,
    pub property_evaluation: String,
}

impl ServiceEndpoints {
    pub fn for_stage(&self, stage: Stage) -> &str {
        match stage {
            Stage::InformationExtraction => &self.extraction,
            Stage::Solvency => &self.solvency,
            Stage::PropertyEvaluation => &self.property_evaluation,
        }
    }
}

/// Terminal failure of one request, tagged with the stage that produced it.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {error}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub error: LoanError,
}

impl StageFailure {
    pub fn user_message(&self) -> String {
        format!(
            "Error during {}: {}",
            self.stage,
            self.error.user_friendly_message()
        )
    }
}

/// Each state owns exactly the data the next transition needs, so a stage
/// can only add its own result and never replace an earlier one.
#[derive(Debug)]
pub enum PipelineState {
    Extracting {
        document_text: String,
    },
    CheckingSolvency {
        application: LoanApplicationContext,
    },
    EvaluatingProperty {
        application: LoanApplicationContext,
        solvency: SolvencyResult,
    },
    Decided {
        application: LoanApplicationContext,
        solvency: SolvencyResult,
        property: PropertyEvaluationResult,
        verdict: Verdict,
    },
    Failed(StageFailure),
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Decided { .. } | PipelineState::Failed(_))
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineState::Extracting { .. } => Some(Stage::InformationExtraction),
            PipelineState::CheckingSolvency { .. } => Some(Stage::Solvency),
            PipelineState::EvaluatingProperty { .. } => Some(Stage::PropertyEvaluation),
            PipelineState::Decided { .. } | PipelineState::Failed(_) => None,
        }
    }
}

/// Sequential extract -> solvency -> property evaluation -> decision workflow.
pub struct LoanPipeline<C: RemoteCaller> {
    caller: C,
    endpoints: ServiceEndpoints,
    codec: EnvelopeCodec,
}

impl<C: RemoteCaller> LoanPipeline<C> {
    pub fn new(caller: C, endpoints: ServiceEndpoints, codec: EnvelopeCodec) -> Self {
        Self {
            caller,
            endpoints,
            codec,
        }
    }

    pub fn endpoints(&self) -> &ServiceEndpoints {
        &self.endpoints
    }

    pub async fn run(
        &self,
        request_id: &str,
        document_text: String,
    ) -> std::result::Result<PipelineOutcome, StageFailure> {
        let span = tracing::info_span!("loan_request", request_id = %request_id);
        async move {
            let started = Instant::now();
            let mut state = PipelineState::Extracting { document_text };

            loop {
                state = match self.advance(state).await {
                    PipelineState::Decided {
                        application,
                        solvency,
                        property,
                        verdict,
                    } => {
                        tracing::info!(
                            "✅ Application {} decided in {:?}: {}",
                            application.customer_id,
                            started.elapsed(),
                            if verdict.approved { "approved" } else { "rejected" }
                        );
                        return Ok(PipelineOutcome {
                            request_id: request_id.to_string(),
                            application,
                            solvency,
                            property,
                            verdict,
                        });
                    }
                    PipelineState::Failed(failure) => {
                        tracing::error!(
                            "❌ Pipeline aborted after {:?}: {}",
                            started.elapsed(),
                            failure
                        );
                        return Err(failure);
                    }
                    next => next,
                };
            }
        }
        .instrument(span)
        .await
    }

    /// Performs one transition. Terminal states are returned unchanged.
    pub async fn advance(&self, state: PipelineState) -> PipelineState {
        match state {
            PipelineState::Extracting { document_text } => {
                match self.extract(&document_text).await {
                    Ok(application) => PipelineState::CheckingSolvency { application },
                    Err(error) => fail(Stage::InformationExtraction, error),
                }
            }
            PipelineState::CheckingSolvency { application } => {
                match self.check_solvency(&application).await {
                    Ok(solvency) => PipelineState::EvaluatingProperty {
                        application,
                        solvency,
                    },
                    Err(error) => fail(Stage::Solvency, error),
                }
            }
            PipelineState::EvaluatingProperty {
                application,
                solvency,
            } => match self.evaluate_property(&application).await {
                Ok(property) => {
                    let verdict = decide_from_results(
                        application.declared_property_price,
                        &application.name,
                        &solvency,
                        &property,
                    );
                    PipelineState::Decided {
                        application,
                        solvency,
                        property,
                        verdict,
                    }
                }
                Err(error) => fail(Stage::PropertyEvaluation, error),
            },
            terminal => terminal,
        }
    }

    async fn extract(&self, document_text: &str) -> Result<LoanApplicationContext> {
        let payload = self
            .invoke(
                Stage::InformationExtraction,
                EXTRACTION_OPERATION,
                &[("demande", document_text.to_string())],
            )
            .await?;
        let application = decode_information_extraction(&payload)?;
        tracing::info!(
            "📥 Extracted application for customer {} ({})",
            application.customer_id,
            application.name
        );
        Ok(application)
    }

    async fn check_solvency(&self, application: &LoanApplicationContext) -> Result<SolvencyResult> {
        if application.customer_id.trim().is_empty() {
            return Err(LoanError::StageDependencyUnmet {
                stage: Stage::Solvency.to_string(),
                field: "customerId".to_string(),
            });
        }

        let payload = self
            .invoke(
                Stage::Solvency,
                SOLVENCY_OPERATION,
                &[("clientId", application.customer_id.clone())],
            )
            .await?;
        let solvency = decode_solvency(&payload)?;
        tracing::info!(
            "💳 Solvency: score {}, financial capacity {}",
            solvency.credit_score,
            solvency.financial_capacity
        );
        Ok(solvency)
    }

    async fn evaluate_property(
        &self,
        application: &LoanApplicationContext,
    ) -> Result<PropertyEvaluationResult> {
        let description = &application.property_description;
        let town = description
            .address
            .town
            .as_deref()
            .filter(|town| !town.trim().is_empty())
            .ok_or_else(|| LoanError::StageDependencyUnmet {
                stage: Stage::PropertyEvaluation.to_string(),
                field: "description.address.town".to_string(),
            })?;
        if description.address.complete_address.trim().is_empty() {
            return Err(LoanError::StageDependencyUnmet {
                stage: Stage::PropertyEvaluation.to_string(),
                field: "description.address.completeAddress".to_string(),
            });
        }

        let payload = self
            .invoke(
                Stage::PropertyEvaluation,
                PROPERTY_OPERATION,
                &[
                    ("ville", town.to_string()),
                    ("taille_logement", description.surface_area.to_string()),
                    ("adresse", description.address.complete_address.clone()),
                ],
            )
            .await?;
        let property = decode_property_evaluation(&payload)?;
        tracing::info!(
            "🏠 Property valued at {} (litigation: {})",
            property.estimated_value,
            property.has_litigation
        );
        Ok(property)
    }

    async fn invoke(&self, stage: Stage, operation: &str, params: &[(&str, String)]) -> Result<String> {
        let endpoint = self.endpoints.for_stage(stage);
        tracing::info!("🚀 Stage started: {} -> {}", stage, endpoint);

        let envelope = self.codec.encode(operation, params);
        let response = self.caller.call(endpoint, &envelope).await?;
        let payload = self.codec.decode(&response)?;
        tracing::debug!("📦 {} payload: {}", stage, payload);
        Ok(payload)
    }
}

fn fail(stage: Stage, error: LoanError) -> PipelineState {
    tracing::error!("❌ Stage {} failed: {}", stage, error);
    PipelineState::Failed(StageFailure { stage, error })
}
