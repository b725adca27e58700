pub mod client;
pub mod decision;
pub mod decoders;
pub mod document;
pub mod envelope;
pub mod pipeline;

pub use crate::domain::model::{
    LoanApplicationContext, PipelineOutcome, PropertyEvaluationResult, RemoteEnvelope,
    SolvencyResult, Stage, Verdict,
};
pub use crate::domain::ports::{FieldExtractor, RemoteCaller};
pub use crate::utils::error::Result;
