use crate::core::decoders::{render_mapping_literal, Literal};
use crate::domain::model::PropertyEvaluationResult;
use crate::services::reference::ReferenceData;

pub fn evaluate(
    reference: &ReferenceData,
    town: &str,
    surface_area: u32,
    address: &str,
) -> PropertyEvaluationResult {
    let result = PropertyEvaluationResult {
        estimated_value: f64::from(surface_area) * reference.price_per_area(town),
        has_litigation: reference.has_litigation(address),
    };
    tracing::info!(
        "🏠 Evaluated {}m2 in {} at {}: {:?}",
        surface_area,
        town,
        address,
        result
    );
    result
}

pub fn to_mapping_literal(result: &PropertyEvaluationResult) -> String {
    render_mapping_literal(&[
        ("valeur", Literal::Number(result.estimated_value)),
        ("litiges", Literal::Bool(result.has_litigation)),
    ])
}
