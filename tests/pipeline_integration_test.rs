use httpmock::prelude::*;
use loan_pipeline::core::pipeline::{EXTRACTION_OPERATION, PROPERTY_OPERATION, SOLVENCY_OPERATION};
use loan_pipeline::domain::model::Stage;
use loan_pipeline::{EnvelopeCodec, LoanConfig, LoanError, LoanPipeline, ServiceEndpoints, SoapClient};
use std::time::Duration;

const LETTER: &str = "Hello, I am Alice Smith (client-002) and I would like to buy a 100m2 \
apartment at 1 rue X, Bordeaux for 25000 euros.";

fn extraction_json(town: Option<&str>) -> String {
    let mut address = serde_json::json!({
        "postalCode": "33000",
        "completeAddress": "1 rue X, Bordeaux"
    });
    if let Some(town) = town {
        address["town"] = serde_json::Value::String(town.to_string());
    }
    serde_json::json!({
        "name": "Alice Smith",
        "customerId": "client-002",
        "description": {
            "accommodationType": "apartment",
            "surfaceArea": "100m2",
            "address": address
        },
        "contact": {"phone": "+33 5 67784890", "email": "alice@example.com"},
        "loanAmount": 20000,
        "monthlyIncome": 3000,
        "monthlyExpenses": 2500,
        "propertyPrice": 25000
    })
    .to_string()
}

fn endpoints(server: &MockServer) -> ServiceEndpoints {
    ServiceEndpoints {
        extraction: server.url("/extractInformationsService"),
        solvency: server.url("/solvabiliteService"),
        property_evaluation: server.url("/evaluationProprieteService"),
    }
}

fn pipeline(server: &MockServer, timeout: Duration) -> LoanPipeline<SoapClient> {
    LoanPipeline::new(SoapClient::new(timeout), endpoints(server), EnvelopeCodec::default())
}

fn respond(operation: &str, payload: &str) -> String {
    EnvelopeCodec::default().encode_response(operation, payload)
}

#[tokio::test]
async fn test_approved_application_end_to_end() {
    let server = MockServer::start();

    let extraction = server.mock(|when, then| {
        when.method(POST)
            .path("/extractInformationsService")
            .header("content-type", "application/soap+xml; charset=utf-8")
            .body_contains("<spy:extraire_information>")
            .body_contains("client-002");
        then.status(200)
            .body(respond(EXTRACTION_OPERATION, &extraction_json(Some("Bordeaux"))));
    });
    let solvency = server.mock(|when, then| {
        when.method(POST)
            .path("/solvabiliteService")
            .body_contains("<spy:clientId>client-002</spy:clientId>");
        then.status(200).body(respond(
            SOLVENCY_OPERATION,
            "{'financial_cap': 500, 'score': 60}",
        ));
    });
    let property = server.mock(|when, then| {
        when.method(POST)
            .path("/evaluationProprieteService")
            .body_contains("<spy:ville>Bordeaux</spy:ville>")
            .body_contains("<spy:taille_logement>100</spy:taille_logement>")
            .body_contains("<spy:adresse>1 rue X, Bordeaux</spy:adresse>");
        then.status(200).body(respond(
            PROPERTY_OPERATION,
            "{'valeur': 20000, 'litiges': False}",
        ));
    });

    let outcome = pipeline(&server, Duration::from_secs(5))
        .run("loan_test_approved", LETTER.to_string())
        .await
        .unwrap();

    extraction.assert_hits(1);
    solvency.assert_hits(1);
    property.assert_hits(1);

    assert_eq!(outcome.request_id, "loan_test_approved");
    assert_eq!(outcome.application.customer_id, "client-002");
    assert_eq!(outcome.application.property_description.surface_area, 100);
    assert_eq!(outcome.solvency.credit_score, 60.0);
    assert_eq!(outcome.property.estimated_value, 20000.0);
    assert!(outcome.verdict.approved);
    assert!(outcome.verdict.reasons.is_empty());
    assert!(outcome.verdict.message.starts_with("Dear Alice Smith,"));
}

#[tokio::test]
async fn test_litigation_rejects_application() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/extractInformationsService");
        then.status(200)
            .body(respond(EXTRACTION_OPERATION, &extraction_json(Some("Bordeaux"))));
    });
    server.mock(|when, then| {
        when.method(POST).path("/solvabiliteService");
        then.status(200).body(respond(
            SOLVENCY_OPERATION,
            "{'financial_cap': 500, 'score': 60}",
        ));
    });
    server.mock(|when, then| {
        when.method(POST).path("/evaluationProprieteService");
        then.status(200).body(respond(
            PROPERTY_OPERATION,
            "{'valeur': 20000, 'litiges': True}",
        ));
    });

    let outcome = pipeline(&server, Duration::from_secs(5))
        .run("loan_test_litigation", LETTER.to_string())
        .await
        .unwrap();

    assert!(!outcome.verdict.approved);
    assert_eq!(
        outcome.verdict.reasons,
        vec!["Potential litigation on the property".to_string()]
    );
    assert!(outcome
        .verdict
        .message
        .contains("• Potential litigation on the property"));
}

#[tokio::test]
async fn test_solvency_fault_stops_before_property_evaluation() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/extractInformationsService");
        then.status(200)
            .body(respond(EXTRACTION_OPERATION, &extraction_json(Some("Bordeaux"))));
    });
    let solvency = server.mock(|when, then| {
        when.method(POST).path("/solvabiliteService");
        then.status(500).body(
            EnvelopeCodec::default().encode_fault("Server", "credit bureau unavailable"),
        );
    });
    let property = server.mock(|when, then| {
        when.method(POST).path("/evaluationProprieteService");
        then.status(200).body(respond(
            PROPERTY_OPERATION,
            "{'valeur': 20000, 'litiges': False}",
        ));
    });

    let failure = pipeline(&server, Duration::from_secs(5))
        .run("loan_test_solvency_down", LETTER.to_string())
        .await
        .unwrap_err();

    solvency.assert_hits(1);
    property.assert_hits(0);
    assert_eq!(failure.stage, Stage::Solvency);
    match &failure.error {
        LoanError::Transport { endpoint, cause } => {
            assert!(endpoint.ends_with("/solvabiliteService"));
            assert!(cause.contains("credit bureau unavailable"));
        }
        other => panic!("expected a transport error, got {other:?}"),
    }
    assert!(failure.user_message().starts_with("Error during solvency check"));
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let server = MockServer::start();
    let extraction = server.mock(|when, then| {
        when.method(POST).path("/extractInformationsService");
        then.status(200)
            .delay(Duration::from_secs(2))
            .body(respond(EXTRACTION_OPERATION, &extraction_json(Some("Bordeaux"))));
    });
    let solvency = server.mock(|when, then| {
        when.method(POST).path("/solvabiliteService");
        then.status(200).body(respond(
            SOLVENCY_OPERATION,
            "{'financial_cap': 500, 'score': 60}",
        ));
    });

    let failure = pipeline(&server, Duration::from_millis(200))
        .run("loan_test_timeout", LETTER.to_string())
        .await
        .unwrap_err();

    extraction.assert_hits(1);
    solvency.assert_hits(0);
    assert_eq!(failure.stage, Stage::InformationExtraction);
    assert!(matches!(failure.error, LoanError::Transport { .. }));
}

#[tokio::test]
async fn test_missing_town_never_calls_property_service() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/extractInformationsService");
        then.status(200)
            .body(respond(EXTRACTION_OPERATION, &extraction_json(None)));
    });
    server.mock(|when, then| {
        when.method(POST).path("/solvabiliteService");
        then.status(200).body(respond(
            SOLVENCY_OPERATION,
            "{'financial_cap': 500, 'score': 60}",
        ));
    });
    let property = server.mock(|when, then| {
        when.method(POST).path("/evaluationProprieteService");
        then.status(200).body(respond(
            PROPERTY_OPERATION,
            "{'valeur': 20000, 'litiges': False}",
        ));
    });

    let failure = pipeline(&server, Duration::from_secs(5))
        .run("loan_test_no_town", LETTER.to_string())
        .await
        .unwrap_err();

    property.assert_hits(0);
    assert_eq!(failure.stage, Stage::PropertyEvaluation);
    assert!(matches!(
        failure.error,
        LoanError::StageDependencyUnmet { ref field, .. } if field == "description.address.town"
    ));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    let config = LoanConfig::from_toml_str(
        r#"
[services]
extraction_endpoint = "http://127.0.0.1:1/extractInformationsService"
timeout_seconds = 2
"#,
    )
    .unwrap();

    let pipeline = LoanPipeline::new(config.client(), config.endpoints(), config.codec());
    let failure = pipeline
        .run("loan_test_unreachable", LETTER.to_string())
        .await
        .unwrap_err();

    assert_eq!(failure.stage, Stage::InformationExtraction);
    assert!(matches!(failure.error, LoanError::Transport { .. }));
}
