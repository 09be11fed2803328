// email-check-lib/tests/integration.rs

//! Integration tests against a mocked provider endpoint

use email_check_lib::{
    CancellationToken, EmailCheckError, EmailValidator, ProviderErrorPolicy, ValidationRequest,
    ValidationResult, ValidationTransport, ValidatorConfig, ZeroBounceTransport,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> ValidatorConfig {
    ValidatorConfig::new("test-key")
        .with_provider_url(format!("{}/v2/validate", server.uri()))
        .with_timeout(Duration::from_millis(500))
        .with_rate_limit(1000, 1000)
}

async fn mock_status(server: &MockServer, email: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/v2/validate"))
        .and(query_param("email", email))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_request_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/validate"))
        .and(query_param("api_key", "test-key"))
        .and(query_param("email", "user@example.com"))
        .and(query_param("ip_address", "192.0.2.10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "address": "user@example.com",
            "status": "catch-all",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = ZeroBounceTransport::with_config(&config_for(&server)).unwrap();
    let request = ValidationRequest::new("user@example.com")
        .unwrap()
        .with_origin_address("192.0.2.10");

    let result = transport
        .validate(&request, Duration::from_secs(1))
        .await
        .unwrap();

    assert_eq!(result, ValidationResult::new("catch-all"));
}

#[tokio::test]
async fn test_origin_address_omitted_when_absent() {
    let server = MockServer::start().await;
    mock_status(&server, "user@example.com", json!({"status": "valid"})).await;

    let validator = EmailValidator::with_config(config_for(&server)).unwrap();
    validator
        .validate_one("user@example.com", &CancellationToken::new())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0]
        .url
        .query_pairs()
        .all(|(key, _)| key != "ip_address"));
}

#[tokio::test]
async fn test_provider_error_surfaces_with_result() {
    let server = MockServer::start().await;
    mock_status(
        &server,
        "user@example.com",
        json!({"status": "unknown", "error": "Invalid API Key"}),
    )
    .await;

    let validator = EmailValidator::with_config(config_for(&server)).unwrap();
    let err = validator
        .validate_one("user@example.com", &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        EmailCheckError::ProviderReportedError { message, result } => {
            assert_eq!(message, "Invalid API Key");
            assert_eq!(result.status, "unknown");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_provider_error_accepted_by_policy() {
    let server = MockServer::start().await;
    mock_status(
        &server,
        "user@example.com",
        json!({"status": "unknown", "error": "Invalid API Key"}),
    )
    .await;

    let config = config_for(&server).with_provider_error_policy(ProviderErrorPolicy::Accept);
    let validator = EmailValidator::with_config(config).unwrap();
    let result = validator
        .validate_one("user@example.com", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.error.as_deref(), Some("Invalid API Key"));
}

#[tokio::test]
async fn test_malformed_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let validator = EmailValidator::with_config(config_for(&server)).unwrap();
    let err = validator
        .validate_one("user@example.com", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, EmailCheckError::MalformedResponse { .. }));
}

#[tokio::test]
async fn test_provider_throttling_maps_to_rate_limit_denied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let validator = EmailValidator::with_config(config_for(&server)).unwrap();
    let err = validator
        .validate_one("user@example.com", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, EmailCheckError::RateLimitDenied { .. }));
}

#[tokio::test]
async fn test_timeout_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "valid"}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = config_for(&server).with_timeout(Duration::from_millis(100));
    let validator = EmailValidator::with_config(config).unwrap();
    let err = validator
        .validate_one("user@example.com", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, EmailCheckError::NetworkError { .. }));
}

#[tokio::test]
async fn test_unreachable_provider_is_network_error() {
    // Nothing listens on the discard port
    let config = ValidatorConfig::new("test-key")
        .with_provider_url("http://127.0.0.1:9/v2/validate")
        .with_timeout(Duration::from_millis(500));
    let validator = EmailValidator::with_config(config).unwrap();

    let err = validator
        .validate_one("user@example.com", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, EmailCheckError::NetworkError { .. }));
}

#[tokio::test]
async fn test_bulk_three_addresses_two_workers() {
    let server = MockServer::start().await;
    for email in ["a@x.com", "b@x.com", "c@x.com"] {
        mock_status(&server, email, json!({"status": "valid"})).await;
    }

    let validator = EmailValidator::with_config(config_for(&server)).unwrap();
    let addresses = vec![
        "a@x.com".to_string(),
        "b@x.com".to_string(),
        "c@x.com".to_string(),
    ];

    let report = validator
        .bulk_validate(addresses.clone(), 2, &CancellationToken::new())
        .await;

    assert_eq!(report.len(), 3);
    assert_eq!(report.succeeded(), 3);
    let emails: Vec<_> = report.outcomes.iter().map(|o| o.email.clone()).collect();
    assert_eq!(emails, addresses);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_bulk_one_network_failure_others_succeed() {
    let server = MockServer::start().await;
    mock_status(&server, "a@x.com", json!({"status": "valid"})).await;
    mock_status(&server, "c@x.com", json!({"status": "invalid"})).await;
    Mock::given(method("GET"))
        .and(query_param("email", "b@x.com"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "valid"}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = config_for(&server).with_timeout(Duration::from_millis(200));
    let validator = EmailValidator::with_config(config).unwrap();

    let report = validator
        .bulk_validate(
            vec!["a@x.com".into(), "b@x.com".into(), "c@x.com".into()],
            3,
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(report.outcomes[0].outcome.as_ref().unwrap().status, "valid");
    assert!(matches!(
        report.outcomes[1].outcome,
        Err(EmailCheckError::NetworkError { .. })
    ));
    assert_eq!(report.outcomes[2].outcome.as_ref().unwrap().status, "invalid");
    assert_eq!(report.summary().get("network_error"), Some(&1));
}
