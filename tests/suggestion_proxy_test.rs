use std::time::Duration;

use labtrack_api::services::suggestions::{SuggestionRequest, SuggestionService};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(field: &str, value: &str) -> SuggestionRequest {
    SuggestionRequest {
        field_name: field.to_string(),
        input_value: value.to_string(),
    }
}

#[tokio::test]
async fn forwards_the_field_and_decodes_the_verdict() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/suggest"))
        .and(body_json(json!({
            "fieldName": "material_name",
            "inputValue": "Anti-CD3 Antibod"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "isValid": false,
            "suggestions": ["Anti-CD3 Antibody"],
            "errorMessage": "Unknown material name"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = SuggestionService::new(
        Some(format!("{}/suggest", mock_server.uri())),
        Duration::from_secs(2),
    );

    let verdict = service
        .suggest(request("material_name", "Anti-CD3 Antibod"))
        .await;

    assert!(!verdict.is_valid);
    assert_eq!(verdict.suggestions, vec!["Anti-CD3 Antibody".to_string()]);
    assert_eq!(verdict.error_message.as_deref(), Some("Unknown material name"));
}

#[tokio::test]
async fn missing_optional_fields_default_cleanly() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/suggest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "isValid": true
        })))
        .mount(&mock_server)
        .await;

    let service = SuggestionService::new(
        Some(format!("{}/suggest", mock_server.uri())),
        Duration::from_secs(2),
    );

    let verdict = service.suggest(request("project", "IMM-12")).await;

    assert!(verdict.is_valid);
    assert!(verdict.suggestions.is_empty());
    assert!(verdict.error_message.is_none());
}

#[tokio::test]
async fn upstream_errors_degrade_to_pass_through() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/suggest"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let service = SuggestionService::new(
        Some(format!("{}/suggest", mock_server.uri())),
        Duration::from_secs(2),
    );

    let verdict = service.suggest(request("material_name", "anything")).await;

    assert!(verdict.is_valid);
    assert!(verdict.suggestions.is_empty());
    assert!(verdict.error_message.is_none());
}

#[tokio::test]
async fn unreadable_bodies_degrade_to_pass_through() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/suggest"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let service = SuggestionService::new(
        Some(format!("{}/suggest", mock_server.uri())),
        Duration::from_secs(2),
    );

    let verdict = service.suggest(request("material_name", "anything")).await;

    assert!(verdict.is_valid);
    assert!(verdict.suggestions.is_empty());
}

#[tokio::test]
async fn unconfigured_upstream_passes_through_without_a_request() {
    let service = SuggestionService::new(None, Duration::from_secs(2));

    let verdict = service.suggest(request("material_name", "anything")).await;

    assert!(verdict.is_valid);
    assert!(verdict.suggestions.is_empty());
    assert!(verdict.error_message.is_none());
}
