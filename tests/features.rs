mod common;

use std::collections::HashMap;

use reqwest::StatusCode;
use serde_json::json;
use space_client::{EvaluationOptions, LimitValue, FLAG_NOT_FOUND};
use wiremock::{
    matchers::{body_json, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

use common::{client, requests};

#[tokio::test]
async fn evaluates_feature_with_expected_consumption() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/features/user-1/zoom-meetings"))
        .and(query_param("details", "true"))
        .and(query_param("server", "true"))
        .and(body_json(json!({"zoom-maxMeetings": 1.0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "eval": true,
            "used": {"zoom-maxMeetings": 4},
            "limit": {"zoom-maxMeetings": 5}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let expected_consumption = HashMap::from([("zoom-maxMeetings".to_owned(), 1.0)]);
    let result = client(&server)
        .features()
        .evaluate(
            "user-1",
            "zoom-meetings",
            &expected_consumption,
            EvaluationOptions::default()
                .with_details(true)
                .with_server(true),
        )
        .await
        .unwrap();

    assert!(result.eval);
    assert_eq!(result.used.unwrap()["zoom-maxMeetings"], LimitValue::Integer(4));
    assert_eq!(result.limit.unwrap()["zoom-maxMeetings"].as_integer(), Some(5));
    assert!(result.error.is_none());
}

#[tokio::test]
async fn evaluation_without_options_sends_no_flags() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/features/user-1/zoom-meetings"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"eval": false})))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server)
        .features()
        .evaluate(
            "user-1",
            "zoom-meetings",
            &HashMap::new(),
            EvaluationOptions::default(),
        )
        .await
        .unwrap();

    assert!(!result.eval);
    assert!(!result.is_flag_not_found());

    let requests = requests(&server).await;
    assert_eq!(requests[0].url.query(), None);
}

#[tokio::test]
async fn unknown_feature_is_a_domain_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/features/user-1/zoom-unknown"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "eval": false,
            "used": null,
            "limit": null,
            "error": {"code": FLAG_NOT_FOUND, "message": "Feature zoom-unknown not found"}
        })))
        .mount(&server)
        .await;

    let result = client(&server)
        .features()
        .evaluate(
            "user-1",
            "zoom-unknown",
            &HashMap::new(),
            EvaluationOptions::default(),
        )
        .await
        .unwrap();

    assert!(!result.eval);
    assert!(result.is_flag_not_found());
    assert_eq!(result.error.unwrap().code, FLAG_NOT_FOUND);
}

#[tokio::test]
async fn unknown_feature_reported_with_error_status_is_still_an_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/features/user-1/zoom-unknown"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "eval": false,
            "error": {"code": FLAG_NOT_FOUND, "message": "Feature zoom-unknown not found"}
        })))
        .mount(&server)
        .await;

    let result = client(&server)
        .features()
        .evaluate(
            "user-1",
            "zoom-unknown",
            &HashMap::new(),
            EvaluationOptions::default(),
        )
        .await
        .unwrap();

    assert!(result.is_flag_not_found());
}

#[tokio::test]
async fn server_failure_is_a_remote_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/features/user-1/zoom-meetings"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client(&server)
        .features()
        .evaluate(
            "user-1",
            "zoom-meetings",
            &HashMap::new(),
            EvaluationOptions::default(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
}

#[tokio::test]
async fn reverts_evaluation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/features/user-1"))
        .and(query_param("revert", "true"))
        .and(query_param("latest", "false"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let reverted = client(&server)
        .features()
        .revert_evaluation("user-1", "zoom-meetings", false)
        .await
        .unwrap();
    assert!(reverted);
}

#[tokio::test]
async fn revert_without_prior_evaluation_is_noop() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/features/user-1"))
        .and(query_param("latest", "true"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"error": "No evaluation to revert"})),
        )
        .mount(&server)
        .await;

    let features = client(&server);
    let features = features.features();
    assert!(!features
        .revert_evaluation("user-1", "zoom-meetings", true)
        .await
        .unwrap());
    assert!(!features
        .revert_evaluation("user-1", "zoom-meetings", true)
        .await
        .unwrap());
}

#[tokio::test]
async fn revert_failure_is_a_remote_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/features/user-1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client(&server)
        .features()
        .revert_evaluation("user-1", "zoom-meetings", true)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
}

#[tokio::test]
async fn generates_pricing_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/features/user-1/pricing-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"pricingToken": "eyJhbGciOi"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let token = client(&server)
        .features()
        .generate_user_pricing_token("user-1")
        .await
        .unwrap();
    assert_eq!(token, "eyJhbGciOi");
}

#[tokio::test]
async fn missing_pricing_token_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/features/user-1/pricing-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let token = client(&server)
        .features()
        .generate_user_pricing_token("user-1")
        .await
        .unwrap();
    assert_eq!(token, "");
}
