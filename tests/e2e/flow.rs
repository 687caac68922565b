//! Full prepare → submit → retrieve runs against stub services.

use super::{ready_proof_body, stub_config, StubVotingContract, ENCODED_REQUEST};
use swagform_fdc::{
    AttestationConfig, AttestationFlow, AttestationRequest, AttestationSubmitter,
    CancellationToken, DaLayerClient, Error, ProofRetriever, VerifierClient,
};
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_verifier(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/Web2Json/prepareRequest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "VALID",
            "abiEncodedRequest": ENCODED_REQUEST,
        })))
        .mount(server)
        .await;
}

fn flow_for(
    config: &AttestationConfig,
    contract: StubVotingContract,
) -> AttestationFlow<StubVotingContract, DaLayerClient> {
    AttestationFlow::new(
        VerifierClient::new(config.verifier()).unwrap(),
        AttestationSubmitter::new(contract, config.submission_timeout()),
        ProofRetriever::new(
            DaLayerClient::new(config.da_layer()).unwrap(),
            config.retry_policy().unwrap(),
        ),
    )
}

#[tokio::test]
async fn test_health_attestation_end_to_end() {
    let verifier = MockServer::start().await;
    let da_layer = MockServer::start().await;
    mount_verifier(&verifier).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/fdc/proof-by-request-round-raw"))
        .and(body_partial_json(serde_json::json!({ "votingRoundId": 1234 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "proof": [],
            "response_hex": "",
        })))
        .up_to_n_times(1)
        .mount(&da_layer)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/fdc/proof-by-request-round-raw"))
        .and(body_partial_json(serde_json::json!({ "votingRoundId": 1234 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ready_proof_body()))
        .mount(&da_layer)
        .await;

    let config = stub_config(&verifier, &da_layer, 3);
    let flow = flow_for(&config, StubVotingContract::at_round(1234));
    let request = AttestationRequest::health_check("http://localhost:8000").unwrap();

    let retrieved = flow.run(&request, &CancellationToken::new()).await.unwrap();

    assert_eq!(retrieved.submitted.round_id(), 1234);
    assert_eq!(retrieved.submitted.target_url, "http://localhost:8000/health");
    assert_eq!(retrieved.submitted.encoded.as_str(), ENCODED_REQUEST);
    assert_eq!(flow.submitter().contract().submissions(), 1);

    let contract_proof = serde_json::to_value(retrieved.contract_proof()).unwrap();
    assert_eq!(contract_proof["merkleProof"].as_array().unwrap().len(), 2);
    assert_eq!(
        contract_proof["data"]["responseBody"]["abiEncodedData"],
        ready_proof_body()["response_hex"]
    );
    assert_eq!(da_layer.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_rejected_request_is_never_submitted() {
    let verifier = MockServer::start().await;
    let da_layer = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
            "error": "unsupported jq filter",
        })))
        .mount(&verifier)
        .await;

    let config = stub_config(&verifier, &da_layer, 3);
    let flow = flow_for(&config, StubVotingContract::at_round(1));
    let request = AttestationRequest::health_check("http://localhost:8000").unwrap();

    let err = flow.run(&request, &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, Error::VerifierRejected { status: 422, .. }));
    assert_eq!(flow.submitter().contract().submissions(), 0);
    assert!(da_layer.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reverted_submission_stops_before_polling() {
    let verifier = MockServer::start().await;
    let da_layer = MockServer::start().await;
    mount_verifier(&verifier).await;

    let config = stub_config(&verifier, &da_layer, 3);
    let flow = flow_for(&config, StubVotingContract::reverting());
    let request =
        AttestationRequest::tweet_verification("http://localhost:8000", "1940801319423623380")
            .unwrap();

    let err = flow.run(&request, &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, Error::SubmissionFailed(ref m) if m.contains("reverted")));
    assert!(!err.is_retryable());
    assert_eq!(flow.submitter().contract().submissions(), 1);
    assert!(da_layer.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_submitted_request_can_be_retrieved_again() {
    let verifier = MockServer::start().await;
    let da_layer = MockServer::start().await;
    mount_verifier(&verifier).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::Value::Null))
        .up_to_n_times(2)
        .mount(&da_layer)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ready_proof_body()))
        .mount(&da_layer)
        .await;

    let config = stub_config(&verifier, &da_layer, 2);
    let flow = flow_for(&config, StubVotingContract::at_round(88));
    let request = AttestationRequest::health_check("http://localhost:8000").unwrap();

    let prepared = flow.prepare(&request).await.unwrap();
    let submitted = flow.submit(prepared).await.unwrap();
    let cancel = CancellationToken::new();

    let err = flow.retrieve(&submitted, &cancel).await.unwrap_err();
    assert!(matches!(err, Error::ProofNotAvailable { round_id: 88, attempts: 2, .. }));
    assert!(err.is_retryable());

    let retrieved = flow.retrieve(&submitted, &cancel).await.unwrap();
    assert_eq!(retrieved.submitted.round_id(), 88);
    assert_eq!(flow.submitter().contract().submissions(), 1);
}

#[tokio::test]
async fn test_flow_from_config_file() {
    let verifier = MockServer::start().await;
    let da_layer = MockServer::start().await;
    mount_verifier(&verifier).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ready_proof_body()))
        .expect(1)
        .mount(&da_layer)
        .await;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fdc.toml");
    stub_config(&verifier, &da_layer, 1).to_file(&path).unwrap();

    let config = AttestationConfig::from_file(&path).unwrap();
    config.validate().unwrap();
    let flow = flow_for(&config, StubVotingContract::at_round(5));
    let request = AttestationRequest::health_check("http://localhost:8000").unwrap();

    let retrieved = flow.run(&request, &CancellationToken::new()).await.unwrap();
    assert_eq!(retrieved.submitted.round_id(), 5);
}

#[tokio::test]
async fn test_configured_submission_timeout_applies() {
    let verifier = MockServer::start().await;
    let da_layer = MockServer::start().await;
    mount_verifier(&verifier).await;

    let mut config = stub_config(&verifier, &da_layer, 3);
    config.submission_timeout_secs = 1;
    config.validate().unwrap();
    let flow = flow_for(&config, StubVotingContract::hanging());
    let request = AttestationRequest::health_check("http://localhost:8000").unwrap();

    let err = flow.run(&request, &CancellationToken::new()).await.unwrap_err();
    assert!(
        matches!(err, Error::SubmissionFailed(ref m) if m.contains("timed out after 1s")),
        "got {err:?}"
    );
    assert_eq!(flow.submitter().contract().submissions(), 1);
    assert!(da_layer.received_requests().await.unwrap().is_empty());
}
