//! DA layer polling against a stub server.

use super::{ready_proof_body, stub_config, ENCODED_REQUEST};
use swagform_fdc::{
    CancellationToken, DaLayerClient, EncodedAttestationRequest, Error, ProofRetriever,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROOF_PATH: &str = "/api/v1/fdc/proof-by-request-round-raw";

fn retriever_for(server: &MockServer, max_attempts: u32) -> ProofRetriever<DaLayerClient> {
    let config = stub_config(server, server, max_attempts);
    ProofRetriever::new(
        DaLayerClient::new(config.da_layer()).unwrap(),
        config.retry_policy().unwrap(),
    )
}

fn encoded() -> EncodedAttestationRequest {
    EncodedAttestationRequest::new(ENCODED_REQUEST).unwrap()
}

#[tokio::test]
async fn test_proof_ready_on_third_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PROOF_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response_hex": "",
            "proof": [],
        })))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(PROOF_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(ready_proof_body()))
        .expect(1)
        .mount(&server)
        .await;

    let proof = retriever_for(&server, 3)
        .retrieve(&encoded(), 1_000_000, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(proof.proof.len(), 2);
    assert_eq!(proof.merkle_siblings().unwrap()[1], [0xbb; 32]);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_budget_exhausted_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PROOF_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response_hex": "0x00",
            "proof": [],
        })))
        .expect(2)
        .mount(&server)
        .await;

    let err = retriever_for(&server, 2)
        .retrieve(&encoded(), 42, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        Error::ProofNotAvailable {
            round_id,
            attempts,
            last_status,
        } => {
            assert_eq!(round_id, 42);
            assert_eq!(attempts, 2);
            assert_eq!(last_status, Some(200));
        }
        other => panic!("expected ProofNotAvailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unfinalized_round_statuses_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("round not finalized"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ready_proof_body()))
        .mount(&server)
        .await;

    let proof = retriever_for(&server, 5)
        .retrieve(&encoded(), 7, &CancellationToken::new())
        .await
        .unwrap();
    assert!(!proof.response_hex.is_empty());
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_query_wire_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PROOF_PATH))
        .and(body_json(serde_json::json!({
            "votingRoundId": 1_000_000,
            "requestBytes": ENCODED_REQUEST,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ready_proof_body()))
        .expect(1)
        .mount(&server)
        .await;

    retriever_for(&server, 1)
        .retrieve(&encoded(), 1_000_000, &CancellationToken::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_malformed_body_stops_polling() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "proof": "not-an-array",
            "response_hex": "0x00",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = retriever_for(&server, 5)
        .retrieve(&encoded(), 9, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MalformedProofResponse { attempt: 1, .. }));
}

#[tokio::test]
async fn test_unreachable_da_layer_surfaces_transport_error() {
    let mut config = swagform_fdc::AttestationConfig::coston2("key");
    config.da_layer_url = "http://127.0.0.1:1/".to_string();
    config.max_attempts = 2;
    config.poll_interval_secs = 0;
    let retriever = ProofRetriever::new(
        DaLayerClient::new(config.da_layer()).unwrap(),
        config.retry_policy().unwrap(),
    );

    let err = retriever
        .retrieve(&encoded(), 3, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn test_cancelled_token_skips_polling() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ready_proof_body()))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = retriever_for(&server, 3)
        .retrieve(&encoded(), 5, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled { round_id: 5, attempts: 0 }));
}

#[tokio::test]
async fn test_da_layer_api_key_header_sent_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PROOF_PATH))
        .and(header("X-API-KEY", "da-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ready_proof_body()))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = stub_config(&server, &server, 1);
    config.da_layer_api_key = Some("da-secret".to_string());
    config.validate().unwrap();
    let retriever = ProofRetriever::new(
        DaLayerClient::new(config.da_layer()).unwrap(),
        config.retry_policy().unwrap(),
    );

    retriever
        .retrieve(&encoded(), 11, &CancellationToken::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_no_api_key_header_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ready_proof_body()))
        .mount(&server)
        .await;

    retriever_for(&server, 1)
        .retrieve(&encoded(), 12, &CancellationToken::new())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(!requests[0].headers.contains_key("x-api-key"));
}
