use narvik::application::ports::{ObjectStoreGateway, StorageError};
use narvik::domain::{JobId, StorageKey};
use narvik::infrastructure::storage::{S3Gateway, S3GatewayConfig};

fn unreachable_gateway() -> S3Gateway {
    S3Gateway::new(S3GatewayConfig {
        bucket: "narvik-test".to_string(),
        region: "eu-north-1".to_string(),
        access_key: "test".to_string(),
        secret_key: "test".to_string(),
        // Nothing listens here; every request fails before reaching S3.
        endpoint_url: Some("http://127.0.0.1:1".to_string()),
    })
}

#[tokio::test]
async fn given_unreachable_backend_when_getting_object_then_error_is_backend_not_missing() {
    let gateway = unreachable_gateway();
    let key = StorageKey::original(JobId::new(), "mp4");

    let err = gateway.get_object(&key).await.expect_err("must fail");

    // A transient transport failure must never read as a missing object:
    // the orchestrator treats NotFound as "not finalized yet".
    assert!(
        matches!(err, StorageError::Backend(_)),
        "expected Backend, got: {err:?}"
    );
}
