//! End-to-end tests against a local HTTP server.

use bytes::Bytes;
use s3_multipart::config::MultipartConfig;
use s3_multipart::error::{MultipartError, S3Error};
use s3_multipart::mocks::TestFixtures;
use s3_multipart::{BucketContext, HttpEngine, MultipartClient};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> MultipartClient {
    let config = MultipartConfig {
        part_size: 4,
        concurrency: 2,
        max_retries: 2,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
        ..MultipartConfig::default()
    };
    let engine = HttpEngine::from_config(Arc::new(config.clone())).unwrap();
    MultipartClient::new(config, Arc::new(engine))
}

fn target(server: &MockServer) -> BucketContext {
    BucketContext::new("test-bucket", TestFixtures::credentials())
        .with_endpoint(&server.uri())
        .unwrap()
}

#[tokio::test]
async fn test_full_upload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/test-bucket/big.bin"))
        .and(query_param("uploads", ""))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TestFixtures::initiate_xml("U1")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/test-bucket/big.bin"))
        .and(query_param("uploadId", "U1"))
        .and(header_exists("x-amz-content-sha256"))
        .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"part-etag\""))
        .expect(3)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/test-bucket/big.bin"))
        .and(query_param("uploadId", "U1"))
        .and(body_string_contains("<PartNumber>3</PartNumber>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TestFixtures::complete_xml(
            "http://localhost/test-bucket/big.bin",
            "&quot;combined-3&quot;",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let result = client()
        .upload(&target(&server), "big.bin", Bytes::from_static(b"abcdefghij"), None)
        .await
        .unwrap();

    assert_eq!(result.etag, "\"combined-3\"");
    assert_eq!(result.location, "http://localhost/test-bucket/big.bin");
}

#[tokio::test]
async fn test_initiate_retries_after_503() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/test-bucket/k"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/test-bucket/k"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TestFixtures::initiate_xml("U2")))
        .mount(&server)
        .await;

    let session = client()
        .initiate(&target(&server), "k", None)
        .await
        .unwrap();
    assert_eq!(session.upload_id, "U2");
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_error_document_from_server() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/test-bucket/k"))
        .and(query_param("uploadId", "gone"))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("x-amz-request-id", "REQ123")
                .set_body_string(TestFixtures::error_xml(
                    "NoSuchUpload",
                    "The specified upload does not exist",
                )),
        )
        .mount(&server)
        .await;

    let client = client();
    let session = s3_multipart::UploadSession::new(target(&server), "k", "gone");
    let err = client.abort(&session).await.unwrap_err();

    assert!(matches!(
        err,
        S3Error::Multipart(MultipartError::UploadNotFound { .. })
    ));
}
