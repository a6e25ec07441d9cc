//! Integration tests for MultipartClient.

use bytes::Bytes;
use s3_multipart::config::MultipartConfig;
use s3_multipart::error::S3Error;
use s3_multipart::mocks::{MockEngine, RecordedRequest, ScriptedResponse, TestFixtures};
use s3_multipart::{HttpMethod, MultipartClient};
use std::sync::Arc;

fn small_parts_config(part_size: u64, concurrency: usize) -> MultipartConfig {
    MultipartConfig {
        part_size,
        concurrency,
        ..MultipartConfig::default()
    }
}

fn part_number(request: &RecordedRequest) -> Option<u32> {
    request
        .sub_resource
        .as_deref()?
        .strip_prefix("partNumber=")?
        .split('&')
        .next()?
        .parse()
        .ok()
}

/// Answers like S3 would, failing the parts listed in `failing`.
fn s3_like(
    failing: &'static [u32],
) -> impl Fn(&RecordedRequest) -> ScriptedResponse + Send + Sync + 'static {
    move |request: &RecordedRequest| match (request.method, request.sub_resource.as_deref()) {
        (HttpMethod::Post, Some("uploads")) => {
            ScriptedResponse::body(TestFixtures::initiate_xml("U-upload"))
        }
        (HttpMethod::Put, _) => {
            let number = part_number(request).unwrap_or(0);
            if failing.contains(&number) {
                ScriptedResponse::error(500, "InternalError", "We encountered an internal error")
            } else {
                ScriptedResponse::ok().with_etag(format!("\"etag-{}\"", number))
            }
        }
        (HttpMethod::Post, _) => ScriptedResponse::body(TestFixtures::complete_xml(
            "https://test-bucket.s3.amazonaws.com/big.bin",
            "&quot;combined&quot;",
        )),
        _ => ScriptedResponse::ok(),
    }
}

#[tokio::test]
async fn test_upload_splits_and_commits_in_order() {
    let engine = Arc::new(MockEngine::new().with_responder(s3_like(&[])));
    let client = MultipartClient::new(small_parts_config(4, 3), engine.clone());

    let result = client
        .upload(
            &TestFixtures::bucket(),
            "big.bin",
            Bytes::from_static(b"abcdefghij"),
            None,
        )
        .await
        .unwrap();
    assert_eq!(result.etag, "\"combined\"");
    assert_eq!(result.location, "https://test-bucket.s3.amazonaws.com/big.bin");

    let requests = engine.requests();
    assert_eq!(requests.len(), 5);
    assert_eq!(requests[0].sub_resource.as_deref(), Some("uploads"));

    let mut parts: Vec<(u32, String)> = requests
        .iter()
        .filter(|r| r.method == HttpMethod::Put)
        .map(|r| (part_number(r).unwrap(), r.body_str().to_string()))
        .collect();
    parts.sort();
    assert_eq!(
        parts,
        vec![
            (1, "abcd".to_string()),
            (2, "efgh".to_string()),
            (3, "ij".to_string()),
        ]
    );

    let commit = requests.last().unwrap();
    assert_eq!(commit.method, HttpMethod::Post);
    assert_eq!(commit.sub_resource.as_deref(), Some("uploadId=U-upload"));
    let manifest = commit.body_str();
    let positions: Vec<usize> = (1..=3)
        .map(|n| manifest.find(&format!("<ETag>&quot;etag-{}&quot;</ETag>", n)).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));

    let stats = client.context_stats();
    assert_eq!(stats.allocated(), 2);
    assert_eq!(stats.live(), 0);
    assert_eq!(stats.abandoned(), 0);
}

#[tokio::test]
async fn test_upload_aborts_on_part_failure() {
    let engine = Arc::new(MockEngine::new().with_responder(s3_like(&[2])));
    let client = MultipartClient::new(small_parts_config(4, 1), engine.clone());

    let err = client
        .upload(
            &TestFixtures::bucket(),
            "big.bin",
            Bytes::from_static(b"abcdefghij"),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, S3Error::Server(_)));

    let requests = engine.requests();
    let last = requests.last().unwrap();
    assert_eq!(last.method, HttpMethod::Delete);
    assert_eq!(last.sub_resource.as_deref(), Some("uploadId=U-upload"));
    let committed = requests.iter().any(|r| {
        r.method == HttpMethod::Post && r.sub_resource.as_deref() == Some("uploadId=U-upload")
    });
    assert!(!committed);
}

#[tokio::test]
async fn test_upload_rejects_too_many_parts() {
    let engine = Arc::new(MockEngine::new());
    let client = MultipartClient::new(small_parts_config(1, 4), engine.clone());

    let data = Bytes::from(vec![0u8; 10_001]);
    let err = client
        .upload(&TestFixtures::bucket(), "big.bin", data, None)
        .await
        .unwrap_err();
    assert!(matches!(err, S3Error::Request(_)));
    assert_eq!(engine.request_count(), 0);
}

#[tokio::test]
async fn test_initiate_failure_sends_no_parts() {
    let engine = Arc::new(MockEngine::new().with_responses(vec![ScriptedResponse::error(
        403,
        "AccessDenied",
        "Access Denied",
    )]));
    let client = MultipartClient::new(small_parts_config(4, 2), engine.clone());

    let err = client
        .upload(
            &TestFixtures::bucket(),
            "big.bin",
            Bytes::from_static(b"abcdefgh"),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, S3Error::Access(_)));
    assert_eq!(engine.request_count(), 1);
}

#[tokio::test]
async fn test_truncated_upload_id_is_rejected() {
    let engine = Arc::new(MockEngine::new().with_responses(vec![ScriptedResponse::body(
        TestFixtures::initiate_xml("a-very-long-upload-identifier"),
    )]));
    let config = MultipartConfig {
        field_capacity: 8,
        ..MultipartConfig::default()
    };
    let client = MultipartClient::new(config, engine);

    let err = client
        .initiate(&TestFixtures::bucket(), "k", None)
        .await
        .unwrap_err();
    assert!(matches!(err, S3Error::Response(_)));
}

#[tokio::test]
async fn test_padded_upload_id_fits_small_capacity() {
    let xml = concat!(
        "<InitiateMultipartUploadResult>\n",
        "  <UploadId>\n    ABCDEF\n  </UploadId>\n",
        "</InitiateMultipartUploadResult>",
    );
    let engine = Arc::new(MockEngine::new().with_responses(vec![ScriptedResponse::body(xml)]));
    let config = MultipartConfig {
        field_capacity: 8,
        ..MultipartConfig::default()
    };
    let client = MultipartClient::new(config, engine);

    let session = client
        .initiate(&TestFixtures::bucket(), "k", None)
        .await
        .unwrap();
    assert_eq!(session.upload_id, "ABCDEF");
}
