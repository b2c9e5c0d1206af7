use edu_portal::storage::{
    MockStorageService, S3StorageClient, StorageError, StorageService, sanitize_key,
};

#[cfg(test)]
mod mock_tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_success() {
        let mock = MockStorageService::new();
        let key = mock
            .put_object("courses/abc/cover.png", vec![1, 2, 3], "image/png")
            .await
            .unwrap();

        assert_eq!(key, "courses/abc/cover.png");
        assert_eq!(mock.written_keys(), vec![key]);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockStorageService::new_failing();
        let result = mock.put_object("avatar.png", vec![1], "image/png").await;

        assert_eq!(result, Err(StorageError("simulated failure".to_string())));
        assert!(mock.written_keys().is_empty());
    }

    #[tokio::test]
    async fn test_mock_sanitization() {
        let mock = MockStorageService::new();
        let key = mock
            .put_object("../../etc/passwd", Vec::new(), "text/plain")
            .await
            .unwrap();

        assert!(!key.contains(".."));
        assert_eq!(key, "etc/passwd");
    }

    #[tokio::test]
    async fn test_clones_share_written_keys() {
        let mock = MockStorageService::new();
        let handle = mock.clone();
        mock.put_object("a.png", Vec::new(), "image/png").await.unwrap();

        assert_eq!(handle.written_keys(), vec!["a.png".to_string()]);
    }
}

#[test]
fn test_sanitize_key() {
    assert_eq!(sanitize_key("avatars//u1/./a.png"), "avatars/u1/a.png");
    assert_eq!(sanitize_key("/leading/slash"), "leading/slash");
    assert_eq!(sanitize_key("../.."), "");
}

#[tokio::test]
async fn test_s3_client_creation() {
    let _client = S3StorageClient::new(
        "http://localhost:9000",
        "us-east-1",
        "testkey",
        "testsecret",
        "testbucket",
    );
    // Construction is offline; no request is sent.
}
